//! Registration through `version_matrix_test!`

use anyhow::ensure;
use toolmatrix_core::{ArgumentTuple, version_matrix_test};

use crate::common::provider;

version_matrix_test! {
    /// Runs once per version of an explicit catalog.
    fn runs_for_each_listed_version(args: ArgumentTuple) -> anyhow::Result<()> {
        ensure!(["7.6", "8.1"].contains(&args.version.as_str()), "unexpected {}", args.version);
        Ok(())
    }
    using provider(&["7.6", "8.1"])
}

version_matrix_test! {
    fn companion_arguments_are_passed_through(pair: (ArgumentTuple, String)) -> anyhow::Result<()> {
        let (args, ktlint) = pair;
        ensure!(args.version.major() == 9, "unexpected {}", args.version);
        ensure!(ktlint.starts_with("1."), "unexpected ktlint {ktlint}");
        Ok(())
    }
    using provider(&["9.1.0"]).with_companions("KtLint", ["1.0.1", "1.3.0"])
}
