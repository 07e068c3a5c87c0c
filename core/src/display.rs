//! Invocation labels.
//!
//! Templates use `{0}`, `{1}`, ... for label arguments, `{version}` as an alias
//! of `{0}`, `{displayName}` for the test's own name and `{index}` for the 1-based
//! invocation index. `{{` and `}}` are literal braces.

use std::fmt::Write;
use std::str::FromStr;

use toolmatrix_types::{DisplayLabel, ToolName, ToolVersion};

use crate::error::FormatError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Arg(usize),
    DisplayName,
    Index,
}

/// A parsed label template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl LabelTemplate {
    pub fn parse(template: &str) -> Result<Self, FormatError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, ch)) = chars.next() {
            match ch {
                '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(FormatError::Unclosed(pos));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(placeholder(&name)?);
                }
                '}' => return Err(FormatError::UnmatchedClose(pos)),
                _ => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments
            .iter()
            .any(|segment| matches!(segment, Segment::Arg(_) | Segment::Index))
        {
            return Err(FormatError::NoDistinguishingToken);
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// `"<Tool> {0}: {displayName}"`.
    #[must_use]
    pub fn for_tool(tool: &ToolName) -> Self {
        let escaped = tool.as_str().replace('{', "{{").replace('}', "}}");
        Self {
            source: format!("{escaped} {{0}}: {{displayName}}"),
            segments: vec![
                Segment::Literal(format!("{tool} ")),
                Segment::Arg(0),
                Segment::Literal(": ".to_string()),
                Segment::DisplayName,
            ],
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of label arguments the template needs.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Arg(index) => Some(index + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    fn uses_display_name(&self) -> bool {
        self.segments.contains(&Segment::DisplayName)
    }

    fn render(
        &self,
        index: usize,
        args: &[String],
        display_name: &str,
    ) -> Result<String, FormatError> {
        if self.uses_display_name() && display_name.trim().is_empty() {
            return Err(FormatError::MissingDisplayName);
        }
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Arg(position) => {
                    let arg = args.get(*position).ok_or(FormatError::ArgumentOutOfRange {
                        index: *position,
                        available: args.len(),
                    })?;
                    out.push_str(arg);
                }
                Segment::DisplayName => out.push_str(display_name),
                Segment::Index => {
                    let _ = write!(out, "{index}");
                }
            }
        }
        Ok(out)
    }
}

fn placeholder(name: &str) -> Result<Segment, FormatError> {
    match name {
        "version" => Ok(Segment::Arg(0)),
        "displayName" => Ok(Segment::DisplayName),
        "index" => Ok(Segment::Index),
        digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => digits
            .parse::<usize>()
            .map(Segment::Arg)
            .map_err(|_| FormatError::UnknownPlaceholder(name.to_string())),
        _ => Err(FormatError::UnknownPlaceholder(name.to_string())),
    }
}

impl FromStr for LabelTemplate {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Produces the report label of each invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNameFormatter {
    template: LabelTemplate,
}

impl DisplayNameFormatter {
    #[must_use]
    pub fn new(template: LabelTemplate) -> Self {
        Self { template }
    }

    #[must_use]
    pub fn for_tool(tool: &ToolName) -> Self {
        Self::new(LabelTemplate::for_tool(tool))
    }

    pub fn with_template(template: &str) -> Result<Self, FormatError> {
        LabelTemplate::parse(template).map(Self::new)
    }

    #[must_use]
    pub fn template(&self) -> &LabelTemplate {
        &self.template
    }

    /// Label for a single-version invocation. The test name is used verbatim.
    pub fn format(
        &self,
        version: &ToolVersion,
        test_display_name: &str,
    ) -> Result<DisplayLabel, FormatError> {
        self.render(1, &[version.to_string()], test_display_name)
    }

    pub fn render(
        &self,
        index: usize,
        label_args: &[String],
        display_name: &str,
    ) -> Result<DisplayLabel, FormatError> {
        self.template
            .render(index, label_args, display_name)
            .map(DisplayLabel::new)
    }

    /// Like [`render`](Self::render), but falls back to [`fallback_label`] on error.
    #[must_use]
    pub fn label_or_fallback(
        &self,
        index: usize,
        label_args: &[String],
        display_name: &str,
    ) -> DisplayLabel {
        match self.render(index, label_args, display_name) {
            Ok(label) => label,
            Err(err) => {
                tracing::warn!(
                    template = self.template.as_str(),
                    index,
                    "label formatting failed, using raw identifier: {err}"
                );
                fallback_label(index, label_args, display_name)
            }
        }
    }
}

/// Raw identifier used when a label cannot be formatted: `name[index] args`.
#[must_use]
pub fn fallback_label(index: usize, label_args: &[String], display_name: &str) -> DisplayLabel {
    let name = display_name.trim();
    let mut out = String::new();
    let _ = write!(out, "{name}[{index}]");
    if !label_args.is_empty() {
        out.push(' ');
        out.push_str(&label_args.join(", "));
    }
    DisplayLabel::new(out)
}
