mod config;
mod fixtures;
mod macros;
mod matrix;
