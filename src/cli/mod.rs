/// CLI layer: argument parsing, logging setup and output.
pub mod args;
pub mod logging;
pub mod output;

pub use args::parse_invocation;
pub use output::{TerminalUi, Ui, write_error, write_usage_error};
