//! CLI command handlers. Each command is in its own file.

mod fetch;

pub use fetch::run_fetch;
