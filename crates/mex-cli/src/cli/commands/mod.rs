//! CLI command handlers, one file per command.

mod run;
mod scan;

pub use run::{run_download, RunOptions};
pub use scan::run_scan;
