//! CLI parse tests.

use super::{Cli, MexCommand};
use clap::Parser;

pub(super) fn parse(args: &[&str]) -> MexCommand {
    let cli = Cli::try_parse_from(args).unwrap();
    cli.command
}

mod run_scan;
