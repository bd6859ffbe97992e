//! Tests for run and scan subcommand parsing.

use super::parse;
use crate::cli::{Cli, MexCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn parse_run_defaults() {
    match parse(&["mex", "run", "export.json"]) {
        MexCommand::Run {
            export,
            out_dir,
            archive,
            workers,
            batch_size,
            confirm_batches,
            no_archive,
        } => {
            assert_eq!(export, PathBuf::from("export.json"));
            assert_eq!(out_dir, PathBuf::from("downloads"));
            assert!(archive.is_none());
            assert!(workers.is_none());
            assert!(batch_size.is_none());
            assert!(!confirm_batches);
            assert!(!no_archive);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn parse_run_with_overrides() {
    match parse(&[
        "mex",
        "run",
        "export.json",
        "--out-dir",
        "media",
        "--workers",
        "4",
        "--batch-size",
        "25",
        "--confirm-batches",
        "--no-archive",
    ]) {
        MexCommand::Run {
            out_dir,
            workers,
            batch_size,
            confirm_batches,
            no_archive,
            ..
        } => {
            assert_eq!(out_dir, PathBuf::from("media"));
            assert_eq!(workers, Some(4));
            assert_eq!(batch_size, Some(25));
            assert!(confirm_batches);
            assert!(no_archive);
        }
        _ => panic!("expected Run with overrides"),
    }
}

#[test]
fn parse_run_with_archive_path() {
    match parse(&["mex", "run", "export.json", "--archive", "bundle.zip"]) {
        MexCommand::Run { archive, .. } => {
            assert_eq!(archive, Some(PathBuf::from("bundle.zip")));
        }
        _ => panic!("expected Run with --archive"),
    }
}

#[test]
fn parse_scan() {
    match parse(&["mex", "scan", "export.json"]) {
        MexCommand::Scan { export } => {
            assert_eq!(export, PathBuf::from("export.json"));
        }
        _ => panic!("expected Scan"),
    }
}

#[test]
fn run_without_export_path_is_an_error() {
    assert!(Cli::try_parse_from(["mex", "run"]).is_err());
    assert!(Cli::try_parse_from(["mex", "scan"]).is_err());
}
