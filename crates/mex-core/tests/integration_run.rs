//! End-to-end runs against a local HTTP server: happy path, mixed outcomes,
//! sniffing fallbacks, cross-run skip, and the export-to-archive pipeline.

mod common;

use common::media_server::{MediaServer, Route};
use mex_core::archive;
use mex_core::control::CancelFlag;
use mex_core::export;
use mex_core::job::{DownloadJob, JobKind, JobStatus};
use mex_core::scheduler::{BatchConfig, Scheduler};
use tempfile::tempdir;

const MP4_BODY: &[u8] = b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00mp42mp41 movie payload";
const JPEG_BODY: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF jpeg payload";

fn personal(url: &str) -> DownloadJob {
    DownloadJob::new(url, JobKind::Personal, "2024-03-05", "posted")
}

fn scheduler(out_dir: &std::path::Path) -> Scheduler {
    Scheduler::new(
        out_dir,
        BatchConfig::new(2, 100),
        common::fast_policy(),
        CancelFlag::new(),
    )
}

fn assert_no_part_files(dir: &std::path::Path) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let name = entry.unwrap().file_name();
        assert!(
            !name.to_string_lossy().ends_with(".part"),
            "leftover temp file: {:?}",
            name
        );
    }
}

#[test]
fn downloads_one_file_end_to_end() {
    let server = MediaServer::start();
    server.route("/v.mp4", Route::ok(MP4_BODY).content_type("video/mp4"));
    let out = tempdir().unwrap();

    let job = personal(&server.url("/v.mp4"));
    let expected = out.path().join(format!("{}.mp4", job.file_stem()));
    let report = scheduler(out.path()).run(vec![job]).unwrap();

    assert_eq!(report.outcomes.len(), 1);
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, JobStatus::Succeeded);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.bytes_written, MP4_BODY.len() as u64);
    assert!(!outcome.needs_review);
    assert_eq!(outcome.file.as_deref(), Some(expected.as_path()));
    assert_eq!(std::fs::read(&expected).unwrap(), MP4_BODY);
    // One terminal with batch size 100: a single partial event at drain.
    assert_eq!(report.batch_events, 1);
    assert_eq!(report.snapshot.completed, 1);
    assert!(!report.stopped);
    assert_no_part_files(out.path());
}

#[test]
fn mixed_outcomes_are_each_reported_once() {
    let server = MediaServer::start();
    server.route("/a.jpg", Route::ok(JPEG_BODY));
    let out = tempdir().unwrap();

    let good = personal(&server.url("/a.jpg"));
    let gone = personal(&server.url("/gone.mp4"));
    let dup = good.clone();
    let report = scheduler(out.path()).run(vec![good, gone, dup]).unwrap();

    assert_eq!(report.outcomes.len(), 3);
    let count = |s: JobStatus| report.outcomes.iter().filter(|o| o.status == s).count();
    assert_eq!(count(JobStatus::Succeeded), 1);
    assert_eq!(count(JobStatus::Failed), 1);
    assert_eq!(count(JobStatus::SkippedDuplicate), 1);
    assert_eq!(report.snapshot.terminal(), 3);

    let failure = report
        .outcomes
        .iter()
        .find(|o| o.status == JobStatus::Failed)
        .unwrap();
    assert!(failure.error.as_deref().unwrap_or("").contains("HTTP 404"));
    // The duplicate never reached the network.
    assert_eq!(server.hits("/a.jpg"), 1);
    assert_no_part_files(out.path());
}

#[test]
fn unidentified_content_is_kept_as_bin_for_review() {
    let server = MediaServer::start();
    server.route("/mystery", Route::ok(b"just some text"));
    let out = tempdir().unwrap();

    let report = scheduler(out.path())
        .run(vec![personal(&server.url("/mystery"))])
        .unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, JobStatus::Succeeded);
    assert!(outcome.needs_review);
    let file = outcome.file.as_deref().unwrap();
    assert_eq!(file.extension().and_then(|e| e.to_str()), Some("bin"));
    assert!(file.exists());
}

#[test]
fn url_path_extension_is_the_last_resort() {
    let server = MediaServer::start();
    server.route("/pic.webp", Route::ok(b"no magic in this body"));
    let out = tempdir().unwrap();

    let report = scheduler(out.path())
        .run(vec![personal(&server.url("/pic.webp"))])
        .unwrap();

    let outcome = &report.outcomes[0];
    assert_eq!(outcome.status, JobStatus::Succeeded);
    assert!(!outcome.needs_review);
    let file = outcome.file.as_deref().unwrap();
    assert_eq!(file.extension().and_then(|e| e.to_str()), Some("webp"));
}

#[test]
fn second_run_skips_files_already_on_disk() {
    let server = MediaServer::start();
    server.route("/v.mp4", Route::ok(MP4_BODY).content_type("video/mp4"));
    let out = tempdir().unwrap();
    let url = server.url("/v.mp4");

    let first = scheduler(out.path()).run(vec![personal(&url)]).unwrap();
    assert_eq!(first.snapshot.completed, 1);

    let second = scheduler(out.path()).run(vec![personal(&url)]).unwrap();
    assert_eq!(second.outcomes.len(), 1);
    assert_eq!(second.outcomes[0].status, JobStatus::SkippedDuplicate);
    assert!(second.outcomes[0].file.is_some());
    assert_eq!(server.hits("/v.mp4"), 1);
}

#[test]
fn full_pipeline_from_export_to_archive() {
    let server = MediaServer::start();
    server.route("/own.mp4", Route::ok(MP4_BODY).content_type("video/mp4"));
    server.route("/fav.jpg", Route::ok(JPEG_BODY).content_type("image/jpeg"));
    let root = tempdir().unwrap();
    let out_dir = root.path().join("downloads");

    let export_json = format!(
        r#"{{
            "Video": {{"Videos": {{"VideoList": [
                {{"Date": "2024-03-05 10:00:00", "Link": "{}"}}
            ]}}}},
            "Activity": {{"Favorite Videos": {{"FavoriteVideoList": [
                {{"Date": "2024-02-01 09:00:00", "Link": "{}"}}
            ]}}}}
        }}"#,
        server.url("/own.mp4"),
        server.url("/fav.jpg")
    );
    let export_path = root.path().join("export.json");
    std::fs::write(&export_path, export_json).unwrap();

    let export = export::load_export(&export_path).unwrap();
    let extracted = export::extract_jobs(&export);
    assert_eq!(extracted.jobs.len(), 2);
    assert_eq!(extracted.warnings, 0);

    let report = scheduler(&out_dir).run(extracted.jobs).unwrap();
    assert_eq!(report.snapshot.completed, 2);

    let archive_path = root.path().join("downloads.zip");
    let summary = archive::archive_output_dir(&out_dir, &archive_path).unwrap();
    assert_eq!(summary.files, 2);

    let zip = zip::ZipArchive::new(std::fs::File::open(&archive_path).unwrap()).unwrap();
    assert_eq!(zip.len(), 2);
}
