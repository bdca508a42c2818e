//! Producer tick and loop against a scripted osmupdate

#![allow(clippy::unwrap_used, clippy::expect_used)]

use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use osmsync_common::testing::ScriptedRunner;
use osmsync_common::{SyncError, ToolOutput};
use osmsync_downloader::{Cli, Downloader, DownloaderConfig, TickOutcome};
use osmsync_queue::{QueueEntry, ReplicationTimestamp};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

struct Layout {
    root: TempDir,
}

impl Layout {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["settings", "import_queue", "import_done"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("settings/country.pbf"), b"pbf").unwrap();
        Self { root }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }

    fn config(&self, extra: &[&str]) -> DownloaderConfig {
        let mut argv = vec![
            "osmsync-downloader".to_string(),
            "--settings".to_string(),
            self.path("settings").display().to_string(),
            "--import-queue".to_string(),
            self.path("import_queue").display().to_string(),
            "--import-done".to_string(),
            self.path("import_done").display().to_string(),
            "--queue-lock".to_string(),
            "no".to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        Cli::try_parse_from(argv).unwrap().args.validate().unwrap()
    }

    fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path("import_queue"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }
}

fn write_gzip(path: &Path, body: &[u8]) {
    let mut encoder = GzEncoder::new(fs::File::create(path).unwrap(), Compression::fast());
    encoder.write_all(body).unwrap();
    encoder.finish().unwrap();
}

/// osmupdate stand-in that writes a valid change file to its last argument
fn producing_runner() -> ScriptedRunner {
    let runner = ScriptedRunner::new();
    runner.on("osmupdate", |call| {
        write_gzip(Path::new(call.last_arg().unwrap()), b"<osmChange/>");
        ToolOutput::ok("")
    });
    runner
}

#[tokio::test]
async fn tick_publishes_entry_starting_at_last_done_entry() {
    let layout = Layout::new();
    fs::write(
        layout.path("import_done/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = producing_runner();
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner.clone()));

    let before = ReplicationTimestamp::now();
    let outcome = downloader.tick().await.unwrap();
    let TickOutcome::Queued(entry) = outcome else {
        panic!("expected a queued entry, got {:?}", outcome);
    };

    assert_eq!(entry.range_start().to_string(), "2023-01-02T00:00:00Z");
    assert!(entry.range_end() >= before);
    assert_eq!(layout.queue_names(), [entry.name()]);

    let call = &runner.calls_to("osmupdate")[0];
    let args = call.arguments();
    assert_eq!(args[0], "-v");
    assert!(args.contains(&"--sporadic".to_string()));
    assert!(args.contains(&"--max-days=100".to_string()));
    assert!(args.contains(&"--max-merge=7".to_string()));
    assert!(args.contains(&"--compression-level=1".to_string()));
    assert!(args.contains(&"--base-url=http://planet.openstreetmap.org/replication/".to_string()));
    assert_eq!(args[args.len() - 2], "2023-01-02T00:00:00Z");
    assert!(call.last_arg().unwrap().ends_with(".osc.gz.partial"));
    // osmconvert is only needed when both directories are empty
    assert!(runner.calls_to("osmconvert").is_empty());
}

#[tokio::test]
async fn pending_entries_take_precedence_over_done() {
    let layout = Layout::new();
    fs::write(
        layout.path("import_done/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    fs::write(
        layout.path("import_queue/2023-01-02T00:00:00Z->-2023-01-03T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = producing_runner();
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner.clone()));

    let TickOutcome::Queued(entry) = downloader.tick().await.unwrap() else {
        panic!("expected a queued entry");
    };
    assert_eq!(entry.range_start().to_string(), "2023-01-03T00:00:00Z");
    assert_eq!(layout.queue_names().len(), 2);
}

#[tokio::test]
async fn empty_queue_uses_state_file_baseline() {
    let layout = Layout::new();
    fs::write(
        layout.path("settings/last.state.txt"),
        "sequenceNumber=1\ntimestamp=2023-03-04T05\\:06\\:07Z\n",
    )
    .unwrap();
    let runner = producing_runner();
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner.clone()));

    let TickOutcome::Queued(entry) = downloader.tick().await.unwrap() else {
        panic!("expected a queued entry");
    };
    assert_eq!(entry.range_start().to_string(), "2023-03-04T05:06:07Z");
}

#[tokio::test]
async fn empty_queue_without_state_file_asks_osmconvert() {
    let layout = Layout::new();
    let runner = producing_runner();
    runner.on("osmconvert", |_| ToolOutput::ok("2022-12-31T23:59:59Z\n"));
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner.clone()));

    let TickOutcome::Queued(entry) = downloader.tick().await.unwrap() else {
        panic!("expected a queued entry");
    };
    assert_eq!(entry.range_start().to_string(), "2022-12-31T23:59:59Z");

    let convert = &runner.calls_to("osmconvert")[0];
    assert!(convert.arguments()[0].ends_with("country.pbf"));
    assert_eq!(convert.last_arg(), Some("--out-timestamp"));
}

#[tokio::test]
async fn missing_baseline_is_an_error() {
    let layout = Layout::new();
    let runner = ScriptedRunner::new();
    runner.on("osmconvert", |_| ToolOutput::ok("(invalid timestamp)\n"));
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner.clone()));

    let err = downloader.tick().await.unwrap_err();
    assert!(matches!(err, SyncError::NoBaseline(_)));
    assert!(runner.calls_to("osmupdate").is_empty());
}

#[tokio::test]
async fn failed_fetch_creates_no_entry() {
    let layout = Layout::new();
    fs::write(
        layout.path("import_done/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = ScriptedRunner::new();
    runner.on("osmupdate", |call| {
        // Partial download before the failure
        fs::write(call.last_arg().unwrap(), b"\x1f\x8b").unwrap();
        ToolOutput::failed(1, "connection reset")
    });
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner));

    let outcome = downloader.tick().await.unwrap();
    assert!(matches!(outcome, TickOutcome::FetchFailed(_)));
    assert!(layout.queue_names().is_empty());
}

#[tokio::test]
async fn success_without_output_publishes_nothing() {
    let layout = Layout::new();
    fs::write(
        layout.path("import_done/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = ScriptedRunner::new();
    runner.on("osmupdate", |call| {
        fs::write(call.last_arg().unwrap(), b"").unwrap();
        ToolOutput::ok("")
    });
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner));

    assert_eq!(downloader.tick().await.unwrap(), TickOutcome::NothingNew);
    assert!(layout.queue_names().is_empty());
}

#[tokio::test]
async fn corrupt_output_is_discarded() {
    let layout = Layout::new();
    fs::write(
        layout.path("import_done/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = ScriptedRunner::new();
    runner.on("osmupdate", |call| {
        fs::write(call.last_arg().unwrap(), b"this is not gzip").unwrap();
        ToolOutput::ok("")
    });
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner));

    assert!(matches!(downloader.tick().await.unwrap(), TickOutcome::FetchFailed(_)));
    assert!(layout.queue_names().is_empty());
}

#[tokio::test]
async fn cursor_ahead_of_clock_skips_the_fetch() {
    let layout = Layout::new();
    fs::write(
        layout.path("import_queue/2999-01-01T00:00:00Z->-2999-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = ScriptedRunner::new();
    let downloader = Downloader::new(layout.config(&[]), Arc::new(runner.clone()));

    assert_eq!(downloader.tick().await.unwrap(), TickOutcome::ClockSkew);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn poly_file_clips_the_fetch() {
    let layout = Layout::new();
    fs::write(layout.path("settings/area.poly"), b"area\n").unwrap();
    fs::write(
        layout.path("import_done/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = producing_runner();
    let downloader = Downloader::new(
        layout.config(&["--diff", "hour"]),
        Arc::new(runner.clone()),
    );

    downloader.tick().await.unwrap();
    let call = &runner.calls_to("osmupdate")[0];
    let poly = format!("-B={}", layout.path("settings/area.poly").display());
    assert_eq!(call.arguments()[1], poly);
    assert!(call.arguments().contains(&"--hour".to_string()));
}

#[tokio::test]
async fn one_shot_run_fails_when_fetch_fails() {
    let layout = Layout::new();
    fs::write(
        layout.path("import_done/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = ScriptedRunner::new();
    runner.fail("osmupdate", 1);

    let downloader = Downloader::new(layout.config(&["--time", "0"]), Arc::new(runner));
    let err = downloader.run().await.unwrap_err();
    assert!(matches!(err, SyncError::FetchFailed(_)));
}

#[tokio::test]
async fn one_shot_run_publishes_one_entry() {
    let layout = Layout::new();
    fs::write(
        layout.path("import_done/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
        b"x",
    )
    .unwrap();
    let runner = producing_runner();

    Downloader::new(layout.config(&["--time", "0", "--queue-lock", "yes"]), Arc::new(runner))
        .run()
        .await
        .unwrap();

    let names = layout.queue_names();
    // The lock file stays behind, hidden from the queue listing
    let entries: Vec<_> = names.iter().filter(|n| !n.starts_with('.')).collect();
    assert_eq!(entries.len(), 1);
    let (start, _) = QueueEntry::parse_file_name(entries[0]).unwrap();
    assert_eq!(start.to_string(), "2023-01-02T00:00:00Z");
}
