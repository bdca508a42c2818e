//! Shared fixtures for importer integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use clap::Parser;
use osmsync_importer::postgis::{CLIP_TABLE, OSM_TABLE_PATTERN};
use osmsync_importer::{Cli, ImportResult, ImporterConfig, SchemaProbe};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tempfile::TempDir;

/// A complete on-disk layout: settings, cache, queue and done directories
pub struct Layout {
    pub root: TempDir,
}

impl Layout {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        for dir in ["settings", "cache", "import_queue", "import_done"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("settings/country.pbf"), b"pbf").unwrap();
        fs::write(root.path().join("settings/mapping.yml"), b"tables: {}").unwrap();
        Self { root }
    }

    pub fn settings(&self) -> PathBuf {
        self.root.path().join("settings")
    }

    pub fn queue(&self) -> PathBuf {
        self.root.path().join("import_queue")
    }

    pub fn done(&self) -> PathBuf {
        self.root.path().join("import_done")
    }

    /// Drop a queue entry covering `start..end`
    pub fn enqueue(&self, start: &str, end: &str) -> PathBuf {
        let path = self.queue().join(format!("{start}->-{end}.osc.gz"));
        fs::write(&path, b"osc").unwrap();
        path
    }

    /// Command line with every directory pointed into the layout.
    ///
    /// `overrides` are `--flag value` pairs replacing the defaults below.
    pub fn argv(&self, overrides: &[&str]) -> Vec<String> {
        let dir = |name: &str| self.root.path().join(name).display().to_string();
        let mut flags: Vec<(String, String)> = vec![
            ("--time".into(), "0".into()),
            ("--settings".into(), dir("settings")),
            ("--cache".into(), dir("cache")),
            ("--import-queue".into(), dir("import_queue")),
            ("--import-done".into(), dir("import_done")),
            ("--srid".into(), "4326".into()),
            ("--clip".into(), "no".into()),
            ("--qgis-style".into(), "no".into()),
            ("--queue-lock".into(), "no".into()),
            ("--postgres-pass".into(), "s3cret".into()),
        ];
        for pair in overrides.chunks(2) {
            let (flag, value) = (pair[0].to_string(), pair[1].to_string());
            match flags.iter_mut().find(|(f, _)| *f == flag) {
                Some(slot) => slot.1 = value,
                None => flags.push((flag, value)),
            }
        }

        let mut argv = vec!["osmsync-importer".to_string()];
        for (flag, value) in flags {
            argv.push(flag);
            argv.push(value);
        }
        argv
    }

    pub fn cli(&self, extra: &[&str]) -> Cli {
        Cli::try_parse_from(self.argv(extra)).unwrap()
    }

    pub fn config(&self, extra: &[&str]) -> ImporterConfig {
        self.cli(extra).args.validate().unwrap()
    }

    pub fn read_checkpoint(&self) -> Option<String> {
        fs::read_to_string(self.settings().join("timestamp.txt")).ok()
    }
}

pub fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

/// Catalog fake: fixed table counts, every query recorded
#[derive(Default)]
pub struct FakeProbe {
    pub osm_tables: AtomicI64,
    pub clip_tables: AtomicI64,
    pub queries: Mutex<Vec<(Option<String>, String)>>,
}

impl FakeProbe {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn populated() -> Self {
        let probe = Self::default();
        probe.osm_tables.store(12, Ordering::SeqCst);
        probe
    }

    pub fn queries(&self) -> Vec<(Option<String>, String)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaProbe for FakeProbe {
    async fn count_tables(&self, schema: Option<&str>, pattern: &str) -> ImportResult<i64> {
        self.queries
            .lock()
            .unwrap()
            .push((schema.map(str::to_string), pattern.to_string()));
        Ok(match pattern {
            OSM_TABLE_PATTERN => self.osm_tables.load(Ordering::SeqCst),
            CLIP_TABLE => self.clip_tables.load(Ordering::SeqCst),
            _ => 0,
        })
    }
}
