//! Downloader configuration
//!
//! Same two-phase validation as the importer: values first, then the
//! directories and the files in `SETTINGS/`.

use clap::Args;
use osmsync_common::config::{Toggle, Validator};
use osmsync_common::ConfigErrors;
use osmsync_queue::QueueDirs;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::settings::DownloaderSettings;

pub const DEFAULT_BASE_URL: &str = "http://planet.openstreetmap.org/replication/";

/// Replication stream osmupdate should follow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Sporadic,
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// osmupdate flag selecting this stream
    pub fn flag(self) -> &'static str {
        match self {
            Granularity::Sporadic => "--sporadic",
            Granularity::Minute => "--minute",
            Granularity::Hour => "--hour",
            Granularity::Day => "--day",
        }
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sporadic" => Ok(Granularity::Sporadic),
            "minute" => Ok(Granularity::Minute),
            "hour" => Ok(Granularity::Hour),
            "day" => Ok(Granularity::Day),
            other => Err(format!(
                "'{}' not supported, expected sporadic, minute, hour or day",
                other
            )),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag().trim_start_matches('-'))
    }
}

/// Raw downloader settings as read from flags and the environment
#[derive(Args, Debug, Clone)]
pub struct DownloaderArgs {
    /// Seconds between fetches (0 = fetch once, then exit)
    #[arg(long, env = "TIME", default_value = "120")]
    pub time: String,

    /// Seconds to wait after a failed fetch
    #[arg(long, env = "RETRY_DELAY", default_value = "2")]
    pub retry_delay: String,

    /// Largest range osmupdate may fetch, in days
    #[arg(long, env = "MAX_DAYS", default_value = "100")]
    pub max_days: String,

    /// Replication stream: sporadic, minute, hour or day
    #[arg(long, env = "DIFF", default_value = "sporadic")]
    pub diff: String,

    /// Maximum number of files osmupdate merges at once
    #[arg(long, env = "MAX_MERGE", default_value = "7")]
    pub max_merge: String,

    /// gzip level of the produced change files (1-9)
    #[arg(long, env = "COMPRESSION_LEVEL", default_value = "1")]
    pub compression_level: String,

    /// Replication server root
    #[arg(long, env = "BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// New diffs are published here
    #[arg(long, env = "IMPORT_QUEUE", default_value = "import_queue")]
    pub import_queue: PathBuf,

    /// Diffs already applied by the importer
    #[arg(long, env = "IMPORT_DONE", default_value = "import_done")]
    pub import_done: PathBuf,

    /// Directory holding the PBF, last.state.txt and the optional *.poly
    #[arg(long, env = "SETTINGS", default_value = "settings")]
    pub settings: PathBuf,

    /// Refuse to start if another downloader holds the queue lock (yes/no)
    #[arg(long, env = "QUEUE_LOCK", default_value = "yes")]
    pub queue_lock: String,

    #[arg(long, env = "OSMUPDATE_BIN", default_value = "osmupdate")]
    pub osmupdate_bin: String,

    #[arg(long, env = "OSMCONVERT_BIN", default_value = "osmconvert")]
    pub osmconvert_bin: String,
}

/// osmupdate tuning knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    pub max_days: u32,
    pub granularity: Granularity,
    pub max_merge: u32,
    pub compression_level: u8,
    pub base_url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub osmupdate: String,
    pub osmconvert: String,
}

/// Validated downloader configuration
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Zero means "fetch once, then exit"
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    pub update: UpdateOptions,
    pub queue: PathBuf,
    pub done: PathBuf,
    pub settings_dir: PathBuf,
    pub settings: DownloaderSettings,
    pub queue_lock: bool,
    pub tools: ToolPaths,
}

impl DownloaderConfig {
    pub fn queue_dirs(&self) -> QueueDirs {
        QueueDirs::new(&self.queue, &self.done)
    }

    pub fn is_one_shot(&self) -> bool {
        self.poll_interval.is_zero()
    }
}

impl DownloaderArgs {
    pub fn validate(&self) -> Result<DownloaderConfig, ConfigErrors> {
        let mut v = Validator::new();

        let time = v.parse::<u64>("TIME", &self.time);
        let retry_delay = v.parse::<u64>("RETRY_DELAY", &self.retry_delay);
        let max_days = v.parse::<u32>("MAX_DAYS", &self.max_days);
        let granularity = v.parse::<Granularity>("DIFF", &self.diff);
        let max_merge = v.parse::<u32>("MAX_MERGE", &self.max_merge);
        let compression_level = v.parse::<u8>("COMPRESSION_LEVEL", &self.compression_level);
        let base_url = v.parse::<Url>("BASE_URL", &self.base_url);
        let queue_lock = v.parse::<Toggle>("QUEUE_LOCK", &self.queue_lock);

        if let Some(level) = compression_level {
            if !(1..=9).contains(&level) {
                v.push("COMPRESSION_LEVEL", format!("{} is out of range 1-9", level));
            }
        }
        if let (Some(time), Some(delay)) = (time, retry_delay) {
            if time > 0 && delay >= time {
                v.push(
                    "RETRY_DELAY",
                    format!("{}s must be shorter than TIME ({}s)", delay, time),
                );
            }
        }
        if max_days == Some(0) {
            v.push("MAX_DAYS", "must be at least 1");
        }
        if max_merge.is_some_and(|m| m < 2) {
            v.push("MAX_MERGE", "must be at least 2");
        }
        if let Some(url) = &base_url {
            if !matches!(url.scheme(), "http" | "https") {
                v.push("BASE_URL", format!("unsupported scheme '{}'", url.scheme()));
            }
        }
        for (key, value) in [
            ("OSMUPDATE_BIN", &self.osmupdate_bin),
            ("OSMCONVERT_BIN", &self.osmconvert_bin),
        ] {
            if value.trim().is_empty() {
                v.push(key, "must not be empty");
            }
        }

        v.checkpoint()?;

        let queue = v.existing_dir("IMPORT_QUEUE", &self.import_queue);
        let done = v.existing_dir("IMPORT_DONE", &self.import_done);
        let settings_dir = v.existing_dir("SETTINGS", &self.settings);
        v.checkpoint()?;

        let settings = settings_dir
            .as_deref()
            .and_then(|dir| DownloaderSettings::discover(dir, &mut v));

        v.finish(|| {
            Some(DownloaderConfig {
                poll_interval: Duration::from_secs(time?),
                retry_delay: Duration::from_secs(retry_delay?),
                update: UpdateOptions {
                    max_days: max_days?,
                    granularity: granularity?,
                    max_merge: max_merge?,
                    compression_level: compression_level?,
                    base_url: base_url?,
                },
                queue: queue?,
                done: done?,
                settings_dir: settings_dir?,
                settings: settings?,
                queue_lock: queue_lock?.enabled(),
                tools: ToolPaths {
                    osmupdate: self.osmupdate_bin.clone(),
                    osmconvert: self.osmconvert_bin.clone(),
                },
            })
        })
    }
}
