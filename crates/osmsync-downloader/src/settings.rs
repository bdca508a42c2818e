//! Files the downloader reads from `SETTINGS/`

use osmsync_common::config::Validator;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Replication state left by the bulk import (`-diffdir`)
pub const STATE_FILE: &str = "last.state.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderSettings {
    /// Bulk-load source, used for the baseline timestamp
    pub osm_file: PathBuf,
    pub state_file: Option<PathBuf>,
    /// Boundary polygon handed to osmupdate with `-B`
    pub poly_file: Option<PathBuf>,
}

impl DownloaderSettings {
    pub fn discover(dir: &Path, v: &mut Validator) -> Option<Self> {
        let mut names: Vec<String> = match fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
                .filter_map(|entry| entry.file_name().into_string().ok())
                .collect(),
            Err(e) => {
                v.push("SETTINGS", format!("cannot list {}: {}", dir.display(), e));
                return None;
            },
        };
        names.sort();

        let first_with = |ext: &str| -> Option<PathBuf> {
            let mut matching = names.iter().filter(|n| n.ends_with(ext));
            let first = matching.next()?;
            if matching.next().is_some() {
                warn!(chosen = %first, "Several *{} files in {}, using the first", ext, dir.display());
            }
            Some(dir.join(first))
        };

        let osm_file = first_with(".pbf");
        if osm_file.is_none() {
            v.push("SETTINGS", format!("OSM file *.pbf is missing in {}", dir.display()));
        }

        let poly_file = first_with(".poly");
        match &poly_file {
            Some(poly) => info!(poly = %poly.display(), "Polygon detected for clipping"),
            None => info!("No *.poly in {}, fetching unclipped diffs", dir.display()),
        }

        let state_file = names
            .iter()
            .any(|n| n == STATE_FILE)
            .then(|| dir.join(STATE_FILE));

        Some(Self {
            osm_file: osm_file?,
            state_file,
            poly_file,
        })
    }
}
