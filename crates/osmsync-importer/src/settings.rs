//! Discovery of the files the importer reads from `SETTINGS/`

use osmsync_common::config::Validator;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Optional SQL run once after the bulk load
pub const POST_IMPORT_SQL: &str = "post-pbf-import.sql";

/// Optional QGIS layer styles
pub const QGIS_STYLE_SQL: &str = "qgis_style.sql";

/// Sub-directory holding the clip boundary and `clip.sql`
pub const CLIP_DIR: &str = "clip";

const CLIP_SHAPEFILE: &str = "clip.shp";
const CLIP_GEOJSON: &str = "clip.geojson";
const CLIP_SQL: &str = "clip.sql";

const MAPPING_EXTENSIONS: [&str; 3] = ["json", "yml", "yaml"];

/// Clip boundary shipped in `SETTINGS/clip/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipBoundary {
    Shapefile(PathBuf),
    GeoJson(PathBuf),
}

impl ClipBoundary {
    pub fn path(&self) -> &Path {
        match self {
            ClipBoundary::Shapefile(path) | ClipBoundary::GeoJson(path) => path,
        }
    }

    /// imposm only accepts GeoJSON for `-limitto`
    pub fn limit_to(&self) -> Option<&Path> {
        match self {
            ClipBoundary::GeoJson(path) => Some(path),
            ClipBoundary::Shapefile(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSettings {
    pub boundary: ClipBoundary,
    /// Defines `clean_tables()`
    pub function_sql: PathBuf,
}

/// Files found in the settings directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFiles {
    pub osm_file: PathBuf,
    pub mapping_file: PathBuf,
    pub post_import_sql: Option<PathBuf>,
    /// `None` when `QGIS_STYLE=no`
    pub qgis_style_sql: Option<PathBuf>,
    /// `None` when `CLIP=no`
    pub clip: Option<ClipSettings>,
}

impl SettingsFiles {
    /// Scan `dir`, recording every missing mandatory file in `v`
    pub fn discover(
        dir: &Path,
        clip_enabled: bool,
        style_enabled: bool,
        v: &mut Validator,
    ) -> Option<Self> {
        let names = match file_names(dir) {
            Ok(names) => names,
            Err(e) => {
                v.push("SETTINGS", format!("cannot list {}: {}", dir.display(), e));
                return None;
            },
        };

        let osm_file = pick(dir, &names, "OSM file", |n| has_extension(n, &["pbf"]));
        if osm_file.is_none() {
            v.push("SETTINGS", format!("no *.pbf file in {}", dir.display()));
        }

        let mapping_file = pick(dir, &names, "mapping file", |n| has_extension(n, &MAPPING_EXTENSIONS));
        if mapping_file.is_none() {
            v.push(
                "SETTINGS",
                format!("no mapping file (*.json, *.yml) in {}", dir.display()),
            );
        }

        let post_import_sql = named(dir, &names, POST_IMPORT_SQL);

        let qgis_style_sql = if style_enabled {
            let found = named(dir, &names, QGIS_STYLE_SQL);
            if found.is_none() {
                v.push(
                    "QGIS_STYLE",
                    format!("{} is missing in {} and QGIS_STYLE = yes", QGIS_STYLE_SQL, dir.display()),
                );
            }
            found
        } else {
            None
        };

        let clip = if clip_enabled {
            let found = discover_clip(&dir.join(CLIP_DIR));
            if found.is_none() {
                v.push(
                    "CLIP",
                    format!(
                        "{}/{} or {}/{} and {}/{} are required when CLIP = yes",
                        CLIP_DIR, CLIP_SHAPEFILE, CLIP_DIR, CLIP_GEOJSON, CLIP_DIR, CLIP_SQL
                    ),
                );
                return None;
            }
            found
        } else {
            None
        };

        Some(Self {
            osm_file: osm_file?,
            mapping_file: mapping_file?,
            post_import_sql,
            qgis_style_sql,
            clip,
        })
    }
}

fn discover_clip(dir: &Path) -> Option<ClipSettings> {
    let names = file_names(dir).ok()?;
    let function_sql = named(dir, &names, CLIP_SQL)?;
    let boundary = named(dir, &names, CLIP_GEOJSON)
        .map(ClipBoundary::GeoJson)
        .or_else(|| named(dir, &names, CLIP_SHAPEFILE).map(ClipBoundary::Shapefile))?;

    Some(ClipSettings {
        boundary,
        function_sql,
    })
}

/// Sorted names of the regular files in `dir`
fn file_names(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        if !dir_entry.file_type()?.is_file() {
            continue;
        }
        if let Ok(name) = dir_entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

fn named(dir: &Path, names: &[String], wanted: &str) -> Option<PathBuf> {
    names.iter().any(|n| n == wanted).then(|| dir.join(wanted))
}

/// First match in name order, warning when the choice was ambiguous
fn pick(dir: &Path, names: &[String], what: &str, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let candidates: Vec<&String> = names.iter().filter(|n| matches(n)).collect();
    let first = candidates.first()?;
    if candidates.len() > 1 {
        warn!(
            chosen = %first,
            candidates = candidates.len(),
            "Several {} candidates in {}, using the first",
            what,
            dir.display()
        );
    }
    Some(dir.join(first.as_str()))
}
