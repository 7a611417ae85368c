// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation document serialization and deserialization.
//!
//! The persisted document is a JSON object with one entry per video
//! identifier. Each entry stores its marks column-wise:
//!
//! ```json
//! {
//!   "fish_tank": {
//!     "points": {"frame_counter": [5], "mouse_x": [10.0], "mouse_y": [20.0], "marker_colour": ["blue"]},
//!     "arrows": {"frame_counter": [], "arrow_start_x": [], "arrow_start_y": [],
//!                "arrow_head_x": [], "arrow_head_y": [], "marker_colour": []}
//!   }
//! }
//! ```
//!
//! Columns of a group are index-aligned and follow store insertion order.
//! Missing column keys read as empty columns. Documents can also be written
//! and read as YAML.

use crate::error::AnnotationError;
use crate::models::annotation::{Category, Point};
use crate::models::store::AnnotationStore;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointColumns {
    #[serde(default)]
    pub frame_counter: Vec<usize>,
    #[serde(default)]
    pub mouse_x: Vec<f64>,
    #[serde(default)]
    pub mouse_y: Vec<f64>,
    #[serde(default)]
    pub marker_colour: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrowColumns {
    #[serde(default)]
    pub frame_counter: Vec<usize>,
    #[serde(default)]
    pub arrow_start_x: Vec<f64>,
    #[serde(default)]
    pub arrow_start_y: Vec<f64>,
    #[serde(default)]
    pub arrow_head_x: Vec<f64>,
    #[serde(default)]
    pub arrow_head_y: Vec<f64>,
    #[serde(default)]
    pub marker_colour: Vec<Category>,
}

/// Marks of one video in column form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    #[serde(default)]
    pub points: PointColumns,
    #[serde(default)]
    pub arrows: ArrowColumns,
}

/// The whole persisted document, keyed by video identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationDocument {
    pub videos: BTreeMap<String, VideoEntry>,
}

fn check_lengths(group: &str, columns: &[(&str, usize)]) -> Result<usize, AnnotationError> {
    let expected = columns.first().map(|(_, len)| *len).unwrap_or(0);
    match columns.iter().find(|(_, len)| *len != expected) {
        Some((name, len)) => Err(AnnotationError::malformed(format!(
            "{group}.{name} has {len} entries, {group}.{} has {expected}",
            columns[0].0
        ))),
        None => Ok(expected),
    }
}

impl VideoEntry {
    pub fn from_store(store: &AnnotationStore) -> Self {
        let mut entry = Self::default();
        for point in store.points() {
            let columns = &mut entry.points;
            columns.frame_counter.push(point.frame);
            columns.mouse_x.push(point.x);
            columns.mouse_y.push(point.y);
            columns.marker_colour.push(point.category);
        }
        for arrow in store.arrows() {
            let columns = &mut entry.arrows;
            columns.frame_counter.push(arrow.frame);
            columns.arrow_start_x.push(arrow.start.x);
            columns.arrow_start_y.push(arrow.start.y);
            columns.arrow_head_x.push(arrow.head.x);
            columns.arrow_head_y.push(arrow.head.y);
            columns.marker_colour.push(arrow.category);
        }
        entry
    }

    /// Zip the columns back into a store. Fails on ragged columns or on
    /// zero-length arrows.
    pub fn to_store(&self) -> Result<AnnotationStore, AnnotationError> {
        let p = &self.points;
        let point_count = check_lengths(
            "points",
            &[
                ("frame_counter", p.frame_counter.len()),
                ("mouse_x", p.mouse_x.len()),
                ("mouse_y", p.mouse_y.len()),
                ("marker_colour", p.marker_colour.len()),
            ],
        )?;
        let a = &self.arrows;
        let arrow_count = check_lengths(
            "arrows",
            &[
                ("frame_counter", a.frame_counter.len()),
                ("arrow_start_x", a.arrow_start_x.len()),
                ("arrow_start_y", a.arrow_start_y.len()),
                ("arrow_head_x", a.arrow_head_x.len()),
                ("arrow_head_y", a.arrow_head_y.len()),
                ("marker_colour", a.marker_colour.len()),
            ],
        )?;

        let mut store = AnnotationStore::new();
        for i in 0..point_count {
            store.add_point(p.frame_counter[i], p.mouse_x[i], p.mouse_y[i], p.marker_colour[i]);
        }
        for i in 0..arrow_count {
            let start = Point::new(a.arrow_start_x[i], a.arrow_start_y[i]);
            let head = Point::new(a.arrow_head_x[i], a.arrow_head_y[i]);
            store
                .add_arrow(a.frame_counter[i], start, head, a.marker_colour[i])
                .map_err(|e| AnnotationError::malformed(format!("arrows[{i}]: {e}")))?;
        }
        Ok(store)
    }
}

/// Build a document from `(video id, store)` pairs.
pub fn to_document<'a, I>(stores: I) -> AnnotationDocument
where
    I: IntoIterator<Item = (&'a str, &'a AnnotationStore)>,
{
    AnnotationDocument {
        videos: stores
            .into_iter()
            .map(|(id, store)| (id.to_string(), VideoEntry::from_store(store)))
            .collect(),
    }
}

/// Rebuild every store in a document. Fails on the first malformed entry.
pub fn from_document(doc: &AnnotationDocument) -> Result<BTreeMap<String, AnnotationStore>, AnnotationError> {
    doc.videos
        .iter()
        .map(|(id, entry)| {
            let store = entry.to_store().map_err(|e| match e {
                AnnotationError::MalformedDocument(msg) => {
                    AnnotationError::MalformedDocument(format!("video '{id}': {msg}"))
                }
                other => other,
            })?;
            Ok((id.clone(), store))
        })
        .collect()
}

/// Rebuild the store of one video.
pub fn store_for(doc: &AnnotationDocument, video_id: &str) -> Result<AnnotationStore, AnnotationError> {
    doc.videos
        .get(video_id)
        .ok_or_else(|| AnnotationError::UnknownVideo(video_id.to_string()))?
        .to_store()
}

/// Entry of a video that could not be turned into a store.
#[derive(Debug)]
pub struct RejectedVideo {
    pub video_id: String,
    pub error: AnnotationError,
    /// The entry as it was read, so it can be written back unchanged.
    pub raw: serde_json::Value,
}

/// A document read from disk, one video at a time.
///
/// Entries that fail to parse or validate are reported in `rejected` and
/// left out, so a single bad entry does not cost the other videos.
#[derive(Debug, Default)]
pub struct LoadedDocument {
    pub stores: BTreeMap<String, AnnotationStore>,
    pub rejected: Vec<RejectedVideo>,
}

impl LoadedDocument {
    pub fn from_value(value: serde_json::Value) -> Result<Self, AnnotationError> {
        let serde_json::Value::Object(videos) = value else {
            return Err(AnnotationError::malformed("top level must be an object keyed by video"));
        };

        let mut loaded = Self::default();
        for (id, raw) in videos {
            let store = VideoEntry::deserialize(&raw)
                .map_err(AnnotationError::malformed)
                .and_then(|entry| entry.to_store());
            match store {
                Ok(store) => {
                    loaded.stores.insert(id, store);
                }
                Err(error) => {
                    log::warn!("Skipping annotations for '{}': {}", id, error);
                    loaded.rejected.push(RejectedVideo {
                        video_id: id,
                        error,
                        raw,
                    });
                }
            }
        }
        Ok(loaded)
    }

    pub fn from_json_str(text: &str) -> Result<Self, AnnotationError> {
        let value = serde_json::from_str(text).map_err(AnnotationError::malformed)?;
        Self::from_value(value)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, AnnotationError> {
        let value = serde_yaml::from_str(text).map_err(AnnotationError::malformed)?;
        Self::from_value(value)
    }
}

/// Default output name, `annotations-DDMMYYYY.json`, inside `dir`.
pub fn default_output_path(dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%d%m%Y");
    dir.join(format!("annotations-{stamp}.json"))
}

/// Document value with unreadable entries put back verbatim. Entries
/// present in `doc` take precedence.
pub fn with_unreadable(
    doc: &AnnotationDocument,
    unreadable: &BTreeMap<String, serde_json::Value>,
) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(doc)?;
    if let serde_json::Value::Object(videos) = &mut value {
        for (id, raw) in unreadable {
            videos.entry(id.clone()).or_insert_with(|| raw.clone());
        }
    }
    Ok(value)
}

/// On-disk encoding of a document, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|s| s.to_str());
        match extension.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => bail!(
                "Unsupported annotation file extension {:?} (expected .json, .yaml or .yml)",
                extension
            ),
        }
    }
}

/// Export a document to YAML format.
pub fn export_yaml<T: Serialize + ?Sized>(doc: &T, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(doc)?;
    atomic_write(path, yaml.as_bytes())
}

/// Export a document to JSON format.
pub fn export_json<T: Serialize + ?Sized>(doc: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(doc)?;
    atomic_write(path, json.as_bytes())
}

/// Export by file extension (`.json`, `.yaml`/`.yml`).
pub fn export<T: Serialize + ?Sized>(doc: &T, path: &Path) -> Result<()> {
    match DocumentFormat::from_path(path)? {
        DocumentFormat::Yaml => export_yaml(doc, path),
        DocumentFormat::Json => export_json(doc, path),
    }
}

/// Import a document by file extension.
pub fn import(path: &Path) -> Result<LoadedDocument> {
    let format = DocumentFormat::from_path(path)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading annotations {}", path.display()))?;
    let loaded = match format {
        DocumentFormat::Yaml => LoadedDocument::from_yaml_str(&text),
        DocumentFormat::Json => LoadedDocument::from_json_str(&text),
    }
    .with_context(|| format!("loading annotations {}", path.display()))?;
    Ok(loaded)
}

/// Replace `path` with `bytes` via a sibling temp file and a rename, so a
/// crash mid-write never leaves a truncated document behind.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "annotations".to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    {
        let mut file = std::fs::File::create(&tmp_path)
            .with_context(|| format!("creating {}", tmp_path.display()))?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e).with_context(|| format!("replacing {}", path.display()));
    }
    Ok(())
}
