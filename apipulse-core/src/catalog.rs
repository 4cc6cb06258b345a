//! API catalogs and their persistence.
//!
//! Two catalogs share one record shape. The `raw` catalog groups records by
//! category under a `categories` key; the `zapier` catalog is a flat array.
//! Records are kept as ordered JSON objects so fields this crate does not
//! know about survive a load/save cycle untouched.

use std::fmt;
use std::fs::Permissions;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PulseError, Result};

/// `status` value marking a record whose URL is confirmed dead.
pub const DEPRECATED: &str = "deprecated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    Raw,
    Zapier,
}

impl CatalogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogSource::Raw => "raw",
            CatalogSource::Zapier => "zapier",
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry describing an external API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiRecord(Map<String, Value>);

impl ApiRecord {
    pub fn new(name: &str, url: Option<&str>) -> Self {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String(name.to_string()));
        if let Some(url) = url {
            fields.insert("url".to_string(), Value::String(url.to_string()));
        }
        Self(fields)
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.set_status(status);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// The record's URL; empty strings count as absent.
    pub fn url(&self) -> Option<&str> {
        self.0
            .get("url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(Value::as_str)
    }

    pub fn is_deprecated(&self) -> bool {
        self.status() == Some(DEPRECATED)
    }

    pub fn set_status(&mut self, status: &str) {
        self.0
            .insert("status".to_string(), Value::String(status.to_string()));
    }

    /// Remove the `status` field, keeping the order of the remaining fields.
    pub fn clear_status(&mut self) {
        self.0.shift_remove("status");
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Category-grouped catalog (`apis-raw.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCatalog {
    pub categories: IndexMap<String, Vec<ApiRecord>>,
    /// Top-level keys other than `categories`, preserved as loaded.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawCatalog {
    pub fn records(&self) -> impl Iterator<Item = &ApiRecord> {
        self.categories.values().flatten()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ApiRecord> {
        self.categories.values_mut().flatten()
    }
}

/// Flat catalog (`apis-zapier.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZapierCatalog {
    pub records: Vec<ApiRecord>,
}

impl ZapierCatalog {
    pub fn records(&self) -> impl Iterator<Item = &ApiRecord> {
        self.records.iter()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ApiRecord> {
        self.records.iter_mut()
    }
}

/// Both catalogs, loaded together and written back together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogs {
    pub raw: RawCatalog,
    pub zapier: ZapierCatalog,
}

impl Catalogs {
    pub fn new(raw: RawCatalog, zapier: ZapierCatalog) -> Self {
        Self { raw, zapier }
    }

    pub fn load(raw_path: &Path, zapier_path: &Path) -> Result<Self> {
        Ok(Self {
            raw: load_json(raw_path)?,
            zapier: load_json(zapier_path)?,
        })
    }

    pub fn save(&self, raw_path: &Path, zapier_path: &Path) -> Result<()> {
        write_json_atomic(raw_path, &self.raw)?;
        write_json_atomic(zapier_path, &self.zapier)?;
        Ok(())
    }

    /// Every record tagged with the catalog it belongs to.
    pub fn records(&self) -> impl Iterator<Item = (CatalogSource, &ApiRecord)> {
        self.raw
            .records()
            .map(|r| (CatalogSource::Raw, r))
            .chain(self.zapier.records().map(|r| (CatalogSource::Zapier, r)))
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = (CatalogSource, &mut ApiRecord)> {
        self.raw
            .records_mut()
            .map(|r| (CatalogSource::Raw, r))
            .chain(
                self.zapier
                    .records_mut()
                    .map(|r| (CatalogSource::Zapier, r)),
            )
    }
}

/// Load and parse a JSON file. Any failure is reported against the path.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let catalog_error = |message: String| PulseError::Catalog {
        path: path.to_path_buf(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| catalog_error(e.to_string()))?;
    let value = serde_json::from_str(&content).map_err(|e| catalog_error(e.to_string()))?;
    debug!(path = %path.display(), bytes = content.len(), "Loaded JSON file");
    Ok(value)
}

/// Pretty-print `value` to `path` via a temp file in the same directory, so a
/// crash mid-write never leaves a truncated file behind.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    write_atomic(path, content.as_bytes())
}

pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    // Temp files are created owner-only; carry over the target's mode instead.
    let permissions = target_permissions(path, file.as_file())?;
    file.as_file().set_permissions(permissions)?;
    file.persist(path).map_err(|e| PulseError::Io(e.error))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}

/// Permissions the rewritten file should carry: the existing file's, or
/// 0644 for a new file.
fn target_permissions(path: &Path, temp: &std::fs::File) -> Result<Permissions> {
    match std::fs::metadata(path) {
        Ok(metadata) => Ok(metadata.permissions()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(new_file_permissions(temp.metadata()?.permissions()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn new_file_permissions(_temp: Permissions) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    Permissions::from_mode(0o644)
}

#[cfg(not(unix))]
fn new_file_permissions(temp: Permissions) -> Permissions {
    temp
}
