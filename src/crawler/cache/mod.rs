
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};

use super::{FAILED_STATUS_MESSAGE, TRANSPORT_ERROR_PREFIX};
use crate::Result;

/// URL to cleaned page text, persisted as a JSON object.
///
/// Only successful fetches are stored. The file is rewritten as a whole on
/// [`ContentCache::save`] through a temporary file and a rename, so a reader
/// never observes a partially written cache. A single writer per run is
/// assumed.
#[derive(Debug, Default)]
pub struct ContentCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    dirty: bool,
}

impl ContentCache {
    /// Load the cache at `path`, or start empty if the file does not exist
    #[inline]
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!("No content cache at {}, starting empty", path.display());
            return Ok(Self {
                path,
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read content cache: {}", path.display()))?;
        let mut entries: BTreeMap<String, String> = serde_json::from_str(&content)?;

        // Older caches stored failure messages as page text
        let before = entries.len();
        entries.retain(|_, text| !is_failure_text(text));
        let dropped = before - entries.len();
        if dropped > 0 {
            warn!(
                "Dropped {} cached failure entries from {}",
                dropped,
                path.display()
            );
        }

        info!(
            "Loaded {} cached pages from {}",
            entries.len(),
            path.display()
        );
        Ok(Self {
            path,
            entries,
            dirty: dropped > 0,
        })
    }

    #[inline]
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    #[inline]
    pub fn insert(&mut self, url: impl Into<String>, text: impl Into<String>) {
        self.entries.insert(url.into(), text.into());
        self.dirty = true;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the cache if it changed since it was loaded
    #[inline]
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            debug!("Content cache unchanged, not writing");
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write content cache: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to move content cache into place: {}",
                self.path.display()
            )
        })?;

        self.dirty = false;
        info!(
            "Saved {} cached pages to {}",
            self.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

fn is_failure_text(text: &str) -> bool {
    text == FAILED_STATUS_MESSAGE || text.starts_with(TRANSPORT_ERROR_PREFIX)
}
