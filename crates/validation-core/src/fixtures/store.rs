//! Loading and writing fixture files.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use chain_validation_types::Cid;

use super::{sanitize_test_name, FixtureChannel, FixtureFile};

/// Everything recorded for one test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureEntry {
    pub gas: Vec<i64>,
    pub state_roots: Vec<Cid>,
}

impl FixtureEntry {
    pub fn is_empty(&self) -> bool {
        self.gas.is_empty() && self.state_roots.is_empty()
    }
}

/// Read-only view of every fixture under a root, loaded once.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    root: Option<PathBuf>,
    entries: BTreeMap<String, FixtureEntry>,
}

impl FixtureStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a store from in-memory entries, keyed by (unsanitized) test name.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, FixtureEntry)>) -> Self {
        Self {
            root: None,
            entries: entries
                .into_iter()
                .map(|(name, entry)| (sanitize_test_name(&name), entry))
                .collect(),
        }
    }

    /// Read both channel directories under `root`.
    ///
    /// A missing root or channel directory yields no entries for it.
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut entries: BTreeMap<String, FixtureEntry> = BTreeMap::new();

        for (name, values) in read_channel::<i64>(root, FixtureChannel::Gas)? {
            entries.entry(name).or_default().gas = values;
        }
        for (name, values) in read_channel::<Cid>(root, FixtureChannel::StateRoot)? {
            entries.entry(name).or_default().state_roots = values;
        }

        debug!(root = %root.display(), tests = entries.len(), "loaded fixtures");
        Ok(Self {
            root: Some(root.to_path_buf()),
            entries,
        })
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn get(&self, test_name: &str) -> Option<&FixtureEntry> {
        self.entries.get(&sanitize_test_name(test_name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sanitized names of every test with a fixture.
    pub fn test_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn read_channel<T: DeserializeOwned>(
    root: &Path,
    channel: FixtureChannel,
) -> Result<Vec<(String, Vec<T>)>> {
    let dir = root.join(channel.dir_name());
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "fixture channel directory missing");
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    let listing = std::fs::read_dir(&dir)
        .map_err(|e| anyhow!("Failed to list {}: {}", dir.display(), e))?;
    for entry in listing {
        let path = entry?.path();
        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
        let file: FixtureFile<T> = serde_json::from_str(&content)
            .with_context(|| format!("malformed fixture file {}", path.display()))?;
        out.push((stem, file.values));
    }
    Ok(out)
}

/// Writes whole fixture entries under a root.
#[derive(Debug, Clone)]
pub struct FixtureWriter {
    root: PathBuf,
}

impl FixtureWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, channel: FixtureChannel, test_name: &str) -> PathBuf {
        self.root
            .join(channel.dir_name())
            .join(format!("{}.json", sanitize_test_name(test_name)))
    }

    /// Replace both channel files of `test_name`.
    ///
    /// Both temp files are written before either is renamed into place; on
    /// any write failure the previous entry is left untouched.
    pub fn write(&self, test_name: &str, entry: &FixtureEntry) -> Result<()> {
        let recorded_at = Utc::now();
        let gas = encode_channel(&FixtureFile {
            test: test_name.to_string(),
            recorded_at,
            values: entry.gas.clone(),
        })?;
        let roots = encode_channel(&FixtureFile {
            test: test_name.to_string(),
            recorded_at,
            values: entry.state_roots.clone(),
        })?;

        let staged = [
            (self.path(FixtureChannel::Gas, test_name), gas),
            (self.path(FixtureChannel::StateRoot, test_name), roots),
        ];
        let mut temps = Vec::with_capacity(staged.len());
        for (path, contents) in &staged {
            match stage(path, contents) {
                Ok(tmp) => temps.push((tmp, path)),
                Err(e) => {
                    discard(temps.iter().map(|(tmp, _)| tmp));
                    return Err(e);
                }
            }
        }

        for (index, (tmp, path)) in temps.iter().enumerate() {
            if let Err(e) = std::fs::rename(tmp, path) {
                discard(temps[index..].iter().map(|(tmp, _)| tmp));
                return Err(anyhow!(
                    "Failed to rename {} to {}: {}",
                    tmp.display(),
                    path.display(),
                    e
                ));
            }
        }
        debug!(test = test_name, values = entry.gas.len(), "wrote fixture");
        Ok(())
    }
}

fn encode_channel<T: Serialize>(file: &FixtureFile<T>) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(file).map_err(|e| anyhow!("Failed to serialize fixture: {}", e))
}

/// Write `contents` to `<path>.tmp` and return the temp path.
fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| anyhow!("Failed to create directory {}: {}", parent.display(), e))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents)
        .map_err(|e| anyhow!("Failed to write temp file {}: {}", tmp_path.display(), e))?;
    Ok(tmp_path)
}

fn discard<'a>(temps: impl Iterator<Item = &'a PathBuf>) {
    for tmp in temps {
        if let Err(e) = std::fs::remove_file(tmp) {
            warn!(path = %tmp.display(), "failed to remove temp fixture: {}", e);
        }
    }
}
