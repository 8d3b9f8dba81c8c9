use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::assets::Assets;
use crate::romanize::{PhoneticUnit, split_syllable};

const DEFAULT_MANIFEST: &str = "catalog.json";

/// One recorded syllable: `ni` + tone `3` → `ni3.mp3`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub syllable: String,
    pub tone: u8,
    pub resource: String,
}

impl CatalogEntry {
    pub fn key(&self) -> String {
        format!("{}{}", self.syllable, self.tone)
    }

    pub fn to_unit(&self) -> Option<PhoneticUnit> {
        split_syllable(&self.key())
    }

    /// Parse a recording file name such as `ni3.mp3`. The last character of
    /// the stem must be a tone digit 1-5 and the syllable must be pinyin.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let file = name.rsplit(['/', '\\']).next()?;
        let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
        let tone = stem.chars().last()?.to_digit(10)? as u8;
        Self {
            syllable: stem[..stem.len() - 1].to_string(),
            tone,
            resource: file.to_string(),
        }
        .normalized()
    }

    /// Lower-cases the syllable and spells `ü` as `v`, so the key matches
    /// `PhoneticUnit::code`. `None` for tones outside 1-5 or non-pinyin text.
    fn normalized(self) -> Option<Self> {
        if !(1..=5).contains(&self.tone) {
            return None;
        }
        let unit = split_syllable(&self.key())?;
        Some(Self {
            syllable: unit.plain,
            ..self
        })
    }
}

/// The fixed syllable+tone → resource index, built once at startup.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut entries: Vec<CatalogEntry> = entries
            .into_iter()
            .filter_map(|e| {
                let key = e.key();
                let entry = e.normalized();
                if entry.is_none() {
                    tracing::debug!(%key, "skipping invalid catalog entry");
                }
                entry
            })
            .collect();
        entries.sort_by(|a, b| a.syllable.cmp(&b.syllable).then(a.tone.cmp(&b.tone)));
        entries.dedup_by(|a, b| a.syllable == b.syllable && a.tone == b.tone);
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.key(), i))
            .collect();
        Self { entries, index }
    }

    pub fn from_file_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = names
            .into_iter()
            .filter_map(|n| {
                let entry = CatalogEntry::from_file_name(n.as_ref());
                if entry.is_none() {
                    tracing::debug!(name = n.as_ref(), "skipping malformed catalog file name");
                }
                entry
            })
            .collect();
        Self::new(entries)
    }

    pub fn from_manifest_str(json: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(json).context("invalid catalog manifest")?;
        Ok(Self::new(entries))
    }

    /// The manifest compiled into the binary.
    pub fn embedded() -> Self {
        Assets::text(DEFAULT_MANIFEST)
            .and_then(|json| Self::from_manifest_str(&json).ok())
            .unwrap_or_default()
    }

    /// Load from `path` when given, otherwise the embedded manifest.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("failed to read catalog {}", path.display()))?;
                Self::from_manifest_str(&json)
            }
            None => Ok(Self::embedded()),
        }
    }

    /// Build from the recordings present in `dir`.
    pub fn scan_dir(dir: &Path, suffix: &str) -> Result<Self> {
        let names: Vec<String> = fs::read_dir(dir)
            .with_context(|| format!("failed to read {}", dir.display()))?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.ends_with(suffix))
            .collect();
        Ok(Self::from_file_names(names))
    }

    pub fn to_manifest_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn get(&self, key: &str) -> Option<&CatalogEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
