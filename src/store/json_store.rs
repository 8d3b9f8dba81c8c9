use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;
use serde_json::Value;

use crate::config::Config;
use crate::error::StorageError;
use crate::store::schema::{
    EXPORT_VERSION, ExportData, LISTENING_KEY, ListeningData, PHONETIC_KEY, PhoneticData,
};
use crate::store::{KvStore, load_or_default};

const KEYS: [&str; 2] = [LISTENING_KEY, PHONETIC_KEY];

/// One pretty-printed JSON file per key in the data directory.
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tingli");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    fn file_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }

    /// Bundle all persisted progress + config into an ExportData struct.
    pub fn export_all(&self, config: &Config) -> ExportData {
        ExportData {
            tingli_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            config: config.clone(),
            listening: load_or_default::<ListeningData>(self, LISTENING_KEY),
            phonetic: load_or_default::<PhoneticData>(self, PHONETIC_KEY),
        }
    }

    /// Transactional import: two-phase commit with best-effort .bak rollback.
    ///
    /// Stage phase: write all data to .tmp files. If any fails, clean up and bail.
    /// Commit phase: for each file, rename original to .bak, then .tmp to final.
    /// On commit failure, attempt to restore .bak files and clean up .tmp files.
    /// After success, delete .bak files.
    pub fn import_all(&self, data: &ExportData) -> Result<()> {
        if data.tingli_export_version != EXPORT_VERSION {
            bail!(
                "Unsupported export version: {} (expected {})",
                data.tingli_export_version,
                EXPORT_VERSION
            );
        }

        let files: Vec<(&str, String)> = vec![
            (LISTENING_KEY, serde_json::to_string_pretty(&data.listening)?),
            (PHONETIC_KEY, serde_json::to_string_pretty(&data.phonetic)?),
        ];

        let mut staged: Vec<PathBuf> = Vec::new();
        for (key, json) in &files {
            let tmp_path = self.file_path(key).with_extension("json.tmp");
            match write_synced(&tmp_path, json.as_bytes()) {
                Ok(()) => staged.push(tmp_path),
                Err(e) => {
                    for tmp in &staged {
                        let _ = fs::remove_file(tmp);
                    }
                    bail!("Import failed during staging: {e}");
                }
            }
        }

        // (final_path, bak_path, had_original) so rollback can restore absence
        let mut committed: Vec<(PathBuf, PathBuf, bool)> = Vec::new();
        for (i, (key, _)) in files.iter().enumerate() {
            let final_path = self.file_path(key);
            let bak_path = final_path.with_extension("json.bak");
            let had_original = final_path.exists();

            if had_original && let Err(e) = fs::rename(&final_path, &bak_path) {
                rollback(&committed);
                for tmp in &staged {
                    let _ = fs::remove_file(tmp);
                }
                bail!("Import failed during commit (backup): {e}");
            }

            if let Err(e) = fs::rename(&staged[i], &final_path) {
                if had_original && bak_path.exists() {
                    let _ = fs::rename(&bak_path, &final_path);
                } else {
                    let _ = fs::remove_file(&final_path);
                }
                rollback(&committed);
                for tmp in &staged[i + 1..] {
                    let _ = fs::remove_file(tmp);
                }
                bail!("Import failed during commit (rename): {e}");
            }

            committed.push((final_path, bak_path, had_original));
        }

        for (_, bak_path, had_original) in &committed {
            if *had_original {
                let _ = fs::remove_file(bak_path);
            }
        }

        Ok(())
    }

    /// Check for leftovers of an interrupted import. A backup whose final
    /// file is missing is the only copy of that progress and is moved back;
    /// otherwise backups and staged files are removed.
    /// Returns true if recovery files were found.
    pub fn check_interrupted_import(&self) -> bool {
        let mut found = false;
        for key in KEYS {
            let final_path = self.file_path(key);
            let bak_path = final_path.with_extension("json.bak");
            let tmp_path = final_path.with_extension("json.tmp");
            if bak_path.exists() {
                found = true;
                if final_path.exists() {
                    let _ = fs::remove_file(&bak_path);
                } else if let Err(e) = fs::rename(&bak_path, &final_path) {
                    tracing::warn!(%key, error = %e, "could not restore backup");
                }
            }
            if tmp_path.exists() {
                found = true;
                let _ = fs::remove_file(&tmp_path);
            }
        }
        found
    }
}

impl KvStore for JsonStore {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.file_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let path = self.file_path(key);
        let tmp_path = path.with_extension("tmp");
        let json = serde_json::to_string_pretty(value)?;
        write_synced(&tmp_path, json.as_bytes())?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.file_path(key)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn rollback(committed: &[(PathBuf, PathBuf, bool)]) {
    for (final_path, bak_path, had_original) in committed {
        if *had_original {
            let _ = fs::rename(bak_path, final_path);
        } else {
            let _ = fs::remove_file(final_path);
        }
    }
}
