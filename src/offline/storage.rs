use std::fs;
use std::io::Write;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

/// Root directory holding one subdirectory per named cache.
#[derive(Clone, Debug)]
pub struct CacheStorage {
    base_dir: PathBuf,
}

impl CacheStorage {
    pub fn new() -> Option<Self> {
        let base = dirs::cache_dir()?.join("tingli");
        Self::with_base_dir(base).ok()
    }

    pub fn with_base_dir(base_dir: PathBuf) -> std::io::Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn open(&self, name: &str) -> std::io::Result<DiskCache> {
        let dir = self.base_dir.join(sanitize_key(name));
        fs::create_dir_all(&dir)?;
        Ok(DiskCache { dir })
    }

    pub fn has(&self, name: &str) -> bool {
        self.base_dir.join(sanitize_key(name)).is_dir()
    }

    /// Names of every cache currently on disk, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.base_dir)
            .map(|rd| {
                rd.filter_map(|e| e.ok())
                    .filter(|e| e.path().is_dir())
                    .filter_map(|e| e.file_name().into_string().ok())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn delete(&self, name: &str) -> bool {
        fs::remove_dir_all(self.base_dir.join(sanitize_key(name))).is_ok()
    }

    /// Look `url` up in every cache.
    pub fn match_any(&self, url: &str) -> Option<Vec<u8>> {
        self.keys().into_iter().find_map(|name| {
            let cache = DiskCache {
                dir: self.base_dir.join(name),
            };
            cache.get(url)
        })
    }
}

/// One named cache: a directory of response bodies keyed by URL.
#[derive(Clone, Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        fs::read(self.dir.join(entry_file_name(url))).ok()
    }

    pub fn put(&self, url: &str, body: &[u8]) -> bool {
        let path = self.dir.join(entry_file_name(url));
        let tmp_path = path.with_extension("part");
        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(body)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &path)
        })();
        if written.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        written.is_ok()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.dir.join(entry_file_name(url)).is_file()
    }
}

/// File name for a cached URL: a SHA-256 prefix keeps distinct URLs apart,
/// the sanitized last segment keeps the directory readable.
fn entry_file_name(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let tail = url.rsplit(['/', '\\']).next().unwrap_or_default();
    let tail: String = sanitize_key(tail).chars().take(48).collect();
    format!("{}-{tail}", &digest[..32])
}

fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, CacheStorage) {
        let dir = TempDir::new().unwrap();
        let storage = CacheStorage::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, storage)
    }

    #[test]
    fn put_then_get() {
        let (_dir, storage) = storage();
        let cache = storage.open("tingli-audio-v1").unwrap();
        assert!(cache.get("https://x/ni3.mp3").is_none());
        assert!(cache.put("https://x/ni3.mp3", b"abc"));
        assert_eq!(cache.get("https://x/ni3.mp3").unwrap(), b"abc");
        assert!(cache.contains("https://x/ni3.mp3"));
    }

    #[test]
    fn distinct_urls_never_share_an_entry() {
        let (_dir, storage) = storage();
        let cache = storage.open("tingli-audio-v1").unwrap();
        assert!(cache.put("https://x/a/b.mp3", b"nested"));
        assert!(cache.put("https://x/a_b.mp3", b"flat"));
        assert_eq!(cache.get("https://x/a/b.mp3").unwrap(), b"nested");
        assert_eq!(cache.get("https://x/a_b.mp3").unwrap(), b"flat");
        assert_ne!(
            entry_file_name("https://x/a/b.mp3"),
            entry_file_name("https://x/a_b.mp3")
        );
        assert!(entry_file_name("https://x/a/b.mp3").ends_with("-b.mp3"));
    }

    #[test]
    fn keys_and_delete() {
        let (_dir, storage) = storage();
        storage.open("b").unwrap();
        storage.open("a").unwrap();
        assert_eq!(storage.keys(), vec!["a".to_string(), "b".to_string()]);
        assert!(storage.delete("a"));
        assert!(!storage.has("a"));
        assert_eq!(storage.keys(), vec!["b".to_string()]);
    }

    #[test]
    fn match_any_searches_all_caches() {
        let (_dir, storage) = storage();
        storage.open("static").unwrap();
        let audio = storage.open("audio").unwrap();
        audio.put("ni3.mp3", b"x");
        assert_eq!(storage.match_any("ni3.mp3").unwrap(), b"x");
        assert!(storage.match_any("hao3.mp3").is_none());
    }
}
