use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::audio::catalog::Catalog;
use crate::romanize::PhoneticUnit;

/// A playable recording: catalog key plus the location it is fetched from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioRef {
    pub key: String,
    pub url: String,
}

/// Lazily maps phonetic units to recordings.
///
/// The catalog index is built up front; the handle for a given unit code is
/// built on first request and memoized, misses included. Repeated calls for
/// the same code never redo the work.
pub struct AudioResolver {
    catalog: Catalog,
    base_url: String,
    memo: RefCell<HashMap<String, Option<AudioRef>>>,
    resolutions: Cell<usize>,
}

impl AudioResolver {
    pub fn new(catalog: Catalog, base_url: impl Into<String>) -> Self {
        Self {
            catalog,
            base_url: base_url.into(),
            memo: RefCell::new(HashMap::new()),
            resolutions: Cell::new(0),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resolve(&self, unit: &PhoneticUnit) -> Option<AudioRef> {
        if let Some(cached) = self.memo.borrow().get(&unit.code) {
            return cached.clone();
        }
        self.resolutions.set(self.resolutions.get() + 1);
        let resolved = self.catalog.get(&unit.code).map(|entry| AudioRef {
            key: entry.key(),
            url: join_resource(&self.base_url, &entry.resource),
        });
        if resolved.is_none() {
            tracing::debug!(code = %unit.code, "no recording in catalog");
        }
        self.memo
            .borrow_mut()
            .insert(unit.code.clone(), resolved.clone());
        resolved
    }

    /// Every recording URL in the catalog, for batch preloading.
    pub fn all_urls(&self) -> Vec<String> {
        self.catalog
            .entries()
            .iter()
            .map(|e| join_resource(&self.base_url, &e.resource))
            .collect()
    }

    /// Number of distinct codes actually looked up so far.
    pub fn resolutions(&self) -> usize {
        self.resolutions.get()
    }
}

pub fn join_resource(base: &str, resource: &str) -> String {
    if base.is_empty() {
        return resource.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches(['/', '\\']),
        resource.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::romanize::split_syllable;

    fn resolver() -> AudioResolver {
        AudioResolver::new(
            Catalog::from_file_names(["ni3.mp3", "hao3.mp3"]),
            "https://cdn.example/audio/",
        )
    }

    #[test]
    fn resolves_catalog_entries() {
        let r = resolver();
        let audio = r.resolve(&split_syllable("ni3").unwrap()).unwrap();
        assert_eq!(audio.key, "ni3");
        assert_eq!(audio.url, "https://cdn.example/audio/ni3.mp3");
    }

    #[test]
    fn missing_entry_yields_none() {
        let r = resolver();
        assert!(r.resolve(&split_syllable("ma5").unwrap()).is_none());
    }

    #[test]
    fn resolves_each_code_once() {
        let r = resolver();
        let ni = split_syllable("ni3").unwrap();
        let ma = split_syllable("ma5").unwrap();
        let first = r.resolve(&ni);
        for _ in 0..5 {
            assert_eq!(r.resolve(&ni), first);
            assert!(r.resolve(&ma).is_none());
        }
        // Distinct unit instances with the same code share the memo entry.
        assert_eq!(r.resolve(&ni.clone()), first);
        assert_eq!(r.resolutions(), 2);
    }

    #[test]
    fn join_handles_slashes() {
        assert_eq!(join_resource("/data/audio", "ni3.mp3"), "/data/audio/ni3.mp3");
        assert_eq!(join_resource("", "ni3.mp3"), "ni3.mp3");
        assert_eq!(join_resource("http://x/", "/a1.mp3"), "http://x/a1.mp3");
    }

    #[test]
    fn all_urls_covers_catalog() {
        assert_eq!(resolver().all_urls().len(), 2);
    }
}
