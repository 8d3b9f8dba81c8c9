use serde::Deserialize;

use crate::assets::Assets;
use crate::romanize::resolver::split_source_list;

const PRESETS_FILE: &str = "presets.json";

/// A read-only character list shipped with the binary.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub chars: String,
}

impl Preset {
    pub fn characters(&self) -> Vec<String> {
        split_source_list(&self.chars)
    }
}

pub fn all() -> Vec<Preset> {
    let Some(json) = Assets::text(PRESETS_FILE) else {
        tracing::warn!("embedded presets missing");
        return Vec::new();
    };
    serde_json::from_str(&json).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "embedded presets unreadable");
        Vec::new()
    })
}

pub fn find(id: &str) -> Option<Preset> {
    all().into_iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_presets_load() {
        let presets = all();
        assert!(presets.len() >= 3);
        assert!(presets.iter().all(|p| !p.characters().is_empty()));
    }

    #[test]
    fn find_by_id() {
        let preset = find("dictation-1").unwrap();
        assert_eq!(preset.characters()[0], "你");
        assert!(find("missing").is_none());
    }
}
