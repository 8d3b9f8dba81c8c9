use std::collections::HashMap;

use pinyin::ToPinyin;

use crate::romanize::{DrillItem, PhoneticUnit, split_syllable};

/// Source of numeric-tone syllable codes (`ni3`, `hao3`) for a piece of text.
pub trait Romanizer {
    fn syllable_codes(&self, text: &str) -> Vec<String>;
}

/// Per-character readings from the bundled pinyin tables. Characters without
/// a reading (punctuation, Latin letters, whitespace) are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct HanziRomanizer;

impl Romanizer for HanziRomanizer {
    fn syllable_codes(&self, text: &str) -> Vec<String> {
        text.to_pinyin()
            .flatten()
            .map(|p| p.with_tone_num_end().to_string())
            .collect()
    }
}

/// Fixed character → code table. Characters missing from the table are
/// skipped, mirroring [`HanziRomanizer`].
#[derive(Clone, Debug, Default)]
pub struct TableRomanizer {
    table: HashMap<char, String>,
}

impl TableRomanizer {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (char, S)>,
        S: Into<String>,
    {
        Self {
            table: entries.into_iter().map(|(c, s)| (c, s.into())).collect(),
        }
    }
}

impl Romanizer for TableRomanizer {
    fn syllable_codes(&self, text: &str) -> Vec<String> {
        text.chars()
            .filter_map(|c| self.table.get(&c).cloned())
            .collect()
    }
}

/// Turn source texts into drill items. Best-effort: blank entries and entries
/// without a single derivable syllable are dropped, order is preserved.
pub fn resolve<S: AsRef<str>>(romanizer: &dyn Romanizer, texts: &[S]) -> Vec<DrillItem> {
    texts
        .iter()
        .filter_map(|raw| resolve_one(romanizer, raw.as_ref()))
        .collect()
}

pub fn resolve_one(romanizer: &dyn Romanizer, raw: &str) -> Option<DrillItem> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let units: Vec<PhoneticUnit> = romanizer
        .syllable_codes(text)
        .iter()
        .filter_map(|code| split_syllable(code))
        .collect();
    if units.is_empty() {
        tracing::debug!(text, "no romanization derived; dropping entry");
        return None;
    }
    Some(DrillItem::new(text, units))
}

/// Split a comma-separated character list (`你,好, 妈`) into entries.
pub fn split_source_list(input: &str) -> Vec<String> {
    input
        .split([',', '，'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
