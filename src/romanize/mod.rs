pub mod answer;
pub mod resolver;
pub mod tone;

use serde::{Deserialize, Serialize};

pub use answer::Answer;
pub use resolver::{HanziRomanizer, Romanizer, TableRomanizer, resolve};
pub use tone::{NEUTRAL_TONE, apply_tone_mark, split_syllable};

/// One syllable with its tone, in compact (`lv4`) and display (`lǜ`) forms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneticUnit {
    pub code: String,
    pub plain: String,
    pub normalized: String,
    pub tone: u8,
    pub display: String,
}

impl PhoneticUnit {
    /// Neutral-tone syllables are checked on the syllable alone.
    pub fn tone_required(&self) -> bool {
        self.tone != NEUTRAL_TONE
    }
}

/// One trainable word or character and its syllables, in reading order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillItem {
    #[serde(default)]
    pub id: String,
    #[serde(alias = "char")]
    pub text: String,
    #[serde(default, alias = "syllables")]
    pub units: Vec<PhoneticUnit>,
    #[serde(default)]
    pub display: String,
}

impl DrillItem {
    pub fn new(text: &str, units: Vec<PhoneticUnit>) -> Self {
        Self {
            id: item_id(text, &units),
            text: text.to_string(),
            display: units
                .iter()
                .map(|u| u.display.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            units,
        }
    }

    /// Stored entries from older sessions may carry only their text.
    pub fn is_resolved(&self) -> bool {
        !self.units.is_empty() && !self.text.is_empty()
    }
}

pub fn item_id(text: &str, units: &[PhoneticUnit]) -> String {
    let codes: String = units.iter().map(|u| u.code.as_str()).collect();
    format!("{text}-{codes}")
}
