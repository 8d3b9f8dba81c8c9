use icu_normalizer::DecomposingNormalizerBorrowed;

const MACRON: char = '\u{0304}';
const ACUTE: char = '\u{0301}';
const CARON: char = '\u{030C}';
const GRAVE: char = '\u{0300}';
const DIAERESIS: char = '\u{0308}';

/// A learner's typed answer, folded to the compact syllable form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Answer {
    pub syllable: String,
    /// Tone written into the text itself, either as a mark (`nǐ`) or a
    /// trailing digit (`ni3`).
    pub typed_tone: Option<u8>,
}

impl Answer {
    pub fn parse(raw: &str) -> Self {
        let nfd = DecomposingNormalizerBorrowed::new_nfd();
        let lowered = raw.trim().to_lowercase();
        let decomposed = nfd.normalize(&lowered);

        let mut syllable = String::with_capacity(decomposed.len());
        let mut typed_tone = None;
        for ch in decomposed.chars() {
            match ch {
                MACRON => typed_tone = Some(1),
                ACUTE => typed_tone = Some(2),
                CARON => typed_tone = Some(3),
                GRAVE => typed_tone = Some(4),
                DIAERESIS => {
                    if syllable.ends_with('u') {
                        syllable.pop();
                        syllable.push('v');
                    }
                }
                c if c.is_whitespace() => {}
                c => syllable.push(c),
            }
        }

        if let Some(d) = syllable.chars().last().and_then(|c| c.to_digit(10)) {
            syllable.pop();
            if typed_tone.is_none() {
                typed_tone = Some(if d == 0 { 5 } else { d as u8 });
            }
        }

        Self {
            syllable,
            typed_tone,
        }
    }

    /// An explicit selection always wins over a tone typed into the text.
    pub fn tone_or(&self, selected: Option<u8>) -> Option<u8> {
        selected.or(self.typed_tone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_trimmed_and_lowercased() {
        let answer = Answer::parse("  Ni ");
        assert_eq!(answer.syllable, "ni");
        assert_eq!(answer.typed_tone, None);
    }

    #[test]
    fn tone_marks_become_typed_tone() {
        assert_eq!(Answer::parse("nǐ").typed_tone, Some(3));
        assert_eq!(Answer::parse("mā").typed_tone, Some(1));
        assert_eq!(Answer::parse("hé").typed_tone, Some(2));
        assert_eq!(Answer::parse("shì").syllable, "shi");
    }

    #[test]
    fn umlaut_folds_to_v() {
        assert_eq!(Answer::parse("lü").syllable, "lv");
        let marked = Answer::parse("nǚ");
        assert_eq!(marked.syllable, "nv");
        assert_eq!(marked.typed_tone, Some(3));
        assert_eq!(Answer::parse("lv").syllable, "lv");
    }

    #[test]
    fn trailing_digit_is_a_tone() {
        let answer = Answer::parse("hao3");
        assert_eq!(answer.syllable, "hao");
        assert_eq!(answer.typed_tone, Some(3));
        assert_eq!(Answer::parse("ma0").typed_tone, Some(5));
    }

    #[test]
    fn selection_overrides_typed_tone() {
        let answer = Answer::parse("nǐ");
        assert_eq!(answer.tone_or(Some(2)), Some(2));
        assert_eq!(answer.tone_or(None), Some(3));
    }

    #[test]
    fn empty_input_gives_empty_syllable() {
        assert!(Answer::parse("   ").syllable.is_empty());
    }
}
