use crate::error::ValidationError;
use crate::romanize::{Answer, NEUTRAL_TONE, PhoneticUnit};

/// Result of comparing one submission against the expected unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    /// The answer as recorded in history, e.g. `ni 3`.
    pub user_answer: String,
}

/// Validate and evaluate a submission. Validation failures are returned
/// before anything is compared so callers can re-prompt without recording.
pub fn evaluate(
    unit: &PhoneticUnit,
    text: &str,
    selected_tone: Option<u8>,
) -> Result<Verdict, ValidationError> {
    let answer = Answer::parse(text);
    if answer.syllable.is_empty() {
        return Err(ValidationError::MissingSyllable);
    }

    let tone = answer.tone_or(selected_tone);
    if unit.tone_required() {
        let Some(tone) = tone else {
            return Err(ValidationError::MissingTone);
        };
        let correct = answer.syllable == unit.plain && tone == unit.tone;
        Ok(Verdict {
            correct,
            user_answer: format!("{} {}", answer.syllable, tone),
        })
    } else {
        if tone.is_some_and(|t| t != NEUTRAL_TONE) {
            return Err(ValidationError::UnexpectedTone);
        }
        Ok(Verdict {
            correct: answer.syllable == unit.plain,
            user_answer: answer.syllable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::romanize::split_syllable;

    fn unit(code: &str) -> PhoneticUnit {
        split_syllable(code).unwrap()
    }

    #[test]
    fn syllable_and_tone_must_match() {
        let ni3 = unit("ni3");
        assert!(evaluate(&ni3, "ni", Some(3)).unwrap().correct);
        assert!(!evaluate(&ni3, "ni", Some(2)).unwrap().correct);
        assert!(!evaluate(&ni3, "li", Some(3)).unwrap().correct);
        assert_eq!(evaluate(&ni3, "ni", Some(2)).unwrap().user_answer, "ni 2");
    }

    #[test]
    fn typed_tones_count_as_selection() {
        let ni3 = unit("ni3");
        assert!(evaluate(&ni3, "ni3", None).unwrap().correct);
        assert!(evaluate(&ni3, "nǐ", None).unwrap().correct);
        assert!(evaluate(&ni3, " NI 3 ", None).unwrap().correct);
        // The explicit selection wins.
        assert!(!evaluate(&ni3, "ni3", Some(1)).unwrap().correct);
    }

    #[test]
    fn umlaut_spellings_fold_together() {
        let lv4 = unit("lv4");
        assert!(evaluate(&lv4, "lv", Some(4)).unwrap().correct);
        assert!(evaluate(&lv4, "lü", Some(4)).unwrap().correct);
        assert!(evaluate(&lv4, "lǜ", None).unwrap().correct);
    }

    #[test]
    fn validation_errors() {
        let ni3 = unit("ni3");
        assert_eq!(
            evaluate(&ni3, "   ", Some(3)),
            Err(ValidationError::MissingSyllable)
        );
        assert_eq!(evaluate(&ni3, "ni", None), Err(ValidationError::MissingTone));

        let ma5 = unit("ma5");
        assert_eq!(
            evaluate(&ma5, "ma", Some(1)),
            Err(ValidationError::UnexpectedTone)
        );
    }

    #[test]
    fn neutral_tone_needs_only_the_syllable() {
        let ma5 = unit("ma");
        assert!(evaluate(&ma5, "ma", None).unwrap().correct);
        assert!(evaluate(&ma5, "ma0", None).unwrap().correct);
        assert!(!evaluate(&ma5, "me", None).unwrap().correct);
    }
}
