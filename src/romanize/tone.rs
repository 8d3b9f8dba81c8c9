use crate::romanize::PhoneticUnit;

pub const NEUTRAL_TONE: u8 = 5;

const VOWEL_BASE: [char; 6] = ['a', 'e', 'i', 'o', 'u', 'ü'];
const TONE_MARKS: [[char; 6]; 4] = [
    ['ā', 'ē', 'ī', 'ō', 'ū', 'ǖ'],
    ['á', 'é', 'í', 'ó', 'ú', 'ǘ'],
    ['ǎ', 'ě', 'ǐ', 'ǒ', 'ǔ', 'ǚ'],
    ['à', 'è', 'ì', 'ò', 'ù', 'ǜ'],
];

/// Put the diacritic for `tone` over the syllable's mark-bearing vowel.
///
/// The first `a`, `e` or `o` takes the mark; failing that the first `i`, `u`
/// or `ü`/`v`. Tone 5 (and 0) leaves the syllable untouched.
pub fn apply_tone_mark(syllable: &str, tone: u8) -> String {
    if syllable.is_empty() || !(1..=4).contains(&tone) {
        return syllable.to_string();
    }
    let chars: Vec<char> = syllable.chars().collect();
    let idx = chars
        .iter()
        .position(|c| matches!(c, 'a' | 'e' | 'o'))
        .or_else(|| chars.iter().position(|c| matches!(c, 'i' | 'u' | 'ü' | 'v')));
    let Some(idx) = idx else {
        return syllable.to_string();
    };
    let vowel = if chars[idx] == 'v' { 'ü' } else { chars[idx] };
    let Some(base) = VOWEL_BASE.iter().position(|&v| v == vowel) else {
        return syllable.to_string();
    };

    let mut marked = chars;
    marked[idx] = TONE_MARKS[tone as usize - 1][base];
    marked.into_iter().collect()
}

/// Parse a numeric-tone code (`ni3`, `lü4`, `ma`) into a phonetic unit.
///
/// A trailing `0` and a missing digit both mean the neutral tone. Returns
/// `None` when the syllable part is empty or not made of Latin letters.
pub fn split_syllable(code: &str) -> Option<PhoneticUnit> {
    let code = code.trim();
    let (body, tone) = match code.chars().last()?.to_digit(10) {
        Some(d) if d <= 5 => (&code[..code.len() - 1], d as u8),
        Some(_) => return None,
        None => (code, NEUTRAL_TONE),
    };
    let tone = if tone == 0 { NEUTRAL_TONE } else { tone };

    let plain: String = body
        .to_lowercase()
        .chars()
        .map(|c| if c == 'ü' { 'v' } else { c })
        .collect();
    if plain.is_empty() || !plain.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    let normalized = plain.replacen('v', "ü", 1);
    let display = apply_tone_mark(&normalized, tone);

    Some(PhoneticUnit {
        code: format!("{plain}{tone}"),
        plain,
        normalized,
        tone,
        display,
    })
}
