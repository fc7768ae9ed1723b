//! Character-level perturbation of the question.
//!
//! The initial answer is produced from a lightly scrambled copy of the
//! question (swapped case, accents, leetspeak, dropped vowels) so that the
//! model does not simply recall a memorised reply. The mapping from each
//! altered word back to its original lets callers undo the damage in text
//! that echoes the perturbed words.

use rand::seq::{index, SliceRandom};
use rand::Rng;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PerturbError {
    #[error("Percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(u32),
}

/// Modified word → original word.
pub type WordMapping = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    SwapCase,
    Diacritic,
    Leetspeak,
    RemoveVowel,
}

const MUTATIONS: [Mutation; 4] = [
    Mutation::SwapCase,
    Mutation::Diacritic,
    Mutation::Leetspeak,
    Mutation::RemoveVowel,
];

/// Combining marks: grave, acute, circumflex, tilde, diaeresis, macron,
/// breve, dot above, ring above, double acute.
const DIACRITICS: [char; 10] = [
    '\u{300}', '\u{301}', '\u{302}', '\u{303}', '\u{308}', '\u{304}', '\u{306}', '\u{307}',
    '\u{30A}', '\u{30B}',
];

const WORD_TRAILING_PUNCT: &[char] = &['.', ',', '!', '?'];

fn leet(c: char) -> Option<char> {
    Some(match c.to_ascii_lowercase() {
        'a' => '4',
        'e' => '3',
        'i' | 'l' => '1',
        'o' => '0',
        's' => '5',
        't' => '7',
        'b' => '8',
        'g' => '9',
        _ => return None,
    })
}

fn swap_case(slot: &str) -> String {
    slot.chars()
        .flat_map(|c| {
            if c.is_lowercase() {
                c.to_uppercase().collect::<Vec<_>>()
            } else if c.is_uppercase() {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![c]
            }
        })
        .collect()
}

/// Single-character view of a slot, if it still holds exactly one char.
fn single(slot: &str) -> Option<char> {
    let mut chars = slot.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn apply<R: Rng + ?Sized>(mutation: Mutation, slot: &mut String, rng: &mut R) {
    match mutation {
        Mutation::SwapCase => *slot = swap_case(slot),
        Mutation::Diacritic => {
            if slot.chars().next().is_some_and(char::is_alphabetic) {
                if let Some(mark) = DIACRITICS.choose(rng) {
                    slot.push(*mark);
                }
            }
        }
        Mutation::Leetspeak => {
            if let Some(replacement) = single(slot).and_then(leet) {
                *slot = replacement.to_string();
            }
        }
        Mutation::RemoveVowel => {
            if single(slot).is_some_and(|c| "aeiou".contains(c.to_ascii_lowercase())) {
                slot.clear();
            }
        }
    }
}

/// Char-index ranges of whitespace-separated words.
fn word_spans(chars: &[char]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in chars.iter().enumerate() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, chars.len()));
    }
    spans
}

/// Perturb roughly `percentage` percent of the characters of `text`.
///
/// At least one position is sampled for non-empty text. Positions that fall
/// on whitespace are left alone. Returns the perturbed text and, for every
/// word that changed, a mapping from its new spelling to the original (both
/// without trailing `.,!?`).
pub fn modify_text<R: Rng + ?Sized>(
    text: &str,
    percentage: u32,
    rng: &mut R,
) -> Result<(String, WordMapping), PerturbError> {
    if text.is_empty() {
        return Ok((String::new(), WordMapping::new()));
    }
    if percentage > 100 {
        return Err(PerturbError::InvalidPercentage(percentage));
    }

    let original: Vec<char> = text.chars().collect();
    let mut slots: Vec<String> = original.iter().map(|c| c.to_string()).collect();
    let spans = word_spans(&original);

    let count = (original.len() * percentage as usize / 100).max(1);
    let mut mapping = WordMapping::new();

    for idx in index::sample(&mut *rng, original.len(), count).into_iter() {
        let Some(&(start, end)) = spans.iter().find(|(s, e)| (*s..*e).contains(&idx)) else {
            continue;
        };
        let Some(&mutation) = MUTATIONS.choose(rng) else {
            continue;
        };

        apply(mutation, &mut slots[idx], rng);

        let modified: String = slots[start..end].concat();
        let word: String = original[start..end].iter().collect();
        if modified != word {
            mapping.insert(
                modified.trim_end_matches(WORD_TRAILING_PUNCT).to_string(),
                word.trim_end_matches(WORD_TRAILING_PUNCT).to_string(),
            );
        }
    }

    Ok((slots.concat(), mapping))
}

/// Replace every mapped word in `text` with its original spelling.
pub fn replace_with_mapping(text: &str, mapping: &WordMapping) -> String {
    mapping
        .iter()
        .filter(|(modified, _)| !modified.is_empty())
        .fold(text.to_string(), |acc, (modified, original)| {
            acc.replace(modified.as_str(), original)
        })
}
