//! Tab title decoding.
//!
//! Browsers report titles exactly as pages declare them, which means mojibake,
//! leftover HTML entities, decomposed accents and invisible format characters
//! all show up. Each pass is a function `&str -> String` applied in a fixed
//! order: entity unescaping can introduce characters that still need
//! normalizing and stripping.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;
use unicode_general_category::{GeneralCategory, get_general_category};
use unicode_normalization::UnicodeNormalization;

/// Decode a raw tab title into its canonical display form.
///
/// Runs the pass sequence until the output stops changing, so the result is
/// stable under re-decoding (`"&amp;amp;"` ends up as `"&"`). After the
/// first round every change shortens the string, so its length bounds the
/// number of rounds.
pub fn decode_title(raw: &str) -> String {
    let mut current = decode_once(raw);
    let max_rounds = current.chars().count();
    for _ in 0..=max_rounds {
        let next = decode_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn decode_once(title: &str) -> String {
    let repaired = repair_mojibake(title);
    let unescaped = html_escape::decode_html_entities(&repaired);
    let normalized: String = unescaped.nfc().collect();
    strip_other_category(&normalized)
}

// ---------------------------------------------------------------------------
// Pass 1: Repair mojibake
// ---------------------------------------------------------------------------

/// Undo UTF-8 bytes that were decoded as Windows-1252 (`CafÃ©` → `Café`).
///
/// The repair only applies when the whole string maps back to Windows-1252
/// bytes that form valid UTF-8 with fewer characters; anything else is left
/// untouched.
fn repair_mojibake(title: &str) -> Cow<'_, str> {
    if title.is_ascii() {
        return Cow::Borrowed(title);
    }

    let (bytes, _, had_errors) = WINDOWS_1252.encode(title);
    if had_errors {
        return Cow::Borrowed(title);
    }

    match std::str::from_utf8(&bytes) {
        Ok(fixed) if fixed.chars().count() < title.chars().count() => {
            Cow::Owned(fixed.to_string())
        }
        _ => Cow::Borrowed(title),
    }
}

// ---------------------------------------------------------------------------
// Pass 4: Strip control-category code points
// ---------------------------------------------------------------------------

/// Remove every code point in the Unicode "Other" group (Cc, Cf, Cs, Co, Cn).
fn strip_other_category(title: &str) -> String {
    title
        .chars()
        .filter(|c| {
            !matches!(
                get_general_category(*c),
                GeneralCategory::Control
                    | GeneralCategory::Format
                    | GeneralCategory::Surrogate
                    | GeneralCategory::PrivateUse
                    | GeneralCategory::Unassigned
            )
        })
        .collect()
}
