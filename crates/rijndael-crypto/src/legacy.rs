//! Text clean-up carried over from the legacy decryptor.
//!
//! The legacy decryptor removes every vertical tab (U+000B) and U+0014 from the decoded text. This
//! is not part of the cipher or the padding scheme; it most likely compensates for an artifact of
//! whatever produced the plaintext. Keep it as its own pass and do not extend the character set
//! without real fixtures showing the need.

const LEGACY_CONTROL_CHARS: [char; 2] = ['\u{000B}', '\u{0014}'];

/// Remove U+000B and U+0014 anywhere in `text`.
pub fn strip_legacy_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !LEGACY_CONTROL_CHARS.contains(c))
        .collect()
}
