//! Decryption of legacy .NET "Rijndael-256" password blobs.
//!
//! The producer (a .NET service using `Rfc2898DeriveBytes` + `RijndaelManaged`) emits Base64 text
//! laid out as:
//!
//! ```text
//! [32 bytes salt][32 bytes IV][ciphertext, multiple of 32 bytes]
//! ```
//!
//! - key: PBKDF2-HMAC-SHA1(password, salt, 1000 iterations), 32 bytes
//! - cipher: Rijndael with a 256-bit *block* (not AES) and a 256-bit key, CBC mode
//! - padding: zero bytes
//!
//! There is no MAC: a wrong password decrypts to garbage rather than failing. Encryption is not
//! supported; blobs are always produced elsewhere.

pub mod blob;
pub mod cbc;
mod error;
pub mod kdf;
pub mod legacy;
pub mod rijndael;

use std::borrow::Cow;

use zeroize::Zeroizing;

pub use crate::blob::{decode_base64, split, CipherBlob};
pub use crate::cbc::{decrypt_cbc, strip_zero_padding};
pub use crate::error::RijndaelCryptoError;
pub use crate::kdf::DeriveBytes;
pub use crate::legacy::strip_legacy_control_chars;
pub use crate::rijndael::{decrypt_block, expand_key, RoundKeySchedule};

/// PBKDF2 iteration count used by the producer.
pub const DERIVATION_ITERATIONS: u32 = 1000;
pub const KEY_SIZE_BITS: usize = 256;
/// Key length in bytes.
pub const KEY_SIZE: usize = KEY_SIZE_BITS / 8;
/// Cipher block length in bytes (256-bit Rijndael block).
pub const BLOCK_SIZE: usize = 32;
pub const SALT_LEN: usize = KEY_SIZE;
pub const IV_LEN: usize = BLOCK_SIZE;

/// Default upper bound on the decoded blob size (64 MiB).
pub const DEFAULT_MAX_INPUT_LEN: usize = 64 * 1024 * 1024;

/// Resource limits applied before any key derivation or decryption work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptLimits {
    /// Maximum decoded blob length in bytes. `None` disables the check.
    pub max_input_len: Option<usize>,
}

impl Default for DecryptLimits {
    fn default() -> Self {
        Self {
            max_input_len: Some(DEFAULT_MAX_INPUT_LEN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptOptions {
    pub limits: DecryptLimits,
    /// Apply [`strip_legacy_control_chars`] to the decoded text (on by default).
    pub strip_legacy_control_chars: bool,
}

impl Default for DecryptOptions {
    fn default() -> Self {
        Self {
            limits: DecryptLimits::default(),
            strip_legacy_control_chars: true,
        }
    }
}

/// The encrypt/decrypt surface of the legacy library.
pub trait Cryptography {
    fn encrypt(&self, plain_text: &str, secret: &str) -> Result<String, RijndaelCryptoError>;
    fn decrypt(&self, cipher_text: &str, secret: &str) -> Result<String, RijndaelCryptoError>;
}

/// [`Cryptography`] backed by this crate. Decrypt-only.
#[derive(Debug, Clone, Default)]
pub struct RijndaelCryptography {
    options: DecryptOptions,
}

impl RijndaelCryptography {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: DecryptOptions) -> Self {
        Self { options }
    }
}

impl Cryptography for RijndaelCryptography {
    fn encrypt(&self, plain_text: &str, secret: &str) -> Result<String, RijndaelCryptoError> {
        encrypt(plain_text, secret)
    }

    fn decrypt(&self, cipher_text: &str, secret: &str) -> Result<String, RijndaelCryptoError> {
        decrypt_with_options(cipher_text, secret, &self.options)
    }
}

/// Decrypt a Base64 blob with the default options.
pub fn decrypt(cipher_text: &str, secret: &str) -> Result<String, RijndaelCryptoError> {
    decrypt_with_options(cipher_text, secret, &DecryptOptions::default())
}

/// Decrypt a Base64 blob and decode the plaintext as text.
///
/// Invalid UTF-8 is replaced with U+FFFD instead of failing, since a wrong password is only
/// visible as garbage output.
pub fn decrypt_with_options(
    cipher_text: &str,
    secret: &str,
    options: &DecryptOptions,
) -> Result<String, RijndaelCryptoError> {
    let plaintext = Zeroizing::new(decrypt_bytes_with_limits(
        cipher_text,
        secret,
        &options.limits,
    )?);

    let text = String::from_utf8_lossy(&plaintext);
    if matches!(text, Cow::Owned(_)) {
        log::warn!("decrypted plaintext is not valid UTF-8 (wrong password?); invalid sequences replaced");
    }

    if !options.strip_legacy_control_chars {
        return Ok(text.into_owned());
    }

    let stripped = strip_legacy_control_chars(&text);
    let removed = text.chars().count() - stripped.chars().count();
    if removed > 0 {
        log::debug!("removed {removed} legacy control characters from decrypted text");
    }
    Ok(stripped)
}

/// Decrypt a Base64 blob to raw plaintext bytes (zero padding removed, no text processing).
pub fn decrypt_bytes(cipher_text: &str, secret: &str) -> Result<Vec<u8>, RijndaelCryptoError> {
    decrypt_bytes_with_limits(cipher_text, secret, &DecryptLimits::default())
}

fn decrypt_bytes_with_limits(
    cipher_text: &str,
    secret: &str,
    limits: &DecryptLimits,
) -> Result<Vec<u8>, RijndaelCryptoError> {
    let buffer = decode_base64(cipher_text)?;
    if let Some(max) = limits.max_input_len {
        if buffer.len() > max {
            return Err(RijndaelCryptoError::InputTooLarge {
                len: buffer.len(),
                max,
            });
        }
    }

    let blob = split(&buffer)?;
    log::debug!(
        "decrypting {} byte ciphertext ({} blocks of {BLOCK_SIZE} bytes)",
        blob.ciphertext.len(),
        blob.ciphertext.len() / BLOCK_SIZE
    );

    let mut kdf = DeriveBytes::from_password(secret, &blob.salt, DERIVATION_ITERATIONS)?;
    let key = Zeroizing::new(kdf.get_bytes(KEY_SIZE));
    let schedule = expand_key(&key)?;

    let mut plaintext = decrypt_cbc(&blob.ciphertext, &blob.iv, &schedule)?;
    strip_zero_padding(&mut plaintext);
    Ok(plaintext)
}

/// Always fails: the legacy scheme is decrypt-only, and producing blobs here would invite
/// incompatible output.
pub fn encrypt(_plain_text: &str, _secret: &str) -> Result<String, RijndaelCryptoError> {
    Err(RijndaelCryptoError::Unsupported(
        "encryption is not supported; blobs must be produced by the legacy .NET service"
            .to_string(),
    ))
}


#[cfg(test)]
mod tests {
    use super::*;

    // salt = 00..1f, IV = a0..bf, password "correct horse".
    const FOX_BLOB: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh+goaKjpKWmp6ipqqusra6vsLGys7S1tre4ubq7vL2+v88Z/B9KuoacaQ6mhjc8QusAFJNOPlR3HTGBNvCWlYZV6RFVZuni8ZPa00Z25et7W4dzDfACk686NjNjzEEJqNY=";
    const CONTROL_CHARS_BLOB: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh+goaKjpKWmp6ipqqusra6vsLGys7S1tre4ubq7vL2+vy2lPhCYiEm/Fo8Q787kAenStwMywIMKevjuwF4yI1/8";

    #[test]
    fn decrypts_fixture() {
        assert_eq!(
            decrypt(FOX_BLOB, "correct horse").expect("decrypt"),
            "The quick brown fox jumps over the lazy dog"
        );
    }

    #[test]
    fn legacy_strip_can_be_disabled() {
        let options = DecryptOptions {
            strip_legacy_control_chars: false,
            ..DecryptOptions::default()
        };
        assert_eq!(
            decrypt_with_options(CONTROL_CHARS_BLOB, "correct horse", &options).expect("decrypt"),
            "line one\u{0b}line two\u{14}end"
        );
        assert_eq!(
            decrypt(CONTROL_CHARS_BLOB, "correct horse").expect("decrypt"),
            "line oneline twoend"
        );
    }

    #[test]
    fn decrypt_bytes_keeps_control_bytes() {
        assert_eq!(
            decrypt_bytes(CONTROL_CHARS_BLOB, "correct horse").expect("decrypt"),
            b"line one\x0bline two\x14end".to_vec()
        );
    }

    #[test]
    fn input_limit_is_enforced() {
        let options = DecryptOptions {
            limits: DecryptLimits {
                max_input_len: Some(95),
            },
            ..DecryptOptions::default()
        };
        let err = decrypt_with_options(CONTROL_CHARS_BLOB, "correct horse", &options).unwrap_err();
        assert_eq!(err, RijndaelCryptoError::InputTooLarge { len: 96, max: 95 });
    }

    #[test]
    fn cryptography_trait_refuses_encryption() {
        let crypto = RijndaelCryptography::new();
        let err = crypto.encrypt("hello", "secret").unwrap_err();
        assert!(matches!(err, RijndaelCryptoError::Unsupported(_)));
        assert_eq!(
            crypto.decrypt(FOX_BLOB, "correct horse").expect("decrypt"),
            "The quick brown fox jumps over the lazy dog"
        );
    }
}
