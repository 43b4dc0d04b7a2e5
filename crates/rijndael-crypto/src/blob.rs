//! Transport decoding and the fixed `[salt][IV][ciphertext]` layout.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;

use crate::error::RijndaelCryptoError;
use crate::{IV_LEN, SALT_LEN};

/// Salt, IV and ciphertext segments of a decoded blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherBlob {
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

/// Decode the Base64 transport text of a blob.
///
/// Blobs tend to travel through config files, query strings and e-mails, so line breaks and other
/// ASCII whitespace are skipped and missing `=` padding is accepted.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, RijndaelCryptoError> {
    let bytes = text.as_bytes();

    // Avoid allocating in the common case where there is no whitespace.
    let mut cleaned: Option<Vec<u8>> = None;
    for (idx, &b) in bytes.iter().enumerate() {
        if b.is_ascii_whitespace() {
            let mut out = Vec::with_capacity(bytes.len());
            out.extend_from_slice(&bytes[..idx]);
            out.extend(bytes[idx..].iter().copied().filter(|b| !b.is_ascii_whitespace()));
            cleaned = Some(out);
            break;
        }
    }

    let input = cleaned.as_deref().unwrap_or(bytes);
    STANDARD
        .decode(input)
        .or_else(|_| STANDARD_NO_PAD.decode(input))
        .map_err(|_| RijndaelCryptoError::MalformedBlob {
            context: "invalid base64 text",
        })
}

/// Split a decoded buffer into its salt (32 bytes), IV (32 bytes) and ciphertext (remainder).
///
/// Only the minimum length is checked here; block alignment of the ciphertext is validated by
/// [`crate::cbc::decrypt_cbc`].
pub fn split(buffer: &[u8]) -> Result<CipherBlob, RijndaelCryptoError> {
    if buffer.len() < SALT_LEN + IV_LEN {
        return Err(RijndaelCryptoError::MalformedBlob {
            context: "buffer shorter than 64 bytes (salt + IV)",
        });
    }

    let (salt, rest) = buffer.split_at(SALT_LEN);
    let (iv, ciphertext) = rest.split_at(IV_LEN);

    let mut blob = CipherBlob {
        salt: [0u8; SALT_LEN],
        iv: [0u8; IV_LEN],
        ciphertext: ciphertext.to_vec(),
    };
    blob.salt.copy_from_slice(salt);
    blob.iv.copy_from_slice(iv);
    Ok(blob)
}
