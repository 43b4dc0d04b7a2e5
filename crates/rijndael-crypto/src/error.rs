use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RijndaelCryptoError {
    /// The transport text is not Base64, or the decoded buffer is too short for salt + IV.
    #[error("malformed cipher blob: {context}")]
    MalformedBlob { context: &'static str },
    /// Empty password or a salt shorter than 8 bytes.
    #[error("invalid key material: {context}")]
    InvalidKeyMaterial { context: &'static str },
    /// A key, IV or cipher block does not have the fixed Rijndael-256 width.
    #[error("invalid block size: expected {expected} bytes, got {actual}")]
    InvalidBlockSize { expected: usize, actual: usize },
    /// Ciphertext is empty or not a multiple of the 32-byte block size.
    #[error("ciphertext length must be a positive multiple of 32 bytes, got {len}")]
    InvalidCiphertextLength { len: usize },
    /// The decoded input exceeds the configured [`crate::DecryptLimits`].
    #[error("input of {len} bytes exceeds the configured limit of {max} bytes")]
    InputTooLarge { len: usize, max: usize },
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
