//! CBC chaining over the Rijndael inverse cipher, plus zero-padding removal.

use crate::error::RijndaelCryptoError;
use crate::rijndael::RoundKeySchedule;

/// Decrypt `ciphertext` in CBC mode. Padding is left in place; see [`strip_zero_padding`].
pub fn decrypt_cbc<const NB: usize>(
    ciphertext: &[u8],
    iv: &[u8],
    schedule: &RoundKeySchedule<NB>,
) -> Result<Vec<u8>, RijndaelCryptoError> {
    let block_size = 4 * NB;
    if iv.len() != block_size {
        return Err(RijndaelCryptoError::InvalidBlockSize {
            expected: block_size,
            actual: iv.len(),
        });
    }
    if ciphertext.is_empty() || ciphertext.len() % block_size != 0 {
        return Err(RijndaelCryptoError::InvalidCiphertextLength {
            len: ciphertext.len(),
        });
    }

    let mut out = ciphertext.to_vec();
    let mut previous = iv;
    for (block, cipher_block) in out
        .chunks_exact_mut(block_size)
        .zip(ciphertext.chunks_exact(block_size))
    {
        schedule.decrypt_in_place(block)?;
        for (b, p) in block.iter_mut().zip(previous.iter()) {
            *b ^= p;
        }
        previous = cipher_block;
    }

    Ok(out)
}

/// Drop the trailing `0x00` bytes the producer appended to reach a block boundary.
///
/// Zero padding is ambiguous: plaintext that itself ends in NUL bytes loses them too.
pub fn strip_zero_padding(plaintext: &mut Vec<u8>) {
    let len = plaintext
        .iter()
        .rposition(|b| *b != 0)
        .map_or(0, |idx| idx + 1);
    plaintext.truncate(len);
}
