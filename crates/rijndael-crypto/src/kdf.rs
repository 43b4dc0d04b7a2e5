//! `Rfc2898DeriveBytes`-compatible password→key stream (PBKDF2-HMAC-SHA1).
//!
//! The legacy producer derives its key through a *stateful* object: every `GetBytes` call
//! continues the same pseudo-random stream instead of restarting it. Callers that split one
//! request into several calls must see exactly the bytes a single call would have produced, so
//! the session keeps the unread tail of the last HMAC block around between calls.

use core::fmt;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use zeroize::Zeroize;

use crate::error::RijndaelCryptoError;

type HmacSha1 = Hmac<Sha1>;

const SHA1_LEN: usize = 20;
const MIN_SALT_LEN: usize = 8;

/// A single derivation session. Not meant to be shared between unrelated derivations.
pub struct DeriveBytes {
    mac: HmacSha1,
    salt: Vec<u8>,
    iterations: u32,
    /// PBKDF2 block index. Signed on purpose: the legacy counter is a 32-bit `int`.
    block: i32,
    buffer: [u8; SHA1_LEN],
    buffer_start: usize,
    buffer_end: usize,
}

impl DeriveBytes {
    /// Start a session for raw password bytes.
    pub fn new(
        password: &[u8],
        salt: &[u8],
        iterations: u32,
    ) -> Result<Self, RijndaelCryptoError> {
        if salt.len() < MIN_SALT_LEN {
            return Err(RijndaelCryptoError::InvalidKeyMaterial {
                context: "salt must be 8 bytes or more",
            });
        }
        if password.is_empty() {
            return Err(RijndaelCryptoError::InvalidKeyMaterial {
                context: "password must not be empty",
            });
        }

        let mac = HmacSha1::new_from_slice(password).map_err(|_| {
            RijndaelCryptoError::InvalidKeyMaterial {
                context: "HMAC-SHA1 rejected the password as a key",
            }
        })?;

        Ok(Self {
            mac,
            salt: salt.to_vec(),
            iterations,
            block: 1,
            buffer: [0u8; SHA1_LEN],
            buffer_start: 0,
            buffer_end: 0,
        })
    }

    /// Start a session for a text password (UTF-8 encoded, like the legacy string constructor).
    pub fn from_password(
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<Self, RijndaelCryptoError> {
        Self::new(password.as_bytes(), salt, iterations)
    }

    /// Return the next `count` bytes of the derived stream.
    pub fn get_bytes(&mut self, count: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(count);

        let buffered = self.buffer_end - self.buffer_start;
        if buffered > 0 {
            let take = buffered.min(count);
            out.extend_from_slice(&self.buffer[self.buffer_start..self.buffer_start + take]);
            self.buffer_start += take;
        }

        while out.len() < count {
            self.buffer = self.next_block();
            let take = (count - out.len()).min(SHA1_LEN);
            out.extend_from_slice(&self.buffer[..take]);
            self.buffer_start = take;
            self.buffer_end = SHA1_LEN;
        }

        out
    }

    /// PBKDF2 `F(P, S, c, i)` for the current block index, then advance the index.
    fn next_block(&mut self) -> [u8; SHA1_LEN] {
        let mut mac = self.mac.clone();
        mac.update(&self.salt);
        mac.update(&self.block.to_be_bytes());
        let mut temp: [u8; SHA1_LEN] = mac.finalize().into_bytes().into();

        let mut out = temp;
        for _ in 2..=self.iterations {
            let mut mac = self.mac.clone();
            mac.update(&temp);
            temp = mac.finalize().into_bytes().into();
            for (o, t) in out.iter_mut().zip(temp.iter()) {
                *o ^= t;
            }
        }
        temp.zeroize();

        // 0x7FFFFFFF wraps to -0x80000000.
        self.block = self.block.wrapping_add(1);
        out
    }

    #[cfg(test)]
    pub(crate) fn with_block_index(mut self, block: i32) -> Self {
        self.block = block;
        self
    }
}

impl fmt::Debug for DeriveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeriveBytes")
            .field("salt_len", &self.salt.len())
            .field("iterations", &self.iterations)
            .field("block", &self.block)
            .field("buffered", &(self.buffer_end - self.buffer_start))
            .finish_non_exhaustive()
    }
}

impl Drop for DeriveBytes {
    fn drop(&mut self) {
        self.buffer.zeroize();
    }
}
