//! Rijndael with a column-count-parameterised state.
//!
//! AES fixes the state at 4 columns (128-bit block). The legacy producer runs Rijndael with a
//! 256-bit block, i.e. an 8-column state, which changes the round count, the number of round
//! constants consumed by the key schedule and, most importantly, the ShiftRows offsets. The
//! column count is a const generic so the same code can be instantiated as AES-256 and checked
//! against the `aes` crate; only the 8-column configuration is exposed publicly.

use core::fmt;

use zeroize::Zeroize;

use crate::error::RijndaelCryptoError;
use crate::{BLOCK_SIZE, KEY_SIZE};

/// Columns of the public 256-bit state.
pub const STATE_COLUMNS: usize = BLOCK_SIZE / 4;

/// Key length in 32-bit words (`Nk`). Always 8: the legacy key is 256 bits.
const KEY_WORDS: usize = KEY_SIZE / 4;

const SBOX: [u8; 256] = [
    0x63, 0x7C, 0x77, 0x7B, 0xF2, 0x6B, 0x6F, 0xC5, 0x30, 0x01, 0x67, 0x2B, 0xFE, 0xD7, 0xAB, 0x76,
    0xCA, 0x82, 0xC9, 0x7D, 0xFA, 0x59, 0x47, 0xF0, 0xAD, 0xD4, 0xA2, 0xAF, 0x9C, 0xA4, 0x72, 0xC0,
    0xB7, 0xFD, 0x93, 0x26, 0x36, 0x3F, 0xF7, 0xCC, 0x34, 0xA5, 0xE5, 0xF1, 0x71, 0xD8, 0x31, 0x15,
    0x04, 0xC7, 0x23, 0xC3, 0x18, 0x96, 0x05, 0x9A, 0x07, 0x12, 0x80, 0xE2, 0xEB, 0x27, 0xB2, 0x75,
    0x09, 0x83, 0x2C, 0x1A, 0x1B, 0x6E, 0x5A, 0xA0, 0x52, 0x3B, 0xD6, 0xB3, 0x29, 0xE3, 0x2F, 0x84,
    0x53, 0xD1, 0x00, 0xED, 0x20, 0xFC, 0xB1, 0x5B, 0x6A, 0xCB, 0xBE, 0x39, 0x4A, 0x4C, 0x58, 0xCF,
    0xD0, 0xEF, 0xAA, 0xFB, 0x43, 0x4D, 0x33, 0x85, 0x45, 0xF9, 0x02, 0x7F, 0x50, 0x3C, 0x9F, 0xA8,
    0x51, 0xA3, 0x40, 0x8F, 0x92, 0x9D, 0x38, 0xF5, 0xBC, 0xB6, 0xDA, 0x21, 0x10, 0xFF, 0xF3, 0xD2,
    0xCD, 0x0C, 0x13, 0xEC, 0x5F, 0x97, 0x44, 0x17, 0xC4, 0xA7, 0x7E, 0x3D, 0x64, 0x5D, 0x19, 0x73,
    0x60, 0x81, 0x4F, 0xDC, 0x22, 0x2A, 0x90, 0x88, 0x46, 0xEE, 0xB8, 0x14, 0xDE, 0x5E, 0x0B, 0xDB,
    0xE0, 0x32, 0x3A, 0x0A, 0x49, 0x06, 0x24, 0x5C, 0xC2, 0xD3, 0xAC, 0x62, 0x91, 0x95, 0xE4, 0x79,
    0xE7, 0xC8, 0x37, 0x6D, 0x8D, 0xD5, 0x4E, 0xA9, 0x6C, 0x56, 0xF4, 0xEA, 0x65, 0x7A, 0xAE, 0x08,
    0xBA, 0x78, 0x25, 0x2E, 0x1C, 0xA6, 0xB4, 0xC6, 0xE8, 0xDD, 0x74, 0x1F, 0x4B, 0xBD, 0x8B, 0x8A,
    0x70, 0x3E, 0xB5, 0x66, 0x48, 0x03, 0xF6, 0x0E, 0x61, 0x35, 0x57, 0xB9, 0x86, 0xC1, 0x1D, 0x9E,
    0xE1, 0xF8, 0x98, 0x11, 0x69, 0xD9, 0x8E, 0x94, 0x9B, 0x1E, 0x87, 0xE9, 0xCE, 0x55, 0x28, 0xDF,
    0x8C, 0xA1, 0x89, 0x0D, 0xBF, 0xE6, 0x42, 0x68, 0x41, 0x99, 0x2D, 0x0F, 0xB0, 0x54, 0xBB, 0x16,
];
const INV_SBOX: [u8; 256] = [
    0x52, 0x09, 0x6A, 0xD5, 0x30, 0x36, 0xA5, 0x38, 0xBF, 0x40, 0xA3, 0x9E, 0x81, 0xF3, 0xD7, 0xFB,
    0x7C, 0xE3, 0x39, 0x82, 0x9B, 0x2F, 0xFF, 0x87, 0x34, 0x8E, 0x43, 0x44, 0xC4, 0xDE, 0xE9, 0xCB,
    0x54, 0x7B, 0x94, 0x32, 0xA6, 0xC2, 0x23, 0x3D, 0xEE, 0x4C, 0x95, 0x0B, 0x42, 0xFA, 0xC3, 0x4E,
    0x08, 0x2E, 0xA1, 0x66, 0x28, 0xD9, 0x24, 0xB2, 0x76, 0x5B, 0xA2, 0x49, 0x6D, 0x8B, 0xD1, 0x25,
    0x72, 0xF8, 0xF6, 0x64, 0x86, 0x68, 0x98, 0x16, 0xD4, 0xA4, 0x5C, 0xCC, 0x5D, 0x65, 0xB6, 0x92,
    0x6C, 0x70, 0x48, 0x50, 0xFD, 0xED, 0xB9, 0xDA, 0x5E, 0x15, 0x46, 0x57, 0xA7, 0x8D, 0x9D, 0x84,
    0x90, 0xD8, 0xAB, 0x00, 0x8C, 0xBC, 0xD3, 0x0A, 0xF7, 0xE4, 0x58, 0x05, 0xB8, 0xB3, 0x45, 0x06,
    0xD0, 0x2C, 0x1E, 0x8F, 0xCA, 0x3F, 0x0F, 0x02, 0xC1, 0xAF, 0xBD, 0x03, 0x01, 0x13, 0x8A, 0x6B,
    0x3A, 0x91, 0x11, 0x41, 0x4F, 0x67, 0xDC, 0xEA, 0x97, 0xF2, 0xCF, 0xCE, 0xF0, 0xB4, 0xE6, 0x73,
    0x96, 0xAC, 0x74, 0x22, 0xE7, 0xAD, 0x35, 0x85, 0xE2, 0xF9, 0x37, 0xE8, 0x1C, 0x75, 0xDF, 0x6E,
    0x47, 0xF1, 0x1A, 0x71, 0x1D, 0x29, 0xC5, 0x89, 0x6F, 0xB7, 0x62, 0x0E, 0xAA, 0x18, 0xBE, 0x1B,
    0xFC, 0x56, 0x3E, 0x4B, 0xC6, 0xD2, 0x79, 0x20, 0x9A, 0xDB, 0xC0, 0xFE, 0x78, 0xCD, 0x5A, 0xF4,
    0x1F, 0xDD, 0xA8, 0x33, 0x88, 0x07, 0xC7, 0x31, 0xB1, 0x12, 0x10, 0x59, 0x27, 0x80, 0xEC, 0x5F,
    0x60, 0x51, 0x7F, 0xA9, 0x19, 0xB5, 0x4A, 0x0D, 0x2D, 0xE5, 0x7A, 0x9F, 0x93, 0xC9, 0x9C, 0xEF,
    0xA0, 0xE0, 0x3B, 0x4D, 0xAE, 0x2A, 0xF5, 0xB0, 0xC8, 0xEB, 0xBB, 0x3C, 0x83, 0x53, 0x99, 0x61,
    0x17, 0x2B, 0x04, 0x7E, 0xBA, 0x77, 0xD6, 0x26, 0xE1, 0x69, 0x14, 0x63, 0x55, 0x21, 0x0C, 0x7D,
];

/// State/round key layout: `state[column][row]`, bytes loaded column-major from the block.
type State<const NB: usize> = [[u8; 4]; NB];

/// Rounds for an `nb`-column state with a 256-bit key: `max(Nb, Nk) + 6`.
pub(crate) const fn rounds_for(nb: usize) -> usize {
    if nb > KEY_WORDS {
        nb + 6
    } else {
        KEY_WORDS + 6
    }
}

/// Left-rotation applied to each row by ShiftRows, indexed by row.
pub(crate) const fn shift_offsets(nb: usize) -> [usize; 4] {
    match nb {
        7 => [0, 1, 2, 4],
        8 => [0, 1, 3, 4],
        _ => [0, 1, 2, 3],
    }
}

#[inline]
fn xtime(a: u8) -> u8 {
    let hi = a & 0x80 != 0;
    let a = a << 1;
    if hi {
        a ^ 0x1B
    } else {
        a
    }
}

/// Multiply in GF(2^8) modulo x^8 + x^4 + x^3 + x + 1.
#[inline]
fn gmul(mut a: u8, mut b: u8) -> u8 {
    let mut p = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            p ^= a;
        }
        a = xtime(a);
        b >>= 1;
    }
    p
}

fn sub_word(word: &mut [u8; 4]) {
    for b in word.iter_mut() {
        *b = SBOX[*b as usize];
    }
}

/// Expanded round keys for one cipher key.
#[derive(Clone)]
pub struct RoundKeySchedule<const NB: usize = STATE_COLUMNS> {
    round_keys: Vec<State<NB>>,
}

impl<const NB: usize> RoundKeySchedule<NB> {
    const SUPPORTED_COLUMNS: () = assert!(NB >= 4 && NB <= 8, "Rijndael uses 4..=8 columns");

    pub(crate) fn new(key: &[u8]) -> Result<Self, RijndaelCryptoError> {
        #[allow(clippy::let_unit_value)]
        let () = Self::SUPPORTED_COLUMNS;

        if key.len() != KEY_SIZE {
            return Err(RijndaelCryptoError::InvalidBlockSize {
                expected: KEY_SIZE,
                actual: key.len(),
            });
        }

        let rounds = rounds_for(NB);
        let total_words = NB * (rounds + 1);

        let mut words: Vec<[u8; 4]> = Vec::with_capacity(total_words);
        for chunk in key.chunks_exact(4) {
            words.push([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        // An 8-column schedule needs 14 round constants, more than the 10 AES tabulates.
        let mut rcon = 0x01u8;
        for i in KEY_WORDS..total_words {
            let mut temp = words[i - 1];
            if i % KEY_WORDS == 0 {
                temp.rotate_left(1);
                sub_word(&mut temp);
                temp[0] ^= rcon;
                rcon = xtime(rcon);
            } else if i % KEY_WORDS == 4 {
                sub_word(&mut temp);
            }
            let prev = words[i - KEY_WORDS];
            words.push([
                prev[0] ^ temp[0],
                prev[1] ^ temp[1],
                prev[2] ^ temp[2],
                prev[3] ^ temp[3],
            ]);
        }

        let round_keys = words
            .chunks_exact(NB)
            .map(|columns| {
                let mut round_key = [[0u8; 4]; NB];
                round_key.copy_from_slice(columns);
                round_key
            })
            .collect();
        words.zeroize();

        Ok(Self { round_keys })
    }

    /// Number of cipher rounds (`Nr`); the schedule holds `Nr + 1` round keys.
    pub fn rounds(&self) -> usize {
        self.round_keys.len() - 1
    }

    pub(crate) fn decrypt_in_place(&self, block: &mut [u8]) -> Result<(), RijndaelCryptoError> {
        let mut state = load_state::<NB>(block)?;
        let rounds = self.rounds();

        add_round_key(&mut state, &self.round_keys[rounds]);
        for round in (1..rounds).rev() {
            inv_shift_rows(&mut state);
            inv_sub_bytes(&mut state);
            add_round_key(&mut state, &self.round_keys[round]);
            inv_mix_columns(&mut state);
        }
        inv_shift_rows(&mut state);
        inv_sub_bytes(&mut state);
        add_round_key(&mut state, &self.round_keys[0]);

        store_state(&state, block);
        state.zeroize();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn encrypt_in_place(&self, block: &mut [u8]) -> Result<(), RijndaelCryptoError> {
        let mut state = load_state::<NB>(block)?;
        let rounds = self.rounds();

        add_round_key(&mut state, &self.round_keys[0]);
        for round in 1..rounds {
            sub_bytes(&mut state);
            shift_rows(&mut state);
            mix_columns(&mut state);
            add_round_key(&mut state, &self.round_keys[round]);
        }
        sub_bytes(&mut state);
        shift_rows(&mut state);
        add_round_key(&mut state, &self.round_keys[rounds]);

        store_state(&state, block);
        Ok(())
    }
}

impl<const NB: usize> fmt::Debug for RoundKeySchedule<NB> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundKeySchedule")
            .field("columns", &NB)
            .field("rounds", &self.rounds())
            .finish_non_exhaustive()
    }
}

impl<const NB: usize> Drop for RoundKeySchedule<NB> {
    fn drop(&mut self) {
        self.round_keys.zeroize();
    }
}

/// Expand a 256-bit key for the 256-bit block cipher.
pub fn expand_key(key: &[u8]) -> Result<RoundKeySchedule, RijndaelCryptoError> {
    RoundKeySchedule::new(key)
}

/// Run the inverse cipher over one 32-byte block.
pub fn decrypt_block(
    block: &[u8],
    schedule: &RoundKeySchedule,
) -> Result<[u8; BLOCK_SIZE], RijndaelCryptoError> {
    if block.len() != BLOCK_SIZE {
        return Err(RijndaelCryptoError::InvalidBlockSize {
            expected: BLOCK_SIZE,
            actual: block.len(),
        });
    }
    let mut out = [0u8; BLOCK_SIZE];
    out.copy_from_slice(block);
    schedule.decrypt_in_place(&mut out)?;
    Ok(out)
}

fn load_state<const NB: usize>(block: &[u8]) -> Result<State<NB>, RijndaelCryptoError> {
    if block.len() != 4 * NB {
        return Err(RijndaelCryptoError::InvalidBlockSize {
            expected: 4 * NB,
            actual: block.len(),
        });
    }
    let mut state = [[0u8; 4]; NB];
    for (column, chunk) in state.iter_mut().zip(block.chunks_exact(4)) {
        column.copy_from_slice(chunk);
    }
    Ok(state)
}

fn store_state<const NB: usize>(state: &State<NB>, block: &mut [u8]) {
    for (chunk, column) in block.chunks_exact_mut(4).zip(state.iter()) {
        chunk.copy_from_slice(column);
    }
}

fn add_round_key<const NB: usize>(state: &mut State<NB>, round_key: &State<NB>) {
    for (column, key_column) in state.iter_mut().zip(round_key.iter()) {
        for (b, k) in column.iter_mut().zip(key_column.iter()) {
            *b ^= k;
        }
    }
}

fn inv_sub_bytes<const NB: usize>(state: &mut State<NB>) {
    for b in state.iter_mut().flatten() {
        *b = INV_SBOX[*b as usize];
    }
}

/// Rotate row `r` right by `shift_offsets(NB)[r]` columns.
fn inv_shift_rows<const NB: usize>(state: &mut State<NB>) {
    let offsets = shift_offsets(NB);
    let original = *state;
    for row in 1..4 {
        let offset = offsets[row];
        for column in 0..NB {
            state[column][row] = original[(column + NB - offset) % NB][row];
        }
    }
}

fn inv_mix_columns<const NB: usize>(state: &mut State<NB>) {
    for column in state.iter_mut() {
        let [s0, s1, s2, s3] = *column;
        column[0] = gmul(0x0E, s0) ^ gmul(0x0B, s1) ^ gmul(0x0D, s2) ^ gmul(0x09, s3);
        column[1] = gmul(0x09, s0) ^ gmul(0x0E, s1) ^ gmul(0x0B, s2) ^ gmul(0x0D, s3);
        column[2] = gmul(0x0D, s0) ^ gmul(0x09, s1) ^ gmul(0x0E, s2) ^ gmul(0x0B, s3);
        column[3] = gmul(0x0B, s0) ^ gmul(0x0D, s1) ^ gmul(0x09, s2) ^ gmul(0x0E, s3);
    }
}

#[cfg(test)]
fn sub_bytes<const NB: usize>(state: &mut State<NB>) {
    for b in state.iter_mut().flatten() {
        *b = SBOX[*b as usize];
    }
}

#[cfg(test)]
fn shift_rows<const NB: usize>(state: &mut State<NB>) {
    let offsets = shift_offsets(NB);
    let original = *state;
    for row in 1..4 {
        let offset = offsets[row];
        for column in 0..NB {
            state[column][row] = original[(column + offset) % NB][row];
        }
    }
}

#[cfg(test)]
fn mix_columns<const NB: usize>(state: &mut State<NB>) {
    for column in state.iter_mut() {
        let [s0, s1, s2, s3] = *column;
        column[0] = gmul(0x02, s0) ^ gmul(0x03, s1) ^ s2 ^ s3;
        column[1] = s0 ^ gmul(0x02, s1) ^ gmul(0x03, s2) ^ s3;
        column[2] = s0 ^ s1 ^ gmul(0x02, s2) ^ gmul(0x03, s3);
        column[3] = gmul(0x03, s0) ^ s1 ^ s2 ^ gmul(0x02, s3);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};

    // Rijndael reference vector, 256-bit block / 256-bit key.
    const KAT_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c762e7160f38b4da56a784d9045190cfe";
    const KAT_PLAINTEXT: &str = "3243f6a8885a308d313198a2e03707344a4093822299f31d0082efa98ec4e6c8";
    const KAT_CIPHERTEXT: &str = "a49406115dfb30a40418aafa4869b7c6a886ff31602a7dd19c889dc64f7e4e7a";

    fn next_u64(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        *state
    }

    fn pseudo_random_bytes(state: &mut u64, len: usize) -> Vec<u8> {
        (0..len).map(|_| (next_u64(state) >> 56) as u8).collect()
    }

    #[test]
    fn sbox_tables_are_inverse() {
        for i in 0..=255u8 {
            assert_eq!(INV_SBOX[SBOX[i as usize] as usize], i);
        }
    }

    #[test]
    fn eight_columns_use_fourteen_rounds() {
        let schedule = expand_key(&[0u8; 32]).expect("expand");
        assert_eq!(schedule.rounds(), 14);
        assert_eq!(schedule.round_keys.len(), 15);
    }

    #[test]
    fn first_round_key_is_the_cipher_key() {
        let key: Vec<u8> = (0u8..32).collect();
        let schedule = expand_key(&key).expect("expand");
        let mut first = [0u8; 32];
        store_state(&schedule.round_keys[0], &mut first);
        assert_eq!(first.to_vec(), key);
    }

    #[test]
    fn shift_offsets_depend_on_column_count() {
        assert_eq!(shift_offsets(4), [0, 1, 2, 3]);
        assert_eq!(shift_offsets(6), [0, 1, 2, 3]);
        assert_eq!(shift_offsets(7), [0, 1, 2, 4]);
        assert_eq!(shift_offsets(8), [0, 1, 3, 4]);
    }

    #[test]
    fn decrypts_reference_vector() {
        let key = hex::decode(KAT_KEY).unwrap();
        let ciphertext = hex::decode(KAT_CIPHERTEXT).unwrap();
        let schedule = expand_key(&key).expect("expand");
        let plaintext = decrypt_block(&ciphertext, &schedule).expect("decrypt");
        assert_eq!(hex::encode(plaintext), KAT_PLAINTEXT);
    }

    #[test]
    fn encrypts_reference_vector() {
        let key = hex::decode(KAT_KEY).unwrap();
        let mut block = hex::decode(KAT_PLAINTEXT).unwrap();
        let schedule = expand_key(&key).expect("expand");
        schedule.encrypt_in_place(&mut block).expect("encrypt");
        assert_eq!(hex::encode(block), KAT_CIPHERTEXT);
    }

    #[test]
    fn decrypt_inverts_encrypt() {
        let mut rng = 0x5eed_u64;
        for _ in 0..64 {
            let key = pseudo_random_bytes(&mut rng, 32);
            let block = pseudo_random_bytes(&mut rng, 32);
            let schedule = expand_key(&key).expect("expand");

            let mut encrypted = block.clone();
            schedule.encrypt_in_place(&mut encrypted).expect("encrypt");
            assert_ne!(encrypted, block);
            let decrypted = decrypt_block(&encrypted, &schedule).expect("decrypt");
            assert_eq!(decrypted.to_vec(), block);
        }
    }

    #[test]
    fn four_column_instance_matches_aes256() {
        let mut rng = 0xa5a5_u64;
        for _ in 0..32 {
            let key = pseudo_random_bytes(&mut rng, 32);
            let plaintext = pseudo_random_bytes(&mut rng, 16);

            let aes = aes::Aes256::new_from_slice(&key).expect("aes key");
            let mut expected = GenericArray::clone_from_slice(&plaintext);
            aes.encrypt_block(&mut expected);

            let schedule = RoundKeySchedule::<4>::new(&key).expect("expand");
            assert_eq!(schedule.rounds(), 14);

            let mut encrypted = plaintext.clone();
            schedule.encrypt_in_place(&mut encrypted).expect("encrypt");
            assert_eq!(encrypted.as_slice(), expected.as_slice());

            let mut decrypted = expected.to_vec();
            schedule.decrypt_in_place(&mut decrypted).expect("decrypt");
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn fips197_aes256_vector_through_four_columns() {
        let key: Vec<u8> = (0u8..32).collect();
        let schedule = RoundKeySchedule::<4>::new(&key).expect("expand");
        let mut block = hex::decode("8ea2b7ca516745bfeafc49904b496089").unwrap();
        schedule.decrypt_in_place(&mut block).expect("decrypt");
        assert_eq!(hex::encode(block), "00112233445566778899aabbccddeeff");
    }

    #[test]
    fn rejects_wrong_key_length() {
        for len in [0usize, 16, 24, 31, 33] {
            let err = expand_key(&vec![0u8; len]).unwrap_err();
            assert_eq!(
                err,
                RijndaelCryptoError::InvalidBlockSize {
                    expected: 32,
                    actual: len
                }
            );
        }
    }

    #[test]
    fn rejects_wrong_block_length() {
        let schedule = expand_key(&[1u8; 32]).expect("expand");
        let err = decrypt_block(&[0u8; 16], &schedule).unwrap_err();
        assert_eq!(
            err,
            RijndaelCryptoError::InvalidBlockSize {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn debug_output_omits_round_keys() {
        let schedule = expand_key(&[0xAB; 32]).expect("expand");
        let rendered = format!("{schedule:?}");
        assert!(rendered.contains("rounds: 14"));
        assert!(!rendered.contains("171"));
    }
}
