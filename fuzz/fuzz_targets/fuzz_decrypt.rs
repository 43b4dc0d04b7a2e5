#![no_main]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use libfuzzer_sys::fuzz_target;

/// Every iteration pays for a full key derivation; keep blobs small so throughput stays useful.
const MAX_BLOB_BYTES: usize = 16 * 1024;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks how much of the input is the password; the rest is the raw blob.
    let split = (data[0] as usize).min(data.len() - 1);
    let (password, blob) = data[1..].split_at(split);
    let blob = &blob[..blob.len().min(MAX_BLOB_BYTES)];

    let password = String::from_utf8_lossy(password);
    let _ = rijndael_crypto::decrypt(&BASE64.encode(blob), &password);
});
