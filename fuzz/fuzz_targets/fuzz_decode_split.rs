#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(buffer) = rijndael_crypto::decode_base64(&text) {
        let _ = rijndael_crypto::split(&buffer);
    }
});
