//! Fuzz test for the credential record file parser
//!
//! Malformed files must produce a load error, never a panic.

#![no_main]

use hushlink_core::FileCredentialStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        let _ = FileCredentialStore::parse(content);
    }
});
