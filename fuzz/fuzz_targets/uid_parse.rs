//! Fuzz target for `Uid::parse`.
//!
//! No input, valid UTF-8 or not, should ever panic; the only outcomes are
//! a validated `Uid` or a `ProtocolError`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sfrodb_proto::Uid;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let _ = Uid::parse(s);
});
