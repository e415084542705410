//! Fuzz target for `decode_response`.
//!
//! Exercises the `max_len` cap alongside arbitrary bytes; the decoder must
//! never panic regardless of how the size prefix lies about the body.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sfrodb_proto::decode_response;
use tokio::io::AsyncWriteExt;

fuzz_target!(|input: (u32, Vec<u8>)| {
    let (max_len, data) = input;

    let Ok(rt) = tokio::runtime::Builder::new_current_thread().enable_all().build() else {
        return;
    };

    rt.block_on(async {
        let (mut writer, mut reader) = tokio::io::duplex(data.len() + 8);
        if writer.write_all(&data).await.is_err() {
            return;
        }
        drop(writer);
        let _ = decode_response(&mut reader, max_len).await;
    });
});
