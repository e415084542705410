//! Fuzz target for `decode_request`.
//!
//! Arbitrary bytes should never panic the decoder; every malformed frame
//! must surface as a `ProtocolError`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sfrodb_proto::decode_request;
use tokio::io::AsyncWriteExt;

fuzz_target!(|data: &[u8]| {
    let Ok(rt) = tokio::runtime::Builder::new_current_thread().enable_all().build() else {
        return;
    };

    rt.block_on(async {
        let (mut writer, mut reader) = tokio::io::duplex(data.len() + 8);
        if writer.write_all(data).await.is_err() {
            return;
        }
        drop(writer);
        let _ = decode_request(&mut reader).await;
    });
});
