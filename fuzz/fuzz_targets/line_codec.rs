//! Fuzz target for the line framing decoder.
//!
//! Feeds arbitrary bytes through the decoder until it yields nothing or
//! errors; it must never panic or slice out of bounds.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use slirc_session::LineCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from(data);
    loop {
        match codec.decode(&mut buf) {
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => break,
        }
    }
});
