//! Fuzz target for event parsing and CTCP classification.
//!
//! Parsing is best-effort and total: whatever bytes arrive, it must
//! produce an event without panicking, and the event must survive
//! reclassification and re-composition.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        // Lines past the protocol frame limit never reach the parser.
        if input.len() > 512 {
            return;
        }

        let mut event = slirc_session::Event::parse(input);
        slirc_session::ctcp::reclassify(&mut event);

        let args: Vec<&str> = event.args.iter().map(String::as_str).collect();
        let _ = slirc_session::compose(
            &event.code,
            event.message.as_deref().unwrap_or(""),
            &args,
        );
    }
});
