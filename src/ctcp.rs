//! CTCP (Client-To-Client Protocol) classification.
//!
//! CTCP rides inside a private message: the payload is wrapped in `\x01`
//! delimiter bytes. The dispatcher calls [`reclassify`] on every inbound
//! event before handler lookup; a delimited private message has its
//! delimiters stripped, its message replaced by the inner payload, and its
//! code rewritten to one of the synthetic `CTCP_*` codes so each known query
//! dispatches to its own handler.
//!
//! Known queries are matched exactly (`VERSION`, `TIME`, `USERINFO`,
//! `CLIENTINFO`) except `PING`, which matches as a four-byte prefix so the
//! echo token survives in the payload. Anything else classifies as the
//! generic [`codes::CTCP`] code.

use crate::codes;
use crate::event::Event;

/// The CTCP delimiter byte.
pub const DELIM: char = '\x01';

/// Wraps a payload in CTCP delimiters for sending.
pub fn wrap(payload: &str) -> String {
    format!("{DELIM}{payload}{DELIM}")
}

/// Maps a stripped CTCP payload to its synthetic dispatch code.
pub fn classify(payload: &str) -> &'static str {
    if payload == codes::VERSION {
        codes::CTCP_VERSION
    } else if payload == codes::TIME {
        codes::CTCP_TIME
    } else if payload.starts_with(codes::PING) {
        codes::CTCP_PING
    } else if payload == codes::USERINFO {
        codes::CTCP_USERINFO
    } else if payload == codes::CLIENTINFO {
        codes::CTCP_CLIENTINFO
    } else {
        codes::CTCP
    }
}

/// Rewrites a delimited private message into its CTCP form, in place.
///
/// Only `PRIVMSG` events whose trailing message begins with the delimiter are
/// touched. The trailing delimiter is optional: a truncated payload is still
/// classified rather than dropped. A payload of nothing but the delimiter
/// classifies as generic CTCP with an empty message.
pub fn reclassify(event: &mut Event) {
    if event.code != codes::PRIVMSG {
        return;
    }
    let Some(message) = event.message.as_deref() else {
        return;
    };
    let Some(inner) = message.strip_prefix(DELIM) else {
        return;
    };
    let payload = inner.strip_suffix(DELIM).unwrap_or(inner).to_string();
    event.code = classify(&payload).to_string();
    event.message = Some(payload);
}
