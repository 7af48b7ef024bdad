//! Property-based tests for line parsing and composition.
//!
//! Uses proptest to generate random protocol components and verify that:
//! 1. Parsing never panics, whatever the input
//! 2. Composed lines parse back to the same code, params, and message
//! 3. Source prefixes decompose exactly when they should

use proptest::prelude::*;
use slirc_session::{codes, compose, ctcp, Event};

// =============================================================================
// STRATEGIES - Generators for valid protocol components
// =============================================================================

/// An event code: a command word or a three-digit numeric.
fn code_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Z]{3,10}").expect("valid regex"),
        prop::string::string_regex("[0-9]{3}").expect("valid regex"),
    ]
}

/// A positional parameter: no spaces, no colons, so it survives the
/// space-separated head of a line.
fn param_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[#&]?[a-zA-Z0-9\\-_\\[\\]^{}|]{1,16}").expect("valid regex")
}

/// Trailing message text: anything except terminators and NUL. It may
/// contain `" :"`; parsing splits at the first marker, which is the one
/// compose wrote.
fn trailing_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[^\r\n\0]{1,400}").expect("valid regex")
}

/// Valid nickname per RFC 2812: letter or special, then up to 8 more.
fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z\\[\\]\\\\^_`{|}][a-zA-Z0-9\\-\\[\\]\\\\^_`{|}]{0,8}")
        .expect("valid regex")
}

fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,9}").expect("valid regex")
}

fn hostname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]+(\\.[a-z0-9]+)*").expect("valid regex")
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The fundamental property: compose → parse recovers the code,
    /// every parameter, and the trailing message exactly.
    #[test]
    fn compose_parse_roundtrip(
        code in code_strategy(),
        params in prop::collection::vec(param_strategy(), 0..5),
        message in prop::option::of(trailing_strategy()),
    ) {
        let param_refs: Vec<&str> = params.iter().map(String::as_str).collect();
        let line = compose(&code, message.as_deref().unwrap_or(""), &param_refs);

        let event = Event::parse(&line);
        prop_assert_eq!(&event.code, &code, "code mismatch for line: {}", line);
        prop_assert_eq!(&event.args, &params, "args mismatch for line: {}", line);
        prop_assert_eq!(&event.message, &message, "message mismatch for line: {}", line);
    }

    /// Parsing is total: no input string can make it panic, and the raw
    /// line is always retained verbatim.
    #[test]
    fn parse_never_panics(line in any::<String>()) {
        let event = Event::parse(&line);
        prop_assert_eq!(event.raw, line);
    }

    /// A user prefix decomposes into its nick/user/host triple.
    #[test]
    fn user_prefix_decomposes(
        nick in nickname_strategy(),
        user in username_strategy(),
        host in hostname_strategy(),
        text in trailing_strategy(),
    ) {
        let line = format!(":{nick}!{user}@{host} PRIVMSG #chan :{text}");
        let event = Event::parse(&line);

        let source = event.source.as_ref().expect("source present");
        prop_assert_eq!(&source.nick, &nick);
        prop_assert_eq!(&source.user, &user);
        prop_assert_eq!(&source.host, &host);
        prop_assert_eq!(event.source_nick(), Some(nick.as_str()));
    }

    /// A server-name prefix stays opaque: raw retained, triple empty.
    #[test]
    fn server_prefix_stays_opaque(host in hostname_strategy()) {
        let line = format!(":{host} 372 nick :motd line");
        let event = Event::parse(&line);

        let source = event.source.as_ref().expect("source present");
        prop_assert_eq!(&source.raw, &host);
        prop_assert!(source.nick.is_empty());
        prop_assert_eq!(event.source_nick(), None);
    }

    /// CTCP reclassification is total over arbitrary payloads and
    /// always lands on a known synthetic code with the payload intact.
    #[test]
    fn ctcp_reclassify_is_total(payload in "[^\r\n\0]{0,64}") {
        let line = format!(":bob!u@h PRIVMSG ada :\u{1}{payload}\u{1}");
        let mut event = Event::parse(&line);
        ctcp::reclassify(&mut event);

        let known = [
            codes::CTCP,
            codes::CTCP_VERSION,
            codes::CTCP_TIME,
            codes::CTCP_PING,
            codes::CTCP_USERINFO,
            codes::CTCP_CLIENTINFO,
        ];
        prop_assert!(known.contains(&event.code.as_str()),
            "unexpected code {} for payload {:?}", event.code, payload);
        prop_assert_eq!(event.message.as_deref(), Some(payload.as_str()));
    }

    /// Non-CTCP private messages are left untouched by reclassification.
    #[test]
    fn plain_privmsg_not_reclassified(text in "[^\r\n\0\u{1}]{1,64}") {
        let line = format!(":bob!u@h PRIVMSG ada :{text}");
        let mut event = Event::parse(&line);
        let before = event.clone();
        ctcp::reclassify(&mut event);
        prop_assert_eq!(before, event);
    }
}
