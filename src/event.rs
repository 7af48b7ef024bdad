//! Inbound event model and the line codec's parse/compose pair.
//!
//! An IRC line has the shape
//! `[":" <source> " "] <code> {" " <param>} [" :" <trailing>]`. [`Event::parse`]
//! decomposes one line into an [`Event`]; [`compose`] builds an outbound line
//! from a code, a trailing message, and positional parameters. Parsing is
//! best-effort and total: a malformed line produces a partially populated
//! event, never an error.
//!
//! # Example
//!
//! ```
//! use slirc_session::Event;
//!
//! let event = Event::parse(":bob!u@h PRIVMSG #chan :hello there");
//! assert_eq!(event.code, "PRIVMSG");
//! assert_eq!(event.args, vec!["#chan"]);
//! assert_eq!(event.message.as_deref(), Some("hello there"));
//! assert_eq!(event.source_nick(), Some("bob"));
//! ```

/// The source prefix of a line, decomposed when it matches
/// `<nick>!<user>@<host>`.
///
/// When the pattern does not match (server names, malformed prefixes), the
/// raw string is retained and the three components stay empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// The prefix exactly as received, without the leading `:`.
    pub raw: String,
    pub nick: String,
    pub user: String,
    pub host: String,
}

impl Source {
    /// Parses a source prefix. The triple is only filled in when a `!`
    /// appears before a `@`; otherwise the prefix is kept opaque.
    pub fn parse(raw: &str) -> Self {
        let mut source = Source {
            raw: raw.to_string(),
            nick: String::new(),
            user: String::new(),
            host: String::new(),
        };
        if let (Some(bang), Some(at)) = (raw.find('!'), raw.find('@')) {
            if bang < at {
                source.nick = raw[..bang].to_string();
                source.user = raw[bang + 1..at].to_string();
                source.host = raw[at + 1..].to_string();
            }
        }
        source
    }
}

/// One parsed inbound line.
///
/// Constructed once per line by the read loop, rewritten in place by CTCP
/// classification, then handed to exactly one dispatch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// The line exactly as received, terminator stripped.
    pub raw: String,
    /// Source prefix, present only when the line began with `:`.
    pub source: Option<Source>,
    /// Uppercase command name, three-digit numeric, or synthetic CTCP code.
    pub code: String,
    /// Positional arguments in wire order.
    pub args: Vec<String>,
    /// Trailing free-text message, present only when the line contained the
    /// `" :"` marker. `Some("")` and `None` are distinct.
    pub message: Option<String>,
}

impl Event {
    /// Parses one terminator-stripped line.
    ///
    /// The scan mirrors the wire grammar exactly: an optional source prefix
    /// up to the first space, then everything after the first `" :"` as the
    /// trailing message, then the head split on single spaces into the
    /// uppercased code and its arguments. Consecutive spaces produce empty
    /// argument tokens rather than being collapsed. A line with too few
    /// tokens yields an event with empty arguments; callers tolerate missing
    /// fields rather than this function failing.
    pub fn parse(line: &str) -> Self {
        let mut rest = line;

        let mut source = None;
        if rest.starts_with(':') {
            if let Some(space) = rest.find(' ') {
                source = Some(Source::parse(&rest[1..space]));
                rest = &rest[space + 1..];
            }
        }

        let mut message = None;
        let mut head = rest;
        if let Some(marker) = rest.find(" :") {
            message = Some(rest[marker + 2..].to_string());
            head = &rest[..marker];
        }

        let mut tokens = head.split(' ');
        let code = tokens.next().unwrap_or("").to_uppercase();
        let args = tokens.map(str::to_string).collect();

        Event {
            raw: line.to_string(),
            source,
            code,
            args,
            message,
        }
    }

    /// The source nickname, when the line carried a decomposable user prefix.
    pub fn source_nick(&self) -> Option<&str> {
        self.source
            .as_ref()
            .map(|s| s.nick.as_str())
            .filter(|nick| !nick.is_empty())
    }
}

/// Builds one outbound line: the code, each parameter prefixed by a single
/// space, then — only when `message` is non-empty — a literal `" :"` and the
/// message verbatim.
///
/// Nothing is escaped. Callers must not pass parameters containing spaces or
/// the `" :"` marker, nor line terminators anywhere; the write path rejects
/// embedded terminators outright. Round trip: `Event::parse(&compose(code,
/// message, params))` recovers code, params, and message exactly under those
/// conditions.
pub fn compose(code: &str, message: &str, params: &[&str]) -> String {
    let mut line = String::with_capacity(
        code.len() + message.len() + params.iter().map(|p| p.len() + 1).sum::<usize>() + 2,
    );
    line.push_str(code);
    for param in params {
        line.push(' ');
        line.push_str(param);
    }
    if !message.is_empty() {
        line.push_str(" :");
        line.push_str(message);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_line() {
        let event = Event::parse(":nick!user@host PRIVMSG #channel :Hello, world!");
        let source = event.source.as_ref().expect("source present");
        assert_eq!(source.raw, "nick!user@host");
        assert_eq!(source.nick, "nick");
        assert_eq!(source.user, "user");
        assert_eq!(source.host, "host");
        assert_eq!(event.code, "PRIVMSG");
        assert_eq!(event.args, vec!["#channel"]);
        assert_eq!(event.message.as_deref(), Some("Hello, world!"));
        assert_eq!(event.raw, ":nick!user@host PRIVMSG #channel :Hello, world!");
    }

    #[test]
    fn test_parse_numeric_reply() {
        let event = Event::parse(":irc.example.net 001 bob :Welcome to the network");
        let source = event.source.as_ref().expect("source present");
        assert_eq!(source.raw, "irc.example.net");
        assert!(source.nick.is_empty());
        assert!(source.user.is_empty());
        assert!(source.host.is_empty());
        assert_eq!(event.code, "001");
        assert_eq!(event.args, vec!["bob"]);
        assert_eq!(event.message.as_deref(), Some("Welcome to the network"));
    }

    #[test]
    fn test_parse_without_source() {
        let event = Event::parse("PING :1234567890");
        assert!(event.source.is_none());
        assert_eq!(event.code, "PING");
        assert!(event.args.is_empty());
        assert_eq!(event.message.as_deref(), Some("1234567890"));
    }

    #[test]
    fn test_parse_without_trailing() {
        let event = Event::parse("NICK newnick");
        assert_eq!(event.code, "NICK");
        assert_eq!(event.args, vec!["newnick"]);
        assert_eq!(event.message, None);
    }

    #[test]
    fn test_parse_empty_trailing_is_distinct_from_absent() {
        let event = Event::parse("TOPIC #chan :");
        assert_eq!(event.message.as_deref(), Some(""));

        let event = Event::parse("TOPIC #chan");
        assert_eq!(event.message, None);
    }

    #[test]
    fn test_parse_uppercases_code() {
        let event = Event::parse("privmsg #chan :hi");
        assert_eq!(event.code, "PRIVMSG");
    }

    #[test]
    fn test_parse_keeps_empty_tokens() {
        // Consecutive spaces are not collapsed; the wire said two tokens
        // with an empty one between them.
        let event = Event::parse("MODE  #chan");
        assert_eq!(event.code, "MODE");
        assert_eq!(event.args, vec!["", "#chan"]);
    }

    #[test]
    fn test_parse_degenerate_lines() {
        let event = Event::parse("");
        assert_eq!(event.code, "");
        assert!(event.args.is_empty());
        assert!(event.source.is_none());
        assert!(event.message.is_none());

        // A colon with no following space never yields a source.
        let event = Event::parse(":lonely");
        assert!(event.source.is_none());
        assert_eq!(event.code, ":LONELY");
    }

    #[test]
    fn test_source_nick_accessor() {
        let event = Event::parse(":bob!u@h NICK :bob2");
        assert_eq!(event.source_nick(), Some("bob"));

        let event = Event::parse(":irc.example.net NOTICE * :hi");
        assert_eq!(event.source_nick(), None);

        let event = Event::parse("PING :x");
        assert_eq!(event.source_nick(), None);
    }

    #[test]
    fn test_source_pattern_ordering() {
        // `@` before `!` is not a user mask.
        let source = Source::parse("odd@name!here");
        assert!(source.nick.is_empty());
        assert_eq!(source.raw, "odd@name!here");

        // Missing either separator keeps the prefix opaque.
        assert!(Source::parse("nick!user").nick.is_empty());
        assert!(Source::parse("user@host").nick.is_empty());
    }

    #[test]
    fn test_compose_basic() {
        assert_eq!(
            compose("PRIVMSG", "hello there", &["#chan"]),
            "PRIVMSG #chan :hello there"
        );
    }

    #[test]
    fn test_compose_no_message_omits_marker() {
        assert_eq!(compose("NICK", "", &["bob_"]), "NICK bob_");
        assert_eq!(compose("QUIT", "", &[]), "QUIT");
    }

    #[test]
    fn test_compose_param_order() {
        assert_eq!(
            compose("USER", "real name", &["bob", "0.0.0.0", "0.0.0.0"]),
            "USER bob 0.0.0.0 0.0.0.0 :real name"
        );
    }

    #[test]
    fn test_round_trip() {
        let line = compose("PRIVMSG", "some message", &["#chan"]);
        let event = Event::parse(&line);
        assert_eq!(event.code, "PRIVMSG");
        assert_eq!(event.args, vec!["#chan"]);
        assert_eq!(event.message.as_deref(), Some("some message"));

        let line = compose("PING", "", &["1234567890"]);
        let event = Event::parse(&line);
        assert_eq!(event.code, "PING");
        assert_eq!(event.args, vec!["1234567890"]);
        assert_eq!(event.message, None);
    }
}
