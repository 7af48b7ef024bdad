//! Event and command code constants.
//!
//! Codes are plain strings: a dispatchable event carries either an uppercase
//! command name, a three-digit numeric reply, or one of the synthetic `CTCP_*`
//! codes produced by [`crate::ctcp`] classification. These constants are the
//! registry keys for [`crate::Dispatcher`] and the code inputs to
//! [`crate::event::compose`].

// Commands.
pub const NICK: &str = "NICK";
pub const USER: &str = "USER";
pub const PASS: &str = "PASS";
pub const JOIN: &str = "JOIN";
pub const PART: &str = "PART";
pub const QUIT: &str = "QUIT";
pub const NOTICE: &str = "NOTICE";
pub const PRIVMSG: &str = "PRIVMSG";
pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const TIME: &str = "TIME";
pub const MODE: &str = "MODE";
pub const ERROR: &str = "ERROR";
pub const VERSION: &str = "VERSION";

pub const CLIENTINFO: &str = "CLIENTINFO";
pub const USERINFO: &str = "USERINFO";

// Synthetic codes assigned to private messages carrying a CTCP payload.
// These never appear on the wire; they exist so CTCP queries dispatch to
// their own handlers.
/// Unrecognized CTCP query.
pub const CTCP: &str = "CTCP";
pub const CTCP_VERSION: &str = "CTCP_VERSION";
pub const CTCP_TIME: &str = "CTCP_TIME";
pub const CTCP_PING: &str = "CTCP_PING";
pub const CTCP_USERINFO: &str = "CTCP_USERINFO";
pub const CTCP_CLIENTINFO: &str = "CTCP_CLIENTINFO";

// Numeric replies.
/// First reply after successful registration; its first argument is the
/// nickname the server assigned.
pub const RPL_WELCOME: &str = "001";
pub const RPL_YOURHOST: &str = "002";
pub const RPL_CREATED: &str = "003";
pub const RPL_MYINFO: &str = "004";
pub const RPL_ISUPPORT: &str = "005";
pub const RPL_STATSCONN: &str = "250";
pub const RPL_LUSERCLIENT: &str = "251";
pub const RPL_LUSEROP: &str = "252";
pub const RPL_LUSERUNKNOWN: &str = "253";
pub const RPL_LUSERCHANNELS: &str = "254";
pub const RPL_LUSERME: &str = "255";
pub const RPL_LOCALUSERS: &str = "265";
pub const RPL_GLOBALUSERS: &str = "266";
pub const RPL_TOPIC: &str = "332";
pub const RPL_NAMREPLY: &str = "353";
pub const RPL_ENDOFNAMES: &str = "366";
pub const RPL_MOTD: &str = "372";
pub const RPL_MOTDSTART: &str = "375";
pub const RPL_ENDOFMOTD: &str = "376";

/// The requested nickname is already in use.
pub const ERR_NICKNAMEINUSE: &str = "433";
/// The server refused a nickname change (ban).
pub const ERR_BANNICKCHANGE: &str = "437";
