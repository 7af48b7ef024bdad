//! # slirc-session
//!
//! A single-connection IRC client session engine built on Tokio:
//! concurrent read and write loops over a line codec, per-code event
//! dispatch with CTCP classification, and automatic handling of the
//! chores every client repeats — keepalive probing, CTCP replies,
//! nickname collisions, and nickname recovery.
//!
//! ## Features
//!
//! - Line framing bounded to the protocol's 512-byte frame
//! - Best-effort, total parsing of inbound lines into [`Event`]s
//! - Handler dispatch keyed by command, numeric, or synthetic CTCP code,
//!   with override and fallback slots
//! - Built-in handlers for `PING`, the conventional CTCP queries,
//!   nickname collisions, and registration tracking
//! - Idle-probe and nickname-recapture timers per session
//! - Plain TCP (with OS keepalive) and TLS transports, or any
//!   `AsyncRead + AsyncWrite` stream via [`Client::bind`]

#![deny(clippy::all)]

//! ## Quick Start
//!
//! ```no_run
//! use slirc_session::{codes, Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> slirc_session::Result<()> {
//!     let client = Client::new(Config::new("rustbot", "rustbot"));
//!
//!     client.register(codes::RPL_ENDOFMOTD, |_event, session| async move {
//!         session.join(&["#rust-spam"]).await
//!     });
//!     client.register(codes::PRIVMSG, |event, session| async move {
//!         if event.message.as_deref() == Some("!ping") {
//!             if let Some(nick) = event.source_nick() {
//!                 return session.privmsg(nick, "pong").await;
//!             }
//!         }
//!         Ok(())
//!     });
//!
//!     client.connect("irc.libera.chat:6667").await?;
//!     client.serve().await
//! }
//! ```

pub mod client;
pub mod codes;
pub mod ctcp;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod line;
pub mod monitor;
pub mod state;

mod builtin;

pub use self::client::{default_tls_config, Client, Config, SessionHandle};
pub use self::dispatch::{Dispatcher, Handler};
pub use self::error::{Error, Result};
pub use self::event::{compose, Event, Source};
pub use self::line::{LineCodec, MAX_LINE_LEN};
pub use self::monitor::Monitor;
pub use self::state::{StateHandle, Status};
