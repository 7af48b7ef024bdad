//! Handlers installed on every new client.
//!
//! These keep a session alive and correctly named without any user code:
//! server `PING`s are answered, the conventional CTCP queries get their
//! replies, nickname collisions retry with a mutated candidate, and
//! nickname changes and the welcome reply update the tracked nickname.
//! Each one occupies an ordinary dispatch slot, so callers can override
//! or remove any of them.

use tracing::debug;

use crate::client::SessionHandle;
use crate::codes;
use crate::ctcp;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::event::Event;

pub(crate) fn install(dispatcher: &Dispatcher) {
    dispatcher.register(codes::PING, |event, session| async move {
        session
            .command(codes::PONG, event.message.as_deref().unwrap_or(""), &[])
            .await
    });

    dispatcher.register(codes::CTCP_VERSION, |event, session| async move {
        let Some(nick) = event.source_nick() else {
            return Ok(());
        };
        let reply = format!("{d}{d}VERSION {v}{d}", d = ctcp::DELIM, v = session.version());
        session.notice(nick, &reply).await
    });

    dispatcher.register(codes::CTCP_TIME, |event, session| async move {
        let Some(nick) = event.source_nick() else {
            return Ok(());
        };
        let reply = ctcp::wrap(&format!("TIME {}", chrono::Local::now()));
        session.notice(nick, &reply).await
    });

    dispatcher.register(codes::CTCP_USERINFO, |event, session| async move {
        let Some(nick) = event.source_nick() else {
            return Ok(());
        };
        let reply = format!(
            "{d}{d}USERINFO {u}{d}",
            d = ctcp::DELIM,
            u = session.username()
        );
        session.notice(nick, &reply).await
    });

    dispatcher.register(codes::CTCP_CLIENTINFO, |event, session| async move {
        let Some(nick) = event.source_nick() else {
            return Ok(());
        };
        let reply = ctcp::wrap("CLIENTINFO PING VERSION TIME USERINFO CLIENTINFO");
        session.notice(nick, &reply).await
    });

    dispatcher.register(codes::CTCP_PING, |event, session| async move {
        let Some(nick) = event.source_nick() else {
            return Ok(());
        };
        let payload = event.message.as_deref().unwrap_or(codes::PING);
        session.notice(nick, &ctcp::wrap(payload)).await
    });

    dispatcher.register(codes::ERR_NICKNAMEINUSE, retry_nick);
    dispatcher.register(codes::ERR_BANNICKCHANGE, retry_nick);

    dispatcher.register(codes::NICK, |event, session| async move {
        let (Some(from), Some(to)) = (event.source_nick(), event.message.as_deref()) else {
            return Ok(());
        };
        session.state().confirm_nick(from, to).await;
        Ok(())
    });

    dispatcher.register(codes::RPL_WELCOME, |event, session| async move {
        if let Some(nick) = event.args.first() {
            session.state().welcome(nick).await;
        }
        Ok(())
    });
}

/// Shared by `433` and `437`: the requested nickname is unavailable, so
/// mutate it and try again.
async fn retry_nick(_event: Event, session: SessionHandle) -> Result<()> {
    let Some(nick) = session.state().fallback_nick().await else {
        return Ok(());
    };
    debug!(nick = %nick, "nickname unavailable, retrying");
    session.command(codes::NICK, "", &[&nick]).await
}
