//! Event dispatch table.
//!
//! Handlers are keyed by uppercased event code and invoked on their own
//! task, so a slow or faulty handler never stalls the read loop. CTCP
//! requests hiding inside `PRIVMSG` are reclassified before lookup.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::client::SessionHandle;
use crate::ctcp;
use crate::error::Result;
use crate::event::Event;

/// Type-erased event handler.
pub type Handler = Arc<dyn Fn(Event, SessionHandle) -> BoxFuture<'static, Result<()>> + Send + Sync>;

struct Registry {
    table: HashMap<String, Handler>,
    fallback: Option<Handler>,
}

/// Maps event codes to handlers.
///
/// Registration is cheap and may happen at any time, including from
/// inside a running handler. At most one handler is kept per code;
/// re-registering replaces the previous one.
pub struct Dispatcher {
    registry: RwLock<Registry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            registry: RwLock::new(Registry {
                table: HashMap::new(),
                fallback: None,
            }),
        }
    }

    fn boxed<F, Fut>(handler: F) -> Handler
    where
        F: Fn(Event, SessionHandle) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        Arc::new(move |event, session| handler(event, session).boxed())
    }

    /// Installs `handler` for `code`, replacing any previous handler.
    ///
    /// Codes are matched case-insensitively; `"ping"` and `"PING"`
    /// name the same slot.
    pub fn register<F, Fut>(&self, code: &str, handler: F)
    where
        F: Fn(Event, SessionHandle) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.registry
            .write()
            .table
            .insert(code.to_uppercase(), Self::boxed(handler));
    }

    /// Removes the handler for `code`. Returns whether one was present.
    pub fn unregister(&self, code: &str) -> bool {
        self.registry
            .write()
            .table
            .remove(&code.to_uppercase())
            .is_some()
    }

    /// Installs a handler for every event without a dedicated slot.
    pub fn set_fallback<F, Fut>(&self, handler: F)
    where
        F: Fn(Event, SessionHandle) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.registry.write().fallback = Some(Self::boxed(handler));
    }

    /// Routes one event to its handler, spawning the invocation.
    ///
    /// Events nobody asked for are dropped silently; a handler that
    /// returns an error is logged and the session carries on.
    pub fn dispatch(&self, mut event: Event, session: SessionHandle) {
        ctcp::reclassify(&mut event);

        let handler = {
            let registry = self.registry.read();
            registry
                .table
                .get(&event.code)
                .or(registry.fallback.as_ref())
                .cloned()
        };

        let Some(handler) = handler else {
            trace!(code = %event.code, "unhandled event");
            return;
        };

        let code = event.code.clone();
        tokio::spawn(async move {
            if let Err(error) = handler(event, session).await {
                warn!(code = %code, error = %error, "event handler failed");
            }
        });
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Identity;
    use crate::codes;
    use crate::error::Error;
    use crate::state::StateHandle;
    use tokio::sync::mpsc;

    fn test_session() -> (SessionHandle, mpsc::Receiver<String>, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(8);
        let identity = Arc::new(Identity {
            username: "tester".to_string(),
            version: "test-client 0".to_string(),
        });
        let session = SessionHandle::new(tx.downgrade(), StateHandle::spawn("tester"), identity);
        (session, rx, tx)
    }

    async fn drain_spawned() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_dispatch_runs_registered_handler() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(codes::PRIVMSG, |event, session| async move {
            session.raw(&format!("SEEN {}", event.code)).await
        });

        let (session, mut rx, _tx) = test_session();
        dispatcher.dispatch(Event::parse(":a!b@c PRIVMSG #chan :hi"), session);
        assert_eq!(rx.recv().await.as_deref(), Some("SEEN PRIVMSG"));
    }

    #[tokio::test]
    async fn test_codes_match_case_insensitively() {
        let dispatcher = Dispatcher::new();
        dispatcher.register("privmsg", |_, session| async move {
            session.raw("MATCHED").await
        });

        let (session, mut rx, _tx) = test_session();
        dispatcher.dispatch(Event::parse(":a!b@c PRIVMSG #chan :hi"), session);
        assert_eq!(rx.recv().await.as_deref(), Some("MATCHED"));
    }

    #[tokio::test]
    async fn test_reregistering_replaces_handler() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(codes::PING, |_, session| async move {
            session.raw("FIRST").await
        });
        dispatcher.register(codes::PING, |_, session| async move {
            session.raw("SECOND").await
        });

        let (session, mut rx, _tx) = test_session();
        dispatcher.dispatch(Event::parse("PING :x"), session);
        assert_eq!(rx.recv().await.as_deref(), Some("SECOND"));
    }

    #[tokio::test]
    async fn test_unregister_silences_code() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(codes::PING, |_, session| async move {
            session.raw("PONG").await
        });
        assert!(dispatcher.unregister("ping"));
        assert!(!dispatcher.unregister("ping"));

        let (session, mut rx, _tx) = test_session();
        dispatcher.dispatch(Event::parse("PING :x"), session);
        drain_spawned().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fallback_sees_only_unmatched_events() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(codes::PING, |_, session| async move {
            session.raw("DEDICATED").await
        });
        dispatcher.set_fallback(|event, session| async move {
            session.raw(&format!("FALLBACK {}", event.code)).await
        });

        let (session, mut rx, _tx) = test_session();
        dispatcher.dispatch(Event::parse("PING :x"), session.clone());
        assert_eq!(rx.recv().await.as_deref(), Some("DEDICATED"));

        dispatcher.dispatch(Event::parse(":irc.example 372 ada :motd"), session);
        assert_eq!(rx.recv().await.as_deref(), Some("FALLBACK 372"));
    }

    #[tokio::test]
    async fn test_ctcp_reclassified_before_lookup() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(codes::CTCP_VERSION, |event, session| async move {
            session
                .raw(&format!(
                    "GOT {} {}",
                    event.code,
                    event.message.as_deref().unwrap_or("")
                ))
                .await
        });

        let (session, mut rx, _tx) = test_session();
        dispatcher.dispatch(
            Event::parse(":a!b@c PRIVMSG ada :\u{1}VERSION\u{1}"),
            session,
        );
        assert_eq!(rx.recv().await.as_deref(), Some("GOT CTCP_VERSION VERSION"));
    }

    #[tokio::test]
    async fn test_handler_error_does_not_poison_dispatcher() {
        let dispatcher = Dispatcher::new();
        dispatcher.register(codes::PING, |_, _| async move {
            Err(Error::ConnectionClosed)
        });

        let (session, mut rx, _tx) = test_session();
        dispatcher.dispatch(Event::parse("PING :x"), session.clone());
        drain_spawned().await;

        dispatcher.register(codes::PING, |_, session| async move {
            session.raw("RECOVERED").await
        });
        dispatcher.dispatch(Event::parse("PING :x"), session);
        assert_eq!(rx.recv().await.as_deref(), Some("RECOVERED"));
    }

    #[tokio::test]
    async fn test_unhandled_event_is_dropped() {
        let dispatcher = Dispatcher::new();
        let (session, mut rx, _tx) = test_session();
        dispatcher.dispatch(Event::parse(":irc.example 001 ada :welcome"), session);
        drain_spawned().await;
        assert!(rx.try_recv().is_err());
    }
}
