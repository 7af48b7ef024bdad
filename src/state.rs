//! Session state tracked by a dedicated actor task.
//!
//! Nickname bookkeeping, the idle clock, and the lifecycle status are all
//! owned by one task and queried over a channel. Collision fallback and
//! periodic recapture are single request/reply round trips, so concurrent
//! readers and timers never observe a half-applied update.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;

const STATE_QUEUE_DEPTH: usize = 32;

/// Nicknames longer than this are mutated by prefixing on collision;
/// shorter ones grow a suffix instead.
const NICK_GROWTH_LIMIT: usize = 8;

/// Lifecycle of a single connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No transport bound; commands are rejected.
    Disconnected,
    /// Transport bound, registration sent, welcome not yet seen.
    Registering,
    /// Server acknowledged registration.
    Active,
    /// Teardown in progress; loops are being drained and joined.
    Disconnecting,
}

/// Mutates a rejected nickname into the next candidate.
///
/// Short nicknames grow a `_` suffix; nicknames already longer than
/// eight bytes gain a `_` prefix so they stop growing at the tail.
fn fallback_of(nick: &str) -> String {
    if nick.len() > NICK_GROWTH_LIMIT {
        format!("_{nick}")
    } else {
        format!("{nick}_")
    }
}

enum Request {
    Touch,
    IdleFor {
        reply_tx: oneshot::Sender<Duration>,
    },
    CurrentNick {
        reply_tx: oneshot::Sender<String>,
    },
    GetStatus {
        reply_tx: oneshot::Sender<Status>,
    },
    SetDesired {
        nick: String,
    },
    FallbackNick {
        reply_tx: oneshot::Sender<String>,
    },
    Recapture {
        reply_tx: oneshot::Sender<Option<String>>,
    },
    ConfirmNick {
        from: String,
        to: String,
        reply_tx: oneshot::Sender<bool>,
    },
    Welcome {
        nick: String,
    },
    Connect {
        reply_tx: oneshot::Sender<Option<String>>,
    },
    Disconnect {
        reply_tx: oneshot::Sender<bool>,
    },
    Disconnected,
}

/// Cloneable handle to the session-state actor.
///
/// Queries stay answerable while the read loop, the keepalive monitor,
/// and user handlers race each other; the actor serializes them. If the
/// actor is gone (client dropped mid-teardown), queries return
/// conservative defaults and mutations become no-ops.
#[derive(Clone)]
pub struct StateHandle {
    tx: mpsc::Sender<Request>,
}

impl StateHandle {
    /// Spawns the actor task. Must be called from within a Tokio runtime.
    ///
    /// The task exits on its own once every handle is dropped.
    pub(crate) fn spawn(desired: &str) -> Self {
        let (tx, rx) = mpsc::channel(STATE_QUEUE_DEPTH);
        let state = SessionState {
            desired: desired.to_string(),
            current: desired.to_string(),
            status: Status::Disconnected,
            last_message: Instant::now(),
        };
        tokio::spawn(state.run(rx));
        StateHandle { tx }
    }

    async fn request<T>(&self, request: Request, reply_rx: oneshot::Receiver<T>) -> Option<T> {
        self.tx.send(request).await.ok()?;
        reply_rx.await.ok()
    }

    /// Marks the session as having heard from the server just now.
    pub(crate) async fn touch(&self) {
        let _ = self.tx.send(Request::Touch).await;
    }

    /// Time elapsed since the last inbound line (or since connect).
    pub async fn idle_for(&self) -> Duration {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Request::IdleFor { reply_tx }, reply_rx)
            .await
            .unwrap_or(Duration::ZERO)
    }

    /// The nickname the server currently knows this session by.
    ///
    /// Before the welcome reply this is the nickname most recently
    /// attempted, including any collision fallbacks.
    pub async fn current_nick(&self) -> String {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Request::CurrentNick { reply_tx }, reply_rx)
            .await
            .unwrap_or_default()
    }

    /// Current lifecycle status.
    pub async fn status(&self) -> Status {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Request::GetStatus { reply_tx }, reply_rx)
            .await
            .unwrap_or(Status::Disconnected)
    }

    /// Records a new desired nickname; recapture will chase it.
    pub(crate) async fn set_desired(&self, nick: &str) {
        let _ = self
            .tx
            .send(Request::SetDesired {
                nick: nick.to_string(),
            })
            .await;
    }

    /// Applies the collision fallback rule and returns the candidate
    /// that should be attempted next.
    pub(crate) async fn fallback_nick(&self) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Request::FallbackNick { reply_tx }, reply_rx)
            .await
    }

    /// If the current nickname has drifted from the desired one,
    /// optimistically re-adopts the desired nickname and returns it so
    /// the caller can re-issue the change request.
    pub(crate) async fn recapture(&self) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Request::Recapture { reply_tx }, reply_rx)
            .await
            .flatten()
    }

    /// Adopts `to` if `from` matches the tracked nickname. Returns
    /// whether the change applied.
    pub(crate) async fn confirm_nick(&self, from: &str, to: &str) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(
            Request::ConfirmNick {
                from: from.to_string(),
                to: to.to_string(),
                reply_tx,
            },
            reply_rx,
        )
        .await
        .unwrap_or(false)
    }

    /// Registration acknowledged: adopt the server-assigned nickname
    /// and move to [`Status::Active`].
    pub(crate) async fn welcome(&self, nick: &str) {
        let _ = self
            .tx
            .send(Request::Welcome {
                nick: nick.to_string(),
            })
            .await;
    }

    /// Transitions `Disconnected` -> `Registering` and resets the
    /// nickname baseline. Returns the nickname to register with, or
    /// `None` if a session is already up.
    pub(crate) async fn connect(&self) -> Option<String> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Request::Connect { reply_tx }, reply_rx)
            .await
            .flatten()
    }

    /// Transitions an established session to `Disconnecting`. Returns
    /// false if there is nothing to tear down.
    pub(crate) async fn disconnect(&self) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Request::Disconnect { reply_tx }, reply_rx)
            .await
            .unwrap_or(false)
    }

    /// Final transition once teardown has completed.
    pub(crate) async fn disconnected(&self) {
        let _ = self.tx.send(Request::Disconnected).await;
    }
}

struct SessionState {
    desired: String,
    current: String,
    status: Status,
    last_message: Instant,
}

impl SessionState {
    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        while let Some(request) = rx.recv().await {
            self.handle(request);
        }
        debug!("session state actor stopped");
    }

    fn handle(&mut self, request: Request) {
        match request {
            Request::Touch => {
                self.last_message = Instant::now();
            }
            Request::IdleFor { reply_tx } => {
                let _ = reply_tx.send(self.last_message.elapsed());
            }
            Request::CurrentNick { reply_tx } => {
                let _ = reply_tx.send(self.current.clone());
            }
            Request::GetStatus { reply_tx } => {
                let _ = reply_tx.send(self.status);
            }
            Request::SetDesired { nick } => {
                self.desired = nick;
            }
            Request::FallbackNick { reply_tx } => {
                self.current = fallback_of(&self.current);
                debug!(nick = %self.current, "nickname collision fallback");
                let _ = reply_tx.send(self.current.clone());
            }
            Request::Recapture { reply_tx } => {
                let reply = if self.current != self.desired {
                    self.current = self.desired.clone();
                    Some(self.desired.clone())
                } else {
                    None
                };
                let _ = reply_tx.send(reply);
            }
            Request::ConfirmNick { from, to, reply_tx } => {
                let applies = from == self.current;
                if applies {
                    debug!(from = %self.current, to = %to, "nickname change confirmed");
                    self.current = to;
                }
                let _ = reply_tx.send(applies);
            }
            Request::Welcome { nick } => {
                self.current = nick;
                if self.status == Status::Registering {
                    self.status = Status::Active;
                }
                debug!(nick = %self.current, "registration complete");
            }
            Request::Connect { reply_tx } => {
                let reply = if self.status == Status::Disconnected {
                    self.status = Status::Registering;
                    self.current = self.desired.clone();
                    self.last_message = Instant::now();
                    Some(self.desired.clone())
                } else {
                    None
                };
                let _ = reply_tx.send(reply);
            }
            Request::Disconnect { reply_tx } => {
                let applies = matches!(self.status, Status::Registering | Status::Active);
                if applies {
                    self.status = Status::Disconnecting;
                }
                let _ = reply_tx.send(applies);
            }
            Request::Disconnected => {
                self.status = Status::Disconnected;
            }
        }
    }
}
