//! Keepalive and nickname-recapture timers.
//!
//! Two periodic duties run for the life of a session: probe the server
//! with `PING` once the link has been quiet too long, and periodically
//! try to win back the desired nickname if collisions forced a fallback.
//! Both run under one monitor task so teardown joins a single handle.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::SessionHandle;
use crate::codes;

/// How often the idle clock is inspected.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// Quiet time after which a probe `PING` is sent.
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(240);

/// How often the desired nickname is re-attempted (with an
/// unconditional probe alongside).
pub const RECAPTURE_INTERVAL: Duration = Duration::from_secs(900);

/// Periodic session maintenance.
///
/// Intervals are injectable so tests can shrink them; production use
/// goes through [`Monitor::default`].
pub struct Monitor {
    probe_interval: Duration,
    idle_threshold: Duration,
    recapture_interval: Duration,
}

impl Monitor {
    pub fn new(
        probe_interval: Duration,
        idle_threshold: Duration,
        recapture_interval: Duration,
    ) -> Self {
        Monitor {
            probe_interval,
            idle_threshold,
            recapture_interval,
        }
    }

    /// Runs both timer loops until `token` is cancelled, then joins
    /// them. Completion of the returned future is the session's single
    /// "monitor stopped" signal.
    pub async fn run(self, session: SessionHandle, token: CancellationToken) {
        let probe = tokio::spawn(probe_loop(
            self.probe_interval,
            self.idle_threshold,
            session.clone(),
            token.clone(),
        ));
        let recapture = tokio::spawn(recapture_loop(self.recapture_interval, session, token));
        let _ = tokio::join!(probe, recapture);
        debug!("keepalive monitor stopped");
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Monitor::new(PROBE_INTERVAL, IDLE_THRESHOLD, RECAPTURE_INTERVAL)
    }
}

async fn probe_loop(
    every: Duration,
    threshold: Duration,
    session: SessionHandle,
    token: CancellationToken,
) {
    let mut timer = tokio::time::interval(every);
    // The first tick completes immediately; skip it.
    timer.tick().await;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = timer.tick() => {
                let idle = session.state().idle_for().await;
                if idle < threshold {
                    continue;
                }
                debug!(idle_secs = idle.as_secs(), "link quiet, probing");
                if session.ping().await.is_err() {
                    // Queue is gone; teardown is under way.
                    break;
                }
            }
        }
    }
}

async fn recapture_loop(every: Duration, session: SessionHandle, token: CancellationToken) {
    let mut timer = tokio::time::interval(every);
    timer.tick().await;
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = timer.tick() => {
                if session.ping().await.is_err() {
                    break;
                }
                if let Some(nick) = session.state().recapture().await {
                    debug!(nick = %nick, "attempting to recapture nickname");
                    if session.command(codes::NICK, "", &[&nick]).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
