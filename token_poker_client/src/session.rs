//! Keeping one player intent alive across lost commit races.

use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;
use token_poker_core::{ClientMessage, EngineError, Intent, RoomState, ServerMessage, Version, apply};
use tracing::{debug, trace, warn};

/// The client's view of one room.
///
/// Holds the latest snapshot and at most one pending intent. The intent is
/// re-applied to every new snapshot: if it changes nothing any more it is
/// dropped, otherwise it is committed against that snapshot's version.
#[derive(Debug, Clone)]
pub struct Session {
    room: String,
    snapshot: Option<(Version, RoomState)>,
    pending: Option<Intent>,
    /// Intents of commits sent and not yet answered, oldest first.
    in_flight: VecDeque<Intent>,
    /// Set after reconnecting: the next snapshot is taken whatever its
    /// version, since a restarted store counts from 1 again.
    resync: bool,
}

impl Session {
    pub fn new(room: impl Into<String>) -> Self {
        Session { room: room.into(), snapshot: None, pending: None, in_flight: VecDeque::new(), resync: false }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn state(&self) -> Option<&RoomState> {
        self.snapshot.as_ref().map(|(_, state)| state)
    }

    pub fn version(&self) -> Option<Version> {
        self.snapshot.as_ref().map(|(version, _)| *version)
    }

    pub fn pending(&self) -> Option<&Intent> {
        self.pending.as_ref()
    }

    /// The long-poll to keep outstanding.
    pub fn poll(&self) -> ClientMessage {
        let known_version = if self.resync { None } else { self.version() };
        ClientMessage::List { room: self.room.clone(), known_version }
    }

    /// Forgets commits sent over a connection that is gone, whose results
    /// will never arrive, and accepts whatever version the store is at now.
    pub fn reconnected(&mut self) {
        self.in_flight.clear();
        self.resync = true;
    }

    /// Replaces the pending intent with `intent` and commits it if a snapshot
    /// is already known.
    pub fn submit<R: Rng + ?Sized>(&mut self, intent: Intent, rng: &mut R) -> Result<Option<ClientMessage>, EngineError> {
        self.pending = Some(intent);
        self.recompute(rng)
    }

    /// Handles one server message, returning what to send back.
    pub fn on_message<R: Rng + ?Sized>(
        &mut self,
        msg: ServerMessage,
        rng: &mut R,
    ) -> Result<Vec<ClientMessage>, EngineError> {
        match msg {
            ServerMessage::Snapshot { room, version, data } if room == self.room => {
                if !self.resync && self.version().is_some_and(|known| known >= version) {
                    trace!(version, "stale snapshot ignored");
                    return Ok(vec![self.poll()]);
                }
                debug!(version, phase = %data.phase(), "snapshot");
                self.snapshot = Some((version, data));
                self.resync = false;
                let mut out: Vec<ClientMessage> = self.recompute(rng)?.into_iter().collect();
                out.push(self.poll());
                Ok(out)
            }
            ServerMessage::Timeout { room } if room == self.room => Ok(vec![self.poll()]),
            ServerMessage::CommitResult { room, success } if room == self.room => {
                let sent = self.in_flight.pop_front();
                if success {
                    if sent.is_some() && sent == self.pending {
                        self.pending = None;
                    }
                } else {
                    // the next snapshot brings the winning state; the intent is
                    // recomputed against it
                    debug!(intent = ?sent, "commit lost the race");
                }
                Ok(Vec::new())
            }
            ServerMessage::Error { message } => {
                let sent = self.in_flight.pop_front();
                warn!(intent = ?sent, "server error: {}", message);
                if sent.is_some() && sent == self.pending {
                    self.pending = None;
                }
                Ok(Vec::new())
            }
            other => {
                trace!(?other, "message for another room ignored");
                Ok(Vec::new())
            }
        }
    }

    fn recompute<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<ClientMessage>, EngineError> {
        let Some(intent) = self.pending.clone() else {
            return Ok(None);
        };
        let Some((version, state)) = &self.snapshot else {
            return Ok(None);
        };
        if self.resync {
            trace!(?intent, "held until the store is read again");
            return Ok(None);
        }
        let next = match apply(state, &intent, rng) {
            Ok(next) => next,
            Err(e) => {
                self.pending = None;
                return Err(e);
            }
        };
        if next == *state {
            debug!(?intent, "intent changes nothing, dropped");
            self.pending = None;
            return Ok(None);
        }
        let commit = ClientMessage::Commit { room: self.room.clone(), base_version: *version, state: next };
        self.in_flight.push_back(intent);
        Ok(Some(commit))
    }
}

/// Delay before the next reconnection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
}

impl Backoff {
    pub const INITIAL: Duration = Duration::from_secs(1);
    pub const MAX: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Backoff { current: Self::INITIAL }
    }

    /// The delay to wait now; the one after it is this one scaled by a random
    /// factor in `[0.5, 1.5)`, never above `MAX`.
    pub fn next_delay<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let delay = self.current;
        let factor: f64 = rng.random_range(0.5..1.5);
        self.current = self.current.mul_f64(factor).min(Self::MAX);
        delay
    }

    pub fn reset(&mut self) {
        self.current = Self::INITIAL;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
