use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use token_poker_core::{EngineError, RoomState, Version};
use tokio::sync::watch;
use tracing::{debug, info};

/// A room's state together with the version it was committed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub version: Version,
    pub state: RoomState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    Changed(Versioned),
    Timeout,
}

/// All rooms, keyed by name. A room exists from the first time anyone asks
/// for it and is never removed.
pub struct RoomStore {
    rooms: DashMap<String, Arc<watch::Sender<Versioned>>>,
    poll_window: Duration,
}

impl RoomStore {
    pub fn new(poll_window: Duration) -> Self {
        RoomStore { rooms: DashMap::new(), poll_window }
    }

    fn room(&self, name: &str) -> Arc<watch::Sender<Versioned>> {
        self.rooms
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(room = name, "room created");
                Arc::new(watch::Sender::new(Versioned { version: 1, state: RoomState::default() }))
            })
            .clone()
    }

    pub fn current(&self, room: &str) -> Versioned {
        self.room(room).borrow().clone()
    }

    /// Replaces the room's state if it is still at `base_version`.
    ///
    /// Returns whether the commit won. Every waiting `list` on the room is
    /// woken when it does.
    ///
    /// # Errors
    ///
    /// `state` breaks an engine invariant; nothing is stored.
    pub fn commit(&self, room: &str, base_version: Version, state: RoomState) -> Result<bool, EngineError> {
        state.validate()?;
        let phase = state.phase();
        let committed = self.room(room).send_if_modified(|current| {
            if current.version != base_version {
                return false;
            }
            current.version += 1;
            current.state = state;
            true
        });
        if committed {
            debug!(room, version = base_version + 1, %phase, "commit accepted");
        } else {
            debug!(room, base_version, "commit lost the race");
        }
        Ok(committed)
    }

    /// Waits until the room is at a version other than `known_version`, for
    /// at most the poll window. `None` never waits.
    pub async fn list(&self, room: &str, known_version: Option<Version>) -> ListOutcome {
        let mut rx = self.room(room).subscribe();
        let waited = tokio::time::timeout(self.poll_window, rx.wait_for(|v| Some(v.version) != known_version)).await;
        match waited {
            Ok(Ok(current)) => ListOutcome::Changed(current.clone()),
            Ok(Err(_)) | Err(_) => ListOutcome::Timeout,
        }
    }
}
