//! # Token poker rules engine
//!
//! Card and deck model, poker hand ranking, best-hand search over slots whose
//! identity may not be fixed yet, the bidding token ledger and the per-room
//! phase state machine, plus the messages exchanged with the room store.
//!
//! Nothing here performs I/O. Every transition takes the current `RoomState`
//! by reference and returns the next one; an intent that does not apply
//! returns a state equal to its input.

mod card;
mod error;
mod jokers;
mod ledger;
mod logic;
mod message;
mod scoring;
mod state;

pub use card::*;

pub use error::*;

pub use jokers::{has_pending_hand, maybe_resolve_jokers, select_card};

pub use ledger::{advance_round, check_conservation, relinquish, take_from_centre, take_from_player};

pub use logic::*;

pub use message::*;

pub use scoring::*;

pub use state::*;
