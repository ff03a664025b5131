//! Versioned room store for token poker.
//!
//! Each room holds one `RoomState` and a version counter. Clients long-poll
//! for new versions and commit whole states with compare-and-swap on the
//! version; the rules themselves run client-side in `token_poker_core`.

pub mod config;
pub mod logging;
pub mod store;
pub mod ws;
