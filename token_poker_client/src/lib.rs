//! Console client for token poker: long-polls a room, runs the rules locally
//! and commits the resulting states.

pub mod command;
pub mod session;
pub mod view;
