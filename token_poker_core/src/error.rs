use thiserror::Error;

/// Defects detected by the engine.
///
/// None of these is produced by an illegal player intent: those resolve to an
/// unchanged state. An `EngineError` means the caller handed the engine input
/// it can never legitimately produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("a poker hand has exactly 5 cards, got {0}")]
    InvalidHandSize(usize),

    #[error("best-hand search needs at least 5 slots, got {0}")]
    PoolTooSmall(usize),

    #[error("cannot deal {requested} cards, only {remaining} left in the deck")]
    DeckExhausted { requested: usize, remaining: usize },

    #[error("player {0:?} appears twice in the roster")]
    DuplicatePlayer(String),

    #[error("token conservation violated: {0}")]
    TokenConservation(String),

    #[error("reveal index {reveal_index} exceeds player count {players}")]
    RevealOutOfRange { reveal_index: usize, players: usize },
}

/// A card string that is not of the form `<rank><suit>`, e.g. `Ts`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse card {0:?}, expected e.g. `Ts`, `2c`, `Ah`")]
pub struct ParseCardError(pub String);
