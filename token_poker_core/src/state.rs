use crate::card::{Card, Deck};
use crate::error::EngineError;
use crate::ledger;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::slice;

/// Position of a player in the room's roster, 0-indexed.
pub type PlayerIndex = usize;

/// Players needed to start a game.
pub const MIN_PLAYERS: usize = 2;
/// Largest roster a room accepts. Keeps every deal within one deck.
pub const MAX_PLAYERS: usize = 8;

/// A numbered marker minted fresh every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// 1..=N, unique within the round.
    pub index: u8,
    /// 0-indexed round the token was minted for.
    pub round: u32,
}

impl Token {
    pub fn new(index: u8, round: u32) -> Token {
        Token { index, round }
    }

    /// Position of this token's slot in the centre pool.
    pub fn centre_slot(&self) -> usize {
        (self.index as usize).wrapping_sub(1)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}@{}", self.index, self.round)
    }
}

/// A hand or community position.
///
/// A joker never sits in a slot as itself: the moment it is dealt it becomes
/// `Pending`, listing the face-up cards it may turn into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Resolved(Card),
    Pending { joker: u8, candidates: Vec<Card> },
}

impl Slot {
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending { .. })
    }

    /// Every card this slot can still stand for.
    pub fn candidates(&self) -> &[Card] {
        match self {
            Slot::Resolved(card) => slice::from_ref(card),
            Slot::Pending { candidates, .. } => candidates,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Slot::Resolved(card) => write!(f, "{}", card),
            Slot::Pending { candidates, .. } => {
                let shown: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                write!(f, "[{}]", shown.join("|"))
            }
        }
    }
}

/// One entry of the round schedule: community cards revealed when the round opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub cards: usize,
}

/// No cards before the first round, then a flop, a turn and a river.
pub fn default_schedule() -> Vec<Round> {
    [0, 3, 1, 1].into_iter().map(|cards| Round { cards }).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub with_jokers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupPlayer {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub hand: Vec<Slot>,
    /// Tokens held at the end of each finished round, oldest first.
    pub past_tokens: Vec<Token>,
    pub token: Option<Token>,
}

/// What a player did to the token pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    /// Put a token back in the centre.
    Put { token: Token },
    /// Took a token from the centre (`from == None`) or from another player,
    /// first putting back `put` if one was held.
    Take { token: Token, from: Option<PlayerIndex>, put: Option<Token> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundLogEntry {
    pub player: PlayerIndex,
    pub action: LogAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JokerLogEntry {
    pub player: PlayerIndex,
    pub joker: u8,
    pub card: Card,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupState {
    pub players: Vec<SetupPlayer>,
    pub config: GameConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveJokersState {
    pub players: Vec<Player>,
    pub config: GameConfig,
    pub community_cards: Vec<Slot>,
    pub deck: Deck,
    pub future_rounds: Vec<Round>,
    pub joker_log: Vec<JokerLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiddingState {
    pub players: Vec<Player>,
    pub config: GameConfig,
    pub community_cards: Vec<Slot>,
    pub deck: Deck,
    pub future_rounds: Vec<Round>,
    /// Centre pool; slot `i` is empty or holds the token with index `i + 1`.
    pub tokens: Vec<Option<Token>>,
    /// One page per round played so far, the last page being the current round.
    pub log: Vec<Vec<RoundLogEntry>>,
    pub joker_log: Vec<JokerLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringState {
    pub players: Vec<Player>,
    pub config: GameConfig,
    pub community_cards: Vec<Slot>,
    pub deck: Deck,
    pub log: Vec<Vec<RoundLogEntry>>,
    pub joker_log: Vec<JokerLogEntry>,
    /// Hands with a final token index up to this value are visible.
    pub reveal_index: usize,
}

/// Everything the room store persists for one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RoomState {
    Setup(SetupState),
    ResolveJokers(ResolveJokersState),
    Bidding(BiddingState),
    Scoring(ScoringState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomPhase {
    Setup,
    ResolveJokers,
    Bidding,
    Scoring,
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            RoomPhase::Setup => "setup",
            RoomPhase::ResolveJokers => "resolve_jokers",
            RoomPhase::Bidding => "bidding",
            RoomPhase::Scoring => "scoring",
        })
    }
}

impl Default for RoomState {
    /// A freshly created room: setup, nobody in it.
    fn default() -> Self {
        RoomState::Setup(SetupState::default())
    }
}

// --- RoomState helpers ---

impl RoomState {
    pub fn phase(&self) -> RoomPhase {
        match self {
            RoomState::Setup(_) => RoomPhase::Setup,
            RoomState::ResolveJokers(_) => RoomPhase::ResolveJokers,
            RoomState::Bidding(_) => RoomPhase::Bidding,
            RoomState::Scoring(_) => RoomPhase::Scoring,
        }
    }

    pub fn config(&self) -> GameConfig {
        match self {
            RoomState::Setup(s) => s.config,
            RoomState::ResolveJokers(s) => s.config,
            RoomState::Bidding(s) => s.config,
            RoomState::Scoring(s) => s.config,
        }
    }

    /// The roster, in seating order.
    pub fn player_names(&self) -> Vec<&str> {
        match self {
            RoomState::Setup(s) => s.players.iter().map(|p| p.name.as_str()).collect(),
            RoomState::ResolveJokers(s) => names(&s.players),
            RoomState::Bidding(s) => names(&s.players),
            RoomState::Scoring(s) => names(&s.players),
        }
    }

    /// Checks the invariants a well-formed state always satisfies.
    ///
    /// The engine never produces a state failing this; the room store uses it
    /// to refuse commits that did not come from the engine.
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.player_names().into_iter().find(|name| !seen.insert(*name)) {
            return Err(EngineError::DuplicatePlayer(dup.to_string()));
        }
        match self {
            RoomState::Setup(_) | RoomState::ResolveJokers(_) => Ok(()),
            RoomState::Bidding(s) => ledger::check_conservation(s),
            RoomState::Scoring(s) if s.reveal_index > s.players.len() => {
                Err(EngineError::RevealOutOfRange {
                    reveal_index: s.reveal_index,
                    players: s.players.len(),
                })
            }
            RoomState::Scoring(_) => Ok(()),
        }
    }
}

fn names(players: &[Player]) -> Vec<&str> {
    players.iter().map(|p| p.name.as_str()).collect()
}

/// Roster position of the player called `name`.
pub fn find_player(players: &[Player], name: &str) -> Option<PlayerIndex> {
    players.iter().position(|p| p.name == name)
}
