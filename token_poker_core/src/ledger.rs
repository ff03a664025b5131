//! Token pickup, return and transfer during bidding.
//!
//! Every function here takes the current snapshot by reference and returns a
//! new one. When a precondition fails the result is an unchanged clone, never
//! an error: the same intent may be resubmitted after a lost commit race and
//! must then quietly do nothing.

use crate::error::EngineError;
use crate::jokers;
use crate::state::*;
use tracing::{debug, trace};

/// Puts `player`'s token back in the centre.
pub fn relinquish(state: &BiddingState, player: &str) -> BiddingState {
    let Some(idx) = find_player(&state.players, player) else {
        trace!(player, "relinquish ignored: not in this room");
        return state.clone();
    };
    let mut next = state.clone();
    match return_to_centre(&mut next, idx) {
        Some(token) => record(&mut next, RoundLogEntry { player: idx, action: LogAction::Put { token } }),
        None => trace!(player, "relinquish ignored: holds no token"),
    }
    next
}

/// Moves `token` from the centre to `player`, who first puts back whatever
/// they were holding.
pub fn take_from_centre(state: &BiddingState, player: &str, token: Token) -> BiddingState {
    let Some(idx) = find_player(&state.players, player) else {
        trace!(player, "take ignored: not in this room");
        return state.clone();
    };
    let slot = token.centre_slot();
    if state.tokens.get(slot) != Some(&Some(token)) {
        trace!(player, %token, "take ignored: token is not in the centre");
        return state.clone();
    }

    let mut next = state.clone();
    let put = return_to_centre(&mut next, idx);
    next.tokens[slot] = None;
    next.players[idx].token = Some(token);
    record(&mut next, RoundLogEntry { player: idx, action: LogAction::Take { token, from: None, put } });
    next
}

/// Moves `token` straight from `victim` to `requester`; it never passes
/// through the centre, so the victim is left empty-handed.
pub fn take_from_player(state: &BiddingState, requester: &str, victim: &str, token: Token) -> BiddingState {
    if requester == victim {
        trace!(requester, "take ignored: cannot take from yourself");
        return state.clone();
    }
    let (Some(to), Some(from)) = (find_player(&state.players, requester), find_player(&state.players, victim)) else {
        trace!(requester, victim, "take ignored: unknown player");
        return state.clone();
    };
    if state.players[from].token != Some(token) {
        trace!(requester, victim, %token, "take ignored: victim does not hold that token");
        return state.clone();
    }

    let mut next = state.clone();
    let put = return_to_centre(&mut next, to);
    next.players[from].token = None;
    next.players[to].token = Some(token);
    record(&mut next, RoundLogEntry { player: to, action: LogAction::Take { token, from: Some(from), put } });
    next
}

/// Closes the current round once every token is held.
///
/// Tokens are archived into each player's history; then either the next
/// scheduled round opens, or, with the schedule exhausted, scoring starts.
pub fn advance_round(state: &BiddingState) -> Result<RoomState, EngineError> {
    if state.tokens.iter().any(Option::is_some) {
        trace!("advance ignored: tokens left in the centre");
        return Ok(RoomState::Bidding(state.clone()));
    }

    let mut next = state.clone();
    for player in &mut next.players {
        let token = player.token.take().ok_or_else(|| {
            EngineError::TokenConservation(format!("{} holds no token although the centre is empty", player.name))
        })?;
        player.past_tokens.push(token);
    }
    open_next_round(next)
}

/// Opens the next scheduled round of `state`, or moves to scoring when none is
/// left. Players must not be holding tokens.
pub(crate) fn open_next_round(mut state: BiddingState) -> Result<RoomState, EngineError> {
    if state.future_rounds.is_empty() {
        debug!(rounds = state.log.len(), "schedule exhausted, scoring");
        return Ok(RoomState::Scoring(ScoringState {
            players: state.players,
            config: state.config,
            community_cards: state.community_cards,
            deck: state.deck,
            log: state.log,
            joker_log: state.joker_log,
            reveal_index: 0,
        }));
    }

    let round = state.future_rounds.remove(0);
    let (dealt, deck) = state.deck.deal(round.cards)?;
    let (slots, deck) = jokers::reveal_slots(dealt, deck)?;
    state.community_cards.extend(slots);
    state.deck = deck;

    let round_index = state.log.len() as u32;
    state.tokens = (1..=state.players.len())
        .map(|index| Some(Token::new(index as u8, round_index)))
        .collect();
    state.log.push(Vec::new());
    debug!(round = round_index, community = state.community_cards.len(), "round opened");
    Ok(RoomState::Bidding(state))
}

/// Verifies that the players and the centre together hold exactly the tokens
/// minted for the current round, each once.
pub fn check_conservation(state: &BiddingState) -> Result<(), EngineError> {
    let n = state.players.len();
    let violation = |msg: String| Err(EngineError::TokenConservation(msg));

    let Some(round) = state.log.len().checked_sub(1) else {
        return violation("bidding without an open round".to_string());
    };
    if state.tokens.len() != n {
        return violation(format!("{} centre slots for {} players", state.tokens.len(), n));
    }
    for (slot, token) in state.tokens.iter().enumerate() {
        if let Some(token) = token {
            if token.centre_slot() != slot {
                return violation(format!("token {} sits in centre slot {}", token, slot + 1));
            }
        }
    }

    let mut indices: Vec<u8> = Vec::with_capacity(n);
    let all = state.tokens.iter().flatten().chain(state.players.iter().filter_map(|p| p.token.as_ref()));
    for token in all {
        if token.round as usize != round {
            return violation(format!("token {} is not from round {}", token, round));
        }
        indices.push(token.index);
    }
    indices.sort_unstable();
    if !indices.iter().copied().eq(1..=n as u8) {
        return violation(format!("round {} holds tokens {:?}, expected 1..={}", round, indices, n));
    }
    Ok(())
}

// --- helpers ---

/// Returns player `idx`'s token to its centre slot, if they hold one.
fn return_to_centre(state: &mut BiddingState, idx: PlayerIndex) -> Option<Token> {
    let token = state.players[idx].token.take()?;
    state.tokens[token.centre_slot()] = Some(token);
    Some(token)
}

fn record(state: &mut BiddingState, entry: RoundLogEntry) {
    match state.log.last_mut() {
        Some(page) => page.push(entry),
        None => state.log.push(vec![entry]),
    }
}
