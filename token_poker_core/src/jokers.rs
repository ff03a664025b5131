//! Choosing what each dealt joker stands for.

use crate::card::{Card, Deck, DeckCard};
use crate::error::EngineError;
use crate::ledger;
use crate::state::*;
use tracing::{debug, trace};

/// Turns one batch of freshly dealt cards into slots.
///
/// One extra card is turned face up from the top of `deck` for every joker in
/// the batch, and each of those jokers lists the whole revealed set as its
/// candidates. Jokers met while revealing are burnt.
pub(crate) fn reveal_slots(dealt: Vec<DeckCard>, deck: Deck) -> Result<(Vec<Slot>, Deck), EngineError> {
    let jokers = dealt.iter().filter(|c| matches!(c, DeckCard::Joker { .. })).count();
    let (revealed, deck) = deck.draw_candidates(jokers)?;
    if jokers > 0 {
        debug!(jokers, ?revealed, "jokers dealt, candidates revealed");
    }
    let slots = dealt
        .into_iter()
        .map(|c| match c {
            DeckCard::Card(card) => Slot::Resolved(card),
            DeckCard::Joker { id } => Slot::Pending { joker: id, candidates: revealed.clone() },
        })
        .collect();
    Ok((slots, deck))
}

/// Whether any player still has a joker to resolve.
pub fn has_pending_hand(players: &[Player]) -> bool {
    players.iter().any(|p| p.hand.iter().any(Slot::is_pending))
}

/// `player` turns their joker at `slot_index` into `chosen`, one of its
/// candidates. A candidate another joker already became is no longer
/// available.
pub fn select_card(state: &ResolveJokersState, player: &str, chosen: Card, slot_index: usize) -> ResolveJokersState {
    let Some(idx) = find_player(&state.players, player) else {
        trace!(player, "selection ignored: not in this room");
        return state.clone();
    };
    let joker = match state.players[idx].hand.get(slot_index) {
        Some(Slot::Pending { joker, candidates }) if candidates.contains(&chosen) => *joker,
        _ => {
            trace!(player, slot_index, %chosen, "selection ignored: no such choice");
            return state.clone();
        }
    };
    if state.joker_log.iter().any(|entry| entry.card == chosen) {
        trace!(player, %chosen, "selection ignored: card already taken by another joker");
        return state.clone();
    }

    let mut next = state.clone();
    next.players[idx].hand[slot_index] = Slot::Resolved(chosen);
    next.joker_log.push(JokerLogEntry { player: idx, joker, card: chosen });
    next
}

/// Starts bidding once no hand has a joker left to resolve.
///
/// Pending community slots stay pending: they are settled per player by the
/// best-hand search when the game is scored.
pub fn maybe_resolve_jokers(state: &ResolveJokersState) -> Result<RoomState, EngineError> {
    if has_pending_hand(&state.players) {
        return Ok(RoomState::ResolveJokers(state.clone()));
    }
    debug!(selections = state.joker_log.len(), "all jokers resolved");
    ledger::open_next_round(BiddingState {
        players: state.players.clone(),
        config: state.config,
        community_cards: state.community_cards.clone(),
        deck: state.deck.clone(),
        future_rounds: state.future_rounds.clone(),
        tokens: Vec::new(),
        log: Vec::new(),
        joker_log: state.joker_log.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    fn c(rank: Rank, suit: Suit) -> Card {
        Card::new(rank, suit)
    }

    fn filler_deck() -> Deck {
        Deck::from_cards(
            Rank::ALL.iter().map(|&r| DeckCard::Card(c(r, Suit::Clubs))).collect(),
        )
    }

    fn resolving() -> ResolveJokersState {
        ResolveJokersState {
            players: vec![
                Player {
                    name: "ana".to_string(),
                    hand: vec![
                        Slot::Pending { joker: 0, candidates: vec![c(Rank::Ace, Suit::Hearts), c(Rank::Two, Suit::Spades)] },
                        Slot::Resolved(c(Rank::King, Suit::Hearts)),
                    ],
                    past_tokens: vec![],
                    token: None,
                },
                Player {
                    name: "bo".to_string(),
                    hand: vec![
                        Slot::Resolved(c(Rank::Nine, Suit::Diamonds)),
                        Slot::Resolved(c(Rank::Nine, Suit::Spades)),
                    ],
                    past_tokens: vec![],
                    token: None,
                },
            ],
            config: GameConfig { with_jokers: true },
            community_cards: vec![],
            deck: filler_deck(),
            future_rounds: default_schedule(),
            joker_log: vec![],
        }
    }

    #[test]
    fn one_joker_reveals_one_card() {
        let dealt = vec![DeckCard::Joker { id: 1 }, DeckCard::Card(c(Rank::Ten, Suit::Hearts))];
        let (slots, rest) = reveal_slots(dealt, filler_deck()).unwrap();
        assert_eq!(
            slots,
            vec![
                Slot::Pending { joker: 1, candidates: vec![c(Rank::Two, Suit::Clubs)] },
                Slot::Resolved(c(Rank::Ten, Suit::Hearts)),
            ]
        );
        assert_eq!(rest.len(), 12);
    }

    #[test]
    fn jokers_in_one_batch_share_the_revealed_cards() {
        let dealt = vec![
            DeckCard::Joker { id: 0 },
            DeckCard::Card(c(Rank::Five, Suit::Hearts)),
            DeckCard::Joker { id: 1 },
        ];
        let (slots, rest) = reveal_slots(dealt, filler_deck()).unwrap();
        let shared = vec![c(Rank::Two, Suit::Clubs), c(Rank::Three, Suit::Clubs)];
        assert_eq!(slots[0], Slot::Pending { joker: 0, candidates: shared.clone() });
        assert_eq!(slots[2], Slot::Pending { joker: 1, candidates: shared });
        assert_eq!(rest.len(), 11);
    }

    #[test]
    fn no_joker_leaves_the_deck_alone() {
        let dealt = vec![DeckCard::Card(c(Rank::Five, Suit::Hearts))];
        let (slots, rest) = reveal_slots(dealt, filler_deck()).unwrap();
        assert_eq!(slots, vec![Slot::Resolved(c(Rank::Five, Suit::Hearts))]);
        assert_eq!(rest, filler_deck());
    }

    #[test]
    fn a_revealed_card_can_only_be_taken_once() {
        let mut state = resolving();
        state.players[1].hand[0] =
            Slot::Pending { joker: 1, candidates: vec![c(Rank::Ace, Suit::Hearts), c(Rank::Two, Suit::Spades)] };

        let once = select_card(&state, "ana", c(Rank::Ace, Suit::Hearts), 0);
        assert_eq!(select_card(&once, "bo", c(Rank::Ace, Suit::Hearts), 0), once);

        let both = select_card(&once, "bo", c(Rank::Two, Suit::Spades), 0);
        assert_eq!(both.players[1].hand[0], Slot::Resolved(c(Rank::Two, Suit::Spades)));
        assert!(!has_pending_hand(&both.players));
    }

    #[test]
    fn reveal_fails_loudly_on_an_empty_deck() {
        let dealt = vec![DeckCard::Joker { id: 0 }];
        assert!(matches!(
            reveal_slots(dealt, Deck::default()),
            Err(EngineError::DeckExhausted { .. })
        ));
    }

    #[test]
    fn select_resolves_and_logs() {
        let next = select_card(&resolving(), "ana", c(Rank::Ace, Suit::Hearts), 0);
        assert_eq!(next.players[0].hand[0], Slot::Resolved(c(Rank::Ace, Suit::Hearts)));
        assert_eq!(
            next.joker_log,
            vec![JokerLogEntry { player: 0, joker: 0, card: c(Rank::Ace, Suit::Hearts) }]
        );
        assert!(!has_pending_hand(&next.players));
    }

    #[test]
    fn select_ignores_invalid_choices() {
        let state = resolving();
        // not a candidate
        assert_eq!(select_card(&state, "ana", c(Rank::Queen, Suit::Hearts), 0), state);
        // resolved slot
        assert_eq!(select_card(&state, "ana", c(Rank::King, Suit::Hearts), 1), state);
        // out of range
        assert_eq!(select_card(&state, "ana", c(Rank::Ace, Suit::Hearts), 5), state);
        // someone else's joker
        assert_eq!(select_card(&state, "bo", c(Rank::Ace, Suit::Hearts), 0), state);
        assert_eq!(select_card(&state, "zed", c(Rank::Ace, Suit::Hearts), 0), state);
    }

    #[test]
    fn select_twice_is_a_noop() {
        let once = select_card(&resolving(), "ana", c(Rank::Two, Suit::Spades), 0);
        assert_eq!(select_card(&once, "ana", c(Rank::Two, Suit::Spades), 0), once);
        assert_eq!(select_card(&once, "ana", c(Rank::Ace, Suit::Hearts), 0), once);
    }

    #[test]
    fn stays_until_every_hand_is_resolved() {
        let state = resolving();
        assert_eq!(maybe_resolve_jokers(&state).unwrap(), RoomState::ResolveJokers(state.clone()));

        let done = select_card(&state, "ana", c(Rank::Ace, Suit::Hearts), 0);
        let RoomState::Bidding(bidding) = maybe_resolve_jokers(&done).unwrap() else {
            panic!("expected bidding");
        };
        assert_eq!(bidding.tokens, vec![Some(Token::new(1, 0)), Some(Token::new(2, 0))]);
        assert_eq!(bidding.log, vec![vec![]]);
        assert_eq!(bidding.future_rounds.len(), 3);
        assert_eq!(bidding.joker_log.len(), 1);
        ledger::check_conservation(&bidding).unwrap();
    }

    #[test]
    fn pending_community_slots_carry_into_bidding() {
        let mut state = select_card(&resolving(), "ana", c(Rank::Ace, Suit::Hearts), 0);
        let pending = Slot::Pending { joker: 1, candidates: vec![c(Rank::Four, Suit::Hearts), c(Rank::Five, Suit::Hearts)] };
        state.community_cards = vec![pending.clone()];
        let RoomState::Bidding(bidding) = maybe_resolve_jokers(&state).unwrap() else {
            panic!("expected bidding");
        };
        assert_eq!(bidding.community_cards, vec![pending]);
    }
}
