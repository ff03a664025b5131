use crate::card::{Card, Deck};
use crate::error::EngineError;
use crate::jokers;
use crate::ledger;
use crate::scoring::{PokerHand, best_hand_among, poker_hand_less_than};
use crate::state::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Cards dealt to every player at the start of a game.
pub const HAND_SIZE: usize = 2;

/// A player action, translated into exactly one state transition.
///
/// Intents name players and tokens by value rather than by position so that
/// recomputing one against a newer snapshot still means the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Join { name: String },
    Leave { name: String },
    SetConfig { with_jokers: bool },
    StartGame,
    SelectJokerCard { player: String, card: Card, slot: usize },
    Relinquish { player: String },
    TakeFromCentre { player: String, token: Token },
    TakeFromPlayer { player: String, from: String, token: Token },
    AdvanceRound,
    KillGame,
    SetRevealIndex { index: usize },
    StartNewGame,
}

// --- Dispatch ---

/// Applies `intent` to `state`.
///
/// An intent that is illegal in the current phase, or already satisfied,
/// yields a state equal to `state`; callers compare with `==` to skip the
/// commit. `rng` is only drawn from when a new game is dealt.
///
/// # Errors
/// Only for defects: a snapshot that breaks the engine's own invariants.
pub fn apply<R: Rng + ?Sized>(state: &RoomState, intent: &Intent, rng: &mut R) -> Result<RoomState, EngineError> {
    let next = match (state, intent) {
        (RoomState::Setup(s), Intent::Join { name }) => RoomState::Setup(join_room(s, name)),
        (RoomState::Setup(s), Intent::Leave { name }) => RoomState::Setup(leave_room(s, name)),
        (RoomState::Setup(s), Intent::SetConfig { with_jokers }) => RoomState::Setup(set_config(s, *with_jokers)),
        (RoomState::Setup(s), Intent::StartGame) => start_game(s, rng)?,

        (RoomState::ResolveJokers(s), Intent::SelectJokerCard { player, card, slot }) => {
            jokers::maybe_resolve_jokers(&jokers::select_card(s, player, *card, *slot))?
        }

        (RoomState::Bidding(s), Intent::Relinquish { player }) => RoomState::Bidding(ledger::relinquish(s, player)),
        (RoomState::Bidding(s), Intent::TakeFromCentre { player, token }) => {
            RoomState::Bidding(ledger::take_from_centre(s, player, *token))
        }
        (RoomState::Bidding(s), Intent::TakeFromPlayer { player, from, token }) => {
            RoomState::Bidding(ledger::take_from_player(s, player, from, *token))
        }
        (RoomState::Bidding(s), Intent::AdvanceRound) => ledger::advance_round(s)?,

        (RoomState::ResolveJokers(_) | RoomState::Bidding(_) | RoomState::Scoring(_), Intent::KillGame) => {
            kill_game(state)
        }

        (RoomState::Scoring(s), Intent::SetRevealIndex { index }) => RoomState::Scoring(set_reveal_index(s, *index)),
        (RoomState::Scoring(s), Intent::StartNewGame) => start_new_game(s, rng)?,

        _ => {
            trace!(phase = %state.phase(), ?intent, "intent does not apply in this phase");
            state.clone()
        }
    };

    if next != *state {
        debug!(from = %state.phase(), to = %next.phase(), ?intent, "state changed");
    }
    Ok(next)
}

// --- Setup ---

/// Adds `name` to the roster.
pub fn join_room(state: &SetupState, name: &str) -> SetupState {
    if name.trim().is_empty() || state.players.iter().any(|p| p.name == name) || state.players.len() >= MAX_PLAYERS {
        return state.clone();
    }
    let mut players = state.players.clone();
    players.push(SetupPlayer { name: name.to_string() });
    SetupState { players, config: state.config }
}

pub fn leave_room(state: &SetupState, name: &str) -> SetupState {
    SetupState {
        players: state.players.iter().filter(|p| p.name != name).cloned().collect(),
        config: state.config,
    }
}

pub fn set_config(state: &SetupState, with_jokers: bool) -> SetupState {
    SetupState { players: state.players.clone(), config: GameConfig { with_jokers } }
}

/// Deals a new game for the roster in `state`; a no-op unless the roster
/// size is within `MIN_PLAYERS..=MAX_PLAYERS`.
pub fn start_game<R: Rng + ?Sized>(state: &SetupState, rng: &mut R) -> Result<RoomState, EngineError> {
    let n = state.players.len();
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&n) {
        trace!(players = n, "start ignored: roster size");
        return Ok(RoomState::Setup(state.clone()));
    }
    let names = state.players.iter().map(|p| p.name.clone()).collect();
    deal_game(names, state.config, rng)
}

/// Shuffles, deals `HAND_SIZE` cards to everyone and opens the first round,
/// stopping first for joker resolution if a hand received a joker.
fn deal_game<R: Rng + ?Sized>(names: Vec<String>, config: GameConfig, rng: &mut R) -> Result<RoomState, EngineError> {
    let deck = Deck::build(config.with_jokers, rng);

    // every hand is dealt in one batch, so hand jokers share their candidates
    let (dealt, deck) = deck.deal(HAND_SIZE * names.len())?;
    let (slots, deck) = jokers::reveal_slots(dealt, deck)?;
    let players: Vec<Player> = names
        .into_iter()
        .zip(slots.chunks(HAND_SIZE))
        .map(|(name, hand)| Player { name, hand: hand.to_vec(), past_tokens: Vec::new(), token: None })
        .collect();
    debug!(players = players.len(), with_jokers = config.with_jokers, "game dealt");

    jokers::maybe_resolve_jokers(&ResolveJokersState {
        players,
        config,
        community_cards: Vec::new(),
        deck,
        future_rounds: default_schedule(),
        joker_log: Vec::new(),
    })
}

// --- Leaving a game ---

/// Back to setup with the same roster and config; cards, tokens and logs
/// are discarded.
pub fn kill_game(state: &RoomState) -> RoomState {
    let players = state
        .player_names()
        .into_iter()
        .map(|name| SetupPlayer { name: name.to_string() })
        .collect();
    RoomState::Setup(SetupState { players, config: state.config() })
}

// --- Scoring ---

/// Reveals hands up to `index`. Never hides a revealed hand again.
pub fn set_reveal_index(state: &ScoringState, index: usize) -> ScoringState {
    if index <= state.reveal_index || index > state.players.len() {
        return state.clone();
    }
    ScoringState { reveal_index: index, ..state.clone() }
}

/// Deals the next game to the same roster, as `start_game` would.
pub fn start_new_game<R: Rng + ?Sized>(state: &ScoringState, rng: &mut R) -> Result<RoomState, EngineError> {
    let names = state.players.iter().map(|p| p.name.clone()).collect();
    deal_game(names, state.config, rng)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    /// Hands ranked in the same order as the final tokens.
    Won,
    Lost,
}

impl Player {
    /// The token held when the last round closed.
    pub fn final_token(&self) -> Option<Token> {
        self.past_tokens.last().copied()
    }
}

impl ScoringState {
    /// Each player's best five cards from their hand and the community cards.
    pub fn hand_scores(&self) -> Result<Vec<(Vec<Card>, PokerHand)>, EngineError> {
        self.players
            .iter()
            .map(|p| {
                let pool: Vec<Slot> = p.hand.iter().chain(&self.community_cards).cloned().collect();
                best_hand_among(&pool)
            })
            .collect()
    }

    /// The player whose final token index equals the reveal index.
    pub fn revealed_player(&self) -> Option<PlayerIndex> {
        self.players
            .iter()
            .position(|p| p.final_token().is_some_and(|t| t.index as usize == self.reveal_index))
    }

    /// `None` until every hand has been revealed.
    pub fn outcome(&self) -> Result<Option<GameOutcome>, EngineError> {
        if self.reveal_index < self.players.len() {
            return Ok(None);
        }
        let scores = self.hand_scores()?;
        let mut ranked: Vec<(u8, &PokerHand)> = self
            .players
            .iter()
            .zip(&scores)
            .map(|(p, (_, score))| (p.final_token().map_or(0, |t| t.index), score))
            .collect();
        ranked.sort_by_key(|(index, _)| *index);

        let won = ranked.windows(2).all(|w| !poker_hand_less_than(w[1].1, w[0].1));
        Ok(Some(if won { GameOutcome::Won } else { GameOutcome::Lost }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};
    use crate::scoring::HandKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(2024)
    }

    fn setup(names: &[&str], with_jokers: bool) -> RoomState {
        RoomState::Setup(SetupState {
            players: names.iter().map(|n| SetupPlayer { name: n.to_string() }).collect(),
            config: GameConfig { with_jokers },
        })
    }

    fn run(state: &RoomState, intents: &[Intent]) -> RoomState {
        let mut rng = rng();
        intents.iter().fold(state.clone(), |s, i| apply(&s, i, &mut rng).unwrap())
    }

    fn join(name: &str) -> Intent {
        Intent::Join { name: name.to_string() }
    }

    /// Every player takes the token matching their seat, then the round advances.
    fn play_round(state: &RoomState) -> RoomState {
        let RoomState::Bidding(s) = state else { panic!("expected bidding") };
        let round = (s.log.len() - 1) as u32;
        let mut intents: Vec<Intent> = s
            .players
            .iter()
            .enumerate()
            .map(|(i, p)| Intent::TakeFromCentre { player: p.name.clone(), token: Token::new(i as u8 + 1, round) })
            .collect();
        intents.push(Intent::AdvanceRound);
        run(state, &intents)
    }

    #[test]
    fn new_room_is_empty_setup() {
        assert_eq!(RoomState::default(), setup(&[], false));
    }

    #[test]
    fn join_and_leave() {
        let room = run(&RoomState::default(), &[join("ana"), join("bo"), join("ana"), join("  ")]);
        assert_eq!(room.player_names(), vec!["ana", "bo"]);

        let room = run(&room, &[Intent::Leave { name: "ana".into() }, Intent::Leave { name: "zed".into() }]);
        assert_eq!(room.player_names(), vec!["bo"]);
    }

    #[test]
    fn join_stops_at_capacity() {
        let names: Vec<String> = (0..MAX_PLAYERS + 2).map(|i| format!("p{i}")).collect();
        let intents: Vec<Intent> = names.iter().map(|n| join(n)).collect();
        let room = run(&RoomState::default(), &intents);
        assert_eq!(room.player_names().len(), MAX_PLAYERS);
    }

    #[test]
    fn set_config_only_in_setup() {
        let room = run(&setup(&["a", "b"], false), &[Intent::SetConfig { with_jokers: true }]);
        assert!(room.config().with_jokers);
        let started = run(&room, &[Intent::SetConfig { with_jokers: true }, Intent::StartGame]);
        assert_eq!(run(&started, &[Intent::SetConfig { with_jokers: false }]), started);
    }

    #[test]
    fn start_needs_two_players() {
        let lonely = setup(&["ana"], false);
        assert_eq!(run(&lonely, &[Intent::StartGame]), lonely);
    }

    #[test]
    fn start_without_jokers_goes_straight_to_bidding() {
        let room = run(&setup(&["ana", "bo", "cy"], false), &[Intent::StartGame]);
        let RoomState::Bidding(s) = &room else { panic!("expected bidding") };
        assert_eq!(s.players.len(), 3);
        assert!(s.players.iter().all(|p| p.hand.len() == HAND_SIZE && !p.hand.iter().any(Slot::is_pending)));
        assert_eq!(s.deck.len(), 52 - 6);
        assert_eq!(s.future_rounds, vec![Round { cards: 3 }, Round { cards: 1 }, Round { cards: 1 }]);
        assert!(s.community_cards.is_empty());
        ledger::check_conservation(s).unwrap();
        room.validate().unwrap();
    }

    #[test]
    fn start_is_not_repeated() {
        let room = run(&setup(&["ana", "bo"], false), &[Intent::StartGame]);
        assert_eq!(run(&room, &[Intent::StartGame]), room);
    }

    #[test]
    fn jokers_in_hand_pause_for_resolution() {
        let mut rng = rng();
        // keep dealing until some hand receives a joker
        let state = loop {
            let s = setup(&["ana", "bo", "cy", "di", "ed", "flo", "gus", "hal"], true);
            let dealt = apply(&s, &Intent::StartGame, &mut rng).unwrap();
            if matches!(dealt, RoomState::ResolveJokers(_)) {
                break dealt;
            }
        };
        let RoomState::ResolveJokers(s) = &state else { unreachable!() };

        let jokers_in_hands = s.players.iter().flat_map(|p| &p.hand).filter(|slot| slot.is_pending()).count();
        let mut current = state.clone();
        let mut picked = 0;
        for player in &s.players {
            for (slot, hand_slot) in player.hand.iter().enumerate() {
                if let Slot::Pending { candidates, .. } = hand_slot {
                    // one revealed card per hand joker, shared by all of them
                    assert_eq!(candidates.len(), jokers_in_hands);
                    let stranger = Intent::SelectJokerCard { player: "zed".into(), card: candidates[picked], slot };
                    assert_eq!(apply(&current, &stranger, &mut rng).unwrap(), current);
                    if picked > 0 {
                        // already taken by the previous joker
                        let taken = Intent::SelectJokerCard {
                            player: player.name.clone(),
                            card: candidates[picked - 1],
                            slot,
                        };
                        assert_eq!(apply(&current, &taken, &mut rng).unwrap(), current);
                    }
                    let pick = Intent::SelectJokerCard { player: player.name.clone(), card: candidates[picked], slot };
                    current = apply(&current, &pick, &mut rng).unwrap();
                    picked += 1;
                }
            }
        }
        let RoomState::Bidding(b) = &current else { panic!("expected bidding after resolving") };
        assert!(!jokers::has_pending_hand(&b.players));
        assert_eq!(b.joker_log.len(), jokers_in_hands);
    }

    #[test]
    fn full_game_reaches_scoring_and_reveals() {
        let mut room = run(&setup(&["ana", "bo", "cy"], false), &[Intent::StartGame]);
        for _ in 0..4 {
            room = play_round(&room);
        }
        let RoomState::Scoring(s) = &room else { panic!("expected scoring") };
        assert_eq!(s.community_cards.len(), 5);
        assert_eq!(s.reveal_index, 0);
        assert_eq!(s.outcome().unwrap(), None);
        assert_eq!(s.revealed_player(), None);

        let room = run(&room, &[Intent::SetRevealIndex { index: 2 }]);
        let RoomState::Scoring(s) = &room else { panic!("expected scoring") };
        assert_eq!(s.reveal_index, 2);
        assert_eq!(s.revealed_player(), Some(1));

        // monotonic and bounded
        assert_eq!(run(&room, &[Intent::SetRevealIndex { index: 1 }]), room);
        assert_eq!(run(&room, &[Intent::SetRevealIndex { index: 4 }]), room);

        let room = run(&room, &[Intent::SetRevealIndex { index: 3 }]);
        let RoomState::Scoring(s) = &room else { panic!("expected scoring") };
        assert!(s.outcome().unwrap().is_some());
        assert_eq!(s.hand_scores().unwrap().len(), 3);
        room.validate().unwrap();
    }

    #[test]
    fn new_game_reuses_roster_and_config() {
        let mut room = run(&setup(&["ana", "bo"], false), &[Intent::StartGame]);
        for _ in 0..4 {
            room = play_round(&room);
        }
        let again = run(&room, &[Intent::StartNewGame]);
        let RoomState::Bidding(s) = &again else { panic!("expected bidding") };
        assert_eq!(again.player_names(), vec!["ana", "bo"]);
        assert_eq!(s.log, vec![vec![]]);
        assert!(s.players.iter().all(|p| p.past_tokens.is_empty()));
    }

    #[test]
    fn kill_game_keeps_names_and_config() {
        let room = run(&setup(&["ana", "bo"], true), &[Intent::StartGame]);
        let killed = run(&room, &[Intent::KillGame]);
        assert_eq!(killed, setup(&["ana", "bo"], true));
        // already in setup
        assert_eq!(run(&killed, &[Intent::KillGame]), killed);
    }

    #[test]
    fn wrong_phase_intents_are_noops() {
        let lobby = setup(&["ana", "bo"], false);
        for intent in [
            Intent::AdvanceRound,
            Intent::SetRevealIndex { index: 1 },
            Intent::StartNewGame,
            Intent::Relinquish { player: "ana".into() },
        ] {
            assert_eq!(run(&lobby, &[intent]), lobby);
        }
        let bidding = run(&lobby, &[Intent::StartGame]);
        assert_eq!(run(&bidding, &[join("cy")]), bidding);
    }

    #[test]
    fn advance_is_a_noop_until_all_tokens_are_held() {
        let room = run(&setup(&["ana", "bo"], false), &[Intent::StartGame]);
        let one = run(&room, &[Intent::TakeFromCentre { player: "ana".into(), token: Token::new(1, 0) }]);
        assert_eq!(run(&one, &[Intent::AdvanceRound]), one);
    }

    fn scoring_with(hands: [[Card; 2]; 2], tokens: [u8; 2], board: [Card; 5]) -> ScoringState {
        ScoringState {
            players: ["ana", "bo"]
                .iter()
                .zip(hands.iter().zip(tokens))
                .map(|(name, (hand, token))| Player {
                    name: name.to_string(),
                    hand: hand.iter().map(|&c| Slot::Resolved(c)).collect(),
                    past_tokens: vec![Token::new(token, 3)],
                    token: None,
                })
                .collect(),
            config: GameConfig::default(),
            community_cards: board.iter().map(|&c| Slot::Resolved(c)).collect(),
            deck: Deck::default(),
            log: vec![],
            joker_log: vec![],
            reveal_index: 2,
        }
    }

    #[test]
    fn outcome_follows_token_order() {
        use Rank::*;
        use Suit::*;
        let board = [
            Card::new(Two, Clubs), Card::new(Seven, Diamonds), Card::new(Nine, Hearts),
            Card::new(Jack, Spades), Card::new(Four, Hearts),
        ];
        let weak = [Card::new(Three, Spades), Card::new(Five, Diamonds)];
        let strong = [Card::new(Nine, Spades), Card::new(Nine, Clubs)];

        // weaker hand took the lower token
        let won = scoring_with([weak, strong], [1, 2], board);
        assert_eq!(won.outcome().unwrap(), Some(GameOutcome::Won));

        let lost = scoring_with([weak, strong], [2, 1], board);
        assert_eq!(lost.outcome().unwrap(), Some(GameOutcome::Lost));
        assert_eq!(lost.hand_scores().unwrap()[1].1.kind, HandKind::ThreeOfAKind);
    }

    #[test]
    fn pending_community_card_is_chosen_per_player() {
        use Rank::*;
        use Suit::*;
        let board = [
            Card::new(Two, Clubs), Card::new(Seven, Diamonds), Card::new(Nine, Hearts),
            Card::new(Jack, Spades), Card::new(Four, Hearts),
        ];
        let mut state = scoring_with(
            [[Card::new(King, Spades), Card::new(King, Clubs)], [Card::new(Ace, Hearts), Card::new(Ace, Clubs)]],
            [1, 2],
            board,
        );
        state.community_cards[4] =
            Slot::Pending { joker: 0, candidates: vec![Card::new(King, Hearts), Card::new(Ace, Spades)] };
        let scores = state.hand_scores().unwrap();
        assert_eq!(scores[0].1.order[0], King);
        assert_eq!(scores[0].1.kind, HandKind::ThreeOfAKind);
        assert_eq!(scores[1].1.order[0], Ace);
        assert_eq!(scores[1].1.kind, HandKind::ThreeOfAKind);
    }

    #[test]
    fn state_survives_json_mid_game() {
        let room = run(&setup(&["ana", "bo"], false), &[Intent::StartGame]);
        let room = run(&room, &[Intent::TakeFromCentre { player: "bo".into(), token: Token::new(1, 0) }]);
        let text = serde_json::to_string(&room).unwrap();
        assert!(text.starts_with(r#"{"phase":"bidding""#));
        let back: RoomState = serde_json::from_str(&text).unwrap();
        assert_eq!(back, room);
    }
}
