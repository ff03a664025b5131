//! Plain-text rendering of a room for the console.

use std::fmt::Write;
use token_poker_core::{Player, RoomState, ScoringState, Slot, Token};

fn slots(slots: &[Slot]) -> String {
    if slots.is_empty() {
        return "-".to_string();
    }
    slots.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(" ")
}

fn tokens(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.index.to_string()).collect::<Vec<_>>().join(",")
}

/// Hands are shown only for `me`; other players' cards stay face down until
/// scoring reveals them. Joker candidates are face up for everyone.
fn player_line(out: &mut String, p: &Player, me: &str) {
    let hand = if p.name == me {
        slots(&p.hand)
    } else {
        p.hand
            .iter()
            .map(|slot| if slot.is_pending() { slot.to_string() } else { "??".to_string() })
            .collect::<Vec<_>>()
            .join(" ")
    };
    let held = p.token.map_or("-".to_string(), |t| t.index.to_string());
    let _ = writeln!(out, "  {:<12} hand {:<16} token {:<3} past [{}]", p.name, hand, held, tokens(&p.past_tokens));
}

pub fn render(state: &RoomState, me: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", state.phase());
    match state {
        RoomState::Setup(s) => {
            let names: Vec<&str> = s.players.iter().map(|p| p.name.as_str()).collect();
            let _ = writeln!(out, "  players: {}", if names.is_empty() { "-".to_string() } else { names.join(", ") });
            let _ = writeln!(out, "  jokers: {}", if s.config.with_jokers { "on" } else { "off" });
        }
        RoomState::ResolveJokers(s) => {
            for p in &s.players {
                player_line(&mut out, p, me);
                if p.hand.iter().any(Slot::is_pending) {
                    let _ = writeln!(out, "    waiting for {} to pick", p.name);
                }
            }
        }
        RoomState::Bidding(s) => {
            let _ = writeln!(out, "  round {} of {}", s.log.len(), s.log.len() + s.future_rounds.len());
            let _ = writeln!(out, "  community: {}", slots(&s.community_cards));
            let centre: Vec<Token> = s.tokens.iter().flatten().copied().collect();
            let _ = writeln!(out, "  centre: [{}]", tokens(&centre));
            for p in &s.players {
                player_line(&mut out, p, me);
            }
        }
        RoomState::Scoring(s) => render_scoring(&mut out, s),
    }
    out
}

fn render_scoring(out: &mut String, s: &ScoringState) {
    let _ = writeln!(out, "  community: {}", slots(&s.community_cards));
    let scores = match s.hand_scores() {
        Ok(scores) => scores,
        Err(e) => {
            let _ = writeln!(out, "  cannot score: {e}");
            return;
        }
    };
    let mut order: Vec<usize> = (0..s.players.len()).collect();
    order.sort_by_key(|&i| s.players[i].final_token().map_or(0, |t| t.index));
    for (shown, &i) in order.iter().enumerate() {
        let p = &s.players[i];
        let token = p.final_token().map_or("-".to_string(), |t| t.index.to_string());
        if shown < s.reveal_index {
            let (cards, hand) = &scores[i];
            let cards: Vec<String> = cards.iter().map(|c| c.to_string()).collect();
            let _ = writeln!(out, "  {} {:<12} {:<16} {} [{}]", token, p.name, slots(&p.hand), hand, cards.join(" "));
        } else {
            let _ = writeln!(out, "  {} {:<12} hidden", token, p.name);
        }
    }
    match s.outcome() {
        Ok(Some(outcome)) => {
            let _ = writeln!(out, "  result: {outcome:?}");
        }
        Ok(None) => {
            let _ = writeln!(out, "  revealed {} of {}", s.reveal_index, s.players.len());
        }
        Err(e) => {
            let _ = writeln!(out, "  cannot score: {e}");
        }
    }
}
