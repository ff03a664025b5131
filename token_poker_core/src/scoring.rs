use crate::card::{Card, Rank};
use crate::error::EngineError;
use crate::state::Slot;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Hand ranking ---

/// Poker hand categories, weakest first, so the derived `Ord` ranks them.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum HandKind {
    HighCard,
    Pair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

/// The rank of a 5-card hand.
///
/// `order` is the tie-break key inside one `kind`, most significant first.
/// Field order matters: the derived `Ord` compares `kind`, then `order`
/// lexicographically, which is exactly [`poker_hand_less_than`].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
pub struct PokerHand {
    pub kind: HandKind,
    pub order: Vec<Rank>,
}

impl fmt::Display for HandKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            HandKind::HighCard => "High card",
            HandKind::Pair => "Pair",
            HandKind::TwoPair => "Two pair",
            HandKind::ThreeOfAKind => "Three of a kind",
            HandKind::Straight => "Straight",
            HandKind::Flush => "Flush",
            HandKind::FullHouse => "Full house",
            HandKind::FourOfAKind => "Four of a kind",
            HandKind::StraightFlush => "Straight flush",
        })
    }
}

impl fmt::Display for PokerHand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let order: Vec<String> = self.order.iter().map(|r| r.to_string()).collect();
        write!(f, "{} ({})", self.kind, order.join(" "))
    }
}

/// `true` iff `a` ranks strictly below `b`.
pub fn poker_hand_less_than(a: &PokerHand, b: &PokerHand) -> bool {
    if a.kind != b.kind {
        return a.kind < b.kind;
    }
    for (x, y) in a.order.iter().zip(&b.order) {
        if x != y {
            return x < y;
        }
    }
    false
}

/// Ranks exactly five cards.
pub fn score_hand(cards: &[Card]) -> Result<PokerHand, EngineError> {
    if cards.len() != 5 {
        return Err(EngineError::InvalidHandSize(cards.len()));
    }

    // ascending, so the top of a run is last
    let mut hand = cards.to_vec();
    hand.sort();
    let ranks: Vec<Rank> = hand.iter().map(|c| c.rank).collect();
    let descending: Vec<Rank> = ranks.iter().rev().copied().collect();

    let is_flush = hand.windows(2).all(|w| w[0].suit == w[1].suit);
    let is_wheel = ranks == [Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Ace];
    let is_straight = is_wheel || ranks.windows(2).all(|w| w[0].value() + 1 == w[1].value());
    let top = if is_wheel { Rank::Five } else { ranks[4] };

    if is_flush && is_straight {
        return Ok(PokerHand { kind: HandKind::StraightFlush, order: vec![top] });
    }

    let mut pair = None;
    let mut second_pair = None;
    let mut triple = None;
    let mut quad = None;
    for &rank in &Rank::ALL {
        match ranks.iter().filter(|&&r| r == rank).count() {
            2 if pair.is_none() => pair = Some(rank),
            2 => second_pair = Some(rank),
            3 => triple = Some(rank),
            4 => quad = Some(rank),
            _ => {}
        }
    }
    // descending ranks of the cards outside the given groups
    let kickers = |skip: &[Rank]| -> Vec<Rank> {
        descending.iter().copied().filter(|r| !skip.contains(r)).collect()
    };

    let (kind, order) = if let Some(q) = quad {
        (HandKind::FourOfAKind, [vec![q], kickers(&[q])].concat())
    } else if let (Some(t), Some(p)) = (triple, pair) {
        (HandKind::FullHouse, vec![t, p])
    } else if is_flush {
        (HandKind::Flush, descending.clone())
    } else if is_straight {
        (HandKind::Straight, vec![top])
    } else if let Some(t) = triple {
        (HandKind::ThreeOfAKind, [vec![t], kickers(&[t])].concat())
    } else if let (Some(p), Some(sp)) = (pair, second_pair) {
        (HandKind::TwoPair, [vec![sp, p], kickers(&[p, sp])].concat())
    } else if let Some(p) = pair {
        (HandKind::Pair, [vec![p], kickers(&[p])].concat())
    } else {
        (HandKind::HighCard, descending.clone())
    };
    Ok(PokerHand { kind, order })
}

// --- Best-hand search ---

/// The strongest 5-card hand drawable from `pool`.
///
/// Every way of picking 5 slots is tried, and for each picked `Pending` slot
/// every one of its candidates. Among equal-ranked hands the first one
/// enumerated is kept.
pub fn best_hand_among(pool: &[Slot]) -> Result<(Vec<Card>, PokerHand), EngineError> {
    if pool.len() < 5 {
        return Err(EngineError::PoolTooSmall(pool.len()));
    }

    let mut best: Option<(Vec<Card>, PokerHand)> = None;
    for chosen in get_combinations(pool, 5) {
        for hand in expand_candidates(&chosen) {
            let score = score_hand(&hand)?;
            let better = match &best {
                Some((_, current)) => poker_hand_less_than(current, &score),
                None => true,
            };
            if better {
                best = Some((hand, score));
            }
        }
    }
    best.ok_or(EngineError::PoolTooSmall(pool.len()))
}

/// Every concrete card list obtained by picking one candidate per slot.
fn expand_candidates(slots: &[&Slot]) -> Vec<Vec<Card>> {
    let mut partials: Vec<Vec<Card>> = vec![Vec::with_capacity(slots.len())];
    for slot in slots {
        let mut next = Vec::with_capacity(partials.len() * slot.candidates().len());
        for partial in &partials {
            for &card in slot.candidates() {
                let mut hand = partial.clone();
                hand.push(card);
                next.push(hand);
            }
        }
        partials = next;
    }
    partials
}

/// All `k`-element combinations of `data`, in order.
fn get_combinations<T>(data: &[T], k: usize) -> Vec<Vec<&T>> {
    if k == 0 {
        return vec![vec![]];
    }
    if data.len() < k {
        return vec![];
    }

    let (first, rest) = data.split_at(1);

    let mut result: Vec<Vec<&T>> = get_combinations(rest, k - 1)
        .into_iter()
        .map(|mut combo| {
            combo.insert(0, &first[0]);
            combo
        })
        .collect();
    if data.len() > k {
        result.extend(get_combinations(rest, k));
    }
    result
}
