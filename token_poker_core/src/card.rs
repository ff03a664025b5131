use crate::error::{EngineError, ParseCardError};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of playing cards in a deck, jokers excluded.
pub const STANDARD_DECK_SIZE: usize = 52;
/// Jokers added when a room plays with jokers.
pub const JOKER_COUNT: u8 = 2;

// --- Card model ---

/// Suit
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

/// Rank, valued 2..=14.
/// Ace is the highest rank but also closes the low `A-2-3-4-5` straight.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rank {
    Two = 2,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    /// Ascending, Two first.
    pub const ALL: [Rank; 13] = [
        Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven, Rank::Eight,
        Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King, Rank::Ace,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Rank> {
        Rank::ALL.iter().copied().find(|r| r.value() == value)
    }
}

/// A playing card.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

/// A card as it sits in the deck. A joker's face is fixed; what it ends up
/// meaning is decided later, once it has been dealt.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeckCard {
    Card(Card),
    Joker { id: u8 },
}

impl From<Card> for DeckCard {
    fn from(card: Card) -> Self {
        DeckCard::Card(card)
    }
}

// --- Display ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "T",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

impl fmt::Display for DeckCard {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeckCard::Card(card) => write!(f, "{}", card),
            DeckCard::Joker { id } => write!(f, "Joker#{}", id),
        }
    }
}

/// Parses the short form used on the console, e.g. `Ts`, `2c`, `AH`.
impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let (Some(r), Some(su), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(ParseCardError(s.to_string()));
        };
        let rank = match r.to_ascii_uppercase() {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            _ => return Err(ParseCardError(s.to_string())),
        };
        let suit = match su.to_ascii_lowercase() {
            'c' => Suit::Clubs,
            'd' => Suit::Diamonds,
            'h' => Suit::Hearts,
            's' => Suit::Spades,
            _ => return Err(ParseCardError(s.to_string())),
        };
        Ok(Card::new(rank, suit))
    }
}

// --- Deck ---

/// Undealt cards, dealt from the front.
///
/// Every operation returns a new `Deck` and leaves `self` alone, so a room
/// snapshot holding the old deck stays valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deck {
    cards: Vec<DeckCard>,
}

impl Deck {
    /// All 52 cards, plus two jokers when `with_jokers`, uniformly shuffled.
    pub fn build<R: Rng + ?Sized>(with_jokers: bool, rng: &mut R) -> Deck {
        let joker_count = if with_jokers { JOKER_COUNT as usize } else { 0 };
        let mut cards = Vec::with_capacity(STANDARD_DECK_SIZE + joker_count);
        for &suit in &Suit::ALL {
            for &rank in &Rank::ALL {
                cards.push(DeckCard::Card(Card { rank, suit }));
            }
        }
        if with_jokers {
            cards.extend((0..JOKER_COUNT).map(|id| DeckCard::Joker { id }));
        }
        cards.shuffle(rng);
        Deck { cards }
    }

    /// A deck in exactly the given order; first card is dealt first.
    pub fn from_cards(cards: Vec<DeckCard>) -> Deck {
        Deck { cards }
    }

    pub fn cards(&self) -> &[DeckCard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Takes exactly `n` cards off the front.
    pub fn deal(&self, n: usize) -> Result<(Vec<DeckCard>, Deck), EngineError> {
        if n > self.cards.len() {
            return Err(EngineError::DeckExhausted { requested: n, remaining: self.cards.len() });
        }
        let dealt = self.cards[..n].to_vec();
        let rest = Deck { cards: self.cards[n..].to_vec() };
        Ok((dealt, rest))
    }

    /// Takes `n` playing cards off the front to be shown as joker candidates.
    /// A joker met on the way is burnt: it can never stand in for another joker.
    pub fn draw_candidates(&self, n: usize) -> Result<(Vec<Card>, Deck), EngineError> {
        let mut drawn = Vec::with_capacity(n);
        let mut used = 0;
        for deck_card in &self.cards {
            if drawn.len() == n {
                break;
            }
            used += 1;
            if let DeckCard::Card(card) = deck_card {
                drawn.push(*card);
            }
        }
        if drawn.len() < n {
            return Err(EngineError::DeckExhausted { requested: n, remaining: drawn.len() });
        }
        Ok((drawn, Deck { cards: self.cards[used..].to_vec() }))
    }
}
