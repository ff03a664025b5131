use thiserror::Error;
use token_poker_core::{Card, Intent, ParseCardError, RoomState, Token};

pub const HELP: &str = "\
commands:
  join                     - join the room
  leave                    - leave the room (setup only)
  jokers on|off            - deal with or without jokers
  start                    - start the game
  pick <card> <slot>       - turn your joker in hand slot <slot> into <card>, e.g. `pick Ts 0`
  take <index>             - take token <index> from the centre
  steal <player> <index>   - take token <index> from <player>
  put                      - put your token back in the centre
  next                     - close the round once every token is held
  reveal <n>               - show the first <n> hands
  again                    - deal a new game to the same players
  kill                     - abandon the game, back to setup
  show                     - print the room
  help                     - print this list
  exit                     - quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Intent(Intent),
    Show,
    Help,
    Exit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error(transparent)]
    Card(#[from] ParseCardError),
    #[error("tokens can only be taken while bidding")]
    NoRound,
}

/// The round whose tokens are in play, if bidding.
pub fn current_round(state: Option<&RoomState>) -> Option<u32> {
    match state {
        Some(RoomState::Bidding(s)) => s.log.len().checked_sub(1).map(|r| r as u32),
        _ => None,
    }
}

/// Parses one console line typed by player `me`.
///
/// Tokens are named by index only; the round is filled in from `state`, so
/// an intent typed during one round can never take a token of the next.
pub fn parse(line: &str, me: &str, state: Option<&RoomState>) -> Result<Command, CommandError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let me = me.to_string();
    let intent = match parts.as_slice() {
        [] | ["show"] => return Ok(Command::Show),
        ["help"] => return Ok(Command::Help),
        ["exit"] | ["quit"] => return Ok(Command::Exit),
        ["join"] => Intent::Join { name: me },
        ["leave"] => Intent::Leave { name: me },
        ["jokers", "on"] => Intent::SetConfig { with_jokers: true },
        ["jokers", "off"] => Intent::SetConfig { with_jokers: false },
        ["jokers", ..] => return Err(CommandError::Usage("jokers on|off")),
        ["start"] => Intent::StartGame,
        ["pick", card, slot] => Intent::SelectJokerCard { player: me, card: card.parse::<Card>()?, slot: number(slot)? },
        ["pick", ..] => return Err(CommandError::Usage("pick <card> <slot>")),
        ["take", index] => Intent::TakeFromCentre { player: me, token: token(index, state)? },
        ["take", ..] => return Err(CommandError::Usage("take <index>")),
        ["steal", from, index] => {
            Intent::TakeFromPlayer { player: me, from: from.to_string(), token: token(index, state)? }
        }
        ["steal", ..] => return Err(CommandError::Usage("steal <player> <index>")),
        ["put"] => Intent::Relinquish { player: me },
        ["next"] => Intent::AdvanceRound,
        ["reveal", n] => Intent::SetRevealIndex { index: number(n)? },
        ["reveal", ..] => return Err(CommandError::Usage("reveal <n>")),
        ["again"] => Intent::StartNewGame,
        ["kill"] => Intent::KillGame,
        [other, ..] => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Command::Intent(intent))
}

fn number<T: std::str::FromStr>(s: &str) -> Result<T, CommandError> {
    s.parse().map_err(|_| CommandError::NotANumber(s.to_string()))
}

fn token(index: &str, state: Option<&RoomState>) -> Result<Token, CommandError> {
    let round = current_round(state).ok_or(CommandError::NoRound)?;
    Ok(Token::new(number(index)?, round))
}
