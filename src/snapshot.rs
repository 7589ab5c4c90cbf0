//! Rendering-ready projection of the game state.

use crate::game::Game;
use crate::position::Position;
use crate::types::{Board, GameStatus, Token};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Which marks may still rewind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftAvailability {
    /// X may still rewind.
    pub x: bool,
    /// O may still rewind.
    pub o: bool,
}

/// Everything the view needs to draw one frame.
///
/// Snapshots are plain data: taking one never changes the game, and a
/// serialized snapshot round-trips losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Snapshot {
    /// Board in play.
    board: Board,
    /// Status at that board.
    status: GameStatus,
    /// Square no mark may land on, if the round drew one.
    blocked_square: Option<Position>,
    /// Remaining rewinds per mark.
    time_shift_available: ShiftAvailability,
    /// Mark holding a bonus turn, if one is live.
    bonus_token: Option<Token>,
}

impl From<&Game> for Snapshot {
    fn from(game: &Game) -> Self {
        Self {
            board: game.board().clone(),
            status: game.status(),
            blocked_square: game.blocked(),
            time_shift_available: ShiftAvailability {
                x: game.shift_available(Token::X),
                o: game.shift_available(Token::O),
            },
            bonus_token: game.bonus(),
        }
    }
}
