//! Core domain types for the time-shift board.

use crate::position::Position;
use serde::{Deserialize, Serialize};

/// A player's mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    /// Mark X (moves first).
    X,
    /// Mark O (moves second).
    O,
}

impl Token {
    /// Returns the opposing mark.
    pub fn opponent(self) -> Self {
        match self {
            Token::X => Token::O,
            Token::O => Token::X,
        }
    }
}

/// A square on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    /// Empty square.
    Empty,
    /// Square holding a mark.
    Occupied(Token),
}

/// 3x3 board, row-major.
///
/// Boards are values: placing a mark yields a new board and leaves the
/// original untouched, so every historical board stays valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// Squares in row-major order (0-8).
    squares: [Square; 9],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            squares: [Square::Empty; 9],
        }
    }

    /// Builds a board from raw squares.
    pub fn from_squares(squares: [Square; 9]) -> Self {
        Self { squares }
    }

    /// Gets the square at the given position.
    pub fn get(&self, pos: Position) -> Square {
        self.squares[pos.to_index()]
    }

    /// Checks if a square is empty.
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos) == Square::Empty
    }

    /// Returns a copy of this board with the mark placed.
    ///
    /// Callers validate legality first; placing on an occupied square is
    /// a caller bug.
    pub fn place(&self, pos: Position, token: Token) -> Board {
        debug_assert!(self.is_empty(pos));
        let mut squares = self.squares;
        squares[pos.to_index()] = Square::Occupied(token);
        Self { squares }
    }

    /// Returns all squares as a slice.
    pub fn squares(&self) -> &[Square; 9] {
        &self.squares
    }

    /// Formats the board as a human-readable string.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..3 {
            for col in 0..3 {
                let pos = row * 3 + col;
                let symbol = match self.squares[pos] {
                    Square::Empty => (pos + 1).to_string(),
                    Square::Occupied(Token::X) => "X".to_string(),
                    Square::Occupied(Token::O) => "O".to_string(),
                };
                result.push_str(&symbol);
                if col < 2 {
                    result.push('|');
                }
            }
            if row < 2 {
                result.push_str("\n-+-+-\n");
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// Status of the game at the current board.
///
/// Derived from the board on every query, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum GameStatus {
    /// Game is ongoing; the contained mark acts next.
    #[display("Next player: {:?}", _0)]
    InProgress(Token),
    /// Game ended in a win.
    #[display("Winner: {:?}", _0)]
    Won(Token),
    /// Game ended in a draw.
    #[display("Draw!")]
    Draw,
}

impl GameStatus {
    /// True while the game accepts plays.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, GameStatus::InProgress(_))
    }

    /// The winning mark, if the game was won.
    pub fn winner(&self) -> Option<Token> {
        match self {
            GameStatus::Won(token) => Some(*token),
            _ => None,
        }
    }
}
