//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Once;
use timeshift_tictactoe::{Board, Position, Randomness, Token};

/// Installs an env-filter tracing subscriber once per test binary.
///
/// Run with `RUST_LOG=debug cargo test -- --nocapture` to watch the
/// engine's decisions.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Scripted randomness: bonus rolls pop from a queue (no bonus once the
/// queue runs dry) and the blocked square is fixed.
pub struct Scripted {
    pub bonuses: VecDeque<bool>,
    pub blocked: Position,
}

impl Scripted {
    /// No bonuses; blocked square at the given position.
    pub fn blocking(blocked: Position) -> Self {
        Self {
            bonuses: VecDeque::new(),
            blocked,
        }
    }

    /// Scripted bonus rolls; blocked square at top-left.
    pub fn bonuses(rolls: &[bool]) -> Self {
        Self {
            bonuses: rolls.iter().copied().collect(),
            blocked: Position::TopLeft,
        }
    }

    /// No bonuses, blocked square at top-left.
    pub fn quiet() -> Self {
        Self::blocking(Position::TopLeft)
    }
}

impl Randomness for Scripted {
    fn bonus_granted(&mut self) -> bool {
        self.bonuses.pop_front().unwrap_or(false)
    }

    fn blocked_square(&mut self) -> Position {
        self.blocked
    }
}

/// Builds a board from a compact layout, e.g. `"XOX XOO OXX"`.
/// Any character other than `X`/`O` leaves the square empty.
pub fn board_from(layout: &str) -> Board {
    let mut board = Board::new();
    let marks = layout.split_whitespace().collect::<String>();
    for (index, mark) in marks.chars().enumerate() {
        let pos = Position::from_index(index).expect("layout names at most 9 squares");
        board = match mark {
            'X' => board.place(pos, Token::X),
            'O' => board.place(pos, Token::O),
            _ => board,
        };
    }
    board
}
