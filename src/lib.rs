//! Time-shift tic-tac-toe engine.
//!
//! A tic-tac-toe variant with three rule twists: an automated opponent
//! driven by exhaustive minimax, a once-per-player rewind of the board
//! history, and randomized round effects (a probabilistic bonus turn
//! and one blocked square per round). Rendering is out of scope; a view
//! layer calls in with cell indices and reads back snapshots.
//!
//! # Architecture
//!
//! - **Game**: append-only history of immutable boards with play,
//!   time-shift, and reset transitions
//! - **Selector**: exact minimax move choice for the automated side
//! - **Session**: the command surface a view layer talks to
//! - **Driver**: async deferral of automated moves, discarded when the
//!   state moves on first
//!
//! # Example
//!
//! ```no_run
//! use timeshift_tictactoe::{Session, Settings};
//!
//! let mut session = Session::new(Settings::default());
//! session.cell_activated(4);
//! println!("{}", session.snapshot().status());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod driver;
mod game;
mod position;
mod rules;
mod selector;
mod session;
mod settings;
mod snapshot;
mod types;

// Crate-level exports - engine
pub use game::{
    AppliedMove, AppliedShift, BONUS_TURN_CHANCE, Game, PlayOutcome, Randomness, Rejection,
    ShiftOutcome,
};

// Crate-level exports - board types and rules
pub use position::Position;
pub use rules::{check_winner, is_draw, is_full};
pub use types::{Board, GameStatus, Square, Token};

// Crate-level exports - move selection
pub use selector::select_move;

// Crate-level exports - session and orchestration
pub use driver::{AutoDriver, GameEvent};
pub use session::{AUTOMATED_TOKEN, PendingMove, Session};
pub use settings::{DEFAULT_THINK_DELAY, Settings};
pub use snapshot::{ShiftAvailability, Snapshot};
