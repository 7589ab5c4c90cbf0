//! Board-level rule queries.
//!
//! Pure functions over a single board. Win and draw are derived on every
//! call so any historical board can be inspected the same way as the
//! current one.

pub mod draw;
pub mod win;

pub use draw::{is_draw, is_full};
pub use win::check_winner;
