//! Game engine: append-only board history with rewind.
//!
//! Every successful play appends a fresh board to the history; a
//! time-shift truncates it back to an earlier entry. Precondition
//! violations are rejected transitions that leave the state untouched,
//! reported as outcomes rather than errors.

use crate::position::Position;
use crate::rules;
use crate::types::{Board, GameStatus, Square, Token};
use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Probability that a successful play grants the mover a bonus turn.
pub const BONUS_TURN_CHANCE: f64 = 0.1;

// ─────────────────────────────────────────────────────────────
//  Randomness seam
// ─────────────────────────────────────────────────────────────

/// Source of the randomized rule effects.
///
/// Production hands in a `rand` generator; tests script the outcomes.
pub trait Randomness {
    /// Rolls whether the mover keeps the turn as a bonus.
    ///
    /// Only consulted when the play leaves the game in progress.
    fn bonus_granted(&mut self) -> bool;

    /// Draws the square blocked for the coming round.
    fn blocked_square(&mut self) -> Position;
}

impl Randomness for rand::rngs::StdRng {
    fn bonus_granted(&mut self) -> bool {
        self.random_bool(BONUS_TURN_CHANCE)
    }

    fn blocked_square(&mut self) -> Position {
        Position::ALL[self.random_range(0..Position::ALL.len())]
    }
}

impl Randomness for rand::rngs::ThreadRng {
    fn bonus_granted(&mut self) -> bool {
        self.random_bool(BONUS_TURN_CHANCE)
    }

    fn blocked_square(&mut self) -> Position {
        Position::ALL[self.random_range(0..Position::ALL.len())]
    }
}

// ─────────────────────────────────────────────────────────────
//  Transition outcomes
// ─────────────────────────────────────────────────────────────

/// Reason a transition was refused.
///
/// Refusals are ordinary control flow: the state is unchanged and the
/// caller decides whether to surface the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum Rejection {
    /// The game is already over.
    #[display("Game is already over")]
    GameOver,
    /// The square is blocked this round.
    #[display("Square {} is blocked this round", _0)]
    Blocked(Position),
    /// The square is already occupied.
    #[display("Square {} is already occupied", _0)]
    Occupied(Position),
    /// The mark has already used its one rewind.
    #[display("{:?} has already time-shifted this game", _0)]
    ShiftSpent(Token),
    /// The mark is driven by the move selector, not the view.
    #[display("{:?} is played by the automated opponent", _0)]
    AutomatedTurn(Token),
    /// The cell index does not name a board square.
    #[display("Cell index {} is out of bounds", _0)]
    BadIndex(usize),
}

/// A successfully applied play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct AppliedMove {
    /// The mark that moved.
    token: Token,
    /// Where the mark landed.
    position: Position,
    /// Whether the mover rolled a bonus turn.
    bonus: bool,
    /// Status after the move.
    status: GameStatus,
}

/// A successfully applied time-shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct AppliedShift {
    /// The mark that rewound the board.
    token: Token,
    /// Marks present before the rewind that are gone after it.
    erased: Vec<Position>,
    /// Status after the rewind.
    status: GameStatus,
}

/// Result of a play attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayOutcome {
    /// The mark landed.
    Applied(AppliedMove),
    /// Nothing changed.
    Rejected(Rejection),
}

/// Result of a time-shift attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftOutcome {
    /// The board rewound.
    Shifted(AppliedShift),
    /// Nothing changed.
    Rejected(Rejection),
}

// ─────────────────────────────────────────────────────────────
//  Game state
// ─────────────────────────────────────────────────────────────

/// Complete game state.
///
/// The history is append-only: entry 0 is the empty board and each
/// later entry differs from its predecessor in exactly one square.
/// The pointer always names the last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// Board after each move, oldest first.
    history: Vec<Board>,
    /// Index of the board in play.
    pointer: usize,
    /// Mark that moves next under normal alternation.
    turn: Token,
    /// Mark holding a bonus turn, if one was rolled.
    bonus: Option<Token>,
    /// Whether X has spent its rewind.
    shift_used_x: bool,
    /// Whether O has spent its rewind.
    shift_used_o: bool,
    /// Square no mark may land on this round.
    blocked: Option<Position>,
}

impl Game {
    /// Creates a new game with no blocked square.
    ///
    /// Call [`Game::reset`] to draw one.
    #[instrument]
    pub fn new() -> Self {
        Self {
            history: vec![Board::new()],
            pointer: 0,
            turn: Token::X,
            bonus: None,
            shift_used_x: false,
            shift_used_o: false,
            blocked: None,
        }
    }

    /// Board currently in play.
    pub fn board(&self) -> &Board {
        &self.history[self.pointer]
    }

    /// Every board reached so far, oldest first.
    pub fn history(&self) -> &[Board] {
        &self.history
    }

    /// Index of the board in play.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    /// The mark that acts next: the bonus holder if a bonus is live,
    /// otherwise the alternating turn mark.
    pub fn acting_token(&self) -> Token {
        self.bonus.unwrap_or(self.turn)
    }

    /// Mark holding a bonus turn, if any.
    pub fn bonus(&self) -> Option<Token> {
        self.bonus
    }

    /// Square blocked this round, if the feature drew one.
    pub fn blocked(&self) -> Option<Position> {
        self.blocked
    }

    /// Whether the mark may still rewind this game.
    pub fn shift_available(&self, token: Token) -> bool {
        match token {
            Token::X => !self.shift_used_x,
            Token::O => !self.shift_used_o,
        }
    }

    /// Status at the board in play, derived fresh on every call.
    #[instrument(skip(self))]
    pub fn status(&self) -> GameStatus {
        let board = self.board();
        if let Some(winner) = rules::check_winner(board) {
            GameStatus::Won(winner)
        } else if rules::is_draw(board) {
            GameStatus::Draw
        } else {
            GameStatus::InProgress(self.acting_token())
        }
    }

    /// Places the acting mark at the position.
    ///
    /// On success the history is truncated to the board in play, the new
    /// board is appended, and the pointer advances. If the resulting
    /// board is still in progress, the mover rolls for a bonus turn:
    /// granted, the turn does not pass; otherwise alternation resumes.
    ///
    /// A play on a finished game, a blocked square, or an occupied
    /// square is rejected without touching the state.
    #[instrument(skip(self, rng), fields(position = %position, token = ?self.acting_token()))]
    pub fn play(&mut self, position: Position, rng: &mut dyn Randomness) -> PlayOutcome {
        if let Some(reason) = self.refuse_play(position) {
            warn!(%reason, "Play rejected");
            return PlayOutcome::Rejected(reason);
        }

        let token = self.acting_token();
        let next = self.board().place(position, token);
        self.history.truncate(self.pointer + 1);
        self.history.push(next);
        self.pointer += 1;
        debug_assert_eq!(self.history.len(), self.pointer + 1);

        let in_progress = self.board_status().is_in_progress();
        let bonus = in_progress && rng.bonus_granted();
        if bonus {
            self.bonus = Some(token);
        } else {
            self.bonus = None;
            self.turn = token.opponent();
        }

        let status = self.status();
        debug!(?status, bonus, "Play applied");
        PlayOutcome::Applied(AppliedMove {
            token,
            position,
            bonus,
            status,
        })
    }

    /// Rewinds the board `steps_back` entries, saturating at the start.
    ///
    /// Each mark may rewind once per game; the rewind spends the acting
    /// mark's shift even when `steps_back` is 0. The turn does not pass.
    /// Marks erased by the rewind ride the outcome exactly once; they
    /// are not retained here.
    #[instrument(skip(self), fields(token = ?self.acting_token()))]
    pub fn time_shift(&mut self, steps_back: usize) -> ShiftOutcome {
        let token = self.acting_token();
        if !self.shift_available(token) {
            warn!(?token, "Time-shift rejected: already spent");
            return ShiftOutcome::Rejected(Rejection::ShiftSpent(token));
        }

        let target = self.pointer.saturating_sub(steps_back);
        let erased = erased_between(&self.history[self.pointer], &self.history[target]);
        self.history.truncate(target + 1);
        self.pointer = target;
        match token {
            Token::X => self.shift_used_x = true,
            Token::O => self.shift_used_o = true,
        }
        debug_assert_eq!(self.history.len(), self.pointer + 1);

        let status = self.status();
        debug!(?status, ?erased, "Time-shift applied");
        ShiftOutcome::Shifted(AppliedShift {
            token,
            erased,
            status,
        })
    }

    /// Starts a fresh round.
    ///
    /// Clears the history back to a single empty board, restores X to
    /// move, forgets any bonus, and restores both rewinds. Draws a new
    /// blocked square iff `draw_blocked`.
    #[instrument(skip(self, rng))]
    pub fn reset(&mut self, draw_blocked: bool, rng: &mut dyn Randomness) {
        self.history.clear();
        self.history.push(Board::new());
        self.pointer = 0;
        self.turn = Token::X;
        self.bonus = None;
        self.shift_used_x = false;
        self.shift_used_o = false;
        self.blocked = if draw_blocked {
            Some(rng.blocked_square())
        } else {
            None
        };
        debug!(blocked = ?self.blocked, "Round reset");
    }

    /// Status of the board alone, ignoring whose turn it is.
    fn board_status(&self) -> GameStatus {
        let board = self.board();
        if let Some(winner) = rules::check_winner(board) {
            GameStatus::Won(winner)
        } else if rules::is_draw(board) {
            GameStatus::Draw
        } else {
            GameStatus::InProgress(self.turn)
        }
    }

    fn refuse_play(&self, position: Position) -> Option<Rejection> {
        if !self.board_status().is_in_progress() {
            return Some(Rejection::GameOver);
        }
        if self.blocked == Some(position) {
            return Some(Rejection::Blocked(position));
        }
        if !self.board().is_empty(position) {
            return Some(Rejection::Occupied(position));
        }
        None
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// Positions occupied in `from` that differ in `to`.
fn erased_between(from: &Board, to: &Board) -> Vec<Position> {
    Position::ALL
        .iter()
        .copied()
        .filter(|pos| from.get(*pos) != Square::Empty && from.get(*pos) != to.get(*pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted randomness: pops bonus rolls from a queue (default: no
    /// bonus) and blocks a fixed square.
    struct Scripted {
        bonuses: VecDeque<bool>,
        blocked: Position,
    }

    impl Scripted {
        fn quiet() -> Self {
            Self {
                bonuses: VecDeque::new(),
                blocked: Position::TopLeft,
            }
        }

        fn bonuses(rolls: &[bool]) -> Self {
            Self {
                bonuses: rolls.iter().copied().collect(),
                blocked: Position::TopLeft,
            }
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

    fn applied(outcome: PlayOutcome) -> AppliedMove {
        match outcome {
            PlayOutcome::Applied(applied) => applied,
            PlayOutcome::Rejected(reason) => panic!("expected applied move, got {reason}"),
        }
    }

    #[test]
    fn test_alternation_starts_with_x() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        assert_eq!(game.acting_token(), Token::X);
        applied(game.play(Position::Center, &mut rng));
        assert_eq!(game.acting_token(), Token::O);
        applied(game.play(Position::TopLeft, &mut rng));
        assert_eq!(game.acting_token(), Token::X);
    }

    #[test]
    fn test_play_appends_history() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        applied(game.play(Position::Center, &mut rng));
        applied(game.play(Position::TopLeft, &mut rng));
        assert_eq!(game.history().len(), 3);
        assert_eq!(game.pointer(), 2);
        assert!(game.history()[0].is_empty(Position::Center));
    }

    #[test]
    fn test_occupied_square_rejected_without_change() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        applied(game.play(Position::Center, &mut rng));
        let before = game.clone();
        let outcome = game.play(Position::Center, &mut rng);
        assert_eq!(
            outcome,
            PlayOutcome::Rejected(Rejection::Occupied(Position::Center))
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_blocked_square_rejected() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        game.reset(true, &mut rng);
        let outcome = game.play(Position::TopLeft, &mut rng);
        assert_eq!(
            outcome,
            PlayOutcome::Rejected(Rejection::Blocked(Position::TopLeft))
        );
    }

    #[test]
    fn test_finished_game_rejects_play() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        // X: 0, 1, 2 wins the top row
        for pos in [
            Position::TopLeft,
            Position::MiddleLeft,
            Position::TopCenter,
            Position::Center,
            Position::TopRight,
        ] {
            applied(game.play(pos, &mut rng));
        }
        assert_eq!(game.status(), GameStatus::Won(Token::X));
        let outcome = game.play(Position::BottomRight, &mut rng);
        assert_eq!(outcome, PlayOutcome::Rejected(Rejection::GameOver));
    }

    #[test]
    fn test_bonus_keeps_the_turn() {
        let mut game = Game::new();
        let mut rng = Scripted::bonuses(&[true, false]);
        let first = applied(game.play(Position::Center, &mut rng));
        assert!(*first.bonus());
        assert_eq!(game.acting_token(), Token::X);
        assert_eq!(game.bonus(), Some(Token::X));

        let second = applied(game.play(Position::TopLeft, &mut rng));
        assert!(!*second.bonus());
        assert_eq!(game.acting_token(), Token::O);
        assert_eq!(game.bonus(), None);
    }

    #[test]
    fn test_no_bonus_roll_on_winning_move() {
        let mut game = Game::new();
        // A granted roll queued for the winning move must go unconsumed.
        let mut rng = Scripted::bonuses(&[false, false, false, false, true]);
        for pos in [
            Position::TopLeft,
            Position::MiddleLeft,
            Position::TopCenter,
            Position::Center,
        ] {
            applied(game.play(pos, &mut rng));
        }
        let winning = applied(game.play(Position::TopRight, &mut rng));
        assert!(!*winning.bonus());
        assert_eq!(winning.status(), &GameStatus::Won(Token::X));
        assert_eq!(game.bonus(), None);
        assert_eq!(rng.bonuses.len(), 1);
    }

    #[test]
    fn test_time_shift_truncates_history() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        for pos in [
            Position::TopLeft,
            Position::TopCenter,
            Position::MiddleLeft,
            Position::Center,
            Position::BottomRight,
        ] {
            applied(game.play(pos, &mut rng));
        }
        assert_eq!(game.pointer(), 5);

        let outcome = game.time_shift(2);
        let shift = match outcome {
            ShiftOutcome::Shifted(shift) => shift,
            ShiftOutcome::Rejected(reason) => panic!("expected shift, got {reason}"),
        };
        assert_eq!(game.pointer(), 3);
        assert_eq!(game.history().len(), 4);
        assert_eq!(
            shift.erased(),
            &vec![Position::Center, Position::BottomRight]
        );
    }

    #[test]
    fn test_time_shift_once_per_token() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        applied(game.play(Position::Center, &mut rng));

        // O rewinds, then tries again on its next turn
        match game.time_shift(1) {
            ShiftOutcome::Shifted(shift) => assert_eq!(*shift.token(), Token::O),
            ShiftOutcome::Rejected(reason) => panic!("expected shift, got {reason}"),
        }
        assert!(!game.shift_available(Token::O));
        assert!(game.shift_available(Token::X));

        let before = game.clone();
        let outcome = game.time_shift(1);
        assert_eq!(
            outcome,
            ShiftOutcome::Rejected(Rejection::ShiftSpent(Token::O))
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_time_shift_saturates_at_start() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        applied(game.play(Position::Center, &mut rng));
        applied(game.play(Position::TopLeft, &mut rng));

        match game.time_shift(100) {
            ShiftOutcome::Shifted(shift) => {
                assert_eq!(
                    shift.erased(),
                    &vec![Position::TopLeft, Position::Center]
                );
            }
            ShiftOutcome::Rejected(reason) => panic!("expected shift, got {reason}"),
        }
        assert_eq!(game.pointer(), 0);
        assert_eq!(game.history().len(), 1);
    }

    #[test]
    fn test_zero_step_shift_still_spends_the_rewind() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        applied(game.play(Position::Center, &mut rng));

        match game.time_shift(0) {
            ShiftOutcome::Shifted(shift) => assert!(shift.erased().is_empty()),
            ShiftOutcome::Rejected(reason) => panic!("expected shift, got {reason}"),
        }
        assert_eq!(game.pointer(), 1);
        assert!(!game.shift_available(Token::O));
    }

    #[test]
    fn test_time_shift_out_of_a_won_game() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        for pos in [
            Position::TopLeft,
            Position::MiddleLeft,
            Position::TopCenter,
            Position::Center,
            Position::TopRight,
        ] {
            applied(game.play(pos, &mut rng));
        }
        assert_eq!(game.status(), GameStatus::Won(Token::X));

        // O never got to move, so its rewind is intact
        match game.time_shift(1) {
            ShiftOutcome::Shifted(shift) => {
                assert_eq!(*shift.token(), Token::O);
                assert!(shift.status().is_in_progress());
            }
            ShiftOutcome::Rejected(reason) => panic!("expected shift, got {reason}"),
        }
        assert!(game.status().is_in_progress());
    }

    #[test]
    fn test_play_after_rewind_truncates_redo() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        for pos in [Position::TopLeft, Position::TopCenter, Position::Center] {
            applied(game.play(pos, &mut rng));
        }
        game.time_shift(2);
        assert_eq!(game.history().len(), 2);

        applied(game.play(Position::BottomRight, &mut rng));
        assert_eq!(game.history().len(), 3);
        assert_eq!(game.pointer(), 2);
        assert!(game.board().is_empty(Position::TopCenter));
        assert!(game.board().is_empty(Position::Center));
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut game = Game::new();
        let mut rng = Scripted::bonuses(&[true]);
        applied(game.play(Position::Center, &mut rng));
        game.time_shift(0);
        game.reset(true, &mut rng);

        assert_eq!(game.history().len(), 1);
        assert_eq!(game.pointer(), 0);
        assert_eq!(game.acting_token(), Token::X);
        assert_eq!(game.bonus(), None);
        assert!(game.shift_available(Token::X));
        assert!(game.shift_available(Token::O));
        assert_eq!(game.blocked(), Some(Position::TopLeft));
    }

    #[test]
    fn test_reset_without_mystery_square() {
        let mut game = Game::new();
        let mut rng = Scripted::quiet();
        game.reset(true, &mut rng);
        assert!(game.blocked().is_some());
        game.reset(false, &mut rng);
        assert_eq!(game.blocked(), None);
    }
}
