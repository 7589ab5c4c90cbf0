//! Exhaustive minimax move selection.
//!
//! The tree over at most nine squares is small enough to search in
//! full, so the selector is exact and carries no pruning or caching.
//! Boards are searched as values; the caller's board is never mutated.

use crate::position::Position;
use crate::rules;
use crate::types::{Board, Token};
use tracing::{debug, instrument};

/// Score of a win on the move itself; deeper wins score lower and
/// deeper losses score higher, so the selector prefers fast wins and
/// slow losses.
const WIN_SCORE: i32 = 10;

/// Picks the best square for `token` on the given board.
///
/// Every empty, non-blocked square is scored by full minimax and the
/// highest score wins; equal scores keep the earliest candidate, so
/// ties resolve to the lowest index. Returns `None` when no legal
/// square exists.
#[instrument(skip(board))]
pub fn select_move(board: &Board, blocked: Option<Position>, token: Token) -> Option<Position> {
    let mut best: Option<(Position, i32)> = None;
    for position in Position::legal_moves(board, blocked) {
        let score = score_tree(&board.place(position, token), blocked, token, 0, false);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((position, score));
        }
    }
    debug!(?best, "Selected move");
    best.map(|(position, _)| position)
}

/// Scores a board `depth` plies below a candidate move.
///
/// `maximizing` is true when `token` is about to move. Terminal boards
/// score by the incoming depth; a board with empty squares but no legal
/// move (the last empty square is blocked) counts as a draw.
fn score_tree(
    board: &Board,
    blocked: Option<Position>,
    token: Token,
    depth: i32,
    maximizing: bool,
) -> i32 {
    if let Some(winner) = rules::check_winner(board) {
        return if winner == token {
            WIN_SCORE - depth
        } else {
            depth - WIN_SCORE
        };
    }
    if rules::is_full(board) {
        return 0;
    }

    let mover = if maximizing { token } else { token.opponent() };
    let mut best = if maximizing { i32::MIN } else { i32::MAX };
    let mut any_legal = false;
    for position in Position::legal_moves(board, blocked) {
        any_legal = true;
        let score = score_tree(
            &board.place(position, mover),
            blocked,
            token,
            depth + 1,
            !maximizing,
        );
        best = if maximizing {
            best.max(score)
        } else {
            best.min(score)
        };
    }
    if any_legal { best } else { 0 }
}
