//! Session command surface between the view layer and the engine.
//!
//! The view resolves a click to a cell index and calls in; the session
//! validates the index, applies the transition, and keeps the automated
//! opponent scheduled. Deferred automated moves are stamped with an
//! epoch so a move computed against an old state is discarded instead
//! of applied.

use crate::game::{Game, PlayOutcome, Randomness, Rejection, ShiftOutcome};
use crate::position::Position;
use crate::selector::select_move;
use crate::settings::Settings;
use crate::snapshot::Snapshot;
use crate::types::Token;
use derive_getters::Getters;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument, warn};

/// The mark the move selector plays when automation is on.
pub const AUTOMATED_TOKEN: Token = Token::O;

/// A selector move waiting out the thinking delay.
///
/// The epoch names the state the move was computed against; applying it
/// against any later state is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct PendingMove {
    /// Where the automated mark will land.
    position: Position,
    /// Session epoch at computation time.
    epoch: u64,
}

/// A single play session: one game, its settings, and the scheduling
/// state for the automated opponent.
pub struct Session {
    game: Game,
    /// Settings the running round was started with.
    active: Settings,
    /// Settings the next reset will start with.
    staged: Settings,
    /// Bumped on every applied transition.
    epoch: u64,
    pending: Option<PendingMove>,
    rng: Box<dyn Randomness + Send>,
}

impl Session {
    /// Creates a session seeded from the operating system.
    #[instrument]
    pub fn new(settings: Settings) -> Self {
        Self::with_randomness(settings, Box::new(StdRng::from_os_rng()))
    }

    /// Creates a session with an injected randomness source.
    #[instrument(skip(rng))]
    pub fn with_randomness(settings: Settings, rng: Box<dyn Randomness + Send>) -> Self {
        info!(?settings, "Creating session");
        let mut session = Self {
            game: Game::new(),
            active: settings,
            staged: settings,
            epoch: 0,
            pending: None,
            rng,
        };
        session
            .game
            .reset(settings.mystery_square, session.rng.as_mut());
        session.reschedule();
        session
    }

    /// Plays the acting mark at the clicked cell.
    ///
    /// An out-of-board index, or a click while the automated opponent
    /// owns the turn, is rejected without touching the game.
    #[instrument(skip(self))]
    pub fn cell_activated(&mut self, index: usize) -> PlayOutcome {
        let Some(position) = Position::from_index(index) else {
            warn!(index, "Cell index out of bounds");
            return PlayOutcome::Rejected(Rejection::BadIndex(index));
        };
        if self.active.automated_opponent
            && self.game.status().is_in_progress()
            && self.game.acting_token() == AUTOMATED_TOKEN
        {
            warn!(index, "Cell activated during the automated side's turn");
            return PlayOutcome::Rejected(Rejection::AutomatedTurn(AUTOMATED_TOKEN));
        }

        let outcome = self.game.play(position, self.rng.as_mut());
        if let PlayOutcome::Applied(applied) = &outcome {
            info!(position = %position, status = %applied.status(), "Cell played");
            self.bump_epoch();
            self.reschedule();
        }
        outcome
    }

    /// Rewinds the board for the acting mark.
    #[instrument(skip(self))]
    pub fn time_shift_requested(&mut self, steps_back: usize) -> ShiftOutcome {
        let outcome = self.game.time_shift(steps_back);
        if let ShiftOutcome::Shifted(shift) = &outcome {
            info!(token = ?shift.token(), erased = ?shift.erased(), "Board rewound");
            self.bump_epoch();
            self.reschedule();
        }
        outcome
    }

    /// Starts a fresh round, consuming the staged settings.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.active = self.staged;
        self.bump_epoch();
        self.game
            .reset(self.active.mystery_square, self.rng.as_mut());
        info!(settings = ?self.active, "Session reset");
        self.reschedule();
    }

    /// Stages settings for the next reset; the running round keeps its
    /// settings.
    #[instrument(skip(self))]
    pub fn set_settings(&mut self, settings: Settings) {
        debug!(?settings, "Settings staged");
        self.staged = settings;
    }

    /// Settings of the running round.
    pub fn active_settings(&self) -> Settings {
        self.active
    }

    /// Rendering-ready view of the game.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from(&self.game)
    }

    /// Snapshot serialized as JSON.
    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }

    /// The automated move waiting out its thinking delay, if any.
    pub fn pending_move(&self) -> Option<PendingMove> {
        self.pending
    }

    /// Applies a previously computed automated move.
    ///
    /// Returns `None` without touching the game when the move's epoch no
    /// longer matches: the state moved on while the move waited.
    #[instrument(skip(self), fields(position = %pending.position, epoch = pending.epoch))]
    pub fn apply_pending(&mut self, pending: PendingMove) -> Option<PlayOutcome> {
        if pending.epoch != self.epoch {
            debug!(current = self.epoch, "Discarding stale pending move");
            return None;
        }

        let outcome = self.game.play(pending.position, self.rng.as_mut());
        if let PlayOutcome::Applied(applied) = &outcome {
            info!(position = %pending.position, status = %applied.status(), "Automated move landed");
            self.bump_epoch();
            self.reschedule();
        }
        Some(outcome)
    }

    fn bump_epoch(&mut self) {
        self.epoch += 1;
        self.pending = None;
    }

    /// Parks a selector move when the automated mark is due, which it is
    /// after any transition that leaves O acting on a live board.
    #[instrument(skip(self))]
    fn reschedule(&mut self) {
        if !self.active.automated_opponent {
            return;
        }
        if !self.game.status().is_in_progress() {
            return;
        }
        if self.game.acting_token() != AUTOMATED_TOKEN {
            return;
        }
        match select_move(self.game.board(), self.game.blocked(), AUTOMATED_TOKEN) {
            Some(position) => {
                debug!(position = %position, epoch = self.epoch, "Automated move scheduled");
                self.pending = Some(PendingMove {
                    position,
                    epoch: self.epoch,
                });
            }
            None => debug!("No legal square for the automated side"),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("game", &self.game)
            .field("active", &self.active)
            .field("staged", &self.staged)
            .field("epoch", &self.epoch)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
