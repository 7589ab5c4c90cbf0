//! Deferred application of automated moves.
//!
//! The session computes the automated side's move synchronously; the
//! driver holds it back for the thinking delay on a spawned task and
//! applies it only if the session has not moved on. Every applied
//! transition is announced on the event channel.

use crate::game::{AppliedMove, PlayOutcome, ShiftOutcome};
use crate::position::Position;
use crate::session::Session;
use crate::settings::Settings;
use crate::types::{GameStatus, Token};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Messages sent from the driver to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// A mark landed on the board.
    MoveMade {
        /// The mark that moved.
        token: Token,
        /// Where it landed.
        position: Position,
    },
    /// The mover rolled a bonus turn and keeps the board.
    BonusTurn {
        /// The mark that moves again.
        token: Token,
    },
    /// The board rewound; these marks vanished.
    TimeShifted {
        /// The mark that rewound.
        token: Token,
        /// Positions whose marks were erased.
        erased: Vec<Position>,
    },
    /// A fresh round began.
    BoardReset,
    /// The game ended.
    GameOver {
        /// The winning mark, or `None` on a draw.
        winner: Option<Token>,
    },
}

/// Drives a session, deferring automated moves behind the thinking
/// delay and emitting [`GameEvent`]s for every applied transition.
pub struct AutoDriver {
    session: Arc<Mutex<Session>>,
    event_tx: mpsc::UnboundedSender<GameEvent>,
    deferral: Option<JoinHandle<()>>,
}

impl AutoDriver {
    /// Creates a driver around a session.
    pub fn new(session: Session, event_tx: mpsc::UnboundedSender<GameEvent>) -> Self {
        let mut driver = Self {
            session: Arc::new(Mutex::new(session)),
            event_tx,
            deferral: None,
        };
        // A fresh session never has a pending move (X opens), but a
        // handed-in mid-round session may.
        driver.arm();
        driver
    }

    /// Shared handle to the session for callers that read it directly.
    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    /// Forwards a cell click and announces the result.
    #[instrument(skip(self))]
    pub fn activate_cell(&mut self, index: usize) -> Result<PlayOutcome> {
        let outcome = self.session.lock().unwrap().cell_activated(index);
        if let PlayOutcome::Applied(applied) = &outcome {
            emit_applied(&self.event_tx, applied)?;
        }
        self.arm();
        Ok(outcome)
    }

    /// Forwards a rewind request and announces the result.
    #[instrument(skip(self))]
    pub fn request_time_shift(&mut self, steps_back: usize) -> Result<ShiftOutcome> {
        let outcome = self
            .session
            .lock()
            .unwrap()
            .time_shift_requested(steps_back);
        if let ShiftOutcome::Shifted(shift) = &outcome {
            self.event_tx.send(GameEvent::TimeShifted {
                token: *shift.token(),
                erased: shift.erased().clone(),
            })?;
        }
        self.arm();
        Ok(outcome)
    }

    /// Starts a fresh round. Any deferred move dies with the old round.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> Result<()> {
        self.session.lock().unwrap().reset();
        self.event_tx.send(GameEvent::BoardReset)?;
        self.arm();
        Ok(())
    }

    /// Stages settings for the next reset.
    #[instrument(skip(self))]
    pub fn set_settings(&self, settings: Settings) {
        self.session.lock().unwrap().set_settings(settings);
    }

    /// Waits for the in-flight deferral, if any, to finish.
    ///
    /// Callers must not hold the session lock across this await.
    pub async fn settle(&mut self) {
        if let Some(task) = self.deferral.take() {
            let _ = task.await;
        }
    }

    /// Aborts any sleeping deferral and, when the session holds a
    /// pending move, spawns a task to apply it after the thinking
    /// delay. The task keeps going while bonus turns leave fresh
    /// pending moves behind.
    fn arm(&mut self) {
        if let Some(task) = self.deferral.take() {
            task.abort();
        }

        let (first, delay) = {
            let session = self.session.lock().unwrap();
            (
                session.pending_move(),
                session.active_settings().think_delay,
            )
        };
        let Some(first) = first else { return };

        info!(position = %first.position(), delay_ms = delay.as_millis() as u64, "Deferring automated move");
        let session = Arc::clone(&self.session);
        let event_tx = self.event_tx.clone();
        self.deferral = Some(tokio::spawn(async move {
            let mut next = Some(first);
            while let Some(pending) = next.take() {
                tokio::time::sleep(delay).await;
                let step = {
                    let mut session = session.lock().unwrap();
                    session
                        .apply_pending(pending)
                        .map(|outcome| (outcome, session.pending_move()))
                };
                match step {
                    None => {
                        debug!("Stale pending move discarded");
                        return;
                    }
                    Some((PlayOutcome::Rejected(reason), _)) => {
                        warn!(%reason, "Deferred move rejected");
                        return;
                    }
                    Some((PlayOutcome::Applied(applied), follow_up)) => {
                        if emit_applied(&event_tx, &applied).is_err() {
                            debug!("Event channel closed");
                            return;
                        }
                        next = follow_up;
                    }
                }
            }
        }));
    }
}

impl Drop for AutoDriver {
    fn drop(&mut self) {
        if let Some(task) = self.deferral.take() {
            task.abort();
        }
    }
}

/// Announces an applied play: the move itself, a bonus turn when one
/// was rolled, and the end of the game when the move finished it.
fn emit_applied(
    event_tx: &mpsc::UnboundedSender<GameEvent>,
    applied: &AppliedMove,
) -> std::result::Result<(), mpsc::error::SendError<GameEvent>> {
    event_tx.send(GameEvent::MoveMade {
        token: *applied.token(),
        position: *applied.position(),
    })?;
    if *applied.bonus() {
        event_tx.send(GameEvent::BonusTurn {
            token: *applied.token(),
        })?;
    }
    match applied.status() {
        GameStatus::Won(winner) => event_tx.send(GameEvent::GameOver {
            winner: Some(*winner),
        })?,
        GameStatus::Draw => event_tx.send(GameEvent::GameOver { winner: None })?,
        GameStatus::InProgress(_) => {}
    }
    Ok(())
}
