//! Move cursor and replay controller.
//!
//! Owns the move history of one board view plus a cursor into it. The
//! displayed position is always the initial position with
//! `history[..=cursor]` replayed on top; navigation recomputes it from scratch.
//! Every state change is published as a [`ReplaySnapshot`] on a watch channel.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::autoplay::{Timer, TimerHandle, TimerId};
use crate::engine::{MoveCandidate, RulesEngine, ShakmatyEngine};
use crate::error::ReplayError;
use crate::game_data::GameStatus;
use crate::pgn::{self, STANDARD_START_FEN};

pub const DEFAULT_AUTOPLAY_PERIOD: Duration = Duration::from_millis(1000);

/// Observable state of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplaySnapshot {
    pub fen: String,
    pub moves: Vec<String>,
    pub cursor: isize,
    pub autoplay: bool,
    pub status: GameStatus,
    pub analysis: Option<String>,
    pub analyzing: bool,
    pub generation: u64,
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Moved,
    /// Target outside `-1..=N-1`; nothing changed.
    OutOfRange,
    /// Replay failed part-way; the board was reset to the initial position.
    Recovered(ReplayError),
}

/// Outcome of an autoplay tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Advanced(usize),
    /// End of history reached; autoplay stopped.
    Finished,
    /// Tick from a cancelled or foreign timer; ignored.
    Stale,
}

/// Work order for the generative-analysis client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub generation: u64,
    pub pgn: String,
}

pub struct ReplayController<E: RulesEngine = ShakmatyEngine> {
    engine: E,
    timer: Box<dyn Timer>,
    period: Duration,
    initial: E::Position,
    position: E::Position,
    history: Vec<String>,
    cursor: isize,
    autoplay: Option<TimerHandle>,
    headers: Vec<(String, String)>,
    analysis: Option<String>,
    analyzing: bool,
    generation: u64,
    status: GameStatus,
    notifier: watch::Sender<ReplaySnapshot>,
}

impl ReplayController<ShakmatyEngine> {
    pub fn standard(timer: impl Timer + 'static) -> Self {
        Self::new(ShakmatyEngine, timer)
    }
}

impl<E: RulesEngine> ReplayController<E> {
    pub fn new(engine: E, timer: impl Timer + 'static) -> Self {
        let initial = engine.new_position();
        let status = GameStatus::classify(&engine.status(&initial), false);
        let (notifier, _) = watch::channel(ReplaySnapshot {
            fen: engine.fen(&initial),
            moves: Vec::new(),
            cursor: -1,
            autoplay: false,
            status,
            analysis: None,
            analyzing: false,
            generation: 0,
        });

        Self {
            engine,
            timer: Box::new(timer),
            period: DEFAULT_AUTOPLAY_PERIOD,
            position: initial.clone(),
            initial,
            history: Vec::new(),
            cursor: -1,
            autoplay: None,
            headers: Vec::new(),
            analysis: None,
            analyzing: false,
            generation: 0,
            status,
            notifier,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    // ---- Accessors ----

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn position(&self) -> &E::Position {
        &self.position
    }

    pub fn initial_position(&self) -> &E::Position {
        &self.initial
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }

    pub fn fen(&self) -> String {
        self.engine.fen(&self.position)
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_autoplaying(&self) -> bool {
        self.autoplay.is_some()
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribe(&self) -> watch::Receiver<ReplaySnapshot> {
        self.notifier.subscribe()
    }

    pub fn snapshot(&self) -> ReplaySnapshot {
        ReplaySnapshot {
            fen: self.fen(),
            moves: self.history.clone(),
            cursor: self.cursor,
            autoplay: self.is_autoplaying(),
            status: self.status,
            analysis: self.analysis.clone(),
            analyzing: self.analyzing,
            generation: self.generation,
        }
    }

    fn len(&self) -> isize {
        self.history.len() as isize
    }

    fn prefix_len(&self) -> usize {
        (self.cursor + 1) as usize
    }

    // ---- Move applier ----

    /// Play a move from the board widget at the cursor.
    ///
    /// Any moves after the cursor are discarded. On rejection nothing changes.
    pub fn apply_move(&mut self, candidate: &MoveCandidate) -> Result<String, ReplayError> {
        let applied = self
            .engine
            .apply_candidate(&self.position, candidate)
            .map_err(|e| {
                debug!(from = %candidate.from, to = %candidate.to, "Move rejected: {e}");
                ReplayError::IllegalMove(e.to_string())
            })?;

        self.position = applied.position;
        self.history.truncate(self.prefix_len());
        self.history.push(applied.san.clone());
        self.cursor = self.len() - 1;
        self.refresh();

        Ok(applied.san)
    }

    // ---- Navigator ----

    /// Show the position after `history[index]` (`-1` = initial). Stops autoplay.
    pub fn goto_index(&mut self, index: isize) -> Navigation {
        self.stop_autoplay();
        self.seek(index)
    }

    pub fn goto_start(&mut self) -> Navigation {
        self.goto_index(-1)
    }

    pub fn goto_previous(&mut self) -> Navigation {
        self.goto_index(self.cursor - 1)
    }

    pub fn goto_next(&mut self) -> Navigation {
        self.goto_index(self.cursor + 1)
    }

    pub fn goto_end(&mut self) -> Navigation {
        self.goto_index(self.len() - 1)
    }

    fn seek(&mut self, index: isize) -> Navigation {
        if index < -1 || index >= self.len() {
            return Navigation::OutOfRange;
        }

        match self.replay_to(index) {
            Ok(position) => {
                self.position = position;
                self.cursor = index;
                self.refresh();
                Navigation::Moved
            }
            Err(err) => {
                warn!("Replay failed, resetting board to the initial position: {err}");
                self.position = self.initial.clone();
                self.cursor = -1;
                self.refresh();
                Navigation::Recovered(err)
            }
        }
    }

    fn replay_to(&self, index: isize) -> Result<E::Position, ReplayError> {
        let mut position = self.initial.clone();
        let end = (index + 1) as usize;
        for (i, san) in self.history[..end].iter().enumerate() {
            position = self
                .engine
                .apply_san(&position, san)
                .map_err(|_| ReplayError::ReplayInconsistency {
                    index: i,
                    san: san.clone(),
                })?
                .position;
        }
        Ok(position)
    }

    // ---- Autoplay ----

    /// Begin stepping forward once per period. No-op while already running.
    pub fn start_autoplay(&mut self) -> bool {
        if self.autoplay.is_some() {
            return false;
        }
        self.autoplay = Some(self.timer.every(self.period));
        self.refresh();
        true
    }

    /// Cancel autoplay if running. Idempotent.
    pub fn stop_autoplay(&mut self) {
        if let Some(handle) = self.autoplay.take() {
            handle.cancel();
            self.refresh();
        }
    }

    /// Deliver a timer tick.
    pub fn on_tick(&mut self, id: TimerId) -> Tick {
        match &self.autoplay {
            Some(handle) if handle.id() == id => {}
            _ => return Tick::Stale,
        }

        let next = self.cursor + 1;
        if next >= self.len() {
            self.stop_autoplay();
            return Tick::Finished;
        }

        // Not goto_next: that would cancel the timer delivering this tick
        match self.seek(next) {
            Navigation::Moved => Tick::Advanced(next as usize),
            _ => {
                self.stop_autoplay();
                Tick::Finished
            }
        }
    }

    // ---- Loader / reset ----

    /// Replace the game with one parsed from PGN (or FEN) text.
    ///
    /// The cursor lands on the last move. On failure nothing changes.
    pub fn load_from_notation(&mut self, text: &str) -> Result<(), ReplayError> {
        let game = self
            .engine
            .load_game(text)
            .map_err(|e| ReplayError::MalformedNotation(e.to_string()))?;

        self.stop_autoplay();
        self.initial = game.initial;
        self.position = game.final_position;
        self.history = game.moves;
        self.cursor = self.len() - 1;
        self.headers = game.headers;
        self.clear_analysis();
        self.refresh();
        Ok(())
    }

    /// Back to an empty game from the standard initial position.
    pub fn reset(&mut self) {
        self.stop_autoplay();
        self.initial = self.engine.new_position();
        self.position = self.initial.clone();
        self.history.clear();
        self.cursor = -1;
        self.headers.clear();
        self.clear_analysis();
        self.refresh();
    }

    fn clear_analysis(&mut self) {
        self.analysis = None;
        self.analyzing = false;
        self.generation += 1;
    }

    // ---- Analysis ----

    /// PGN of the moves up to the cursor. Empty when there is nothing to show.
    pub fn export_pgn(&self) -> String {
        let moves = &self.history[..self.prefix_len()];
        let mut headers: Vec<(String, String)> = self
            .headers
            .iter()
            .filter(|(key, _)| key != "Result")
            .cloned()
            .collect();

        let initial_fen = self.engine.fen(&self.initial);
        if initial_fen != STANDARD_START_FEN && !headers.iter().any(|(key, _)| key == "FEN") {
            headers.push(("SetUp".to_string(), "1".to_string()));
            headers.push(("FEN".to_string(), initial_fen));
        }
        if moves.is_empty() && headers.is_empty() {
            return String::new();
        }

        let result = self.status.result_token();
        headers.push(("Result".to_string(), result.to_string()));
        pgn::export_pgn(
            &headers,
            moves,
            self.engine.movetext_start(&self.initial),
            result,
        )
    }

    /// Mark an analysis as in flight. `None` when no move is on the board
    /// or another analysis has not finished yet.
    pub fn begin_analysis(&mut self) -> Option<AnalysisRequest> {
        if self.cursor < 0 || self.analyzing {
            return None;
        }
        self.analyzing = true;
        self.refresh();
        Some(AnalysisRequest {
            generation: self.generation,
            pgn: self.export_pgn(),
        })
    }

    /// Install analysis text. Dropped when the game was replaced since the request.
    pub fn finish_analysis(&mut self, generation: u64, text: String) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Discarding stale analysis");
            return false;
        }
        self.analysis = Some(text);
        self.analyzing = false;
        self.refresh();
        true
    }

    // ---- Internals ----

    fn refresh(&mut self) {
        self.status = self.compute_status();
        self.notifier.send_replace(self.snapshot());
    }

    fn compute_status(&self) -> GameStatus {
        let current = self.engine.position_key(&self.position);
        let mut seen = usize::from(self.engine.position_key(&self.initial) == current);
        let mut position = self.initial.clone();
        for san in &self.history[..self.prefix_len()] {
            match self.engine.apply_san(&position, san) {
                Ok(applied) => position = applied.position,
                Err(_) => break,
            }
            if self.engine.position_key(&position) == current {
                seen += 1;
            }
        }
        GameStatus::classify(&self.engine.status(&self.position), seen >= 3)
    }
}

impl<E: RulesEngine> Drop for ReplayController<E> {
    fn drop(&mut self) {
        if let Some(handle) = self.autoplay.take() {
            handle.cancel();
        }
    }
}
