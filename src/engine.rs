//! Core game state and logic
//!
//! The engine is a synchronous state machine. The caller feeds it input
//! actions plus two periodic timers (gravity and lock check) and reads
//! the resulting state back for rendering.

use crate::bag::Bag;
use crate::board::Board;
use crate::clock::{Clock, SystemClock};
use crate::piece::Piece;
use crate::score::{LineClearType, MIN_GRAVITY_INTERVAL, Scorer};
use crate::srs::get_wall_kicks;
use crate::tetromino::{PieceType, Position, RotationDirection};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Lock delay settings
pub const LOCK_DELAY: Duration = Duration::from_millis(500);
pub const MAX_LOCK_RESETS: u32 = 15;

/// Corners of the T piece's 3x3 bounding box, relative to its anchor
const T_CORNERS: [Position; 4] = [
    Position::new(0, 0),
    Position::new(0, 2),
    Position::new(2, 0),
    Position::new(2, 2),
];

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Playing,
    Paused,
    GameOver,
}

/// Input actions the engine can process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    HardDrop,
    RotateCW,
    RotateCCW,
    Hold,
    Pause,
}

/// What an action did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Movement, rotation, hold or pause, and whether it took effect
    Moved(bool),
    /// The action locked the piece
    Locked(LineClearType),
}

/// The main engine struct
#[derive(Debug)]
pub struct Engine<C: Clock = SystemClock> {
    board: Board,
    bag: Bag,
    scorer: Scorer,
    state: GameState,
    /// Current falling piece, None once the game is over
    current: Option<Piece>,
    /// Held piece (can swap once per piece)
    hold_piece: Option<PieceType>,
    hold_used: bool,
    preview_count: usize,
    /// Start of the lock delay, Some while the timer runs
    lock_timer: Option<Instant>,
    /// Number of lock resets used by the current piece
    lock_resets: u32,
    /// Last successful action was a rotation (for T-spin detection)
    last_move_was_rotation: bool,
    pieces_placed: u32,
    started_at: Instant,
    clock: C,
}

impl Engine<SystemClock> {
    /// Start a game at `start_level` showing `preview_count` upcoming pieces
    pub fn new(start_level: u32, preview_count: usize) -> Self {
        Self::with_seed(start_level, preview_count, rand::random())
    }

    /// Start a game with a reproducible piece sequence
    pub fn with_seed(start_level: u32, preview_count: usize, seed: u64) -> Self {
        Self::with_clock(start_level, preview_count, seed, SystemClock)
    }
}

impl<C: Clock> Engine<C> {
    /// Start a game whose lock delay and play time follow `clock`
    pub fn with_clock(start_level: u32, preview_count: usize, seed: u64, clock: C) -> Self {
        let started_at = clock.now();
        let mut engine = Self {
            board: Board::new(),
            bag: Bag::with_seed(seed),
            scorer: Scorer::new(start_level),
            state: GameState::Playing,
            current: None,
            hold_piece: None,
            hold_used: false,
            preview_count,
            lock_timer: None,
            lock_resets: 0,
            last_move_was_rotation: false,
            pieces_placed: 0,
            started_at,
            clock,
        };
        engine.spawn_next();
        debug!(start_level, preview_count, seed, "engine started");
        engine
    }

    /// Process an action
    pub fn process(&mut self, action: Action) -> Outcome {
        match action {
            Action::MoveLeft => Outcome::Moved(self.move_left()),
            Action::MoveRight => Outcome::Moved(self.move_right()),
            Action::SoftDrop => Outcome::Moved(self.soft_drop()),
            Action::HardDrop => Outcome::Locked(self.hard_drop()),
            Action::RotateCW => Outcome::Moved(self.rotate_cw()),
            Action::RotateCCW => Outcome::Moved(self.rotate_ccw()),
            Action::Hold => Outcome::Moved(self.hold()),
            Action::Pause => {
                let before = self.state;
                Outcome::Moved(self.toggle_pause() != before)
            }
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.shift_sideways(-1)
    }

    pub fn move_right(&mut self) -> bool {
        self.shift_sideways(1)
    }

    /// Move down one row. Descending always restarts the lock window.
    pub fn move_down(&mut self) -> bool {
        if !self.translate(1, 0) {
            return false;
        }
        self.last_move_was_rotation = false;
        self.lock_timer = None;
        self.lock_resets = 0;
        true
    }

    /// Move down and award soft drop points
    pub fn soft_drop(&mut self) -> bool {
        if self.move_down() {
            self.scorer.add_soft_drop(1);
            return true;
        }
        false
    }

    /// Drop as far as possible, award 2 points per row and lock
    pub fn hard_drop(&mut self) -> LineClearType {
        let Some(mut piece) = self.active_piece() else {
            return LineClearType::None;
        };
        let mut distance = 0;
        while self.board.valid_position(&piece.shifted(1, 0)) {
            piece = piece.shifted(1, 0);
            distance += 1;
        }
        self.current = Some(piece);
        self.scorer.add_hard_drop(distance);
        self.lock_piece()
    }

    pub fn rotate_cw(&mut self) -> bool {
        self.rotate(RotationDirection::Clockwise)
    }

    pub fn rotate_ccw(&mut self) -> bool {
        self.rotate(RotationDirection::CounterClockwise)
    }

    /// Rotate using SRS wall kicks; the first candidate that fits wins
    fn rotate(&mut self, direction: RotationDirection) -> bool {
        let Some(piece) = self.active_piece() else {
            return false;
        };
        let target = piece.rotation.turn(direction);
        let turned = piece.rotated(target);

        for &(kick_col, kick_row) in get_wall_kicks(piece.piece_type, piece.rotation, target) {
            // kick rows count upward, board rows count downward
            let candidate = turned.shifted(-kick_row, kick_col);
            if self.board.valid_position(&candidate) {
                self.current = Some(candidate);
                self.last_move_was_rotation = true;
                self.reset_lock_if_needed();
                return true;
            }
        }
        false
    }

    /// Set the current piece aside, once per piece
    pub fn hold(&mut self) -> bool {
        if self.hold_used {
            return false;
        }
        let Some(piece) = self.active_piece() else {
            return false;
        };

        let spawned = match self.hold_piece.replace(piece.piece_type) {
            Some(held) => self.spawn(held),
            None => self.spawn_next(),
        };
        if !spawned {
            return false;
        }
        debug!(held = piece.piece_type.name(), "hold");
        self.hold_used = true;
        true
    }

    /// Gravity step
    pub fn tick(&mut self) -> LineClearType {
        if self.active_piece().is_none() {
            return LineClearType::None;
        }
        if self.move_down() {
            return LineClearType::None;
        }
        if self.lock_timer.is_none() {
            self.lock_timer = Some(self.clock.now());
            return LineClearType::None;
        }
        if self.lock_expired() {
            return self.lock_piece();
        }
        LineClearType::None
    }

    /// Lock delay poll, run on a faster timer than gravity
    pub fn check_lock(&mut self) -> LineClearType {
        if self.active_piece().is_none() || self.lock_timer.is_none() {
            return LineClearType::None;
        }
        if self.can_move_down() {
            // Slid off the ledge, the piece falls again
            self.lock_timer = None;
            self.lock_resets = 0;
            return LineClearType::None;
        }
        if self.lock_expired() {
            return self.lock_piece();
        }
        LineClearType::None
    }

    /// Playing ⇄ Paused. A finished game stays over.
    pub fn toggle_pause(&mut self) -> GameState {
        self.state = match self.state {
            GameState::Playing => GameState::Paused,
            GameState::Paused => GameState::Playing,
            GameState::GameOver => GameState::GameOver,
        };
        self.state
    }

    /// The current piece, if the engine accepts piece operations
    fn active_piece(&self) -> Option<Piece> {
        match self.state {
            GameState::Playing => self.current,
            _ => None,
        }
    }

    fn translate(&mut self, rows: i32, cols: i32) -> bool {
        let Some(piece) = self.active_piece() else {
            return false;
        };
        let moved = piece.shifted(rows, cols);
        if !self.board.valid_position(&moved) {
            return false;
        }
        self.current = Some(moved);
        true
    }

    fn shift_sideways(&mut self, cols: i32) -> bool {
        if !self.translate(0, cols) {
            return false;
        }
        self.last_move_was_rotation = false;
        self.reset_lock_if_needed();
        true
    }

    fn can_move_down(&self) -> bool {
        self.current
            .is_some_and(|piece| self.board.valid_position(&piece.shifted(1, 0)))
    }

    fn lock_expired(&self) -> bool {
        self.lock_timer
            .is_some_and(|start| self.clock.now().duration_since(start) >= LOCK_DELAY)
    }

    /// Restart a running lock timer, limited resets per piece
    fn reset_lock_if_needed(&mut self) {
        if self.lock_timer.is_some() && self.lock_resets < MAX_LOCK_RESETS {
            self.lock_timer = Some(self.clock.now());
            self.lock_resets += 1;
        }
    }

    /// Lock the current piece, score it and spawn the next
    fn lock_piece(&mut self) -> LineClearType {
        let Some(piece) = self.current.take() else {
            return LineClearType::None;
        };

        // Detect T-spin before the piece joins the board
        let is_t_spin = self.detect_t_spin(&piece);
        self.board.place(&piece);
        self.pieces_placed += 1;

        let cleared = self.board.clear_lines();
        let clear_type = self.scorer.add_line_clear(cleared.count(), is_t_spin);
        debug!(
            piece = piece.piece_type.name(),
            row = piece.anchor.row,
            col = piece.anchor.col,
            lines = cleared.count(),
            clear = clear_type.name(),
            score = self.scorer.score,
            "piece locked"
        );

        self.spawn_next();
        clear_type
    }

    /// 3 of the 4 bounding-box corners blocked after a rotation
    fn detect_t_spin(&self, piece: &Piece) -> bool {
        if !piece.is_t_piece() || !self.last_move_was_rotation {
            return false;
        }
        let blocked = T_CORNERS
            .iter()
            .filter(|&&corner| self.board.is_occupied(piece.anchor + corner))
            .count();
        blocked >= 3
    }

    fn spawn_next(&mut self) -> bool {
        let piece_type = self.bag.next();
        self.spawn(piece_type)
    }

    /// Put a fresh piece at its spawn position and reset per-piece state.
    /// Ends the game if the spawn position is blocked.
    fn spawn(&mut self, piece_type: PieceType) -> bool {
        let piece = Piece::new(piece_type);
        if !self.board.valid_position(&piece) {
            self.current = None;
            self.state = GameState::GameOver;
            info!(
                score = self.scorer.score,
                level = self.scorer.level,
                lines = self.scorer.lines,
                pieces = self.pieces_placed,
                "game over: {} blocked at spawn",
                piece_type.name()
            );
            return false;
        }

        self.current = Some(piece);
        self.hold_used = false;
        self.lock_timer = None;
        self.lock_resets = 0;
        self.last_move_was_rotation = false;
        true
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn current_piece(&self) -> Option<&Piece> {
        self.current.as_ref()
    }

    pub fn current_cells(&self) -> Option<[Position; 4]> {
        self.current.map(|piece| piece.cells())
    }

    /// Where the current piece would land on a hard drop
    pub fn ghost_position(&self) -> Option<Position> {
        self.current.map(|piece| self.board.ghost_position(&piece))
    }

    pub fn ghost_cells(&self) -> Option<[Position; 4]> {
        self.current.map(|piece| {
            Piece {
                anchor: self.board.ghost_position(&piece),
                ..piece
            }
            .cells()
        })
    }

    pub fn held_piece(&self) -> Option<PieceType> {
        self.hold_piece
    }

    pub fn hold_used(&self) -> bool {
        self.hold_used
    }

    /// Upcoming pieces; does not consume them
    pub fn next_pieces(&mut self) -> &[PieceType] {
        self.bag.preview(self.preview_count)
    }

    pub fn score(&self) -> u64 {
        self.scorer.score
    }

    pub fn level(&self) -> u32 {
        self.scorer.level
    }

    pub fn lines(&self) -> u32 {
        self.scorer.lines
    }

    pub fn combo(&self) -> u32 {
        self.scorer.combo
    }

    pub fn back_to_back(&self) -> bool {
        self.scorer.back_to_back
    }

    /// Time between gravity steps at the current level
    pub fn gravity_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.scorer.gravity_interval())
            .unwrap_or(Duration::from_secs_f64(MIN_GRAVITY_INTERVAL))
    }

    pub fn pieces_placed(&self) -> u32 {
        self.pieces_placed
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().duration_since(self.started_at)
    }

    pub fn pieces_per_second(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        f64::from(self.pieces_placed) / secs
    }

    /// Whether the lock delay is running for the current piece
    pub fn lock_pending(&self) -> bool {
        self.lock_timer.is_some()
    }

    pub fn lock_resets(&self) -> u32 {
        self.lock_resets
    }

    pub fn last_move_was_rotation(&self) -> bool {
        self.last_move_was_rotation
    }

    /// The stack reaches into the hidden buffer rows
    pub fn is_overflowing(&self) -> bool {
        self.board.is_above_visible()
    }
}
