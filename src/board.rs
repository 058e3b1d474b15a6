//! Game board representation and collision detection

use crate::piece::Piece;
use crate::tetromino::{CellColor, Position};

/// Standard board dimensions
pub const BOARD_WIDTH: usize = 10;
pub const VISIBLE_ROWS: usize = 20;
/// Hidden rows above the visible board for spawning
pub const BUFFER_ROWS: usize = 4;
pub const TOTAL_HEIGHT: usize = VISIBLE_ROWS + BUFFER_ROWS;

/// A cell on the board - either empty or filled with a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(CellColor),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Cell::Filled(_))
    }
}

pub type Row = [Cell; BOARD_WIDTH];

/// Rows removed by a single `clear_lines` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearedLines {
    /// Original indices of the removed rows, bottom-most first
    pub rows: Vec<usize>,
}

impl ClearedLines {
    pub fn count(&self) -> usize {
        self.rows.len()
    }
}

/// The game board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Grid stored as [row][col], row 0 is the top of the buffer zone
    cells: [Row; TOTAL_HEIGHT],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_WIDTH]; TOTAL_HEIGHT],
        }
    }

    /// True iff the position lies on the full grid, buffer rows included
    pub fn in_bounds(&self, pos: Position) -> bool {
        (0..TOTAL_HEIGHT as i32).contains(&pos.row) && (0..BOARD_WIDTH as i32).contains(&pos.col)
    }

    /// Get the cell at a position, None if out of bounds
    pub fn get(&self, pos: Position) -> Option<Cell> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.cells[pos.row as usize][pos.col as usize])
    }

    /// Set a cell at a position. Returns false if out of bounds
    pub fn set(&mut self, pos: Position, cell: Cell) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        self.cells[pos.row as usize][pos.col as usize] = cell;
        true
    }

    /// In bounds and empty
    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(|cell| cell.is_empty())
    }

    /// Filled, or outside the grid
    pub fn is_occupied(&self, pos: Position) -> bool {
        !self.is_empty(pos)
    }

    /// Every cell of the piece is in bounds and empty
    pub fn valid_position(&self, piece: &Piece) -> bool {
        piece.cells().iter().all(|&pos| self.is_empty(pos))
    }

    /// Lock a piece onto the board. Cells outside the grid are skipped.
    pub fn place(&mut self, piece: &Piece) {
        let color = piece.piece_type.color();
        for pos in piece.cells() {
            self.set(pos, Cell::Filled(color));
        }
    }

    /// Remove every full row at once and compact the rest downward.
    pub fn clear_lines(&mut self) -> ClearedLines {
        let rows: Vec<usize> = (0..TOTAL_HEIGHT)
            .rev()
            .filter(|&row| self.is_line_full(row))
            .collect();
        if rows.is_empty() {
            return ClearedLines::default();
        }

        let mut write_row = TOTAL_HEIGHT;
        for read_row in (0..TOTAL_HEIGHT).rev() {
            if !self.is_line_full(read_row) {
                write_row -= 1;
                if write_row != read_row {
                    self.cells[write_row] = self.cells[read_row];
                }
            }
        }

        // Fill the top with empty rows
        for row in &mut self.cells[..write_row] {
            *row = [Cell::Empty; BOARD_WIDTH];
        }

        ClearedLines { rows }
    }

    /// Check if a line is completely filled
    fn is_line_full(&self, row: usize) -> bool {
        self.cells[row].iter().all(|cell| cell.is_filled())
    }

    /// Where the piece would come to rest if dropped straight down
    pub fn ghost_position(&self, piece: &Piece) -> Position {
        let mut ghost = *piece;
        loop {
            let below = ghost.shifted(1, 0);
            if !self.valid_position(&below) {
                return ghost.anchor;
            }
            ghost = below;
        }
    }

    /// Any filled cell in the buffer zone above the visible area
    pub fn is_above_visible(&self) -> bool {
        self.cells[..BUFFER_ROWS]
            .iter()
            .any(|row| row.iter().any(|cell| cell.is_filled()))
    }

    /// Check if the board is completely empty
    pub fn is_clear(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|cell| cell.is_empty()))
    }

    /// Every row of the grid, top of the buffer zone first
    pub fn rows(&self) -> &[Row; TOTAL_HEIGHT] {
        &self.cells
    }

    /// The rows a renderer shows, top visible row first
    pub fn visible_rows(&self) -> &[Row] {
        &self.cells[BUFFER_ROWS..]
    }
}
