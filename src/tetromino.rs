//! Shared value types: board coordinates, rotation states, piece types
//! and the color tags stored in board cells.

use serde::{Deserialize, Serialize};
use std::ops::Add;

/// A (row, col) coordinate on the full grid.
/// Row 0 is the top of the buffer zone, row increases downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.row + rhs.row, self.col + rhs.col)
    }
}

/// The 7 tetromino types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    I, // long bar
    O, // square
    T,
    S,
    Z,
    J,
    L,
}

impl PieceType {
    /// One of each type, in bag order before shuffling
    pub const ALL: [PieceType; 7] = [
        PieceType::I,
        PieceType::O,
        PieceType::T,
        PieceType::S,
        PieceType::Z,
        PieceType::J,
        PieceType::L,
    ];

    /// Color tag written into the board when a piece of this type locks
    pub fn color(self) -> CellColor {
        match self {
            PieceType::I => CellColor::Cyan,
            PieceType::O => CellColor::Yellow,
            PieceType::T => CellColor::Purple,
            PieceType::S => CellColor::Green,
            PieceType::Z => CellColor::Red,
            PieceType::J => CellColor::Blue,
            PieceType::L => CellColor::Orange,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceType::I => "I",
            PieceType::O => "O",
            PieceType::T => "T",
            PieceType::S => "S",
            PieceType::Z => "Z",
            PieceType::J => "J",
            PieceType::L => "L",
        }
    }
}

/// Color tag of a filled cell. The renderer decides what each tag looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellColor {
    Cyan,
    Yellow,
    Purple,
    Green,
    Red,
    Blue,
    Orange,
}

/// Rotation states (using SRS naming convention)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    North, // 0, spawn state
    East,  // 1, clockwise from North
    South, // 2
    West,  // 3
}

impl Rotation {
    /// Numeric state 0-3
    pub fn index(self) -> usize {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    /// Inverse of `index`, taken mod 4
    pub fn from_index(index: usize) -> Rotation {
        match index % 4 {
            0 => Rotation::North,
            1 => Rotation::East,
            2 => Rotation::South,
            _ => Rotation::West,
        }
    }

    /// North → East → South → West → North
    pub fn cw(self) -> Rotation {
        Rotation::from_index(self.index() + 1)
    }

    /// North → West → South → East → North
    pub fn ccw(self) -> Rotation {
        Rotation::from_index(self.index() + 3)
    }

    pub fn turn(self, direction: RotationDirection) -> Rotation {
        match direction {
            RotationDirection::Clockwise => self.cw(),
            RotationDirection::CounterClockwise => self.ccw(),
        }
    }
}

/// Direction for rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}
