//! Super Rotation System (SRS) wall kick data
//!
//! SRS defines the wall kicks attempted when rotating a piece.
//! If a rotation would cause collision, these offsets are tried in order.
//! Offsets are (col_offset, row_offset) with row+ meaning up, so the row
//! component has to be negated before it is applied to the board.

use crate::tetromino::{PieceType, Rotation};

/// Which kick table a piece type uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KickFamily {
    I,
    O,
    Jlstz,
}

impl KickFamily {
    pub fn of(piece_type: PieceType) -> KickFamily {
        match piece_type {
            PieceType::I => KickFamily::I,
            PieceType::O => KickFamily::O,
            _ => KickFamily::Jlstz,
        }
    }
}

type Kicks = [(i32, i32); 5];

const IDENTITY: [(i32, i32); 1] = [(0, 0)];

/// Get wall kick candidates for a rotation attempt, in priority order.
/// The first candidate is always (0, 0).
pub fn get_wall_kicks(
    piece_type: PieceType,
    from: Rotation,
    to: Rotation,
) -> &'static [(i32, i32)] {
    match KickFamily::of(piece_type) {
        // The square never needs a kick.
        KickFamily::O => &IDENTITY,
        KickFamily::I => i_piece_kicks(from, to),
        KickFamily::Jlstz => jlstz_kicks(from, to),
    }
}

/// Wall kicks for J, L, S, T, Z pieces
fn jlstz_kicks(from: Rotation, to: Rotation) -> &'static [(i32, i32)] {
    use Rotation::*;

    const N_E: Kicks = [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)];
    const E_N: Kicks = [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)];
    const E_S: Kicks = [(0, 0), (1, 0), (1, -1), (0, 2), (1, 2)];
    const S_E: Kicks = [(0, 0), (-1, 0), (-1, 1), (0, -2), (-1, -2)];
    const S_W: Kicks = [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)];
    const W_S: Kicks = [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)];
    const W_N: Kicks = [(0, 0), (-1, 0), (-1, -1), (0, 2), (-1, 2)];
    const N_W: Kicks = [(0, 0), (1, 0), (1, 1), (0, -2), (1, -2)];

    match (from, to) {
        (North, East) => &N_E,
        (East, North) => &E_N,
        (East, South) => &E_S,
        (South, East) => &S_E,
        (South, West) => &S_W,
        (West, South) => &W_S,
        (West, North) => &W_N,
        (North, West) => &N_W,
        // 180 and no-op turns are never requested by the engine
        _ => &IDENTITY,
    }
}

/// Wall kicks for I piece (different from other pieces)
fn i_piece_kicks(from: Rotation, to: Rotation) -> &'static [(i32, i32)] {
    use Rotation::*;

    const N_E: Kicks = [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)];
    const E_N: Kicks = [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)];
    const E_S: Kicks = [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)];
    const S_E: Kicks = [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)];
    const S_W: Kicks = [(0, 0), (2, 0), (-1, 0), (2, 1), (-1, -2)];
    const W_S: Kicks = [(0, 0), (-2, 0), (1, 0), (-2, -1), (1, 2)];
    const W_N: Kicks = [(0, 0), (1, 0), (-2, 0), (1, -2), (-2, 1)];
    const N_W: Kicks = [(0, 0), (-1, 0), (2, 0), (-1, 2), (2, -1)];

    match (from, to) {
        (North, East) => &N_E,
        (East, North) => &E_N,
        (East, South) => &E_S,
        (South, East) => &S_E,
        (South, West) => &S_W,
        (West, South) => &W_S,
        (West, North) => &W_N,
        (North, West) => &N_W,
        _ => &IDENTITY,
    }
}
