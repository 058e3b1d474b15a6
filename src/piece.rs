//! Piece shape table and the active falling piece

use crate::tetromino::{PieceType, Position, Rotation};

const fn p(row: i32, col: i32) -> Position {
    Position::new(row, col)
}

type Shape = [Position; 4];

const I_SHAPES: [Shape; 4] = [
    [p(0, 0), p(0, 1), p(0, 2), p(0, 3)],
    [p(0, 2), p(1, 2), p(2, 2), p(3, 2)],
    [p(2, 0), p(2, 1), p(2, 2), p(2, 3)],
    [p(0, 1), p(1, 1), p(2, 1), p(3, 1)],
];

const O_SHAPE: Shape = [p(0, 0), p(0, 1), p(1, 0), p(1, 1)];

const T_SHAPES: [Shape; 4] = [
    [p(0, 1), p(1, 0), p(1, 1), p(1, 2)],
    [p(0, 1), p(1, 1), p(1, 2), p(2, 1)],
    [p(1, 0), p(1, 1), p(1, 2), p(2, 1)],
    [p(0, 1), p(1, 0), p(1, 1), p(2, 1)],
];

// North: .SS   East: .S.   South: ...   West: S..
//        SS.         .SS          .SS         SS.
//        ...         ..S          SS.         .S.
const S_SHAPES: [Shape; 4] = [
    [p(0, 1), p(0, 2), p(1, 0), p(1, 1)],
    [p(0, 1), p(1, 1), p(1, 2), p(2, 2)],
    [p(1, 1), p(1, 2), p(2, 0), p(2, 1)],
    [p(0, 0), p(1, 0), p(1, 1), p(2, 1)],
];

const Z_SHAPES: [Shape; 4] = [
    [p(0, 0), p(0, 1), p(1, 1), p(1, 2)],
    [p(0, 2), p(1, 1), p(1, 2), p(2, 1)],
    [p(1, 0), p(1, 1), p(2, 1), p(2, 2)],
    [p(0, 1), p(1, 0), p(1, 1), p(2, 0)],
];

const J_SHAPES: [Shape; 4] = [
    [p(0, 0), p(1, 0), p(1, 1), p(1, 2)],
    [p(0, 1), p(0, 2), p(1, 1), p(2, 1)],
    [p(1, 0), p(1, 1), p(1, 2), p(2, 2)],
    [p(0, 1), p(1, 1), p(2, 0), p(2, 1)],
];

const L_SHAPES: [Shape; 4] = [
    [p(0, 2), p(1, 0), p(1, 1), p(1, 2)],
    [p(0, 1), p(1, 1), p(2, 1), p(2, 2)],
    [p(1, 0), p(1, 1), p(1, 2), p(2, 0)],
    [p(0, 0), p(0, 1), p(1, 1), p(2, 1)],
];

/// Occupied-cell offsets for a piece type at a rotation, relative to the
/// top-left corner of its bounding box.
pub fn shape(piece_type: PieceType, rotation: Rotation) -> &'static [Position; 4] {
    let r = rotation.index();
    match piece_type {
        PieceType::I => &I_SHAPES[r],
        // O piece doesn't rotate
        PieceType::O => &O_SHAPE,
        PieceType::T => &T_SHAPES[r],
        PieceType::S => &S_SHAPES[r],
        PieceType::Z => &Z_SHAPES[r],
        PieceType::J => &J_SHAPES[r],
        PieceType::L => &L_SHAPES[r],
    }
}

/// Spawn anchor - pieces spawn in the buffer zone, centered horizontally
pub fn spawn_position(piece_type: PieceType) -> Position {
    match piece_type {
        PieceType::O => Position::new(0, 4),
        _ => Position::new(0, 3),
    }
}

/// An active falling piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    /// The type of tetromino
    pub piece_type: PieceType,
    /// Current rotation state
    pub rotation: Rotation,
    /// Top-left corner of the bounding box
    pub anchor: Position,
}

impl Piece {
    /// Create a new piece at spawn position
    pub fn new(piece_type: PieceType) -> Self {
        Self {
            piece_type,
            rotation: Rotation::North,
            anchor: spawn_position(piece_type),
        }
    }

    /// Get the absolute positions of all 4 blocks
    pub fn cells(&self) -> [Position; 4] {
        shape(self.piece_type, self.rotation).map(|offset| self.anchor + offset)
    }

    /// Copy of this piece moved by (rows, cols)
    pub fn shifted(&self, rows: i32, cols: i32) -> Piece {
        Piece {
            anchor: self.anchor + Position::new(rows, cols),
            ..*self
        }
    }

    /// Copy of this piece in another rotation state, anchor unchanged
    pub fn rotated(&self, rotation: Rotation) -> Piece {
        Piece { rotation, ..*self }
    }

    /// Check if this is a T piece (for T-spin detection)
    pub fn is_t_piece(&self) -> bool {
        matches!(self.piece_type, PieceType::T)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_spawn_position() {
        let piece = Piece::new(PieceType::T);
        assert_eq!(piece.anchor, Position::new(0, 3));
        assert_eq!(Piece::new(PieceType::O).anchor, Position::new(0, 4));
        assert_eq!(piece.rotation, Rotation::North);
    }

    #[test]
    fn test_every_shape_has_four_distinct_cells_in_its_box() {
        for piece_type in PieceType::ALL {
            for r in 0..4 {
                let cells = shape(piece_type, Rotation::from_index(r));
                let unique: HashSet<_> = cells.iter().collect();
                assert_eq!(unique.len(), 4);
                let size = if piece_type == PieceType::I { 4 } else { 3 };
                assert!(cells
                    .iter()
                    .all(|c| (0..size).contains(&c.row) && (0..size).contains(&c.col)));
            }
        }
    }

    #[test]
    fn test_square_is_rotation_invariant() {
        for r in 0..4 {
            assert_eq!(shape(PieceType::O, Rotation::from_index(r)), &O_SHAPE);
        }
    }

    #[test]
    fn test_cells_follow_anchor() {
        let piece = Piece::new(PieceType::I).shifted(5, 1);
        assert_eq!(
            piece.cells(),
            [
                Position::new(5, 4),
                Position::new(5, 5),
                Position::new(5, 6),
                Position::new(5, 7)
            ]
        );
    }

    #[test]
    fn test_rotated_keeps_anchor() {
        let piece = Piece::new(PieceType::T).shifted(3, 0);
        let turned = piece.rotated(Rotation::East);
        assert_eq!(turned.anchor, piece.anchor);
        assert_eq!(turned.rotation, Rotation::East);
    }
}
