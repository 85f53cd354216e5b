use arrayvec::ArrayVec;

use crate::chess::{
    piece::{Colour, Piece},
    types::Square,
};

use super::network::{Align64, L1_SIZE};

/// A single feature toggled by a move.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FeatureUpdate {
    pub sq: Square,
    pub piece: Piece,
}

impl std::fmt::Display for FeatureUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{} on {}}}", self.piece, self.sq)
    }
}

/// The features a single move switches on and off.
/// No move touches more than two of each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBuffer {
    add: ArrayVec<FeatureUpdate, 2>,
    sub: ArrayVec<FeatureUpdate, 2>,
}

impl UpdateBuffer {
    pub fn move_piece(&mut self, from: Square, to: Square, piece: Piece) {
        self.add.push(FeatureUpdate { sq: to, piece });
        self.sub.push(FeatureUpdate { sq: from, piece });
    }

    pub fn clear_piece(&mut self, sq: Square, piece: Piece) {
        self.sub.push(FeatureUpdate { sq, piece });
    }

    pub fn add_piece(&mut self, sq: Square, piece: Piece) {
        self.add.push(FeatureUpdate { sq, piece });
    }

    pub fn adds(&self) -> &[FeatureUpdate] {
        &self.add
    }

    pub fn subs(&self) -> &[FeatureUpdate] {
        &self.sub
    }
}

/// Activations of the hidden layer, from both perspectives.
#[derive(Debug, Clone)]
pub struct Accumulator {
    pub white: Align64<[i16; L1_SIZE]>,
    pub black: Align64<[i16; L1_SIZE]>,

    /// The move that led here from the previous accumulator.
    pub update_buffer: UpdateBuffer,
    /// Whether each perspective has been materialised.
    pub correct: [bool; 2],
}

impl Accumulator {
    pub fn new(bias: &Align64<[i16; L1_SIZE]>) -> Self {
        Self { white: *bias, black: *bias, update_buffer: UpdateBuffer::default(), correct: [false; 2] }
    }

    /// Select the buffer by colour.
    pub const fn select(&self, colour: Colour) -> &Align64<[i16; L1_SIZE]> {
        match colour {
            Colour::White => &self.white,
            Colour::Black => &self.black,
        }
    }

    /// Select the buffer by colour.
    pub const fn select_mut(&mut self, colour: Colour) -> &mut Align64<[i16; L1_SIZE]> {
        match colour {
            Colour::White => &mut self.white,
            Colour::Black => &mut self.black,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_shapes() {
        let mut quiet = UpdateBuffer::default();
        quiet.move_piece(Square::G1, Square::F3, Piece::WN);
        assert_eq!(quiet.adds().len(), 1);
        assert_eq!(quiet.subs().len(), 1);
        assert_eq!(quiet.adds()[0], FeatureUpdate { sq: Square::F3, piece: Piece::WN });

        let mut capture = UpdateBuffer::default();
        capture.clear_piece(Square::D5, Piece::BP);
        capture.move_piece(Square::E4, Square::D5, Piece::WP);
        assert_eq!(capture.adds().len(), 1);
        assert_eq!(capture.subs().len(), 2);
    }
}
