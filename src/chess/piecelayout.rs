use std::fmt::{self, Display};

use crate::chess::{
    board::movegen::{RAY_BETWEEN, king_attacks, knight_attacks, pawn_attacks},
    magic::{bishop_attacks, rook_attacks},
    piece::{Black, Col, Colour, Piece, PieceType, White},
    squareset::SquareSet,
    types::Square,
};

/// Bitboard view of the position: one set per piece type, one per colour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PieceLayout {
    pub pieces: [SquareSet; 6],
    pub colours: [SquareSet; 2],
}

impl PieceLayout {
    pub fn occupied(&self) -> SquareSet {
        self.colours[Colour::White] | self.colours[Colour::Black]
    }

    pub fn empty(&self) -> SquareSet {
        !self.occupied()
    }

    pub fn of(&self, piece: Piece) -> SquareSet {
        self.pieces[piece.piece_type()] & self.colours[piece.colour()]
    }

    pub fn of_type(&self, colour: Colour, piece_type: PieceType) -> SquareSet {
        self.pieces[piece_type] & self.colours[colour]
    }

    pub fn diagonal_sliders(&self) -> SquareSet {
        self.pieces[PieceType::Bishop] | self.pieces[PieceType::Queen]
    }

    pub fn orthogonal_sliders(&self) -> SquareSet {
        self.pieces[PieceType::Rook] | self.pieces[PieceType::Queen]
    }

    pub fn toggle(&mut self, sq: Square, piece: Piece) {
        let bb = sq.as_set();
        self.pieces[piece.piece_type()] ^= bb;
        self.colours[piece.colour()] ^= bb;
    }

    pub fn move_piece(&mut self, from: Square, to: Square, piece: Piece) {
        let bb = from.as_set() | to.as_set();
        self.pieces[piece.piece_type()] ^= bb;
        self.colours[piece.colour()] ^= bb;
    }

    pub fn king_sq(&self, colour: Colour) -> Square {
        let kings = self.of_type(colour, PieceType::King);
        debug_assert_eq!(kings.count(), 1, "expected exactly one {colour:?} king");
        kings.first().unwrap_or_default()
    }

    /// Every piece of either colour that attacks `sq`, given the occupancy `occupied`.
    pub fn attackers_to(&self, sq: Square, occupied: SquareSet) -> SquareSet {
        let bb = sq.as_set();
        let pawns = self.pieces[PieceType::Pawn];
        let white_pawns = pawn_attacks::<Black>(bb) & pawns & self.colours[Colour::White];
        let black_pawns = pawn_attacks::<White>(bb) & pawns & self.colours[Colour::Black];
        white_pawns
            | black_pawns
            | knight_attacks(sq) & self.pieces[PieceType::Knight]
            | king_attacks(sq) & self.pieces[PieceType::King]
            | bishop_attacks(sq, occupied) & self.diagonal_sliders()
            | rook_attacks(sq, occupied) & self.orthogonal_sliders()
    }

    /// Does `side` attack `sq`?
    pub fn sq_attacked(&self, sq: Square, side: Colour) -> bool {
        match side {
            Colour::White => self.sq_attacked_by::<White>(sq, self.occupied()),
            Colour::Black => self.sq_attacked_by::<Black>(sq, self.occupied()),
        }
    }

    pub fn sq_attacked_by<C: Col>(&self, sq: Square, occupied: SquareSet) -> bool {
        let them = self.colours[C::COLOUR];
        // a pawn of ours on `sq` would attack exactly the squares their attacking pawns sit on.
        (pawn_attacks::<C::Opposite>(sq.as_set()) & self.pieces[PieceType::Pawn] & them).non_empty()
            || (knight_attacks(sq) & self.pieces[PieceType::Knight] & them).non_empty()
            || (king_attacks(sq) & self.pieces[PieceType::King] & them).non_empty()
            || (bishop_attacks(sq, occupied) & self.diagonal_sliders() & them).non_empty()
            || (rook_attacks(sq, occupied) & self.orthogonal_sliders() & them).non_empty()
    }

    /// All squares attacked by `side`.
    pub fn attacked_by(&self, side: Colour) -> SquareSet {
        let us = self.colours[side];
        let occupied = self.occupied();
        let pawns = self.pieces[PieceType::Pawn] & us;
        let mut attacked = match side {
            Colour::White => pawn_attacks::<White>(pawns),
            Colour::Black => pawn_attacks::<Black>(pawns),
        };
        for sq in self.pieces[PieceType::Knight] & us {
            attacked |= knight_attacks(sq);
        }
        for sq in self.diagonal_sliders() & us {
            attacked |= bishop_attacks(sq, occupied);
        }
        for sq in self.orthogonal_sliders() & us {
            attacked |= rook_attacks(sq, occupied);
        }
        attacked | king_attacks(self.king_sq(side))
    }

    /// Pieces of `side` that are the sole blocker between their king and an enemy slider.
    pub fn pinned(&self, side: Colour) -> SquareSet {
        let king = self.king_sq(side);
        let us = self.colours[side];
        let them = self.colours[!side];
        let snipers = bishop_attacks(king, them) & self.diagonal_sliders() & them
            | rook_attacks(king, them) & self.orthogonal_sliders() & them;
        let mut pinned = SquareSet::EMPTY;
        for sniper in snipers {
            let blockers = RAY_BETWEEN[king][sniper] & us;
            if blockers.one() {
                pinned |= blockers;
            }
        }
        pinned
    }

    /// Calls `callback` for every piece on the board.
    pub fn visit_pieces(&self, mut callback: impl FnMut(Square, Piece)) {
        for piece in Piece::all() {
            for sq in self.of(piece) {
                callback(sq, piece);
            }
        }
    }

    /// Neither side has enough material left to deliver mate.
    /// Covers bare kings, a lone minor, two knights against a bare king,
    /// same-coloured bishops, and one minor piece each.
    pub fn is_material_draw(&self) -> bool {
        use PieceType::{Bishop, Knight, Pawn, Queen, Rook};
        let heavy = self.pieces[Pawn] | self.pieces[Rook] | self.pieces[Queen];
        if heavy.non_empty() {
            return false;
        }
        let minors = self.pieces[Knight] | self.pieces[Bishop];
        let white = (minors & self.colours[Colour::White]).count();
        let black = (minors & self.colours[Colour::Black]).count();
        match (white, black) {
            (0 | 1, 0) | (0, 1) | (1, 1) => true,
            (2, 0) => self.of_type(Colour::White, Knight).count() == 2,
            (0, 2) => self.of_type(Colour::Black, Knight).count() == 2,
            _ => {
                // any number of bishops, all on one colour of square.
                let bishops = self.pieces[Bishop];
                self.pieces[Knight].is_empty()
                    && ((bishops & SquareSet::LIGHT_SQUARES).is_empty()
                        || (bishops & SquareSet::DARK_SQUARES).is_empty())
            }
        }
    }

    /// The piece on `sq`, found by scanning the bitboards.
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        let colour = Colour::all().find(|&c| self.colours[c].contains_square(sq))?;
        let piece_type = PieceType::all().find(|&pt| self.pieces[pt].contains_square(sq))?;
        Some(Piece::new(colour, piece_type))
    }
}

impl Display for PieceLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            for file in 0..8 {
                let sq = Square::new(rank * 8 + file).unwrap_or_default();
                let c = self.piece_at(sq).map_or('.', Piece::char);
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::board::Board;

    #[test]
    fn insufficient_material() {
        let drawn = [
            "8/8/4k3/8/8/3K4/8/8 w - - 0 1",
            "8/8/4k3/8/8/3KN3/8/8 w - - 0 1",
            "8/8/4k3/8/8/3KB3/8/8 w - - 0 1",
            "8/8/4k3/8/8/2NKN3/8/8 w - - 0 1",
            "8/8/3bk3/8/8/3KB3/8/8 w - - 0 1",
            "8/8/3nk3/8/8/3KB3/8/8 w - - 0 1",
        ];
        for fen in drawn {
            let board = Board::from_fen(fen).unwrap();
            assert!(board.state.piece_layout.is_material_draw(), "{fen}");
        }
        let live = [
            "8/8/4k3/8/8/3KR3/8/8 w - - 0 1",
            "8/8/4k3/8/8/3KP3/8/8 w - - 0 1",
            "8/8/4k3/8/8/2BKN3/8/8 w - - 0 1",
            "8/8/4k3/8/8/3K4/3BB3/8 w - - 0 1",
        ];
        for fen in live {
            let board = Board::from_fen(fen).unwrap();
            assert!(!board.state.piece_layout.is_material_draw(), "{fen}");
        }
    }

    #[test]
    fn pins_and_attackers() {
        // the knight on d2 is pinned by the bishop on b4.
        let board = Board::from_fen("4k3/8/8/8/1b6/8/3N4/4K3 w - - 0 1").unwrap();
        let layout = &board.state.piece_layout;
        assert_eq!(layout.pinned(Colour::White), Square::D2.as_set());
        assert!(layout.sq_attacked(Square::C3, Colour::Black));
        let attackers = layout.attackers_to(Square::C3, layout.occupied());
        assert_eq!(attackers, Square::B4.as_set());
    }
}
