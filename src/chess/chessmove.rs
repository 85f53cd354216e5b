use std::{
    fmt::{self, Debug, Display},
    num::NonZeroU16,
};

use crate::chess::{
    piece::PieceType,
    types::{File, Square},
};

/// The four-bit flag field of a move.
/// Ordinary moves carry the type of the piece that moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum MoveFlags {
    Pawn = 1,
    Knight = 2,
    Bishop = 3,
    Rook = 4,
    Queen = 5,
    King = 6,
    Castle = 7,
    EnPassant = 8,
    DoublePush = 9,
    PromoKnight = 10,
    PromoBishop = 11,
    PromoRook = 12,
    PromoQueen = 13,
}

impl MoveFlags {
    pub const fn normal(piece_type: PieceType) -> Self {
        match piece_type {
            PieceType::Pawn => Self::Pawn,
            PieceType::Knight => Self::Knight,
            PieceType::Bishop => Self::Bishop,
            PieceType::Rook => Self::Rook,
            PieceType::Queen => Self::Queen,
            PieceType::King => Self::King,
        }
    }

    pub const fn promotion(to: PieceType) -> Option<Self> {
        match to {
            PieceType::Knight => Some(Self::PromoKnight),
            PieceType::Bishop => Some(Self::PromoBishop),
            PieceType::Rook => Some(Self::PromoRook),
            PieceType::Queen => Some(Self::PromoQueen),
            PieceType::Pawn | PieceType::King => None,
        }
    }

    const fn from_bits(bits: u16) -> Option<Self> {
        Some(match bits {
            1 => Self::Pawn,
            2 => Self::Knight,
            3 => Self::Bishop,
            4 => Self::Rook,
            5 => Self::Queen,
            6 => Self::King,
            7 => Self::Castle,
            8 => Self::EnPassant,
            9 => Self::DoublePush,
            10 => Self::PromoKnight,
            11 => Self::PromoBishop,
            12 => Self::PromoRook,
            13 => Self::PromoQueen,
            _ => return None,
        })
    }
}

/// A move, packed as `from << 10 | to << 4 | flag`.
///
/// The flag is never zero, so the all-zero encoding is free to act as the
/// null move: `Option<Move>` is still two bytes, and `None` means "no move".
/// A move is only meaningful alongside the position that produced it.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    data: NonZeroU16,
}

const _MOVE_NICHE: () = assert!(size_of::<Move>() == size_of::<Option<Move>>());

impl Move {
    const FLAG_MASK: u16 = 0b1111;

    pub const fn new(from: Square, to: Square, flag: MoveFlags) -> Self {
        let data = (from.inner() as u16) << 10 | (to.inner() as u16) << 4 | flag as u16;
        // SAFETY: the flag field is never zero.
        Self { data: unsafe { NonZeroU16::new_unchecked(data) } }
    }

    pub const fn new_normal(from: Square, to: Square, piece_type: PieceType) -> Self {
        Self::new(from, to, MoveFlags::normal(piece_type))
    }

    /// Reconstructs a move from its packed form, as stored in the hash table.
    pub const fn from_raw(data: u16) -> Option<Self> {
        if MoveFlags::from_bits(data & Self::FLAG_MASK).is_none() {
            return None;
        }
        match NonZeroU16::new(data) {
            Some(data) => Some(Self { data }),
            None => None,
        }
    }

    pub const fn inner(self) -> u16 {
        self.data.get()
    }

    pub const fn from(self) -> Square {
        // SAFETY: six bits always make a valid square.
        unsafe { Square::new_unchecked((self.data.get() >> 10) as u8) }
    }

    pub const fn to(self) -> Square {
        // SAFETY: six bits always make a valid square.
        unsafe { Square::new_unchecked((self.data.get() >> 4 & 0b11_1111) as u8) }
    }

    pub const fn flag(self) -> MoveFlags {
        match MoveFlags::from_bits(self.data.get() & Self::FLAG_MASK) {
            Some(flag) => flag,
            None => panic!("invalid move flag"),
        }
    }

    /// The type of the piece that makes this move.
    pub const fn piece_type(self) -> PieceType {
        match self.flag() {
            MoveFlags::Knight => PieceType::Knight,
            MoveFlags::Bishop => PieceType::Bishop,
            MoveFlags::Rook => PieceType::Rook,
            MoveFlags::Queen => PieceType::Queen,
            MoveFlags::King | MoveFlags::Castle => PieceType::King,
            _ => PieceType::Pawn,
        }
    }

    pub const fn promotion_type(self) -> Option<PieceType> {
        match self.flag() {
            MoveFlags::PromoKnight => Some(PieceType::Knight),
            MoveFlags::PromoBishop => Some(PieceType::Bishop),
            MoveFlags::PromoRook => Some(PieceType::Rook),
            MoveFlags::PromoQueen => Some(PieceType::Queen),
            _ => None,
        }
    }

    pub const fn is_promo(self) -> bool {
        self.data.get() & Self::FLAG_MASK >= MoveFlags::PromoKnight as u16
    }

    pub const fn is_ep(self) -> bool {
        self.data.get() & Self::FLAG_MASK == MoveFlags::EnPassant as u16
    }

    pub const fn is_castle(self) -> bool {
        self.data.get() & Self::FLAG_MASK == MoveFlags::Castle as u16
    }

    pub const fn is_double_push(self) -> bool {
        self.data.get() & Self::FLAG_MASK == MoveFlags::DoublePush as u16
    }

    pub const fn is_kingside_castling(self) -> bool {
        self.is_castle() && self.to().inner() > self.from().inner()
    }

    /// Where the rook of a castling move starts and ends.
    pub fn castling_rook_squares(self) -> (Square, Square) {
        debug_assert!(self.is_castle());
        let rank = self.from().rank();
        let (from, to) = if self.is_kingside_castling() { (File::H, File::F) } else { (File::A, File::D) };
        (from.with(rank), to.with(rank))
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from(), self.to())?;
        if let Some(promo) = self.promotion_type().and_then(PieceType::promo_char) {
            write!(f, "{promo}")?;
        }
        Ok(())
    }
}

impl Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({:?})", self.flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_recoverable() {
        for from in Square::all() {
            for to in [Square::A1, Square::H8, Square::E4] {
                let m = Move::new(from, to, MoveFlags::Knight);
                assert_eq!(m.from(), from);
                assert_eq!(m.to(), to);
                assert_eq!(m.piece_type(), PieceType::Knight);
                assert_eq!(Move::from_raw(m.inner()), Some(m));
            }
        }
    }

    #[test]
    fn null_encoding_is_rejected() {
        assert_eq!(Move::from_raw(0), None);
        assert_eq!(Move::from_raw(0b1110), None);
    }

    #[test]
    fn special_moves() {
        let promo = Move::new(Square::E7, Square::E8, MoveFlags::PromoQueen);
        assert!(promo.is_promo());
        assert_eq!(promo.promotion_type(), Some(PieceType::Queen));
        assert_eq!(promo.piece_type(), PieceType::Pawn);
        assert_eq!(promo.to_string(), "e7e8q");

        let castle = Move::new(Square::E8, Square::C8, MoveFlags::Castle);
        assert!(castle.is_castle());
        assert!(!castle.is_kingside_castling());
        assert_eq!(castle.castling_rook_squares(), (Square::A8, Square::D8));
        assert_eq!(castle.piece_type(), PieceType::King);

        let ep = Move::new(Square::E5, Square::D6, MoveFlags::EnPassant);
        assert!(ep.is_ep() && !ep.is_promo() && !ep.is_castle());
    }
}
