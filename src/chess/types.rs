use std::{
    fmt::{self, Display},
    mem::size_of,
    ops::{Index, IndexMut},
    str::FromStr,
};

use crate::chess::{
    piece::{Colour, Piece},
    piecelayout::PieceLayout,
    squareset::SquareSet,
};

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

const _FILE_NICHE: () = assert!(size_of::<File>() == size_of::<Option<File>>());
const _RANK_NICHE: () = assert!(size_of::<Rank>() == size_of::<Option<Rank>>());

impl File {
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: index is a valid discriminant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn abs_diff(self, other: Self) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    pub const fn with(self, rank: Rank) -> Square {
        Square::from_rank_file(rank, self)
    }
}

impl Rank {
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: index is a valid discriminant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn abs_diff(self, other: Self) -> u8 {
        (self as u8).abs_diff(other as u8)
    }

    /// The rank as seen by `side`, so that white's second rank is black's seventh.
    pub const fn relative_to(self, side: Colour) -> Self {
        match side {
            Colour::White => self,
            // SAFETY: 7 - x stays within 0..8.
            Colour::Black => unsafe { std::mem::transmute::<u8, Self>(7 - self as u8) },
        }
    }
}

#[rustfmt::skip]
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug, Default)]
#[repr(u8)]
pub enum Square {
    #[default]
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

const _SQUARE_NICHE: () = assert!(size_of::<Square>() == size_of::<Option<Square>>());

impl Square {
    pub const fn new(inner: u8) -> Option<Self> {
        if inner < 64 {
            // SAFETY: inner is a valid discriminant.
            Some(unsafe { std::mem::transmute::<u8, Self>(inner) })
        } else {
            None
        }
    }

    /// SAFETY: `inner` must be less than 64.
    pub const unsafe fn new_unchecked(inner: u8) -> Self {
        debug_assert!(inner < 64);
        // SAFETY: upheld by the caller.
        unsafe { std::mem::transmute(inner) }
    }

    pub const fn from_rank_file(rank: Rank, file: File) -> Self {
        // SAFETY: rank * 8 + file is at most 63.
        unsafe { Self::new_unchecked(rank as u8 * 8 + file as u8) }
    }

    pub const fn file(self) -> File {
        // SAFETY: x % 8 is a valid file.
        unsafe { std::mem::transmute::<u8, File>(self as u8 % 8) }
    }

    pub const fn rank(self) -> Rank {
        // SAFETY: x / 8 is a valid rank for x < 64.
        unsafe { std::mem::transmute::<u8, Rank>(self as u8 / 8) }
    }

    pub const fn flip_rank(self) -> Self {
        // SAFETY: flipping the rank bits cannot leave 0..64.
        unsafe { Self::new_unchecked(self as u8 ^ 0b111_000) }
    }

    pub const fn flip_file(self) -> Self {
        // SAFETY: flipping the file bits cannot leave 0..64.
        unsafe { Self::new_unchecked(self as u8 ^ 0b000_111) }
    }

    pub const fn relative_to(self, side: Colour) -> Self {
        match side {
            Colour::White => self,
            Colour::Black => self.flip_rank(),
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn inner(self) -> u8 {
        self as u8
    }

    pub const fn add(self, offset: u8) -> Option<Self> {
        Self::new(self as u8 + offset)
    }

    pub const fn sub(self, offset: u8) -> Option<Self> {
        match (self as u8).checked_sub(offset) {
            Some(v) => Self::new(v),
            None => None,
        }
    }

    pub const fn distance(a: Self, b: Self) -> u8 {
        max!(a.file().abs_diff(b.file()), a.rank().abs_diff(b.rank()))
    }

    pub const fn as_set(self) -> SquareSet {
        SquareSet::from_square(self)
    }

    /// The square one step forward for a pawn of colour `side`.
    pub const fn pawn_push(self, side: Colour) -> Option<Self> {
        match side {
            Colour::White => self.add(8),
            Colour::Black => self.sub(8),
        }
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: every value in 0..64 is a valid discriminant.
        (0..64u8).map(|i| unsafe { Self::new_unchecked(i) })
    }

    pub fn name(self) -> [u8; 2] {
        [b'a' + self.file() as u8, b'1' + self.rank() as u8]
    }
}

impl<T> Index<Square> for [T; 64] {
    type Output = T;

    fn index(&self, index: Square) -> &Self::Output {
        // SAFETY: squares are always in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<Square> for [T; 64] {
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        // SAFETY: squares are always in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [file, rank] = self.name();
        write!(f, "{}{}", file as char, rank as char)
    }
}

impl FromStr for Square {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let &[file, rank] = s.as_bytes() else {
            return Err("square names are two characters long");
        };
        let file = File::from_index(file.wrapping_sub(b'a')).ok_or("invalid file")?;
        let rank = Rank::from_index(rank.wrapping_sub(b'1')).ok_or("invalid rank")?;
        Ok(Self::from_rank_file(rank, file))
    }
}

/// Castling rights, stored as the set of rook origin squares whose rook
/// may still castle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    rooks: SquareSet,
}

impl CastlingRights {
    const ALL: SquareSet = SquareSet::from_inner(
        Square::A1.as_set().inner()
            | Square::H1.as_set().inner()
            | Square::A8.as_set().inner()
            | Square::H8.as_set().inner(),
    );

    pub const NONE: Self = Self { rooks: SquareSet::EMPTY };

    pub const fn rooks(self) -> SquareSet {
        self.rooks
    }

    pub const fn is_empty(self) -> bool {
        self.rooks.is_empty()
    }

    /// A four-bit index of the rights, for Zobrist hashing.
    /// Bit order: white kingside, white queenside, black kingside, black queenside.
    pub const fn hashkey_index(self) -> usize {
        let r = self.rooks.inner();
        ((r >> 7 & 1) | (r << 1 & 2) | (r >> 61 & 4) | (r >> 53 & 8)) as usize
    }

    pub const fn kingside(self, side: Colour) -> Option<Square> {
        let sq = Square::H1.relative_to(side);
        if self.rooks.contains_square(sq) { Some(sq) } else { None }
    }

    pub const fn queenside(self, side: Colour) -> Option<Square> {
        let sq = Square::A1.relative_to(side);
        if self.rooks.contains_square(sq) { Some(sq) } else { None }
    }

    pub fn set(&mut self, rook_origin: Square) {
        debug_assert!(Self::ALL.contains_square(rook_origin));
        self.rooks = self.rooks.add_square(rook_origin);
    }

    /// Revokes any right tied to a rook on `sq`. Called with both the origin and
    /// destination of every move, so rook moves and rook captures both apply.
    pub fn remove(&mut self, sq: Square) {
        self.rooks = self.rooks.remove_square(sq);
    }

    pub fn clear(&mut self, side: Colour) {
        self.rooks = self.rooks.remove(SquareSet::RANK_1.relative_to(side));
    }
}

impl Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for (sq, c) in [(Square::H1, 'K'), (Square::A1, 'Q'), (Square::H8, 'k'), (Square::A8, 'q')] {
            if self.rooks.contains_square(sq) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// The (piece, destination) of a move, used to index continuation history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ContHistIndex {
    pub piece: Piece,
    pub square: Square,
}

/// Zobrist keys for a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Keys {
    /// Hash of the whole position.
    pub key: u64,
    /// Hash of the pawns alone.
    pub pawn_key: u64,
    /// Hash of the non-pawn pieces, split by colour.
    pub non_pawn_key: [u64; 2],
}

/// Everything about a position that `make_move` overwrites, so that
/// `unmake_move` can restore it by popping a copy off the history stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub piece_layout: PieceLayout,
    /// Redundant with the layout, for O(1) `piece_at`.
    pub mailbox: [Option<Piece>; 64],
    pub castle_perm: CastlingRights,
    /// Only set when a capture en passant is actually available.
    pub ep_square: Option<Square>,
    pub fifty_move_counter: u8,
    pub keys: Keys,
    /// Pieces giving check to the side to move.
    pub checkers: SquareSet,
    /// Pieces of the side to move pinned to their king.
    pub pinned: SquareSet,
    /// Squares attacked by the side not to move.
    pub threats: SquareSet,
}

impl Default for State {
    fn default() -> Self {
        Self {
            piece_layout: PieceLayout::default(),
            mailbox: [None; 64],
            castle_perm: CastlingRights::NONE,
            ep_square: None,
            fifty_move_counter: 0,
            keys: Keys::default(),
            checkers: SquareSet::EMPTY,
            pinned: SquareSet::EMPTY,
            threats: SquareSet::EMPTY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_flipping() {
        assert_eq!(Square::A1.flip_rank(), Square::A8);
        assert_eq!(Square::H8.flip_rank(), Square::H1);
        assert_eq!(Square::A1.flip_file(), Square::H1);
        assert_eq!(Square::E2.relative_to(Colour::Black), Square::E7);
    }

    #[test]
    fn square_names_round_trip() {
        for sq in Square::all() {
            assert_eq!(sq.to_string().parse::<Square>(), Ok(sq));
        }
        assert!("i1".parse::<Square>().is_err());
        assert!("a9".parse::<Square>().is_err());
        assert!("a".parse::<Square>().is_err());
    }

    #[test]
    fn castling_rights_hash_index_is_a_bijection() {
        let corners = [Square::H1, Square::A1, Square::H8, Square::A8];
        for mask in 0..16usize {
            let mut rights = CastlingRights::NONE;
            for (bit, &sq) in corners.iter().enumerate() {
                if mask >> bit & 1 == 1 {
                    rights.set(sq);
                }
            }
            assert_eq!(rights.hashkey_index(), mask);
        }
    }

    #[test]
    fn castling_rights_removal() {
        let mut rights = CastlingRights::NONE;
        for sq in [Square::A1, Square::H1, Square::A8, Square::H8] {
            rights.set(sq);
        }
        assert_eq!(rights.to_string(), "KQkq");
        rights.remove(Square::H1);
        assert_eq!(rights.kingside(Colour::White), None);
        assert_eq!(rights.queenside(Colour::White), Some(Square::A1));
        rights.remove(Square::E4);
        assert_eq!(rights.to_string(), "Qkq");
        rights.clear(Colour::Black);
        assert_eq!(rights.to_string(), "Q");
    }
}
