use std::{
    fmt::{self, Display},
    ops::{Index, IndexMut, Not},
};

/// Compile-time side to move, used to monomorphise the move generator.
pub trait Col {
    type Opposite: Col;
    const WHITE: bool;
    const COLOUR: Colour;
}

pub struct White;
pub struct Black;

impl Col for White {
    type Opposite = Black;
    const WHITE: bool = true;
    const COLOUR: Colour = Colour::White;
}

impl Col for Black {
    type Opposite = White;
    const WHITE: bool = false;
    const COLOUR: Colour = Colour::Black;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Colour {
    #[default]
    White,
    Black,
}

impl Colour {
    pub const fn new(is_black: bool) -> Self {
        if is_black { Self::Black } else { Self::White }
    }

    pub const fn flip(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn inner(self) -> u8 {
        self as u8
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        [Self::White, Self::Black].into_iter()
    }
}

impl Not for Colour {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.flip()
    }
}

impl Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::White => "w",
            Self::Black => "b",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum PieceType {
    #[default]
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

const ALL_PIECE_TYPES: [PieceType; 6] = [
    PieceType::Pawn,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Rook,
    PieceType::Queen,
    PieceType::King,
];

impl PieceType {
    pub const fn new(v: u8) -> Option<Self> {
        if v < 6 { Some(ALL_PIECE_TYPES[v as usize]) } else { None }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn inner(self) -> u8 {
        self as u8
    }

    pub const fn promo_char(self) -> Option<char> {
        match self {
            Self::Knight => Some('n'),
            Self::Bishop => Some('b'),
            Self::Rook => Some('r'),
            Self::Queen => Some('q'),
            Self::Pawn | Self::King => None,
        }
    }

    pub const fn from_symbol(c: u8) -> Option<Self> {
        match c.to_ascii_lowercase() {
            b'p' => Some(Self::Pawn),
            b'n' => Some(Self::Knight),
            b'b' => Some(Self::Bishop),
            b'r' => Some(Self::Rook),
            b'q' => Some(Self::Queen),
            b'k' => Some(Self::King),
            _ => None,
        }
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        ALL_PIECE_TYPES.into_iter()
    }
}

impl Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = b"pnbrqk"[self.index()] as char;
        write!(f, "{c}")
    }
}

/// A coloured piece, packed as `colour * 6 + type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Piece {
    #[default]
    WP,
    WN,
    WB,
    WR,
    WQ,
    WK,
    BP,
    BN,
    BB,
    BR,
    BQ,
    BK,
}

const ALL_PIECES: [Piece; 12] = [
    Piece::WP,
    Piece::WN,
    Piece::WB,
    Piece::WR,
    Piece::WQ,
    Piece::WK,
    Piece::BP,
    Piece::BN,
    Piece::BB,
    Piece::BR,
    Piece::BQ,
    Piece::BK,
];

impl Piece {
    pub const fn new(colour: Colour, piece_type: PieceType) -> Self {
        ALL_PIECES[colour as usize * 6 + piece_type as usize]
    }

    pub const fn from_index(v: u8) -> Option<Self> {
        if v < 12 { Some(ALL_PIECES[v as usize]) } else { None }
    }

    pub const fn colour(self) -> Colour {
        Colour::new(self as u8 >= 6)
    }

    pub const fn piece_type(self) -> PieceType {
        ALL_PIECE_TYPES[self as usize % 6]
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn inner(self) -> u8 {
        self as u8
    }

    pub const fn char(self) -> char {
        b"PNBRQKpnbrqk"[self as usize] as char
    }

    pub fn from_char(c: u8) -> Option<Self> {
        let piece_type = PieceType::from_symbol(c)?;
        Some(Self::new(Colour::new(c.is_ascii_lowercase()), piece_type))
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        ALL_PIECES.into_iter()
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.char())
    }
}

macro_rules! impl_enum_indexing {
    ($ty:ty, $n:literal) => {
        impl<T> Index<$ty> for [T; $n] {
            type Output = T;

            fn index(&self, index: $ty) -> &Self::Output {
                // SAFETY: every discriminant of the enum is below the array length.
                unsafe { self.get_unchecked(index as usize) }
            }
        }

        impl<T> IndexMut<$ty> for [T; $n] {
            fn index_mut(&mut self, index: $ty) -> &mut Self::Output {
                // SAFETY: every discriminant of the enum is below the array length.
                unsafe { self.get_unchecked_mut(index as usize) }
            }
        }
    };
}

impl_enum_indexing!(Colour, 2);
impl_enum_indexing!(PieceType, 6);
impl_enum_indexing!(Piece, 12);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piece_packing_is_consistent() {
        for piece in Piece::all() {
            assert_eq!(Piece::new(piece.colour(), piece.piece_type()), piece);
            assert_eq!(Piece::from_char(piece.char() as u8), Some(piece));
        }
        assert_eq!(Piece::from_index(12), None);
    }

    #[test]
    fn colour_flipping() {
        assert_eq!(!Colour::White, Colour::Black);
        assert_eq!(Colour::Black.flip(), Colour::White);
        assert_eq!(Piece::BQ.colour(), Colour::Black);
        assert_eq!(Piece::WQ.piece_type(), PieceType::Queen);
    }
}
