use std::{
    fmt::{self, Display},
    ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, Shr, Sub, SubAssign},
};

use crate::chess::{piece::Colour, types::Square};

/// A set of squares, one bit per square, A1 as the least significant bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
#[repr(transparent)]
pub struct SquareSet {
    inner: u64,
}

impl SquareSet {
    pub const EMPTY: Self = Self { inner: 0 };
    pub const FULL: Self = Self { inner: !0 };

    pub const RANK_1: Self = Self { inner: 0xFF };
    pub const RANK_2: Self = Self { inner: 0xFF << 8 };
    pub const RANK_3: Self = Self { inner: 0xFF << 16 };
    pub const RANK_4: Self = Self { inner: 0xFF << 24 };
    pub const RANK_5: Self = Self { inner: 0xFF << 32 };
    pub const RANK_6: Self = Self { inner: 0xFF << 40 };
    pub const RANK_7: Self = Self { inner: 0xFF << 48 };
    pub const RANK_8: Self = Self { inner: 0xFF << 56 };

    pub const FILE_A: Self = Self { inner: 0x0101_0101_0101_0101 };
    pub const FILE_H: Self = Self { inner: 0x0101_0101_0101_0101 << 7 };

    pub const LIGHT_SQUARES: Self = Self { inner: 0x55AA_55AA_55AA_55AA };
    pub const DARK_SQUARES: Self = Self { inner: !0x55AA_55AA_55AA_55AA };

    pub const BACK_RANKS: Self = Self::RANK_1.union(Self::RANK_8);

    pub const fn from_inner(inner: u64) -> Self {
        Self { inner }
    }

    pub const fn inner(self) -> u64 {
        self.inner
    }

    pub const fn from_square(square: Square) -> Self {
        Self { inner: 1 << square.index() }
    }

    pub const fn count(self) -> u32 {
        self.inner.count_ones()
    }

    pub const fn is_empty(self) -> bool {
        self.inner == 0
    }

    pub const fn non_empty(self) -> bool {
        self.inner != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self { inner: self.inner | other.inner }
    }

    pub const fn remove(self, other: Self) -> Self {
        Self { inner: self.inner & !other.inner }
    }

    pub const fn contains_square(self, square: Square) -> bool {
        self.inner & (1 << square.index()) != 0
    }

    pub const fn add_square(self, square: Square) -> Self {
        Self { inner: self.inner | (1 << square.index()) }
    }

    pub const fn remove_square(self, square: Square) -> Self {
        Self { inner: self.inner & !(1 << square.index()) }
    }

    /// The lowest square in the set.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn first(self) -> Option<Square> {
        Square::new(self.inner.trailing_zeros() as u8)
    }

    pub const fn one(self) -> bool {
        self.inner != 0 && self.inner & self.inner.wrapping_sub(1) == 0
    }

    pub const fn many(self) -> bool {
        self.inner & self.inner.wrapping_sub(1) != 0
    }

    pub const fn north_one(self) -> Self {
        Self { inner: self.inner << 8 }
    }

    pub const fn south_one(self) -> Self {
        Self { inner: self.inner >> 8 }
    }

    pub const fn east_one(self) -> Self {
        Self { inner: (self.inner << 1) & !Self::FILE_A.inner }
    }

    pub const fn west_one(self) -> Self {
        Self { inner: (self.inner >> 1) & !Self::FILE_H.inner }
    }

    pub const fn north_east_one(self) -> Self {
        Self { inner: (self.inner << 9) & !Self::FILE_A.inner }
    }

    pub const fn north_west_one(self) -> Self {
        Self { inner: (self.inner << 7) & !Self::FILE_H.inner }
    }

    pub const fn south_east_one(self) -> Self {
        Self { inner: (self.inner >> 7) & !Self::FILE_A.inner }
    }

    pub const fn south_west_one(self) -> Self {
        Self { inner: (self.inner >> 9) & !Self::FILE_H.inner }
    }

    /// Mirrors the set vertically when viewed from black's side.
    pub const fn relative_to(self, colour: Colour) -> Self {
        match colour {
            Colour::White => self,
            Colour::Black => Self { inner: self.inner.swap_bytes() },
        }
    }

    pub const fn iter(self) -> SquareIter {
        SquareIter { value: self.inner }
    }
}

/// Iterates the squares of a set in ascending order.
pub struct SquareIter {
    value: u64,
}

impl Iterator for SquareIter {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.value == 0 {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)]
        let lsb = self.value.trailing_zeros() as u8;
        self.value &= self.value - 1;
        // SAFETY: trailing_zeros of a nonzero u64 is within 0..64.
        Some(unsafe { Square::new_unchecked(lsb) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.value.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SquareIter {}

impl IntoIterator for SquareSet {
    type Item = Square;
    type IntoIter = SquareIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

macro_rules! impl_set_op {
    ($tr:ident, $method:ident, $assign_tr:ident, $assign_method:ident, $op:tt) => {
        impl $tr for SquareSet {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self { inner: self.inner $op rhs.inner }
            }
        }

        impl $assign_tr for SquareSet {
            fn $assign_method(&mut self, rhs: Self) {
                self.inner = self.inner $op rhs.inner;
            }
        }
    };
}

impl_set_op!(BitOr, bitor, BitOrAssign, bitor_assign, |);
impl_set_op!(BitAnd, bitand, BitAndAssign, bitand_assign, &);
impl_set_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, ^);

impl Sub for SquareSet {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self.remove(rhs)
    }
}

impl SubAssign for SquareSet {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.remove(rhs);
    }
}

impl Not for SquareSet {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self { inner: !self.inner }
    }
}

impl Shl<u8> for SquareSet {
    type Output = Self;

    fn shl(self, rhs: u8) -> Self::Output {
        Self { inner: self.inner << rhs }
    }
}

impl Shr<u8> for SquareSet {
    type Output = Self;

    fn shr(self, rhs: u8) -> Self::Output {
        Self { inner: self.inner >> rhs }
    }
}

impl Display for SquareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            let row = (self.inner >> (rank * 8)) & 0xFF;
            for file in 0..8 {
                f.write_str(if row >> file & 1 == 1 { "x " } else { ". " })?;
            }
            if rank > 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SquareSet;
    use crate::chess::{piece::Colour, types::Square};

    #[test]
    fn one_and_many() {
        assert!(!SquareSet::EMPTY.one());
        assert!(!SquareSet::EMPTY.many());
        let e4 = Square::E4.as_set();
        assert!(e4.one());
        assert!(!e4.many());
        let both = e4.add_square(Square::D5);
        assert!(!both.one());
        assert!(both.many());
    }

    #[test]
    fn iteration_is_ascending() {
        let set = Square::H8.as_set() | Square::A1.as_set() | Square::E4.as_set();
        let squares = set.iter().collect::<Vec<_>>();
        assert_eq!(squares, [Square::A1, Square::E4, Square::H8]);
        assert_eq!(set.iter().len(), 3);
    }

    #[test]
    fn shifts_do_not_wrap_files() {
        assert_eq!(Square::H4.as_set().east_one(), SquareSet::EMPTY);
        assert_eq!(Square::A4.as_set().west_one(), SquareSet::EMPTY);
        assert_eq!(Square::A4.as_set().north_east_one(), Square::B5.as_set());
        assert_eq!(SquareSet::RANK_2.relative_to(Colour::Black), SquareSet::RANK_7);
    }
}
