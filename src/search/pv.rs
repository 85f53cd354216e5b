use std::fmt::Display;

use arrayvec::ArrayVec;

use crate::{chess::chessmove::Move, util::MAX_PLY};

#[derive(Clone, Debug, Default)]
pub struct PVariation {
    pub(crate) score: i32,
    pub(crate) moves: ArrayVec<Move, MAX_PLY>,
}

impl PVariation {
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub const fn score(&self) -> i32 {
        self.score
    }

    /// Sets this line to `m` followed by `rest`, dropping whatever does not fit.
    pub(crate) fn load_from(&mut self, m: Move, rest: &Self) {
        self.moves.clear();
        self.moves.push(m);
        let room = self.moves.remaining_capacity();
        self.moves.extend(rest.moves.iter().copied().take(room));
    }
}

impl Display for PVariation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.moves.is_empty() {
            return Ok(());
        }
        write!(f, "pv")?;
        for m in self.moves() {
            write!(f, " {m}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PVariation;
    use crate::{
        chess::{chessmove::Move, piece::PieceType, types::Square},
        util::MAX_PLY,
    };

    #[test]
    fn lines_are_prepended_and_truncated() {
        let e4 = Move::new_normal(Square::E2, Square::E4, PieceType::Pawn);
        let e5 = Move::new_normal(Square::E7, Square::E5, PieceType::Pawn);
        let mut child = PVariation::default();
        child.load_from(e5, &PVariation::default());
        let mut root = PVariation::default();
        root.load_from(e4, &child);
        assert_eq!(root.moves(), &[e4, e5]);

        let mut long = PVariation::default();
        for _ in 0..MAX_PLY {
            let prev = long.clone();
            long.load_from(e5, &prev);
        }
        assert_eq!(long.moves().len(), MAX_PLY);
        let mut over = PVariation::default();
        over.load_from(e4, &long);
        assert_eq!(over.moves().len(), MAX_PLY);
        assert_eq!(over.moves()[0], e4);
    }
}
