//! Cuckoo tables of reversible moves, for detecting upcoming repetitions.
//!
//! Each slot holds the Zobrist difference made by one reversible move of a
//! non-pawn piece (`piece@a ^ piece@b ^ side`) and the move itself.

use std::sync::LazyLock;

use crate::{
    chess::{
        board::movegen::attacks_by_type,
        chessmove::Move,
        piece::{Piece, PieceType},
        squareset::SquareSet,
        types::Square,
    },
    lookups::{PIECE_KEYS, SIDE_KEY},
};

pub const TABLE_SIZE: usize = 8192;
pub const REVERSIBLE_MOVES: usize = 3668;

pub struct CuckooTables {
    pub keys: Box<[u64]>,
    pub moves: Box<[Option<Move>]>,
}

pub const fn h1(key: u64) -> usize {
    (key & 0x1FFF) as usize
}

pub const fn h2(key: u64) -> usize {
    ((key >> 16) & 0x1FFF) as usize
}

pub static TABLES: LazyLock<CuckooTables> = LazyLock::new(build);

fn build() -> CuckooTables {
    let mut keys = vec![0; TABLE_SIZE].into_boxed_slice();
    let mut moves = vec![None; TABLE_SIZE].into_boxed_slice();
    let mut count = 0;

    for piece in Piece::all().filter(|p| p.piece_type() != PieceType::Pawn) {
        for sq0 in Square::all() {
            for sq1 in Square::all().filter(|&s| s > sq0) {
                if !attacks_by_type(piece.piece_type(), sq0, SquareSet::EMPTY).contains_square(sq1) {
                    continue;
                }
                let mut mv = Some(Move::new_normal(sq0, sq1, piece.piece_type()));
                let mut key = PIECE_KEYS[piece][sq0] ^ PIECE_KEYS[piece][sq1] ^ SIDE_KEY;
                let mut slot = h1(key);
                // displace residents until an empty slot turns up.
                for _ in 0..TABLE_SIZE {
                    std::mem::swap(&mut keys[slot], &mut key);
                    std::mem::swap(&mut moves[slot], &mut mv);
                    if mv.is_none() {
                        break;
                    }
                    slot = if slot == h1(key) { h2(key) } else { h1(key) };
                }
                debug_assert!(mv.is_none(), "cuckoo insertion cycled");
                count += 1;
            }
        }
    }
    debug_assert_eq!(count, REVERSIBLE_MOVES);

    CuckooTables { keys, moves }
}

/// The reversible move whose key difference is `diff`, if there is one.
pub fn lookup(diff: u64) -> Option<Move> {
    let tables = &*TABLES;
    let mut slot = h1(diff);
    if tables.keys[slot] != diff {
        slot = h2(diff);
    }
    if tables.keys[slot] == diff { tables.moves[slot] } else { None }
}

pub fn init() {
    LazyLock::force(&TABLES);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reversible_move_is_stored() {
        let stored = TABLES.moves.iter().filter(|m| m.is_some()).count();
        assert_eq!(stored, REVERSIBLE_MOVES);
    }

    #[test]
    fn lookup_finds_knight_shuffle() {
        let diff = PIECE_KEYS[Piece::WN][Square::G1] ^ PIECE_KEYS[Piece::WN][Square::F3] ^ SIDE_KEY;
        let m = lookup(diff).unwrap();
        assert_eq!((m.from(), m.to()), (Square::G1, Square::F3));
        assert_eq!(lookup(diff ^ 1), None);
    }
}
