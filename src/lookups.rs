//! Zobrist hashing keys, generated at compile time from a fixed seed.

use crate::{
    chess::{piece::Piece, types::Square},
    rng::XorShiftState,
};

struct ZobristKeys {
    pieces: [[u64; 64]; 12],
    ep: [u64; 64],
    castling: [u64; 16],
    side: u64,
}

const KEYS: ZobristKeys = {
    let mut rng = XorShiftState::new();
    let mut keys = ZobristKeys { pieces: [[0; 64]; 12], ep: [0; 64], castling: [0; 16], side: 0 };
    cfor!(let mut i = 0; i < 12 * 64; i += 1; {
        let key;
        (key, rng) = rng.next_self();
        keys.pieces[i / 64][i % 64] = key;
    });
    cfor!(let mut sq = 0; sq < 64; sq += 1; {
        let key;
        (key, rng) = rng.next_self();
        keys.ep[sq] = key;
    });
    // no rights at all hashes to zero, so a fresh `Keys` matches a bare board.
    cfor!(let mut i = 1; i < 16; i += 1; {
        let key;
        (key, rng) = rng.next_self();
        keys.castling[i] = key;
    });
    (keys.side, _) = rng.next_self();
    keys
};

pub static PIECE_KEYS: [[u64; 64]; 12] = KEYS.pieces;
pub static EP_KEYS: [u64; 64] = KEYS.ep;
pub static CASTLE_KEYS: [u64; 16] = KEYS.castling;
pub const SIDE_KEY: u64 = KEYS.side;

pub fn piece_key(piece: Piece, sq: Square) -> u64 {
    PIECE_KEYS[piece][sq]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_distinct() {
        let mut all = PIECE_KEYS.iter().flatten().copied().collect::<Vec<_>>();
        all.extend_from_slice(&EP_KEYS);
        all.extend_from_slice(&CASTLE_KEYS[1..]);
        all.push(SIDE_KEY);
        let before = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(before, all.len());
        assert!(all.iter().all(|&k| k != 0));
    }
}
