use std::ops::{Deref, DerefMut};

use crate::{
    chess::{
        chessmove::Move,
        piece::{Colour, Piece},
        types::{ContHistIndex, Square},
    },
    search::parameters::Config,
};

const AGEING_DIVISOR: i16 = 2;

pub const MAX_HISTORY: i32 = i16::MAX as i32 / 2;
pub const CORRECTION_HISTORY_SIZE: usize = 16_384;
pub const CORRECTION_HISTORY_GRAIN: i32 = 256;
pub const CORRECTION_HISTORY_WEIGHT_SCALE: i32 = 256;
pub const CORRECTION_HISTORY_MAX: i32 = CORRECTION_HISTORY_GRAIN * 32;

pub fn history_bonus(conf: &Config, depth: i32) -> i32 {
    i32::min(conf.history_bonus_mul * depth + conf.history_bonus_offset, conf.history_bonus_max)
}

pub fn history_malus(conf: &Config, depth: i32) -> i32 {
    i32::min(conf.history_malus_mul * depth + conf.history_malus_offset, conf.history_malus_max)
}

/// Moves a counter towards `delta`, slowing down as it approaches the limit.
pub fn update_history(val: &mut i16, delta: i32) {
    #![allow(clippy::cast_possible_truncation)]
    let delta = delta.clamp(-MAX_HISTORY, MAX_HISTORY);
    let v = i32::from(*val);
    *val = (v + delta - v * delta.abs() / MAX_HISTORY) as i16;
}

/// Allocates a zeroed `T` directly on the heap.
///
/// # Safety
///
/// The all-zeroes bit pattern must be a valid `T`.
unsafe fn zeroed_box<T>() -> Box<T> {
    let layout = std::alloc::Layout::new::<T>();
    // SAFETY: every table here is a non-zero-sized array of integers or of `Option<Move>`.
    unsafe {
        let ptr = std::alloc::alloc_zeroed(layout);
        if ptr.is_null() {
            std::alloc::handle_alloc_error(layout);
        }
        Box::from_raw(ptr.cast())
    }
}

/// A counter for every (piece, destination) pair.
#[derive(Clone)]
#[repr(transparent)]
pub struct HistoryTable {
    table: [[i16; 64]; 12],
}

impl HistoryTable {
    pub const fn new() -> Self {
        Self { table: [[0; 64]; 12] }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(|x| *x = 0);
    }

    pub fn age_entries(&mut self) {
        self.table.iter_mut().flatten().for_each(|x| *x /= AGEING_DIVISOR);
    }

    pub fn get(&self, piece: Piece, sq: Square) -> i16 {
        self.table[piece][sq]
    }

    pub fn get_mut(&mut self, piece: Piece, sq: Square) -> &mut i16 {
        &mut self.table[piece][sq]
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Main history, split by whether the origin and destination squares are attacked.
#[repr(transparent)]
pub struct ThreatsHistoryTable {
    table: [[HistoryTable; 2]; 2],
}

impl ThreatsHistoryTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: the table is all i16s.
        unsafe { zeroed_box() }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(HistoryTable::clear);
    }

    pub fn age_entries(&mut self) {
        self.table.iter_mut().flatten().for_each(HistoryTable::age_entries);
    }

    pub fn get(&self, piece: Piece, to: Square, from_threat: bool, to_threat: bool) -> i16 {
        self.table[usize::from(from_threat)][usize::from(to_threat)].get(piece, to)
    }

    pub fn get_mut(&mut self, piece: Piece, to: Square, from_threat: bool, to_threat: bool) -> &mut i16 {
        self.table[usize::from(from_threat)][usize::from(to_threat)].get_mut(piece, to)
    }
}

/// Tactical history, indexed by the type of the captured piece.
#[repr(transparent)]
pub struct CaptureHistoryTable {
    table: [HistoryTable; 6],
}

impl Deref for CaptureHistoryTable {
    type Target = [HistoryTable; 6];

    fn deref(&self) -> &Self::Target {
        &self.table
    }
}

impl DerefMut for CaptureHistoryTable {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.table
    }
}

impl CaptureHistoryTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: the table is all i16s.
        unsafe { zeroed_box() }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(HistoryTable::clear);
    }

    pub fn age_entries(&mut self) {
        self.table.iter_mut().for_each(HistoryTable::age_entries);
    }
}

/// A history table for every (piece, destination) of a previous move.
#[repr(transparent)]
pub struct ContinuationHistoryTable {
    table: [[HistoryTable; 64]; 12],
}

impl ContinuationHistoryTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: the table is all i16s.
        unsafe { zeroed_box() }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(HistoryTable::clear);
    }

    pub fn age_entries(&mut self) {
        self.table.iter_mut().flatten().for_each(HistoryTable::age_entries);
    }

    pub fn get_index(&self, index: ContHistIndex) -> &HistoryTable {
        &self.table[index.piece][index.square]
    }

    pub fn get_index_mut(&mut self, index: ContHistIndex) -> &mut HistoryTable {
        &mut self.table[index.piece][index.square]
    }
}

/// The move that last refuted each (piece, destination).
#[repr(transparent)]
pub struct CounterMoveTable {
    table: [[Option<Move>; 64]; 12],
}

impl CounterMoveTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: `Option<Move>` is niche-optimised, so zero is `None`.
        unsafe { zeroed_box() }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(|m| *m = None);
    }

    pub fn add(&mut self, piece: Piece, sq: Square, m: Move) {
        self.table[piece][sq] = Some(m);
    }

    pub fn get(&self, piece: Piece, sq: Square) -> Option<Move> {
        self.table[piece][sq]
    }
}

/// Running averages of the search-minus-static-eval error, hashed by a key.
#[repr(transparent)]
pub struct CorrectionHistoryTable {
    table: [[i32; CORRECTION_HISTORY_SIZE]; 2],
}

impl CorrectionHistoryTable {
    pub fn boxed() -> Box<Self> {
        // SAFETY: the table is all i32s.
        unsafe { zeroed_box() }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(|x| *x = 0);
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn get(&self, side: Colour, key: u64) -> i64 {
        i64::from(self.table[side][key as usize % CORRECTION_HISTORY_SIZE])
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn get_mut(&mut self, side: Colour, key: u64) -> &mut i32 {
        &mut self.table[side][key as usize % CORRECTION_HISTORY_SIZE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::piece::PieceType;

    #[test]
    fn gravity_keeps_counters_bounded() {
        let mut val = 0;
        for _ in 0..1000 {
            update_history(&mut val, 2000);
        }
        assert!(i32::from(val) <= MAX_HISTORY);
        assert!(val > 15_000);
        for _ in 0..1000 {
            update_history(&mut val, -2000);
        }
        assert!(i32::from(val) >= -MAX_HISTORY);
        assert!(val < -15_000);
    }

    #[test]
    fn bonuses_saturate() {
        let conf = Config::default();
        assert!(history_bonus(&conf, 1) < history_bonus(&conf, 3));
        assert_eq!(history_bonus(&conf, 100), conf.history_bonus_max);
        assert_eq!(history_malus(&conf, 100), conf.history_malus_max);
    }

    #[test]
    fn boxed_tables_start_empty() {
        let mut counters = CounterMoveTable::boxed();
        assert_eq!(counters.get(Piece::WN, Square::F3), None);
        let m = Move::new_normal(Square::E7, Square::E5, PieceType::Pawn);
        counters.add(Piece::WN, Square::F3, m);
        assert_eq!(counters.get(Piece::WN, Square::F3), Some(m));
        counters.clear();
        assert_eq!(counters.get(Piece::WN, Square::F3), None);

        let mut main = ThreatsHistoryTable::boxed();
        assert_eq!(main.get(Piece::BQ, Square::A1, true, false), 0);
        *main.get_mut(Piece::BQ, Square::A1, true, false) = 100;
        assert_eq!(main.get(Piece::BQ, Square::A1, false, false), 0);
        main.age_entries();
        assert_eq!(main.get(Piece::BQ, Square::A1, true, false), 50);

        let corr = CorrectionHistoryTable::boxed();
        assert_eq!(corr.get(Colour::Black, u64::MAX), 0);
    }
}
