//! The shared transposition table.
//!
//! Every search thread reads and writes the table without locks. A slot is two
//! relaxed `AtomicU64`s: the packed entry, and the position key XORed with that
//! entry. A write racing with another write or a read can leave a slot whose
//! halves come from different stores; the XOR check then fails and the probe
//! reports a miss. The race is benign: entries are plain integers, every
//! decoded bit pattern is a valid entry, and all values are only used
//! heuristically by the search.

use std::{
    mem::size_of,
    sync::atomic::{AtomicU8, AtomicU64, Ordering},
};

use crate::{
    chess::chessmove::Move,
    evaluation::MINIMUM_MATE_SCORE,
    util::{MEGABYTE, VALUE_NONE},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Bound {
    None = 0,
    Upper = 1,
    Lower = 2,
    Exact = 3,
}

impl Bound {
    pub const fn is_lower(self) -> bool {
        self as u8 & 0b10 != 0
    }

    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::None,
            1 => Self::Upper,
            2 => Self::Lower,
            _ => Self::Exact,
        }
    }
}

const MAX_AGE: u8 = 1 << 5; // must be power of 2
const AGE_MASK: u8 = MAX_AGE - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PackedInfo {
    data: u8,
}

impl PackedInfo {
    const fn new(age: u8, flag: Bound, pv: bool) -> Self {
        Self { data: (age << 3) | ((pv as u8) << 2) | flag as u8 }
    }

    const fn age(self) -> u8 {
        self.data >> 3
    }

    const fn flag(self) -> Bound {
        Bound::from_bits(self.data)
    }

    const fn pv(self) -> bool {
        self.data & 0b100 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TTEntry {
    m: Option<Move>,
    score: i16,
    evaluation: i16,
    depth: u8,
    info: PackedInfo,
}

impl TTEntry {
    #[allow(clippy::cast_sign_loss)]
    fn pack(self) -> u64 {
        u64::from(self.m.map_or(0, Move::inner))
            | u64::from(self.score as u16) << 16
            | u64::from(self.evaluation as u16) << 32
            | u64::from(self.depth) << 48
            | u64::from(self.info.data) << 56
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn unpack(data: u64) -> Self {
        Self {
            m: Move::from_raw(data as u16),
            score: (data >> 16) as u16 as i16,
            evaluation: (data >> 32) as u16 as i16,
            depth: (data >> 48) as u8,
            info: PackedInfo { data: (data >> 56) as u8 },
        }
    }
}

#[derive(Debug, Default)]
struct TTSlot {
    key: AtomicU64,
    data: AtomicU64,
}

impl TTSlot {
    /// The entry in this slot, if it was written for `key`.
    fn load(&self, key: u64) -> Option<TTEntry> {
        let data = self.data.load(Ordering::Relaxed);
        let check = self.key.load(Ordering::Relaxed);
        // an all-zero slot has never been written.
        (data != 0 && check ^ data == key).then(|| TTEntry::unpack(data))
    }

    fn load_any(&self) -> Option<TTEntry> {
        let data = self.data.load(Ordering::Relaxed);
        (data != 0).then(|| TTEntry::unpack(data))
    }

    fn store(&self, key: u64, entry: TTEntry) {
        let data = entry.pack();
        self.key.store(key ^ data, Ordering::Relaxed);
        self.data.store(data, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.key.store(0, Ordering::Relaxed);
        self.data.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct TT {
    table: Vec<TTSlot>,
    age: AtomicU8,
}

#[derive(Debug, Clone, Copy)]
pub struct TTView<'a> {
    table: &'a [TTSlot],
    age: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTHit {
    pub mov: Option<Move>,
    pub depth: i32,
    pub bound: Bound,
    pub value: i32,
    pub eval: i32,
    pub was_pv: bool,
}

impl Default for TT {
    fn default() -> Self {
        Self::new()
    }
}

impl TT {
    pub const DEFAULT_SIZE_MB: usize = 16;

    pub const fn new() -> Self {
        Self { table: Vec::new(), age: AtomicU8::new(0) }
    }

    /// Reallocates the table to fill `bytes`, discarding all entries.
    pub fn resize(&mut self, bytes: usize) {
        let new_len = (bytes / size_of::<TTSlot>()).max(1);
        // dealloc the old table first, so the two never coexist.
        self.table = Vec::new();
        let mut table = Vec::with_capacity(new_len);
        table.resize_with(new_len, TTSlot::default);
        self.table = table;
        self.age.store(0, Ordering::Relaxed);
    }

    /// Zeroes every slot, splitting the work over `threads` threads.
    pub fn clear(&self, threads: usize) {
        let chunk_size = self.table.len() / threads.max(1) + 1;
        std::thread::scope(|s| {
            for chunk in self.table.chunks(chunk_size) {
                s.spawn(move || {
                    for slot in chunk {
                        slot.clear();
                    }
                });
            }
        });
        self.age.store(0, Ordering::Relaxed);
    }

    pub fn view(&self) -> TTView<'_> {
        TTView { table: &self.table, age: self.age.load(Ordering::Relaxed) }
    }

    /// Marks every existing entry as belonging to an older search.
    pub fn increase_age(&self) {
        let new_age = (self.age.load(Ordering::Relaxed) + 1) & AGE_MASK;
        self.age.store(new_age, Ordering::Relaxed);
    }

    pub fn size(&self) -> usize {
        self.table.len() * size_of::<TTSlot>()
    }

    pub fn size_mb(&self) -> usize {
        self.size() / MEGABYTE
    }
}

impl TTView<'_> {
    fn wrap_key(&self, key: u64) -> usize {
        #![allow(clippy::cast_possible_truncation)]
        let key = u128::from(key);
        let len = self.table.len() as u128;
        // fixed-point multiplication trick!
        ((key * len) >> 64) as usize
    }

    #[allow(clippy::too_many_arguments, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn store(
        &self,
        key: u64,
        ply: usize,
        mut best_move: Option<Move>,
        score: i32,
        eval: i32,
        flag: Bound,
        depth: i32,
        pv: bool,
    ) {
        let Some(slot) = self.table.get(self.wrap_key(key)) else {
            return;
        };
        let existing = slot.load_any();
        let same_key = slot.load(key).is_some();

        if let Some(tte) = existing {
            if best_move.is_none() && same_key {
                // if we don't have a best move, and the entry is for the same position,
                // then we should retain the best move from the previous entry.
                best_move = tte.m;
            }

            // replace the entry:
            // 1. if the entry is for a different position
            // 2. if the new result is exact
            // 3. if the new result is not much shallower than the old one
            // 4. if the entry was written during an earlier search
            let replace = !same_key
                || flag == Bound::Exact
                || depth + 4 > i32::from(tte.depth)
                || tte.info.age() != self.age;
            if !replace {
                return;
            }
        }

        debug_assert!(i32::from(i16::MIN) <= score && score <= i32::from(i16::MAX));
        debug_assert!(i32::from(i16::MIN) <= eval && eval <= i32::from(i16::MAX));
        slot.store(
            key,
            TTEntry {
                m: best_move,
                score: normalise_mate_score(score, ply) as i16,
                evaluation: eval as i16,
                depth: depth.clamp(0, i32::from(u8::MAX)) as u8,
                info: PackedInfo::new(self.age, flag, pv),
            },
        );
    }

    pub fn probe(&self, key: u64, ply: usize) -> Option<TTHit> {
        let entry = self.table.get(self.wrap_key(key))?.load(key)?;

        Some(TTHit {
            mov: entry.m,
            depth: entry.depth.into(),
            bound: entry.info.flag(),
            value: reconstruct_mate_score(entry.score.into(), ply),
            eval: entry.evaluation.into(),
            was_pv: entry.info.pv(),
        })
    }

    pub fn probe_move(&self, key: u64) -> Option<Move> {
        self.probe(key, 0).and_then(|hit| hit.mov)
    }

    pub fn prefetch(&self, key: u64) {
        #[cfg(target_arch = "x86_64")]
        if let Some(slot) = self.table.get(self.wrap_key(key)) {
            use std::arch::x86_64::{_MM_HINT_T0, _mm_prefetch};

            // SAFETY: the pointer comes from a live reference, and
            // _mm_prefetch never faults anyway.
            unsafe {
                _mm_prefetch(std::ptr::from_ref(slot).cast::<i8>(), _MM_HINT_T0);
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        let _ = key;
    }

    /// Permille of sampled slots holding entries from the current search.
    pub fn hashfull(&self) -> usize {
        let sample = self.table.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let hit = self.table[..sample]
            .iter()
            .filter_map(TTSlot::load_any)
            .filter(|entry| entry.info.age() == self.age)
            .count();
        hit * 1000 / sample
    }
}

/// Mate scores are stored relative to the node, not the root.
const fn normalise_mate_score(mut score: i32, ply: usize) -> i32 {
    #![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    if score == VALUE_NONE {
        return score;
    }
    if score >= MINIMUM_MATE_SCORE {
        score += ply as i32;
    } else if score <= -MINIMUM_MATE_SCORE {
        score -= ply as i32;
    }
    score
}

const fn reconstruct_mate_score(mut score: i32, ply: usize) -> i32 {
    #![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    if score == VALUE_NONE {
        return score;
    }
    if score >= MINIMUM_MATE_SCORE {
        score -= ply as i32;
    } else if score <= -MINIMUM_MATE_SCORE {
        score += ply as i32;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chess::{piece::PieceType, types::Square},
        evaluation::{mate_in, mated_in},
        util::VALUE_NONE,
    };

    fn small_table() -> TT {
        let mut tt = TT::new();
        tt.resize(MEGABYTE);
        tt
    }

    fn some_move() -> Move {
        Move::new_normal(Square::G1, Square::F3, PieceType::Knight)
    }

    #[test]
    fn entry_packing_round_trips() {
        let entry = TTEntry {
            m: Some(some_move()),
            score: -1234,
            evaluation: i16::MIN,
            depth: 0x13,
            info: PackedInfo::new(31, Bound::Exact, true),
        };
        assert_eq!(TTEntry::unpack(entry.pack()), entry);
        assert_eq!(entry.info.age(), 31);
        assert_eq!(entry.info.flag(), Bound::Exact);
        assert!(entry.info.pv());
    }

    #[test]
    fn store_then_probe() {
        let tt = small_table();
        let view = tt.view();
        let key = 0xDEAD_BEEF_CAFE_F00D;
        assert!(view.probe(key, 0).is_none());
        view.store(key, 3, Some(some_move()), 42, -17, Bound::Lower, 7, true);
        let hit = view.probe(key, 3).unwrap();
        assert_eq!(
            hit,
            TTHit { mov: Some(some_move()), depth: 7, bound: Bound::Lower, value: 42, eval: -17, was_pv: true }
        );
        // a different key landing in the same slot is a miss.
        assert!(view.probe(key ^ 1, 3).is_none());
    }

    #[test]
    fn mate_scores_are_relative_to_the_node() {
        let tt = small_table();
        let view = tt.view();
        let key = 0x0123_4567_89AB_CDEF;
        // found a mate in five plies from the root, two plies into the tree.
        view.store(key, 2, None, mate_in(5), VALUE_NONE, Bound::Exact, 4, false);
        // probed four plies into the tree, the same node is three plies closer to mate than the root.
        assert_eq!(view.probe(key, 4).unwrap().value, mate_in(7));
        view.store(key, 2, None, mated_in(6), VALUE_NONE, Bound::Exact, 4, false);
        assert_eq!(view.probe(key, 2).unwrap().value, mated_in(6));
    }

    #[test]
    fn shallow_results_do_not_replace_deep_ones() {
        let tt = small_table();
        let view = tt.view();
        let key = 0x5555_AAAA_5555_AAAA;
        view.store(key, 0, Some(some_move()), 100, 0, Bound::Lower, 12, false);
        view.store(key, 0, None, 50, 0, Bound::Upper, 3, false);
        let hit = view.probe(key, 0).unwrap();
        assert_eq!(hit.depth, 12);
        assert_eq!(hit.value, 100);
        // an exact result always replaces, and keeps the old best move when it has none.
        view.store(key, 0, None, 60, 0, Bound::Exact, 2, false);
        let hit = view.probe(key, 0).unwrap();
        assert_eq!(hit.bound, Bound::Exact);
        assert_eq!(hit.mov, Some(some_move()));
    }

    #[test]
    fn older_entries_are_replaced_and_hashfull_tracks_age() {
        let tt = small_table();
        let key = 0x1111_2222_3333_4444;
        tt.view().store(key, 0, None, 10, 0, Bound::Lower, 30, false);
        tt.increase_age();
        let view = tt.view();
        view.store(key, 0, None, 20, 0, Bound::Upper, 1, false);
        assert_eq!(view.probe(key, 0).unwrap().value, 20);

        for i in 0..2000u64 {
            view.store(i.wrapping_mul(0x9E37_79B9_7F4A_7C15), 0, None, 0, 0, Bound::Exact, 1, false);
        }
        assert!(view.hashfull() > 0);
        tt.clear(2);
        assert_eq!(tt.view().hashfull(), 0);
        assert!(tt.view().probe(key, 0).is_none());
    }
}
