//! Sliding-piece attacks via fixed-shift magic bitboards.

use std::sync::LazyLock;

use crate::chess::{squareset::SquareSet, types::Square};

/// Index bits for a bishop lookup; every square shares one shift.
pub const BISHOP_SHIFT: u32 = 64 - 9;
/// Index bits for a rook lookup; every square shares one shift.
pub const ROOK_SHIFT: u32 = 64 - 12;

const BISHOP_DIRS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_DIRS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Walks each ray from `sq` until it leaves the board or hits a blocker (inclusive).
/// With `edges` false the outermost square of every ray is dropped, which gives
/// the relevant-occupancy mask.
const fn ray_attacks(sq: Square, dirs: &[(i8, i8); 4], blockers: u64, edges: bool) -> u64 {
    #![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    let rank = sq.rank() as i8;
    let file = sq.file() as i8;
    let mut attacks = 0;
    cfor!(let mut d = 0; d < 4; d += 1; {
        let (dr, df) = dirs[d];
        let (mut r, mut f) = (rank + dr, file + df);
        while 0 <= r && r < 8 && 0 <= f && f < 8 {
            let next_on_board = 0 <= r + dr && r + dr < 8 && 0 <= f + df && f + df < 8;
            if !edges && !next_on_board {
                break;
            }
            let bit = 1u64 << (r * 8 + f) as u64;
            attacks |= bit;
            if blockers & bit != 0 {
                break;
            }
            r += dr;
            f += df;
        }
    });
    attacks
}

pub const fn bishop_attacks_on_the_fly(sq: Square, blockers: SquareSet) -> SquareSet {
    SquareSet::from_inner(ray_attacks(sq, &BISHOP_DIRS, blockers.inner(), true))
}

pub const fn rook_attacks_on_the_fly(sq: Square, blockers: SquareSet) -> SquareSet {
    SquareSet::from_inner(ray_attacks(sq, &ROOK_DIRS, blockers.inner(), true))
}

#[derive(Clone, Copy)]
struct MagicEntry {
    mask: u64,
    magic: u64,
}

const fn build_entries(dirs: &[(i8, i8); 4], magics: &[u64; 64]) -> [MagicEntry; 64] {
    let mut entries = [MagicEntry { mask: 0, magic: 0 }; 64];
    cfor!(let mut i = 0; i < 64; i += 1; {
        // SAFETY: i < 64.
        let sq = unsafe { Square::new_unchecked(i as u8) };
        entries[i] = MagicEntry { mask: ray_attacks(sq, dirs, 0, false), magic: magics[i] };
    });
    entries
}

static BISHOP_ENTRIES: [MagicEntry; 64] = build_entries(&BISHOP_DIRS, &BISHOP_MAGICS);
static ROOK_ENTRIES: [MagicEntry; 64] = build_entries(&ROOK_DIRS, &ROOK_MAGICS);

/// Flat per-square attack tables, filled once on first use.
struct AttackTables {
    bishop: Box<[SquareSet]>,
    rook: Box<[SquareSet]>,
}

static TABLES: LazyLock<AttackTables> = LazyLock::new(|| AttackTables {
    bishop: fill_table(&BISHOP_ENTRIES, BISHOP_SHIFT, bishop_attacks_on_the_fly),
    rook: fill_table(&ROOK_ENTRIES, ROOK_SHIFT, rook_attacks_on_the_fly),
});

fn fill_table(
    entries: &[MagicEntry; 64],
    shift: u32,
    slow_attacks: fn(Square, SquareSet) -> SquareSet,
) -> Box<[SquareSet]> {
    let stride = 1 << (64 - shift);
    let mut table = vec![SquareSet::EMPTY; 64 * stride].into_boxed_slice();
    for sq in Square::all() {
        let entry = entries[sq.index()];
        // carry-rippler enumeration of every subset of the mask.
        let mut subset = 0u64;
        loop {
            #[allow(clippy::cast_possible_truncation)]
            let idx = (subset.wrapping_mul(entry.magic) >> shift) as usize;
            let attacks = slow_attacks(sq, SquareSet::from_inner(subset));
            let slot = &mut table[sq.index() * stride + idx];
            debug_assert!(
                *slot == SquareSet::EMPTY || *slot == attacks,
                "destructive magic collision on {sq}"
            );
            *slot = attacks;
            subset = subset.wrapping_sub(entry.mask) & entry.mask;
            if subset == 0 {
                break;
            }
        }
    }
    table
}

/// Forces the tables to be built, so the first search doesn't pay for it.
pub fn init() {
    LazyLock::force(&TABLES);
}

#[allow(clippy::cast_possible_truncation)]
pub fn bishop_attacks(sq: Square, blockers: SquareSet) -> SquareSet {
    let entry = BISHOP_ENTRIES[sq.index()];
    let idx = ((blockers.inner() & entry.mask).wrapping_mul(entry.magic) >> BISHOP_SHIFT) as usize;
    // SAFETY: idx < 512 by the shift, and the table holds 512 entries per square.
    unsafe { *TABLES.bishop.get_unchecked(sq.index() << 9 | idx) }
}

#[allow(clippy::cast_possible_truncation)]
pub fn rook_attacks(sq: Square, blockers: SquareSet) -> SquareSet {
    let entry = ROOK_ENTRIES[sq.index()];
    let idx = ((blockers.inner() & entry.mask).wrapping_mul(entry.magic) >> ROOK_SHIFT) as usize;
    // SAFETY: idx < 4096 by the shift, and the table holds 4096 entries per square.
    unsafe { *TABLES.rook.get_unchecked(sq.index() << 12 | idx) }
}

pub fn queen_attacks(sq: Square, blockers: SquareSet) -> SquareSet {
    bishop_attacks(sq, blockers) | rook_attacks(sq, blockers)
}

#[rustfmt::skip]
const BISHOP_MAGICS: [u64; 64] = [
    0x0080_8104_1082_0200, 0x2010_5204_2240_1000, 0x88A0_1411_A008_1800, 0x1001_0500_0261_0001,
    0x9000_9082_8000_0000, 0x2008_0442_A000_0001, 0x0221_A800_4508_0800, 0x0000_6020_0A40_4000,
    0x0020_1008_9440_8080, 0x0800_0840_2140_4602, 0x0040_8041_0029_8014, 0x5080_2010_6040_0011,
    0x4900_0620_A000_0000, 0x8000_0012_0030_0000, 0x4000_0082_4110_0060, 0x0000_0409_2016_0200,
    0x0042_0020_0024_0090, 0x0004_8410_0420_A804, 0x0008_0001_0200_0910, 0x0488_0010_A810_0202,
    0x0004_0188_0404_0402, 0x0202_1001_0828_1120, 0xC201_1620_1010_1042, 0x0240_0880_2201_0B80,
    0x0083_0160_0C24_0814, 0x0000_2810_0E14_2050, 0x0020_8800_0083_8110, 0x0041_0800_0402_04A0,
    0x2012_0022_0600_8040, 0x0044_0288_1900_A008, 0x14A8_0004_804C_1080, 0xA004_8144_0480_0F02,
    0x00C0_1802_3010_1600, 0x000C_9052_0002_0080, 0x0604_0008_0010_404A, 0x0004_0401_080C_0100,
    0x0020_1210_1014_0040, 0x0000_5000_8000_0861, 0x8202_0902_4100_2020, 0x2008_0220_0800_2108,
    0x0200_4024_0104_2000, 0x0002_E032_1004_2000, 0x0110_0400_8042_2400, 0x9084_04C0_5840_40C0,
    0x1000_2042_0224_0408, 0x8002_0022_0020_0200, 0x2002_0081_0108_1414, 0x0002_0800_2109_8404,
    0x0060_1100_8068_0000, 0x1080_0481_0842_0000, 0x0400_1840_1410_0000, 0x0080_81A0_0401_2240,
    0x0011_0080_4481_82A0, 0xA400_2000_604A_4000, 0x0004_0028_1104_9020, 0x0002_4A04_10A1_0220,
    0x0808_0900_8901_3000, 0x0C80_8004_0080_5800, 0x0001_0201_0006_1618, 0x1202_8200_4050_1008,
    0x4130_1005_0C10_0405, 0x0004_2482_0404_2020, 0x0044_0044_0828_0110, 0x6010_2200_8060_0502,
];

#[rustfmt::skip]
const ROOK_MAGICS: [u64; 64] = [
    0x8A80_1040_0080_0020, 0x0084_0201_0080_4000, 0x0080_0A10_0004_8020, 0xC410_0020_B100_0200,
    0x0400_4400_0208_0420, 0x0A80_0400_2A80_1200, 0x0840_140C_8040_0100, 0x0100_0082_0C41_2300,
    0x0010_8002_1240_0820, 0x0008_0501_9000_2800, 0x0001_0808_0010_2000, 0x0041_0800_8020_1001,
    0x0208_2004_0800_890A, 0x0010_8002_0000_8440, 0x0320_0800_418A_0022, 0x0250_0606_0020_1100,
    0x4440_0024_0086_0020, 0x1004_4028_0008_4000, 0x0004_1404_C014_0004, 0x5000_4009_0800_1400,
    0x0000_0208_4100_0830, 0x0083_0A01_0100_0500, 0x0140_40A0_0280_4040, 0x4400_1010_0885_4220,
    0xE008_0252_2002_2600, 0x0440_2440_0860_3000, 0x0008_0240_0400_9000, 0x0801_0090_0210_0002,
    0x0400_2002_0001_0811, 0x3204_0200_4401_2400, 0x0002_1000_8820_0100, 0x0208_00A0_0409_1041,
    0x0002_10C2_2420_0241, 0x0020_0A0C_0204_0080, 0x004D_8028_104C_0800, 0x813C_0A00_0290_0012,
    0x0008_1042_0020_8020, 0x2404_00A0_00A0_4080, 0x0802_1991_0010_0042, 0x062C_4C00_2010_0280,
    0x0020_1042_8080_0820, 0x20C8_0100_80A8_0200, 0x1114_0840_8046_4008, 0x2000_0254_3000_1805,
    0x1404_C4A1_0011_0008, 0x0000_0084_0001_2008, 0x3045_1400_8002_2010, 0x8040_0284_1008_0100,
    0x0220_2003_1020_4820, 0x0200_0822_4404_8202, 0x0009_0984_C020_8022, 0x8000_1101_2004_0900,
    0x9000_4024_0008_0084, 0x2402_1001_0003_8020, 0x0098_4006_0000_8028, 0x0001_1100_0040_200C,
    0x0102_4022_0810_8102, 0x0440_0414_8220_4101, 0x4004_4020_0004_0811, 0x804A_0008_1040_2002,
    0x0008_0002_0902_0401, 0x0440_3411_0800_9002, 0x0000_0088_2508_4204, 0x2084_0021_1242_8402,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::XorShiftState;

    #[test]
    fn magic_lookup_matches_slow_attacks() {
        let mut rng = XorShiftState::new();
        for sq in Square::all() {
            for _ in 0..200 {
                let blockers = SquareSet::from_inner(rng.next() & rng.next());
                assert_eq!(bishop_attacks(sq, blockers), bishop_attacks_on_the_fly(sq, blockers));
                assert_eq!(rook_attacks(sq, blockers), rook_attacks_on_the_fly(sq, blockers));
            }
        }
    }

    #[test]
    fn open_board_attack_counts() {
        assert_eq!(rook_attacks(Square::A1, SquareSet::EMPTY).count(), 14);
        assert_eq!(bishop_attacks(Square::D4, SquareSet::EMPTY).count(), 13);
        assert_eq!(queen_attacks(Square::D4, SquareSet::EMPTY).count(), 27);
        let blocked = rook_attacks(Square::A1, Square::A3.as_set() | Square::C1.as_set());
        assert_eq!(blocked, Square::A2.as_set() | Square::A3.as_set() | Square::B1.as_set() | Square::C1.as_set());
    }

    #[test]
    fn relevant_masks_exclude_edges() {
        assert_eq!(ROOK_ENTRIES[Square::A1.index()].mask.count_ones(), 12);
        assert_eq!(BISHOP_ENTRIES[Square::A1.index()].mask.count_ones(), 6);
        assert_eq!(BISHOP_ENTRIES[Square::D4.index()].mask.count_ones(), 9);
    }
}
