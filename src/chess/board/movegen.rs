use std::{
    fmt::{self, Display},
    ops::{Deref, DerefMut},
};

use arrayvec::ArrayVec;

use crate::chess::{
    board::Board,
    chessmove::{Move, MoveFlags},
    magic::{bishop_attacks, queen_attacks, rook_attacks},
    piece::{Black, Col, Colour, PieceType, White},
    squareset::SquareSet,
    types::Square,
};

pub mod movepicker;

pub const MAX_POSITION_MOVES: usize = 218;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveListEntry {
    pub mov: Move,
    pub score: i32,
}

/// A fixed-capacity list of moves with ordering scores.
#[derive(Clone, Debug, Default)]
pub struct MoveList {
    inner: ArrayVec<MoveListEntry, MAX_POSITION_MOVES>,
}

impl MoveList {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, from: Square, to: Square, flag: MoveFlags) {
        self.inner.push(MoveListEntry { mov: Move::new(from, to, flag), score: 0 });
    }

    pub fn iter_moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.inner.iter().map(|e| e.mov)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl Deref for MoveList {
    type Target = [MoveListEntry];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for MoveList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Display for MoveList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MoveList ({}) [", self.inner.len())?;
        for (i, e) in self.inner.iter().enumerate() {
            let sep = if i == 0 { "" } else { ", " };
            write!(f, "{sep}{} ${}", e.mov, e.score)?;
        }
        write!(f, "]")
    }
}

/// Unit step from `a` towards `b` as (rank, file), if the two share a line.
#[allow(clippy::cast_possible_wrap)]
const fn line_direction(a: Square, b: Square) -> Option<(i8, i8)> {
    let dr = b.rank() as i8 - a.rank() as i8;
    let df = b.file() as i8 - a.file() as i8;
    if (dr == 0 && df == 0) || (dr != 0 && df != 0 && dr.abs() != df.abs()) {
        return None;
    }
    Some((dr.signum(), df.signum()))
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
const fn offset(sq: Square, dr: i8, df: i8) -> Option<Square> {
    let r = sq.rank() as i8 + dr;
    let f = sq.file() as i8 + df;
    if r < 0 || r > 7 || f < 0 || f > 7 { None } else { Square::new((r * 8 + f) as u8) }
}

#[allow(clippy::cast_possible_truncation)]
const fn build_line_tables(full: bool) -> [[SquareSet; 64]; 64] {
    let mut res = [[SquareSet::EMPTY; 64]; 64];
    cfor!(let mut a = 0; a < 64; a += 1; {
        cfor!(let mut b = 0; b < 64; b += 1; {
            // SAFETY: a and b are below 64.
            let (sa, sb) = unsafe { (Square::new_unchecked(a as u8), Square::new_unchecked(b as u8)) };
            if let Some((dr, df)) = line_direction(sa, sb) {
                let mut set = 0u64;
                if full {
                    set |= 1 << a;
                    let mut cur = offset(sa, dr, df);
                    while let Some(sq) = cur {
                        set |= 1 << sq.index();
                        cur = offset(sq, dr, df);
                    }
                    cur = offset(sa, -dr, -df);
                    while let Some(sq) = cur {
                        set |= 1 << sq.index();
                        cur = offset(sq, -dr, -df);
                    }
                } else {
                    let mut cur = offset(sa, dr, df);
                    while let Some(sq) = cur {
                        if sq.index() == b {
                            break;
                        }
                        set |= 1 << sq.index();
                        cur = offset(sq, dr, df);
                    }
                }
                res[a][b] = SquareSet::from_inner(set);
            }
        });
    });
    res
}

/// Squares strictly between two aligned squares, empty if they are not aligned.
pub static RAY_BETWEEN: [[SquareSet; 64]; 64] = build_line_tables(false);
/// The whole line through two aligned squares, edge to edge.
pub static RAY_FULL: [[SquareSet; 64]; 64] = build_line_tables(true);

#[allow(clippy::cast_possible_truncation)]
const fn leaper_attacks(deltas: &[(i8, i8); 8]) -> [SquareSet; 64] {
    let mut table = [SquareSet::EMPTY; 64];
    cfor!(let mut i = 0; i < 64; i += 1; {
        // SAFETY: i < 64.
        let sq = unsafe { Square::new_unchecked(i as u8) };
        let mut set = 0u64;
        cfor!(let mut d = 0; d < 8; d += 1; {
            if let Some(target) = offset(sq, deltas[d].0, deltas[d].1) {
                set |= 1 << target.index();
            }
        });
        table[i] = SquareSet::from_inner(set);
    });
    table
}

static KNIGHT_ATTACKS: [SquareSet; 64] =
    leaper_attacks(&[(2, 1), (2, -1), (-2, 1), (-2, -1), (1, 2), (1, -2), (-1, 2), (-1, -2)]);
static KING_ATTACKS: [SquareSet; 64] =
    leaper_attacks(&[(1, 1), (1, 0), (1, -1), (0, 1), (0, -1), (-1, 1), (-1, 0), (-1, -1)]);

pub fn knight_attacks(sq: Square) -> SquareSet {
    KNIGHT_ATTACKS[sq]
}

pub fn king_attacks(sq: Square) -> SquareSet {
    KING_ATTACKS[sq]
}

/// Squares attacked by pawns of colour `C` standing on `bb`.
pub fn pawn_attacks<C: Col>(bb: SquareSet) -> SquareSet {
    if C::WHITE {
        bb.north_east_one() | bb.north_west_one()
    } else {
        bb.south_east_one() | bb.south_west_one()
    }
}

pub fn pawn_attacks_by(bb: SquareSet, colour: Colour) -> SquareSet {
    match colour {
        Colour::White => pawn_attacks::<White>(bb),
        Colour::Black => pawn_attacks::<Black>(bb),
    }
}

/// Attacks of a non-pawn piece standing on `sq`.
pub fn attacks_by_type(pt: PieceType, sq: Square, blockers: SquareSet) -> SquareSet {
    match pt {
        PieceType::Pawn => {
            debug_assert!(false, "pawn attacks depend on colour");
            SquareSet::EMPTY
        }
        PieceType::Knight => knight_attacks(sq),
        PieceType::Bishop => bishop_attacks(sq, blockers),
        PieceType::Rook => rook_attacks(sq, blockers),
        PieceType::Queen => queen_attacks(sq, blockers),
        PieceType::King => king_attacks(sq),
    }
}

/// Selects which promotions the capture generator emits.
pub trait MoveGenMode {
    const UNDERPROMOTIONS: bool;
}

/// Captures and queen promotions, for quiescence search.
pub struct SkipQuiets;
impl MoveGenMode for SkipQuiets {
    const UNDERPROMOTIONS: bool = false;
}

/// Captures and every promotion.
pub struct AllMoves;
impl MoveGenMode for AllMoves {
    const UNDERPROMOTIONS: bool = true;
}

const PROMOTIONS: [MoveFlags; 4] =
    [MoveFlags::PromoQueen, MoveFlags::PromoKnight, MoveFlags::PromoRook, MoveFlags::PromoBishop];

fn push_promotions<Mode: MoveGenMode>(move_list: &mut MoveList, from: Square, to: Square) {
    let count = if Mode::UNDERPROMOTIONS { 4 } else { 1 };
    for &flag in &PROMOTIONS[..count] {
        move_list.push(from, to, flag);
    }
}

impl Board {
    /// Where a non-king move may land: anywhere if not in check,
    /// otherwise onto the checker or the squares between it and the king.
    fn evasion_targets(&self, king_sq: Square) -> SquareSet {
        let checkers = self.state.checkers;
        checkers.first().map_or(SquareSet::FULL, |checker| RAY_BETWEEN[king_sq][checker] | checkers)
    }

    fn generate_pawn_captures<C: Col, Mode: MoveGenMode>(&self, move_list: &mut MoveList, targets: SquareSet) {
        let bbs = &self.state.piece_layout;
        let pawns = bbs.of_type(C::COLOUR, PieceType::Pawn);
        let victims = bbs.colours[!C::COLOUR] & targets;
        let promo_rank = SquareSet::RANK_7.relative_to(C::COLOUR);

        for from in pawns {
            for to in pawn_attacks::<C>(from.as_set()) & victims {
                if promo_rank.contains_square(from) {
                    push_promotions::<Mode>(move_list, from, to);
                } else {
                    move_list.push(from, to, MoveFlags::Pawn);
                }
            }
        }

        if let Some(ep) = self.state.ep_square {
            // an enemy pawn on the ep square would attack exactly our capturing pawns.
            for from in pawn_attacks::<C::Opposite>(ep.as_set()) & pawns {
                move_list.push(from, ep, MoveFlags::EnPassant);
            }
        }
    }

    fn generate_pawn_pushes<C: Col, const PROMOS: bool, const QUIETS: bool, Mode: MoveGenMode>(
        &self,
        move_list: &mut MoveList,
        targets: SquareSet,
    ) {
        let bbs = &self.state.piece_layout;
        let empty = bbs.empty();
        let pawns = bbs.of_type(C::COLOUR, PieceType::Pawn);
        let third_rank = SquareSet::RANK_3.relative_to(C::COLOUR);
        let forward = |bb: SquareSet| if C::WHITE { bb.north_one() } else { bb.south_one() };
        let back = |sq: Square| if C::WHITE { sq.sub(8) } else { sq.add(8) };

        let single = forward(pawns) & empty;
        if PROMOS {
            for to in single & targets & SquareSet::BACK_RANKS {
                if let Some(from) = back(to) {
                    push_promotions::<Mode>(move_list, from, to);
                }
            }
        }
        if QUIETS {
            for to in single & targets & !SquareSet::BACK_RANKS {
                if let Some(from) = back(to) {
                    move_list.push(from, to, MoveFlags::Pawn);
                }
            }
            for to in forward(single & third_rank) & empty & targets {
                if let Some(from) = back(to).and_then(back) {
                    move_list.push(from, to, MoveFlags::DoublePush);
                }
            }
        }
    }

    fn generate_piece_moves<C: Col>(&self, move_list: &mut MoveList, targets: SquareSet) {
        let bbs = &self.state.piece_layout;
        let occupied = bbs.occupied();
        for piece_type in [PieceType::Knight, PieceType::Bishop, PieceType::Rook, PieceType::Queen] {
            let flag = MoveFlags::normal(piece_type);
            for from in bbs.of_type(C::COLOUR, piece_type) {
                for to in attacks_by_type(piece_type, from, occupied) & targets {
                    move_list.push(from, to, flag);
                }
            }
        }
    }

    fn generate_king_moves<C: Col>(&self, move_list: &mut MoveList, targets: SquareSet) {
        let king = self.state.piece_layout.king_sq(C::COLOUR);
        for to in king_attacks(king) & targets & !self.state.threats {
            move_list.push(king, to, MoveFlags::King);
        }
    }

    /// The castling move on the given wing, if it is currently available:
    /// rights intact, not in check, the squares between king and rook empty,
    /// and no square the king crosses or lands on attacked.
    pub fn castling_move(&self, kingside: bool) -> Option<Move> {
        if self.in_check() {
            return None;
        }
        let side = self.side;
        let occupied = self.state.piece_layout.occupied();
        let king = Square::E1.relative_to(side);
        let (rook, dst) = if kingside {
            (self.state.castle_perm.kingside(side)?, Square::G1.relative_to(side))
        } else {
            (self.state.castle_perm.queenside(side)?, Square::C1.relative_to(side))
        };
        let king_path = RAY_BETWEEN[king][dst] | dst.as_set();
        if (occupied & RAY_BETWEEN[king][rook]).is_empty() && (self.state.threats & king_path).is_empty() {
            Some(Move::new(king, dst, MoveFlags::Castle))
        } else {
            None
        }
    }

    fn generate_castling(&self, move_list: &mut MoveList) {
        for kingside in [true, false] {
            if let Some(m) = self.castling_move(kingside) {
                move_list.inner.push(MoveListEntry { mov: m, score: 0 });
            }
        }
    }

    /// Generates all pseudolegal moves into a cleared list.
    pub fn generate_moves(&self, move_list: &mut MoveList) {
        move_list.clear();
        match self.side {
            Colour::White => {
                self.generate_captures_for::<White, AllMoves>(move_list);
                self.generate_quiets_for::<White>(move_list);
            }
            Colour::Black => {
                self.generate_captures_for::<Black, AllMoves>(move_list);
                self.generate_quiets_for::<Black>(move_list);
            }
        }
    }

    /// Generates pseudolegal captures and promotions into a cleared list.
    pub fn generate_captures<Mode: MoveGenMode>(&self, move_list: &mut MoveList) {
        move_list.clear();
        match self.side {
            Colour::White => self.generate_captures_for::<White, Mode>(move_list),
            Colour::Black => self.generate_captures_for::<Black, Mode>(move_list),
        }
    }

    /// Appends pseudolegal non-captures, castling included and promotions excluded.
    pub fn generate_quiets(&self, move_list: &mut MoveList) {
        match self.side {
            Colour::White => self.generate_quiets_for::<White>(move_list),
            Colour::Black => self.generate_quiets_for::<Black>(move_list),
        }
    }

    fn generate_captures_for<C: Col, Mode: MoveGenMode>(&self, move_list: &mut MoveList) {
        let bbs = &self.state.piece_layout;
        let them = bbs.colours[!C::COLOUR];
        self.generate_king_moves::<C>(move_list, them);
        if self.state.checkers.many() {
            return;
        }
        let targets = self.evasion_targets(bbs.king_sq(C::COLOUR));
        self.generate_pawn_captures::<C, Mode>(move_list, targets);
        self.generate_pawn_pushes::<C, true, false, Mode>(move_list, targets);
        self.generate_piece_moves::<C>(move_list, them & targets);
    }

    fn generate_quiets_for<C: Col>(&self, move_list: &mut MoveList) {
        let bbs = &self.state.piece_layout;
        let empty = bbs.empty();
        self.generate_king_moves::<C>(move_list, empty);
        if self.state.checkers.many() {
            return;
        }
        let targets = self.evasion_targets(bbs.king_sq(C::COLOUR));
        self.generate_pawn_pushes::<C, false, true, AllMoves>(move_list, targets);
        self.generate_piece_moves::<C>(move_list, empty & targets);
        self.generate_castling(move_list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::piece::Piece;

    /// Walks the tree, checking at every node that split generation matches
    /// full generation and that `is_legal` agrees with `make_move`.
    fn synced_perft(pos: &mut Board, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }
        let mut full = MoveList::new();
        pos.generate_moves(&mut full);
        let mut staged = MoveList::new();
        pos.generate_captures::<AllMoves>(&mut staged);
        pos.generate_quiets(&mut staged);
        let mut a = full.iter_moves().map(Move::inner).collect::<Vec<_>>();
        let mut b = staged.iter_moves().map(Move::inner).collect::<Vec<_>>();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b, "generation mismatch in {pos}");

        let mut count = 0;
        for m in full.iter_moves() {
            assert!(pos.is_pseudo_legal(m), "{m:?} not pseudolegal in {pos}");
            let legal = pos.is_legal(m);
            let made = pos.make_move_simple(m);
            assert_eq!(legal, made, "is_legal disagrees with make_move for {m:?} in {pos}");
            if !made {
                continue;
            }
            count += synced_perft(pos, depth - 1);
            pos.unmake_move_base();
        }
        count
    }

    #[test]
    fn staged_generation_matches_full() {
        let fens = [
            Board::STARTING_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
            "r4rk1/2pb1ppQ/2pp1q2/p1n5/2P1B3/PP2P3/3N1PPP/R4RK1 b - - 0 17",
        ];
        for fen in fens {
            let mut pos = Board::from_fen(fen).unwrap();
            synced_perft(&mut pos, 2);
        }
    }

    #[test]
    fn king_never_steps_onto_attacked_squares() {
        let pos = Board::from_fen("r4rk1/2pb1ppQ/2pp1q2/p1n5/2P1B3/PP2P3/3N1PPP/R4RK1 b - - 0 17").unwrap();
        assert_eq!(pos.state.checkers, Square::H7.as_set());
        let mut ml = MoveList::new();
        pos.generate_moves(&mut ml);
        for m in ml.iter_moves() {
            if pos.state.mailbox[m.from()] == Some(Piece::BK) {
                assert!(!pos.state.threats.contains_square(m.to()), "{m}");
            }
        }
    }

    #[test]
    fn leaper_tables() {
        assert_eq!(knight_attacks(Square::A1), SquareSet::from_inner(132_096));
        assert_eq!(knight_attacks(Square::H8), SquareSet::from_inner(9_077_567_998_918_656));
        assert_eq!(king_attacks(Square::A1), SquareSet::from_inner(770));
        assert_eq!(king_attacks(Square::H8), SquareSet::from_inner(4_665_729_213_955_833_856));
    }

    #[test]
    fn line_tables() {
        assert_eq!(RAY_BETWEEN[Square::A1][Square::A1], SquareSet::EMPTY);
        assert_eq!(RAY_BETWEEN[Square::A1][Square::B1], SquareSet::EMPTY);
        assert_eq!(RAY_BETWEEN[Square::A1][Square::C1], Square::B1.as_set());
        assert_eq!(RAY_BETWEEN[Square::B5][Square::E8], Square::C6.as_set() | Square::D7.as_set());
        assert_eq!(RAY_BETWEEN[Square::A1][Square::B3], SquareSet::EMPTY);
        for a in Square::all() {
            for b in Square::all() {
                assert_eq!(RAY_BETWEEN[a][b], RAY_BETWEEN[b][a]);
            }
        }
        assert_eq!(RAY_FULL[Square::C3][Square::E5].count(), 8);
        assert!(RAY_FULL[Square::C3][Square::E5].contains_square(Square::A1));
        assert_eq!(RAY_FULL[Square::A1][Square::B3], SquareSet::EMPTY);
    }

    #[test]
    fn quiescence_mode_skips_underpromotions() {
        let pos = Board::from_fen("8/1P2k3/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let mut ml = MoveList::new();
        pos.generate_captures::<SkipQuiets>(&mut ml);
        assert_eq!(ml.len(), 1);
        pos.generate_captures::<AllMoves>(&mut ml);
        assert_eq!(ml.len(), 4);
    }
}
