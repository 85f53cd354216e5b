use arrayvec::ArrayVec;

use crate::{
    chess::{
        board::movegen::{AllMoves, MAX_POSITION_MOVES, MoveList, MoveListEntry, SkipQuiets},
        chessmove::Move,
    },
    history::caphist_piece_type,
    threadlocal::ThreadData,
};

pub const TT_MOVE_SCORE: i32 = 20_000_000;
pub const KILLER_SCORE: i32 = 9_000_000;
pub const COUNTER_MOVE_SCORE: i32 = 2_000_000;

const MVV_SCORE: [i32; 6] = [0, 2400, 2400, 4800, 9600, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    TTMove,
    GenerateCaptures,
    YieldGoodCaptures,
    YieldKiller,
    YieldCounterMove,
    GenerateQuiets,
    YieldQuiets,
    YieldBadCaptures,
    Done,
}

/// Lazily produces the moves of a position, best-guess first.
///
/// Captures that fail the exchange threshold are held back until every
/// quiet move has been tried. In captures-only mode they are dropped instead.
pub struct MovePicker {
    movelist: MoveList,
    index: usize,
    bad_captures: ArrayVec<MoveListEntry, MAX_POSITION_MOVES>,
    bad_index: usize,
    pub stage: Stage,
    tt_move: Option<Move>,
    killer: Option<Move>,
    counter_move: Option<Move>,
    /// Stop producing quiet moves. Losing captures still come last.
    pub skip_quiets: bool,
    /// Produce only the tactical moves that pass the exchange threshold.
    pub captures_only: bool,
    see_threshold: i32,
}

impl MovePicker {
    pub fn new(tt_move: Option<Move>, killer: Option<Move>, counter_move: Option<Move>, see_threshold: i32) -> Self {
        Self {
            movelist: MoveList::new(),
            index: 0,
            bad_captures: ArrayVec::new(),
            bad_index: 0,
            stage: Stage::TTMove,
            tt_move,
            killer,
            counter_move,
            skip_quiets: false,
            captures_only: false,
            see_threshold,
        }
    }

    /// Returns true if a move was already yielded by the movepicker.
    pub fn was_tried_lazily(&self, m: Move) -> bool {
        let m = Some(m);
        m == self.tt_move || m == self.killer || m == self.counter_move
    }

    /// Select the next move to try. Returns None if there are no more moves to try.
    pub fn next(&mut self, t: &ThreadData) -> Option<MoveListEntry> {
        let pos = &t.board;
        if self.stage == Stage::TTMove {
            self.stage = Stage::GenerateCaptures;
            if let Some(tt_move) = self.tt_move
                && pos.is_pseudo_legal(tt_move)
                && (!self.captures_only || pos.is_tactical(tt_move))
            {
                return Some(MoveListEntry { mov: tt_move, score: TT_MOVE_SCORE });
            }
        }
        if self.stage == Stage::GenerateCaptures {
            self.stage = Stage::YieldGoodCaptures;
            if self.captures_only {
                pos.generate_captures::<SkipQuiets>(&mut self.movelist);
            } else {
                pos.generate_captures::<AllMoves>(&mut self.movelist);
            }
            for entry in self.movelist.iter_mut() {
                entry.score =
                    MVV_SCORE[caphist_piece_type(pos, entry.mov)] + t.get_tactical_history_score(entry.mov);
            }
        }
        if self.stage == Stage::YieldGoodCaptures {
            while let Some(m) = self.yield_once() {
                if pos.static_exchange_eval(&t.info.conf, m.mov, self.see_threshold) {
                    return Some(m);
                }
                if !self.captures_only {
                    self.bad_captures.push(m);
                }
            }
            self.stage = if self.captures_only {
                Stage::Done
            } else if self.skip_quiets {
                Stage::YieldBadCaptures
            } else {
                Stage::YieldKiller
            };
        }
        if self.stage == Stage::YieldKiller {
            self.stage = Stage::YieldCounterMove;
            if !self.skip_quiets
                && self.killer != self.tt_move
                && let Some(killer) = self.killer
                && pos.is_pseudo_legal(killer)
                && !pos.is_tactical(killer)
            {
                return Some(MoveListEntry { mov: killer, score: KILLER_SCORE });
            }
        }
        if self.stage == Stage::YieldCounterMove {
            self.stage = Stage::GenerateQuiets;
            if !self.skip_quiets
                && self.counter_move != self.tt_move
                && self.counter_move != self.killer
                && let Some(counter) = self.counter_move
                && pos.is_pseudo_legal(counter)
                && !pos.is_tactical(counter)
            {
                return Some(MoveListEntry { mov: counter, score: COUNTER_MOVE_SCORE });
            }
        }
        if self.stage == Stage::GenerateQuiets {
            self.stage = Stage::YieldQuiets;
            if !self.skip_quiets {
                // every capture has been yielded or set aside by now.
                self.movelist.clear();
                self.index = 0;
                pos.generate_quiets(&mut self.movelist);
                for entry in self.movelist.iter_mut() {
                    entry.score = t.get_history_score(entry.mov)
                        + t.get_continuation_history_score(entry.mov, 0)
                        + t.get_continuation_history_score(entry.mov, 1);
                }
            }
        }
        if self.stage == Stage::YieldQuiets {
            if !self.skip_quiets
                && let Some(m) = self.yield_once()
            {
                return Some(m);
            }
            self.stage = Stage::YieldBadCaptures;
        }
        if self.stage == Stage::YieldBadCaptures {
            if let Some(&m) = self.bad_captures.get(self.bad_index) {
                self.bad_index += 1;
                return Some(m);
            }
            self.stage = Stage::Done;
        }
        None
    }

    /// One step of selection sort over the unyielded part of the list,
    /// skipping moves that an earlier stage already produced.
    fn yield_once(&mut self) -> Option<MoveListEntry> {
        loop {
            if self.index >= self.movelist.len() {
                return None;
            }

            let mut best_score = self.movelist[self.index].score;
            let mut best_num = self.index;
            for index in self.index + 1..self.movelist.len() {
                let score = self.movelist[index].score;
                if score > best_score {
                    best_score = score;
                    best_num = index;
                }
            }

            self.movelist.swap(best_num, self.index);
            let m = self.movelist[self.index];
            self.index += 1;
            if !self.was_tried_lazily(m.mov) {
                return Some(m);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64};

    use super::*;
    use crate::{chess::board::Board, nnue::network::NNUEParams, search::parameters::Config, transpositiontable::TT};

    fn picker_over(pos: &str, captures_only: bool, skip_quiets_after: Option<usize>) -> Vec<(String, Stage)> {
        let board = Board::from_fen(pos).unwrap();
        let mut tt = TT::new();
        tt.resize(1 << 16);
        let params = NNUEParams::builtin();
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let t = ThreadData::new(0, board, tt.view(), &params, &stopped, &nodes);
        let mut picker = MovePicker::new(None, None, None, 0);
        picker.captures_only = captures_only;
        let mut out = Vec::new();
        while let Some(entry) = picker.next(&t) {
            out.push((entry.mov.to_string(), picker.stage));
            if skip_quiets_after == Some(out.len()) {
                picker.skip_quiets = true;
            }
        }
        out
    }

    fn drain(pos: &str, tt_move: Option<&str>, skip_quiets: bool) -> Vec<(Move, Stage)> {
        let board = Board::from_fen(pos).unwrap();
        let mut tt = TT::new();
        tt.resize(1 << 16);
        let params = NNUEParams::builtin();
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let tt_move = tt_move.map(|m| board.parse_uci(m).unwrap());
        let t = ThreadData::new(0, board, tt.view(), &params, &stopped, &nodes);
        let mut picker = MovePicker::new(tt_move, None, None, 0);
        picker.skip_quiets = skip_quiets;
        let mut out = Vec::new();
        while let Some(entry) = picker.next(&t) {
            out.push((entry.mov, picker.stage));
        }
        out
    }

    #[test]
    fn yields_every_pseudo_legal_move_once() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let board = Board::from_fen(fen).unwrap();
        let mut all = MoveList::new();
        board.generate_moves(&mut all);
        let yielded = drain(fen, Some("e2a6"), false);
        assert_eq!(yielded.len(), all.len());
        assert_eq!(yielded[0].0.to_string(), "e2a6");
        for m in all.iter_moves() {
            assert_eq!(yielded.iter().filter(|(y, _)| *y == m).count(), 1, "{m} not yielded exactly once");
        }
    }

    #[test]
    fn losing_captures_come_after_quiets() {
        // the queen can win a hanging knight, or lose itself for a defended pawn.
        let fen = "4k3/2p5/3p4/7n/8/8/8/K2Q4 w - - 0 1";
        let yielded = drain(fen, None, false);
        let find = |uci: &str| yielded.iter().position(|(m, _)| m.to_string() == uci).unwrap();
        let good = find("d1h5");
        let quiet = find("a1b1");
        let bad = find("d1d6");
        assert_eq!(good, 0);
        assert_eq!(yielded[good].1, Stage::YieldGoodCaptures);
        assert_eq!(yielded[quiet].1, Stage::YieldQuiets);
        assert_eq!(yielded[bad].1, Stage::YieldBadCaptures);
        assert!(quiet < bad);
    }

    #[test]
    fn captures_only_mode_drops_losing_captures() {
        let fen = "4k3/2p5/3p4/7n/8/8/8/K2Q4 w - - 0 1";
        let names = picker_over(fen, true, None).into_iter().map(|(m, _)| m).collect::<Vec<_>>();
        assert_eq!(names, ["d1h5"]);
    }

    #[test]
    fn skipping_quiets_still_yields_losing_captures() {
        let fen = "4k3/2p5/3p4/7n/8/8/8/K2Q4 w - - 0 1";
        let full = picker_over(fen, false, None);
        // stop quiets after the winning capture and one quiet move.
        let cut = picker_over(fen, false, Some(2));
        assert_eq!(cut.len(), 3);
        assert_eq!(cut[0].0, "d1h5");
        assert_eq!(cut[1].1, Stage::YieldQuiets);
        assert_eq!(cut[2], ("d1d6".to_string(), Stage::YieldBadCaptures));
        assert!(full.len() > cut.len());
    }

    #[test]
    fn skipping_quiets_from_the_start_goes_straight_to_losing_captures() {
        let fen = "4k3/2p5/3p4/7n/8/8/8/K2Q4 w - - 0 1";
        let yielded = drain(fen, None, true);
        let names = yielded.iter().map(|(m, _)| m.to_string()).collect::<Vec<_>>();
        assert_eq!(names, ["d1h5", "d1d6"]);
        assert_eq!(yielded[1].1, Stage::YieldBadCaptures);
    }

    #[test]
    fn even_trades_count_as_good_captures() {
        // knight takes knight, and the pawn takes back.
        let board = Board::from_fen("4k3/8/2p5/3n4/8/4N3/8/K7 w - - 0 1").unwrap();
        let mut tt = TT::new();
        tt.resize(1 << 16);
        let params = NNUEParams::builtin();
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let t = ThreadData::new(0, board, tt.view(), &params, &stopped, &nodes);
        let mut picker = MovePicker::new(None, None, None, Config::default().main_see_bound);
        let first = picker.next(&t).unwrap();
        assert_eq!(first.mov.to_string(), "e3d5");
        assert_eq!(picker.stage, Stage::YieldGoodCaptures);
    }
}
