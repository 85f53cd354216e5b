use std::{
    array,
    sync::atomic::{AtomicBool, AtomicU64},
};

use crate::{
    chess::{board::Board, chessmove::Move, piece::Colour},
    historytable::{
        CaptureHistoryTable, ContinuationHistoryTable, CorrectionHistoryTable, CounterMoveTable, ThreatsHistoryTable,
    },
    nnue::network::{NNUEParams, NNUEState},
    search::pv::PVariation,
    searchinfo::SearchInfo,
    stack::StackEntry,
    transpositiontable::TTView,
    util::MAX_PLY,
};

/// Everything a single search thread owns. Only the transposition table
/// and the stop and node counters are shared.
#[repr(align(64))]
pub struct ThreadData<'a> {
    // stack array is right-padded by one because singular verification
    // will try to access the next ply in an edge case.
    pub ss: [StackEntry; MAX_PLY + 1],
    pub banned_nmp: u8,
    pub nnue: Box<NNUEState>,
    pub nnue_params: &'a NNUEParams,

    pub main_history: Box<ThreatsHistoryTable>,
    pub tactical_history: Box<CaptureHistoryTable>,
    pub continuation_history: Box<ContinuationHistoryTable>,
    pub killer_move_table: [Option<Move>; MAX_PLY + 1],
    pub counter_move_table: Box<CounterMoveTable>,
    pub pawn_corrhist: Box<CorrectionHistoryTable>,
    pub nonpawn_corrhist: [Box<CorrectionHistoryTable>; 2],

    pub thread_id: usize,

    pub pvs: [PVariation; MAX_PLY],
    pub completed: usize,
    pub depth: usize,

    pub tt: TTView<'a>,

    pub board: Board,
    pub info: SearchInfo<'a>,
}

impl<'a> ThreadData<'a> {
    const WHITE_BANNED_NMP: u8 = 0b01;
    const BLACK_BANNED_NMP: u8 = 0b10;

    pub fn new(
        thread_id: usize,
        board: Board,
        tt: TTView<'a>,
        nnue_params: &'a NNUEParams,
        stopped: &'a AtomicBool,
        nodes: &'a AtomicU64,
    ) -> Self {
        let mut info = SearchInfo::new(stopped, nodes);
        info.main_thread = thread_id == 0;
        Self {
            ss: array::from_fn(|_| StackEntry::default()),
            banned_nmp: 0,
            nnue: NNUEState::new(&board, nnue_params),
            nnue_params,
            main_history: ThreatsHistoryTable::boxed(),
            tactical_history: CaptureHistoryTable::boxed(),
            continuation_history: ContinuationHistoryTable::boxed(),
            killer_move_table: [None; MAX_PLY + 1],
            counter_move_table: CounterMoveTable::boxed(),
            pawn_corrhist: CorrectionHistoryTable::boxed(),
            nonpawn_corrhist: [CorrectionHistoryTable::boxed(), CorrectionHistoryTable::boxed()],
            thread_id,
            pvs: array::from_fn(|_| PVariation::default()),
            completed: 0,
            depth: 0,
            tt,
            board,
            info,
        }
    }

    const fn nmp_mask(colour: Colour) -> u8 {
        match colour {
            Colour::White => Self::WHITE_BANNED_NMP,
            Colour::Black => Self::BLACK_BANNED_NMP,
        }
    }

    pub fn ban_nmp_for(&mut self, colour: Colour) {
        self.banned_nmp |= Self::nmp_mask(colour);
    }

    pub fn unban_nmp_for(&mut self, colour: Colour) {
        self.banned_nmp &= !Self::nmp_mask(colour);
    }

    pub const fn nmp_banned_for(&self, colour: Colour) -> bool {
        self.banned_nmp & Self::nmp_mask(colour) != 0
    }

    /// Forget everything learned in previous searches.
    pub fn clear_tables(&mut self) {
        self.main_history.clear();
        self.tactical_history.clear();
        self.continuation_history.clear();
        self.counter_move_table.clear();
        self.pawn_corrhist.clear();
        self.nonpawn_corrhist[Colour::White].clear();
        self.nonpawn_corrhist[Colour::Black].clear();
        self.killer_move_table.fill(None);
        self.depth = 0;
        self.completed = 0;
        self.pvs.fill(PVariation::default());
    }

    pub fn set_up_for_search(&mut self) {
        self.main_history.age_entries();
        self.tactical_history.age_entries();
        self.continuation_history.age_entries();
        self.killer_move_table.fill(None);
        self.banned_nmp = 0;
        self.depth = 0;
        self.completed = 0;
        self.pvs.fill(PVariation::default());
        self.board.zero_height();
        self.nnue.reinit_from(&self.board, self.nnue_params);
        self.info.set_up_for_search();
    }

    /// Make a move on the board, queueing the matching network update.
    /// Returns false, leaving the board untouched, if the move is illegal.
    pub fn make_move(&mut self, m: Move) -> bool {
        self.board.make_move(m, &mut self.nnue)
    }

    pub fn unmake_move(&mut self) {
        self.board.unmake_move(&mut self.nnue);
    }

    pub fn update_best_line(&mut self, pv: &PVariation) {
        self.completed = self.depth;
        self.pvs[self.depth] = pv.clone();
    }

    pub fn revert_best_line(&mut self) {
        self.completed = self.depth.saturating_sub(1);
    }

    pub const fn pv(&self) -> &PVariation {
        &self.pvs[self.completed]
    }
}

/// Build the state for `threads` search threads, all starting from `pos`.
pub fn make_thread_data<'a>(
    pos: &Board,
    tt: TTView<'a>,
    nnue_params: &'a NNUEParams,
    stopped: &'a AtomicBool,
    nodes: &'a AtomicU64,
    threads: usize,
) -> Vec<Box<ThreadData<'a>>> {
    (0..threads.max(1))
        .map(|thread_id| Box::new(ThreadData::new(thread_id, pos.clone(), tt, nnue_params, stopped, nodes)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpositiontable::TT;

    #[test]
    fn nmp_bans_are_per_side() {
        let mut tt = TT::new();
        tt.resize(1 << 16);
        let params = NNUEParams::builtin();
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let mut t = ThreadData::new(0, Board::default(), tt.view(), &params, &stopped, &nodes);
        t.ban_nmp_for(Colour::White);
        assert!(t.nmp_banned_for(Colour::White));
        assert!(!t.nmp_banned_for(Colour::Black));
        t.ban_nmp_for(Colour::Black);
        t.unban_nmp_for(Colour::White);
        assert!(!t.nmp_banned_for(Colour::White));
        assert!(t.nmp_banned_for(Colour::Black));
    }

    #[test]
    fn illegal_moves_leave_the_board_alone() {
        let mut tt = TT::new();
        tt.resize(1 << 16);
        let params = NNUEParams::builtin();
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        // the bishop on e2 is pinned against the king.
        let board = Board::from_fen("4r1k1/8/8/8/8/8/4B3/4K3 w - - 0 1").unwrap();
        let mut t = ThreadData::new(0, board.clone(), tt.view(), &params, &stopped, &nodes);
        let pinned = Move::new_normal(
            crate::chess::types::Square::E2,
            crate::chess::types::Square::D3,
            crate::chess::piece::PieceType::Bishop,
        );
        assert!(!t.make_move(pinned));
        assert_eq!(t.board, board);
        let legal = t.board.parse_uci("e1d1").unwrap();
        assert!(t.make_move(legal));
        t.unmake_move();
        assert_eq!(t.board, board);
    }
}
