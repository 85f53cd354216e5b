use crate::{
    chess::{
        board::Board,
        chessmove::Move,
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::Square,
    },
    historytable::{
        CORRECTION_HISTORY_GRAIN, CORRECTION_HISTORY_MAX, CORRECTION_HISTORY_WEIGHT_SCALE, history_bonus,
        history_malus, update_history,
    },
    threadlocal::ThreadData,
    util::MAX_PLY,
};

impl ThreadData<'_> {
    fn moved_piece(&self, m: Move) -> Piece {
        Piece::new(self.board.turn(), m.piece_type())
    }

    /// Update the history counters of a batch of moves.
    pub fn update_history(&mut self, moves_to_adjust: &[Move], best_move: Move, depth: i32) {
        let threats = self.board.state.threats;
        for &m in moves_to_adjust {
            let piece = self.moved_piece(m);
            let delta = if m == best_move {
                history_bonus(&self.info.conf, depth)
            } else {
                -history_malus(&self.info.conf, depth)
            };
            let val = self.main_history.get_mut(
                piece,
                m.to(),
                threats.contains_square(m.from()),
                threats.contains_square(m.to()),
            );
            update_history(val, delta);
        }
    }

    /// Update the history counters for a single move.
    pub fn update_history_single(&mut self, from: Square, to: Square, moved: Piece, threats: SquareSet, delta: i32) {
        let val = self.main_history.get_mut(moved, to, threats.contains_square(from), threats.contains_square(to));
        update_history(val, delta);
    }

    /// Get the history score for a single move.
    pub fn get_history_score(&self, m: Move) -> i32 {
        let threats = self.board.state.threats;
        i32::from(self.main_history.get(
            self.moved_piece(m),
            m.to(),
            threats.contains_square(m.from()),
            threats.contains_square(m.to()),
        ))
    }

    /// Update the tactical history counters of a batch of moves.
    pub fn update_tactical_history(&mut self, moves_to_adjust: &[Move], best_move: Move, depth: i32) {
        for &m in moves_to_adjust {
            let piece = self.moved_piece(m);
            let capture = caphist_piece_type(&self.board, m);
            let delta = if m == best_move {
                history_bonus(&self.info.conf, depth)
            } else {
                -history_malus(&self.info.conf, depth)
            };
            update_history(self.tactical_history[capture].get_mut(piece, m.to()), delta);
        }
    }

    /// Get the tactical history score for a single move.
    pub fn get_tactical_history_score(&self, m: Move) -> i32 {
        let capture = caphist_piece_type(&self.board, m);
        i32::from(self.tactical_history[capture].get(self.moved_piece(m), m.to()))
    }

    /// Update the continuation history counters of a batch of moves,
    /// keyed on the move made `index + 1` plies ago.
    pub fn update_continuation_history(&mut self, moves_to_adjust: &[Move], best_move: Move, depth: i32, index: usize) {
        let height = self.board.height();
        if height <= index {
            return;
        }
        let Some(ss) = self.ss.get(height - index - 1) else {
            return;
        };
        let conthist_index = ss.conthist_index;
        let bonus = history_bonus(&self.info.conf, depth);
        let malus = history_malus(&self.info.conf, depth);
        let turn = self.board.turn();
        let cmh_block = self.continuation_history.get_index_mut(conthist_index);
        for &m in moves_to_adjust {
            let piece = Piece::new(turn, m.piece_type());
            let delta = if m == best_move { bonus } else { -malus };
            update_history(cmh_block.get_mut(piece, m.to()), delta);
        }
    }

    /// Update the continuation history counter for a single move.
    pub fn update_continuation_history_single(&mut self, to: Square, moved: Piece, delta: i32, index: usize) {
        let height = self.board.height();
        if height <= index {
            return;
        }
        let Some(ss) = self.ss.get(height - index - 1) else {
            return;
        };
        let cmh_block = self.continuation_history.get_index_mut(ss.conthist_index);
        update_history(cmh_block.get_mut(moved, to), delta);
    }

    /// Get the continuation history score for a single move.
    pub fn get_continuation_history_score(&self, m: Move, index: usize) -> i32 {
        let height = self.board.height();
        if height <= index {
            return 0;
        }
        let Some(ss) = self.ss.get(height - index - 1) else {
            return 0;
        };
        let cmh_block = self.continuation_history.get_index(ss.conthist_index);
        i32::from(cmh_block.get(self.moved_piece(m), m.to()))
    }

    /// Add a killer move.
    pub fn insert_killer(&mut self, m: Move) {
        debug_assert!(self.board.height() < MAX_PLY);
        let idx = self.board.height();
        self.killer_move_table[idx] = Some(m);
    }

    /// Record `m` as the refutation of the previous move.
    pub fn insert_countermove(&mut self, m: Move) {
        let height = self.board.height();
        if height == 0 {
            return;
        }
        let prev = self.ss[height - 1].conthist_index;
        if self.ss[height - 1].searching.is_none() {
            return;
        }
        self.counter_move_table.add(prev.piece, prev.square, m);
    }

    /// The recorded refutation of the previous move, if any.
    pub fn get_counter_move(&self) -> Option<Move> {
        let height = self.board.height();
        if height == 0 || self.ss[height - 1].searching.is_none() {
            return None;
        }
        let prev = self.ss[height - 1].conthist_index;
        self.counter_move_table.get(prev.piece, prev.square)
    }

    /// Nudge the correction histories towards the observed search-minus-eval error.
    pub fn update_correction_history(&mut self, depth: i32, diff: i32) {
        fn update(entry: &mut i32, new_weight: i32, scaled_diff: i32) {
            let update = *entry * (CORRECTION_HISTORY_WEIGHT_SCALE - new_weight) + scaled_diff * new_weight;
            *entry = i32::clamp(
                update / CORRECTION_HISTORY_WEIGHT_SCALE,
                -CORRECTION_HISTORY_MAX,
                CORRECTION_HISTORY_MAX,
            );
        }
        let scaled_diff = diff * CORRECTION_HISTORY_GRAIN;
        let new_weight = 16.min(1 + depth);
        debug_assert!(new_weight <= CORRECTION_HISTORY_WEIGHT_SCALE);
        let us = self.board.turn();
        let keys = self.board.state.keys;

        update(self.pawn_corrhist.get_mut(us, keys.pawn_key), new_weight, scaled_diff);
        update(
            self.nonpawn_corrhist[Colour::White].get_mut(us, keys.non_pawn_key[Colour::White]),
            new_weight,
            scaled_diff,
        );
        update(
            self.nonpawn_corrhist[Colour::Black].get_mut(us, keys.non_pawn_key[Colour::Black]),
            new_weight,
            scaled_diff,
        );
    }

    /// The correction-history adjustment for the current position's static evaluation.
    #[allow(clippy::cast_possible_truncation)]
    pub fn correction(&self) -> i32 {
        let keys = &self.board.state.keys;
        let turn = self.board.turn();
        let pawn = self.pawn_corrhist.get(turn, keys.pawn_key);
        let white = self.nonpawn_corrhist[Colour::White].get(turn, keys.non_pawn_key[Colour::White]);
        let black = self.nonpawn_corrhist[Colour::Black].get(turn, keys.non_pawn_key[Colour::Black]);
        let adjustment = pawn * i64::from(self.info.conf.pawn_corrhist_weight)
            + (white + black) * i64::from(self.info.conf.nonpawn_corrhist_weight);
        (adjustment / 1024) as i32 / CORRECTION_HISTORY_GRAIN
    }
}

/// The captured-piece slot a tactical move updates.
pub fn caphist_piece_type(pos: &Board, mv: Move) -> PieceType {
    if mv.is_ep() || mv.is_promo() {
        // non-capture promotions share the pawn slot, which is
        // otherwise unused on the back ranks.
        return PieceType::Pawn;
    }
    debug_assert!(!mv.is_castle(), "castling has no capture history");
    pos.state.mailbox[mv.to()].map_or(PieceType::Pawn, Piece::piece_type)
}
