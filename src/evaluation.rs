// The granularity of evaluation in this engine is in centipawns.

use crate::{
    chess::{board::Board, chessmove::Move, piece::PieceType},
    search::{draw_score, parameters::Config},
    threadlocal::ThreadData,
    util::{MAX_DEPTH, MAX_PLY},
};

/// The value of checkmate.
/// To recover depth-to-mate, we subtract depth (ply) from this value.
/// e.g. if white has a mate in two ply, the output from a depth-5 search will be
/// two less than `MATE_SCORE`.
pub const MATE_SCORE: i32 = i16::MAX as i32 - 300;
pub const fn mate_in(ply: usize) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    debug_assert!(ply <= MAX_PLY);
    MATE_SCORE - ply as i32
}
pub const fn mated_in(ply: usize) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    debug_assert!(ply <= MAX_PLY);
    -MATE_SCORE + ply as i32
}

/// A threshold over which scores must be mate.
pub const MINIMUM_MATE_SCORE: i32 = MATE_SCORE - MAX_DEPTH;

pub const fn is_mate_score(score: i32) -> bool {
    score.abs() >= MINIMUM_MATE_SCORE
}

impl Board {
    /// Non-pawn material of both sides, scaled down by 32.
    pub fn material(&self, conf: &Config) -> i32 {
        #![allow(clippy::cast_possible_wrap)]
        let b = &self.state.piece_layout;
        (conf.see_knight_value * b.pieces[PieceType::Knight].count() as i32
            + conf.see_bishop_value * b.pieces[PieceType::Bishop].count() as i32
            + conf.see_rook_value * b.pieces[PieceType::Rook].count() as i32
            + conf.see_queen_value * b.pieces[PieceType::Queen].count() as i32)
            / 32
    }

    /// Does the side to move have anything besides king and pawns?
    pub fn zugzwang_unlikely(&self) -> bool {
        let layout = &self.state.piece_layout;
        let us = layout.colours[self.turn()];
        let kings = layout.pieces[PieceType::King];
        let pawns = layout.pieces[PieceType::Pawn];
        (us & (kings | pawns)) != us
    }

    /// The material gained by a move if nothing recaptures.
    pub fn estimated_see(&self, conf: &Config, m: Move) -> i32 {
        // initially take the value of the thing on the target square
        let mut value = self.state.mailbox[m.to()].map_or(0, |p| see_value(p.piece_type(), conf));

        if let Some(promo) = m.promotion_type() {
            // if it's a promo, swap a pawn for the promoted piece type
            value += see_value(promo, conf) - conf.see_pawn_value;
        } else if m.is_ep() {
            // for e.p. we will miss a pawn because the target square is empty
            value = conf.see_pawn_value;
        }

        value
    }
}

pub const fn see_value(piece_type: PieceType, conf: &Config) -> i32 {
    match piece_type {
        PieceType::Pawn => conf.see_pawn_value,
        PieceType::Knight => conf.see_knight_value,
        PieceType::Bishop => conf.see_bishop_value,
        PieceType::Rook => conf.see_rook_value,
        PieceType::Queen => conf.see_queen_value,
        PieceType::King => 0,
    }
}

impl ThreadData<'_> {
    /// The static evaluation of the current position, from the side to move's
    /// perspective, before correction history is applied.
    pub fn evaluate(&mut self) -> i32 {
        // detect draw by insufficient material
        if self.board.state.piece_layout.is_material_draw() {
            return draw_score(self.info.nodes.get_local());
        }
        // apply all in-waiting updates to generate a valid
        // neural network accumulator state, then run the network.
        let v = self.nnue.evaluate(self.nnue_params, self.board.turn());

        // scale up evaluations of material-rich positions.
        let v = v * (self.info.conf.material_scale_base + self.board.material(&self.info.conf)) / 1024;

        // damp down the evaluation as the fifty-move rule approaches.
        let v = v * (200 - i32::from(self.board.fifty_move_counter())) / 200;

        // clamp the value into the valid range.
        // this basically never comes up, but the network will
        // occasionally output OOB values in crazy positions with
        // massive material imbalances.
        v.clamp(-MINIMUM_MATE_SCORE + 1, MINIMUM_MATE_SCORE - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::{piece::PieceType, types::Square};

    #[test]
    fn mate_scores_are_recognised() {
        assert!(is_mate_score(mate_in(0)));
        assert!(is_mate_score(mated_in(5)));
        assert!(is_mate_score(mate_in(MAX_PLY)));
        assert!(!is_mate_score(3000));
        assert!(!is_mate_score(-3000));
        assert!(mate_in(1) > mate_in(3));
    }

    #[test]
    fn zugzwang_detection() {
        let pawns_only = Board::from_fen("4k3/4p3/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
        assert!(!pawns_only.zugzwang_unlikely());
        let with_knight = Board::from_fen("4k3/4p3/8/8/8/8/4P3/4KN2 w - - 0 1").unwrap();
        assert!(with_knight.zugzwang_unlikely());
    }

    #[test]
    fn estimated_see_counts_promotions_and_en_passant() {
        let conf = Config::default();
        let board = Board::from_fen("4k3/1P6/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let ep = board.parse_uci("e5d6").unwrap();
        assert_eq!(board.estimated_see(&conf, ep), conf.see_pawn_value);
        let promo = board.parse_uci("b7b8q").unwrap();
        assert_eq!(board.estimated_see(&conf, promo), conf.see_queen_value - conf.see_pawn_value);
        let quiet = Move::new_normal(Square::E1, Square::E2, PieceType::King);
        assert_eq!(board.estimated_see(&conf, quiet), 0);
    }
}
