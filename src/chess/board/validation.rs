use crate::{
    chess::{
        board::Board,
        piece::{Colour, PieceType},
        squareset::SquareSet,
        types::{Rank, Square},
    },
    errors::PositionValidityError,
};

impl Board {
    /// Checks the internal consistency of the position: bitboards against the
    /// mailbox, keys against a fresh computation, and the cached check data.
    pub fn check_validity(&self) -> Result<(), PositionValidityError> {
        let fail = |msg: String| Err(PositionValidityError(msg));
        let layout = &self.state.piece_layout;

        if (layout.colours[Colour::White] & layout.colours[Colour::Black]).non_empty() {
            return fail("colour bitboards overlap".into());
        }
        let by_type = layout.pieces.iter().fold(SquareSet::EMPTY, |acc, &bb| acc | bb);
        if by_type != layout.occupied() {
            return fail("piece-type bitboards disagree with colour bitboards".into());
        }
        for (i, &a) in layout.pieces.iter().enumerate() {
            for &b in &layout.pieces[i + 1..] {
                if (a & b).non_empty() {
                    return fail("piece-type bitboards overlap".into());
                }
            }
        }

        for sq in Square::all() {
            let expected = layout.piece_at(sq);
            if self.state.mailbox[sq] != expected {
                return fail(format!(
                    "mailbox has {:?} on {sq}, bitboards have {expected:?}",
                    self.state.mailbox[sq]
                ));
            }
        }

        for colour in Colour::all() {
            let kings = layout.of_type(colour, PieceType::King).count();
            if kings != 1 {
                return fail(format!("{colour:?} has {kings} kings"));
            }
        }

        let fresh = self.generate_keys();
        if fresh != self.state.keys {
            return fail(format!("keys are {:?}, expected {fresh:?}", self.state.keys));
        }

        if let Some(ep) = self.state.ep_square {
            if ep.rank() != Rank::Six.relative_to(self.side) {
                return fail(format!("en passant square {ep} is on the wrong rank"));
            }
        }

        // positions are set up at 100 at most; each move played since can add one.
        if usize::from(self.state.fifty_move_counter) > 100 + self.history.len() {
            return fail(format!("fifty-move counter is {}", self.state.fifty_move_counter));
        }

        let king = layout.king_sq(self.side);
        let checkers = layout.attackers_to(king, layout.occupied()) & layout.colours[!self.side];
        if checkers != self.state.checkers {
            return fail(format!("checkers are {:?}, expected {checkers:?}", self.state.checkers));
        }
        if layout.sq_attacked(layout.king_sq(!self.side), self.side) {
            return fail("the side not to move is in check".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::chess::{board::Board, piece::Piece, types::Square};

    #[test]
    fn corrupted_mailbox_is_reported() {
        let mut board = Board::default();
        assert!(board.check_validity().is_ok());
        board.state.mailbox[Square::E4] = Some(Piece::WQ);
        assert!(board.check_validity().is_err());
    }

    #[test]
    fn stale_key_is_reported() {
        let mut board = Board::default();
        board.state.keys.key ^= 1;
        assert!(board.check_validity().is_err());
    }

    #[test]
    fn fifty_move_clock_passes_100_only_through_played_moves() {
        let mut board = Board::from_fen("4k3/8/8/8/8/8/R7/4K3 w - - 100 80").unwrap();
        assert!(board.check_validity().is_ok());
        let m = board.parse_uci("a2a3").unwrap();
        assert!(board.make_move_simple(m));
        assert_eq!(board.fifty_move_counter(), 101);
        assert!(board.check_validity().is_ok());
        board.state.fifty_move_counter = 102;
        assert!(board.check_validity().is_err());
    }
}
