pub mod movegen;
pub mod validation;

use std::fmt::{self, Debug, Display, Formatter};

use arrayvec::ArrayVec;
use movegen::{MAX_POSITION_MOVES, MoveList, RAY_BETWEEN, RAY_FULL, attacks_by_type, king_attacks, pawn_attacks_by};

use crate::{
    chess::{
        chessmove::{Move, MoveFlags},
        fen::Fen,
        magic::{bishop_attacks, rook_attacks},
        piece::{Black, Colour, Piece, PieceType, White},
        squareset::SquareSet,
        types::{CastlingRights, Keys, Rank, Square, State},
    },
    cuckoo,
    errors::{FenParseError, MoveParseError},
    lookups::{CASTLE_KEYS, EP_KEYS, SIDE_KEY, piece_key},
    nnue::{accumulator::UpdateBuffer, network::NNUEState},
};

/// A chess position with the history needed to undo moves and detect repetitions.
#[derive(PartialEq, Eq, Clone)]
pub struct Board {
    /// Everything that `make_move` changes, copied onto `history` before each move.
    pub(crate) state: State,
    side: Colour,
    /// Half moves since the start of the game.
    ply: usize,
    /// Half moves since the root of the current search.
    height: usize,
    history: Vec<State>,
}

impl Debug for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("fen", &self.to_string())
            .field("height", &self.height)
            .field("key", &self.state.keys.key)
            .field("checkers", &self.state.checkers)
            .finish_non_exhaustive()
    }
}

impl Default for Board {
    fn default() -> Self {
        let mut out = Self::empty();
        out.set_startpos();
        out
    }
}

impl Board {
    pub const STARTING_FEN: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn empty() -> Self {
        Self { state: State::default(), side: Colour::White, ply: 0, height: 0, history: Vec::new() }
    }

    pub const fn turn(&self) -> Colour {
        self.side
    }

    pub const fn ply(&self) -> usize {
        self.ply
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub fn zero_height(&mut self) {
        self.height = 0;
    }

    pub const fn ep_sq(&self) -> Option<Square> {
        self.state.ep_square
    }

    pub const fn castling_rights(&self) -> CastlingRights {
        self.state.castle_perm
    }

    pub const fn fifty_move_counter(&self) -> u8 {
        self.state.fifty_move_counter
    }

    pub const fn full_move_number(&self) -> usize {
        self.ply / 2 + 1
    }

    pub const fn keys(&self) -> &Keys {
        &self.state.keys
    }

    pub const fn key(&self) -> u64 {
        self.state.keys.key
    }

    pub fn history(&self) -> &[State] {
        &self.history
    }

    pub const fn state(&self) -> &State {
        &self.state
    }

    pub fn in_check(&self) -> bool {
        self.state.checkers.non_empty()
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.state.mailbox[sq]
    }

    pub fn king_sq(&self, side: Colour) -> Square {
        self.state.piece_layout.king_sq(side)
    }

    /// The piece a move captures, if any. En passant captures a pawn on a different square.
    pub fn captured_piece(&self, m: Move) -> Option<Piece> {
        if m.is_ep() {
            return Some(Piece::new(!self.side, PieceType::Pawn));
        }
        self.state.mailbox[m.to()]
    }

    pub fn is_capture(&self, m: Move) -> bool {
        self.captured_piece(m).is_some()
    }

    /// Captures and promotions.
    pub fn is_tactical(&self, m: Move) -> bool {
        m.is_promo() || self.is_capture(m)
    }

    pub fn set_startpos(&mut self) {
        match Fen::parse(Self::STARTING_FEN) {
            Ok(fen) => self.set_from_fen(&fen),
            Err(e) => debug_assert!(false, "starting FEN is broken: {e}"),
        }
    }

    pub fn set_from_fen(&mut self, fen: &Fen) {
        *self = Self::empty();

        self.state.piece_layout = fen.board;
        for sq in Square::all() {
            self.state.mailbox[sq] = fen.board.piece_at(sq);
        }
        self.side = fen.turn;
        self.state.castle_perm = fen.castling;
        self.state.fifty_move_counter = fen.halfmove;
        self.ply = (fen.fullmove.get() - 1) * 2 + usize::from(self.side == Colour::Black);

        // an en passant square nobody can capture onto is dropped, matching `make_move`.
        self.state.ep_square = fen.ep.filter(|&ep| self.ep_capturable(ep, !self.side));

        self.refresh_check_info();
        self.state.keys = self.generate_keys();
    }

    /// Parses a FEN. The move counters may be omitted.
    pub fn from_fen(fen: &str) -> Result<Self, FenParseError> {
        let parsed = Fen::parse_relaxed(fen)?;
        let mut out = Self::empty();
        out.set_from_fen(&parsed);
        Ok(out)
    }

    /// Can a pawn of the side to move capture onto `ep`, the square a pawn of `pusher` just skipped?
    fn ep_capturable(&self, ep: Square, pusher: Colour) -> bool {
        let capturers = self.state.piece_layout.of_type(!pusher, PieceType::Pawn);
        (pawn_attacks_by(ep.as_set(), pusher) & capturers).non_empty()
    }

    fn refresh_check_info(&mut self) {
        let layout = &self.state.piece_layout;
        let king = layout.king_sq(self.side);
        self.state.checkers = layout.attackers_to(king, layout.occupied()) & layout.colours[!self.side];
        self.state.pinned = layout.pinned(self.side);
        self.state.threats = layout.attacked_by(!self.side);
    }

    /// Computes every hash key from scratch.
    pub fn generate_keys(&self) -> Keys {
        let mut keys = Keys::default();
        self.state.piece_layout.visit_pieces(|sq, piece| {
            let k = piece_key(piece, sq);
            keys.key ^= k;
            if piece.piece_type() == PieceType::Pawn {
                keys.pawn_key ^= k;
            } else {
                keys.non_pawn_key[piece.colour()] ^= k;
            }
        });
        if let Some(ep) = self.state.ep_square {
            keys.key ^= EP_KEYS[ep];
        }
        keys.key ^= CASTLE_KEYS[self.state.castle_perm.hashkey_index()];
        if self.side == Colour::Black {
            keys.key ^= SIDE_KEY;
        }
        keys
    }

    /// Checks whether a move could be played here, ignoring whether it leaves the king in check.
    /// Used to vet moves from the hash table and the killer and counter-move tables.
    pub fn is_pseudo_legal(&self, m: Move) -> bool {
        let from = m.from();
        let to = m.to();
        let side = self.side;
        let Some(piece) = self.state.mailbox[from] else {
            return false;
        };
        if piece.colour() != side || piece.piece_type() != m.piece_type() {
            return false;
        }
        let captured = self.state.mailbox[to];
        if captured.is_some_and(|c| c.colour() == side) {
            return false;
        }
        // with two checkers only the king may move.
        if self.state.checkers.many() && piece.piece_type() != PieceType::King {
            return false;
        }

        let occupied = self.state.piece_layout.occupied();
        match m.flag() {
            MoveFlags::Castle => self.castling_move(m.is_kingside_castling()) == Some(m),
            MoveFlags::EnPassant => {
                self.state.ep_square == Some(to) && pawn_attacks_by(from.as_set(), side).contains_square(to)
            }
            MoveFlags::DoublePush => {
                let Some(mid) = from.pawn_push(side) else {
                    return false;
                };
                from.relative_to(side).rank() == Rank::Two
                    && self.state.mailbox[mid].is_none()
                    && captured.is_none()
                    && mid.pawn_push(side) == Some(to)
            }
            MoveFlags::Pawn
            | MoveFlags::PromoKnight
            | MoveFlags::PromoBishop
            | MoveFlags::PromoRook
            | MoveFlags::PromoQueen => {
                if SquareSet::BACK_RANKS.contains_square(to) != m.is_promo() {
                    return false;
                }
                if captured.is_some() {
                    pawn_attacks_by(from.as_set(), side).contains_square(to)
                } else {
                    from.pawn_push(side) == Some(to)
                }
            }
            MoveFlags::King => king_attacks(from).contains_square(to) && !self.state.threats.contains_square(to),
            MoveFlags::Knight | MoveFlags::Bishop | MoveFlags::Rook | MoveFlags::Queen => {
                attacks_by_type(m.piece_type(), from, occupied).contains_square(to)
            }
        }
    }

    /// Checks whether a pseudolegal move leaves the mover's king safe, without making it.
    pub fn is_legal(&self, m: Move) -> bool {
        debug_assert!(self.is_pseudo_legal(m), "{m:?} is not pseudolegal in {self}");
        let side = self.side;
        let layout = &self.state.piece_layout;
        let from = m.from();
        let to = m.to();
        let king = layout.king_sq(side);
        let them = layout.colours[!side];
        let diagonal = layout.diagonal_sliders() & them;
        let orthogonal = layout.orthogonal_sliders() & them;

        if m.is_castle() {
            // transit squares were checked when the move was generated.
            return !self.state.threats.contains_square(to);
        }

        if m.is_ep() {
            let Some(captured_sq) = to.pawn_push(!side) else {
                return false;
            };
            // a knight or pawn checker survives unless it is the pawn being taken.
            let stepping_checkers = self.state.checkers
                & (layout.pieces[PieceType::Knight] | layout.pieces[PieceType::Pawn]);
            if (stepping_checkers - captured_sq.as_set()).non_empty() {
                return false;
            }
            let occ_after = layout.occupied() ^ from.as_set() ^ to.as_set() ^ captured_sq.as_set();
            return (bishop_attacks(king, occ_after) & diagonal).is_empty()
                && (rook_attacks(king, occ_after) & orthogonal).is_empty();
        }

        if from == king {
            let without_king = layout.occupied() ^ king.as_set();
            return match side {
                Colour::White => !layout.sq_attacked_by::<Black>(to, without_king),
                Colour::Black => !layout.sq_attacked_by::<White>(to, without_king),
            };
        }

        if self.state.checkers.many() {
            return false;
        }

        if self.state.pinned.contains_square(from) && !RAY_FULL[from][to].contains_square(king) {
            return false;
        }

        let Some(checker) = self.state.checkers.first() else {
            return true;
        };
        (RAY_BETWEEN[king][checker] | self.state.checkers).contains_square(to)
    }

    /// Plays a move, recording the feature changes in `update_buffer`.
    /// Returns `false`, leaving the position untouched, if the move would leave
    /// the mover's king in check.
    pub fn make_move_base(&mut self, m: Move, update_buffer: &mut UpdateBuffer) -> bool {
        let from = m.from();
        let to = m.to();
        let side = self.side;
        let Some(piece) = self.state.mailbox[from] else {
            debug_assert!(false, "no piece on {from} for {m:?} in {self}");
            return false;
        };
        let captured = self.captured_piece(m);

        *update_buffer = UpdateBuffer::default();
        if m.is_castle() {
            let (rook_from, rook_to) = m.castling_rook_squares();
            update_buffer.move_piece(from, to, piece);
            update_buffer.move_piece(rook_from, rook_to, Piece::new(side, PieceType::Rook));
        } else if m.is_ep() {
            if let (Some(captured), Some(captured_sq)) = (captured, to.pawn_push(!side)) {
                update_buffer.clear_piece(captured_sq, captured);
            }
            update_buffer.move_piece(from, to, piece);
        } else {
            if let Some(captured) = captured {
                update_buffer.clear_piece(to, captured);
            }
            if let Some(promo) = m.promotion_type() {
                update_buffer.clear_piece(from, piece);
                update_buffer.add_piece(to, Piece::new(side, promo));
            } else {
                update_buffer.move_piece(from, to, piece);
            }
        }

        self.history.push(self.state.clone());

        let layout = &mut self.state.piece_layout;
        for f in update_buffer.subs().iter().chain(update_buffer.adds()) {
            layout.toggle(f.sq, f.piece);
        }
        if layout.sq_attacked(layout.king_sq(side), !side) {
            if let Some(prev) = self.history.pop() {
                self.state = prev;
            }
            *update_buffer = UpdateBuffer::default();
            return false;
        }

        let keys = &mut self.state.keys;
        let mut toggle_key = |sq: Square, piece: Piece| {
            let k = piece_key(piece, sq);
            keys.key ^= k;
            if piece.piece_type() == PieceType::Pawn {
                keys.pawn_key ^= k;
            } else {
                keys.non_pawn_key[piece.colour()] ^= k;
            }
        };
        for f in update_buffer.subs() {
            self.state.mailbox[f.sq] = None;
            toggle_key(f.sq, f.piece);
        }
        for f in update_buffer.adds() {
            self.state.mailbox[f.sq] = Some(f.piece);
            toggle_key(f.sq, f.piece);
        }

        if captured.is_some() || piece.piece_type() == PieceType::Pawn {
            self.state.fifty_move_counter = 0;
        } else {
            self.state.fifty_move_counter = self.state.fifty_move_counter.saturating_add(1);
        }

        if let Some(old_ep) = self.state.ep_square.take() {
            self.state.keys.key ^= EP_KEYS[old_ep];
        }
        if m.is_double_push() {
            let skipped = from.pawn_push(side).filter(|&ep| self.ep_capturable(ep, side));
            if let Some(ep) = skipped {
                self.state.ep_square = Some(ep);
                self.state.keys.key ^= EP_KEYS[ep];
            }
        }

        let old_rights = self.state.castle_perm;
        self.state.castle_perm.remove(from);
        self.state.castle_perm.remove(to);
        if piece.piece_type() == PieceType::King {
            self.state.castle_perm.clear(side);
        }
        self.state.keys.key ^=
            CASTLE_KEYS[old_rights.hashkey_index()] ^ CASTLE_KEYS[self.state.castle_perm.hashkey_index()];

        self.state.keys.key ^= SIDE_KEY;
        self.side = !side;
        self.ply += 1;
        self.height += 1;

        self.refresh_check_info();

        true
    }

    /// Plays a move without tracking feature updates.
    pub fn make_move_simple(&mut self, m: Move) -> bool {
        self.make_move_base(m, &mut UpdateBuffer::default())
    }

    pub fn unmake_move_base(&mut self) {
        let Some(prev) = self.history.pop() else {
            debug_assert!(false, "unmake_move with empty history");
            return;
        };
        self.state = prev;
        self.side = !self.side;
        self.ply -= 1;
        self.height -= 1;
    }

    /// Plays a move, queueing the matching accumulator update.
    pub fn make_move(&mut self, m: Move, nnue: &mut NNUEState) -> bool {
        let mut update_buffer = UpdateBuffer::default();
        if !self.make_move_base(m, &mut update_buffer) {
            return false;
        }
        nnue.push(update_buffer);
        true
    }

    pub fn unmake_move(&mut self, nnue: &mut NNUEState) {
        nnue.pop();
        self.unmake_move_base();
    }

    /// Passes the turn. Must not be called in check.
    pub fn make_nullmove(&mut self) {
        debug_assert!(!self.in_check());
        self.history.push(self.state.clone());
        if let Some(ep) = self.state.ep_square.take() {
            self.state.keys.key ^= EP_KEYS[ep];
        }
        self.state.keys.key ^= SIDE_KEY;
        self.side = !self.side;
        self.ply += 1;
        self.height += 1;
        let layout = &self.state.piece_layout;
        self.state.checkers = SquareSet::EMPTY;
        self.state.pinned = layout.pinned(self.side);
        self.state.threats = layout.attacked_by(!self.side);
    }

    pub fn unmake_nullmove(&mut self) {
        self.unmake_move_base();
    }

    /// The hash key after `m`, ignoring en passant and castling changes. Good enough to prefetch with.
    pub fn key_after(&self, m: Move) -> u64 {
        let from = m.from();
        let to = m.to();
        let Some(piece) = self.state.mailbox[from] else {
            return self.state.keys.key ^ SIDE_KEY;
        };
        let landed = m.promotion_type().map_or(piece, |promo| Piece::new(self.side, promo));
        let mut key = self.state.keys.key ^ SIDE_KEY ^ piece_key(piece, from) ^ piece_key(landed, to);
        if let Some(captured) = self.state.mailbox[to] {
            key ^= piece_key(captured, to);
        }
        key
    }

    pub fn key_after_null_move(&self) -> u64 {
        let ep = self.state.ep_square.map_or(0, |ep| EP_KEYS[ep]);
        self.state.keys.key ^ SIDE_KEY ^ ep
    }

    /// Parses a move in long algebraic notation, resolving its flags against this
    /// position. Only legal moves are accepted.
    pub fn parse_uci(&self, uci: &str) -> Result<Move, MoveParseError> {
        if !(4..=5).contains(&uci.len()) || !uci.is_ascii() {
            return Err(MoveParseError::InvalidLength(uci.len()));
        }
        let square = |s: &str| s.parse::<Square>().map_err(|_| MoveParseError::InvalidSquare(s.to_string()));
        let from = square(&uci[0..2])?;
        let to = square(&uci[2..4])?;
        let promo = match uci.as_bytes().get(4) {
            None => None,
            Some(&c) => match PieceType::from_symbol(c) {
                Some(pt @ (PieceType::Knight | PieceType::Bishop | PieceType::Rook | PieceType::Queen)) => {
                    Some(pt)
                }
                _ => return Err(MoveParseError::InvalidPromotionPiece(c as char)),
            },
        };

        self.legal_moves()
            .into_iter()
            .find(|m| m.from() == from && m.to() == to && m.promotion_type() == promo)
            .ok_or_else(|| MoveParseError::IllegalMove(uci.to_string()))
    }

    pub fn legal_moves(&self) -> ArrayVec<Move, MAX_POSITION_MOVES> {
        let mut move_list = MoveList::new();
        self.generate_moves(&mut move_list);
        move_list.iter_moves().filter(|&m| self.is_legal(m)).collect()
    }

    /// Has the current position occurred before? Inside the search tree a single
    /// earlier occurrence is enough; before the root it takes two.
    pub fn is_repetition(&self) -> bool {
        let mut counter = 0;
        let moves_since_zeroing = self.state.fifty_move_counter as usize;
        // the earliest possible repetition is four plies back.
        for (dist_back, prev) in
            self.history.iter().rev().enumerate().take(moves_since_zeroing).skip(3).step_by(2)
        {
            if prev.keys.key == self.state.keys.key {
                if dist_back < self.height {
                    return true;
                }
                counter += 1;
                if counter >= 2 {
                    return true;
                }
            }
        }
        false
    }

    /// Fifty-move rule (unless the side to move is mated), dead material, or repetition.
    pub fn is_draw(&self) -> bool {
        if self.state.fifty_move_counter >= 100 && (!self.in_check() || !self.legal_moves().is_empty()) {
            return true;
        }
        self.state.piece_layout.is_material_draw() || self.is_repetition()
    }

    /// Could the side to move force a repetition with a single reversible move?
    /// Cycles reaching back past the root only count if the repeating move is ours.
    pub fn has_game_cycle(&self, height: usize) -> bool {
        let end = std::cmp::min(self.state.fifty_move_counter as usize, self.history.len());
        if end < 3 {
            return false;
        }

        let old_key = |i: usize| self.history[self.history.len() - i].keys.key;
        let occupied = self.state.piece_layout.occupied();
        let original_key = self.state.keys.key;

        let mut other = !(original_key ^ old_key(1));
        for i in (3..=end).step_by(2) {
            let curr_key = old_key(i);
            other ^= !(curr_key ^ old_key(i - 1));
            if other != 0 {
                continue;
            }

            let Some(mv) = cuckoo::lookup(original_key ^ curr_key) else {
                continue;
            };

            if (occupied & RAY_BETWEEN[mv.from()][mv.to()]).is_empty() {
                if height > i {
                    return true;
                }
                let piece = self.state.mailbox[mv.from()].or(self.state.mailbox[mv.to()]);
                return piece.is_some_and(|p| p.colour() == self.side);
            }
        }

        false
    }
}

impl Display for Board {
    /// Writes the position as a FEN.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            let mut gap = 0;
            for file in 0..8 {
                let sq = Square::new(rank * 8 + file).unwrap_or_default();
                match self.state.mailbox[sq] {
                    Some(piece) => {
                        if gap > 0 {
                            write!(f, "{gap}")?;
                            gap = 0;
                        }
                        write!(f, "{piece}")?;
                    }
                    None => gap += 1,
                }
            }
            if gap > 0 {
                write!(f, "{gap}")?;
            }
            if rank > 0 {
                write!(f, "/")?;
            }
        }
        let ep = self.state.ep_square.map_or_else(|| "-".to_string(), |sq| sq.to_string());
        write!(
            f,
            " {} {} {ep} {} {}",
            self.side,
            self.state.castle_perm,
            self.state.fifty_move_counter,
            self.full_move_number()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FENS: [&str; 6] = [
        Board::STARTING_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    ];

    #[test]
    fn fen_round_trip() {
        for fen in FENS {
            assert_eq!(Board::from_fen(fen).unwrap().to_string(), fen);
        }
    }

    #[test]
    fn make_unmake_restores_everything() {
        for fen in FENS {
            let mut board = Board::from_fen(fen).unwrap();
            let before = board.clone();
            let mut ml = MoveList::new();
            board.generate_moves(&mut ml);
            for m in ml.iter_moves() {
                if board.make_move_simple(m) {
                    board.unmake_move_base();
                }
                assert_eq!(board, before, "{m:?} in {fen}");
            }
        }
    }

    #[test]
    fn incremental_keys_match_from_scratch() {
        fn walk(board: &mut Board, depth: usize) {
            assert_eq!(board.state.keys, board.generate_keys(), "{board}");
            assert!(board.check_validity().is_ok(), "{board}");
            if depth == 0 {
                return;
            }
            let mut ml = MoveList::new();
            board.generate_moves(&mut ml);
            for m in ml.iter_moves() {
                if board.make_move_simple(m) {
                    walk(board, depth - 1);
                    board.unmake_move_base();
                }
            }
        }
        for fen in FENS {
            walk(&mut Board::from_fen(fen).unwrap(), 2);
        }
    }

    #[test]
    fn illegal_moves_are_refused() {
        // the knight on e2 is pinned by the rook on e8.
        let mut board = Board::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        let before = board.clone();
        let pinned = Move::new(Square::E2, Square::C3, MoveFlags::Knight);
        assert!(board.is_pseudo_legal(pinned));
        assert!(!board.is_legal(pinned));
        assert!(!board.make_move_simple(pinned));
        assert_eq!(board, before);

        let king_step = Move::new(Square::E1, Square::F2, MoveFlags::King);
        assert!(board.is_legal(king_step));
        assert!(board.make_move_simple(king_step));
        assert_eq!(board.turn(), Colour::Black);
    }

    #[test]
    fn en_passant_square_only_when_capturable() {
        let mut board = Board::default();
        assert!(board.make_move_simple(board.parse_uci("e2e4").unwrap()));
        assert_eq!(board.ep_sq(), None);

        let mut board = Board::from_fen("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1").unwrap();
        assert!(board.make_move_simple(board.parse_uci("e2e4").unwrap()));
        assert_eq!(board.ep_sq(), Some(Square::E3));
        let ep = board.parse_uci("d4e3").unwrap();
        assert!(ep.is_ep());
        assert!(board.make_move_simple(ep));
        assert_eq!(board.piece_at(Square::E4), None);
        assert_eq!(board.piece_at(Square::E3), Some(Piece::BP));
    }

    #[test]
    fn en_passant_revealing_rank_check_is_illegal() {
        let board = Board::from_fen("8/8/8/K2pP2r/8/8/8/7k w - d6 0 1").unwrap();
        let ep = Move::new(Square::E5, Square::D6, MoveFlags::EnPassant);
        assert!(board.is_pseudo_legal(ep));
        assert!(!board.is_legal(ep));
        assert!(board.parse_uci("e5d6").is_err());
    }

    #[test]
    fn castling_moves_the_rook_and_drops_rights() {
        let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let castle = board.parse_uci("e1g1").unwrap();
        assert!(castle.is_castle());
        assert!(board.make_move_simple(castle));
        assert_eq!(board.piece_at(Square::F1), Some(Piece::WR));
        assert_eq!(board.piece_at(Square::G1), Some(Piece::WK));
        assert_eq!(board.castling_rights().to_string(), "kq");
        assert!(board.make_move_simple(board.parse_uci("a8a1").unwrap()));
        assert_eq!(board.castling_rights().to_string(), "k");
        assert_eq!(board.keys().key, board.generate_keys().key);
    }

    #[test]
    fn castling_through_attack_is_not_generated() {
        let board = Board::from_fen("4k3/8/8/8/8/8/5r2/R3K2R w KQ - 0 1").unwrap();
        assert!(board.parse_uci("e1g1").is_err());
        assert!(board.parse_uci("e1c1").is_ok());
    }

    #[test]
    fn move_parsing_errors() {
        let board = Board::default();
        assert_eq!(board.parse_uci("e2"), Err(MoveParseError::InvalidLength(2)));
        assert_eq!(board.parse_uci("z2e4"), Err(MoveParseError::InvalidSquare("z2".into())));
        assert_eq!(board.parse_uci("e2e5"), Err(MoveParseError::IllegalMove("e2e5".into())));
        assert_eq!(board.parse_uci("e7e8k"), Err(MoveParseError::InvalidPromotionPiece('k')));
        let promo = Board::from_fen("8/4P1k1/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(promo.parse_uci("e7e8n").unwrap().promotion_type(), Some(PieceType::Knight));
        assert!(promo.parse_uci("e7e8").is_err());
    }

    #[test]
    fn repetition_and_fifty_move_draws() {
        let mut board = Board::default();
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            assert!(board.make_move_simple(board.parse_uci(uci).unwrap()));
        }
        // one earlier occurrence counts once we are inside a search.
        assert!(board.is_repetition());
        board.zero_height();
        assert!(!board.is_repetition());
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            assert!(board.make_move_simple(board.parse_uci(uci).unwrap()));
        }
        board.zero_height();
        assert!(board.is_repetition());
        assert!(board.is_draw());

        let fifty = Board::from_fen("4k3/8/8/8/8/8/R7/4K3 w - - 100 80").unwrap();
        assert!(fifty.is_draw());
        let mated = Board::from_fen("R3k3/8/4K3/8/8/8/8/8 b - - 100 80").unwrap();
        assert!(mated.legal_moves().is_empty());
        assert!(!mated.is_draw());
    }

    #[test]
    fn upcoming_repetition_is_detected() {
        let mut board = Board::default();
        for uci in ["g1f3", "g8f6", "f3g1"] {
            assert!(board.make_move_simple(board.parse_uci(uci).unwrap()));
        }
        // black can play f6g8 and repeat the start position.
        assert!(board.has_game_cycle(board.height()));
        let fresh = Board::default();
        assert!(!fresh.has_game_cycle(0));
    }

    #[test]
    fn null_move_round_trip() {
        let mut board = Board::from_fen("4k3/8/8/8/3p4/8/4P3/4K3 w - - 0 1").unwrap();
        assert!(board.make_move_simple(board.parse_uci("e2e4").unwrap()));
        let before = board.clone();
        let predicted = board.key_after_null_move();
        board.make_nullmove();
        assert_eq!(board.key(), predicted);
        assert_eq!(board.key(), board.generate_keys().key);
        assert_eq!(board.ep_sq(), None);
        board.unmake_nullmove();
        assert_eq!(board, before);
    }

    #[test]
    fn key_after_predicts_quiet_moves_and_captures() {
        let mut board = Board::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        for uci in ["e4d5", "e1d2"] {
            let m = board.parse_uci(uci).unwrap();
            let predicted = board.key_after(m);
            assert!(board.make_move_simple(m));
            assert_eq!(board.key(), predicted, "{uci}");
            board.unmake_move_base();
        }
    }
}
