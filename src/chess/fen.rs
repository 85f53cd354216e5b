use std::{num::NonZeroUsize, str::SplitWhitespace};

use crate::{
    chess::{
        piece::{Colour, Piece, PieceType},
        piecelayout::PieceLayout,
        squareset::SquareSet,
        types::{CastlingRights, Rank, Square},
    },
    errors::FenParseError,
};

/// The fields of a FEN record, checked for basic sanity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub board: PieceLayout,
    pub turn: Colour,
    pub castling: CastlingRights,
    pub ep: Option<Square>,
    pub halfmove: u8,
    pub fullmove: NonZeroUsize,
}

impl Fen {
    const FIRST_MOVE: NonZeroUsize = NonZeroUsize::MIN;

    /// Parses a FEN with all six fields and nothing after them.
    pub fn parse(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();
        let fen = Self::parse_fields(&mut tokens, true)?;
        if tokens.next().is_some() {
            return Err(FenParseError::ExtraTokens);
        }
        Ok(fen)
    }

    /// Parses a FEN where the move counters may be missing, as some GUIs send.
    pub fn parse_relaxed(fen: &str) -> Result<Self, FenParseError> {
        Self::parse_fields(&mut fen.split_whitespace(), false)
    }

    fn parse_fields(tokens: &mut SplitWhitespace<'_>, strict: bool) -> Result<Self, FenParseError> {
        let board = Self::parse_board(tokens.next().ok_or(FenParseError::MissingBoard)?)?;
        let turn = match tokens.next().ok_or(FenParseError::MissingSide)? {
            "w" => Colour::White,
            "b" => Colour::Black,
            other => return Err(FenParseError::InvalidSide(other.to_string())),
        };
        if board.sq_attacked(board.king_sq(!turn), turn) {
            return Err(FenParseError::WaitingInCheck);
        }
        let castling =
            Self::parse_castling(tokens.next().ok_or(FenParseError::MissingCastling)?, &board)?;
        let ep = Self::parse_ep(tokens.next().ok_or(FenParseError::MissingEnPassant)?, turn)?;

        let halfmove = match tokens.next() {
            // past 100 the game is already drawn.
            Some(s) => s
                .parse()
                .ok()
                .filter(|&clock: &u8| clock <= 100)
                .ok_or_else(|| FenParseError::InvalidHalfmoveClock(s.to_string()))?,
            None if strict => return Err(FenParseError::MissingHalfmoveClock),
            None => 0,
        };
        let fullmove = match tokens.next() {
            Some(s) => s.parse().map_err(|_| FenParseError::InvalidFullmoveNumber(s.to_string()))?,
            None if strict => return Err(FenParseError::MissingFullmoveNumber),
            None => Self::FIRST_MOVE,
        };

        Ok(Self { board, turn, castling, ep, halfmove, fullmove })
    }

    fn parse_board(text: &str) -> Result<PieceLayout, FenParseError> {
        let rows = text.split('/').collect::<Vec<_>>();
        if rows.len() != 8 {
            return Err(FenParseError::BoardSegments(rows.len()));
        }

        let mut layout = PieceLayout::default();
        for (row, rank) in rows.iter().zip((0..8u8).rev()) {
            let mut file = 0u8;
            let mut last_was_digit = false;
            for c in row.bytes() {
                if (b'1'..=b'8').contains(&c) {
                    if last_was_digit {
                        return Err(FenParseError::AdjacentDigits);
                    }
                    last_was_digit = true;
                    file += c - b'0';
                } else {
                    last_was_digit = false;
                    let piece = Piece::from_char(c)
                        .ok_or(FenParseError::UnexpectedCharacter(c as char))?;
                    let sq = Square::new(rank * 8 + file)
                        .filter(|_| file < 8)
                        .ok_or(FenParseError::BadSquaresInSegment)?;
                    layout.toggle(sq, piece);
                    file += 1;
                }
                if file > 8 {
                    return Err(FenParseError::BadSquaresInSegment);
                }
            }
            if file != 8 {
                return Err(FenParseError::BadSquaresInSegment);
            }
        }

        if (layout.pieces[PieceType::Pawn] & SquareSet::BACK_RANKS).non_empty() {
            return Err(FenParseError::PawnsOnBackranks);
        }
        for colour in Colour::all() {
            match layout.of_type(colour, PieceType::King).count() {
                0 => return Err(FenParseError::MissingKing { colour }),
                1 => {}
                _ => return Err(FenParseError::DuplicateKings { colour }),
            }
        }

        Ok(layout)
    }

    /// Rights whose king or rook is missing from its home square are dropped.
    fn parse_castling(text: &str, board: &PieceLayout) -> Result<CastlingRights, FenParseError> {
        let mut rights = CastlingRights::NONE;
        if text == "-" {
            return Ok(rights);
        }
        for c in text.bytes() {
            let (colour, rook_sq) = match c {
                b'K' => (Colour::White, Square::H1),
                b'Q' => (Colour::White, Square::A1),
                b'k' => (Colour::Black, Square::H8),
                b'q' => (Colour::Black, Square::A8),
                _ => return Err(FenParseError::InvalidCastling(text.to_string())),
            };
            let king_home = Square::E1.relative_to(colour);
            let rook = Piece::new(colour, PieceType::Rook);
            if board.piece_at(king_home) == Some(Piece::new(colour, PieceType::King))
                && board.piece_at(rook_sq) == Some(rook)
            {
                rights.set(rook_sq);
            }
        }
        Ok(rights)
    }

    fn parse_ep(text: &str, turn: Colour) -> Result<Option<Square>, FenParseError> {
        if text == "-" {
            return Ok(None);
        }
        let sq = text
            .parse::<Square>()
            .map_err(|_| FenParseError::InvalidEnPassant(text.to_string()))?;
        if sq.rank() != Rank::Six.relative_to(turn) {
            return Err(FenParseError::InvalidEnPassant(text.to_string()));
        }
        Ok(Some(sq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_fields() {
        let fen = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        assert_eq!(fen.turn, Colour::White);
        assert_eq!(fen.castling.to_string(), "KQkq");
        assert_eq!(fen.ep, None);
        assert_eq!(fen.board.occupied().count(), 32);
        assert_eq!(fen.fullmove.get(), 1);
    }

    #[test]
    fn malformed_boards_are_rejected() {
        let cases = [
            ("rnbqkbnr/pppppppp/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", FenParseError::BoardSegments(7)),
            ("rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", FenParseError::BadSquaresInSegment),
            ("rnbqkbnr/pppppppp/44/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", FenParseError::AdjacentDigits),
            ("rnbqkbnr/pppppppp/7/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", FenParseError::BadSquaresInSegment),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1", FenParseError::InvalidSide("x".into())),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQxq - 0 1", FenParseError::InvalidCastling("KQxq".into())),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e4 0 1", FenParseError::InvalidEnPassant("e4".into())),
            ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1 extra", FenParseError::ExtraTokens),
            ("rnbq1bnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQ - 0 1", FenParseError::MissingKing { colour: Colour::Black }),
        ];
        for (fen, err) in cases {
            assert_eq!(Fen::parse(fen), Err(err), "{fen}");
        }
    }

    #[test]
    fn side_not_to_move_in_check_is_rejected() {
        // white to move, but black's king is attacked by the rook.
        let fen = "4k3/8/8/8/8/8/8/4RK2 w - - 0 1";
        assert_eq!(Fen::parse(fen), Err(FenParseError::WaitingInCheck));
    }

    #[test]
    fn halfmove_clock_is_bounded() {
        assert_eq!(Fen::parse("4k3/8/8/8/8/8/8/4K3 w - - 100 90").unwrap().halfmove, 100);
        for clock in ["101", "255", "-1"] {
            let fen = format!("4k3/8/8/8/8/8/8/4K3 w - - {clock} 90");
            assert_eq!(Fen::parse(&fen), Err(FenParseError::InvalidHalfmoveClock(clock.to_string())));
        }
    }

    #[test]
    fn relaxed_parsing_defaults_counters() {
        let fen = Fen::parse_relaxed("4k3/8/8/8/8/8/8/4K3 b - -").unwrap();
        assert_eq!(fen.turn, Colour::Black);
        assert_eq!(fen.halfmove, 0);
        assert_eq!(fen.fullmove.get(), 1);
        assert!(Fen::parse("4k3/8/8/8/8/8/8/4K3 b - -").is_err());
    }
}
