use thiserror::Error;

use crate::chess::piece::Colour;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenParseError {
    #[error("FEN string is empty")]
    MissingBoard,
    #[error("expected 8 ranks in the board description, found {0}")]
    BoardSegments(usize),
    #[error("a rank in the board description does not describe exactly 8 squares")]
    BadSquaresInSegment,
    #[error("two digits are adjacent in the board description")]
    AdjacentDigits,
    #[error("unexpected character {0:?} in the board description")]
    UnexpectedCharacter(char),
    #[error("pawns cannot stand on the first or eighth rank")]
    PawnsOnBackranks,
    #[error("{colour:?} has no king")]
    MissingKing { colour: Colour },
    #[error("{colour:?} has more than one king")]
    DuplicateKings { colour: Colour },
    #[error("missing side-to-move field")]
    MissingSide,
    #[error("invalid side to move {0:?}, expected \"w\" or \"b\"")]
    InvalidSide(String),
    #[error("missing castling field")]
    MissingCastling,
    #[error("invalid castling rights {0:?}")]
    InvalidCastling(String),
    #[error("missing en passant field")]
    MissingEnPassant,
    #[error("invalid en passant square {0:?}")]
    InvalidEnPassant(String),
    #[error("missing halfmove clock")]
    MissingHalfmoveClock,
    #[error("invalid halfmove clock {0:?}")]
    InvalidHalfmoveClock(String),
    #[error("missing fullmove number")]
    MissingFullmoveNumber,
    #[error("invalid fullmove number {0:?}")]
    InvalidFullmoveNumber(String),
    #[error("the side not to move is in check")]
    WaitingInCheck,
    #[error("unexpected tokens after the fullmove number")]
    ExtraTokens,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    #[error("invalid move length {0}, expected 4 or 5 characters")]
    InvalidLength(usize),
    #[error("invalid square {0:?}")]
    InvalidSquare(String),
    #[error("invalid promotion piece {0:?}")]
    InvalidPromotionPiece(char),
    #[error("illegal move {0}")]
    IllegalMove(String),
}

#[derive(Error, Debug)]
pub enum NetworkLoadError {
    #[error("failed to read network file: {0}")]
    Io(#[from] std::io::Error),
    #[error("network file is {actual} bytes, expected {expected}")]
    WrongSize { expected: usize, actual: usize },
    #[error("output weight {index} is {value}, outside the range [-{limit}, {limit}]")]
    OutputWeightOutOfRange { index: usize, value: i16, limit: i16 },
}

#[derive(Error, Debug)]
pub enum UciError {
    #[error(transparent)]
    Fen(#[from] FenParseError),
    #[error(transparent)]
    Move(#[from] MoveParseError),
    #[error(transparent)]
    Network(#[from] NetworkLoadError),
    #[error("unexpected end of command, expected {0}")]
    UnexpectedEnd(&'static str),
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: String, value: String },
    #[error("unknown option {0:?}")]
    UnknownOption(String),
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
}

/// A broken internal invariant of a position, found by `Board::check_validity`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid position: {0}")]
pub struct PositionValidityError(pub String);
