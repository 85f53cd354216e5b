use std::fmt;

use crate::evaluation::{MATE_SCORE, is_mate_score};

pub struct ScoreFormatWrapper(i32);
impl fmt::Display for ScoreFormatWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_mate_score(self.0) {
            let plies_to_mate = MATE_SCORE - self.0.abs();
            let moves_to_mate = (plies_to_mate + 1) / 2;
            if self.0 > 0 { write!(f, "mate {moves_to_mate}") } else { write!(f, "mate -{moves_to_mate}") }
        } else {
            write!(f, "cp {}", self.0)
        }
    }
}

/// Formats a score from the side to move's perspective as a UCI `score` value.
pub const fn format_score(score: i32) -> ScoreFormatWrapper {
    ScoreFormatWrapper(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{mate_in, mated_in};

    #[test]
    fn scores_render_as_uci() {
        assert_eq!(format_score(37).to_string(), "cp 37");
        assert_eq!(format_score(-120).to_string(), "cp -120");
        assert_eq!(format_score(mate_in(1)).to_string(), "mate 1");
        assert_eq!(format_score(mate_in(3)).to_string(), "mate 2");
        assert_eq!(format_score(mated_in(2)).to_string(), "mate -1");
    }
}
