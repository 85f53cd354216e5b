use crate::chess::{chessmove::Move, types::ContHistIndex};

/// Per-ply search state, indexed by distance from the root.
#[derive(Default, Clone, Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct StackEntry {
    /// Corrected static evaluation, or `VALUE_NONE` when in check.
    pub eval: i32,
    /// The move excluded by a singular-extension verification search.
    pub excluded: Option<Move>,
    pub best_move: Option<Move>,
    pub searching: Option<Move>,
    pub searching_tactical: bool,
    pub dextensions: i32,
    pub ttpv: bool,
    pub conthist_index: ContHistIndex,
    pub reduction: i32,
}
