use std::fmt::Display;

use crate::errors::UciError;

/// Every tunable margin of the search, evaluation post-processing, and time manager.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub aspiration_window: i32,
    pub rfp_margin: i32,
    pub rfp_improving_margin: i32,
    pub rfp_depth: i32,
    pub nmp_improving_margin: i32,
    pub nmp_base_reduction: i32,
    pub nmp_reduction_depth_divisor: i32,
    pub nmp_reduction_eval_divisor: i32,
    pub max_nmp_eval_reduction: i32,
    pub nmp_verification_depth: i32,
    pub see_quiet_margin: i32,
    pub see_tactical_margin: i32,
    pub see_depth: i32,
    pub futility_coeff_0: i32,
    pub futility_coeff_1: i32,
    pub futility_depth: i32,
    pub razoring_coeff_0: i32,
    pub razoring_coeff_1: i32,
    pub razoring_depth: i32,
    pub lmp_depth: i32,
    pub probcut_margin: i32,
    pub probcut_improving_margin: i32,
    pub probcut_reduction: i32,
    pub probcut_min_depth: i32,
    pub singularity_depth: i32,
    pub dext_margin: i32,
    pub max_dextensions: i32,
    pub lmr_base: f64,
    pub lmr_division: f64,
    pub lmr_refutation_mul: i32,
    pub lmr_non_pv_mul: i32,
    pub lmr_ttpv_mul: i32,
    pub lmr_cut_node_mul: i32,
    pub lmr_non_improving_mul: i32,
    pub lmr_tt_capture_mul: i32,
    pub history_lmr_divisor: i32,
    pub qs_see_bound: i32,
    pub main_see_bound: i32,
    pub qs_futility: i32,
    pub see_stat_score_mul: i32,
    pub do_deeper_base_margin: i32,
    pub do_deeper_depth_margin: i32,
    pub history_pruning_depth: i32,
    pub history_pruning_margin: i32,
    pub history_bonus_mul: i32,
    pub history_bonus_offset: i32,
    pub history_bonus_max: i32,
    pub history_malus_mul: i32,
    pub history_malus_offset: i32,
    pub history_malus_max: i32,
    pub pawn_corrhist_weight: i32,
    pub nonpawn_corrhist_weight: i32,
    pub see_pawn_value: i32,
    pub see_knight_value: i32,
    pub see_bishop_value: i32,
    pub see_rook_value: i32,
    pub see_queen_value: i32,
    pub material_scale_base: i32,
    pub default_moves_to_go: u32,
    pub hard_window_frac: u32,
    pub optimal_window_frac: u32,
    pub increment_frac: u32,
    pub node_tm_subtree_multiplier: u32,
    pub fail_low_tm_bonus: u32,
}

impl Config {
    pub const fn default() -> Self {
        Self {
            aspiration_window: 6,
            rfp_margin: 64,
            rfp_improving_margin: 50,
            rfp_depth: 8,
            nmp_improving_margin: 72,
            nmp_base_reduction: 4,
            nmp_reduction_depth_divisor: 3,
            nmp_reduction_eval_divisor: 192,
            max_nmp_eval_reduction: 4,
            nmp_verification_depth: 12,
            see_quiet_margin: -78,
            see_tactical_margin: -22,
            see_depth: 9,
            futility_coeff_0: 82,
            futility_coeff_1: 101,
            futility_depth: 6,
            razoring_coeff_0: 427,
            razoring_coeff_1: 167,
            razoring_depth: 4,
            lmp_depth: 8,
            probcut_margin: 227,
            probcut_improving_margin: 58,
            probcut_reduction: 3,
            probcut_min_depth: 5,
            singularity_depth: 8,
            dext_margin: 12,
            max_dextensions: 12,
            lmr_base: 85.0,
            lmr_division: 206.0,
            lmr_refutation_mul: 1000,
            lmr_non_pv_mul: 992,
            lmr_ttpv_mul: 1202,
            lmr_cut_node_mul: 1284,
            lmr_non_improving_mul: 689,
            lmr_tt_capture_mul: 1141,
            history_lmr_divisor: 12065,
            qs_see_bound: -211,
            main_see_bound: 0,
            qs_futility: 220,
            see_stat_score_mul: 26,
            do_deeper_base_margin: 59,
            do_deeper_depth_margin: 10,
            history_pruning_depth: 7,
            history_pruning_margin: -3321,
            history_bonus_mul: 251,
            history_bonus_offset: 172,
            history_bonus_max: 2193,
            history_malus_mul: 225,
            history_malus_offset: 278,
            history_malus_max: 1244,
            pawn_corrhist_weight: 1191,
            nonpawn_corrhist_weight: 1319,
            see_pawn_value: 211,
            see_knight_value: 446,
            see_bishop_value: 465,
            see_rook_value: 721,
            see_queen_value: 1348,
            material_scale_base: 805,
            default_moves_to_go: 26,
            hard_window_frac: 250,
            optimal_window_frac: 60,
            increment_frac: 80,
            node_tm_subtree_multiplier: 135,
            fail_low_tm_bonus: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default()
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Search parameters:")?;
        for (id, value) in self.ids_with_values() {
            writeln!(f, "    {id}: {value}")?;
        }
        Ok(())
    }
}

macro_rules! id_parser_gen {
    ($($option:ident = [$($field:tt)*]),*) => {
        vec![$(
            (stringify!($option), Box::new(|s: &str| {
                if let Ok(res) = s.parse() {
                    $($field)* = res;
                    true
                } else {
                    false
                }
            })),)
            *
        ]
    }
}

macro_rules! id_value_gen {
    ($($option:ident = [$field:expr]),*) => {
        vec![$(
            (stringify!($option), f64::from($field)),)
            *
        ]
    }
}

type LazyFieldParser<'a> = Box<dyn FnMut(&str) -> bool + 'a>;

impl Config {
    pub fn ids_with_parsers(&mut self) -> Vec<(&'static str, LazyFieldParser<'_>)> {
        id_parser_gen![
            ASPIRATION_WINDOW = [self.aspiration_window],
            RFP_MARGIN = [self.rfp_margin],
            RFP_IMPROVING_MARGIN = [self.rfp_improving_margin],
            RFP_DEPTH = [self.rfp_depth],
            NMP_IMPROVING_MARGIN = [self.nmp_improving_margin],
            NMP_BASE_REDUCTION = [self.nmp_base_reduction],
            NMP_REDUCTION_DEPTH_DIVISOR = [self.nmp_reduction_depth_divisor],
            NMP_REDUCTION_EVAL_DIVISOR = [self.nmp_reduction_eval_divisor],
            MAX_NMP_EVAL_REDUCTION = [self.max_nmp_eval_reduction],
            NMP_VERIFICATION_DEPTH = [self.nmp_verification_depth],
            SEE_QUIET_MARGIN = [self.see_quiet_margin],
            SEE_TACTICAL_MARGIN = [self.see_tactical_margin],
            SEE_DEPTH = [self.see_depth],
            FUTILITY_COEFF_0 = [self.futility_coeff_0],
            FUTILITY_COEFF_1 = [self.futility_coeff_1],
            FUTILITY_DEPTH = [self.futility_depth],
            RAZORING_COEFF_0 = [self.razoring_coeff_0],
            RAZORING_COEFF_1 = [self.razoring_coeff_1],
            RAZORING_DEPTH = [self.razoring_depth],
            LMP_DEPTH = [self.lmp_depth],
            PROBCUT_MARGIN = [self.probcut_margin],
            PROBCUT_IMPROVING_MARGIN = [self.probcut_improving_margin],
            PROBCUT_REDUCTION = [self.probcut_reduction],
            PROBCUT_MIN_DEPTH = [self.probcut_min_depth],
            SINGULARITY_DEPTH = [self.singularity_depth],
            DOUBLE_EXTENSION_MARGIN = [self.dext_margin],
            MAX_DOUBLE_EXTENSIONS = [self.max_dextensions],
            LMR_BASE = [self.lmr_base],
            LMR_DIVISION = [self.lmr_division],
            LMR_REFUTATION_MUL = [self.lmr_refutation_mul],
            LMR_NON_PV_MUL = [self.lmr_non_pv_mul],
            LMR_TTPV_MUL = [self.lmr_ttpv_mul],
            LMR_CUT_NODE_MUL = [self.lmr_cut_node_mul],
            LMR_NON_IMPROVING_MUL = [self.lmr_non_improving_mul],
            LMR_TT_CAPTURE_MUL = [self.lmr_tt_capture_mul],
            HISTORY_LMR_DIVISOR = [self.history_lmr_divisor],
            QS_SEE_BOUND = [self.qs_see_bound],
            MAIN_SEE_BOUND = [self.main_see_bound],
            QS_FUTILITY = [self.qs_futility],
            SEE_STAT_SCORE_MUL = [self.see_stat_score_mul],
            DO_DEEPER_BASE_MARGIN = [self.do_deeper_base_margin],
            DO_DEEPER_DEPTH_MARGIN = [self.do_deeper_depth_margin],
            HISTORY_PRUNING_DEPTH = [self.history_pruning_depth],
            HISTORY_PRUNING_MARGIN = [self.history_pruning_margin],
            HISTORY_BONUS_MUL = [self.history_bonus_mul],
            HISTORY_BONUS_OFFSET = [self.history_bonus_offset],
            HISTORY_BONUS_MAX = [self.history_bonus_max],
            HISTORY_MALUS_MUL = [self.history_malus_mul],
            HISTORY_MALUS_OFFSET = [self.history_malus_offset],
            HISTORY_MALUS_MAX = [self.history_malus_max],
            PAWN_CORRHIST_WEIGHT = [self.pawn_corrhist_weight],
            NONPAWN_CORRHIST_WEIGHT = [self.nonpawn_corrhist_weight],
            SEE_PAWN_VALUE = [self.see_pawn_value],
            SEE_KNIGHT_VALUE = [self.see_knight_value],
            SEE_BISHOP_VALUE = [self.see_bishop_value],
            SEE_ROOK_VALUE = [self.see_rook_value],
            SEE_QUEEN_VALUE = [self.see_queen_value],
            MATERIAL_SCALE_BASE = [self.material_scale_base],
            DEFAULT_MOVES_TO_GO = [self.default_moves_to_go],
            HARD_WINDOW_FRAC = [self.hard_window_frac],
            OPTIMAL_WINDOW_FRAC = [self.optimal_window_frac],
            INCREMENT_FRAC = [self.increment_frac],
            NODE_TM_SUBTREE_MULTIPLIER = [self.node_tm_subtree_multiplier],
            FAIL_LOW_TM_BONUS = [self.fail_low_tm_bonus]
        ]
    }

    pub fn ids_with_values(&self) -> Vec<(&'static str, f64)> {
        id_value_gen![
            ASPIRATION_WINDOW = [self.aspiration_window],
            RFP_MARGIN = [self.rfp_margin],
            RFP_IMPROVING_MARGIN = [self.rfp_improving_margin],
            RFP_DEPTH = [self.rfp_depth],
            NMP_IMPROVING_MARGIN = [self.nmp_improving_margin],
            NMP_BASE_REDUCTION = [self.nmp_base_reduction],
            NMP_REDUCTION_DEPTH_DIVISOR = [self.nmp_reduction_depth_divisor],
            NMP_REDUCTION_EVAL_DIVISOR = [self.nmp_reduction_eval_divisor],
            MAX_NMP_EVAL_REDUCTION = [self.max_nmp_eval_reduction],
            NMP_VERIFICATION_DEPTH = [self.nmp_verification_depth],
            SEE_QUIET_MARGIN = [self.see_quiet_margin],
            SEE_TACTICAL_MARGIN = [self.see_tactical_margin],
            SEE_DEPTH = [self.see_depth],
            FUTILITY_COEFF_0 = [self.futility_coeff_0],
            FUTILITY_COEFF_1 = [self.futility_coeff_1],
            FUTILITY_DEPTH = [self.futility_depth],
            RAZORING_COEFF_0 = [self.razoring_coeff_0],
            RAZORING_COEFF_1 = [self.razoring_coeff_1],
            RAZORING_DEPTH = [self.razoring_depth],
            LMP_DEPTH = [self.lmp_depth],
            PROBCUT_MARGIN = [self.probcut_margin],
            PROBCUT_IMPROVING_MARGIN = [self.probcut_improving_margin],
            PROBCUT_REDUCTION = [self.probcut_reduction],
            PROBCUT_MIN_DEPTH = [self.probcut_min_depth],
            SINGULARITY_DEPTH = [self.singularity_depth],
            DOUBLE_EXTENSION_MARGIN = [self.dext_margin],
            MAX_DOUBLE_EXTENSIONS = [self.max_dextensions],
            LMR_BASE = [self.lmr_base],
            LMR_DIVISION = [self.lmr_division],
            LMR_REFUTATION_MUL = [self.lmr_refutation_mul],
            LMR_NON_PV_MUL = [self.lmr_non_pv_mul],
            LMR_TTPV_MUL = [self.lmr_ttpv_mul],
            LMR_CUT_NODE_MUL = [self.lmr_cut_node_mul],
            LMR_NON_IMPROVING_MUL = [self.lmr_non_improving_mul],
            LMR_TT_CAPTURE_MUL = [self.lmr_tt_capture_mul],
            HISTORY_LMR_DIVISOR = [self.history_lmr_divisor],
            QS_SEE_BOUND = [self.qs_see_bound],
            MAIN_SEE_BOUND = [self.main_see_bound],
            QS_FUTILITY = [self.qs_futility],
            SEE_STAT_SCORE_MUL = [self.see_stat_score_mul],
            DO_DEEPER_BASE_MARGIN = [self.do_deeper_base_margin],
            DO_DEEPER_DEPTH_MARGIN = [self.do_deeper_depth_margin],
            HISTORY_PRUNING_DEPTH = [self.history_pruning_depth],
            HISTORY_PRUNING_MARGIN = [self.history_pruning_margin],
            HISTORY_BONUS_MUL = [self.history_bonus_mul],
            HISTORY_BONUS_OFFSET = [self.history_bonus_offset],
            HISTORY_BONUS_MAX = [self.history_bonus_max],
            HISTORY_MALUS_MUL = [self.history_malus_mul],
            HISTORY_MALUS_OFFSET = [self.history_malus_offset],
            HISTORY_MALUS_MAX = [self.history_malus_max],
            PAWN_CORRHIST_WEIGHT = [self.pawn_corrhist_weight],
            NONPAWN_CORRHIST_WEIGHT = [self.nonpawn_corrhist_weight],
            SEE_PAWN_VALUE = [self.see_pawn_value],
            SEE_KNIGHT_VALUE = [self.see_knight_value],
            SEE_BISHOP_VALUE = [self.see_bishop_value],
            SEE_ROOK_VALUE = [self.see_rook_value],
            SEE_QUEEN_VALUE = [self.see_queen_value],
            MATERIAL_SCALE_BASE = [self.material_scale_base],
            DEFAULT_MOVES_TO_GO = [self.default_moves_to_go],
            HARD_WINDOW_FRAC = [self.hard_window_frac],
            OPTIMAL_WINDOW_FRAC = [self.optimal_window_frac],
            INCREMENT_FRAC = [self.increment_frac],
            NODE_TM_SUBTREE_MULTIPLIER = [self.node_tm_subtree_multiplier],
            FAIL_LOW_TM_BONUS = [self.fail_low_tm_bonus]
        ]
    }

    /// Sets a parameter from its UCI name, case-insensitively.
    pub fn set_by_name(&mut self, name: &str, value: &str) -> Result<(), UciError> {
        let mut parsers = self.ids_with_parsers();
        let Some((_, parser)) = parsers.iter_mut().find(|(id, _)| id.eq_ignore_ascii_case(name)) else {
            return Err(UciError::UnknownOption(name.to_string()));
        };
        if parser(value) {
            Ok(())
        } else {
            Err(UciError::InvalidValue { name: name.to_string(), value: value.to_string() })
        }
    }

    /// `option` lines advertising every parameter, for the `uci` handshake.
    #[cfg(feature = "tuning")]
    pub fn uci_options(&self) -> String {
        #![allow(clippy::cast_possible_truncation)]
        let mut out = String::new();
        for (id, value) in self.ids_with_values() {
            let value = value as i64;
            let spread = value.abs().max(10);
            out.push_str(&format!(
                "option name {id} type spin default {value} min {} max {}\n",
                value - spread * 2,
                value + spread * 2
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn macro_hackery_same_length() {
        let mut sp = Config::default();
        let l1 = sp.ids_with_parsers().len();
        let l2 = sp.ids_with_values().len();
        assert_eq!(l1, l2);
    }

    #[test]
    fn parser_actually_works() {
        let mut sp = Config::default();
        let probcut_min_depth = sp.ids_with_values().iter().find(|(id, _)| *id == "PROBCUT_MIN_DEPTH").unwrap().1;
        assert!((probcut_min_depth - 5.0).abs() < f64::EPSILON);
        sp.set_by_name("probcut_min_depth", "10").unwrap();
        assert_eq!(sp.probcut_min_depth, 10);
        sp.set_by_name("LMR_BASE", "90.5").unwrap();
        assert!((sp.lmr_base - 90.5).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_names_and_values_are_rejected() {
        let mut sp = Config::default();
        assert!(sp.set_by_name("NOT_A_PARAMETER", "1").is_err());
        assert!(sp.set_by_name("RFP_MARGIN", "lots").is_err());
        assert_eq!(sp, Config::default());
    }
}
