use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use crate::{chess::chessmove::Move, search::parameters::Config, transpositiontable::Bound};

const MOVE_OVERHEAD: u64 = 10;

/// Slows down the stop decision while the best move keeps changing.
const STABILITY_MULTIPLIERS: [f64; 5] = [2.50, 1.20, 0.90, 0.80, 0.75];

#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub enum SearchLimit {
    #[default]
    Infinite,
    Depth(usize),
    Time(u64),
    Nodes(u64),
    SoftNodes {
        soft_limit: u64,
        hard_limit: u64,
    },
    Dynamic {
        our_clock: u64,
        their_clock: u64,
        our_inc: u64,
        their_inc: u64,
        moves_to_go: Option<u64>,
    },
}

impl SearchLimit {
    pub const fn depth(&self) -> Option<usize> {
        match self {
            Self::Depth(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether this limit caps the total number of nodes searched.
    pub const fn is_node_limited(&self) -> bool {
        matches!(self, Self::Nodes(_) | Self::SoftNodes { .. })
    }

    /// The (optimal, maximum) thinking time in milliseconds for a clock.
    pub fn compute_time_windows(our_clock: u64, moves_to_go: Option<u64>, our_inc: u64, conf: &Config) -> (u64, u64) {
        let max_time = our_clock.saturating_sub(MOVE_OVERHEAD);
        let divisor = moves_to_go.map_or(u64::from(conf.default_moves_to_go), |mtg| mtg.max(1));
        let window = our_clock / divisor + our_inc * u64::from(conf.increment_frac) / 100;
        let opt_time = (window * u64::from(conf.optimal_window_frac) / 100).min(max_time);
        let hard_time = (window * u64::from(conf.hard_window_frac) / 100).min(max_time);
        (opt_time, hard_time)
    }
}

#[derive(Clone, Debug)]
pub struct TimeManager {
    /// The starting time of the search.
    start_time: Instant,
    limit: SearchLimit,
    /// The maximum time that the search may last for.
    max_time: Duration,
    /// The time after which we will stop upon completing a depth.
    opt_time: Duration,
    /// `opt_time` as first computed, before any scaling.
    base_opt_time: Duration,
    /// The best move from the last iteration of search.
    prev_move: Option<Move>,
    /// The number of ID iterations for which the best move remained.
    stability: usize,
    /// Whether an aspiration window failed low during the last iteration.
    failed_low: bool,
}

impl Default for TimeManager {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            limit: SearchLimit::Infinite,
            max_time: Duration::ZERO,
            opt_time: Duration::ZERO,
            base_opt_time: Duration::ZERO,
            prev_move: None,
            stability: 0,
            failed_low: false,
        }
    }
}

impl TimeManager {
    /// Start the clock for a search under `limit`.
    pub fn start(&mut self, limit: SearchLimit, conf: &Config) {
        self.start_time = Instant::now();
        self.prev_move = None;
        self.stability = 0;
        self.failed_low = false;
        let (opt, max) = match limit {
            SearchLimit::Time(ms) => (ms, ms),
            SearchLimit::Dynamic { our_clock, our_inc, moves_to_go, .. } => {
                SearchLimit::compute_time_windows(our_clock, moves_to_go, our_inc, conf)
            }
            _ => (0, 0),
        };
        self.opt_time = Duration::from_millis(opt);
        self.base_opt_time = self.opt_time;
        self.max_time = Duration::from_millis(max);
        self.limit = limit;
    }

    pub const fn limit(&self) -> &SearchLimit {
        &self.limit
    }

    pub const fn is_dynamic(&self) -> bool {
        matches!(self.limit, SearchLimit::Dynamic { .. })
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub const fn optimal_time(&self) -> Duration {
        self.opt_time
    }

    pub const fn maximum_time(&self) -> Duration {
        self.max_time
    }

    /// Check the hard limits. Node limits are checked by every thread,
    /// the clock only when `check_time` is set.
    pub fn check_up(&self, stopped: &AtomicBool, nodes_so_far: u64, check_time: bool) -> bool {
        let past_limit = match self.limit {
            SearchLimit::Depth(_) | SearchLimit::Infinite => false,
            SearchLimit::Nodes(hard_limit) | SearchLimit::SoftNodes { hard_limit, .. } => nodes_so_far >= hard_limit,
            SearchLimit::Time(_) | SearchLimit::Dynamic { .. } => check_time && self.elapsed() >= self.max_time,
        };
        if past_limit {
            stopped.store(true, Ordering::SeqCst);
        }
        past_limit || stopped.load(Ordering::SeqCst)
    }

    /// If we have used enough of our budget that stopping after finishing a depth would be good here.
    pub fn is_past_opt_time(&self, nodes: u64) -> bool {
        match self.limit {
            SearchLimit::Dynamic { .. } => self.elapsed() >= self.opt_time,
            SearchLimit::SoftNodes { soft_limit, .. } => nodes >= soft_limit,
            _ => false,
        }
    }

    /// With a single legal move there is nothing to think about.
    pub fn notify_one_legal_move(&mut self) {
        if self.is_dynamic() {
            self.opt_time = Duration::ZERO;
            self.base_opt_time = Duration::ZERO;
        }
    }

    /// Rescale the soft limit once an iteration completes.
    ///
    /// `bm_frac` is the fraction of the iteration's nodes spent under the best move.
    pub fn report_completed_depth(&mut self, best_move: Move, bm_frac: Option<f64>, conf: &Config) {
        #![allow(clippy::cast_precision_loss)]
        if self.prev_move == Some(best_move) {
            self.stability += 1;
        } else {
            self.stability = 0;
        }
        self.prev_move = Some(best_move);

        if !self.is_dynamic() {
            return;
        }

        let stability_scale = STABILITY_MULTIPLIERS[self.stability.min(STABILITY_MULTIPLIERS.len() - 1)];
        let node_scale = bm_frac.map_or(1.0, |frac| (1.5 - frac) * f64::from(conf.node_tm_subtree_multiplier) / 100.0);
        let fail_low_scale =
            if self.failed_low { 1.0 + f64::from(conf.fail_low_tm_bonus) / 100.0 } else { 1.0 };
        self.failed_low = false;

        let scaled = self.base_opt_time.as_secs_f64() * stability_scale * node_scale * fail_low_scale;
        self.opt_time = Duration::from_secs_f64(scaled).min(self.max_time);
    }

    /// Note that an aspiration search at `depth` failed in direction `bound`.
    pub fn report_aspiration_fail(&mut self, depth: i32, bound: Bound) {
        if depth >= 4 && bound == Bound::Upper {
            self.failed_low = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::{piece::PieceType, types::Square};

    #[test]
    fn time_windows_respect_the_clock() {
        let conf = Config::default();
        let (opt, max) = SearchLimit::compute_time_windows(60_000, None, 1_000, &conf);
        assert!(opt < max);
        assert!(max < 60_000);
        let (opt, max) = SearchLimit::compute_time_windows(5, Some(1), 0, &conf);
        assert_eq!((opt, max), (0, 0));
        let (_, max) = SearchLimit::compute_time_windows(1_000, Some(1), 0, &conf);
        assert_eq!(max, 1_000 - MOVE_OVERHEAD);
    }

    #[test]
    fn node_limits_are_hard() {
        let mut tm = TimeManager::default();
        tm.start(SearchLimit::Nodes(1000), &Config::default());
        let stopped = AtomicBool::new(false);
        assert!(!tm.check_up(&stopped, 999, false));
        assert!(!stopped.load(Ordering::SeqCst));
        assert!(tm.check_up(&stopped, 1000, false));
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn soft_nodes_stop_between_iterations() {
        let mut tm = TimeManager::default();
        tm.start(SearchLimit::SoftNodes { soft_limit: 100, hard_limit: 1000 }, &Config::default());
        assert!(!tm.is_past_opt_time(99));
        assert!(tm.is_past_opt_time(100));
        let stopped = AtomicBool::new(false);
        assert!(!tm.check_up(&stopped, 500, true));
    }

    #[test]
    fn stable_best_moves_shorten_the_search() {
        let conf = Config::default();
        let mut tm = TimeManager::default();
        tm.start(
            SearchLimit::Dynamic { our_clock: 100_000, their_clock: 100_000, our_inc: 0, their_inc: 0, moves_to_go: None },
            &conf,
        );
        let base = tm.optimal_time();
        let m = Move::new_normal(Square::E2, Square::E4, PieceType::Pawn);
        tm.report_completed_depth(m, None, &conf);
        assert!(tm.optimal_time() > base);
        for _ in 0..5 {
            tm.report_completed_depth(m, None, &conf);
        }
        assert!(tm.optimal_time() < base);
        assert!(tm.optimal_time() <= tm.maximum_time());
    }
}
