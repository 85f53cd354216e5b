#![allow(clippy::too_many_arguments)]

pub mod parameters;
pub mod pv;

use std::{ops::ControlFlow, sync::atomic::Ordering, thread};

use arrayvec::ArrayVec;

use crate::{
    chess::{
        board::{
            Board,
            movegen::{
                MAX_POSITION_MOVES, MoveListEntry,
                movepicker::{MovePicker, Stage},
            },
        },
        chessmove::Move,
        magic::{bishop_attacks, rook_attacks},
        piece::{Piece, PieceType},
        squareset::SquareSet,
        types::{ContHistIndex, Square},
    },
    evaluation::{MATE_SCORE, MINIMUM_MATE_SCORE, is_mate_score, mate_in, mated_in, see_value},
    historytable::history_bonus,
    search::pv::PVariation,
    threadlocal::ThreadData,
    transpositiontable::{Bound, TTHit},
    uci,
    util::{INFINITY, MAX_DEPTH, MAX_PLY, VALUE_NONE},
};

use self::parameters::Config;

// Node classes: PV nodes return an exact score inside (alpha, beta), cut nodes
// fail high and return a lower bound, all nodes fail low and return an upper bound.

const TIME_MANAGER_UPDATE_MIN_DEPTH: i32 = 4;
/// Helper threads recurse deeply, so they get more than the default stack.
const SEARCH_STACK_SIZE: usize = 16 * 1024 * 1024;

pub trait NodeType {
    /// Searched with an open window.
    const PV: bool;
    /// Height zero.
    const ROOT: bool;
    /// The kind of node a full-window child search produces.
    type Next: NodeType;
}

struct Root;
struct OnPV;
/// Zero-window node.
struct OffPV;

impl NodeType for Root {
    const PV: bool = true;
    const ROOT: bool = true;
    type Next = OnPV;
}
impl NodeType for OnPV {
    const PV: bool = true;
    const ROOT: bool = false;
    type Next = Self;
}
impl NodeType for OffPV {
    const PV: bool = false;
    const ROOT: bool = false;
    type Next = Self;
}

pub trait SmpThreadType {
    const MAIN_THREAD: bool;
}
pub struct MainThread;
pub struct HelperThread;
impl SmpThreadType for MainThread {
    const MAIN_THREAD: bool = true;
}
impl SmpThreadType for HelperThread {
    const MAIN_THREAD: bool = false;
}

/// Performs the root search on every thread. The first element of
/// `thread_data` is the main thread, and runs on the calling thread.
/// Returns the side-to-move score and the move to play.
pub fn search_position(thread_data: &mut [Box<ThreadData>]) -> (i32, Option<Move>) {
    for t in thread_data.iter_mut() {
        t.set_up_for_search();
    }
    let Some((t1, rest)) = thread_data.split_first_mut() else {
        return (0, None);
    };

    let legal_moves = t1.board.legal_moves();
    if legal_moves.is_empty() {
        if t1.info.print_to_stdout {
            eprintln!("info string warning search called on a position with no legal moves");
            if t1.board.in_check() {
                println!("info depth 0 score mate 0");
            } else {
                println!("info depth 0 score cp 0");
            }
            println!("bestmove (none)");
        }
        return (if t1.board.in_check() { mated_in(0) } else { 0 }, None);
    }
    if legal_moves.len() == 1 {
        t1.info.time_manager.notify_one_legal_move();
    }

    thread::scope(|s| {
        for t in rest.iter_mut() {
            let spawned = thread::Builder::new()
                .name(format!("search-{}", t.thread_id))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn_scoped(s, move || iterative_deepening::<HelperThread>(t));
            if let Err(e) = spawned {
                eprintln!("info string failed to start a search thread: {e}");
            }
        }
        iterative_deepening::<MainThread>(t1);
        t1.info.stopped.store(true, Ordering::SeqCst);
    });

    let total_nodes = thread_data[0].info.nodes.get_global();
    let best_thread = select_best(thread_data, total_nodes);
    let depth_achieved = best_thread.completed;
    let pv = best_thread.pv().clone();
    let main = &thread_data[0];
    let best_move = pv
        .moves()
        .first()
        .copied()
        .filter(|m| legal_moves.contains(m))
        .or_else(|| main.tt.probe_move(main.board.key()).filter(|m| legal_moves.contains(m)))
        .unwrap_or(legal_moves[0]);

    if main.info.print_to_stdout {
        // the last info line always goes out, even in bullet games.
        readout_info(main, Bound::Exact, &pv, depth_achieved, total_nodes, true);
        println!("bestmove {best_move}");
    }

    (pv.score, Some(best_move))
}

/// One thread's iterative deepening loop.
/// For Lazy SMP, the main thread calls this function with `MainThread`, and the helpers with `HelperThread`.
fn iterative_deepening<ThTy: SmpThreadType>(t: &mut ThreadData) {
    debug_assert!(!ThTy::MAIN_THREAD || t.thread_id == 0, "main thread must have thread_id 0");
    let mut aw = AspirationWindow::infinite();
    let mut pv = PVariation::default();
    let max_depth = t.info.time_manager.limit().depth().unwrap_or(MAX_PLY - 1).min(MAX_PLY - 1);
    let starting_depth = 1 + t.thread_id % 10;
    let mut average_value = VALUE_NONE;
    'deepening: for d in starting_depth..=max_depth {
        t.depth = d;
        // soft time limit, checked between iterations.
        if ThTy::MAIN_THREAD
            && t.completed > 0
            && t.info.time_manager.is_past_opt_time(t.info.nodes.get_global())
        {
            t.info.stopped.store(true, Ordering::SeqCst);
            break 'deepening;
        }
        // the window search may shorten the depth it actually completed.
        let ControlFlow::Continue(depth) = aspiration::<ThTy>(t, &mut pv, &mut aw, d, &mut average_value) else {
            break 'deepening;
        };

        aw = if depth > 5 {
            AspirationWindow::around_value(average_value, depth, t.info.conf.aspiration_window)
        } else {
            AspirationWindow::infinite()
        };

        if ThTy::MAIN_THREAD
            && depth > TIME_MANAGER_UPDATE_MIN_DEPTH
            && let Some(&best_move) = pv.moves().first()
        {
            let bm_frac = if d > 8 {
                let best_move_subtree_size = t.info.root_move_nodes[best_move.from()][best_move.to()];
                let tree_size = t.info.nodes.get_local().max(1);
                #[allow(clippy::cast_precision_loss)]
                Some(best_move_subtree_size as f64 / tree_size as f64)
            } else {
                None
            };
            t.info.time_manager.report_completed_depth(best_move, bm_frac, &t.info.conf);
        }

        if t.info.check_up() {
            break 'deepening;
        }
    }
}

fn aspiration<ThTy: SmpThreadType>(
    t: &mut ThreadData,
    pv: &mut PVariation,
    aw: &mut AspirationWindow,
    d: usize,
    average_value: &mut i32,
) -> ControlFlow<(), i32> {
    let full_depth = i32::try_from(d).unwrap_or(MAX_DEPTH);
    let mut depth = full_depth;
    let min_depth = (depth / 2).max(1);
    loop {
        pv.score = alpha_beta::<Root>(t, pv, depth, aw.alpha, aw.beta, false);
        if t.info.check_up() {
            return ControlFlow::Break(()); // we've been told to stop searching.
        }

        let print = ThTy::MAIN_THREAD && t.info.print_to_stdout && !t.info.skip_print();

        if aw.alpha != -INFINITY && pv.score <= aw.alpha {
            if print {
                let nodes = t.info.nodes.get_global();
                let mut apv = t.pv().clone();
                apv.score = pv.score;
                readout_info(t, Bound::Upper, &apv, d, nodes, false);
            }
            aw.widen_down(pv.score, depth);
            if ThTy::MAIN_THREAD {
                t.info.time_manager.report_aspiration_fail(depth, Bound::Upper);
            }
            // a fail-low invalidates any line stored by an earlier fail-high.
            t.revert_best_line();
            depth = full_depth;
            continue;
        }
        t.update_best_line(pv);
        if aw.beta != INFINITY && pv.score >= aw.beta {
            if print {
                let nodes = t.info.nodes.get_global();
                readout_info(t, Bound::Lower, t.pv(), d, nodes, false);
            }
            aw.widen_up(pv.score, depth);
            if ThTy::MAIN_THREAD {
                t.info.time_manager.report_aspiration_fail(depth, Bound::Lower);
            }
            if !is_mate_score(pv.score) {
                depth = (depth - 1).max(min_depth);
            }
            continue;
        }

        let score = pv.score;
        *average_value = if *average_value == VALUE_NONE { score } else { (2 * score + *average_value) / 3 };

        if print {
            let total_nodes = t.info.nodes.get_global();
            readout_info(t, Bound::Exact, t.pv(), d, total_nodes, false);
        }

        if t.info.stopped() {
            return ControlFlow::Break(());
        }

        break ControlFlow::Continue(depth); // we got an exact score, so we can stop the aspiration loop.
    }
}

/// Quiescence search over captures and promotions, or every evasion when in check.
#[allow(clippy::too_many_lines)]
fn quiescence<NT: NodeType>(t: &mut ThreadData, pv: &mut PVariation, mut alpha: i32, beta: i32) -> i32 {
    debug_assert!(t.board.check_validity().is_ok());

    if t.info.nodes.just_ticked_over() && t.info.check_up() {
        return 0;
    }

    let key = t.board.key();

    let mut child_line = PVariation::default();
    let child_pv = &mut child_line;

    pv.moves.clear();

    let height = t.board.height();
    t.info.seldepth = t.info.seldepth.max(height);

    if t.board.is_draw() {
        return draw_score(t.info.nodes.get_local());
    }

    let in_check = t.board.in_check();

    if height > MAX_PLY - 1 {
        return if in_check { 0 } else { t.evaluate() };
    }

    // a reachable repetition means we can hold at least a draw.
    if alpha < 0 && t.board.has_game_cycle(height) {
        alpha = 0;
        if alpha >= beta {
            return alpha;
        }
    }

    let near_fifty = t.board.fifty_move_counter() >= 80;
    let tt_entry = if let Some(hit) = t.tt.probe(key, height) {
        if !NT::PV
            && !in_check
            && !near_fifty
            && (hit.bound == Bound::Exact
                || (hit.bound == Bound::Lower && hit.value >= beta)
                || (hit.bound == Bound::Upper && hit.value <= alpha))
        {
            return hit.value;
        }

        Some(hit)
    } else {
        None
    };

    t.ss[height].ttpv = NT::PV || tt_entry.is_some_and(|hit| hit.was_pv);

    let raw;
    let stand_pat;

    if in_check {
        raw = VALUE_NONE;
        stand_pat = -INFINITY;
    } else if let Some(hit) = &tt_entry {
        raw = if hit.eval == VALUE_NONE { t.evaluate() } else { hit.eval };
        let adj_eval = corrected_eval(t, raw);

        // a bounded search score is a better stand-pat than the raw eval.
        if hit.value != VALUE_NONE
            && (hit.bound == Bound::Exact
                || hit.bound == Bound::Upper && hit.value < adj_eval
                || hit.bound == Bound::Lower && hit.value > adj_eval)
        {
            stand_pat = hit.value;
        } else {
            stand_pat = adj_eval;
        }
    } else {
        raw = t.evaluate();
        // cache the eval; the slot had nothing for this key.
        t.tt.store(key, height, None, VALUE_NONE, raw, Bound::None, 0, t.ss[height].ttpv);
        stand_pat = corrected_eval(t, raw);
    }

    if stand_pat >= beta {
        return stand_pat;
    }

    let alpha_orig = alpha;
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let mut best_move = None;
    let mut best_value = stand_pat;

    let mut played = 0;
    let mut picker = MovePicker::new(tt_entry.and_then(|e| e.mov), None, None, t.info.conf.qs_see_bound);
    picker.captures_only = !in_check;

    let futility = stand_pat + t.info.conf.qs_futility;

    while let Some(MoveListEntry { mov: m, .. }) = picker.next(t) {
        let is_tactical = t.board.is_tactical(m);
        if best_value > -MINIMUM_MATE_SCORE
            && is_tactical
            && !in_check
            && futility <= alpha
            && !t.board.static_exchange_eval(&t.info.conf, m, 1)
        {
            if best_value < futility {
                best_value = futility;
            }
            continue;
        }
        t.tt.prefetch(t.board.key_after(m));
        set_searching(t, height, m, is_tactical);
        if !t.make_move(m) {
            continue;
        }
        // an evasion was found; no more quiet evasions are needed.
        picker.skip_quiets = true;
        t.info.nodes.increment();
        played += 1;

        let score = -quiescence::<NT::Next>(t, child_pv, -beta, -alpha);
        t.unmake_move();

        if t.info.stopped() {
            return 0;
        }

        if score > best_value {
            best_value = score;
            if score > alpha {
                best_move = Some(m);
                alpha = score;
                if NT::PV {
                    pv.load_from(m, child_pv);
                }
            }
            if alpha >= beta {
                break; // fail-high
            }
        }
    }

    if played == 0 && in_check {
        return mated_in(height);
    }

    let flag = if best_value >= beta {
        Bound::Lower
    } else if best_value > alpha_orig {
        Bound::Exact
    } else {
        Bound::Upper
    };

    t.tt.store(key, height, best_move, best_value, raw, flag, 0, t.ss[height].ttpv);

    best_value
}

/// Principal variation search.
#[allow(clippy::too_many_lines, clippy::cognitive_complexity)]
fn alpha_beta<NT: NodeType>(
    t: &mut ThreadData,
    pv: &mut PVariation,
    mut depth: i32,
    mut alpha: i32,
    mut beta: i32,
    cut_node: bool,
) -> i32 {
    debug_assert!(t.board.check_validity().is_ok());

    let mut child_line = PVariation::default();
    let child_pv = &mut child_line;

    let key = t.board.key();

    let in_check = t.board.in_check();
    if depth <= 0 && !in_check {
        return quiescence::<NT::Next>(t, pv, alpha, beta);
    }

    depth = depth.max(0);

    pv.moves.clear();

    if t.info.nodes.just_ticked_over() && t.info.check_up() {
        return 0;
    }

    let height = t.board.height();

    debug_assert_eq!(height == 0, NT::ROOT);
    debug_assert!(!(NT::PV && cut_node));
    debug_assert_eq!(NT::PV, alpha + 1 != beta, "PV must be true iff the alpha-beta window is larger than 1");

    t.info.seldepth = if NT::ROOT { 0 } else { t.info.seldepth.max(height) };

    if !NT::ROOT {
        if t.board.is_draw() {
            return draw_score(t.info.nodes.get_local());
        }

        if height >= MAX_PLY {
            return if in_check { 0 } else { t.evaluate() };
        }

        alpha = alpha.max(mated_in(height));
        beta = beta.min(mate_in(height + 1));
        if alpha >= beta {
            return alpha;
        }

        // a reachable repetition means we can hold at least a draw.
        if alpha < 0 && t.board.has_game_cycle(height) {
            alpha = 0;
            if alpha >= beta {
                return alpha;
            }
        }
    }

    let excluded = t.ss[height].excluded;
    let near_fifty = t.board.fifty_move_counter() >= 80;
    let tt_entry = if excluded.is_none() {
        if let Some(hit) = t.tt.probe(key, height) {
            if !NT::PV
                && hit.depth >= depth
                && !near_fifty
                && (hit.bound == Bound::Exact
                    || (hit.bound == Bound::Lower && hit.value >= beta)
                    || (hit.bound == Bound::Upper && hit.value <= alpha))
            {
                // reward the cutoff move even though we never search it.
                if let Some(mov) = hit.mov
                    && hit.value >= beta
                    && !t.board.is_tactical(mov)
                    && t.board.is_pseudo_legal(mov)
                {
                    let moved = Piece::new(t.board.turn(), mov.piece_type());
                    let threats = t.board.state().threats;
                    let delta = history_bonus(&t.info.conf, depth);
                    update_quiet_history_single::<false>(t, mov.from(), mov.to(), moved, threats, delta);
                }

                return hit.value;
            }

            Some(hit)
        } else {
            None
        }
    } else {
        None // do not probe the TT if we're in a singular-verification search.
    };

    if excluded.is_none() {
        t.ss[height].ttpv = NT::PV || tt_entry.is_some_and(|hit| hit.was_pv);
    }

    let raw;
    let eval;

    if in_check {
        raw = VALUE_NONE;
        eval = VALUE_NONE;
    } else if excluded.is_some() {
        // singular verification reuses the eval of the node it excludes a move from.
        raw = VALUE_NONE;
        eval = t.ss[height].eval;
    } else if let Some(hit) = &tt_entry {
        raw = if hit.eval == VALUE_NONE { t.evaluate() } else { hit.eval };
        eval = corrected_eval(t, raw);
    } else {
        raw = t.evaluate();
        eval = corrected_eval(t, raw);
    }

    t.ss[height].eval = eval;

    // score the opponent's last quiet by how much it swung the eval.
    if !NT::ROOT {
        let ss_prev = &t.ss[height - 1];
        if let Some(mov) = ss_prev.searching
            && ss_prev.eval != VALUE_NONE
            && eval != VALUE_NONE
            && !ss_prev.searching_tactical
        {
            let from = mov.from();
            let to = mov.to();
            let moved = Piece::new(!t.board.turn(), mov.piece_type());
            let threats = t.board.history().last().map_or(SquareSet::EMPTY, |s| s.threats);
            let delta = i32::clamp(-10 * (ss_prev.eval + eval), -1900, 1400) + 700;
            t.update_history_single(from, to, moved, threats, delta);
        }
    }

    // improving: the eval went up since our previous move.
    let improving = if in_check {
        false
    } else if height >= 2 && t.ss[height - 2].eval != VALUE_NONE {
        eval > t.ss[height - 2].eval
    } else if height >= 4 && t.ss[height - 4].eval != VALUE_NONE {
        eval > t.ss[height - 4].eval
    } else {
        true
    };

    t.ss[height].dextensions = if NT::ROOT { 0 } else { t.ss[height - 1].dextensions };

    // clear out the next killer move.
    t.killer_move_table[height + 1] = None;

    let tt_move = tt_entry.and_then(|hit| hit.mov);
    let tt_capture = matches!(tt_move, Some(mv) if t.board.is_capture(mv));

    if !NT::ROOT && !NT::PV && !in_check && excluded.is_none() {
        // razoring
        if should_razor(&t.info.conf, depth, eval, alpha) {
            let v = quiescence::<OffPV>(t, pv, alpha - 1, alpha);
            if v < alpha {
                return v;
            }
        }

        // reverse futility pruning
        if !t.ss[height].ttpv
            && depth <= t.info.conf.rfp_depth
            && eval - rfp_margin(&t.info.conf, depth, improving) >= beta
            && (tt_move.is_none() || tt_capture)
            && beta > -MINIMUM_MATE_SCORE
            && eval < MINIMUM_MATE_SCORE
        {
            return beta + (eval - beta) / 3;
        }

        let last_move_was_null = t.ss[height - 1].searching.is_none();

        // null move pruning
        if !last_move_was_null
            && depth >= 3
            && eval + i32::from(improving) * t.info.conf.nmp_improving_margin >= beta
            && !t.nmp_banned_for(t.board.turn())
            && t.board.zugzwang_unlikely()
            && !matches!(tt_entry, Some(TTHit { value: v, bound: Bound::Upper, .. }) if v < beta)
        {
            t.tt.prefetch(t.board.key_after_null_move());
            let conf = &t.info.conf;
            let r = conf.nmp_base_reduction
                + depth / conf.nmp_reduction_depth_divisor
                + std::cmp::min((eval - beta) / conf.nmp_reduction_eval_divisor, conf.max_nmp_eval_reduction);
            let null_depth = depth - r;
            t.ss[height].searching = None;
            t.ss[height].searching_tactical = false;
            t.ss[height].conthist_index =
                ContHistIndex { piece: Piece::new(t.board.turn(), PieceType::Pawn), square: Square::A1 };
            t.board.make_nullmove();
            let mut null_value = -alpha_beta::<OffPV>(t, child_pv, null_depth, -beta, -beta + 1, !cut_node);
            t.board.unmake_nullmove();
            if t.info.stopped() {
                return 0;
            }
            if null_value >= beta {
                if is_mate_score(null_value) {
                    null_value = beta;
                }
                if depth < t.info.conf.nmp_verification_depth && !is_mate_score(beta) {
                    return null_value;
                }
                // deep null cutoffs are re-checked with null moves off for us.
                let us = t.board.turn();
                t.ban_nmp_for(us);
                let verified = alpha_beta::<OffPV>(t, child_pv, null_depth, beta - 1, beta, false);
                t.unban_nmp_for(us);
                if verified >= beta {
                    return null_value;
                }
            }
        }
    }

    // internal iterative reduction
    if NT::PV && tt_entry.is_none_or(|tte| tte.depth + 4 <= depth) {
        depth -= i32::from(depth >= 4);
    }

    if cut_node && excluded.is_none() && (tt_move.is_none() || tt_entry.is_none_or(|tte| tte.depth + 4 <= depth)) {
        depth -= i32::from(depth >= 8);
    }

    let see_margins = [t.info.conf.see_tactical_margin * depth * depth, t.info.conf.see_quiet_margin * depth];

    if tt_entry.is_none() && !in_check && excluded.is_none() {
        t.tt.store(key, height, None, VALUE_NONE, raw, Bound::None, 0, t.ss[height].ttpv);
    }

    // probcut:
    let probcut_beta = std::cmp::min(
        beta + t.info.conf.probcut_margin - i32::from(improving) * t.info.conf.probcut_improving_margin,
        MINIMUM_MATE_SCORE - 1,
    );
    // as usual, don't probcut in PV / check / singular verification / if there are mate scores in flight.
    if !NT::PV
        && !in_check
        && excluded.is_none()
        && depth >= t.info.conf.probcut_min_depth
        && !is_mate_score(beta)
        && !matches!(tt_entry, Some(TTHit { value: v, depth: d, .. }) if v < probcut_beta && d >= depth - 3)
    {
        let mut picker = MovePicker::new(tt_move, None, None, probcut_beta - eval);
        picker.captures_only = true;
        while let Some(MoveListEntry { mov: m, .. }) = picker.next(t) {
            if Some(m) == tt_move && !t.board.is_tactical(m) {
                continue;
            }

            t.tt.prefetch(t.board.key_after(m));
            set_searching(t, height, m, true);
            if !t.make_move(m) {
                continue;
            }

            let mut value = -quiescence::<OffPV>(t, child_pv, -probcut_beta, -probcut_beta + 1);

            if value >= probcut_beta {
                let probcut_depth = depth - t.info.conf.probcut_reduction;
                value = -alpha_beta::<OffPV>(t, child_pv, probcut_depth, -probcut_beta, -probcut_beta + 1, !cut_node);
            }

            t.unmake_move();

            if t.info.stopped() {
                return 0;
            }

            if value >= probcut_beta {
                let probcut_depth = depth - t.info.conf.probcut_reduction;
                t.tt.store(key, height, Some(m), value, raw, Bound::Lower, probcut_depth, t.ss[height].ttpv);
                return value;
            }
        }
    }

    let alpha_orig = alpha;
    let mut best_move = None;
    let mut best_value = -INFINITY;
    let mut played = 0;

    let lmp_count = t.info.lm_table.lmp_movecount(depth, improving);

    let killer = t.killer_move_table[height];
    let counter_move = t.get_counter_move();
    let mut picker = MovePicker::new(tt_move, killer, counter_move, t.info.conf.main_see_bound);

    let mut quiets = ArrayVec::<_, MAX_POSITION_MOVES>::new();
    let mut tacticals = ArrayVec::<_, MAX_POSITION_MOVES>::new();

    while let Some(MoveListEntry { mov: m, .. }) = picker.next(t) {
        if excluded == Some(m) {
            continue;
        }

        let base_reduction = t.info.lm_table.lm_reduction(depth, played);
        let pruning_depth = std::cmp::max(depth - base_reduction, 0);
        let is_quiet = !t.board.is_tactical(m);

        let history_score = if is_quiet {
            t.get_history_score(m) + t.get_continuation_history_score(m, 0) + t.get_continuation_history_score(m, 1)
        } else {
            t.get_tactical_history_score(m)
        };

        // lmp & fp.
        let refutation = Some(m) == killer || Some(m) == counter_move;
        if !NT::ROOT && !NT::PV && !in_check && best_value > -MINIMUM_MATE_SCORE {
            let conf = &t.info.conf;
            if pruning_depth <= conf.lmp_depth && played >= lmp_count {
                picker.skip_quiets = true;
            }

            if is_quiet
                && !refutation
                && pruning_depth < conf.history_pruning_depth
                && history_score < conf.history_pruning_margin * (depth - 1)
            {
                picker.skip_quiets = true;
                continue;
            }

            let fp_margin = pruning_depth * conf.futility_coeff_1 + conf.futility_coeff_0;
            if is_quiet && pruning_depth < conf.futility_depth && eval + fp_margin <= alpha {
                picker.skip_quiets = true;
                continue;
            }
        }

        // SEE pruning, only once the good captures are exhausted.
        if see_pruning_allowed::<NT>(in_check)
            && best_value > -MINIMUM_MATE_SCORE
            && depth <= t.info.conf.see_depth
            && picker.stage > Stage::YieldGoodCaptures
            && t.board.state().threats.contains_square(m.to())
            && !t.board.static_exchange_eval(
                &t.info.conf,
                m,
                see_margins[usize::from(is_quiet)] - history_score * t.info.conf.see_stat_score_mul / 1024,
            )
        {
            continue;
        }

        t.tt.prefetch(t.board.key_after(m));
        set_searching(t, height, m, !is_quiet);
        if !t.make_move(m) {
            continue;
        }

        if is_quiet {
            quiets.push(m);
        } else {
            tacticals.push(m);
        }

        let nodes_before = t.info.nodes.get_local();
        t.info.nodes.increment();
        played += 1;

        let singular_candidate = tt_entry
            .filter(|hit| {
                !NT::ROOT
                    && depth >= t.info.conf.singularity_depth
                    && excluded.is_none()
                    && hit.mov == Some(m)
                    && hit.bound.is_lower()
                    && hit.depth >= depth - 3
                    && hit.value != VALUE_NONE
            })
            .map(|hit| hit.value);

        let extension;
        if NT::ROOT {
            extension = 0;
        } else if let Some(tt_value) = singular_candidate {
            let singular_beta = singularity_margin(tt_value, depth);
            let singular_depth = (depth - 1) / 2;
            t.unmake_move();
            t.ss[height].excluded = Some(m);
            let value = alpha_beta::<OffPV>(t, &mut PVariation::default(), singular_depth, singular_beta - 1, singular_beta, cut_node);
            t.ss[height].excluded = None;
            if t.info.stopped() {
                return 0;
            }
            if value >= singular_beta && singular_beta >= beta {
                // multi-cut
                return singular_beta;
            }
            set_searching(t, height, m, !is_quiet);
            let remade = t.make_move(m);
            debug_assert!(remade, "singular move {m} became illegal");

            if value < singular_beta {
                if !NT::PV
                    && t.ss[height].dextensions <= t.info.conf.max_dextensions
                    && value < singular_beta - t.info.conf.dext_margin
                {
                    extension = 2;
                } else {
                    extension = 1;
                }
            } else if cut_node {
                extension = -2;
            } else if tt_value >= beta || tt_value <= alpha {
                extension = -1;
            } else {
                extension = 0;
            }
        } else if t.board.in_check() {
            // the side to move is now the opponent, so this is a checking move.
            extension = i32::from(is_quiet);
        } else {
            extension = 0;
        }
        if extension >= 2 {
            t.ss[height].dextensions += 1;
        }

        let mut score;
        if played == 1 {
            let new_depth = depth + extension - 1;
            score = -alpha_beta::<NT::Next>(t, child_pv, new_depth, -beta, -alpha, false);
        } else {
            let r = if depth >= 3 && played >= (2 + usize::from(NT::PV)) {
                let conf = &t.info.conf;
                let mut r = t.info.lm_table.lm_reduction(depth, played) * 1024;
                if is_quiet {
                    r -= history_score / conf.history_lmr_divisor * 1024;
                    r -= i32::from(refutation) * conf.lmr_refutation_mul;
                    r += i32::from(!NT::PV) * conf.lmr_non_pv_mul;
                    r -= i32::from(t.ss[height].ttpv) * conf.lmr_ttpv_mul;
                    r += i32::from(cut_node) * conf.lmr_cut_node_mul;
                    r += i32::from(!improving) * conf.lmr_non_improving_mul;
                    r += i32::from(tt_capture) * conf.lmr_tt_capture_mul;
                }
                (r / 1024).clamp(1, depth - 1)
            } else {
                1
            };
            t.ss[height].reduction = r;
            let mut new_depth = depth + extension;
            let reduced_depth = new_depth - r;
            score = -alpha_beta::<OffPV>(t, child_pv, reduced_depth, -alpha - 1, -alpha, true);
            // the reduced search beat alpha: retry at full depth, nudged by how far it beat the best score.
            if score > alpha && r > 1 {
                let deeper = score
                    > (best_value + t.info.conf.do_deeper_base_margin + t.info.conf.do_deeper_depth_margin * r);
                let shallower = score < best_value + new_depth;
                new_depth += i32::from(deeper) - i32::from(shallower);
                if new_depth - 1 > reduced_depth {
                    score = -alpha_beta::<OffPV>(t, child_pv, new_depth - 1, -alpha - 1, -alpha, !cut_node);
                }
            }
            if score > alpha && score < beta {
                score = -alpha_beta::<NT::Next>(t, child_pv, new_depth - 1, -beta, -alpha, false);
            }
            t.ss[height].reduction = 0;
        }
        t.unmake_move();

        if NT::ROOT && t.thread_id == 0 {
            let spent = t.info.nodes.get_local() - nodes_before;
            t.info.root_move_nodes[m.from()][m.to()] += spent;
        }

        if extension >= 2 {
            t.ss[height].dextensions -= 1;
        }

        if t.info.stopped() {
            return 0;
        }

        if score > best_value {
            best_value = score;
            if score > alpha {
                best_move = Some(m);
                alpha = score;
                if NT::PV {
                    pv.load_from(m, child_pv);
                }
            }
            if alpha >= beta {
                break;
            }
        }
    }

    if played == 0 {
        if excluded.is_some() {
            return alpha;
        }
        if in_check {
            return mated_in(height);
        }
        // stalemate is an exact draw.
        return 0;
    }

    let flag = if best_value >= beta {
        Bound::Lower
    } else if best_value > alpha_orig {
        Bound::Exact
    } else {
        Bound::Upper
    };

    if alpha != alpha_orig
        && let Some(best_move) = best_move
    {
        if !t.board.is_tactical(best_move) {
            t.insert_killer(best_move);
            t.insert_countermove(best_move);

            // quiet moves that are good in "bad" positions get an extra boost.
            // note: if in check, eval will be VALUE_NONE, which is above any alpha.
            let history_depth_boost = i32::from(eval <= alpha);
            update_quiet_history(t, &quiets, best_move, depth + history_depth_boost);
        }

        // captures are scored against each other whatever kind of move won.
        t.update_tactical_history(&tacticals, best_move, depth);
    }

    if excluded.is_none() {
        debug_assert!(
            alpha != alpha_orig || best_move.is_none(),
            "alpha was not raised, but best_move was not null!"
        );
        // correction history learns only from quiet results that disagree with the eval.
        if !(in_check
            || matches!(best_move, Some(m) if t.board.is_tactical(m))
            || flag == Bound::Lower && best_value <= eval
            || flag == Bound::Upper && best_value >= eval)
        {
            t.update_correction_history(depth, best_value - eval);
        }
        t.tt.store(key, height, best_move, best_value, raw, flag, depth, t.ss[height].ttpv);
    }

    t.ss[height].best_move = best_move;

    best_value
}

/// Record the move about to be made at `height` on the search stack.
fn set_searching(t: &mut ThreadData, height: usize, m: Move, tactical: bool) {
    let moved = Piece::new(t.board.turn(), m.piece_type());
    let ss = &mut t.ss[height];
    ss.searching = Some(m);
    ss.searching_tactical = tactical;
    ss.conthist_index = ContHistIndex { piece: moved, square: m.to() };
}

/// The static evaluation adjusted by correction history, kept out of the mate range.
fn corrected_eval(t: &ThreadData, raw: i32) -> i32 {
    (raw + t.correction()).clamp(-MINIMUM_MATE_SCORE + 1, MINIMUM_MATE_SCORE - 1)
}

/// Drop into quiescence when the static eval is hopelessly below alpha at low depth.
fn should_razor(conf: &Config, depth: i32, eval: i32, alpha: i32) -> bool {
    depth <= conf.razoring_depth && eval < alpha - conf.razoring_coeff_0 - conf.razoring_coeff_1 * depth * depth
}

const fn see_pruning_allowed<NT: NodeType>(in_check: bool) -> bool {
    !NT::ROOT && !NT::PV && !in_check
}

fn rfp_margin(conf: &Config, depth: i32, improving: bool) -> i32 {
    conf.rfp_margin * depth - i32::from(improving) * conf.rfp_improving_margin
}

fn update_quiet_history(t: &mut ThreadData, moves_to_adjust: &[Move], best_move: Move, depth: i32) {
    t.update_history(moves_to_adjust, best_move, depth);
    t.update_continuation_history(moves_to_adjust, best_move, depth, 0);
    t.update_continuation_history(moves_to_adjust, best_move, depth, 1);
}

#[allow(clippy::identity_op)]
fn update_quiet_history_single<const MADE: bool>(
    t: &mut ThreadData,
    from: Square,
    to: Square,
    moved: Piece,
    threats: SquareSet,
    delta: i32,
) {
    t.update_history_single(from, to, moved, threats, delta);
    t.update_continuation_history_single(to, moved, delta, 0 + usize::from(MADE));
    t.update_continuation_history_single(to, moved, delta, 1 + usize::from(MADE));
}

fn singularity_margin(tt_value: i32, depth: i32) -> i32 {
    (tt_value - (depth * 3 / 4)).max(-MATE_SCORE)
}

impl Board {
    /// Static exchange evaluation: does `m` win at least `threshold` once every
    /// capture on the target square is played out, cheapest attacker first?
    pub fn static_exchange_eval(&self, conf: &Config, m: Move, threshold: i32) -> bool {
        let from = m.from();
        let to = m.to();
        let layout = &self.state.piece_layout;

        let mut next_victim = m.promotion_type().unwrap_or_else(|| m.piece_type());

        let mut balance = self.estimated_see(conf, m) - threshold;

        if balance < 0 {
            return false;
        }

        balance -= see_value(next_victim, conf);

        if balance >= 0 {
            return true;
        }

        let diag_sliders = layout.diagonal_sliders();
        let orth_sliders = layout.orthogonal_sliders();

        let mut occupied = (layout.occupied() ^ from.as_set()) | to.as_set();
        if m.is_ep()
            && let Some(captured_sq) = to.pawn_push(!self.turn())
        {
            occupied ^= captured_sq.as_set();
        }

        let mut attackers = layout.attackers_to(to, occupied) & occupied;

        let mut colour = !self.turn();

        loop {
            let my_attackers = attackers & layout.colours[colour];
            if my_attackers.is_empty() {
                break;
            }

            for victim in PieceType::all() {
                next_victim = victim;
                if (my_attackers & layout.pieces[victim]).non_empty() {
                    break;
                }
            }

            if let Some(sq) = (my_attackers & layout.pieces[next_victim]).first() {
                occupied ^= sq.as_set();
            }

            // x-rays
            if matches!(next_victim, PieceType::Pawn | PieceType::Bishop | PieceType::Queen) {
                attackers |= bishop_attacks(to, occupied) & diag_sliders;
            }

            if matches!(next_victim, PieceType::Rook | PieceType::Queen) {
                attackers |= rook_attacks(to, occupied) & orth_sliders;
            }

            attackers &= occupied;

            colour = !colour;

            balance = -balance - 1 - see_value(next_victim, conf);

            if balance >= 0 {
                // a king cannot recapture into a defended square.
                if next_victim == PieceType::King && (attackers & layout.colours[colour]).non_empty() {
                    colour = !colour;
                }
                break;
            }
        }

        self.turn() != colour
    }
}

/// Pick the thread whose result to play: the deepest, then the highest-scoring.
pub fn select_best<'a, 'b>(thread_data: &'a [Box<ThreadData<'b>>], total_nodes: u64) -> &'a ThreadData<'b> {
    let mut best_thread: &ThreadData = &thread_data[0];

    for thread in thread_data.iter().skip(1) {
        if thread.pv().moves().is_empty() {
            continue;
        }
        let best_depth = best_thread.completed;
        let best_value = best_thread.pv().score();
        let this_depth = thread.completed;
        let this_score = thread.pv().score();
        if (this_depth == best_depth || this_score >= MINIMUM_MATE_SCORE) && this_score > best_value {
            best_thread = thread;
        }
        if this_depth > best_depth && (this_score > best_value || best_value < MINIMUM_MATE_SCORE) {
            best_thread = thread;
        }
    }

    // the GUI has only seen the main thread's lines so far.
    if best_thread.thread_id != 0 && thread_data[0].info.print_to_stdout {
        let pv = best_thread.pv();
        readout_info(&thread_data[0], Bound::Exact, pv, best_thread.completed, total_nodes, false);
    }

    best_thread
}

fn readout_info(t: &ThreadData, bound: Bound, pv: &PVariation, depth: usize, nodes: u64, force_print: bool) {
    #![allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    if t.info.skip_print() && !force_print {
        return;
    }
    let score_str = uci::format_score(pv.score);
    let elapsed = t.info.time_manager.elapsed();
    let nps = (nodes as f64 / elapsed.as_secs_f64().max(0.001)) as u64;
    let bound_string = match bound {
        Bound::Upper => " upperbound",
        Bound::Lower => " lowerbound",
        _ => "",
    };
    let pv_string = if pv.moves().is_empty() { String::new() } else { format!(" {pv}") };
    println!(
        "info depth {depth} seldepth {} score {score_str}{bound_string} nodes {nodes} time {} nps {nps} hashfull {}{pv_string}",
        t.info.seldepth,
        elapsed.as_millis(),
        t.tt.hashfull(),
    );
}

/// The score of a drawn position. A little noise keeps the search
/// from settling into threefold repetitions.
pub const fn draw_score(nodes: u64) -> i32 {
    #![allow(clippy::cast_possible_truncation)]
    (nodes & 0b11) as i32 - 2
}

#[derive(Clone, Debug)]
pub struct LMTable {
    /// Base LMR reduction, indexed by depth then move number.
    lm_reduction_table: [[i32; 64]; 64],
    /// Move count at which late move pruning starts, indexed by improving then depth.
    lmp_movecount_table: [[usize; 12]; 2],
}

impl LMTable {
    pub const NULL: Self = Self { lm_reduction_table: [[0; 64]; 64], lmp_movecount_table: [[0; 12]; 2] };

    pub fn new(config: &Config) -> Self {
        #![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
        let mut out = Self::NULL;
        let (base, division) = (config.lmr_base / 100.0, config.lmr_division / 100.0);
        cfor!(let mut depth = 1; depth < 64; depth += 1; {
            cfor!(let mut played = 1; played < 64; played += 1; {
                let ld = f64::ln(depth as f64);
                let lp = f64::ln(played as f64);
                out.lm_reduction_table[depth][played] = (base + ld * lp / division) as i32;
            });
        });
        cfor!(let mut depth = 1; depth < 12; depth += 1; {
            out.lmp_movecount_table[0][depth] = (2.5 + 2.0 * depth as f64 * depth as f64 / 4.5) as usize;
            out.lmp_movecount_table[1][depth] = (4.0 + 4.0 * depth as f64 * depth as f64 / 4.5) as usize;
        });
        out
    }

    pub fn lm_reduction(&self, depth: i32, played: usize) -> i32 {
        let depth: usize = depth.clamp(0, 63).try_into().unwrap_or_default();
        let played = played.min(63);
        self.lm_reduction_table[depth][played]
    }

    pub fn lmp_movecount(&self, depth: i32, improving: bool) -> usize {
        let depth: usize = depth.clamp(0, 11).try_into().unwrap_or_default();
        self.lmp_movecount_table[usize::from(improving)][depth]
    }
}

impl Default for LMTable {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

pub struct AspirationWindow {
    pub midpoint: i32,
    pub alpha: i32,
    pub beta: i32,
    pub alpha_fails: i32,
    pub beta_fails: i32,
    pub base: i32,
}

pub fn asp_window(base: i32, depth: i32) -> i32 {
    (base + (50 / depth.max(1) - 3)).max(10)
}

impl AspirationWindow {
    pub const fn infinite() -> Self {
        Self { alpha: -INFINITY, beta: INFINITY, midpoint: 0, alpha_fails: 0, beta_fails: 0, base: 0 }
    }

    pub fn around_value(value: i32, depth: i32, base: i32) -> Self {
        if is_mate_score(value) {
            // mate scores swing too far for a narrow window.
            Self { midpoint: value, alpha: -INFINITY, beta: INFINITY, alpha_fails: 0, beta_fails: 0, base }
        } else {
            Self {
                midpoint: value,
                alpha: value - asp_window(base, depth),
                beta: value + asp_window(base, depth),
                alpha_fails: 0,
                beta_fails: 0,
                base,
            }
        }
    }

    pub fn widen_down(&mut self, value: i32, depth: i32) {
        self.midpoint = value;
        let margin = asp_window(self.base, depth) << (self.alpha_fails + 1);
        if margin > 1369 {
            self.alpha = -INFINITY;
            return;
        }
        self.beta = (self.alpha + self.beta) / 2;
        self.alpha = self.midpoint - margin;
        self.alpha_fails += 1;
    }

    pub fn widen_up(&mut self, value: i32, depth: i32) {
        self.midpoint = value;
        let margin = asp_window(self.base, depth) << (self.beta_fails + 1);
        if margin > 1369 {
            self.beta = INFINITY;
            return;
        }
        self.beta = self.midpoint + margin;
        self.beta_fails += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU64};

    use super::*;
    use crate::{
        nnue::network::NNUEParams, threadlocal::make_thread_data, timemgmt::SearchLimit, transpositiontable::TT,
        util::MEGABYTE,
    };

    struct Outcome {
        score: i32,
        best_move: Option<Move>,
        nodes: u64,
    }

    fn run_search(fen: &str, limit: &SearchLimit, threads: usize) -> Outcome {
        let board = Board::from_fen(fen).unwrap();
        let mut tt = TT::new();
        tt.resize(MEGABYTE);
        let params = NNUEParams::builtin();
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let mut thread_data = make_thread_data(&board, tt.view(), &params, &stopped, &nodes, threads);
        for t in &mut thread_data {
            t.info.time_manager.start(limit.clone(), &t.info.conf);
        }
        let (score, best_move) = search_position(&mut thread_data);
        let nodes = thread_data[0].info.nodes.get_global();
        Outcome { score, best_move, nodes }
    }

    #[test]
    fn see_agrees_with_simple_exchanges() {
        let conf = Config::default();

        // pawn takes a hanging pawn.
        let board = Board::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let m = board.parse_uci("e4d5").unwrap();
        assert!(board.static_exchange_eval(&conf, m, 0));
        assert!(board.static_exchange_eval(&conf, m, conf.see_pawn_value));
        assert!(!board.static_exchange_eval(&conf, m, conf.see_pawn_value + 1));

        // rook takes a knight defended by a pawn.
        let board = Board::from_fen("4k3/8/4p3/3n4/8/8/8/K2R4 w - - 0 1").unwrap();
        let m = board.parse_uci("d1d5").unwrap();
        let net = conf.see_knight_value - conf.see_rook_value;
        assert!(!board.static_exchange_eval(&conf, m, 0));
        assert!(board.static_exchange_eval(&conf, m, net));
        assert!(!board.static_exchange_eval(&conf, m, net + 1));

        // queen takes a defended pawn.
        let board = Board::from_fen("4k3/2p5/3p4/8/8/8/8/K2Q4 w - - 0 1").unwrap();
        let m = board.parse_uci("d1d6").unwrap();
        assert!(!board.static_exchange_eval(&conf, m, 0));

        // a quiet move onto an undefended square loses nothing.
        let m = board.parse_uci("d1d2").unwrap();
        assert!(board.static_exchange_eval(&conf, m, 0));
    }

    #[test]
    fn finds_mate_in_one() {
        let outcome = run_search("6k1/5ppp/8/8/8/8/8/K2R4 w - - 0 1", &SearchLimit::Depth(4), 1);
        assert_eq!(outcome.best_move.map(|m| m.to_string()), Some("d1d8".to_string()));
        assert_eq!(outcome.score, mate_in(1));
    }

    #[test]
    fn checkmated_and_stalemated_roots_have_no_move() {
        let mated = run_search("R5k1/5ppp/8/8/8/8/8/K7 b - - 0 1", &SearchLimit::Depth(3), 1);
        assert_eq!(mated.best_move, None);
        assert_eq!(mated.score, mated_in(0));

        let stalemate = run_search("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", &SearchLimit::Depth(3), 1);
        assert_eq!(stalemate.best_move, None);
        assert_eq!(stalemate.score, 0);
    }

    #[test]
    fn best_moves_are_always_legal() {
        let fens = [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "r2q1rk1/pP1p2pp/Q4n2/bbp1p3/Np6/1B3NBn/pPPP1PPP/R3K2R b KQ - 0 1",
            "4k3/8/8/8/8/8/8/4K2R w K - 0 1",
        ];
        for fen in fens {
            let legal = Board::from_fen(fen).unwrap().legal_moves();
            for limit in [SearchLimit::Depth(1), SearchLimit::Nodes(3000)] {
                let outcome = run_search(fen, &limit, 2);
                let best = outcome.best_move.unwrap();
                assert!(legal.contains(&best), "{best} is not legal in {fen}");
            }
        }
    }

    #[test]
    fn node_limits_hold_across_threads() {
        const LIMIT: u64 = 20_000;
        for threads in [1, 3] {
            let outcome = run_search(
                "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
                &SearchLimit::Nodes(LIMIT),
                threads,
            );
            assert!(outcome.best_move.is_some());
            assert!(outcome.nodes <= LIMIT + threads as u64, "searched {} nodes", outcome.nodes);
            assert!(outcome.nodes >= LIMIT / 2, "searched only {} nodes", outcome.nodes);
        }
    }

    #[test]
    fn only_move_is_played() {
        // the only legal move is to take the undefended checking queen.
        let outcome = run_search("7k/6Q1/8/8/8/8/8/K7 b - - 0 1", &SearchLimit::Depth(6), 1);
        assert_eq!(outcome.best_move.map(|m| m.to_string()), Some("h8g7".to_string()));
    }

    #[test]
    fn reductions_grow_with_depth_and_move_count() {
        let table = LMTable::default();
        assert!(table.lm_reduction(20, 30) >= table.lm_reduction(4, 3));
        assert!(table.lm_reduction(200, 200) == table.lm_reduction(63, 63));
        assert!(table.lmp_movecount(5, true) > table.lmp_movecount(5, false));
    }

    #[test]
    fn aspiration_windows_widen_until_infinite() {
        let mut aw = AspirationWindow::around_value(40, 10, Config::default().aspiration_window);
        assert!(aw.alpha > -INFINITY && aw.beta < INFINITY);
        let width = aw.beta - aw.alpha;
        aw.widen_up(aw.beta, 10);
        assert!(aw.beta - aw.alpha > width);
        for _ in 0..16 {
            aw.widen_down(aw.alpha, 10);
        }
        assert_eq!(aw.alpha, -INFINITY);

        let mate = AspirationWindow::around_value(mate_in(7), 10, 20);
        assert_eq!((mate.alpha, mate.beta), (-INFINITY, INFINITY));
    }

    #[test]
    fn razoring_respects_its_depth_limit() {
        let conf = Config::default();
        let hopeless = -10_000;
        assert!(should_razor(&conf, 1, hopeless, 0));
        assert!(should_razor(&conf, conf.razoring_depth, hopeless, 0));
        assert!(!should_razor(&conf, conf.razoring_depth + 1, hopeless, 0));
        assert!(!should_razor(&conf, 1, 0, 0));
    }

    #[test]
    fn see_pruning_only_at_non_pv_nodes_out_of_check() {
        assert!(see_pruning_allowed::<OffPV>(false));
        assert!(!see_pruning_allowed::<OffPV>(true));
        assert!(!see_pruning_allowed::<OnPV>(false));
        assert!(!see_pruning_allowed::<Root>(false));
    }

    #[test]
    fn draw_scores_are_small() {
        for nodes in 0..8 {
            assert!((-2..=1).contains(&draw_score(nodes)));
        }
    }
}
