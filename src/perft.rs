use std::time::Instant;

use anyhow::bail;

use crate::chess::board::{Board, movegen::MoveList};

/// Positions with known move-path enumeration counts, indexed by depth - 1.
pub const SUITE: [(&str, &[u64]); 6] = [
    (Board::STARTING_FEN, &[20, 400, 8_902, 197_281, 4_865_609, 119_060_324]),
    (
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        &[48, 2_039, 97_862, 4_085_603, 193_690_690],
    ),
    ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", &[14, 191, 2_812, 43_238, 674_624, 11_030_083]),
    (
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        &[6, 264, 9_467, 422_333, 15_833_292],
    ),
    ("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", &[44, 1_486, 62_379, 2_103_487, 89_941_194]),
    (
        "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        &[46, 2_079, 89_890, 3_894_594, 164_075_551],
    ),
];

pub fn perft(pos: &mut Board, depth: usize) -> u64 {
    debug_assert!(pos.check_validity().is_ok(), "{pos}");

    if depth == 0 {
        return 1;
    }

    let mut ml = MoveList::new();
    pos.generate_moves(&mut ml);

    let mut count = 0;
    for m in ml.iter_moves() {
        if !pos.make_move_simple(m) {
            continue;
        }
        count += if depth == 1 { 1 } else { perft(pos, depth - 1) };
        pos.unmake_move_base();
    }

    count
}

/// Perft with a per-move breakdown at the root, printed as it goes.
pub fn divide(pos: &mut Board, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }
    let start = Instant::now();
    let mut total = 0;
    for m in pos.legal_moves() {
        if !pos.make_move_simple(m) {
            continue;
        }
        let nodes = perft(pos, depth - 1);
        pos.unmake_move_base();
        println!("{m}: {nodes}");
        total += nodes;
    }
    let elapsed = start.elapsed();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let nps = (total as f64 / elapsed.as_secs_f64().max(0.001)) as u64;
    println!("info string perft depth {depth} nodes {total} time {} nps {nps}", elapsed.as_millis());
    total
}

/// Runs every position in the suite up to `node_limit` nodes per depth.
pub fn gamut(node_limit: u64) -> anyhow::Result<()> {
    let start = Instant::now();
    for (fen, counts) in SUITE {
        let mut pos = Board::from_fen(fen)?;
        for (depth, &expected) in (1..).zip(counts) {
            if expected > node_limit {
                break;
            }
            let nodes = perft(&mut pos, depth);
            if nodes != expected {
                bail!("perft mismatch on {fen} at depth {depth}: expected {expected}, got {nodes}");
            }
            println!("PASS: fen {fen}, depth {depth}, nodes {nodes}");
        }
    }
    println!("all perft tests passed in {}ms", start.elapsed().as_millis());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(fen: &str, max_depth: usize) {
        let (_, counts) = SUITE.iter().find(|(f, _)| *f == fen).unwrap();
        let mut pos = Board::from_fen(fen).unwrap();
        for (depth, &expected) in (1..=max_depth).zip(counts.iter()) {
            assert_eq!(perft(&mut pos, depth), expected, "{fen} at depth {depth}");
        }
        assert_eq!(pos.to_string(), Board::from_fen(fen).unwrap().to_string());
    }

    #[test]
    fn perft_start_position() {
        check(Board::STARTING_FEN, 3);
    }

    #[test]
    fn perft_kiwipete() {
        check("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1", 3);
    }

    #[test]
    fn perft_tricky_positions() {
        check("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", 4);
        check("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1", 3);
        check("rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8", 3);
        check("r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10", 3);
    }

    #[test]
    fn divide_sums_to_perft() {
        let mut pos = Board::default();
        assert_eq!(divide(&mut pos, 3), 8_902);
    }

    #[test]
    #[ignore = "slow"]
    fn perft_start_position_deep() {
        let mut pos = Board::default();
        assert_eq!(perft(&mut pos, 6), 119_060_324);
    }

    #[test]
    #[ignore = "slow"]
    fn perft_kiwipete_deep() {
        let mut pos =
            Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        assert_eq!(perft(&mut pos, 5), 193_690_690);
    }

    #[test]
    #[ignore = "slow"]
    fn perft_suite_deep() {
        gamut(u64::MAX).unwrap();
    }
}
