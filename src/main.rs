#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::multiple_crate_versions,
    clippy::module_name_repetitions,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

//! Lapwing, a UCI chess engine written in Rust.

#[macro_use]
mod macros;

mod chess;
mod cli;
mod cuckoo;
mod errors;
mod evaluation;
mod history;
mod historytable;
mod lookups;
mod nnue;
mod perft;
mod rng;
mod search;
mod searchinfo;
mod stack;
mod threadlocal;
mod timemgmt;
mod transpositiontable;
mod uci;
mod util;

use anyhow::Context;

use crate::chess::board::Board;

/// The name of the engine.
pub static NAME: &str = "Lapwing";
/// The version of the engine.
pub static VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    chess::magic::init();
    cuckoo::init();

    if std::env::args_os().len() == 1 {
        // fast path to UCI:
        return uci::main_loop();
    }

    let cli = <cli::Cli as clap::Parser>::parse();

    match cli.subcommand {
        Some(cli::Subcommands::Perft { depth: None, limit, .. }) => perft::gamut(limit),
        Some(cli::Subcommands::Perft { depth: Some(depth), fen, .. }) => {
            let mut pos = match fen {
                Some(fen) => Board::from_fen(&fen).with_context(|| format!("invalid FEN {fen:?}"))?,
                None => Board::default(),
            };
            perft::divide(&mut pos, depth);
            Ok(())
        }
        Some(cli::Subcommands::Bench { depth, hash }) => uci::bench(depth, hash).map(|_| ()),
        None => uci::main_loop(),
    }
}
