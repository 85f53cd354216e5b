use clap::{Parser, Subcommand};

use crate::uci::BENCH_DEPTH;

#[derive(Parser)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub subcommand: Option<Subcommands>,
}

#[derive(Subcommand)]
pub enum Subcommands {
    /// Run perft. With no depth, checks the built-in suite of positions.
    Perft {
        /// Depth to enumerate to, printing a per-move breakdown.
        #[clap(long, short)]
        depth: Option<usize>,
        /// Position to enumerate from. Defaults to the starting position.
        #[clap(long, value_name = "FEN")]
        fen: Option<String>,
        /// Skip suite entries with more nodes than this.
        #[clap(long, value_name = "NODES", default_value = "50000000")]
        limit: u64,
    },
    /// Search a fixed set of positions, printing the node count and speed.
    Bench {
        /// Depth to search each position to.
        #[clap(long, short, default_value_t = BENCH_DEPTH)]
        depth: usize,
        /// Hash table size in megabytes.
        #[clap(long, value_name = "MB", default_value = "16")]
        hash: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["lapwing", "perft", "--depth", "4", "--fen", "8/8/8/8/8/8/8/K1k5 w - - 0 1"])
            .unwrap();
        assert!(matches!(
            cli.subcommand,
            Some(Subcommands::Perft { depth: Some(4), fen: Some(_), limit: 50_000_000 })
        ));
        let cli = Cli::try_parse_from(["lapwing", "bench"]).unwrap();
        assert!(matches!(cli.subcommand, Some(Subcommands::Bench { depth: BENCH_DEPTH, hash: 16 })));
        assert!(Cli::try_parse_from(["lapwing", "bench", "--depth", "deep"]).is_err());
    }
}
