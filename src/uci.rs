mod fmt;

use std::{
    io::Write,
    str::FromStr,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc,
    },
    time::Instant,
};

use anyhow::{Context, anyhow};

pub use self::fmt::format_score;

use crate::{
    NAME, VERSION,
    chess::{board::Board, piece::Colour},
    errors::{MoveParseError, UciError},
    nnue::network::NNUEParams,
    perft,
    search::{parameters::Config, search_position},
    threadlocal::{ThreadData, make_thread_data},
    timemgmt::SearchLimit,
    transpositiontable::TT,
    util::MEGABYTE,
};

/// Set when a `quit` arrives, possibly in the middle of a search.
pub static QUIT: AtomicBool = AtomicBool::new(false);
static STDIN_READER_THREAD_KEEP_RUNNING: AtomicBool = AtomicBool::new(true);

const UCI_MAX_HASH_MEGABYTES: usize = 1_048_576;
const UCI_MAX_THREADS: usize = 512;
const BUILTIN_NETWORK: &str = "<builtin>";

pub const BENCH_DEPTH: usize = 12;
const BENCH_POSITIONS: [&str; 12] = [
    "r3k2r/2pb1ppp/2pp1q2/p7/1nP1B3/1P2P3/P2N1PPP/R2QK2R w KQkq a6 0 14",
    "4rrk1/2p1b1p1/p1p3q1/4p3/2P2n1p/1P1NR2P/PB3PP1/3R1QK1 b - - 2 24",
    "r3qbrk/6p1/2b2pPp/p3pP1Q/PpPpP2P/3P1B2/2PB3K/R5R1 w - - 16 42",
    "6k1/1R3p2/6p1/2Bp3p/3P2q1/P7/1P2rQ1K/5R2 b - - 4 44",
    "8/8/1p2k1p1/3p3p/1p1P1P1P/1P2PK2/8/8 w - - 3 54",
    "7r/2p3k1/1p1p1qp1/1P1Bp3/p1P2r1P/P7/4R3/Q4RK1 w - - 0 36",
    "r1bq1rk1/pp2b1pp/n1pp1n2/3P1p2/2P1p3/2N1P2N/PP2BPPP/R2QKB1R w KQ - 0 9",
    "3r3k/2r4p/1p1b3q/p4P2/P2Pp3/1B2P3/3BQ1RP/6K1 w - - 3 87",
    "2r4r/1p4k1/1Pnp4/3Qb1pq/8/4BpPp/5P2/2RR1BK1 w - - 0 42",
    "4q1bk/6b1/7p/p1p4p/PNPpP2P/KN4P1/3Q4/4R3 b - - 0 37",
    "2q3r1/1r2pk2/pp3pp1/2pP3p/P1Pb1BbP/1P4Q1/R3NPP1/4R1K1 w - - 2 34",
    "1r2r2k/1b4q1/pp5p/2pPp1p1/P3Pn2/1P1B1Q1P/2R3P1/4BR1K b - - 1 37",
];

fn parse_value<T: FromStr>(name: &str, value: Option<&str>) -> Result<T, UciError> {
    let value = value.ok_or(UciError::UnexpectedEnd("a value"))?;
    value.parse().map_err(|_| UciError::InvalidValue { name: name.to_string(), value: value.to_string() })
}

/// Clock fields may come through negative when a GUI is running late.
fn parse_clock(name: &str, value: Option<&str>) -> Result<u64, UciError> {
    let ms: i64 = parse_value(name, value)?;
    Ok(u64::try_from(ms).unwrap_or(0))
}

// position fen
// position startpos
// ... moves e2e4 e7e5 b7b8q
fn parse_position(text: &str, pos: &mut Board) -> Result<(), UciError> {
    let mut parts = text.split_ascii_whitespace();
    parts.next().ok_or(UciError::UnexpectedEnd("\"position\""))?;
    let determiner = parts.next().ok_or(UciError::UnexpectedEnd("\"startpos\" or \"fen\""))?;
    let mut new_pos = match determiner {
        "startpos" => {
            let moves = parts.next();
            if !matches!(moves, Some("moves") | None) {
                return Err(UciError::InvalidValue {
                    name: "position startpos".into(),
                    value: moves.unwrap_or_default().into(),
                });
            }
            Board::default()
        }
        "fen" => {
            let fen = parts.by_ref().take_while(|&part| part != "moves").collect::<Vec<_>>().join(" ");
            Board::from_fen(&fen)?
        }
        other => return Err(UciError::InvalidValue { name: "position".into(), value: other.into() }),
    };
    for text in parts {
        let m = new_pos.parse_uci(text)?;
        if !new_pos.make_move_simple(m) {
            return Err(MoveParseError::IllegalMove(text.into()).into());
        }
    }
    new_pos.zero_height();
    *pos = new_pos;
    Ok(())
}

/// Parses a `go` command into a search limit. When several limits are
/// given, the last one wins.
fn parse_go(text: &str, pos: &Board) -> Result<SearchLimit, UciError> {
    let us = pos.turn();
    let mut limit = SearchLimit::Infinite;
    let mut clocks = [0; 2];
    let mut incs = [0; 2];
    let mut moves_to_go = None;

    let mut parts = text.split_ascii_whitespace().skip(1);
    while let Some(part) = parts.next() {
        match part {
            "depth" => limit = SearchLimit::Depth(parse_value(part, parts.next())?),
            "nodes" => limit = SearchLimit::Nodes(parse_value(part, parts.next())?),
            "movetime" => limit = SearchLimit::Time(parse_clock(part, parts.next())?),
            "infinite" => limit = SearchLimit::Infinite,
            "wtime" | "btime" | "winc" | "binc" | "movestogo" => {
                let value = parse_clock(part, parts.next())?;
                match part {
                    "wtime" => clocks[Colour::White] = value,
                    "btime" => clocks[Colour::Black] = value,
                    "winc" => incs[Colour::White] = value,
                    "binc" => incs[Colour::Black] = value,
                    _ => moves_to_go = Some(value.max(1)),
                }
                limit = SearchLimit::Dynamic {
                    our_clock: clocks[us],
                    their_clock: clocks[!us],
                    our_inc: incs[us],
                    their_inc: incs[!us],
                    moves_to_go,
                };
            }
            other => eprintln!("info string ignoring term in go: {other}"),
        }
    }

    Ok(limit)
}

/// Splits `setoption name <id> [value <x>]` into its id and value.
fn parse_setoption(text: &str) -> Result<(String, String), UciError> {
    let mut parts = text.split_ascii_whitespace().skip(1);
    if parts.next() != Some("name") {
        return Err(UciError::UnexpectedEnd("\"name\""));
    }
    let mut name = Vec::new();
    for part in parts.by_ref() {
        if part == "value" {
            break;
        }
        name.push(part);
    }
    if name.is_empty() {
        return Err(UciError::UnexpectedEnd("an option name"));
    }
    let value = parts.collect::<Vec<_>>().join(" ");
    Ok((name.join(" "), value))
}

fn stdin_reader() -> anyhow::Result<mpsc::Receiver<String>> {
    let (sender, receiver) = mpsc::channel();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || stdin_reader_worker(&sender))
        .context("couldn't start stdin reader worker thread")?;
    Ok(receiver)
}

fn stdin_reader_worker(sender: &mpsc::Sender<String>) {
    let mut linebuf = String::with_capacity(128);
    while let Ok(bytes) = std::io::stdin().read_line(&mut linebuf) {
        if bytes == 0 {
            // EOF
            let _ = sender.send("quit".into());
            break;
        }
        let cmd = linebuf.trim();
        if !cmd.is_empty() && sender.send(cmd.to_owned()).is_err() {
            break;
        }
        if !STDIN_READER_THREAD_KEEP_RUNNING.load(Ordering::SeqCst) {
            break;
        }
        linebuf.clear();
    }
}

fn print_uci_response(conf: &Config) {
    println!("id name {NAME} {VERSION}");
    println!("id author the {NAME} developers");
    println!("option name Hash type spin default {} min 1 max {UCI_MAX_HASH_MEGABYTES}", TT::DEFAULT_SIZE_MB);
    println!("option name Threads type spin default 1 min 1 max {UCI_MAX_THREADS}");
    println!("option name EvalFile type string default {BUILTIN_NETWORK}");
    #[cfg(feature = "tuning")]
    print!("{}", conf.uci_options());
    #[cfg(not(feature = "tuning"))]
    let _ = conf;
    println!("uciok");
}

/// Prints the raw network output and the scaled evaluation of `pos`.
fn print_eval(t: &mut ThreadData, pos: &Board) {
    t.board = pos.clone();
    t.nnue.reinit_from(&t.board, t.nnue_params);
    let raw = t.nnue.evaluate(t.nnue_params, t.board.turn());
    let scaled = t.evaluate();
    println!("eval {raw} scaled {scaled} (side to move)");
}

fn print_position(pos: &Board) {
    print!("{}", pos.state().piece_layout);
    println!("fen: {pos}");
    println!("key: {:016X}", pos.key());
    let checkers = pos.state().checkers.into_iter().map(|sq| sq.to_string()).collect::<Vec<_>>();
    println!("checkers: {}", if checkers.is_empty() { "-".to_string() } else { checkers.join(" ") });
}

fn apply_search_settings<'a>(
    thread_data: &mut [Box<ThreadData<'a>>],
    tt: &'a TT,
    conf: &Config,
    limit: &SearchLimit,
    pos: &Board,
) {
    let view = tt.view();
    for t in thread_data.iter_mut() {
        t.board = pos.clone();
        t.tt = view;
        t.info.set_conf(conf);
        t.info.time_manager.start(limit.clone(), conf);
        t.info.print_to_stdout = false;
    }
}

#[allow(clippy::too_many_lines)]
pub fn main_loop() -> anyhow::Result<()> {
    let mut tt = TT::new();
    tt.resize(TT::DEFAULT_SIZE_MB * MEGABYTE);
    let mut nnue_params = NNUEParams::builtin();
    let stopped = AtomicBool::new(false);
    let nodes = AtomicU64::new(0);
    let stdin = Mutex::new(stdin_reader()?);
    let mut conf = Config::default();
    let mut num_threads = 1;
    let mut pos = Board::default();

    let mut thread_data = make_thread_data(&pos, tt.view(), &nnue_params, &stopped, &nodes, num_threads);

    loop {
        std::io::stdout().flush().context("couldn't flush stdout")?;
        let line = {
            let rx = stdin.lock().map_err(|_| anyhow!("stdin channel lock poisoned"))?;
            match rx.recv() {
                Ok(line) => line,
                Err(_) => break,
            }
        };
        let input = line.trim();

        let res = match input {
            "" => continue,
            "uci" => {
                print_uci_response(&conf);
                Ok(())
            }
            "isready" => {
                println!("readyok");
                Ok(())
            }
            "quit" => break,
            "stop" => Ok(()),
            "ucinewgame" => {
                pos = Board::default();
                tt.clear(num_threads);
                for t in &mut thread_data {
                    t.clear_tables();
                }
                Ok(())
            }
            "eval" => {
                if let Some(t) = thread_data.first_mut() {
                    print_eval(t, &pos);
                }
                Ok(())
            }
            "show" | "d" => {
                print_position(&pos);
                Ok(())
            }
            input if input.starts_with("setoption") => match parse_setoption(input) {
                Ok((name, value)) => match name.to_ascii_lowercase().as_str() {
                    "hash" => match value.parse::<usize>() {
                        Ok(mb) if (1..=UCI_MAX_HASH_MEGABYTES).contains(&mb) => {
                            drop(thread_data);
                            tt.resize(mb * MEGABYTE);
                            thread_data =
                                make_thread_data(&pos, tt.view(), &nnue_params, &stopped, &nodes, num_threads);
                            println!("info string hash table resized to {} MB", tt.size_mb());
                            Ok(())
                        }
                        _ => Err(UciError::InvalidValue { name, value }),
                    },
                    "threads" => match value.parse::<usize>() {
                        Ok(n) if (1..=UCI_MAX_THREADS).contains(&n) => {
                            num_threads = n;
                            drop(thread_data);
                            thread_data =
                                make_thread_data(&pos, tt.view(), &nnue_params, &stopped, &nodes, num_threads);
                            Ok(())
                        }
                        _ => Err(UciError::InvalidValue { name, value }),
                    },
                    "evalfile" => {
                        let loaded = if value.is_empty() || value == BUILTIN_NETWORK {
                            Ok(NNUEParams::builtin())
                        } else {
                            NNUEParams::from_file(&value)
                        };
                        match loaded {
                            Ok(params) => {
                                drop(thread_data);
                                nnue_params = params;
                                thread_data =
                                    make_thread_data(&pos, tt.view(), &nnue_params, &stopped, &nodes, num_threads);
                                println!("info string loaded network {value}");
                                Ok(())
                            }
                            Err(e) => {
                                eprintln!("info string failed to load network from {value}, keeping the current one");
                                Err(e.into())
                            }
                        }
                    }
                    _ => conf.set_by_name(&name, &value),
                },
                Err(e) => Err(e),
            },
            input if input.starts_with("position") => parse_position(input, &mut pos),
            input if input.starts_with("go") => match parse_go(input, &pos) {
                Ok(limit) => {
                    tt.increase_age();
                    apply_search_settings(&mut thread_data, &tt, &conf, &limit, &pos);
                    if let Some(main) = thread_data.first_mut() {
                        main.info.print_to_stdout = true;
                        main.info.stdin_rx = Some(&stdin);
                    }
                    search_position(&mut thread_data);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            input if input.starts_with("perft") => {
                let depth = parse_value::<usize>("perft", input.split_ascii_whitespace().nth(1));
                depth.map(|depth| {
                    perft::divide(&mut pos, depth);
                })
            }
            input if input.starts_with("bench") => bench_command(input),
            _ => Err(UciError::UnknownCommand(input.to_string())),
        };

        if let Err(e) = res {
            eprintln!("info string {e}");
        }

        if QUIT.load(Ordering::SeqCst) {
            // quit can arrive during a search
            break;
        }
    }
    STDIN_READER_THREAD_KEEP_RUNNING.store(false, Ordering::SeqCst);
    Ok(())
}

/// `bench [depth]` from the UCI loop. A failed bench is reported, not fatal.
fn bench_command(input: &str) -> Result<(), UciError> {
    let depth = match input.split_ascii_whitespace().nth(1) {
        Some(d) => parse_value::<usize>("bench", Some(d))?,
        None => BENCH_DEPTH,
    };
    if let Err(e) = bench(depth, TT::DEFAULT_SIZE_MB) {
        eprintln!("info string bench failed: {e:#}");
    }
    Ok(())
}

/// Searches a fixed set of positions to a fixed depth, reporting the total
/// node count and speed. The node count is a signature of the search.
pub fn bench(depth: usize, hash_mb: usize) -> anyhow::Result<u64> {
    let mut tt = TT::new();
    tt.resize(hash_mb * MEGABYTE);
    let nnue_params = NNUEParams::builtin();
    let stopped = AtomicBool::new(false);
    let nodes = AtomicU64::new(0);
    let conf = Config::default();
    let mut thread_data = make_thread_data(&Board::default(), tt.view(), &nnue_params, &stopped, &nodes, 1);
    let limit = SearchLimit::Depth(depth);

    let mut total_nodes = 0;
    let start = Instant::now();
    for fen in BENCH_POSITIONS {
        let pos = Board::from_fen(fen).with_context(|| format!("invalid bench position {fen}"))?;
        tt.clear(1);
        for t in &mut thread_data {
            t.clear_tables();
        }
        apply_search_settings(&mut thread_data, &tt, &conf, &limit, &pos);
        search_position(&mut thread_data);
        total_nodes += thread_data[0].info.nodes.get_global();
    }
    let elapsed = start.elapsed();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let nps = (total_nodes as f64 / elapsed.as_secs_f64().max(0.001)) as u64;
    println!("{total_nodes} nodes {nps} nps");
    Ok(total_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_command_reports_instead_of_failing() {
        assert!(matches!(bench_command("bench deep"), Err(UciError::InvalidValue { .. })));
        assert!(bench_command("bench 1").is_ok());
    }

    #[test]
    fn position_commands() {
        let mut pos = Board::default();
        parse_position("position startpos moves e2e4 e7e5 g1f3", &mut pos).unwrap();
        assert_eq!(pos.to_string(), "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2");
        assert_eq!(pos.height(), 0);

        parse_position("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1 moves e2e4", &mut pos).unwrap();
        assert_eq!(pos.to_string(), "4k3/8/8/8/4P3/8/8/4K3 b - - 0 1");

        // a bad command leaves the position alone.
        let before = pos.to_string();
        assert!(parse_position("position startpos moves e2e5", &mut pos).is_err());
        assert!(parse_position("position fen 8/8/8 w - - 0 1", &mut pos).is_err());
        assert!(parse_position("position sideways", &mut pos).is_err());
        assert_eq!(pos.to_string(), before);
    }

    #[test]
    fn go_limits() {
        let white = Board::default();
        assert_eq!(parse_go("go depth 7", &white).unwrap(), SearchLimit::Depth(7));
        assert_eq!(parse_go("go nodes 5000", &white).unwrap(), SearchLimit::Nodes(5000));
        assert_eq!(parse_go("go movetime 250", &white).unwrap(), SearchLimit::Time(250));
        assert_eq!(parse_go("go infinite", &white).unwrap(), SearchLimit::Infinite);
        assert_eq!(parse_go("go", &white).unwrap(), SearchLimit::Infinite);
        assert!(parse_go("go depth", &white).is_err());
        assert!(parse_go("go nodes lots", &white).is_err());

        let clock = "go wtime 60000 btime 30000 winc 1000 binc 500 movestogo 20";
        assert_eq!(
            parse_go(clock, &white).unwrap(),
            SearchLimit::Dynamic {
                our_clock: 60000,
                their_clock: 30000,
                our_inc: 1000,
                their_inc: 500,
                moves_to_go: Some(20)
            }
        );
        let black = Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1").unwrap();
        assert_eq!(
            parse_go("go wtime -20 btime 30000", &black).unwrap(),
            SearchLimit::Dynamic { our_clock: 30000, their_clock: 0, our_inc: 0, their_inc: 0, moves_to_go: None }
        );
    }

    #[test]
    fn last_go_limit_wins() {
        let pos = Board::default();
        assert_eq!(parse_go("go wtime 1000 btime 1000 depth 5", &pos).unwrap(), SearchLimit::Depth(5));
        assert_eq!(parse_go("go depth 5 nodes 100", &pos).unwrap(), SearchLimit::Nodes(100));
        assert!(matches!(parse_go("go depth 5 wtime 1000", &pos).unwrap(), SearchLimit::Dynamic { .. }));
    }

    #[test]
    fn setoption_names_and_values() {
        assert_eq!(parse_setoption("setoption name Hash value 64").unwrap(), ("Hash".into(), "64".into()));
        assert_eq!(
            parse_setoption("setoption name EvalFile value nets/my net.bin").unwrap(),
            ("EvalFile".into(), "nets/my net.bin".into())
        );
        assert_eq!(parse_setoption("setoption name Clear Hash").unwrap(), ("Clear Hash".into(), String::new()));
        assert!(parse_setoption("setoption Hash 64").is_err());
        assert!(parse_setoption("setoption name value 3").is_err());
    }
}
