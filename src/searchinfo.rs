use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc,
};

use crate::{
    search::{LMTable, parameters::Config},
    timemgmt::TimeManager,
    uci,
    util::BatchedAtomicCounter,
};

/// Limits, counters and stop signals for one search thread.
pub struct SearchInfo<'a> {
    /// Signal to stop the search, shared by every thread.
    pub stopped: &'a AtomicBool,
    /// The number of nodes searched.
    pub nodes: BatchedAtomicCounter<'a>,
    /// Nodes spent under each root move, indexed by from and to squares.
    pub root_move_nodes: [[u64; 64]; 64],
    pub time_manager: TimeManager,
    pub conf: Config,
    pub lm_table: LMTable,
    /// The highest ply reached in the current iteration.
    pub seldepth: usize,
    /// Whether to print the search info to stdout.
    pub print_to_stdout: bool,
    /// Whether this thread owns the clock and the command channel.
    pub main_thread: bool,
    /// A handle to a receiver for stdin.
    pub stdin_rx: Option<&'a Mutex<mpsc::Receiver<String>>>,
}

impl<'a> SearchInfo<'a> {
    pub fn new(stopped: &'a AtomicBool, nodes: &'a AtomicU64) -> Self {
        Self {
            stopped,
            nodes: BatchedAtomicCounter::new(nodes),
            root_move_nodes: [[0; 64]; 64],
            time_manager: TimeManager::default(),
            conf: Config::default(),
            lm_table: LMTable::default(),
            seldepth: 0,
            print_to_stdout: false,
            main_thread: false,
            stdin_rx: None,
        }
    }

    pub fn set_up_for_search(&mut self) {
        self.stopped.store(false, Ordering::SeqCst);
        self.nodes.reset();
        let granularity =
            if self.time_manager.limit().is_node_limited() { 1 } else { BatchedAtomicCounter::DEFAULT_GRANULARITY };
        self.nodes.set_granularity(granularity);
        self.root_move_nodes = [[0; 64]; 64];
        self.seldepth = 0;
    }

    /// Apply a new set of search parameters.
    pub fn set_conf(&mut self, conf: &Config) {
        if self.conf != *conf {
            self.conf = conf.clone();
            self.lm_table = LMTable::new(conf);
        }
    }

    /// Check if the search should stop, polling the limits and,
    /// on the main thread, the command channel.
    pub fn check_up(&mut self) -> bool {
        if self.stopped() {
            return true;
        }
        if self.time_manager.check_up(self.stopped, self.nodes.get_global(), self.main_thread) {
            return true;
        }
        if self.main_thread {
            self.poll_stdin();
        }
        self.stopped()
    }

    fn poll_stdin(&self) {
        let Some(rx) = self.stdin_rx else {
            return;
        };
        let Ok(rx) = rx.try_lock() else {
            return;
        };
        while let Ok(cmd) = rx.try_recv() {
            match cmd.trim() {
                "stop" => self.stopped.store(true, Ordering::SeqCst),
                "quit" => {
                    self.stopped.store(true, Ordering::SeqCst);
                    uci::QUIT.store(true, Ordering::SeqCst);
                }
                "isready" => println!("readyok"),
                other => eprintln!("info string ignoring command \"{other}\" during search"),
            }
        }
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Info lines in the first few milliseconds of a timed game are noise.
    pub fn skip_print(&self) -> bool {
        self.time_manager.is_dynamic() && self.time_manager.elapsed().as_millis() < 50
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timemgmt::SearchLimit;

    #[test]
    fn node_limited_searches_count_every_node() {
        let stopped = AtomicBool::new(true);
        let nodes = AtomicU64::new(77);
        let mut info = SearchInfo::new(&stopped, &nodes);
        info.time_manager.start(SearchLimit::Nodes(3), &Config::default());
        info.set_up_for_search();
        assert!(!info.stopped());
        assert_eq!(nodes.load(Ordering::SeqCst), 0);
        info.nodes.increment();
        info.nodes.increment();
        assert!(!info.check_up());
        info.nodes.increment();
        assert!(info.check_up());
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn stop_arrives_over_the_channel() {
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let (tx, rx) = mpsc::channel();
        let rx = Mutex::new(rx);
        let mut info = SearchInfo::new(&stopped, &nodes);
        info.main_thread = true;
        info.stdin_rx = Some(&rx);
        info.set_up_for_search();
        assert!(!info.check_up());
        tx.send("stop".to_string()).unwrap();
        assert!(info.check_up());
    }
}
