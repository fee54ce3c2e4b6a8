// crates/server/src/bin/loggen.rs
//! Test log generator: appends numbered lines to a file at an interval.
//!
//! Usage: loggen <path> [interval-ms] [count]

use std::fs::OpenOptions;
use std::io::Write;
use std::thread;
use std::time::Duration;

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: loggen <path> [interval-ms] [count]");
        std::process::exit(2);
    };
    let interval_ms: u64 = args.next().and_then(|v| v.parse().ok()).unwrap_or(1000);
    let count: u64 = args.next().and_then(|v| v.parse().ok()).unwrap_or(u64::MAX);

    for i in 1..=count {
        let mut file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("loggen: cannot open {path}: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = writeln!(file, "Line {i}: entry {i}") {
            eprintln!("loggen: write failed: {e}");
            std::process::exit(1);
        }
        thread::sleep(Duration::from_millis(interval_ms));
    }
}
