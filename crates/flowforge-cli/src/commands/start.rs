//! `start [workers]` — starts the worker pool, optionally sizing it.

use console::style;
use flowforge_engine::Engine;

pub fn execute(engine: &mut Engine, args: &str) {
    let worker_count = match args.trim() {
        "" => None,
        n => match n.parse::<usize>() {
            Ok(n) => Some(n),
            Err(_) => {
                eprintln!("{} usage: start [worker-count]", style("error:").red().bold());
                return;
            }
        },
    };

    engine.start(worker_count);
    println!("{} worker pool started", style("ok:").green().bold());
}
