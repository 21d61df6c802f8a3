//! `stop` — signals the worker pool to drain and exits the prompt loop.

use console::style;
use flowforge_engine::Engine;

pub fn execute(engine: &mut Engine) {
    engine.stop();
    println!("{} worker pool stopped", style("ok:").green().bold());
}
