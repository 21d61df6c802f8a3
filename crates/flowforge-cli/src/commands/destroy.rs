//! `destroy` — stops the worker pool, retires completed jobs, and exits.

use console::style;
use flowforge_engine::Engine;

pub fn execute(engine: &mut Engine) {
    engine.destroy();
    println!("{} engine destroyed", style("ok:").green().bold());
}
