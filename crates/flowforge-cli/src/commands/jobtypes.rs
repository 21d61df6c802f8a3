//! `jobtypes` — lists every registered job type.

use console::style;
use flowforge_engine::Engine;

pub fn execute(engine: &Engine) {
    let types = engine.list_types();
    let Some(types) = types["availableJobTypes"].as_array() else {
        return;
    };
    if types.is_empty() {
        println!("{}", style("no job types registered").dim());
        return;
    }
    for job_type in types {
        if let Some(name) = job_type.as_str() {
            println!("  {}", style(name).cyan());
        }
    }
}
