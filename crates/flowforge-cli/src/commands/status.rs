//! `status <id>` — prints a job's current status.

use console::style;
use flowforge_engine::{Engine, JobId};

pub fn execute(engine: &Engine, args: &str) {
    let Some(id) = args.trim().parse::<u64>().ok().map(JobId) else {
        eprintln!("{} usage: status <id>", style("error:").red().bold());
        return;
    };

    let result = engine.status(id);
    let status = result["status"].as_str().unwrap_or("unknown");
    let styled = match status {
        "completed" => style(status).green(),
        "retired" => style(status).dim(),
        "running" => style(status).cyan(),
        "never seen" => style(status).red(),
        _ => style(status).yellow(),
    };
    println!("job {id} status: {styled}");
}
