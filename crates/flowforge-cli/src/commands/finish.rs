//! `finish <id>` — blocks until a job completes, then prints its result.

use console::style;
use flowforge_engine::{Engine, JobId};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn execute(engine: &Engine, args: &str) {
    let Some(id) = args.trim().parse::<u64>().ok().map(JobId) else {
        eprintln!("{} usage: finish <id>", style("error:").red().bold());
        return;
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} waiting on job {msg}")
            .expect("spinner template is valid"),
    );
    spinner.set_message(id.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = engine.await_job(id);

    spinner.finish_and_clear();

    match result["status"].as_str() {
        Some("success") => println!("{} job {id} finished", style("ok:").green().bold()),
        Some("error") => {
            let message = result["message"].as_str().unwrap_or("unknown error");
            eprintln!("{} job {id}: {message}", style("error:").red().bold());
        }
        _ => eprintln!("{} unexpected response for job {id}", style("error:").red().bold()),
    }
}
