//! FlowForge Command-Line Interface
//!
//! Loads a FlowScript file, starts the engine's worker pool, and drops into
//! an interactive prompt for driving jobs (spec §6, §7).

use std::io::{self, BufRead, Write};

use clap::Parser;
use console::style;
use flowforge_engine::Engine;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{destroy, finish, jobtypes, start, status, stop};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// FlowForge - a dependency-aware job scheduler driven by FlowScript graphs
#[derive(Parser)]
#[command(name = "flowforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// FlowScript file to load and run
    flowscript: String,

    /// Number of worker threads (defaults to hardware_concurrency - 1)
    #[arg(long)]
    workers: Option<usize>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let source = match std::fs::read_to_string(&cli.flowscript) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{} failed to read {}: {err}", style("error:").red().bold(), cli.flowscript);
            std::process::exit(1);
        }
    };

    let mut engine = Engine::new();
    let job_ids = match engine.run_flowscript(&source) {
        Ok(ids) => ids,
        Err(err) => {
            eprintln!("{} {err}", style("error:").red().bold());
            std::process::exit(1);
        }
    };

    engine.start(cli.workers);
    println!(
        "{} loaded {} with {} job(s), worker pool running",
        style("ok:").green().bold(),
        cli.flowscript,
        job_ids.len()
    );

    run_prompt(&mut engine);
    Ok(())
}

/// Reads commands from stdin until `stop`, `destroy`, or end of input.
fn run_prompt(engine: &mut Engine) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("flowforge> ");
        let _ = stdout.flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, args) = match line.split_once(' ') {
            Some((command, args)) => (command, args),
            None => (line, ""),
        };

        match command {
            "status" => status::execute(engine, args),
            "finish" => finish::execute(engine, args),
            "jobtypes" => jobtypes::execute(engine),
            "start" => start::execute(engine, args),
            "stop" => {
                stop::execute(engine);
                break;
            }
            "destroy" => {
                destroy::execute(engine);
                break;
            }
            _ => eprintln!(
                "{} unknown command {command:?} (status|finish|jobtypes|start|stop|destroy)",
                style("error:").red().bold()
            ),
        }
    }
}

