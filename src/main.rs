use std::fs;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use prime_race::{
    init_logging, Immediate, LogAudio, LogRenderer, Pacer, RaceConfig, RaceEngine, RaceSession,
    RealtimePacer,
};

#[derive(Parser)]
#[command(author, version, about = "Run a staggered prime-label token race")]
struct Cli {
    /// Path to a race configuration (JSON). Missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the total race duration.
    #[arg(long)]
    duration: Option<f64>,
    /// Override the number of tokens.
    #[arg(long)]
    count: Option<usize>,
    /// Override the smallest label.
    #[arg(long)]
    min_label: Option<i64>,
    /// Override the largest label.
    #[arg(long)]
    max_label: Option<i64>,
    /// Seed for reproducible batches.
    #[arg(long)]
    seed: Option<u64>,
    /// Pace ticks on the wall clock (tick units are milliseconds).
    #[arg(long)]
    realtime: bool,
    /// Speed-up factor for real-time pacing.
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,
    /// Read button presses from stdin: Enter toggles, `q` quits.
    #[arg(long)]
    interactive: bool,
    /// Print the final snapshot as JSON.
    #[arg(long)]
    json: bool,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

enum Input {
    Press,
    Quit,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });

    let config = load_config(&cli)?;
    let engine = match cli.seed {
        Some(seed) => RaceEngine::with_seed(config, seed),
        None => RaceEngine::new(config),
    }
    .context("invalid race configuration")?;
    let mut session = RaceSession::new(engine, Box::new(LogRenderer::default()), Box::new(LogAudio));

    let mut pacer: Box<dyn Pacer> = if cli.realtime || cli.interactive {
        Box::new(RealtimePacer::new(cli.time_scale))
    } else {
        Box::new(Immediate)
    };

    if cli.interactive {
        run_interactive(&mut session, pacer.as_mut())?;
    } else {
        session.reset().context("failed to start race")?;
        session.run(pacer.as_mut());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    } else {
        print_summary(&session);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<RaceConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let data = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            RaceConfig::from_json(&data)
                .with_context(|| format!("{} is not a valid race config", path.display()))?
        }
        None => RaceConfig::default(),
    };

    if let Some(duration) = cli.duration {
        config.race_duration = duration;
    }
    if let Some(count) = cli.count {
        config.token_count = count;
    }
    if let Some(min_label) = cli.min_label {
        config.min_label = min_label;
    }
    if let Some(max_label) = cli.max_label {
        config.max_label = max_label;
    }
    Ok(config)
}

fn spawn_stdin_reader() -> Receiver<Input> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let input = match line {
                Ok(line) if line.trim() == "q" => Input::Quit,
                Ok(_) => Input::Press,
                Err(_) => Input::Quit,
            };
            let quit = matches!(input, Input::Quit);
            if tx.send(input).is_err() || quit {
                return;
            }
        }
        let _ = tx.send(Input::Quit);
    });
    rx
}

fn run_interactive(session: &mut RaceSession, pacer: &mut dyn Pacer) -> Result<()> {
    let inputs = spawn_stdin_reader();
    println!("[{}] press Enter, q to quit", session.label().text());

    loop {
        // Block for input while the scheduler is stopped.
        let input = if session.is_scheduled() {
            match inputs.try_recv() {
                Ok(input) => Some(input),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Input::Quit),
            }
        } else {
            Some(inputs.recv().unwrap_or(Input::Quit))
        };

        match input {
            Some(Input::Quit) => return Ok(()),
            Some(Input::Press) => {
                if let Err(err) = session.press() {
                    log::error!("{err}");
                }
                println!("[{}]", session.label().text());
            }
            None => {}
        }

        if session.is_scheduled() {
            if session.step() {
                pacer.wait(session.tick_interval());
            } else {
                print_summary(session);
                println!("[{}]", session.label().text());
            }
        }
    }
}

fn print_summary(session: &RaceSession) {
    let snapshot = session.snapshot();
    let stats = session.stats();
    println!(
        "{:?}: {}/{} finished, {} prime, elapsed {} over {} ticks (avg {:.3} ms/tick)",
        snapshot.phase,
        snapshot.total_finished,
        snapshot.token_count,
        snapshot.prime_finished,
        snapshot.elapsed,
        stats.ticks,
        stats.avg_tick_time_ms
    );
}
