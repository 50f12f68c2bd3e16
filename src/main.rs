use crate::driver::{Driver, EndReason, Finished, RunOutcome, RunningDriver, SharedEngine};
use crate::engine::{DEFAULT_FUEL_THRESHOLD, EngineConfig, SchedulingEngine};
use crate::error::EngineError;
use crate::flight::{FlightRow, FlightState};
use crate::loader::Scenario;
use crate::sink::{ConsoleSink, LogFileSink};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tabled::settings::Style;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod clock;
mod driver;
mod engine;
mod error;
mod event;
mod flight;
mod loader;
mod registry;
mod report;
mod runway;
mod sink;
mod time;

#[derive(Parser)]
struct Args {
    /// Path to the JSON scenario file
    #[arg(short, long, value_name = "FILE", default_value = "data/default.json")]
    scenario: PathBuf,

    /// Wall-clock milliseconds per simulated minute for `run`
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    tick_ms: u64,

    /// Fuel minutes at or below which a waiting landing becomes an emergency
    #[arg(long, value_name = "MINUTES", default_value_t = DEFAULT_FUEL_THRESHOLD)]
    fuel_threshold: u32,

    /// File the event log is appended to
    #[arg(long, value_name = "FILE", default_value = "events.log")]
    event_log: PathBuf,

    /// Also write the final report as JSON to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Simulate this many minutes without the console, then print the report
    #[arg(long, value_name = "N")]
    ticks: Option<u64>,
}

type Sink = (ConsoleSink, LogFileSink);

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let mut candidates = Vec::new();

        for cmd in &self.commands {
            if cmd.starts_with(line) {
                candidates.push(Pair {
                    display: cmd.clone(),
                    replacement: format!("{} ", cmd),
                });
            }
        }

        Ok((0, candidates))
    }
}

fn paginate(content: String) {
    let pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn());
    let Ok(mut pager) = pager else {
        println!("{}", content);
        return;
    };

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // Broken pipe is common if the user quits the pager early
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("Error writing to pager: {}", e);
            }
        }
    }

    // Wait for the user to close the pager before returning to the ">> " prompt
    let _ = pager.wait();
}

fn print_table<T: tabled::Tabled>(rows: Vec<T>) {
    let len = rows.len();
    let mut table = tabled::Table::new(rows);
    table.with(Style::rounded());
    table.with(tabled::settings::Alignment::left());
    if len > 20 {
        paginate(table.to_string());
    } else {
        println!("{}", table);
    }
}

fn describe(outcome: &RunOutcome) -> String {
    let reason = match outcome.end_reason {
        EndReason::TickLimitReached => "tick limit reached",
        EndReason::Stopped => "stopped",
    };
    match outcome.last_minute {
        Some(minute) => format!("{} minute(s) simulated, last minute {} ({})", outcome.ticks, minute, reason),
        None => format!("no minute simulated ({})", reason),
    }
}

/// Interactive session: owns the sink while no timed run is active and
/// hands it to the background driver while one is.
struct Console {
    engine: SharedEngine,
    sink: Option<Sink>,
    running: Option<RunningDriver<Sink>>,
    interval: Duration,
    event_log: PathBuf,
}

impl Console {
    fn with_engine<T>(&self, f: impl FnOnce(&SchedulingEngine) -> T) -> Result<T, EngineError> {
        let engine = self.engine.lock().map_err(|_| EngineError::Poisoned)?;
        Ok(f(&engine))
    }

    fn take_sink(&mut self) -> Sink {
        self.sink
            .take()
            .unwrap_or_else(|| (ConsoleSink, LogFileSink::new(&self.event_log)))
    }

    fn reclaim(&mut self, finished: Option<Finished<Sink>>) -> Result<(), EngineError> {
        let Some(finished) = finished else {
            error!("Driver thread panicked");
            return Err(EngineError::Poisoned);
        };
        self.sink = Some(finished.sink);
        let outcome = finished.outcome?;
        println!("{} {}", "Run ended:".bold(), describe(&outcome));
        Ok(())
    }

    /// Pick up a timed run that ended on its own.
    fn collect_finished(&mut self) -> Result<(), EngineError> {
        if self.running.as_ref().is_some_and(|r| r.is_finished()) {
            if let Some(running) = self.running.take() {
                self.reclaim(running.wait())?;
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<bool, EngineError> {
        match self.running.take() {
            Some(running) => {
                self.reclaim(running.stop())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn step(&mut self, steps: u64) -> Result<(), EngineError> {
        if self.running.is_some() {
            println!("A timed run is active. Use 'stop' first.");
            return Ok(());
        }
        let mut sink = self.take_sink();
        let outcome = Driver::manual(steps).run(&self.engine, &mut sink);
        self.sink = Some(sink);
        outcome.map(|_| ())
    }

    fn run(&mut self, max_ticks: Option<u64>) {
        if self.running.is_some() {
            println!("A timed run is already active.");
            return;
        }
        let sink = self.take_sink();
        let driver = Driver::timed(self.interval, max_ticks);
        self.running = Some(driver.spawn(self.engine.clone(), sink));
        println!(
            "Running one minute every {} ms{}. Use 'stop' to pause.",
            self.interval.as_millis(),
            max_ticks.map(|n| format!(" for {} minute(s)", n)).unwrap_or_default()
        );
    }

    fn list(&self, filter: &str) -> Result<(), EngineError> {
        let state = match filter {
            "p" | "pending" => Some(FlightState::Pending),
            "q" | "queued" => Some(FlightState::Queued),
            "a" | "assigned" => Some(FlightState::Assigned),
            "c" | "completed" => Some(FlightState::Completed),
            "x" | "cancelled" => Some(FlightState::Cancelled),
            _ => None, // 'ls' or 'ls all'
        };
        let rows = self.with_engine(|engine| {
            engine
                .registry()
                .flights()
                .iter()
                .filter(|f| state.is_none_or(|s| f.state == s))
                .map(FlightRow::from)
                .collect::<Vec<_>>()
        })?;
        if rows.is_empty() {
            println!("No matching flights found.");
        } else {
            print_table(rows);
        }
        Ok(())
    }

    fn status(&self) -> Result<(), EngineError> {
        let (ticks, threshold, waiting, snapshot) = self.with_engine(|engine| {
            (
                engine.ticks(),
                engine.config().fuel_threshold,
                engine.queued_count(),
                engine.snapshot(),
            )
        })?;
        let clock = if ticks == 0 {
            "not started".to_string()
        } else {
            format!("minute {}", snapshot.minute)
        };
        println!("Clock: {} ({} tick(s))", clock, ticks);
        println!(
            "Queues: {} waiting ({} landing, {} departure), fuel threshold {} min",
            waiting,
            snapshot.landing_queue.len(),
            snapshot.departure_queue.len(),
            threshold
        );
        println!(
            "Runways busy: {} | completed: {} | cancelled: {}",
            snapshot.occupations.len(),
            snapshot.completed_flights.len(),
            snapshot.cancelled_flights.len()
        );
        println!("Timed run: {}", if self.running.is_some() { "active" } else { "idle" });
        Ok(())
    }
}

fn parse_count(arg: Option<&&str>) -> Result<Option<u64>, String> {
    arg.map(|s| s.parse::<u64>().map_err(|_| format!("not a number: {}", s)))
        .transpose()
}

fn write_report(engine: &SharedEngine, path: Option<&PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let report = engine.lock().map_err(|_| EngineError::Poisoned)?.report();
    println!("\n{}", report);
    if let Some(path) = path {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let scenario = Scenario::load_from_file(&args.scenario)?;
    println!(
        "Tower online. Loaded {} flights and {} runways from {}{}",
        scenario.flights.len(),
        scenario.runways.len(),
        args.scenario.display(),
        if scenario.warnings.is_empty() {
            String::new()
        } else {
            format!(" ({} records skipped)", scenario.warnings.len()).yellow().to_string()
        }
    );

    let config = EngineConfig {
        fuel_threshold: args.fuel_threshold,
    };
    info!(
        fuel_threshold = config.fuel_threshold,
        tick_ms = args.tick_ms,
        event_log = %args.event_log.display(),
        "Configuration loaded"
    );
    let engine: SharedEngine = Arc::new(Mutex::new(SchedulingEngine::new(
        scenario.flights,
        scenario.runways,
        config,
    )));
    let sink: Sink = (ConsoleSink, LogFileSink::new(&args.event_log));

    if let Some(ticks) = args.ticks {
        let mut sink = sink;
        let outcome = Driver::manual(ticks).run(&engine, &mut sink)?;
        println!("{}", describe(&outcome));
        return write_report(&engine, args.report.as_ref());
    }

    let mut console = Console {
        engine: engine.clone(),
        sink: Some(sink),
        running: None,
        interval: Duration::from_millis(args.tick_ms),
        event_log: args.event_log.clone(),
    };

    let rl_config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: ["tick", "run", "stop", "ls", "runways", "status", "report", "help", "exit"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    };

    let mut rl = Editor::with_config(rl_config)?;
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() { continue; }

                rl.add_history_entry(trimmed)?;
                console.collect_finished()?;

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                match parts[0] {
                    "tick" | "t" => match parse_count(parts.get(1)) {
                        Ok(steps) => console.step(steps.unwrap_or(1))?,
                        Err(e) => println!("Usage: tick [n] ({})", e),
                    },
                    "run" => match parse_count(parts.get(1)) {
                        Ok(max_ticks) => console.run(max_ticks),
                        Err(e) => println!("Usage: run [n] ({})", e),
                    },
                    "stop" => {
                        if !console.stop()? {
                            println!("No timed run is active.");
                        }
                    },
                    "ls" => console.list(parts.get(1).copied().unwrap_or("all"))?,
                    "runways" => print_table(console.with_engine(|e| e.pool().rows())?),
                    "status" => console.status()?,
                    "report" => {
                        let report = console.with_engine(|e| e.report())?;
                        if parts.get(1) == Some(&"json") {
                            println!("{}", serde_json::to_string_pretty(&report)?);
                        } else {
                            println!("{}", report);
                        }
                    },
                    "help" | "?" => {
                        println!("\nAvailable Commands:");
                        println!("  tick [n]       - Simulate <n> minutes (default 1) right now");
                        println!("  run [n]        - Simulate one minute per tick interval, for <n> minutes or until 'stop'");
                        println!("  stop           - Stop a timed run after its current minute");
                        println!("  ls [state]     - List flights, optionally filtered: p - pending, q - queued, a - assigned, c - completed, x - cancelled");
                        println!("  runways        - Show runways and who holds them");
                        println!("  status         - Show clock, queue lengths and runway usage");
                        println!("  report [json]  - Show the summary report");
                        println!("  help / ?       - Show this help menu");
                        println!("  exit / quit    - Stop, print the report and exit\n");
                    },
                    "exit" | "quit" => break,
                    _ => println!("Unknown command: {}", parts[0]),
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            },
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            },
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    console.stop()?;
    write_report(&engine, args.report.as_ref())
}
