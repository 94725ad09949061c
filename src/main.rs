//! DeltaWash CLI
//!
//! Usage:
//!   deltawash --controller                      # LED controller HTTP server
//!   deltawash --replay samples.jsonl            # Replay recorded samples
//!   deltawash --interactive                     # Type samples on stdin
//!   deltawash --led-test --step 3 --state CURRENT   # Poke a controller
//!   deltawash --replay s.jsonl --led-url http://esp8266.local --json

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, warn};

use deltawash::core::{
    load_config, load_samples, replay, run_controller, AppConfig, FeedbackTransport, LedClient,
    MonotonicClock, SessionInterpreter, StatusBoard, TracingLeds,
};
use deltawash::types::{SignalSample, StepEvent, StepId, StepState};
use deltawash::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "deltawash",
    version = VERSION,
    about = "DeltaWash - confirm handwashing steps 2-7 and drive the sink LED panel",
    long_about = "DeltaWash turns per-frame classifier output into confirmed\n\
                  handwashing steps and mirrors them on an LED panel.\n\n\
                  Modes:\n  \
                  --controller   Serve the LED controller (POST /signal, POST /reset, GET /health)\n  \
                  --replay FILE  Replay JSON-lines samples through the interpreter\n  \
                  --interactive  Type samples as '<step|none> [quality] [LEFT|RIGHT]'\n  \
                  --led-test     Send one state to a controller\n\n\
                  Step states:\n  \
                  IDLE      - Light off\n  \
                  CURRENT   - Blinking at 1 Hz\n  \
                  COMPLETED - Solid on until reset"
)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run as the LED controller HTTP server
    #[arg(long)]
    controller: bool,

    /// Controller listen address (overrides config)
    #[arg(long)]
    addr: Option<String>,

    /// Replay a JSON-lines sample file
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Pace replay at recorded speed
    #[arg(long)]
    realtime: bool,

    /// Interactive mode - read samples from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Send one signal to the controller and print its health
    #[arg(long)]
    led_test: bool,

    /// Step for --led-test (2..7)
    #[arg(long, default_value_t = 2)]
    step: i64,

    /// State for --led-test (IDLE, CURRENT, COMPLETED)
    #[arg(long, default_value = "CURRENT")]
    state: String,

    /// LED controller base URL (enables feedback, overrides config)
    #[arg(long)]
    led_url: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Debug logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match load_app_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(2);
        }
    };

    let code = if args.controller {
        run_serve(&args, &config).await
    } else if args.led_test {
        run_led_test(&args, &config).await
    } else if let Some(path) = args.replay.as_deref().filter(|_| !args.interactive) {
        run_replay(path, &args, &config).await
    } else {
        // Default to interactive if no mode specified
        run_interactive(&args, &config).await
    };
    std::process::exit(code);
}

/// Logs go to stderr so `--json` output on stdout stays clean
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Config file (or defaults) with command-line overrides applied
fn load_app_config(args: &Args) -> Result<AppConfig, deltawash::core::ConfigError> {
    let mut config = match args.config {
        Some(ref path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(ref url) = args.led_url {
        config.feedback.enabled = true;
        config.feedback.endpoint = Some(url.clone());
    }
    if let Some(ref addr) = args.addr {
        config.controller.addr = addr.clone();
    }
    config.validate()?;
    Ok(config)
}

fn start_transport(config: &AppConfig) -> FeedbackTransport {
    match FeedbackTransport::spawn(&config.feedback) {
        Ok(transport) => transport,
        Err(e) => {
            warn!(error = %e, "LED feedback unavailable, continuing without it");
            FeedbackTransport::disabled()
        }
    }
}

/// Run LED controller server
async fn run_serve(_args: &Args, config: &AppConfig) -> i32 {
    print_header("LED Controller", false);
    match run_controller(&config.controller, TracingLeds).await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "controller stopped");
            eprintln!("Server error: {}", e);
            1
        }
    }
}

/// Replay a recorded sample file
async fn run_replay(path: &Path, args: &Args, config: &AppConfig) -> i32 {
    let samples = match load_samples(path) {
        Ok(samples) => samples,
        Err(e) => {
            eprintln!("Replay error: {}", e);
            return 2;
        }
    };

    let mut interpreter = SessionInterpreter::new(&config.interpreter);
    let transport = start_transport(config);
    if !args.json {
        print_header("Replay", args.no_color);
        println!("{} samples from {}", samples.len(), path.display());
        println!();
    }

    let summary = replay(&samples, &mut interpreter, &transport, args.realtime, |event| {
        if !args.json {
            print_event(event, args.no_color);
        }
    })
    .await;
    let stats = transport.close().await;

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("JSON error: {}", e),
        }
    } else {
        println!();
        println!("{}", StatusBoard::new(!args.no_color).render(&summary.statuses));
        if summary.compliant {
            println!("✓ All six steps confirmed");
        }
        if stats != Default::default() {
            println!(
                "LED feedback: delivered={} retried={} dropped={} resyncs={}",
                stats.delivered, stats.retried, stats.dropped, stats.resyncs
            );
        }
    }
    0
}

/// Run interactive mode: one sample per line
async fn run_interactive(args: &Args, config: &AppConfig) -> i32 {
    let mut interpreter = SessionInterpreter::new(&config.interpreter);
    let transport = start_transport(config);
    let clock = MonotonicClock::new();
    let board = StatusBoard::new(!args.no_color);

    print_header("Interactive", args.no_color);
    println!("Enter samples as '<step|none> [quality] [LEFT|RIGHT]', e.g. '4 0.9 left'.");
    println!("Commands: status, reset, quit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.eq_ignore_ascii_case("status") {
            println!("{}", board.render(&interpreter.snapshot()));
            continue;
        }
        if line.eq_ignore_ascii_case("reset") {
            let events = interpreter.reset(clock.now_ms());
            transport.publish_reset();
            for event in &events {
                emit(event, args);
            }
            continue;
        }

        let Some(sample) = SignalSample::parse_line(line, clock.now_ms()) else {
            println!("⚠ Expected '<2..7|none> [quality] [LEFT|RIGHT]'");
            continue;
        };
        let events = interpreter.process(&sample);
        transport.publish_all(&events);
        for event in &events {
            emit(event, args);
        }
        if events.iter().any(|e| e.state == StepState::Completed) && interpreter.is_compliant() {
            println!("✓ All six steps confirmed");
        }
    }

    println!("\nSession ended. Samples: {}", interpreter.sample_count());
    println!("{}", board.render(&interpreter.snapshot()));
    transport.close().await;
    0
}

/// Send one state to a controller
async fn run_led_test(args: &Args, config: &AppConfig) -> i32 {
    let step = match StepId::try_from(args.step) {
        Ok(step) => step,
        Err(e) => {
            eprintln!("{}", e);
            return 2;
        }
    };
    let Some(state) = StepState::from_literal(&args.state.to_ascii_uppercase()) else {
        eprintln!("state must be IDLE, CURRENT or COMPLETED");
        return 2;
    };

    let client = match LedClient::new(&config.feedback) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("LED test needs --led-url or feedback.endpoint: {}", e);
            return 2;
        }
    };

    if let Err(e) = client.signal(step, state).await {
        eprintln!("Delivery to {} failed: {}", client.base_url(), e);
        return 1;
    }
    println!("Sent {} {} to {}", step, state, client.base_url());

    match client.health().await {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("JSON error: {}", e),
            }
            0
        }
        Err(e) => {
            eprintln!("Health check failed: {}", e);
            1
        }
    }
}

fn emit(event: &StepEvent, args: &Args) {
    if args.json {
        match serde_json::to_string(event) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("JSON error: {}", e),
        }
    } else {
        print_event(event, args.no_color);
    }
}

fn print_event(event: &StepEvent, no_color: bool) {
    if no_color {
        println!("{}", event.to_parseable_string());
    } else {
        println!("{}", event.to_terminal_string());
    }
}

/// Print header
fn print_header(mode: &str, no_color: bool) {
    if no_color {
        println!("========================================");
        println!("  DeltaWash v{} - {}", VERSION, mode);
        println!("========================================");
    } else {
        println!("\x1b[1m╔════════════════════════════════════════╗\x1b[0m");
        println!("\x1b[1m║  DeltaWash v{} - {:<22}║\x1b[0m", VERSION, mode);
        println!("\x1b[1m╚════════════════════════════════════════╝\x1b[0m");
    }
    println!();
}
