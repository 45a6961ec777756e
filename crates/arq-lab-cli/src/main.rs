mod driver;
mod menu;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arq_lab_abstract::{ChannelConfig, DEFAULT_TICK_MS, Pacing, Packet, ProtocolKind, SessionConfig};
use arq_lab_simulator::{Session, SessionReport, scenario_runner};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::driver::{drain, print_events, send_and_drain};
use crate::menu::Menu;

#[derive(Parser, Debug)]
#[command(author, version, about = "Sliding-window / ARQ flow-control simulator")]
struct Args {
    /// Run one protocol headless instead of showing the menu
    /// (simple, stop-and-wait, go-back-n, selective-repeat).
    #[arg(long)]
    protocol: Option<ProtocolKind>,

    /// Window size for Go-Back-N and Selective Repeat.
    #[arg(long)]
    window_size: Option<u32>,

    /// Message to send; repeat for several.
    #[arg(long = "message")]
    messages: Vec<String>,

    /// Number of generated "Packet N" messages sent after `--message`s.
    #[arg(long)]
    count: Option<u32>,

    /// Run a scenario file and check its assertions.
    #[arg(long)]
    scenario: Option<PathBuf>,

    #[arg(long, default_value_t = 0.0)]
    loss_rate: f64,
    #[arg(long, default_value_t = 0)]
    min_latency_ms: u64,
    #[arg(long, default_value_t = 0)]
    max_latency_ms: u64,
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Length of one tick (the timeout quantum).
    #[arg(long, default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,

    /// Window timer length; defaults to one tick.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Sleep for every tick instead of simulating time.
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Give up on a run that is still not drained after this many ticks.
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u64,

    /// Write a JSON report of the finished run(s).
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    info!("arq-lab starting…");

    if args.scenario.is_some() && args.protocol.is_some() {
        anyhow::bail!("--scenario and --protocol cannot be used together");
    }

    let reports = if let Some(path) = &args.scenario {
        vec![scenario_runner::run_scenario(path)?]
    } else if let Some(kind) = args.protocol {
        vec![run_headless(&args, kind)?]
    } else {
        let stdin = io::stdin();
        let mut menu = Menu::new(stdin.lock(), io::stdout(), args.session_template(), args.max_ticks);
        menu.run()?
    };

    if let Some(trace_path) = &args.trace_out {
        write_trace(trace_path, &reports)?;
    }

    Ok(())
}

impl Args {
    fn session_template(&self) -> SessionConfig {
        SessionConfig {
            protocol: ProtocolKind::StopAndWait,
            window_size: self.window_size,
            tick_ms: self.tick_ms,
            timeout_ms: self.timeout_ms,
            pacing: if self.realtime {
                Pacing::RealTime
            } else {
                Pacing::Virtual
            },
            channel: ChannelConfig {
                loss_rate: self.loss_rate,
                min_latency_ms: self.min_latency_ms,
                max_latency_ms: self.max_latency_ms,
                seed: self.seed,
            },
        }
    }

    /// Explicit messages first, then generated ones. Three generated packets
    /// when nothing was asked for.
    fn outgoing(&self) -> Vec<String> {
        let generated = self
            .count
            .unwrap_or(if self.messages.is_empty() { 3 } else { 0 });
        let first = self.messages.len() as u32;
        self.messages
            .iter()
            .cloned()
            .chain((first..first + generated).map(|seq| Packet::numbered(seq).payload))
            .collect()
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run_headless(args: &Args, kind: ProtocolKind) -> Result<SessionReport> {
    let mut config = args.session_template();
    config.protocol = kind;
    let mut session = Session::open(config).context("Invalid session configuration")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{kind} flow control protocol selected.")?;

    if kind.has_configurable_window() {
        for text in args.outgoing() {
            let events = session.send_message(text)?;
            print_events(&mut out, &events)?;
        }
        drain(&mut session, args.max_ticks, &mut out)?;
    } else {
        for text in args.outgoing() {
            send_and_drain(&mut session, text, args.max_ticks, &mut out)?;
        }
    }

    let report = session.close()?;
    info!(
        "Simulation duration: {} ms | packets sent: {} | retransmissions: {} | timeouts: {}",
        report.duration_ms,
        report.stats.packets_sent,
        report.stats.retransmissions,
        report.stats.timeouts
    );
    Ok(report)
}

fn write_trace(path: &Path, reports: &impl Serialize) -> Result<()> {
    let data = serde_json::to_vec_pretty(reports).context("Failed to serialize simulation trace")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}
