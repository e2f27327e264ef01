//! # Strata Score Replay
//!
//! Replays a recorded trace of link measurements through a `ScoreReporter`
//! and prints the diagnostic history dump.
//!
//! ## Usage
//!
//! ```bash
//! # Score a trace and dump the history at the end
//! strata-score-replay --trace wlan0.jsonl
//!
//! # Custom ceiling/capacity, attach consumer 12, dump every 100 polls
//! strata-score-replay --trace wlan0.jsonl --config score.toml \
//!   --consumer-id 12 --dump-every 100
//! ```
//!
//! Each trace line is a JSON object:
//!
//! ```json
//! {"timestamp_ms": 1500000000000, "disconnect": false,
//!  "measurement": {"rssi_dbm": -61, "frequency_mhz": 5180, "link_speed_mbps": 433,
//!                  "tx_success_rate": 12.0, "tx_retries_rate": 0.5,
//!                  "tx_bad_rate": 0.0, "rx_success_rate": 30.0}}
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{bounded, Receiver};
use serde::Deserialize;

use strata_score::{
    ConsumerContext, HistoryDumper, LinkMeasurement, ManualClock, ScoreConfig, ScoreConsumer,
    ScoreHistogram, ScoreReporter, DUMP_ARG,
};

/// Replay a link measurement trace through the score reporter.
#[derive(Parser, Debug)]
#[command(name = "strata-score-replay", about = "Replay link measurements through the score reporter")]
struct Cli {
    /// Trace file, one JSON object per line.
    #[arg(long)]
    trace: PathBuf,

    /// Score configuration (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Consumer identifier to publish scores to. 0 runs without a consumer.
    #[arg(long, default_value_t = 0)]
    consumer_id: u32,

    /// Request a history dump every N polls (0 = only at the end).
    #[arg(long, default_value_t = 0)]
    dump_every: u64,

    /// Emit the reporter's verbose diagnostics.
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct TraceEntry {
    timestamp_ms: i64,
    /// Connection ended before this sample; start a new session.
    #[serde(default)]
    disconnect: bool,
    measurement: LinkMeasurement,
}

enum DumpRequest {
    Dump { poll: u64 },
    Shutdown,
}

/// Consumer that logs every score it is told about.
struct LoggingConsumer {
    id: u32,
    notifications: u64,
}

impl ScoreConsumer for LoggingConsumer {
    fn id(&self) -> u32 {
        self.id
    }

    fn notify_score(&mut self, score: i32) {
        self.notifications += 1;
        tracing::info!(consumer_id = self.id, score, "score published");
    }
}

fn main() -> anyhow::Result<()> {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    // ── Parse CLI ───────────────────────────────────────────────
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    tracing::info!(
        trace = %cli.trace.display(),
        max_score = config.max_score,
        history_capacity = config.history_capacity,
        consumer_id = cli.consumer_id,
        "strata-score-replay starting"
    );

    // ── Reporter ────────────────────────────────────────────────
    let clock = Arc::new(ManualClock::new(0));
    let histogram = Arc::new(ScoreHistogram::new());
    let mut reporter = ScoreReporter::new(config, clock.clone(), histogram.clone());
    reporter.set_verbose_logging(cli.verbose);

    // ── Diagnostic dump thread ──────────────────────────────────
    let (dump_tx, dump_rx) = bounded::<DumpRequest>(16);
    let dumper = reporter.dumper();
    let dump_thread = thread::Builder::new()
        .name("score-dump".into())
        .spawn(move || dump_worker(dump_rx, dumper))?;

    // ── Replay ──────────────────────────────────────────────────
    let file = File::open(&cli.trace)
        .with_context(|| format!("failed to open trace {}", cli.trace.display()))?;
    let mut consumer = LoggingConsumer {
        id: cli.consumer_id,
        notifications: 0,
    };
    let mut known_score = 0;
    let mut polls = 0u64;

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read trace line {}", idx + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: TraceEntry = serde_json::from_str(&line)
            .with_context(|| format!("invalid trace entry on line {}", idx + 1))?;

        if entry.disconnect {
            reporter.reset();
            known_score = 0;
            tracing::info!(session = reporter.session_id(), "new session");
        }

        clock.set(entry.timestamp_ms);
        let ctx = if cli.consumer_id == 0 {
            ConsumerContext::detached(&mut known_score)
        } else {
            ConsumerContext::new(&mut known_score, &mut consumer)
        };
        reporter.evaluate(&entry.measurement, ctx);
        polls += 1;

        if cli.dump_every > 0 && polls % cli.dump_every == 0 {
            dump_tx.send(DumpRequest::Dump { poll: polls })?;
        }
    }

    dump_tx.send(DumpRequest::Dump { poll: polls })?;
    dump_tx.send(DumpRequest::Shutdown)?;
    dump_thread
        .join()
        .map_err(|_| anyhow::anyhow!("dump thread panicked"))??;

    // ── Summary ─────────────────────────────────────────────────
    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", histogram.render_prometheus())?;
    tracing::info!(
        polls,
        notifications = consumer.notifications,
        last_report = reporter.last_report(),
        session = reporter.session_id(),
        "replay finished"
    );
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ScoreConfig> {
    let Some(path) = path else {
        return Ok(ScoreConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ScoreConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn dump_worker(rx: Receiver<DumpRequest>, dumper: HistoryDumper) -> std::io::Result<()> {
    for req in rx {
        match req {
            DumpRequest::Dump { poll } => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "== {DUMP_ARG} after poll {poll} ==")?;
                dumper.dump(&mut stdout)?;
                stdout.flush()?;
            }
            DumpRequest::Shutdown => break,
        }
    }
    Ok(())
}
