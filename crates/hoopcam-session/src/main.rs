//! HoopCam session runner.
//!
//! Reads a pose stream (JSON Lines) or plays a scripted demo, detects shots,
//! collects critiques and writes the session summary as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hoopcam_critique::{
    CritiqueConfig, CritiqueService, GeminiCritiqueClient, HeuristicCritiqueService,
};
use hoopcam_detect::synthetic::shot_sequence;
use hoopcam_detect::{Observation, ShootingSide};
use hoopcam_session::{parse_line, FrameInput, SessionConfig, SessionManager};

#[derive(Debug, Parser)]
#[command(
    name = "hoopcam",
    version,
    about = "Detect basketball shots in a pose stream and collect coaching critiques"
)]
struct Args {
    /// JSON Lines frame file, `-` for stdin
    #[arg(short, long, conflicts_with = "demo")]
    input: Option<PathBuf>,

    /// Play a scripted session with this many shots instead of reading input
    #[arg(long, value_name = "SHOTS")]
    demo: Option<usize>,

    /// Write the session summary here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Detection thresholds JSON file
    #[arg(long)]
    detection_config: Option<PathBuf>,

    /// Shooting arm: auto, left or right
    #[arg(long, value_parser = parse_side)]
    side: Option<ShootingSide>,

    /// Use the offline heuristic critic even when GEMINI_API_KEY is set
    #[arg(long)]
    offline: bool,

    /// Skip the end-of-session coaching summary
    #[arg(long)]
    no_summary: bool,
}

fn parse_side(value: &str) -> Result<ShootingSide, String> {
    match value.to_lowercase().as_str() {
        "auto" => Ok(ShootingSide::Auto),
        "left" => Ok(ShootingSide::Left),
        "right" => Ok(ShootingSide::Right),
        other => Err(format!("unknown side '{}', expected auto, left or right", other)),
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "hoopcam=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    // Logs go to stderr so stdout stays clean for the summary JSON
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn build_service(offline: bool) -> Result<Arc<dyn CritiqueService>> {
    let config = CritiqueConfig::from_env();
    if offline || !config.has_api_key() {
        info!("Using offline heuristic critic");
        return Ok(Arc::new(HeuristicCritiqueService::new()));
    }
    let client = GeminiCritiqueClient::new(&config).context("creating Gemini client")?;
    info!(models = ?config.models, "Using Gemini critic");
    Ok(Arc::new(client))
}

fn load_config(args: &Args) -> Result<SessionConfig> {
    let mut config = SessionConfig::from_env()?;
    if let Some(path) = &args.detection_config {
        config = config.with_detection_file(path)?;
    }
    if let Some(side) = args.side {
        let detection = config.detection.clone().with_shooting_side(side);
        config = config.with_detection(detection);
    }
    config.validate()?;
    Ok(config)
}

/// Feed every line of `reader` to the active session. Stops early on Ctrl-C.
async fn feed_lines(
    manager: &mut SessionManager,
    reader: Box<dyn AsyncRead + Unpin + Send>,
) -> Result<()> {
    let mut lines = BufReader::new(reader).lines();
    let mut line_no = 0u64;
    let mut skipped = 0u64;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading frame input")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, ending session");
                break;
            }
        };
        let Some(line) = line else { break };
        line_no += 1;

        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(FrameInput::Frame { frame, observation })) => {
                manager.process_frame(frame, observation)?;
            }
            Ok(Some(FrameInput::Interrupted { timestamp })) => {
                manager.interrupt(timestamp)?;
            }
            Err(e) => {
                skipped += 1;
                warn!(line = line_no, error = %e, "Skipping malformed frame line");
            }
        }
    }

    info!(lines = line_no, skipped, "Input exhausted");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!("Session config: {:?}", config);

    let service = build_service(args.offline)?;
    let mut manager = SessionManager::new(config.clone(), service)?;
    manager.start_session()?;

    match (&args.demo, &args.input) {
        (Some(shots), _) => {
            for (frame, sample) in shot_sequence(config.detection.fps, *shots) {
                manager.process_frame(frame, Observation::Features(sample))?;
            }
        }
        (None, Some(path)) if path.as_os_str() == "-" => {
            feed_lines(&mut manager, Box::new(tokio::io::stdin())).await?;
        }
        (None, Some(path)) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            feed_lines(&mut manager, Box::new(file)).await?;
        }
        (None, None) => {
            feed_lines(&mut manager, Box::new(tokio::io::stdin())).await?;
        }
    }

    let mut closed = manager.end_session()?;
    let awaiting = closed.wait_for_critiques(config.drain_timeout).await;
    if !awaiting.is_empty() {
        warn!(shots = ?awaiting, "Critiques still outstanding at report time");
    }

    if !args.no_summary {
        if let Err(e) = closed.request_coaching_summary(config.summary_timeout).await {
            warn!(error = %e, "Coaching summary unavailable");
        }
    }

    let summary = closed.summary();
    info!(
        session_id = %summary.session_id,
        shots = summary.shot_count,
        made = summary.made,
        missed = summary.missed,
        best_release_velocity = summary.best_release_velocity(),
        mean_duration_secs = summary.mean_duration_secs(),
        "Session report ready"
    );

    let json = serde_json::to_string_pretty(&summary)?;
    match &args.output {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }

    Ok(())
}
