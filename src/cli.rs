use std::{
    future::Future,
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::{info, warn};

use crate::camera::{FeedSource, StrategyKind};
use crate::settings::UserSettings;
use crate::sips::{self, render_chart, Confirm, DEFAULT_EXPORT_FILE};
use crate::timer::{normalize_interval, state::interval_from_secs};
use crate::AppState;

const EMPTY_HISTORY: &str = "No sips yet — tap to start!";
const CAMERA_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(author, version, about = "Track water sips by tap, timer or camera detections")]
pub struct Cli {
    /// Directory holding the sip database and settings
    #[arg(long, env = "SIP_COUNTER_DATA_DIR", default_value = ".sip-counter", global = true)]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log one sip now
    Tap {
        /// Estimated volume in ml (defaults to the configured estimate)
        #[arg(long)]
        volume: Option<u32>,
    },
    /// Show the most recent sips, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show sips per hour for the last 24 active hours
    Chart {
        /// Width of the longest bar
        #[arg(long, default_value_t = 40)]
        width: usize,
    },
    /// Show totals per method
    Summary,
    /// Write the history as CSV
    Export {
        #[arg(long, short, default_value = DEFAULT_EXPORT_FILE)]
        out: PathBuf,
    },
    /// Delete the whole history
    Clear {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Run the auto-timer and/or camera detection until Ctrl-C
    Run {
        /// Log a sip on a fixed interval
        #[arg(long)]
        timer: bool,
        /// Timer interval in seconds; bad values fall back to 5
        #[arg(long)]
        interval: Option<String>,
        /// Detection feed (JSON lines): a file path, or `-` for stdin
        #[arg(long, value_name = "FEED")]
        camera: Option<String>,
        /// Detection strategy for the camera feed
        #[arg(long, value_enum)]
        strategy: Option<StrategyKind>,
        /// Ignore camera detection configured in settings
        #[arg(long, conflicts_with = "camera")]
        no_camera: bool,
        /// Stop after this many seconds
        #[arg(long = "for", value_name = "SECS")]
        run_for: Option<u64>,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one setting
    Set { key: String, value: String },
}

/// Reads the answer to a yes/no question from stdin.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(err) => {
                warn!("Failed to read confirmation: {err}");
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub async fn execute(cli: Cli) -> Result<()> {
    let state = AppState::open(&cli.data_dir).await?;

    match cli.command {
        Command::Tap { volume } => {
            let record = state.tap(volume).await?;
            println!(
                "Logged sip at {} (~{} ml)",
                record.recorded_at().with_timezone(&Local).format("%H:%M:%S"),
                record.volume_estimate
            );
        }
        Command::List { limit } => {
            let log = state.log.lock().await;
            if log.is_empty() {
                println!("{EMPTY_HISTORY}");
            }
            for record in log.recent(limit) {
                println!(
                    "{}  {:<6}  ~{} ml",
                    record
                        .recorded_at()
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M:%S"),
                    record.method,
                    record.volume_estimate
                );
            }
        }
        Command::Chart { width } => {
            let mut log = state.log.lock().await;
            println!("Hydration pattern");
            println!("{}", render_chart(log.hourly(), width));
        }
        Command::Summary => {
            let summary = state.log.lock().await.summary();
            println!("Total: {} sips (~{} ml)", summary.total, summary.total_ml);
            println!("  tap:    {}", summary.tap);
            println!("  timer:  {}", summary.timer);
            println!("  camera: {}", summary.camera);
        }
        Command::Export { out } => {
            let rows = {
                let log = state.log.lock().await;
                sips::export_to_file(log.records(), &out)?
            };
            println!("Exported {rows} sips to {}", out.display());
        }
        Command::Clear { yes } => {
            let cleared = {
                let mut log = state.log.lock().await;
                if yes {
                    log.clear(&|_: &str| true).await?
                } else {
                    log.clear(&StdinConfirm).await?
                }
            };
            println!("{}", if cleared { "History cleared." } else { "Nothing changed." });
        }
        Command::Run {
            timer,
            interval,
            camera,
            strategy,
            no_camera,
            run_for,
        } => {
            run_session(
                state,
                RunOptions {
                    timer,
                    interval,
                    camera,
                    strategy,
                    no_camera,
                    run_for,
                },
            )
            .await?;
            return Ok(());
        }
        Command::Settings { action } => {
            match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => print_settings(&state.settings.current())?,
                SettingsAction::Set { key, value } => {
                    let updated = state
                        .settings
                        .update(|settings| settings.set_value(&key, &value))?;
                    print_settings(&updated)?;
                }
            }
        }
    }

    state.shutdown().await?;
    Ok(())
}

struct RunOptions {
    timer: bool,
    interval: Option<String>,
    camera: Option<String>,
    strategy: Option<StrategyKind>,
    no_camera: bool,
    run_for: Option<u64>,
}

async fn run_session(state: AppState, options: RunOptions) -> Result<()> {
    let settings = state.settings.current();

    let run_timer = options.timer || options.interval.is_some();
    if run_timer {
        let interval = match options.interval.as_deref() {
            Some(raw) => normalize_interval(raw),
            None => interval_from_secs(settings.timer_interval_secs)
                .unwrap_or_else(|| normalize_interval("")),
        };
        state.start_timer(interval).await?;
    }

    let feed = if options.no_camera {
        None
    } else {
        options
            .camera
            .or_else(|| settings.camera.feed.clone().filter(|_| settings.camera.enabled))
    };
    let camera_started = match feed {
        Some(feed) => {
            state
                .enable_camera(&FeedSource::parse(&feed), options.strategy)
                .await
        }
        None => false,
    };

    if !run_timer && !camera_started {
        state.shutdown().await?;
        bail!("nothing to run: pass --timer and/or --camera <FEED>");
    }

    wait_for_stop(&state, run_timer, options.run_for, tokio::signal::ctrl_c()).await?;

    let report = state.shutdown().await?;
    println!(
        "Logged {} sips this run ({} timer ticks{})",
        report.appended,
        report.timer_ticks,
        report
            .camera
            .map(|stats| format!(", {} camera sips from {} frames", stats.admitted, stats.frames))
            .unwrap_or_default()
    );
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Interrupted,
    Elapsed,
    FeedFinished,
}

/// Block until `interrupt` resolves, `run_for` seconds pass, or a camera-only
/// session's feed runs out.
async fn wait_for_stop<F>(
    state: &AppState,
    run_timer: bool,
    run_for: Option<u64>,
    interrupt: F,
) -> Result<StopReason>
where
    F: Future<Output = io::Result<()>>,
{
    let deadline = async {
        match run_for {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);
    tokio::pin!(interrupt);

    let mut poll = tokio::time::interval(CAMERA_POLL_INTERVAL);
    loop {
        tokio::select! {
            result = &mut interrupt => {
                result.context("failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping sources");
                return Ok(StopReason::Interrupted);
            }
            _ = &mut deadline => {
                info!("Run time elapsed, stopping sources");
                return Ok(StopReason::Elapsed);
            }
            _ = poll.tick() => {
                if !run_timer && !state.camera_active().await {
                    info!("Detection feed finished");
                    return Ok(StopReason::FeedFinished);
                }
            }
        }
    }
}

fn print_settings(settings: &UserSettings) -> Result<()> {
    let rendered = serde_json::to_string_pretty(settings).context("failed to render settings")?;
    println!("{rendered}");
    Ok(())
}
