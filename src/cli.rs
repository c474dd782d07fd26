use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, AppConfig};
use crate::downloader::extractors::{diagnose_error, ExtractorMode, YtDlpExtractor};
use crate::downloader::tools::ToolManager;
use crate::downloader::{
    FailureKind, JobDescriptor, JobPhase, JobRunner, JobStatus, Percent, QualitySelection,
    TerminalResult, UiBridge, UiReceiver, UiUpdate,
};

const BAR_WIDTH: usize = 30;
const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Top-level CLI for media-fetch.
#[derive(Debug, Parser)]
#[command(name = "media-fetch")]
#[command(about = "Download a video or its audio track with yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one URL into a folder.
    Download {
        /// Video page URL.
        url: String,

        /// Save folder (defaults to the configured folder, then home).
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// best, 1080p, 720p, 480p or audio.
        #[arg(short, long)]
        quality: Option<QualitySelection>,

        /// Output filename template, e.g. "{title}.{ext}".
        #[arg(short, long)]
        template: Option<String>,

        /// How yt-dlp is launched: cli, python or auto.
        #[arg(long)]
        mode: Option<ExtractorMode>,
    },

    /// Show yt-dlp and ffmpeg availability.
    Tools {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration and where it lives.
    Config,
}

impl CliCommand {
    /// Parse arguments and run. `Ok(false)` means the command ran but the job failed.
    pub async fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        cli.command.run(cfg).await
    }

    pub async fn run(self, cfg: AppConfig) -> Result<bool> {
        match self {
            CliCommand::Download {
                url,
                dest,
                quality,
                template,
                mode,
            } => {
                let destination = dest.unwrap_or_else(|| cfg.destination());
                let quality = quality.unwrap_or_else(|| cfg.quality());
                let template = template.unwrap_or_else(|| cfg.filename_template.clone());

                // Rejected here, before any worker is started
                let descriptor =
                    match JobDescriptor::new(&url, &destination, quality, Some(&template)) {
                        Ok(descriptor) => descriptor,
                        Err(e) => {
                            eprintln!("{}", e);
                            return Ok(false);
                        }
                    };

                let mut extractor_config = cfg.extractor_config();
                if let Some(mode) = mode {
                    extractor_config = extractor_config.with_mode(mode);
                }
                tracing::info!(mode = %extractor_config.mode, "extractor configured");
                let extractor = YtDlpExtractor::new(extractor_config);

                let (bridge, updates) = UiBridge::new();
                let runner = JobRunner::new(Arc::new(extractor), bridge);
                runner
                    .submit(descriptor)
                    .context("failed to start download")?;

                let result = render_updates(updates).await;
                Ok(result.map(|r| r.is_success()).unwrap_or(false))
            }
            CliCommand::Tools { json } => {
                let manager =
                    ToolManager::with_overrides(cfg.ytdlp_path.clone(), cfg.ffmpeg_location.clone());
                let tools = manager.get_all_tools().await;

                if json {
                    println!("{}", serde_json::to_string_pretty(&tools)?);
                } else {
                    for tool in &tools {
                        if tool.is_available {
                            println!(
                                "{:<8} {:<16} {}",
                                tool.name,
                                tool.version.as_deref().unwrap_or("unknown"),
                                tool.path.as_deref().unwrap_or("-"),
                            );
                        } else {
                            println!("{:<8} not installed", tool.name);
                        }
                    }
                }
                Ok(tools.iter().all(|t| t.is_available))
            }
            CliCommand::Config => {
                println!("# {}", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&cfg)?);
                Ok(true)
            }
        }
    }
}

/// UI context: drain the bridge in order until the runner is ready again.
async fn render_updates(mut updates: UiReceiver) -> Option<TerminalResult> {
    let mut stdout = io::stdout();
    let mut tick = 0usize;
    let mut terminal = None;

    while let Some(update) = updates.recv().await {
        match update {
            UiUpdate::Status(status) => {
                if status.phase == JobPhase::Idle {
                    continue;
                }
                tick = tick.wrapping_add(1);
                let _ = write!(stdout, "\r\x1b[2K{}", status_line(&status, tick));
                let _ = stdout.flush();
            }
            UiUpdate::Terminal(result) => {
                let _ = writeln!(stdout);
                for line in terminal_lines(&result) {
                    if result.is_success() {
                        println!("{}", line);
                    } else {
                        eprintln!("{}", line);
                    }
                }
                terminal = Some(result);
            }
            UiUpdate::SubmitEnabled(enabled) => {
                tracing::debug!(enabled, "submit control toggled");
                if enabled && terminal.is_some() {
                    break;
                }
            }
        }
    }

    terminal
}

/// One-line rendering of a status: a bar when the percent is known, a spinner otherwise.
pub fn status_line(status: &JobStatus, tick: usize) -> String {
    match status.percent {
        Percent::Determinate(pct) => {
            let filled = BAR_WIDTH * pct.min(100) as usize / 100;
            format!(
                "[{}{}] {:>3}% {}",
                "#".repeat(filled),
                ".".repeat(BAR_WIDTH - filled),
                pct,
                status.message
            )
        }
        Percent::Indeterminate => {
            format!("[{}] {}", SPINNER[tick % SPINNER.len()], status.message)
        }
    }
}

/// Dialog text for a terminal result
pub fn terminal_lines(result: &TerminalResult) -> Vec<String> {
    match result {
        TerminalResult::Completed { destination } => vec![
            "Download finished and saved to:".to_string(),
            destination.display().to_string(),
        ],
        TerminalResult::Failed {
            kind: FailureKind::Extraction,
            message,
            ..
        } => {
            let mut lines = vec![format!("Download error: {}", message)];
            if let Some(reason) = diagnose_error(message) {
                tracing::info!(?reason, permanent = reason.is_permanent(), "diagnosed extraction error");
                lines.push(format!("{}. {}", reason.description(), reason.hint()));
            }
            lines
        }
        TerminalResult::Failed {
            kind: FailureKind::Unclassified,
            message,
            detail,
        } => {
            let mut lines = vec![message.clone()];
            if let Some(detail) = detail {
                lines.push(format!("Details: {}", detail));
            }
            lines
        }
    }
}
