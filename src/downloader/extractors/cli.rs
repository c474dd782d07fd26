// yt-dlp extractor - runs yt-dlp as a subprocess and streams its progress
//
// Launch modes:
// - CLI: native `yt-dlp` binary
// - Python: `python3 -m yt_dlp` (or $YTDLP_PYTHON)
// - Auto: binary when found, Python module otherwise
//
// Progress comes from a `--progress-template` that prints one marker line
// per progress hook call, with fields separated by `|`.

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::traits::{ExtractRequest, Extractor, ExtractorConfig, ExtractorMode, ProgressCallback};
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{PostprocessStep, ProgressEvent, ProgressPhase};
use crate::downloader::tools::{find_binary, python_cmd, python_has_module};
use crate::downloader::utils::to_ytdlp_template;

/// First field of every progress line we ask yt-dlp to print
pub const PROGRESS_MARKER: &str = "MF_PROGRESS";

const PROGRESS_FIELDS: [&str; 9] = [
    "status",
    "downloaded_bytes",
    "total_bytes",
    "total_bytes_estimate",
    "speed",
    "eta",
    "_speed_str",
    "_eta_str",
    "filename", // last: may itself contain '|'
];

lazy_static::lazy_static! {
    static ref ERROR_RE: Regex = Regex::new(r"^ERROR:\s*(.+)$").unwrap();
    static ref ANSI_RE: Regex = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
}

/// Program plus leading arguments used to start yt-dlp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    pub program: PathBuf,
    pub prefix_args: Vec<String>,
}

impl Launcher {
    pub fn binary(path: PathBuf) -> Self {
        Self {
            program: path,
            prefix_args: Vec::new(),
        }
    }

    pub fn python_module(python: PathBuf) -> Self {
        Self {
            program: python,
            prefix_args: vec!["-m".to_string(), "yt_dlp".to_string()],
        }
    }

    /// Pick a launcher for the configured mode, looking up yt-dlp and python
    pub async fn resolve(config: &ExtractorConfig) -> Self {
        let python = config.python_path.clone().unwrap_or_else(python_cmd);
        let binary = match (&config.ytdlp_path, config.mode) {
            (Some(path), _) => Some(path.clone()),
            (None, ExtractorMode::Python) => None,
            (None, _) => find_binary("yt-dlp").await,
        };

        match config.mode {
            ExtractorMode::Cli => Self::binary(binary.unwrap_or_else(|| PathBuf::from("yt-dlp"))),
            ExtractorMode::Python => Self::python_module(python),
            ExtractorMode::Auto => {
                if let Some(path) = binary {
                    return Self::binary(path);
                }
                if python_has_module(&python, "yt_dlp").await {
                    tracing::info!("yt-dlp binary not found, using python module");
                    return Self::python_module(python);
                }
                // Last resort: hope it's in PATH
                Self::binary(PathBuf::from("yt-dlp"))
            }
        }
    }
}

/// Extractor backed by yt-dlp
pub struct YtDlpExtractor {
    config: ExtractorConfig,
    /// Fixed launcher; resolved per download when unset
    launcher: Option<Launcher>,
}

impl YtDlpExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            launcher: None,
        }
    }

    pub fn with_launcher(config: ExtractorConfig, launcher: Launcher) -> Self {
        Self {
            config,
            launcher: Some(launcher),
        }
    }

    pub async fn launcher(&self) -> Launcher {
        match &self.launcher {
            Some(launcher) => launcher.clone(),
            None => Launcher::resolve(&self.config).await,
        }
    }

    /// Build command arguments (after the launcher prefix)
    pub fn build_args(&self, request: &ExtractRequest) -> Vec<String> {
        let template = to_ytdlp_template(&request.output_template.to_string_lossy());
        let progress_template = format!(
            "download:{}|{}",
            PROGRESS_MARKER,
            PROGRESS_FIELDS
                .iter()
                .map(|f| format!("%(progress.{})s", f))
                .collect::<Vec<_>>()
                .join("|")
        );

        let mut args = vec![
            "-f".to_string(),
            request.format.to_string(),
            "-o".to_string(),
            template,
            "--no-playlist".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            self.config.timeout_seconds.to_string(),
            "--progress-template".to_string(),
            progress_template,
        ];

        for step in &request.postprocessors {
            match step {
                PostprocessStep::EmbedMetadata => args.push("--embed-metadata".to_string()),
                PostprocessStep::ExtractAudio { codec, quality } => args.extend([
                    "-x".to_string(),
                    "--audio-format".to_string(),
                    codec.clone(),
                    "--audio-quality".to_string(),
                    format!("{}K", quality),
                ]),
            }
        }

        if let Some(location) = &self.config.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.to_string_lossy().to_string());
        }

        // Keep the URL after "--" so it is never read as an option
        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn download(
        &self,
        request: ExtractRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), DownloadError> {
        let launcher = self.launcher().await;
        let args = self.build_args(&request);
        tracing::debug!(
            program = %launcher.program.display(),
            prefix = ?launcher.prefix_args,
            args = ?args,
            "starting yt-dlp"
        );

        let mut child = Command::new(&launcher.program)
            .args(&launcher.prefix_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DownloadError::ToolNotFound(format!(
                    "{}: {}",
                    launcher.program.display(),
                    e
                )),
                _ => DownloadError::Io(e),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stderr".to_string()))?;

        // Always drained to EOF, even past unreadable bytes
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut collected = Vec::new();
            loop {
                match next_lossy_line(&mut reader, &mut buf).await {
                    Ok(Some(line)) => {
                        tracing::debug!("stderr: {}", line);
                        collected.push(line);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "reading yt-dlp stderr failed");
                        break;
                    }
                }
            }
            collected
        });

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        while let Some(line) = next_lossy_line(&mut reader, &mut buf).await? {
            match parse_progress_line(&line) {
                Some(event) => on_progress(event),
                None => tracing::debug!("{}", line),
            }
        }

        let status = child.wait().await?;
        let stderr_lines = stderr_task
            .await
            .map_err(|e| DownloadError::ExecutionError(format!("stderr task failed: {}", e)))?;

        if status.success() {
            return Ok(());
        }

        Err(classify_failure(&stderr_lines, &status.to_string()))
    }
}

/// Next line of subprocess output, decoded lossily.
///
/// yt-dlp echoes titles and paths in the platform encoding, which is not
/// always UTF-8.
async fn next_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..]);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Parse one marker line printed by our progress template
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let line = ANSI_RE.replace_all(line.trim(), "");
    let rest = line.strip_prefix(PROGRESS_MARKER)?.strip_prefix('|')?;
    let fields: Vec<&str> = rest.splitn(PROGRESS_FIELDS.len(), '|').collect();
    let field = |i: usize| fields.get(i).copied().and_then(non_empty);

    Some(ProgressEvent {
        phase: field(0).map(ProgressPhase::parse).unwrap_or(ProgressPhase::Other),
        downloaded_bytes: field(1).and_then(parse_u64),
        total_bytes: field(2).and_then(parse_u64),
        total_bytes_estimate: field(3).and_then(parse_u64),
        speed: field(4).and_then(parse_f64),
        eta: field(5).and_then(parse_u64),
        speed_text: field(6).map(str::to_string),
        eta_text: field(7).map(str::to_string),
        filename: field(8).map(str::to_string),
    })
}

/// yt-dlp prints `NA` (or `None`) for missing template fields
fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    match s {
        "" | "NA" | "None" | "null" => None,
        _ => Some(s),
    }
}

fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Integers may arrive as floats (e.g. `total_bytes_estimate`)
fn parse_u64(s: &str) -> Option<u64> {
    s.parse::<u64>()
        .ok()
        .or_else(|| parse_f64(s).map(|v| v as u64))
}

/// Turn a failed run into a classified error
pub fn classify_failure(stderr_lines: &[String], exit_status: &str) -> DownloadError {
    let errors: Vec<String> = stderr_lines
        .iter()
        .filter_map(|l| {
            ERROR_RE
                .captures(l.trim())
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .collect();

    if !errors.is_empty() {
        return DownloadError::from_extractor_message(errors.join("\n"));
    }

    let last = stderr_lines
        .iter()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| "no output".to_string());
    DownloadError::ExecutionError(format!("yt-dlp exited with {}: {}", exit_status, last))
}
