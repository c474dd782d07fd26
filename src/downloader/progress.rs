// Progress reducer: raw extractor events -> JobStatus
//
// Pure and deterministic. Delivery to the UI is the bridge's job.

use super::models::{JobPhase, JobStatus, Percent, ProgressEvent, ProgressPhase};

pub struct ProgressReducer;

impl ProgressReducer {
    /// Fold one event into the prior status.
    ///
    /// `finished` means one stream is on disk, not that the job is done:
    /// merge or audio extraction may still follow, so it maps to Postprocessing.
    pub fn reduce(event: &ProgressEvent, prior: &JobStatus) -> JobStatus {
        match event.phase {
            ProgressPhase::Downloading => Self::downloading(event),
            ProgressPhase::Finished => JobStatus::new(
                JobPhase::Postprocessing,
                Percent::Determinate(100),
                "Merging/processing final file...",
            ),
            ProgressPhase::Error => JobStatus::new(
                JobPhase::Failed,
                prior.percent,
                "Error during download.",
            ),
            ProgressPhase::Other => prior.clone(),
        }
    }

    fn downloading(event: &ProgressEvent) -> JobStatus {
        let eta = eta_text(event);
        match event.effective_total() {
            Some(total) => {
                let downloaded = event.downloaded_bytes.unwrap_or(0);
                let pct = (u128::from(downloaded) * 100 / u128::from(total)).min(100) as u8;

                let mut message = format!("Downloading... {}%", pct);
                if let Some(eta) = eta {
                    message.push_str(&format!(", ETA {}", eta));
                }
                if let Some(speed) = speed_text(event) {
                    message.push_str(&format!(" ({})", speed));
                }
                JobStatus::new(JobPhase::Downloading, Percent::Determinate(pct), message)
            }
            None => {
                let message = match eta {
                    Some(eta) => format!("Downloading... ETA {}", eta),
                    None => "Downloading...".to_string(),
                };
                JobStatus::new(JobPhase::Downloading, Percent::Indeterminate, message)
            }
        }
    }
}

fn eta_text(event: &ProgressEvent) -> Option<String> {
    if let Some(text) = event.eta_text.as_deref().map(str::trim) {
        if !text.is_empty() && text != "Unknown" {
            return Some(text.to_string());
        }
    }
    event.eta.map(format_eta)
}

fn speed_text(event: &ProgressEvent) -> Option<String> {
    if let Some(text) = event.speed_text.as_deref().map(str::trim) {
        if !text.is_empty() && text != "Unknown" {
            return Some(text.to_string());
        }
    }
    event.speed.filter(|s| *s > 0.0).map(format_speed)
}

/// 75 -> "01:15", 3725 -> "1:02:05"
pub fn format_eta(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Bytes per second in binary units, as yt-dlp prints them
pub fn format_speed(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KiB/s", "MiB/s", "GiB/s"];
    let mut value = bytes_per_sec;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2}{}", value, UNITS[unit])
}
