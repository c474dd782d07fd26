// FormatSelector - quality selection to yt-dlp format expression
//
// Every expression is fallback-first: prefer separate video+audio streams
// merged by the media processor, then a single combined stream, so sites
// without adaptive streams still produce a playable file.

use super::models::{FetchFormatExpression, QualitySelection};

/// Used for any label that does not name a known quality
pub const FALLBACK_FORMAT: &str = "best";

pub struct FormatSelector;

impl FormatSelector {
    /// Resolve a quality selection. Pure and total.
    pub fn resolve(quality: QualitySelection) -> FetchFormatExpression {
        let spec = match quality.max_height() {
            Some(height) => format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
                h = height
            ),
            None if quality.is_audio_only() => "bestaudio".to_string(),
            None => "bestvideo+bestaudio/best".to_string(),
        };
        FetchFormatExpression::new(spec)
    }

    /// Get format spec for a free-form quality label (config files, UI combo values)
    pub fn get_format_spec(label: &str) -> FetchFormatExpression {
        match Self::parse_label(label) {
            Some(quality) => Self::resolve(quality),
            None => FetchFormatExpression::new(FALLBACK_FORMAT),
        }
    }

    /// Accepts both short labels ("720p") and the long UI labels
    /// ("Highest (merge best video+audio)", "Audio only (bestaudio)").
    fn parse_label(label: &str) -> Option<QualitySelection> {
        if let Ok(quality) = label.parse() {
            return Some(quality);
        }
        let lower = label.trim().to_lowercase();
        if lower.starts_with("highest") || lower.starts_with("best quality") {
            Some(QualitySelection::Highest)
        } else if lower.starts_with("audio only") {
            Some(QualitySelection::AudioOnly)
        } else {
            None
        }
    }
}
