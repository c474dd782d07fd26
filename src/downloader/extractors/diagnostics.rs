// Failure diagnostics - recognizes common extraction failure reasons
//
// Only used to annotate a failure for the user and the log; the failure
// message itself is never rewritten.

use serde::{Deserialize, Serialize};

/// Known reasons a source refuses or fails an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden
    Http403Forbidden,
    /// 429 or explicit throttling
    RateLimited,
    /// Age gate requiring login
    AgeRestricted,
    /// Not available in the user's region
    GeoBlocked,
    /// Private video
    PrivateVideo,
    /// Deleted, removed or otherwise unavailable
    VideoUnavailable,
    /// DRM-protected content, cannot be downloaded at all
    DrmProtected,
    /// URL not handled by any extractor
    UnsupportedUrl,
    /// Requested quality does not exist for this media
    FormatUnavailable,
    /// Connection or read timeout
    NetworkTimeout,
}

impl BlockingReason {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::RateLimited => "Rate limited by the site",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Not available in your country",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::DrmProtected => "DRM-protected content",
            Self::UnsupportedUrl => "Unsupported URL",
            Self::FormatUnavailable => "Requested quality not available",
            Self::NetworkTimeout => "Network timeout",
        }
    }

    /// Short advice shown under the error
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Http403Forbidden | Self::RateLimited => {
                "Wait a while and try again, or use a different network."
            }
            Self::AgeRestricted | Self::PrivateVideo => {
                "This media requires a logged-in account."
            }
            Self::GeoBlocked => "Try a network in a region where the media is available.",
            Self::VideoUnavailable => "The media may have been deleted or made private.",
            Self::DrmProtected => "DRM-protected media cannot be downloaded.",
            Self::UnsupportedUrl => "Check that the URL points to a single media page.",
            Self::FormatUnavailable => "Pick a lower quality or \"best\".",
            Self::NetworkTimeout => "Check your internet connection and try again.",
        }
    }

    /// Retrying unchanged will not help
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::DrmProtected | Self::VideoUnavailable | Self::UnsupportedUrl | Self::PrivateVideo
        )
    }
}

/// Match an extractor error message against known failure patterns
pub fn diagnose_error(message: &str) -> Option<BlockingReason> {
    let lower = message.to_lowercase();

    let patterns: [(&[&str], BlockingReason); 10] = [
        (&["drm", "widevine"], BlockingReason::DrmProtected),
        (&["unsupported url"], BlockingReason::UnsupportedUrl),
        (&["requested format is not available"], BlockingReason::FormatUnavailable),
        (&["http error 429", "too many requests"], BlockingReason::RateLimited),
        (&["http error 403", "forbidden"], BlockingReason::Http403Forbidden),
        (&["confirm your age", "age-restricted", "age restricted"], BlockingReason::AgeRestricted),
        (&["available in your country", "geo restricted", "geo-restricted"], BlockingReason::GeoBlocked),
        (&["private video"], BlockingReason::PrivateVideo),
        (&["video unavailable", "has been removed", "no longer available"], BlockingReason::VideoUnavailable),
        (&["timed out", "timeout"], BlockingReason::NetworkTimeout),
    ];

    patterns
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, reason)| *reason)
}
