// External tool discovery: yt-dlp (extractor) and ffmpeg (media processor)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::utils::{first_output_line, command_succeeds};

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

/// Find a binary in common install paths, then via `which`
pub async fn find_binary(binary_name: &str) -> Option<PathBuf> {
    let common_paths = [
        format!("/opt/homebrew/bin/{}", binary_name), // Homebrew on Apple Silicon
        format!("/usr/local/bin/{}", binary_name),    // Homebrew on Intel Mac
        format!("/usr/bin/{}", binary_name),          // System installation
    ];

    for path in common_paths {
        if tokio::fs::metadata(&path).await.is_ok() {
            return Some(PathBuf::from(path));
        }
    }

    first_output_line(Path::new("which"), &[binary_name], CHECK_TIMEOUT)
        .await
        .map(PathBuf::from)
}

/// Python interpreter for module mode. `YTDLP_PYTHON` overrides (e.g. a venv).
pub fn python_cmd() -> PathBuf {
    std::env::var_os("YTDLP_PYTHON")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("python3"))
}

/// Whether `python -c "import <module>"` succeeds
pub async fn python_has_module(python: &Path, module: &str) -> bool {
    let code = format!("import {}", module);
    command_succeeds(python, &["-c", &code], CHECK_TIMEOUT).await
}

pub struct ToolManager {
    ytdlp_override: Option<PathBuf>,
    ffmpeg_override: Option<PathBuf>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self {
            ytdlp_override: None,
            ffmpeg_override: None,
        }
    }

    /// Use configured paths instead of discovery where given
    pub fn with_overrides(ytdlp: Option<PathBuf>, ffmpeg: Option<PathBuf>) -> Self {
        Self {
            ytdlp_override: ytdlp,
            ffmpeg_override: ffmpeg,
        }
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.locate(tool_type).await;
        let version = match &path {
            Some(p) => Self::get_version(p, tool_type).await,
            None => None,
        };

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            is_available: version.is_some(),
            version,
            path: path.map(|p| p.to_string_lossy().to_string()),
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        vec![
            self.get_tool_info(ToolType::YtDlp).await,
            self.get_tool_info(ToolType::Ffmpeg).await,
        ]
    }

    async fn locate(&self, tool_type: ToolType) -> Option<PathBuf> {
        let configured = match tool_type {
            ToolType::YtDlp => self.ytdlp_override.clone(),
            // --ffmpeg-location may name the directory holding ffmpeg
            ToolType::Ffmpeg => match self.ffmpeg_override.clone() {
                Some(p) => match tokio::fs::metadata(&p).await {
                    Ok(meta) if meta.is_dir() => Some(p.join("ffmpeg")),
                    _ => Some(p),
                },
                None => None,
            },
        };
        match configured {
            Some(path) => Some(path),
            None => find_binary(tool_type.as_str()).await,
        }
    }

    /// ffmpeg prints a banner; its first line carries the version
    async fn get_version(path: &Path, tool_type: ToolType) -> Option<String> {
        first_output_line(path, &[tool_type.version_arg()], CHECK_TIMEOUT).await
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_override_is_unavailable() {
        let manager = ToolManager::with_overrides(
            Some(PathBuf::from("/definitely/not/here/yt-dlp")),
            None,
        );
        let info = manager.get_tool_info(ToolType::YtDlp).await;
        assert_eq!(info.name, "yt-dlp");
        assert!(!info.is_available);
        assert!(info.version.is_none());
        assert_eq!(info.path.as_deref(), Some("/definitely/not/here/yt-dlp"));
    }

    #[tokio::test]
    async fn test_python_missing_interpreter() {
        assert!(!python_has_module(Path::new("/definitely/not/python"), "yt_dlp").await);
    }

    #[tokio::test]
    async fn test_ffmpeg_directory_override() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ToolManager::with_overrides(None, Some(dir.path().to_path_buf()));
        assert_eq!(
            manager.locate(ToolType::Ffmpeg).await,
            Some(dir.path().join("ffmpeg"))
        );
    }
}
