// Helper functions shared by the extractor and tool discovery

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

async fn run_short_command(program: &Path, args: &[&str], limit: Duration) -> Option<Output> {
    // kill_on_drop reaps the child when the timeout drops the future
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    match timeout(limit, output).await {
        Ok(Ok(output)) if output.status.success() => Some(output),
        Ok(Ok(output)) => {
            tracing::debug!(program = %program.display(), status = %output.status, "command exited unsuccessfully");
            None
        }
        Ok(Err(e)) => {
            tracing::debug!(program = %program.display(), error = %e, "command failed to start");
            None
        }
        Err(_) => {
            tracing::debug!(program = %program.display(), ?limit, "command timed out");
            None
        }
    }
}

/// First non-empty stdout line of a short-lived command.
///
/// `None` when the program is missing, fails, or outlives `limit`.
pub async fn first_output_line(program: &Path, args: &[&str], limit: Duration) -> Option<String> {
    let output = run_short_command(program, args, limit).await?;
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Whether a command exits successfully within `limit`
pub async fn command_succeeds(program: &Path, args: &[&str], limit: Duration) -> bool {
    run_short_command(program, args, limit).await.is_some()
}

/// Translate a `{title}.{ext}` template into yt-dlp's `%(title)s.%(ext)s`.
///
/// Literal `%` is escaped as `%%`. Unbalanced braces are copied as-is.
pub fn to_ytdlp_template(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 8);
    let mut rest = template;

    while let Some(c) = rest.chars().next() {
        match c {
            '%' => {
                out.push_str("%%");
                rest = &rest[1..];
            }
            '{' => match rest.find('}') {
                Some(end) if end > 1 && !rest[1..end].contains('{') => {
                    out.push_str("%(");
                    out.push_str(rest[1..end].trim());
                    out.push_str(")s");
                    rest = &rest[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = &rest[1..];
                }
            },
            _ => {
                out.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        assert_eq!(to_ytdlp_template("{title}.{ext}"), "%(title)s.%(ext)s");
    }

    #[test]
    fn test_percent_is_escaped() {
        assert_eq!(to_ytdlp_template("100% {id}"), "100%% %(id)s");
    }

    #[test]
    fn test_unbalanced_braces_kept() {
        assert_eq!(to_ytdlp_template("{title"), "{title");
        assert_eq!(to_ytdlp_template("{}x"), "{}x");
        assert_eq!(to_ytdlp_template("ü/{uploader}/{title}.{ext}"), "ü/%(uploader)s/%(title)s.%(ext)s");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_first_output_line_skips_blank_lines() {
        let line = first_output_line(
            Path::new("sh"),
            &["-c", "echo; echo '  yt-dlp 2024.08.06  '; echo second"],
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(line.as_deref(), Some("yt-dlp 2024.08.06"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_first_output_line_lossy_output() {
        let line = first_output_line(Path::new("printf"), &["ffmpeg \\351\\n"], Duration::from_secs(5)).await;
        assert_eq!(line.as_deref(), Some("ffmpeg \u{FFFD}"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_short_command_times_out() {
        assert!(!command_succeeds(Path::new("sleep"), &["5"], Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_short_command_missing_program() {
        let program = Path::new("/definitely/not/a/program");
        assert!(first_output_line(program, &["--version"], Duration::from_secs(1)).await.is_none());
        assert!(!command_succeeds(program, &[], Duration::from_secs(1)).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_short_command_failed_exit() {
        assert!(!command_succeeds(Path::new("sh"), &["-c", "exit 3"], Duration::from_secs(5)).await);
        assert!(command_succeeds(Path::new("sh"), &["-c", "exit 0"], Duration::from_secs(5)).await);
    }
}
