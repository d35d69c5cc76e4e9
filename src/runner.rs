use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

/// Run a command in `dir` and inherit stdio (shows output in real-time)
pub fn run_in(dir: &Path, cmd: &str, args: &[&str]) -> Result<ExitStatus> {
    Command::new(cmd)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))
}

/// Run a command in `dir` and capture output
pub fn run_capture_in(dir: &Path, cmd: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(cmd)
        .args(args)
        .current_dir(dir)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}", stderr.trim())
    }
}

/// Run a command in `dir` and capture stdout, `None` on a non-zero exit
///
/// For queries where failure means "absent", like `git config --get`.
pub fn run_optional_in(dir: &Path, cmd: &str, args: &[&str]) -> Result<Option<String>> {
    let output = Command::new(cmd)
        .args(args)
        .current_dir(dir)
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    if output.status.success() {
        Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
        ))
    } else {
        Ok(None)
    }
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_capture_in_uses_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let out = run_capture_in(dir.path(), "ls", &[]).unwrap();
        assert!(out.contains("marker.txt"));
    }

    #[test]
    fn test_run_optional_in_failure_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_optional_in(dir.path(), "ls", &["does-not-exist-twig"]).unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn test_missing_command_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_capture_in(dir.path(), "twig-no-such-binary-xyz", &[]).is_err());
        assert!(!command_exists("twig-no-such-binary-xyz"));
    }
}
