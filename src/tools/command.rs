use std::path::Path;
use std::process::Command;

use crate::agent::StepError;

/// Output from a shell command.
pub struct CmdOutput {
    /// Whether the command exited with status 0.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run a shell command via `sh -c` in a specific directory.
pub fn run_cmd_in_dir(dir: &Path, cmd: &str) -> Result<CmdOutput, StepError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(dir)
        .output()?;

    Ok(CmdOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_in_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let output = run_cmd_in_dir(dir.path(), "ls").unwrap();
        assert!(output.success);
        assert!(output.stdout.contains("marker.txt"));
    }

    #[test]
    fn nonexistent_dir_is_an_error() {
        let result = run_cmd_in_dir(Path::new("/nonexistent_dir_xyz_abc"), "ls");
        assert!(result.is_err());
    }

    #[test]
    fn failing_command_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let output = run_cmd_in_dir(dir.path(), "echo oops >&2; exit 3").unwrap();
        assert!(!output.success);
        assert_eq!(output.stderr.trim(), "oops");
    }
}
