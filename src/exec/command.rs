// src/exec/command.rs

use std::path::Path;
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of a filter process.
#[derive(Debug, Clone)]
pub struct FilterOutput {
    pub success: bool,
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl FilterOutput {
    /// Stderr as text, trimmed, for error messages.
    pub fn stderr_text(&self) -> String {
        let text = String::from_utf8_lossy(&self.stderr).trim().to_string();
        if text.is_empty() {
            format!("exited with status {}", self.code)
        } else {
            text
        }
    }
}

/// Run `argv` followed by `extra_args` in `cwd`, feeding `stdin` if given.
///
/// Errors only when the process cannot be spawned or waited on; a non-zero
/// exit is reported through [`FilterOutput::success`].
pub async fn run_filter(
    argv: &[String],
    extra_args: &[String],
    stdin: Option<Vec<u8>>,
    cwd: &Path,
) -> Result<FilterOutput> {
    let Some((program, fixed)) = argv.split_first() else {
        bail!("empty command line");
    };

    debug!(program = %program, args = ?fixed, extra = ?extra_args, "spawning filter process");

    let mut cmd = Command::new(program);
    cmd.args(fixed)
        .args(extra_args)
        .current_dir(cwd)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{program}'"))?;

    // Feed stdin from its own task so stdout keeps draining meanwhile.
    let writer = match (stdin, child.stdin.take()) {
        (Some(bytes), Some(mut pipe)) => {
            let program = program.clone();
            Some(tokio::spawn(async move {
                if let Err(err) = pipe.write_all(&bytes).await {
                    warn!(program = %program, error = %err, "writing to filter stdin failed");
                }
                // Dropping the pipe closes stdin.
            }))
        }
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for '{program}'"))?;

    if let Some(writer) = writer {
        let _ = writer.await;
    }

    let code = output.status.code().unwrap_or(-1);
    debug!(program = %program, exit_code = code, success = output.status.success(), "filter process exited");

    Ok(FilterOutput {
        success: output.status.success(),
        code,
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
