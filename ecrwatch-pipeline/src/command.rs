//! Blocking execution of external programs.
//!
//! Every command is run to completion with captured output. A non-zero exit is
//! turned into [`CommandError::Exit`] carrying the trimmed stderr (or stdout),
//! with URL credentials masked so tokens never reach logs or error messages.

use std::io::Write;
use std::process::{Command, Output, Stdio};

use crate::error::CommandError;

/// Run `cmd` and return its output if it exited successfully.
///
/// `label` is the short human name used in logs and errors (e.g. `git fetch`);
/// the full argument list is never echoed because it may contain a token.
pub(crate) fn run(label: &str, cmd: &mut Command) -> Result<Output, CommandError> {
    tracing::debug!(command = label, "running");
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|source| CommandError::Spawn {
            command: label.to_string(),
            source,
        })?;
    check(label, output)
}

/// Run `cmd` with `input` written to its stdin.
pub(crate) fn run_with_stdin(
    label: &str,
    cmd: &mut Command,
    input: &[u8],
) -> Result<Output, CommandError> {
    tracing::debug!(command = label, "running with stdin");
    let spawn_err = |source| CommandError::Spawn {
        command: label.to_string(),
        source,
    };
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(spawn_err)?;

    if let Some(mut stdin) = child.stdin.take() {
        // A child that exits before reading its input reports through its status.
        if let Err(err) = stdin.write_all(input) {
            tracing::debug!(command = label, error = %err, "stdin closed early");
        }
    }
    let output = child.wait_with_output().map_err(spawn_err)?;
    check(label, output)
}

fn check(label: &str, output: Output) -> Result<Output, CommandError> {
    if output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            tracing::debug!(command = label, stderr = %redact_userinfo(stderr), "finished");
        }
        return Ok(output);
    }
    Err(CommandError::Exit {
        command: label.to_string(),
        code: output.status.code(),
        detail: failure_detail(&output),
    })
}

/// Stdout of a successful command as trimmed text.
pub(crate) fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Stderr and stdout of a failed command, whichever is present.
fn failure_detail(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    let detail = match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => "no output".to_string(),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{stderr}\n{stdout}"),
    };
    redact_userinfo(&detail)
}

/// Mask the userinfo part of every `scheme://user@host` URL in `text`.
pub(crate) fn redact_userinfo(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("://") {
        let (head, tail) = rest.split_at(idx + 3);
        out.push_str(head);
        let authority_end = tail
            .find(|c: char| c == '/' || c == '\'' || c == '"' || c.is_whitespace())
            .unwrap_or(tail.len());
        match tail[..authority_end].rfind('@') {
            Some(at) => {
                out.push_str("***");
                rest = &tail[at..];
            }
            None => rest = tail,
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_token_in_url() {
        assert_eq!(
            redact_userinfo("fatal: Authentication failed for 'https://ghp_abc@github.com/acme/web/'"),
            "fatal: Authentication failed for 'https://***@github.com/acme/web/'"
        );
    }

    #[test]
    fn leaves_urls_without_userinfo_alone() {
        let text = "From https://github.com/acme/web\n * branch main -> FETCH_HEAD";
        assert_eq!(redact_userinfo(text), text);
    }

    #[test]
    fn redacts_every_url() {
        assert_eq!(
            redact_userinfo("a https://x@h1/p b ssh://git@h2:22/q"),
            "a https://***@h1/p b ssh://***@h2:22/q"
        );
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = run(
            "missing tool",
            &mut Command::new("/nonexistent/ecrwatch-test-binary"),
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }), "got: {err}");
        assert!(err.to_string().contains("missing tool"));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_carries_stderr() {
        let err = run(
            "sh fail",
            Command::new("sh").args(["-c", "echo 'boom at https://tok@host/x' >&2; exit 3"]),
        )
        .unwrap_err();
        match err {
            CommandError::Exit { code, detail, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(detail, "boom at https://***@host/x");
            }
            other => panic!("expected exit error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn stdin_is_delivered() {
        let output = run_with_stdin("sh cat", Command::new("sh").args(["-c", "cat"]), b"secret")
            .expect("cat");
        assert_eq!(stdout_text(&output), "secret");
    }
}
