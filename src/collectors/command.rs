use crate::collectors::CollectError;
use crate::config::CommandConfig;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio::time;
use tracing::{debug, warn};

pub async fn run_bounded(cfg: &CommandConfig) -> Result<String, CollectError> {
    let command_line = display_command(cfg);
    let start = Instant::now();

    let child = Command::new(&cfg.program)
        .args(&cfg.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| CollectError::CommandFailed {
            command: command_line.clone(),
            reason: err.to_string(),
        })?;

    let output = match time::timeout(cfg.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            return Err(CollectError::CommandFailed {
                command: command_line,
                reason: err.to_string(),
            });
        }
        Err(_elapsed) => {
            warn!(command = %command_line, timeout = ?cfg.timeout, "команда превысила время выполнения");
            return Err(CollectError::CommandTimeout {
                command: command_line,
                timeout: cfg.timeout,
            });
        }
    };

    debug!(
        command = %command_line,
        elapsed_ms = start.elapsed().as_millis() as u64,
        status = %output.status,
        "команда завершена"
    );

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = if stderr.is_empty() {
            format!("код завершения {}", output.status)
        } else {
            stderr
        };
        return Err(CollectError::CommandFailed {
            command: command_line,
            reason,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

pub fn display_command(cfg: &CommandConfig) -> String {
    if cfg.args.is_empty() {
        cfg.program.clone()
    } else {
        format!("{} {}", cfg.program, cfg.args.join(" "))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cmd(program: &str, args: &[&str], timeout: Duration) -> CommandConfig {
        CommandConfig {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout,
        }
    }

    #[tokio::test]
    async fn returns_trimmed_stdout() {
        let out = run_bounded(&cmd("echo", &["  hello  "], Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn deadline_yields_timeout_within_margin() {
        let cfg = cmd("sleep", &["5"], Duration::from_millis(200));
        let start = Instant::now();
        let err = run_bounded(&cfg).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, CollectError::CommandTimeout { .. }), "{err}");
        assert!(err.to_string().contains("превысила время выполнения"));
        assert!(elapsed < Duration::from_secs(2), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn non_zero_exit_is_command_failed() {
        let err = run_bounded(&cmd("false", &[], Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn spawn_failure_is_command_failed() {
        let err = run_bounded(&cmd(
            "pimonitor-no-such-program",
            &[],
            Duration::from_secs(1),
        ))
        .await
        .unwrap_err();
        match err {
            CollectError::CommandFailed { command, .. } => {
                assert_eq!(command, "pimonitor-no-such-program")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn command_line_is_joined() {
        let cfg = cmd("df", &["-h", "/"], Duration::from_secs(1));
        assert_eq!(display_command(&cfg), "df -h /");
    }
}
