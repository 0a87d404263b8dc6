// ABOUTME: Runs shell commands in their own process group with per-call output buffers.
// ABOUTME: On timeout the whole group is killed and the shell reaped before returning.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

pub const SHELL: &str = "/bin/sh";

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Captured result of a finished shell command.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl ShellOutput {
    /// Exit code, or the negated signal number when the shell died from a signal.
    pub fn exit_code(&self) -> i32 {
        if let Some(code) = self.status.code() {
            return code;
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = self.status.signal() {
                return -signal;
            }
        }
        -1
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kill every process in the group, then reap the shell itself.
///
/// `pgid` is taken at spawn time: once the shell has been reaped `child.id()`
/// is gone, but its background children may still hold the group open.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    {
        if let Some(pgid) = pgid {
            let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
            if rc != 0 {
                debug!(pgid, error = %io::Error::last_os_error(), "killpg failed");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pgid;

    if let Ok(Some(_)) = child.try_wait() {
        return;
    }
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to reap timed-out command");
    }
}

/// Run `command` through `/bin/sh -c`, waiting at most `timeout` for it and
/// everything holding its output pipes.
pub async fn run_shell(command: &str, timeout: Duration) -> Result<ShellOutput, ExecError> {
    let mut cmd = Command::new(SHELL);
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn()?;
    // process_group(0) makes the shell a group leader, so pgid == pid.
    let pgid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let finished = {
        let collect = async {
            let (status, out, err) =
                tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
            Ok::<_, io::Error>((status?, out?, err?))
        };
        tokio::time::timeout(timeout, collect).await
    };

    match finished {
        Ok(Ok((status, stdout, stderr))) => Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            status,
        }),
        Ok(Err(e)) => {
            terminate(&mut child, pgid).await;
            Err(ExecError::Io(e))
        }
        Err(_) => {
            terminate(&mut child, pgid).await;
            Err(ExecError::TimedOut(timeout))
        }
    }
}
