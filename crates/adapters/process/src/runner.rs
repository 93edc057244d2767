//! Spawning and polling of sensor helpers.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use aquaria_domain::command::Command;

use crate::error::ProcessError;
use crate::line_buffer::LineBuffer;

/// How long a helper may keep running after printing its line before it is
/// killed.
pub const EXIT_GRACE: Duration = Duration::from_millis(250);

/// Result of polling a helper.
#[derive(Debug)]
pub enum ProcessStatus {
    /// Still running, no line yet.
    Pending,
    /// The first line printed on stdout. The child has been reaped.
    Line(String),
    /// The helper failed. The child has been reaped.
    Failed(ProcessError),
}

/// A running helper and the task collecting its output.
///
/// Dropping the handle kills the helper.
#[derive(Debug)]
pub struct ProcessHandle {
    result: oneshot::Receiver<Result<String, ProcessError>>,
    task: JoinHandle<()>,
}

impl ProcessHandle {
    /// Start `command` with piped stdout and stderr.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Spawn`] when the program cannot be started.
    pub fn spawn(command: &Command) -> Result<Self, ProcessError> {
        let mut child = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: command.program.clone(),
                source,
            })?;
        tracing::debug!(program = %command.program, pid = ?child.id(), "helper spawned");

        let (tx, result) = oneshot::channel();
        let program = command.program.clone();
        let task = tokio::spawn(async move {
            let outcome = collect(&mut child, &program).await;
            let _ = tx.send(outcome);
        });

        Ok(Self { result, task })
    }

    /// Check for a result without waiting.
    pub fn poll(&mut self) -> ProcessStatus {
        match self.result.try_recv() {
            Ok(Ok(line)) => ProcessStatus::Line(line),
            Ok(Err(err)) => ProcessStatus::Failed(err),
            Err(oneshot::error::TryRecvError::Empty) => ProcessStatus::Pending,
            Err(oneshot::error::TryRecvError::Closed) => {
                ProcessStatus::Failed(ProcessError::Aborted)
            }
        }
    }

    /// Wait for the helper to finish.
    ///
    /// # Errors
    ///
    /// Returns the helper's failure, or [`ProcessError::Aborted`] when it was
    /// killed.
    pub async fn wait(mut self) -> Result<String, ProcessError> {
        (&mut self.result)
            .await
            .map_err(|_| ProcessError::Aborted)?
    }

    /// Kill the helper. Its reaping happens in the background.
    pub fn kill(&mut self) {
        self.task.abort();
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Read the first stdout line, then reap the child.
///
/// After the line, the helper gets [`EXIT_GRACE`] to exit on its own while
/// its pipes are drained. A non-zero exit in that window fails the read. A
/// helper still running afterwards is killed and the line is kept.
async fn collect(child: &mut Child, program: &str) -> Result<String, ProcessError> {
    let mut stdout = child.stdout.take().ok_or(ProcessError::MissingPipe("stdout"))?;
    let mut stderr = child.stderr.take().ok_or(ProcessError::MissingPipe("stderr"))?;

    match read_line(&mut stdout, &mut stderr, program).await {
        Ok(line) => {
            let exited = tokio::time::timeout(EXIT_GRACE, async {
                tokio::join!(drain(&mut stdout), drain(&mut stderr));
                child.wait().await
            })
            .await;
            match exited {
                Ok(status) => check_status(status.map_err(ProcessError::Io)?)?,
                Err(_) => {
                    tracing::debug!(program, "helper still running after its line, killing");
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                }
            }
            Ok(line)
        }
        Err(ProcessError::ClosedWithoutLine) => {
            check_status(child.wait().await.map_err(ProcessError::Io)?)?;
            Err(ProcessError::ClosedWithoutLine)
        }
        Err(err) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            Err(err)
        }
    }
}

/// Discard everything until end of file.
async fn drain<R: AsyncRead + Unpin>(pipe: &mut R) {
    let mut chunk = [0u8; LineBuffer::CAPACITY];
    while let Ok(n) = pipe.read(&mut chunk).await {
        if n == 0 {
            break;
        }
    }
}

fn check_status(status: ExitStatus) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }
    match status.code() {
        Some(code) => Err(ProcessError::ExitStatus(code)),
        None => Err(ProcessError::Signal),
    }
}

/// Pump both pipes until stdout yields a line.
async fn read_line<O, E>(
    stdout: &mut O,
    stderr: &mut E,
    program: &str,
) -> Result<String, ProcessError>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = LineBuffer::new();
    let mut err = LineBuffer::new();
    let mut out_chunk = [0u8; LineBuffer::CAPACITY];
    let mut err_chunk = [0u8; LineBuffer::CAPACITY];
    let mut stderr_open = true;

    loop {
        let out_room = out.room();
        let err_room = err.room();
        tokio::select! {
            read = stdout.read(&mut out_chunk[..out_room]) => {
                let n = read.map_err(ProcessError::Io)?;
                if n == 0 {
                    return Err(ProcessError::ClosedWithoutLine);
                }
                out.push(&out_chunk[..n]);
                if let Some(line) = out.next_line() {
                    return Ok(line);
                }
                if out.is_full() {
                    return Err(ProcessError::Overflow);
                }
            }
            read = stderr.read(&mut err_chunk[..err_room]), if stderr_open => {
                match read {
                    Ok(0) | Err(_) => stderr_open = false,
                    Ok(n) => {
                        err.push(&err_chunk[..n]);
                        while let Some(line) = err.next_line() {
                            tracing::warn!(program, "{line}");
                        }
                        if err.is_full() {
                            tracing::warn!(program, "stderr line too long, discarded");
                            err.clear();
                        }
                    }
                }
            }
        }
    }
}
