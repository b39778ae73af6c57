use crate::datasource::RefreshError;
use crate::model::{Invocation, UiEvent};
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::process::{Output, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command as TokioCommand};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const STDERR_TAIL_LINES: usize = 20;

/// Keeps a streaming subprocess alive. Dropping the handle aborts the reader
/// task, which kills the child.
pub struct StreamHandle {
    id: u64,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        debug!(stream = self.id, "closing stream");
        self.task.abort();
    }
}

fn piped(invocation: &Invocation) -> TokioCommand {
    let mut cmd = TokioCommand::new(&invocation.program);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

fn failure_message(invocation: &Invocation, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{} exited with {}", invocation.program, output.status)
    } else {
        stderr.to_string()
    }
}

pub async fn capture_table(invocation: &Invocation) -> Result<String, RefreshError> {
    let output = piped(invocation)
        .output()
        .await
        .map_err(|error| RefreshError::Spawn {
            program: invocation.program.clone(),
            message: error.to_string(),
        })?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(RefreshError::Command(failure_message(invocation, &output)))
    }
}

pub async fn capture(invocation: &Invocation) -> Result<String> {
    info!(command = %invocation, "running");
    let output = piped(invocation)
        .output()
        .await
        .with_context(|| format!("failed to run {invocation}"))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(anyhow::anyhow!(failure_message(invocation, &output)))
    }
}

pub async fn run_attached(invocation: &Invocation) -> Result<()> {
    info!(command = %invocation, "running attached");
    let mut cmd = TokioCommand::new(&invocation.program);
    cmd.args(&invocation.args);
    if std::env::var_os("KUBE_EDITOR").is_none()
        && let Some(editor) = std::env::var_os("EDITOR")
    {
        cmd.env("KUBE_EDITOR", editor);
    }
    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .with_context(|| format!("failed to run {invocation}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{} exited with {status}", invocation.program))
    }
}

pub fn follow(
    invocation: &Invocation,
    stream: u64,
    events: mpsc::UnboundedSender<UiEvent>,
) -> Result<StreamHandle> {
    info!(command = %invocation, stream, "following");
    let mut child = piped(invocation)
        .spawn()
        .with_context(|| format!("failed to start {invocation}"))?;
    let stdout = child
        .stdout
        .take()
        .context("log stream has no stdout pipe")?;
    let stderr = tokio::spawn(stderr_tail(child.stderr.take()));
    let program = invocation.program.clone();

    let task = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        let mut error = loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if events.send(UiEvent::LogLine { stream, line }).is_err() {
                        return;
                    }
                }
                Ok(None) => break None,
                Err(error) => break Some(error.to_string()),
            }
        };

        match child.wait().await {
            Ok(status) if !status.success() && error.is_none() => {
                let message = stderr.await.unwrap_or_default();
                let message = message.trim();
                error = Some(if message.is_empty() {
                    format!("{program} exited with {status}")
                } else {
                    message.to_string()
                });
            }
            Ok(_) => {}
            Err(wait_error) => error = error.or(Some(wait_error.to_string())),
        }
        let _ = events.send(UiEvent::LogEnded { stream, error });
    });

    Ok(StreamHandle { id: stream, task })
}

// Drained alongside stdout so a full stderr pipe never blocks the child.
async fn stderr_tail(stderr: Option<ChildStderr>) -> String {
    let Some(stderr) = stderr else {
        return String::new();
    };
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}
