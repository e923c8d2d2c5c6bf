//! Generic runner for line-oriented external tools.
//!
//! yt-dlp and FFmpeg only talk to us through stdout/stderr text. The runner
//! spawns the tool, merges both streams into a single line feed for the
//! caller's handler, keeps the tail of stderr for error reporting and kills
//! the child when the cancellation signal fires.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Number of stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Output collected from a successful run.
#[derive(Debug, Default)]
pub struct ToolOutput {
    /// Full stdout, only populated when capture was requested.
    pub stdout: String,
}

/// Runner for an external tool with cancellation support.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    program: String,
    cancel_rx: Option<watch::Receiver<bool>>,
    capture_stdout: bool,
}

impl ToolRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            cancel_rx: None,
            capture_stdout: false,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Keep stdout in [`ToolOutput::stdout`].
    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Resolve the program on PATH.
    pub fn check(&self) -> MediaResult<PathBuf> {
        which::which(&self.program).map_err(|_| MediaError::ToolNotFound(self.program.clone()))
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Run the tool, feeding every output line to `on_line`.
    ///
    /// `on_line` runs inline on the read loop and must not block.
    pub async fn run<F>(&self, args: &[String], mut on_line: F) -> MediaResult<ToolOutput>
    where
        F: FnMut(&str) + Send,
    {
        if self.is_cancelled() {
            return Err(MediaError::Aborted);
        }

        debug!("Running {} {}", self.program, args.join(" "));

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group so helpers the tool spawns (yt-dlp runs ffmpeg)
        // can be killed with it.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => MediaError::ToolNotFound(self.program.clone()),
                _ => MediaError::from(e),
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("stderr not captured"))?;

        let (line_tx, mut line_rx) = mpsc::unbounded_channel();
        spawn_line_reader(stdout, Stream::Stdout, line_tx.clone());
        spawn_line_reader(stderr, Stream::Stderr, line_tx);

        let mut output = ToolOutput::default();
        let mut stderr_tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut handle_line = |stream: Stream, line: String| {
            on_line(&line);
            match stream {
                Stream::Stdout if self.capture_stdout => {
                    output.stdout.push_str(&line);
                    output.stdout.push('\n');
                }
                Stream::Stdout => {}
                Stream::Stderr => {
                    if stderr_tail.len() == STDERR_TAIL_LINES {
                        stderr_tail.pop_front();
                    }
                    stderr_tail.push_back(line);
                }
            }
        };

        let mut cancel_rx = self.cancel_rx.clone();
        let status = loop {
            tokio::select! {
                Some((stream, line)) = line_rx.recv() => handle_line(stream, line),
                status = child.wait() => break status?,
                _ = wait_cancelled(&mut cancel_rx) => {
                    info!("{} cancelled, killing process", self.program);
                    if let Some(pid) = child.id() {
                        kill_process_group(pid);
                    }
                    let _ = child.kill().await;
                    return Err(MediaError::Aborted);
                }
            }
        };

        // Drain lines still buffered after exit.
        while let Some((stream, line)) = line_rx.recv().await {
            handle_line(stream, line);
        }

        // A kill racing with exit still counts as an abort.
        if self.is_cancelled() {
            return Err(MediaError::Aborted);
        }

        if status.success() {
            Ok(output)
        } else {
            let stderr = stderr_tail.into_iter().collect::<Vec<_>>().join("\n");
            Err(MediaError::process_failed(
                self.program.clone(),
                status.code(),
                stderr,
            ))
        }
    }
}

fn spawn_line_reader<R>(reader: R, stream: Stream, tx: mpsc::UnboundedSender<(Stream, String)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send((stream, line)).is_err() {
                break;
            }
        }
    });
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        debug!("killpg({}) failed: {}", raw, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

/// Resolves once the signal is set. Never resolves without a signal.
async fn wait_cancelled(cancel_rx: &mut Option<watch::Receiver<bool>>) {
    if let Some(rx) = cancel_rx {
        let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if fired {
            return;
        }
    }
    std::future::pending::<()>().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_lines_from_both_streams() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let output = ToolRunner::new("sh")
            .capture_stdout()
            .run(&sh("echo out; echo err 1>&2"), move |line| {
                sink.lock().unwrap().push(line.to_string())
            })
            .await
            .unwrap();

        assert_eq!(output.stdout, "out\n");
        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["err".to_string(), "out".to_string()]);
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_code_and_stderr() {
        let err = ToolRunner::new("sh")
            .run(&sh("echo 'ERROR: boom' 1>&2; exit 3"), |_| {})
            .await
            .unwrap_err();

        match err {
            MediaError::ProcessFailed {
                program,
                exit_code,
                stderr,
            } => {
                assert_eq!(program, "sh");
                assert_eq!(exit_code, Some(3));
                assert!(stderr.contains("ERROR: boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_kills_process() {
        let (tx, rx) = watch::channel(false);
        let runner = ToolRunner::new("sh").with_cancel(rx);

        let handle = tokio::spawn(async move { runner.run(&sh("sleep 30"), |_| {}).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner should stop after cancel")
            .unwrap();
        assert!(matches!(result, Err(MediaError::Aborted)));
    }

    /// Alive means the pid exists and is not a zombie awaiting reaping.
    #[cfg(target_os = "linux")]
    fn is_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .is_some_and(|state| state != "Z"),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_cancel_kills_helper_processes() {
        let (tx, rx) = watch::channel(false);
        let (pid_tx, mut pid_rx) = mpsc::unbounded_channel::<u32>();
        let runner = ToolRunner::new("sh").with_cancel(rx);

        let handle = tokio::spawn(async move {
            runner
                .run(&sh("sleep 300 & echo $!; wait"), move |line| {
                    if let Ok(pid) = line.trim().parse() {
                        let _ = pid_tx.send(pid);
                    }
                })
                .await
        });

        let helper = tokio::time::timeout(Duration::from_secs(5), pid_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(is_running(helper));

        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("runner should stop after cancel")
            .unwrap();
        assert!(matches!(result, Err(MediaError::Aborted)));

        for _ in 0..50 {
            if !is_running(helper) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!is_running(helper));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let (_tx, rx) = watch::channel(true);
        let result = ToolRunner::new("definitely-not-a-real-tool")
            .with_cancel(rx)
            .run(&[], |_| {})
            .await;
        assert!(matches!(result, Err(MediaError::Aborted)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = ToolRunner::new("definitely-not-a-real-tool")
            .run(&[], |_| {})
            .await;
        assert!(matches!(result, Err(MediaError::ToolNotFound(_))));
    }
}
