//! Helper to handle child process stdout/stderr output
//!
//! Long-running children either share the parent's stdout/stderr, have every
//! line forwarded into tracing under the process name, or are silenced.
//! Piped output is always drained so a chatty child never blocks on a full pipe.
//!
//! On unix the pipes are drained by plain OS threads rather than runtime
//! tasks. Children outlive the runtime that launched them, and a pipe whose
//! reader went away kills the writer with SIGPIPE.

use std::process::Stdio;
use std::str::FromStr;
use tokio::process::Child;

use shared::SharedError;

/// Where a managed child's output goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Share the parent's stdout/stderr
    Inherit,
    /// Forward each line to tracing at debug level
    #[default]
    Log,
    /// Discard all output
    Discard,
}

impl FromStr for OutputMode {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inherit" => Ok(OutputMode::Inherit),
            "log" => Ok(OutputMode::Log),
            "discard" | "null" => Ok(OutputMode::Discard),
            other => Err(SharedError::invalid("PROCESS_OUTPUT", other)),
        }
    }
}

impl OutputMode {
    /// Mode to use for children that keep running after this process exits
    ///
    /// Logged output is read by this process, so it falls back to `Inherit`.
    pub fn outliving_parent(self) -> Self {
        match self {
            OutputMode::Log => OutputMode::Inherit,
            other => other,
        }
    }
}

/// Configure stdio for a child process based on the output mode
pub fn configure_child_stdio(cmd: &mut tokio::process::Command, mode: OutputMode) {
    cmd.stdin(Stdio::null());
    match mode {
        OutputMode::Inherit => {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        OutputMode::Log => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        OutputMode::Discard => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }
}

/// If output was piped, start readers that forward it line by line
#[cfg(unix)]
pub fn spawn_output_consumers(mut child: Child, process_name: &str) -> Child {
    let streams = [
        ("stdout", child.stdout.take().map(|s| s.into_owned_fd())),
        ("stderr", child.stderr.take().map(|s| s.into_owned_fd())),
    ];

    for (stream_name, fd) in streams {
        match fd {
            Some(Ok(fd)) => forward_lines(std::fs::File::from(fd), process_name, stream_name),
            Some(Err(e)) => {
                tracing::warn!(process = %process_name, stream = stream_name, "cannot forward output: {}", e);
            }
            None => {}
        }
    }

    child
}

#[cfg(unix)]
fn forward_lines<R>(stream: R, process_name: &str, stream_name: &'static str)
where
    R: std::io::Read + Send + 'static,
{
    use std::io::{BufRead, BufReader};

    let process = process_name.to_string();
    let spawned = std::thread::Builder::new()
        .name(format!("{process_name}-{stream_name}"))
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        tracing::debug!(process = %process, stream = stream_name, "{}", line.trim_end());
                    }
                }
            }
        });

    if let Err(e) = spawned {
        tracing::warn!(process = %process_name, stream = stream_name, "cannot start output reader: {}", e);
    }
}

/// If output was piped, spawn tasks that forward it line by line
#[cfg(not(unix))]
pub fn spawn_output_consumers(mut child: Child, process_name: &str) -> Child {
    use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

    fn forward<R>(stream: R, process: String, stream_name: &'static str)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(process = %process, stream = stream_name, "{}", line);
            }
        });
    }

    if let Some(stdout) = child.stdout.take() {
        forward(stdout, process_name.to_string(), "stdout");
    }
    if let Some(stderr) = child.stderr.take() {
        forward(stderr, process_name.to_string(), "stderr");
    }
    child
}
