use std::fmt;
use std::io::{self, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::str::FromStr;

use crate::foundation::error::{VideogenError, VideogenResult};

/// Container/codec for the output stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Raw RGBA frames, no encoder.
    Raw,
    /// AVI with the raw video copied in; fastest.
    #[default]
    Avi,
    /// WebM with VP9 (alpha kept as yuva420p), tuned for realtime.
    Webm,
}

impl OutputFormat {
    /// Output-side ffmpeg arguments selecting the container and codec.
    pub fn output_args(self) -> &'static [&'static str] {
        match self {
            Self::Raw => &[],
            Self::Avi => &["-f", "avi", "-c:v", "copy"],
            Self::Webm => &[
                "-f",
                "webm",
                "-c:v",
                "libvpx-vp9",
                "-pix_fmt",
                "yuva420p",
                "-deadline",
                "realtime",
                "-quality",
                "realtime",
            ],
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Raw => "raw",
            Self::Avi => "avi",
            Self::Webm => "webm",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = VideogenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" | "raw" => Ok(Self::Raw),
            "a" | "avi" => Ok(Self::Avi),
            "w" | "webm" => Ok(Self::Webm),
            other => Err(VideogenError::validation(format!(
                "unknown output format '{other}' (expected raw, avi or webm)"
            ))),
        }
    }
}

/// Build the ffmpeg argument list that reads raw RGBA from stdin and writes `format` to stdout.
pub fn ffmpeg_args(
    format: OutputFormat,
    width: u32,
    height: u32,
    rate: u32,
) -> VideogenResult<Vec<String>> {
    if width == 0 || height == 0 {
        return Err(VideogenError::validation(format!(
            "invalid frame size: {width}x{height}"
        )));
    }
    if rate == 0 {
        return Err(VideogenError::validation("invalid frame rate: 0"));
    }

    let mut args: Vec<String> = [
        "-hide_banner",
        "-nostdin",
        // input
        "-an",
        "-f",
        "rawvideo",
        "-pixel_format",
        "rgba",
        "-framerate",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(rate.to_string());
    args.push("-video_size".to_string());
    args.push(format!("{width}x{height}"));
    args.extend(
        [
            // keep input latency low
            "-fflags",
            "nobuffer",
            "-probesize",
            "32",
            "-analyzeduration",
            "0",
            "-fpsprobesize",
            "0",
            "-i",
            "-",
            // keep output latency low
            "-avioflags",
            "direct",
            "-fflags",
            "flush_packets",
            "-flush_packets",
            "1",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.extend(format.output_args().iter().map(|s| s.to_string()));
    args.push("-".to_string());
    Ok(args)
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// A subprocess whose stdin is exposed as a [`Write`].
///
/// The process is spawned on the first write. Its stdout and stderr are inherited, so encoded
/// output lands on our stdout. The first write error is sticky: later writes return it again.
/// Dropping a started command without [`PipeCommand::close`] kills the process and reaps it.
#[derive(Debug)]
pub struct PipeCommand {
    program: String,
    cmd: Command,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    err: Option<(io::ErrorKind, String)>,
}

impl PipeCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = String>) -> Self {
        let program = program.into();
        let mut cmd = Command::new(&program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        Self {
            program,
            cmd,
            child: None,
            stdin: None,
            err: None,
        }
    }

    /// An `ffmpeg` process encoding raw RGBA frames of the given geometry to `format`.
    pub fn ffmpeg(format: OutputFormat, width: u32, height: u32, rate: u32) -> VideogenResult<Self> {
        if format == OutputFormat::Raw {
            return Err(VideogenError::validation(
                "raw output does not use an encoder process",
            ));
        }
        Ok(Self::new("ffmpeg", ffmpeg_args(format, width, height, rate)?))
    }

    pub fn is_started(&self) -> bool {
        self.child.is_some()
    }

    fn start(&mut self) -> io::Result<()> {
        tracing::debug!(program = %self.program, "starting encoder process");
        let mut child = self.cmd.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "encoder stdin was not captured")
        })?;
        self.child = Some(child);
        self.stdin = Some(stdin);
        Ok(())
    }

    fn sticky(&self) -> Option<io::Error> {
        self.err
            .as_ref()
            .map(|(kind, msg)| io::Error::new(*kind, msg.clone()))
    }

    fn remember(&mut self, err: &io::Error) {
        if self.err.is_none() {
            self.err = Some((err.kind(), err.to_string()));
        }
    }

    /// Close stdin and wait for the process to exit.
    pub fn close(mut self) -> VideogenResult<()> {
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Err(self.sticky().map_or_else(
                || VideogenError::encode(format!("{} was never started", self.program)),
                |e| VideogenError::encode(format!("{} failed to start: {e}", self.program)),
            ));
        };

        let status = child.wait().map_err(|e| {
            VideogenError::encode(format!("failed to wait for {} to finish: {e}", self.program))
        })?;
        if let Some(err) = self.sticky() {
            return Err(VideogenError::encode(format!(
                "failed to write to {} stdin: {err}",
                self.program
            )));
        }
        if !status.success() {
            return Err(VideogenError::encode(format!(
                "{} exited with status {status}",
                self.program
            )));
        }
        tracing::debug!(program = %self.program, "encoder process finished");
        Ok(())
    }
}

impl Drop for PipeCommand {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        drop(self.stdin.take());
        tracing::debug!(program = %self.program, "killing encoder process that was not closed");
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Write for PipeCommand {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(err) = self.sticky() {
            return Err(err);
        }
        if self.child.is_none()
            && let Err(err) = self.start()
        {
            self.remember(&err);
            return Err(err);
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "encoder stdin is already closed",
            ));
        };
        match stdin.write(buf) {
            Ok(n) => Ok(n),
            Err(err) => {
                self.remember(&err);
                Err(err)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.flush(),
            None => Ok(()),
        }
    }
}
