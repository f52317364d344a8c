use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::encode::ffmpeg::OutputFormat;
use crate::encode::sink::OutputSink;
use crate::foundation::error::{VideogenError, VideogenResult};
use crate::frameloop::{
    CancelToken, Emitted, FrameLoop, frame_channel, notification_channel,
};
use crate::render::frame::Frame;
use crate::render::scene::Scene;

/// Geometry, timing and output format of a generated stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSettings {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frames per second.
    pub rate: u32,
    /// Length of the generated animation.
    pub duration: Duration,
    /// Container/codec of the output.
    pub format: OutputFormat,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            rate: 10,
            duration: Duration::from_secs(10),
            format: OutputFormat::default(),
        }
    }
}

impl StreamSettings {
    pub fn validate(&self) -> VideogenResult<()> {
        if self.width == 0 {
            return Err(VideogenError::validation("width must be positive: 0"));
        }
        if self.height == 0 {
            return Err(VideogenError::validation("height must be positive: 0"));
        }
        if self.rate == 0 {
            return Err(VideogenError::validation("frame rate must be positive: 0"));
        }
        if self.duration.is_zero() {
            return Err(VideogenError::validation("duration must be positive: 0s"));
        }
        Ok(())
    }

    /// Number of animation frames: `floor(rate * duration)`.
    pub fn frame_count(&self) -> u64 {
        let n = u128::from(self.rate) * self.duration.as_nanos() / 1_000_000_000;
        u64::try_from(n).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for StreamSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WxH: {}x{} | frameRate: {} | duration: {:?} | format: {}",
            self.width, self.height, self.rate, self.duration, self.format
        )
    }
}

/// Parse a duration such as `10s`, `1.5s`, `250ms` or `1m30s`.
///
/// Accepted units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; every number needs one.
pub fn parse_duration(text: &str) -> VideogenResult<Duration> {
    let invalid = || VideogenError::validation(format!("invalid duration '{text}'"));
    let mut rest = text.trim();
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut nanos: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_digits, tail) = rest.split_at(int_len);
        let (frac_digits, tail) = match tail.strip_prefix('.') {
            Some(after) => after.split_at(
                after
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(after.len()),
            ),
            None => ("", tail),
        };
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(invalid());
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let scale: u128 = match &tail[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return Err(invalid()),
        };
        rest = &tail[unit_len..];

        let whole = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse::<u128>().map_err(|_| invalid())?
        };
        let mut value = whole.checked_mul(scale).ok_or_else(invalid)?;
        // Digits below one nanosecond are dropped.
        let mut place = scale;
        for digit in frac_digits.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            value = value
                .checked_add(u128::from(digit - b'0') * place)
                .ok_or_else(invalid)?;
        }
        nanos = nanos.checked_add(value).ok_or_else(invalid)?;
    }

    let nanos = u64::try_from(nanos).map_err(|_| invalid())?;
    Ok(Duration::from_nanos(nanos))
}

/// Counters for a finished stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Distinct frames handed to the frame loop.
    pub frames_sent: u64,
    /// Frame writes observed through pulses, repeats included.
    pub emissions: u64,
}

/// Renders the scene and feeds it to a [`FrameLoop`] at the output rate.
pub struct StreamSession;

impl StreamSession {
    /// Generate the whole stream into `sink`.
    ///
    /// Each frame is rendered only after the previous one was written, so the producer runs at
    /// the output cadence. Once the last frame was written the loop is stopped and the sink is
    /// handed back for the caller to close. Cancelling `parent` ends the stream early without an
    /// error.
    ///
    /// On a write error the sink is closed here before the error is returned. When the loop
    /// panicked the sink went down with the worker thread.
    #[tracing::instrument(skip_all, fields(
        width = settings.width,
        height = settings.height,
        rate = settings.rate,
    ))]
    pub fn run(
        settings: &StreamSettings,
        sink: OutputSink,
        parent: &CancelToken,
    ) -> VideogenResult<(StreamStats, OutputSink)> {
        settings.validate()?;
        let mut scene = Scene::new(settings.width, settings.height, settings.rate)?;
        let total = settings.frame_count().max(1);
        tracing::debug!(frames = total, "starting stream");

        let (frame_tx, frame_rx) = frame_channel();
        let (notify_tx, notify_rx) = notification_channel();
        let frame_loop = FrameLoop::new(
            parent,
            sink,
            i64::from(settings.rate),
            frame_rx,
            Some(notify_tx),
        );

        let mut stats = StreamStats::default();
        let mut frame = scene.frame()?;
        loop {
            if !send_frame(&frame_tx, &frame_loop, frame) {
                break;
            }
            stats.frames_sent += 1;
            if stats.frames_sent >= total {
                break;
            }
            match wait_written(&frame_loop, &notify_rx, stats.frames_sent) {
                Some(pulse) => stats.emissions = pulse.seq,
                None => break,
            }
            frame = scene.next_frame()?;
        }

        // Let the last frame reach the sink before stopping.
        if stats.frames_sent > 0
            && let Some(pulse) = wait_written(&frame_loop, &notify_rx, stats.frames_sent)
        {
            stats.emissions = pulse.seq;
        }

        drop(frame_tx);
        frame_loop.stop();
        frame_loop.wait();

        if let Some(err) = frame_loop.error() {
            tracing::warn!(%err, frames_sent = stats.frames_sent, "stream failed");
            if !err.is_panic() {
                let sink = frame_loop.join();
                if let Err(close_err) = sink.close() {
                    tracing::warn!(%close_err, "failed to close sink after stream error");
                }
            }
            return Err(VideogenError::from(err));
        }

        if parent.is_cancelled() {
            tracing::info!(frames_sent = stats.frames_sent, "stream cancelled early");
        }
        tracing::debug!(?stats, "stream finished");
        Ok((stats, frame_loop.join()))
    }
}

/// Hand `frame` to the loop. Returns `false` when the loop has ended.
fn send_frame(tx: &Sender<Frame>, frame_loop: &FrameLoop<OutputSink>, frame: Frame) -> bool {
    crossbeam_channel::select! {
        send(tx, frame) -> res => res.is_ok(),
        recv(frame_loop.done()) -> _ => false,
    }
}

/// Wait for a pulse reporting that the `ordinal`th frame (or a later one) was written.
fn wait_written(
    frame_loop: &FrameLoop<OutputSink>,
    notifications: &Receiver<Emitted>,
    ordinal: u64,
) -> Option<Emitted> {
    loop {
        let pulse = frame_loop.wait_for_next_emission(notifications)?;
        if pulse.frame >= ordinal {
            return Some(pulse);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/stream_session.rs"]
mod tests;
