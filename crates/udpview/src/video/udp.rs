//! Network video streams decoded by an `ffmpeg` child process.
//!
//! `ffmpeg` is asked to decode its input and write raw RGBA frames to stdout, which
//! [`ffmpeg_sidecar`] parses back into individual frames. Anything `ffmpeg` can read works as a
//! URI (`udp://`, `rtp://`, `tcp://`, files), but this module is built around UDP streams: they
//! never end by themselves, and individual frames may go missing.
//!
//! An `ffmpeg` binary has to be available on `PATH`.

use ffmpeg_sidecar::{
    child::FfmpegChild,
    command::FfmpegCommand,
    event::{FfmpegEvent, LogLevel, OutputVideoFrame},
    iter::FfmpegIterator,
};

use crate::{
    frame::{Frame, Resolution},
    timer::Timer,
    video::VideoSource,
};

/// The pixel format requested from `ffmpeg`, matching [`Frame`]'s layout.
const PIX_FMT: &str = "rgba";

/// Appends the arguments that make `ffmpeg` write raw RGBA frames to stdout.
pub fn rgba_output(command: &mut FfmpegCommand) -> &mut FfmpegCommand {
    command.format("rawvideo").pix_fmt(PIX_FMT).output("-")
}

struct Decoder {
    child: FfmpegChild,
    events: FfmpegIterator,
    /// Set once `ffmpeg` has stopped producing events (ie. it exited).
    ended: bool,
}

/// A video stream received and decoded by `ffmpeg`.
///
/// Like a capture device, opening a [`UdpStream`] never fails: if `ffmpeg` cannot be started,
/// the error is logged and the stream reports itself closed. If `ffmpeg` starts but cannot open
/// the URI, it exits, and the stream closes after the first [`VideoSource::read`].
pub struct UdpStream {
    uri: String,
    decoder: Option<Decoder>,
    t_dequeue: Timer,
    t_copy: Timer,
}

impl UdpStream {
    /// Starts receiving the stream at `uri` (eg. `udp://localhost:5000`).
    pub fn open(uri: &str) -> Self {
        let mut command = FfmpegCommand::new();
        command.hide_banner().input(uri);
        rgba_output(&mut command);
        Self::spawn(uri, command)
    }

    /// Spawns a prepared `ffmpeg` command. `label` is only used for logging.
    ///
    /// The command must write raw RGBA frames to stdout; use [`rgba_output`] to add the required
    /// output arguments.
    pub fn spawn(label: &str, mut command: FfmpegCommand) -> Self {
        let decoder = match Self::spawn_decoder(&mut command) {
            Ok(decoder) => {
                log::info!("opened video stream {label}");
                Some(decoder)
            }
            Err(e) => {
                log::error!("failed to open video stream {label}: {e:#}");
                None
            }
        };

        Self {
            uri: label.to_string(),
            decoder,
            t_dequeue: Timer::new("dequeue"),
            t_copy: Timer::new("copy"),
        }
    }

    fn spawn_decoder(command: &mut FfmpegCommand) -> anyhow::Result<Decoder> {
        let mut child = command.spawn()?;
        let events = match child.iter() {
            Ok(events) => events,
            Err(e) => {
                child.kill().ok();
                child.wait().ok();
                return Err(e.into());
            }
        };
        Ok(Decoder {
            child,
            events,
            ended: false,
        })
    }

    /// Returns the URI (or label) this stream was opened with.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns profiling timers for frame reception and copying.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_dequeue, &self.t_copy].into_iter()
    }
}

/// What a single `ffmpeg` event means for the frame being read.
enum Step {
    Frame(OutputVideoFrame),
    /// Give up on this frame, but keep the stream open.
    Skip,
    Continue,
}

fn step(event: FfmpegEvent) -> Step {
    match event {
        FfmpegEvent::OutputFrame(frame) => Step::Frame(frame),
        FfmpegEvent::Error(e) => {
            log::debug!("ffmpeg error: {e}");
            Step::Skip
        }
        FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, msg) => {
            log::warn!("[ffmpeg] {msg}");
            Step::Continue
        }
        FfmpegEvent::Log(_, msg) => {
            log::trace!("[ffmpeg] {msg}");
            Step::Continue
        }
        _ => Step::Continue,
    }
}

/// Copies a decoded frame into `frame` if it has the expected layout. Otherwise `frame` is left
/// untouched and `false` is returned.
fn copy_output(output: &OutputVideoFrame, frame: &mut Frame) -> bool {
    let res = Resolution::new(output.width, output.height);
    if output.pix_fmt != PIX_FMT || output.data.len() != res.rgba8_len() {
        log::warn!(
            "dropping {} frame of {} bytes at {} (expected {PIX_FMT})",
            output.pix_fmt,
            output.data.len(),
            res,
        );
        return false;
    }
    frame.fill_rgba8(res, &output.data);
    true
}

impl VideoSource for UdpStream {
    fn is_open(&self) -> bool {
        self.decoder.as_ref().map_or(false, |dec| !dec.ended)
    }

    fn read(&mut self, frame: &mut Frame) {
        frame.clear();
        let Some(decoder) = self.decoder.as_mut().filter(|dec| !dec.ended) else {
            return;
        };

        let next = self.t_dequeue.time(|| {
            (&mut decoder.events)
                .map(step)
                .find(|step| !matches!(step, Step::Continue))
        });

        match next {
            Some(Step::Frame(output)) => {
                self.t_copy.time(|| copy_output(&output, frame));
            }
            Some(Step::Skip) | Some(Step::Continue) => {}
            None => {
                log::info!("video stream {} ended", self.uri);
                decoder.ended = true;
            }
        }
    }

    fn release(&mut self) {
        let Some(mut decoder) = self.decoder.take() else {
            return;
        };
        if let Err(e) = decoder.child.kill() {
            // `ffmpeg` has most likely exited already.
            log::trace!("failed to kill ffmpeg: {e}");
        }
        match decoder.child.wait() {
            Ok(status) => log::debug!("ffmpeg exited with {status}"),
            Err(e) => log::warn!("failed to wait for ffmpeg: {e}"),
        }
    }
}

impl Drop for UdpStream {
    fn drop(&mut self) {
        // Only streams nobody released are still holding a decoder here.
        if self.decoder.is_some() {
            self.release();
        }
    }
}
