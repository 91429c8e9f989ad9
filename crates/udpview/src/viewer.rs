//! The frame display loop.
//!
//! [`run`] is a plain blocking loop: while the [`VideoSource`] is open, read a frame into a
//! single reused [`Frame`], skip it if it's empty, hand it to the [`Display`], and poll the
//! display for the quit key. The source is released exactly once when the loop stops, whatever
//! the reason.

use std::time::Duration;

use crate::{
    frame::Frame,
    release::Release,
    timer::{FpsCounter, Timer},
    video::VideoSource,
};

/// The stream the `udpview` binary displays.
pub const STREAM_URI: &str = "udp://localhost:5000";

/// Name (and title) of the window frames are shown in.
pub const WINDOW_NAME: &str = "Stream";

/// Pressing this key in the window stops the loop.
pub const QUIT_KEY: char = 'q';

/// How long to wait for a keypress after showing a frame.
pub const KEY_WAIT: Duration = Duration::from_millis(1);

/// A surface that frames can be shown on, and that reports keypresses.
pub trait Display {
    /// Shows `frame` in the window called `name`, opening it if necessary.
    ///
    /// `frame` is never empty.
    fn show(&mut self, name: &str, frame: &Frame);

    /// Waits up to `timeout` for a keypress and returns the typed character, if any.
    fn wait_key(&mut self, timeout: Duration) -> Option<char>;
}

impl<D: Display + ?Sized> Display for &mut D {
    fn show(&mut self, name: &str, frame: &Frame) {
        (**self).show(name, frame)
    }

    fn wait_key(&mut self, timeout: Duration) -> Option<char> {
        (**self).wait_key(timeout)
    }
}

/// Options for [`run`].
///
/// The defaults are the fixed values the `udpview` binary uses ([`WINDOW_NAME`], [`QUIT_KEY`],
/// [`KEY_WAIT`], no iteration limit).
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    window_name: String,
    quit_key: char,
    key_wait: Duration,
    max_iterations: Option<u64>,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            window_name: WINDOW_NAME.to_string(),
            quit_key: QUIT_KEY,
            key_wait: KEY_WAIT,
            max_iterations: None,
        }
    }
}

impl ViewerOptions {
    /// Sets the name of the window frames are shown in.
    #[inline]
    pub fn window_name(self, name: impl Into<String>) -> Self {
        Self {
            window_name: name.into(),
            ..self
        }
    }

    /// Sets the key that stops the loop.
    #[inline]
    pub fn quit_key(mut self, key: char) -> Self {
        self.quit_key = key;
        self
    }

    /// Sets how long to wait for a keypress after each shown frame.
    #[inline]
    pub fn key_wait(mut self, wait: Duration) -> Self {
        self.key_wait = wait;
        self
    }

    /// Stops the loop after `n` reads, even if the source is still open.
    ///
    /// A source that never closes otherwise keeps the loop running until the quit key is pressed.
    #[inline]
    pub fn max_iterations(mut self, n: u64) -> Self {
        self.max_iterations = Some(n);
        self
    }
}

/// Why [`run`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The source reported itself closed.
    StreamClosed,
    /// The quit key was pressed.
    QuitKey,
    /// [`ViewerOptions::max_iterations`] reads were performed.
    IterationLimit,
}

/// Summary returned by [`run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopExit {
    pub reason: ExitReason,
    /// Number of frames passed to [`Display::show`].
    pub shown: u64,
    /// Number of reads that produced an empty frame.
    pub skipped: u64,
}

/// Shows frames from `source` on `display` until the source closes or the quit key is pressed.
///
/// `source` is released exactly once before this function returns (or unwinds).
pub fn run<S, D>(source: S, display: &mut D, options: &ViewerOptions) -> LoopExit
where
    S: VideoSource,
    D: Display + ?Sized,
{
    let mut source = Release::new(source);
    let mut frame = Frame::new();

    let mut fps = FpsCounter::new(options.window_name.as_str());
    let t_read = Timer::new("read");
    let t_show = Timer::new("show");

    let mut iterations = 0u64;
    let mut shown = 0;
    let mut skipped = 0;

    let reason = loop {
        if !source.is_open() {
            break ExitReason::StreamClosed;
        }
        if options.max_iterations.map_or(false, |max| iterations >= max) {
            break ExitReason::IterationLimit;
        }
        iterations += 1;

        t_read.time(|| source.read(&mut frame));
        if frame.is_empty() {
            log::trace!("iteration {iterations}: no frame");
            skipped += 1;
            continue;
        }

        log::trace!("iteration {iterations}: {} frame", frame.resolution());
        t_show.time(|| display.show(&options.window_name, &frame));
        shown += 1;
        fps.tick_with([&t_read, &t_show]);

        if display.wait_key(options.key_wait) == Some(options.quit_key) {
            break ExitReason::QuitKey;
        }
    };

    log::info!(
        "stopped after {iterations} iterations ({reason:?}): \
         {shown} frames shown, {skipped} skipped"
    );
    drop(source);

    LoopExit {
        reason,
        shown,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::Cell,
        collections::VecDeque,
        panic::{catch_unwind, AssertUnwindSafe},
        rc::Rc,
    };

    use super::*;
    use crate::frame::Resolution;

    /// Plays back a list of reads; `None` is an empty read, `Some(n)` a frame filled with `n`.
    struct Script {
        reads: VecDeque<Option<u8>>,
        /// Keep reporting "open" (with empty reads) after the script runs out.
        endless: bool,
        read_count: u64,
        releases: Rc<Cell<u32>>,
    }

    impl Script {
        fn new(reads: impl IntoIterator<Item = Option<u8>>) -> Self {
            Self {
                reads: reads.into_iter().collect(),
                endless: false,
                read_count: 0,
                releases: Rc::new(Cell::new(0)),
            }
        }

        fn endless() -> Self {
            Self {
                endless: true,
                ..Self::new([])
            }
        }

        fn releases(&self) -> Rc<Cell<u32>> {
            self.releases.clone()
        }
    }

    impl VideoSource for Script {
        fn is_open(&self) -> bool {
            assert_eq!(self.releases.get(), 0, "source used after release");
            self.endless || !self.reads.is_empty()
        }

        fn read(&mut self, frame: &mut Frame) {
            assert_eq!(self.releases.get(), 0, "source used after release");
            self.read_count += 1;
            match self.reads.pop_front().flatten() {
                Some(n) => *frame = Frame::filled(Resolution::new(2, 2), [n, 0, 0, 255]),
                None => frame.clear(),
            }
        }

        fn release(&mut self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    #[derive(Default)]
    struct Recorder {
        shown: Vec<u8>,
        names: Vec<String>,
        /// Key returned by the n-th `wait_key` call; missing entries mean no key.
        keys: VecDeque<Option<char>>,
        key_polls: u32,
        last_wait: Option<Duration>,
    }

    impl Recorder {
        fn with_keys(keys: impl IntoIterator<Item = Option<char>>) -> Self {
            Self {
                keys: keys.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl Display for Recorder {
        fn show(&mut self, name: &str, frame: &Frame) {
            assert!(!frame.is_empty(), "empty frame passed to display");
            self.shown.push(frame.data()[0]);
            self.names.push(name.to_string());
        }

        fn wait_key(&mut self, timeout: Duration) -> Option<char> {
            self.key_polls += 1;
            self.last_wait = Some(timeout);
            self.keys.pop_front().flatten()
        }
    }

    #[test]
    fn shows_only_nonempty_frames_in_order() {
        let source = Script::new([None, Some(1), None, None, Some(2), Some(3), None]);
        let releases = source.releases();
        let mut display = Recorder::default();

        let exit = run(source, &mut display, &ViewerOptions::default());

        assert_eq!(exit.reason, ExitReason::StreamClosed);
        assert_eq!(exit.shown, 3);
        assert_eq!(exit.skipped, 4);
        assert_eq!(display.shown, [1, 2, 3]);
        assert!(display.names.iter().all(|name| name == WINDOW_NAME));
        assert_eq!(display.last_wait, Some(KEY_WAIT));
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn random_read_sequences() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..200 {
            let len = rng.usize(0..64);
            let reads = (0..len)
                .map(|_| rng.bool().then(|| rng.u8(..)))
                .collect::<Vec<_>>();
            let expected = reads.iter().flatten().copied().collect::<Vec<_>>();

            let source = Script::new(reads.iter().copied());
            let releases = source.releases();
            let mut display = Recorder::default();
            let exit = run(source, &mut display, &ViewerOptions::default());

            assert_eq!(display.shown, expected, "reads: {reads:?}");
            assert_eq!(exit.shown as usize, expected.len());
            assert_eq!(exit.skipped as usize, len - expected.len());
            assert_eq!(exit.reason, ExitReason::StreamClosed);
            assert_eq!(releases.get(), 1);
        }
    }

    #[test]
    fn closed_stream_shows_nothing() {
        let source = Script::new([]);
        let releases = source.releases();
        let mut display = Recorder::default();

        let exit = run(source, &mut display, &ViewerOptions::default());

        assert_eq!(
            exit,
            LoopExit {
                reason: ExitReason::StreamClosed,
                shown: 0,
                skipped: 0,
            }
        );
        assert!(display.shown.is_empty());
        assert_eq!(display.key_polls, 0);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn endless_stream_runs_until_limit() {
        let mut source = Script::endless();
        let releases = source.releases();
        let mut display = Recorder::default();

        let exit = run(
            &mut source,
            &mut display,
            &ViewerOptions::default().max_iterations(10_000),
        );

        assert_eq!(exit.reason, ExitReason::IterationLimit);
        assert_eq!(exit.skipped, 10_000);
        assert_eq!(source.read_count, 10_000);
        assert!(display.shown.is_empty());
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn quit_key_stops_after_render() {
        let source = Script::new([Some(1), None, Some(2), Some(3), Some(4), Some(5)]);
        let releases = source.releases();
        // No key after frame 1, an unrelated key after frame 2, quit after frame 3.
        let mut display = Recorder::with_keys([None, Some('x'), Some(QUIT_KEY)]);

        let exit = run(source, &mut display, &ViewerOptions::default());

        assert_eq!(exit.reason, ExitReason::QuitKey);
        assert_eq!(display.shown, [1, 2, 3]);
        assert_eq!(display.key_polls, 3);
        assert_eq!(exit.skipped, 1);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn quit_on_first_frame() {
        let mut source = Script::endless();
        source.reads.push_back(Some(7));
        let releases = source.releases();
        let mut display = Recorder::with_keys([Some(QUIT_KEY)]);

        let exit = run(source, &mut display, &ViewerOptions::default());

        assert_eq!(exit.reason, ExitReason::QuitKey);
        assert_eq!(display.shown, [7]);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn empty_frames_do_not_poll_keys() {
        let source = Script::new([None, None, Some(1), None]);
        // A quit key would be seen if the loop polled after an empty read.
        let mut display = Recorder::with_keys([None, Some(QUIT_KEY)]);

        let exit = run(source, &mut display, &ViewerOptions::default());

        assert_eq!(exit.reason, ExitReason::StreamClosed);
        assert_eq!(display.key_polls, 1);
    }

    #[test]
    fn custom_options() {
        let source = Script::new([Some(1), Some(2)]);
        let mut display = Recorder::with_keys([Some('q'), Some('\u{1b}')]);
        let options = ViewerOptions::default()
            .window_name("Camera")
            .quit_key('\u{1b}')
            .key_wait(Duration::from_millis(30));

        let exit = run(source, &mut display, &options);

        assert_eq!(exit.reason, ExitReason::QuitKey);
        assert_eq!(display.shown, [1, 2]);
        assert_eq!(display.names, ["Camera", "Camera"]);
        assert_eq!(display.last_wait, Some(Duration::from_millis(30)));
    }

    #[test]
    fn releases_once_when_display_panics() {
        struct Broken;

        impl Display for Broken {
            fn show(&mut self, _: &str, _: &Frame) {
                panic!("window closed");
            }

            fn wait_key(&mut self, _: Duration) -> Option<char> {
                None
            }
        }

        let source = Script::new([None, Some(1), Some(2)]);
        let releases = source.releases();

        let result = catch_unwind(AssertUnwindSafe(|| {
            run(source, &mut Broken, &ViewerOptions::default())
        }));

        assert!(result.is_err());
        assert_eq!(releases.get(), 1);
    }
}
