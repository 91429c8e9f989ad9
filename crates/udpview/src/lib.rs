//! Displays a live video stream received over UDP.
//!
//! Decoding is performed by an `ffmpeg` child process (see [`video::udp`]), display by a small
//! `wgpu` renderer (see [`gui`]). The part in between is the [`viewer`] loop: read a frame, skip
//! it if it's empty, show it, poll for the quit key.
//!
//! Programs using the [`gui`] need to be started with the [`main`] attribute, which moves the
//! annotated function to a background thread and runs the windowing event loop on the main
//! thread:
//!
//! ```no_run
//! use udpview::{gui::WindowDisplay, video::udp::UdpStream, viewer::{self, ViewerOptions}};
//!
//! #[udpview::main]
//! fn main() {
//!     let stream = UdpStream::open("udp://localhost:5000");
//!     viewer::run(stream, &mut WindowDisplay, &ViewerOptions::default());
//! }
//! ```
//!
//! # Environment Variables
//!
//! * `RUST_LOG`: overrides the log filter set up by [`init_logger!`], using the usual
//!   [`env_logger`] syntax.

use log::LevelFilter;

pub mod frame;
pub mod gui;
pub mod release;
pub mod termination;
pub mod timer;
pub mod video;
pub mod viewer;

pub use udpview_macros::main;

#[doc(hidden)]
pub use gui::run;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .filter(Some("naga"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and `udpview` will log at *debug* level.
///
/// `wgpu` and `naga` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
