//! A minimal frame viewer GUI.
//!
//! [`show_image`] opens one window per name and keeps showing the most recent frame sent to it.
//! [`wait_key`] returns characters typed into any of those windows.
//!
//! Windowing has to happen on the main thread, so the GUI only works in programs started through
//! `#[udpview::main]`, which runs the program on a second thread.

mod gpu;
mod renderer;

use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    process,
    rc::Rc,
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Mutex, MutexGuard, OnceLock, PoisonError,
    },
    time::Duration,
};

use winit::{
    event::{Event, WindowEvent},
    event_loop::{
        ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget,
    },
    window::WindowId,
};

use crate::{
    frame::{Frame, Resolution},
    termination::Termination,
    viewer::Display,
};

use self::{
    gpu::Gpu,
    renderer::{Renderer, Window},
};

struct Gui {
    gpu: Rc<Gpu>,
    windows: HashMap<String, Renderer>,
    win_id_to_key: HashMap<WindowId, String>,
    keys: Sender<char>,
}

impl Gui {
    fn new(keys: Sender<char>) -> anyhow::Result<Self> {
        Ok(Self {
            gpu: Rc::new(pollster::block_on(Gpu::open())?),
            windows: HashMap::new(),
            win_id_to_key: HashMap::new(),
            keys,
        })
    }

    fn get_renderer_mut(&mut self, win: WindowId) -> Option<&mut Renderer> {
        let key = self.win_id_to_key.get(&win)?;
        self.windows.get_mut(key)
    }

    fn show(
        &mut self,
        target: &EventLoopWindowTarget<Msg>,
        key: String,
        res: Resolution,
        data: &[u8],
    ) {
        if !self.windows.contains_key(&key) {
            log::debug!("creating window '{key}' at {res}");
            let renderer = match Window::open(target, &key, res)
                .and_then(|win| Renderer::new(win, self.gpu.clone()))
            {
                Ok(renderer) => renderer,
                Err(e) => {
                    log::error!("failed to open window '{key}': {e:#}");
                    process::exit(1);
                }
            };
            self.win_id_to_key.insert(renderer.window().id(), key.clone());
            self.windows.insert(key.clone(), renderer);
        }

        if let Some(renderer) = self.windows.get_mut(&key) {
            renderer.update_texture(res, data);
            renderer.window().request_redraw();
        }
    }

    fn run(mut self, event_loop: EventLoop<Msg>) -> ! {
        event_loop.run(move |event, target, flow| {
            *flow = ControlFlow::Wait;
            match event {
                Event::UserEvent(Msg::Image { key, res, data }) => {
                    self.show(target, key, res, &data);
                }
                Event::WindowEvent {
                    event: WindowEvent::ReceivedCharacter(ch),
                    ..
                } => {
                    log::trace!("key pressed: {ch:?}");
                    // Nobody is polling for keys anymore if this fails.
                    self.keys.send(ch).ok();
                }
                Event::WindowEvent {
                    window_id,
                    event: WindowEvent::CloseRequested,
                } => {
                    if let Some(key) = self.win_id_to_key.get(&window_id) {
                        log::info!("ignoring close request for window '{key}'");
                    }
                }
                Event::RedrawRequested(window) => {
                    if let Some(renderer) = self.get_renderer_mut(window) {
                        renderer.redraw();
                    }
                }
                _ => {}
            }
        });
    }
}

#[derive(Debug)]
enum Msg {
    Image {
        key: String,
        res: Resolution,
        data: Vec<u8>,
    },
}

/// The program thread's end of the GUI.
struct Connection {
    proxy: Mutex<EventLoopProxy<Msg>>,
    keys: Mutex<Receiver<char>>,
}

static CONNECTION: OnceLock<Connection> = OnceLock::new();

fn connection() -> &'static Connection {
    CONNECTION
        .get()
        .expect("GUI not initialized (is `main` annotated with `#[udpview::main]`?)")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn send(msg: Msg) {
    // TODO: frames queue up without limit if the GUI thread can't keep up
    if lock(&connection().proxy).send_event(msg).is_err() {
        log::warn!("GUI event loop has exited, dropping frame");
    }
}

/// Runs `cb` on a new thread and the GUI event loop on the calling thread.
///
/// Exits the process once `cb` returns: with code 0 if [`Termination::is_success`], 1 otherwise,
/// and 101 if it panicked.
///
/// Called by the code generated by `#[udpview::main]`.
pub fn run<F, R>(cb: F) -> !
where
    F: FnOnce() -> R + Send + 'static,
    R: Termination + Send,
{
    let event_loop = EventLoopBuilder::with_user_event().build();
    let (key_tx, key_rx) = mpsc::channel();
    let connection = Connection {
        proxy: Mutex::new(event_loop.create_proxy()),
        keys: Mutex::new(key_rx),
    };
    if CONNECTION.set(connection).is_err() {
        panic!("GUI already initialized");
    }

    let gui = match Gui::new(key_tx) {
        Ok(gui) => gui,
        Err(e) => {
            log::error!("failed to initialize GUI: {e:#}");
            process::exit(1);
        }
    };

    // Library is now initialized; spawn another thread to run the application code.
    std::thread::spawn(move || {
        let result = catch_unwind(AssertUnwindSafe(cb));
        match result {
            Ok(r) => {
                if r.is_success() {
                    process::exit(0);
                } else {
                    r.report(); // may print the error message
                    process::exit(1);
                }
            }
            Err(_payload) => {
                // Panic handler has printed the panic message and backtrace already, exit with 101
                // to mimick libstd behavior.
                process::exit(101);
            }
        }
    });

    gui.run(event_loop);
}

/// Displays a frame in the window called `key`, opening the window on first use.
///
/// # Panics
///
/// Panics if `frame` is empty, or if the GUI was not started with `#[udpview::main]`.
pub fn show_image(key: impl Into<String>, frame: &Frame) {
    assert!(!frame.is_empty(), "cannot show an empty frame");
    send(Msg::Image {
        key: key.into(),
        res: frame.resolution(),
        data: frame.data().to_vec(),
    });
}

/// Waits up to `timeout` for a key to be pressed in any window and returns its character.
///
/// Keys pressed while nobody was waiting are queued and returned by later calls, oldest first.
pub fn wait_key(timeout: Duration) -> Option<char> {
    match lock(&connection().keys).recv_timeout(timeout) {
        Ok(ch) => Some(ch),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => {
            log::trace!("GUI key channel closed");
            None
        }
    }
}

/// A [`Display`] showing frames in GUI windows via [`show_image`] and [`wait_key`].
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowDisplay;

impl Display for WindowDisplay {
    fn show(&mut self, name: &str, frame: &Frame) {
        show_image(name, frame);
    }

    fn wait_key(&mut self, timeout: Duration) -> Option<char> {
        wait_key(timeout)
    }
}
