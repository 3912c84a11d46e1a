/// Terminal session: the shared screen state, the PTY, and the reader
/// thread that feeds child output through the parser.
///
/// One mutex guards the whole screen (grid, history, cursor, modes, parser
/// state). The reader holds it only while feeding a bounded chunk, so the
/// renderer can take a consistent snapshot between chunks. Writes to the PTY
/// never take the screen lock.

use std::io;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::config::Config;
use crate::core::{HostEvent, Screen, DEFAULT_COLS, DEFAULT_ROWS};
use crate::pty::PtyManager;

/// Poll timeout keeping the reader responsive for paste drain and shutdown.
const POLL_INTERVAL_MS: u16 = 100;
/// Read chunk; one lock acquisition per chunk.
const READ_CHUNK: usize = 1024;

const EXIT_NOTICE: &str = "[program exited, restarting]";

/// Pixel size of one terminal cell, supplied by the renderer.
#[derive(Debug, Clone, Copy)]
pub struct CellMetrics {
    pub width: u32,
    pub height: u32,
}

/// Callbacks into the embedding host. All default to no-ops so a host only
/// implements the integrations it has.
pub trait HostHooks: Send + Sync {
    /// OSC 52: store the base64 payload on the host clipboard.
    fn copy(&self, payload: &str) {
        let _ = payload;
    }

    /// OSC 52 query: asynchronously ask the host for paste data.
    fn request_paste(&self) {}

    /// Non-blocking poll for pending paste bytes; empty when none.
    fn get_paste(&self) -> String {
        String::new()
    }

    /// DECCOLM changed the display width to `pixel_w` pixels.
    fn resize_width(&self, pixel_w: u32) {
        let _ = pixel_w;
    }
}

/// A host with no clipboard or window integration.
pub struct NullHooks;

impl HostHooks for NullHooks {}

#[derive(Clone)]
pub struct Term {
    screen: Arc<Mutex<Screen>>,
    pty: Arc<Mutex<Option<Arc<PtyManager>>>>,
    hooks: Arc<dyn HostHooks>,
    metrics: Arc<Mutex<CellMetrics>>,
    scroll_offset: Arc<Mutex<f64>>,
    config: Arc<Config>,
}

impl Term {
    pub fn new(config: Config, hooks: Arc<dyn HostHooks>) -> Self {
        let metrics = CellMetrics {
            width: config.cell.width,
            height: config.cell.height,
        };
        Self {
            screen: Arc::new(Mutex::new(Screen::new(DEFAULT_ROWS, DEFAULT_COLS))),
            pty: Arc::new(Mutex::new(None)),
            hooks,
            metrics: Arc::new(Mutex::new(metrics)),
            scroll_offset: Arc::new(Mutex::new(0.0)),
            config: Arc::new(config),
        }
    }

    /// Spawn the child shell and the reader thread. Idempotent while a child
    /// is attached.
    pub fn start(&self) {
        let mut slot = self.pty.lock();
        if slot.is_some() {
            return;
        }
        self.screen.lock().resize(DEFAULT_ROWS, DEFAULT_COLS);
        match self.spawn_shell() {
            Ok(pty) => {
                *slot = Some(pty.clone());
                drop(slot);
                self.spawn_worker(pty);
            }
            Err(e) => log::error!("failed to spawn shell: {e}"),
        }
    }

    fn spawn_shell(&self) -> io::Result<Arc<PtyManager>> {
        let (rows, cols) = {
            let screen = self.screen.lock();
            (screen.rows(), screen.cols())
        };
        let pty = PtyManager::spawn(&self.config.shell, rows as u16, cols as u16)?;
        Ok(Arc::new(pty))
    }

    fn spawn_worker(&self, pty: Arc<PtyManager>) {
        let term = self.clone();
        let spawned = thread::Builder::new()
            .name("terminal worker".into())
            .spawn(move || term.worker(pty));
        if let Err(e) = spawned {
            log::error!("failed to spawn terminal worker: {e}");
        }
    }

    /// Reader loop. Exits when the child does; the restart path hands a new
    /// fd to a new worker.
    fn worker(&self, pty: Arc<PtyManager>) {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match pty.poll_readable(POLL_INTERVAL_MS) {
                Ok(true) => match pty.read(&mut buf) {
                    Ok(0) => {}
                    Ok(n) => {
                        log::debug!("got: {}", printable(&buf[..n]));
                        self.ingest(&pty, &buf[..n]);
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                    Err(e) if e.raw_os_error() == Some(nix::libc::EIO) => {
                        // child exited
                        log::info!("child {} exited, restarting", pty.child_pid());
                        self.restart();
                        return;
                    }
                    Err(e) => log::warn!("pty read failed: {e}"),
                },
                Ok(false) => {}
                Err(e) => log::warn!("pty poll failed: {e}"),
            }

            let paste = self.hooks.get_paste();
            if !paste.is_empty() {
                let mut data = Vec::with_capacity(paste.len() + 9);
                data.extend_from_slice(b"\x1b]52;c;");
                data.extend_from_slice(paste.as_bytes());
                data.extend_from_slice(b"\x1b\\");
                if let Err(e) = pty.write_all(&data) {
                    log::warn!("paste write failed: {e}");
                }
            }
        }
    }

    /// Feed a chunk under the screen lock, then flush replies and host
    /// events outside it.
    fn ingest(&self, pty: &PtyManager, bytes: &[u8]) {
        let (reply, events) = {
            let mut screen = self.screen.lock();
            screen.feed(bytes);
            (screen.take_reply(), screen.take_events())
        };
        if !reply.is_empty() {
            log::debug!("send: {}", printable(&reply));
            if let Err(e) = pty.write_all(&reply) {
                log::warn!("reply write failed: {e}");
            }
        }
        for event in events {
            match event {
                HostEvent::Copy(payload) => self.hooks.copy(&payload),
                HostEvent::RequestPaste => self.hooks.request_paste(),
                HostEvent::DisplayWidth(cols) => {
                    let rows = self.screen.lock().rows();
                    pty.set_winsize(rows as u16, cols as u16);
                    let metrics = *self.metrics.lock();
                    self.hooks.resize_width(cols as u32 * metrics.width);
                }
            }
        }
    }

    /// Child exited: surface the notice, drop the dead fd and relaunch.
    fn restart(&self) {
        self.screen.lock().write_line(EXIT_NOTICE);
        let mut slot = self.pty.lock();
        *slot = None;
        match self.spawn_shell() {
            Ok(pty) => {
                *slot = Some(pty.clone());
                drop(slot);
                self.spawn_worker(pty);
            }
            Err(e) => log::error!("failed to respawn shell: {e}"),
        }
    }

    /// Write host input to the PTY; the scrollback view snaps to the bottom.
    pub fn send_data(&self, data: &[u8]) {
        *self.scroll_offset.lock() = 0.0;
        let pty = self.pty.lock().clone();
        let Some(pty) = pty else { return };
        log::debug!("send: {}", printable(data));
        if let Err(e) = pty.write_all(data) {
            log::warn!("pty write failed: {e}");
        }
    }

    /// Recompute the grid shape from pixel dimensions and resize.
    pub fn resize(&self, pixel_w: u32, pixel_h: u32) {
        let metrics = *self.metrics.lock();
        let rows = (pixel_h / metrics.height).max(1) as usize;
        let cols = (pixel_w / metrics.width).max(1) as usize;
        self.screen.lock().resize(rows, cols);
        if let Some(pty) = self.pty.lock().clone() {
            pty.set_winsize(rows as u16, cols as u16);
        }
    }

    /// Adjust the viewport offset into history (natural direction); the
    /// renderer clamps the top end against what history actually holds.
    pub fn scroll_by(&self, delta: f64) {
        let mut offset = self.scroll_offset.lock();
        *offset = (*offset - delta).max(0.0);
    }

    pub fn scroll_offset(&self) -> f64 {
        *self.scroll_offset.lock()
    }

    pub fn set_cell_metrics(&self, metrics: CellMetrics) {
        *self.metrics.lock() = metrics;
    }

    /// Run `f` over the locked screen; renderers take their snapshot here.
    pub fn with_screen<R>(&self, f: impl FnOnce(&Screen) -> R) -> R {
        f(&self.screen.lock())
    }

    /// Hand off to the renderer: run the host-supplied render loop on its
    /// own thread with a clone of this handle. What it draws is opaque to
    /// the core; it snapshots through `with_screen`.
    pub fn start_render<F>(&self, render_loop: F)
    where
        F: FnOnce(Term) + Send + 'static,
    {
        let term = self.clone();
        let spawned = thread::Builder::new()
            .name("render worker".into())
            .spawn(move || render_loop(term));
        if let Err(e) = spawned {
            log::error!("failed to spawn render worker: {e}");
        }
    }
}

/// Hex-escape control bytes for traffic logs.
fn printable(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &b in data {
        if (32..127).contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\x{b:02x}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_by_is_inverted_and_clamped() {
        let term = Term::new(Config::default(), Arc::new(NullHooks));
        term.scroll_by(-30.0);
        assert_eq!(term.scroll_offset(), 30.0);
        term.scroll_by(100.0);
        assert_eq!(term.scroll_offset(), 0.0);
    }

    #[test]
    fn test_send_data_resets_viewport() {
        let term = Term::new(Config::default(), Arc::new(NullHooks));
        term.scroll_by(-50.0);
        // no child attached; only the viewport reset happens
        term.send_data(b"ls\r");
        assert_eq!(term.scroll_offset(), 0.0);
    }

    #[test]
    fn test_with_screen_snapshot() {
        let term = Term::new(Config::default(), Arc::new(NullHooks));
        let (rows, cols) = term.with_screen(|s| (s.rows(), s.cols()));
        assert_eq!((rows, cols), (DEFAULT_ROWS, DEFAULT_COLS));
    }

    #[test]
    fn test_start_render_hands_off_a_handle() {
        let term = Term::new(Config::default(), Arc::new(NullHooks));
        let (tx, rx) = std::sync::mpsc::channel();
        term.start_render(move |term| {
            let rows = term.with_screen(|s| s.rows());
            tx.send(rows).unwrap();
        });
        assert_eq!(rx.recv().unwrap(), DEFAULT_ROWS);
    }

    #[test]
    fn test_printable_escapes_controls() {
        assert_eq!(printable(b"ab\x1b[0m\n"), "ab\\x1b[0m\\x0a");
    }
}
