use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use keytype_core::filter::WindowFilter;
use keytype_core::types::{ActiveWindow, WindowDescriptor, WindowHandle};

use crate::error::PlatformError;
use crate::traits::{ForegroundCallback, ForegroundHook, WindowSystem};

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Default)]
struct Slot {
    window: Option<ActiveWindow>,
    generation: u64,
}

/// The last window the user switched to. Written only by the tracker; read by
/// the shell and by the typing session's focus check.
#[derive(Debug, Default)]
pub struct ForegroundState {
    slot: Mutex<Slot>,
}

impl ForegroundState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current(&self) -> Option<ActiveWindow> {
        self.lock().window.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub(crate) fn record(&self, handle: WindowHandle, title: String) -> ActiveWindow {
        let mut slot = self.lock();
        slot.generation += 1;
        let active = ActiveWindow {
            handle,
            title,
            generation: slot.generation,
        };
        slot.window = Some(active.clone());
        active
    }
}

/// How foreground changes are currently being observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingMode {
    Stopped,
    EventHook,
    /// `fallback_reason` is set when an event hook was tried and failed; the
    /// shell should surface it as a warning.
    Polling { fallback_reason: Option<String> },
}

type ChangeListener = dyn Fn(&ActiveWindow) + Send + Sync;

struct Observer {
    state: Arc<ForegroundState>,
    filter: Arc<WindowFilter>,
    on_change: Box<ChangeListener>,
}

impl Observer {
    fn observe(&self, window: WindowDescriptor) {
        if !self.filter.accepts(&window.title, &window.process_name) {
            return;
        }
        let active = self
            .state
            .record(window.handle, window.title.trim().to_string());
        // Listener runs outside the state lock.
        (self.on_change)(&active);
    }
}

struct Poller {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Poller {
    fn spawn<W: WindowSystem + 'static>(
        system: Arc<W>,
        observer: Arc<Observer>,
        interval: Duration,
    ) -> Result<Self, PlatformError> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("keytype-foreground-poll".into())
            .spawn(move || {
                let mut last: Option<WindowHandle> = None;
                loop {
                    if let Some(window) = system.frontmost_window() {
                        // Edge-triggered: only report a window we did not report last time.
                        if last.as_ref() != Some(&window.handle) {
                            last = Some(window.handle.clone());
                            observer.observe(window);
                        }
                    }
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        _ => break,
                    }
                }
            })
            .map_err(|e| PlatformError::from_io("spawn foreground poller", e))?;

        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Dropping the sender wakes the thread immediately.
        self.stop_tx.take();
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

enum Running<G> {
    Hook(G),
    Polling(Poller),
}

/// Keeps [`ForegroundState`] current, preferring an OS event hook and falling
/// back to polling when the hook cannot be installed.
pub struct ForegroundTracker<P: WindowSystem + ForegroundHook + 'static> {
    platform: Arc<P>,
    state: Arc<ForegroundState>,
    filter: Arc<WindowFilter>,
    poll_interval: Duration,
    running: Option<Running<P::Guard>>,
    mode: TrackingMode,
}

impl<P: WindowSystem + ForegroundHook + 'static> ForegroundTracker<P> {
    pub fn new(platform: Arc<P>, filter: Arc<WindowFilter>) -> Self {
        Self {
            platform,
            state: Arc::new(ForegroundState::new()),
            filter,
            poll_interval: POLL_INTERVAL,
            running: None,
            mode: TrackingMode::Stopped,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> Arc<ForegroundState> {
        self.state.clone()
    }

    pub fn mode(&self) -> &TrackingMode {
        &self.mode
    }

    /// Starts tracking, restarting if already running. Only fails when neither
    /// the hook nor the polling thread could be set up.
    pub fn start<F>(&mut self, on_change: F) -> Result<TrackingMode, PlatformError>
    where
        F: Fn(&ActiveWindow) + Send + Sync + 'static,
    {
        self.stop();

        let observer = Arc::new(Observer {
            state: self.state.clone(),
            filter: self.filter.clone(),
            on_change: Box::new(on_change),
        });

        let hook_observer = observer.clone();
        let callback: ForegroundCallback = Arc::new(move |w: WindowDescriptor| hook_observer.observe(w));

        let fallback_reason = match self.platform.install_foreground_hook(callback) {
            Ok(guard) => {
                log::info!("foreground tracking via event hook");
                self.running = Some(Running::Hook(guard));
                self.mode = TrackingMode::EventHook;
                return Ok(self.mode.clone());
            }
            Err(PlatformError::Unsupported(what)) => {
                log::info!("{what} unavailable; polling every {:?}", self.poll_interval);
                None
            }
            Err(e) => {
                log::warn!("foreground hook failed, falling back to polling: {e}");
                Some(e.to_string())
            }
        };

        let poller = Poller::spawn(self.platform.clone(), observer, self.poll_interval)?;
        self.running = Some(Running::Polling(poller));
        self.mode = TrackingMode::Polling { fallback_reason };
        Ok(self.mode.clone())
    }

    /// Uninstalls the hook or stops the polling thread. Safe to call repeatedly.
    pub fn stop(&mut self) {
        match self.running.take() {
            Some(Running::Hook(guard)) => drop(guard),
            Some(Running::Polling(poller)) => drop(poller),
            None => {}
        }
        self.mode = TrackingMode::Stopped;
    }
}

impl<P: WindowSystem + ForegroundHook + 'static> Drop for ForegroundTracker<P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_increase_per_record() {
        let state = ForegroundState::new();
        assert_eq!(state.current(), None);
        assert_eq!(state.generation(), 0);

        let a = state.record(WindowHandle::Hwnd(1), "one".into());
        let b = state.record(WindowHandle::Hwnd(1), "one".into());
        assert_eq!(a.generation, 1);
        assert_eq!(b.generation, 2);
        assert_eq!(state.current().map(|w| w.title), Some("one".into()));
    }
}
