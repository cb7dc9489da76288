use std::sync::Arc;
use std::time::Duration;

use keytype_core::filter::WindowFilter;
use keytype_core::speed::SpeedConfig;
use keytype_core::types::{ActiveWindow, WindowDescriptor};
use tokio::sync::mpsc::UnboundedSender;

use crate::controller::{ControllerError, SessionHandle, TypeRequest, TypingController};
use crate::directory::enumerate_windows;
use crate::error::PlatformError;
use crate::session::TypingStatus;
use crate::synth::AltGrStyle;
use crate::tracker::{ForegroundState, ForegroundTracker, TrackingMode};
use crate::traits::Platform;

/// Owns everything the shell talks to: the platform backend, the foreground
/// tracker and the typing controller. Dropping it stops tracking.
pub struct KeytypeEngine<P: Platform> {
    platform: Arc<P>,
    filter: Arc<WindowFilter>,
    tracker: ForegroundTracker<P>,
    controller: TypingController<P>,
}

impl<P: Platform> KeytypeEngine<P> {
    pub fn new(platform: Arc<P>, filter: WindowFilter, status: UnboundedSender<TypingStatus>) -> Self {
        let filter = Arc::new(filter);
        let tracker = ForegroundTracker::new(platform.clone(), filter.clone());
        let controller = TypingController::new(platform.clone(), tracker.state(), status);
        Self {
            platform,
            filter,
            tracker,
            controller,
        }
    }

    pub fn with_altgr_style(mut self, style: AltGrStyle) -> Self {
        self.controller = self.controller.with_altgr_style(style);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.tracker = self.tracker.with_poll_interval(interval);
        self
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    pub fn enumerate_windows(&self) -> Vec<WindowDescriptor> {
        enumerate_windows(&*self.platform, &self.filter)
    }

    pub fn start_foreground_tracking<F>(&mut self, on_change: F) -> Result<TrackingMode, PlatformError>
    where
        F: Fn(&ActiveWindow) + Send + Sync + 'static,
    {
        self.tracker.start(on_change)
    }

    pub fn stop_foreground_tracking(&mut self) {
        self.tracker.stop();
    }

    pub fn tracking_mode(&self) -> &TrackingMode {
        self.tracker.mode()
    }

    pub fn foreground(&self) -> Arc<ForegroundState> {
        self.tracker.state()
    }

    pub fn last_active_window(&self) -> Option<ActiveWindow> {
        self.tracker.state().current()
    }

    pub fn resolve_layout(&self, name: &str) -> P::Layout {
        self.platform.resolve_layout(name)
    }

    pub fn start_typing_session(
        &self,
        text: &str,
        target: Option<WindowDescriptor>,
        layout_name: &str,
        speed: SpeedConfig,
        abort_on_focus_change: bool,
    ) -> Result<SessionHandle, ControllerError> {
        self.controller.start_session(TypeRequest {
            text: text.to_string(),
            target,
            layout_name: layout_name.to_string(),
            speed,
            abort_on_focus_change,
        })
    }

    pub fn request_stop(&self, handle: &SessionHandle) {
        self.controller.request_stop(handle);
    }

    pub fn stop_active_session(&self) -> bool {
        self.controller.stop_active()
    }

    pub fn is_typing(&self) -> bool {
        self.controller.is_busy()
    }
}
