use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use keytype_core::speed::SpeedConfig;
use keytype_core::types::WindowDescriptor;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::session::{
    SessionResult, SessionStage, StopSignal, TypingSession, TypingStatus, run_session,
};
use crate::synth::AltGrStyle;
use crate::tracker::ForegroundState;
use crate::traits::Platform;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("a typing session is already running")]
    Busy,

    #[error("nothing to type")]
    EmptyText,

    #[error("no target window selected and no last active window known")]
    NoTarget,
}

/// A typing command as the shell issues it.
#[derive(Debug, Clone)]
pub struct TypeRequest {
    pub text: String,
    /// `None` means the last active window recorded by the tracker.
    pub target: Option<WindowDescriptor>,
    pub layout_name: String,
    pub speed: SpeedConfig,
    pub abort_on_focus_change: bool,
}

struct ActiveSession {
    id: u64,
    stop: Arc<StopSignal>,
}

type ActiveSlot = Arc<Mutex<Option<ActiveSession>>>;

fn lock_slot(slot: &Mutex<Option<ActiveSession>>) -> MutexGuard<'_, Option<ActiveSession>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

// Frees the controller for the next session when the task ends, panics
// included, and tells the shell it is ready again.
struct ReleaseOnDrop {
    slot: ActiveSlot,
    id: u64,
    status: UnboundedSender<TypingStatus>,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        let released = {
            let mut slot = lock_slot(&self.slot);
            let ours = slot.as_ref().is_some_and(|s| s.id == self.id);
            if ours {
                *slot = None;
            }
            ours
        };
        if released {
            let _ = self.status.send(TypingStatus::Ready);
        }
    }
}

/// Handle to one spawned session.
pub struct SessionHandle {
    id: u64,
    stop: Arc<StopSignal>,
    task: JoinHandle<SessionResult>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the terminal result.
    pub async fn wait(self) -> SessionResult {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                log::error!("typing task ended abnormally: {e}");
                SessionResult {
                    stage: SessionStage::Failed,
                    stage_label: Some("failed".into()),
                    chars_sent: 0,
                    target_title: String::new(),
                    cancel_reason: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// Runs at most one typing session at a time on the tokio runtime.
pub struct TypingController<P: Platform> {
    platform: Arc<P>,
    foreground: Arc<ForegroundState>,
    status: UnboundedSender<TypingStatus>,
    altgr_style: AltGrStyle,
    active: ActiveSlot,
    next_id: AtomicU64,
}

impl<P: Platform> TypingController<P> {
    /// Emits `Ready` on `status` straight away, and again after every session.
    pub fn new(
        platform: Arc<P>,
        foreground: Arc<ForegroundState>,
        status: UnboundedSender<TypingStatus>,
    ) -> Self {
        let _ = status.send(TypingStatus::Ready);
        Self {
            platform,
            foreground,
            status,
            altgr_style: AltGrStyle::default(),
            active: Arc::new(Mutex::new(None)),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_altgr_style(mut self, style: AltGrStyle) -> Self {
        self.altgr_style = style;
        self
    }

    pub fn is_busy(&self) -> bool {
        lock_slot(&self.active).is_some()
    }

    /// Starts a session as a tokio task. Must be called inside a runtime.
    pub fn start_session(&self, request: TypeRequest) -> Result<SessionHandle, ControllerError> {
        if request.text.is_empty() {
            return Err(ControllerError::EmptyText);
        }
        let target = match request.target {
            Some(t) => t,
            None => {
                let last = self.foreground.current().ok_or(ControllerError::NoTarget)?;
                WindowDescriptor::new(last.handle, last.title, "")
            }
        };
        if target.handle.is_null() {
            return Err(ControllerError::NoTarget);
        }

        let session = TypingSession::new(
            &request.text,
            target,
            request.layout_name,
            request.speed,
            request.abort_on_focus_change,
        )
        .with_altgr_style(self.altgr_style);

        let stop = Arc::new(StopSignal::new());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut slot = lock_slot(&self.active);
            if slot.is_some() {
                return Err(ControllerError::Busy);
            }
            *slot = Some(ActiveSession {
                id,
                stop: stop.clone(),
            });
        }

        log::info!(
            "session {id}: typing into \"{}\" ({:?})",
            session.target.title,
            session.target.handle
        );

        let release = ReleaseOnDrop {
            slot: self.active.clone(),
            id,
            status: self.status.clone(),
        };
        let platform = self.platform.clone();
        let foreground = self.foreground.clone();
        let status = self.status.clone();
        let task_stop = stop.clone();
        let task = tokio::spawn(async move {
            let _release = release;
            run_session(&*platform, &foreground, &session, &task_stop, &status).await
        });

        Ok(SessionHandle { id, stop, task })
    }

    /// Asks the session to stop before its next character. No-op once it has ended.
    pub fn request_stop(&self, handle: &SessionHandle) {
        if handle.is_finished() || handle.stop.is_requested() {
            return;
        }
        handle.stop.request();
        let _ = self.status.send(TypingStatus::Stopping);
    }

    /// Stops whichever session is active. Returns false when idle.
    pub fn stop_active(&self) -> bool {
        let stop = match lock_slot(&self.active).as_ref() {
            Some(active) => active.stop.clone(),
            None => return false,
        };
        if !stop.is_requested() {
            stop.request();
            let _ = self.status.send(TypingStatus::Stopping);
        }
        true
    }
}
