use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use keytype_core::speed::SpeedConfig;
use keytype_core::text::{LABEL_TITLE_RUNES, normalize_line_endings, truncate_runes};
use keytype_core::types::WindowDescriptor;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::PlatformError;
use crate::synth::{AltGrStyle, Keystroke, plan_character, send_enter, tap_with_modifiers, unicode_units};
use crate::tracker::ForegroundState;
use crate::traits::Platform;

/// Time the window manager gets to finish an activation before the first key.
pub const ACTIVATION_SETTLE: Duration = Duration::from_millis(150);

const STAGE_ACTIVATING: &str = "activating";
const STAGE_RUNNING: &str = "running";
const STAGE_COMPLETED: &str = "completed";
const STAGE_CANCELLED: &str = "cancelled";
const STAGE_FAILED: &str = "failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStage {
    Idle,
    Activating,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SessionStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Activating or Running; a second session is refused while this holds.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Activating | Self::Running)
    }
}

/// Progress notifications for the shell, which renders its own localized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypingStatus {
    Ready,
    Typing,
    Stopping,
    /// `by_user` is false when the session was cancelled by a focus change.
    Stopped { by_user: bool },
    TypedTo(String),
    Error(String),
}

/// Why a session ended in `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    StopRequested,
    FocusChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub stage: SessionStage,

    // A stable string label for UI display.
    pub stage_label: Option<String>,

    /// Characters fully sent, counting each Enter as one.
    pub chars_sent: usize,
    pub target_title: String,
    pub cancel_reason: Option<CancelReason>,
    pub error: Option<String>,
}

impl SessionResult {
    fn new(target_title: String) -> Self {
        Self {
            stage: SessionStage::Idle,
            stage_label: None,
            chars_sent: 0,
            target_title,
            cancel_reason: None,
            error: None,
        }
    }

    fn enter(&mut self, stage: SessionStage, label: &str) {
        self.stage = stage;
        self.stage_label = Some(label.into());
    }
}

/// Explicit stop request, shared between the controller and its running task.
#[derive(Debug, Default)]
pub struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a sleeper that has not yet polled still wakes.
        self.notify.notify_one();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleeps for `delay` unless a stop arrives first. Returns true when stopped.
    pub async fn sleep(&self, delay: Duration) -> bool {
        if self.is_requested() {
            return true;
        }
        if delay.is_zero() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => self.is_requested(),
            _ = self.notify.notified() => true,
        }
    }
}

/// One "type this text into this window" unit of work.
#[derive(Debug, Clone)]
pub struct TypingSession {
    pub text: String,
    pub target: WindowDescriptor,
    pub layout_name: String,
    pub per_char_delay: Duration,
    pub abort_on_focus_change: bool,
    pub altgr_style: AltGrStyle,
}

impl TypingSession {
    /// Normalizes line endings and fixes the delay for this text.
    pub fn new(
        text: &str,
        target: WindowDescriptor,
        layout_name: impl Into<String>,
        speed: SpeedConfig,
        abort_on_focus_change: bool,
    ) -> Self {
        let text = normalize_line_endings(text).into_owned();
        let per_char_delay = speed.per_char_delay(&text);
        Self {
            text,
            target,
            layout_name: layout_name.into(),
            per_char_delay,
            abort_on_focus_change,
            altgr_style: AltGrStyle::default(),
        }
    }

    pub fn with_altgr_style(mut self, style: AltGrStyle) -> Self {
        self.altgr_style = style;
        self
    }
}

enum Step {
    Next,
    Cancel(CancelReason),
}

struct Runner<'a, P: Platform> {
    platform: &'a P,
    foreground: &'a ForegroundState,
    stop: &'a StopSignal,
    session: &'a TypingSession,
    // Tracker generation before activation; focus checks only consider newer observations.
    baseline: u64,
}

impl<P: Platform> Runner<'_, P> {
    fn check(&self) -> Step {
        if self.stop.is_requested() {
            return Step::Cancel(CancelReason::StopRequested);
        }
        if self.session.abort_on_focus_change && self.foreground.generation() != self.baseline {
            if let Some(current) = self.foreground.current() {
                if !current.handle.same_target(&self.session.target.handle) {
                    log::info!("focus moved to \"{}\"; aborting", current.title);
                    return Step::Cancel(CancelReason::FocusChanged);
                }
            }
        }
        Step::Next
    }

    async fn send(&self, layout: &P::Layout, ch: char) -> Result<(), PlatformError> {
        let delay = self.session.per_char_delay;
        match plan_character(self.platform, layout, ch) {
            Keystroke::Enter => {
                send_enter(self.platform, layout)?;
                self.stop.sleep(delay).await;
            }
            Keystroke::Mapped(plan) => {
                tap_with_modifiers(self.platform, &plan, self.session.altgr_style)?;
                self.stop.sleep(delay).await;
            }
            Keystroke::Unicode(ch) => {
                // Both halves of a surrogate pair go out even if a stop lands between them.
                for unit in unicode_units(ch) {
                    self.platform.send_unicode_unit(unit)?;
                    self.stop.sleep(delay).await;
                }
            }
        }
        Ok(())
    }
}

/// Drives one session from activation to a terminal stage, emitting status on
/// the way. Never panics on OS failures; they end the session as `Failed`.
pub async fn run_session<P: Platform>(
    platform: &P,
    foreground: &ForegroundState,
    session: &TypingSession,
    stop: &StopSignal,
    status: &UnboundedSender<TypingStatus>,
) -> SessionResult {
    let emit = |s: TypingStatus| {
        let _ = status.send(s);
    };
    let mut result = SessionResult::new(session.target.title.clone());

    result.enter(SessionStage::Activating, STAGE_ACTIVATING);
    // Taken before activation so a switch away during the settle still counts.
    let baseline = foreground.generation();
    if let Err(e) = platform.activate_window(&session.target.handle) {
        log::error!("cannot activate \"{}\": {e}", session.target.title);
        result.enter(SessionStage::Failed, STAGE_FAILED);
        result.error = Some(e.to_string());
        emit(TypingStatus::Error(e.to_string()));
        return result;
    }
    tokio::time::sleep(ACTIVATION_SETTLE).await;

    let layout = platform.resolve_layout(&session.layout_name);
    log::debug!(
        "typing {} chars, layout {:?}, delay {:?}",
        session.text.chars().count(),
        session.layout_name,
        session.per_char_delay
    );

    result.enter(SessionStage::Running, STAGE_RUNNING);
    emit(TypingStatus::Typing);

    let runner = Runner {
        platform,
        foreground,
        stop,
        session,
        baseline,
    };

    for ch in session.text.chars() {
        if let Step::Cancel(reason) = runner.check() {
            result.enter(SessionStage::Cancelled, STAGE_CANCELLED);
            result.cancel_reason = Some(reason);
            emit(TypingStatus::Stopped {
                by_user: reason == CancelReason::StopRequested,
            });
            log::info!("session cancelled after {} chars", result.chars_sent);
            return result;
        }

        if let Err(e) = runner.send(&layout, ch).await {
            log::error!("keystroke synthesis failed at char {}: {e}", result.chars_sent);
            result.enter(SessionStage::Failed, STAGE_FAILED);
            result.error = Some(e.to_string());
            emit(TypingStatus::Error(e.to_string()));
            return result;
        }
        result.chars_sent += 1;
    }

    result.enter(SessionStage::Completed, STAGE_COMPLETED);
    let title = platform
        .window_title(&session.target.handle)
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| session.target.title.clone());
    emit(TypingStatus::TypedTo(truncate_runes(&title, LABEL_TITLE_RUNES)));
    log::info!("typed {} chars into \"{title}\"", result.chars_sent);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use keytype_core::types::WindowHandle;
    use std::sync::Arc;

    #[test]
    fn busy_and_terminal_stages() {
        assert!(SessionStage::Activating.is_busy());
        assert!(SessionStage::Running.is_busy());
        assert!(!SessionStage::Idle.is_busy());
        assert!(SessionStage::Cancelled.is_terminal());
        assert!(!SessionStage::Running.is_terminal());
    }

    #[test]
    fn session_normalizes_crlf() {
        let target = WindowDescriptor::new(WindowHandle::Hwnd(1), "t", "p.exe");
        let s = TypingSession::new("a\r\nb", target, "auto", SpeedConfig::FixedMs(5), true);
        assert_eq!(s.text, "a\nb");
        assert_eq!(s.per_char_delay, Duration::from_millis(5));
    }

    #[tokio::test]
    async fn stop_interrupts_a_long_sleep() {
        let stop = Arc::new(StopSignal::new());
        let waiter = {
            let stop = stop.clone();
            tokio::spawn(async move { stop.sleep(Duration::from_secs(30)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        stop.request();

        let stopped = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .expect("sleep was not interrupted")
            .unwrap();
        assert!(stopped);
    }

    #[tokio::test]
    async fn zero_delay_does_not_sleep() {
        let stop = StopSignal::new();
        assert!(!stop.sleep(Duration::ZERO).await);
        stop.request();
        assert!(stop.sleep(Duration::ZERO).await);
    }
}
