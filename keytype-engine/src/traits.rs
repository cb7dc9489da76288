use std::sync::Arc;

use keytype_core::keys::{KeyPlan, Modifier};
use keytype_core::types::{WindowDescriptor, WindowHandle};

use crate::error::PlatformError;

/// Receives every raw foreground switch the OS reports. Filtering happens in the tracker.
pub type ForegroundCallback = Arc<dyn Fn(WindowDescriptor) + Send + Sync>;

pub trait WindowSystem: Send + Sync {
    /// Visible top-level windows, unfiltered and in OS order. May block briefly.
    fn list_windows(&self) -> Vec<WindowDescriptor>;

    /// What currently has input focus, if anything.
    fn frontmost_window(&self) -> Option<WindowDescriptor>;

    /// Fresh title for `handle`; `None` when the window is gone.
    fn window_title(&self, handle: &WindowHandle) -> Option<String>;

    /// Asks the OS to bring `handle` to the foreground. Activation completes
    /// asynchronously; callers must settle before sending input.
    fn activate_window(&self, handle: &WindowHandle) -> Result<(), PlatformError>;
}

pub trait ForegroundHook: Send + Sync {
    /// Uninstalls the hook when dropped.
    type Guard: Send + 'static;

    fn install_foreground_hook(
        &self,
        on_change: ForegroundCallback,
    ) -> Result<Self::Guard, PlatformError>;
}

pub trait KeyboardLayouts: Send + Sync {
    /// Read-only for the lifetime of a session; shared across characters without locking.
    type Layout: Send + Sync + 'static;

    /// Never fails: unknown names and "auto" resolve to the current system layout.
    fn resolve_layout(&self, name: &str) -> Self::Layout;

    /// Physical key for `ch`, or `None` when only Unicode injection can produce it.
    fn map_character(&self, ch: char, layout: &Self::Layout) -> Option<KeyPlan>;

    /// Physical key for Enter, if the layout maps one.
    fn enter_key(&self, layout: &Self::Layout) -> Option<u16>;
}

/// Input synthesis primitives. Each call is one OS submission.
pub trait KeySink: Send + Sync {
    /// Press then release one physical key.
    fn tap_key(&self, key: u16, extended: bool) -> Result<(), PlatformError>;

    fn press_modifier(&self, modifier: Modifier, down: bool) -> Result<(), PlatformError>;

    /// Press and release carrying one UTF-16 code unit.
    fn send_unicode_unit(&self, unit: u16) -> Result<(), PlatformError>;
}

/// Everything the engine needs from one OS, chosen at build time.
pub trait Platform: WindowSystem + ForegroundHook + KeyboardLayouts + KeySink + 'static {}

impl<T> Platform for T where T: WindowSystem + ForegroundHook + KeyboardLayouts + KeySink + 'static {}
