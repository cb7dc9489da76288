use serde::{Deserialize, Serialize};

use crate::text::{LABEL_TITLE_RUNES, truncate_runes};

/// Opaque OS window identifier. Never dereferenced, only handed back to the OS,
/// and it may have gone stale by the time it is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowHandle {
    /// Win32 `HWND`, stored as its integer value.
    Hwnd(isize),

    /// macOS has no per-window id that stays valid across calls; the owning
    /// process plus the window title stands in for one.
    Process { pid: i32, title: String },
}

impl WindowHandle {
    pub fn is_null(&self) -> bool {
        match self {
            Self::Hwnd(h) => *h == 0,
            Self::Process { pid, .. } => *pid <= 0,
        }
    }

    /// Whether `other` addresses the same input target.
    ///
    /// On macOS only the frontmost application can be observed, so two process
    /// handles match on pid alone.
    pub fn same_target(&self, other: &WindowHandle) -> bool {
        match (self, other) {
            (Self::Hwnd(a), Self::Hwnd(b)) => a == b,
            (Self::Process { pid: a, .. }, Self::Process { pid: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// One window as seen by a single enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    pub handle: WindowHandle,
    pub title: String,
    pub process_name: String,
}

impl WindowDescriptor {
    pub fn new(
        handle: WindowHandle,
        title: impl Into<String>,
        process_name: impl Into<String>,
    ) -> Self {
        Self {
            handle,
            title: title.into(),
            process_name: process_name.into(),
        }
    }

    /// Display label used for selection lists. Unique per handle within one refresh.
    pub fn label(&self) -> String {
        let short = truncate_runes(&self.title, LABEL_TITLE_RUNES);
        match &self.handle {
            WindowHandle::Hwnd(h) => format!("{short} (0x{:X})", *h as usize),
            WindowHandle::Process { pid, .. } => {
                format!("{short} - {} (PID: {pid})", self.process_name)
            }
        }
    }
}

/// The window the user last switched to, as recorded by the foreground tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub handle: WindowHandle,
    pub title: String,

    // Bumped on every recorded observation; lets readers tell whether the
    // tracker has seen anything since a given point.
    pub generation: u64,
}
