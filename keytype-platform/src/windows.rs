// Windows backend.
//
// We keep it behind `cfg(windows)` so the workspace builds cleanly elsewhere.

#[path = "windows_foreground.rs"]
mod windows_foreground;

#[path = "windows_hook.rs"]
mod windows_hook;

#[path = "windows_insert.rs"]
mod windows_insert;

#[path = "windows_layout.rs"]
mod windows_layout;

use keytype_core::keys::{KeyPlan, Modifier};
use keytype_core::types::{WindowDescriptor, WindowHandle};
use keytype_engine::error::PlatformError;
use keytype_engine::traits::{
    ForegroundCallback, ForegroundHook, KeySink, KeyboardLayouts, WindowSystem,
};

use crate::ClipboardText;

pub use windows_hook::WinEventHookGuard;
pub use windows_layout::WindowsLayout;

#[derive(Debug, Default)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl WindowSystem for WindowsPlatform {
    fn list_windows(&self) -> Vec<WindowDescriptor> {
        windows_foreground::list_windows()
    }

    fn frontmost_window(&self) -> Option<WindowDescriptor> {
        windows_foreground::frontmost_window()
    }

    fn window_title(&self, handle: &WindowHandle) -> Option<String> {
        windows_foreground::window_title(handle)
    }

    fn activate_window(&self, handle: &WindowHandle) -> Result<(), PlatformError> {
        windows_foreground::activate_window(handle)
    }
}

impl ForegroundHook for WindowsPlatform {
    type Guard = WinEventHookGuard;

    fn install_foreground_hook(
        &self,
        on_change: ForegroundCallback,
    ) -> Result<Self::Guard, PlatformError> {
        windows_hook::install(on_change)
    }
}

impl KeyboardLayouts for WindowsPlatform {
    type Layout = WindowsLayout;

    fn resolve_layout(&self, name: &str) -> WindowsLayout {
        windows_layout::resolve(name)
    }

    fn map_character(&self, ch: char, layout: &WindowsLayout) -> Option<KeyPlan> {
        windows_layout::map_character(ch, *layout)
    }

    fn enter_key(&self, layout: &WindowsLayout) -> Option<u16> {
        windows_layout::enter_key(*layout)
    }
}

impl KeySink for WindowsPlatform {
    fn tap_key(&self, key: u16, extended: bool) -> Result<(), PlatformError> {
        windows_insert::tap_scan(key, extended)
    }

    fn press_modifier(&self, modifier: Modifier, down: bool) -> Result<(), PlatformError> {
        windows_insert::press_modifier(modifier, down)
    }

    fn send_unicode_unit(&self, unit: u16) -> Result<(), PlatformError> {
        windows_insert::send_unicode_unit(unit)
    }
}

impl ClipboardText for WindowsPlatform {
    fn clipboard_text(&self) -> anyhow::Result<String> {
        windows_insert::clipboard_text()
    }
}
