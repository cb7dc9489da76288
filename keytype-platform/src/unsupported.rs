// Backend for targets without a native implementation. Enumeration is empty
// and every OS operation fails cleanly, so the shell still runs (e.g. with
// --dry-run) instead of failing to build.

use keytype_core::keys::{KeyPlan, Modifier};
use keytype_core::types::{WindowDescriptor, WindowHandle};
use keytype_engine::error::PlatformError;
use keytype_engine::traits::{
    ForegroundCallback, ForegroundHook, KeySink, KeyboardLayouts, WindowSystem,
};

use crate::ClipboardText;

#[derive(Debug, Default)]
pub struct UnsupportedPlatform;

impl UnsupportedPlatform {
    pub fn new() -> Self {
        Self
    }
}

impl WindowSystem for UnsupportedPlatform {
    fn list_windows(&self) -> Vec<WindowDescriptor> {
        Vec::new()
    }

    fn frontmost_window(&self) -> Option<WindowDescriptor> {
        None
    }

    fn window_title(&self, _handle: &WindowHandle) -> Option<String> {
        None
    }

    fn activate_window(&self, _handle: &WindowHandle) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("window activation"))
    }
}

impl ForegroundHook for UnsupportedPlatform {
    type Guard = ();

    fn install_foreground_hook(&self, _on_change: ForegroundCallback) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("foreground event hook"))
    }
}

impl KeyboardLayouts for UnsupportedPlatform {
    type Layout = ();

    fn resolve_layout(&self, _name: &str) {}

    fn map_character(&self, _ch: char, _layout: &()) -> Option<KeyPlan> {
        None
    }

    fn enter_key(&self, _layout: &()) -> Option<u16> {
        None
    }
}

impl KeySink for UnsupportedPlatform {
    fn tap_key(&self, _key: u16, _extended: bool) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("keystroke synthesis"))
    }

    fn press_modifier(&self, _modifier: Modifier, _down: bool) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("keystroke synthesis"))
    }

    fn send_unicode_unit(&self, _unit: u16) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported("keystroke synthesis"))
    }
}

impl ClipboardText for UnsupportedPlatform {
    fn clipboard_text(&self) -> anyhow::Result<String> {
        anyhow::bail!("clipboard access is not supported on this platform")
    }
}
