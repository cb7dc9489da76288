//! macOS backend.

#[path = "macos_foreground.rs"]
mod macos_foreground;

#[path = "macos_insert.rs"]
mod macos_insert;

#[path = "macos_layout.rs"]
mod macos_layout;

use std::sync::{Arc, Mutex};

use objc2::MainThreadMarker;

use keytype_core::keys::{KeyPlan, Modifier};
use keytype_core::types::{WindowDescriptor, WindowHandle};
use keytype_engine::error::PlatformError;
use keytype_engine::traits::{
    ForegroundCallback, ForegroundHook, KeySink, KeyboardLayouts, WindowSystem,
};

use crate::ClipboardText;

pub use macos_insert::is_accessibility_trusted;
pub use macos_layout::KeyCache;

/// The key cache is shared read-only with running sessions; a rebuild swaps
/// in a new map without touching the one a session already holds.
#[derive(Debug, Default)]
pub struct MacosPlatform {
    cache: Mutex<Arc<KeyCache>>,
    poster: macos_insert::EventPoster,
}

impl MacosPlatform {
    /// Builds the key cache right away; hence the main-thread requirement.
    pub fn new(mtm: MainThreadMarker) -> Self {
        let platform = Self::default();
        platform.rebuild_key_cache(mtm);
        platform
    }

    /// Re-reads the current input source, e.g. after the user switched layouts.
    pub fn rebuild_key_cache(&self, mtm: MainThreadMarker) {
        let cache = Arc::new(macos_layout::build_key_cache(mtm));
        *self.cache.lock().unwrap_or_else(|e| e.into_inner()) = cache;
    }
}

impl WindowSystem for MacosPlatform {
    fn list_windows(&self) -> Vec<WindowDescriptor> {
        macos_foreground::list_windows()
    }

    fn frontmost_window(&self) -> Option<WindowDescriptor> {
        macos_foreground::frontmost_window()
    }

    fn window_title(&self, handle: &WindowHandle) -> Option<String> {
        macos_foreground::window_title(handle)
    }

    fn activate_window(&self, handle: &WindowHandle) -> Result<(), PlatformError> {
        // Checked here so a session fails before any key is attempted.
        macos_insert::require_accessibility()?;
        macos_foreground::activate_window(handle)
    }
}

impl ForegroundHook for MacosPlatform {
    type Guard = ();

    fn install_foreground_hook(&self, _on_change: ForegroundCallback) -> Result<(), PlatformError> {
        // NSWorkspace notifications need the AppKit run loop, which the shell owns.
        Err(PlatformError::Unsupported("foreground event hook"))
    }
}

impl KeyboardLayouts for MacosPlatform {
    type Layout = Arc<KeyCache>;

    fn resolve_layout(&self, name: &str) -> Arc<KeyCache> {
        log::debug!("layout {name:?} ignored; using the cached system layout");
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if cache.is_empty() {
            log::warn!("keyboard cache is empty; typing will use Unicode injection only");
        }
        cache
    }

    fn map_character(&self, ch: char, layout: &Arc<KeyCache>) -> Option<KeyPlan> {
        layout.get(&ch).copied()
    }

    fn enter_key(&self, _layout: &Arc<KeyCache>) -> Option<u16> {
        Some(macos_layout::RETURN_KEYCODE)
    }
}

impl KeySink for MacosPlatform {
    fn tap_key(&self, key: u16, _extended: bool) -> Result<(), PlatformError> {
        self.poster.tap_key(key)
    }

    fn press_modifier(&self, modifier: Modifier, down: bool) -> Result<(), PlatformError> {
        self.poster.press_modifier(modifier, down)
    }

    fn send_unicode_unit(&self, unit: u16) -> Result<(), PlatformError> {
        self.poster.send_unicode_unit(unit)
    }
}

impl ClipboardText for MacosPlatform {
    fn clipboard_text(&self) -> anyhow::Result<String> {
        macos_insert::clipboard_text()
    }
}
