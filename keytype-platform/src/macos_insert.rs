// macOS keystroke synthesis through CGEvent.
//
// Requires Accessibility permission (AXIsProcessTrusted); without it the
// events are silently dropped, so we check before activating a target.

#![cfg(target_os = "macos")]

use std::sync::Mutex;

use core_foundation::base::TCFType;
use core_foundation::dictionary::CFDictionary;
use core_foundation::string::CFString;
use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use objc2::runtime::AnyObject;
use objc2_app_kit::{NSPasteboard, NSPasteboardTypeString};

use keytype_core::keys::Modifier;
use keytype_engine::error::PlatformError;

#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrustedWithOptions(options: *const AnyObject) -> bool;
    static kAXTrustedCheckOptionPrompt: *const AnyObject;
}

pub fn is_accessibility_trusted() -> bool {
    // AXIsProcessTrustedWithOptions({ prompt: false }).
    unsafe {
        let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt.cast());
        let value = core_foundation::boolean::CFBoolean::false_value();
        let options = CFDictionary::from_CFType_pairs(&[(key, value)]);
        AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef().cast())
    }
}

pub fn require_accessibility() -> Result<(), PlatformError> {
    if is_accessibility_trusted() {
        return Ok(());
    }
    Err(PlatformError::PermissionDenied(
        "Accessibility permission is required to type into other apps (System Settings → Privacy & Security → Accessibility)".into(),
    ))
}

fn modifier_key(modifier: Modifier) -> (u16, CGEventFlags) {
    // Keycodes: Shift 0x38, Control 0x3B, Option 0x3A. AltGr is Option on a Mac.
    match modifier {
        Modifier::Shift => (0x38, CGEventFlags::CGEventFlagShift),
        Modifier::Control => (0x3B, CGEventFlags::CGEventFlagControl),
        Modifier::Alt | Modifier::AltGr => (0x3A, CGEventFlags::CGEventFlagAlternate),
    }
}

/// Posts HID-level keyboard events. Tracks which modifier flags are held so
/// that taps in between carry them.
#[derive(Debug)]
pub struct EventPoster {
    held: Mutex<CGEventFlags>,
}

impl Default for EventPoster {
    fn default() -> Self {
        Self {
            held: Mutex::new(CGEventFlags::CGEventFlagNull),
        }
    }
}

fn source() -> Result<CGEventSource, PlatformError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|_| PlatformError::Os {
        call: "CGEventSourceCreate",
        code: 0,
        message: "failed to create CGEventSource".into(),
    })
}

fn key_event(src: &CGEventSource, keycode: u16, down: bool) -> Result<CGEvent, PlatformError> {
    CGEvent::new_keyboard_event(src.clone(), keycode, down).map_err(|_| PlatformError::Os {
        call: "CGEventCreateKeyboardEvent",
        code: 0,
        message: format!("failed to create event for keycode {keycode:#x}"),
    })
}

impl EventPoster {
    fn held(&self) -> CGEventFlags {
        *self.held.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn tap_key(&self, keycode: u16) -> Result<(), PlatformError> {
        let src = source()?;
        let flags = self.held();
        let down = key_event(&src, keycode, true)?;
        let up = key_event(&src, keycode, false)?;
        down.set_flags(flags);
        up.set_flags(flags);
        down.post(CGEventTapLocation::HID);
        up.post(CGEventTapLocation::HID);
        Ok(())
    }

    pub fn press_modifier(&self, modifier: Modifier, down: bool) -> Result<(), PlatformError> {
        let (keycode, flag) = modifier_key(modifier);
        let flags = {
            let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
            if down {
                held.insert(flag);
            } else {
                held.remove(flag);
            }
            *held
        };
        // Lock released before the OS call.
        let src = source()?;
        let event = key_event(&src, keycode, down)?;
        event.set_flags(flags);
        event.post(CGEventTapLocation::HID);
        Ok(())
    }

    pub fn send_unicode_unit(&self, unit: u16) -> Result<(), PlatformError> {
        let src = source()?;
        let down = key_event(&src, 0, true)?;
        let up = key_event(&src, 0, false)?;
        // Held modifiers would otherwise alter the injected character.
        down.set_flags(CGEventFlags::CGEventFlagNull);
        up.set_flags(CGEventFlags::CGEventFlagNull);
        down.set_string_from_utf16_unchecked(&[unit]);
        up.set_string_from_utf16_unchecked(&[unit]);
        down.post(CGEventTapLocation::HID);
        up.post(CGEventTapLocation::HID);
        Ok(())
    }
}

pub fn clipboard_text() -> anyhow::Result<String> {
    let pasteboard = NSPasteboard::generalPasteboard();
    let text = unsafe { pasteboard.stringForType(NSPasteboardTypeString) };
    text.map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("clipboard does not contain text"))
}
