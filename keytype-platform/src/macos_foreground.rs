// macOS window enumeration and activation.
//
// Implementation notes:
// - Windows come from CGWindowListCopyWindowInfo (on-screen, layer 0 only).
// - There is no stable per-window id we can activate, so a handle is the owning
//   pid plus the title seen at enumeration time, and activation works per app.
// - Reading kCGWindowName for other apps needs Screen Recording permission on
//   recent macOS; without it titles come back empty and those windows are skipped.

#![cfg(target_os = "macos")]

use core_foundation::base::{CFRelease, TCFType, ToVoid};
use core_foundation::dictionary::{CFDictionaryGetValue, CFDictionaryRef};
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_graphics::window::{
    CGWindowListCopyWindowInfo, kCGNullWindowID, kCGWindowListExcludeDesktopElements,
    kCGWindowListOptionOnScreenOnly,
};
use objc2::rc::Retained;
use objc2_app_kit::{NSApplicationActivationOptions, NSRunningApplication, NSWorkspace};

use keytype_core::types::{WindowDescriptor, WindowHandle};
use keytype_engine::error::PlatformError;

#[derive(Debug, Clone)]
struct CgWindow {
    pid: i32,
    title: String,
    owner: String,
}

unsafe fn dict_string(dict: CFDictionaryRef, key: &str) -> Option<String> {
    let key = CFString::new(key);
    let value = unsafe { CFDictionaryGetValue(dict, key.to_void()) };
    if value.is_null() {
        return None;
    }
    Some(unsafe { CFString::wrap_under_get_rule(value as _) }.to_string())
}

unsafe fn dict_i32(dict: CFDictionaryRef, key: &str) -> Option<i32> {
    let key = CFString::new(key);
    let value = unsafe { CFDictionaryGetValue(dict, key.to_void()) };
    if value.is_null() {
        return None;
    }
    unsafe { CFNumber::wrap_under_get_rule(value as _) }.to_i32()
}

// Normal-layer, titled, on-screen windows in front-to-back order.
fn cg_windows() -> Vec<CgWindow> {
    let mut out = Vec::new();
    unsafe {
        let options = kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements;
        let list = CGWindowListCopyWindowInfo(options, kCGNullWindowID);
        if list.is_null() {
            return out;
        }

        let count = core_foundation::array::CFArrayGetCount(list as _);
        for i in 0..count {
            let info = core_foundation::array::CFArrayGetValueAtIndex(list as _, i) as CFDictionaryRef;
            if info.is_null() {
                continue;
            }
            // Menu bar, Dock and overlays live on other layers.
            if dict_i32(info, "kCGWindowLayer").unwrap_or(0) != 0 {
                continue;
            }
            let Some(title) = dict_string(info, "kCGWindowName") else {
                continue;
            };
            let Some(owner) = dict_string(info, "kCGWindowOwnerName") else {
                continue;
            };
            let pid = dict_i32(info, "kCGWindowOwnerPID").unwrap_or(0);
            if title.trim().is_empty() {
                continue;
            }
            out.push(CgWindow { pid, title, owner });
        }

        CFRelease(list as *const std::ffi::c_void);
    }
    out
}

pub fn list_windows() -> Vec<WindowDescriptor> {
    cg_windows()
        .into_iter()
        .map(|w| {
            WindowDescriptor::new(
                WindowHandle::Process {
                    pid: w.pid,
                    title: w.title.clone(),
                },
                w.title,
                w.owner,
            )
        })
        .collect()
}

pub fn frontmost_window() -> Option<WindowDescriptor> {
    let app: Option<Retained<NSRunningApplication>> =
        unsafe { NSWorkspace::sharedWorkspace().frontmostApplication() };
    let app = app?;

    let pid = unsafe { app.processIdentifier() };
    if pid <= 0 {
        return None;
    }
    let name = unsafe { app.localizedName() }
        .map(|n| n.to_string())
        .unwrap_or_default();

    // Frontmost titled window of that app; the app name when none is readable.
    let title = cg_windows()
        .into_iter()
        .find(|w| w.pid == pid)
        .map(|w| w.title)
        .unwrap_or_else(|| name.clone());

    Some(WindowDescriptor::new(
        WindowHandle::Process {
            pid,
            title: title.clone(),
        },
        title,
        name,
    ))
}

pub fn window_title(handle: &WindowHandle) -> Option<String> {
    let WindowHandle::Process { pid, title } = handle else {
        return None;
    };
    let windows: Vec<CgWindow> = cg_windows().into_iter().filter(|w| w.pid == *pid).collect();
    windows
        .iter()
        .find(|w| &w.title == title)
        .or_else(|| windows.first())
        .map(|w| w.title.clone())
}

pub fn activate_window(handle: &WindowHandle) -> Result<(), PlatformError> {
    let WindowHandle::Process { pid, .. } = handle else {
        return Err(PlatformError::WindowUnavailable);
    };
    let app = unsafe { NSRunningApplication::runningApplicationWithProcessIdentifier(*pid) }
        .ok_or(PlatformError::WindowUnavailable)?;

    #[allow(deprecated)]
    let activated =
        unsafe { app.activateWithOptions(NSApplicationActivationOptions::ActivateIgnoringOtherApps) };
    if !activated {
        return Err(PlatformError::WindowUnavailable);
    }
    Ok(())
}
