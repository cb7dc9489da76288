// Window enumeration, titles and activation.
// Kept behind cfg(windows) at the module level in windows.rs.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use keytype_core::types::{WindowDescriptor, WindowHandle};
use keytype_engine::error::PlatformError;
use windows::Win32::Foundation::{CloseHandle, HWND, LPARAM};
use windows::Win32::System::ProcessStatus::K32GetModuleFileNameExW;
use windows::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, IsWindowVisible, SetForegroundWindow,
};
use windows::core::BOOL;

pub(crate) fn hwnd_of(handle: &WindowHandle) -> Result<HWND, PlatformError> {
    match handle {
        WindowHandle::Hwnd(h) if *h != 0 => Ok(HWND(*h as *mut core::ffi::c_void)),
        _ => Err(PlatformError::WindowUnavailable),
    }
}

pub(crate) fn describe(hwnd: HWND) -> WindowDescriptor {
    let title = get_window_title(hwnd);
    let process_name = window_pid(hwnd)
        .and_then(process_name)
        .unwrap_or_default();
    WindowDescriptor::new(WindowHandle::Hwnd(hwnd.0 as isize), title, process_name)
}

pub(crate) fn get_window_title(hwnd: HWND) -> String {
    unsafe {
        let len = GetWindowTextLengthW(hwnd);
        if len <= 0 {
            return String::new();
        }
        let mut buf = vec![0u16; (len as usize) + 1];
        let copied = GetWindowTextW(hwnd, &mut buf);
        let copied = copied.max(0) as usize;
        buf.truncate(copied);
        String::from_utf16_lossy(&buf)
    }
}

fn window_pid(hwnd: HWND) -> Option<u32> {
    let mut pid: u32 = 0;
    let thread = unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
    (thread != 0 && pid != 0).then_some(pid)
}

// Lowercased executable base name, e.g. "notepad.exe".
fn process_name(pid: u32) -> Option<String> {
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;

        // Paths can exceed MAX_PATH.
        let mut buf = vec![0u16; 4096];
        let len = K32GetModuleFileNameExW(Some(handle), None, &mut buf) as usize;
        let _ = CloseHandle(handle);

        if len == 0 {
            return None;
        }
        buf.truncate(len);
        let path = OsString::from_wide(&buf);
        std::path::Path::new(&path)
            .file_name()
            .map(|s| s.to_string_lossy().to_lowercase())
    }
}

unsafe extern "system" fn collect_visible(hwnd: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: lparam is the &mut Vec passed by list_windows below, alive for the whole EnumWindows call.
    let out = unsafe { &mut *(lparam.0 as *mut Vec<HWND>) };
    if unsafe { IsWindowVisible(hwnd) }.as_bool() {
        out.push(hwnd);
    }
    BOOL(1)
}

pub fn list_windows() -> Vec<WindowDescriptor> {
    let mut hwnds: Vec<HWND> = Vec::new();
    let res = unsafe {
        EnumWindows(
            Some(collect_visible),
            LPARAM(&mut hwnds as *mut Vec<HWND> as isize),
        )
    };
    if let Err(e) = res {
        log::warn!("EnumWindows failed: {e}");
    }
    // Titles and owners are read after enumeration so the callback stays cheap.
    hwnds.into_iter().map(describe).collect()
}

pub fn frontmost_window() -> Option<WindowDescriptor> {
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.0.is_null() {
        return None;
    }
    Some(describe(hwnd))
}

pub fn window_title(handle: &WindowHandle) -> Option<String> {
    let hwnd = hwnd_of(handle).ok()?;
    window_pid(hwnd)?;
    Some(get_window_title(hwnd))
}

pub fn activate_window(handle: &WindowHandle) -> Result<(), PlatformError> {
    let hwnd = hwnd_of(handle)?;
    if window_pid(hwnd).is_none() {
        return Err(PlatformError::WindowUnavailable);
    }
    // Windows may refuse to steal focus; typing still goes wherever focus is.
    if !unsafe { SetForegroundWindow(hwnd) }.as_bool() {
        log::warn!("SetForegroundWindow refused for 0x{:X}", hwnd.0 as usize);
    }
    Ok(())
}
