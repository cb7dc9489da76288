// Keystroke synthesis through SendInput.
//
// Each press/release pair goes out in one SendInput call so the OS cannot
// interleave other input between them.

use clipboard_win::get_clipboard_string;
use keytype_core::keys::Modifier;
use keytype_engine::error::PlatformError;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_EXTENDEDKEY,
    KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, KEYEVENTF_UNICODE, SendInput, VIRTUAL_KEY, VK_CONTROL,
    VK_MENU, VK_SHIFT,
};

// Right-hand Alt; with the extended flag consoles read it as AltGr.
const RIGHT_ALT_SCAN: u16 = 0x38;

fn key_input(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn scan_input(scan: u16, extended: bool, down: bool) -> INPUT {
    let mut flags = KEYEVENTF_SCANCODE;
    if extended {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }
    if !down {
        flags |= KEYEVENTF_KEYUP;
    }
    key_input(VIRTUAL_KEY(0), scan, flags)
}

fn send(call: &'static str, inputs: &[INPUT]) -> Result<(), PlatformError> {
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        // Usually UIPI: the target runs elevated and we do not.
        return Err(PlatformError::last_os_error(call));
    }
    Ok(())
}

pub fn tap_scan(scan: u16, extended: bool) -> Result<(), PlatformError> {
    send(
        "SendInput(scan)",
        &[scan_input(scan, extended, true), scan_input(scan, extended, false)],
    )
}

pub fn press_modifier(modifier: Modifier, down: bool) -> Result<(), PlatformError> {
    let up = if down {
        KEYBD_EVENT_FLAGS(0)
    } else {
        KEYEVENTF_KEYUP
    };
    let input = match modifier {
        Modifier::Shift => key_input(VK_SHIFT, 0, up),
        Modifier::Control => key_input(VK_CONTROL, 0, up),
        Modifier::Alt => key_input(VK_MENU, 0, up),
        Modifier::AltGr => scan_input(RIGHT_ALT_SCAN, true, down),
    };
    send("SendInput(modifier)", &[input])
}

pub fn send_unicode_unit(unit: u16) -> Result<(), PlatformError> {
    send(
        "SendInput(unicode)",
        &[
            key_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE),
            key_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
        ],
    )
}

pub fn clipboard_text() -> anyhow::Result<String> {
    get_clipboard_string().map_err(|e| anyhow::anyhow!("failed to read clipboard: {e}"))
}
