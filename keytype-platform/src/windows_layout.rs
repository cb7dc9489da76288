// Keyboard layout handles and character-to-scan-code mapping.

use keytype_core::keys::{KeyPlan, ModifierMask};
use keytype_core::layout::{is_auto_layout, klid_for};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    ACTIVATE_KEYBOARD_LAYOUT_FLAGS, GetKeyboardLayout, LoadKeyboardLayoutW, MAPVK_VK_TO_VSC,
    MapVirtualKeyExW, VkKeyScanExW,
};
use windows::Win32::UI::TextServices::HKL;
use windows::core::HSTRING;

const VK_RETURN: u32 = 0x0D;

/// An `HKL` held as its integer value so it can cross threads. Layouts loaded
/// here are never unloaded; the system default may be shared process-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowsLayout(isize);

impl WindowsLayout {
    fn hkl(self) -> HKL {
        HKL(self.0 as *mut core::ffi::c_void)
    }
}

fn system_layout() -> WindowsLayout {
    let hkl = unsafe { GetKeyboardLayout(0) };
    WindowsLayout(hkl.0 as isize)
}

pub fn resolve(name: &str) -> WindowsLayout {
    if is_auto_layout(name) {
        return system_layout();
    }
    let Some(klid) = klid_for(name) else {
        log::warn!("unknown keyboard layout {name:?}; using the system layout");
        return system_layout();
    };
    match unsafe { LoadKeyboardLayoutW(&HSTRING::from(klid), ACTIVATE_KEYBOARD_LAYOUT_FLAGS(0)) } {
        Ok(hkl) if !hkl.0.is_null() => {
            log::debug!("loaded layout {name} ({klid})");
            WindowsLayout(hkl.0 as isize)
        }
        Ok(_) => system_layout(),
        Err(e) => {
            log::warn!("LoadKeyboardLayoutW({klid}) failed: {e}; using the system layout");
            system_layout()
        }
    }
}

// Navigation and editing keys share scan codes with the numpad and need the extended flag.
fn is_extended_vk(vk: u16) -> bool {
    matches!(vk, 0x21..=0x28 | 0x2D | 0x2E)
}

fn vk_to_scan(vk: u32, layout: WindowsLayout) -> u16 {
    (unsafe { MapVirtualKeyExW(vk, MAPVK_VK_TO_VSC, Some(layout.hkl())) } & 0xFFFF) as u16
}

pub fn map_character(ch: char, layout: WindowsLayout) -> Option<KeyPlan> {
    let unit = u16::try_from(u32::from(ch)).ok()?;
    let res = unsafe { VkKeyScanExW(unit, layout.hkl()) };
    if res == -1 {
        return None;
    }
    let vk = (res as u16) & 0xFF;
    let shift_state = ((res as u16) >> 8) as u8;

    let scan = vk_to_scan(u32::from(vk), layout);
    if scan == 0 {
        return None;
    }

    Some(
        KeyPlan::new(scan, ModifierMask::from_shift_state(shift_state))
            .with_extended(is_extended_vk(vk)),
    )
}

pub fn enter_key(layout: WindowsLayout) -> Option<u16> {
    let scan = vk_to_scan(VK_RETURN, layout);
    (scan != 0).then_some(scan)
}
