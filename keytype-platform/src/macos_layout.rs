// Character -> (keycode, modifiers) cache built from the current keyboard
// layout with UCKeyTranslate.
//
// Text Input Sources calls must run on the main thread, so building the cache
// takes a MainThreadMarker. Lookups afterwards are plain HashMap reads.

#![cfg(target_os = "macos")]

use std::collections::HashMap;
use std::ffi::c_void;

use core_foundation::base::CFRelease;
use core_foundation::data::{CFDataGetBytePtr, CFDataRef};
use core_foundation::string::CFStringRef;
use objc2::MainThreadMarker;

use keytype_core::keys::{KeyPlan, ModifierMask};
use keytype_core::layout::key_cache_candidates;

pub type KeyCache = HashMap<char, KeyPlan>;

#[link(name = "Carbon", kind = "framework")]
unsafe extern "C" {
    fn TISCopyCurrentKeyboardLayoutInputSource() -> *mut c_void;
    fn TISCopyCurrentASCIICapableKeyboardLayoutInputSource() -> *mut c_void;
    fn TISGetInputSourceProperty(source: *mut c_void, key: CFStringRef) -> *const c_void;
    static kTISPropertyUnicodeKeyLayoutData: CFStringRef;
    fn LMGetKbdType() -> u8;
    fn UCKeyTranslate(
        layout: *const c_void,
        virtual_key_code: u16,
        key_action: u16,
        modifier_key_state: u32,
        keyboard_type: u32,
        key_translate_options: u32,
        dead_key_state: *mut u32,
        max_string_length: usize,
        actual_string_length: *mut usize,
        unicode_string: *mut u16,
    ) -> i32;
}

const K_UC_KEY_ACTION_DOWN: u16 = 0;
const K_UC_KEY_TRANSLATE_NO_DEAD_KEYS_MASK: u32 = 1;

// (EventModifiers >> 8) & 0xFF: shiftKey -> 0x02, optionKey -> 0x08.
const MODIFIER_STATES: [(u32, ModifierMask); 4] = [
    (0x00, ModifierMask::NONE),
    (0x02, ModifierMask::SHIFT),
    (0x08, ModifierMask::ALT),
    (0x0A, ModifierMask::SHIFT.union(ModifierMask::ALT)),
];

const MAX_KEYCODE: u16 = 128;

pub const RETURN_KEYCODE: u16 = 0x24;

// Uchr data of the current layout, or of the ASCII-capable fallback when the
// current source is an input method without one. Caller releases the source.
unsafe fn copy_layout_source() -> Option<(*mut c_void, *const c_void)> {
    for copy in [
        TISCopyCurrentKeyboardLayoutInputSource as unsafe extern "C" fn() -> *mut c_void,
        TISCopyCurrentASCIICapableKeyboardLayoutInputSource,
    ] {
        let source = unsafe { copy() };
        if source.is_null() {
            continue;
        }
        let data = unsafe { TISGetInputSourceProperty(source, kTISPropertyUnicodeKeyLayoutData) };
        if data.is_null() {
            unsafe { CFRelease(source as *const c_void) };
            continue;
        }
        let bytes = unsafe { CFDataGetBytePtr(data as CFDataRef) };
        return Some((source, bytes as *const c_void));
    }
    None
}

unsafe fn translate(layout: *const c_void, keycode: u16, modifier_state: u32, kbd_type: u32) -> Option<char> {
    let mut dead_key_state: u32 = 0;
    let mut buf = [0u16; 4];
    let mut len: usize = 0;
    let status = unsafe {
        UCKeyTranslate(
            layout,
            keycode,
            K_UC_KEY_ACTION_DOWN,
            modifier_state,
            kbd_type,
            K_UC_KEY_TRANSLATE_NO_DEAD_KEYS_MASK,
            &mut dead_key_state,
            buf.len(),
            &mut len,
            buf.as_mut_ptr(),
        )
    };
    if status != 0 || len != 1 {
        return None;
    }
    char::from_u32(u32::from(buf[0]))
}

/// Scans every keycode against none/Shift/Option/Shift+Option and keeps the
/// first key that produces each candidate character.
pub fn build_key_cache(_mtm: MainThreadMarker) -> KeyCache {
    let wanted: std::collections::HashSet<char> = key_cache_candidates().collect();
    let mut cache = KeyCache::with_capacity(wanted.len());

    unsafe {
        let Some((source, layout)) = copy_layout_source() else {
            log::warn!("no Unicode keyboard layout data; every character will use Unicode injection");
            return cache;
        };
        let kbd_type = u32::from(LMGetKbdType());

        'keys: for keycode in 0..MAX_KEYCODE {
            for (state, mask) in MODIFIER_STATES {
                if let Some(ch) = translate(layout, keycode, state, kbd_type) {
                    if wanted.contains(&ch) {
                        cache.entry(ch).or_insert(KeyPlan::new(keycode, mask));
                        if cache.len() == wanted.len() {
                            break 'keys;
                        }
                    }
                }
            }
        }

        CFRelease(source as *const c_void);
    }

    log::info!("keyboard cache built: {} characters mapped", cache.len());
    cache
}
