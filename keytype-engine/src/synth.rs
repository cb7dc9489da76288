use keytype_core::keys::{KeyPlan, Modifier, ModifierMask, US_ENTER_SCAN_CODE};

use crate::error::PlatformError;
use crate::traits::{KeySink, KeyboardLayouts};

/// How an AltGr requirement is turned into key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AltGrStyle {
    /// One right-hand Alt press; the only form many remote consoles accept.
    #[default]
    RightAlt,
    /// Left Ctrl then left Alt.
    CtrlAlt,
}

impl AltGrStyle {
    pub fn from_right_alt(right_alt: bool) -> Self {
        if right_alt { Self::RightAlt } else { Self::CtrlAlt }
    }
}

/// What one character turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    Enter,
    Mapped(KeyPlan),
    Unicode(char),
}

/// Picks the physical route for `ch`. Characters outside the BMP always go
/// through Unicode injection.
pub fn plan_character<L>(layouts: &L, layout: &L::Layout, ch: char) -> Keystroke
where
    L: KeyboardLayouts + ?Sized,
{
    if ch == '\n' {
        return Keystroke::Enter;
    }
    if u32::from(ch) > 0xFFFF {
        return Keystroke::Unicode(ch);
    }
    match layouts.map_character(ch, layout) {
        Some(plan) => Keystroke::Mapped(plan),
        None => Keystroke::Unicode(ch),
    }
}

fn modifier_sequence(mask: ModifierMask, style: AltGrStyle) -> Vec<Modifier> {
    let mut out = Vec::with_capacity(3);
    for m in mask.press_order() {
        match (m, style) {
            (Modifier::AltGr, AltGrStyle::CtrlAlt) => {
                out.push(Modifier::Control);
                out.push(Modifier::Alt);
            }
            _ => out.push(m),
        }
    }
    out
}

// Releases everything it holds, newest first, when dropped. Release failures
// are logged and skipped so one bad call cannot leave the others stuck.
struct HeldModifiers<'a, S: KeySink + ?Sized> {
    sink: &'a S,
    held: Vec<Modifier>,
}

impl<'a, S: KeySink + ?Sized> HeldModifiers<'a, S> {
    fn new(sink: &'a S) -> Self {
        Self {
            sink,
            held: Vec::with_capacity(3),
        }
    }

    fn press(&mut self, modifier: Modifier) -> Result<(), PlatformError> {
        self.sink.press_modifier(modifier, true)?;
        self.held.push(modifier);
        Ok(())
    }
}

impl<S: KeySink + ?Sized> Drop for HeldModifiers<'_, S> {
    fn drop(&mut self) {
        while let Some(m) = self.held.pop() {
            if let Err(e) = self.sink.press_modifier(m, false) {
                log::warn!("failed to release {m:?}: {e}");
            }
        }
    }
}

/// Presses the plan's modifiers, taps its key, then releases every modifier
/// that went down, even when a press or the tap failed.
pub fn tap_with_modifiers<S>(sink: &S, plan: &KeyPlan, style: AltGrStyle) -> Result<(), PlatformError>
where
    S: KeySink + ?Sized,
{
    let mut held = HeldModifiers::new(sink);
    for m in modifier_sequence(plan.modifiers, style) {
        held.press(m)?;
    }
    sink.tap_key(plan.key, plan.extended)
}

/// Sends a real Enter keystroke; remote consoles often ignore a Unicode newline.
pub fn send_enter<P>(platform: &P, layout: &P::Layout) -> Result<(), PlatformError>
where
    P: KeySink + KeyboardLayouts + ?Sized,
{
    let key = platform
        .enter_key(layout)
        .filter(|k| *k != 0)
        .unwrap_or(US_ENTER_SCAN_CODE);
    platform.tap_key(key, false)
}

/// UTF-16 code units for `ch`; two for characters outside the BMP.
pub fn unicode_units(ch: char) -> impl Iterator<Item = u16> {
    let mut buf = [0u16; 2];
    let len = ch.encode_utf16(&mut buf).len();
    buf.into_iter().take(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Ev {
        Down(Modifier),
        Up(Modifier),
        Tap(u16),
    }

    #[derive(Default)]
    struct Log {
        events: Mutex<Vec<Ev>>,
        fail_tap: bool,
        fail_press: Option<Modifier>,
    }

    impl KeySink for Log {
        fn tap_key(&self, key: u16, _extended: bool) -> Result<(), PlatformError> {
            if self.fail_tap {
                return Err(PlatformError::Os {
                    call: "SendInput",
                    code: 5,
                    message: "access denied".into(),
                });
            }
            self.events.lock().unwrap().push(Ev::Tap(key));
            Ok(())
        }

        fn press_modifier(&self, modifier: Modifier, down: bool) -> Result<(), PlatformError> {
            if down && self.fail_press == Some(modifier) {
                return Err(PlatformError::WindowUnavailable);
            }
            let ev = if down { Ev::Down(modifier) } else { Ev::Up(modifier) };
            self.events.lock().unwrap().push(ev);
            Ok(())
        }

        fn send_unicode_unit(&self, _unit: u16) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    #[test]
    fn altgr_is_one_right_alt_pair() {
        let log = Log::default();
        let plan = KeyPlan::new(0x10, ModifierMask::from_shift_state(0x06));
        tap_with_modifiers(&log, &plan, AltGrStyle::RightAlt).unwrap();
        assert_eq!(
            *log.events.lock().unwrap(),
            vec![Ev::Down(Modifier::AltGr), Ev::Tap(0x10), Ev::Up(Modifier::AltGr)]
        );
    }

    #[test]
    fn ctrl_alt_style_expands_altgr() {
        let log = Log::default();
        let plan = KeyPlan::new(0x12, ModifierMask::SHIFT | ModifierMask::ALTGR);
        tap_with_modifiers(&log, &plan, AltGrStyle::CtrlAlt).unwrap();
        assert_eq!(
            *log.events.lock().unwrap(),
            vec![
                Ev::Down(Modifier::Shift),
                Ev::Down(Modifier::Control),
                Ev::Down(Modifier::Alt),
                Ev::Tap(0x12),
                Ev::Up(Modifier::Alt),
                Ev::Up(Modifier::Control),
                Ev::Up(Modifier::Shift),
            ]
        );
    }

    #[test]
    fn failed_tap_still_releases() {
        let log = Log {
            fail_tap: true,
            ..Log::default()
        };
        let plan = KeyPlan::new(0x1E, ModifierMask::SHIFT);
        assert!(tap_with_modifiers(&log, &plan, AltGrStyle::RightAlt).is_err());
        assert_eq!(
            *log.events.lock().unwrap(),
            vec![Ev::Down(Modifier::Shift), Ev::Up(Modifier::Shift)]
        );
    }

    #[test]
    fn failed_press_releases_only_what_went_down() {
        let log = Log {
            fail_press: Some(Modifier::AltGr),
            ..Log::default()
        };
        let plan = KeyPlan::new(0x10, ModifierMask::SHIFT | ModifierMask::ALTGR);
        assert!(tap_with_modifiers(&log, &plan, AltGrStyle::RightAlt).is_err());
        assert_eq!(
            *log.events.lock().unwrap(),
            vec![Ev::Down(Modifier::Shift), Ev::Up(Modifier::Shift)]
        );
    }

    #[test]
    fn surrogate_pairs_split_into_two_units() {
        assert_eq!(unicode_units('é').collect::<Vec<_>>(), vec![0x00E9]);
        assert_eq!(
            unicode_units('😀').collect::<Vec<_>>(),
            vec![0xD83D, 0xDE00]
        );
    }
}
