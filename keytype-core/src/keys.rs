use std::ops::BitOr;

/// Set-1 scan code of Enter on a US keyboard; used when a layout cannot map VK_RETURN.
pub const US_ENTER_SCAN_CODE: u16 = 0x1C;

/// One logical modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Shift,
    Control,
    Alt,
    /// Ctrl+Alt as a single key. Synthesized as the right-hand Alt.
    AltGr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierMask(u8);

impl ModifierMask {
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(0x01);
    pub const CONTROL: Self = Self(0x02);
    pub const ALT: Self = Self(0x04);
    pub const ALTGR: Self = Self(0x08);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Decodes the shift-state byte of a `VkKeyScanEx` result
    /// (bit 0 Shift, bit 1 Ctrl, bit 2 Alt).
    ///
    /// Ctrl and Alt together mean AltGr and collapse into that one modifier.
    pub fn from_shift_state(state: u8) -> Self {
        let mut mask = Self::NONE;
        if state & 0x01 != 0 {
            mask = mask | Self::SHIFT;
        }
        if state & 0x06 == 0x06 {
            mask = mask | Self::ALTGR;
        } else {
            if state & 0x02 != 0 {
                mask = mask | Self::CONTROL;
            }
            if state & 0x04 != 0 {
                mask = mask | Self::ALT;
            }
        }
        mask
    }

    /// Modifiers in press order: Shift first, then Ctrl/Alt or the AltGr composite.
    pub fn press_order(self) -> Vec<Modifier> {
        let mut out = Vec::with_capacity(3);
        if self.contains(Self::SHIFT) {
            out.push(Modifier::Shift);
        }
        if self.contains(Self::ALTGR) {
            out.push(Modifier::AltGr);
        } else {
            if self.contains(Self::CONTROL) {
                out.push(Modifier::Control);
            }
            if self.contains(Self::ALT) {
                out.push(Modifier::Alt);
            }
        }
        out
    }
}

impl BitOr for ModifierMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// How to produce one character physically: a key identity (scan code on
/// Windows, virtual keycode on macOS) plus the modifiers to hold around it.
///
/// Characters without a physical mapping have no plan at all and go through
/// Unicode injection instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPlan {
    pub key: u16,
    /// Windows "extended key" flag (navigation/editing keys that alias numpad codes).
    pub extended: bool,
    pub modifiers: ModifierMask,
}

impl KeyPlan {
    pub fn new(key: u16, modifiers: ModifierMask) -> Self {
        Self {
            key,
            extended: false,
            modifiers,
        }
    }

    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_alt_decodes_as_altgr() {
        let mask = ModifierMask::from_shift_state(0x06);
        assert_eq!(mask, ModifierMask::ALTGR);
        assert_eq!(mask.press_order(), vec![Modifier::AltGr]);
    }

    #[test]
    fn shift_altgr_keeps_shift_first() {
        let mask = ModifierMask::from_shift_state(0x07);
        assert_eq!(mask.press_order(), vec![Modifier::Shift, Modifier::AltGr]);
    }

    #[test]
    fn individual_ctrl_and_alt() {
        assert_eq!(
            ModifierMask::from_shift_state(0x02).press_order(),
            vec![Modifier::Control]
        );
        assert_eq!(
            ModifierMask::from_shift_state(0x05).press_order(),
            vec![Modifier::Shift, Modifier::Alt]
        );
        assert!(ModifierMask::from_shift_state(0).is_empty());
    }
}
