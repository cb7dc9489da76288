use keytype_core::config::AppConfig;
use keytype_core::layout::AUTO_LAYOUT;
use keytype_core::speed::SpeedConfig;
use keytype_engine::synth::AltGrStyle;

/// Engine parameters for one typing command: stored settings first,
/// command-line flags on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingDefaults {
    pub layout_name: String,
    pub speed: SpeedConfig,
    pub altgr_style: AltGrStyle,
    pub abort_on_focus_change: bool,
}

impl Default for TypingDefaults {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl TypingDefaults {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let layout_name = if cfg.keyboard_layout.trim().is_empty() {
            AUTO_LAYOUT.to_string()
        } else {
            cfg.keyboard_layout.clone()
        };
        Self {
            layout_name,
            speed: cfg.speed_config(),
            altgr_style: AltGrStyle::from_right_alt(cfg.compatibility_mode.uses_right_alt()),
            abort_on_focus_change: cfg.abort_on_focus_change,
        }
    }

    pub fn with_layout(mut self, layout: Option<&str>) -> Self {
        if let Some(name) = layout.map(str::trim).filter(|s| !s.is_empty()) {
            self.layout_name = name.to_string();
        }
        self
    }

    pub fn with_speed(mut self, speed: Option<SpeedConfig>) -> Self {
        if let Some(speed) = speed {
            self.speed = speed;
        }
        self
    }

    /// A `--no-abort` style flag can only switch the check off.
    pub fn without_focus_abort(mut self, disable: bool) -> Self {
        if disable {
            self.abort_on_focus_change = false;
        }
        self
    }
}
