use crate::layout::AUTO_LAYOUT;
use crate::speed::{MAX_CUSTOM_DELAY_MS, SpeedConfig, SpeedOption};
use serde::{Deserialize, Serialize};

/// How AltGr characters are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompatibilityMode {
    /// Same as `ForceOn` today.
    #[default]
    Auto,
    /// Right-hand Alt scan code, which remote consoles recognise as AltGr.
    ForceOn,
    /// Left Ctrl plus left Alt pressed individually.
    ForceOff,
}

impl CompatibilityMode {
    pub fn uses_right_alt(self) -> bool {
        !matches!(self, Self::ForceOff)
    }
}

/// Settings the surrounding application persists between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub default_speed_option: SpeedOption,
    pub custom_speed_ms: u64,
    pub keyboard_layout: String,
    pub compatibility_mode: CompatibilityMode,
    pub abort_on_focus_change: bool,

    // Interface language; empty means follow the system. Not read by the engine.
    pub language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_speed_option: SpeedOption::Default,
            custom_speed_ms: 0,
            keyboard_layout: AUTO_LAYOUT.into(),
            compatibility_mode: CompatibilityMode::Auto,
            abort_on_focus_change: true,
            language: String::new(),
        }
    }
}

impl AppConfig {
    /// Replaces out-of-range or blank values with their defaults.
    pub fn normalized(mut self) -> Self {
        self.custom_speed_ms = self.custom_speed_ms.min(MAX_CUSTOM_DELAY_MS);
        if self.keyboard_layout.trim().is_empty() {
            self.keyboard_layout = AUTO_LAYOUT.into();
        }
        self
    }

    pub fn speed_config(&self) -> SpeedConfig {
        self.default_speed_option.to_config(self.custom_speed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&AppConfig::default()).unwrap();
        assert!(json.contains("\"defaultSpeedOption\":\"default\""));
        assert!(json.contains("\"abortOnFocusChange\":true"));
        assert!(json.contains("\"compatibilityMode\":\"auto\""));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"defaultSpeedOption":"superSlow"}"#).unwrap();
        assert_eq!(cfg.default_speed_option, SpeedOption::SuperSlow);
        assert_eq!(cfg.keyboard_layout, AUTO_LAYOUT);
        assert!(cfg.abort_on_focus_change);
        assert_eq!(cfg.speed_config(), SpeedConfig::FixedMs(250));
    }

    #[test]
    fn normalization_clamps_and_fills() {
        let cfg = AppConfig {
            custom_speed_ms: 50_000,
            keyboard_layout: " ".into(),
            ..AppConfig::default()
        }
        .normalized();
        assert_eq!(cfg.custom_speed_ms, MAX_CUSTOM_DELAY_MS);
        assert_eq!(cfg.keyboard_layout, AUTO_LAYOUT);
    }
}
