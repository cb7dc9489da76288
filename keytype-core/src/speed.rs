use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::rune_and_line_count;

/// Upper bound for any user-supplied per-character delay.
pub const MAX_CUSTOM_DELAY_MS: u64 = 10_000;

const AUTO_SHORT_TEXT_RUNES: usize = 200;
const AUTO_SHORT_TEXT_LINES: usize = 5;
const AUTO_RUNES_PER_MS: usize = 200;
const AUTO_MIN_MS: u64 = 10;
const AUTO_MAX_MS: u64 = 50;

/// Per-character delay as the engine consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedConfig {
    Auto,
    FixedMs(u64),
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self::Auto
    }
}

impl SpeedConfig {
    pub fn per_char_delay(&self, text: &str) -> Duration {
        match *self {
            Self::Auto => auto_delay(text),
            Self::FixedMs(ms) => Duration::from_millis(ms.min(MAX_CUSTOM_DELAY_MS)),
        }
    }
}

/// Automatic delay: short snippets go out at full speed, longer texts scale
/// with line count or size, bounded so slow console input queues keep up
/// without making big pastes unbearable.
pub fn auto_delay(text: &str) -> Duration {
    let (runes, lines) = rune_and_line_count(text);
    if runes <= AUTO_SHORT_TEXT_RUNES && lines <= AUTO_SHORT_TEXT_LINES {
        return Duration::ZERO;
    }

    let by_lines = lines as u64;
    let by_chars = (runes / AUTO_RUNES_PER_MS) as u64;
    let ms = by_lines.max(by_chars).clamp(AUTO_MIN_MS, AUTO_MAX_MS);
    Duration::from_millis(ms)
}

/// Speed choices as the settings screen stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpeedOption {
    #[default]
    Default,
    Medium,
    Slow,
    SuperSlow,
    Custom,
}

impl SpeedOption {
    pub fn to_config(self, custom_ms: u64) -> SpeedConfig {
        match self {
            Self::Default => SpeedConfig::Auto,
            Self::Medium => SpeedConfig::FixedMs(50),
            Self::Slow => SpeedConfig::FixedMs(100),
            Self::SuperSlow => SpeedConfig::FixedMs(250),
            Self::Custom => SpeedConfig::FixedMs(custom_ms.min(MAX_CUSTOM_DELAY_MS)),
        }
    }
}

/// Lenient parse of the free-form "ms per char" field: blank or anything
/// containing a non-digit yields 0, large values saturate at the maximum.
pub fn custom_delay_ms(input: &str) -> u64 {
    let input = input.trim();
    let mut acc: u64 = 0;
    for ch in input.chars() {
        let Some(d) = ch.to_digit(10) else {
            return 0;
        };
        acc = acc * 10 + u64::from(d);
        if acc > MAX_CUSTOM_DELAY_MS {
            return MAX_CUSTOM_DELAY_MS;
        }
    }
    acc
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid speed {0:?}: expected auto, medium, slow, super-slow or a millisecond count")]
pub struct SpeedParseError(pub String);

impl FromStr for SpeedConfig {
    type Err = SpeedParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let option = match lower.as_str() {
            "auto" | "default" => SpeedOption::Default,
            "medium" => SpeedOption::Medium,
            "slow" => SpeedOption::Slow,
            "super-slow" | "superslow" => SpeedOption::SuperSlow,
            other => {
                let ms = other
                    .strip_suffix("ms")
                    .unwrap_or(other)
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| SpeedParseError(s.to_string()))?;
                return Ok(SpeedOption::Custom.to_config(ms));
            }
        };
        Ok(option.to_config(0))
    }
}
