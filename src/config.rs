//! Configuration for palm-guard, built from the command line.

use crate::core::DEFAULT_SUPPRESSION_WINDOW;
use std::time::Duration;

/// Main configuration for the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Hardware ids to resolve devices by; `None` learns them from events
    pub descriptors: Option<DeviceDescriptors>,

    /// How long trackpad events are dropped after a keystroke
    pub suppression_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            descriptors: None,
            suppression_window: DEFAULT_SUPPRESSION_WINDOW,
        }
    }
}

impl Config {
    /// Build a configuration from the positional arguments.
    ///
    /// Descriptors come as a pair (trackpad first). The window is parsed
    /// leniently, see [`parse_window_ms`].
    pub fn from_args(
        trackpad: Option<String>,
        keyboard: Option<String>,
        window_ms: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let descriptors = match (trackpad, keyboard) {
            (Some(trackpad), Some(keyboard)) => Some(DeviceDescriptors { trackpad, keyboard }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingKeyboardId),
            (None, Some(_)) => return Err(ConfigError::MissingTrackpadId),
        };

        let suppression_window = window_ms
            .map(|text| Duration::from_millis(u64::from(parse_window_ms(text))))
            .unwrap_or(DEFAULT_SUPPRESSION_WINDOW);

        Ok(Self {
            descriptors,
            suppression_window,
        })
    }
}

/// Expected hardware ids of the two tracked devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptors {
    pub trackpad: String,
    pub keyboard: String,
}

/// Parse a window length the way C's `atoi` does: optional leading
/// whitespace and sign, then as many digits as there are. Anything without
/// digits is 0, negative values clamp to 0, overflow saturates at
/// `u32::MAX` (about 49 days).
pub fn parse_window_ms(text: &str) -> u32 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u32, |acc, d| {
            acc.saturating_mul(10).saturating_add(u32::from(d - b'0'))
        });

    if negative {
        0
    } else {
        value
    }
}

/// Whether `parse_window_ms` used the whole text.
pub fn is_clean_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingKeyboardId,
    MissingTrackpadId,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingKeyboardId => {
                write!(f, "A keyboard hardware id is required after the trackpad id")
            }
            ConfigError::MissingTrackpadId => write!(f, "A trackpad hardware id is required"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.suppression_window, Duration::from_millis(300));
        assert!(config.descriptors.is_none());
    }

    #[test]
    fn test_from_args() {
        let config = Config::from_args(
            Some("HID\\VID_04F3".to_string()),
            Some("ACPI\\VEN_ATML".to_string()),
            Some("250"),
        )
        .unwrap();

        let descriptors = config.descriptors.unwrap();
        assert_eq!(descriptors.trackpad, "HID\\VID_04F3");
        assert_eq!(descriptors.keyboard, "ACPI\\VEN_ATML");
        assert_eq!(config.suppression_window, Duration::from_millis(250));

        let config = Config::from_args(None, None, None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_descriptors_come_in_pairs() {
        assert_eq!(
            Config::from_args(Some("PAD".to_string()), None, None),
            Err(ConfigError::MissingKeyboardId)
        );
        assert_eq!(
            Config::from_args(None, Some("KBD".to_string()), None),
            Err(ConfigError::MissingTrackpadId)
        );
    }

    #[test]
    fn test_window_parsing() {
        assert_eq!(parse_window_ms("300"), 300);
        assert_eq!(parse_window_ms("  150"), 150);
        assert_eq!(parse_window_ms("+90"), 90);
        assert_eq!(parse_window_ms("500ms"), 500);
        assert_eq!(parse_window_ms("fast"), 0);
        assert_eq!(parse_window_ms(""), 0);
        assert_eq!(parse_window_ms("-20"), 0);
        assert_eq!(parse_window_ms("99999999999999999999999"), u32::MAX);

        assert!(is_clean_number("300"));
        assert!(!is_clean_number("500ms"));
        assert!(!is_clean_number(""));
    }
}
