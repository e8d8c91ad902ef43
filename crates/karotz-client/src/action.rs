//! Device commands.
//!
//! Each command knows its endpoint, its query parameters and roughly how long the device
//! will be busy with it. The duration is an estimate used by callers to avoid closing the
//! session while the device is still speaking or fading.

use std::fmt;
use std::time::Duration;

use crate::config::Endpoint;

/// Approximate time the device needs to pronounce one character.
pub const LETTER_DURATION: Duration = Duration::from_millis(120);
/// Time for the ears to complete a movement or a reset.
pub const EAR_MOVE_DURATION: Duration = Duration::from_millis(2_500);
pub const DEFAULT_LANGUAGE: &str = "EN";

/// Hex RGB colour understood by the LED endpoint. Not validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedColor(String);

impl LedColor {
    pub const RED: &'static str = "FF0000";
    pub const GREEN: &'static str = "00FF00";
    pub const BLUE: &'static str = "0000FF";
    pub const YELLOW: &'static str = "FFFF00";
    pub const OFF: &'static str = "000000";

    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn red() -> Self {
        Self::new(Self::RED)
    }

    pub fn green() -> Self {
        Self::new(Self::GREEN)
    }

    pub fn blue() -> Self {
        Self::new(Self::BLUE)
    }

    pub fn yellow() -> Self {
        Self::new(Self::YELLOW)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EarMove {
    Reset,
    /// Positions are absolute unless `relative` is set; `None` leaves that ear alone.
    Move {
        left: Option<i32>,
        right: Option<i32>,
        relative: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Speak { text: String, lang: String },
    LedLight { color: LedColor },
    LedFade { color: LedColor, period: Duration },
    LedPulse {
        color: LedColor,
        period: Duration,
        pulse: Duration,
    },
    LedOff,
    Ears(EarMove),
}

/// Endpoint, parameters and expected duration of one command, before the session token is
/// attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub endpoint: Endpoint,
    pub params: Vec<(&'static str, String)>,
    pub expected_duration: Duration,
}

impl ActionRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }
}

impl Action {
    pub fn speak(text: impl Into<String>) -> Self {
        Self::speak_in(text, DEFAULT_LANGUAGE)
    }

    pub fn speak_in(text: impl Into<String>, lang: impl Into<String>) -> Self {
        Action::Speak {
            text: text.into(),
            lang: lang.into(),
        }
    }

    pub fn light(color: LedColor) -> Self {
        Action::LedLight { color }
    }

    pub fn fade(color: LedColor, period: Duration) -> Self {
        Action::LedFade { color, period }
    }

    pub fn pulse(color: LedColor, period: Duration, pulse: Duration) -> Self {
        Action::LedPulse {
            color,
            period,
            pulse,
        }
    }

    pub fn reset_ears() -> Self {
        Action::Ears(EarMove::Reset)
    }

    pub fn move_ears(left: Option<i32>, right: Option<i32>, relative: bool) -> Self {
        Action::Ears(EarMove::Move {
            left,
            right,
            relative,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Speak { .. } => "speak",
            Action::LedLight { .. } => "light",
            Action::LedFade { .. } => "fade",
            Action::LedPulse { .. } => "pulse",
            Action::LedOff => "off",
            Action::Ears(_) => "ears",
        }
    }

    pub fn request(&self) -> ActionRequest {
        match self {
            Action::Speak { text, lang } => ActionRequest {
                endpoint: Endpoint::Tts,
                params: vec![
                    ("action", "speak".into()),
                    ("lang", lang.clone()),
                    ("text", text.clone()),
                ],
                expected_duration: LETTER_DURATION * text.chars().count() as u32,
            },
            Action::LedLight { color } => ActionRequest {
                endpoint: Endpoint::Led,
                params: vec![("action", "light".into()), ("color", color.to_string())],
                expected_duration: Duration::ZERO,
            },
            Action::LedFade { color, period } => ActionRequest {
                endpoint: Endpoint::Led,
                params: vec![
                    ("action", "fade".into()),
                    ("color", color.to_string()),
                    ("period", period.as_millis().to_string()),
                ],
                expected_duration: *period,
            },
            Action::LedPulse {
                color,
                period,
                pulse,
            } => ActionRequest {
                endpoint: Endpoint::Led,
                params: vec![
                    ("action", "pulse".into()),
                    ("color", color.to_string()),
                    ("period", period.as_millis().to_string()),
                    ("pulse", pulse.as_millis().to_string()),
                ],
                expected_duration: *period,
            },
            Action::LedOff => ActionRequest {
                endpoint: Endpoint::Led,
                params: vec![("action", "light".into()), ("color", LedColor::OFF.into())],
                expected_duration: Duration::ZERO,
            },
            Action::Ears(EarMove::Reset) => ActionRequest {
                endpoint: Endpoint::Ears,
                params: vec![("reset", "true".into())],
                expected_duration: EAR_MOVE_DURATION,
            },
            Action::Ears(EarMove::Move {
                left,
                right,
                relative,
            }) => {
                let mut params = Vec::with_capacity(3);
                if let Some(left) = left {
                    params.push(("left", left.to_string()));
                }
                if let Some(right) = right {
                    params.push(("right", right.to_string()));
                }
                params.push(("relative", relative.to_string()));
                ActionRequest {
                    endpoint: Endpoint::Ears,
                    params,
                    expected_duration: EAR_MOVE_DURATION,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speak_parameters_and_duration() {
        let request = Action::speak_in("text", "EN").request();
        assert_eq!(request.endpoint, Endpoint::Tts);
        assert_eq!(request.params.len(), 3);
        assert_eq!(request.param("action"), Some("speak"));
        assert_eq!(request.param("text"), Some("text"));
        assert_eq!(request.param("lang"), Some("EN"));
        assert_eq!(request.expected_duration, Duration::from_millis(480));
    }

    #[test]
    fn speak_duration_counts_characters_not_bytes() {
        let request = Action::speak("Ángel").request();
        assert_eq!(request.expected_duration, Duration::from_millis(600));
        assert_eq!(request.param("lang"), Some(DEFAULT_LANGUAGE));
    }

    #[test]
    fn empty_text_is_passed_through() {
        let request = Action::speak("").request();
        assert_eq!(request.param("text"), Some(""));
        assert_eq!(request.expected_duration, Duration::ZERO);
    }

    #[test]
    fn fade_parameters() {
        let request = Action::fade(LedColor::new("FF0000"), Duration::from_millis(1000)).request();
        assert_eq!(request.endpoint, Endpoint::Led);
        assert_eq!(request.params.len(), 3);
        assert_eq!(request.param("action"), Some("fade"));
        assert_eq!(request.param("color"), Some("FF0000"));
        assert_eq!(request.param("period"), Some("1000"));
        assert_eq!(request.expected_duration, Duration::from_secs(1));
    }

    #[test]
    fn preset_colors_match_hex_values() {
        let request = Action::fade(LedColor::red(), Duration::from_millis(1000)).request();
        assert_eq!(request.param("color"), Some("FF0000"));
        assert_eq!(LedColor::green().as_str(), "00FF00");
        assert_eq!(LedColor::blue().as_str(), "0000FF");
        assert_eq!(LedColor::yellow().as_str(), "FFFF00");
    }

    #[test]
    fn pulse_and_off_use_led_endpoint() {
        let pulse = Action::pulse(
            LedColor::blue(),
            Duration::from_millis(3000),
            Duration::from_millis(500),
        )
        .request();
        assert_eq!(pulse.param("action"), Some("pulse"));
        assert_eq!(pulse.param("pulse"), Some("500"));
        assert_eq!(pulse.expected_duration, Duration::from_secs(3));

        let off = Action::LedOff.request();
        assert_eq!(off.endpoint, Endpoint::Led);
        assert_eq!(off.param("action"), Some("light"));
        assert_eq!(off.param("color"), Some("000000"));
        assert_eq!(off.expected_duration, Duration::ZERO);
    }

    #[test]
    fn ear_reset_and_move() {
        let reset = Action::reset_ears().request();
        assert_eq!(reset.endpoint, Endpoint::Ears);
        assert_eq!(reset.params, vec![("reset", "true".to_string())]);
        assert_eq!(reset.expected_duration, EAR_MOVE_DURATION);

        let moved = Action::move_ears(Some(3), None, true).request();
        assert_eq!(moved.param("left"), Some("3"));
        assert_eq!(moved.param("right"), None);
        assert_eq!(moved.param("relative"), Some("true"));
    }
}
