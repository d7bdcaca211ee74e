use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::Settings;
use crate::timer::TimerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    Work,
    Break,
    LongBreak,
}

impl Mode {
    pub fn is_break(self) -> bool {
        matches!(self, Mode::Break | Mode::LongBreak)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Work => "work",
            Mode::Break => "break",
            Mode::LongBreak => "longBreak",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Work => "Work Session",
            Mode::Break => "Short Break",
            Mode::LongBreak => "Long Break",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authoritative session state, mutated only by the session machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub mode: Mode,
    /// Completed work/break cycles.
    pub session_count: u32,
    /// Break variant most recently entered.
    #[serde(default)]
    pub last_break_mode: Option<Mode>,
    /// Extension exercises were already offered during this break.
    #[serde(default)]
    pub break_extension_offered: bool,
    #[serde(default)]
    pub extension_panel_active: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: Mode::Work,
            session_count: 0,
            last_break_mode: None,
            break_extension_offered: false,
            extension_panel_active: false,
        }
    }
}

impl SessionState {
    /// Whether the break that follows the current work interval is long.
    pub fn next_break_is_long(&self, sessions_before_long_break: u32) -> bool {
        is_long_break(self.session_count, sessions_before_long_break)
    }
}

/// `session_count > 0 && (session_count + 1) % sessions_before_long_break == 0`
pub fn is_long_break(session_count: u32, sessions_before_long_break: u32) -> bool {
    sessions_before_long_break > 0
        && session_count > 0
        && (session_count + 1) % sessions_before_long_break == 0
}

/// Validated interval lengths the machine sizes its timers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub work: NonZeroU64,
    pub short_break: NonZeroU64,
    pub long_break: NonZeroU64,
    pub sessions_before_long_break: u32,
}

impl SessionConfig {
    /// Build from minutes.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first zero field.
    pub fn from_minutes(
        work_min: u32,
        break_min: u32,
        long_break_min: u32,
        sessions_before_long_break: u32,
    ) -> Result<Self, ConfigError> {
        let secs = |key: &str, min: u32| {
            NonZeroU64::new(u64::from(min) * 60).ok_or_else(|| ConfigError::InvalidValue {
                key: key.to_string(),
                message: "must be a positive number of minutes".into(),
            })
        };
        if sessions_before_long_break == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sessions_before_long_break".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(Self {
            work: secs("work_duration", work_min)?,
            short_break: secs("break_duration", break_min)?,
            long_break: secs("long_break_duration", long_break_min)?,
            sessions_before_long_break,
        })
    }

    pub fn duration_for(&self, mode: Mode) -> NonZeroU64 {
        match mode {
            Mode::Work => self.work,
            Mode::Break => self.short_break,
            Mode::LongBreak => self.long_break,
        }
    }
}

impl Default for SessionConfig {
    /// 25 / 5 / 15 minutes, long break every fourth session.
    fn default() -> Self {
        Self {
            work: NonZeroU64::MIN.saturating_add(25 * 60 - 1),
            short_break: NonZeroU64::MIN.saturating_add(5 * 60 - 1),
            long_break: NonZeroU64::MIN.saturating_add(15 * 60 - 1),
            sessions_before_long_break: 4,
        }
    }
}

impl TryFrom<&Settings> for SessionConfig {
    type Error = ConfigError;

    fn try_from(settings: &Settings) -> Result<Self, Self::Error> {
        Self::from_minutes(
            settings.work_duration,
            settings.break_duration,
            settings.long_break_duration,
            settings.sessions_before_long_break,
        )
    }
}

/// Everything needed to pick a session back up after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub timer: TimerSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_break_every_fourth_session() {
        assert!(is_long_break(3, 4));
        assert!(!is_long_break(2, 4));
        assert!(!is_long_break(0, 4));
        assert!(is_long_break(7, 4));
        assert!(!is_long_break(4, 4));
    }

    #[test]
    fn first_session_is_never_long() {
        // Even when every break should be long, the very first one is short.
        assert!(!is_long_break(0, 1));
        assert!(is_long_break(1, 1));
    }

    #[test]
    fn config_from_minutes() {
        let cfg = SessionConfig::from_minutes(25, 5, 15, 4).unwrap();
        assert_eq!(cfg.duration_for(Mode::Work).get(), 1500);
        assert_eq!(cfg.duration_for(Mode::Break).get(), 300);
        assert_eq!(cfg.duration_for(Mode::LongBreak).get(), 900);
    }

    #[test]
    fn config_rejects_zero() {
        assert!(matches!(
            SessionConfig::from_minutes(0, 5, 15, 4),
            Err(ConfigError::InvalidValue { key, .. }) if key == "work_duration"
        ));
        assert!(SessionConfig::from_minutes(25, 5, 15, 0).is_err());
    }

    #[test]
    fn default_config_matches_default_settings() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.work.get(), 25 * 60);
        assert_eq!(cfg, SessionConfig::try_from(&Settings::default()).unwrap());
    }

    #[test]
    fn mode_serializes_camel_case() {
        assert_eq!(serde_json::to_string(&Mode::LongBreak).unwrap(), "\"longBreak\"");
    }
}
