use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Dark => write!(f, "dark"),
            Theme::Light => write!(f, "light"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(format!("Invalid theme '{}'. Valid options: dark, light", s)),
        }
    }
}

/// Widget preferences. These stay on the device and are never synced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: Theme,
    pub palette: String,
    pub opacity: u8,
    pub blur: u8,
    pub sound_enabled: bool,
    pub animations_enabled: bool,
    pub always_on_top: bool,
    pub category_filters_visible: bool,
    /// Pomodoro work session length in minutes.
    pub work_duration: u32,
    pub short_break: u32,
    pub long_break: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            palette: "indigo".to_string(),
            opacity: 100,
            blur: 0,
            sound_enabled: true,
            animations_enabled: true,
            always_on_top: false,
            category_filters_visible: true,
            work_duration: 25,
            short_break: 5,
            long_break: 15,
        }
    }
}

impl Settings {
    /// Sets a setting from its camelCase or snake_case name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .parse()
                .map_err(|_| format!("Invalid value '{}' for {}", value, key))
        }

        match key {
            "theme" => self.theme = value.parse()?,
            "palette" => self.palette = value.to_string(),
            "opacity" => self.opacity = parse::<u8>(key, value)?.clamp(10, 100),
            "blur" => self.blur = parse::<u8>(key, value)?.min(20),
            "soundEnabled" | "sound_enabled" => self.sound_enabled = parse(key, value)?,
            "animationsEnabled" | "animations_enabled" => {
                self.animations_enabled = parse(key, value)?
            }
            "alwaysOnTop" | "always_on_top" => self.always_on_top = parse(key, value)?,
            "categoryFiltersVisible" | "category_filters_visible" => {
                self.category_filters_visible = parse(key, value)?
            }
            "workDuration" | "work_duration" => self.work_duration = parse(key, value)?,
            "shortBreak" | "short_break" => self.short_break = parse(key, value)?,
            "longBreak" | "long_break" => self.long_break = parse(key, value)?,
            _ => return Err(format!("Unknown setting '{}'", key)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.palette, "indigo");
        assert_eq!(settings.opacity, 100);
        assert_eq!(settings.work_duration, 25);
    }

    #[test]
    fn test_set_known_keys() {
        let mut settings = Settings::default();
        settings.set("theme", "light").unwrap();
        settings.set("opacity", "5").unwrap();
        settings.set("work_duration", "50").unwrap();
        settings.set("soundEnabled", "false").unwrap();

        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.opacity, 10);
        assert_eq!(settings.work_duration, 50);
        assert!(!settings.sound_enabled);
    }

    #[test]
    fn test_set_rejects_unknown_and_invalid() {
        let mut settings = Settings::default();
        assert!(settings.set("fontSize", "12").is_err());
        assert!(settings.set("blur", "lots").is_err());
    }
}
