use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A language the blog is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ua,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Ua];
    pub const DEFAULT: Language = Language::En;

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ua => "ua",
        }
    }

    /// Order in which post variants are tried for a reader of `self`.
    pub fn fallback_chain(self) -> [Language; 2] {
        match self {
            Language::En => [Language::En, Language::Ua],
            Language::Ua => [Language::Ua, Language::En],
        }
    }

    pub fn toggled(self) -> Language {
        match self {
            Language::En => Language::Ua,
            Language::Ua => Language::En,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized value '{0}'")]
pub struct UnknownValue(pub String);

impl FromStr for Language {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ua" => Ok(Language::Ua),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

/// Color scheme of the rendered site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn name(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Class placed on `<html>`; the dark palette is scoped under `.dark`.
    pub fn html_class(self) -> &'static str {
        match self {
            Theme::Light => "",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    /// Reads the platform's light/dark presentation preference.
    pub fn detect() -> Theme {
        match dark_light::detect() {
            Ok(dark_light::Mode::Dark) => Theme::Dark,
            _ => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(UnknownValue(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parse_is_case_insensitive() {
        assert_eq!("UA".parse::<Language>(), Ok(Language::Ua));
        assert_eq!(" en ".parse::<Language>(), Ok(Language::En));
        assert!("de".parse::<Language>().is_err());
    }

    #[test]
    fn theme_parse_is_exact() {
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert!("Dark".parse::<Theme>().is_err());
    }

    #[test]
    fn unknown_value_names_the_input() {
        let err = "sepia".parse::<Theme>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized value 'sepia'");
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }

    #[test]
    fn fallback_chain_prefers_reader_then_other() {
        assert_eq!(Language::En.fallback_chain(), [Language::En, Language::Ua]);
        assert_eq!(Language::Ua.fallback_chain(), [Language::Ua, Language::En]);
    }
}
