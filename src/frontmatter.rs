use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("missing metadata")]
    Missing,
    #[error("invalid metadata: {0}")]
    Invalid(String),
    #[error("invalid date '{0}', expected YYYY-MM-DD or RFC 3339")]
    InvalidDate(String),
}

/// Fields every post must declare in its front matter.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Metadata {
    pub title: String,
    #[serde(deserialize_with = "date_text")]
    pub date: String,
    pub tags: Vec<String>,
    pub description: String,
    #[serde(rename = "reading-time", alias = "readingTime", alias = "reading_time")]
    pub reading_time: String,
}

/// Accepts a quoted date or a bare TOML datetime (`date = 2024-01-02`).
fn date_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match toml::Value::deserialize(deserializer)? {
        toml::Value::String(s) => Ok(s),
        toml::Value::Datetime(dt) => Ok(dt.to_string()),
        other => Err(de::Error::custom(format!(
            "invalid type: {}, expected a date",
            other.type_str()
        ))),
    }
}

impl Metadata {
    /// Publication instant used for ordering.
    pub fn published(&self) -> Result<NaiveDateTime, FrontmatterError> {
        let date = self.date.trim();
        if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return Ok(d.and_time(chrono::NaiveTime::MIN));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S") {
            return Ok(dt);
        }
        DateTime::parse_from_rfc3339(date)
            .map(|dt| dt.naive_utc())
            .map_err(|_| FrontmatterError::InvalidDate(self.date.clone()))
    }
}

/// Splits `raw` into its metadata block and markdown body.
///
/// `---` opens YAML front matter, `+++` opens TOML.
pub fn parse_frontmatter(raw: &str) -> Result<(Metadata, String), FrontmatterError> {
    let raw = raw.trim_start_matches('\u{feff}');
    let (delimiter, is_toml) = if raw.starts_with("+++") {
        ("+++", true)
    } else if raw.starts_with("---") {
        ("---", false)
    } else {
        return Err(FrontmatterError::Missing);
    };

    let parts: Vec<&str> = raw.splitn(3, delimiter).collect();
    if parts.len() != 3 {
        return Err(FrontmatterError::Missing);
    }
    let fm_str = parts[1];
    let content = parts[2].trim().to_string();

    let metadata: Metadata = if is_toml {
        toml::from_str(fm_str).map_err(|e| FrontmatterError::Invalid(e.message().to_string()))?
    } else {
        serde_yaml::from_str(fm_str).map_err(|e| FrontmatterError::Invalid(e.to_string()))?
    };

    Ok((metadata, content))
}
