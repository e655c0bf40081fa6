use std::env;

use thiserror::Error;

pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

// Template values operators sometimes forget to replace with real settings.
const PLACEHOLDERS: &[&str] = &[
    "YOUR_CANVAS_DOMAIN_HERE",
    "YOUR_TOKEN_HERE",
    "COURSE_ID_1,COURSE_ID_2",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set (or still holds the sample placeholder)")]
    Missing(&'static str),
    #[error("CANVAS_COURSE_IDS does not contain any course ids")]
    NoCourses,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub base_host: String,
    pub api_token: String,
    pub course_ids: Vec<String>,
    pub lookback_hours: i64,
    pub ungraded_only: bool,
    pub highlight_late: bool,
}

impl Config {
    /// Reads operator settings from the environment. Called fresh at the start
    /// of every top-level operation so edits take effect without a restart.
    pub fn load() -> Result<Self, ConfigError> {
        let base_host = required("CANVAS_BASE_URL")?;
        let api_token = required("CANVAS_API_TOKEN")?;
        let course_ids = split_course_ids(&required("CANVAS_COURSE_IDS")?);
        if course_ids.is_empty() {
            return Err(ConfigError::NoCourses);
        }

        Ok(Self {
            base_host: normalize_host(&base_host),
            api_token,
            course_ids,
            lookback_hours: parse_hours(env::var("LOOKBACK_HOURS").ok().as_deref()),
            ungraded_only: parse_flag(env::var("UNGRADED_ONLY").ok().as_deref()),
            highlight_late: parse_flag(env::var("HIGHLIGHT_LATE").ok().as_deref()),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    let value = env::var(key).map_err(|_| ConfigError::Missing(key))?;
    let value = value.trim().to_string();
    if value.is_empty() || PLACEHOLDERS.contains(&value.as_str()) {
        return Err(ConfigError::Missing(key));
    }
    Ok(value)
}

pub fn normalize_host(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

/// Order is preserved and duplicates are kept; the resolver walks the list
/// exactly as the operator wrote it.
pub fn split_course_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|value| value.trim().to_ascii_lowercase()).as_deref(),
        Some("yes" | "y" | "true")
    )
}

pub fn parse_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|hours| *hours > 0)
        .unwrap_or(DEFAULT_LOOKBACK_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_loses_scheme_and_trailing_slash() {
        assert_eq!(
            normalize_host("https://school.instructure.com/"),
            "school.instructure.com"
        );
        assert_eq!(
            normalize_host("http://school.instructure.com"),
            "school.instructure.com"
        );
        assert_eq!(
            normalize_host("school.instructure.com"),
            "school.instructure.com"
        );
    }

    #[test]
    fn course_ids_are_trimmed_in_order_with_duplicates() {
        let ids = split_course_ids(" 120, 121 ,,120, ");
        assert_eq!(ids, vec!["120", "121", "120"]);
    }

    #[test]
    fn empty_course_list_yields_nothing() {
        assert!(split_course_ids(" , ,").is_empty());
    }

    #[test]
    fn flags_match_yes_y_true_case_insensitively() {
        assert!(parse_flag(Some("yes")));
        assert!(parse_flag(Some("Y")));
        assert!(parse_flag(Some("TRUE")));
        assert!(!parse_flag(Some("no")));
        assert!(!parse_flag(Some("1")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn lookback_falls_back_to_default() {
        assert_eq!(parse_hours(Some("48")), 48);
        assert_eq!(parse_hours(Some("not a number")), DEFAULT_LOOKBACK_HOURS);
        assert_eq!(parse_hours(Some("-3")), DEFAULT_LOOKBACK_HOURS);
        assert_eq!(parse_hours(None), DEFAULT_LOOKBACK_HOURS);
    }
}
