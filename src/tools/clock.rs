//! Clock tool
//!
//! Reports the current time in the configured format for a requested IANA
//! timezone, the configured default timezone, or local time. An unknown
//! timezone falls back to local time rather than failing.

use super::{Sentinels, ToolExecutor, ToolResult, CLOCK_TOOL};
use crate::config::ToolsConfig;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt::{Display, Write};

const TIME_SENTINEL: &str =
    "The flow of moments became momentarily obscured; I could not determine the current time.";

/// Sentinels rendered when the time cannot be determined
pub const CLOCK_SENTINELS: Sentinels = Sentinels {
    no_information: TIME_SENTINEL,
    error: TIME_SENTINEL,
};

/// Format used when the configured one cannot be rendered
pub const FALLBACK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Place names recognized in free text, mapped to IANA zones
const PLACES: &[(&str, &str)] = &[
    ("tokyo", "Asia/Tokyo"),
    ("japan", "Asia/Tokyo"),
    ("kyoto", "Asia/Tokyo"),
    ("osaka", "Asia/Tokyo"),
    ("seoul", "Asia/Seoul"),
    ("beijing", "Asia/Shanghai"),
    ("shanghai", "Asia/Shanghai"),
    ("hong kong", "Asia/Hong_Kong"),
    ("singapore", "Asia/Singapore"),
    ("mumbai", "Asia/Kolkata"),
    ("delhi", "Asia/Kolkata"),
    ("india", "Asia/Kolkata"),
    ("dubai", "Asia/Dubai"),
    ("moscow", "Europe/Moscow"),
    ("istanbul", "Europe/Istanbul"),
    ("berlin", "Europe/Berlin"),
    ("paris", "Europe/Paris"),
    ("madrid", "Europe/Madrid"),
    ("rome", "Europe/Rome"),
    ("amsterdam", "Europe/Amsterdam"),
    ("london", "Europe/London"),
    ("dublin", "Europe/Dublin"),
    ("new york", "America/New_York"),
    ("chicago", "America/Chicago"),
    ("denver", "America/Denver"),
    ("los angeles", "America/Los_Angeles"),
    ("san francisco", "America/Los_Angeles"),
    ("seattle", "America/Los_Angeles"),
    ("toronto", "America/Toronto"),
    ("mexico city", "America/Mexico_City"),
    ("sao paulo", "America/Sao_Paulo"),
    ("sydney", "Australia/Sydney"),
    ("melbourne", "Australia/Melbourne"),
    ("auckland", "Pacific/Auckland"),
    ("utc", "UTC"),
    ("gmt", "Etc/GMT"),
];

/// Parse an IANA timezone name
///
/// # Examples
///
/// ```
/// use aizen::tools::clock::resolve_timezone;
///
/// assert!(resolve_timezone("Asia/Tokyo").is_some());
/// assert!(resolve_timezone("Middle/Earth").is_none());
/// ```
pub fn resolve_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Find a timezone named in free text
///
/// Recognizes literal IANA names ("Europe/Paris") and a table of common
/// cities and countries ("time in Tokyo").
///
/// # Examples
///
/// ```
/// use aizen::tools::clock::find_timezone_in;
///
/// assert_eq!(find_timezone_in("what time is it in Tokyo?"), Some("Asia/Tokyo".to_string()));
/// assert_eq!(find_timezone_in("current time in America/Denver"), Some("America/Denver".to_string()));
/// assert_eq!(find_timezone_in("what time is it?"), None);
/// ```
pub fn find_timezone_in(text: &str) -> Option<String> {
    for word in text.split_whitespace() {
        let candidate = word.trim_matches(|c: char| !(c.is_alphanumeric() || c == '/' || c == '_'));
        if candidate.contains('/') {
            if let Some(tz) = resolve_timezone(candidate) {
                return Some(tz.name().to_string());
            }
        }
    }

    let lowered = format!(" {} ", text.to_lowercase().replace(|c: char| !c.is_alphanumeric(), " "));
    PLACES
        .iter()
        .find(|(place, _)| lowered.contains(&format!(" {} ", place)))
        .map(|(_, zone)| zone.to_string())
}

#[derive(Debug, Default, Deserialize)]
struct ClockArgs {
    #[serde(default)]
    timezone: Option<String>,
}

/// Current-time tool
pub struct ClockTool {
    time_format: String,
    default_timezone: Option<String>,
}

impl ClockTool {
    /// Create a clock using the tool configuration
    pub fn new(config: &ToolsConfig) -> Self {
        Self {
            time_format: config.time_format.clone(),
            default_timezone: config.timezone.clone(),
        }
    }

    /// The current time for the requested (or default) timezone
    pub fn current_time(&self, timezone: Option<&str>) -> ToolResult {
        self.time_at(Utc::now(), timezone)
    }

    /// The given instant rendered for the requested (or default) timezone
    pub fn time_at(&self, instant: DateTime<Utc>, timezone: Option<&str>) -> ToolResult {
        let requested = timezone
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
            .or(self.default_timezone.as_deref());

        match requested.map(|name| (name, resolve_timezone(name))) {
            Some((_, Some(tz))) => render(&instant.with_timezone(&tz), &[&self.time_format]),
            Some((name, None)) => {
                tracing::warn!("Unknown timezone {}, using local time", name);
                render(&instant.with_timezone(&Local), &[&self.time_format])
            }
            None => render(&instant.with_timezone(&Local), &[&self.time_format]),
        }
    }
}

/// Render with each format in turn, then the fallback format
fn render<Z>(instant: &DateTime<Z>, formats: &[&str]) -> ToolResult
where
    Z: TimeZone,
    Z::Offset: Display,
{
    formats
        .iter()
        .chain(std::iter::once(&FALLBACK_TIME_FORMAT))
        .find_map(|format| {
            let rendered = try_format(instant, format);
            if rendered.is_none() {
                tracing::warn!("Time format {:?} could not be rendered", format);
            }
            rendered
        })
        .map(ToolResult::found)
        .unwrap_or_else(|| ToolResult::error("time formatting failed"))
}

fn try_format<Z>(instant: &DateTime<Z>, format: &str) -> Option<String>
where
    Z: TimeZone,
    Z::Offset: Display,
{
    let mut out = String::new();
    write!(out, "{}", instant.format(format)).ok()?;
    Some(out)
}

#[async_trait]
impl ToolExecutor for ClockTool {
    fn tool_definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": CLOCK_TOOL,
            "description": "Returns the current time in a human-readable format. Use when the user asks for the current time.",
            "parameters": {
                "type": "object",
                "properties": {
                    "timezone": {
                        "type": "string",
                        "description": "Optional IANA timezone, e.g. \"Asia/Tokyo\". Defaults to local time."
                    }
                }
            }
        })
    }

    fn sentinels(&self) -> &'static Sentinels {
        &CLOCK_SENTINELS
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolResult> {
        let args: ClockArgs = if args.is_null() {
            ClockArgs::default()
        } else {
            serde_json::from_value(args)?
        };
        Ok(self.current_time(args.timezone.as_deref()))
    }
}
