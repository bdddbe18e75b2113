//! Per-topic availability windows.
//!
//! A topic accepts messages only inside its time-of-day window, evaluated in
//! UTC, and optionally only on certain weekdays. Windows whose start is not
//! before their end wrap past midnight.

use crate::config::TopicConfig;
use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use thiserror::Error;

const TIME_FORMAT: &str = "%H:%M";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("invalid {field} '{value}' for topic {topic}: expected HH:MM")]
    InvalidTime {
        topic: String,
        field: &'static str,
        value: String,
    },
}

/// A parsed availability window for one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub days_of_week: Vec<String>,
}

impl TopicWindow {
    /// Parses the topic's "HH:MM" start and end times.
    pub fn from_topic(topic: &TopicConfig) -> Result<Self, WindowError> {
        Ok(Self {
            start: parse_time_of_day(&topic.name, "start_time", &topic.start_time)?,
            end: parse_time_of_day(&topic.name, "end_time", &topic.end_time)?,
            days_of_week: topic.days_of_week.clone(),
        })
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        is_topic_available(self.start, self.end, now, &self.days_of_week)
    }
}

fn parse_time_of_day(
    topic: &str,
    field: &'static str,
    value: &str,
) -> Result<NaiveTime, WindowError> {
    let invalid = || WindowError::InvalidTime {
        topic: topic.to_string(),
        field,
        value: value.to_string(),
    };
    if value.contains(char::is_whitespace) {
        return Err(invalid());
    }
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| invalid())
}

/// Decides whether a topic is available at `now`.
///
/// `start` and `end` are times of day as parsed from "HH:MM". Both bounds
/// are exclusive. A non-empty `days_of_week` must contain the current weekday
/// name (case-insensitive).
pub fn is_topic_available(
    start: NaiveTime,
    end: NaiveTime,
    now: DateTime<Utc>,
    days_of_week: &[String],
) -> bool {
    if !days_of_week.is_empty() {
        let today = weekday_name(now.weekday());
        if !days_of_week.iter().any(|day| day.eq_ignore_ascii_case(today)) {
            return false;
        }
    }

    let current = now.time();

    if start < end {
        current > start && current < end
    } else {
        current > start || current < end
    }
}

/// Full English weekday name, e.g. "Monday".
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
