// src/timesheet.rs
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

// --- Weekly Targets ---

pub const TARGET_HOURS: f64 = 40.0;
pub const TARGET_DAYS: u32 = 5;

// Task label applied when the submitter leaves the field empty.
pub const DEFAULT_TASK: &str = "Unspecified";

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShiftError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("Malformed {field} '{value}': expected HH:MM (24-hour clock)")]
    MalformedTime { field: &'static str, value: String },
    #[error("Malformed date '{value}': expected YYYY-MM-DD")]
    MalformedDate { value: String },
    #[error("End time {end} must be after start time {start} (overnight shifts are not supported)")]
    EndNotAfterStart { start: String, end: String },
}

// --- Wire Serialization Helpers ---

/// Serde adapter for minute-resolution clock times on the wire ("HH:MM").
pub mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&value, "%H:%M").map_err(serde::de::Error::custom)
    }
}

// --- Core Data Structures ---

/// A persisted work shift. `duration_hours` is always derived from the
/// start/end pair; clients never set it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub id: String,
    #[serde(rename = "user_id")]
    pub owner_id: String,
    pub date: NaiveDate,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    pub task: String,
    #[serde(default)]
    pub comment: String,
    pub duration_hours: f64,
}

/// Submission payload for a new shift. Date and the two times are required;
/// task and comment fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewShift {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub task: Option<String>,
    pub comment: Option<String>,
}

/// Partial update for an existing shift. Any provided field replaces the
/// stored one; the duration is re-derived from the resulting time pair.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShiftPatch {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub task: Option<String>,
    pub comment: Option<String>,
}

/// A fully validated shift submission, ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedShift {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub task: String,
    pub comment: String,
    pub duration_hours: f64,
}

/// Weekly rollup for a single owner, recomputed in full from the current
/// shift set on every query. Never stored, never patched incrementally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimesheetSummary {
    pub total_hours: f64,
    pub total_days: usize,
    pub completion_percentage: f64,
    pub target_hours: f64,
    pub target_days: u32,
}

// --- Duration Calculator ---

pub fn parse_clock_time(field: &'static str, value: &str) -> Result<NaiveTime, ShiftError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| ShiftError::MalformedTime {
        field,
        value: value.to_string(),
    })
}

pub fn parse_shift_date(value: &str) -> Result<NaiveDate, ShiftError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ShiftError::MalformedDate {
        value: value.to_string(),
    })
}

/// Elapsed hours between two same-day clock times at minute resolution.
/// Pure arithmetic; a non-positive result denotes an invalid (or overnight)
/// pair and callers must reject it before persisting.
pub fn duration_hours(start: NaiveTime, end: NaiveTime) -> f64 {
    let start_minutes = (start.hour() * 60 + start.minute()) as i64;
    let end_minutes = (end.hour() * 60 + end.minute()) as i64;
    (end_minutes - start_minutes) as f64 / 60.0
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, ShiftError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ShiftError::MissingField { field }),
    }
}

fn task_or_default(task: Option<&str>) -> String {
    match task {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_TASK.to_string(),
    }
}

fn check_positive_duration(start: NaiveTime, end: NaiveTime) -> Result<f64, ShiftError> {
    let hours = duration_hours(start, end);
    if hours <= 0.0 {
        return Err(ShiftError::EndNotAfterStart {
            start: start.format("%H:%M").to_string(),
            end: end.format("%H:%M").to_string(),
        });
    }
    Ok(hours)
}

pub fn validate_new_shift(draft: &NewShift) -> Result<ValidatedShift, ShiftError> {
    let date = parse_shift_date(required("date", &draft.date)?)?;
    let start_time = parse_clock_time("start_time", required("start_time", &draft.start_time)?)?;
    let end_time = parse_clock_time("end_time", required("end_time", &draft.end_time)?)?;
    let duration_hours = check_positive_duration(start_time, end_time)?;

    Ok(ValidatedShift {
        date,
        start_time,
        end_time,
        task: task_or_default(draft.task.as_deref()),
        comment: draft.comment.clone().unwrap_or_default(),
        duration_hours,
    })
}

/// Applies a partial update on top of an existing record and re-derives the
/// duration from the resulting start/end pair.
pub fn apply_shift_patch(record: &ShiftRecord, patch: &ShiftPatch) -> Result<ShiftRecord, ShiftError> {
    let date = match patch.date.as_deref() {
        Some(v) => parse_shift_date(v)?,
        None => record.date,
    };
    let start_time = match patch.start_time.as_deref() {
        Some(v) => parse_clock_time("start_time", v)?,
        None => record.start_time,
    };
    let end_time = match patch.end_time.as_deref() {
        Some(v) => parse_clock_time("end_time", v)?,
        None => record.end_time,
    };
    let duration_hours = check_positive_duration(start_time, end_time)?;

    Ok(ShiftRecord {
        id: record.id.clone(),
        owner_id: record.owner_id.clone(),
        date,
        start_time,
        end_time,
        task: match patch.task.as_deref() {
            Some(t) => task_or_default(Some(t)),
            None => record.task.clone(),
        },
        comment: match patch.comment.clone() {
            Some(c) => c,
            None => record.comment.clone(),
        },
        duration_hours,
    })
}

// --- Timesheet Aggregator ---

/// Computes the weekly summary for one owner's shift set: total hours,
/// distinct worked days, and completion against the 40h/5d targets.
pub fn summarize(shifts: &[ShiftRecord]) -> TimesheetSummary {
    let total_hours: f64 = shifts.iter().map(|s| s.duration_hours).sum();
    let distinct_days: HashSet<NaiveDate> = shifts.iter().map(|s| s.date).collect();
    // Overtime never reports above 100%.
    let completion_percentage = ((total_hours / TARGET_HOURS) * 100.0).min(100.0);

    TimesheetSummary {
        total_hours,
        total_days: distinct_days.len(),
        completion_percentage,
        target_hours: TARGET_HOURS,
        target_days: TARGET_DAYS,
    }
}

/// Completion is a pure function of the summary, re-derived by every
/// consumer rather than stored.
pub fn is_complete(summary: &TimesheetSummary) -> bool {
    summary.completion_percentage >= 100.0
}

#[cfg(test)]
mod timesheet_tests {
    use super::*;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn t(time_str: &str) -> NaiveTime {
        NaiveTime::parse_from_str(time_str, "%H:%M")
            .unwrap_or_else(|_| panic!("Invalid time string format: {}", time_str))
    }

    fn shift_on(date_str: &str, hours: f64) -> ShiftRecord {
        ShiftRecord {
            id: "S1".to_string(),
            owner_id: "E1".to_string(),
            date: d(date_str),
            start_time: t("09:00"),
            end_time: t("17:00"),
            task: DEFAULT_TASK.to_string(),
            comment: String::new(),
            duration_hours: hours,
        }
    }

    fn draft(date: &str, start: &str, end: &str) -> NewShift {
        NewShift {
            date: Some(date.to_string()),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn duration_nine_to_five_thirty_is_eight_and_a_half() {
        assert_eq!(duration_hours(t("09:00"), t("17:30")), 8.5);
    }

    #[test]
    fn duration_has_minute_resolution() {
        assert_eq!(duration_hours(t("09:15"), t("09:30")), 0.25);
        assert_eq!(duration_hours(t("00:00"), t("23:59")), 1439.0 / 60.0);
    }

    #[test]
    fn duration_is_non_positive_for_reversed_or_equal_times() {
        assert_eq!(duration_hours(t("17:00"), t("09:00")), -8.0);
        assert_eq!(duration_hours(t("12:00"), t("12:00")), 0.0);
    }

    #[test]
    fn clock_time_parsing_accepts_full_day_range() {
        assert!(parse_clock_time("start_time", "00:00").is_ok());
        assert!(parse_clock_time("start_time", "23:59").is_ok());
    }

    #[test]
    fn clock_time_parsing_rejects_out_of_range_and_garbage() {
        for bad in ["24:00", "09:60", "0900", "9am", "09:00:00", ""] {
            assert!(
                parse_clock_time("start_time", bad).is_err(),
                "'{}' should not parse as a clock time",
                bad
            );
        }
    }

    #[test]
    fn new_shift_requires_date_and_times() {
        let missing_date = NewShift {
            start_time: Some("09:00".to_string()),
            end_time: Some("17:00".to_string()),
            ..Default::default()
        };
        assert_eq!(
            validate_new_shift(&missing_date),
            Err(ShiftError::MissingField { field: "date" })
        );

        let empty_end = NewShift {
            date: Some("2024-01-01".to_string()),
            start_time: Some("09:00".to_string()),
            end_time: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            validate_new_shift(&empty_end),
            Err(ShiftError::MissingField { field: "end_time" })
        );
    }

    #[test]
    fn new_shift_rejects_end_at_or_before_start() {
        assert!(matches!(
            validate_new_shift(&draft("2024-01-01", "17:00", "09:00")),
            Err(ShiftError::EndNotAfterStart { .. })
        ));
        assert!(matches!(
            validate_new_shift(&draft("2024-01-01", "09:00", "09:00")),
            Err(ShiftError::EndNotAfterStart { .. })
        ));
    }

    #[test]
    fn new_shift_defaults_task_and_comment() {
        let validated = validate_new_shift(&draft("2024-01-01", "09:00", "17:30")).unwrap();
        assert_eq!(validated.task, DEFAULT_TASK);
        assert_eq!(validated.comment, "");
        assert_eq!(validated.duration_hours, 8.5);

        let mut with_empty_task = draft("2024-01-01", "09:00", "17:30");
        with_empty_task.task = Some(String::new());
        let validated = validate_new_shift(&with_empty_task).unwrap();
        assert_eq!(validated.task, DEFAULT_TASK);
    }

    #[test]
    fn patch_re_derives_duration_from_stored_start() {
        let record = ShiftRecord {
            id: "S1".to_string(),
            owner_id: "E1".to_string(),
            date: d("2024-01-01"),
            start_time: t("09:00"),
            end_time: t("17:00"),
            task: "Development".to_string(),
            comment: String::new(),
            duration_hours: 8.0,
        };
        let patch = ShiftPatch {
            end_time: Some("18:30".to_string()),
            ..Default::default()
        };
        let updated = apply_shift_patch(&record, &patch).unwrap();
        assert_eq!(updated.duration_hours, 9.5);
        assert_eq!(updated.task, "Development");
    }

    #[test]
    fn patch_rejects_resulting_overnight_pair() {
        let record = shift_on("2024-01-01", 8.0);
        let patch = ShiftPatch {
            end_time: Some("08:00".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            apply_shift_patch(&record, &patch),
            Err(ShiftError::EndNotAfterStart { .. })
        ));
    }

    #[test]
    fn summary_counts_distinct_days_only() {
        let shifts = vec![
            shift_on("2024-01-01", 4.0),
            shift_on("2024-01-01", 4.0),
            shift_on("2024-01-02", 8.0),
        ];
        let summary = summarize(&shifts);
        assert_eq!(summary.total_days, 2);
        assert_eq!(summary.total_hours, 16.0);
    }

    #[test]
    fn summary_clamps_percentage_at_one_hundred() {
        let summary = summarize(&[shift_on("2024-01-01", 50.0)]);
        assert_eq!(summary.completion_percentage, 100.0);
        assert_eq!(summary.total_hours, 50.0);
    }

    #[test]
    fn summary_percentage_is_monotonic_in_hours() {
        let samples = [0.0, 10.0, 20.0, 39.99, 40.0, 50.0];
        let mut previous = -1.0;
        for hours in samples {
            let pct = summarize(&[shift_on("2024-01-01", hours)]).completion_percentage;
            assert!(pct >= previous, "{}h regressed to {}%", hours, pct);
            previous = pct;
        }
    }

    #[test]
    fn completion_boundary_at_forty_hours() {
        let at_target = summarize(&[shift_on("2024-01-01", 40.0)]);
        assert_eq!(at_target.completion_percentage, 100.0);
        assert!(is_complete(&at_target));

        let just_under = summarize(&[shift_on("2024-01-01", 39.99)]);
        assert!(just_under.completion_percentage < 100.0);
        assert!(!is_complete(&just_under));
    }

    #[test]
    fn empty_shift_set_summarizes_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_hours, 0.0);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.completion_percentage, 0.0);
        assert!(!is_complete(&summary));
    }

    #[test]
    fn targets_are_exposed_on_every_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.target_hours, 40.0);
        assert_eq!(summary.target_days, 5);
    }

    #[test]
    fn shift_record_wire_format_matches_client() {
        let record = ShiftRecord {
            id: "S1".to_string(),
            owner_id: "E1".to_string(),
            date: d("2024-03-04"),
            start_time: t("09:00"),
            end_time: t("17:30"),
            task: "Development".to_string(),
            comment: "standup".to_string(),
            duration_hours: 8.5,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["user_id"], "E1");
        assert_eq!(json["date"], "2024-03-04");
        assert_eq!(json["start_time"], "09:00");
        assert_eq!(json["end_time"], "17:30");
        assert_eq!(json["duration_hours"], 8.5);
    }
}
