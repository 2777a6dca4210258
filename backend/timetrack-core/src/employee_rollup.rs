// src/employee_rollup.rs
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::collections::HashMap;

use crate::timesheet::{clock_time, ShiftRecord};

// --- Admin View Structures ---

/// A shift enriched with its owner's identity, as served to administrators.
/// The admin client consumes camelCase keys, unlike the owner-facing shift
/// payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeShiftView {
    pub id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub employee_email: String,
    pub date: NaiveDate,
    /// Weekday name derived from `date` (e.g. "Monday").
    pub day: String,
    #[serde(with = "clock_time")]
    pub start_time: NaiveTime,
    #[serde(with = "clock_time")]
    pub end_time: NaiveTime,
    pub duration: f64,
    pub task: String,
    pub comment: String,
}

impl EmployeeShiftView {
    pub fn from_record(shift: &ShiftRecord, employee_name: &str, employee_email: &str) -> Self {
        Self {
            id: shift.id.clone(),
            employee_id: shift.owner_id.clone(),
            employee_name: employee_name.to_string(),
            employee_email: employee_email.to_string(),
            date: shift.date,
            day: shift.date.format("%A").to_string(),
            start_time: shift.start_time,
            end_time: shift.end_time,
            duration: shift.duration_hours,
            task: shift.task.clone(),
            comment: shift.comment.clone(),
        }
    }
}

/// Per-employee rollup over the full shift set: aggregate hours, shift count,
/// and that employee's shifts sorted most-recent-first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRollup {
    pub employee_id: String,
    pub employee_name: String,
    pub employee_email: String,
    pub total_hours: f64,
    pub shift_count: usize,
    pub shifts: Vec<EmployeeShiftView>,
}

// --- Employee Rollup Builder ---

/// Partitions the full shift set by owner. Rollups keep first-seen owner
/// order; each partition's shift list is sorted by date descending with a
/// stable sort, so same-date shifts retain their input order.
pub fn build_rollups(views: &[EmployeeShiftView]) -> Vec<EmployeeRollup> {
    let mut rollups: Vec<EmployeeRollup> = Vec::new();
    let mut index_by_owner: HashMap<String, usize> = HashMap::new();

    for view in views {
        match index_by_owner.get(&view.employee_id) {
            Some(&i) => rollups[i].shifts.push(view.clone()),
            None => {
                index_by_owner.insert(view.employee_id.clone(), rollups.len());
                rollups.push(EmployeeRollup {
                    employee_id: view.employee_id.clone(),
                    employee_name: view.employee_name.clone(),
                    employee_email: view.employee_email.clone(),
                    total_hours: 0.0,
                    shift_count: 0,
                    shifts: vec![view.clone()],
                });
            }
        }
    }

    for rollup in &mut rollups {
        rollup.total_hours = rollup.shifts.iter().map(|s| s.duration).sum();
        rollup.shift_count = rollup.shifts.len();
        // Vec::sort_by is stable: ties on date keep insertion order.
        rollup.shifts.sort_by(|a, b| b.date.cmp(&a.date));
    }

    rollups
}

/// Case-insensitive substring filter over employee name and email. Selects a
/// visible subset; the rollups themselves are left untouched.
pub fn filter_rollups(rollups: &[EmployeeRollup], search: &str) -> Vec<EmployeeRollup> {
    let needle = search.to_lowercase();
    rollups
        .iter()
        .filter(|rollup| {
            rollup.employee_name.to_lowercase().contains(&needle)
                || rollup.employee_email.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod rollup_tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn view(id: &str, owner: &str, name: &str, email: &str, date: &str, hours: f64) -> EmployeeShiftView {
        EmployeeShiftView {
            id: id.to_string(),
            employee_id: owner.to_string(),
            employee_name: name.to_string(),
            employee_email: email.to_string(),
            date: d(date),
            day: d(date).format("%A").to_string(),
            start_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            duration: hours,
            task: "Unspecified".to_string(),
            comment: String::new(),
        }
    }

    #[test]
    fn partitions_one_rollup_per_owner() {
        let views = vec![
            view("S1", "E1", "John Doe", "john@x.com", "2024-01-01", 8.0),
            view("S2", "E2", "Ada Smith", "ada@x.com", "2024-01-01", 6.0),
            view("S3", "E1", "John Doe", "john@x.com", "2024-01-02", 7.5),
            view("S4", "E3", "Kim Roe", "kim@x.com", "2024-01-03", 4.0),
        ];
        let rollups = build_rollups(&views);
        assert_eq!(rollups.len(), 3);
        let total_shift_count: usize = rollups.iter().map(|r| r.shift_count).sum();
        assert_eq!(total_shift_count, views.len());
        assert_eq!(rollups[0].employee_id, "E1");
        assert_eq!(rollups[0].total_hours, 15.5);
        assert_eq!(rollups[1].employee_id, "E2");
        assert_eq!(rollups[2].employee_id, "E3");
    }

    #[test]
    fn shift_lists_sort_date_descending_with_stable_ties() {
        let views = vec![
            view("first", "E1", "John Doe", "john@x.com", "2024-01-03", 8.0),
            view("older", "E1", "John Doe", "john@x.com", "2024-01-01", 8.0),
            view("second", "E1", "John Doe", "john@x.com", "2024-01-03", 8.0),
        ];
        let rollups = build_rollups(&views);
        let ids: Vec<&str> = rollups[0].shifts.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "older"]);
    }

    #[test]
    fn filter_matches_name_and_email_case_insensitively() {
        let rollups = build_rollups(&[
            view("S1", "E1", "John Doe", "john@x.com", "2024-01-01", 8.0),
            view("S2", "E2", "Ada Smith", "JOHN@x.com", "2024-01-01", 6.0),
            view("S3", "E3", "Kim Roe", "kim@x.com", "2024-01-01", 4.0),
        ]);
        let matched = filter_rollups(&rollups, "john");
        let ids: Vec<&str> = matched.iter().map(|r| r.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["E1", "E2"]);
    }

    #[test]
    fn filter_never_mutates_the_underlying_rollups() {
        let rollups = build_rollups(&[
            view("S1", "E1", "John Doe", "john@x.com", "2024-01-01", 8.0),
            view("S2", "E1", "John Doe", "john@x.com", "2024-01-02", 6.0),
        ]);
        let before = rollups.clone();
        let matched = filter_rollups(&rollups, "nobody-matches-this");
        assert!(matched.is_empty());
        assert_eq!(rollups, before);
        assert_eq!(rollups[0].total_hours, 14.0);
        assert_eq!(rollups[0].shift_count, 2);
    }

    #[test]
    fn empty_filter_term_matches_everyone() {
        let rollups = build_rollups(&[
            view("S1", "E1", "John Doe", "john@x.com", "2024-01-01", 8.0),
            view("S2", "E2", "Ada Smith", "ada@x.com", "2024-01-01", 6.0),
        ]);
        assert_eq!(filter_rollups(&rollups, "").len(), 2);
    }

    #[test]
    fn admin_wire_format_uses_camel_case() {
        let rollups = build_rollups(&[view(
            "S1",
            "E1",
            "John Doe",
            "john@x.com",
            "2024-01-01",
            8.0,
        )]);
        let json = serde_json::to_value(&rollups[0]).unwrap();
        assert_eq!(json["employeeName"], "John Doe");
        assert_eq!(json["totalHours"], 8.0);
        assert_eq!(json["shiftCount"], 1);
        assert_eq!(json["shifts"][0]["startTime"], "09:00");
        assert_eq!(json["shifts"][0]["day"], "Monday");
    }
}
