use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{AttendanceStatus, OverallStats, SubjectStats, TimetableConfig};

/// Consecutive attended classes needed to reach `min_attendance`.
///
/// `None` when the target can never be reached, i.e. a 100% threshold with at
/// least one class missed.
pub fn classes_needed(present: u32, total: u32, min_attendance: i32) -> Option<u32> {
    let (p, t, m) = (i64::from(present), i64::from(total), i64::from(min_attendance));
    if m <= 0 || 100 * p >= m * t {
        return Some(0);
    }
    if m >= 100 {
        return None;
    }
    let deficit = m * t - 100 * p;
    let per_class = 100 - m;
    u32::try_from((deficit + per_class - 1) / per_class).ok()
}

/// Classes that can still be missed while staying at or above `min_attendance`.
///
/// `None` when the threshold is zero or below and every class could be missed.
pub fn skippable_classes(present: u32, total: u32, min_attendance: i32) -> Option<u32> {
    let (p, t, m) = (i64::from(present), i64::from(total), i64::from(min_attendance));
    if m <= 0 {
        return None;
    }
    let slack = 100 * p - m * t;
    if slack <= 0 {
        return Some(0);
    }
    u32::try_from(slack / m).ok()
}

fn outlook(present: u32, total: u32, min_attendance: i32) -> String {
    match classes_needed(present, total, min_attendance) {
        Some(0) => match skippable_classes(present, total, min_attendance) {
            Some(0) => "no classes to spare".to_string(),
            Some(n) => format!("can miss {n} more"),
            None => "no minimum set".to_string(),
        },
        Some(n) => format!("attend the next {n} to recover"),
        None => "cannot reach the minimum".to_string(),
    }
}

pub fn build_report(
    config: &TimetableConfig,
    overall: &OverallStats,
    subjects: &[SubjectStats],
    as_of: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Report");
    let _ = writeln!(
        output,
        "Tracking from {} to {} (minimum {}%)",
        config.start_date, as_of, config.min_attendance
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");

    if overall.total == 0 {
        let _ = writeln!(output, "No classes recorded yet.");
    } else {
        let _ = writeln!(
            output,
            "- {:.1}% ({} of {} classes), {}: {}",
            overall.percentage,
            overall.present,
            overall.total,
            overall.status,
            outlook(overall.present, overall.total, config.min_attendance)
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");

    if subjects.is_empty() {
        let _ = writeln!(output, "No subjects recorded yet.");
    } else {
        for subject in subjects {
            let _ = writeln!(
                output,
                "- {}: {:.1}% ({}/{}), required {}%, {}",
                subject.subject,
                subject.percentage,
                subject.present,
                subject.total,
                subject.min_required,
                subject.status
            );
        }
    }

    let at_risk: Vec<&SubjectStats> = subjects
        .iter()
        .filter(|subject| subject.status != AttendanceStatus::Safe)
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    if at_risk.is_empty() {
        let _ = writeln!(output, "Every subject is above the minimum.");
    } else {
        for subject in at_risk {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                subject.subject,
                subject.status,
                outlook(subject.present, subject.total, subject.min_required)
            );
        }
    }

    output
}
