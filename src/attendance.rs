use std::collections::HashMap;

use crate::models::{
    AttendanceStatus, DayEntry, DayStatus, OverallStats, SlotEntry, SlotStatus, SubjectStats,
};

/// Margin below the threshold that still counts as a warning rather than danger.
pub const WARNING_MARGIN: f64 = 5.0;

pub fn compute_overall_attendance(days: &[DayEntry], min_attendance: i32) -> OverallStats {
    let mut present = 0u32;
    let mut total = 0u32;

    for slot in counted_slots(days) {
        total += 1;
        if slot.status == Some(SlotStatus::Present) {
            present += 1;
        }
    }

    let percentage = attendance_percentage(present, total);
    OverallStats {
        percentage,
        present,
        total,
        status: classify(percentage, min_attendance),
    }
}

/// Per-subject counts in the order subjects are first encountered.
///
/// Unlike the overall figure, each subject's percentage is rounded to two
/// decimals. The classification still uses the unrounded value.
pub fn compute_subject_wise_attendance(
    days: &[DayEntry],
    min_attendance: i32,
) -> Vec<SubjectStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, u32, u32)> = Vec::new();

    for slot in counted_slots(days) {
        let position = *index.entry(slot.subject.as_str()).or_insert_with(|| {
            counts.push((slot.subject.as_str(), 0, 0));
            counts.len() - 1
        });

        let entry = &mut counts[position];
        entry.2 += 1;
        if slot.status == Some(SlotStatus::Present) {
            entry.1 += 1;
        }
    }

    counts
        .into_iter()
        .map(|(subject, present, total)| {
            let percentage = attendance_percentage(present, total);
            SubjectStats {
                subject: subject.to_string(),
                present,
                total,
                percentage: round_to_hundredths(percentage),
                min_required: min_attendance,
                status: classify(percentage, min_attendance),
            }
        })
        .collect()
}

pub fn classify(percentage: f64, min_attendance: i32) -> AttendanceStatus {
    let min = f64::from(min_attendance);
    if percentage >= min {
        AttendanceStatus::Safe
    } else if percentage >= min - WARNING_MARGIN {
        AttendanceStatus::Warning
    } else {
        AttendanceStatus::Danger
    }
}

pub fn attendance_percentage(present: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(present) / f64::from(total) * 100.0
    }
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Slots that count toward attendance: class slots with a status other than
/// not-considered, on days that are not holidays. Unset statuses count as
/// scheduled but not attended. A full-day absence has no effect here.
fn counted_slots(days: &[DayEntry]) -> impl Iterator<Item = &SlotEntry> {
    days.iter()
        .filter(|day| day.day_status != DayStatus::Holiday)
        .flat_map(|day| day.slots.iter())
        .filter(|slot| slot.slot_kind.is_counted())
        .filter(|slot| slot.status != Some(SlotStatus::NotConsidered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotKind;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn slot(subject: &str, kind: SlotKind, status: Option<SlotStatus>) -> SlotEntry {
        SlotEntry {
            slot_id: Uuid::new_v4(),
            subject: subject.to_string(),
            slot_kind: kind,
            status,
        }
    }

    fn class(subject: &str, status: SlotStatus) -> SlotEntry {
        slot(subject, SlotKind::Class, Some(status))
    }

    fn day(day_of_month: u32, day_status: DayStatus, slots: Vec<SlotEntry>) -> DayEntry {
        DayEntry {
            date: date(day_of_month),
            day_status,
            slots,
        }
    }

    #[test]
    fn empty_input_yields_zero_and_danger() {
        let stats = compute_overall_attendance(&[], 75);
        assert_eq!(stats.percentage, 0.0);
        assert_eq!(stats.present, 0);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.status, AttendanceStatus::Danger);
        assert!(compute_subject_wise_attendance(&[], 75).is_empty());
    }

    #[test]
    fn zero_threshold_with_no_data_is_safe() {
        let stats = compute_overall_attendance(&[], 0);
        assert_eq!(stats.status, AttendanceStatus::Safe);
    }

    #[test]
    fn holiday_days_contribute_nothing() {
        let holiday = day(
            2,
            DayStatus::Holiday,
            vec![class("Math", SlotStatus::Present), class("Math", SlotStatus::Absent)],
        );
        let normal = day(3, DayStatus::Normal, vec![class("Math", SlotStatus::Present)]);

        let with_holiday = compute_overall_attendance(&[holiday.clone(), normal.clone()], 75);
        let without = compute_overall_attendance(&[normal], 75);
        assert_eq!(with_holiday, without);
        assert_eq!(with_holiday.total, 1);

        assert!(compute_subject_wise_attendance(&[holiday], 75).is_empty());
    }

    #[test]
    fn lunch_and_break_slots_are_never_counted() {
        let days = vec![day(
            2,
            DayStatus::Normal,
            vec![
                slot("Lunch", SlotKind::Lunch, Some(SlotStatus::Present)),
                slot("Break", SlotKind::Break, Some(SlotStatus::Absent)),
                slot("Lunch", SlotKind::Lunch, None),
            ],
        )];

        let stats = compute_overall_attendance(&days, 75);
        assert_eq!((stats.present, stats.total), (0, 0));
        assert!(compute_subject_wise_attendance(&days, 75).is_empty());
    }

    #[test]
    fn not_considered_slots_are_skipped() {
        let days = vec![day(
            2,
            DayStatus::Normal,
            vec![
                class("Chemistry", SlotStatus::NotConsidered),
                class("Math", SlotStatus::Present),
            ],
        )];

        let stats = compute_overall_attendance(&days, 75);
        assert_eq!((stats.present, stats.total), (1, 1));

        let subjects = compute_subject_wise_attendance(&days, 75);
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].subject, "Math");
    }

    #[test]
    fn unset_status_counts_toward_total_only() {
        let days = vec![day(
            2,
            DayStatus::Normal,
            vec![slot("Math", SlotKind::Class, None), class("Math", SlotStatus::Present)],
        )];

        let stats = compute_overall_attendance(&days, 75);
        assert_eq!((stats.present, stats.total), (1, 2));
    }

    #[test]
    fn full_day_absence_does_not_change_slot_counts() {
        let marked = day(2, DayStatus::Absent, vec![class("Math", SlotStatus::Present)]);
        let stats = compute_overall_attendance(&[marked], 75);
        assert_eq!((stats.present, stats.total), (1, 1));

        let empty = day(3, DayStatus::Absent, Vec::new());
        let stats = compute_overall_attendance(&[empty], 75);
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify(75.0, 75), AttendanceStatus::Safe);
        assert_eq!(classify(80.0, 75), AttendanceStatus::Safe);
        assert_eq!(classify(70.0, 75), AttendanceStatus::Warning);
        assert_eq!(classify(74.99, 75), AttendanceStatus::Warning);
        assert_eq!(classify(69.999, 75), AttendanceStatus::Danger);
    }

    #[test]
    fn out_of_range_threshold_is_used_as_given() {
        assert_eq!(classify(100.0, 120), AttendanceStatus::Danger);
        assert_eq!(classify(0.0, -10), AttendanceStatus::Safe);
    }

    #[test]
    fn subjects_keep_first_seen_order() {
        let days = vec![
            day(2, DayStatus::Normal, vec![class("Math", SlotStatus::Present)]),
            day(
                3,
                DayStatus::Normal,
                vec![class("Physics", SlotStatus::Absent), class("Math", SlotStatus::Absent)],
            ),
        ];

        let subjects = compute_subject_wise_attendance(&days, 75);
        let names: Vec<&str> = subjects.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(names, vec!["Math", "Physics"]);

        assert_eq!((subjects[0].present, subjects[0].total), (1, 2));
        assert_eq!(subjects[0].percentage, 50.0);
        assert_eq!(subjects[0].min_required, 75);
        assert_eq!(subjects[0].status, AttendanceStatus::Danger);

        assert_eq!((subjects[1].present, subjects[1].total), (0, 1));
        assert_eq!(subjects[1].percentage, 0.0);
    }

    #[test]
    fn subject_names_are_case_sensitive() {
        let days = vec![day(
            2,
            DayStatus::Normal,
            vec![class("Math", SlotStatus::Present), class("math", SlotStatus::Absent)],
        )];

        let subjects = compute_subject_wise_attendance(&days, 75);
        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[1].subject, "math");
    }

    #[test]
    fn subject_percentage_is_rounded_but_overall_is_not() {
        let days = vec![day(
            2,
            DayStatus::Normal,
            vec![
                class("Math", SlotStatus::Present),
                class("Math", SlotStatus::Absent),
                class("Math", SlotStatus::Absent),
            ],
        )];

        let overall = compute_overall_attendance(&days, 75);
        let subjects = compute_subject_wise_attendance(&days, 75);

        assert_eq!(subjects[0].percentage, 33.33);
        assert!((overall.percentage - 100.0 / 3.0).abs() < 1e-12);
        assert_ne!(overall.percentage, subjects[0].percentage);
    }

    #[test]
    fn subject_status_uses_unrounded_percentage() {
        // 1633 / 2333 is 69.9957..., which rounds up to the warning line.
        let slots = (0..2333)
            .map(|i| {
                let status = if i < 1633 { SlotStatus::Present } else { SlotStatus::Absent };
                class("Math", status)
            })
            .collect();
        let days = vec![day(2, DayStatus::Normal, slots)];
        let subjects = compute_subject_wise_attendance(&days, 75);
        assert_eq!(subjects[0].percentage, 70.0);
        assert_eq!(subjects[0].status, AttendanceStatus::Danger);
    }

    #[test]
    fn repeated_calls_are_identical_and_leave_input_untouched() {
        let days = vec![
            day(2, DayStatus::Normal, vec![class("Math", SlotStatus::Present)]),
            day(3, DayStatus::Holiday, vec![class("Physics", SlotStatus::Absent)]),
        ];
        let before = days.clone();

        let first = compute_overall_attendance(&days, 75);
        let second = compute_overall_attendance(&days, 75);
        assert_eq!(first.percentage.to_bits(), second.percentage.to_bits());
        assert_eq!(first, second);

        assert_eq!(
            compute_subject_wise_attendance(&days, 75),
            compute_subject_wise_attendance(&days, 75)
        );
        assert_eq!(days, before);
    }

    #[test]
    fn holiday_plus_mixed_day_scenario() {
        let days = vec![
            day(
                2,
                DayStatus::Holiday,
                vec![class("Math", SlotStatus::Present), class("Physics", SlotStatus::Present)],
            ),
            day(
                3,
                DayStatus::Normal,
                vec![class("Math", SlotStatus::Present), class("Physics", SlotStatus::Absent)],
            ),
        ];

        let stats = compute_overall_attendance(&days, 75);
        assert_eq!(stats.present, 1);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.percentage, 50.0);
        assert_eq!(stats.status, AttendanceStatus::Danger);
    }
}
