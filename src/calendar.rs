use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Weekday};
use uuid::Uuid;

use crate::error::{ParseError, TimetableError};
use crate::models::{AttendanceRecord, DayEntry, SlotEntry, SlotStatus, TimetableSlot};

pub const MAX_SLOTS_PER_DAY: u8 = 12;

const WEEK: [&str; 6] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub fn day_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn working_day_names(working_days: u8) -> Result<&'static [&'static str], TimetableError> {
    match working_days {
        5 => Ok(&WEEK[..5]),
        6 => Ok(&WEEK[..]),
        other => Err(TimetableError::WorkingDays(other)),
    }
}

/// Accepts "monday", "Mon", "MONDAY" and returns the canonical name.
pub fn normalize_day_name(input: &str) -> Result<&'static str, ParseError> {
    let lowered = input.trim().to_ascii_lowercase();
    WEEK.iter()
        .chain(std::iter::once(&"Sunday"))
        .find(|name| {
            let name = name.to_ascii_lowercase();
            name == lowered || (lowered.len() >= 3 && name.starts_with(&lowered))
        })
        .copied()
        .ok_or_else(|| ParseError::Weekday(input.to_string()))
}

pub fn validate_timetable(
    working_days: u8,
    slots_per_day: i32,
    min_attendance: i32,
) -> Result<(), TimetableError> {
    working_day_names(working_days)?;
    if !(1..=i32::from(MAX_SLOTS_PER_DAY)).contains(&slots_per_day) {
        return Err(TimetableError::SlotsPerDay {
            max: MAX_SLOTS_PER_DAY,
            actual: slots_per_day,
        });
    }
    if !(0..=100).contains(&min_attendance) {
        return Err(TimetableError::MinAttendance(min_attendance));
    }
    Ok(())
}

/// Checks a catalogue assignment covering one or more slots of the same day.
pub fn validate_slot_assignment(
    working_days: u8,
    slots_per_day: i32,
    day: &str,
    slot_numbers: &[i32],
    subject: &str,
) -> Result<(), TimetableError> {
    if !working_day_names(working_days)?.contains(&day) {
        return Err(TimetableError::NotWorkingDay(day.to_string()));
    }
    if slot_numbers.is_empty() {
        return Err(TimetableError::NoSlots);
    }
    if let Some(&slot) = slot_numbers
        .iter()
        .find(|slot| !(1..=slots_per_day).contains(*slot))
    {
        return Err(TimetableError::SlotNumber {
            slot,
            slots_per_day,
        });
    }
    if subject.trim().is_empty() {
        return Err(TimetableError::EmptySubject);
    }
    Ok(())
}

/// Joins stored day records with the slot catalogue.
///
/// Records keep their given order. Within a day, slots follow catalogue order
/// and only slots with a recorded status are included. Marks pointing at slots
/// missing from the catalogue are dropped.
pub fn build_day_entries(records: &[AttendanceRecord], catalogue: &[TimetableSlot]) -> Vec<DayEntry> {
    records
        .iter()
        .map(|record| {
            let marks: HashMap<Uuid, SlotStatus> = record
                .marks
                .iter()
                .map(|mark| (mark.slot_id, mark.status))
                .collect();

            let slots = catalogue
                .iter()
                .filter_map(|slot| {
                    marks.get(&slot.id).map(|status| SlotEntry {
                        slot_id: slot.id,
                        subject: slot.subject.clone(),
                        slot_kind: slot.slot_kind,
                        status: Some(*status),
                    })
                })
                .collect();

            DayEntry {
                date: record.date,
                day_status: record.day_status,
                slots,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayStatus, SlotKind, SlotMark};

    fn catalogue_slot(day: &str, number: i32, subject: &str, kind: SlotKind) -> TimetableSlot {
        TimetableSlot {
            id: Uuid::new_v4(),
            config_id: Uuid::nil(),
            day_name: day.to_string(),
            slot_number: number,
            subject: subject.to_string(),
            slot_kind: kind,
        }
    }

    #[test]
    fn names_weekdays() {
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(day_name(monday), "Monday");
        assert_eq!(day_name(monday + chrono::Duration::days(6)), "Sunday");
    }

    #[test]
    fn working_days_cover_five_or_six() {
        assert_eq!(working_day_names(5).unwrap().last(), Some(&"Friday"));
        assert_eq!(working_day_names(6).unwrap().len(), 6);
        assert_eq!(working_day_names(7), Err(TimetableError::WorkingDays(7)));
    }

    #[test]
    fn normalizes_day_input() {
        assert_eq!(normalize_day_name("tue"), Ok("Tuesday"));
        assert_eq!(normalize_day_name(" SATURDAY "), Ok("Saturday"));
        assert!(normalize_day_name("mo").is_err());
        assert!(normalize_day_name("funday").is_err());
    }

    #[test]
    fn rejects_bad_timetables() {
        assert!(validate_timetable(6, 8, 75).is_ok());
        assert!(matches!(
            validate_timetable(6, 0, 75),
            Err(TimetableError::SlotsPerDay { actual: 0, .. })
        ));
        assert_eq!(
            validate_timetable(5, 8, 101),
            Err(TimetableError::MinAttendance(101))
        );
    }

    #[test]
    fn rejects_bad_slot_assignments() {
        assert!(validate_slot_assignment(5, 8, "Monday", &[1, 2], "Math").is_ok());
        assert_eq!(
            validate_slot_assignment(5, 8, "Saturday", &[1], "Math"),
            Err(TimetableError::NotWorkingDay("Saturday".to_string()))
        );
        assert_eq!(
            validate_slot_assignment(5, 8, "Monday", &[3, 9], "Math"),
            Err(TimetableError::SlotNumber {
                slot: 9,
                slots_per_day: 8
            })
        );
        assert_eq!(
            validate_slot_assignment(6, 8, "Monday", &[], "Math"),
            Err(TimetableError::NoSlots)
        );
        assert_eq!(
            validate_slot_assignment(6, 8, "Monday", &[1], "  "),
            Err(TimetableError::EmptySubject)
        );
    }

    #[test]
    fn join_keeps_only_marked_slots_in_catalogue_order() {
        let math = catalogue_slot("Monday", 1, "Math", SlotKind::Class);
        let lunch = catalogue_slot("Monday", 2, "Lunch", SlotKind::Lunch);
        let physics = catalogue_slot("Monday", 3, "Physics", SlotKind::Class);
        let catalogue = vec![math.clone(), lunch, physics.clone()];

        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            day_status: DayStatus::Normal,
            marks: vec![
                SlotMark {
                    slot_id: physics.id,
                    status: SlotStatus::Absent,
                },
                SlotMark {
                    slot_id: math.id,
                    status: SlotStatus::Present,
                },
                SlotMark {
                    slot_id: Uuid::new_v4(),
                    status: SlotStatus::Present,
                },
            ],
        };

        let days = build_day_entries(&[record], &catalogue);
        assert_eq!(days.len(), 1);
        let subjects: Vec<&str> = days[0].slots.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Math", "Physics"]);
        assert_eq!(days[0].slots[1].status, Some(SlotStatus::Absent));
    }

    #[test]
    fn join_keeps_records_without_marks() {
        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            day_status: DayStatus::Absent,
            marks: Vec::new(),
        };
        let catalogue = vec![catalogue_slot("Tuesday", 1, "Math", SlotKind::Class)];

        let days = build_day_entries(&[record], &catalogue);
        assert_eq!(days[0].day_status, DayStatus::Absent);
        assert!(days[0].slots.is_empty());
    }
}
