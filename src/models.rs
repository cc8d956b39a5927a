use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ParseError;

pub const DEFAULT_MIN_ATTENDANCE: i32 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Class,
    Lunch,
    Break,
}

impl SlotKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Class => "class",
            SlotKind::Lunch => "lunch",
            SlotKind::Break => "break",
        }
    }

    /// Only class slots count toward attendance.
    pub fn is_counted(self) -> bool {
        matches!(self, SlotKind::Class)
    }
}

impl FromStr for SlotKind {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "class" => Ok(SlotKind::Class),
            "lunch" => Ok(SlotKind::Lunch),
            "break" => Ok(SlotKind::Break),
            other => Err(ParseError::SlotKind(other.to_string())),
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotStatus {
    Present,
    Absent,
    NotConsidered,
}

impl SlotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotStatus::Present => "present",
            SlotStatus::Absent => "absent",
            SlotStatus::NotConsidered => "not-considered",
        }
    }

    /// Advances a slot through unset -> present -> absent -> not-considered -> unset.
    pub fn next(current: Option<SlotStatus>) -> Option<SlotStatus> {
        match current {
            None => Some(SlotStatus::Present),
            Some(SlotStatus::Present) => Some(SlotStatus::Absent),
            Some(SlotStatus::Absent) => Some(SlotStatus::NotConsidered),
            Some(SlotStatus::NotConsidered) => None,
        }
    }
}

impl FromStr for SlotStatus {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "present" => Ok(SlotStatus::Present),
            "absent" => Ok(SlotStatus::Absent),
            "not-considered" => Ok(SlotStatus::NotConsidered),
            other => Err(ParseError::SlotStatus(other.to_string())),
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    #[default]
    Normal,
    Holiday,
    Absent,
}

impl DayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DayStatus::Normal => "normal",
            DayStatus::Holiday => "holiday",
            DayStatus::Absent => "absent",
        }
    }

    /// Advances a day through normal -> holiday -> absent -> normal.
    pub fn next(self) -> DayStatus {
        match self {
            DayStatus::Normal => DayStatus::Holiday,
            DayStatus::Holiday => DayStatus::Absent,
            DayStatus::Absent => DayStatus::Normal,
        }
    }
}

impl FromStr for DayStatus {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "normal" => Ok(DayStatus::Normal),
            "holiday" => Ok(DayStatus::Holiday),
            "absent" => Ok(DayStatus::Absent),
            other => Err(ParseError::DayStatus(other.to_string())),
        }
    }
}

impl fmt::Display for DayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Safe,
    Warning,
    Danger,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Safe => "safe",
            AttendanceStatus::Warning => "warning",
            AttendanceStatus::Danger => "danger",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableConfig {
    pub id: Uuid,
    pub user_id: Uuid,
    pub working_days: u8,
    pub slots_per_day: i32,
    pub start_date: NaiveDate,
    pub min_attendance: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTimetableConfig {
    pub working_days: u8,
    pub slots_per_day: i32,
    pub start_date: NaiveDate,
    pub min_attendance: i32,
}

/// One row of the slot catalogue: what happens in a given slot on a given weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableSlot {
    pub id: Uuid,
    pub config_id: Uuid,
    pub day_name: String,
    pub slot_number: i32,
    pub subject: String,
    pub slot_kind: SlotKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotMark {
    pub slot_id: Uuid,
    pub status: SlotStatus,
}

/// A stored day record together with its slot statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub day_status: DayStatus,
    pub marks: Vec<SlotMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub slot_id: Uuid,
    pub subject: String,
    pub slot_kind: SlotKind,
    pub status: Option<SlotStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: NaiveDate,
    pub day_status: DayStatus,
    pub slots: Vec<SlotEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStats {
    pub percentage: f64,
    pub present: u32,
    pub total: u32,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStats {
    pub subject: String,
    pub present: u32,
    pub total: u32,
    pub percentage: f64,
    pub min_required: i32,
    pub status: AttendanceStatus,
}

/// Frozen copy of a tracking period, stored as JSON when a log is archived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub config: TimetableConfig,
    pub slots: Vec<TimetableSlot>,
    pub attendance: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone)]
pub struct AttendanceLog {
    pub id: Uuid,
    pub log_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub data: LogSnapshot,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_status_cycles_back_to_unset() {
        let mut state = None;
        let mut seen = Vec::new();
        for _ in 0..4 {
            state = SlotStatus::next(state);
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                Some(SlotStatus::Present),
                Some(SlotStatus::Absent),
                Some(SlotStatus::NotConsidered),
                None,
            ]
        );
    }

    #[test]
    fn day_status_cycles_through_all_states() {
        assert_eq!(DayStatus::Normal.next(), DayStatus::Holiday);
        assert_eq!(DayStatus::Holiday.next(), DayStatus::Absent);
        assert_eq!(DayStatus::Absent.next(), DayStatus::Normal);
    }

    #[test]
    fn labels_parse_back_to_variants() {
        for status in [SlotStatus::Present, SlotStatus::Absent, SlotStatus::NotConsidered] {
            assert_eq!(status.as_str().parse::<SlotStatus>(), Ok(status));
        }
        for kind in [SlotKind::Class, SlotKind::Lunch, SlotKind::Break] {
            assert_eq!(kind.as_str().parse::<SlotKind>(), Ok(kind));
        }
        assert_eq!("holiday".parse::<DayStatus>(), Ok(DayStatus::Holiday));
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert_eq!(
            "Present".parse::<SlotStatus>(),
            Err(ParseError::SlotStatus("Present".to_string()))
        );
        assert!("recess".parse::<SlotKind>().is_err());
        assert!("sick".parse::<DayStatus>().is_err());
    }

    #[test]
    fn serde_uses_stored_labels() {
        let json = serde_json::to_string(&SlotStatus::NotConsidered).unwrap();
        assert_eq!(json, "\"not-considered\"");
        let kind: SlotKind = serde_json::from_str("\"break\"").unwrap();
        assert_eq!(kind, SlotKind::Break);
    }
}
