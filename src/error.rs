use thiserror::Error;

/// Raised when a stored or user-supplied label does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown slot kind: {0}")]
    SlotKind(String),

    #[error("unknown slot status: {0}")]
    SlotStatus(String),

    #[error("unknown day status: {0}")]
    DayStatus(String),

    #[error("unknown weekday: {0}")]
    Weekday(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimetableError {
    #[error("working days must be 5 or 6, got {0}")]
    WorkingDays(u8),

    #[error("slots per day must be between 1 and {max}, got {actual}")]
    SlotsPerDay { max: u8, actual: i32 },

    #[error("minimum attendance must be between 0 and 100, got {0}")]
    MinAttendance(i32),

    #[error("slot {slot} is outside 1..={slots_per_day}")]
    SlotNumber { slot: i32, slots_per_day: i32 },

    #[error("{0} is not a working day in this timetable")]
    NotWorkingDay(String),

    #[error("no slot numbers given")]
    NoSlots,

    #[error("subject must not be empty")]
    EmptySubject,
}
