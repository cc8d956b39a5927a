use std::collections::HashMap;

use anyhow::Context;
use chrono::{Duration, NaiveDate};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::calendar;
use crate::models::{
    AttendanceLog, AttendanceRecord, DayStatus, LogSnapshot, NewTimetableConfig, SlotKind,
    SlotMark, SlotStatus, TimetableConfig, TimetableSlot,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Returns the user's active timetable, or `None` on first run.
///
/// Lookup failures are logged and reported as "no configuration".
pub async fn fetch_active_config(pool: &PgPool, user_id: Uuid) -> Option<TimetableConfig> {
    let result = sqlx::query(
        r#"
        SELECT id, user_id, working_days, slots_per_day, start_date, min_attendance,
               is_active, created_at
        FROM attendance.timetable_configs
        WHERE user_id = $1 AND is_active
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(Some(row)) => match config_from_row(&row) {
            Ok(config) => Some(config),
            Err(err) => {
                error!(%user_id, error = %err, "malformed timetable config row");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            error!(%user_id, error = %err, "failed to fetch timetable config");
            None
        }
    }
}

/// Creates a new active timetable, deactivating any previous one.
pub async fn create_config(
    pool: &PgPool,
    user_id: Uuid,
    config: &NewTimetableConfig,
) -> anyhow::Result<TimetableConfig> {
    calendar::validate_timetable(
        config.working_days,
        config.slots_per_day,
        config.min_attendance,
    )?;

    let mut tx = pool.begin().await?;

    let deactivated = sqlx::query(
        r#"
        UPDATE attendance.timetable_configs
        SET is_active = FALSE, updated_at = NOW()
        WHERE user_id = $1 AND is_active
        "#,
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let row = sqlx::query(
        r#"
        INSERT INTO attendance.timetable_configs
        (id, user_id, working_days, slots_per_day, start_date, min_attendance, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE)
        RETURNING id, user_id, working_days, slots_per_day, start_date, min_attendance,
                  is_active, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(i16::from(config.working_days))
    .bind(config.slots_per_day)
    .bind(config.start_date)
    .bind(config.min_attendance)
    .fetch_one(&mut *tx)
    .await
    .context("failed to create timetable config")?;

    tx.commit().await?;

    let created = config_from_row(&row)?;
    info!(
        %user_id,
        config_id = %created.id,
        deactivated,
        "created timetable config"
    );
    Ok(created)
}

/// Deletes a timetable; its slots and attendance go with it.
pub async fn delete_config(pool: &PgPool, config_id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM attendance.timetable_configs WHERE id = $1")
        .bind(config_id)
        .execute(pool)
        .await
        .context("failed to delete timetable config")?;

    info!(%config_id, removed = result.rows_affected(), "deleted timetable config");
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_slots(pool: &PgPool, config_id: Uuid) -> Vec<TimetableSlot> {
    match try_fetch_slots(pool, config_id).await {
        Ok(slots) => slots,
        Err(err) => {
            error!(%config_id, error = %err, "failed to fetch timetable slots");
            Vec::new()
        }
    }
}

async fn try_fetch_slots(pool: &PgPool, config_id: Uuid) -> anyhow::Result<Vec<TimetableSlot>> {
    let rows = sqlx::query(
        r#"
        SELECT id, config_id, day_name, slot_number, subject, slot_type
        FROM attendance.timetable_slots
        WHERE config_id = $1
        ORDER BY day_name, slot_number
        "#,
    )
    .bind(config_id)
    .fetch_all(pool)
    .await?;

    let mut slots = Vec::with_capacity(rows.len());
    for row in rows {
        let kind: String = row.get("slot_type");
        slots.push(TimetableSlot {
            id: row.get("id"),
            config_id: row.get("config_id"),
            day_name: row.get("day_name"),
            slot_number: row.get("slot_number"),
            subject: row.get("subject"),
            slot_kind: kind.parse()?,
        });
    }

    Ok(slots)
}

/// Assigns a subject to one or more slots of a day, replacing what was there.
pub async fn upsert_slots(
    pool: &PgPool,
    config: &TimetableConfig,
    day_name: &str,
    slot_numbers: &[i32],
    subject: &str,
    kind: SlotKind,
) -> anyhow::Result<usize> {
    calendar::validate_slot_assignment(
        config.working_days,
        config.slots_per_day,
        day_name,
        slot_numbers,
        subject,
    )?;

    let mut tx = pool.begin().await?;
    for slot_number in slot_numbers {
        sqlx::query(
            r#"
            INSERT INTO attendance.timetable_slots
            (id, config_id, day_name, slot_number, subject, slot_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (config_id, day_name, slot_number) DO UPDATE
            SET subject = EXCLUDED.subject, slot_type = EXCLUDED.slot_type
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(config.id)
        .bind(day_name)
        .bind(slot_number)
        .bind(subject.trim())
        .bind(kind.as_str())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("failed to save {day_name} slot {slot_number}"))?;
    }
    tx.commit().await?;

    debug!(config_id = %config.id, day_name, count = slot_numbers.len(), "saved slots");
    Ok(slot_numbers.len())
}

/// Creates or updates the day record for `date` and returns its id.
///
/// Passing `None` keeps an existing day status, or stores `normal` for a new record.
pub async fn upsert_attendance_record(
    pool: &PgPool,
    user_id: Uuid,
    config_id: Uuid,
    date: NaiveDate,
    day_status: Option<DayStatus>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO attendance.attendance_records (id, user_id, config_id, date, day_status)
        VALUES ($1, $2, $3, $4, COALESCE($5::text, 'normal'))
        ON CONFLICT (user_id, config_id, date) DO UPDATE
        SET day_status = COALESCE($5::text, attendance.attendance_records.day_status),
            updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(config_id)
    .bind(date)
    .bind(day_status.map(DayStatus::as_str))
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to save attendance record for {date}"))?
    .get("id");

    Ok(id)
}

pub async fn upsert_attendance_slot(
    pool: &PgPool,
    record_id: Uuid,
    slot_id: Uuid,
    status: SlotStatus,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO attendance.attendance_slots (id, attendance_record_id, slot_id, status)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (attendance_record_id, slot_id) DO UPDATE
        SET status = EXCLUDED.status, updated_at = NOW()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(record_id)
    .bind(slot_id)
    .bind(status.as_str())
    .execute(pool)
    .await
    .context("failed to save slot status")?;

    Ok(())
}

/// Removes a slot status, returning the slot to "not yet recorded".
pub async fn clear_attendance_slot(
    pool: &PgPool,
    record_id: Uuid,
    slot_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query(
        "DELETE FROM attendance.attendance_slots WHERE attendance_record_id = $1 AND slot_id = $2",
    )
    .bind(record_id)
    .bind(slot_id)
    .execute(pool)
    .await
    .context("failed to clear slot status")?;

    Ok(())
}

/// Day records with their slot statuses for `[start, end]`, newest first.
pub async fn fetch_attendance(
    pool: &PgPool,
    user_id: Uuid,
    config_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<AttendanceRecord> {
    match try_fetch_attendance(pool, user_id, config_id, start, end).await {
        Ok(records) => records,
        Err(err) => {
            error!(%user_id, %config_id, error = %err, "failed to fetch attendance records");
            Vec::new()
        }
    }
}

async fn try_fetch_attendance(
    pool: &PgPool,
    user_id: Uuid,
    config_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.date, r.day_status, s.slot_id, s.status
        FROM attendance.attendance_records r
        LEFT JOIN attendance.attendance_slots s ON s.attendance_record_id = r.id
        WHERE r.user_id = $1 AND r.config_id = $2 AND r.date >= $3 AND r.date <= $4
        ORDER BY r.date DESC, r.id
        "#,
    )
    .bind(user_id)
    .bind(config_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    let mut records: Vec<AttendanceRecord> = Vec::new();
    for row in rows {
        let id: Uuid = row.get("id");
        if records.last().map(|record| record.id) != Some(id) {
            let day_status: String = row.get("day_status");
            records.push(AttendanceRecord {
                id,
                date: row.get("date"),
                day_status: day_status.parse()?,
                marks: Vec::new(),
            });
        }

        let slot_id: Option<Uuid> = row.get("slot_id");
        let status: Option<String> = row.get("status");
        if let (Some(slot_id), Some(status), Some(record)) = (slot_id, status, records.last_mut()) {
            record.marks.push(SlotMark {
                slot_id,
                status: status.parse()?,
            });
        }
    }

    debug!(%user_id, %config_id, count = records.len(), "fetched attendance records");
    Ok(records)
}

/// Archives a tracking period so it can be reviewed after the timetable changes.
pub async fn create_attendance_log(
    pool: &PgPool,
    user_id: Uuid,
    log_name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    snapshot: &LogSnapshot,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO attendance.attendance_logs
        (id, user_id, log_name, start_date, end_date, data)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(log_name)
    .bind(start_date)
    .bind(end_date)
    .bind(Json(snapshot))
    .fetch_one(pool)
    .await
    .context("failed to create attendance log")?
    .get("id");

    info!(%user_id, log_id = %id, log_name, "archived attendance log");
    Ok(id)
}

pub async fn fetch_attendance_logs(pool: &PgPool, user_id: Uuid) -> Vec<AttendanceLog> {
    let result = sqlx::query(
        r#"
        SELECT id, log_name, start_date, end_date, data, created_at
        FROM attendance.attendance_logs
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await;

    let rows = match result {
        Ok(rows) => rows,
        Err(err) => {
            error!(%user_id, error = %err, "failed to fetch attendance logs");
            return Vec::new();
        }
    };

    let mut logs = Vec::with_capacity(rows.len());
    for row in rows {
        let data: Result<Json<LogSnapshot>, _> = row.try_get("data");
        match data {
            Ok(Json(data)) => logs.push(AttendanceLog {
                id: row.get("id"),
                log_name: row.get("log_name"),
                start_date: row.get("start_date"),
                end_date: row.get("end_date"),
                data,
                created_at: row.get("created_at"),
            }),
            Err(err) => warn!(%user_id, error = %err, "skipping unreadable attendance log"),
        }
    }

    logs
}

/// Looks up the current status of one slot on one date.
pub async fn fetch_slot_status(
    pool: &PgPool,
    user_id: Uuid,
    config_id: Uuid,
    date: NaiveDate,
    slot_id: Uuid,
) -> anyhow::Result<Option<SlotStatus>> {
    let row = sqlx::query(
        r#"
        SELECT s.status
        FROM attendance.attendance_slots s
        JOIN attendance.attendance_records r ON r.id = s.attendance_record_id
        WHERE r.user_id = $1 AND r.config_id = $2 AND r.date = $3 AND s.slot_id = $4
        "#,
    )
    .bind(user_id)
    .bind(config_id)
    .bind(date)
    .bind(slot_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let status: String = row.get("status");
            Ok(Some(status.parse()?))
        }
        None => Ok(None),
    }
}

pub async fn fetch_day_status(
    pool: &PgPool,
    user_id: Uuid,
    config_id: Uuid,
    date: NaiveDate,
) -> anyhow::Result<DayStatus> {
    let row = sqlx::query(
        r#"
        SELECT day_status FROM attendance.attendance_records
        WHERE user_id = $1 AND config_id = $2 AND date = $3
        "#,
    )
    .bind(user_id)
    .bind(config_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let status: String = row.get("day_status");
            Ok(status.parse()?)
        }
        None => Ok(DayStatus::default()),
    }
}

/// Imports marks from a CSV file with columns
/// `date,day_status,slot_number,status`. Empty `day_status` keeps what is stored
/// and an empty `status` records only the day.
pub async fn import_csv(
    pool: &PgPool,
    user_id: Uuid,
    config: &TimetableConfig,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        date: NaiveDate,
        day_status: Option<DayStatus>,
        slot_number: Option<i32>,
        status: Option<SlotStatus>,
    }

    let catalogue = try_fetch_slots(pool, config.id).await?;
    let by_position: HashMap<(&str, i32), &TimetableSlot> = catalogue
        .iter()
        .map(|slot| ((slot.day_name.as_str(), slot.slot_number), slot))
        .collect();

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut imported = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        if row.date < config.start_date {
            warn!(date = %row.date, "skipping row before timetable start");
            continue;
        }

        let record_id =
            upsert_attendance_record(pool, user_id, config.id, row.date, row.day_status).await?;

        let (Some(slot_number), Some(status)) = (row.slot_number, row.status) else {
            continue;
        };

        let day_name = calendar::day_name(row.date);
        match by_position.get(&(day_name, slot_number)) {
            Some(slot) if slot.slot_kind.is_counted() => {
                upsert_attendance_slot(pool, record_id, slot.id, status).await?;
                imported += 1;
            }
            Some(slot) => {
                debug!(day_name, slot_number, kind = %slot.slot_kind, "ignoring mark on non-class slot");
            }
            None => {
                warn!(date = %row.date, day_name, slot_number, "no timetable slot for row");
            }
        }
    }

    Ok(imported)
}

/// Loads a demo user with a five-day timetable and one week of marks.
pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    let user_id = Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2")?;
    let start_date = NaiveDate::from_ymd_opt(2026, 3, 2).context("invalid date")?;

    let config = create_config(
        pool,
        user_id,
        &NewTimetableConfig {
            working_days: 5,
            slots_per_day: 4,
            start_date,
            min_attendance: 75,
        },
    )
    .await?;

    let week = [
        ("Monday", ["Mathematics", "Physics", "Lunch", "Chemistry"]),
        ("Tuesday", ["Physics", "Mathematics", "Lunch", "English"]),
        ("Wednesday", ["Chemistry", "Chemistry", "Lunch", "Mathematics"]),
        ("Thursday", ["English", "Physics", "Lunch", "Mathematics"]),
        ("Friday", ["Mathematics", "English", "Lunch", "Physics"]),
    ];

    for (day_name, subjects) in week {
        for (index, subject) in subjects.iter().enumerate() {
            let kind = if *subject == "Lunch" {
                SlotKind::Lunch
            } else {
                SlotKind::Class
            };
            let slot_number = i32::try_from(index + 1)?;
            upsert_slots(pool, &config, day_name, &[slot_number], subject, kind).await?;
        }
    }

    let catalogue = try_fetch_slots(pool, config.id).await?;
    let marks = [
        (0, DayStatus::Normal, [SlotStatus::Present, SlotStatus::Present, SlotStatus::Absent]),
        (1, DayStatus::Normal, [SlotStatus::Present, SlotStatus::Absent, SlotStatus::Present]),
        (2, DayStatus::Holiday, [SlotStatus::Absent, SlotStatus::Absent, SlotStatus::Absent]),
        (3, DayStatus::Normal, [SlotStatus::NotConsidered, SlotStatus::Present, SlotStatus::Present]),
        (4, DayStatus::Normal, [SlotStatus::Present, SlotStatus::Present, SlotStatus::Absent]),
    ];

    for (offset, day_status, statuses) in marks {
        let date = start_date + Duration::days(offset);
        let day_name = calendar::day_name(date);
        let record_id =
            upsert_attendance_record(pool, user_id, config.id, date, Some(day_status)).await?;

        let classes = catalogue
            .iter()
            .filter(|slot| slot.day_name == day_name && slot.slot_kind.is_counted());
        for (slot, status) in classes.zip(statuses) {
            upsert_attendance_slot(pool, record_id, slot.id, status).await?;
        }
    }

    Ok(user_id)
}

fn config_from_row(row: &PgRow) -> anyhow::Result<TimetableConfig> {
    let working_days: i16 = row.try_get("working_days")?;
    Ok(TimetableConfig {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        working_days: u8::try_from(working_days).context("working_days out of range")?,
        slots_per_day: row.try_get("slots_per_day")?,
        start_date: row.try_get("start_date")?,
        min_attendance: row.try_get("min_attendance")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}
