use std::path::PathBuf;

use anyhow::{bail, Context};
use attendance_tracker::attendance::{compute_overall_attendance, compute_subject_wise_attendance};
use attendance_tracker::calendar;
use attendance_tracker::config::AppConfig;
use attendance_tracker::db;
use attendance_tracker::models::{
    AttendanceRecord, DayStatus, LogSnapshot, NewTimetableConfig, SlotKind, SlotStatus,
    TimetableConfig, TimetableSlot,
};
use attendance_tracker::report;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

const SETUP_HINT: &str = "No timetable yet. Run `attendance-tracker setup` to create one.";

#[derive(Parser)]
#[command(name = "attendance-tracker")]
#[command(about = "Per-slot class attendance tracker with minimum-attendance warnings", long_about = None)]
struct Cli {
    /// User the command acts on
    #[arg(long, global = true)]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo user with a week of attendance
    Seed,
    /// Create a new active timetable, replacing the current one
    Setup {
        #[arg(long, default_value_t = 6)]
        working_days: u8,
        #[arg(long, default_value_t = 8)]
        slots_per_day: i32,
        /// First tracked date (defaults to today)
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        min_attendance: Option<i32>,
    },
    /// Assign a subject to one or more slots of a weekday
    Slot {
        #[arg(long)]
        day: String,
        /// Slot numbers, e.g. `--slots 3,4` to merge two periods
        #[arg(long, value_delimiter = ',', required = true)]
        slots: Vec<i32>,
        #[arg(long)]
        subject: String,
        #[arg(long, default_value = "class")]
        kind: SlotKind,
    },
    /// Print the weekly timetable
    Timetable,
    /// Record a slot status; without --status the slot advances to its next state
    Mark {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        slot: i32,
        #[arg(long, conflicts_with = "clear")]
        status: Option<SlotStatus>,
        /// Remove the recorded status
        #[arg(long)]
        clear: bool,
    },
    /// Set a day's status; without --status the day advances to its next state
    Day {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        status: Option<DayStatus>,
    },
    /// Show overall and per-subject attendance
    Stats,
    /// Write a markdown report
    Report {
        #[arg(long, default_value = "attendance.md")]
        out: PathBuf,
    },
    /// Import marks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Archive the current tracking period as a named log
    Archive {
        #[arg(long)]
        name: String,
    },
    /// List archived logs
    Logs,
    /// Delete the active timetable and all of its attendance
    Delete,
}

struct Snapshot {
    config: TimetableConfig,
    slots: Vec<TimetableSlot>,
    records: Vec<AttendanceRecord>,
}

async fn load_snapshot(pool: &PgPool, user_id: Uuid, today: NaiveDate) -> Option<Snapshot> {
    let config = db::fetch_active_config(pool, user_id).await?;
    let slots = db::fetch_slots(pool, config.id).await;
    let records = db::fetch_attendance(pool, user_id, config.id, config.start_date, today).await;
    Some(Snapshot {
        config,
        slots,
        records,
    })
}

fn require_user(user: Option<Uuid>) -> anyhow::Result<Uuid> {
    user.context("--user is required for this command")
}

fn check_date(config: &TimetableConfig, date: NaiveDate, today: NaiveDate) -> anyhow::Result<()> {
    if date < config.start_date || date > today {
        bail!(
            "{date} is outside the tracking window {} to {today}",
            config.start_date
        );
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")?;

    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let user_id = db::seed(&pool).await?;
            println!("Seed data inserted for user {user_id}.");
        }
        Commands::Setup {
            working_days,
            slots_per_day,
            start_date,
            min_attendance,
        } => {
            let user_id = require_user(cli.user)?;
            let config = db::create_config(
                &pool,
                user_id,
                &NewTimetableConfig {
                    working_days,
                    slots_per_day,
                    start_date: start_date.unwrap_or(today),
                    min_attendance: min_attendance.unwrap_or(settings.default_min_attendance),
                },
            )
            .await?;
            println!(
                "Timetable {} created: {} days x {} slots from {}, minimum {}%.",
                config.id,
                config.working_days,
                config.slots_per_day,
                config.start_date,
                config.min_attendance
            );
        }
        Commands::Slot {
            day,
            slots,
            subject,
            kind,
        } => {
            let user_id = require_user(cli.user)?;
            let Some(config) = db::fetch_active_config(&pool, user_id).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            let day_name = calendar::normalize_day_name(&day)?;
            let saved = db::upsert_slots(&pool, &config, day_name, &slots, &subject, kind).await?;
            println!("Saved {saved} slot(s) on {day_name} as {subject} ({kind}).");
        }
        Commands::Timetable => {
            let user_id = require_user(cli.user)?;
            let Some(config) = db::fetch_active_config(&pool, user_id).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            let slots = db::fetch_slots(&pool, config.id).await;
            for day_name in calendar::working_day_names(config.working_days)? {
                let cells: Vec<String> = (1..=config.slots_per_day)
                    .map(|number| {
                        slots
                            .iter()
                            .find(|slot| slot.day_name == *day_name && slot.slot_number == number)
                            .map(|slot| match slot.slot_kind {
                                SlotKind::Class => slot.subject.clone(),
                                kind => format!("{} ({kind})", slot.subject),
                            })
                            .unwrap_or_else(|| "-".to_string())
                    })
                    .collect();
                println!("{day_name:<10} {}", cells.join(" | "));
            }
        }
        Commands::Mark {
            date,
            slot,
            status,
            clear,
        } => {
            let user_id = require_user(cli.user)?;
            let Some(config) = db::fetch_active_config(&pool, user_id).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            let date = date.unwrap_or(today);
            check_date(&config, date, today)?;

            let day_name = calendar::day_name(date);
            let catalogue = db::fetch_slots(&pool, config.id).await;
            let target = catalogue
                .iter()
                .find(|entry| entry.day_name == day_name && entry.slot_number == slot)
                .with_context(|| format!("no slot {slot} on {day_name}"))?;
            if !target.slot_kind.is_counted() {
                bail!(
                    "{day_name} slot {slot} is {} and is not tracked",
                    target.slot_kind
                );
            }

            let next = if clear {
                None
            } else if status.is_some() {
                status
            } else {
                let current =
                    db::fetch_slot_status(&pool, user_id, config.id, date, target.id).await?;
                SlotStatus::next(current)
            };

            let record_id =
                db::upsert_attendance_record(&pool, user_id, config.id, date, None).await?;
            match next {
                Some(status) => {
                    db::upsert_attendance_slot(&pool, record_id, target.id, status).await?;
                    println!("{date} {day_name} slot {slot} ({}): {status}", target.subject);
                }
                None => {
                    db::clear_attendance_slot(&pool, record_id, target.id).await?;
                    println!("{date} {day_name} slot {slot} ({}): cleared", target.subject);
                }
            }
        }
        Commands::Day { date, status } => {
            let user_id = require_user(cli.user)?;
            let Some(config) = db::fetch_active_config(&pool, user_id).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            let date = date.unwrap_or(today);
            check_date(&config, date, today)?;

            let next = match status {
                Some(status) => status,
                None => db::fetch_day_status(&pool, user_id, config.id, date)
                    .await?
                    .next(),
            };
            db::upsert_attendance_record(&pool, user_id, config.id, date, Some(next)).await?;
            println!("{date} marked {next}.");
        }
        Commands::Stats => {
            let user_id = require_user(cli.user)?;
            let Some(snapshot) = load_snapshot(&pool, user_id, today).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            let days = calendar::build_day_entries(&snapshot.records, &snapshot.slots);
            let min_attendance = snapshot.config.min_attendance;
            let overall = compute_overall_attendance(&days, min_attendance);
            let subjects = compute_subject_wise_attendance(&days, min_attendance);

            println!(
                "Overall: {:.1}% ({} of {} classes), {}",
                overall.percentage, overall.present, overall.total, overall.status
            );
            if subjects.is_empty() {
                println!("No classes recorded yet.");
            }
            for subject in &subjects {
                println!(
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
        Commands::Report { out } => {
            let user_id = require_user(cli.user)?;
            let Some(snapshot) = load_snapshot(&pool, user_id, today).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            let days = calendar::build_day_entries(&snapshot.records, &snapshot.slots);
            let min_attendance = snapshot.config.min_attendance;
            let overall = compute_overall_attendance(&days, min_attendance);
            let subjects = compute_subject_wise_attendance(&days, min_attendance);
            let report = report::build_report(&snapshot.config, &overall, &subjects, today);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Import { csv } => {
            let user_id = require_user(cli.user)?;
            let Some(config) = db::fetch_active_config(&pool, user_id).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            let imported = db::import_csv(&pool, user_id, &config, &csv).await?;
            println!("Imported {imported} slot marks from {}.", csv.display());
        }
        Commands::Archive { name } => {
            let user_id = require_user(cli.user)?;
            let Some(snapshot) = load_snapshot(&pool, user_id, today).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            let start_date = snapshot.config.start_date;
            let data = LogSnapshot {
                config: snapshot.config,
                slots: snapshot.slots,
                attendance: snapshot.records,
            };
            let log_id =
                db::create_attendance_log(&pool, user_id, &name, start_date, today, &data).await?;
            println!("Archived {name} ({start_date} to {today}) as log {log_id}.");
        }
        Commands::Logs => {
            let user_id = require_user(cli.user)?;
            let logs = db::fetch_attendance_logs(&pool, user_id).await;
            if logs.is_empty() {
                println!("No logs yet. Archive a tracking period to create one.");
                return Ok(());
            }
            for log in logs {
                let days = calendar::build_day_entries(&log.data.attendance, &log.data.slots);
                let overall = compute_overall_attendance(&days, log.data.config.min_attendance);
                println!(
                    "- {} ({} to {}): {:.1}% ({} of {} classes), {}",
                    log.log_name,
                    log.start_date,
                    log.end_date,
                    overall.percentage,
                    overall.present,
                    overall.total,
                    overall.status
                );
            }
        }
        Commands::Delete => {
            let user_id = require_user(cli.user)?;
            let Some(config) = db::fetch_active_config(&pool, user_id).await else {
                println!("{SETUP_HINT}");
                return Ok(());
            };
            db::delete_config(&pool, config.id).await?;
            info!(%user_id, config_id = %config.id, "timetable removed");
            println!("Timetable {} deleted.", config.id);
        }
    }

    Ok(())
}
