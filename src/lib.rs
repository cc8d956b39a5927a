pub mod attendance;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
