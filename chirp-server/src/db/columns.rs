//! Conversions between SQLite text columns and domain types.
//!
//! Timestamps are written with a fixed-width UTC format so that text
//! comparison in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

use chirp_types::{BadgeKind, Email, Plan};

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

pub fn email_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Email> {
    let raw: String = row.get(idx)?;
    Email::parse(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

pub fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e.to_string()))
}

pub fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| conversion_error(idx, format!("bad timestamp {:?}: {}", raw, e)))
}

pub fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        raw.parse::<DateTime<Utc>>()
            .map_err(|e| conversion_error(idx, format!("bad timestamp {:?}: {}", raw, e)))
    })
    .transpose()
}

pub fn plan_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Plan> {
    let raw: String = row.get(idx)?;
    Plan::parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown plan {:?}", raw)))
}

pub fn badge_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<BadgeKind> {
    let raw: String = row.get(idx)?;
    BadgeKind::parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown badge {:?}", raw)))
}
