//! Usage log command handler

use anyhow::Context;
use chrono::{Days, NaiveDate, NaiveTime, Utc};

use crate::state::SharedState;

pub async fn cmd_logs(state: &SharedState, date: Option<&str>) -> anyhow::Result<()> {
    let day = match date {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{raw}', expected YYYY-MM-DD"))?,
        None => Utc::now().date_naive(),
    };

    let start = day.and_time(NaiveTime::MIN).and_utc();
    let end = start
        .checked_add_days(Days::new(1))
        .context("Date out of range")?;

    let logs = state.occupancy.logs_between(start, end).await?;

    if logs.is_empty() {
        println!("No usage logged on {day}.");
        return Ok(());
    }

    println!("Usage on {day} ({} entries)", logs.len());
    println!("{:-<70}", "");

    for log in logs {
        let kind = log
            .main_occupant
            .as_deref()
            .map_or_else(|| "primary".to_string(), |main| format!("contributing to {main}"));
        println!(
            "{:<16} {:<28} {} | {}h | {} -> {} | {}",
            log.ip,
            log.identity,
            log.project,
            log.duration_hours,
            log.started_at.format("%H:%M"),
            log.ended_at.format("%H:%M"),
            kind
        );
    }

    Ok(())
}
