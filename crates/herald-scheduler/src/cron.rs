//! Lightweight 5-field cron expressions: "MIN HOUR DOM MON DOW".
//!
//! Minute and hour fields support `*`, `*/N`, comma lists, and single
//! values. The day/month fields are parsed but only `*` is honored — the
//! daily drain never needs calendar-level selection. All times are UTC.

use chrono::{DateTime, Duration, Timelike, Utc};

use herald_core::{HeraldError, Result};

/// A parsed schedule: the set of minutes and hours it fires on.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    minutes: Vec<u32>,
    hours: Vec<u32>,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let fields: Vec<&str> = expression.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(HeraldError::Config(format!(
                "invalid cron expression '{expression}' (need 5 fields: MIN HOUR DOM MON DOW)"
            )));
        }
        let minutes = parse_field(fields[0], 59).ok_or_else(|| {
            HeraldError::Config(format!("invalid cron minute field '{}'", fields[0]))
        })?;
        let hours = parse_field(fields[1], 23).ok_or_else(|| {
            HeraldError::Config(format!("invalid cron hour field '{}'", fields[1]))
        })?;
        for field in &fields[2..] {
            if *field != "*" {
                tracing::warn!("Cron day/month field '{field}' not supported, treating as '*'");
            }
        }
        Ok(Self { minutes, hours })
    }

    /// The next fire time strictly after `after`, minute-aligned.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = (after + Duration::minutes(1)).with_second(0)?.with_nanosecond(0)?;
        // A matching minute always exists within 24h of a valid schedule;
        // scan with a hard bound anyway.
        for _ in 0..(25 * 60) {
            if self.minutes.contains(&candidate.minute()) && self.hours.contains(&candidate.hour()) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

fn parse_field(field: &str, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((0..=max).collect());
    }
    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((0..=max).step_by(n as usize).collect());
    }
    let values: Option<Vec<u32>> = field
        .split(',')
        .map(|part| part.trim().parse::<u32>().ok().filter(|v| *v <= max))
        .collect();
    values.filter(|v| !v.is_empty())
}
