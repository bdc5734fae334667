//! Occurrence expansion for recurring meetings.
//!
//! v1 meetings declare recurrence the way the conferencing platform does:
//! a type (daily/weekly/monthly), a repeat interval, optional weekly day
//! sets and monthly day, and an end condition (a count or an end
//! timestamp). Expansion materializes concrete occurrences up to a fixed
//! horizon of 100 entries; per-occurrence overrides can move or cancel
//! individual entries.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::Serialize;

use lfx_sync_types::Payload;

/// Hard cap on materialized occurrences per meeting.
pub const OCCURRENCE_HORIZON: usize = 100;

/// One materialized occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    /// Stable id: the epoch seconds of the unmodified start time.
    pub occurrence_id: String,
    pub start_time: String,
    pub duration: i64,
}

/// Declared recurrence rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Daily { interval: i64 },
    /// `weekdays` uses the platform's 1=Sunday … 7=Saturday numbering.
    Weekly { interval: i64, weekdays: Vec<u32> },
    Monthly { interval: i64, day: u32 },
}

/// End condition for a recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCondition {
    Count(usize),
    Until(DateTime<Utc>),
    /// No declared end: the horizon is the only bound.
    Open,
}

/// Parses the recurrence object off a meeting payload. `None` means the
/// meeting is single-occurrence.
pub fn parse_recurrence(payload: &Payload) -> Option<(Recurrence, EndCondition)> {
    let recurrence = payload.object_field("recurrence")?;
    let recurrence = Payload::from_object(recurrence.clone());

    let interval = recurrence.i64_field("repeat_interval").unwrap_or(1).max(1);

    let rule = match recurrence.i64_field("type")? {
        1 => Recurrence::Daily { interval },
        2 => {
            let weekdays: Vec<u32> = recurrence
                .str_field("weekly_days")
                .map(|days| {
                    days.split(',')
                        .filter_map(|d| d.trim().parse::<u32>().ok())
                        .filter(|d| (1..=7).contains(d))
                        .collect()
                })
                .unwrap_or_default();
            Recurrence::Weekly { interval, weekdays }
        }
        3 => Recurrence::Monthly {
            interval,
            day: recurrence
                .i64_field("monthly_day")
                .and_then(|d| u32::try_from(d).ok())
                .filter(|d| (1..=31).contains(d))?,
        },
        _ => return None,
    };

    let end = if let Some(count) = recurrence.i64_field("end_times") {
        EndCondition::Count(usize::try_from(count).unwrap_or(0).min(OCCURRENCE_HORIZON))
    } else if let Some(until) = recurrence
        .str_field("end_date_time")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    {
        EndCondition::Until(until.with_timezone(&Utc))
    } else {
        EndCondition::Open
    };

    Some((rule, end))
}

/// Materializes the series' start times.
pub fn expand(
    start: DateTime<Utc>,
    rule: &Recurrence,
    end: EndCondition,
) -> Vec<DateTime<Utc>> {
    let limit = match end {
        EndCondition::Count(n) => n.min(OCCURRENCE_HORIZON),
        _ => OCCURRENCE_HORIZON,
    };
    let until = match end {
        EndCondition::Until(ts) => Some(ts),
        _ => None,
    };

    let mut out = Vec::with_capacity(limit.min(16));
    match rule {
        Recurrence::Daily { interval } => {
            let mut current = start;
            while out.len() < limit {
                if until.is_some_and(|u| current > u) {
                    break;
                }
                out.push(current);
                current += Duration::days(*interval);
            }
        }
        Recurrence::Weekly { interval, weekdays } => {
            // Empty day set degenerates to "same weekday as the start".
            let days: Vec<u32> = if weekdays.is_empty() {
                vec![platform_weekday(start)]
            } else {
                weekdays.clone()
            };

            let week_start = start.date_naive()
                - Duration::days(i64::from(start.weekday().num_days_from_sunday()));
            let mut current = start;
            while out.len() < limit {
                if until.is_some_and(|u| current > u) {
                    break;
                }
                let elapsed_weeks =
                    (current.date_naive() - week_start).num_days().div_euclid(7);
                if current >= start
                    && elapsed_weeks % interval == 0
                    && days.contains(&platform_weekday(current))
                {
                    out.push(current);
                }
                current += Duration::days(1);
                // Bounded walk: a week set that never matches cannot spin
                // past the horizon in days.
                if (current - start).num_days() > (limit as i64 + 2) * 7 * interval {
                    break;
                }
            }
        }
        Recurrence::Monthly { interval, day } => {
            let mut months_ahead: u32 = 0;
            while out.len() < limit {
                let Some(shifted) = start.checked_add_months(Months::new(months_ahead)) else {
                    break;
                };
                let current = clamp_to_day(shifted, *day);
                if until.is_some_and(|u| current > u) {
                    break;
                }
                if current >= start {
                    out.push(current);
                }
                let Some(next) = months_ahead.checked_add(u32::try_from(*interval).unwrap_or(1))
                else {
                    break;
                };
                months_ahead = next;
            }
        }
    }
    out
}

/// Expands a meeting's occurrences and applies per-occurrence overrides.
///
/// Overrides are matched by `occurrence_id`; an override may move the
/// start time, change the duration, or cancel the occurrence entirely
/// (`status == "deleted"`).
pub fn occurrences(payload: &Payload, default_duration: i64) -> Vec<Occurrence> {
    let Some(start) = payload
        .str_field("start_time")
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
    else {
        return Vec::new();
    };

    let starts = match parse_recurrence(payload) {
        Some((rule, end)) => expand(start, &rule, end),
        None => vec![start],
    };

    let overrides = payload.array_field("occurrences").cloned().unwrap_or_default();

    starts
        .into_iter()
        .filter_map(|ts| {
            let id = ts.timestamp().to_string();
            let mut occurrence = Occurrence {
                occurrence_id: id.clone(),
                start_time: ts.to_rfc3339(),
                duration: default_duration,
            };

            if let Some(over) = overrides
                .iter()
                .filter_map(|v| v.as_object())
                .map(|o| Payload::from_object(o.clone()))
                .find(|o| o.str_field("occurrence_id") == Some(id.as_str()))
            {
                if over.str_field("status") == Some("deleted") {
                    return None;
                }
                if let Some(moved) = over
                    .str_field("start_time")
                    .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                {
                    occurrence.start_time = moved.with_timezone(&Utc).to_rfc3339();
                }
                if let Some(duration) = over.i64_field("duration") {
                    occurrence.duration = duration;
                }
            }
            Some(occurrence)
        })
        .collect()
}

/// Platform weekday numbering: 1 = Sunday … 7 = Saturday.
fn platform_weekday(ts: DateTime<Utc>) -> u32 {
    ts.weekday().num_days_from_sunday() + 1
}

fn clamp_to_day(ts: DateTime<Utc>, day: u32) -> DateTime<Utc> {
    let last = last_day_of_month(ts.year(), ts.month());
    ts.with_day(day.min(last)).unwrap_or(ts)
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    for day in (28..=31).rev() {
        if chrono::NaiveDate::from_ymd_opt(year, month, day).is_some() {
            return day;
        }
    }
    28
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn payload(value: serde_json::Value) -> Payload {
        Payload::from_object(value.as_object().unwrap().clone())
    }

    #[test]
    fn daily_count_bound() {
        let starts = expand(
            ts("2024-01-01T10:00:00Z"),
            &Recurrence::Daily { interval: 2 },
            EndCondition::Count(3),
        );
        assert_eq!(
            starts,
            vec![
                ts("2024-01-01T10:00:00Z"),
                ts("2024-01-03T10:00:00Z"),
                ts("2024-01-05T10:00:00Z"),
            ]
        );
    }

    #[test]
    fn daily_until_bound() {
        let starts = expand(
            ts("2024-01-01T10:00:00Z"),
            &Recurrence::Daily { interval: 1 },
            EndCondition::Until(ts("2024-01-03T10:00:00Z")),
        );
        assert_eq!(starts.len(), 3);
    }

    #[test]
    fn open_series_stops_at_horizon() {
        let starts = expand(
            ts("2024-01-01T10:00:00Z"),
            &Recurrence::Daily { interval: 1 },
            EndCondition::Open,
        );
        assert_eq!(starts.len(), OCCURRENCE_HORIZON);
    }

    #[test]
    fn weekly_respects_day_set() {
        // 2024-01-01 is a Monday (platform day 2); request Mon+Wed (2, 4)
        let starts = expand(
            ts("2024-01-01T10:00:00Z"),
            &Recurrence::Weekly {
                interval: 1,
                weekdays: vec![2, 4],
            },
            EndCondition::Count(4),
        );
        assert_eq!(
            starts,
            vec![
                ts("2024-01-01T10:00:00Z"),
                ts("2024-01-03T10:00:00Z"),
                ts("2024-01-08T10:00:00Z"),
                ts("2024-01-10T10:00:00Z"),
            ]
        );
    }

    #[test]
    fn biweekly_skips_off_weeks() {
        let starts = expand(
            ts("2024-01-01T10:00:00Z"),
            &Recurrence::Weekly {
                interval: 2,
                weekdays: vec![2],
            },
            EndCondition::Count(3),
        );
        assert_eq!(
            starts,
            vec![
                ts("2024-01-01T10:00:00Z"),
                ts("2024-01-15T10:00:00Z"),
                ts("2024-01-29T10:00:00Z"),
            ]
        );
    }

    #[test]
    fn monthly_clamps_short_months() {
        let starts = expand(
            ts("2024-01-31T10:00:00Z"),
            &Recurrence::Monthly {
                interval: 1,
                day: 31,
            },
            EndCondition::Count(3),
        );
        assert_eq!(
            starts,
            vec![
                ts("2024-01-31T10:00:00Z"),
                ts("2024-02-29T10:00:00Z"),
                ts("2024-03-31T10:00:00Z"),
            ]
        );
    }

    #[test]
    fn single_meeting_yields_one_occurrence() {
        let p = payload(json!({"start_time": "2024-01-01T10:00:00Z", "duration": "60"}));
        let out = occurrences(&p, 60);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].duration, 60);
        assert_eq!(out[0].occurrence_id, ts("2024-01-01T10:00:00Z").timestamp().to_string());
    }

    #[test]
    fn overrides_move_and_cancel() {
        let first_id = ts("2024-01-01T10:00:00Z").timestamp().to_string();
        let second_id = ts("2024-01-02T10:00:00Z").timestamp().to_string();
        let p = payload(json!({
            "start_time": "2024-01-01T10:00:00Z",
            "recurrence": {"type": 1, "repeat_interval": 1, "end_times": 3},
            "occurrences": [
                {"occurrence_id": first_id, "status": "deleted"},
                {"occurrence_id": second_id, "start_time": "2024-01-02T15:00:00Z", "duration": 90},
            ],
        }));

        let out = occurrences(&p, 60);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].occurrence_id, second_id);
        assert_eq!(out[0].start_time, "2024-01-02T15:00:00+00:00");
        assert_eq!(out[0].duration, 90);
        assert_eq!(out[1].duration, 60);
    }

    #[test]
    fn missing_start_time_yields_nothing() {
        let p = payload(json!({"topic": "x"}));
        assert!(occurrences(&p, 60).is_empty());
    }
}
