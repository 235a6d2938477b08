//! Grid alignment and hourly gap filling.
//!
//! Samples arrive at irregular times and with holes (sensor offline, upload
//! skipped). Charts want every day on the same 288-point axis, so samples are
//! placed on a fixed 5-minute grid and missing slots are left empty rather
//! than invented. Hourly averages are the opposite case: a smooth line is
//! wanted, so missing hours are filled.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::types::{parse_time, DailyDocument, DayEntry, GridSeries, HourlySeries};

/// Minutes between grid slots
pub const SLOT_MINUTES: u32 = 5;

/// Slots in a day: 24 * 60 / 5
pub const GRID_SLOTS: usize = (24 * 60 / SLOT_MINUTES) as usize;

fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Place samples onto the 288-slot grid.
///
/// A slot takes the sample whose time of day (seconds ignored) equals the
/// slot's; when several samples share a slot the first one wins, even if its
/// value is missing. Samples off the 5-minute boundary are dropped. Grid
/// timestamps are built on `anchor` so days can be overlaid.
pub fn expand_to_grid(
    times: &[String],
    temps: &[Option<f64>],
    humids: &[Option<f64>],
    anchor: NaiveDate,
) -> GridSeries {
    let mut temperature = vec![None; GRID_SLOTS];
    let mut humidity = vec![None; GRID_SLOTS];
    let mut claimed = vec![false; GRID_SLOTS];

    for (i, raw) in times.iter().enumerate() {
        let Some(t) = parse_time(raw) else {
            tracing::warn!("Skipping unparsable sample time {:?}", raw);
            continue;
        };

        let minute = minute_of_day(t);
        if minute % SLOT_MINUTES != 0 {
            tracing::debug!("Sample at {} is off the 5-minute grid", raw);
            continue;
        }

        let slot = (minute / SLOT_MINUTES) as usize;
        if claimed[slot] {
            continue;
        }
        claimed[slot] = true;
        temperature[slot] = temps.get(i).copied().flatten();
        humidity[slot] = humids.get(i).copied().flatten();
    }

    let datetime = (0..GRID_SLOTS as u32)
        .filter_map(|slot| {
            let minute = slot * SLOT_MINUTES;
            NaiveTime::from_hms_opt(minute / 60, minute % 60, 0).map(|t| anchor.and_time(t))
        })
        .collect();

    GridSeries {
        temperature,
        humidity,
        datetime,
    }
}

fn parse_hour_keys(hourly: &BTreeMap<String, f64>) -> BTreeMap<u32, f64> {
    let mut by_hour = BTreeMap::new();
    for (key, value) in hourly {
        match key.trim().parse::<u32>() {
            Ok(hour) if hour < 24 && value.is_finite() => {
                by_hour.insert(hour, *value);
            }
            _ => tracing::warn!("Ignoring hourly bucket {:?} = {}", key, value),
        }
    }
    by_hour
}

/// Values of an hour-keyed map ordered by numeric hour
pub fn hourly_values(hourly: &BTreeMap<String, f64>) -> Vec<f64> {
    parse_hour_keys(hourly).into_values().collect()
}

/// Expand sparse hourly averages into a dense series from midnight to the
/// last recorded hour.
///
/// Hours before the first bucket repeat its value; interior gaps are linearly
/// interpolated between the neighbouring buckets.
pub fn fill_missing_hours(hourly: &BTreeMap<String, f64>) -> Vec<f64> {
    let known = parse_hour_keys(hourly);
    let (Some((&first_hour, &first_value)), Some(&last_hour)) =
        (known.iter().next(), known.keys().next_back())
    else {
        return Vec::new();
    };

    let mut filled = Vec::with_capacity(last_hour as usize + 1);
    for hour in 0..=last_hour {
        if let Some(value) = known.get(&hour) {
            filled.push(*value);
            continue;
        }
        if hour < first_hour {
            filled.push(first_value);
            continue;
        }

        // Both neighbours exist: hour is past the first bucket and before the last.
        let before = known.range(..hour).next_back();
        let after = known.range(hour..).next();
        match (before, after) {
            (Some((&h0, &v0)), Some((&h1, &v1))) => {
                let t = f64::from(hour - h0) / f64::from(h1 - h0);
                filled.push(v0 + (v1 - v0) * t);
            }
            _ => filled.push(first_value),
        }
    }
    filled
}

/// Prepend the first raw reading so the hourly line starts at the real
/// midnight value instead of the first hour's average.
pub fn adjust_hourly(first_sample: Option<f64>, filled: &[f64]) -> Vec<f64> {
    let origin = first_sample.or_else(|| filled.first().copied());
    origin.into_iter().chain(filled.iter().copied()).collect()
}

/// Close a 24-hour series into a loop by repeating its first value
pub fn wrap_hourly(values: &[f64]) -> Vec<f64> {
    match values.first() {
        Some(first) => values.iter().copied().chain(std::iter::once(*first)).collect(),
        None => Vec::new(),
    }
}

/// Reshape one decoded daily document for the dashboard
pub fn build_day_entry(doc: &DailyDocument, anchor: NaiveDate) -> DayEntry {
    let date = doc.parsed_date();
    if date.is_none() {
        tracing::warn!("Document date {:?} does not parse; timestamps left empty", doc.date);
    }

    let datetime = doc
        .entries
        .time
        .iter()
        .map(|raw| Some(date?.and_time(parse_time(raw)?)))
        .collect();

    let grid = expand_to_grid(
        &doc.entries.time,
        &doc.entries.temp,
        &doc.entries.humid,
        anchor,
    );

    let filled_temp = fill_missing_hours(&doc.hourly_temp);
    let filled_humid = fill_missing_hours(&doc.hourly_humid);
    let first_temp = doc.entries.temp.first().copied().flatten();
    let first_humid = doc.entries.humid.first().copied().flatten();

    DayEntry {
        date: doc.date.clone(),
        temperatures: doc.entries.temp.clone(),
        humidity: doc.entries.humid.clone(),
        datetime,
        data_point_count: doc.data_point_count,
        hourly_temperature: HourlySeries {
            adjusted: adjust_hourly(first_temp, &filled_temp),
            filled: filled_temp,
            raw: doc.hourly_temp.clone(),
        },
        hourly_humidity: HourlySeries {
            adjusted: adjust_hourly(first_humid, &filled_humid),
            filled: filled_humid,
            raw: doc.hourly_humid.clone(),
        },
        expanded_temperature: grid.temperature,
        expanded_humidity: grid.humidity,
        expanded_datetime: grid.datetime,
    }
}
