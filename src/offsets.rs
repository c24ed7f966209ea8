//! Relative time offsets for de-identifying event timestamps.
//!
//! Each timestamp is expressed as its distance from the earliest one, so the
//! spacing between events survives while the calendar position does not.
//! Random fuzz bounded by `max_fuzz_seconds` is added to every offset.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDateTime;
use rand::Rng;
use tracing::{info, warn};

use crate::error::Error;
use crate::router::create_sink;
use crate::types::Result;
use crate::validators::parse_date_time;

const SECONDS_PER_MINUTE: f64 = 60.0;
const SECONDS_PER_HOUR: f64 = 60.0 * 60.0;
const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

/// Header of the offsets table
pub const OFFSET_HEADER: [&str; 5] = ["datetime", "seconds", "minutes", "hours", "days"];

#[derive(Debug, Clone)]
pub struct OffsetOptions {
    /// strftime layout of the input timestamps
    pub format: String,
    /// Largest absolute fuzz, in seconds
    pub max_fuzz_seconds: f64,
}

/// One output line: the original text and, if it parsed, its offset
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetRow {
    pub original: String,
    pub seconds: Option<f64>,
}

impl OffsetRow {
    fn record(&self) -> Vec<String> {
        let mut record = vec![self.original.clone()];
        match self.seconds {
            Some(seconds) => record.extend(
                [
                    seconds,
                    seconds / SECONDS_PER_MINUTE,
                    seconds / SECONDS_PER_HOUR,
                    seconds / SECONDS_PER_DAY,
                ]
                .iter()
                .map(|v| v.to_string()),
            ),
            None => record.extend(std::iter::repeat(String::new()).take(4)),
        }
        record
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetSummary {
    pub parsed: usize,
    pub unparsed: usize,
}

/// Compute fuzzed offsets from the earliest parseable timestamp
///
/// Parsed timestamps come first in chronological order; lines that do not
/// parse follow in input order with no offset.
pub fn compute_offsets<R: Rng>(
    timestamps: &[String],
    options: &OffsetOptions,
    rng: &mut R,
) -> Result<Vec<OffsetRow>> {
    let max_fuzz = options.max_fuzz_seconds;
    // The sampled range spans twice the bound and must stay finite
    if !(2.0 * max_fuzz).is_finite() || max_fuzz < 0.0 {
        return Err(Error::InvalidInput(format!(
            "maximum fuzz must be a finite, non-negative number of seconds, got {}",
            max_fuzz
        )));
    }

    let mut parsed: Vec<(NaiveDateTime, &String)> = Vec::new();
    let mut unparsed: Vec<&String> = Vec::new();
    for (position, raw) in timestamps.iter().enumerate() {
        match parse_date_time(raw.trim(), &options.format) {
            Some(at) => parsed.push((at, raw)),
            None => {
                warn!(entry = position + 1, "timestamp does not match the expected format");
                unparsed.push(raw);
            }
        }
    }
    parsed.sort_by_key(|(at, _)| *at);

    let Some(&(index, _)) = parsed.first() else {
        return Ok(unparsed
            .into_iter()
            .map(|raw| OffsetRow {
                original: raw.clone(),
                seconds: None,
            })
            .collect());
    };

    let mut rows = Vec::with_capacity(timestamps.len());
    for (at, raw) in parsed {
        let exact = (at - index).num_milliseconds() as f64 / 1000.0;
        let fuzz = if max_fuzz > 0.0 {
            rng.random_range(-max_fuzz..=max_fuzz)
        } else {
            0.0
        };
        rows.push(OffsetRow {
            original: raw.clone(),
            seconds: Some(exact + fuzz),
        });
    }
    rows.extend(unparsed.into_iter().map(|raw| OffsetRow {
        original: raw.clone(),
        seconds: None,
    }));
    Ok(rows)
}

/// Read timestamps (one per line) and write the offsets table
pub fn run_offsets<R: Rng>(
    input: &Path,
    output: &Path,
    options: &OffsetOptions,
    rng: &mut R,
) -> Result<OffsetSummary> {
    let file = File::open(input).map_err(|source| Error::FileOpen {
        path: input.to_path_buf(),
        source,
    })?;

    let mut timestamps = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if !line.trim().is_empty() {
            timestamps.push(line.trim_end().to_string());
        }
    }

    let rows = compute_offsets(&timestamps, options, rng)?;

    let mut writer = create_sink(output)?;
    writer.write_record(OFFSET_HEADER)?;
    let mut summary = OffsetSummary::default();
    for row in &rows {
        writer.write_record(row.record())?;
        if row.seconds.is_some() {
            summary.parsed += 1;
        } else {
            summary.unparsed += 1;
        }
    }
    writer.flush()?;

    info!(
        parsed = summary.parsed,
        unparsed = summary.unparsed,
        out = %output.display(),
        "offsets written"
    );
    Ok(summary)
}
