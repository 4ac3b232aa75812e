//! Temporal model for proband ages and disease onset.
//!
//! All values are days relative to birth; negative values are gestational.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LiricalError, Result};

pub const DAYS_PER_YEAR: f64 = 365.25;
pub const DAYS_PER_MONTH: f64 = DAYS_PER_YEAR / 12.0;
/// Length of a full-term pregnancy, used to place gestational ages before birth.
pub const GESTATION_DAYS: f64 = 280.0;

/// How an onset interval relates to a proband's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalOverlap {
    /// Onset ends at or before the youngest plausible age.
    Before,
    /// Onset starts after the oldest plausible age.
    After,
    Overlapping,
}

/// A disease onset window. `end == None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalInterval {
    pub start: f64,
    #[serde(default)]
    pub end: Option<f64>,
}

impl TemporalInterval {
    pub fn new(start: f64, end: Option<f64>) -> Result<Self> {
        if !start.is_finite() {
            return Err(LiricalError::InvalidAge(format!("onset start {start} is not finite")));
        }
        if let Some(end) = end {
            if !end.is_finite() || end < start {
                return Err(LiricalError::InvalidAge(format!("onset end {end} precedes start {start}")));
            }
        }
        Ok(Self { start, end })
    }

    /// Closed interval in years; `end` is clamped to `start`.
    pub fn years(start: f64, end: f64) -> Self {
        let start = start * DAYS_PER_YEAR;
        Self { start, end: Some((end * DAYS_PER_YEAR).max(start)) }
    }

    pub fn open_ended(start: f64) -> Self {
        Self { start, end: None }
    }

    /// Congenital onset: at or before birth.
    pub fn congenital() -> Self {
        Self { start: -GESTATION_DAYS, end: Some(0.0) }
    }

    pub fn end_or_infinity(&self) -> f64 {
        self.end.unwrap_or(f64::INFINITY)
    }

    pub fn overlap_with(&self, age: &Age) -> TemporalOverlap {
        if self.end_or_infinity() <= age.lower {
            TemporalOverlap::Before
        } else if self.start > age.upper {
            TemporalOverlap::After
        } else {
            TemporalOverlap::Overlapping
        }
    }

    /// Share of the onset window lying at or before `day`, assuming onset is uniform within it.
    /// Open-ended windows that have started by `day` count as fully reached.
    pub fn fraction_at_or_before(&self, day: f64) -> f64 {
        if day < self.start {
            return 0.0;
        }
        match self.end {
            None => 1.0,
            Some(end) if end <= day => 1.0,
            Some(end) => {
                let width = end - self.start;
                if width <= 0.0 {
                    1.0
                } else {
                    ((day - self.start) / width).clamp(0.0, 1.0)
                }
            }
        }
    }
}

/// Proband age as an interval so that approximate ages are representable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Age {
    pub lower: f64,
    pub upper: f64,
}

impl Age {
    pub fn point(days: f64) -> Self {
        Self { lower: days, upper: days }
    }

    pub fn years(years: f64) -> Self {
        Self::point(years * DAYS_PER_YEAR)
    }

    pub fn interval(lower: f64, upper: f64) -> Result<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(LiricalError::InvalidAge(format!("[{lower}, {upper}] is not finite")));
        }
        if upper < lower {
            return Err(LiricalError::InvalidAge(format!("upper bound {upper} precedes lower bound {lower}")));
        }
        Ok(Self { lower, upper })
    }

    pub fn postnatal(years: u32, months: u32, days: u32) -> Self {
        Self::point(years as f64 * DAYS_PER_YEAR + months as f64 * DAYS_PER_MONTH + days as f64)
    }

    /// Gestational age, e.g. 30 weeks 2 days, expressed relative to birth.
    pub fn gestational(weeks: u32, days: u32) -> Self {
        Self::point(weeks as f64 * 7.0 + days as f64 - GESTATION_DAYS)
    }

    pub fn is_point(&self) -> bool {
        self.lower == self.upper
    }
}

impl FromStr for Age {
    type Err = LiricalError;

    /// Parses ISO 8601 durations such as `P3Y`, `P1Y6M` or `P10D`.
    fn from_str(s: &str) -> Result<Self> {
        let body = s
            .trim()
            .strip_prefix('P')
            .ok_or_else(|| LiricalError::InvalidAge(format!("'{s}' is not an ISO 8601 duration")))?;
        if body.is_empty() {
            return Err(LiricalError::InvalidAge(format!("'{s}' has no components")));
        }

        let mut total = 0.0;
        let mut number = String::new();
        for c in body.chars() {
            if c.is_ascii_digit() {
                number.push(c);
                continue;
            }
            let value: f64 = number
                .parse()
                .map_err(|_| LiricalError::InvalidAge(format!("missing number before '{c}' in '{s}'")))?;
            total += match c {
                'Y' => value * DAYS_PER_YEAR,
                'M' => value * DAYS_PER_MONTH,
                'W' => value * 7.0,
                'D' => value,
                other => return Err(LiricalError::InvalidAge(format!("unsupported unit '{other}' in '{s}'"))),
            };
            number.clear();
        }
        if !number.is_empty() {
            return Err(LiricalError::InvalidAge(format!("trailing number without unit in '{s}'")));
        }
        Ok(Age::point(total))
    }
}
