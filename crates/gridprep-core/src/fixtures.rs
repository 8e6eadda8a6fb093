//! Synthetic time-series fixtures: energy readings and energy losses.
//!
//! Batches are described by fixed plans (customer ranges, date windows,
//! numeric ranges) and expanded in memory before a single bulk insert.
//! Randomness is deliberately unseeded; determinism is only required of the
//! pipeline stages, not of the fixture generators.

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Readings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingKind {
  Normal,
  Estimated,
}

impl ReadingKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ReadingKind::Normal    => "normal",
      ReadingKind::Estimated => "estimated",
    }
  }

  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "normal"    => Ok(ReadingKind::Normal),
      "estimated" => Ok(ReadingKind::Estimated),
      other       => Err(Error::UnknownReadingKind(other.to_string())),
    }
  }
}

/// A persisted reading row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
  pub reading_id:      i64,
  pub customer_id:     i64,
  pub read_on:         NaiveDate,
  pub consumption_kwh: f64,
  pub reading_kind:    ReadingKind,
}

/// A reading not yet inserted — no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingDraft {
  pub customer_id:     i64,
  pub read_on:         NaiveDate,
  pub consumption_kwh: f64,
  pub reading_kind:    ReadingKind,
}

/// One reading per customer per month, dated the first of the month.
#[derive(Debug, Clone)]
pub struct ReadingPlan {
  pub first_customer: i64,
  pub last_customer:  i64,
  pub year:           i32,
  pub first_month:    u32,
  pub last_month:     u32,
  pub min_kwh:        f64,
  pub max_kwh:        f64,
  pub kind:           ReadingKind,
}

impl ReadingPlan {
  /// Normal readings: customers 1001–1050, Feb–Oct 2025, 600–3000 kWh.
  pub fn normal_feb_oct() -> Self {
    ReadingPlan {
      first_customer: 1001,
      last_customer:  1050,
      year:           2025,
      first_month:    2,
      last_month:     10,
      min_kwh:        600.0,
      max_kwh:        3000.0,
      kind:           ReadingKind::Normal,
    }
  }

  /// Estimated readings: customers 1001–1050, Nov–Dec 2025, 400–2000 kWh.
  pub fn estimated_nov_dec() -> Self {
    ReadingPlan {
      first_customer: 1001,
      last_customer:  1050,
      year:           2025,
      first_month:    11,
      last_month:     12,
      min_kwh:        400.0,
      max_kwh:        2000.0,
      kind:           ReadingKind::Estimated,
    }
  }

  pub fn generate(&self, rng: &mut impl Rng) -> Vec<ReadingDraft> {
    let mut drafts = Vec::new();
    for customer_id in self.first_customer..=self.last_customer {
      for month in self.first_month..=self.last_month {
        let kwh = round2(rng.gen_range(self.min_kwh..=self.max_kwh));
        drafts.push(ReadingDraft {
          customer_id,
          read_on: first_of_month(self.year, month),
          consumption_kwh: kwh,
          reading_kind: self.kind,
        });
      }
    }
    drafts
  }
}

// ─── Losses ──────────────────────────────────────────────────────────────────

/// A persisted loss row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossRecord {
  pub loss_id:           i64,
  pub recorded_on:       NaiveDate,
  pub state_code:        String,
  pub technical_kwh:     f64,
  pub non_technical_kwh: f64,
}

/// A loss not yet inserted — no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossDraft {
  pub recorded_on:       NaiveDate,
  pub state_code:        String,
  pub technical_kwh:     f64,
  pub non_technical_kwh: f64,
}

/// One loss per state per month, dated a random day inside the month.
#[derive(Debug, Clone)]
pub struct LossPlan {
  pub states:                Vec<String>,
  pub year:                  i32,
  pub first_month:           u32,
  pub last_month:            u32,
  pub min_technical_kwh:     f64,
  pub max_technical_kwh:     f64,
  pub min_non_technical_kwh: f64,
  pub max_non_technical_kwh: f64,
}

impl LossPlan {
  /// Losses for BA/SP/MG, Jan–Jul 2025.
  pub fn jan_jul() -> Self {
    LossPlan {
      states:                vec!["BA".into(), "SP".into(), "MG".into()],
      year:                  2025,
      first_month:           1,
      last_month:            7,
      min_technical_kwh:     500.0,
      max_technical_kwh:     1100.0,
      min_non_technical_kwh: 400.0,
      max_non_technical_kwh: 900.0,
    }
  }

  pub fn generate(&self, rng: &mut impl Rng) -> Vec<LossDraft> {
    let mut drafts = Vec::new();
    for state_code in &self.states {
      for month in self.first_month..=self.last_month {
        let day = rng.gen_range(1..=days_in_month(self.year, month));
        drafts.push(LossDraft {
          recorded_on:       NaiveDate::from_ymd_opt(self.year, month, day)
            .unwrap_or_else(|| first_of_month(self.year, month)),
          state_code:        state_code.clone(),
          technical_kwh:     round2(
            rng.gen_range(self.min_technical_kwh..=self.max_technical_kwh),
          ),
          non_technical_kwh: round2(
            rng.gen_range(
              self.min_non_technical_kwh..=self.max_non_technical_kwh,
            ),
          ),
        });
      }
    }
    drafts
  }
}

// ─── Date helpers ────────────────────────────────────────────────────────────

fn first_of_month(year: i32, month: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, 1)
    .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 1, 1).unwrap())
}

fn days_in_month(year: i32, month: u32) -> u32 {
  let next = if month == 12 {
    NaiveDate::from_ymd_opt(year + 1, 1, 1)
  } else {
    NaiveDate::from_ymd_opt(year, month + 1, 1)
  };
  match (next, NaiveDate::from_ymd_opt(year, month, 1)) {
    (Some(next), Some(first)) => (next - first).num_days() as u32,
    _                         => 28,
  }
}

fn round2(v: f64) -> f64 {
  (v * 100.0).round() / 100.0
}
