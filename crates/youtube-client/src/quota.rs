//! Daily quota accounting for the YouTube Data API.
//!
//! Google budgets API cost units per project per day, resetting at midnight
//! Pacific Time. The governor reserves units before each metered call and
//! refuses calls that would overrun the budget, so the counter never exceeds
//! its limit. The share of the budget already spent drives the polling
//! interval tiers.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;

pub const DEFAULT_DAILY_LIMIT: u32 = 10_000;
pub const QUOTA_TIMEZONE: Tz = chrono_tz::America::Los_Angeles;

/// `(used fraction upper bound, interval seconds)`, checked in order.
const POLL_TIERS: &[(f64, u64)] = &[(0.30, 10), (0.50, 30), (0.70, 60), (0.90, 120)];
/// Interval once 90% or more of the budget is spent.
pub const CONSERVE_INTERVAL: Duration = Duration::from_secs(300);

/// Quota day a given instant belongs to.
pub fn quota_day(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&QUOTA_TIMEZONE).date_naive()
}

/// Start of the next quota day.
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = quota_day(now)
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);
    next_day
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| QUOTA_TIMEZONE.from_local_datetime(&midnight).earliest())
        .map(|reset| reset.with_timezone(&Utc))
        .unwrap_or_else(|| now + chrono::Duration::hours(1))
}

/// Base polling interval for the share of quota already used.
pub fn tier_interval(used_fraction: f64) -> Duration {
    POLL_TIERS
        .iter()
        .find(|(below, _)| used_fraction < *below)
        .map(|(_, secs)| Duration::from_secs(*secs))
        .unwrap_or(CONSERVE_INTERVAL)
}

/// Polling interval combining the quota tier with the API's suggestion.
///
/// Below the last tier the suggestion acts as a floor. In the last tier the
/// conserve interval applies as is.
pub fn adaptive_poll_interval(used_fraction: f64, suggested: Option<Duration>) -> Duration {
    let tier = tier_interval(used_fraction);
    if tier >= CONSERVE_INTERVAL {
        return tier;
    }
    suggested.map_or(tier, |s| tier.max(s))
}

/// Units spent in the current quota day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaCounter {
    pub units_used_today: u32,
    pub day_key: NaiveDate,
    pub daily_limit: u32,
}

impl QuotaCounter {
    pub fn new(daily_limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            units_used_today: 0,
            day_key: quota_day(now),
            daily_limit,
        }
    }

    /// Reset when `now` falls into a new quota day. Returns whether it did.
    fn roll_over(&mut self, now: DateTime<Utc>) -> bool {
        let today = quota_day(now);
        if today == self.day_key {
            return false;
        }
        self.day_key = today;
        self.units_used_today = 0;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.units_used_today)
    }

    pub fn used_fraction(&self) -> f64 {
        if self.daily_limit == 0 {
            return 1.0;
        }
        f64::from(self.units_used_today) / f64::from(self.daily_limit)
    }

    pub fn is_exhausted(&self) -> bool {
        self.units_used_today >= self.daily_limit
    }
}

/// Shared, thread-safe quota governor.
#[derive(Clone)]
pub struct QuotaGovernor {
    inner: Arc<Mutex<QuotaCounter>>,
}

impl QuotaGovernor {
    pub fn new(daily_limit: u32, now: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QuotaCounter::new(daily_limit, now))),
        }
    }

    fn with_counter<R>(&self, now: DateTime<Utc>, f: impl FnOnce(&mut QuotaCounter) -> R) -> R {
        let mut counter = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if counter.roll_over(now) {
            tracing::info!(day = %counter.day_key, "YouTube quota day rolled over");
        }
        f(&mut counter)
    }

    /// Reserve `cost` units for a call about to be made.
    ///
    /// Returns `false` without reserving anything when the call would push
    /// usage past the daily limit.
    pub fn try_acquire(&self, cost: u32, now: DateTime<Utc>) -> bool {
        self.with_counter(now, |counter| {
            let Some(after) = counter.units_used_today.checked_add(cost) else {
                return false;
            };
            if after > counter.daily_limit {
                tracing::debug!(
                    cost,
                    used = counter.units_used_today,
                    limit = counter.daily_limit,
                    "YouTube quota reservation refused"
                );
                return false;
            }
            counter.units_used_today = after;
            true
        })
    }

    /// Mark today's budget as spent (the API reported `quotaExceeded`).
    pub fn exhaust(&self, now: DateTime<Utc>) {
        self.with_counter(now, |counter| {
            counter.units_used_today = counter.daily_limit;
        });
    }

    pub fn used_fraction(&self, now: DateTime<Utc>) -> f64 {
        self.with_counter(now, |counter| counter.used_fraction())
    }

    pub fn is_exhausted(&self, now: DateTime<Utc>) -> bool {
        self.with_counter(now, |counter| counter.is_exhausted())
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> QuotaCounter {
        self.with_counter(now, |counter| *counter)
    }

    /// Time left until the budget resets.
    pub fn until_reset(&self, now: DateTime<Utc>) -> Duration {
        (next_reset(now) - now).to_std().unwrap_or(Duration::ZERO)
    }
}
