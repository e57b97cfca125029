//! crates/hafiz_core/src/quota.rs
//!
//! Per-identity daily usage limits, kept in memory for the life of the process.
//!
//! All records sit behind a single mutex so that the limit check and the
//! increment happen atomically; two concurrent requests for the same identity
//! can never both take the last slot.

use crate::domain::{CallerIdentity, QuotaDecision, QuotaInfo, QuotaStatus};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Source of "today" for daily resets.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Uses the server's local calendar date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[derive(Debug, Clone)]
struct QuotaRecord {
    date: NaiveDate,
    used: u32,
    premium: bool,
}

impl QuotaRecord {
    fn fresh(today: NaiveDate) -> Self {
        Self {
            date: today,
            used: 0,
            premium: false,
        }
    }

    fn roll_over(&mut self, today: NaiveDate) {
        if self.date != today {
            self.date = today;
            self.used = 0;
        }
    }
}

pub struct QuotaTracker {
    daily_limit: u32,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<CallerIdentity, QuotaRecord>>,
}

impl QuotaTracker {
    pub fn new(daily_limit: u32) -> Self {
        Self::with_clock(daily_limit, Arc::new(SystemClock))
    }

    pub fn with_clock(daily_limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            daily_limit,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Admits or rejects one analysis for `identity`, consuming a slot when admitted.
    ///
    /// Premium callers, flagged on this request or on an earlier one, are never metered.
    pub fn check_and_consume(&self, identity: &CallerIdentity, is_premium: bool) -> QuotaDecision {
        let today = self.clock.today();
        let mut records = self.lock();
        let record = records
            .entry(identity.clone())
            .or_insert_with(|| QuotaRecord::fresh(today));

        if is_premium {
            record.premium = true;
        }
        if record.premium {
            return QuotaDecision {
                allowed: true,
                info: self.unlimited(),
            };
        }

        record.roll_over(today);
        if record.used >= self.daily_limit {
            debug!(identity = %identity, "daily quota exhausted");
            return QuotaDecision {
                allowed: false,
                info: QuotaInfo {
                    limit_reached: true,
                    remaining: Some(0),
                    limit: self.daily_limit,
                    premium: false,
                },
            };
        }

        record.used += 1;
        QuotaDecision {
            allowed: true,
            info: QuotaInfo {
                limit_reached: false,
                remaining: Some(self.daily_limit - record.used),
                limit: self.daily_limit,
                premium: false,
            },
        }
    }

    /// Gives back one attempt (e.g. after the user watched an ad). The stored date
    /// is left alone and the count never drops below zero.
    pub fn grant(&self, identity: &CallerIdentity) -> QuotaStatus {
        let today = self.clock.today();
        let mut records = self.lock();
        let record = records
            .entry(identity.clone())
            .or_insert_with(|| QuotaRecord::fresh(today));
        record.used = record.used.saturating_sub(1);
        self.snapshot(record, today)
    }

    /// Reports the remaining quota without consuming any.
    pub fn status(&self, identity: &CallerIdentity) -> QuotaStatus {
        let today = self.clock.today();
        let mut records = self.lock();
        match records.get_mut(identity) {
            Some(record) => {
                record.roll_over(today);
                self.snapshot(record, today)
            }
            None => QuotaStatus {
                remaining: Some(self.daily_limit),
                limit: self.daily_limit,
                premium: false,
            },
        }
    }

    fn snapshot(&self, record: &QuotaRecord, today: NaiveDate) -> QuotaStatus {
        let remaining = if record.premium {
            None
        } else if record.date != today {
            Some(self.daily_limit)
        } else {
            Some(self.daily_limit.saturating_sub(record.used))
        };
        QuotaStatus {
            remaining,
            limit: self.daily_limit,
            premium: record.premium,
        }
    }

    fn unlimited(&self) -> QuotaInfo {
        QuotaInfo {
            limit_reached: false,
            remaining: None,
            limit: self.daily_limit,
            premium: true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CallerIdentity, QuotaRecord>> {
        // Counters stay usable even if a holder panicked.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
