//! Ticket + bucket model (D1, §4.7): unit-face debt tokens derived from
//! payables, partitioned into maturity bands.

use serde::{Deserialize, Serialize};

/// A named maturity band `[tau_min, tau_max]`, inclusive at both ends;
/// `tau_max = None` means the band is unbounded (the last configured band).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketDef {
    pub name: String,
    pub tau_min: u64,
    pub tau_max: Option<u64>,
}

impl BucketDef {
    pub fn new(name: impl Into<String>, tau_min: u64, tau_max: Option<u64>) -> Self {
        Self { name: name.into(), tau_min, tau_max }
    }

    fn contains(&self, remaining_tau: u64) -> bool {
        remaining_tau >= self.tau_min && self.tau_max.map(|max| remaining_tau <= max).unwrap_or(true)
    }
}

/// The bucket a ticket belongs to given its `remaining_tau`: the first band
/// whose range contains it, or `None` if `remaining_tau == 0` (matured).
pub fn bucket_for(buckets: &[BucketDef], remaining_tau: u64) -> Option<String> {
    if remaining_tau == 0 {
        return None;
    }
    buckets.iter().find(|b| b.contains(remaining_tau)).map(|b| b.name.clone())
}

/// A tradable unit of a payable within the dealer subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    id: String,
    issuer_id: String,
    owner_id: String,
    face: i64,
    maturity_day: u64,
    remaining_tau: u64,
    bucket: Option<String>,
    serial: u64,
}

impl Ticket {
    pub fn new(id: impl Into<String>, issuer_id: impl Into<String>, owner_id: impl Into<String>, face: i64, maturity_day: u64, current_day: u64, serial: u64, buckets: &[BucketDef]) -> Self {
        let remaining_tau = maturity_day.saturating_sub(current_day);
        let bucket = bucket_for(buckets, remaining_tau);
        Self {
            id: id.into(),
            issuer_id: issuer_id.into(),
            owner_id: owner_id.into(),
            face,
            maturity_day,
            remaining_tau,
            bucket,
            serial,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn set_owner(&mut self, owner_id: impl Into<String>) {
        self.owner_id = owner_id.into();
    }

    pub fn face(&self) -> i64 {
        self.face
    }

    pub fn maturity_day(&self) -> u64 {
        self.maturity_day
    }

    pub fn remaining_tau(&self) -> u64 {
        self.remaining_tau
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn is_matured(&self) -> bool {
        self.remaining_tau == 0
    }

    /// Recompute `remaining_tau` and `bucket` for `current_day` (§4.10 step 1).
    /// Returns the previous bucket if it changed, so the caller can rebucket.
    pub fn tick(&mut self, current_day: u64, buckets: &[BucketDef]) -> Option<Option<String>> {
        self.remaining_tau = self.maturity_day.saturating_sub(current_day);
        let new_bucket = bucket_for(buckets, self.remaining_tau);
        if new_bucket != self.bucket {
            let old = self.bucket.clone();
            self.bucket = new_bucket;
            Some(old)
        } else {
            None
        }
    }
}
