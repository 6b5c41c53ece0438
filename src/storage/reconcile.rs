//! Batch reconciliation shared by every backend.
//!
//! A [`BatchPlan`] is built from the caller's candidates, fed existing
//! records during a single scan, and finally split into the already-known
//! results and the candidates that still need to be written.

use std::collections::HashMap;

use crate::errors::{LinkVaultError, Result};
use crate::storage::UrlRecord;

#[derive(Debug)]
pub struct BatchPlan {
    result: HashMap<String, UrlRecord>,
    /// full URL -> correlation keys still waiting for a record
    pending: HashMap<String, Vec<String>>,
}

impl BatchPlan {
    pub fn new(candidates: HashMap<String, UrlRecord>) -> Result<Self> {
        let mut pending: HashMap<String, Vec<String>> = HashMap::with_capacity(candidates.len());
        for (key, candidate) in &candidates {
            if candidate.full.is_empty() {
                return Err(LinkVaultError::validation(format!(
                    "batch item '{}' has an empty URL",
                    key
                )));
            }
            pending
                .entry(candidate.full.clone())
                .or_default()
                .push(key.clone());
        }

        Ok(Self {
            result: candidates,
            pending,
        })
    }

    /// Nothing left to insert; the scan may stop.
    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Offer one stored record. Returns true if it satisfied any candidate.
    pub fn absorb(&mut self, existing: &UrlRecord) -> bool {
        if existing.deleted {
            return false;
        }
        match self.pending.remove(&existing.full) {
            Some(keys) => {
                for key in keys {
                    self.result.insert(key, existing.clone());
                }
                true
            }
            None => false,
        }
    }

    /// Distinct full URLs still waiting; lets indexed backends query only these.
    pub fn pending_urls(&self) -> Vec<String> {
        self.pending.keys().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Split into the reconciled map and the `(correlation key, record)`
    /// pairs that must be persisted. Duplicates inside the batch are kept
    /// as separate inserts.
    pub fn split(mut self) -> (HashMap<String, UrlRecord>, Vec<(String, UrlRecord)>) {
        let mut inserts = Vec::with_capacity(self.pending_count());
        for keys in self.pending.into_values() {
            for key in keys {
                if let Some(candidate) = self.result.remove(&key) {
                    inserts.push((key, candidate));
                }
            }
        }
        // 保证写入顺序稳定，便于日志与测试
        inserts.sort_by(|a, b| a.0.cmp(&b.0));
        (self.result, inserts)
    }

    pub fn into_result(self) -> HashMap<String, UrlRecord> {
        self.result
    }
}
