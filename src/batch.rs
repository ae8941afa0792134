//! Partitioning of recipient lists into per-transaction batches

use std::ops::Range;

use alloy::primitives::{Address, U256};
use serde::Serialize;

use crate::list_reader::Recipient;

/// Contiguous slice `[start, end)` of a recipient list sent in one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Batch {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Batch {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, recipients: &'a [Recipient]) -> &'a [Recipient] {
        &recipients[self.range()]
    }

    /// Split the batch into the parallel vectors the distributor expects.
    pub fn columns(&self, recipients: &[Recipient]) -> (Vec<Address>, Vec<U256>) {
        self.slice(recipients)
            .iter()
            .map(|r| (r.address, r.amount))
            .unzip()
    }

    /// Sum of the batch amounts; the caller has already checked the full total.
    pub fn total(&self, recipients: &[Recipient]) -> U256 {
        self.slice(recipients)
            .iter()
            .fold(U256::ZERO, |acc, r| acc.saturating_add(r.amount))
    }

    /// Last index inclusive, as shown in progress logs.
    pub fn last(&self) -> usize {
        self.end.saturating_sub(1)
    }
}

/// Plan `ceil(len / batch_size)` batches; `batch_size` must be non-zero.
pub fn plan_batches(len: usize, batch_size: usize) -> Vec<Batch> {
    assert!(batch_size > 0, "batch size must be positive");
    (0..len)
        .step_by(batch_size)
        .enumerate()
        .map(|(index, start)| Batch {
            index,
            start,
            end: (start + batch_size).min(len),
        })
        .collect()
}
