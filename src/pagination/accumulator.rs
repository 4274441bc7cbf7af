//! Ordered record accumulation across pages

use crate::types::Record;

/// Upper bound for capacity reserved from a service-reported total
const MAX_RESERVE: usize = 100_000;

/// Collects records page by page, preserving arrival order
#[derive(Debug, Default)]
pub struct ResultAccumulator {
    records: Vec<Record>,
    pages: usize,
}

impl ResultAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve room for the total the service expects to return
    pub fn reserve_total(&mut self, total: u64) {
        let total = usize::try_from(total).unwrap_or(MAX_RESERVE).min(MAX_RESERVE);
        self.records
            .reserve(total.saturating_sub(self.records.len()));
    }

    /// Append one page's records to the tail
    pub fn append(&mut self, records: Vec<Record>) {
        self.records.extend(records);
        self.pages += 1;
    }

    /// Records collected so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been collected
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pages appended so far, including empty ones
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Finish and return the records in arrival order
    pub fn collect(self) -> Vec<Record> {
        self.records
    }
}
