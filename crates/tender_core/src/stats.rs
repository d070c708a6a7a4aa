/// Counters for one run. They only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    pub pages_processed: u32,
    pub rows_collected: u64,
    pub pages_skipped: u32,
    pub duplicates_skipped: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page(&mut self) {
        self.pages_processed += 1;
    }

    /// Counts one record handed to the sink.
    pub fn record_row(&mut self) {
        self.rows_collected += 1;
    }

    pub fn record_skipped_page(&mut self) {
        self.pages_skipped += 1;
    }

    pub fn record_duplicates(&mut self, count: usize) {
        self.duplicates_skipped += count as u64;
    }
}
