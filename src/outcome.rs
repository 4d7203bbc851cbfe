//! Per-file outcomes and batch counters
//!
//! Every file submitted to the pipeline produces exactly one
//! `ConversionOutcome`; the scheduler folds them into `BatchCounters` on the
//! consuming thread. The counter sum invariant (processed + skipped + failed
//! == files seen) is what the final dashboard is built on.

/// Terminal status of a single file.
///
/// `Failed*` variants are fatal for the file only; the batch always
/// continues. Metadata/timestamp trouble is deliberately absent here: it is
/// warning-level and leaves the outcome `Processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Processed,
    SkippedAlreadyProcessed,
    SkippedUnsupported,
    FailedNotFound,
    FailedSizeRetrieval,
    FailedConversion,
    FailedDeleteOriginal,
}

impl OutcomeKind {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            OutcomeKind::FailedNotFound
                | OutcomeKind::FailedSizeRetrieval
                | OutcomeKind::FailedConversion
                | OutcomeKind::FailedDeleteOriginal
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            OutcomeKind::Processed => "processed",
            OutcomeKind::SkippedAlreadyProcessed => "skipped (already processed)",
            OutcomeKind::SkippedUnsupported => "skipped (unsupported extension)",
            OutcomeKind::FailedNotFound => "failed (file not found)",
            OutcomeKind::FailedSizeRetrieval => "failed (could not read size)",
            OutcomeKind::FailedConversion => "failed (conversion)",
            OutcomeKind::FailedDeleteOriginal => "failed (could not delete original)",
        }
    }
}

/// One result per input file, produced by the orchestrator.
#[derive(Debug, Clone)]
pub struct ConversionOutcome {
    pub kind: OutcomeKind,
    /// Original file name (no directory), for reporting.
    pub file_name: String,
    pub original_size: u64,
}

impl ConversionOutcome {
    pub fn new(kind: OutcomeKind, file_name: impl Into<String>, original_size: u64) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            original_size,
        }
    }
}

/// Monotonic per-phase counters, updated serially by the scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchCounters {
    pub processed: usize,
    pub skipped_processed: usize,
    pub skipped_unsupported: usize,
    pub failed: usize,
}

impl BatchCounters {
    pub fn record(&mut self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::Processed => self.processed += 1,
            OutcomeKind::SkippedAlreadyProcessed => self.skipped_processed += 1,
            OutcomeKind::SkippedUnsupported => self.skipped_unsupported += 1,
            OutcomeKind::FailedNotFound
            | OutcomeKind::FailedSizeRetrieval
            | OutcomeKind::FailedConversion
            | OutcomeKind::FailedDeleteOriginal => self.failed += 1,
        }
    }

    pub fn completed(&self) -> usize {
        self.processed + self.skipped_processed + self.skipped_unsupported + self.failed
    }

    pub fn merge(&mut self, other: &BatchCounters) {
        self.processed += other.processed;
        self.skipped_processed += other.skipped_processed;
        self.skipped_unsupported += other.skipped_unsupported;
        self.failed += other.failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert!(OutcomeKind::FailedNotFound.is_failure());
        assert!(OutcomeKind::FailedSizeRetrieval.is_failure());
        assert!(OutcomeKind::FailedConversion.is_failure());
        assert!(OutcomeKind::FailedDeleteOriginal.is_failure());
        assert!(!OutcomeKind::Processed.is_failure());
        assert!(!OutcomeKind::SkippedAlreadyProcessed.is_failure());
        assert!(!OutcomeKind::SkippedUnsupported.is_failure());
    }

    #[test]
    fn test_counters_record_each_kind() {
        let mut c = BatchCounters::default();
        c.record(OutcomeKind::Processed);
        c.record(OutcomeKind::SkippedAlreadyProcessed);
        c.record(OutcomeKind::SkippedUnsupported);
        c.record(OutcomeKind::FailedConversion);
        c.record(OutcomeKind::FailedDeleteOriginal);

        assert_eq!(c.processed, 1);
        assert_eq!(c.skipped_processed, 1);
        assert_eq!(c.skipped_unsupported, 1);
        assert_eq!(c.failed, 2);
    }

    #[test]
    fn test_completed_equals_sum() {
        let mut c = BatchCounters::default();
        for kind in [
            OutcomeKind::Processed,
            OutcomeKind::Processed,
            OutcomeKind::SkippedAlreadyProcessed,
            OutcomeKind::FailedNotFound,
            OutcomeKind::SkippedUnsupported,
        ] {
            c.record(kind);
        }
        assert_eq!(
            c.completed(),
            c.processed + c.skipped_processed + c.skipped_unsupported + c.failed
        );
        assert_eq!(c.completed(), 5);
    }

    #[test]
    fn test_merge_adds_fieldwise() {
        let mut a = BatchCounters {
            processed: 2,
            skipped_processed: 1,
            skipped_unsupported: 0,
            failed: 3,
        };
        let b = BatchCounters {
            processed: 1,
            skipped_processed: 0,
            skipped_unsupported: 4,
            failed: 1,
        };
        a.merge(&b);
        assert_eq!(a.processed, 3);
        assert_eq!(a.skipped_processed, 1);
        assert_eq!(a.skipped_unsupported, 4);
        assert_eq!(a.failed, 4);
        assert_eq!(a.completed(), 12);
    }
}
