use serde::Serialize;

/// What happened to a region whose recognition was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NoMatch,
    /// Matched but the throttler refused
    Throttled,
    /// Matched but the registry refused the transition
    Rejected,
    Triggered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOutcome {
    /// Scan area outside the captured surface, skipped this cycle
    OutOfBounds,
    /// No engine free within the lease timeout, retried next cycle
    Deferred,
    /// Crop unchanged since the region last fired, not matched again
    Unchanged,
    Failed { ocr_called: bool },
    TimedOut,
    Scanned { cache_hit: bool, decision: Decision },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub selected: usize,
    pub scanned: usize,
    pub cache_hits: usize,
    pub ocr_calls: usize,
    pub deferred: usize,
    pub unchanged: usize,
    pub out_of_bounds: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub matches: usize,
    pub throttled: usize,
    pub triggered: usize,
}

impl CycleReport {
    pub fn record(&mut self, outcome: RegionOutcome) {
        match outcome {
            RegionOutcome::OutOfBounds => self.out_of_bounds += 1,
            RegionOutcome::Deferred => self.deferred += 1,
            RegionOutcome::Unchanged => self.unchanged += 1,
            RegionOutcome::Failed { ocr_called } => {
                self.failures += 1;
                if ocr_called {
                    self.ocr_calls += 1;
                }
            }
            RegionOutcome::TimedOut => {
                self.timeouts += 1;
                self.ocr_calls += 1;
            }
            RegionOutcome::Scanned {
                cache_hit,
                decision,
            } => {
                self.scanned += 1;
                if cache_hit {
                    self.cache_hits += 1;
                } else {
                    self.ocr_calls += 1;
                }

                match decision {
                    Decision::NoMatch => {}
                    Decision::Throttled => {
                        self.matches += 1;
                        self.throttled += 1;
                    }
                    Decision::Rejected => self.matches += 1,
                    Decision::Triggered => {
                        self.matches += 1;
                        self.triggered += 1;
                    }
                }
            }
        }
    }
}
