//! Pipeline statistics for verbose output

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use hostmill_compiler::diagnostics::{PipelineObserver, ValidationIssue};
use hostmill_compiler::TransformationKind;

/// Records per-stage counts and rejected rules across the whole compile.
#[derive(Default)]
pub struct StageStats {
    stages: Mutex<Vec<StageRecord>>,
    rejected: AtomicUsize,
}

struct StageRecord {
    kind: TransformationKind,
    input_len: usize,
    output_len: usize,
    elapsed: Duration,
}

impl StageStats {
    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn print_stages(&self) {
        let stages = self.stages.lock().unwrap();
        if stages.is_empty() {
            return;
        }
        println!("  Stages:");
        for record in stages.iter() {
            println!(
                "    {:<20?} {:>7} -> {:<7} {:.1}ms",
                record.kind,
                record.input_len,
                record.output_len,
                record.elapsed.as_secs_f64() * 1000.0
            );
        }
    }
}

impl PipelineObserver for StageStats {
    fn stage_completed(
        &self,
        kind: TransformationKind,
        input_len: usize,
        output_len: usize,
        elapsed: Duration,
    ) {
        self.stages.lock().unwrap().push(StageRecord {
            kind,
            input_len,
            output_len,
            elapsed,
        });
    }

    fn rule_rejected(&self, _issue: &ValidationIssue) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }
}
