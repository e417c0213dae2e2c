//! Stress helpers for Duramap.
//!
//! These helpers drive one map from many threads and report what they saw.

use duramap_core::{CoreError, Duramap, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Reads that observed a partially applied update.
    pub torn_reads: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            torn_reads: 0,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Torn reads: {}", self.torn_reads);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Key written by [`stress_disjoint_updates`] for a thread and iteration.
pub fn disjoint_key(thread: usize, iteration: usize) -> String {
    format!("t{thread}-{iteration}")
}

/// Runs `threads` threads that each perform `per_thread` sequential
/// updates, every update writing one key no other update touches.
///
/// The value stored under [`disjoint_key`]`(t, i)` is `i`.
pub fn stress_disjoint_updates(map: &Duramap, threads: usize, per_thread: usize) -> StressTestResult {
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..threads {
            let successful = &successful;
            let failed = &failed;
            scope.spawn(move || {
                for i in 0..per_thread {
                    let result = map.update(|tx| {
                        tx.set(disjoint_key(t, i), i as i64);
                        Ok::<_, CoreError>(())
                    });
                    match result {
                        Ok(()) => successful.fetch_add(1, Ordering::Relaxed),
                        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
                    };
                }
            });
        }
    });

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}

/// Runs one writer and `readers` reader threads against one map.
///
/// The writer performs `updates` updates, each setting the keys `left` and
/// `right` to the same counter value. Readers continuously check that both
/// keys agree; every disagreement is counted as a torn read.
pub fn stress_paired_visibility(map: &Duramap, readers: usize, updates: usize) -> StressTestResult {
    let done = AtomicBool::new(false);
    let torn = AtomicUsize::new(0);
    let reads = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    thread::scope(|scope| {
        for _ in 0..readers {
            let (done, torn, reads) = (&done, &torn, &reads);
            scope.spawn(move || {
                while !done.load(Ordering::Acquire) {
                    let agree = map.with_map(|m| m.get("left") == m.get("right"));
                    if !agree {
                        torn.fetch_add(1, Ordering::Relaxed);
                    }
                    reads.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        for i in 0..updates {
            let result = map.update(|tx| {
                tx.set("left", Value::Integer(i as i64));
                tx.set("right", Value::Integer(i as i64));
                Ok::<_, CoreError>(())
            });
            if result.is_err() {
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        done.store(true, Ordering::Release);
    });

    let failed = failed.into_inner();
    let mut result = StressTestResult::new(
        updates - failed + reads.into_inner(),
        failed,
        start.elapsed(),
    );
    result.torn_reads = torn.into_inner();
    result
}
