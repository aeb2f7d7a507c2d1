//! Statistics counters.
//!
//! Counters are registered lazily the first time a `counter!` call site is hit and live for
//! the whole process. They are only incremented when the `counter` feature is enabled.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

#[derive(Default)]
pub struct Counter {
    atomic: AtomicU64,
}

impl Counter {
    pub const fn new() -> Self {
        Self {
            atomic: AtomicU64::new(0),
        }
    }
    pub fn inc(&self) {
        self.atomic.fetch_add(1, Ordering::Relaxed); // Adding one is associative and commutative
    }
    pub fn value(&self) -> u64 {
        self.atomic.load(Ordering::Acquire)
    }
}

lazy_static::lazy_static! {
    static ref COUNTERS: Mutex<HashMap<&'static str, Arc<Counter>>> = Mutex::new(HashMap::new());
}

pub fn insert_counter(descr: &'static str) -> Arc<Counter> {
    let mut counters = COUNTERS.lock().unwrap_or_else(PoisonError::into_inner);
    counters
        .entry(descr)
        .or_insert_with(|| Arc::new(Counter::new()))
        .clone()
}

/// Returns the current value of the counter named `descr`, if it was ever hit.
pub fn counter_value(descr: &str) -> Option<u64> {
    let counters = COUNTERS.lock().unwrap_or_else(PoisonError::into_inner);
    counters.get(descr).map(|c| c.value())
}

pub fn report_counters() {
    let counters = COUNTERS.lock().unwrap_or_else(PoisonError::into_inner);
    let mut counters: Vec<_> = counters.iter().collect();
    counters.sort_by_key(|(name, _)| **name);
    for (counter_name, counter) in counters {
        log::info!(target: "counter_report", "{}: {}", counter_name, counter.value())
    }
}

#[macro_export]
macro_rules! counter {
    ($descr:literal) => {
        if cfg!(feature = "counter") {
            use $crate::utils::counter::{insert_counter, lazy_static, Counter};
            lazy_static::lazy_static! {
                static ref COUNTER_REF: std::sync::Arc<Counter> = insert_counter($descr);
            }
            COUNTER_REF.inc();
        }
    };
}

// Reexport for ease of use
pub use lazy_static;
