//! MemoTable — per-engine memoization with re-entrancy detection.
//!
//! Purpose
//! -------
//! Store the results of the engine's recursive queries (funnel transitions,
//! sales quota, hires, cohort distributions, revenue) so each key is computed
//! once per [`Forecaster`](crate::engine::Forecaster). Without it the funnel
//! recursion is exponential in the number of stages times months.
//!
//! Key behaviors
//! -------------
//! - [`MemoTable::get_or_try_insert_with`] returns a cached value or runs the
//!   computation, caching only successful results.
//! - A key that is requested again while its own computation is still running
//!   fails with [`ForecastError::CircularDependency`] instead of recursing
//!   without bound.
//! - Hit and miss counters are exposed through [`CacheStats`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Keys only carry the varying query parameters (month, target, indices);
//!   the scenario and actuals are fixed for the lifetime of the owning engine.
//! - No `RefCell` borrow is held while a computation runs, so computations
//!   may freely query the same table recursively.
//! - Single-threaded: tables are `!Sync`. Parallel callers build one engine
//!   per thread.
use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    fmt::Debug,
    hash::Hash,
};

use serde::Serialize;
use tracing::trace;

use crate::errors::{ForecastError, ForecastResult};

/// Counters for one memo table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub table: &'static str,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct MemoTable<K, V> {
    name: &'static str,
    values: RefCell<HashMap<K, V>>,
    in_progress: RefCell<HashSet<K>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<K, V> MemoTable<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        MemoTable {
            name,
            values: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Return the cached value for `key`, computing it with `compute` on a miss.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::CircularDependency`] if `key` is already being
    ///   computed further up the call stack.
    /// - Any error returned by `compute`; failures are not cached.
    pub fn get_or_try_insert_with<F>(&self, key: K, compute: F) -> ForecastResult<V>
    where
        F: FnOnce() -> ForecastResult<V>,
    {
        let cached = self.values.borrow().get(&key).cloned();
        if let Some(value) = cached {
            self.hits.set(self.hits.get() + 1);
            return Ok(value);
        }

        if !self.in_progress.borrow_mut().insert(key.clone()) {
            let query = format!("{}{:?}", self.name, key);
            return Err(ForecastError::CircularDependency { query });
        }
        self.misses.set(self.misses.get() + 1);
        trace!(table = self.name, ?key, "cache miss");

        let result = compute();
        self.in_progress.borrow_mut().remove(&key);
        if let Ok(value) = &result {
            self.values.borrow_mut().insert(key, value.clone());
        }
        result
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            table: self.name,
            entries: self.values.borrow().len(),
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        self.values.borrow_mut().clear();
        self.in_progress.borrow_mut().clear();
        self.hits.set(0);
        self.misses.set(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // A value is computed once; later lookups are hits.
    fn computes_each_key_once() {
        let table: MemoTable<u32, u64> = MemoTable::new("square");
        let calls = Cell::new(0);
        for _ in 0..3 {
            let v = table
                .get_or_try_insert_with(7, || {
                    calls.set(calls.get() + 1);
                    Ok(49)
                })
                .unwrap();
            assert_eq!(v, 49);
        }
        assert_eq!(calls.get(), 1);
        let stats = table.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (1, 2, 1));

        table.clear();
        assert_eq!(table.stats().entries, 0);
    }

    #[test]
    // Purpose
    // -------
    // Recursive computations can use the table; self re-entry is reported.
    //
    // Expect
    // ------
    // - fib(30) through the table succeeds.
    // - A key whose computation asks for itself yields `CircularDependency`,
    //   and the failure is not cached.
    fn recursion_and_cycles() {
        fn fib(table: &MemoTable<u64, u64>, n: u64) -> ForecastResult<u64> {
            table.get_or_try_insert_with(n, || {
                if n < 2 { Ok(n) } else { Ok(fib(table, n - 1)? + fib(table, n - 2)?) }
            })
        }
        let table = MemoTable::new("fib");
        assert_eq!(fib(&table, 30).unwrap(), 832_040);
        assert_eq!(table.stats().misses, 31);

        let cyclic: MemoTable<u8, u8> = MemoTable::new("cyclic");
        fn ask(table: &MemoTable<u8, u8>) -> ForecastResult<u8> {
            table.get_or_try_insert_with(1, || ask(table))
        }
        assert!(matches!(ask(&cyclic), Err(ForecastError::CircularDependency { .. })));
        assert_eq!(cyclic.stats().entries, 0);
        assert!(cyclic.get_or_try_insert_with(1, || Ok(5)).is_ok());
    }
}
