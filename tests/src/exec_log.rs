use quarry::driver::{operation::Transaction, Operation};
use std::sync::{Arc, Mutex};

/// A wrapper around the operations log that provides a clean API for tests
pub struct ExecLog {
    ops: Arc<Mutex<Vec<Operation>>>,
}

impl ExecLog {
    pub(crate) fn new(ops: Arc<Mutex<Vec<Operation>>>) -> Self {
        Self { ops }
    }

    /// Get the number of logged operations
    pub fn len(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.ops.lock().unwrap().is_empty()
    }

    /// Count operations matching the given predicate
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Operation) -> bool,
    {
        self.ops.lock().unwrap().iter().filter(|op| predicate(op)).count()
    }

    /// SQL text of every statement sent, transaction control excluded
    pub fn sql(&self) -> Vec<String> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(Operation::as_query_sql)
            .map(|query| query.sql.clone())
            .collect()
    }

    /// Number of statements whose SQL starts with `keyword`
    pub fn statements(&self, keyword: &str) -> usize {
        self.sql()
            .iter()
            .filter(|sql| sql.trim_start().starts_with(keyword))
            .count()
    }

    /// Transaction control operations in the order they were sent
    pub fn transactions(&self) -> Vec<Transaction> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                Operation::Transaction(op) => Some(*op),
                _ => None,
            })
            .collect()
    }

    /// Clear the log
    pub fn clear(&mut self) {
        self.ops.lock().unwrap().clear();
    }

    /// Remove and return the first operation from the log
    /// Returns None if the log is empty
    pub fn pop(&mut self) -> Option<Operation> {
        let mut ops = self.ops.lock().unwrap();
        if ops.is_empty() {
            None
        } else {
            Some(ops.remove(0))
        }
    }
}
