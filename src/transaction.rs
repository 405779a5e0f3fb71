//! Undo transaction boundaries.
//!
//! The sculpting core only brackets each stroke; the host owns the actual
//! undo data. `TransactionJournal` is a bounded in-memory host used by tests
//! and by hosts that only need a record of committed strokes.

use std::cell::RefCell;
use std::rc::Rc;

/// Host undo service.
pub trait TransactionHost {
    fn begin_transaction(&mut self, name: &str);
    fn end_transaction(&mut self);
}

/// Lets the host keep a handle on a journal it gave to an engine.
impl<T: TransactionHost> TransactionHost for Rc<RefCell<T>> {
    fn begin_transaction(&mut self, name: &str) {
        self.borrow_mut().begin_transaction(name);
    }

    fn end_transaction(&mut self) {
        self.borrow_mut().end_transaction();
    }
}

/// Host that ignores transactions.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTransactions;

impl TransactionHost for NoTransactions {
    fn begin_transaction(&mut self, _name: &str) {}
    fn end_transaction(&mut self) {}
}

/// Recording transaction host with a bounded history.
#[derive(Clone, Debug)]
pub struct TransactionJournal {
    /// Committed transaction names, oldest first
    committed: Vec<String>,
    /// Currently open transaction, if any
    open: Option<String>,
    /// Maximum number of committed entries to keep
    max_entries: usize,
    /// Begin calls made while another transaction was open
    nested_begins: usize,
    /// End calls made with nothing open
    unmatched_ends: usize,
}

impl Default for TransactionJournal {
    fn default() -> Self {
        Self::new(64)
    }
}

impl TransactionJournal {
    pub fn new(max_entries: usize) -> Self {
        Self {
            committed: Vec::new(),
            open: None,
            max_entries: max_entries.max(1),
            nested_begins: 0,
            unmatched_ends: 0,
        }
    }

    pub fn committed(&self) -> &[String] {
        &self.committed
    }

    pub fn open_transaction(&self) -> Option<&str> {
        self.open.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// True when every begin was matched by exactly one end.
    pub fn is_balanced(&self) -> bool {
        self.open.is_none() && self.nested_begins == 0 && self.unmatched_ends == 0
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.open = None;
        self.nested_begins = 0;
        self.unmatched_ends = 0;
    }
}

impl TransactionHost for TransactionJournal {
    fn begin_transaction(&mut self, name: &str) {
        if self.open.is_some() {
            self.nested_begins += 1;
        }
        self.open = Some(name.to_string());
    }

    fn end_transaction(&mut self) {
        let Some(name) = self.open.take() else {
            self.unmatched_ends += 1;
            return;
        };
        self.committed.push(name);
        // Trim oldest entries if over capacity
        if self.committed.len() > self.max_entries {
            let excess = self.committed.len() - self.max_entries;
            self.committed.drain(..excess);
        }
    }
}
