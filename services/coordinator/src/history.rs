//! Transaction history ring buffer (§3 "Transaction history (log)", §11):
//! the last 1,000 human-readable entries, guarded the same way the reserve
//! cache is guarded (`parking_lot`), trimmed on insert.

use parking_lot::Mutex;
use std::collections::VecDeque;

const CAPACITY: usize = 1_000;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HistoryEntry {
    pub kind: String,
    pub pool_address: String,
    pub user: String,
    pub detail: String,
    pub tx_hash: String,
    pub ts: i64,
}

pub struct TransactionHistory {
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl Default for TransactionHistory {
    fn default() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(CAPACITY)),
        }
    }
}

impl TransactionHistory {
    pub fn record(&self, entry: HistoryEntry) {
        let mut entries = self.entries.lock();
        if entries.len() == CAPACITY {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent entries first, capped at `limit`.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.lock().iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tx_hash: &str) -> HistoryEntry {
        HistoryEntry {
            kind: "swap".to_string(),
            pool_address: "pool1".to_string(),
            user: "user1".to_string(),
            detail: "test".to_string(),
            tx_hash: tx_hash.to_string(),
            ts: 0,
        }
    }

    #[test]
    fn trims_oldest_on_overflow() {
        let history = TransactionHistory::default();
        for i in 0..CAPACITY + 10 {
            history.record(entry(&i.to_string()));
        }
        let recent = history.recent(CAPACITY);
        assert_eq!(recent.len(), CAPACITY);
        assert_eq!(recent[0].tx_hash, (CAPACITY + 9).to_string());
    }

    #[test]
    fn recent_is_newest_first() {
        let history = TransactionHistory::default();
        history.record(entry("a"));
        history.record(entry("b"));
        let recent = history.recent(10);
        assert_eq!(recent[0].tx_hash, "b");
        assert_eq!(recent[1].tx_hash, "a");
    }
}
