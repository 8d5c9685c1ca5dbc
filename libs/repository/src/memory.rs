//! In-process repository implementation: one `DashMap` per table, with a
//! background thread appending every mutation to a journal file so the
//! index can be rebuilt after a restart. This mirrors the journal +
//! background-writer-thread pattern this workspace already uses for its
//! other durable, high-churn caches, rather than pulling in a SQL crate
//! this workspace does not otherwise depend on.

use crate::error::{RepoError, Result};
use crate::model::{
    AnchorPoolRow, AnchorStatus, PoolRow, SnapshotRow, SwapEventRow, VolumeStats,
};
use crate::repository::Repository;
use async_trait::async_trait;
use chrono::Utc;
use crossbeam_channel::{bounded, Sender};
use dashmap::DashMap;
use primitive_types::U256;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One durable mutation, as appended to the journal file. Replayed in
/// order by [`InMemoryRepository::load_journal`] to rebuild state after a
/// restart.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
enum JournalEntry {
    Pool(PoolRow),
    LpHint { pool_address: String, user: String, shares: U256 },
    Snapshot(SnapshotRow),
    Swap(SwapEventRow),
    AnchorPool(AnchorPoolRow),
    AnchorFee { pool_address: String, fee_bps: u32 },
    AnchorStatus { pool_address: String, status: AnchorStatus },
    AnchorSnapshot { pool_address: String, reserve_a: U256, reserve_b: U256 },
    AnchorSwap(SwapEventRow),
}

struct JournalWriter {
    sender: Sender<JournalEntry>,
}

impl JournalWriter {
    fn spawn(path: PathBuf) -> Self {
        let (sender, receiver) = bounded::<JournalEntry>(10_000);
        std::thread::Builder::new()
            .name("repository-journal".to_string())
            .spawn(move || {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path);
                let mut file = match file {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(error = %e, path = %path.display(), "journal file unavailable, mutations will not persist across restarts");
                        return;
                    }
                };
                for entry in receiver.iter() {
                    match serde_json::to_string(&entry) {
                        Ok(line) => {
                            if let Err(e) = writeln!(file, "{line}") {
                                warn!(error = %e, "journal write failed");
                            }
                        }
                        Err(e) => warn!(error = %e, "journal entry serialization failed"),
                    }
                }
            })
            .expect("spawn repository journal thread");
        Self { sender }
    }

    fn append(&self, entry: JournalEntry) {
        if self.sender.try_send(entry).is_err() {
            warn!("repository journal channel full or closed, dropping entry");
        }
    }
}

/// DashMap-backed repository with best-effort journal persistence.
pub struct InMemoryRepository {
    pools: DashMap<String, PoolRow>,
    pair_index: DashMap<(String, String), String>,
    lp_hints: DashMap<(String, String), U256>,
    snapshots: DashMap<String, Vec<SnapshotRow>>,
    swap_events: DashMap<String, Vec<SwapEventRow>>,

    anchor_pools: DashMap<String, AnchorPoolRow>,
    anchor_snapshots: DashMap<String, Vec<SnapshotRow>>,
    anchor_swaps: DashMap<String, Vec<SwapEventRow>>,

    journal: Option<JournalWriter>,
}

impl InMemoryRepository {
    /// Repository with no durability — state lives only in process memory.
    /// Useful for tests.
    pub fn in_memory_only() -> Self {
        Self {
            pools: DashMap::new(),
            pair_index: DashMap::new(),
            lp_hints: DashMap::new(),
            snapshots: DashMap::new(),
            swap_events: DashMap::new(),
            anchor_pools: DashMap::new(),
            anchor_snapshots: DashMap::new(),
            anchor_swaps: DashMap::new(),
            journal: None,
        }
    }

    /// Repository whose mutations are journaled to `journal_path`, and
    /// whose state is rebuilt by replaying that journal if it exists.
    pub fn with_journal(journal_path: PathBuf) -> Self {
        let mut repo = Self::in_memory_only();
        repo.load_journal(&journal_path);
        repo.journal = Some(JournalWriter::spawn(journal_path));
        repo
    }

    fn load_journal(&mut self, path: &PathBuf) {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return;
        };
        let mut replayed = 0usize;
        for line in contents.lines() {
            let Ok(entry) = serde_json::from_str::<JournalEntry>(line) else {
                continue;
            };
            self.apply(entry);
            replayed += 1;
        }
        debug!(replayed, path = %path.display(), "replayed repository journal");
    }

    fn apply(&self, entry: JournalEntry) {
        match entry {
            JournalEntry::Pool(row) => self.insert_pool(row),
            JournalEntry::LpHint { pool_address, user, shares } => {
                self.lp_hints.insert((pool_address, user), shares);
            }
            JournalEntry::Snapshot(row) => self.insert_snapshot(row),
            JournalEntry::Swap(row) => {
                self.swap_events.entry(row.pool_address.clone()).or_default().push(row);
            }
            JournalEntry::AnchorPool(row) => {
                self.anchor_pools.insert(row.pool_address.clone(), row);
            }
            JournalEntry::AnchorFee { pool_address, fee_bps } => {
                if let Some(mut row) = self.anchor_pools.get_mut(&pool_address) {
                    row.fee_bps = fee_bps;
                }
            }
            JournalEntry::AnchorStatus { pool_address, status } => {
                if let Some(mut row) = self.anchor_pools.get_mut(&pool_address) {
                    row.status = status;
                }
            }
            JournalEntry::AnchorSnapshot { pool_address, reserve_a, reserve_b } => {
                self.insert_anchor_snapshot(pool_address, reserve_a, reserve_b);
            }
            JournalEntry::AnchorSwap(row) => {
                self.anchor_swaps.entry(row.pool_address.clone()).or_default().push(row);
            }
        }
    }

    fn insert_pool(&self, row: PoolRow) {
        let pair = pair_key(&row.token_a, &row.token_b);
        self.pair_index.insert(pair, row.pool_address.clone());
        self.pools.insert(row.pool_address.clone(), row);
    }

    fn insert_snapshot(&self, row: SnapshotRow) {
        let mut entries = self.snapshots.entry(row.pool_address.clone()).or_default();
        let collides = entries
            .iter()
            .any(|existing| existing.snapshot_time == row.snapshot_time);
        if !collides {
            entries.push(row);
        }
    }

    fn insert_anchor_snapshot(&self, pool_address: String, reserve_a: U256, reserve_b: U256) {
        let row = SnapshotRow {
            pool_address: pool_address.clone(),
            snapshot_time: Utc::now().timestamp(),
            reserve_a,
            reserve_b,
        };
        let mut entries = self.anchor_snapshots.entry(pool_address).or_default();
        let collides = entries
            .iter()
            .any(|existing| existing.snapshot_time == row.snapshot_time);
        if !collides {
            entries.push(row);
        }
    }

    fn volume_stats(events: &[SwapEventRow], now: i64) -> VolumeStats {
        let cutoff = now - 24 * 3600;
        let mut stats = VolumeStats::default();
        for event in events.iter().filter(|e| e.ts >= cutoff) {
            stats.swap_count += 1;
            stats.volume_in += event.amount_in;
            stats.fees += event.fee_collected;
        }
        stats
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn save_pool(&self, row: PoolRow) -> Result<()> {
        if let Some(j) = &self.journal {
            j.append(JournalEntry::Pool(row.clone()));
        }
        self.insert_pool(row);
        Ok(())
    }

    async fn load_pools(&self) -> Result<Vec<PoolRow>> {
        Ok(self.pools.iter().map(|e| e.value().clone()).collect())
    }

    async fn get_pool_by_pair(&self, token_a: &str, token_b: &str) -> Result<Option<PoolRow>> {
        let key = pair_key(token_a, token_b);
        let Some(address) = self.pair_index.get(&key).map(|v| v.clone()) else {
            return Ok(None);
        };
        Ok(self.pools.get(&address).map(|e| e.value().clone()))
    }

    async fn save_lp_position_hint(&self, pool_address: &str, user: &str, shares: U256) -> Result<()> {
        if let Some(j) = &self.journal {
            j.append(JournalEntry::LpHint {
                pool_address: pool_address.to_string(),
                user: user.to_string(),
                shares,
            });
        }
        self.lp_hints
            .insert((pool_address.to_string(), user.to_string()), shares);
        Ok(())
    }

    async fn save_snapshot(&self, pool_address: &str, reserve_a: U256, reserve_b: U256) -> Result<()> {
        let row = SnapshotRow {
            pool_address: pool_address.to_string(),
            snapshot_time: Utc::now().timestamp(),
            reserve_a,
            reserve_b,
        };
        if let Some(j) = &self.journal {
            j.append(JournalEntry::Snapshot(row.clone()));
        }
        self.insert_snapshot(row);
        Ok(())
    }

    async fn get_snapshot_at(&self, pool_address: &str, hours_ago: f64) -> Result<Option<SnapshotRow>> {
        let cutoff = Utc::now().timestamp() - (hours_ago * 3600.0) as i64;
        let Some(entries) = self.snapshots.get(pool_address) else {
            return Ok(None);
        };
        Ok(entries
            .iter()
            .filter(|row| row.snapshot_time <= cutoff)
            .max_by_key(|row| row.snapshot_time)
            .cloned())
    }

    async fn record_swap(&self, event: SwapEventRow) -> Result<()> {
        if let Some(j) = &self.journal {
            j.append(JournalEntry::Swap(event.clone()));
        }
        self.swap_events
            .entry(event.pool_address.clone())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn volume_24h(&self, pool_address: &str) -> Result<VolumeStats> {
        let Some(events) = self.swap_events.get(pool_address) else {
            return Ok(VolumeStats::default());
        };
        Ok(Self::volume_stats(&events, Utc::now().timestamp()))
    }

    async fn save_anchor_pool(&self, row: AnchorPoolRow) -> Result<()> {
        if let Some(j) = &self.journal {
            j.append(JournalEntry::AnchorPool(row.clone()));
        }
        self.anchor_pools.insert(row.pool_address.clone(), row);
        Ok(())
    }

    async fn load_anchor_pools(&self) -> Result<Vec<AnchorPoolRow>> {
        Ok(self.anchor_pools.iter().map(|e| e.value().clone()).collect())
    }

    async fn get_anchor_pool(&self, pool_address: &str) -> Result<Option<AnchorPoolRow>> {
        Ok(self.anchor_pools.get(pool_address).map(|e| e.value().clone()))
    }

    async fn update_anchor_fee(&self, pool_address: &str, fee_bps: u32) -> Result<()> {
        if let Some(j) = &self.journal {
            j.append(JournalEntry::AnchorFee {
                pool_address: pool_address.to_string(),
                fee_bps,
            });
        }
        let mut row = self
            .anchor_pools
            .get_mut(pool_address)
            .ok_or_else(|| RepoError::AnchorPoolNotFound(pool_address.to_string()))?;
        row.fee_bps = fee_bps;
        Ok(())
    }

    async fn update_anchor_status(&self, pool_address: &str, status: AnchorStatus) -> Result<()> {
        if let Some(j) = &self.journal {
            j.append(JournalEntry::AnchorStatus {
                pool_address: pool_address.to_string(),
                status,
            });
        }
        let mut row = self
            .anchor_pools
            .get_mut(pool_address)
            .ok_or_else(|| RepoError::AnchorPoolNotFound(pool_address.to_string()))?;
        row.status = status;
        Ok(())
    }

    async fn save_anchor_snapshot(&self, pool_address: &str, reserve_a: U256, reserve_b: U256) -> Result<()> {
        if let Some(j) = &self.journal {
            j.append(JournalEntry::AnchorSnapshot {
                pool_address: pool_address.to_string(),
                reserve_a,
                reserve_b,
            });
        }
        self.insert_anchor_snapshot(pool_address.to_string(), reserve_a, reserve_b);
        Ok(())
    }

    async fn record_anchor_swap(&self, event: SwapEventRow) -> Result<()> {
        if let Some(j) = &self.journal {
            j.append(JournalEntry::AnchorSwap(event.clone()));
        }
        self.anchor_swaps
            .entry(event.pool_address.clone())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn anchor_volume_24h(&self, pool_address: &str) -> Result<VolumeStats> {
        let Some(events) = self.anchor_swaps.get(pool_address) else {
            return Ok(VolumeStats::default());
        };
        Ok(Self::volume_stats(&events, Utc::now().timestamp()))
    }
}
