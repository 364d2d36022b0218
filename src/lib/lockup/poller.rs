use std::{future::Future, time::Duration};

use futures::{stream::FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use tokio::time::MissedTickBehavior;

use super::{
    directory_getter::{fetch_directory, Directory, DirectoryGetter},
    helpers::{reconcile, save_current_schedule, Reconciliation},
    session_store::SessionStore,
};

/// Ticks are skipped while this many cycles are still pending.
pub const MAX_IN_FLIGHT: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub epoch: u64,
    pub directory: Directory,
    pub reconciliation: Reconciliation,
}

/// Directory state with versioned updates: every fetch cycle gets an epoch and
/// only a result newer than the committed one replaces the snapshot.
#[derive(Debug, Default)]
pub struct DirectoryState {
    issued: u64,
    committed: u64,
    discarded: u64,
    snapshot: Option<Snapshot>,
}

impl DirectoryState {
    pub fn new() -> Self {
        DirectoryState::default()
    }

    pub fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub fn commit(
        &mut self,
        epoch: u64,
        directory: Directory,
        reconciliation: Reconciliation,
    ) -> bool {
        if epoch <= self.committed {
            self.discarded += 1;
            return false;
        }
        self.committed = epoch;
        self.snapshot = Some(Snapshot {
            epoch,
            directory,
            reconciliation,
        });
        true
    }

    pub fn committed_epoch(&self) -> u64 {
        self.committed
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }
}

/// Re-fetches the directory every `period` without waiting for earlier cycles,
/// up to `MAX_IN_FLIGHT` at once. Stops after `max_commits` committed snapshots
/// or when `shutdown` resolves. Failing to persist the current schedule is
/// logged and does not stop the watch.
pub async fn watch<DG, S, F>(
    getter: &DG,
    store: &S,
    period: Duration,
    max_commits: Option<usize>,
    shutdown: F,
) -> DirectoryState
where
    DG: DirectoryGetter,
    S: SessionStore,
    F: Future<Output = ()>,
{
    let mut state = DirectoryState::new();
    let mut commits = 0usize;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = FuturesUnordered::new();
    tokio::pin!(shutdown);

    if max_commits == Some(0) {
        return state;
    }

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Stopping directory watch with {} cycle(s) in flight", in_flight.len());
                break;
            }
            _ = ticker.tick() => {
                if in_flight.len() >= MAX_IN_FLIGHT {
                    warn!("Skipping directory cycle, {} still in flight", in_flight.len());
                    continue;
                }
                let epoch = state.begin();
                debug!("Starting directory cycle {}", epoch);
                in_flight.push(async move { (epoch, fetch_directory(getter).await) });
            }
            Some((epoch, directory)) = in_flight.next(), if !in_flight.is_empty() => {
                let reconciliation =
                    reconcile(&directory.subjects, &directory.instructors, &directory.links);
                let committed = state.committed_epoch();
                if state.commit(epoch, directory, reconciliation) {
                    if let Some(snapshot) = state.latest() {
                        if let Err(err) = save_current_schedule(store, &snapshot.reconciliation) {
                            error!("Failed to save schedule data: {}", err);
                        }
                    }
                    commits += 1;
                    info!("Committed directory cycle {}", epoch);
                    if max_commits.is_some_and(|max| commits >= max) {
                        break;
                    }
                } else {
                    warn!(
                        "Discarding directory cycle {}, cycle {} already committed",
                        epoch, committed
                    );
                }
            }
        }
    }

    state
}
