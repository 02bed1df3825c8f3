//! Background refresh scheduler.
//!
//! At most one instance runs per process: `start` claims a process-wide
//! flag and `shutdown` releases it. Levels refresh on their own cadence,
//! offset from each other by a fixed stagger so upstreams never see all
//! four levels at once. Emergency refreshes jump the schedule.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::SchedulerError;
use crate::jurisdiction::Level;
use crate::preload::BoxFuture;

static RUNNING: AtomicBool = AtomicBool::new(false);

const DAY: u64 = 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub federal: Duration,
    pub state: Duration,
    pub county: Duration,
    pub municipal: Duration,
    pub stagger: Duration,
    pub tick: Duration,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            federal: Duration::from_secs(7 * DAY),
            state: Duration::from_secs(14 * DAY),
            county: Duration::from_secs(30 * DAY),
            municipal: Duration::from_secs(14 * DAY),
            stagger: Duration::from_secs(6 * 3600),
            tick: Duration::from_secs(60),
        }
    }
}

impl Cadence {
    pub fn interval(&self, level: Level) -> Duration {
        match level {
            Level::Federal => self.federal,
            Level::State => self.state,
            Level::County => self.county,
            Level::Municipal => self.municipal,
        }
    }

    /// Offset of a level's first run, so levels never share a slot.
    pub fn offset(&self, level: Level) -> Duration {
        let index = Level::ALL.iter().position(|l| *l == level).unwrap_or(0) as u32;
        self.stagger * index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshReason {
    Scheduled,
    Emergency,
}

pub type RefreshFn = Arc<dyn Fn(Level, RefreshReason) -> BoxFuture + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelStatus {
    pub interval_secs: u64,
    pub runs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_reason: Option<RefreshReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub levels: BTreeMap<Level, LevelStatus>,
}

pub struct RefreshScheduler {
    emergency: mpsc::Sender<Level>,
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    status: Arc<Mutex<SchedulerStatus>>,
}

impl RefreshScheduler {
    /// True while an instance is alive in this process.
    pub fn is_running() -> bool {
        RUNNING.load(Ordering::SeqCst)
    }

    pub fn start(cadence: Cadence, refresh: RefreshFn) -> Result<Self, SchedulerError> {
        if RUNNING
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SchedulerError::AlreadyRunning);
        }

        let (emergency, mut emergency_rx) = mpsc::channel::<Level>(16);
        let (stop, mut stop_rx) = watch::channel(false);
        let status = Arc::new(Mutex::new(SchedulerStatus {
            running: true,
            levels: Level::ALL
                .iter()
                .map(|l| {
                    (
                        *l,
                        LevelStatus {
                            interval_secs: cadence.interval(*l).as_secs(),
                            ..Default::default()
                        },
                    )
                })
                .collect(),
        }));

        let loop_status = Arc::clone(&status);
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut due: BTreeMap<Level, Instant> = Level::ALL
                .iter()
                .map(|l| (*l, started + cadence.interval(*l) + cadence.offset(*l)))
                .collect();
            let mut ticker = tokio::time::interval(cadence.tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(tick_secs = cadence.tick.as_secs(), "refresh scheduler started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = Instant::now();
                        for level in Level::ALL {
                            if due.get(&level).is_some_and(|d| now >= *d) {
                                run(&refresh, &loop_status, level, RefreshReason::Scheduled).await;
                                due.insert(level, now + cadence.interval(level));
                            }
                        }
                    }
                    Some(level) = emergency_rx.recv() => {
                        run(&refresh, &loop_status, level, RefreshReason::Emergency).await;
                        // an emergency refresh resets the level's clock
                        due.insert(level, Instant::now() + cadence.interval(level));
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("refresh scheduler loop exited");
        });

        Ok(Self {
            emergency,
            stop,
            handle: Some(handle),
            status,
        })
    }

    /// Queue an out-of-cadence refresh. Returns false when the backlog is full.
    pub fn trigger_emergency(&self, level: Level) -> bool {
        match self.emergency.try_send(level) {
            Ok(()) => true,
            Err(e) => {
                warn!(level = %level, error = %e, "emergency refresh not queued");
                false
            }
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status.lock().map(|s| s.clone()).unwrap_or_else(|e| e.into_inner().clone())
    }

    /// Stop the loop, wait for it, and release the process-wide slot.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "refresh scheduler ended abnormally");
            }
        }
        self.release();
        info!("refresh scheduler stopped");
    }

    fn release(&self) {
        if let Ok(mut s) = self.status.lock() {
            s.running = false;
        }
        RUNNING.store(false, Ordering::SeqCst);
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.release();
        }
    }
}

async fn run(refresh: &RefreshFn, status: &Mutex<SchedulerStatus>, level: Level, reason: RefreshReason) {
    info!(level = %level, ?reason, "level refresh started");
    refresh(level, reason).await;
    if let Ok(mut s) = status.lock() {
        let entry = s.levels.entry(level).or_default();
        entry.runs += 1;
        entry.last_run = Some(Utc::now());
        entry.last_reason = Some(reason);
    }
}
