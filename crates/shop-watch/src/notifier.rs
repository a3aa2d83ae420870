//! Audible payment alerts.
//!
//! One bounded ring cycle per batch of newly paid orders: `ring_count` rings,
//! `ring_gap` apart, however many orders the batch holds. The alarm output
//! is a single shared resource, so a cycle requested while another is still
//! ringing is skipped.

use std::{
    io::{IsTerminal, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use shop_config::WatchConfig;
use shop_schemas::Order;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    error::{WatchError, WatchResult},
    session::Session,
};

/// An alarm output.
pub trait AlarmSink: Send + Sync {
    /// Muted check that playback is allowed. Makes no sound.
    fn probe(&self) -> WatchResult<()>;

    /// Play the cue once from the start.
    fn ring(&self) -> WatchResult<()>;
}

/// ASCII BEL on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl AlarmSink for TerminalBell {
    fn probe(&self) -> WatchResult<()> {
        if std::io::stdout().is_terminal() {
            Ok(())
        } else {
            Err(WatchError::playback_blocked("stdout is not a terminal"))
        }
    }

    fn ring(&self) -> WatchResult<()> {
        self.probe()?;
        let mut out = std::io::stdout().lock();
        out.write_all(b"\x07")
            .and_then(|_| out.flush())
            .map_err(|e| WatchError::playback_blocked(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingPlan {
    pub ring_count: u32,
    pub ring_gap: Duration,
}

impl Default for RingPlan {
    fn default() -> Self {
        Self {
            ring_count: 5,
            ring_gap: Duration::from_secs(1),
        }
    }
}

impl From<&WatchConfig> for RingPlan {
    fn from(cfg: &WatchConfig) -> Self {
        Self {
            ring_count: cfg.ring_count,
            ring_gap: Duration::from_millis(cfg.ring_gap_ms),
        }
    }
}

/// Clears the busy flag when a cycle ends, including by abort.
struct CycleGuard(Arc<AtomicBool>);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct Notifier {
    session: Session,
    sink: Option<Arc<dyn AlarmSink>>,
    plan: RingPlan,
    ringing: Arc<AtomicBool>,
}

impl Notifier {
    /// `sink = None` means no audio output exists; alerts are then no-ops.
    pub fn new(session: Session, sink: Option<Arc<dyn AlarmSink>>, plan: RingPlan) -> Self {
        Self {
            session,
            sink,
            plan,
            ringing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing.load(Ordering::Acquire)
    }

    /// Start one ring cycle for `batch`. Returns the cycle's task, or `None`
    /// when nothing was started (empty batch, sound off, no output, or a
    /// cycle already running). Must be called inside a Tokio runtime.
    pub fn alert(&self, batch: &[Order]) -> Option<JoinHandle<()>> {
        if batch.is_empty() {
            return None;
        }
        if !self.session.sound_enabled() {
            debug!(orders = batch.len(), "alert suppressed: sound disabled");
            return None;
        }
        let Some(sink) = self.sink.clone() else {
            debug!(orders = batch.len(), "alert suppressed: no audio output");
            return None;
        };
        if self
            .ringing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!(orders = batch.len(), "alert skipped: a ring cycle is already running");
            return None;
        }

        let guard = CycleGuard(Arc::clone(&self.ringing));
        let plan = self.plan;
        info!(orders = batch.len(), rings = plan.ring_count, "payment alert");
        Some(tokio::spawn(async move {
            let _guard = guard;
            for i in 0..plan.ring_count {
                if i > 0 {
                    tokio::time::sleep(plan.ring_gap).await;
                }
                if let Err(err) = sink.ring() {
                    warn!(ring = i + 1, error = %err, "alarm ring failed");
                }
            }
        }))
    }

    /// Ring once, outside the polling path. Requires sound to be enabled.
    pub fn test_sound(&self) -> WatchResult<()> {
        if !self.session.sound_enabled() {
            return Err(WatchError::SoundDisabled);
        }
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| WatchError::playback_blocked("no audio output available"))?;
        sink.ring()
    }

    /// Probe the output and, only if playback is allowed, persist the flag.
    /// A blocked probe leaves the flag untouched.
    pub fn enable_sound(&self) -> WatchResult<()> {
        let sink = self
            .sink
            .as_ref()
            .ok_or_else(|| WatchError::playback_blocked("no audio output available"))?;
        if let Err(err) = sink.probe() {
            warn!(error = %err, "sound enable refused");
            return Err(match err {
                blocked @ WatchError::PlaybackBlocked { .. } => blocked,
                other => WatchError::playback_blocked(other.to_string()),
            });
        }
        self.session.set_sound_enabled(true)?;
        info!("sound enabled");
        Ok(())
    }

    pub fn disable_sound(&self) -> WatchResult<()> {
        self.session.set_sound_enabled(false)?;
        info!("sound disabled");
        Ok(())
    }
}
