//! Structured event stream for `equipswap`.
//!
//! Discrete, typed events emitted while the monitor runs. Events are
//! serialized as newline-delimited JSON (JSONL) and carry a monotonically
//! increasing sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::swap::ledger::RevertMode;
use crate::swap::slot::{PhysicalSlot, PlayerIndex};
use crate::swap::trigger::TriggerId;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a monitor run.
///
/// Serialized with a `"type"` tag so consumers can dispatch on the kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The monitor loop has started.
    MonitorStarted {
        timestamp: DateTime<Utc>,
        /// Number of loaded triggers across all lists.
        trigger_count: usize,
    },

    /// A game hook was acquired.
    HookAcquired {
        timestamp: DateTime<Utc>,
        /// True when this replaces a previously lost hook.
        reacquired: bool,
    },

    /// The game hook became invalid or the target exited.
    HookLost {
        timestamp: DateTime<Utc>,
        reason: String,
    },

    /// The world finished loading.
    WorldLoaded { timestamp: DateTime<Utc> },

    /// The world was unloaded (load screen, title menu).
    WorldUnloaded { timestamp: DateTime<Utc> },

    /// A trigger rewrote an equipment identifier.
    SwapApplied {
        timestamp: DateTime<Utc>,
        player: PlayerIndex,
        trigger: TriggerId,
        slot: PhysicalSlot,
        from: i32,
        to: i32,
        permanent: bool,
    },

    /// A temporary swap was undone.
    SwapReverted {
        timestamp: DateTime<Utc>,
        player: PlayerIndex,
        slot: PhysicalSlot,
        /// Identifier that was removed.
        from: i32,
        /// Identifier that was restored.
        to: i32,
        reason: RevertMode,
    },

    /// A revert attempt failed.
    RevertFailed {
        timestamp: DateTime<Utc>,
        player: PlayerIndex,
        slot: PhysicalSlot,
        reason: RevertMode,
        /// Whether the ledger entry was kept for another attempt.
        retained: bool,
        error: String,
    },

    /// A forced revert pass ran after a world load.
    ForcedRevert {
        timestamp: DateTime<Utc>,
        reverted: usize,
        failed: usize,
        /// Entries dropped for players that were no longer present.
        dropped: usize,
    },

    /// The monitor loop has stopped.
    MonitorStopped {
        timestamp: DateTime<Utc>,
        ticks: u64,
        reason: String,
    },
}

/// Wraps an [`Event`] with a sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped; events never abort a run.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards every event.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope { sequence, event };

        if let Ok(mut w) = self.writer.lock()
            && let Ok(line) = serde_json::to_string(&envelope)
        {
            let _ = writeln!(w, "{line}");
            let _ = w.flush();
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;
    use crate::swap::slot::{Hand, SubSlot};

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone, Default)]
    pub(crate) struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        pub(crate) fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }

        /// Parsed JSON lines written so far.
        pub(crate) fn events(&self) -> Vec<serde_json::Value> {
            self.contents()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }

        /// `type` tags of every event written so far.
        pub(crate) fn types(&self) -> Vec<String> {
            self.events()
                .iter()
                .map(|e| e["type"].as_str().unwrap().to_owned())
                .collect()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn applied() -> Event {
        Event::SwapApplied {
            timestamp: DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            player: PlayerIndex::new(1).unwrap(),
            trigger: TriggerId(3),
            slot: PhysicalSlot::Weapon(Hand::Left, SubSlot::Primary),
            from: 1000,
            to: 1001,
            permanent: false,
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let parsed = serde_json::to_value(applied()).unwrap();
        assert_eq!(parsed["type"], "SwapApplied");
        assert_eq!(parsed["player"], 1);
        assert_eq!(parsed["trigger"], 3);
        assert_eq!(parsed["slot"]["kind"], "weapon");
        assert_eq!(parsed["slot"]["at"][1], "primary");
    }

    #[test]
    fn emitter_writes_sequenced_jsonl() {
        let tw = TestWriter::default();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(applied());
        emitter.emit(Event::MonitorStopped {
            timestamp: Utc::now(),
            ticks: 12,
            reason: "cancelled".to_owned(),
        });

        assert_eq!(emitter.event_count(), 2);
        let lines = tw.events();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["type"], "MonitorStopped");
        assert!(lines[0].get("event").is_none());
    }

    #[test]
    fn revert_reason_serializes_snake_case() {
        let event = Event::RevertFailed {
            timestamp: Utc::now(),
            player: PlayerIndex::new(0).unwrap(),
            slot: PhysicalSlot::Weapon(Hand::Right, SubSlot::Secondary),
            reason: RevertMode::Forced,
            retained: false,
            error: "boom".to_owned(),
        };
        let parsed = serde_json::to_value(event).unwrap();
        assert_eq!(parsed["reason"], "forced");
        assert_eq!(parsed["retained"], false);
    }

    #[test]
    fn noop_emitter_counts() {
        let emitter = EventEmitter::noop();
        emitter.emit(Event::WorldLoaded {
            timestamp: Utc::now(),
        });
        assert_eq!(emitter.event_count(), 1);
    }
}
