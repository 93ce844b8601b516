//! Progress reporting for index builds.
//!
//! A build moves through four phases: read the source, segment it, embed
//! the units, write the index. Each phase emits [`ProgressEvent`]s through
//! an optional callback so the shell can render them.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Phase of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Read,
    Segment,
    Embed,
    Index,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::Read => "read",
            BuildPhase::Segment => "segment",
            BuildPhase::Embed => "embed",
            BuildPhase::Index => "index",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: BuildPhase,
    /// Bytes read or units handled so far.
    pub current: u64,
    pub total: Option<u64>,
    pub detail: String,
    /// Seconds since the reporter was created.
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    /// Completion in percent, when the total is known.
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|total| match total {
            0 => 100.0,
            t => self.current as f64 * 100.0 / t as f64,
        })
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.phase)?;
        match (self.total, self.percentage()) {
            (Some(total), Some(pct)) => write!(f, "{}/{} ({:.0}%)", self.current, total, pct)?,
            _ => write!(f, "{}", self.current)?,
        }
        write!(f, " - {}", self.detail)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Cheap to clone; clones share the start time.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    started: Arc<Instant>,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            started: Arc::new(Instant::now()),
        }
    }

    /// Reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            started: Arc::new(Instant::now()),
        }
    }

    fn emit(&self, phase: BuildPhase, current: u64, total: Option<u64>, detail: String) {
        let Some(callback) = &self.callback else {
            return;
        };

        let event = ProgressEvent {
            phase,
            current,
            total,
            detail,
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        };
        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            elapsed_secs = event.elapsed_secs,
            "{}",
            event.detail
        );
        callback(event);
    }

    pub fn read(&self, bytes: u64, path: &str) {
        self.emit(
            BuildPhase::Read,
            bytes,
            None,
            format!("read {} bytes from {}", bytes, path),
        );
    }

    pub fn segment(&self, units: u64, gaps: u32) {
        self.emit(
            BuildPhase::Segment,
            units,
            None,
            format!("{} units, {} chapters without articles", units, gaps),
        );
    }

    pub fn embed(&self, current: u64, total: u64, model: &str) {
        self.emit(BuildPhase::Embed, current, Some(total), format!("model={}", model));
    }

    pub fn index(&self, written: u64) {
        self.emit(
            BuildPhase::Index,
            written,
            Some(written),
            "writing to SQLite".to_string(),
        );
    }
}
