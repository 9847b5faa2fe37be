use chrono::Local;
use serde::Serialize;
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use crate::error::Result;

/// Log target used by [`LogAuditSink`], so audit lines can be filtered apart from diagnostics.
pub const AUDIT_TARGET: &str = "audit";

/// Discrete events emitted by the allocation core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AuditKind {
    /// A vehicle was assigned a slot.
    Park,
    /// A reservation attempt was refused.
    ReserveFail,
    /// A vehicle entered the wait queue.
    WaitlistAdd,
    /// A queued vehicle was assigned automatically after capacity freed up.
    WaitlistAssign,
    /// A vehicle released its slot.
    Free,
    /// A vehicle was forcibly removed by an emergency release.
    EmergencyFree,
    /// Totals of one emergency release.
    EmergencyFreeSummary,
    /// A facility was offered by the recommender.
    SmartRecommend,
    /// The distance cache was emptied.
    CacheClear,
    /// Facility data was persisted.
    DataSave,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::Park => "PARK",
            AuditKind::ReserveFail => "RESERVE_FAIL",
            AuditKind::WaitlistAdd => "WAITLIST_ADD",
            AuditKind::WaitlistAssign => "WAITLIST_ASSIGN",
            AuditKind::Free => "FREE",
            AuditKind::EmergencyFree => "EMERGENCY_FREE",
            AuditKind::EmergencyFreeSummary => "EMERGENCY_FREE_SUMMARY",
            AuditKind::SmartRecommend => "SMART_RECOMMEND",
            AuditKind::CacheClear => "CACHE_CLEAR",
            AuditKind::DataSave => "DATA_SAVE",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver for audit events. The storage format belongs to the implementation.
pub trait AuditSink: fmt::Debug + Send + Sync {
    fn record(&self, kind: AuditKind, detail: &str);
}

/// Forwards audit events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, kind: AuditKind, detail: &str) {
        log::info!(target: AUDIT_TARGET, "{} | {}", kind, detail);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub kind: AuditKind,
    pub detail: String,
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<AuditKind> {
        self.records().into_iter().map(|r| r.kind).collect()
    }

    pub fn count(&self, kind: AuditKind) -> usize {
        self.records().iter().filter(|r| r.kind == kind).count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, kind: AuditKind, detail: &str) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(AuditRecord { kind, detail: detail.to_string() }),
            Err(_) => log::error!("Audit record dropped, memory sink lock poisoned: {} | {}", kind, detail),
        }
    }
}

#[derive(Debug, Serialize)]
struct AuditRow<'a> {
    time: String,
    kind: &'static str,
    detail: &'a str,
}

/// Appends `time;kind;detail` rows to a file.
pub struct CsvAuditSink {
    writer: Mutex<csv::Writer<std::fs::File>>,
}

impl fmt::Debug for CsvAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvAuditSink").finish_non_exhaustive()
    }
}

impl CsvAuditSink {
    /// Opens `path` for appending. The header row is only written into an empty file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new().delimiter(b';').has_headers(false).from_writer(file);

        if is_empty {
            writer.write_record(["time", "kind", "detail"])?;
            writer.flush()?;
        }

        log::debug!("Audit sink opened at '{}'.", path.as_ref().display());
        Ok(Self { writer: Mutex::new(writer) })
    }
}

impl AuditSink for CsvAuditSink {
    fn record(&self, kind: AuditKind, detail: &str) {
        let row = AuditRow { time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(), kind: kind.as_str(), detail };

        let Ok(mut writer) = self.writer.lock() else {
            log::error!("Audit record dropped, writer lock poisoned: {} | {}", kind, detail);
            return;
        };

        // A failing audit write must never abort an allocation.
        if let Err(e) = writer.serialize(&row) {
            log::error!("Failed to write audit record: {}", e);
        }
        if let Err(e) = writer.flush() {
            log::error!("Failed to flush audit sink: {}", e);
        }
    }
}

impl Drop for CsvAuditSink {
    fn drop(&mut self) {
        if let Ok(writer) = self.writer.get_mut() {
            let _ = writer.flush();
        }
    }
}
