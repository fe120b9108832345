// src/core/activity.rs
use crate::error::BotError;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::io::Write;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub time: DateTime<Utc>,
    pub message: String,
}

impl LogEntry {
    pub fn local_time(&self) -> String {
        self.time.with_timezone(&Local).format("%H:%M:%S").to_string()
    }
}

/// Bounded, newest-first activity log.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push_front(LogEntry {
            time: Utc::now(),
            message: message.into(),
        });
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Writes `Time,Message` rows, newest first.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), BotError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["Time", "Message"])?;
        for entry in &self.entries {
            wtr.write_record([entry.local_time().as_str(), entry.message.as_str()])?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String, BotError> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
