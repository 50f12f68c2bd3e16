//! Consumers of the engine's event stream.
//!
//! Sinks run after a tick has finished and never report failures back:
//! a sink that cannot write logs a warning and keeps going.

use crate::event::{Event, EventKind};
use colored::Colorize;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub trait EventSink {
    fn publish(&mut self, event: &Event);
}

/// Prints one colored line per event.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn publish(&mut self, event: &Event) {
        let line = event.to_string();
        let line = match event.kind {
            EventKind::Queued => line.as_str().cyan(),
            EventKind::Escalated => line.as_str().yellow().bold(),
            EventKind::Cancelled => line.as_str().red().bold(),
            EventKind::Assigned => line.as_str().green(),
            EventKind::Completed => line.as_str().blue(),
        };
        println!("{}", line);
    }
}

/// Appends event lines to a file, opening it lazily.
///
/// If the file cannot be opened or written, the event is dropped and the
/// next publish tries again.
#[derive(Debug)]
pub struct LogFileSink {
    path: PathBuf,
    writer: Option<LineWriter<File>>,
}

impl LogFileSink {
    pub fn new(path: impl AsRef<Path>) -> LogFileSink {
        LogFileSink {
            path: path.as_ref().to_path_buf(),
            writer: None,
        }
    }

    fn writer(&mut self) -> Option<&mut LineWriter<File>> {
        if self.writer.is_none() {
            match OpenOptions::new().create(true).append(true).open(&self.path) {
                Ok(file) => self.writer = Some(LineWriter::new(file)),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Cannot open event log");
                    return None;
                }
            }
        }
        self.writer.as_mut()
    }
}

impl EventSink for LogFileSink {
    fn publish(&mut self, event: &Event) {
        let Some(writer) = self.writer() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{}", event) {
            warn!(path = %self.path.display(), error = %e, "Cannot write event log");
            self.writer = None;
        }
    }
}

impl EventSink for Vec<Event> {
    fn publish(&mut self, event: &Event) {
        self.push(event.clone());
    }
}

impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn publish(&mut self, event: &Event) {
        self.0.publish(event);
        self.1.publish(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn publish(&mut self, event: &Event) {
        (**self).publish(event);
    }
}
