use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A tracing layer that keeps the last `capacity` formatted events, so a run
/// can be saved as a transcript once it is over.
pub struct TranscriptLayer {
    buffer: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl TranscriptLayer {
    pub fn new(buffer: Arc<Mutex<VecDeque<String>>>, capacity: usize) -> Self {
        Self { buffer, capacity }
    }
}

struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for TranscriptLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor {
            message: String::new(),
            fields: Vec::new(),
        };
        event.record(&mut visitor);

        let mut formatted = format!(
            "[{}] {}: {}",
            metadata.level(),
            metadata.target(),
            visitor.message
        );
        if !visitor.fields.is_empty() {
            formatted.push(' ');
            formatted.push_str(&visitor.fields.join(" "));
        }

        if self.capacity == 0 {
            return;
        }
        if let Ok(mut buf) = self.buffer.lock() {
            while buf.len() >= self.capacity {
                buf.pop_front();
            }
            buf.push_back(formatted);
        }
    }
}

/// Write every captured line to `path`, one per line.
pub fn write_transcript(buffer: &Mutex<VecDeque<String>>, path: &Path) -> std::io::Result<()> {
    let lines: Vec<String> = match buffer.lock() {
        Ok(buf) => buf.iter().cloned().collect(),
        Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
    };
    let mut file = std::fs::File::create(path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    file.flush()
}
