//! Where envelopes go once processed.

use crate::error::Result;
use cdc_types::OutputEnvelope;
use std::io::Write;

pub trait EnvelopeSink {
    fn emit(&mut self, envelope: &OutputEnvelope) -> Result<()>;
}

/// Newline-delimited JSON, flushed after every envelope.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> EnvelopeSink for JsonLinesSink<W> {
    fn emit(&mut self, envelope: &OutputEnvelope) -> Result<()> {
        let line = envelope.to_json_line()?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every envelope in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub envelopes: Vec<OutputEnvelope>,
}

impl EnvelopeSink for CollectingSink {
    fn emit(&mut self, envelope: &OutputEnvelope) -> Result<()> {
        self.envelopes.push(envelope.clone());
        Ok(())
    }
}
