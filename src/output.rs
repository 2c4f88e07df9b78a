//! Output formatting and display utilities

use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes one JSON document per line to a file or stdout.
pub struct OutputWriter {
    sink: Box<dyn Write>,
}

impl OutputWriter {
    pub fn new(file: Option<&Path>) -> Result<Self> {
        let sink: Box<dyn Write> = match file {
            Some(path) => Box::new(BufWriter::new(File::create(path)?)),
            None => Box::new(io::stdout()),
        };
        Ok(Self { sink })
    }

    /// Write `value` as a single JSON line
    pub fn write_line<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.sink, value)?;
        self.sink.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}
