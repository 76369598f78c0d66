use std::cell::RefCell;
use std::rc::Rc;

use crate::error::FlightError;
use crate::rsc::wire_format::Chunk;

/// Sink for completed rows.
///
/// `begin_writing` and `complete_writing` bracket every batch of writes. `write_chunk` returns
/// `false` when the sink wants the writer to pause until it is re-armed. `close` is called once,
/// after the last row.
pub trait Destination {
    fn begin_writing(&mut self) -> Result<(), FlightError> {
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &Chunk) -> Result<bool, FlightError>;

    fn complete_writing(&mut self) -> Result<(), FlightError> {
        Ok(())
    }

    fn flush_buffered(&mut self) -> Result<(), FlightError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), FlightError>;
}

#[derive(Debug, Default)]
struct MemoryLog {
    rows: Vec<String>,
    buffered: usize,
    begin_count: usize,
    complete_count: usize,
    flush_count: usize,
    close_count: usize,
}

/// Collects rows in memory. Rows accumulate until drained through the paired [`MemoryOutput`].
#[derive(Debug)]
pub struct MemoryDestination {
    log: Rc<RefCell<MemoryLog>>,
    high_water_mark: Option<usize>,
    failure: Option<String>,
}

/// Read side of a [`MemoryDestination`].
#[derive(Debug, Clone)]
pub struct MemoryOutput {
    log: Rc<RefCell<MemoryLog>>,
}

impl MemoryDestination {
    pub fn new() -> (Self, MemoryOutput) {
        let log = Rc::new(RefCell::new(MemoryLog::default()));
        let output = MemoryOutput { log: Rc::clone(&log) };
        (Self { log, high_water_mark: None, failure: None }, output)
    }

    /// Reports saturation once `limit` rows are buffered and not yet drained.
    pub fn with_high_water_mark(mut self, limit: usize) -> Self {
        self.high_water_mark = Some(limit);
        self
    }

    /// Makes every write fail with a destination error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

impl Destination for MemoryDestination {
    fn begin_writing(&mut self) -> Result<(), FlightError> {
        self.log.borrow_mut().begin_count += 1;
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &Chunk) -> Result<bool, FlightError> {
        if let Some(message) = &self.failure {
            return Err(FlightError::destination(message.clone()));
        }

        let mut log = self.log.borrow_mut();
        log.rows.push(chunk.as_str().to_string());
        log.buffered += 1;
        Ok(self.high_water_mark.is_none_or(|limit| log.buffered < limit))
    }

    fn complete_writing(&mut self) -> Result<(), FlightError> {
        self.log.borrow_mut().complete_count += 1;
        Ok(())
    }

    fn flush_buffered(&mut self) -> Result<(), FlightError> {
        self.log.borrow_mut().flush_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), FlightError> {
        self.log.borrow_mut().close_count += 1;
        Ok(())
    }
}

impl MemoryOutput {
    pub fn rows(&self) -> Vec<String> {
        self.log.borrow().rows.clone()
    }

    pub fn text(&self) -> String {
        self.log.borrow().rows.concat()
    }

    /// Marks every buffered row as consumed so writes stop reporting saturation.
    pub fn drain(&self) -> usize {
        std::mem::take(&mut self.log.borrow_mut().buffered)
    }

    pub fn is_closed(&self) -> bool {
        self.log.borrow().close_count > 0
    }

    pub fn close_count(&self) -> usize {
        self.log.borrow().close_count
    }

    pub fn begin_count(&self) -> usize {
        self.log.borrow().begin_count
    }

    pub fn complete_count(&self) -> usize {
        self.log.borrow().complete_count
    }

    pub fn flush_count(&self) -> usize {
        self.log.borrow().flush_count
    }
}
