//! Validated cursor state shared by every buffer store
//!
//! A [`Cursor`] tracks `mark <= position <= limit <= capacity`. Every
//! transition either keeps that ordering or returns an error and leaves the
//! cursor untouched.

use crate::{Error, Result};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    capacity: usize,
    limit: usize,
    position: usize,
    mark: Option<usize>,
}

impl Cursor {
    /// Fresh cursor spanning the whole capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            limit: capacity,
            position: 0,
            mark: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn mark_value(&self) -> Option<usize> {
        self.mark
    }

    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    /// Move the position; a mark beyond the new position is discarded
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.limit {
            return Err(Error::InvalidArgument(format!(
                "position {} exceeds limit {}",
                position, self.limit
            )));
        }
        if self.mark.is_some_and(|m| m > position) {
            self.mark = None;
        }
        self.position = position;
        self.check();
        Ok(())
    }

    /// Move the limit, pulling position and mark down with it
    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit > self.capacity {
            return Err(Error::InvalidArgument(format!(
                "limit {} exceeds capacity {}",
                limit, self.capacity
            )));
        }
        self.limit = limit;
        if self.position > limit {
            self.position = limit;
        }
        if self.mark.is_some_and(|m| m > limit) {
            self.mark = None;
        }
        self.check();
        Ok(())
    }

    pub fn mark(&mut self) {
        self.mark = Some(self.position);
    }

    pub fn reset(&mut self) -> Result<()> {
        let mark = self.mark.ok_or(Error::IllegalMark)?;
        self.position = mark;
        self.check();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.position = 0;
        self.limit = self.capacity;
        self.mark = None;
    }

    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = 0;
        self.mark = None;
    }

    pub fn rewind(&mut self) {
        self.position = 0;
        self.mark = None;
    }

    /// State after moving `[position, limit)` to the front of the store
    pub fn compact(&mut self) {
        self.position = self.remaining();
        self.limit = self.capacity;
        self.mark = None;
    }

    /// Reserve `n` slots for a relative get, advancing past them
    pub fn take_get(&mut self, n: usize) -> Result<Range<usize>> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(Error::BufferUnderflow {
                requested: n,
                remaining,
            });
        }
        Ok(self.bump(n))
    }

    /// Reserve `n` slots for a relative put, advancing past them
    pub fn take_put(&mut self, n: usize) -> Result<Range<usize>> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(Error::BufferOverflow {
                requested: n,
                remaining,
            });
        }
        Ok(self.bump(n))
    }

    /// Validate an absolute index against the limit
    pub fn check_index(&self, index: usize) -> Result<usize> {
        if index >= self.limit {
            return Err(Error::InvalidArgument(format!(
                "index {} out of bounds for limit {}",
                index, self.limit
            )));
        }
        Ok(index)
    }

    fn bump(&mut self, n: usize) -> Range<usize> {
        let start = self.position;
        self.position += n;
        self.check();
        start..self.position
    }

    fn check(&self) {
        debug_assert!(self.limit <= self.capacity);
        debug_assert!(self.position <= self.limit);
        debug_assert!(self.mark.map_or(true, |m| m <= self.position));
    }
}
