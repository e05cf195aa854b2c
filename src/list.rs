//! The growable array that backs lists, strings and procedures.
//!
//! Capacity is tracked explicitly rather than left to `Vec`'s own growth
//! strategy so that the policy is observable and testable:
//!
//! - a fresh list has capacity [`INIT_CAPACITY`]
//! - appending to a full list multiplies capacity by [`GROWTH_FACTOR`]
//! - popping from a list whose size is below a quarter of its capacity first
//!   halves the capacity, never going below [`INIT_CAPACITY`]
//!
//! Growth past [`MAX_CAPACITY`] or an allocator refusal is reported as a
//! [`CapacityError`] and leaves the list exactly as it was.
//!
//! Each list also carries an identity token. Cloning a list hands out another
//! handle to the same logical object (same identity) while [`List::try_copy`]
//! produces an independent object. `eq?` on containers compares identities.

use crate::Error;
use crate::ast::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Capacity of every newly created list
pub const INIT_CAPACITY: usize = 8;

/// Factor applied to capacity on growth. Must stay even for the shrink math.
pub const GROWTH_FACTOR: usize = 2;

/// Largest capacity a list may reach
pub const MAX_CAPACITY: usize = u32::MAX as usize;

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

fn fresh_identity() -> u64 {
    NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed)
}

/// A list could not grow to hold another element
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("list capacity exhausted")]
pub struct CapacityError;

impl From<CapacityError> for Error {
    fn from(_: CapacityError) -> Self {
        Error::OutOfMemory
    }
}

pub struct List {
    identity: u64,
    capacity: usize,
    limit: usize,
    values: Vec<Value>,
}

impl List {
    pub fn new() -> Self {
        Self::with_limit(MAX_CAPACITY)
    }

    /// A list that refuses to grow beyond `limit` slots
    pub(crate) fn with_limit(limit: usize) -> Self {
        List {
            identity: fresh_identity(),
            capacity: INIT_CAPACITY,
            limit,
            values: Vec::with_capacity(INIT_CAPACITY),
        }
    }

    /// Build a list from an iterator, stopping at the first growth failure
    pub fn try_from_iter<I>(iter: I) -> Result<Self, CapacityError>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut list = List::new();
        for value in iter {
            list.append(value)?;
        }
        Ok(list)
    }

    /// Build a character list from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CapacityError> {
        Self::try_from_iter(bytes.iter().map(|&b| Value::Char(b)))
    }

    /// Recover the raw bytes of a character list, or `None` if any element
    /// is not a character
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        self.values
            .iter()
            .map(|v| match v {
                Value::Char(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    pub fn append(&mut self, value: Value) -> Result<(), CapacityError> {
        if self.values.len() == self.capacity {
            self.grow()?;
        }
        self.values.push(value);
        Ok(())
    }

    fn grow(&mut self) -> Result<(), CapacityError> {
        if self.capacity > self.limit / GROWTH_FACTOR {
            return Err(CapacityError);
        }
        let new_capacity = self.capacity * GROWTH_FACTOR;
        self.values
            .try_reserve_exact(new_capacity - self.values.len())
            .map_err(|_| CapacityError)?;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Remove and return the last element.
    ///
    /// The shrink check runs against the size before removal.
    pub fn pop(&mut self) -> Option<Value> {
        if self.values.is_empty() {
            return None;
        }
        if self.values.len() < self.capacity / (GROWTH_FACTOR * GROWTH_FACTOR) {
            self.shrink();
        }
        self.values.pop()
    }

    fn shrink(&mut self) {
        let new_capacity = (self.capacity / GROWTH_FACTOR).max(INIT_CAPACITY);
        self.values.shrink_to(new_capacity);
        self.capacity = new_capacity;
    }

    pub fn lookup(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Drop every element and return to the initial capacity
    pub fn clear(&mut self) {
        self.values.clear();
        self.values.shrink_to(INIT_CAPACITY);
        self.capacity = INIT_CAPACITY;
    }

    /// Deep copy with fresh identities all the way down
    pub fn try_copy(&self) -> Result<List, CapacityError> {
        let mut copy = List::new();
        for value in &self.values {
            copy.append(value.try_copy()?)?;
        }
        Ok(copy)
    }

    /// Whether two handles refer to the same logical list
    pub fn same_identity(&self, other: &List) -> bool {
        self.identity == other.identity
    }
}

impl Default for List {
    fn default() -> Self {
        List::new()
    }
}

/// Another handle to the same list: identity and capacity are preserved
impl Clone for List {
    fn clone(&self) -> Self {
        let mut values = Vec::with_capacity(self.capacity);
        values.extend(self.values.iter().cloned());
        List {
            identity: self.identity,
            capacity: self.capacity,
            limit: self.limit,
            values,
        }
    }
}

/// Structural equality; identity is ignored
impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl std::fmt::Debug for List {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}

/// Wraps an existing vector without going through `append`, so it cannot fail.
/// Capacity is rounded up to the power of two the append path would reach.
impl From<Vec<Value>> for List {
    fn from(values: Vec<Value>) -> Self {
        let capacity = values.len().next_power_of_two().max(INIT_CAPACITY);
        let mut values = values;
        values.reserve_exact(capacity - values.len());
        List {
            identity: fresh_identity(),
            capacity,
            limit: MAX_CAPACITY,
            values,
        }
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
