// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A collection type with a capacity fixed at construction and a recorded logical length.

Instance tables are built exactly once, in instance order, and then uploaded.  They never
grow, so unlike a normal Vec the capacity here is part of the contract: pushing past it is
a programming error, and a table is only "complete" once its length reaches its capacity.
*/

use std::ops::Index;

#[derive(Debug, Clone, PartialEq)]
pub struct FixedTable<T> {
    vec: Vec<T>,
    capacity: usize,
}

impl<T> FixedTable<T> {
    /**
    Creates a new FixedTable with the specified capacity.

    The capacity cannot be changed later.
    */
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vec: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a value, returning its index.
    ///
    /// # Panics
    ///
    /// Panics if the table has reached capacity.
    pub fn push(&mut self, value: T) -> usize {
        assert!(
            self.vec.len() < self.capacity,
            "Cannot push to a FixedTable that has reached capacity {}",
            self.capacity
        );
        self.vec.push(value);
        self.vec.len() - 1
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once every slot has been written.
    pub fn is_complete(&self) -> bool {
        self.vec.len() == self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.vec.get(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vec.iter()
    }
}

impl<T: Clone> FixedTable<T> {
    /// Builds a complete table from a slice; capacity equals the slice length.
    pub fn from_slice(values: &[T]) -> Self {
        Self {
            vec: values.to_vec(),
            capacity: values.len(),
        }
    }
}

impl<T> Index<usize> for FixedTable<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.vec[index]
    }
}
