//! Unique table: hash-consed storage with a fixed capacity.
//!
//! Values live in a flat vector and are chained into hash buckets through
//! their `next` index, so inserting an existing value returns its old index.
//! Index 0 is a sentinel and never holds a value.

use std::cmp::min;
use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
}

pub struct Table<T> {
    data: Vec<Entry<T>>,
    capacity: usize,

    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table that can hold up to `2^bits - 1` values.
    ///
    /// Storage is grown lazily up to the capacity.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let capacity = 1 << bits;
        let mut data = Vec::with_capacity(min(capacity, 1 << 16));
        data.push(Entry {
            value: T::default(),
            next: 0,
        });

        let buckets_bits = min(bits, 20);
        let buckets_size = 1 << buckets_bits;

        Self {
            data,
            capacity,
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
        }
    }
}

impl<T> Table<T> {
    /// Maximum number of cells, including the sentinel.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored values.
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }

    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }

    /// Append a value and return its index, or `None` if the table is full.
    fn add(&mut self, value: T) -> Option<usize> {
        let index = self.data.len();
        if index >= self.capacity {
            return None;
        }
        self.data.push(Entry { value, next: 0 });
        Some(index)
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Put a value into the table and return its index.
    ///
    /// Returns `None` when the value is new and the table is full.
    pub fn put(&mut self, value: T) -> Option<usize> {
        let bucket = self.bucket_index(&value);
        let mut index = self.buckets[bucket];

        while index != 0 {
            if self.data[index].value == value {
                return Some(index);
            }
            index = self.data[index].next;
        }

        // Prepend the new value to the bucket chain.
        let head = self.buckets[bucket];
        let i = self.add(value)?;
        self.data[i].next = head;
        self.buckets[bucket] = i;
        Some(i)
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}
