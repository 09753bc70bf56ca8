//! Fixed-capacity ring buffer holding the most recent input frames.

use crate::error::{try_filled, Result};

/// Fixed-capacity ring buffer that overwrites its oldest element when full.
///
/// Storage is reserved once at construction; pushes never allocate.
#[derive(Debug, Clone)]
pub struct RingBuffer<T>
where
    T: Copy + Default,
{
    data: Vec<T>,
    /// Index of the oldest element.
    head: usize,
    len: usize,
}

impl<T> RingBuffer<T>
where
    T: Copy + Default,
{
    /// Creates an empty ring buffer holding at most `cap` elements.
    ///
    /// # Errors
    /// Returns [`StretchError::Allocation`](crate::StretchError::Allocation)
    /// if the storage cannot be reserved.
    pub fn try_with_capacity(cap: usize) -> Result<Self> {
        Ok(Self {
            data: try_filled(cap, T::default())?,
            head: 0,
            len: 0,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Fills the buffer to capacity with `T::default()`.
    pub fn fill_default(&mut self) {
        self.data.iter_mut().for_each(|x| *x = T::default());
        self.head = 0;
        self.len = self.capacity();
    }

    /// Element `index` positions after the oldest one, if stored.
    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        Some(self.data[(self.head + index) % self.capacity()])
    }

    /// Appends `value`, dropping the oldest element when full.
    #[inline]
    pub fn push_overwrite(&mut self, value: T) {
        let cap = self.capacity();
        if cap == 0 {
            return;
        }
        if self.len == cap {
            self.data[self.head] = value;
            self.head = (self.head + 1) % cap;
        } else {
            self.data[(self.head + self.len) % cap] = value;
            self.len += 1;
        }
    }
}
