//! Two-slot ping-pong storage.
//!
//! Each frame reads the slot written last frame and writes the other one,
//! then [`PingPong::swap`] flips the roles. See
//! [`FrameSchedule`](crate::frame::FrameSchedule) for how frames use it.

/// A pair of resources alternating between read and write roles.
#[derive(Debug)]
pub struct PingPong<T> {
    slots: [T; 2],
    current: usize,
}

impl<T> PingPong<T> {
    /// Create a pair. Slot 0 is written first.
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            current: 0,
        }
    }

    /// Build both slots with the same constructor.
    pub fn from_fn(mut make: impl FnMut(usize) -> T) -> Self {
        Self::new(make(0), make(1))
    }

    /// Index of the slot written this frame.
    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Index of the slot written last frame.
    #[inline]
    pub fn previous_index(&self) -> usize {
        self.current ^ 1
    }

    /// Slot by index.
    ///
    /// # Panics
    ///
    /// Panics if `index > 1`.
    #[inline]
    pub fn get(&self, index: usize) -> &T {
        &self.slots[index]
    }

    /// Flip read and write roles.
    #[inline]
    pub fn swap(&mut self) {
        self.current ^= 1;
    }
}
