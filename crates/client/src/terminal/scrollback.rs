// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Bounded byte history of one terminal's output.
///
/// Output keeps arriving while a session is in the background; when the
/// session is presented again the retained tail is replayed. Once full,
/// the oldest bytes are overwritten.
#[derive(Debug)]
pub struct Scrollback {
    buf: Vec<u8>,
    capacity: usize,
    head: usize,
    total: u64,
}

impl Scrollback {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { buf: Vec::with_capacity(capacity.min(4096)), capacity, head: 0, total: 0 }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.total += data.len() as u64;

        // Only the last `capacity` bytes can survive.
        let data = &data[data.len().saturating_sub(self.capacity)..];

        if self.buf.len() < self.capacity {
            let room = self.capacity - self.buf.len();
            let (fits, rest) = data.split_at(data.len().min(room));
            self.buf.extend_from_slice(fits);
            self.write_wrapped(rest);
        } else {
            self.write_wrapped(data);
        }
    }

    /// Overwrite from `head` once the buffer has reached capacity.
    fn write_wrapped(&mut self, data: &[u8]) {
        for chunk in data.chunks(self.capacity) {
            let end = self.head + chunk.len();
            if end <= self.capacity {
                self.buf[self.head..end].copy_from_slice(chunk);
            } else {
                let first = self.capacity - self.head;
                self.buf[self.head..].copy_from_slice(&chunk[..first]);
                self.buf[..chunk.len() - first].copy_from_slice(&chunk[first..]);
            }
            self.head = end % self.capacity;
        }
    }

    /// Retained bytes as two slices, oldest first.
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        if self.buf.len() < self.capacity {
            (&self.buf, &[])
        } else {
            let (newer, older) = self.buf.split_at(self.head);
            (older, newer)
        }
    }

    /// Retained bytes in one buffer, oldest first.
    pub fn to_vec(&self) -> Vec<u8> {
        let (a, b) = self.as_slices();
        let mut out = Vec::with_capacity(a.len() + b.len());
        out.extend_from_slice(a);
        out.extend_from_slice(b);
        out
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes ever pushed, including those since overwritten.
    pub fn total_written(&self) -> u64 {
        self.total
    }

    /// Bytes pushed but no longer retained.
    pub fn dropped(&self) -> u64 {
        self.total - self.buf.len() as u64
    }
}

#[cfg(test)]
#[path = "scrollback_tests.rs"]
mod tests;
