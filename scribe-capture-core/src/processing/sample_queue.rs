use std::collections::VecDeque;

/// Bounded FIFO of live audio samples shared between a stream tap and a
/// consumer thread. Wrap in `Arc<parking_lot::Mutex<SampleQueue>>` for
/// cross-thread use.
///
/// Two consumption styles, matching its two users:
/// - the encoder worker *drains* (consuming, in arrival order);
/// - the amplitude probe *snapshots the tail* (non-consuming, most
///   recent window only — a live probe, not a queue).
///
/// Overflow drops the oldest samples.
#[derive(Debug)]
pub struct SampleQueue {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append samples, dropping the oldest on overflow. If the slice
    /// alone exceeds capacity, only its tail is kept.
    pub fn push(&mut self, samples: &[f32]) {
        if samples.len() >= self.capacity {
            self.samples.clear();
            self.samples
                .extend(&samples[samples.len() - self.capacity..]);
            return;
        }

        let overflow = (self.samples.len() + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.samples.drain(..overflow);
        }
        self.samples.extend(samples);
    }

    /// Remove and return up to `count` samples, oldest first.
    pub fn drain(&mut self, count: usize) -> Vec<f32> {
        let take = count.min(self.samples.len());
        self.samples.drain(..take).collect()
    }

    /// Remove and return everything queued.
    pub fn drain_all(&mut self) -> Vec<f32> {
        self.samples.drain(..).collect()
    }

    /// Copy of the most recent `count` samples, oldest first, without
    /// consuming. Returns fewer if fewer have arrived.
    pub fn tail(&self, count: usize) -> Vec<f32> {
        let skip = self.samples.len().saturating_sub(count);
        self.samples.iter().skip(skip).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_arrival_order() {
        let mut q = SampleQueue::new(10);
        q.push(&[1.0, 2.0, 3.0]);

        assert_eq!(q.len(), 3);
        assert_eq!(q.drain(2), vec![1.0, 2.0]);
        assert_eq!(q.drain_all(), vec![3.0]);
        assert!(q.is_empty());
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut q = SampleQueue::new(4);
        q.push(&[1.0, 2.0, 3.0, 4.0]);
        q.push(&[5.0, 6.0]);

        assert_eq!(q.drain_all(), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn push_larger_than_capacity_keeps_tail() {
        let mut q = SampleQueue::new(3);
        q.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(q.drain_all(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn tail_does_not_consume() {
        let mut q = SampleQueue::new(8);
        q.push(&[1.0, 2.0, 3.0, 4.0]);

        assert_eq!(q.tail(2), vec![3.0, 4.0]);
        assert_eq!(q.tail(10), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn empty_operations() {
        let mut q = SampleQueue::new(4);

        assert!(q.drain(3).is_empty());
        assert!(q.tail(3).is_empty());

        q.push(&[]);
        assert!(q.is_empty());
    }
}
