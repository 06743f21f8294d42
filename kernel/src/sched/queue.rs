//! Очередь готовых потоков — строгий FIFO
//! Ready queue — strict FIFO
//!
//! Порядок вставки = порядок выполнения; дубликатов нет.
//! Insertion order = run order; no duplicates.

use alloc::collections::VecDeque;

use super::thread::ThreadHandle;
use crate::{Error, Result};

pub struct ReadyQueue {
    entries: VecDeque<ThreadHandle>,
}

impl ReadyQueue {
    /// Зарезервировать место под `capacity` потоков — дальше очередь
    /// не аллоцирует. Reserve room for `capacity` threads — the queue
    /// never allocates after this.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut entries = VecDeque::new();
        entries.try_reserve_exact(capacity).map_err(|_| Error::OutOfMemory)?;
        Ok(Self { entries })
    }

    /// В хвост. Повторная постановка — нарушение инварианта.
    /// To the tail. Queueing twice is an invariant breach.
    pub fn enqueue(&mut self, thread: ThreadHandle) {
        assert!(!self.contains(thread), "thread {:?} is already in the ready queue", thread);
        self.entries.push_back(thread);
    }

    pub fn dequeue_front(&mut self) -> Option<ThreadHandle> {
        self.entries.pop_front()
    }

    /// Удалить поток, если он есть. Возвращает, был ли он в очереди.
    /// Drop the thread if present. Returns whether it was queued.
    pub fn remove(&mut self, thread: ThreadHandle) -> bool {
        match self.entries.iter().position(|&t| t == thread) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, thread: ThreadHandle) -> bool {
        self.entries.contains(&thread)
    }

    pub fn iter(&self) -> impl Iterator<Item = ThreadHandle> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::pool::SlotPool;
    use alloc::vec::Vec;

    fn handles(n: usize) -> Vec<ThreadHandle> {
        let mut pool = SlotPool::with_capacity(n).unwrap();
        (0..n).map(|i| ThreadHandle(pool.allocate(i).unwrap())).collect()
    }

    #[test]
    fn dequeues_in_insertion_order() {
        let t = handles(3);
        let mut q = ReadyQueue::with_capacity(3).unwrap();
        for &h in &t {
            q.enqueue(h);
        }
        assert_eq!(q.dequeue_front(), Some(t[0]));
        assert_eq!(q.dequeue_front(), Some(t[1]));
        assert_eq!(q.dequeue_front(), Some(t[2]));
        assert_eq!(q.dequeue_front(), None);
    }

    #[test]
    fn remove_from_the_middle_keeps_the_rest_in_order() {
        let t = handles(3);
        let mut q = ReadyQueue::with_capacity(3).unwrap();
        for &h in &t {
            q.enqueue(h);
        }
        assert!(q.remove(t[1]));
        assert_eq!(q.iter().collect::<Vec<_>>(), [t[0], t[2]]);
    }

    #[test]
    fn removing_an_absent_thread_is_a_no_op() {
        let t = handles(2);
        let mut q = ReadyQueue::with_capacity(2).unwrap();
        q.enqueue(t[0]);
        assert!(!q.remove(t[1]));
        assert_eq!(q.len(), 1);
        assert_eq!(q.iter().collect::<Vec<_>>(), [t[0]]);
    }

    #[test]
    #[should_panic(expected = "already in the ready queue")]
    fn double_enqueue_is_fatal() {
        let t = handles(1);
        let mut q = ReadyQueue::with_capacity(1).unwrap();
        q.enqueue(t[0]);
        q.enqueue(t[0]);
    }
}
