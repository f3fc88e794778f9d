//! Destinations for captured output lines

use std::collections::VecDeque;
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use tokio::sync::mpsc;

/// A caller-owned, thread-safe FIFO that receives output lines.
///
/// `offer` must never block. A sink that cannot take the line (full, or its
/// receiver is gone) returns `false` and the line is dropped.
pub trait LineSink {
    /// Append `line`, returning whether it was accepted
    fn offer(&self, line: String) -> bool;
}

impl LineSink for mpsc::UnboundedSender<String> {
    fn offer(&self, line: String) -> bool {
        self.send(line).is_ok()
    }
}

impl LineSink for mpsc::Sender<String> {
    fn offer(&self, line: String) -> bool {
        self.try_send(line).is_ok()
    }
}

impl LineSink for std_mpsc::Sender<String> {
    fn offer(&self, line: String) -> bool {
        self.send(line).is_ok()
    }
}

impl LineSink for std_mpsc::SyncSender<String> {
    fn offer(&self, line: String) -> bool {
        self.try_send(line).is_ok()
    }
}

impl LineSink for Arc<Mutex<VecDeque<String>>> {
    fn offer(&self, line: String) -> bool {
        match self.lock() {
            Ok(mut queue) => {
                queue.push_back(line);
                true
            }
            Err(_) => false,
        }
    }
}

impl<S: LineSink + ?Sized> LineSink for &S {
    fn offer(&self, line: String) -> bool {
        (**self).offer(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_tokio_sender_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        assert!(tx.offer("one".to_string()));
        assert!(!tx.offer("two".to_string()));
        assert_eq!(rx.try_recv().unwrap(), "one");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unbounded_sender_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(tx.offer("kept".to_string()));
        drop(rx);
        assert!(!tx.offer("lost".to_string()));
    }

    #[test]
    fn test_sync_sender_does_not_block() {
        let (tx, rx) = std_mpsc::sync_channel(1);
        assert!(tx.offer("a".to_string()));
        assert!(!tx.offer("b".to_string()));
        assert_eq!(rx.recv().unwrap(), "a");
    }

    #[test]
    fn test_shared_deque() {
        let queue = Arc::new(Mutex::new(VecDeque::new()));
        assert!(queue.offer("a".to_string()));
        assert!((&queue).offer("b".to_string()));
        let queue = queue.lock().unwrap();
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
