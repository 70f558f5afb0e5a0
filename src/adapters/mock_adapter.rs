//! Scripted transport for exercising drivers without hardware.
//!
//! Each write "answers" with the next queued reply, the way a half-duplex
//! instrument responds to one command at a time. Writes, closes and reply
//! consumption are observable through a [`MockHandle`] that stays valid after
//! the transport itself has been moved into (and dropped by) a driver.
//!
//! ```
//! use lab_serial::adapters::MockTransport;
//!
//! let (transport, handle) = MockTransport::new();
//! handle.queue_reply("BUSY\r");
//! handle.queue_reply("DONE\r");
//! # drop(transport);
//! assert_eq!(handle.pending_replies(), 2);
//! ```

use crate::adapters::Transport;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    /// Replies released one per write
    replies: VecDeque<Vec<u8>>,
    /// Bytes the driver may read right now
    rx: VecDeque<u8>,
    /// Every write, in order
    writes: Vec<Vec<u8>>,
    reads: usize,
    closes: usize,
    clears: usize,
    fail_writes: bool,
}

/// Inspection and scripting handle shared with a [`MockTransport`].
#[derive(Clone, Debug, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the raw bytes answered to the next unanswered write.
    pub fn queue_reply(&self, reply: impl AsRef<[u8]>) {
        self.lock().replies.push_back(reply.as_ref().to_vec());
    }

    /// Make bytes readable immediately, without waiting for a write.
    pub fn inject(&self, bytes: impl AsRef<[u8]>) {
        self.lock().rx.extend(bytes.as_ref().iter().copied());
    }

    /// Every write seen so far, decoded lossily.
    pub fn writes(&self) -> Vec<String> {
        self.lock()
            .writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Number of writes.
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// Number of read calls, including timed-out ones.
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Number of buffer clears.
    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    /// Replies still waiting for a write.
    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }

    /// Make subsequent writes fail with `BrokenPipe`.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }
}

/// In-memory [`Transport`] answering writes from a reply queue.
#[derive(Debug)]
pub struct MockTransport {
    handle: MockHandle,
    per_read_timeout: Duration,
}

impl MockTransport {
    /// Create a transport and the handle used to script and inspect it.
    pub fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        let transport = Self {
            handle: handle.clone(),
            per_read_timeout: Duration::from_millis(1),
        };
        (transport, handle)
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.handle.lock();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure"));
        }
        state.writes.push(bytes.to_vec());
        if let Some(reply) = state.replies.pop_front() {
            state.rx.extend(reply);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.handle.lock();
        state.reads += 1;
        if state.rx.is_empty() {
            drop(state);
            // Behave like a port with a short read timeout.
            std::thread::sleep(self.per_read_timeout);
            return Err(io::Error::new(io::ErrorKind::TimedOut, "mock read timeout"));
        }
        let n = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        let mut state = self.handle.lock();
        state.clears += 1;
        state.rx.clear();
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.handle.lock().closes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_released_on_write() {
        let (mut transport, handle) = MockTransport::new();
        handle.queue_reply("OK\r");

        let mut buf = [0u8; 8];
        assert_eq!(
            transport.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::TimedOut
        );

        transport.write_all(b"PING\r").unwrap();
        let n = transport.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"OK\r");
        assert_eq!(handle.writes(), vec!["PING\r".to_string()]);
    }

    #[test]
    fn test_failing_writes() {
        let (mut transport, handle) = MockTransport::new();
        handle.fail_writes(true);
        assert!(transport.write_all(b"X").is_err());
        assert_eq!(handle.write_count(), 0);
    }
}
