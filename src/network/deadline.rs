//! Deadline-bounded socket I/O
//!
//! Socket timeouts bound a single syscall. [`DeadlineStream`] turns them into
//! an absolute deadline: before every read or write it sets the socket
//! timeout to the time left, and once nothing is left it fails with
//! `TimedOut` without touching the socket.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// Which socket timeout the stream drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Read,
    Write,
}

/// One half of a TCP connection with an optional absolute deadline
#[derive(Debug)]
pub(crate) struct DeadlineStream {
    stream: TcpStream,
    direction: Direction,
    deadline: Option<Instant>,
}

impl DeadlineStream {
    pub(crate) fn new(stream: TcpStream, direction: Direction) -> Self {
        Self {
            stream,
            direction,
            deadline: None,
        }
    }

    /// Start a new deadline `timeout` from now. Zero clears it.
    pub(crate) fn arm(&mut self, timeout: Duration) {
        self.deadline = if timeout.is_zero() {
            None
        } else {
            Some(Instant::now() + timeout)
        };
    }

    pub(crate) fn get_ref(&self) -> &TcpStream {
        &self.stream
    }

    /// Point the socket timeout at the remaining time
    fn prepare(&self) -> io::Result<()> {
        let timeout = match self.deadline {
            None => None,
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(left) if !left.is_zero() => Some(left),
                _ => return Err(io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded")),
            },
        };
        match self.direction {
            Direction::Read => self.stream.set_read_timeout(timeout),
            Direction::Write => self.stream.set_write_timeout(timeout),
        }
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.prepare()?;
        self.stream.read(buf)
    }
}

impl Write for DeadlineStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.prepare()?;
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
