//! Consuming the output of a running command

use crate::LineSink;
use sshlink_transport::RemoteSession;
use std::io::{self, BufRead, BufReader, Read};
use tokio::sync::mpsc;
use tracing::debug;

/// Consumes the output of a session whose command has already been submitted.
///
/// Runs on the caller's thread before the session is closed. Implementations
/// must not assume the session stays open once they return.
pub trait ResponseHandler {
    /// Drain and process the session's output
    fn handle(&mut self, session: &mut dyn RemoteSession) -> io::Result<()>;
}

impl<F> ResponseHandler for F
where
    F: FnMut(&mut dyn RemoteSession) -> io::Result<()>,
{
    fn handle(&mut self, session: &mut dyn RemoteSession) -> io::Result<()> {
        self(session)
    }
}

/// Reads stdout line by line and offers every line to a [`LineSink`].
///
/// Lines end at `\n` with an optional preceding `\r`; a last line without a
/// terminator is still delivered. Invalid UTF-8 is replaced, not rejected.
/// Lines the sink refuses are dropped and counted.
#[derive(Debug)]
pub struct DefaultResponseHandler<S> {
    sink: S,
    offered: usize,
    dropped: usize,
}

impl<S: LineSink> DefaultResponseHandler<S> {
    /// Feed lines into `sink`
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            offered: 0,
            dropped: 0,
        }
    }

    /// The sink lines are offered to
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Lines read during the last `handle`
    pub fn lines_offered(&self) -> usize {
        self.offered
    }

    /// Lines the sink refused during the last `handle`
    pub fn lines_dropped(&self) -> usize {
        self.dropped
    }

    /// Split `reader` into lines and offer each one to the sink
    pub fn consume<R: Read>(&mut self, reader: R) -> io::Result<()> {
        self.offered = 0;
        self.dropped = 0;

        let mut reader = BufReader::new(EofTolerantReader::new(reader));
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            if buf.last() == Some(&b'\n') {
                buf.pop();
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
            }

            self.offered += 1;
            if !self.sink.offer(String::from_utf8_lossy(&buf).into_owned()) {
                self.dropped += 1;
            }
        }

        if self.dropped > 0 {
            debug!("Sink refused {} of {} output lines", self.dropped, self.offered);
        }
        Ok(())
    }
}

impl DefaultResponseHandler<mpsc::UnboundedSender<String>> {
    /// Handler over a new unbounded queue; no line is ever dropped while the
    /// receiver is alive
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl DefaultResponseHandler<mpsc::Sender<String>> {
    /// Handler over a new queue holding at most `capacity` lines; lines that
    /// arrive while it is full are dropped instead of blocking the reader.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl<S: LineSink> ResponseHandler for DefaultResponseHandler<S> {
    fn handle(&mut self, session: &mut dyn RemoteSession) -> io::Result<()> {
        self.consume(session.stdout())
    }
}

/// Reports end-of-stream instead of the errors a read hits once the remote
/// command has already shut its side of the channel.
pub struct EofTolerantReader<R> {
    inner: R,
    eof: bool,
}

impl<R: Read> EofTolerantReader<R> {
    /// Wrap `inner`
    pub fn new(inner: R) -> Self {
        Self { inner, eof: false }
    }

    /// Unwrap the inner reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for EofTolerantReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.eof {
            return Ok(0);
        }
        match self.inner.read(buf) {
            Ok(0) => {
                self.eof = true;
                Ok(0)
            }
            Err(e) if closed_by_peer(e.kind()) => {
                debug!("Treating {} as end of output", e);
                self.eof = true;
                Ok(0)
            }
            other => other,
        }
    }
}

fn closed_by_peer(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}
