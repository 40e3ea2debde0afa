//! Log output that shares the terminal with the batch progress bar.

use std::io::{self, Write};

use indicatif::ProgressBar;
use tracing_subscriber::fmt::MakeWriter;

/// `MakeWriter` that clears the progress bar while each log line is written
/// and redraws it afterwards.
pub struct ProgressLogWriter<M> {
    bar: ProgressBar,
    inner: M,
}

impl<M> ProgressLogWriter<M> {
    pub fn new(bar: ProgressBar, inner: M) -> Self {
        Self { bar, inner }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for ProgressLogWriter<M> {
    type Writer = SuspendingWriter<'a, M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendingWriter {
            bar: &self.bar,
            inner: self.inner.make_writer(),
        }
    }
}

pub struct SuspendingWriter<'a, W> {
    bar: &'a ProgressBar,
    inner: W,
}

impl<W: Write> Write for SuspendingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.write(buf))
    }

    // One suspension per formatted event
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
