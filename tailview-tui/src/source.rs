//! Log sources and the background thread feeding them into the viewer.
//!
//! A [`LineSource`] acquires raw log lines from somewhere (a growing file,
//! stdin). [`spawn_source_thread`] runs one in a dedicated thread, pushing
//! lines into a lock-free ring buffer the UI thread drains at its own pace:
//!
//! ```text
//! ┌────────────┐  poll_lines()  ┌─────────────┐  try_pop()  ┌──────────┐
//! │ LineSource │ ─────────────> │ ring buffer │ ──────────> │ UI thread│
//! └────────────┘                └─────────────┘             └──────────┘
//! ```
//!
//! `poll_lines()` must be non-blocking: return an empty `Vec` when nothing
//! new is available. When the ring buffer fills faster than the UI drains
//! it, the oldest unconsumed lines in the current push are dropped and
//! counted in the debug log.

use anyhow::Result;
use ringbuf::traits::Producer;
use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

/// Trait for acquiring raw log lines from any source.
pub trait LineSource: Send {
    /// acquire resources; called once before polling starts
    fn start(&mut self) -> Result<()>;

    /// release resources; called once on shutdown
    fn stop(&mut self) -> Result<()>;

    /// new complete lines since the last call; must not block
    fn poll_lines(&mut self) -> Result<Vec<String>>;
}

/// Tails a file: reads whatever is appended between polls.
///
/// Partial lines (no trailing newline yet) stay buffered until the writer
/// completes them.
pub struct FileSource {
    path: String,
    reader: Option<BufReader<File>>,
    partial: String,
}

impl FileSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reader: None,
            partial: String::new(),
        }
    }
}

impl LineSource for FileSource {
    fn start(&mut self) -> Result<()> {
        let file = File::open(&self.path)?;
        self.reader = Some(BufReader::new(file));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }

    fn poll_lines(&mut self) -> Result<Vec<String>> {
        let Some(reader) = &mut self.reader else {
            return Ok(Vec::new());
        };

        let mut chunk = String::new();
        reader.read_to_string(&mut chunk)?;
        if chunk.is_empty() {
            return Ok(Vec::new());
        }

        self.partial.push_str(&chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        Ok(lines)
    }
}

/// Reads stdin through an internal thread, so `poll_lines` never blocks.
pub struct StdinSource {
    buffer: Arc<Mutex<Vec<String>>>,
    reader_thread: Option<thread::JoinHandle<()>>,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(Mutex::new(Vec::new())),
            reader_thread: None,
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for StdinSource {
    fn start(&mut self) -> Result<()> {
        let buffer = Arc::clone(&self.buffer);
        // the reader thread parks on stdin; it ends with the process
        self.reader_thread = Some(thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if let Ok(mut buf) = buffer.lock() {
                            buf.push(line);
                        }
                    }
                    Err(e) => {
                        log::debug!("stdin closed: {}", e);
                        break;
                    }
                }
            }
        }));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        // stdin cannot be interrupted portably; the thread exits with us
        self.reader_thread = None;
        Ok(())
    }

    fn poll_lines(&mut self) -> Result<Vec<String>> {
        let mut buf = self
            .buffer
            .lock()
            .map_err(|_| anyhow::anyhow!("stdin buffer poisoned"))?;
        Ok(buf.drain(..).collect())
    }
}

/// Runs a source in a background thread, pushing lines into `producer`.
///
/// Returns the join handle and a stop flag; set the flag and join on
/// shutdown. Errors from `poll_lines` are logged and polling continues;
/// a failed `start` aborts the thread.
pub fn spawn_source_thread<S>(
    mut source: S,
    mut producer: impl Producer<Item = String> + Send + 'static,
    poll_interval: Duration,
) -> (thread::JoinHandle<()>, Arc<AtomicBool>)
where
    S: LineSource + 'static,
{
    let should_stop = Arc::new(AtomicBool::new(false));
    let should_stop_clone = Arc::clone(&should_stop);

    let handle = thread::spawn(move || {
        if let Err(e) = source.start() {
            log::error!("failed to start log source: {}", e);
            return;
        }

        log::debug!("source thread started");

        while !should_stop_clone.load(Ordering::Relaxed) {
            match source.poll_lines() {
                Ok(lines) => {
                    let mut dropped = 0usize;
                    for line in lines {
                        if producer.try_push(line).is_err() {
                            dropped += 1;
                        }
                    }
                    if dropped > 0 {
                        log::debug!("ring buffer full, dropped {} lines", dropped);
                    }
                }
                Err(e) => {
                    log::debug!("source poll error: {}", e);
                }
            }

            thread::sleep(poll_interval);
        }

        if let Err(e) = source.stop() {
            log::error!("failed to stop log source: {}", e);
        }

        log::debug!("source thread stopped");
    });

    (handle, should_stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_source_reads_appended_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "second").unwrap();
        file.flush().unwrap();

        let mut source = FileSource::new(file.path().to_string_lossy());
        source.start().unwrap();
        assert_eq!(source.poll_lines().unwrap(), vec!["first", "second"]);

        // nothing new yet
        assert!(source.poll_lines().unwrap().is_empty());

        writeln!(file, "third").unwrap();
        file.flush().unwrap();
        assert_eq!(source.poll_lines().unwrap(), vec!["third"]);

        source.stop().unwrap();
    }

    #[test]
    fn test_file_source_buffers_partial_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "incompl").unwrap();
        file.flush().unwrap();

        let mut source = FileSource::new(file.path().to_string_lossy());
        source.start().unwrap();
        assert!(source.poll_lines().unwrap().is_empty());

        writeln!(file, "ete").unwrap();
        file.flush().unwrap();
        assert_eq!(source.poll_lines().unwrap(), vec!["incomplete"]);
    }

    #[test]
    fn test_file_source_strips_crlf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "windows line\r\n").unwrap();
        file.flush().unwrap();

        let mut source = FileSource::new(file.path().to_string_lossy());
        source.start().unwrap();
        assert_eq!(source.poll_lines().unwrap(), vec!["windows line"]);
    }
}
