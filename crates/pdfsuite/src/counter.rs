//! Persisted access counter, incremented once per successfully processed item.
//!
//! The counter is display-only; it must never fail an item. It is injected as
//! a trait so tests can substitute an in-memory store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::CounterError;

pub trait CounterStore: Send + Sync {
    /// Adds one to the counter and returns the new value.
    fn increment(&self) -> Result<u64, CounterError>;

    /// Current counter value.
    fn value(&self) -> Result<u64, CounterError>;
}

/// File-backed counter: a decimal ASCII integer in a single file.
///
/// The read-modify-write cycle runs under a process-wide lock so concurrent
/// jobs sharing one store never lose updates. Persistence is atomic via
/// write-to-temp then rename.
pub struct FileCounter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCounter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Missing or unparsable files read as zero, so a fresh install starts
    /// counting without a setup step.
    fn read_value(&self) -> Result<u64, CounterError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.trim().parse::<u64>().unwrap_or(0)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(CounterError::Read {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn write_value(&self, value: u64) -> Result<(), CounterError> {
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, value.to_string()).map_err(|e| CounterError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| CounterError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl CounterStore for FileCounter {
    fn increment(&self) -> Result<u64, CounterError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| {
            // A poisoned lock means another thread panicked mid-increment;
            // the file itself is still consistent (rename is atomic).
            poisoned.into_inner()
        });
        let next = self.read_value()? + 1;
        self.write_value(next)?;
        Ok(next)
    }

    fn value(&self) -> Result<u64, CounterError> {
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.read_value()
    }
}

/// In-memory counter for tests.
#[derive(Default)]
pub struct MemoryCounter {
    value: AtomicU64,
}

impl MemoryCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounter {
    fn increment(&self) -> Result<u64, CounterError> {
        Ok(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn value(&self) -> Result<u64, CounterError> {
        Ok(self.value.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_as_zero() {
        let tmp = TempDir::new().unwrap();
        let counter = FileCounter::new(tmp.path().join("counter"));
        assert_eq!(counter.value().unwrap(), 0);
    }

    #[test]
    fn test_increment_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("counter");

        let counter = FileCounter::new(&path);
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.increment().unwrap(), 2);

        // A fresh instance over the same file sees the persisted value.
        let reopened = FileCounter::new(&path);
        assert_eq!(reopened.value().unwrap(), 2);
        assert_eq!(reopened.increment().unwrap(), 3);
    }

    #[test]
    fn test_corrupt_file_reads_as_zero() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("counter");
        std::fs::write(&path, "not a number").unwrap();

        let counter = FileCounter::new(&path);
        assert_eq!(counter.value().unwrap(), 0);
        assert_eq!(counter.increment().unwrap(), 1);
    }

    #[test]
    fn test_no_lost_updates_across_threads() {
        let tmp = TempDir::new().unwrap();
        let counter = Arc::new(FileCounter::new(tmp.path().join("counter")));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        counter.increment().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.value().unwrap(), 100);
    }

    #[test]
    fn test_memory_counter() {
        let counter = MemoryCounter::new();
        assert_eq!(counter.value().unwrap(), 0);
        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.value().unwrap(), 1);
    }
}
