//! A small ring buffer of a service's recent output lines, fed by whoever
//! owns the process's output pump, so the `Log` readiness probe can watch
//! for a pattern without re-reading the process's stdout/stderr itself.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;
use tokio::sync::Notify;

const DEFAULT_CAPACITY: usize = 512;

#[derive(Clone)]
pub struct LogTail {
    inner: Arc<Inner>,
}

struct Inner {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
    notify: Notify,
}

impl LogTail {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                lines: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
                capacity,
                notify: Notify::new(),
            }),
        }
    }

    /// Appends a captured line, dropping the oldest if the buffer is full.
    pub fn push(&self, line: String) {
        let mut lines = self.inner.lines.lock();
        if lines.len() >= self.inner.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
        drop(lines);
        self.inner.notify.notify_one();
    }

    fn any_line_matches(&self, pattern: &Regex) -> bool {
        self.inner.lines.lock().iter().any(|line| pattern.is_match(line))
    }

    /// Resolves as soon as any line (past or future) matches `pattern`.
    /// Never resolves on its own otherwise — callers race this against a
    /// deadline.
    pub async fn wait_for_match(&self, pattern: &Regex) {
        loop {
            if self.any_line_matches(pattern) {
                return;
            }
            self.inner.notify.notified().await;
        }
    }
}

impl Default for LogTail {
    fn default() -> Self {
        Self::new()
    }
}
