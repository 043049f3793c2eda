use std::collections::VecDeque;

/// Longest command line kept in history, in bytes.
pub const MAX_INPUT_SIZE: usize = 1024;

/// Default number of lines kept in history.
pub const MAX_HISTORY_SIZE: usize = 10;

/// Bounded, newest-first record of submitted command lines.
///
/// Index 0 is the most recently recorded line. Once `capacity` lines are held,
/// each new line evicts the oldest one.
#[derive(Debug)]
pub struct HistoryStore {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::with_capacity(MAX_HISTORY_SIZE)
    }
}

impl HistoryStore {
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, line: &str) {
        self.entries.push_front(bounded(line).to_owned());

        if self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_back() {
                trace!(%evicted, "history full, evicted oldest entry");
            }
        }
    }

    pub fn lookup(&self, index: i64) -> Option<&str> {
        let index = usize::try_from(index).ok()?;
        self.entries.get(index).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Cuts `line` to [`MAX_INPUT_SIZE`] bytes on a character boundary.
pub fn bounded(line: &str) -> &str {
    if line.len() <= MAX_INPUT_SIZE {
        return line;
    }

    let mut end = MAX_INPUT_SIZE;
    while !line.is_char_boundary(end) {
        end -= 1;
    }

    &line[..end]
}
