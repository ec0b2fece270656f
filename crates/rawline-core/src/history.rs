#![forbid(unsafe_code)]

//! Bounded history of past input lines, with file persistence.
//!
//! Entries are ordered oldest first. While an edit is in progress the last
//! entry is a live mirror of the buffer being edited; the session pushes it
//! on edit start and pops it on commit or end-of-file. Scrolling with
//! prev/next saves the buffer into the slot being scrolled away from, so a
//! half-typed line survives a round trip through history.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// Default capacity, matching the common readline-style bound.
pub const DEFAULT_MAX_LEN: usize = 100;

/// A bounded, duplicate-suppressing sequence of past lines.
#[derive(Debug)]
pub struct History {
    entries: Vec<String>,
    max_len: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN)
    }
}

impl History {
    /// Create an empty history bounded to `max_len` entries.
    ///
    /// A zero `max_len` disables history entirely: every add is a no-op.
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_len,
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `index` (0 is the oldest), if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Iterate entries oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Append a line, suppressing adjacent duplicates and evicting the
    /// oldest entry once the capacity is reached.
    ///
    /// Returns whether the line was stored.
    pub fn add(&mut self, line: &str) -> bool {
        if self.max_len == 0 {
            return false;
        }
        if self.entries.last().is_some_and(|last| last == line) {
            return false;
        }
        if self.entries.len() == self.max_len {
            self.entries.remove(0);
        }
        self.entries.push(line.to_owned());
        true
    }

    /// Push the live bottom entry for an edit in progress.
    ///
    /// Unlike [`History::add`] this never suppresses, so the pop on commit
    /// is always balanced. Evicts the oldest entry at capacity.
    pub fn push_live(&mut self) {
        if self.max_len == 0 {
            return;
        }
        if self.entries.len() == self.max_len {
            self.entries.remove(0);
        }
        self.entries.push(String::new());
    }

    /// Pop the live bottom entry.
    pub fn pop_live(&mut self) {
        self.entries.pop();
    }

    /// Overwrite the entry at `index`, used when scrolling away from it.
    pub fn replace(&mut self, index: usize, line: String) {
        if let Some(slot) = self.entries.get_mut(index) {
            *slot = line;
        }
    }

    /// Change the capacity, discarding the oldest entries when shrinking.
    pub fn set_max_len(&mut self, max_len: usize) {
        if self.entries.len() > max_len {
            let excess = self.entries.len() - max_len;
            self.entries.drain(..excess);
        }
        self.max_len = max_len;
    }

    /// Write every entry to `path`, one per line, creating or truncating the
    /// file with owner-only read/write permission.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut opts = OpenOptions::new();
        opts.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(0o600);
        }
        let mut file = opts.open(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        for entry in &self.entries {
            file.write_all(entry.as_bytes())?;
            file.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Read `path` line by line, feeding each line through [`History::add`].
    ///
    /// Lines may end in `\n` or `\r`; content past the first `\r` is
    /// discarded. A missing file is an error, not an empty history.
    pub fn load(&mut self, path: &Path) -> io::Result<()> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let end = line.find('\r').unwrap_or_else(|| line.trim_end_matches('\n').len());
            self.add(&line[..end]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_iterate_in_order() {
        let mut history = History::new(10);
        history.add("a");
        history.add("b");
        history.add("c");
        assert_eq!(history.iter().collect::<Vec<_>>(), ["a", "b", "c"]);
    }

    #[test]
    fn adjacent_duplicates_suppressed() {
        let mut history = History::new(10);
        assert!(history.add("same"));
        assert!(!history.add("same"));
        assert_eq!(history.len(), 1);
        assert!(history.add("other"));
        assert!(history.add("same"));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn eviction_is_fifo() {
        let mut history = History::new(3);
        for line in ["a", "b", "c", "d"] {
            history.add(line);
        }
        assert_eq!(history.iter().collect::<Vec<_>>(), ["b", "c", "d"]);
    }

    #[test]
    fn zero_capacity_disables_history() {
        let mut history = History::new(0);
        assert!(!history.add("a"));
        history.push_live();
        history.pop_live();
        assert!(history.is_empty());
    }

    #[test]
    fn shrinking_discards_oldest() {
        let mut history = History::new(10);
        for line in ["a", "b", "c", "d"] {
            history.add(line);
        }
        history.set_max_len(2);
        assert_eq!(history.iter().collect::<Vec<_>>(), ["c", "d"]);
        // Capacity stays in force for later adds.
        history.add("e");
        assert_eq!(history.iter().collect::<Vec<_>>(), ["d", "e"]);
    }

    #[test]
    fn push_live_never_suppresses() {
        let mut history = History::new(10);
        history.add("");
        history.push_live();
        assert_eq!(history.len(), 2);
        history.pop_live();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");

        let mut history = History::new(10);
        for line in ["first", "second", "third"] {
            history.add(line);
        }
        history.save(&path).unwrap();

        let mut restored = History::new(10);
        restored.load(&path).unwrap();
        assert_eq!(
            restored.iter().collect::<Vec<_>>(),
            history.iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn load_accepts_carriage_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        std::fs::write(&path, "one\r\ntwo\nthree\r\n").unwrap();

        let mut history = History::new(10);
        history.load(&path).unwrap();
        assert_eq!(history.iter().collect::<Vec<_>>(), ["one", "two", "three"]);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = History::new(10);
        assert!(history.load(&dir.path().join("absent")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn save_uses_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        let mut history = History::new(10);
        history.add("secret");
        history.save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
