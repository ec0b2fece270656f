#![forbid(unsafe_code)]

//! The edited line: a growable byte sequence with a cursor offset.
//!
//! The buffer is binary safe and byte addressed. Display-width accounting in
//! the renderer assumes one byte per column, so the cursor here is both a
//! byte offset and a column offset.
//!
//! # Invariants
//!
//! - `cursor <= len` after every mutation.
//! - Capacity grows and never shrinks while a session is alive; `clear`
//!   resets length and cursor but keeps the allocation.

/// A growable byte buffer with a cursor, mutated by every edit operation.
#[derive(Debug, Default)]
pub struct LineBuffer {
    bytes: Vec<u8>,
    cursor: usize,
}

impl LineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The buffer content.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Content length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Cursor offset, always in `0..=len`.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// True when the cursor sits at the end of the content.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.cursor == self.bytes.len()
    }

    /// Reset length and cursor to zero, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.clear();
        self.cursor = 0;
    }

    /// Replace the whole content, placing the cursor at the end.
    pub fn replace(&mut self, content: &[u8]) {
        self.bytes.clear();
        self.bytes.extend_from_slice(content);
        self.cursor = self.bytes.len();
        self.check();
    }

    /// Insert one byte at the cursor, shifting the tail right.
    ///
    /// Returns `false` when the buffer could not grow to hold the byte; the
    /// content is left exactly as it was (the keystroke is dropped, never a
    /// torn write).
    pub fn insert(&mut self, byte: u8) -> bool {
        if self.bytes.try_reserve(1).is_err() {
            return false;
        }
        self.bytes.insert(self.cursor, byte);
        self.cursor += 1;
        self.check();
        true
    }

    /// Remove the byte left of the cursor. Returns whether anything changed.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.bytes.remove(self.cursor);
        self.check();
        true
    }

    /// Remove the byte under the cursor without moving it (forward delete).
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.bytes.len() {
            return false;
        }
        self.bytes.remove(self.cursor);
        self.check();
        true
    }

    /// Move the cursor one byte left. Returns whether it moved.
    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Move the cursor one byte right. Returns whether it moved.
    pub fn move_right(&mut self) -> bool {
        if self.cursor == self.bytes.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Move the cursor to offset zero. Returns whether it moved.
    pub fn move_home(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = 0;
        true
    }

    /// Move the cursor past the last byte. Returns whether it moved.
    pub fn move_end(&mut self) -> bool {
        if self.cursor == self.bytes.len() {
            return false;
        }
        self.cursor = self.bytes.len();
        true
    }

    /// Drop everything from the cursor to the end of the line.
    pub fn kill_to_end(&mut self) {
        self.bytes.truncate(self.cursor);
        self.check();
    }

    /// Drop everything before the cursor, moving the cursor to zero.
    pub fn kill_to_start(&mut self) {
        self.bytes.drain(..self.cursor);
        self.cursor = 0;
        self.check();
    }

    /// Swap the byte under the cursor with the one before it.
    ///
    /// Requires `0 < cursor < len`. The cursor advances by one unless it was
    /// already at the last swappable position. Returns whether a swap
    /// happened.
    pub fn transpose(&mut self) -> bool {
        if self.cursor == 0 || self.cursor >= self.bytes.len() {
            return false;
        }
        self.bytes.swap(self.cursor - 1, self.cursor);
        if self.cursor != self.bytes.len() - 1 {
            self.cursor += 1;
        }
        self.check();
        true
    }

    /// Delete the word left of the cursor.
    ///
    /// Scans left over spaces, then over the word itself, and removes
    /// everything between that boundary and the old cursor position.
    /// Returns whether anything was removed.
    pub fn delete_prev_word(&mut self) -> bool {
        let old = self.cursor;
        let mut pos = self.cursor;
        while pos > 0 && self.bytes[pos - 1] == b' ' {
            pos -= 1;
        }
        while pos > 0 && self.bytes[pos - 1] != b' ' {
            pos -= 1;
        }
        self.bytes.drain(pos..old);
        self.cursor = pos;
        self.check();
        pos != old
    }

    fn check(&self) {
        debug_assert!(self.cursor <= self.bytes.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf_with(content: &[u8]) -> LineBuffer {
        let mut buf = LineBuffer::new();
        buf.replace(content);
        buf
    }

    #[test]
    fn insert_at_end_appends() {
        let mut buf = LineBuffer::new();
        assert!(buf.insert(b'h'));
        assert!(buf.insert(b'i'));
        assert_eq!(buf.as_bytes(), b"hi");
        assert_eq!(buf.cursor(), 2);
        assert!(buf.is_at_end());
    }

    #[test]
    fn insert_mid_line_shifts_tail() {
        let mut buf = buf_with(b"held");
        buf.move_left();
        buf.move_left();
        assert!(buf.insert(b'l'));
        assert_eq!(buf.as_bytes(), b"helld");
        assert_eq!(buf.cursor(), 3);
    }

    #[test]
    fn backspace_removes_left_of_cursor() {
        let mut buf = buf_with(b"abc");
        buf.move_left();
        assert!(buf.backspace());
        assert_eq!(buf.as_bytes(), b"ac");
        assert_eq!(buf.cursor(), 1);
        assert!(!buf_with(b"").backspace());
    }

    #[test]
    fn delete_keeps_cursor() {
        let mut buf = buf_with(b"abc");
        buf.move_home();
        assert!(buf.delete());
        assert_eq!(buf.as_bytes(), b"bc");
        assert_eq!(buf.cursor(), 0);
        buf.move_end();
        assert!(!buf.delete());
    }

    #[test]
    fn move_left_three_times_from_end() {
        // Buffer "hello", cursor at 5: three steps left land on 2.
        let mut buf = buf_with(b"hello");
        for _ in 0..3 {
            assert!(buf.move_left());
        }
        assert_eq!(buf.cursor(), 2);
        assert_eq!(buf.as_bytes(), b"hello");
    }

    #[test]
    fn transpose_swaps_and_advances() {
        let mut buf = buf_with(b"abcd");
        buf.move_home();
        buf.move_right();
        assert!(buf.transpose());
        assert_eq!(buf.as_bytes(), b"bacd");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn transpose_at_last_position_keeps_cursor() {
        let mut buf = buf_with(b"ab");
        buf.move_left();
        assert!(buf.transpose());
        assert_eq!(buf.as_bytes(), b"ba");
        assert_eq!(buf.cursor(), 1);
    }

    #[test]
    fn transpose_needs_interior_cursor() {
        let mut buf = buf_with(b"ab");
        assert!(!buf.transpose());
        buf.move_home();
        assert!(!buf.transpose());
    }

    #[test]
    fn kill_to_end_truncates() {
        let mut buf = buf_with(b"abcdef");
        buf.move_left();
        buf.move_left();
        buf.kill_to_end();
        assert_eq!(buf.as_bytes(), b"abcd");
        assert_eq!(buf.cursor(), 4);
    }

    #[test]
    fn kill_to_start_drains() {
        let mut buf = buf_with(b"abcdef");
        buf.move_left();
        buf.move_left();
        buf.kill_to_start();
        assert_eq!(buf.as_bytes(), b"ef");
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn delete_prev_word_skips_spaces_then_word() {
        let mut buf = buf_with(b"one two   ");
        assert!(buf.delete_prev_word());
        assert_eq!(buf.as_bytes(), b"one ");
        assert_eq!(buf.cursor(), 4);
    }

    #[test]
    fn delete_prev_word_mid_line() {
        let mut buf = buf_with(b"one two three");
        for _ in 0..5 {
            buf.move_left();
        }
        assert!(buf.delete_prev_word());
        assert_eq!(buf.as_bytes(), b"one three");
        assert_eq!(buf.cursor(), 4);
    }

    #[test]
    fn delete_prev_word_on_empty_buffer() {
        let mut buf = LineBuffer::new();
        assert!(!buf.delete_prev_word());
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn replace_places_cursor_at_end() {
        let mut buf = buf_with(b"abc");
        buf.replace(b"longer content");
        assert_eq!(buf.cursor(), 14);
    }
}
