#![forbid(unsafe_code)]

//! The refresh engine: turns editing state into one batched write of VT100
//! escape sequences.
//!
//! Two strategies exist, selected by the multi-line mode flag. Both build
//! the whole frame into a byte buffer which the caller flushes with a
//! single write; partial writes interleave badly with asynchronous host
//! output and cause visible flicker.
//!
//! Erasing and drawing are gated separately by [`Refresh`] flags so a host
//! can hide the line (clean only) before printing its own output and show
//! it again (write only) afterwards.
//!
//! Width accounting is byte based: one byte, one column.

use rawline_core::Hint;

bitflags::bitflags! {
    /// Which phases of a refresh to perform.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct Refresh: u8 {
        /// Erase the previously drawn prompt and content.
        const CLEAN = 1 << 0;
        /// Draw the current prompt and content.
        const WRITE = 1 << 1;
        /// Both phases.
        const ALL = Self::CLEAN.bits() | Self::WRITE.bits();
    }
}

/// Multi-line bookkeeping carried between refreshes, used to work out how
/// many stale rows the clean phase must erase.
#[derive(Debug, Default)]
pub(crate) struct RefreshState {
    /// Rows used by the previous draw.
    pub rows: usize,
    /// Cursor offset at the previous draw.
    pub cursor: usize,
}

impl RefreshState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Everything the renderer needs for one frame.
pub(crate) struct View<'a> {
    pub prompt: &'a [u8],
    pub content: &'a [u8],
    pub cursor: usize,
    pub cols: usize,
    pub masked: bool,
    pub hint: Option<&'a Hint>,
}

/// Single-line refresh.
///
/// When the line is wider than the terminal a window over the content
/// slides right so the cursor stays on screen, and the visible length is
/// truncated to fit. The slide stops at the window edge even when the
/// prompt alone exceeds the terminal width.
pub(crate) fn render_single(view: &View, flags: Refresh, out: &mut Vec<u8>) {
    let plen = view.prompt.len();
    let cols = view.cols.max(1);
    let mut start = 0;
    let mut len = view.content.len();
    let mut pos = view.cursor;

    while pos > 0 && plen + pos >= cols {
        start += 1;
        len -= 1;
        pos -= 1;
    }
    while len > 0 && plen + len > cols {
        len -= 1;
    }

    out.extend_from_slice(b"\r");
    if flags.contains(Refresh::WRITE) {
        out.extend_from_slice(view.prompt);
        push_content(out, &view.content[start..start + len], view.masked);
        push_hint(out, view, plen);
    }
    out.extend_from_slice(b"\x1b[0K");
    if flags.contains(Refresh::WRITE) {
        out.extend_from_slice(b"\r");
        csi(out, pos + plen, b'C');
    }
}

/// Multi-line refresh.
///
/// The clean phase walks down to the last row the previous draw used and
/// erases upward; the write phase redraws everything and then places the
/// cursor with row-aware movement. When the cursor lands exactly on a row
/// boundary at the end of the content an explicit newline keeps the model
/// and the terminal's autowrap in agreement.
pub(crate) fn render_multi(
    view: &View,
    flags: Refresh,
    state: &mut RefreshState,
    out: &mut Vec<u8>,
) {
    let plen = view.prompt.len();
    let cols = view.cols.max(1);
    let mut rows = (plen + view.content.len() + cols - 1) / cols;
    let old_cursor_row = (plen + state.cursor + cols) / cols;
    let old_rows = state.rows;
    state.rows = rows;

    if flags.contains(Refresh::CLEAN) {
        // Go to the last row used by the previous draw, then erase each row
        // while moving back up.
        if old_rows > old_cursor_row {
            csi(out, old_rows - old_cursor_row, b'B');
        }
        for _ in 1..old_rows {
            out.extend_from_slice(b"\r\x1b[0K\x1b[1A");
        }
    }
    if flags.intersects(Refresh::ALL) {
        out.extend_from_slice(b"\r\x1b[0K");
    }

    if flags.contains(Refresh::WRITE) {
        out.extend_from_slice(view.prompt);
        push_content(out, view.content, view.masked);
        push_hint(out, view, plen);

        if view.cursor > 0
            && view.cursor == view.content.len()
            && (view.cursor + plen) % cols == 0
        {
            out.extend_from_slice(b"\n\r");
            rows += 1;
            if rows > state.rows {
                state.rows = rows;
            }
        }

        let cursor_row = (plen + view.cursor + cols) / cols;
        if rows > cursor_row {
            csi(out, rows - cursor_row, b'A');
        }
        out.extend_from_slice(b"\r");
        csi(out, (plen + view.cursor) % cols, b'C');
    }

    state.cursor = view.cursor;
}

fn push_content(out: &mut Vec<u8>, content: &[u8], masked: bool) {
    if masked {
        out.extend(std::iter::repeat_n(b'*', content.len()));
    } else {
        out.extend_from_slice(content);
    }
}

/// Append the hint, truncated to the space right of the content. Styled
/// hints are wrapped in a color sequence that is reset afterwards.
fn push_hint(out: &mut Vec<u8>, view: &View, plen: usize) {
    let Some(hint) = view.hint else { return };
    let used = plen + view.content.len();
    if used >= view.cols {
        return;
    }
    let visible = hint.text.len().min(view.cols - used);

    let color = match (hint.color, hint.bold) {
        (Some(color), _) => Some(color),
        (None, true) => Some(37),
        (None, false) => None,
    };
    if let Some(color) = color {
        out.extend_from_slice(b"\x1b[");
        out.push(if hint.bold { b'1' } else { b'0' });
        out.push(b';');
        out.extend_from_slice(color.to_string().as_bytes());
        out.extend_from_slice(b";49m");
    }
    out.extend_from_slice(&hint.text.as_bytes()[..visible]);
    if color.is_some() {
        out.extend_from_slice(b"\x1b[0m");
    }
}

/// Append `ESC [ <n> <action>`, suppressing zero counts entirely; some
/// terminals mishandle `ESC[0C`-style sequences.
fn csi(out: &mut Vec<u8>, n: usize, action: u8) {
    if n == 0 {
        return;
    }
    out.extend_from_slice(b"\x1b[");
    out.extend_from_slice(n.to_string().as_bytes());
    out.push(action);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(view: &View, flags: Refresh) -> Vec<u8> {
        let mut out = Vec::new();
        render_single(view, flags, &mut out);
        out
    }

    fn view<'a>(prompt: &'a [u8], content: &'a [u8], cursor: usize, cols: usize) -> View<'a> {
        View {
            prompt,
            content,
            cursor,
            cols,
            masked: false,
            hint: None,
        }
    }

    #[test]
    fn single_line_basic_frame() {
        let out = single(&view(b"> ", b"hello", 5, 80), Refresh::ALL);
        assert_eq!(out, b"\r> hello\x1b[0K\r\x1b[7C");
    }

    #[test]
    fn single_line_clean_only_erases() {
        let out = single(&view(b"> ", b"hello", 5, 80), Refresh::CLEAN);
        assert_eq!(out, b"\r\x1b[0K");
    }

    #[test]
    fn single_line_window_slides_right() {
        // Columns 10, prompt of 2, eight bytes with the cursor at the end:
        // the window slides one byte so the cursor is back on screen.
        let out = single(&view(b"> ", b"abcdefgh", 8, 10), Refresh::ALL);
        assert_eq!(out, b"\r> bcdefgh\x1b[0K\r\x1b[9C");
    }

    #[test]
    fn single_line_truncates_to_width() {
        let out = single(&view(b"> ", b"abcdefghij", 0, 10), Refresh::ALL);
        assert_eq!(out, b"\r> abcdefgh\x1b[0K\r\x1b[2C");
    }

    #[test]
    fn single_line_zero_cursor_move_suppressed() {
        let out = single(&view(b"", b"", 0, 80), Refresh::ALL);
        assert_eq!(out, b"\r\x1b[0K\r");
    }

    #[test]
    fn single_line_prompt_wider_than_terminal_does_not_underflow() {
        let out = single(&view(b"#####", b"ab", 2, 4), Refresh::ALL);
        // Visible content shrinks to nothing; the frame is still well formed.
        assert_eq!(out, b"\r#####\x1b[0K\r\x1b[5C");
    }

    #[test]
    fn masked_content_renders_stars() {
        let mut v = view(b"> ", b"secret", 6, 80);
        v.masked = true;
        let out = single(&v, Refresh::ALL);
        assert_eq!(out, b"\r> ******\x1b[0K\r\x1b[8C");
    }

    #[test]
    fn hint_is_truncated_and_styled() {
        let hint = Hint {
            text: "int".to_owned(),
            color: Some(35),
            bold: false,
        };
        let mut v = view(b"> ", b"pr", 2, 80);
        v.hint = Some(&hint);
        let out = single(&v, Refresh::ALL);
        assert_eq!(out, b"\r> pr\x1b[0;35;49mint\x1b[0m\x1b[0K\r\x1b[4C");
    }

    #[test]
    fn bold_hint_defaults_to_white() {
        let hint = Hint {
            text: "x".to_owned(),
            color: None,
            bold: true,
        };
        let mut v = view(b"", b"a", 1, 10);
        v.hint = Some(&hint);
        let out = single(&v, Refresh::ALL);
        assert_eq!(out, b"\ra\x1b[1;37;49mx\x1b[0m\x1b[0K\r\x1b[1C");
    }

    #[test]
    fn hint_suppressed_when_line_fills_width() {
        let hint = Hint {
            text: "never".to_owned(),
            color: None,
            bold: false,
        };
        let mut v = view(b"> ", b"abcdefgh", 8, 10);
        v.hint = Some(&hint);
        let out = single(&v, Refresh::ALL);
        assert!(!out.windows(5).any(|w| w == b"never"));
    }

    fn multi(view: &View, flags: Refresh, state: &mut RefreshState) -> Vec<u8> {
        let mut out = Vec::new();
        render_multi(view, flags, state, &mut out);
        out
    }

    #[test]
    fn multi_line_first_draw_single_row() {
        let mut state = RefreshState::default();
        let out = multi(&view(b"> ", b"hi", 2, 10), Refresh::ALL, &mut state);
        assert_eq!(out, b"\r\x1b[0K> hi\r\x1b[4C");
        assert_eq!(state.rows, 1);
        assert_eq!(state.cursor, 2);
    }

    #[test]
    fn multi_line_wrap_emits_explicit_newline_at_boundary() {
        // Prompt 2 + content 8 lands exactly on the 10-column boundary with
        // the cursor at the end: the renderer emits its own newline so the
        // terminal's autowrap cannot desynchronize the row model.
        let mut state = RefreshState { rows: 1, cursor: 7 };
        let out = multi(&view(b"> ", b"abcdefgh", 8, 10), Refresh::ALL, &mut state);
        assert_eq!(out, b"\r\x1b[0K> abcdefgh\n\r\r");
        assert_eq!(state.rows, 2);
    }

    #[test]
    fn multi_line_clean_erases_previous_rows() {
        // Previous draw used two rows with the cursor on the second one.
        let mut state = RefreshState { rows: 2, cursor: 9 };
        let out = multi(&view(b"> ", b"abcdefghi", 9, 10), Refresh::ALL, &mut state);
        assert_eq!(
            out,
            b"\r\x1b[0K\x1b[1A\r\x1b[0K> abcdefghi\r\x1b[1C".as_slice()
        );
        assert_eq!(state.rows, 2);
    }

    #[test]
    fn multi_line_clean_moves_down_from_interior_cursor() {
        // Cursor was on row one of a two-row draw: the clean phase moves
        // down one row before erasing upward.
        let mut state = RefreshState { rows: 2, cursor: 3 };
        let out = multi(&view(b"> ", b"abc", 3, 10), Refresh::CLEAN, &mut state);
        assert_eq!(out, b"\x1b[1B\r\x1b[0K\x1b[1A\r\x1b[0K");
    }

    #[test]
    fn multi_line_write_only_redraws_without_descent() {
        let mut state = RefreshState::default();
        let out = multi(&view(b"> ", b"abc", 3, 10), Refresh::WRITE, &mut state);
        assert_eq!(out, b"\r\x1b[0K> abc\r\x1b[5C");
    }

    #[test]
    fn multi_line_cursor_mid_content_moves_up() {
        // Two rows of content with the cursor back on the first row.
        let mut state = RefreshState { rows: 2, cursor: 2 };
        let out = multi(&view(b"> ", b"abcdefghijk", 2, 10), Refresh::ALL, &mut state);
        assert_eq!(
            out,
            b"\x1b[1B\r\x1b[0K\x1b[1A\r\x1b[0K> abcdefghijk\x1b[1A\r\x1b[4C".as_slice()
        );
        assert_eq!(state.cursor, 2);
    }

    #[test]
    fn multi_line_zero_counts_never_emitted() {
        let mut state = RefreshState::default();
        let out = multi(&view(b"", b"", 0, 10), Refresh::ALL, &mut state);
        assert!(!out.windows(4).any(|w| w == b"\x1b[0A" || w == b"\x1b[0B"));
        assert!(!out.windows(4).any(|w| w == b"\x1b[0C" || w == b"\x1b[0D"));
    }
}
