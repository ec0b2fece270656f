#![forbid(unsafe_code)]

//! The edit controller: one terminal session and its line-editing state
//! machine.
//!
//! A [`Session`] is created once per terminal connection and drives one
//! edit at a time through the non-blocking protocol: `edit_start` shows the
//! prompt and enters raw mode, `edit_feed` consumes exactly one keystroke
//! (blocking only on its reads), and `edit_stop` restores cooked mode. A
//! host with its own event loop selects on the input descriptor and calls
//! `edit_feed` when data is ready, wrapping any asynchronous output of its
//! own in [`Session::hide`] / [`Session::show`].
//!
//! Terminals whose name matches a small deny-list get a degraded
//! pass-through mode without escape sequences, and input that is not a
//! terminal at all is read line-by-line with no prompt or echo.

use std::borrow::Cow;
use std::io;
use std::path::Path;

use rawline_core::key::{BELL, ESC, TAB};
use rawline_core::{
    CompletionSource, Completions, EscapeCmd, EscapeDecoder, EscapeStep, Hint, HintSource,
    History, KeyAction, LineBuffer,
};

use crate::Error;
use crate::render::{Refresh, RefreshState, View, render_multi, render_single};
use crate::tty::{TermIo, measure_columns};

#[cfg(unix)]
use crate::tty::PosixTerm;

/// Terminal name prefixes that cannot handle the escape sequences the
/// renderer emits.
const UNSUPPORTED_TERMS: [&str; 3] = ["dumb", "cons25", "emacs"];

const CLEAR_SCREEN: &[u8] = b"\x1b[H\x1b[2J";

bitflags::bitflags! {
    /// Session behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mode: u8 {
        /// Wrap long lines across rows instead of scrolling horizontally.
        const MULTI_LINE = 1 << 0;
        /// Render every input byte as `*`, for passwords.
        const MASKED = 1 << 1;
    }
}

/// Outcome of feeding one keystroke to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The line is still being edited; feed the next keystroke.
    Editing,
    /// A line was committed; read it with [`Session::text`].
    Submitted,
    /// The user pressed the interrupt key.
    Interrupted,
    /// End of input with nothing typed.
    Ended,
}

#[derive(Debug, Clone, Copy)]
enum HistoryStep {
    Prev,
    Next,
}

// ── Session ──────────────────────────────────────────────────────────────

/// A line-editing session over one terminal connection.
///
/// The type parameter is the terminal I/O capability; production code uses
/// [`PosixTerm`] via [`Session::from_stdio`], tests inject a scripted
/// implementation.
///
/// # Contract
///
/// One edit is active at a time, bracketed by [`Session::edit_start`] and
/// [`Session::edit_stop`]. Dropping the session restores cooked mode if an
/// edit was still in progress, without writing anything.
pub struct Session<T: TermIo> {
    io: T,
    history: History,
    completion: Option<Box<dyn CompletionSource>>,
    hints: Option<Box<dyn HintSource>>,
    mode: Mode,
    dumb: bool,
    cols: Option<usize>,
    raw_active: bool,

    // Per-edit state.
    buf: LineBuffer,
    prompt: Vec<u8>,
    refresh: RefreshState,
    history_index: usize,
    in_completion: bool,
    completion_idx: usize,
}

impl<T: TermIo> Session<T> {
    /// Create a session over `io`.
    ///
    /// `term` is the terminal's advertised name (usually `$TERM`) and
    /// selects the degraded pass-through mode for terminals that cannot
    /// handle escape sequences. `history_capacity` bounds the history;
    /// zero disables it.
    pub fn new(io: T, term: Option<&str>, history_capacity: usize) -> Self {
        Self {
            dumb: term.is_some_and(is_unsupported_term),
            io,
            history: History::new(history_capacity),
            completion: None,
            hints: None,
            mode: Mode::empty(),
            cols: None,
            raw_active: false,
            buf: LineBuffer::new(),
            prompt: Vec::new(),
            refresh: RefreshState::default(),
            history_index: 0,
            in_completion: false,
            completion_idx: 0,
        }
    }

    /// Set the rendering mode flags. Takes effect at the next refresh.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Register the tab-completion source.
    pub fn set_completion_source(&mut self, source: impl CompletionSource + 'static) {
        self.completion = Some(Box::new(source));
    }

    /// Register the hint source shown to the right of the input.
    pub fn set_hint_source(&mut self, source: impl HintSource + 'static) {
        self.hints = Some(Box::new(source));
    }

    /// The current line content as text. Invalid UTF-8 is replaced.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.buf.as_bytes())
    }

    /// The current line content as raw bytes.
    #[must_use]
    pub fn buffer(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    /// Forget the cached terminal width; the next edit re-measures it.
    pub fn invalidate_columns(&mut self) {
        self.cols = None;
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Begin editing a line: enter raw mode, measure the width once per
    /// session, seed the live history entry, and write the prompt.
    ///
    /// When the input is not a terminal this only resets the buffer; the
    /// line is then read verbatim by [`Session::edit_feed`].
    pub fn edit_start(&mut self, prompt: &str) -> Result<(), Error> {
        self.prompt.clear();
        self.prompt.extend_from_slice(prompt.as_bytes());
        self.buf.clear();
        self.refresh.reset();
        self.history_index = 0;
        self.in_completion = false;
        self.completion_idx = 0;

        if !self.io.is_tty() {
            return Ok(());
        }

        self.io.enter_raw_mode().map_err(Error::BadTerminal)?;
        self.raw_active = true;
        #[cfg(feature = "tracing")]
        tracing::debug!("edit started");

        if !self.dumb && self.cols.is_none() {
            self.cols = Some(measure_columns(&mut self.io, true));
        }
        self.history.push_live();
        self.io.write_all(&self.prompt).map_err(Error::BadWrite)?;
        Ok(())
    }

    /// Consume one keystroke and advance the edit.
    ///
    /// Blocks on exactly one read in the common case; escape sequences and
    /// completion handling may read further bytes of the same logical key.
    pub fn edit_feed(&mut self) -> Result<Status, Error> {
        if !self.io.is_tty() {
            return self.feed_plain();
        }

        let byte = self.read_byte()?;

        if self.dumb {
            return self.feed_dumb(byte);
        }

        // Completion intercepts the byte first while cycling, and consumes
        // the trigger outright.
        let byte = if (self.in_completion || byte == TAB) && self.completion.is_some() {
            match self.complete_line(byte)? {
                Some(byte) => byte,
                None => return Ok(Status::Editing),
            }
        } else {
            byte
        };

        match KeyAction::from_byte(byte) {
            KeyAction::Commit => self.submit(),
            KeyAction::Interrupt => Ok(Status::Interrupted),
            KeyAction::DeleteOrEof => {
                if self.buf.is_empty() {
                    self.history.pop_live();
                    Ok(Status::Ended)
                } else {
                    self.apply(LineBuffer::delete)?;
                    Ok(Status::Editing)
                }
            }
            KeyAction::Backspace => self.editing(|s| s.apply(LineBuffer::backspace)),
            KeyAction::MoveLeft => self.editing(|s| s.apply(LineBuffer::move_left)),
            KeyAction::MoveRight => self.editing(|s| s.apply(LineBuffer::move_right)),
            KeyAction::MoveHome => self.editing(|s| s.apply(LineBuffer::move_home)),
            KeyAction::MoveEnd => self.editing(|s| s.apply(LineBuffer::move_end)),
            KeyAction::Transpose => self.editing(|s| s.apply(LineBuffer::transpose)),
            KeyAction::KillToEnd => self.editing(|s| {
                s.buf.kill_to_end();
                s.refresh_line()
            }),
            KeyAction::KillToStart => self.editing(|s| {
                s.buf.kill_to_start();
                s.refresh_line()
            }),
            KeyAction::DeletePrevWord => self.editing(|s| {
                s.buf.delete_prev_word();
                s.refresh_line()
            }),
            KeyAction::HistoryPrev => self.editing(|s| s.history_step(HistoryStep::Prev)),
            KeyAction::HistoryNext => self.editing(|s| s.history_step(HistoryStep::Next)),
            KeyAction::ClearScreen => self.editing(|s| {
                s.clear_screen()?;
                s.refresh_line()
            }),
            KeyAction::Escape => self.editing(Self::escape_dispatch),
            KeyAction::Insert(byte) => self.editing(|s| s.insert_byte(byte)),
        }
    }

    /// Finish the edit: restore cooked mode and write the trailing newline.
    ///
    /// Idempotent; a session that never entered raw mode is untouched.
    pub fn edit_stop(&mut self) -> Result<(), Error> {
        if !self.raw_active {
            return Ok(());
        }
        // Restoration is best-effort; there is no recovery action here.
        let _ = self.io.leave_raw_mode();
        self.raw_active = false;
        #[cfg(feature = "tracing")]
        tracing::debug!("edit stopped");
        self.io.write_all(b"\n").map_err(Error::BadWrite)
    }

    /// Run a whole edit to completion, blocking until the user commits,
    /// interrupts, or ends the input.
    pub fn read_line(&mut self, prompt: &str) -> Result<Status, Error> {
        self.edit_start(prompt)?;
        let status = loop {
            match self.edit_feed() {
                Ok(Status::Editing) => {}
                other => break other,
            }
        };
        let stopped = self.edit_stop();
        let status = status?;
        stopped?;
        Ok(status)
    }

    /// Erase the edit line from the screen, leaving the editing state
    /// intact. Pair with [`Session::show`] around host output.
    pub fn hide(&mut self) -> Result<(), Error> {
        if self.dumb || !self.raw_active {
            return Ok(());
        }
        self.refresh_with(Refresh::CLEAN, false)
    }

    /// Redraw the edit line previously erased with [`Session::hide`].
    pub fn show(&mut self) -> Result<(), Error> {
        if self.dumb || !self.raw_active {
            return Ok(());
        }
        if self.in_completion {
            self.show_completion(Refresh::WRITE)
        } else {
            self.refresh_with(Refresh::WRITE, true)
        }
    }

    /// Home the cursor and erase the whole screen.
    pub fn clear_screen(&mut self) -> Result<(), Error> {
        self.io.write_all(CLEAR_SCREEN).map_err(Error::BadWrite)
    }

    // ── History surface ──────────────────────────────────────────────────

    /// Add a line to the history. Returns whether it was stored.
    pub fn history_add(&mut self, line: &str) -> bool {
        self.history.add(line)
    }

    /// Write the history to `path`, one line per entry.
    pub fn history_save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.history.save(path.as_ref()).map_err(Error::NoFile)
    }

    /// Append the lines stored in `path` to the history.
    pub fn history_load(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        self.history.load(path.as_ref()).map_err(Error::NoFile)
    }

    /// Bound the history to `max_len` entries, discarding the oldest.
    pub fn set_history_max_len(&mut self, max_len: usize) {
        self.history.set_max_len(max_len);
    }

    /// The stored history.
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    // ── Degraded modes ───────────────────────────────────────────────────

    /// Whole-line reads for input that is not a terminal: no prompt, no
    /// echo, no editing.
    fn feed_plain(&mut self) -> Result<Status, Error> {
        self.buf.clear();
        loop {
            match self.io.read_byte().map_err(Error::BadRead)? {
                None => {
                    return Ok(if self.buf.is_empty() {
                        Status::Ended
                    } else {
                        Status::Submitted
                    });
                }
                Some(b'\n') => return Ok(Status::Submitted),
                Some(byte) => {
                    self.buf.insert(byte);
                }
            }
        }
    }

    /// Pass-through editing for terminals that cannot render escapes:
    /// echo and append, recognizing only end-of-line, interrupt, and
    /// end-of-file bytes.
    fn feed_dumb(&mut self, byte: u8) -> Result<Status, Error> {
        match byte {
            b'\r' | b'\n' => {
                self.history.pop_live();
                Ok(Status::Submitted)
            }
            0x03 => Ok(Status::Interrupted),
            0x04 => {
                self.history.pop_live();
                Ok(Status::Ended)
            }
            byte => {
                if self.buf.insert(byte) {
                    self.io.write_all(&[byte]).map_err(Error::BadWrite)?;
                }
                Ok(Status::Editing)
            }
        }
    }

    // ── Keystroke handling ───────────────────────────────────────────────

    fn read_byte(&mut self) -> Result<u8, Error> {
        match self.io.read_byte().map_err(Error::BadRead)? {
            Some(byte) => Ok(byte),
            None => Err(Error::BadRead(io::ErrorKind::UnexpectedEof.into())),
        }
    }

    /// Run `op` and report that editing continues.
    fn editing(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<(), Error>,
    ) -> Result<Status, Error> {
        op(self)?;
        Ok(Status::Editing)
    }

    /// Apply a buffer operation, refreshing only when it changed anything.
    fn apply(&mut self, op: impl FnOnce(&mut LineBuffer) -> bool) -> Result<(), Error> {
        if op(&mut self.buf) {
            self.refresh_line()?;
        }
        Ok(())
    }

    fn submit(&mut self) -> Result<Status, Error> {
        self.history.pop_live();
        if self.mode.contains(Mode::MULTI_LINE) && self.buf.move_end() {
            self.refresh_line()?;
        }
        if self.hints.is_some() {
            // Redraw once without the hint so the committed line is left on
            // screen exactly as typed.
            self.refresh_with(Refresh::ALL, false)?;
        }
        Ok(Status::Submitted)
    }

    fn insert_byte(&mut self, byte: u8) -> Result<(), Error> {
        let was_at_end = self.buf.is_at_end();
        if !self.buf.insert(byte) {
            // The buffer could not grow; the keystroke is dropped whole.
            return Ok(());
        }
        let trivial = was_at_end
            && !self.mode.contains(Mode::MULTI_LINE)
            && self.hints.is_none()
            && self.prompt.len() + self.buf.len() < self.columns();
        if trivial {
            // Appending within one row needs no reflow, so a single byte
            // write suffices.
            let echo = if self.mode.contains(Mode::MASKED) {
                b'*'
            } else {
                byte
            };
            self.io.write_all(&[echo]).map_err(Error::BadWrite)
        } else {
            self.refresh_line()
        }
    }

    fn escape_dispatch(&mut self) -> Result<(), Error> {
        let mut decoder = EscapeDecoder::new();
        loop {
            let byte = self.read_byte()?;
            match decoder.feed(byte) {
                EscapeStep::More => {}
                EscapeStep::Done(None) => return Ok(()),
                EscapeStep::Done(Some(cmd)) => {
                    return match cmd {
                        EscapeCmd::HistoryPrev => self.history_step(HistoryStep::Prev),
                        EscapeCmd::HistoryNext => self.history_step(HistoryStep::Next),
                        EscapeCmd::MoveRight => self.apply(LineBuffer::move_right),
                        EscapeCmd::MoveLeft => self.apply(LineBuffer::move_left),
                        EscapeCmd::MoveHome => self.apply(LineBuffer::move_home),
                        EscapeCmd::MoveEnd => self.apply(LineBuffer::move_end),
                        EscapeCmd::DeleteForward => self.apply(LineBuffer::delete),
                    };
                }
            }
        }
    }

    /// Replace the buffer with the next or previous history entry.
    ///
    /// The entry being scrolled away from is first overwritten with the
    /// current buffer, so a half-typed line survives the round trip.
    /// Clamped steps at either end change nothing and do not redraw.
    fn history_step(&mut self, step: HistoryStep) -> Result<(), Error> {
        let len = self.history.len();
        if len < 2 {
            return Ok(());
        }
        let current = self.text().into_owned();
        self.history.replace(len - 1 - self.history_index, current);
        match step {
            HistoryStep::Prev => {
                if self.history_index + 1 >= len {
                    self.history_index = len - 1;
                    return Ok(());
                }
                self.history_index += 1;
            }
            HistoryStep::Next => {
                if self.history_index == 0 {
                    return Ok(());
                }
                self.history_index -= 1;
            }
        }
        if let Some(entry) = self.history.get(len - 1 - self.history_index) {
            self.buf.replace(entry.as_bytes());
        }
        self.refresh_line()
    }

    // ── Completion ───────────────────────────────────────────────────────

    /// Handle a byte while the completion engine is (or may become) active.
    ///
    /// Returns the byte when it should continue through normal dispatch,
    /// or `None` when completion consumed it.
    fn complete_line(&mut self, byte: u8) -> Result<Option<u8>, Error> {
        let candidates = self.query_candidates();
        if candidates.is_empty() {
            self.beep()?;
            self.in_completion = false;
            self.refresh_line()?;
            return Ok(None);
        }

        let mut handed_back = None;
        match byte {
            TAB => {
                if self.in_completion {
                    self.completion_idx = (self.completion_idx + 1) % (candidates.len() + 1);
                    if self.completion_idx == candidates.len() {
                        // The extra slot past the last candidate means "no
                        // selection".
                        self.beep()?;
                    }
                } else {
                    self.in_completion = true;
                    self.completion_idx = 0;
                }
            }
            ESC => {
                self.in_completion = false;
            }
            byte => {
                if let Some(candidate) = candidates.get(self.completion_idx) {
                    self.buf.replace(candidate.as_bytes());
                }
                self.in_completion = false;
                handed_back = Some(byte);
            }
        }

        match candidates.get(self.completion_idx) {
            Some(candidate) if self.in_completion => {
                self.refresh_candidate(candidate, Refresh::ALL)?;
            }
            _ => self.refresh_line()?,
        }
        Ok(handed_back)
    }

    fn query_candidates(&mut self) -> Completions {
        let mut candidates = Completions::new();
        if let Some(mut source) = self.completion.take() {
            source.complete(&self.text().into_owned(), &mut candidates);
            self.completion = Some(source);
        }
        candidates
    }

    fn show_completion(&mut self, flags: Refresh) -> Result<(), Error> {
        // The candidate list is rebuilt on every keystroke, so re-query.
        let candidates = self.query_candidates();
        match candidates.get(self.completion_idx) {
            Some(candidate) => self.refresh_candidate(candidate, flags),
            None => self.refresh_with(flags, true),
        }
    }

    fn beep(&mut self) -> Result<(), Error> {
        self.io.write_all(BELL).map_err(Error::BadWrite)
    }

    // ── Refresh plumbing ─────────────────────────────────────────────────

    fn refresh_line(&mut self) -> Result<(), Error> {
        self.refresh_with(Refresh::ALL, true)
    }

    fn refresh_with(&mut self, flags: Refresh, with_hint: bool) -> Result<(), Error> {
        let hint = if with_hint {
            let text = self.text().into_owned();
            self.query_hint(&text)
        } else {
            None
        };
        let view = View {
            prompt: &self.prompt,
            content: self.buf.as_bytes(),
            cursor: self.buf.cursor(),
            cols: self.cols.unwrap_or(crate::tty::DEFAULT_COLUMNS),
            masked: self.mode.contains(Mode::MASKED),
            hint: hint.as_ref(),
        };
        blit(
            &mut self.io,
            &mut self.refresh,
            &view,
            flags,
            self.mode.contains(Mode::MULTI_LINE),
        )
    }

    /// Refresh showing `candidate` in place of the buffer; the buffer
    /// itself is untouched.
    fn refresh_candidate(&mut self, candidate: &str, flags: Refresh) -> Result<(), Error> {
        let hint = self.query_hint(candidate);
        let view = View {
            prompt: &self.prompt,
            content: candidate.as_bytes(),
            cursor: candidate.len(),
            cols: self.cols.unwrap_or(crate::tty::DEFAULT_COLUMNS),
            masked: self.mode.contains(Mode::MASKED),
            hint: hint.as_ref(),
        };
        blit(
            &mut self.io,
            &mut self.refresh,
            &view,
            flags,
            self.mode.contains(Mode::MULTI_LINE),
        )
    }

    fn query_hint(&mut self, line: &str) -> Option<Hint> {
        let mut source = self.hints.take()?;
        let hint = source.hint(line);
        self.hints = Some(source);
        hint
    }

    fn columns(&self) -> usize {
        self.cols.unwrap_or(crate::tty::DEFAULT_COLUMNS)
    }
}

#[cfg(unix)]
impl Session<PosixTerm> {
    /// Convenience constructor over the process's stdin/stdout, classifying
    /// the terminal from `$TERM`.
    pub fn from_stdio(history_capacity: usize) -> io::Result<Self> {
        let io = PosixTerm::stdio()?;
        let term = std::env::var("TERM").ok();
        Ok(Self::new(io, term.as_deref(), history_capacity))
    }
}

impl<T: TermIo> Drop for Session<T> {
    fn drop(&mut self) {
        if self.raw_active {
            let _ = self.io.leave_raw_mode();
        }
    }
}

/// Render one frame and flush it as a single write.
fn blit<T: TermIo>(
    io: &mut T,
    state: &mut RefreshState,
    view: &View<'_>,
    flags: Refresh,
    multi_line: bool,
) -> Result<(), Error> {
    let mut out = Vec::new();
    if multi_line {
        render_multi(view, flags, state, &mut out);
    } else {
        render_single(view, flags, &mut out);
    }
    io.write_all(&out).map_err(Error::BadWrite)
}

fn is_unsupported_term(term: &str) -> bool {
    let term = term.to_ascii_lowercase();
    UNSUPPORTED_TERMS
        .iter()
        .any(|prefix| term.starts_with(prefix))
}
