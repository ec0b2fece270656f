#![forbid(unsafe_code)]

//! Terminal I/O capability: the [`TermIo`] trait and its POSIX
//! implementation.
//!
//! The trait is the library's only boundary to the outside world. Everything
//! the editing engine needs from a terminal is a blocking one-byte read, a
//! write, the window width, and raw-mode entry/exit; tests drive the engine
//! with a scripted implementation and assert on the exact bytes written.
//!
//! Raw mode applies the classic termios deltas (no echo, no canonical
//! input, no signal characters, no output post-processing, 8-bit
//! characters, 1-byte blocking reads) and restores the saved snapshot
//! byte-for-byte on leave.

use std::io;

#[cfg(unix)]
use std::fs::File;
#[cfg(unix)]
use std::io::{Read, Write};
#[cfg(unix)]
use std::os::fd::{AsFd, OwnedFd};

#[cfg(unix)]
use nix::sys::termios::{
    self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, SpecialCharacterIndices,
    Termios,
};

/// Width assumed when neither the kernel nor the terminal reports one.
pub(crate) const DEFAULT_COLUMNS: usize = 80;

// ── Capability trait ─────────────────────────────────────────────────────

/// Byte-level terminal I/O, injectable for testing.
///
/// All reads block until at least one byte is available; `Ok(None)` means
/// end of input. Implementations are expected to be plain wrappers around
/// file descriptors (or an in-memory script in tests) and must not buffer
/// writes: each [`TermIo::write_all`] is one refresh batch.
pub trait TermIo {
    /// Whether the input side is an interactive terminal.
    fn is_tty(&self) -> bool;

    /// Read one byte, blocking. `Ok(None)` signals end of input.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write a full batch of bytes.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// The window width in columns, if the platform can report it.
    fn window_columns(&self) -> Option<u16>;

    /// Switch the terminal to raw mode, saving the prior state. A no-op
    /// success when the input is not a terminal.
    fn enter_raw_mode(&mut self) -> io::Result<()>;

    /// Restore the state saved by [`TermIo::enter_raw_mode`]. Idempotent.
    fn leave_raw_mode(&mut self) -> io::Result<()>;
}

// ── Column measurement ───────────────────────────────────────────────────

/// Measure the terminal width.
///
/// Prefers the kernel's window size; falls back to probing the terminal by
/// parking the cursor at the right margin and asking it to report the
/// position, and finally to [`DEFAULT_COLUMNS`] on any failure. The probe
/// enters raw mode only if the caller has not already done so, and restores
/// the prior mode on every exit path.
pub(crate) fn measure_columns<T: TermIo>(io: &mut T, raw_active: bool) -> usize {
    if let Some(cols) = io.window_columns() {
        return usize::from(cols);
    }
    let mut temp = TempRaw::enter(io, raw_active);
    probe_columns(temp.io()).unwrap_or(DEFAULT_COLUMNS)
}

/// Scoped raw-mode acquisition for the width probe.
struct TempRaw<'a, T: TermIo> {
    io: &'a mut T,
    entered: bool,
}

impl<'a, T: TermIo> TempRaw<'a, T> {
    fn enter(io: &'a mut T, raw_active: bool) -> Self {
        let entered = !raw_active && io.enter_raw_mode().is_ok();
        Self { io, entered }
    }

    fn io(&mut self) -> &mut T {
        self.io
    }
}

impl<T: TermIo> Drop for TempRaw<'_, T> {
    fn drop(&mut self) {
        if self.entered {
            let _ = self.io.leave_raw_mode();
        }
    }
}

fn probe_columns<T: TermIo>(io: &mut T) -> Option<usize> {
    // Park the cursor at the right margin (the terminal clamps the move),
    // ask for a position report, and return to the start of the line.
    io.write_all(b"\x1b[999C\x1b[6n").ok()?;
    let cols = read_cursor_report(io)?;
    io.write_all(b"\r").ok()?;
    (cols > 0).then_some(cols)
}

/// Read and parse the `ESC [ <row> ; <col> R` cursor-position reply.
fn read_cursor_report<T: TermIo>(io: &mut T) -> Option<usize> {
    let mut reply = Vec::with_capacity(16);
    while reply.len() < 31 {
        match io.read_byte() {
            Ok(Some(b'R')) => break,
            Ok(Some(byte)) => reply.push(byte),
            _ => break,
        }
    }
    let params = reply.strip_prefix(b"\x1b[")?;
    let text = std::str::from_utf8(params).ok()?;
    let (_row, col) = text.split_once(';')?;
    col.parse().ok()
}

// ── POSIX implementation ─────────────────────────────────────────────────

/// [`TermIo`] over a pair of file descriptors, usually stdin and stdout.
#[cfg(unix)]
#[derive(Debug)]
pub struct PosixTerm {
    input: File,
    output: File,
    saved: Option<Termios>,
}

#[cfg(unix)]
impl PosixTerm {
    /// Wrap owned input and output descriptors.
    #[must_use]
    pub fn from_fds(input: OwnedFd, output: OwnedFd) -> Self {
        Self {
            input: File::from(input),
            output: File::from(output),
            saved: None,
        }
    }

    /// Duplicate the process's stdin and stdout.
    pub fn stdio() -> io::Result<Self> {
        let input = io::stdin().as_fd().try_clone_to_owned()?;
        let output = io::stdout().as_fd().try_clone_to_owned()?;
        Ok(Self::from_fds(input, output))
    }
}

#[cfg(unix)]
impl TermIo for PosixTerm {
    fn is_tty(&self) -> bool {
        rustix::termios::isatty(&self.input)
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.write_all(bytes)
    }

    fn window_columns(&self) -> Option<u16> {
        rustix::termios::tcgetwinsize(&self.output)
            .ok()
            .map(|ws| ws.ws_col)
            .filter(|&cols| cols > 0)
    }

    fn enter_raw_mode(&mut self) -> io::Result<()> {
        if !self.is_tty() {
            return Ok(());
        }

        let original = termios::tcgetattr(&self.input).map_err(io::Error::from)?;
        let mut raw = original.clone();
        raw.input_flags.remove(
            InputFlags::BRKINT
                | InputFlags::ICRNL
                | InputFlags::INPCK
                | InputFlags::ISTRIP
                | InputFlags::IXON,
        );
        raw.output_flags.remove(OutputFlags::OPOST);
        raw.control_flags.insert(ControlFlags::CS8);
        raw.local_flags.remove(
            LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG,
        );
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        termios::tcsetattr(&self.input, SetArg::TCSAFLUSH, &raw).map_err(io::Error::from)?;
        if self.saved.is_none() {
            self.saved = Some(original);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("terminal raw mode enabled");
        Ok(())
    }

    fn leave_raw_mode(&mut self) -> io::Result<()> {
        if let Some(original) = &self.saved {
            termios::tcsetattr(&self.input, SetArg::TCSAFLUSH, original)
                .map_err(io::Error::from)?;
            self.saved = None;
            #[cfg(feature = "tracing")]
            tracing::debug!("terminal raw mode disabled");
        }
        Ok(())
    }
}

#[cfg(unix)]
impl Drop for PosixTerm {
    fn drop(&mut self) {
        // Best-effort restore; there is no recovery action at this point.
        let _ = self.leave_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptIo {
        input: VecDeque<u8>,
        output: Vec<u8>,
        window: Option<u16>,
        raw: bool,
        raw_transitions: Vec<bool>,
    }

    impl ScriptIo {
        fn new(input: &[u8], window: Option<u16>) -> Self {
            Self {
                input: input.iter().copied().collect(),
                output: Vec::new(),
                window,
                raw: false,
                raw_transitions: Vec::new(),
            }
        }
    }

    impl TermIo for ScriptIo {
        fn is_tty(&self) -> bool {
            true
        }

        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            Ok(self.input.pop_front())
        }

        fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.output.extend_from_slice(bytes);
            Ok(())
        }

        fn window_columns(&self) -> Option<u16> {
            self.window
        }

        fn enter_raw_mode(&mut self) -> io::Result<()> {
            self.raw = true;
            self.raw_transitions.push(true);
            Ok(())
        }

        fn leave_raw_mode(&mut self) -> io::Result<()> {
            self.raw = false;
            self.raw_transitions.push(false);
            Ok(())
        }
    }

    #[test]
    fn window_size_wins_when_available() {
        let mut io = ScriptIo::new(b"", Some(120));
        assert_eq!(measure_columns(&mut io, true), 120);
        assert!(io.output.is_empty(), "no probe bytes should be written");
    }

    #[test]
    fn probe_parses_cursor_report() {
        let mut io = ScriptIo::new(b"\x1b[24;92R", None);
        assert_eq!(measure_columns(&mut io, true), 92);
        assert_eq!(&io.output, b"\x1b[999C\x1b[6n\r");
    }

    #[test]
    fn probe_defaults_on_garbage_reply() {
        let mut io = ScriptIo::new(b"nonsense", None);
        assert_eq!(measure_columns(&mut io, true), DEFAULT_COLUMNS);
    }

    #[test]
    fn probe_defaults_on_eof() {
        let mut io = ScriptIo::new(b"", None);
        assert_eq!(measure_columns(&mut io, true), DEFAULT_COLUMNS);
    }

    #[test]
    fn probe_restores_raw_mode_it_entered() {
        let mut io = ScriptIo::new(b"\x1b[1;80R", None);
        assert_eq!(measure_columns(&mut io, false), 80);
        assert_eq!(io.raw_transitions, [true, false]);
        assert!(!io.raw);
    }

    #[test]
    fn probe_leaves_existing_raw_mode_alone() {
        let mut io = ScriptIo::new(b"\x1b[1;80R", None);
        io.raw = true;
        io.raw_transitions.clear();
        measure_columns(&mut io, true);
        assert!(io.raw_transitions.is_empty());
    }
}
