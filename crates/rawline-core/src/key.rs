#![forbid(unsafe_code)]

//! Keystroke model: the control-byte dispatch table and the escape-sequence
//! decoder.
//!
//! The dispatch table is a closed enum rather than a function-pointer array,
//! so the operation set is auditable and matched exhaustively. Bytes with no
//! dedicated operation are inserted literally, as the terminals this library
//! targets have always done.
//!
//! The decoder is an incremental state machine fed one byte at a time; the
//! caller owns the blocking reads. Only the three-byte families
//! `ESC [ <letter>`, `ESC [ <digit> ~`, and `ESC O <letter>` are recognized;
//! everything else is consumed and ignored.

/// Escape introducer.
pub const ESC: u8 = 0x1B;

/// The completion trigger byte.
pub const TAB: u8 = 0x09;

/// Terminal bell, used for completion feedback.
pub const BELL: &[u8] = b"\x07";

/// One logical edit operation, decoded from a single input byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Ctrl-A.
    MoveHome,
    /// Ctrl-B.
    MoveLeft,
    /// Ctrl-C.
    Interrupt,
    /// Ctrl-D: forward delete, or end-of-file on an empty buffer.
    DeleteOrEof,
    /// Ctrl-E.
    MoveEnd,
    /// Ctrl-F.
    MoveRight,
    /// Ctrl-H or DEL.
    Backspace,
    /// Enter or Ctrl-J.
    Commit,
    /// Ctrl-K: delete from the cursor to the end of the line.
    KillToEnd,
    /// Ctrl-L: clear the screen and redraw.
    ClearScreen,
    /// Ctrl-N.
    HistoryNext,
    /// Ctrl-P.
    HistoryPrev,
    /// Ctrl-T: swap the byte under the cursor with the previous one.
    Transpose,
    /// Ctrl-U: delete from the start of the line to the cursor.
    KillToStart,
    /// Ctrl-W.
    DeletePrevWord,
    /// ESC: an escape sequence follows.
    Escape,
    /// Anything else is inserted into the buffer as-is.
    Insert(u8),
}

impl KeyAction {
    /// Map an input byte to its edit operation.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Self::MoveHome,
            0x02 => Self::MoveLeft,
            0x03 => Self::Interrupt,
            0x04 => Self::DeleteOrEof,
            0x05 => Self::MoveEnd,
            0x06 => Self::MoveRight,
            0x08 | 0x7F => Self::Backspace,
            0x0A | 0x0D => Self::Commit,
            0x0B => Self::KillToEnd,
            0x0C => Self::ClearScreen,
            0x0E => Self::HistoryNext,
            0x10 => Self::HistoryPrev,
            0x14 => Self::Transpose,
            0x15 => Self::KillToStart,
            0x17 => Self::DeletePrevWord,
            ESC => Self::Escape,
            other => Self::Insert(other),
        }
    }
}

/// A command decoded from a complete escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeCmd {
    HistoryPrev,
    HistoryNext,
    MoveRight,
    MoveLeft,
    MoveHome,
    MoveEnd,
    DeleteForward,
}

/// Result of feeding one byte to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeStep {
    /// The sequence is incomplete; feed the next byte.
    More,
    /// The sequence is complete. `None` means it was consumed but maps to
    /// no operation.
    Done(Option<EscapeCmd>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DecoderState {
    /// Expecting the byte after ESC.
    #[default]
    Intro,
    /// After `ESC [`.
    Csi,
    /// After `ESC [ <digit>`, expecting the terminator.
    CsiDigit(u8),
    /// After `ESC O`.
    Ss3,
    /// The introducer was unrecognized; one more byte is consumed inert.
    SkipOne,
}

/// Decoder for the escape sequences that follow an ESC byte.
///
/// Create one per ESC and feed it bytes until it reports
/// [`EscapeStep::Done`]. Sequences always consume at least two bytes after
/// the ESC, matching what the terminals emit.
#[derive(Debug, Default)]
pub struct EscapeDecoder {
    state: DecoderState,
}

impl EscapeDecoder {
    /// Create a decoder positioned just after an ESC byte.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one byte and report whether the sequence completed.
    pub fn feed(&mut self, byte: u8) -> EscapeStep {
        match self.state {
            DecoderState::Intro => match byte {
                b'[' => {
                    self.state = DecoderState::Csi;
                    EscapeStep::More
                }
                b'O' => {
                    self.state = DecoderState::Ss3;
                    EscapeStep::More
                }
                _ => {
                    self.state = DecoderState::SkipOne;
                    EscapeStep::More
                }
            },
            DecoderState::Csi => match byte {
                b'0'..=b'9' => {
                    self.state = DecoderState::CsiDigit(byte);
                    EscapeStep::More
                }
                b'A' => EscapeStep::Done(Some(EscapeCmd::HistoryPrev)),
                b'B' => EscapeStep::Done(Some(EscapeCmd::HistoryNext)),
                b'C' => EscapeStep::Done(Some(EscapeCmd::MoveRight)),
                b'D' => EscapeStep::Done(Some(EscapeCmd::MoveLeft)),
                b'H' => EscapeStep::Done(Some(EscapeCmd::MoveHome)),
                b'F' => EscapeStep::Done(Some(EscapeCmd::MoveEnd)),
                _ => EscapeStep::Done(None),
            },
            DecoderState::CsiDigit(digit) => {
                if byte == b'~' && digit == b'3' {
                    EscapeStep::Done(Some(EscapeCmd::DeleteForward))
                } else {
                    EscapeStep::Done(None)
                }
            }
            DecoderState::Ss3 => match byte {
                b'H' => EscapeStep::Done(Some(EscapeCmd::MoveHome)),
                b'F' => EscapeStep::Done(Some(EscapeCmd::MoveEnd)),
                _ => EscapeStep::Done(None),
            },
            DecoderState::SkipOne => EscapeStep::Done(None),
        }
    }
}
