#![forbid(unsafe_code)]

//! Readline-style line editing over a minimal VT100 subset.
//!
//! rawline turns a raw byte stream from a terminal into a single logical
//! input line, rendering the in-progress edit (prompt, cursor, wrapped
//! rows) back to the same terminal. It supports cursor movement, kill
//! operations, history recall with persistence, tab completion, inline
//! hints, masked input, and both single-line (horizontal scroll) and
//! multi-line (wrapped) rendering.
//!
//! # Blocking usage
//!
//! ```no_run
//! use rawline::{Session, Status};
//!
//! let mut session = Session::from_stdio(100)?;
//! while let Status::Submitted = session.read_line("> ")? {
//!     let line = session.text().into_owned();
//!     println!("got: {line}");
//!     session.history_add(&line);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Event-loop usage
//!
//! Hosts with their own event loop call [`Session::edit_start`] once, then
//! [`Session::edit_feed`] whenever the input descriptor is readable, and
//! [`Session::edit_stop`] when feed reports anything other than
//! [`Status::Editing`]. Asynchronous output goes between [`Session::hide`]
//! and [`Session::show`] so it never tears the edit line.
//!
//! # Limitations
//!
//! Width accounting assumes one byte per display column; multi-byte and
//! wide characters are not measured. Unix-first; Windows deferred.

use std::fmt;
use std::io;

mod render;
mod session;
mod tty;

pub use rawline_core::{CompletionSource, Completions, Hint, HintSource, History};
pub use session::{Mode, Session, Status};
#[cfg(unix)]
pub use tty::PosixTerm;
pub use tty::TermIo;

// --- Errors ---------------------------------------------------------------

/// Failures surfaced by a line-editing session.
///
/// Interrupt and end-of-input are not errors; they are [`Status`] variants.
#[derive(Debug)]
pub enum Error {
    /// Reading terminal input failed.
    BadRead(io::Error),
    /// Writing terminal output failed.
    BadWrite(io::Error),
    /// Raw mode could not be queried or applied.
    BadTerminal(io::Error),
    /// The history file could not be opened.
    NoFile(io::Error),
    /// An allocation failed while growing a buffer.
    NoMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRead(err) => write!(f, "error reading terminal input: {err}"),
            Self::BadWrite(err) => write!(f, "error writing terminal output: {err}"),
            Self::BadTerminal(err) => write!(f, "error configuring terminal: {err}"),
            Self::NoFile(err) => write!(f, "error opening history file: {err}"),
            Self::NoMemory => write!(f, "allocation failed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BadRead(err) | Self::BadWrite(err) | Self::BadTerminal(err)
            | Self::NoFile(err) => Some(err),
            Self::NoMemory => None,
        }
    }
}

/// Standard result type for rawline APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        CompletionSource, Completions, Error, Hint, HintSource, Mode, Result, Session, Status,
        TermIo,
    };
}
