#![forbid(unsafe_code)]

//! Core editing state for rawline: the line buffer, the history store, and
//! the keystroke model.
//!
//! Nothing in this crate touches a terminal. These types hold the state a
//! line-editing session mutates; the `rawline` crate wires them to terminal
//! I/O and rendering.

pub mod completion;
pub mod history;
pub mod key;
pub mod line_buffer;

pub use completion::{CompletionSource, Completions, Hint, HintSource};
pub use history::History;
pub use key::{EscapeCmd, EscapeDecoder, EscapeStep, KeyAction};
pub use line_buffer::LineBuffer;
