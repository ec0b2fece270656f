#![forbid(unsafe_code)]

//! Capability traits the host plugs in: tab completion and inline hints.
//!
//! Both are queried with the current buffer text on each relevant keystroke
//! and produce short-lived values; nothing here is cached across
//! keystrokes.

/// An ordered list of completion candidates for one completion interaction.
#[derive(Debug, Default)]
pub struct Completions {
    items: Vec<String>,
}

impl Completions {
    /// Create an empty candidate list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate.
    pub fn add(&mut self, candidate: impl Into<String>) {
        self.items.push(candidate.into());
    }

    /// Number of candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no candidates were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The candidate at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(String::as_str)
    }

    /// Iterate candidates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }
}

/// Produces completion candidates for the current input.
///
/// Closures of the matching shape implement this trait, so simple hosts can
/// register completions without defining a type:
///
/// ```
/// use rawline_core::{Completions, CompletionSource};
///
/// let mut source = |line: &str, out: &mut Completions| {
///     if "help".starts_with(line) {
///         out.add("help");
///     }
/// };
/// let mut out = Completions::new();
/// source.complete("he", &mut out);
/// assert_eq!(out.len(), 1);
/// ```
pub trait CompletionSource {
    /// Add candidates applicable to `line` to `out`.
    fn complete(&mut self, line: &str, out: &mut Completions);
}

impl<F> CompletionSource for F
where
    F: FnMut(&str, &mut Completions),
{
    fn complete(&mut self, line: &str, out: &mut Completions) {
        self(line, out);
    }
}

/// A hint shown to the right of the input, dimmed or colored by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    /// Hint text, truncated by the renderer to the remaining width.
    pub text: String,
    /// ANSI color code, e.g. `35` for magenta.
    pub color: Option<u8>,
    /// Render the hint bold.
    pub bold: bool,
}

impl Hint {
    /// A plain hint with no styling.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            bold: false,
        }
    }
}

/// Produces an optional hint for the current input. Implemented for
/// closures, like [`CompletionSource`].
pub trait HintSource {
    /// The hint to display after `line`, if any.
    fn hint(&mut self, line: &str) -> Option<Hint>;
}

impl<F> HintSource for F
where
    F: FnMut(&str) -> Option<Hint>,
{
    fn hint(&mut self, line: &str) -> Option<Hint> {
        self(line)
    }
}
