use thiserror::Error;

/// What went wrong while parsing.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("Found unmatched bracket")]
    UnmatchedBracket,
    #[error("Missing parameter/empty input")]
    MissingParameter,
    /// Not an operator split, a function, a known variable or a number.
    /// Also covers a number followed by trailing content, e.g. `15 23.7`.
    #[error("Found invalid parameter, parameter must be a single number/existing variable name")]
    InvalidParameter,
    #[error("Parameter value too large")]
    ValueTooLarge,
}

/// A parse failure located in the original input.
///
/// `offset` counts characters from the start of the string handed to
/// [`Expression::parse`](crate::Expression::parse), regardless of how deep in
/// the recursion the failure happened.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("{kind} (at offset {offset})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// 1-based position, for messages shown to a user.
    pub fn column(&self) -> usize {
        self.offset + 1
    }

    /// Formats the input with a caret under the faulting character, followed
    /// by the message.
    ///
    /// ```text
    /// 2 + 15 23.7
    ///     ^
    /// Found invalid parameter, parameter must be a single number/existing variable name
    /// ```
    pub fn render(&self, input: &str) -> String {
        format!(
            "{input}\n{:>width$}\n{}",
            '^',
            self.kind,
            width = self.column()
        )
    }
}
