#![forbid(unsafe_code)]

//! Low-allocation output accumulation.
//!
//! An [`OutputBuilder`] moves through four states:
//!
//! ```text
//!   Empty ──append one string──▶ Prefix ──any further append──▶ Buffered
//!     │                            │                               │
//!     └────────────── seal ────────┴──────────── seal ─────────────┴──▶ Sealed
//! ```
//!
//! The `Prefix` state keeps a single appended string as-is, so templates
//! that render to one piece of text never touch a buffer. `Buffered` borrows
//! a [`ScratchBuffer`] from the thread-local pool; the prefix (if any) is
//! copied into it first.
//!
//! # Failure modes
//!
//! - Appending after [`seal`](OutputBuilder::seal) panics with
//!   "output builder already built"; sealing twice returns
//!   [`BuilderError::AlreadyBuilt`].
//! - The scratch buffer goes back to the pool when the builder is sealed or
//!   dropped, whichever happens first.

use std::borrow::Cow;
use std::fmt::{self, Write as _};

use crate::digits::{DigitBuffer, integral_value};
use crate::error::{BuilderError, RenderError};
use crate::render::{DefinitionSource, Template, render};
use crate::scratch::ScratchBuffer;

/// Observable state of an [`OutputBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Empty,
    Prefix,
    Buffered,
    Sealed,
}

enum State<'a> {
    Empty,
    Prefix(Cow<'a, str>),
    Buffered(ScratchBuffer),
    Sealed,
}

/// How non-integral numbers are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal_separator: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
        }
    }
}

impl NumberFormat {
    /// Format used by locales that write `3,5`.
    pub const DECIMAL_COMMA: Self = Self {
        decimal_separator: ',',
    };

    /// Pick a format from a locale tag such as `de-DE` or `en_US`.
    #[must_use]
    pub fn for_locale(locale: &str) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "de" | "fr" | "es" | "it" | "pt" | "ru" | "pl" | "nl" | "sv" | "da" | "fi"
            | "nb" | "cs" | "tr" | "uk" => Self::DECIMAL_COMMA,
            _ => Self::default(),
        }
    }
}

/// A constant with a precomputed display name, typically a fieldless enum
/// implemented with a `match`.
pub trait NamedConstant {
    fn constant_name(&self) -> &'static str;
}

/// Wrapper that routes a [`NamedConstant`] through [`Emit`].
#[derive(Debug, Clone, Copy)]
pub struct Named<T>(pub T);

/// Accumulates rendered text.
pub struct OutputBuilder<'a> {
    state: State<'a>,
    number_format: NumberFormat,
    source: Option<&'a dyn DefinitionSource>,
}

impl Default for OutputBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> OutputBuilder<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Empty,
            number_format: NumberFormat::default(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = format;
        self
    }

    /// Table consulted by [`append_template`](Self::append_template).
    #[must_use]
    pub fn with_source(mut self, source: &'a dyn DefinitionSource) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn number_format(&self) -> NumberFormat {
        self.number_format
    }

    #[must_use]
    pub fn state(&self) -> BuilderState {
        match self.state {
            State::Empty => BuilderState::Empty,
            State::Prefix(_) => BuilderState::Prefix,
            State::Buffered(_) => BuilderState::Buffered,
            State::Sealed => BuilderState::Sealed,
        }
    }

    #[must_use]
    pub fn is_sealed(&self) -> bool {
        matches!(self.state, State::Sealed)
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match &self.state {
            State::Prefix(text) => &**text,
            State::Buffered(buf) => buf.as_str(),
            State::Empty | State::Sealed => "",
        }
    }

    fn buffer(&mut self) -> &mut String {
        match self.state {
            State::Sealed => panic!("{}", BuilderError::AlreadyBuilt),
            State::Buffered(_) => {}
            State::Empty | State::Prefix(_) => self.promote(),
        }
        match &mut self.state {
            State::Buffered(buf) => &mut **buf,
            _ => unreachable!("promote leaves the builder buffered"),
        }
    }

    fn promote(&mut self) {
        let mut scratch = ScratchBuffer::checkout();
        if let State::Prefix(prefix) = std::mem::replace(&mut self.state, State::Empty) {
            scratch.push_str(&prefix);
        }
        self.state = State::Buffered(scratch);
    }

    fn append_cow(&mut self, text: Cow<'a, str>) {
        match self.state {
            State::Empty => self.state = State::Prefix(text),
            _ => self.buffer().push_str(&text),
        }
    }

    pub fn append_char(&mut self, ch: char) {
        self.buffer().push(ch);
    }

    /// Append borrowed text; a lone append is kept without copying.
    pub fn append_str(&mut self, text: &'a str) {
        self.append_cow(Cow::Borrowed(text));
    }

    /// Append owned text; a lone append is kept without copying.
    pub fn append_string(&mut self, text: String) {
        self.append_cow(Cow::Owned(text));
    }

    /// Copy text of any lifetime into the buffer.
    pub fn append_copied(&mut self, text: &str) {
        self.buffer().push_str(text);
    }

    /// Copy another builder's accumulated text.
    pub fn append_builder(&mut self, other: &OutputBuilder<'_>) {
        assert!(!other.is_sealed(), "{}", BuilderError::AlreadyBuilt);
        let text = other.as_str();
        if !text.is_empty() {
            self.buffer().push_str(text);
        }
    }

    pub fn append_u64(&mut self, value: u64) {
        let mut digits = DigitBuffer::new();
        let text = digits.format_u64(value);
        self.buffer().push_str(text);
    }

    pub fn append_i64(&mut self, value: i64) {
        let mut digits = DigitBuffer::new();
        let text = digits.format_i64(value);
        self.buffer().push_str(text);
    }

    pub fn append_u32(&mut self, value: u32) {
        self.append_u64(u64::from(value));
    }

    pub fn append_i32(&mut self, value: i32) {
        self.append_i64(i64::from(value));
    }

    /// Integral values use the digit path; others are formatted with the
    /// builder's [`NumberFormat`].
    pub fn append_f64(&mut self, value: f64) {
        match integral_value(value) {
            Some(integral) => self.append_i64(integral),
            None => self.push_fraction(value),
        }
    }

    pub fn append_f32(&mut self, value: f32) {
        match integral_value(f64::from(value)) {
            Some(integral) => self.append_i64(integral),
            // Formatted at f32 precision so 0.1f32 prints as "0.1".
            None => self.push_fraction(value),
        }
    }

    fn push_fraction(&mut self, value: impl fmt::Display) {
        let separator = self.number_format.decimal_separator;
        let buf = self.buffer();
        let start = buf.len();
        let _ = write!(buf, "{value}");
        if separator == '.' {
            return;
        }
        if let Some(dot) = buf[start..].find('.') {
            let at = start + dot;
            let mut sep = [0u8; 4];
            buf.replace_range(at..at + 1, separator.encode_utf8(&mut sep));
        }
    }

    pub fn append_named<T: NamedConstant + ?Sized>(&mut self, value: &T) {
        self.append_str(value.constant_name());
    }

    /// Append anything implementing `Display`; always buffered.
    pub fn append_display<T: fmt::Display + ?Sized>(&mut self, value: &T) {
        let _ = write!(self.buffer(), "{value}");
    }

    pub fn append<T: Emit<'a>>(&mut self, value: T) {
        value.emit(self);
    }

    /// Render a nested template through the configured source table.
    pub fn append_template<T: Template + ?Sized>(&mut self, value: &T) -> Result<(), RenderError> {
        let key = value.table_key();
        let Some(source) = self.source else {
            return Err(RenderError::NoDefinitionSource {
                key: key.to_owned(),
            });
        };
        let definition = source.definition(key, true)?;
        let mut nested = OutputBuilder::new()
            .with_number_format(self.number_format)
            .with_source(source);
        render(&definition, value, &mut nested)?;
        self.append_builder(&nested);
        Ok(())
    }

    /// Finish building and return the text.
    ///
    /// Returns [`BuilderError::AlreadyBuilt`] if the builder was already
    /// sealed. Any scratch buffer goes back to the pool here.
    pub fn seal(&mut self) -> Result<Cow<'a, str>, BuilderError> {
        match std::mem::replace(&mut self.state, State::Sealed) {
            State::Empty => Ok(Cow::Borrowed("")),
            State::Prefix(text) => Ok(text),
            State::Buffered(buf) => Ok(Cow::Owned(buf.as_str().to_owned())),
            State::Sealed => Err(BuilderError::AlreadyBuilt),
        }
    }

    /// Consume the builder and return its text.
    #[must_use]
    pub fn finish(mut self) -> Cow<'a, str> {
        self.seal().unwrap_or_default()
    }
}

impl fmt::Write for OutputBuilder<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_copied(s);
        Ok(())
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        self.append_char(c);
        Ok(())
    }
}

impl fmt::Debug for OutputBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputBuilder")
            .field("state", &self.state())
            .field("len", &self.as_str().len())
            .finish()
    }
}

/// Values that know how to append themselves to an [`OutputBuilder`].
///
/// Resolvers use this through [`OutputBuilder::append`] so each field type
/// picks its allocation-free path.
pub trait Emit<'a> {
    fn emit(self, out: &mut OutputBuilder<'a>);
}

impl<'a> Emit<'a> for &'a str {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_str(self);
    }
}

impl<'a> Emit<'a> for &'a String {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_str(self);
    }
}

impl<'a> Emit<'a> for String {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_string(self);
    }
}

impl<'a> Emit<'a> for Cow<'a, str> {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_cow(self);
    }
}

impl<'a> Emit<'a> for char {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_char(self);
    }
}

impl<'a> Emit<'a> for bool {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_str(if self { "true" } else { "false" });
    }
}

macro_rules! emit_via {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl<'a> Emit<'a> for $ty {
                fn emit(self, out: &mut OutputBuilder<'a>) {
                    out.$method(self);
                }
            }
        )*
    };
}

emit_via! {
    u32 => append_u32,
    u64 => append_u64,
    i32 => append_i32,
    i64 => append_i64,
    f32 => append_f32,
    f64 => append_f64,
}

impl<'a> Emit<'a> for usize {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_u64(self as u64);
    }
}

impl<'a> Emit<'a> for isize {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_i64(self as i64);
    }
}

impl<'a, T: Emit<'a>> Emit<'a> for Option<T> {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        match self {
            Some(value) => value.emit(out),
            None => out.append_str("null"),
        }
    }
}

impl<'a, T: NamedConstant> Emit<'a> for Named<T> {
    fn emit(self, out: &mut OutputBuilder<'a>) {
        out.append_str(self.0.constant_name());
    }
}
