#![forbid(unsafe_code)]

//! Template compiler.
//!
//! Single left-to-right pass over the template, no backtracking:
//!
//! | Source        | Result                                   |
//! |---------------|------------------------------------------|
//! | `\t \r \n \0` | control character                        |
//! | `\uXXXX`      | character from exactly four hex digits    |
//! | `{{` / `}}`   | literal `{` / `}`                         |
//! | `{name}`      | [`Opcode::Placeholder`]                   |
//! | anything else | literal text                              |
//!
//! In [`CompileMode::EscapesOnly`] braces are ordinary text.

use crate::definition::{Definition, Opcode, Opcodes};
use crate::digits::hex_value;
use crate::error::{CompileError, CompileErrorKind};
use crate::intern::PlaceholderId;

/// Placeholder names that argument binding reserves for itself.
pub const RESERVED_PLACEHOLDERS: &[&str] = &["this"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// Escapes and `{placeholder}` substitution.
    #[default]
    Template,
    /// Escapes only; braces are literal text.
    EscapesOnly,
}

/// Compile `text` into a [`Definition`] named `name`.
pub fn compile(name: &str, text: &str, mode: CompileMode) -> Result<Definition, CompileError> {
    Compiler::new(name, mode).run(text)
}

/// Reject definitions that use a [reserved](RESERVED_PLACEHOLDERS) name.
///
/// The compiler accepts any identifier; this is the policy layer for callers
/// that bind placeholders to fields.
pub fn check_reserved_placeholders(definition: &Definition) -> Result<(), CompileError> {
    let mut offset = 0;
    for op in definition.opcodes() {
        match op {
            Opcode::Literal(text) => offset += text.chars().count(),
            Opcode::Placeholder(id) => {
                if RESERVED_PLACEHOLDERS.contains(&id.as_str()) {
                    return Err(CompileError {
                        key: definition.name().to_owned(),
                        offset,
                        kind: CompileErrorKind::ReservedPlaceholder(id.to_string()),
                    });
                }
                offset += id.as_str().chars().count() + 2;
            }
        }
    }
    Ok(())
}

struct Compiler<'n> {
    name: &'n str,
    mode: CompileMode,
    opcodes: Opcodes,
    literal: String,
    /// Start offset and collected text of an open placeholder.
    placeholder: Option<(usize, String)>,
}

impl<'n> Compiler<'n> {
    fn new(name: &'n str, mode: CompileMode) -> Self {
        Self {
            name,
            mode,
            opcodes: Opcodes::new(),
            literal: String::new(),
            placeholder: None,
        }
    }

    fn error(&self, offset: usize, kind: CompileErrorKind) -> CompileError {
        CompileError {
            key: self.name.to_owned(),
            offset,
            kind,
        }
    }

    fn run(mut self, text: &str) -> Result<Definition, CompileError> {
        let braces = self.mode == CompileMode::Template;
        let mut chars = text.chars().enumerate().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '\\' if self.placeholder.is_none() => {
                    let Some((_, escape)) = chars.next() else {
                        return Err(self.error(offset, CompileErrorKind::DanglingEscape));
                    };
                    let decoded = match escape {
                        't' => '\t',
                        'r' => '\r',
                        'n' => '\n',
                        '0' => '\0',
                        'u' => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                let digit = chars
                                    .next_if(|&(_, c)| hex_value(c).is_some())
                                    .and_then(|(_, c)| hex_value(c));
                                let Some(digit) = digit else {
                                    return Err(
                                        self.error(offset, CompileErrorKind::InvalidUnicodeEscape)
                                    );
                                };
                                code = code * 16 + digit;
                            }
                            char::from_u32(code).ok_or_else(|| {
                                self.error(offset, CompileErrorKind::InvalidCodePoint(code))
                            })?
                        }
                        other => {
                            return Err(self.error(offset, CompileErrorKind::UnsupportedEscape(other)));
                        }
                    };
                    self.literal.push(decoded);
                }
                '{' if braces => {
                    if self.placeholder.is_some() {
                        return Err(self.error(offset, CompileErrorKind::NestedPlaceholder));
                    }
                    if chars.next_if(|&(_, c)| c == '{').is_some() {
                        self.literal.push('{');
                    } else {
                        self.placeholder = Some((offset, String::new()));
                    }
                }
                '}' if braces => {
                    let doubled = chars.next_if(|&(_, c)| c == '}').is_some();
                    match self.placeholder.take() {
                        Some(_) if doubled => {
                            return Err(
                                self.error(offset, CompileErrorKind::EscapedCloseInPlaceholder)
                            );
                        }
                        Some((start, ident)) => {
                            if ident.is_empty() {
                                return Err(self.error(start, CompileErrorKind::EmptyPlaceholder));
                            }
                            self.flush_literal();
                            self.opcodes
                                .push(Opcode::Placeholder(PlaceholderId::intern(&ident)));
                        }
                        None if doubled => self.literal.push('}'),
                        None => return Err(self.error(offset, CompileErrorKind::UnmatchedClose)),
                    }
                }
                _ => match &mut self.placeholder {
                    Some((_, ident)) => ident.push(ch),
                    None => self.literal.push(ch),
                },
            }
        }

        if let Some((start, _)) = self.placeholder {
            return Err(self.error(start, CompileErrorKind::UnterminatedPlaceholder));
        }
        self.flush_literal();
        Ok(Definition::from_opcodes(self.name, self.opcodes))
    }

    /// Move the pending literal run into the opcode list, merging with a
    /// preceding literal so no two literals are ever adjacent.
    fn flush_literal(&mut self) {
        if self.literal.is_empty() {
            return;
        }
        let run = std::mem::take(&mut self.literal);
        match self.opcodes.last_mut() {
            Some(Opcode::Literal(prev)) => {
                let mut merged = String::with_capacity(prev.len() + run.len());
                merged.push_str(prev);
                merged.push_str(&run);
                *prev = merged.into_boxed_str();
            }
            _ => self.opcodes.push(Opcode::Literal(run.into_boxed_str())),
        }
    }
}
