#![forbid(unsafe_code)]

//! Compiled templates.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::builder::OutputBuilder;
use crate::error::RenderError;
use crate::intern::PlaceholderId;
use crate::render::{Resolver, render};

/// One step of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opcode {
    /// Text copied verbatim.
    Literal(Box<str>),
    /// A value supplied by the resolver.
    Placeholder(PlaceholderId),
}

pub(crate) type Opcodes = SmallVec<[Opcode; 4]>;

/// An immutable compiled template.
///
/// Invariant: `opcodes` never holds two adjacent [`Opcode::Literal`]s.
#[derive(Clone, PartialEq, Eq)]
pub struct Definition {
    name: Arc<str>,
    opcodes: Opcodes,
    is_missing: bool,
}

impl Definition {
    pub(crate) fn from_opcodes(name: &str, opcodes: Opcodes) -> Self {
        debug_assert!(
            !opcodes
                .windows(2)
                .any(|w| matches!(w, [Opcode::Literal(_), Opcode::Literal(_)])),
            "adjacent literal opcodes in `{name}`"
        );
        Self {
            name: Arc::from(name),
            opcodes,
            is_missing: false,
        }
    }

    /// Wrap `text` as a constant with no escape or placeholder processing.
    #[must_use]
    pub fn raw(name: &str, text: &str) -> Self {
        let mut opcodes = Opcodes::new();
        if !text.is_empty() {
            opcodes.push(Opcode::Literal(text.into()));
        }
        Self::from_opcodes(name, opcodes)
    }

    pub(crate) fn missing(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            opcodes: Opcodes::new(),
            is_missing: true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn opcodes(&self) -> &[Opcode] {
        &self.opcodes
    }

    /// Sentinel returned for keys that were not found.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.is_missing
    }

    /// True when the template reduces to a constant string.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        match self.opcodes.as_slice() {
            [] | [Opcode::Literal(_)] => true,
            _ => false,
        }
    }

    /// Iterate the distinct placeholder ids in first-use order.
    pub fn placeholders(&self) -> impl Iterator<Item = &PlaceholderId> {
        let mut seen: SmallVec<[&PlaceholderId; 4]> = SmallVec::new();
        self.opcodes.iter().filter_map(move |op| match op {
            Opcode::Placeholder(id) if !seen.contains(&id) => {
                seen.push(id);
                Some(id)
            }
            _ => None,
        })
    }

    /// Diagnostic text written in place of a missing string.
    #[must_use]
    pub fn missing_text(&self) -> String {
        format!("<MISSING: {}>", self.name)
    }

    /// The constant text of a literal definition.
    ///
    /// Missing definitions yield their `<MISSING: name>` marker and an empty
    /// definition yields `""`.
    pub fn string_literal(&self) -> Result<Cow<'_, str>, RenderError> {
        if self.is_missing {
            return Ok(Cow::Owned(self.missing_text()));
        }
        match self.opcodes.as_slice() {
            [] => Ok(Cow::Borrowed("")),
            [Opcode::Literal(text)] => Ok(Cow::Borrowed(text)),
            _ => Err(RenderError::NotALiteral {
                name: self.name.to_string(),
            }),
        }
    }

    /// Render into a fresh builder and return the finished text.
    pub fn render_to_string<R: Resolver + ?Sized>(&self, resolver: &R) -> Result<String, RenderError> {
        let mut out = OutputBuilder::new();
        render(self, resolver, &mut out)?;
        Ok(out.finish().into_owned())
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("opcodes", &self.opcodes)
            .field("is_missing", &self.is_missing)
            .finish()
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "String '{}'", self.name)
    }
}
