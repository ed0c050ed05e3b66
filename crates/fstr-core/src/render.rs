#![forbid(unsafe_code)]

//! Opcode interpreter and the resolver capability it drives.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::builder::OutputBuilder;
use crate::definition::{Definition, Opcode};
use crate::error::{LookupError, RenderError};
use crate::intern::PlaceholderId;

/// Writes the value for one placeholder.
///
/// Implementations are usually a dense `match` on the placeholder name:
///
/// ```
/// use fstr_core::{OutputBuilder, PlaceholderId, RenderError, Resolver};
///
/// struct Download<'s> {
///     file: &'s str,
///     percent: u32,
/// }
///
/// impl Resolver for Download<'_> {
///     fn resolve<'a>(
///         &'a self,
///         id: &PlaceholderId,
///         out: &mut OutputBuilder<'a>,
///     ) -> Result<(), RenderError> {
///         match id.as_str() {
///             "file" => out.append_str(self.file),
///             "percent" => out.append_u32(self.percent),
///             other => {
///                 return Err(RenderError::UnknownPlaceholder {
///                     key: "download".into(),
///                     placeholder: other.into(),
///                 });
///             }
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Resolver {
    fn resolve<'a>(&'a self, id: &PlaceholderId, out: &mut OutputBuilder<'a>) -> Result<(), RenderError>;
}

/// A resolver that also knows which table key holds its template.
pub trait Template: Resolver {
    fn table_key(&self) -> &str;
}

/// Something that can hand out definitions by key, typically a table.
pub trait DefinitionSource {
    /// Look up `name`. With `optional`, an absent key yields a missing
    /// sentinel instead of an error.
    fn definition(&self, name: &str, optional: bool) -> Result<Arc<Definition>, LookupError>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve<'a>(&'a self, id: &PlaceholderId, out: &mut OutputBuilder<'a>) -> Result<(), RenderError> {
        (**self).resolve(id, out)
    }
}

impl<T: Template + ?Sized> Template for &T {
    fn table_key(&self) -> &str {
        (**self).table_key()
    }
}

/// Execute `definition` against `resolver`, appending to `out`.
///
/// A missing definition writes its `<MISSING: name>` marker and succeeds.
pub fn render<'a, R: Resolver + ?Sized>(
    definition: &'a Definition,
    resolver: &'a R,
    out: &mut OutputBuilder<'a>,
) -> Result<(), RenderError> {
    if definition.is_missing() {
        out.append_string(definition.missing_text());
        return Ok(());
    }
    for op in definition.opcodes() {
        match op {
            Opcode::Literal(text) => out.append_str(text),
            Opcode::Placeholder(id) => resolver.resolve(id, out)?,
        }
    }
    Ok(())
}

/// Map-backed [`Template`] for callers that only know their arguments at
/// runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgMap {
    key: String,
    values: FxHashMap<Box<str>, String>,
}

impl ArgMap {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a value, returning the one it replaced.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.values.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Resolver for ArgMap {
    fn resolve<'a>(&'a self, id: &PlaceholderId, out: &mut OutputBuilder<'a>) -> Result<(), RenderError> {
        match self.values.get(id.as_str()) {
            Some(value) => {
                out.append_str(value);
                Ok(())
            }
            None => Err(RenderError::UnknownPlaceholder {
                key: self.key.clone(),
                placeholder: id.to_string(),
            }),
        }
    }
}

impl Template for ArgMap {
    fn table_key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuilderState;
    use crate::compile::{CompileMode, compile};
    use crate::scratch::{clear_pool, pooled_buffers};

    fn def(text: &str) -> Definition {
        compile("t", text, CompileMode::Template).unwrap()
    }

    struct Pair {
        left: i32,
        right: Option<u64>,
    }

    impl Resolver for Pair {
        fn resolve<'a>(&'a self, id: &PlaceholderId, out: &mut OutputBuilder<'a>) -> Result<(), RenderError> {
            match id.as_str() {
                "left" => out.append(self.left),
                "right" => out.append(self.right),
                other => {
                    return Err(RenderError::UnknownPlaceholder {
                        key: "pair".into(),
                        placeholder: other.into(),
                    });
                }
            }
            Ok(())
        }
    }

    struct Single(Arc<Definition>);

    impl DefinitionSource for Single {
        fn definition(&self, name: &str, optional: bool) -> Result<Arc<Definition>, LookupError> {
            if self.0.name() == name {
                Ok(Arc::clone(&self.0))
            } else if optional {
                Ok(Arc::new(Definition::missing(name)))
            } else {
                Err(LookupError::KeyNotFound {
                    table: "single".into(),
                    key: name.into(),
                })
            }
        }
    }

    #[test]
    fn hello_world() {
        let args = ArgMap::new("t").with("name", "World");
        assert_eq!(def("Hello {name}!").render_to_string(&args).unwrap(), "Hello World!");
    }

    #[test]
    fn literal_round_trip_with_escapes() {
        let text = def("tab\\there {{braces}} \\u0041 \\u2603").render_to_string(&ArgMap::default());
        assert_eq!(text.unwrap(), "tab\there {braces} A \u{2603}");
    }

    #[test]
    fn zero_opcode_definition_renders_empty() {
        assert_eq!(def("").render_to_string(&ArgMap::default()).unwrap(), "");
    }

    #[test]
    fn missing_definition_renders_marker() {
        let missing = Definition::missing("gone");
        assert_eq!(
            missing.render_to_string(&ArgMap::default()).unwrap(),
            "<MISSING: gone>"
        );
    }

    #[test]
    fn unknown_placeholder_is_resolver_error() {
        let err = def("{nope}").render_to_string(&ArgMap::new("k")).unwrap_err();
        assert_eq!(
            err,
            RenderError::UnknownPlaceholder {
                key: "k".into(),
                placeholder: "nope".into()
            }
        );
    }

    #[test]
    fn typed_resolver() {
        let d = def("{left}/{right}");
        let some = Pair {
            left: -4,
            right: Some(9),
        };
        let none = Pair {
            left: 0,
            right: None,
        };
        assert_eq!(d.render_to_string(&some).unwrap(), "-4/9");
        assert_eq!(d.render_to_string(&none).unwrap(), "0/null");
    }

    #[test]
    fn repeated_placeholder_resolves_each_time() {
        let args = ArgMap::new("t").with("x", "ab");
        assert_eq!(def("{x}-{x}").render_to_string(&args).unwrap(), "ab-ab");
    }

    #[test]
    fn single_literal_render_stays_unbuffered() {
        clear_pool();
        let d = def("constant");
        let args = ArgMap::default();
        let mut out = OutputBuilder::new();
        render(&d, &args, &mut out).unwrap();
        assert_eq!(out.state(), BuilderState::Prefix);
        assert_eq!(out.finish(), "constant");
        assert_eq!(pooled_buffers(), 0);
    }

    #[test]
    fn error_mid_render_returns_buffer() {
        clear_pool();
        let d = def("a{b}c{missing}");
        let args = ArgMap::new("t").with("b", "B");
        assert!(d.render_to_string(&args).is_err());
        assert_eq!(pooled_buffers(), 1);
    }

    #[test]
    fn nested_template_through_source() {
        let inner = Arc::new(compile("inner", "<{v}>", CompileMode::Template).unwrap());
        let source = Single(Arc::clone(&inner));
        let nested = ArgMap::new("inner").with("v", "x");

        let mut out = OutputBuilder::new().with_source(&source);
        out.append_str("[");
        out.append_template(&nested).unwrap();
        out.append_str("]");
        assert_eq!(out.finish(), "[<x>]");
    }

    #[test]
    fn nested_template_with_absent_key_renders_marker() {
        let source = Single(Arc::new(Definition::raw("other", "x")));
        let mut out = OutputBuilder::new().with_source(&source);
        out.append_template(&ArgMap::new("absent")).unwrap();
        assert_eq!(out.finish(), "<MISSING: absent>");
    }

    #[test]
    fn shared_definition_renders_on_many_threads() {
        let d = Arc::new(def("#{n}"));
        std::thread::scope(|scope| {
            for n in 0..4 {
                let d = Arc::clone(&d);
                scope.spawn(move || {
                    let args = ArgMap::new("t").with("n", n.to_string());
                    assert_eq!(d.render_to_string(&args).unwrap(), format!("#{n}"));
                });
            }
        });
    }
}
