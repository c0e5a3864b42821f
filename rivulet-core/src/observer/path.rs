//! Dot-path expressions such as `a.b.0.c`.

use super::value::Value;
use crate::scope::Scope;

/// A parsed dot-path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse `expression` into segments.
    ///
    /// Returns `None` unless every segment is non-empty and made of ASCII
    /// letters, digits, `_` or `$`.
    pub fn parse(expression: &str) -> Option<Self> {
        let segments: Vec<String> = expression.split('.').map(str::to_string).collect();
        let valid = segments.iter().all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        });
        valid.then_some(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve against `scope`: the first segment names a scope key, the
    /// rest index into the value found there.
    ///
    /// A nullish intermediate ends the walk with `Undefined`.
    pub fn resolve(&self, scope: &Scope) -> Value {
        let mut segments = self.segments.iter();
        let Some(first) = segments.next() else {
            return Value::Undefined;
        };
        let mut value = scope.get(first);
        for segment in segments {
            if value.is_nullish() {
                return Value::Undefined;
            }
            value = value.get(segment);
        }
        value
    }
}
