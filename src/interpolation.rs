//! Message interpolation.
//!
//! A message template is turned into a message in three passes:
//!
//! 1. `{key}` parameters naming a message bundle entry are replaced by that
//!    entry, recursively
//! 2. `{attribute}` parameters are replaced by the constraint's attribute
//!    values
//! 3. `${validatedValue}` is replaced by the validated value
//!
//! Unknown parameters are left untouched. `\{`, `\}`, `\$` and `\\` escape
//! the character that follows.
//!
//! # Example
//!
//! ```rust
//! use beanval::constraint::ConstraintAttributes;
//! use beanval::interpolation::{DefaultMessageInterpolator, MessageContext, MessageInterpolator};
//! use beanval::metadata::ConstraintDescriptor;
//! use beanval::Value;
//!
//! let descriptor = ConstraintDescriptor {
//!     constraint: "Size".into(),
//!     attributes: ConstraintAttributes::new().with("min", 2).with("max", 5),
//!     groups: vec!["Default".into()],
//!     payload: Vec::new(),
//!     message_template: "{beanval.Size.message}".into(),
//!     report_as_single_violation: false,
//!     composing: Vec::new(),
//! };
//! let value = Value::from("abcdefg");
//! let interpolator = DefaultMessageInterpolator::new();
//! let message = interpolator.interpolate(
//!     "{beanval.Size.message}",
//!     &MessageContext::new(&descriptor, &value),
//! );
//! assert_eq!(message, "size must be between 2 and 5");
//! ```

use std::collections::HashMap;

use crate::metadata::ConstraintDescriptor;
use crate::value::Value;

/// How deep bundle entries may reference other bundle entries.
const MAX_BUNDLE_DEPTH: usize = 10;

/// What a message is interpolated against.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    /// The violated constraint.
    pub descriptor: &'a ConstraintDescriptor,
    /// The value that failed.
    pub validated_value: &'a Value,
}

impl<'a> MessageContext<'a> {
    /// Creates a context.
    pub fn new(descriptor: &'a ConstraintDescriptor, validated_value: &'a Value) -> Self {
        Self {
            descriptor,
            validated_value,
        }
    }
}

/// Produces messages from templates.
pub trait MessageInterpolator: Send + Sync {
    /// Interpolates `template`.
    fn interpolate(&self, template: &str, context: &MessageContext<'_>) -> String;
}

/// Interpolates against an in-memory message bundle.
///
/// The bundle starts out with the default messages of the built-in
/// constraints under `beanval.<Constraint>.message`.
#[derive(Debug, Clone)]
pub struct DefaultMessageInterpolator {
    messages: HashMap<String, String>,
}

impl DefaultMessageInterpolator {
    /// Creates an interpolator with the built-in messages.
    pub fn new() -> Self {
        let messages = [
            ("NotNull", "may not be null"),
            ("Null", "must be null"),
            ("AssertTrue", "must be true"),
            ("AssertFalse", "must be false"),
            ("Min", "must be greater than or equal to {value}"),
            ("Max", "must be less than or equal to {value}"),
            ("Size", "size must be between {min} and {max}"),
            ("Pattern", "must match \"{regexp}\""),
            ("Email", "not a well-formed email address"),
            ("NotBlank", "may not be blank"),
            ("NotEmpty", "may not be empty"),
        ]
        .into_iter()
        .map(|(name, message)| (format!("beanval.{}.message", name), message.to_string()))
        .collect();
        Self { messages }
    }

    /// Adds or replaces a bundle entry.
    pub fn with_message(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(key.into(), message.into());
        self
    }

    /// Looks up a bundle entry.
    pub fn message(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    fn resolve_bundle(&self, template: &str, depth: usize) -> String {
        if depth >= MAX_BUNDLE_DEPTH {
            return template.to_string();
        }
        substitute(template, false, |key| {
            self.messages
                .get(key)
                .map(|message| self.resolve_bundle(message, depth + 1))
        })
    }
}

impl Default for DefaultMessageInterpolator {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageInterpolator for DefaultMessageInterpolator {
    fn interpolate(&self, template: &str, context: &MessageContext<'_>) -> String {
        let resolved = self.resolve_bundle(template, 0);
        let with_attributes = substitute(&resolved, false, |name| {
            context
                .descriptor
                .attributes
                .get(name)
                .map(|value| escape(&value.to_string()))
        });
        let with_value = substitute(&with_attributes, true, |name| {
            (name == "validatedValue").then(|| escape(&context.validated_value.to_string()))
        });
        unescape(&with_value)
    }
}

/// Replaces `{name}` (or `${name}` when `expression` is set) with whatever
/// `lookup` returns, leaving escapes and unknown names in place.
fn substitute<F>(template: &str, expression: bool, mut lookup: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            out.push(c);
            if let Some(&next) = chars.get(i + 1) {
                out.push(next);
            }
            i += 2;
            continue;
        }

        let opens = if expression {
            c == '$' && chars.get(i + 1) == Some(&'{')
        } else {
            c == '{' && (i == 0 || chars[i - 1] != '$')
        };
        if opens {
            let start = if expression { i + 2 } else { i + 1 };
            if let Some(len) = chars[start..].iter().position(|&ch| ch == '}') {
                let name: String = chars[start..start + len].iter().collect();
                if !name.contains('{') {
                    if let Some(replacement) = lookup(&name) {
                        out.push_str(&replacement);
                        i = start + len + 1;
                        continue;
                    }
                }
            }
        }

        out.push(c);
        i += 1;
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '{' | '}' | '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}
