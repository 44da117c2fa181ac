//! Batched input validation.
//!
//! A `BodyReader` walks a JSON request body field by field and records every
//! structural problem it finds. Only `finish()` fails, returning the whole
//! list at once; otherwise it hands back the fields that were read.

use domains::{DomainError, ForumError};
use serde_json::Value;

pub struct BodyReader<'a> {
    body: &'a Value,
    errors: Vec<ForumError>,
}

impl<'a> BodyReader<'a> {
    pub fn new(body: &'a Value) -> Self {
        Self { body, errors: Vec::new() }
    }

    fn field(&self, name: &str) -> Option<&'a Value> {
        self.body.get(name).filter(|value| !value.is_null())
    }

    /// A mandatory string field.
    pub fn required_string(&mut self, name: &str) -> Option<String> {
        match self.field(name) {
            None => {
                self.errors.push(ForumError::missing_parameter(name));
                None
            }
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                self.errors.push(ForumError::invalid_parameter_type(name, "string"));
                None
            }
        }
    }

    /// A mandatory, non-empty string field no longer than `max` characters.
    pub fn required_text(&mut self, name: &str, max: usize) -> Option<String> {
        let text = self.required_string(name)?;
        let length = text.chars().count();
        if text.trim().is_empty() {
            self.errors.push(ForumError::parameter_length_too_small(name, 0));
            return None;
        }
        if length > max {
            self.errors.push(ForumError::parameter_length_too_large(name, max));
            return None;
        }
        Some(text)
    }

    /// Like `required_text`, but absence is fine.
    pub fn optional_text(&mut self, name: &str, max: usize) -> Option<String> {
        self.field(name)?;
        self.required_text(name, max)
    }

    /// An optional string field; present-but-wrong-type is still an error.
    pub fn optional_string(&mut self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.errors.push(ForumError::invalid_parameter_type(name, "string"));
                None
            }
        }
    }

    pub fn required_integer(&mut self, name: &str) -> Option<i64> {
        if self.field(name).is_none() {
            self.errors.push(ForumError::missing_parameter(name));
            return None;
        }
        self.optional_integer(name)
    }

    pub fn optional_integer(&mut self, name: &str) -> Option<i64> {
        match self.field(name)?.as_i64() {
            Some(n) => Some(n),
            None => {
                self.errors.push(ForumError::invalid_parameter_type(name, "integer"));
                None
            }
        }
    }

    /// Releases the parsed fields, or every recorded problem.
    ///
    /// The required getters record an error whenever they return `None`, so
    /// `parsed` is only `None` here when the error list is not empty.
    pub fn finish<T>(self, parsed: Option<T>) -> Result<T, DomainError> {
        match parsed {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(DomainError::Validation(self.errors)),
        }
    }
}
