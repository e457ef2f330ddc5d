//! Response parsing and shape validation.
//!
//! A [`ResponseValidator`] turns raw response bytes into a `serde_json::Value`
//! using a caller-registered parse callback, then optionally checks the
//! value against a [`Prototype`] and coerces non-container results to an
//! empty object.
//!
//! # Example
//!
//! ```
//! use outcall_core::validate::{Prototype, ResponseValidator, parsers};
//!
//! let validator = ResponseValidator::new()
//!     .with_parser(parsers::json)
//!     .with_prototype(Prototype::keys(["id", "status"]));
//!
//! assert!(validator.validate(br#"{"id": 7, "status": "ok", "extra": true}"#).is_ok());
//! assert!(validator.validate(br#"{"id": 7}"#).is_err());
//! ```

mod error;
pub mod parsers;
mod prototype;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

pub use error::{ParseError, ValidationError};
pub use prototype::Prototype;

/// Parse callback: raw body plus caller-supplied extra arguments.
pub type ParseFn = Arc<dyn Fn(&[u8], &[Value]) -> Result<Value, ParseError> + Send + Sync>;

/// Parse callback, prototype, and container guarantee for one request type.
#[derive(Clone, Default)]
pub struct ResponseValidator {
    parser: Option<ParseFn>,
    extra_args: Vec<Value>,
    prototype: Option<Prototype>,
    guarantee_container: bool,
}

impl fmt::Debug for ResponseValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseValidator")
            .field("parser", &self.parser.as_ref().map(|_| "<callback>"))
            .field("extra_args", &self.extra_args)
            .field("prototype", &self.prototype)
            .field("guarantee_container", &self.guarantee_container)
            .finish()
    }
}

impl ResponseValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the parse callback.
    #[must_use]
    pub fn with_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&[u8], &[Value]) -> Result<Value, ParseError> + Send + Sync + 'static,
    {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Extra arguments handed to the callback after the payload.
    #[must_use]
    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = Value>) -> Self {
        self.extra_args = args.into_iter().collect();
        self
    }

    /// Registers the expected response shape.
    #[must_use]
    pub fn with_prototype(mut self, prototype: Prototype) -> Self {
        self.prototype = Some(prototype);
        self
    }

    /// Coerce non-container results to an empty object instead of failing.
    #[must_use]
    pub fn guarantee_container(mut self, enabled: bool) -> Self {
        self.guarantee_container = enabled;
        self
    }

    #[must_use]
    pub fn has_parser(&self) -> bool {
        self.parser.is_some()
    }

    /// Parses and validates a raw body.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingParser`] with no callback registered,
    /// [`ValidationError::Parse`] when the callback fails, and the
    /// prototype's errors when the shape does not match.
    #[instrument(skip(self, raw), fields(bytes = raw.len()))]
    pub fn validate(&self, raw: &[u8]) -> Result<Value, ValidationError> {
        let parser = self.parser.as_ref().ok_or(ValidationError::MissingParser)?;
        let value = parser(raw, &self.extra_args)?;

        if let Some(prototype) = &self.prototype {
            prototype.check(&value)?;
        }

        if self.guarantee_container && !prototype::is_container(&value) {
            debug!("parsed response is not a container, coercing to empty object");
            return Ok(Value::Object(Map::new()));
        }
        Ok(value)
    }
}
