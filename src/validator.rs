//! The error-accumulating entity validator.
//!
//! Validation runs over a whole entity and reports every invariant
//! violation it finds; it never aborts on the first error. The accumulator
//! is deliberately separate from the operational error channel: a validator
//! with a non-zero error count fails the surrounding write with
//! [`crate::error::Status::Invalid`].

use log::warn;

/// The closed set of validation error kinds. The values are bit flags and
/// OR into the validator's error mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ValidationErrorKind {
    /// An invalid size or count of a list or set.
    InvalidCount = 0x01,
    /// An object is empty or null where the type does not allow it.
    NullNotAllowed = 0x02,
    /// A required object is missing.
    MissingObject = 0x04,
    /// An object is invalid or used in an invalid way.
    InvalidObject = 0x08,
    /// The setup of an object or system is invalid.
    InvalidSetup = 0x10,
    /// A value or index is out of bounds or not allowed.
    InvalidValue = 0x20,
}

/// One reported validation error: a kind plus a free-form diagnostic.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub kind: ValidationErrorKind,
    pub message: String,
}

/// Accumulates validation errors across one validation pass.
#[derive(Debug, Default)]
pub struct EntityValidator {
    issues: Vec<ValidationIssue>,
    error_ids: u64,
}

impl EntityValidator {
    /// Creates an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports one validation error. The kind is OR-ed into the error mask
    /// and the diagnostic is kept for inspection.
    pub fn report_error(&mut self, kind: ValidationErrorKind, message: impl Into<String>) {
        let message = message.into();
        warn!("validation error {:?}: {}", kind, message);
        self.error_ids |= kind as u64;
        self.issues.push(ValidationIssue { kind, message });
    }

    /// Number of errors reported so far.
    pub fn get_error_count(&self) -> usize {
        self.issues.len()
    }

    /// OR-ed mask of all reported error kinds.
    pub fn get_error_ids(&self) -> u64 {
        self.error_ids
    }

    /// Returns `true` if at least one error of `kind` was reported.
    pub fn has_error(&self, kind: ValidationErrorKind) -> bool {
        self.error_ids & kind as u64 != 0
    }

    /// The reported errors, in report order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Clears all reported errors.
    pub fn clear(&mut self) {
        self.issues.clear();
        self.error_ids = 0;
    }
}
