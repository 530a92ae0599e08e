//! Signup form: field validation, draft persistence and the submission gate

pub mod form;
pub mod validate;

pub use form::{SignupForm, SubmitDecision};
pub use validate::{FieldFeedback, FieldState, PasswordStrength, validate_verification_code};

/// Email domains accepted without a warning
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "dsntech.com",
    "gmail.com",
    "naver.com",
    "daum.net",
    "hanmail.net",
];
