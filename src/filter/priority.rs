//! Binding priorities for filter ordering.

use std::fmt;

/// Externally assigned ordering value for a filter registration.
///
/// Request and pre-match filters run in ascending order; response filters
/// run in descending order. Registrations with equal priority keep their
/// registration order (reversed for response filters).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// Authentication, authorization, rate limiting.
    pub const SECURITY: Self = Self(100);
    /// Filters that add or rewrite headers.
    pub const HEADER_DECORATOR: Self = Self(200);
    /// Message body decoding.
    pub const DECODER: Self = Self(300);
    /// Message body encoding.
    pub const ENCODER: Self = Self(400);
    /// Application filters; the default.
    pub const USER: Self = Self(500);

    #[inline]
    pub const fn value(self) -> i32 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::USER
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
