//! Macro for implementing Display and FromStr for status enums
//!
//! Status values travel as SCREAMING_SNAKE_CASE strings (`IN_PROGRESS`,
//! `PARTIALLY_FAILED`). Parsing is case-insensitive and accepts `-` in place
//! of `_`.
//!
//! # Example
//!
//! ```rust
//! use cdnbulk_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Queued,
//!     InProgress,
//! }
//!
//! impl_domain_status_conversions!(Phase {
//!     Queued => "QUEUED",
//!     InProgress => "IN_PROGRESS",
//! });
//!
//! assert_eq!(Phase::InProgress.to_string(), "IN_PROGRESS");
//! assert_eq!("in-progress".parse::<Phase>().unwrap(), Phase::InProgress);
//! ```

/// Implements Display and FromStr traits for status enums
///
/// This macro generates:
/// - Display trait: writes the canonical upper-case representation
/// - FromStr trait: parses case-insensitive strings, treating `-` as `_`
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
