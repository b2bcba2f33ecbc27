//! Macro for implementing Display and FromStr for fieldless domain enums
//!
//! Identity kinds, regions and environments all travel as short lowercase
//! strings (config files, environment variables, keychain account names).
//! This macro keeps both directions of that mapping in one place.
//!
//! # Example
//!
//! ```rust
//! use beacon_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Push,
//!     Email,
//! }
//!
//! impl_domain_status_conversions!(Channel {
//!     Push => "push",
//!     Email => "email",
//! });
//! ```

/// Implements Display and FromStr traits for fieldless enums
///
/// - Display writes the mapped lowercase string
/// - FromStr parses case-insensitively and names the enum in its error
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
