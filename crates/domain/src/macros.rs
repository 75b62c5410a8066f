//! Display/FromStr for enums persisted as text
//!
//! ```rust
//! use duesync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Color {
//!     Red,
//!     Blue,
//! }
//!
//! impl_domain_status_conversions!(Color {
//!     Red => "red",
//!     Blue => "blue",
//! });
//!
//! assert_eq!("RED".parse::<Color>().unwrap(), Color::Red);
//! ```

/// Implements `Display` and case-insensitive `FromStr` for a fieldless enum.
///
/// The string forms are the column values stored in SQLite, so they must
/// stay stable.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Stable lowercase identifier
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
