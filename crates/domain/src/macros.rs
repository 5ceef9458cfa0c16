//! Macro for implementing string conversions on domain enums
//!
//! Roles, session event kinds and backend selectors all travel as lowercase
//! strings (wire payloads, config files, log fields). This macro generates a
//! single mapping used for `as_str`, `Display` and case-insensitive `FromStr`.
//!
//! # Example
//!
//! ```rust
//! use profilesync_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Web,
//!     Mobile,
//! }
//!
//! impl_domain_enum_conversions!(Channel {
//!     Web => "web",
//!     Mobile => "mobile",
//! });
//!
//! assert_eq!(Channel::Web.as_str(), "web");
//! assert_eq!("MOBILE".parse::<Channel>().unwrap(), Channel::Mobile);
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Stable lowercase representation
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        ::std::stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}
