// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Error types for mapper synthesis and execution.

use std::fmt;

/// Mapping operation errors.
///
/// Synthesis-time configuration problems (`MissingConstructor`) and
/// execution-time failures share one enum; a single `map` call is
/// all-or-nothing, so whatever fails propagates unmodified to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// Destination requires construction and no usable plan exists.
    /// Raised while the mapper is being synthesized, never at first call.
    MissingConstructor {
        source: &'static str,
        dest: &'static str,
    },
    /// A delegated member site found no mapper for its pair.
    UnresolvedPair {
        source: &'static str,
        dest: &'static str,
    },
    /// Optional source was absent but the destination requires a value.
    AbsentSource {
        source: &'static str,
        dest: &'static str,
    },
    /// A member value did not have the type its sink expects.
    MemberType {
        member: String,
        expected: &'static str,
    },
    /// A constructor parameter could not be bound to a source member.
    ConstructorArg {
        param: String,
        dest: &'static str,
    },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::MissingConstructor { source, dest } => {
                write!(f, "no viable constructor for {} in {} -> {}", dest, source, dest)
            }
            MapError::UnresolvedPair { source, dest } => {
                write!(f, "no mapper registered for {} -> {}", source, dest)
            }
            MapError::AbsentSource { source, dest } => {
                write!(f, "absent source in {} -> {}: destination requires a value", source, dest)
            }
            MapError::MemberType { member, expected } => {
                write!(f, "member '{}': value is not a {}", member, expected)
            }
            MapError::ConstructorArg { param, dest } => {
                write!(f, "constructor of {}: no source member for parameter '{}'", dest, param)
            }
        }
    }
}

impl std::error::Error for MapError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_both_sides_of_the_pair() {
        let err = MapError::MissingConstructor {
            source: "Order",
            dest: "OrderDto",
        };
        let text = err.to_string();
        assert!(text.contains("Order"));
        assert!(text.contains("OrderDto"));
    }

    #[test]
    fn member_errors_carry_the_member_path() {
        let err = MapError::MemberType {
            member: "total".to_string(),
            expected: "u64",
        };
        assert!(err.to_string().contains("total"));
        assert!(err.to_string().contains("u64"));
    }
}
