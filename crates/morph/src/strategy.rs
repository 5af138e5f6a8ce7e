// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Per-member strategy selection.
//!
//! Each member assignment is classified into one of four strategies, in
//! precedence order: generated value, direct copy, bulk array copy,
//! delegated mapping. Direct copy applies only to the closed set of
//! *directly representable* types — scalar and opaque kinds that are never
//! decomposed — so the dominant scalar case skips all indirection while
//! arbitrary composite members fall through to delegation.
//!
//! The tables are static and closed: they are consulted once per
//! descriptor build, never per call.

use crate::descriptor::MemberAssignment;
use crate::fastpath;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;

/// Resolved member strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// No source accessor; a generator function produces the value.
    Generated,
    /// Identical directly-representable types: copy verbatim.
    Direct,
    /// Arrays of one directly-representable element type: one bulk copy.
    BulkCopy,
    /// Everything else: resolve the member pair through the resolver.
    Delegated,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Generated => "generated",
            Strategy::Direct => "direct",
            Strategy::BulkCopy => "bulk-copy",
            Strategy::Delegated => "delegated",
        };
        f.write_str(name)
    }
}

macro_rules! insert_with_optional {
    ($set:expr, $($ty:ty),+ $(,)?) => {
        $(
            $set.insert(TypeId::of::<$ty>());
            $set.insert(TypeId::of::<Option<$ty>>());
        )+
    };
}

/// Types copied verbatim by the direct strategy, in plain and `Option`
/// form. Closed set; membership implies the type is never decomposed.
fn directly_representable() -> &'static HashSet<TypeId> {
    static TABLE: OnceLock<HashSet<TypeId>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut set = HashSet::new();
        insert_with_optional!(
            set, bool, char, u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64, String,
            Decimal, Uuid, NaiveDateTime, DateTime<Utc>, Duration,
        );
        set
    })
}

macro_rules! insert_plain {
    ($set:expr, $($ty:ty),+ $(,)?) => {
        $( $set.insert(TypeId::of::<$ty>()); )+
    };
}

/// Types the top-level factory refuses to decompose: scalar and opaque
/// kinds whose mapping is the caller's business.
fn opaque() -> &'static HashSet<TypeId> {
    static TABLE: OnceLock<HashSet<TypeId>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut set = HashSet::new();
        insert_plain!(
            set, bool, char, u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64, String,
            Decimal, Uuid, NaiveDateTime, DateTime<Utc>, Duration,
        );
        set
    })
}

pub(crate) fn is_directly_representable(id: TypeId) -> bool {
    directly_representable().contains(&id)
}

/// Whether the top-level factory treats this type as opaque.
pub fn is_opaque(id: TypeId) -> bool {
    opaque().contains(&id)
}

/// Classify one member assignment.
///
/// Precedence: generated, direct, bulk copy, delegated. Identical types
/// outside the direct and bulk tables still delegate — a nested pair of
/// the same composite type is a mapping like any other.
pub(crate) fn select<S, D>(assignment: &MemberAssignment<S, D>) -> Strategy {
    let Some(source_ty) = assignment.source_ty else {
        return Strategy::Generated;
    };
    if source_ty.id == assignment.dest_ty.id {
        if is_directly_representable(source_ty.id) {
            return Strategy::Direct;
        }
        if fastpath::copier_for(source_ty.id).is_some() {
            return Strategy::BulkCopy;
        }
    }
    Strategy::Delegated
}
