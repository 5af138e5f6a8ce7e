// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Bulk-copy routines for arrays of primitive element types.
//!
//! One routine per scalar kind: given a source array it returns a newly
//! allocated array of identical length with the elements copied verbatim
//! (numeric kinds bit-for-bit). The selector dispatches here when both
//! member sides are the same primitive array type, replacing N delegated
//! calls with a single bulk operation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::OnceLock;

use rust_decimal::Decimal;

/// Erased bulk-copy entry: borrows the source array, returns the copy.
pub(crate) type CopyFn = fn(&dyn Any) -> Option<Box<dyn Any>>;

macro_rules! bulk_copiers {
    ($( $fn_name:ident => $elem:ty ),+ $(,)?) => {
        $(
            /// Copy the array verbatim into a fresh allocation.
            pub fn $fn_name(src: &[$elem]) -> Vec<$elem> {
                src.to_vec()
            }
        )+

        fn table() -> &'static HashMap<TypeId, CopyFn> {
            static TABLE: OnceLock<HashMap<TypeId, CopyFn>> = OnceLock::new();
            TABLE.get_or_init(|| {
                let mut map: HashMap<TypeId, CopyFn> = HashMap::new();
                $(
                    map.insert(TypeId::of::<Vec<$elem>>(), |value| {
                        value
                            .downcast_ref::<Vec<$elem>>()
                            .map(|src| Box::new($fn_name(src)) as Box<dyn Any>)
                    });
                )+
                map
            })
        }
    };
}

bulk_copiers! {
    copy_bool => bool,
    copy_char => char,
    copy_u8 => u8,
    copy_u16 => u16,
    copy_u32 => u32,
    copy_u64 => u64,
    copy_u128 => u128,
    copy_i8 => i8,
    copy_i16 => i16,
    copy_i32 => i32,
    copy_i64 => i64,
    copy_i128 => i128,
    copy_f32 => f32,
    copy_f64 => f64,
    copy_decimal => Decimal,
}

/// Bulk-copy entry for `Vec<E>` of a primitive element kind, if `id`
/// names one. Consulted by the strategy selector at descriptor build.
pub(crate) fn copier_for(id: TypeId) -> Option<CopyFn> {
    table().get(&id).copied()
}
