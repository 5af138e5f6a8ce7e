// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Optional-value adapters.
//!
//! Fixed thin wrappers normalizing optional and required sides before
//! delegating to the standard member-driven mapper for the inner types.
//! No member-level logic lives here; optionality is never special-cased
//! inside the strategy selector or the synthesizer. The set is fixed:
//!
//! - `Option<S> -> Option<D>`: absent maps to absent.
//! - `Option<S> -> D`: an absent source is an error — the destination
//!   requires a value and there is no null to hand back (see DESIGN.md).
//! - `S -> Option<D>`: the result is always present.
//! - the reference-shaped `Option<S> -> Option<D>` variant is emitted by
//!   the synthesizer itself so the absent-source short-circuit and hook
//!   ordering hold; it does not pass through here.
//!
//! The element-wise sequence wrapper lives here too: `Vec<S> -> Vec<D>`
//! maps per element through the resolver, so one registration covers the
//! common composite-collection member.

use crate::error::MapError;
use crate::resolver::Resolver;
use crate::synth::CompiledMapper;
use std::any::type_name;
use std::sync::Arc;

/// `Option<S> -> Option<D>` for value shapes.
pub(crate) fn optional_to_optional<S: 'static, D: 'static>(
) -> CompiledMapper<Option<S>, Option<D>> {
    CompiledMapper::from_run(Arc::new(
        |source: &Option<S>, resolver: &Resolver| match source.as_ref() {
            None => Ok(None),
            Some(inner) => {
                let mapper = resolver.get_with_verify::<S, D>()?;
                Ok(Some(mapper.map(inner, resolver)?))
            }
        },
    ))
}

/// `Option<S> -> D`: the destination requires a value.
pub(crate) fn optional_to_required<S: 'static, D: 'static>() -> CompiledMapper<Option<S>, D> {
    CompiledMapper::from_run(Arc::new(
        |source: &Option<S>, resolver: &Resolver| match source.as_ref() {
            None => Err(MapError::AbsentSource {
                source: type_name::<Option<S>>(),
                dest: type_name::<D>(),
            }),
            Some(inner) => {
                let mapper = resolver.get_with_verify::<S, D>()?;
                mapper.map(inner, resolver)
            }
        },
    ))
}

/// `S -> Option<D>`: the result is always present.
pub(crate) fn required_to_optional<S: 'static, D: 'static>() -> CompiledMapper<S, Option<D>> {
    CompiledMapper::from_run(Arc::new(|source: &S, resolver: &Resolver| {
        let mapper = resolver.get_with_verify::<S, D>()?;
        Ok(Some(mapper.map(source, resolver)?))
    }))
}

/// `Vec<S> -> Vec<D>`, one delegated mapping per element.
pub(crate) fn sequence<S: 'static, D: 'static>() -> CompiledMapper<Vec<S>, Vec<D>> {
    CompiledMapper::from_run(Arc::new(|source: &Vec<S>, resolver: &Resolver| {
        let mapper = resolver.get_with_verify::<S, D>()?;
        source
            .iter()
            .map(|element| mapper.map(element, resolver))
            .collect()
    }))
}
