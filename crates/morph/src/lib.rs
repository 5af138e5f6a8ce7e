// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! # morph - type-directed object mapping compiler
//!
//! Given a source shape S and a destination shape D, morph synthesizes an
//! executable transform S -> D on first use, selects a per-member strategy
//! (generated value, direct copy, bulk array copy, delegated mapping), and
//! caches the compiled transform so every later mapping of the pair reuses
//! it instead of re-deriving it.
//!
//! ## Quick Start
//!
//! ```rust
//! use morph::{DescriptorBuilder, Resolver};
//!
//! #[derive(Clone)]
//! struct Reading { sensor_id: u32, label: String }
//!
//! #[derive(Default)]
//! struct ReadingDto { sensor_id: u32, label: String }
//!
//! let resolver = Resolver::new();
//! resolver.register(
//!     DescriptorBuilder::<Reading, ReadingDto>::value()
//!         .member("sensor_id", "sensor_id", |s: &Reading| &s.sensor_id,
//!                 |d: &mut ReadingDto, v| d.sensor_id = v)
//!         .member("label", "label", |s: &Reading| &s.label,
//!                 |d: &mut ReadingDto, v| d.label = v)
//!         .build(),
//! );
//!
//! let mapper = resolver.get_with_verify::<Reading, ReadingDto>().unwrap();
//! let out = mapper
//!     .map(&Reading { sensor_id: 7, label: "intake".into() }, &resolver)
//!     .unwrap();
//! assert_eq!(out.sensor_id, 7);
//! assert_eq!(resolver.build_count(), 1);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                       Resolver / Cache                       |
//! |   (TypeId, TypeId) -> CompiledMapper, build-once-per-key     |
//! +--------------------------------------------------------------+
//! |        Optional-Value Adapters   |   Sequence Adapter        |
//! +--------------------------------------------------------------+
//! |                      Mapper Synthesizer                      |
//! |   descriptor -> compiled ops (introspectable | transient)    |
//! +--------------------------------------------------------------+
//! |   Strategy Selector   |   Fast-Path Library (bulk copies)    |
//! +--------------------------------------------------------------+
//! |      Type Descriptor (builder / schema discovery output)     |
//! +--------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Resolver`] | Cache-plus-factory all mapper lookups flow through |
//! | [`CompiledMapper`] | Synthesized transform, `map(source, resolver)` |
//! | [`DescriptorBuilder`] | Fluent construction of a mapping descriptor |
//! | [`SourceSchema`] / [`DestSchema`] | Discovery contract for `build_mapper` |
//! | [`MapError`] | Synthesis and execution errors |

mod adapters;
mod descriptor;
mod error;
pub mod fastpath;
mod resolver;
mod schema;
mod strategy;
mod synth;

pub use descriptor::{
    AfterFn, BeforeFn, ConstructorPlan, DefaultFn, DescriptorBuilder, MappingDescriptor,
    MemberAssignment, ShapeKind, TypeTag,
};
pub use error::MapError;
pub use resolver::{PairKey, Resolver, ResolverOptions};
pub use schema::{
    build_mapper, identity, ConstructorSpec, DestField, DestSchema, SourceField, SourceSchema,
};
pub use strategy::{is_opaque, Strategy};
pub use synth::{CompiledMapper, MapperPlan, MemberPlan, SynthesisMode};
