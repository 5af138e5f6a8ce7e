// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Mapper synthesis: descriptor in, compiled transform out.
//!
//! Synthesis runs once per pair and produces a [`CompiledMapper`] whose
//! body applies, in order: before-hook, absent-source short-circuit (the
//! `Option`-keyed form), construction, member assignments in descriptor
//! order, after-hook. Two back-ends exist: the introspectable form keeps a
//! [`MapperPlan`] (member paths, strategies, type names) for offline
//! inspection; the transient form skips all metadata. Both produce
//! observably identical mapping behavior — the choice is configuration,
//! never correctness.
//!
//! Synthesis itself performs no resolver lookups. Delegated member sites
//! capture their pair key and resolve through the cache at invocation
//! time, which is what lets self- and mutually-referential type graphs
//! build without cycles.

use crate::descriptor::{
    AssignmentSource, ConstructFn, MappingDescriptor, MemberAssignment, ShapeKind, TypeTag,
};
use crate::error::MapError;
use crate::fastpath;
use crate::resolver::Resolver;
use crate::strategy::{self, Strategy};
use std::any::Any;
use std::fmt::Write as _;
use std::sync::Arc;

/// Synthesis back-end selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Named mappers that retain a [`MapperPlan`].
    Introspectable,
    /// Anonymous mappers, no metadata; faster to build.
    Transient,
}

impl Default for SynthesisMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            SynthesisMode::Introspectable
        } else {
            SynthesisMode::Transient
        }
    }
}

/// Per-member entry of a [`MapperPlan`].
#[derive(Debug, Clone)]
pub struct MemberPlan {
    pub source: Option<String>,
    pub dest: String,
    pub strategy: Strategy,
    pub source_type: Option<&'static str>,
    pub dest_type: &'static str,
    pub converted: bool,
}

/// Introspectable record of a synthesized mapper.
#[derive(Debug, Clone)]
pub struct MapperPlan {
    pub name: String,
    pub source: &'static str,
    pub dest: &'static str,
    pub nullable: bool,
    pub constructor_args: Option<Vec<String>>,
    pub has_before: bool,
    pub has_after: bool,
    pub members: Vec<MemberPlan>,
}

impl MapperPlan {
    /// Render the plan as text, one line per member.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}{}",
            self.name,
            if self.nullable { " (absent-aware)" } else { "" }
        );
        match &self.constructor_args {
            Some(args) => {
                let _ = writeln!(out, "  construct: [{}]", args.join(", "));
            }
            None => {
                let _ = writeln!(out, "  construct: zero-init");
            }
        }
        if self.has_before {
            let _ = writeln!(out, "  before-hook");
        }
        for member in &self.members {
            let source = member.source.as_deref().unwrap_or("<generated>");
            let _ = writeln!(
                out,
                "  {} <- {} [{}] {}{}",
                member.dest,
                source,
                member.strategy,
                member.dest_type,
                if member.converted { " (converted)" } else { "" }
            );
        }
        if self.has_after {
            let _ = writeln!(out, "  after-hook");
        }
        out
    }
}

pub(crate) type RunFn<S, D> = Arc<dyn Fn(&S, &Resolver) -> Result<D, MapError> + Send + Sync>;
type OpFn<S, D> = Arc<dyn Fn(&S, &mut D, &Resolver) -> Result<(), MapError> + Send + Sync>;

/// A compiled source-to-destination transform.
///
/// Exactly one live instance exists per pair in a given resolver. The
/// mapper is immutable after construction — hooks and bound converters are
/// captured at build time — and safe for unbounded concurrent invocation.
pub struct CompiledMapper<S, D> {
    plan: Option<MapperPlan>,
    run: RunFn<S, D>,
}

impl<S: 'static, D: 'static> CompiledMapper<S, D> {
    /// Sole runtime entry point.
    pub fn map(&self, source: &S, resolver: &Resolver) -> Result<D, MapError> {
        (self.run)(source, resolver)
    }

    /// The synthesis plan, if this mapper was built introspectable.
    pub fn plan(&self) -> Option<&MapperPlan> {
        self.plan.as_ref()
    }

    /// Rendered plan text for offline inspection.
    pub fn describe(&self) -> Option<String> {
        self.plan.as_ref().map(MapperPlan::render)
    }

    pub(crate) fn from_run(run: RunFn<S, D>) -> Self {
        Self { plan: None, run }
    }
}

impl<S, D> std::fmt::Debug for CompiledMapper<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledMapper")
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

/// Type-erased invocation surface used by delegated member sites.
pub(crate) trait ErasedMapper: Send + Sync {
    fn map_erased(&self, source: &dyn Any, resolver: &Resolver)
        -> Result<Box<dyn Any>, MapError>;
}

impl<S: 'static, D: 'static> ErasedMapper for CompiledMapper<S, D> {
    fn map_erased(
        &self,
        source: &dyn Any,
        resolver: &Resolver,
    ) -> Result<Box<dyn Any>, MapError> {
        let source = source
            .downcast_ref::<S>()
            .ok_or_else(|| MapError::MemberType {
                member: "delegated source".to_string(),
                expected: std::any::type_name::<S>(),
            })?;
        Ok(Box::new(self.map(source, resolver)?))
    }
}

/// Synthesize the plain form: the source is always present.
pub(crate) fn synthesize<S: 'static, D: 'static>(
    desc: &MappingDescriptor<S, D>,
    mode: SynthesisMode,
    seq: u64,
) -> Result<CompiledMapper<S, D>, MapError> {
    let construct = construct_fn(desc)?;
    let (ops, members) = compile_ops(desc);
    log::trace!(
        "[synth] compile {} -> {} ({} members)",
        desc.source_ty.name,
        desc.dest_ty.name,
        ops.len()
    );

    let before = desc.before.clone();
    let after = desc.after.clone();
    let run: RunFn<S, D> = Arc::new(move |source: &S, resolver: &Resolver| {
        if let Some(hook) = &before {
            hook(Some(source));
        }
        let mut dest = construct(source)?;
        for op in ops.iter() {
            op(source, &mut dest, resolver)?;
        }
        if let Some(hook) = &after {
            hook(&mut dest);
        }
        Ok(dest)
    });

    Ok(CompiledMapper {
        plan: plan_for(desc, mode, seq, members, false, desc.source_ty, desc.dest_ty),
        run,
    })
}

/// Synthesize the `Option`-keyed form for reference-shaped sources.
///
/// The before-hook receives the raw source unconditionally — absent
/// included — *then* an absent source returns an absent destination
/// without construction, member assignments, or the after-hook. This
/// ordering is part of the contract.
pub(crate) fn synthesize_nullable<S: 'static, D: 'static>(
    desc: &MappingDescriptor<S, D>,
    mode: SynthesisMode,
    seq: u64,
) -> Result<CompiledMapper<Option<S>, Option<D>>, MapError> {
    let construct = construct_fn(desc)?;
    let (ops, members) = compile_ops(desc);

    let before = desc.before.clone();
    let after = desc.after.clone();
    let run: RunFn<Option<S>, Option<D>> =
        Arc::new(move |source: &Option<S>, resolver: &Resolver| {
            if let Some(hook) = &before {
                hook(source.as_ref());
            }
            let Some(inner) = source.as_ref() else {
                return Ok(None);
            };
            let mut dest = construct(inner)?;
            for op in ops.iter() {
                op(inner, &mut dest, resolver)?;
            }
            if let Some(hook) = &after {
                hook(&mut dest);
            }
            Ok(Some(dest))
        });

    Ok(CompiledMapper {
        plan: plan_for(
            desc,
            mode,
            seq,
            members,
            true,
            TypeTag::of::<Option<S>>(),
            TypeTag::of::<Option<D>>(),
        ),
        run,
    })
}

/// Resolve the construction path, or fail now — never at first call.
fn construct_fn<S: 'static, D: 'static>(
    desc: &MappingDescriptor<S, D>,
) -> Result<ConstructFn<S, D>, MapError> {
    if let Some(plan) = &desc.constructor {
        return Ok(plan.construct.clone());
    }
    match desc.dest_shape {
        ShapeKind::Value => {
            if let Some(init) = desc.default_init.clone() {
                return Ok(Arc::new(move |_source| Ok(init())));
            }
            Err(MapError::MissingConstructor {
                source: desc.source_ty.name,
                dest: desc.dest_ty.name,
            })
        }
        // No default-construct-then-assign path exists for reference shapes.
        ShapeKind::Reference => Err(MapError::MissingConstructor {
            source: desc.source_ty.name,
            dest: desc.dest_ty.name,
        }),
    }
}

fn compile_ops<S: 'static, D: 'static>(
    desc: &MappingDescriptor<S, D>,
) -> (Vec<OpFn<S, D>>, Vec<MemberPlan>) {
    let mut ops = Vec::with_capacity(desc.assignments.len());
    let mut plans = Vec::with_capacity(desc.assignments.len());
    for assignment in &desc.assignments {
        let strategy = strategy::select(assignment);
        plans.push(MemberPlan {
            source: assignment.source_path.clone(),
            dest: assignment.dest_path.clone(),
            strategy,
            source_type: assignment.source_ty.map(|t| t.name),
            dest_type: assignment.dest_ty.name,
            converted: assignment.convert.is_some(),
        });
        ops.push(compile_op(assignment, strategy));
    }
    (ops, plans)
}

fn compile_op<S: 'static, D: 'static>(
    assignment: &MemberAssignment<S, D>,
    strategy: Strategy,
) -> OpFn<S, D> {
    let sink = assignment.sink.clone();
    let convert = assignment.convert.clone();
    match &assignment.source {
        AssignmentSource::Generated { generate } => {
            let generate = generate.clone();
            Arc::new(move |source, dest, _resolver| {
                let mut value = generate(source);
                if let Some(convert) = &convert {
                    value = convert(value)?;
                }
                sink(dest, value)
            })
        }
        AssignmentSource::Member { borrow, read } => match strategy {
            Strategy::Direct => {
                let read = read.clone();
                Arc::new(move |source, dest, _resolver| {
                    let mut value = read(source);
                    if let Some(convert) = &convert {
                        value = convert(value)?;
                    }
                    sink(dest, value)
                })
            }
            Strategy::BulkCopy => {
                let borrow = borrow.clone();
                let dest_path = assignment.dest_path.clone();
                let ty = assignment.dest_ty;
                // The selector only picks BulkCopy off a table hit.
                let copier = fastpath::copier_for(ty.id).expect("bulk table entry");
                Arc::new(move |source, dest, _resolver| {
                    let mut value =
                        copier(borrow(source)).ok_or_else(|| MapError::MemberType {
                            member: dest_path.clone(),
                            expected: ty.name,
                        })?;
                    if let Some(convert) = &convert {
                        value = convert(value)?;
                    }
                    sink(dest, value)
                })
            }
            _ => {
                let borrow = borrow.clone();
                // Delegated sites bind the pair key only; the concrete
                // mapper is resolved through the cache at invocation time.
                let source_ty = assignment.source_ty.unwrap_or(assignment.dest_ty);
                let dest_ty = assignment.dest_ty;
                Arc::new(move |source, dest, resolver| {
                    let mapper = resolver.erased_with_verify(
                        (source_ty.id, dest_ty.id),
                        source_ty.name,
                        dest_ty.name,
                    )?;
                    let mut value = mapper.map_erased(borrow(source), resolver)?;
                    if let Some(convert) = &convert {
                        value = convert(value)?;
                    }
                    sink(dest, value)
                })
            }
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn plan_for<S, D>(
    desc: &MappingDescriptor<S, D>,
    mode: SynthesisMode,
    seq: u64,
    members: Vec<MemberPlan>,
    nullable: bool,
    source_ty: TypeTag,
    dest_ty: TypeTag,
) -> Option<MapperPlan> {
    match mode {
        SynthesisMode::Transient => None,
        SynthesisMode::Introspectable => Some(MapperPlan {
            name: format!("Mapper#{}: {} -> {}", seq, source_ty.name, dest_ty.name),
            source: source_ty.name,
            dest: dest_ty.name,
            nullable,
            constructor_args: desc.constructor.as_ref().map(|p| p.args().to_vec()),
            has_before: desc.before.is_some(),
            has_after: desc.after.is_some(),
            members,
        }),
    }
}
