// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Schema discovery contract and the top-level mapper factory.
//!
//! Member and constructor metadata comes from outside this core — a derive,
//! a code generator, or a hand-written impl. The [`SourceSchema`] and
//! [`DestSchema`] traits are the shape of that collaborator's output:
//! erased per-field accessors and sinks plus type tags, an optional
//! constructor spec, and optional hooks. [`build_mapper`] pairs destination
//! fields with source fields through a name-mutation function, registers
//! the derived descriptor, and resolves — or refuses, when either side is
//! an opaque type this core never decomposes.

use crate::descriptor::{
    AfterFn, BeforeFn, BorrowFn, ConstructorPlan, DefaultFn, ErasedValue, MappingDescriptor,
    MemberAssignment, ReadFn, ShapeKind, SinkFn, TypeTag, erase_sink,
};
use crate::error::MapError;
use crate::resolver::Resolver;
use crate::strategy;
use crate::synth::CompiledMapper;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// One readable member of a source shape.
pub struct SourceField<S> {
    pub name: &'static str,
    pub ty: TypeTag,
    pub(crate) borrow: BorrowFn<S>,
    pub(crate) read: ReadFn<S>,
}

impl<S: 'static> SourceField<S> {
    pub fn new<M: Clone + 'static>(
        name: &'static str,
        access: impl for<'a> Fn(&'a S) -> &'a M + Send + Sync + 'static,
    ) -> Self {
        let access = Arc::new(access);
        let borrow: BorrowFn<S> = {
            let access = Arc::clone(&access);
            Arc::new(move |s| access(s) as &dyn Any)
        };
        let read: ReadFn<S> = Arc::new(move |s| Box::new(access(s).clone()) as ErasedValue);
        Self {
            name,
            ty: TypeTag::of::<M>(),
            borrow,
            read,
        }
    }
}

/// One writable member of a destination shape.
pub struct DestField<D> {
    pub name: &'static str,
    pub ty: TypeTag,
    pub(crate) sink: SinkFn<D>,
}

impl<D: 'static> DestField<D> {
    pub fn new<M: 'static>(
        name: &'static str,
        store: impl Fn(&mut D, M) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            ty: TypeTag::of::<M>(),
            sink: erase_sink::<D, M>(name, store),
        }
    }
}

/// Constructor metadata: ordered, name-matched parameters plus the
/// instantiation closure over their erased values.
pub struct ConstructorSpec<D> {
    params: Vec<(&'static str, TypeTag)>,
    build: Arc<dyn Fn(Vec<ErasedValue>) -> Result<D, MapError> + Send + Sync>,
}

impl<D: 'static> ConstructorSpec<D> {
    pub fn with1<A: 'static>(
        a: &'static str,
        build: impl Fn(A) -> D + Send + Sync + 'static,
    ) -> Self {
        Self {
            params: vec![(a, TypeTag::of::<A>())],
            build: Arc::new(move |mut args| {
                let va = take_arg::<A, D>(&mut args, a)?;
                Ok(build(va))
            }),
        }
    }

    pub fn with2<A: 'static, B: 'static>(
        a: &'static str,
        b: &'static str,
        build: impl Fn(A, B) -> D + Send + Sync + 'static,
    ) -> Self {
        Self {
            params: vec![(a, TypeTag::of::<A>()), (b, TypeTag::of::<B>())],
            build: Arc::new(move |mut args| {
                let vb = take_arg::<B, D>(&mut args, b)?;
                let va = take_arg::<A, D>(&mut args, a)?;
                Ok(build(va, vb))
            }),
        }
    }

    pub fn with3<A: 'static, B: 'static, C: 'static>(
        a: &'static str,
        b: &'static str,
        c: &'static str,
        build: impl Fn(A, B, C) -> D + Send + Sync + 'static,
    ) -> Self {
        Self {
            params: vec![
                (a, TypeTag::of::<A>()),
                (b, TypeTag::of::<B>()),
                (c, TypeTag::of::<C>()),
            ],
            build: Arc::new(move |mut args| {
                let vc = take_arg::<C, D>(&mut args, c)?;
                let vb = take_arg::<B, D>(&mut args, b)?;
                let va = take_arg::<A, D>(&mut args, a)?;
                Ok(build(va, vb, vc))
            }),
        }
    }

    pub fn params(&self) -> &[(&'static str, TypeTag)] {
        &self.params
    }
}

/// Pops the next argument off the end of the (declaration-ordered) list.
fn take_arg<T: 'static, D>(args: &mut Vec<ErasedValue>, param: &'static str) -> Result<T, MapError> {
    let value = args.pop().ok_or_else(|| MapError::ConstructorArg {
        param: param.to_string(),
        dest: type_name::<D>(),
    })?;
    let value = value.downcast::<T>().map_err(|_| MapError::ConstructorArg {
        param: param.to_string(),
        dest: type_name::<D>(),
    })?;
    Ok(*value)
}

/// Source-side discovery output.
pub trait SourceSchema: Sized + 'static {
    fn source_fields() -> Vec<SourceField<Self>>;

    fn shape() -> ShapeKind {
        ShapeKind::Value
    }

    fn before() -> Option<BeforeFn<Self>> {
        None
    }
}

/// Destination-side discovery output.
///
/// Value shapes without a constructor must supply `default_init`;
/// reference shapes must supply a constructor or synthesis refuses.
pub trait DestSchema: Sized + 'static {
    fn dest_fields() -> Vec<DestField<Self>>;

    fn constructor() -> Option<ConstructorSpec<Self>> {
        None
    }

    fn default_init() -> Option<DefaultFn<Self>> {
        None
    }

    fn shape() -> ShapeKind {
        ShapeKind::Value
    }

    fn after() -> Option<AfterFn<Self>> {
        None
    }
}

/// The identity name mutation.
pub fn identity(name: &str) -> String {
    name.to_string()
}

/// Top-level factory: derive the descriptor for (S, D) through the name
/// mutator, register it, and resolve the mapper.
///
/// Returns `Ok(None)` when either side is in the fixed opaque set —
/// scalar and opaque kinds are never decomposed here and remain the
/// caller's business.
pub fn build_mapper<S: SourceSchema, D: DestSchema>(
    resolver: &Resolver,
    mutate: impl Fn(&str) -> String,
) -> Result<Option<Arc<CompiledMapper<S, D>>>, MapError> {
    if strategy::is_opaque(TypeId::of::<S>()) || strategy::is_opaque(TypeId::of::<D>()) {
        return Ok(None);
    }
    let descriptor = derive_descriptor::<S, D>(&mutate)?;
    resolver.register(descriptor);
    resolver.get::<S, D>()
}

/// Pair destination members with source members by mutated name.
///
/// A destination member with no matching source member is skipped — its
/// value is the constructor's or the hooks' business. Field order and the
/// mutation function fully determine the result, so the same inputs always
/// derive an equivalent descriptor.
fn derive_descriptor<S: SourceSchema, D: DestSchema>(
    mutate: &impl Fn(&str) -> String,
) -> Result<MappingDescriptor<S, D>, MapError> {
    let source_fields = S::source_fields();
    let dest_fields = D::dest_fields();

    let by_mutated_name: HashMap<String, &SourceField<S>> = source_fields
        .iter()
        .map(|field| (mutate(field.name), field))
        .collect();

    let mut assignments = Vec::with_capacity(dest_fields.len());
    for dest_field in &dest_fields {
        if let Some(source_field) = by_mutated_name.get(dest_field.name) {
            assignments.push(MemberAssignment::from_parts(
                source_field.name,
                dest_field.name,
                source_field.ty,
                dest_field.ty,
                Arc::clone(&source_field.borrow),
                Arc::clone(&source_field.read),
                Arc::clone(&dest_field.sink),
            ));
        }
    }

    let constructor = match D::constructor() {
        None => None,
        Some(spec) => Some(bind_constructor::<S, D>(spec, &source_fields, mutate)?),
    };

    Ok(MappingDescriptor {
        source_ty: TypeTag::of::<S>(),
        dest_ty: TypeTag::of::<D>(),
        source_shape: S::shape(),
        dest_shape: D::shape(),
        assignments,
        constructor,
        default_init: D::default_init(),
        before: S::before(),
        after: D::after(),
    })
}

/// Bind constructor parameters to source fields: mutated name plus exact
/// type. A miss is a configuration error — no implicit conversions.
fn bind_constructor<S: SourceSchema, D: DestSchema>(
    spec: ConstructorSpec<D>,
    source_fields: &[SourceField<S>],
    mutate: &impl Fn(&str) -> String,
) -> Result<ConstructorPlan<S, D>, MapError> {
    let ConstructorSpec { params, build } = spec;
    let mut readers: Vec<ReadFn<S>> = Vec::with_capacity(params.len());
    let mut names = Vec::with_capacity(params.len());
    for (param, ty) in &params {
        let field = source_fields
            .iter()
            .find(|f| mutate(f.name) == *param && f.ty.id == ty.id)
            .ok_or_else(|| MapError::ConstructorArg {
                param: (*param).to_string(),
                dest: type_name::<D>(),
            })?;
        readers.push(Arc::clone(&field.read));
        names.push((*param).to_string());
    }
    Ok(ConstructorPlan {
        args: names,
        construct: Arc::new(move |source| {
            let args: Vec<ErasedValue> = readers.iter().map(|read| read(source)).collect();
            build(args)
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Account {
        account_id: u64,
        account_name: String,
        region: String,
    }

    struct AccountDto {
        id: u64,
        name: String,
        region: String,
    }

    impl SourceSchema for Account {
        fn source_fields() -> Vec<SourceField<Self>> {
            vec![
                SourceField::new("account_id", |s: &Account| &s.account_id),
                SourceField::new("account_name", |s: &Account| &s.account_name),
                SourceField::new("region", |s: &Account| &s.region),
            ]
        }
    }

    impl DestSchema for AccountDto {
        fn dest_fields() -> Vec<DestField<Self>> {
            vec![
                DestField::new("id", |d: &mut AccountDto, v| d.id = v),
                DestField::new("name", |d: &mut AccountDto, v| d.name = v),
                DestField::new("region", |d: &mut AccountDto, v: String| d.region = v),
            ]
        }

        fn constructor() -> Option<ConstructorSpec<Self>> {
            Some(ConstructorSpec::with2(
                "id",
                "name",
                |id: u64, name: String| AccountDto {
                    id,
                    name,
                    region: String::new(),
                },
            ))
        }

        fn shape() -> ShapeKind {
            ShapeKind::Reference
        }
    }

    fn strip_prefix(name: &str) -> String {
        name.strip_prefix("account_").unwrap_or(name).to_string()
    }

    #[test]
    fn name_mutation_pairs_members_and_constructor() {
        let resolver = Resolver::new();
        let mapper = build_mapper::<Account, AccountDto>(&resolver, strip_prefix)
            .expect("derive")
            .expect("mapper");

        let out = mapper
            .map(
                &Account {
                    account_id: 41,
                    account_name: "ops".to_string(),
                    region: "eu-1".to_string(),
                },
                &resolver,
            )
            .expect("map");
        assert_eq!(out.id, 41);
        assert_eq!(out.name, "ops");
        assert_eq!(out.region, "eu-1");
    }

    #[test]
    fn unbindable_constructor_parameter_is_a_configuration_error() {
        let resolver = Resolver::new();
        // The identity mutation leaves "account_id" unmatched with "id".
        let err = build_mapper::<Account, AccountDto>(&resolver, identity).unwrap_err();
        assert!(matches!(err, MapError::ConstructorArg { .. }));
    }

    #[test]
    fn opaque_pairs_are_refused() {
        impl SourceSchema for String {
            fn source_fields() -> Vec<SourceField<Self>> {
                Vec::new()
            }
        }
        impl DestSchema for String {
            fn dest_fields() -> Vec<DestField<Self>> {
                Vec::new()
            }
        }

        let resolver = Resolver::new();
        let mapper = build_mapper::<String, String>(&resolver, identity).expect("factory");
        assert!(mapper.is_none());
    }
}
