// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Mapping descriptors: the static, per-pair plan the synthesizer consumes.
//!
//! A [`MappingDescriptor`] is built once per (source, destination) pair —
//! either through the fluent [`DescriptorBuilder`] or derived from the
//! schema traits — and is immutable afterwards. It carries the ordered
//! member assignments, an optional constructor plan, and optional
//! before/after hooks. Member order is significant and preserved exactly at
//! execution time.

use crate::error::MapError;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Identifies a member or pair type: `TypeId` for equality checks against
/// the closed strategy tables, plus the type name for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeTag {
    pub id: TypeId,
    pub name: &'static str,
}

impl TypeTag {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

/// Shape of a pair side.
///
/// `Reference` destinations must carry a constructor plan; `Value`
/// destinations may zero-initialize instead. A `Reference` source pair
/// additionally publishes an `Option`-keyed form with the absent-source
/// short-circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Reference,
    Value,
}

/// Type-erased member value in flight between an accessor and a sink.
pub(crate) type ErasedValue = Box<dyn Any>;

/// Borrowing accessor: lends a member of the source as `&dyn Any`.
pub(crate) type BorrowFn<S> = Arc<dyn for<'a> Fn(&'a S) -> &'a (dyn Any) + Send + Sync>;
/// Cloning accessor: reads a member of the source as an owned erased value.
pub(crate) type ReadFn<S> = Arc<dyn Fn(&S) -> ErasedValue + Send + Sync>;
/// Generator: derives a destination member value from the whole source.
pub(crate) type GeneratorFn<S> = Arc<dyn Fn(&S) -> ErasedValue + Send + Sync>;
/// Sink: stores an erased value into its destination member.
pub(crate) type SinkFn<D> = Arc<dyn Fn(&mut D, ErasedValue) -> Result<(), MapError> + Send + Sync>;
/// Custom converter, applied to the destination-typed value before the sink.
pub(crate) type ConvertFn = Arc<dyn Fn(ErasedValue) -> Result<ErasedValue, MapError> + Send + Sync>;
/// Construction closure derived from a plan or a zero-initializer.
pub(crate) type ConstructFn<S, D> = Arc<dyn Fn(&S) -> Result<D, MapError> + Send + Sync>;
/// Zero-initializer for value-shaped destinations without a plan.
pub type DefaultFn<D> = Arc<dyn Fn() -> D + Send + Sync>;

/// Before-hook: receives the raw source unconditionally, absent included.
pub type BeforeFn<S> = Arc<dyn Fn(Option<&S>) + Send + Sync>;
/// After-hook: receives the fully populated destination before return.
pub type AfterFn<D> = Arc<dyn Fn(&mut D) + Send + Sync>;

/// Where a member value comes from.
pub(crate) enum AssignmentSource<S> {
    /// Read from a source member.
    Member {
        borrow: BorrowFn<S>,
        read: ReadFn<S>,
    },
    /// No source member; the generator produces the value.
    Generated { generate: GeneratorFn<S> },
}

/// One (source-read, destination-write) pairing.
///
/// The strategy is not stored here: it is resolved by the selector when the
/// descriptor is synthesized, and recorded in the mapper plan.
pub struct MemberAssignment<S, D> {
    pub(crate) source_path: Option<String>,
    pub(crate) dest_path: String,
    pub(crate) source_ty: Option<TypeTag>,
    pub(crate) dest_ty: TypeTag,
    pub(crate) source: AssignmentSource<S>,
    pub(crate) sink: SinkFn<D>,
    pub(crate) convert: Option<ConvertFn>,
}

impl<S: 'static, D: 'static> MemberAssignment<S, D> {
    /// Pair an erased source accessor with an erased destination sink.
    /// Used by the schema-derivation path; the builder goes through the
    /// typed `member*` methods instead.
    pub(crate) fn from_parts(
        source_path: impl Into<String>,
        dest_path: impl Into<String>,
        source_ty: TypeTag,
        dest_ty: TypeTag,
        borrow: BorrowFn<S>,
        read: ReadFn<S>,
        sink: SinkFn<D>,
    ) -> Self {
        Self {
            source_path: Some(source_path.into()),
            dest_path: dest_path.into(),
            source_ty: Some(source_ty),
            dest_ty,
            source: AssignmentSource::Member { borrow, read },
            sink,
            convert: None,
        }
    }

    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn dest_path(&self) -> &str {
        &self.dest_path
    }
}

/// Ordered source-derived arguments used to instantiate the destination.
pub struct ConstructorPlan<S, D> {
    pub(crate) args: Vec<String>,
    pub(crate) construct: ConstructFn<S, D>,
}

impl<S, D> ConstructorPlan<S, D> {
    /// Argument names, in invocation order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Static, per-pair mapping plan. Immutable once built.
pub struct MappingDescriptor<S, D> {
    pub(crate) source_ty: TypeTag,
    pub(crate) dest_ty: TypeTag,
    pub(crate) source_shape: ShapeKind,
    pub(crate) dest_shape: ShapeKind,
    pub(crate) assignments: Vec<MemberAssignment<S, D>>,
    pub(crate) constructor: Option<ConstructorPlan<S, D>>,
    pub(crate) default_init: Option<DefaultFn<D>>,
    pub(crate) before: Option<BeforeFn<S>>,
    pub(crate) after: Option<AfterFn<D>>,
}

impl<S: 'static, D: 'static> MappingDescriptor<S, D> {
    pub fn source_shape(&self) -> ShapeKind {
        self.source_shape
    }

    pub fn dest_shape(&self) -> ShapeKind {
        self.dest_shape
    }

    /// Member assignments in execution order.
    pub fn assignments(&self) -> &[MemberAssignment<S, D>] {
        &self.assignments
    }
}

/// Fluent builder for [`MappingDescriptor`].
///
/// `value()` starts a value-shaped pair (the destination zero-initializes
/// when no constructor plan is given); `reference()` starts a
/// reference-shaped pair (a constructor plan is mandatory and its absence
/// is a synthesis-time error).
pub struct DescriptorBuilder<S, D> {
    source_shape: ShapeKind,
    dest_shape: ShapeKind,
    assignments: Vec<MemberAssignment<S, D>>,
    constructor: Option<ConstructorPlan<S, D>>,
    default_init: Option<DefaultFn<D>>,
    before: Option<BeforeFn<S>>,
    after: Option<AfterFn<D>>,
}

impl<S: 'static, D: 'static> DescriptorBuilder<S, D> {
    /// Start a value-shaped pair. Without an explicit constructor the
    /// destination is zero-initialized and members are assigned onto it.
    pub fn value() -> Self
    where
        D: Default,
    {
        Self {
            source_shape: ShapeKind::Value,
            dest_shape: ShapeKind::Value,
            assignments: Vec::new(),
            constructor: None,
            default_init: Some(Arc::new(D::default)),
            before: None,
            after: None,
        }
    }

    /// Start a reference-shaped pair. A constructor plan is required.
    pub fn reference() -> Self {
        Self {
            source_shape: ShapeKind::Reference,
            dest_shape: ShapeKind::Reference,
            assignments: Vec::new(),
            constructor: None,
            default_init: None,
            before: None,
            after: None,
        }
    }

    /// Add a member copied between identically typed sides.
    pub fn member<M>(
        self,
        source: &str,
        dest: &str,
        access: impl for<'a> Fn(&'a S) -> &'a M + Send + Sync + 'static,
        store: impl Fn(&mut D, M) + Send + Sync + 'static,
    ) -> Self
    where
        M: Clone + 'static,
    {
        self.member_as::<M, M>(source, dest, access, store)
    }

    /// Add an identically typed member with a custom converter applied to
    /// the value before it is stored.
    pub fn member_with<M>(
        self,
        source: &str,
        dest: &str,
        access: impl for<'a> Fn(&'a S) -> &'a M + Send + Sync + 'static,
        convert: impl Fn(M) -> M + Send + Sync + 'static,
        store: impl Fn(&mut D, M) + Send + Sync + 'static,
    ) -> Self
    where
        M: Clone + 'static,
    {
        self.member_as_with::<M, M>(source, dest, access, convert, store)
    }

    /// Add a member whose source and destination types differ. The pair
    /// `(MS, MD)` is resolved through the resolver at invocation time.
    pub fn member_as<MS, MD>(
        mut self,
        source: &str,
        dest: &str,
        access: impl for<'a> Fn(&'a S) -> &'a MS + Send + Sync + 'static,
        store: impl Fn(&mut D, MD) + Send + Sync + 'static,
    ) -> Self
    where
        MS: Clone + 'static,
        MD: 'static,
    {
        self.assignments
            .push(make_member::<S, D, MS, MD>(source, dest, access, store, None));
        self
    }

    /// [`Self::member_as`] with a converter applied to the mapped value.
    pub fn member_as_with<MS, MD>(
        mut self,
        source: &str,
        dest: &str,
        access: impl for<'a> Fn(&'a S) -> &'a MS + Send + Sync + 'static,
        convert: impl Fn(MD) -> MD + Send + Sync + 'static,
        store: impl Fn(&mut D, MD) + Send + Sync + 'static,
    ) -> Self
    where
        MS: Clone + 'static,
        MD: 'static,
    {
        let convert = erase_convert::<MD>(dest, convert);
        self.assignments.push(make_member::<S, D, MS, MD>(
            source,
            dest,
            access,
            store,
            Some(convert),
        ));
        self
    }

    /// Add a member with no source accessor: the generator derives the
    /// value from the whole source instance.
    pub fn generated<M>(
        mut self,
        dest: &str,
        generate: impl Fn(&S) -> M + Send + Sync + 'static,
        store: impl Fn(&mut D, M) + Send + Sync + 'static,
    ) -> Self
    where
        M: 'static,
    {
        let dest_path = dest.to_string();
        let sink = erase_sink::<D, M>(dest, store);
        self.assignments.push(MemberAssignment {
            source_path: None,
            dest_path,
            source_ty: None,
            dest_ty: TypeTag::of::<M>(),
            source: AssignmentSource::Generated {
                generate: Arc::new(move |s| Box::new(generate(s)) as ErasedValue),
            },
            sink,
            convert: None,
        });
        self
    }

    /// Set the constructor plan: ordered argument names plus the closure
    /// that instantiates the destination from the source.
    pub fn constructor(
        mut self,
        args: &[&str],
        construct: impl Fn(&S) -> D + Send + Sync + 'static,
    ) -> Self {
        self.constructor = Some(ConstructorPlan {
            args: args.iter().map(|a| (*a).to_string()).collect(),
            construct: Arc::new(move |s| Ok(construct(s))),
        });
        self
    }

    /// Hook invoked with the raw source before anything else, including
    /// when the source is absent.
    pub fn before(mut self, hook: impl Fn(Option<&S>) + Send + Sync + 'static) -> Self {
        self.before = Some(Arc::new(hook));
        self
    }

    /// Hook invoked with the fully populated destination, after all member
    /// assignments and immediately before return.
    pub fn after(mut self, hook: impl Fn(&mut D) + Send + Sync + 'static) -> Self {
        self.after = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> MappingDescriptor<S, D> {
        MappingDescriptor {
            source_ty: TypeTag::of::<S>(),
            dest_ty: TypeTag::of::<D>(),
            source_shape: self.source_shape,
            dest_shape: self.dest_shape,
            assignments: self.assignments,
            constructor: self.constructor,
            default_init: self.default_init,
            before: self.before,
            after: self.after,
        }
    }
}

fn make_member<S, D, MS, MD>(
    source: &str,
    dest: &str,
    access: impl for<'a> Fn(&'a S) -> &'a MS + Send + Sync + 'static,
    store: impl Fn(&mut D, MD) + Send + Sync + 'static,
    convert: Option<ConvertFn>,
) -> MemberAssignment<S, D>
where
    S: 'static,
    D: 'static,
    MS: Clone + 'static,
    MD: 'static,
{
    let access = Arc::new(access);
    let borrow: BorrowFn<S> = {
        let access = Arc::clone(&access);
        Arc::new(move |s| access(s) as &dyn Any)
    };
    let read: ReadFn<S> = Arc::new(move |s| Box::new(access(s).clone()) as ErasedValue);
    MemberAssignment {
        source_path: Some(source.to_string()),
        dest_path: dest.to_string(),
        source_ty: Some(TypeTag::of::<MS>()),
        dest_ty: TypeTag::of::<MD>(),
        source: AssignmentSource::Member { borrow, read },
        sink: erase_sink::<D, MD>(dest, store),
        convert,
    }
}

pub(crate) fn erase_sink<D, M>(
    dest: &str,
    store: impl Fn(&mut D, M) + Send + Sync + 'static,
) -> SinkFn<D>
where
    M: 'static,
{
    let dest = dest.to_string();
    Arc::new(move |d, value| {
        let value = value.downcast::<M>().map_err(|_| MapError::MemberType {
            member: dest.clone(),
            expected: std::any::type_name::<M>(),
        })?;
        store(d, *value);
        Ok(())
    })
}

fn erase_convert<M>(dest: &str, convert: impl Fn(M) -> M + Send + Sync + 'static) -> ConvertFn
where
    M: 'static,
{
    let dest = dest.to_string();
    Arc::new(move |value| {
        let value = value.downcast::<M>().map_err(|_| MapError::MemberType {
            member: dest.clone(),
            expected: std::any::type_name::<M>(),
        })?;
        Ok(Box::new(convert(*value)) as ErasedValue)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Device {
        id: u32,
        label: String,
    }

    #[derive(Default)]
    struct DeviceDto {
        id: u32,
        label: String,
    }

    #[test]
    fn builder_preserves_member_order() {
        let desc = DescriptorBuilder::<Device, DeviceDto>::value()
            .member("id", "id", |s: &Device| &s.id, |d: &mut DeviceDto, v| d.id = v)
            .member(
                "label",
                "label",
                |s: &Device| &s.label,
                |d: &mut DeviceDto, v| d.label = v,
            )
            .build();

        let paths: Vec<&str> = desc.assignments().iter().map(|a| a.dest_path()).collect();
        assert_eq!(paths, vec!["id", "label"]);
        assert_eq!(desc.dest_shape(), ShapeKind::Value);
    }

    #[test]
    fn member_tags_capture_both_sides() {
        let desc = DescriptorBuilder::<Device, DeviceDto>::value()
            .member_as::<u32, u64>("id", "id", |s: &Device| &s.id, |_d, _v: u64| {})
            .build();

        let assign = &desc.assignments()[0];
        assert_eq!(assign.source_ty.map(|t| t.id), Some(TypeId::of::<u32>()));
        assert_eq!(assign.dest_ty.id, TypeId::of::<u64>());
    }

    #[test]
    fn generated_members_have_no_source_path() {
        let desc = DescriptorBuilder::<Device, DeviceDto>::value()
            .generated(
                "label",
                |s: &Device| format!("#{}", s.id),
                |d: &mut DeviceDto, v| d.label = v,
            )
            .build();

        let assign = &desc.assignments()[0];
        assert!(assign.source_path().is_none());
        assert_eq!(assign.dest_path(), "label");
    }

    #[test]
    fn sink_rejects_mistyped_values() {
        let sink = erase_sink::<DeviceDto, u32>("id", |d, v| d.id = v);
        let mut to = DeviceDto::default();
        let err = sink(&mut to, Box::new("oops".to_string())).unwrap_err();
        assert!(matches!(err, MapError::MemberType { .. }));
    }

    #[test]
    fn constructor_plan_records_arg_names() {
        let desc = DescriptorBuilder::<Device, DeviceDto>::reference()
            .constructor(&["id", "label"], |s: &Device| DeviceDto {
                id: s.id,
                label: s.label.clone(),
            })
            .build();

        let plan = desc.constructor.as_ref().expect("plan");
        assert_eq!(plan.args(), &["id".to_string(), "label".to_string()]);
    }
}
