// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 morph contributors

//! Mapping integration tests.
//!
//! Covers the end-to-end contract of a compiled pair:
//! - scalar members copy exactly, arrays copy into distinct allocations
//! - member order and hook ordering are preserved, absent source included
//! - construction errors surface at resolve time, never at first map
//! - both synthesis back-ends behave identically

use chrono::{TimeZone, Utc};
use morph::{DescriptorBuilder, MapError, Resolver, ResolverOptions, SynthesisMode};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Clone)]
struct Source {
    id: u32,
    name: String,
    tags: Vec<i32>,
}

#[derive(Default, Debug, PartialEq)]
struct Dest {
    id: u32,
    name: String,
    tags: Vec<i32>,
}

fn register_source_dest(resolver: &Resolver) {
    resolver.register(
        DescriptorBuilder::<Source, Dest>::value()
            .member("id", "id", |s: &Source| &s.id, |d: &mut Dest, v| d.id = v)
            .member("name", "name", |s: &Source| &s.name, |d: &mut Dest, v| {
                d.name = v;
            })
            .member("tags", "tags", |s: &Source| &s.tags, |d: &mut Dest, v| {
                d.tags = v;
            })
            .build(),
    );
}

#[test]
fn scalar_members_copy_exactly() {
    let resolver = Resolver::new();
    register_source_dest(&resolver);

    let mapper = resolver.get_with_verify::<Source, Dest>().expect("mapper");
    let out = mapper
        .map(
            &Source {
                id: 1,
                name: "a".to_string(),
                tags: Vec::new(),
            },
            &resolver,
        )
        .expect("map");

    assert_eq!(out.id, 1);
    assert_eq!(out.name, "a");
}

#[test]
fn array_members_copy_into_a_distinct_allocation() {
    let resolver = Resolver::new();
    register_source_dest(&resolver);

    let source = Source {
        id: 0,
        name: String::new(),
        tags: vec![1, 2, 3],
    };
    let mapper = resolver.get_with_verify::<Source, Dest>().expect("mapper");
    let out = mapper.map(&source, &resolver).expect("map");

    assert_eq!(out.tags, vec![1, 2, 3]);
    assert_eq!(out.tags.len(), source.tags.len());
    assert_ne!(out.tags.as_ptr(), source.tags.as_ptr());
}

#[test]
fn opaque_scalar_kinds_copy_verbatim() {
    #[derive(Clone)]
    struct Payment {
        id: Uuid,
        amount: Decimal,
        at: chrono::DateTime<Utc>,
        memo: Option<String>,
    }

    #[derive(Default, Debug, PartialEq)]
    struct PaymentDto {
        id: Option<Uuid>,
        amount: Decimal,
        at: Option<chrono::DateTime<Utc>>,
        memo: Option<String>,
    }

    let resolver = Resolver::new();
    resolver.register(
        DescriptorBuilder::<Payment, PaymentDto>::value()
            .generated("id", |s: &Payment| Some(s.id), |d: &mut PaymentDto, v| {
                d.id = v;
            })
            .member(
                "amount",
                "amount",
                |s: &Payment| &s.amount,
                |d: &mut PaymentDto, v| d.amount = v,
            )
            .generated("at", |s: &Payment| Some(s.at), |d: &mut PaymentDto, v| {
                d.at = v;
            })
            .member(
                "memo",
                "memo",
                |s: &Payment| &s.memo,
                |d: &mut PaymentDto, v| d.memo = v,
            )
            .build(),
    );

    let source = Payment {
        id: Uuid::new_v4(),
        amount: Decimal::new(120_050, 2),
        at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap(),
        memo: Some("invoice".to_string()),
    };
    let mapper = resolver.get_with_verify::<Payment, PaymentDto>().expect("mapper");
    let out = mapper.map(&source, &resolver).expect("map");

    assert_eq!(out.id, Some(source.id));
    assert_eq!(out.amount, source.amount);
    assert_eq!(out.at, Some(source.at));
    assert_eq!(out.memo, Some("invoice".to_string()));
}

#[test]
fn members_apply_in_descriptor_order() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    let second = Arc::clone(&order);

    let resolver = Resolver::new();
    resolver.register(
        DescriptorBuilder::<Source, Dest>::value()
            .member_with(
                "name",
                "name",
                |s: &Source| &s.name,
                move |v: String| {
                    first.lock().unwrap().push("name");
                    v
                },
                |d: &mut Dest, v| d.name = v,
            )
            .member_with(
                "id",
                "id",
                |s: &Source| &s.id,
                move |v: u32| {
                    second.lock().unwrap().push("id");
                    v
                },
                |d: &mut Dest, v| d.id = v,
            )
            .build(),
    );

    let mapper = resolver.get_with_verify::<Source, Dest>().expect("mapper");
    mapper
        .map(
            &Source {
                id: 5,
                name: "x".to_string(),
                tags: Vec::new(),
            },
            &resolver,
        )
        .expect("map");

    assert_eq!(*order.lock().unwrap(), vec!["name", "id"]);
}

#[test]
fn converters_post_process_member_values() {
    let resolver = Resolver::new();
    resolver.register(
        DescriptorBuilder::<Source, Dest>::value()
            .member_with(
                "name",
                "name",
                |s: &Source| &s.name,
                |v: String| v.to_uppercase(),
                |d: &mut Dest, v| d.name = v,
            )
            .build(),
    );

    let mapper = resolver.get_with_verify::<Source, Dest>().expect("mapper");
    let out = mapper
        .map(
            &Source {
                id: 0,
                name: "quiet".to_string(),
                tags: Vec::new(),
            },
            &resolver,
        )
        .expect("map");
    assert_eq!(out.name, "QUIET");
}

#[test]
fn generated_members_derive_from_the_whole_source() {
    let resolver = Resolver::new();
    resolver.register(
        DescriptorBuilder::<Source, Dest>::value()
            .generated(
                "name",
                |s: &Source| format!("{}#{}", s.name, s.id),
                |d: &mut Dest, v| d.name = v,
            )
            .build(),
    );

    let mapper = resolver.get_with_verify::<Source, Dest>().expect("mapper");
    let out = mapper
        .map(
            &Source {
                id: 12,
                name: "pump".to_string(),
                tags: Vec::new(),
            },
            &resolver,
        )
        .expect("map");
    assert_eq!(out.name, "pump#12");
}

#[derive(Clone)]
struct User {
    id: u32,
    name: String,
}

#[derive(Debug, PartialEq)]
struct UserDto {
    id: u32,
    name: String,
}

fn register_user_with_hooks(resolver: &Resolver, events: &Arc<Mutex<Vec<String>>>) {
    let before_log = Arc::clone(events);
    let convert_log = Arc::clone(events);
    let after_log = Arc::clone(events);
    resolver.register(
        DescriptorBuilder::<User, UserDto>::reference()
            .constructor(&["id"], |s: &User| UserDto {
                id: s.id,
                name: String::new(),
            })
            .member_with(
                "name",
                "name",
                |s: &User| &s.name,
                move |v: String| {
                    convert_log.lock().unwrap().push("member".to_string());
                    v
                },
                |d: &mut UserDto, v| d.name = v,
            )
            .before(move |source: Option<&User>| {
                let tag = if source.is_some() { "before:present" } else { "before:absent" };
                before_log.lock().unwrap().push(tag.to_string());
            })
            .after(move |_dest: &mut UserDto| {
                after_log.lock().unwrap().push("after".to_string());
            })
            .build(),
    );
}

#[test]
fn hooks_fire_in_order_around_member_assignments() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let resolver = Resolver::new();
    register_user_with_hooks(&resolver, &events);

    let mapper = resolver
        .get_with_verify::<Option<User>, Option<UserDto>>()
        .expect("mapper");
    let out = mapper
        .map(
            &Some(User {
                id: 2,
                name: "kim".to_string(),
            }),
            &resolver,
        )
        .expect("map");

    assert_eq!(
        out,
        Some(UserDto {
            id: 2,
            name: "kim".to_string()
        })
    );
    assert_eq!(
        *events.lock().unwrap(),
        vec!["before:present", "member", "after"]
    );
}

#[test]
fn absent_source_still_fires_the_before_hook_and_skips_the_rest() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let resolver = Resolver::new();
    register_user_with_hooks(&resolver, &events);

    let mapper = resolver
        .get_with_verify::<Option<User>, Option<UserDto>>()
        .expect("mapper");
    let out = mapper.map(&None, &resolver).expect("map");

    assert_eq!(out, None);
    assert_eq!(*events.lock().unwrap(), vec!["before:absent"]);
}

#[test]
fn missing_constructor_fails_at_resolve_time() {
    let resolver = Resolver::new();
    resolver.register(
        DescriptorBuilder::<User, UserDto>::reference()
            .member("id", "id", |s: &User| &s.id, |d: &mut UserDto, v| d.id = v)
            .build(),
    );

    let err = resolver.get_with_verify::<User, UserDto>().unwrap_err();
    assert!(matches!(err, MapError::MissingConstructor { .. }));
    // Nothing was published; the counter is untouched.
    assert_eq!(resolver.build_count(), 0);
}

#[test]
fn unresolved_nested_pair_surfaces_at_first_invocation() {
    #[derive(Clone)]
    struct Outer {
        inner: User,
    }

    #[derive(Default, Debug)]
    struct OuterDto {
        inner: Option<UserDto>,
    }

    let resolver = Resolver::new();
    resolver.register(
        DescriptorBuilder::<Outer, OuterDto>::value()
            .member_as::<User, UserDto>(
                "inner",
                "inner",
                |s: &Outer| &s.inner,
                |d: &mut OuterDto, v| d.inner = Some(v),
            )
            .build(),
    );

    // The outer pair builds fine; the (User, UserDto) pair was never
    // registered, so the delegated site reports it on first map.
    let mapper = resolver.get_with_verify::<Outer, OuterDto>().expect("mapper");
    let err = mapper
        .map(
            &Outer {
                inner: User {
                    id: 1,
                    name: "n".to_string(),
                },
            },
            &resolver,
        )
        .unwrap_err();
    assert!(matches!(err, MapError::UnresolvedPair { .. }));
}

#[test]
fn both_back_ends_map_identically() {
    let introspectable = Resolver::with_options(ResolverOptions {
        mode: SynthesisMode::Introspectable,
    });
    let transient = Resolver::with_options(ResolverOptions {
        mode: SynthesisMode::Transient,
    });
    register_source_dest(&introspectable);
    register_source_dest(&transient);

    let source = Source {
        id: 77,
        name: "both".to_string(),
        tags: vec![-1, 0, 1],
    };
    let a = introspectable
        .get_with_verify::<Source, Dest>()
        .expect("mapper")
        .map(&source, &introspectable)
        .expect("map");
    let b = transient
        .get_with_verify::<Source, Dest>()
        .expect("mapper")
        .map(&source, &transient)
        .expect("map");

    assert_eq!(a, b);

    // Only the introspectable form carries a plan.
    let plan_text = introspectable
        .get_with_verify::<Source, Dest>()
        .expect("mapper")
        .describe()
        .expect("plan text");
    assert!(plan_text.contains("bulk-copy"));
    assert!(transient
        .get_with_verify::<Source, Dest>()
        .expect("mapper")
        .describe()
        .is_none());
}

#[test]
fn delegated_composite_members_map_through_their_own_pair() {
    #[derive(Clone)]
    struct Order {
        buyer: User,
        total: u64,
    }

    #[derive(Default)]
    struct OrderDto {
        buyer: Option<UserDto>,
        total: u64,
    }

    let resolver = Resolver::new();
    resolver.register(
        DescriptorBuilder::<User, UserDto>::reference()
            .constructor(&["id", "name"], |s: &User| UserDto {
                id: s.id,
                name: s.name.clone(),
            })
            .build(),
    );
    resolver.register(
        DescriptorBuilder::<Order, OrderDto>::value()
            .member_as::<User, Option<UserDto>>(
                "buyer",
                "buyer",
                |s: &Order| &s.buyer,
                |d: &mut OrderDto, v| d.buyer = v,
            )
            .member("total", "total", |s: &Order| &s.total, |d: &mut OrderDto, v| {
                d.total = v;
            })
            .build(),
    );

    let mapper = resolver.get_with_verify::<Order, OrderDto>().expect("mapper");
    let out = mapper
        .map(
            &Order {
                buyer: User {
                    id: 4,
                    name: "ada".to_string(),
                },
                total: 9000,
            },
            &resolver,
        )
        .expect("map");

    assert_eq!(
        out.buyer,
        Some(UserDto {
            id: 4,
            name: "ada".to_string()
        })
    );
    assert_eq!(out.total, 9000);
    // Outer pair plus the required-to-optional adapter and its inner pair.
    assert_eq!(resolver.build_count(), 3);
}
