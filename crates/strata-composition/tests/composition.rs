//! End-to-end chain assembly tests over the sequence fixtures

use assert_matches::assert_matches;
use std::sync::Arc;
use strata_composition::{
    compose, ConstructorSpec, FieldSpec, Forwarding, InjectionBinding, InjectionCategory,
    InjectionResolver, LayerDescriptor, LayerKind, PartialLayer, PartialType, TransformLayer,
};
use strata_core::{InvokeResult, MemberSig};
use strata_testkit::*;

fn scenario(registry: &TypeRegistry) -> SequenceView {
    ChainBuilder::new(registry, SEQUENCE)
        .layer(doubling_add())
        .layer_with_args(size_offset(), [100])
        .build_view(SequenceObject::shared())
        .unwrap()
}

#[test]
fn doubling_then_offset() {
    init_tracing();
    let registry = sequence_registry();
    let base = Arc::new(SequenceObject::new());
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .layer(doubling_add())
        .layer_with_args(size_offset(), [100])
        .build(base.clone())
        .unwrap();

    composite.invoke("add", &[Value::from(5)]).unwrap();
    assert_eq!(base.snapshot(), vec![Value::from(10)]);
    assert_eq!(composite.invoke("size", &[]).unwrap(), Value::from(101));
    assert_eq!(composite.output_type(), &TypeKey::new(SEQUENCE));

    let steps = composite.chain().steps();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].delegate_type, TypeKey::new(ARRAY_SEQUENCE));
    assert_eq!(
        steps[1].binding,
        Some(InjectionBinding::Constructor {
            constructor: 0,
            delegate_param: 0
        })
    );
}

#[test]
fn typed_view_over_scenario() {
    let registry = sequence_registry();
    let view = scenario(&registry);
    view.add(5).unwrap();
    view.add("five").unwrap();
    assert_eq!(view.get(0).unwrap(), Value::from(10));
    assert_eq!(view.get(1).unwrap(), Value::from("five"));
    assert_eq!(view.size().unwrap(), 102);
    assert!(view.contains(10).unwrap());
    view.clear().unwrap();
    assert_eq!(view.size().unwrap(), 100);
}

#[test]
fn identity_chain_matches_base() {
    let registry = sequence_registry();
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .build(SequenceObject::shared())
        .unwrap();
    let reference = SequenceObject::new();

    let calls: Vec<(&str, Vec<Value>)> = vec![
        ("size", vec![]),
        ("add", vec![Value::from(3)]),
        ("add", vec![Value::from("four")]),
        ("add", vec![Value::from(true)]),
        ("get", vec![Value::from(1)]),
        ("get", vec![Value::from(7)]),
        ("contains", vec![Value::from(3)]),
        ("contains", vec![Value::from(5)]),
        ("items", vec![]),
        ("size", vec![]),
        ("clear", vec![]),
        ("size", vec![]),
        ("items", vec![]),
        ("get", vec![Value::from(0)]),
    ];
    for (member, args) in &calls {
        match (composite.invoke(member, args), reference.invoke(member, args)) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "'{member}' returned different values"),
            (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
            (a, b) => panic!("'{member}' diverged: {a:?} vs {b:?}"),
        }
    }

    let mut exercised: Vec<&str> = calls.iter().map(|(member, _)| *member).collect();
    exercised.sort_unstable();
    exercised.dedup();
    let mut declared: Vec<String> = registry
        .all_members(&TypeKey::new(SEQUENCE))
        .into_iter()
        .map(|sig| sig.name)
        .collect();
    declared.sort_unstable();
    assert_eq!(exercised, declared);

    assert!(composite.chain().is_empty());
    assert_eq!(
        composite.chain().describe(),
        "ArraySequence => Sequence"
    );
}

#[test]
fn later_layer_runs_first() {
    let registry = sequence_registry();
    let log = CallLog::new();
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .layer(recording("first", log.clone()))
        .layer(recording("second", log.clone()))
        .build(SequenceObject::shared())
        .unwrap();

    composite.invoke("add", &[Value::from(1)]).unwrap();
    composite.invoke("size", &[]).unwrap();
    assert_eq!(
        log.entries(),
        ["second:add", "first:add", "second:size", "first:size"]
    );
}

#[test]
fn outer_layer_may_skip_inner() {
    let registry = sequence_registry();
    let log = CallLog::new();
    let swallowing = PartialType::builder("SwallowingAdd")
        .implements(SEQUENCE)
        .constructor(ConstructorSpec::storing([("inner", SEQUENCE)]))
        .method(MemberSig::new("add", ["any"], "unit"), |_, _| Ok(Value::Unit))
        .build();
    let base = Arc::new(SequenceObject::new());
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .layer(recording("inner", log.clone()))
        .layer(swallowing)
        .build(base.clone())
        .unwrap();

    composite.invoke("add", &[Value::from(1)]).unwrap();
    assert!(log.entries().is_empty());
    assert!(base.snapshot().is_empty());
}

#[test]
fn field_injection_prefers_marked_field() {
    let registry = sequence_registry();
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .layer(counting_add())
        .build(SequenceObject::shared())
        .unwrap();
    assert_eq!(
        composite.chain().steps()[0].binding,
        Some(InjectionBinding::Field {
            constructor: 0,
            field: "inner".to_string()
        })
    );

    composite.invoke("add", &[Value::from(1)]).unwrap();
    composite.invoke("add", &[Value::from(2)]).unwrap();
    assert_eq!(composite.invoke("add_count", &[]).unwrap(), Value::from(2));
    assert_eq!(composite.invoke("size", &[]).unwrap(), Value::from(2));
}

#[test]
fn accessor_injection_serves_delegate() {
    let registry = sequence_registry();
    let base = Arc::new(SequenceObject::with_items([7, 8, 9]));
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .layer(wrapping_get())
        .build(base.clone())
        .unwrap();

    let binding = composite.chain().steps()[0].binding.clone().unwrap();
    assert_eq!(binding.category(), InjectionCategory::Accessor);
    assert_eq!(composite.invoke("get", &[Value::from(4)]).unwrap(), Value::from(8));
    assert_eq!(composite.invoke("get", &[Value::from(-1)]).unwrap(), Value::from(9));

    let inner = composite.invoke("inner", &[]).unwrap();
    let base_ref: ObjectRef = base;
    assert!(Arc::ptr_eq(inner.as_object().unwrap(), &base_ref));
}

#[test]
fn ambiguous_constructors_rejected() {
    let registry = sequence_registry();
    let twice = PartialType::builder("Twice")
        .implements(SEQUENCE)
        .constructor(ConstructorSpec::storing([("inner", SEQUENCE)]))
        .constructor(ConstructorSpec::storing([("inner", COLLECTION)]))
        .build();
    let err = ChainBuilder::new(&registry, SEQUENCE)
        .layer(twice)
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(
        err,
        ComposeError::AmbiguousInjectionPoint {
            category: InjectionCategory::Constructor,
            ref candidates,
            ..
        } if candidates.len() == 2
    );
}

#[test]
fn layer_without_injection_point_rejected() {
    let registry = sequence_registry();
    let lonely = PartialType::builder("Lonely")
        .field(FieldSpec::new("label", "string"))
        .build();
    let err = ChainBuilder::new(&registry, SEQUENCE)
        .layer(lonely)
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(err, ComposeError::NoInjectionPoint { ref layer, .. } if layer.as_str() == "Lonely");
}

#[test]
fn misaligned_extra_args_rejected() {
    let registry = sequence_registry();
    let err = ChainBuilder::new(&registry, SEQUENCE)
        .layer_with_args(size_offset(), ["one hundred"])
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(err, ComposeError::ConstructorArityMismatch { .. });

    let err = ChainBuilder::new(&registry, SEQUENCE)
        .layer_with_typed_args(size_offset(), [Value::from("x")], ["int"])
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(err, ComposeError::ConstructorArityMismatch { .. });
}

#[test]
fn constructor_failure_keeps_cause() {
    let registry = sequence_registry();
    let failing = PartialType::builder("Failing")
        .constructor(ConstructorSpec::new([SEQUENCE], |_| {
            Err("no capacity left".into())
        }))
        .build();
    let err = ChainBuilder::new(&registry, SEQUENCE)
        .layer(failing)
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(err, ComposeError::InstantiationFailure { .. });
    let cause = std::error::Error::source(&err).unwrap();
    assert_eq!(cause.to_string(), "no capacity left");
}

#[test]
fn output_type_must_be_satisfied() {
    let mut registry = sequence_registry();
    registry
        .register_contract(
            strata_core::Contract::new("Stack")
                .extends(SEQUENCE)
                .member(MemberSig::accessor("pop", "any")),
        )
        .unwrap();

    let err = ChainBuilder::new(&registry, SEQUENCE)
        .as_type("Stack")
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(
        err,
        ComposeError::IncompatibleOutputType { ref missing, .. } if missing == &["pop".to_string()]
    );

    let err = ChainBuilder::new(&registry, SEQUENCE)
        .as_type("Unregistered")
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(err, ComposeError::IncompatibleOutputType { .. });
}

#[test]
fn narrower_output_type_accepted() {
    let registry = sequence_registry();
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .layer(doubling_add())
        .as_type(COLLECTION)
        .build(SequenceObject::shared())
        .unwrap();
    assert_eq!(composite.type_key(), TypeKey::new(COLLECTION));
    assert!(composite.satisfies(&TypeKey::new(COLLECTION)));

    let err = composite.into_view::<SequenceView>().unwrap_err();
    assert_matches!(err, ComposeError::IncompatibleOutputType { .. });
}

#[test]
fn unresolved_member_depends_on_strictness() {
    let registry = sequence_registry();
    // Delegate that only knows how to add
    let add_only = |_: ObjectRef| -> ObjectRef {
        struct AddOnly;
        impl Object for AddOnly {
            fn type_key(&self) -> TypeKey {
                TypeKey::new(ARRAY_SEQUENCE)
            }
            fn responds_to(&self, member: &str) -> bool {
                member == "add"
            }
            fn invoke(&self, member: &str, _args: &[Value]) -> Result<Value, InvokeError> {
                match member {
                    "add" => Ok(Value::Unit),
                    _ => Err(InvokeError::unknown_member(&self.type_key(), member)),
                }
            }
        }
        Arc::new(AddOnly)
    };

    let err = ChainBuilder::new(&registry, SEQUENCE)
        .transform(add_only)
        .layer(doubling_add())
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(err, ComposeError::UnresolvedMember { ref member, .. } if member == "get");

    // Without strict checking the gap surfaces at the output check instead
    let lenient = ComposeConfig {
        strict_members: false,
        ..ComposeConfig::default()
    };
    let err = ChainBuilder::new(&registry, SEQUENCE)
        .with_config(lenient)
        .transform(add_only)
        .layer(doubling_add())
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(err, ComposeError::IncompatibleOutputType { .. });
}

#[test]
fn transform_replaces_delegate() {
    let registry = sequence_registry();
    let replacement = Arc::new(SequenceObject::with_items([1, 2, 3]));
    let handle: ObjectRef = replacement.clone();
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .transform_named("swap", move |_| handle)
        .layer_with_args(size_offset(), [10])
        .build(SequenceObject::shared())
        .unwrap();

    assert_eq!(composite.invoke("size", &[]).unwrap(), Value::from(13));
    assert_eq!(composite.chain().steps()[0].kind, LayerKind::Transform);
    assert_eq!(composite.chain().steps()[0].layer, "swap");
}

#[test]
fn interceptor_answers_and_forwards() {
    let registry = sequence_registry();
    let log = CallLog::new();
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .layer(doubling_add())
        .intercept(RecordingInterceptor::new("audit", log.clone()))
        .intercept(
            |delegate: &dyn Object, member: &str, args: &[Value]| -> Option<InvokeResult<Value>> {
                match member {
                    "contains" => Some(Ok(Value::from(false))),
                    _ => Some(delegate.invoke(member, args)),
                }
            },
        )
        .build(SequenceObject::shared())
        .unwrap();

    composite.invoke("add", &[Value::from(2)]).unwrap();
    assert_eq!(composite.invoke("get", &[Value::from(0)]).unwrap(), Value::from(4));
    assert_eq!(
        composite.invoke("contains", &[Value::from(4)]).unwrap(),
        Value::from(false)
    );
    assert_eq!(log.entries(), ["audit:add", "audit:get"]);

    // Proxies report the wrapped type
    let steps = composite.chain().steps();
    assert_eq!(steps[1].kind, LayerKind::Interceptor);
    assert_eq!(steps[1].produced, TypeKey::new("DoublingAdd"));
    assert_eq!(steps[1].layer, "audit");
}

#[test]
fn unhandled_member_fails_at_call_time() {
    let registry = sequence_registry();
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .intercept(
            |delegate: &dyn Object, member: &str, args: &[Value]| -> Option<InvokeResult<Value>> {
                match member {
                    "add" | "size" => Some(delegate.invoke(member, args)),
                    _ => None,
                }
            },
        )
        .build(SequenceObject::shared())
        .unwrap();

    composite.invoke("add", &[Value::from(1)]).unwrap();
    assert_matches!(
        composite.invoke("clear", &[]),
        Err(InvokeError::UnhandledMember { ref member }) if member == "clear"
    );
}

#[test]
fn layer_after_interceptor_resolves_against_delegate_type() {
    let registry = sequence_registry();
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .intercept(Forwarding)
        .layer_with_args(size_offset(), [1])
        .build(SequenceObject::shared())
        .unwrap();
    assert_eq!(composite.chain().steps()[1].delegate_type, TypeKey::new(ARRAY_SEQUENCE));
    assert_eq!(composite.invoke("size", &[]).unwrap(), Value::from(1));
}

#[test]
fn delegate_errors_pass_through_unchanged() {
    let registry = sequence_registry();
    let view = scenario(&registry);
    let err = view.get(3).unwrap_err();
    let InvokeError::Raised { member, source } = err else {
        panic!("expected the sequence to raise its own failure");
    };
    assert_eq!(member, "get");
    assert_eq!(
        source.downcast_ref::<SequenceError>(),
        Some(&SequenceError::OutOfRange { index: 3, len: 0 })
    );
}

#[test]
fn overflowing_layers_raise_instead_of_wrapping() {
    let registry = sequence_registry();
    let base = Arc::new(SequenceObject::new());
    let composite = ChainBuilder::new(&registry, SEQUENCE)
        .layer(doubling_add())
        .intercept(Forwarding)
        .build(base.clone())
        .unwrap();

    let err = composite.invoke("add", &[Value::from(i64::MAX)]).unwrap_err();
    let InvokeError::Raised { member, source } = err else {
        panic!("expected the doubling layer to raise");
    };
    assert_eq!(member, "add");
    assert_eq!(
        source.downcast_ref::<SequenceError>(),
        Some(&SequenceError::overflow("add"))
    );
    assert!(base.snapshot().is_empty());

    composite.invoke("add", &[Value::from(i64::MIN / 2)]).unwrap();
    assert_eq!(base.snapshot(), vec![Value::from(i64::MIN)]);

    let shifted = ChainBuilder::new(&registry, SEQUENCE)
        .layer_with_args(size_offset(), [i64::MAX])
        .build(SequenceObject::shared())
        .unwrap();
    assert_eq!(shifted.invoke("size", &[]).unwrap(), Value::from(i64::MAX));
    shifted.invoke("add", &[Value::from(1)]).unwrap();
    assert_matches!(
        shifted.invoke("size", &[]),
        Err(InvokeError::Raised { ref member, .. }) if member == "size"
    );
}

#[test]
fn shared_resolver_tells_apart_layers_with_one_name() {
    let registry = sequence_registry();
    let resolver = Arc::new(InjectionResolver::cached());
    let by_constructor = PartialType::builder("Layer")
        .implements(SEQUENCE)
        .constructor(ConstructorSpec::storing([("inner", SEQUENCE)]))
        .build();
    let by_field = PartialType::builder("Layer")
        .implements(SEQUENCE)
        .field(FieldSpec::new("inner", SEQUENCE))
        .build();

    let first = ChainBuilder::new(&registry, SEQUENCE)
        .with_resolver(Arc::clone(&resolver))
        .layer(by_constructor)
        .build(SequenceObject::shared())
        .unwrap();
    let second = ChainBuilder::new(&registry, SEQUENCE)
        .with_resolver(Arc::clone(&resolver))
        .layer(by_field)
        .build(SequenceObject::shared())
        .unwrap();

    assert_eq!(
        first.chain().steps()[0].binding.as_ref().map(InjectionBinding::category),
        Some(InjectionCategory::Constructor)
    );
    assert_eq!(
        second.chain().steps()[0].binding,
        Some(InjectionBinding::Field {
            constructor: 0,
            field: "inner".to_string()
        })
    );
    second.invoke("add", &[Value::from(1)]).unwrap();
    assert_eq!(second.invoke("size", &[]).unwrap(), Value::from(1));
}

#[test]
fn shared_resolver_respects_each_chain_contract() {
    let registry = sequence_registry();
    let resolver = Arc::new(InjectionResolver::cached());
    // No declared supertypes: the chain contract alone types this layer
    let plain = Arc::new(
        PartialType::builder("Plain")
            .constructor(ConstructorSpec::storing([("inner", COLLECTION)]))
            .build(),
    );
    let needs_sequence = Arc::new(
        PartialType::builder("NeedsSequence")
            .constructor(ConstructorSpec::storing([("inner", SEQUENCE)]))
            .build(),
    );
    let chain = |contract: &str| {
        ChainBuilder::new(&registry, contract)
            .with_resolver(Arc::clone(&resolver))
            .push(Arc::clone(&plain))
            .push(Arc::clone(&needs_sequence))
            .build(SequenceObject::shared())
    };

    let over_sequence = chain(SEQUENCE).unwrap();
    assert_eq!(over_sequence.chain().len(), 2);

    let err = chain(COLLECTION).unwrap_err();
    assert_matches!(
        err,
        ComposeError::NoInjectionPoint { ref layer, ref delegate }
            if layer.as_str() == "NeedsSequence" && delegate.as_str() == "Plain"
    );
}

#[test]
fn layer_limit_from_config() {
    let registry = sequence_registry();
    let mut config = ComposeConfig::default();
    config
        .merge_with_vars([("STRATA_MAX_LAYERS", "1")])
        .unwrap();
    let err = ChainBuilder::new(&registry, SEQUENCE)
        .with_config(config)
        .layer(doubling_add())
        .layer(counting_add())
        .build(SequenceObject::shared())
        .unwrap_err();
    assert_matches!(err, ComposeError::TooManyLayers { declared: 2, limit: 1 });
}

#[test]
fn compose_accepts_descriptor_list() {
    let registry = sequence_registry();
    let layers: Vec<LayerDescriptor> = vec![
        Arc::new(doubling_add()).into(),
        PartialLayer::with_args(Arc::new(size_offset()), vec![Value::from(5)]).into(),
        TransformLayer::new(|inner| inner).into(),
        LayerDescriptor::Interceptor(Arc::new(Forwarding)),
    ];
    let composite = compose(&registry, SequenceObject::shared(), SEQUENCE, layers, None).unwrap();
    composite.invoke("add", &[Value::from(1)]).unwrap();
    assert_eq!(composite.invoke("size", &[]).unwrap(), Value::from(6));
    assert_eq!(
        composite.chain().describe(),
        "ArraySequence <- DoublingAdd [constructor #0 param 0] <- SizeOffset [constructor #0 param 0] \
         <- transform [transform] <- forwarding [interceptor] => Sequence"
    );
}

#[test]
fn chain_record_serializes() {
    let registry = sequence_registry();
    let view = ChainBuilder::new(&registry, SEQUENCE)
        .layer(counting_add())
        .build(SequenceObject::shared())
        .unwrap();
    let json = serde_json::to_value(view.chain()).unwrap();
    assert_eq!(json["base"], "ArraySequence");
    assert_eq!(json["steps"][0]["kind"], "Partial");
    assert_eq!(json["steps"][0]["binding"]["Field"]["field"], "inner");
}
