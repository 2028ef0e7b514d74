//! Sample partial layers over the sequence contract
//!
//! One layer per injection category, plus a recording layer for call-order
//! assertions.

use crate::recording::CallLog;
use crate::sequence::{SequenceError, SEQUENCE};
use strata_composition::{ConstructorSpec, FieldSpec, LayerState, PartialType};
use strata_core::{arg, InvokeError, MemberSig, TypeKey, Value};

/// Doubles integers passed to `add`; constructor injection
///
/// A product outside the `i64` range raises [`SequenceError::Overflow`] and
/// leaves the delegate untouched.
pub fn doubling_add() -> PartialType {
    PartialType::builder("DoublingAdd")
        .implements(SEQUENCE)
        .constructor(ConstructorSpec::storing([("inner", SEQUENCE)]))
        .method(MemberSig::new("add", ["any"], "unit"), |call, args| {
            let value = match arg("add", args, 0)? {
                Value::Int(x) => x
                    .checked_mul(2)
                    .map(Value::from)
                    .ok_or_else(|| InvokeError::raised("add", SequenceError::overflow("add")))?,
                other => other.clone(),
            };
            call.inner("inner")?.invoke("add", &[value])
        })
        .build()
}

/// Reports `size()` shifted by a constructor argument; constructor injection
/// with one extra `int`
pub fn size_offset() -> PartialType {
    PartialType::builder("SizeOffset")
        .implements(SEQUENCE)
        .constructor(ConstructorSpec::storing([("inner", SEQUENCE), ("offset", "int")]))
        .method(MemberSig::accessor("size", "int"), |call, _| {
            let size = call.inner("inner")?.invoke("size", &[])?.expect_int("size")?;
            let offset = call.state().get("offset").unwrap_or_default().expect_int("size")?;
            size.checked_add(offset)
                .map(Value::from)
                .ok_or_else(|| InvokeError::raised("size", SequenceError::overflow("size")))
        })
        .build()
}

/// Counts `add` calls in its own state; marked field injection
///
/// The unmarked `backup` field also accepts a sequence and is ignored.
pub fn counting_add() -> PartialType {
    PartialType::builder("CountingAdd")
        .implements(SEQUENCE)
        .constructor(ConstructorSpec::new(Vec::<TypeKey>::new(), |_| {
            Ok(LayerState::new().with("count", 0))
        }))
        .field(FieldSpec::new("backup", SEQUENCE))
        .field(FieldSpec::new("inner", SEQUENCE).marked())
        .method(MemberSig::new("add", ["any"], "unit"), |call, args| {
            call.state().update("count", |count| {
                Value::from(count.as_int().unwrap_or(0) + 1)
            });
            call.inner("inner")?.invoke("add", args)
        })
        .method(MemberSig::accessor("add_count", "int"), |call, _| {
            Ok(call.state().get("count").unwrap_or_default())
        })
        .build()
}

/// Reads indices modulo the sequence length; accessor injection through `inner()`
pub fn wrapping_get() -> PartialType {
    PartialType::builder("WrappingGet")
        .implements(SEQUENCE)
        .abstract_member(MemberSig::accessor("inner", SEQUENCE))
        .method(MemberSig::new("get", ["int"], "any"), |call, args| {
            let index = arg("get", args, 0)?.expect_int("get")?;
            let inner = call.inner_via("inner")?;
            let size = inner.invoke("size", &[])?.expect_int("size")?;
            let index = if size > 0 { index.rem_euclid(size) } else { index };
            inner.invoke("get", &[Value::from(index)])
        })
        .build()
}

/// Logs `"{label}:{member}"` for `add` and `size`, then forwards
///
/// Each label yields a distinct partial type `Recording<label>`.
pub fn recording(label: &str, log: CallLog) -> PartialType {
    let label = label.to_string();
    let mut builder = PartialType::builder(format!("Recording<{label}>"))
        .implements(SEQUENCE)
        .constructor(ConstructorSpec::storing([("inner", SEQUENCE)]));
    for member in ["add", "size"] {
        let label = label.clone();
        let log = log.clone();
        let sig = if member == "add" {
            MemberSig::new(member, ["any"], "unit")
        } else {
            MemberSig::accessor(member, "int")
        };
        builder = builder.method(sig, move |call, args| {
            log.push(format!("{label}:{}", call.member()));
            call.inner("inner")?.invoke(call.member(), args)
        });
    }
    builder.build()
}
