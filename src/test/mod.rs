use std::sync::{Arc, LazyLock};

use crate::{
    dispatch::{Class, MethodSignature, Selector},
    value::{Value, ValueKind},
};

pub static SET_VALUE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("setValue:"));
pub static VALUE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("value"));

// Helper function to create a class storing one value in its "value" property
pub fn accumulator_class() -> Arc<Class> {
    Class::builder("Accumulator")
        .method_with_signature(
            SET_VALUE.clone(),
            MethodSignature::new(vec![ValueKind::I32]).returns(ValueKind::Bool),
            |inv| {
                let value = inv.arg(0).cloned().unwrap_or_default();
                inv.receiver().set_property("value", value)?;
                Ok(Value::Bool(true))
            },
        )
        .method(VALUE.clone(), |inv| {
            Ok(inv
                .receiver()
                .property("value")?
                .unwrap_or(Value::I32(0)))
        })
        .build()
}
