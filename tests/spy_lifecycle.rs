//! Integration tests for the spy lifecycle.
//!
//! These tests drive realistic scenarios through the public API only: building a
//! target, spying on it, sending messages from "production" code, and tearing the
//! spies down again between cases.

use argspy::{prelude::*, Result};
use std::{sync::Arc, thread};

fn set_value() -> Selector {
    Selector::parse("setValue:")
}

fn value() -> Selector {
    Selector::parse("value")
}

/// A settings model that stores a single value and reports it back.
fn settings_class() -> Arc<Class> {
    Class::builder("Settings")
        .method(set_value(), |inv| {
            inv.receiver().set_property("value", inv.args()[0].clone())?;
            Ok(Value::Void)
        })
        .method(value(), |inv| {
            Ok(inv.receiver().property("value")?.unwrap_or(Value::Null))
        })
        .build()
}

/// A drawing surface whose `moveTo:y:color:` takes three arguments of different kinds.
fn canvas_class() -> Arc<Class> {
    Class::builder("Canvas")
        .method_with_signature(
            Selector::parse("moveTo:y:color:"),
            MethodSignature::new(vec![ValueKind::F64, ValueKind::F64, ValueKind::Str]),
            |_| Ok(Value::Bool(true)),
        )
        .build()
}

/// Production code under test: configures whatever settings object it is given.
fn configure(settings: &Object, level: i32) -> Result<()> {
    settings.send(&set_value(), &[Value::I32(level)])?;
    Ok(())
}

#[test]
fn test_capture_then_overwrite_then_dispose() -> Result<()> {
    let settings = settings_class().instantiate();
    let registry = SpyRegistry::new();
    let spy = registry.install_spy(&settings, &set_value(), 0, SpyOptions::new())?;

    assert_eq!(spy.captured_value()?, None);

    configure(&settings, 42)?;
    assert_eq!(spy.captured_value()?, Some(Value::I32(42)));

    configure(&settings, 7)?;
    assert_eq!(spy.captured_value()?, Some(Value::I32(7)));

    spy.dispose()?;
    assert!(matches!(spy.captured_value(), Err(Error::SpyDisposed { .. })));

    // Original behaviour is intact after disposal, and the call is not observed.
    configure(&settings, 9)?;
    assert_eq!(settings.send(&value(), &[])?, Value::I32(9));
    assert!(matches!(spy.captured_value(), Err(Error::SpyDisposed { .. })));
    assert!(matches!(spy.capture_count(), Err(Error::SpyDisposed { .. })));
    assert!(matches!(spy.argument(), Err(Error::SpyDisposed { .. })));
    assert!(!registry.is_installed(&settings, &set_value()));
    Ok(())
}

#[test]
fn test_spy_does_not_alter_results() -> Result<()> {
    let class = settings_class();
    let observed = class.instantiate();
    let unobserved = class.instantiate();
    let registry = SpyRegistry::new();
    let _spy = registry.install_spy(&observed, &set_value(), 0, SpyOptions::new())?;

    for settings in [&observed, &unobserved] {
        assert_eq!(
            settings.send(&set_value(), &[Value::from("dark")])?,
            Value::Void
        );
        assert_eq!(settings.send(&value(), &[])?, Value::from("dark"));
    }
    Ok(())
}

#[test]
fn test_instance_spy_ignores_other_instances() -> Result<()> {
    let class = settings_class();
    let watched = class.instantiate();
    let other = class.instantiate();
    let registry = SpyRegistry::new();
    let spy = registry.install_spy(&watched, &set_value(), 0, SpyOptions::new())?;

    configure(&other, 1)?;
    assert!(!spy.was_called()?);
    spy.assert_not_called()?;

    configure(&watched, 2)?;
    assert_eq!(spy.argument()?, Value::I32(2));
    Ok(())
}

#[test]
fn test_type_spy_observes_every_instance() -> Result<()> {
    let class = settings_class();
    let first = class.instantiate();
    let second = class.instantiate();
    let registry = SpyRegistry::new();
    let spy = registry.install_spy(&class, &set_value(), 0, SpyOptions::new())?;

    configure(&first, 10)?;
    assert_eq!(spy.argument()?, Value::I32(10));
    configure(&second, 20)?;
    assert_eq!(spy.argument()?, Value::I32(20));
    assert_eq!(spy.capture_count()?, 2);

    // An instance with its own override never reaches the class slot.
    let custom = class.instantiate();
    custom.define_method(set_value(), |_| Ok(Value::Null))?;
    configure(&custom, 30)?;
    assert_eq!(spy.argument()?, Value::I32(20));
    Ok(())
}

#[test]
fn test_separate_spies_on_separate_indices() -> Result<()> {
    let class = canvas_class();
    let canvas = class.instantiate();
    let move_to = Selector::parse("moveTo:y:color:");
    let registry = SpyRegistry::new();

    let x = registry.install_spy(&canvas, &move_to, 0, SpyOptions::new())?;
    let color = registry.install_spy(&class, &move_to, 2, SpyOptions::new())?;
    assert_eq!(x.descriptor().expected_kind(), Some(ValueKind::F64));
    assert_eq!(color.descriptor().expected_kind(), Some(ValueKind::Str));

    let result = canvas.send(
        &move_to,
        &[Value::F64(1.5), Value::F64(-3.0), Value::from("teal")],
    )?;
    assert_eq!(result, Value::Bool(true));
    assert_eq!(x.argument()?, Value::F64(1.5));
    assert_eq!(color.argument()?, Value::from("teal"));
    assert_eq!(registry.len(), 2);
    Ok(())
}

#[test]
fn test_second_install_displaces_first() -> Result<()> {
    let settings = settings_class().instantiate();
    let registry = SpyRegistry::new();

    let old = registry.install_spy(&settings, &set_value(), 0, SpyOptions::new())?;
    let new = registry.install_spy(&settings, &set_value(), 0, SpyOptions::new())?;

    configure(&settings, 5)?;
    assert!(matches!(old.captured_value(), Err(Error::SpyDisplaced { .. })));
    assert_eq!(old.status(), SpyStatus::Displaced);
    assert_eq!(new.argument()?, Value::I32(5));
    assert_eq!(new.capture_count()?, 1);
    Ok(())
}

#[test]
fn test_install_errors_change_nothing() -> Result<()> {
    let settings = settings_class().instantiate();
    let registry = SpyRegistry::new();

    let err = registry
        .install_spy(&settings, &set_value(), -1, SpyOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgumentIndex { index: -1, .. }));

    let err = registry
        .install_spy(&settings, &Selector::parse("reload:"), 0, SpyOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::UnknownSelector { .. }));

    assert!(registry.is_empty());
    configure(&settings, 3)?;
    assert_eq!(settings.send(&value(), &[])?, Value::I32(3));
    Ok(())
}

#[test]
fn test_teardown_restores_original_behaviour() -> Result<()> {
    let class = settings_class();
    let settings = class.instantiate();
    let registry = SpyRegistry::new();

    let suppressing = registry.install_spy(
        &settings,
        &set_value(),
        0,
        SpyOptions::new().suppress_original(Value::from("stubbed")),
    )?;
    let no_arguments = registry.install_spy(&class, &value(), 0, SpyOptions::new());
    assert!(matches!(
        no_arguments,
        Err(Error::InvalidArgumentIndex { arity: 0, .. })
    ));

    assert_eq!(
        settings.send(&set_value(), &[Value::I32(1)])?,
        Value::from("stubbed")
    );
    assert_eq!(settings.send(&value(), &[])?, Value::Null);
    assert_eq!(suppressing.argument()?, Value::I32(1));

    assert_eq!(registry.teardown_all_spies()?, 1);
    assert!(registry.is_empty());
    assert!(!suppressing.is_active());

    assert_eq!(settings.send(&set_value(), &[Value::I32(4)])?, Value::Void);
    assert_eq!(settings.send(&value(), &[])?, Value::I32(4));
    Ok(())
}

#[test]
fn test_captures_object_references_and_records() -> Result<()> {
    let class = Class::builder("View")
        .method(Selector::parse("setDelegate:"), |_| Ok(Value::Void))
        .method(Selector::parse("setFrame:"), |_| Ok(Value::Void))
        .build();
    let view = class.instantiate();
    let registry = SpyRegistry::new();

    let delegate_spy =
        registry.install_spy(&view, &Selector::parse("setDelegate:"), 0, SpyOptions::new())?;
    let frame_spy =
        registry.install_spy(&view, &Selector::parse("setFrame:"), 0, SpyOptions::new())?;

    let delegate = class.instantiate();
    view.send(
        &Selector::parse("setDelegate:"),
        &[Value::from(Arc::clone(&delegate))],
    )?;
    let frame = Value::record("Rect", vec![Value::F64(0.0), Value::F64(0.0)]);
    view.send(&Selector::parse("setFrame:"), &[frame.clone()])?;

    let captured = delegate_spy.argument()?;
    let captured = captured
        .as_object()
        .and_then(|o| o.downcast::<Object>())
        .expect("object reference");
    assert!(Arc::ptr_eq(&captured, &delegate));
    assert_eq!(frame_spy.argument()?, frame);
    Ok(())
}

#[test]
fn test_concurrent_callers() -> Result<()> {
    let settings = settings_class().instantiate();
    let registry = SpyRegistry::new();
    let spy = registry.install_spy(&settings, &set_value(), 0, SpyOptions::new())?;

    thread::scope(|scope| {
        for worker in 0..4 {
            let settings = &settings;
            scope.spawn(move || {
                for i in 0..100 {
                    settings
                        .send(&set_value(), &[Value::I32(worker * 100 + i)])
                        .expect("send");
                }
            });
        }
    });

    assert_eq!(spy.capture_count()?, 400);
    let last = spy.argument()?.as_i32().expect("i32");
    assert!((0..400).contains(&last));
    Ok(())
}

#[test]
fn test_global_registry() -> Result<()> {
    let settings = settings_class().instantiate();
    let spy = install_spy(&settings, &set_value(), 0, SpyOptions::new())?;

    configure(&settings, 11)?;
    assert_eq!(spy.argument()?, Value::I32(11));
    assert!(SpyRegistry::global().is_installed(&settings, &set_value()));

    teardown_all_spies()?;
    assert!(!SpyRegistry::global().is_installed(&settings, &set_value()));
    assert!(matches!(spy.argument(), Err(Error::SpyDisposed { .. })));
    Ok(())
}
