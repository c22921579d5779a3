use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use mgmt_core::{
    AttributeDecl, AttributeMarker, BoxError, Client, Error, Explicit, FieldDecl, Managed, Members,
    MethodDecl, NameSpec, OperationDecl, OperationMarker, Registry, RegistryConfig,
    SelfDescribing, Signature, TypeShape, TypeTag, UnregisterMode, Value,
};

/// One attribute per coercible type, each backed by a mutex slot.
struct Settings {
    slots: Mutex<Vec<Value>>,
}

const SETTINGS: [(&str, &str); 9] = [
    ("Enabled", "boolean"),
    ("Grade", "char"),
    ("Flags", "byte"),
    ("Port", "short"),
    ("Threads", "int"),
    ("Budget", "long"),
    ("Ratio", "float"),
    ("Weight", "double"),
    ("Label", "String"),
];

impl Managed for Settings {
    fn shape() -> TypeShape<Self> {
        let mut shape = TypeShape::new("Settings").naming(NameSpec::domain("it").folder("config"));
        for (index, (suffix, type_name)) in SETTINGS.iter().enumerate() {
            let tag = TypeTag::parse(type_name);
            shape = shape
                .method(
                    MethodDecl::getter(format!("get{}", suffix), tag.clone(), move |s: &Settings| {
                        Ok(s.slots.lock().unwrap()[index].clone())
                    })
                    .attribute(AttributeMarker::new("")),
                )
                .method(
                    MethodDecl::setter(format!("set{}", suffix), tag, move |s: &Settings, v: Value| {
                        s.slots.lock().unwrap()[index] = v;
                        Ok(())
                    })
                    .attribute(AttributeMarker::new("")),
                );
        }
        shape
    }
}

fn settings() -> Arc<Settings> {
    Arc::new(Settings {
        slots: Mutex::new(vec![Value::Null; SETTINGS.len()]),
    })
}

#[test]
fn test_name_is_predictable_without_registry() {
    let registry = Registry::default();
    let name = registry.register(settings()).unwrap();

    let predicted = NameSpec::domain("it").folder("config").to_name("Settings").unwrap();
    assert_eq!(name, predicted);
    assert_eq!(name.to_string(), "it:00=config,name=Settings");
}

#[test]
fn test_set_then_get_round_trips_every_type() {
    let registry = Registry::default();
    let name = registry.register(settings()).unwrap();
    let dispatcher = registry.dispatcher(&name).unwrap();

    let values = [
        ("enabled", Value::Bool(true)),
        ("grade", Value::Char('A')),
        ("flags", Value::Byte(-3)),
        ("port", Value::Short(8080)),
        ("threads", Value::Int(16)),
        ("budget", Value::Long(1 << 40)),
        ("ratio", Value::Float(0.75)),
        ("weight", Value::Double(2.5e-3)),
        ("label", Value::from("primary")),
    ];
    for (attribute, value) in &values {
        dispatcher.set_attribute(attribute, value.clone()).unwrap();
        assert_eq!(&dispatcher.get_attribute(attribute).unwrap(), value, "{}", attribute);
    }
}

#[test]
fn test_string_values_coerce_through_client() {
    let registry = Arc::new(Registry::default());
    let name = registry.register(settings()).unwrap();
    let client = Client::new(Arc::clone(&registry), Arc::clone(registry.types()));

    client.set(&name, "enabled", "TRUE").unwrap();
    client.set(&name, "grade", "").unwrap();
    client.set(&name, "threads", "12").unwrap();
    client.set(&name, "weight", "1.5").unwrap();

    let results = client
        .get_many(
            &name,
            &["enabled".to_string(), "grade".to_string(), "threads".to_string(), "weight".to_string()],
        )
        .unwrap();
    let values: Vec<Value> = results.into_iter().map(|(_, r)| r.unwrap()).collect();
    assert_eq!(
        values,
        vec![Value::Bool(true), Value::Char('\0'), Value::Int(12), Value::Double(1.5)]
    );
}

struct Broken;

impl Managed for Broken {
    fn shape() -> TypeShape<Self> {
        TypeShape::new("Broken")
            .naming(NameSpec::domain("it"))
            .method(
                MethodDecl::new("getValue", [TypeTag::Int], TypeTag::Int, |_: &Broken, _: &[Value]| {
                    Ok(Value::Int(0))
                })
                .attribute(AttributeMarker::new("")),
            )
    }
}

#[test]
fn test_invalid_metadata_registers_nothing() {
    let registry = Registry::default();
    let err = registry.register(Arc::new(Broken)).unwrap_err();
    assert_eq!(err.kind(), "InvalidMetadataError");
    assert!(registry.is_empty());
}

struct Mislabeled;

impl Managed for Mislabeled {
    fn shape() -> TypeShape<Self> {
        TypeShape::new("Mislabeled")
            .naming(NameSpec::domain("it"))
            .method(
                MethodDecl::getter("getFoo", TypeTag::Int, |_: &Mislabeled| Ok(Value::Int(1)))
                    .operation(OperationMarker::new("")),
            )
    }
}

#[test]
fn test_operation_with_getter_name_is_rejected() {
    let registry = Registry::default();
    let err = registry.register(Arc::new(Mislabeled)).unwrap_err();
    assert!(matches!(err, Error::InvalidMetadata { .. }));
    assert!(registry.is_empty());
}

#[derive(Default)]
struct Calculator {
    last: Mutex<String>,
}

fn recorder(
    label: &'static str,
) -> impl Fn(&Calculator, &[Value]) -> Result<Value, BoxError> + Send + Sync + 'static {
    move |c: &Calculator, args: &[Value]| {
        let rendered: Vec<String> = args.iter().map(Value::render).collect();
        *c.last.lock().unwrap() = format!("{}({})", label, rendered.join(","));
        Ok(Value::from(label))
    }
}

impl Managed for Calculator {
    fn shape() -> TypeShape<Self> {
        TypeShape::new("Calculator")
            .naming(NameSpec::domain("it"))
            .method(
                MethodDecl::new("add", [TypeTag::Int], TypeTag::String, recorder("int"))
                    .operation(OperationMarker::new("")),
            )
            .method(
                MethodDecl::new("add", [TypeTag::Int, TypeTag::Int], TypeTag::String, recorder("int,int"))
                    .operation(OperationMarker::new("").parameter_names(["a", "b"])),
            )
            .method(
                MethodDecl::new("add", [TypeTag::String], TypeTag::String, recorder("String"))
                    .operation(OperationMarker::new("")),
            )
    }
}

#[test]
fn test_overloads_reach_the_right_handle() {
    let registry = Registry::default();
    let calculator = Arc::new(Calculator::default());
    let name = registry.register(Arc::clone(&calculator)).unwrap();
    let dispatcher = registry.dispatcher(&name).unwrap();

    let result = dispatcher
        .invoke("add", &[Value::Int(1), Value::Int(2)], &Signature::from([TypeTag::Int, TypeTag::Int]))
        .unwrap();
    assert_eq!(result, Value::from("int,int"));
    assert_eq!(*calculator.last.lock().unwrap(), "int,int(1,2)");

    let result = dispatcher
        .invoke("add", &[Value::from("x")], &Signature::from([TypeTag::String]))
        .unwrap();
    assert_eq!(result, Value::from("String"));

    let err = dispatcher
        .invoke("add", &[Value::Long(1)], &Signature::from([TypeTag::Long]))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownOperation { .. }));
    assert_eq!(*calculator.last.lock().unwrap(), "String(x)");
}

#[test]
fn test_duplicate_registration_keeps_first() {
    let registry = Registry::default();
    let first = Arc::new(Calculator::default());
    let name = registry.register(Arc::clone(&first)).unwrap();

    let err = registry.register(Arc::new(Calculator::default())).unwrap_err();
    assert!(matches!(err, Error::DuplicateName { .. }));

    registry
        .dispatcher(&name)
        .unwrap()
        .invoke("add", &[Value::Int(7)], &Signature::from([TypeTag::Int]))
        .unwrap();
    assert_eq!(*first.last.lock().unwrap(), "int(7)");
}

#[derive(Debug, thiserror::Error)]
#[error("socket closed")]
struct SocketClosed;

#[derive(Debug, thiserror::Error)]
#[error("replication failed")]
struct ReplicationFailed(#[source] SocketClosed);

/// Lists its own members instead of declaring a shape.
struct Replica {
    online: AtomicBool,
}

impl SelfDescribing for Replica {
    fn naming(&self) -> NameSpec {
        NameSpec::domain("it").name("replica")
    }

    fn describe(&self) -> Members<Self> {
        Members::new()
            .attribute(
                AttributeDecl::new("online", TypeTag::Boolean)
                    .description("accepting writes")
                    .read(|r: &Replica| Ok(Value::Bool(r.online.load(Ordering::SeqCst)))),
            )
            .operation(
                OperationDecl::new("sync", Signature::empty(), TypeTag::Void, |_: &Replica, _: &[Value]| {
                    Err(ReplicationFailed(SocketClosed).into())
                })
                .description("push pending writes"),
            )
    }
}

#[test]
fn test_self_describing_object_and_cause_chain() {
    let registry = Registry::default();
    let replica = Arc::new(Replica {
        online: AtomicBool::new(true),
    });
    let name = registry.register_self_describing(Arc::clone(&replica)).unwrap();
    assert_eq!(name.to_string(), "it:name=replica");

    let dispatcher = registry.dispatcher(&name).unwrap();
    assert_eq!(dispatcher.get_attribute("online").unwrap(), Value::Bool(true));

    let err = dispatcher.invoke("sync", &[], &Signature::empty()).unwrap_err();
    let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
    assert_eq!(
        chain,
        vec!["invocation of sync() failed", "replication failed", "socket closed"]
    );

    registry.unregister_self_describing(&*replica).unwrap();
    assert!(registry.is_empty());
}

struct Base {
    level: AtomicI64,
}

struct Derived {
    base: Base,
    level: AtomicI64,
}

#[test]
fn test_publish_all_includes_hidden_field_once() {
    let parent = TypeShape::<Base>::new("Base").field(
        FieldDecl::new("level", TypeTag::Long, |b: &Base| Ok(Value::Long(b.level.load(Ordering::SeqCst)))),
    );
    let shape = TypeShape::<Derived>::new("Derived")
        .field(
            FieldDecl::new("level", TypeTag::Long, |d: &Derived| {
                Ok(Value::Long(d.level.load(Ordering::SeqCst)))
            })
            .write(|d: &Derived, v: Value| {
                d.level.store(i64::try_from(v)?, Ordering::SeqCst);
                Ok(())
            }),
        )
        .extends(parent, |d: &Derived| &d.base);

    let registry = Registry::default();
    let target = Arc::new(Derived {
        base: Base {
            level: AtomicI64::new(1),
        },
        level: AtomicI64::new(2),
    });
    let name = registry
        .register_explicit(
            target,
            &NameSpec::domain("it").name("derived"),
            Explicit::all_public(&shape).unwrap(),
        )
        .unwrap();

    let info = registry.dispatcher(&name).unwrap().info();
    assert_eq!(info.attributes.len(), 1);
    assert!(info.attributes[0].writable);

    let dispatcher = registry.dispatcher(&name).unwrap();
    assert_eq!(dispatcher.get_attribute("level").unwrap(), Value::Long(2));

    registry.unregister_explicit::<Derived>(&NameSpec::domain("it").name("derived")).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn test_registry_restarts_cleanly() {
    for _ in 0..3 {
        let registry = Registry::new(RegistryConfig {
            unregister: UnregisterMode::Strict,
        });
        let name = registry.register(settings()).unwrap();
        registry.stop();
        assert!(matches!(registry.dispatcher(&name), Err(Error::Stopped)));
        registry.start();
        let again = registry.register(settings()).unwrap();
        assert_eq!(name, again);
        registry.unregister_name(&again).unwrap();
        assert!(registry.unregister_name(&again).is_err());
    }
}
