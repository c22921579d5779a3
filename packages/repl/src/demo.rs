//! Demo objects hosted by the `mgmt` binary.
//!
//! One object per discovery strategy: caches declare a marked shape,
//! the scheduler lists its own members, and the listener is published
//! wholesale from its public members.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use mgmt_core::{
    AttributeDecl, AttributeMarker, BoxError, Error, Explicit, FieldDecl, Managed, ManagedName,
    Members, MethodDecl, NameSpec, Object, OperationDecl, OperationMarker, Registry,
    SelfDescribing, SelfNaming, Signature, TypeShape, TypeTag, Value,
};

pub const DOMAIN: &str = "demo";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A bounded cache named after its label.
pub struct Cache {
    label: String,
    capacity: AtomicI32,
    hits: AtomicI64,
    enabled: AtomicBool,
    entries: Mutex<Vec<String>>,
}

impl Cache {
    pub fn new(label: impl Into<String>, capacity: i32) -> Self {
        Self {
            label: label.into(),
            capacity: AtomicI32::new(capacity),
            hits: AtomicI64::new(0),
            enabled: AtomicBool::new(true),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Insert a key, dropping the oldest entries past capacity.
    pub fn put(&self, key: impl Into<String>) {
        let mut entries = lock(&self.entries);
        entries.push(key.into());
        trim(&mut entries, self.capacity.load(Ordering::SeqCst));
    }

    pub fn touch(&self, key: &str) -> bool {
        let found = lock(&self.entries).iter().any(|k| k == key);
        if found {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
        found
    }

    fn resize(&self, capacity: i32) -> Result<(), BoxError> {
        if capacity < 0 {
            return Err(format!("capacity must not be negative, got {}", capacity).into());
        }
        self.capacity.store(capacity, Ordering::SeqCst);
        trim(&mut lock(&self.entries), capacity);
        Ok(())
    }
}

fn trim(entries: &mut Vec<String>, capacity: i32) {
    let capacity = usize::try_from(capacity).unwrap_or(0);
    if entries.len() > capacity {
        let excess = entries.len() - capacity;
        entries.drain(..excess);
    }
}

impl SelfNaming for Cache {
    fn leaf_name(&self) -> Option<String> {
        Some(self.label.clone())
    }
}

impl Managed for Cache {
    fn shape() -> TypeShape<Self> {
        TypeShape::new("Cache")
            .naming(NameSpec::domain(DOMAIN).folder("caches"))
            .method(
                MethodDecl::getter("getSize", TypeTag::Int, |c: &Cache| {
                    Ok(Value::Int(c.capacity.load(Ordering::SeqCst)))
                })
                .attribute(AttributeMarker::new("maximum number of entries")),
            )
            .method(
                MethodDecl::setter("setSize", TypeTag::Int, |c: &Cache, v: Value| {
                    c.resize(i32::try_from(v)?)
                })
                .attribute(AttributeMarker::new("")),
            )
            .method(
                MethodDecl::getter("getCount", TypeTag::Int, |c: &Cache| {
                    let count = lock(&c.entries).len();
                    Ok(Value::Int(i32::try_from(count)?))
                })
                .attribute(AttributeMarker::new("entries currently held")),
            )
            .method(
                MethodDecl::getter("getHits", TypeTag::Long, |c: &Cache| {
                    Ok(Value::Long(c.hits.load(Ordering::SeqCst)))
                })
                .attribute(AttributeMarker::new("lookups that found an entry")),
            )
            .method(
                MethodDecl::getter("getEnabled", TypeTag::Boolean, |c: &Cache| {
                    Ok(Value::Bool(c.enabled.load(Ordering::SeqCst)))
                })
                .attribute(AttributeMarker::new("whether lookups are served")),
            )
            .method(
                MethodDecl::setter("setEnabled", TypeTag::Boolean, |c: &Cache, v: Value| {
                    c.enabled.store(bool::try_from(v)?, Ordering::SeqCst);
                    Ok(())
                })
                .attribute(AttributeMarker::new("")),
            )
            .method(
                MethodDecl::getter("getKeys", TypeTag::array(TypeTag::String), |c: &Cache| {
                    let keys = lock(&c.entries).iter().cloned().map(Value::String).collect();
                    Ok(Value::array(TypeTag::String, keys))
                })
                .attribute(AttributeMarker::new("cached keys, oldest first")),
            )
            .method(
                MethodDecl::new("clear", Signature::empty(), TypeTag::Void, |c: &Cache, _: &[Value]| {
                    lock(&c.entries).clear();
                    c.hits.store(0, Ordering::SeqCst);
                    Ok(Value::Null)
                })
                .operation(OperationMarker::new("drop every entry and reset counters")),
            )
            .method(
                MethodDecl::new("resize", [TypeTag::Int], TypeTag::Void, |c: &Cache, args: &[Value]| {
                    c.resize(int_arg(args, 0)?)?;
                    Ok(Value::Null)
                })
                .operation(OperationMarker::new("change capacity").parameter_names(["capacity"])),
            )
            .method(
                MethodDecl::new(
                    "resize",
                    [TypeTag::Int, TypeTag::Boolean],
                    TypeTag::Void,
                    |c: &Cache, args: &[Value]| {
                        c.resize(int_arg(args, 0)?)?;
                        if bool::try_from(args.get(1).cloned().unwrap_or_default())? {
                            lock(&c.entries).clear();
                        }
                        Ok(Value::Null)
                    },
                )
                .operation(
                    OperationMarker::new("change capacity, optionally clearing")
                        .parameter_names(["capacity", "clear"]),
                ),
            )
            .method(
                MethodDecl::new("put", [TypeTag::String], TypeTag::Int, |c: &Cache, args: &[Value]| {
                    let key = String::try_from(args.first().cloned().unwrap_or_default())?;
                    c.put(key);
                    Ok(Value::Int(i32::try_from(lock(&c.entries).len())?))
                })
                .operation(OperationMarker::new("insert a key, returns the new count").parameter_names(["key"])),
            )
            .method(
                MethodDecl::new("evict", [TypeTag::String], TypeTag::Boolean, |c: &Cache, args: &[Value]| {
                    let key = String::try_from(args.first().cloned().unwrap_or_default())?;
                    let mut entries = lock(&c.entries);
                    let before = entries.len();
                    entries.retain(|k| *k != key);
                    Ok(Value::Bool(entries.len() != before))
                })
                .operation(OperationMarker::new("remove one key").parameter_names(["key"])),
            )
            .method(
                MethodDecl::new("lookup", [TypeTag::String], TypeTag::Boolean, |c: &Cache, args: &[Value]| {
                    if !c.enabled.load(Ordering::SeqCst) {
                        return Err("cache is disabled".into());
                    }
                    let key = String::try_from(args.first().cloned().unwrap_or_default())?;
                    Ok(Value::Bool(c.touch(&key)))
                })
                .operation(OperationMarker::new("check for a key, counting hits").parameter_names(["key"])),
            )
    }

    fn self_naming(&self) -> Option<&dyn SelfNaming> {
        Some(self)
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, BoxError> {
    Ok(i32::try_from(args.get(index).cloned().unwrap_or_default())?)
}

#[derive(Debug, thiserror::Error)]
#[error("worker {0} lost")]
pub struct WorkerLost(pub i32);

#[derive(Debug, thiserror::Error)]
#[error("job {job} failed")]
pub struct JobFailed {
    pub job: i64,
    #[source]
    pub source: WorkerLost,
}

/// A job queue that describes itself.
pub struct Scheduler {
    running: AtomicBool,
    workers: AtomicI32,
    next_job: AtomicI64,
    queue: Mutex<Vec<(i64, String)>>,
}

impl Scheduler {
    pub fn new(workers: i32) -> Self {
        Self {
            running: AtomicBool::new(true),
            workers: AtomicI32::new(workers),
            next_job: AtomicI64::new(1),
            queue: Mutex::new(Vec::new()),
        }
    }

    fn submit(&self, task: String) -> Result<i64, BoxError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err("scheduler is shut down".into());
        }
        let job = self.next_job.fetch_add(1, Ordering::SeqCst);
        lock(&self.queue).push((job, task));
        Ok(job)
    }
}

impl SelfDescribing for Scheduler {
    fn naming(&self) -> NameSpec {
        NameSpec::domain(DOMAIN).name("scheduler")
    }

    fn describe(&self) -> Members<Self> {
        Members::new()
            .attribute(
                AttributeDecl::new("running", TypeTag::Boolean)
                    .description("accepting new jobs")
                    .read(|s: &Scheduler| Ok(Value::Bool(s.running.load(Ordering::SeqCst)))),
            )
            .attribute(
                AttributeDecl::new("queued", TypeTag::Int)
                    .description("jobs waiting for a worker")
                    .read(|s: &Scheduler| Ok(Value::Int(i32::try_from(lock(&s.queue).len())?))),
            )
            .attribute(
                AttributeDecl::new("workers", TypeTag::Int)
                    .description("worker threads")
                    .read(|s: &Scheduler| Ok(Value::Int(s.workers.load(Ordering::SeqCst))))
                    .write(|s: &Scheduler, v: Value| {
                        let workers = i32::try_from(v)?;
                        if workers < 1 {
                            return Err("at least one worker is required".into());
                        }
                        s.workers.store(workers, Ordering::SeqCst);
                        Ok(())
                    }),
            )
            .operation(
                OperationDecl::new("submit", [TypeTag::String], TypeTag::Long, |s: &Scheduler, args: &[Value]| {
                    let task = String::try_from(args.first().cloned().unwrap_or_default())?;
                    Ok(Value::Long(s.submit(task)?))
                })
                .description("queue a job, returns its id")
                .parameter_names(["task"]),
            )
            .operation(
                OperationDecl::new("drain", Signature::empty(), TypeTag::Int, |s: &Scheduler, _: &[Value]| {
                    let drained = std::mem::take(&mut *lock(&s.queue)).len();
                    Ok(Value::Int(i32::try_from(drained)?))
                })
                .description("discard queued jobs, returns how many"),
            )
            .operation(
                OperationDecl::new("shutdown", Signature::empty(), TypeTag::Void, |s: &Scheduler, _: &[Value]| {
                    s.running.store(false, Ordering::SeqCst);
                    Ok(Value::Null)
                })
                .description("stop accepting jobs"),
            )
            .operation(
                OperationDecl::new("fail", Signature::empty(), TypeTag::Void, |s: &Scheduler, _: &[Value]| {
                    let job = s.next_job.load(Ordering::SeqCst);
                    Err(JobFailed {
                        job,
                        source: WorkerLost(s.workers.load(Ordering::SeqCst)),
                    }
                    .into())
                })
                .description("simulate a failing job"),
            )
    }
}

/// Network port value with a string constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Port(pub u16);

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}

impl Port {
    pub const TYPE_NAME: &'static str = "Port";

    pub fn parse(text: &str) -> Result<Object, BoxError> {
        let digits = text.trim().trim_start_matches(':');
        let port: u16 = digits.parse()?;
        Ok(Object::new(Self::TYPE_NAME, Port(port)))
    }
}

/// Plain listener with no management declarations of its own.
pub struct Listener {
    port: Mutex<Port>,
    backlog: AtomicI32,
    accepted: AtomicI64,
}

impl Listener {
    pub fn new(port: u16) -> Self {
        Self {
            port: Mutex::new(Port(port)),
            backlog: AtomicI32::new(128),
            accepted: AtomicI64::new(0),
        }
    }

    /// Public members of the listener.
    pub fn shape() -> TypeShape<Listener> {
        TypeShape::new("Listener")
            .field(
                FieldDecl::new("port", TypeTag::object(Port::TYPE_NAME), |l: &Listener| {
                    Ok(Value::Object(Object::new(Port::TYPE_NAME, *lock(&l.port))))
                })
                .write(|l: &Listener, v: Value| {
                    let port = v
                        .as_object()
                        .and_then(|o| o.downcast_ref::<Port>())
                        .copied()
                        .ok_or("expected a Port")?;
                    *lock(&l.port) = port;
                    Ok(())
                }),
            )
            .field(
                FieldDecl::new("backlog", TypeTag::Int, |l: &Listener| {
                    Ok(Value::Int(l.backlog.load(Ordering::SeqCst)))
                })
                .write(|l: &Listener, v: Value| {
                    l.backlog.store(i32::try_from(v)?, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .field(
                FieldDecl::new("protocol", TypeTag::String, |_: &Listener| Ok(Value::from("tcp"))).constant(),
            )
            .method(MethodDecl::getter("getAccepted", TypeTag::Long, |l: &Listener| {
                Ok(Value::Long(l.accepted.load(Ordering::SeqCst)))
            }))
            .method(MethodDecl::getter("isBound", TypeTag::Boolean, |_: &Listener| Ok(Value::Bool(true))))
            .method(MethodDecl::new("accept", Signature::empty(), TypeTag::Long, |l: &Listener, _: &[Value]| {
                Ok(Value::Long(l.accepted.fetch_add(1, Ordering::SeqCst) + 1))
            }))
            .method(MethodDecl::getter("toString", TypeTag::String, |l: &Listener| {
                Ok(Value::String(format!("listener{}", lock(&l.port))))
            }))
            .method(
                MethodDecl::new("rebind", [TypeTag::Int], TypeTag::Void, |_: &Listener, _: &[Value]| Ok(Value::Null))
                    .private(),
            )
    }
}

/// Register the demo objects and the `Port` type.
pub fn install(registry: &Registry) -> Result<Vec<ManagedName>, Error> {
    registry.types().register(Port::TYPE_NAME, Port::parse);

    let mut names = Vec::new();
    for (label, capacity) in [("sessions", 256), ("templates", 32)] {
        let cache = Arc::new(Cache::new(label, capacity));
        cache.put("index");
        names.push(registry.register(cache)?);
    }
    names.push(registry.register_self_describing(Arc::new(Scheduler::new(4)))?);
    names.push(registry.register_explicit(
        Arc::new(Listener::new(8080)),
        &NameSpec::domain(DOMAIN).folder("net").name("listener"),
        Explicit::all_public(&Listener::shape())?,
    )?);
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgmt_core::NamePattern;

    fn installed() -> (Registry, Vec<ManagedName>) {
        let registry = Registry::default();
        let names = install(&registry).unwrap();
        (registry, names)
    }

    #[test]
    fn install_names() {
        let (_, names) = installed();
        let rendered: Vec<String> = names.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "demo:00=caches,name=sessions",
                "demo:00=caches,name=templates",
                "demo:name=scheduler",
                "demo:00=net,name=listener",
            ]
        );
    }

    #[test]
    fn install_twice_is_a_duplicate() {
        let (registry, _) = installed();
        let err = install(&registry).unwrap_err();
        assert_eq!(err.kind(), "DuplicateNameError");
        assert_eq!(registry.names(&NamePattern::new("demo:*")).len(), 4);
    }

    #[test]
    fn cache_resize_overloads() {
        let (registry, names) = installed();
        let cache = registry.dispatcher(&names[0]).unwrap();

        cache
            .invoke("resize", &[Value::Int(0), Value::Bool(false)], &Signature::from([TypeTag::Int, TypeTag::Boolean]))
            .unwrap();
        assert_eq!(cache.get_attribute("count").unwrap(), Value::Int(0));

        let err = cache
            .invoke("resize", &[Value::Int(-1)], &Signature::from([TypeTag::Int]))
            .unwrap_err();
        assert_eq!(err.kind(), "DispatchError");
    }

    #[test]
    fn cache_attributes_pair_accessors() {
        let (registry, names) = installed();
        let info = registry.dispatcher(&names[1]).unwrap().info();
        let size = info.attribute("size").unwrap();
        assert!(size.readable && size.writable);
        assert_eq!(size.description, "maximum number of entries");
        assert!(!info.attribute("hits").unwrap().writable);
    }

    #[test]
    fn scheduler_failure_keeps_cause_chain() {
        let (registry, names) = installed();
        let scheduler = registry.dispatcher(&names[2]).unwrap();
        let err = scheduler.invoke("fail", &[], &Signature::empty()).unwrap_err();
        let chain: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!(chain, vec!["invocation of fail() failed", "job 1 failed", "worker 4 lost"]);
    }

    #[test]
    fn listener_publishes_public_members() {
        let (registry, names) = installed();
        let listener = registry.dispatcher(&names[3]).unwrap();
        let info = listener.info();

        let attributes: Vec<&str> = info.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attributes, vec!["accepted", "backlog", "bound", "port", "protocol"]);
        assert!(!info.attribute("protocol").unwrap().writable);

        let operations: Vec<&str> = info.operations.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(operations, vec!["accept"]);
    }

    #[test]
    fn listener_port_coerces_through_constructor() {
        let (registry, names) = installed();
        let port = registry.types().coerce_str("Port", "9090").unwrap();
        let listener = registry.dispatcher(&names[3]).unwrap();
        listener.set_attribute("port", port).unwrap();
        assert_eq!(listener.get_attribute("port").unwrap().render(), ":9090");
    }
}
