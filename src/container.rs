use alloc::vec::Vec;
use core::{
    any::type_name,
    fmt::{self, Debug, Formatter},
};
use parking_lot::Mutex;
use tracing::{debug, debug_span, error, info_span};

use crate::{
    config::Config,
    errors::IocError,
    factory::{boxed_factory, BoxedFactory, Factory},
    key::Key,
    registry::{Binding, Registry},
    resolution_stack::ResolutionStack,
    utils::thread_safety::{RcAnyThreadSafety, RcThreadSafety, SendSafety, SyncSafety},
};

/// Registry of factories by keys.
///
/// Each container is an independent registry, there is no global one.
/// Clones of a container are handles to the same registry.
///
/// # Concurrency
/// All the methods take `&self`, and no internal lock is held while a factory is running,
/// so factories can resolve and bind dependencies through the container they receive.
/// The resolution stack used by [`Config::circular_dependency_detect`] is shared by all handles,
/// so concurrent resolution from several threads with cycle detection enabled must be synchronized by the caller
/// or done with separate containers.
///
/// Threads that miss the cache of a singleton at the same time each call its factory,
/// but only the first created instance is cached and returned to all of them.
///
/// # Example
/// ```rust
/// use plain_ioc::{Config, Container};
///
/// struct Settings { dsn: &'static str }
/// struct Database { dsn: &'static str }
///
/// let container = Container::with_config(Config::new().with_circular_dependency_detect(true));
/// container
///     .bind_singleton("settings", |_| Ok(Settings { dsn: "postgres://localhost" }))?
///     .bind("db", |container| {
///         let settings = container.resolve::<Settings>("settings")?;
///         Ok(Database { dsn: settings.dsn })
///     })?;
///
/// assert_eq!(container.resolve::<Database>("db")?.dsn, "postgres://localhost");
/// # Ok::<_, plain_ioc::IocError>(())
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: RcThreadSafety<ContainerInner>,
}

impl Container {
    /// Creates container with the default config, without circular dependency detection
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[inline]
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: RcThreadSafety::new(ContainerInner {
                config,
                registry: Mutex::new(Registry::default()),
                resolution_stack: config.circular_dependency_detect.then(ResolutionStack::default),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> Config {
        self.inner.config
    }

    /// Binds a factory to the key.
    /// The factory is called on every resolution of the key.
    ///
    /// # Errors
    /// Returns [`IocError::FactoryAlreadyBound`] if a factory is already bound to the key
    pub fn bind<T, F>(&self, key: impl Into<Key>, factory: F) -> Result<&Self, IocError>
    where
        F: Fn(&Container) -> Result<T, IocError> + SendSafety + SyncSafety + 'static,
        T: SendSafety + SyncSafety + 'static,
    {
        self.insert_binding(key.into(), boxed_factory(factory), false)
    }

    /// Binds a factory to the key.
    /// The factory is called on the first resolution of the key only, the result is cached and reused.
    ///
    /// # Errors
    /// Returns [`IocError::FactoryAlreadyBound`] if a factory is already bound to the key
    pub fn bind_singleton<T, F>(&self, key: impl Into<Key>, factory: F) -> Result<&Self, IocError>
    where
        F: Fn(&Container) -> Result<T, IocError> + SendSafety + SyncSafety + 'static,
        T: SendSafety + SyncSafety + 'static,
    {
        self.insert_binding(key.into(), boxed_factory(factory), true)
    }

    /// Binds a [`Factory`] implementation to the key.
    /// The factory is called on every resolution of the key.
    ///
    /// # Errors
    /// Returns [`IocError::FactoryAlreadyBound`] if a factory is already bound to the key
    pub fn bind_factory<T, F>(&self, key: impl Into<Key>, factory: F) -> Result<&Self, IocError>
    where
        F: Factory<T>,
        T: SendSafety + SyncSafety + 'static,
    {
        self.insert_binding(key.into(), boxed_factory(factory), false)
    }

    /// Binds a [`Factory`] implementation to the key as singleton
    ///
    /// # Errors
    /// Returns [`IocError::FactoryAlreadyBound`] if a factory is already bound to the key
    pub fn bind_singleton_factory<T, F>(&self, key: impl Into<Key>, factory: F) -> Result<&Self, IocError>
    where
        F: Factory<T>,
        T: SendSafety + SyncSafety + 'static,
    {
        self.insert_binding(key.into(), boxed_factory(factory), true)
    }

    /// Removes the factory bound to the key with its cached instance
    ///
    /// # Errors
    /// Returns [`IocError::FactoryNotBound`] if no factory is bound to the key
    pub fn unbind(&self, key: impl Into<Key>) -> Result<&Self, IocError> {
        let key = key.into();
        let span = debug_span!("unbind", key = %key);
        let _guard = span.enter();

        let removed = self.inner.registry.lock().remove(&key);
        match removed {
            Ok((_, instance)) => {
                if instance.is_some() {
                    debug!("Cached instance discarded");
                }
                debug!("Unbound");
                Ok(self)
            }
            Err(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn is_bound(&self, key: impl Into<Key>) -> bool {
        self.inner.registry.lock().contains(&key.into())
    }

    /// Resolves a dependency by the key.
    ///
    /// For a singleton, the cached instance is returned if the factory was already called,
    /// so every resolution returns the same instance.
    ///
    /// # Errors
    /// - Returns [`IocError::FactoryNotBound`] if no factory is bound to the key
    /// - Returns [`IocError::CircularDependency`] if cycle detection is enabled and the key is already being resolved
    /// - Returns [`IocError::IncorrectType`] if the factory provides a type other than `T`
    /// - Returns errors of the factory as is
    pub fn resolve<T>(&self, key: impl Into<Key>) -> Result<RcThreadSafety<T>, IocError>
    where
        T: SendSafety + SyncSafety + 'static,
    {
        let key = key.into();
        let span = info_span!("resolve", key = %key, provides = type_name::<T>());
        let _guard = span.enter();

        match self.resolve_key(&key)?.downcast::<T>() {
            Ok(instance) => Ok(instance),
            Err(_) => {
                let err = IocError::IncorrectType {
                    key: key.label(),
                    expected: type_name::<T>(),
                };
                error!("{}", err);
                Err(err)
            }
        }
    }

    /// Resolves a dependency by the key without checking its type
    ///
    /// # Errors
    /// The same as [`Self::resolve`], except [`IocError::IncorrectType`]
    pub fn resolve_any(&self, key: impl Into<Key>) -> Result<RcAnyThreadSafety, IocError> {
        let key = key.into();
        let span = info_span!("resolve", key = %key);
        let _guard = span.enter();

        self.resolve_key(&key)
    }

    /// Number of bound keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.registry.lock().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of bound keys in unspecified order
    #[inline]
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.inner.registry.lock().keys()
    }
}

impl Container {
    fn insert_binding(&self, key: Key, factory: BoxedFactory, singleton: bool) -> Result<&Self, IocError> {
        let span = debug_span!("bind", key = %key, singleton);
        let _guard = span.enter();

        let inserted = self.inner.registry.lock().insert(key, Binding { factory, singleton });
        match inserted {
            Ok(()) => {
                debug!("Bound");
                Ok(self)
            }
            Err(err) => {
                error!("{}", err);
                Err(err)
            }
        }
    }

    fn resolve_key(&self, key: &Key) -> Result<RcAnyThreadSafety, IocError> {
        let Binding { factory, singleton } = {
            let registry = self.inner.registry.lock();
            let binding = match registry.get(key) {
                Ok(binding) => binding,
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            };
            if binding.singleton {
                if let Some(instance) = registry.cached(key) {
                    debug!("Found in cache");
                    return Ok(instance);
                }
                debug!("Not found in cache");
            }
            binding.clone()
        };

        let _resolution = match &self.inner.resolution_stack {
            Some(stack) => match stack.enter(key) {
                Ok(guard) => Some(guard),
                Err(err) => {
                    error!("{}", err);
                    return Err(err);
                }
            },
            None => None,
        };

        let instance = match factory.create_any(self) {
            Ok(instance) => instance,
            Err(err) => {
                error!("{}", err);
                return Err(err);
            }
        };

        if !singleton {
            return Ok(instance);
        }

        let cached = self.inner.registry.lock().cache(key, instance.clone());
        match cached {
            Some(cached) if RcThreadSafety::ptr_eq(&cached, &instance) => {
                debug!("Cached");
                Ok(cached)
            }
            Some(cached) => {
                debug!("Cached by a concurrent resolution, created instance discarded");
                Ok(cached)
            }
            None => Ok(instance),
        }
    }
}

impl Default for Container {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("config", &self.inner.config)
            .field("keys", &self.keys())
            .finish_non_exhaustive()
    }
}

pub(crate) struct ContainerInner {
    pub(crate) config: Config,
    pub(crate) registry: Mutex<Registry>,
    /// Present only if circular dependency detection is enabled
    pub(crate) resolution_stack: Option<ResolutionStack>,
}

#[allow(dead_code)]
#[cfg(test)]
mod tests {
    extern crate std;

    use super::Container;
    use crate::{instance, Config, ErrorKind, IocError, Key, Token};

    use alloc::{
        format,
        string::{String, ToString as _},
        vec::Vec,
    };
    use anyhow::anyhow;
    use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
    use tracing_test::traced_test;

    use crate::utils::thread_safety::RcThreadSafety;

    #[derive(Debug, PartialEq)]
    struct Db {
        id: u8,
    }

    #[derive(Debug, PartialEq)]
    struct Settings {
        env: &'static str,
    }

    fn detecting() -> Container {
        Container::with_config(Config::new().with_circular_dependency_detect(true))
    }

    #[test]
    #[traced_test]
    fn test_unbound() {
        let container = Container::new();

        assert!(!container.is_bound("db"));
        assert!(matches!(container.resolve::<Db>("db"), Err(IocError::FactoryNotBound { .. })));
        assert!(matches!(container.unbind("db"), Err(IocError::FactoryNotBound { .. })));

        let err = container.resolve_any("db").unwrap_err();
        assert_eq!(err.to_string(), "Factory not bound with \"db\" (string)");
        assert_eq!(err.kind(), ErrorKind::FactoryNotBound);
        assert!(logs_contain("Factory not bound with"));
    }

    #[test]
    #[traced_test]
    fn test_bind_duplicate() {
        let container = Container::new();
        container.bind("db", |_| Ok(Db { id: 1 })).unwrap();

        assert!(container.is_bound("db"));

        let err = container.bind("db", |_| Ok(Db { id: 2 })).unwrap_err();
        assert_eq!(err.to_string(), "Factory for \"db\" (string) already bound");
        assert_eq!(err.kind().name(), "FactoryAlreadyBoundError");

        assert!(matches!(
            container.bind_singleton("db", |_| Ok(Db { id: 3 })),
            Err(IocError::FactoryAlreadyBound { .. })
        ));
        assert_eq!(container.resolve::<Db>("db").unwrap().id, 1);
    }

    #[test]
    #[traced_test]
    fn test_transient_calls_factory_each_time() {
        let calls = RcThreadSafety::new(AtomicU8::new(0));
        let container = Container::new();
        container
            .bind("db", {
                let calls = calls.clone();
                move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Db { id: 1 })
                }
            })
            .unwrap();

        let first = container.resolve::<Db>("db").unwrap();
        let second = container.resolve::<Db>("db").unwrap();

        assert_eq!(*first, Db { id: 1 });
        assert_eq!(first, second);
        assert!(!RcThreadSafety::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_singleton_calls_factory_once() {
        let load_count = RcThreadSafety::new(AtomicU8::new(0));
        let container = Container::new();
        container
            .bind_singleton("cfg", {
                let load_count = load_count.clone();
                move |_| {
                    load_count.fetch_add(1, Ordering::SeqCst);
                    Ok(Settings { env: "prod" })
                }
            })
            .unwrap();

        let first = container.resolve::<Settings>("cfg").unwrap();
        let second = container.resolve::<Settings>("cfg").unwrap();
        let third = container.resolve::<Settings>("cfg").unwrap();

        assert_eq!(first.env, "prod");
        assert!(RcThreadSafety::ptr_eq(&first, &second));
        assert!(RcThreadSafety::ptr_eq(&second, &third));
        assert_eq!(load_count.load(Ordering::SeqCst), 1);
        assert!(logs_contain("Cached"));
        assert!(logs_contain("Found in cache"));
    }

    #[test]
    #[traced_test]
    fn test_unbind_discards_singleton() {
        let load_count = RcThreadSafety::new(AtomicU8::new(0));
        let container = Container::new();
        let factory = {
            let load_count = load_count.clone();
            move |_: &Container| {
                load_count.fetch_add(1, Ordering::SeqCst);
                Ok(Settings { env: "prod" })
            }
        };
        container.bind_singleton("cfg", factory.clone()).unwrap();

        let before = container.resolve::<Settings>("cfg").unwrap();
        container.unbind("cfg").unwrap();

        assert!(!container.is_bound("cfg"));
        assert!(matches!(container.resolve::<Settings>("cfg"), Err(IocError::FactoryNotBound { .. })));

        container.bind_singleton("cfg", factory).unwrap();
        let after = container.resolve::<Settings>("cfg").unwrap();

        assert!(!RcThreadSafety::ptr_eq(&before, &after));
        assert_eq!(load_count.load(Ordering::SeqCst), 2);
        assert!(logs_contain("Cached instance discarded"));
    }

    #[test]
    #[traced_test]
    fn test_nested_resolve() {
        let container = Container::new();
        container
            .bind("a", |container| container.resolve::<i32>("b").map(|b| *b))
            .unwrap()
            .bind("b", |_| Ok(42))
            .unwrap();

        assert_eq!(*container.resolve::<i32>("a").unwrap(), 42);
    }

    #[test]
    #[traced_test]
    fn test_incorrect_type() {
        let container = Container::new();
        container.bind_singleton("db", |_| Ok(Db { id: 1 })).unwrap();

        let err = container.resolve::<Settings>("db").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncorrectType);
        assert!(err.to_string().contains("\"db\" (string)"));

        // The instance is cached regardless of the requested type
        assert_eq!(container.resolve::<Db>("db").unwrap().id, 1);
    }

    #[test]
    #[traced_test]
    fn test_resolve_any() {
        let container = Container::new();
        container.bind(Key::of::<Db>(), |_| Ok(Db { id: 7 })).unwrap();

        let instance = container.resolve_any(Key::of::<Db>()).unwrap();

        assert_eq!(instance.downcast_ref::<Db>(), Some(&Db { id: 7 }));
    }

    #[test]
    #[traced_test]
    fn test_factory_error_propagates() {
        let container = detecting();
        container
            .bind("db", |_| Err::<Db, _>(anyhow!("connection refused").into()))
            .unwrap()
            .bind("repo", |container| container.resolve::<Db>("db").map(|db| db.id))
            .unwrap();

        match container.resolve::<u8>("repo") {
            Err(IocError::Factory(err)) => assert_eq!(err.to_string(), "connection refused"),
            other => panic!("factory error expected, got {other:?}"),
        }
        assert_eq!(container.inner.resolution_stack.as_ref().unwrap().depth(), 0);
    }

    #[test]
    #[traced_test]
    fn test_circular_dependency_self() {
        let container = detecting();
        container.bind("a", |container| container.resolve::<u8>("a").map(|a| *a)).unwrap();

        let err = container.resolve::<u8>("a").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CircularDependency);
        assert_eq!(
            err.to_string(),
            "Circular dependency detected\n\n\
             >>>>>>> Circular Dependency Stack <<<<<<<\n\
             >>> [0]: \"a\" (string)\n\
             >>> [1]: \"a\" (string)\n"
        );
        assert_eq!(container.inner.resolution_stack.as_ref().unwrap().depth(), 0);
    }

    #[test]
    #[traced_test]
    fn test_circular_dependency_transitive() {
        let container = detecting();
        container
            .bind("a", |container| container.resolve::<u8>("b").map(|b| *b))
            .unwrap()
            .bind("b", |container| container.resolve::<u8>("a").map(|a| *a))
            .unwrap();

        let Err(IocError::CircularDependency { stack }) = container.resolve::<u8>("a") else {
            panic!("circular dependency expected");
        };

        assert_eq!(
            stack.labels(),
            [
                String::from("\"a\" (string)"),
                String::from("\"b\" (string)"),
                String::from("\"a\" (string)"),
            ]
        );

        // The stack is empty between top-level calls, so a non-cyclic resolution still works
        container.bind("c", |_| Ok(1u8)).unwrap();
        assert_eq!(*container.resolve::<u8>("c").unwrap(), 1);
    }

    #[test]
    #[traced_test]
    fn test_reentrance_without_detection() {
        let depth = RcThreadSafety::new(AtomicUsize::new(0));
        let container = Container::new();
        container
            .bind("a", {
                let depth = depth.clone();
                move |container| {
                    if depth.fetch_add(1, Ordering::SeqCst) < 8 {
                        container.resolve::<usize>("a").map(|a| *a + 1)
                    } else {
                        Ok(0usize)
                    }
                }
            })
            .unwrap();

        assert_eq!(*container.resolve::<usize>("a").unwrap(), 8);
        assert!(container.inner.resolution_stack.is_none());
    }

    #[test]
    #[traced_test]
    fn test_singleton_not_consulting_stack_on_cache_hit() {
        let container = detecting();
        container
            .bind_singleton("cfg", |_| Ok(Settings { env: "prod" }))
            .unwrap()
            .bind("db", |container| {
                let first = container.resolve::<Settings>("cfg")?;
                let second = container.resolve::<Settings>("cfg")?;
                Ok(RcThreadSafety::ptr_eq(&first, &second))
            })
            .unwrap();

        assert!(*container.resolve::<bool>("db").unwrap());
    }

    #[test]
    #[traced_test]
    fn test_factory_unbinding_own_key() {
        let container = Container::new();
        container
            .bind_singleton("once", |container| {
                container.unbind("once")?;
                Ok(1u8)
            })
            .unwrap();

        assert_eq!(*container.resolve::<u8>("once").unwrap(), 1);
        assert!(!container.is_bound("once"));
        assert!(container.inner.registry.lock().cached(&Key::from("once")).is_none());
    }

    #[test]
    #[traced_test]
    fn test_keys() {
        let token = Token::with_description("service");
        let container = Container::new();

        assert!(container.is_empty());

        container
            .bind("name", instance("app"))
            .unwrap()
            .bind(1, instance(1u8))
            .unwrap()
            .bind(&token, instance(()))
            .unwrap();

        assert_eq!(container.len(), 3);
        assert!(container.is_bound(&token));
        assert!(!container.is_bound(Token::with_description("service")));

        let keys = container.keys();
        assert!(keys.contains(&Key::from("name")));
        assert!(keys.contains(&Key::from(1)));
        assert!(keys.contains(&Key::from(token)));
    }

    #[test]
    #[traced_test]
    fn test_clones_share_registry() {
        let container = Container::new();
        let handle = container.clone();

        handle.bind("db", |_| Ok(Db { id: 1 })).unwrap();

        assert!(container.is_bound("db"));
        assert!(format!("{container:?}").contains("Name(\"db\")"));
        assert_eq!(handle.keys(), Vec::from([Key::from("db")]));
    }
}
