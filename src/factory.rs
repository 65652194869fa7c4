use core::marker::PhantomData;
use tracing::debug;

use crate::{
    errors::IocError,
    utils::thread_safety::{erase, RcAnyThreadSafety, RcThreadSafety, SendSafety, SyncSafety},
    Container,
};

/// Creates values for a binding.
///
/// Implemented for every `Fn(&Container) -> Result<T, IocError>`,
/// and can be implemented by hand for factories that carry their own state:
/// ```rust
/// use plain_ioc::{Container, Factory, IocError};
///
/// struct Database {
///     dsn: String,
/// }
///
/// struct DatabaseFactory {
///     dsn: &'static str,
/// }
///
/// impl Factory<Database> for DatabaseFactory {
///     fn create(&self, _container: &Container) -> Result<Database, IocError> {
///         Ok(Database { dsn: self.dsn.to_owned() })
///     }
/// }
///
/// let container = Container::new();
/// container.bind_factory("db", DatabaseFactory { dsn: "postgres://localhost" })?;
///
/// assert_eq!(container.resolve::<Database>("db")?.dsn, "postgres://localhost");
/// # Ok::<_, IocError>(())
/// ```
pub trait Factory<T>: SendSafety + SyncSafety + 'static {
    /// # Errors
    /// Any error of the factory is returned to the caller of [`Container::resolve`] as is
    fn create(&self, container: &Container) -> Result<T, IocError>;
}

impl<F, T> Factory<T> for F
where
    F: Fn(&Container) -> Result<T, IocError> + SendSafety + SyncSafety + 'static,
{
    #[inline]
    fn create(&self, container: &Container) -> Result<T, IocError> {
        self(container)
    }
}

pub(crate) trait ErasedFactory: SendSafety + SyncSafety {
    fn create_any(&self, container: &Container) -> Result<RcAnyThreadSafety, IocError>;
}

struct Erased<F, T> {
    factory: F,
    _provides: PhantomData<fn() -> T>,
}

impl<F, T> ErasedFactory for Erased<F, T>
where
    F: Factory<T>,
    T: SendSafety + SyncSafety + 'static,
{
    #[inline]
    fn create_any(&self, container: &Container) -> Result<RcAnyThreadSafety, IocError> {
        let value = self.factory.create(container)?;
        debug!("Created");
        Ok(erase(value))
    }
}

pub(crate) type BoxedFactory = RcThreadSafety<dyn ErasedFactory>;

#[inline]
#[must_use]
pub(crate) fn boxed_factory<F, T>(factory: F) -> BoxedFactory
where
    F: Factory<T>,
    T: SendSafety + SyncSafety + 'static,
{
    RcThreadSafety::new(Erased {
        factory,
        _provides: PhantomData,
    })
}

/// Wrapper to create a factory that just returns clones of passed value.
/// It can be used when the value was created outside the container.
#[inline]
#[must_use]
pub fn instance<T>(value: T) -> impl Fn(&Container) -> Result<T, IocError> + Clone + SendSafety + SyncSafety + 'static
where
    T: Clone + SendSafety + SyncSafety + 'static,
{
    move |_: &Container| Ok(value.clone())
}
