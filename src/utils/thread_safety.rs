//! Shared-ownership aliases switched by the `thread_safe` feature.
//!
//! With `thread_safe` enabled, resolved values are handed out as [`alloc::sync::Arc`]
//! and factories and values must be `Send + Sync`.
//! Without it, [`alloc::rc::Rc`] is used and no thread bounds are required.

#[cfg(feature = "thread_safe")]
mod thread_safe {
    use alloc::sync::Arc;
    use core::any::Any;

    pub trait SendSafety: Send {}
    pub trait SyncSafety: Sync {}

    impl<T: Send + ?Sized> SendSafety for T {}
    impl<T: Sync + ?Sized> SyncSafety for T {}

    pub type RcThreadSafety<T> = Arc<T>;
    pub type RcAnyThreadSafety = RcThreadSafety<dyn Any + Send + Sync>;

    #[inline]
    #[must_use]
    pub(crate) fn erase<T: Send + Sync + 'static>(value: T) -> RcAnyThreadSafety {
        Arc::new(value)
    }
}

#[cfg(not(feature = "thread_safe"))]
mod thread_unsafe {
    use alloc::rc::Rc;
    use core::any::Any;

    pub trait SendSafety {}
    pub trait SyncSafety {}

    impl<T: ?Sized> SendSafety for T {}
    impl<T: ?Sized> SyncSafety for T {}

    pub type RcThreadSafety<T> = Rc<T>;
    pub type RcAnyThreadSafety = RcThreadSafety<dyn Any>;

    #[inline]
    #[must_use]
    pub(crate) fn erase<T: 'static>(value: T) -> RcAnyThreadSafety {
        Rc::new(value)
    }
}

#[cfg(feature = "thread_safe")]
pub(crate) use thread_safe::erase;
#[cfg(feature = "thread_safe")]
pub use thread_safe::{RcAnyThreadSafety, RcThreadSafety, SendSafety, SyncSafety};

#[cfg(not(feature = "thread_safe"))]
pub(crate) use thread_unsafe::erase;
#[cfg(not(feature = "thread_safe"))]
pub use thread_unsafe::{RcAnyThreadSafety, RcThreadSafety, SendSafety, SyncSafety};
