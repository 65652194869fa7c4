#![no_std]

extern crate alloc;

pub(crate) mod any;
pub(crate) mod config;
pub(crate) mod container;
pub(crate) mod errors;
pub(crate) mod factory;
pub(crate) mod key;
pub(crate) mod registry;
pub(crate) mod resolution_stack;

pub mod utils;

pub use any::TypeInfo;
pub use config::Config;
pub use container::Container;
pub use errors::{ErrorKind, IocError, ResolutionTrace};
pub use factory::{instance, Factory};
pub use key::{Key, ObjectKey, Token};
