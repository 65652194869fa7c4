mod ioc;
mod kind;

pub use ioc::{IocError, ResolutionTrace};
pub use kind::ErrorKind;
