use alloc::{boxed::Box, string::String};
use core::fmt::{self, Display, Formatter};

use super::kind::ErrorKind;

#[derive(thiserror::Error, Debug)]
pub enum IocError {
    #[error("Factory for {key} already bound")]
    FactoryAlreadyBound { key: String },
    #[error("Factory not bound with {key}")]
    FactoryNotBound { key: String },
    #[error("Circular dependency detected\n\n{stack}")]
    CircularDependency { stack: ResolutionTrace },
    #[error("Incorrect type provided by factory for {key}. Expected: {expected}")]
    IncorrectType { key: String, expected: &'static str },
    /// Error returned by a factory itself
    #[error(transparent)]
    Factory(anyhow::Error),
}

impl IocError {
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FactoryAlreadyBound { .. } => ErrorKind::FactoryAlreadyBound,
            Self::FactoryNotBound { .. } => ErrorKind::FactoryNotBound,
            Self::CircularDependency { .. } => ErrorKind::CircularDependency,
            Self::IncorrectType { .. } => ErrorKind::IncorrectType,
            Self::Factory(_) => ErrorKind::Factory,
        }
    }
}

/// Factory errors are wrapped as [`IocError::Factory`],
/// except container errors that went through [`anyhow::Error`], which are unwrapped back.
impl From<anyhow::Error> for IocError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<IocError>() {
            Ok(err) => err,
            Err(err) => Self::Factory(err),
        }
    }
}

/// Labels of the keys that were being resolved when a cycle was found, from the outermost one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTrace(pub Box<[String]>);

impl ResolutionTrace {
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.0
    }
}

impl Display for ResolutionTrace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, ">>>>>>> Circular Dependency Stack <<<<<<<")?;
        for (index, label) in self.0.iter().enumerate() {
            writeln!(f, ">>> [{index}]: {label}")?;
        }
        Ok(())
    }
}
