use core::fmt::{self, Display, Formatter};

/// Machine-readable tag of an [`super::IocError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FactoryAlreadyBound,
    FactoryNotBound,
    CircularDependency,
    IncorrectType,
    Factory,
}

impl ErrorKind {
    /// Name of the error kind, used to identify it in logs
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FactoryAlreadyBound => "FactoryAlreadyBoundError",
            Self::FactoryNotBound => "FactoryNotBoundError",
            Self::CircularDependency => "CircularDependencyError",
            Self::IncorrectType => "IncorrectTypeError",
            Self::Factory => "FactoryError",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
