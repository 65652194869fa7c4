/// Config for a container
/// ## Fields
/// - `circular_dependency_detect`:
///   If `true`, the container tracks keys that are being resolved and returns
///   [`crate::IocError::CircularDependency`] when resolution of a key re-enters itself.
///
///   If `false`, nothing is tracked and a factory that resolves its own key
///   recurses until the stack is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    pub circular_dependency_detect: bool,
}

impl Config {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            circular_dependency_detect: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_circular_dependency_detect(mut self, detect: bool) -> Self {
        self.circular_dependency_detect = detect;
        self
    }
}
