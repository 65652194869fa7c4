use alloc::vec::Vec;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    errors::{IocError, ResolutionTrace},
    key::Key,
};

/// Keys that are being resolved on the current call chain, from the outermost one
#[derive(Default)]
pub(crate) struct ResolutionStack {
    keys: Mutex<Vec<Key>>,
}

impl ResolutionStack {
    /// Pushes the key and returns a guard that pops it on drop.
    ///
    /// # Errors
    /// Returns [`IocError::CircularDependency`] if the key was already in the stack.
    /// The key is popped before the error is returned.
    pub(crate) fn enter(&self, key: &Key) -> Result<ResolutionGuard<'_>, IocError> {
        let cycle = {
            let mut keys = self.keys.lock();
            let detected = keys.contains(key);
            keys.push(key.clone());
            detected.then(|| ResolutionTrace(keys.iter().map(Key::label).collect()))
        };
        let guard = ResolutionGuard { stack: self };

        match cycle {
            Some(stack) => Err(IocError::CircularDependency { stack }),
            None => Ok(guard),
        }
    }

    #[cfg(test)]
    #[inline]
    #[must_use]
    pub(crate) fn depth(&self) -> usize {
        self.keys.lock().len()
    }
}

pub(crate) struct ResolutionGuard<'a> {
    stack: &'a ResolutionStack,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.stack.keys.lock().pop() {
            debug!(%key, "Left resolution stack");
        }
    }
}
