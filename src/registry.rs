use alloc::{collections::BTreeMap, vec::Vec};

use crate::{errors::IocError, factory::BoxedFactory, key::Key, utils::thread_safety::RcAnyThreadSafety};

#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) factory: BoxedFactory,
    pub(crate) singleton: bool,
}

/// Binding table with the cache of singleton instances.
///
/// An instance is only present for a key that is bound as singleton.
#[derive(Default)]
pub(crate) struct Registry {
    bindings: BTreeMap<Key, Binding>,
    instances: BTreeMap<Key, RcAnyThreadSafety>,
}

impl Registry {
    pub(crate) fn insert(&mut self, key: Key, binding: Binding) -> Result<(), IocError> {
        use alloc::collections::btree_map::Entry::{Occupied, Vacant};

        match self.bindings.entry(key) {
            Occupied(entry) => Err(IocError::FactoryAlreadyBound { key: entry.key().label() }),
            Vacant(entry) => {
                entry.insert(binding);
                Ok(())
            }
        }
    }

    /// Removes the binding and its cached instance, returning both so they can be dropped outside of a lock
    pub(crate) fn remove(&mut self, key: &Key) -> Result<(Binding, Option<RcAnyThreadSafety>), IocError> {
        let Some(binding) = self.bindings.remove(key) else {
            return Err(IocError::FactoryNotBound { key: key.label() });
        };
        Ok((binding, self.instances.remove(key)))
    }

    #[inline]
    #[must_use]
    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Result<&Binding, IocError> {
        self.bindings.get(key).ok_or_else(|| IocError::FactoryNotBound { key: key.label() })
    }

    #[inline]
    #[must_use]
    pub(crate) fn cached(&self, key: &Key) -> Option<RcAnyThreadSafety> {
        self.instances.get(key).cloned()
    }

    /// Caches the instance if the key is still bound as singleton and nothing is cached yet.
    /// Returns the cached instance, which is the already cached one if there is.
    /// Returns `None` if the binding was removed or replaced by a non-singleton one during creation.
    pub(crate) fn cache(&mut self, key: &Key, instance: RcAnyThreadSafety) -> Option<RcAnyThreadSafety> {
        match self.bindings.get(key) {
            Some(Binding { singleton: true, .. }) => Some(self.instances.entry(key.clone()).or_insert(instance).clone()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub(crate) fn keys(&self) -> Vec<Key> {
        self.bindings.keys().cloned().collect()
    }
}
