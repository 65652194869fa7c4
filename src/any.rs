use core::{
    any::{type_name, TypeId},
    cmp::Ordering,
    hash::{Hash, Hasher},
};

/// Identity of a Rust type together with its name.
///
/// Equality, ordering and hashing only look at the [`TypeId`], the name is kept for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn of_val<T>(_val: &T) -> Self
    where
        T: ?Sized + 'static,
    {
        Self::of::<T>()
    }

    /// Type name without its module path and generic arguments, e.g. `Vec` for `alloc::vec::Vec<u8>`
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split_once('<').map_or(self.name, |(base, _)| base);
        base.rsplit_once("::").map_or(base, |(_, name)| name)
    }
}
