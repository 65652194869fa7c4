use alloc::{borrow::Cow, string::String};
use core::{
    cmp::Ordering,
    fmt::{self, Debug, Display, Formatter, Write as _},
    hash::{Hash, Hasher},
    sync::atomic::{AtomicUsize, Ordering as AtomicOrdering},
};

use crate::{
    any::TypeInfo,
    utils::thread_safety::{erase, RcAnyThreadSafety, RcThreadSafety, SendSafety, SyncSafety},
};

static NEXT_TOKEN_ID: AtomicUsize = AtomicUsize::new(0);

/// Identifier of a binding in a [`crate::Container`].
///
/// Keys are compared by value for names and numbers, and by identity for tokens, types and objects.
/// Most of the time you don't construct it directly, because every method of the container
/// accepts `impl Into<Key>`:
/// ```rust
/// use plain_ioc::{Container, Key, Token};
///
/// let db = Token::with_description("db");
/// let container = Container::new();
/// container
///     .bind("name", |_: &Container| Ok("app"))?
///     .bind(42, |_: &Container| Ok(42u8))?
///     .bind(db.clone(), |_: &Container| Ok(()))?
///     .bind(Key::of::<String>(), |_: &Container| Ok(String::new()))?;
///
/// assert!(container.is_bound(db));
/// # Ok::<_, plain_ioc::IocError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Name(Cow<'static, str>),
    /// Integer key, wide enough to hold every signed and unsigned integer up to 64 bits without collisions
    Number(i128),
    Token(Token),
    /// Type used as a key, like a class reference in other containers
    Type(TypeInfo),
    Object(ObjectKey),
}

impl Key {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn object<T: SendSafety + SyncSafety + 'static>(value: RcThreadSafety<T>) -> Self {
        Self::Object(ObjectKey::from_rc(value))
    }

    #[inline]
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Name(_) => "string",
            Self::Number(_) => "number",
            Self::Token(_) => "token",
            Self::Type(_) => "type",
            Self::Object(_) => "object",
        }
    }

    /// Human-readable label used in error messages, for example `"db" (string)`.
    ///
    /// It never fails: if the key can't be formatted, `"<unprintable>" (<category>)` is returned.
    #[must_use]
    pub fn label(&self) -> String {
        let mut label = String::new();
        if write!(label, "\"{}\" ({})", Rendered(self), self.category()).is_ok() {
            return label;
        }

        let mut fallback = String::from("\"<unprintable>\" (");
        fallback.push_str(self.category());
        fallback.push(')');
        fallback
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

struct Rendered<'a>(&'a Key);

impl Display for Rendered<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Key::Name(name) => f.write_str(name),
            Key::Number(number) => write!(f, "{number}"),
            Key::Token(token) => write!(f, "Token({})", token.description().unwrap_or_default()),
            Key::Type(type_info) => match type_info.short_name() {
                "" => f.write_str("<anonymous>"),
                name => f.write_str(name),
            },
            Key::Object(object) => write!(f, "[object {}]", object.type_info().short_name()),
        }
    }
}

/// Unique key, like a symbol.
///
/// Every created token is distinct from all others, even with the same description.
/// Clones of a token are equal to it.
#[derive(Clone)]
pub struct Token {
    id: usize,
    description: Option<Cow<'static, str>>,
}

impl Token {
    #[inline]
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            id: NEXT_TOKEN_ID.fetch_add(1, AtomicOrdering::Relaxed),
            description: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_description(description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::new()
        }
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Token {}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Key compared by identity of a shared value.
///
/// Two object keys are equal only if they point to the same allocation.
#[derive(Clone)]
pub struct ObjectKey {
    value: RcAnyThreadSafety,
    type_info: TypeInfo,
}

impl ObjectKey {
    #[inline]
    #[must_use]
    pub fn new<T: SendSafety + SyncSafety + 'static>(value: T) -> Self {
        Self {
            value: erase(value),
            type_info: TypeInfo::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn from_rc<T: SendSafety + SyncSafety + 'static>(value: RcThreadSafety<T>) -> Self {
        let value: RcAnyThreadSafety = value;
        Self {
            value,
            type_info: TypeInfo::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> &RcAnyThreadSafety {
        &self.value
    }

    #[inline]
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    #[inline]
    fn addr(&self) -> usize {
        RcThreadSafety::as_ptr(&self.value).cast::<()>() as usize
    }
}

impl Debug for ObjectKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectKey")
            .field("type", &self.type_info.name)
            .field("addr", &self.addr())
            .finish()
    }
}

impl PartialEq for ObjectKey {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ObjectKey {}

impl PartialOrd for ObjectKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl Hash for ObjectKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl From<&'static str> for Key {
    #[inline]
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    #[inline]
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl From<Cow<'static, str>> for Key {
    #[inline]
    fn from(name: Cow<'static, str>) -> Self {
        Self::Name(name)
    }
}

impl From<i128> for Key {
    #[inline]
    fn from(number: i128) -> Self {
        Self::Number(number)
    }
}

impl From<i64> for Key {
    #[inline]
    fn from(number: i64) -> Self {
        Self::Number(number.into())
    }
}

impl From<u64> for Key {
    #[inline]
    fn from(number: u64) -> Self {
        Self::Number(number.into())
    }
}

impl From<i32> for Key {
    #[inline]
    fn from(number: i32) -> Self {
        Self::Number(number.into())
    }
}

impl From<u32> for Key {
    #[inline]
    fn from(number: u32) -> Self {
        Self::Number(number.into())
    }
}

impl From<usize> for Key {
    #[inline]
    fn from(number: usize) -> Self {
        Self::Number(number as i128)
    }
}

impl From<Token> for Key {
    #[inline]
    fn from(token: Token) -> Self {
        Self::Token(token)
    }
}

impl From<&Token> for Key {
    #[inline]
    fn from(token: &Token) -> Self {
        Self::Token(token.clone())
    }
}

impl From<TypeInfo> for Key {
    #[inline]
    fn from(type_info: TypeInfo) -> Self {
        Self::Type(type_info)
    }
}

impl From<ObjectKey> for Key {
    #[inline]
    fn from(object: ObjectKey) -> Self {
        Self::Object(object)
    }
}

impl From<&Key> for Key {
    #[inline]
    fn from(key: &Key) -> Self {
        key.clone()
    }
}
