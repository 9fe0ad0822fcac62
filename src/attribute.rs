//! Typed per-entry metadata: attribute descriptors and attribute maps.
//!
//! An [`Attribute<T>`] is a process-wide descriptor for one slot of typed
//! metadata on a cache entry: a name, a default value, and an optional
//! validity predicate. An [`AttributeMap`] holds the values attached to one
//! entry, keyed by descriptor identity.
//!
//! ## Architecture
//!
//! ```text
//!   Attribute<i64> { id: 7, name: "size", default: 1, valid: |v| v >= 0 }
//!                      │
//!                      ▼ keyed by id
//!   AttributeMap
//!   ┌────┬──────────────────────────────┐
//!   │ id │ Slot                         │
//!   ├────┼──────────────────────────────┤
//!   │ 7  │ Long(AtomicI64: 4)           │  ← primitive, unboxed
//!   │ 9  │ Bool(AtomicBool: true)       │
//!   │ 12 │ Object(Arc<dyn Any>)         │  ← arbitrary typed metadata
//!   └────┴──────────────────────────────┘
//! ```
//!
//! Primitive values (`bool`, `i8`, `char`, `i16`, `i32`, `i64`, `f32`,
//! `f64`) are stored unboxed in atomic cells, so hot-path reads and
//! in-place updates ([`AttributeMap::set`], [`AttributeMap::add_long`])
//! never allocate. Everything else is stored once behind an
//! `Arc<dyn Any + Send + Sync>`. The representation is chosen per
//! descriptor at construction time via [`TypeTag`].
//!
//! ## Invariants
//!
//! - Lookup of an attribute with no stored slot returns the descriptor's
//!   default value.
//! - [`AttributeMap::try_put`] rejects values that fail the descriptor's
//!   validity predicate and leaves the map unchanged.
//! - Descriptor equality is identity: two descriptors with equal names are
//!   still distinct attributes.
//!
//! In-place updates through `&self` exist so that the attribute service and
//! policies can maintain counters (hits, reference bits, timestamps) on
//! entries that are already shared. A slot can only be updated in place if
//! it is present; the store guarantees presence for hard-registered
//! attributes by materializing them in every entry map it creates.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicU32, AtomicU64, Ordering,
};
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;

use crate::error::AttributeError;

/// Process-wide attribute id allocator.
static NEXT_ATTRIBUTE_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// TypeTag
// ---------------------------------------------------------------------------

/// Storage representation of an attribute, fixed at descriptor construction.
///
/// The eight primitive variants are stored unboxed; everything else falls
/// back to [`TypeTag::Object`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// `bool`
    Bool,
    /// `i8`
    Byte,
    /// `char`
    Char,
    /// `i16`
    Short,
    /// `i32`
    Int,
    /// `i64`
    Long,
    /// `f32`
    Float,
    /// `f64`
    Double,
    /// Any other `Clone + Send + Sync + 'static` type, boxed in an `Arc`.
    Object,
}

fn tag_of<T: 'static>() -> TypeTag {
    use std::any::TypeId;
    let t = TypeId::of::<T>();
    if t == TypeId::of::<bool>() {
        TypeTag::Bool
    } else if t == TypeId::of::<i8>() {
        TypeTag::Byte
    } else if t == TypeId::of::<char>() {
        TypeTag::Char
    } else if t == TypeId::of::<i16>() {
        TypeTag::Short
    } else if t == TypeId::of::<i32>() {
        TypeTag::Int
    } else if t == TypeId::of::<i64>() {
        TypeTag::Long
    } else if t == TypeId::of::<f32>() {
        TypeTag::Float
    } else if t == TypeId::of::<f64>() {
        TypeTag::Double
    } else {
        TypeTag::Object
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// One stored attribute value. Primitives live in atomic cells so they can
/// be updated in place through `&self`; objects are immutable once stored.
pub(crate) enum Slot {
    Bool(AtomicBool),
    Byte(AtomicI8),
    Char(AtomicU32),
    Short(AtomicI16),
    Int(AtomicI32),
    Long(AtomicI64),
    Float(AtomicU32),
    Double(AtomicU64),
    Object(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        AttrValue::from_slot(self).fmt(f)
    }
}

impl Clone for Slot {
    fn clone(&self) -> Self {
        match self {
            Slot::Bool(c) => Slot::Bool(AtomicBool::new(c.load(Ordering::Relaxed))),
            Slot::Byte(c) => Slot::Byte(AtomicI8::new(c.load(Ordering::Relaxed))),
            Slot::Char(c) => Slot::Char(AtomicU32::new(c.load(Ordering::Relaxed))),
            Slot::Short(c) => Slot::Short(AtomicI16::new(c.load(Ordering::Relaxed))),
            Slot::Int(c) => Slot::Int(AtomicI32::new(c.load(Ordering::Relaxed))),
            Slot::Long(c) => Slot::Long(AtomicI64::new(c.load(Ordering::Relaxed))),
            Slot::Float(c) => Slot::Float(AtomicU32::new(c.load(Ordering::Relaxed))),
            Slot::Double(c) => Slot::Double(AtomicU64::new(c.load(Ordering::Relaxed))),
            Slot::Object(arc) => Slot::Object(arc.clone()),
        }
    }
}

fn encode<T: Clone + Send + Sync + 'static>(value: T) -> Slot {
    let any: &dyn Any = &value;
    if let Some(v) = any.downcast_ref::<bool>() {
        return Slot::Bool(AtomicBool::new(*v));
    }
    if let Some(v) = any.downcast_ref::<i8>() {
        return Slot::Byte(AtomicI8::new(*v));
    }
    if let Some(v) = any.downcast_ref::<char>() {
        return Slot::Char(AtomicU32::new(*v as u32));
    }
    if let Some(v) = any.downcast_ref::<i16>() {
        return Slot::Short(AtomicI16::new(*v));
    }
    if let Some(v) = any.downcast_ref::<i32>() {
        return Slot::Int(AtomicI32::new(*v));
    }
    if let Some(v) = any.downcast_ref::<i64>() {
        return Slot::Long(AtomicI64::new(*v));
    }
    if let Some(v) = any.downcast_ref::<f32>() {
        return Slot::Float(AtomicU32::new(v.to_bits()));
    }
    if let Some(v) = any.downcast_ref::<f64>() {
        return Slot::Double(AtomicU64::new(v.to_bits()));
    }
    Slot::Object(Arc::new(value))
}

fn decode<T: Clone + 'static>(slot: &Slot) -> Option<T> {
    match slot {
        Slot::Bool(c) => {
            let v = c.load(Ordering::Relaxed);
            (&v as &dyn Any).downcast_ref::<T>().cloned()
        },
        Slot::Byte(c) => {
            let v = c.load(Ordering::Relaxed);
            (&v as &dyn Any).downcast_ref::<T>().cloned()
        },
        Slot::Char(c) => {
            let v = char::from_u32(c.load(Ordering::Relaxed))?;
            (&v as &dyn Any).downcast_ref::<T>().cloned()
        },
        Slot::Short(c) => {
            let v = c.load(Ordering::Relaxed);
            (&v as &dyn Any).downcast_ref::<T>().cloned()
        },
        Slot::Int(c) => {
            let v = c.load(Ordering::Relaxed);
            (&v as &dyn Any).downcast_ref::<T>().cloned()
        },
        Slot::Long(c) => {
            let v = c.load(Ordering::Relaxed);
            (&v as &dyn Any).downcast_ref::<T>().cloned()
        },
        Slot::Float(c) => {
            let v = f32::from_bits(c.load(Ordering::Relaxed));
            (&v as &dyn Any).downcast_ref::<T>().cloned()
        },
        Slot::Double(c) => {
            let v = f64::from_bits(c.load(Ordering::Relaxed));
            (&v as &dyn Any).downcast_ref::<T>().cloned()
        },
        Slot::Object(arc) => arc.as_ref().downcast_ref::<T>().cloned(),
    }
}

/// Stores `value` into an existing slot of the matching primitive kind.
/// Returns `false` for object slots and for kind mismatches.
fn store_in_place<T: 'static>(slot: &Slot, value: &T) -> bool {
    let any: &dyn Any = value;
    match slot {
        Slot::Bool(c) => {
            if let Some(v) = any.downcast_ref::<bool>() {
                c.store(*v, Ordering::Relaxed);
                return true;
            }
            false
        },
        Slot::Byte(c) => {
            if let Some(v) = any.downcast_ref::<i8>() {
                c.store(*v, Ordering::Relaxed);
                return true;
            }
            false
        },
        Slot::Char(c) => {
            if let Some(v) = any.downcast_ref::<char>() {
                c.store(*v as u32, Ordering::Relaxed);
                return true;
            }
            false
        },
        Slot::Short(c) => {
            if let Some(v) = any.downcast_ref::<i16>() {
                c.store(*v, Ordering::Relaxed);
                return true;
            }
            false
        },
        Slot::Int(c) => {
            if let Some(v) = any.downcast_ref::<i32>() {
                c.store(*v, Ordering::Relaxed);
                return true;
            }
            false
        },
        Slot::Long(c) => {
            if let Some(v) = any.downcast_ref::<i64>() {
                c.store(*v, Ordering::Relaxed);
                return true;
            }
            false
        },
        Slot::Float(c) => {
            if let Some(v) = any.downcast_ref::<f32>() {
                c.store(v.to_bits(), Ordering::Relaxed);
                return true;
            }
            false
        },
        Slot::Double(c) => {
            if let Some(v) = any.downcast_ref::<f64>() {
                c.store(v.to_bits(), Ordering::Relaxed);
                return true;
            }
            false
        },
        Slot::Object(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Attribute
// ---------------------------------------------------------------------------

struct AttrInner<T> {
    id: u64,
    name: String,
    tag: TypeTag,
    default: T,
    validator: Option<fn(&T) -> bool>,
}

/// Typed descriptor for one slot of entry metadata.
///
/// Descriptors are value objects compared by identity: every constructed
/// descriptor has a distinct process-wide id, and cloning shares that id.
///
/// # Example
///
/// ```
/// use polycache::attribute::{Attribute, AttributeMap};
///
/// let weight = Attribute::with_validator("weight", 1i64, |v| *v >= 0);
///
/// let mut map = AttributeMap::new();
/// assert_eq!(map.get(&weight), 1); // default
///
/// map.try_put(&weight, 40).unwrap();
/// assert_eq!(map.get(&weight), 40);
///
/// // Invalid values are rejected, the map is unchanged.
/// assert!(map.try_put(&weight, -1).is_err());
/// assert_eq!(map.get(&weight), 40);
/// ```
pub struct Attribute<T> {
    inner: Arc<AttrInner<T>>,
}

impl<T: Clone + Send + Sync + 'static> Attribute<T> {
    /// Creates a new attribute with the given name and default value.
    pub fn new(name: impl Into<String>, default: T) -> Self {
        Self {
            inner: Arc::new(AttrInner {
                id: NEXT_ATTRIBUTE_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                tag: tag_of::<T>(),
                default,
                validator: None,
            }),
        }
    }

    /// Creates a new attribute with a validity predicate.
    ///
    /// # Panics
    ///
    /// Panics if the default value itself fails the predicate; a descriptor
    /// whose default is invalid is a programming error.
    pub fn with_validator(name: impl Into<String>, default: T, validator: fn(&T) -> bool) -> Self {
        let name = name.into();
        assert!(
            validator(&default),
            "default value for attribute `{name}` fails its own validity predicate"
        );
        Self {
            inner: Arc::new(AttrInner {
                id: NEXT_ATTRIBUTE_ID.fetch_add(1, Ordering::Relaxed),
                name,
                tag: tag_of::<T>(),
                default,
                validator: Some(validator),
            }),
        }
    }

    /// Returns the process-wide unique id of this descriptor.
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns the attribute name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the storage representation of this attribute.
    #[inline]
    pub fn tag(&self) -> TypeTag {
        self.inner.tag
    }

    /// Returns a clone of the default value.
    #[inline]
    pub fn default_value(&self) -> T {
        self.inner.default.clone()
    }

    /// Returns `true` if `value` is acceptable for this attribute.
    #[inline]
    pub fn is_valid(&self, value: &T) -> bool {
        self.inner.validator.map_or(true, |f| f(value))
    }

    /// Returns a type-erased handle to this descriptor, suitable for
    /// registration with an attribute service.
    pub fn erased(&self) -> AnyAttribute {
        AnyAttribute {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for Attribute<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> PartialEq for Attribute<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Eq for Attribute<T> {}

impl<T> std::hash::Hash for Attribute<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<T> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("tag", &self.inner.tag)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AnyAttribute
// ---------------------------------------------------------------------------

trait ErasedAttribute: Send + Sync {
    fn id(&self) -> u64;
    fn name(&self) -> &str;
    fn default_slot(&self) -> Slot;
}

impl<T: Clone + Send + Sync + 'static> ErasedAttribute for AttrInner<T> {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_slot(&self) -> Slot {
        encode(self.default.clone())
    }
}

/// Type-erased attribute descriptor handle.
///
/// Used wherever descriptors of different value types must be collected
/// together: policy dependency registration and hard-slot materialization.
#[derive(Clone)]
pub struct AnyAttribute {
    inner: Arc<dyn ErasedAttribute>,
}

impl AnyAttribute {
    /// Returns the descriptor id.
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id()
    }

    /// Returns the descriptor name.
    #[inline]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Inserts this attribute's default slot into `map` unless a slot for
    /// it is already present.
    pub(crate) fn materialize(&self, map: &mut AttributeMap) {
        map.slots
            .entry(self.inner.id())
            .or_insert_with(|| self.inner.default_slot());
    }
}

impl fmt::Debug for AnyAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyAttribute")
            .field("id", &self.inner.id())
            .field("name", &self.inner.name())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// AttributeMap
// ---------------------------------------------------------------------------

/// Snapshot of one stored attribute value, used for iteration.
#[derive(Clone)]
pub enum AttrValue {
    Bool(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// An object-typed value; downcast with [`AttrValue::downcast_ref`].
    Object(Arc<dyn Any + Send + Sync>),
}

impl AttrValue {
    fn from_slot(slot: &Slot) -> Self {
        match slot {
            Slot::Bool(c) => AttrValue::Bool(c.load(Ordering::Relaxed)),
            Slot::Byte(c) => AttrValue::Byte(c.load(Ordering::Relaxed)),
            Slot::Char(c) => {
                AttrValue::Char(char::from_u32(c.load(Ordering::Relaxed)).unwrap_or('\u{0}'))
            },
            Slot::Short(c) => AttrValue::Short(c.load(Ordering::Relaxed)),
            Slot::Int(c) => AttrValue::Int(c.load(Ordering::Relaxed)),
            Slot::Long(c) => AttrValue::Long(c.load(Ordering::Relaxed)),
            Slot::Float(c) => AttrValue::Float(f32::from_bits(c.load(Ordering::Relaxed))),
            Slot::Double(c) => AttrValue::Double(f64::from_bits(c.load(Ordering::Relaxed))),
            Slot::Object(arc) => AttrValue::Object(arc.clone()),
        }
    }

    /// Attempts to view an object-typed value as `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            AttrValue::Object(arc) => arc.as_ref().downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{v}"),
            AttrValue::Byte(v) => write!(f, "{v}"),
            AttrValue::Char(v) => write!(f, "{v:?}"),
            AttrValue::Short(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::Long(v) => write!(f, "{v}"),
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Double(v) => write!(f, "{v}"),
            AttrValue::Object(_) => f.write_str("<object>"),
        }
    }
}

/// Mapping from attribute descriptors to values, attached to one entry.
///
/// Reads of absent attributes fall back to the descriptor default, so an
/// empty map is a valid (and common) attribute set.
#[derive(Clone, Default)]
pub struct AttributeMap {
    slots: FxHashMap<u64, Slot>,
}

static EMPTY: OnceLock<AttributeMap> = OnceLock::new();

impl AttributeMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self {
            slots: FxHashMap::default(),
        }
    }

    /// Returns the shared immutable empty map.
    ///
    /// Handed to loaders and attribute services whenever the caller did not
    /// supply attributes.
    pub fn empty() -> &'static AttributeMap {
        EMPTY.get_or_init(AttributeMap::new)
    }

    /// Returns the stored value for `attr`, or the descriptor default if no
    /// slot is present.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, attr: &Attribute<T>) -> T {
        self.slots
            .get(&attr.id())
            .and_then(decode::<T>)
            .unwrap_or_else(|| attr.default_value())
    }

    /// Returns the stored value for `attr`, or `fallback` if no slot is
    /// present.
    pub fn get_or<T: Clone + Send + Sync + 'static>(&self, attr: &Attribute<T>, fallback: T) -> T {
        self.slots
            .get(&attr.id())
            .and_then(decode::<T>)
            .unwrap_or(fallback)
    }

    /// Stores `value` for `attr`, replacing any existing slot.
    ///
    /// Fails if the value does not satisfy the descriptor's validity
    /// predicate; the map is left unchanged in that case.
    pub fn try_put<T: Clone + Send + Sync + 'static>(
        &mut self,
        attr: &Attribute<T>,
        value: T,
    ) -> Result<(), AttributeError> {
        if !attr.is_valid(&value) {
            return Err(AttributeError::invalid_value(attr.name()));
        }
        self.slots.insert(attr.id(), encode(value));
        Ok(())
    }

    /// Updates an existing primitive slot in place.
    ///
    /// Returns `false` when the slot is absent, when the value is invalid,
    /// or when the attribute is object-typed.
    pub fn set<T: Clone + Send + Sync + 'static>(&self, attr: &Attribute<T>, value: T) -> bool {
        if !attr.is_valid(&value) {
            return false;
        }
        match self.slots.get(&attr.id()) {
            Some(slot) => store_in_place(slot, &value),
            None => false,
        }
    }

    /// Adds `delta` to an existing `i64` slot and returns the new value.
    ///
    /// Returns `None` when the slot is absent or not long-typed.
    pub fn add_long(&self, attr: &Attribute<i64>, delta: i64) -> Option<i64> {
        match self.slots.get(&attr.id()) {
            Some(Slot::Long(c)) => Some(c.fetch_add(delta, Ordering::Relaxed) + delta),
            _ => None,
        }
    }

    /// Returns `true` if a slot for `attr` is present.
    ///
    /// Note that [`get`](Self::get) still succeeds for absent attributes by
    /// returning the descriptor default.
    pub fn contains<T>(&self, attr: &Attribute<T>) -> bool {
        self.slots.contains_key(&attr.inner.id)
    }

    /// Returns the number of stored slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slots are stored.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over `(descriptor id, value snapshot)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u64, AttrValue)> + '_ {
        self.slots
            .iter()
            .map(|(id, slot)| (*id, AttrValue::from_slot(slot)))
    }
}

impl fmt::Debug for AttributeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ---------------------------------------------------------------------------
// Well-known attributes
// ---------------------------------------------------------------------------

/// Attributes the store and the default attribute service know about.
pub mod well_known {
    use super::{Attribute, OnceLock};

    static SIZE: OnceLock<Attribute<i64>> = OnceLock::new();
    static HITS: OnceLock<Attribute<i64>> = OnceLock::new();
    static COST: OnceLock<Attribute<f64>> = OnceLock::new();
    static TIME_CREATED: OnceLock<Attribute<i64>> = OnceLock::new();
    static TIME_ACCESSED: OnceLock<Attribute<i64>> = OnceLock::new();
    static TIME_MODIFIED: OnceLock<Attribute<i64>> = OnceLock::new();

    /// Byte-volume contribution of an entry. Default 1, never negative.
    pub fn size() -> &'static Attribute<i64> {
        SIZE.get_or_init(|| Attribute::with_validator("size", 1, |v| *v >= 0))
    }

    /// Number of read hits recorded for an entry. Default 0.
    pub fn hits() -> &'static Attribute<i64> {
        HITS.get_or_init(|| Attribute::with_validator("hits", 0, |v| *v >= 0))
    }

    /// Relative cost of producing an entry. Default 1.0, always finite.
    pub fn cost() -> &'static Attribute<f64> {
        COST.get_or_init(|| Attribute::with_validator("cost", 1.0, |v| v.is_finite()))
    }

    /// Logical tick at which an entry was first inserted.
    pub fn time_created() -> &'static Attribute<i64> {
        TIME_CREATED.get_or_init(|| Attribute::with_validator("time.created", 0, |v| *v >= 0))
    }

    /// Logical tick of the most recent read hit.
    pub fn time_accessed() -> &'static Attribute<i64> {
        TIME_ACCESSED.get_or_init(|| Attribute::with_validator("time.accessed", 0, |v| *v >= 0))
    }

    /// Logical tick of the most recent value update.
    pub fn time_modified() -> &'static Attribute<i64> {
        TIME_MODIFIED.get_or_init(|| Attribute::with_validator("time.modified", 0, |v| *v >= 0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_attribute_returns_default() {
        let attr = Attribute::new("retries", 3i32);
        let map = AttributeMap::new();
        assert_eq!(map.get(&attr), 3);
        assert_eq!(map.get_or(&attr, 9), 9);
        assert!(!map.contains(&attr));
    }

    #[test]
    fn primitive_round_trips() {
        let b = Attribute::new("b", false);
        let y = Attribute::new("y", 0i8);
        let c = Attribute::new("c", 'a');
        let s = Attribute::new("s", 0i16);
        let i = Attribute::new("i", 0i32);
        let l = Attribute::new("l", 0i64);
        let f = Attribute::new("f", 0.0f32);
        let d = Attribute::new("d", 0.0f64);

        let mut map = AttributeMap::new();
        map.try_put(&b, true).unwrap();
        map.try_put(&y, -7i8).unwrap();
        map.try_put(&c, 'ø').unwrap();
        map.try_put(&s, -300i16).unwrap();
        map.try_put(&i, 1 << 20).unwrap();
        map.try_put(&l, -(1i64 << 40)).unwrap();
        map.try_put(&f, 2.5f32).unwrap();
        map.try_put(&d, -0.125f64).unwrap();

        assert!(map.get(&b));
        assert_eq!(map.get(&y), -7);
        assert_eq!(map.get(&c), 'ø');
        assert_eq!(map.get(&s), -300);
        assert_eq!(map.get(&i), 1 << 20);
        assert_eq!(map.get(&l), -(1i64 << 40));
        assert_eq!(map.get(&f), 2.5);
        assert_eq!(map.get(&d), -0.125);
        assert_eq!(map.len(), 8);
    }

    #[test]
    fn object_attributes_round_trip() {
        let attr = Attribute::new("origin", String::from("unknown"));
        let mut map = AttributeMap::new();
        assert_eq!(map.get(&attr), "unknown");
        map.try_put(&attr, "disk".to_string()).unwrap();
        assert_eq!(map.get(&attr), "disk");
        assert_eq!(attr.tag(), TypeTag::Object);
    }

    #[test]
    fn validator_rejects_and_leaves_map_unchanged() {
        let attr = Attribute::with_validator("size", 1i64, |v| *v >= 0);
        let mut map = AttributeMap::new();
        map.try_put(&attr, 10).unwrap();
        let err = map.try_put(&attr, -1).unwrap_err();
        assert_eq!(err.attribute(), "size");
        assert_eq!(map.get(&attr), 10);
    }

    #[test]
    #[should_panic(expected = "fails its own validity predicate")]
    fn invalid_default_panics() {
        let _ = Attribute::with_validator("bad", -1i64, |v| *v >= 0);
    }

    #[test]
    fn descriptor_equality_is_identity() {
        let a = Attribute::new("name", 0i64);
        let b = Attribute::new("name", 0i64);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn set_updates_only_existing_slots() {
        let attr = Attribute::new("flag", false);
        let mut map = AttributeMap::new();
        // No slot yet: in-place update refused.
        assert!(!map.set(&attr, true));
        map.try_put(&attr, false).unwrap();
        assert!(map.set(&attr, true));
        assert!(map.get(&attr));
    }

    #[test]
    fn set_rejects_invalid_values() {
        let attr = Attribute::with_validator("size", 1i64, |v| *v >= 0);
        let mut map = AttributeMap::new();
        map.try_put(&attr, 5).unwrap();
        assert!(!map.set(&attr, -5));
        assert_eq!(map.get(&attr), 5);
    }

    #[test]
    fn add_long_requires_existing_slot() {
        let attr = Attribute::new("count", 0i64);
        let mut map = AttributeMap::new();
        assert_eq!(map.add_long(&attr, 1), None);
        map.try_put(&attr, 0).unwrap();
        assert_eq!(map.add_long(&attr, 1), Some(1));
        assert_eq!(map.add_long(&attr, 4), Some(5));
        assert_eq!(map.get(&attr), 5);
    }

    #[test]
    fn clone_snapshots_values() {
        let attr = Attribute::new("count", 0i64);
        let mut map = AttributeMap::new();
        map.try_put(&attr, 1).unwrap();
        let copy = map.clone();
        map.set(&attr, 2);
        assert_eq!(map.get(&attr), 2);
        assert_eq!(copy.get(&attr), 1);
    }

    #[test]
    fn materialize_inserts_default_once() {
        let attr = Attribute::new("bit", false);
        let mut map = AttributeMap::new();
        attr.erased().materialize(&mut map);
        assert!(map.contains(&attr));
        assert!(!map.get(&attr));

        map.set(&attr, true);
        // Materializing again must not reset the stored value.
        attr.erased().materialize(&mut map);
        assert!(map.get(&attr));
    }

    #[test]
    fn empty_singleton_is_empty() {
        assert!(AttributeMap::empty().is_empty());
        assert_eq!(AttributeMap::empty().len(), 0);
    }

    #[test]
    fn well_known_defaults() {
        let map = AttributeMap::new();
        assert_eq!(map.get(well_known::size()), 1);
        assert_eq!(map.get(well_known::hits()), 0);
        assert_eq!(map.get(well_known::cost()), 1.0);
        assert!(!well_known::size().is_valid(&-1));
    }

    #[test]
    fn iteration_yields_snapshots() {
        let attr = Attribute::new("count", 0i64);
        let mut map = AttributeMap::new();
        map.try_put(&attr, 42).unwrap();
        let items: Vec<_> = map.iter().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0, attr.id());
        assert!(matches!(items[0].1, AttrValue::Long(42)));
    }
}
