//! Keys and values stored in a verified map
//!
//! Rust item types carry no null of their own. `MapItem::is_null` lets a type
//! opt into one (`Option<T>` treats `None` as null) so the null-item policy of
//! a container can be enforced, and `MapItem::type_tag` lets dynamically typed
//! items take part in key/value type checks.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

/// An item that can be stored as a key or value
pub trait MapItem: Clone + PartialEq + Hash + Debug {
    /// Whether this item is the null item
    fn is_null(&self) -> bool {
        false
    }

    /// Runtime type name for dynamically typed items, `None` for static types
    fn type_tag(&self) -> Option<&'static str> {
        None
    }
}

/// Items usable as keys
pub trait MapKey: MapItem + Eq {}

impl<T: MapItem + Eq> MapKey for T {}

impl<T: MapItem> MapItem for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn type_tag(&self) -> Option<&'static str> {
        self.as_ref().and_then(MapItem::type_tag)
    }
}

impl<T: MapItem> MapItem for Box<T> {
    fn is_null(&self) -> bool {
        (**self).is_null()
    }

    fn type_tag(&self) -> Option<&'static str> {
        (**self).type_tag()
    }
}

impl<T: MapItem> MapItem for Vec<T> {}

impl<A: MapItem, B: MapItem> MapItem for (A, B) {}

macro_rules! impl_static_item {
    ($($ty:ty),* $(,)?) => {
        $(impl MapItem for $ty {})*
    };
}

impl_static_item!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    String, &'static str,
);

/// Deterministic hash of a single item; the null item hashes to 0
pub fn item_hash<T: MapItem>(item: &T) -> u64 {
    if item.is_null() {
        return 0;
    }
    let mut hasher = DefaultHasher::new();
    item.hash(&mut hasher);
    hasher.finish()
}

/// Hash contribution of one entry: key hash XOR value hash
pub fn entry_hash<K: MapItem, V: MapItem>(key: &K, value: &V) -> u64 {
    item_hash(key) ^ item_hash(value)
}

/// Treat the null item like the absent marker
pub fn non_null<V: MapItem>(value: Option<V>) -> Option<V> {
    value.filter(|v| !v.is_null())
}
