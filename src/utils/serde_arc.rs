//! Serde support for `Arc`-shared fields: the value is (de)serialized
//! transparently, so shared descriptors look like plain structs on the wire.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub fn serialize<S, T>(value: &Arc<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: Serialize,
{
    value.as_ref().serialize(serializer)
}

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Arc<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Arc::new)
}
