// Copyright Materialize, Inc. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! JSON-backed records with typed accessors.
//!
//! Every model in this crate stores its state as the JSON object it was
//! decoded from (or built into) and decodes individual fields on read. Fields
//! the crate does not know about are carried along untouched, so a model that
//! is read from the API and written back loses nothing.

use std::borrow::Borrow;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Whether a field must be present and whether it may hold `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    /// The field must be present and must not be `null`.
    Required,
    /// The field must be present but may be `null`.
    Nullable,
    /// The field may be absent. Clearing it removes the key.
    Optional,
    /// The field may be absent or `null`. Clearing it stores `null`.
    OptionalNullable,
}

impl Presence {
    /// Reports whether an absent field is an error.
    pub const fn is_required(self) -> bool {
        matches!(self, Presence::Required | Presence::Nullable)
    }

    /// Reports whether the field may hold an explicit `null`.
    pub const fn is_nullable(self) -> bool {
        matches!(self, Presence::Nullable | Presence::OptionalNullable)
    }
}

/// A typed key into a [`Record`].
///
/// Models declare one `Field` constant per documented property; the
/// constant carries both the wire name and the [`Presence`] rules that
/// [`Record::get`] and [`RecordBuilder::clear`] enforce.
pub struct Field<T> {
    name: &'static str,
    presence: Presence,
    _type: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    const fn new(name: &'static str, presence: Presence) -> Field<T> {
        Field {
            name,
            presence,
            _type: PhantomData,
        }
    }

    /// Declares a field that must be present and non-null.
    pub const fn required(name: &'static str) -> Field<T> {
        Field::new(name, Presence::Required)
    }

    /// Declares a field that must be present but may be `null`.
    pub const fn nullable(name: &'static str) -> Field<T> {
        Field::new(name, Presence::Nullable)
    }

    /// Declares a field that may be absent.
    pub const fn optional(name: &'static str) -> Field<T> {
        Field::new(name, Presence::Optional)
    }

    /// Declares a field that may be absent or `null`.
    pub const fn optional_nullable(name: &'static str) -> Field<T> {
        Field::new(name, Presence::OptionalNullable)
    }

    /// The wire name of the field.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The presence rules of the field.
    pub const fn presence(&self) -> Presence {
        self.presence
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Field<T> {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("presence", &self.presence)
            .finish()
    }
}

/// An immutable JSON object with typed accessors.
///
/// Equality compares the underlying JSON trees and ignores key order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Record {
        Record::default()
    }

    /// Creates a builder for a new record.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Wraps an existing JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Record {
        Record { fields }
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Record, Error> {
        match value {
            Value::Object(fields) => Ok(Record { fields }),
            other => Err(Error::decode(
                "<record>",
                format_args!("expected a JSON object, found {}", json_kind(&other)),
            )),
        }
    }

    /// Decodes the value of `field`.
    ///
    /// Returns `Ok(None)` when an optional field is absent or when a field
    /// that tolerates it holds `null`. Returns [`Error::MissingField`] when a
    /// required field is absent and [`Error::Decode`] when the stored value
    /// does not decode as `T`.
    pub fn get<T>(&self, field: &Field<T>) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        match self.fields.get(field.name) {
            None if field.presence.is_required() => Err(Error::missing(field.name)),
            None => Ok(None),
            Some(Value::Null) if field.presence == Presence::Required => {
                Err(Error::decode(field.name, "value cannot be null"))
            }
            Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| Error::decode(field.name, e)),
        }
    }

    /// Decodes the value of `field`, treating `null` and absence as
    /// [`Error::MissingField`].
    pub fn require<T>(&self, field: &Field<T>) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        self.get(field)?.ok_or_else(|| Error::missing(field.name))
    }

    /// Checks that a constant-valued string field holds `expected`.
    pub fn expect_constant(&self, field: &Field<String>, expected: &str) -> Result<(), Error> {
        let actual = self.require(field)?;
        if actual == expected {
            Ok(())
        } else {
            Err(Error::decode(
                field.name,
                format_args!("expected `{expected}`, found `{actual}`"),
            ))
        }
    }

    /// Returns a copy of this record with `field` set to `value`.
    pub fn with<T, V>(&self, field: &Field<T>, value: &V) -> Result<Record, Error>
    where
        T: Borrow<V>,
        V: Serialize + ?Sized,
    {
        let mut builder = self.to_builder();
        builder.set(field, value);
        builder.build()
    }

    /// Returns a copy of this record with `field` cleared.
    ///
    /// See [`RecordBuilder::clear`].
    pub fn without<T>(&self, field: &Field<T>) -> Record {
        let mut fields = self.fields.clone();
        clear_field(&mut fields, field);
        Record { fields }
    }

    /// Returns a builder seeded with a copy of this record's fields.
    pub fn to_builder(&self) -> RecordBuilder {
        RecordBuilder {
            fields: self.fields.clone(),
            encode_error: None,
        }
    }

    /// Returns the raw JSON stored under `name`.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Reports whether a key named `name` is present, even if `null`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The number of keys in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Reports whether the record has no keys.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The underlying JSON object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the record and returns the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    /// Returns the record as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Value {
        Value::Object(record.fields)
    }
}

/// A mutable builder for a [`Record`].
///
/// Setters never fail. The first value that cannot be encoded is remembered
/// and reported by [`RecordBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    fields: Map<String, Value>,
    // (field, detail) of the first value that failed to encode.
    encode_error: Option<(String, String)>,
}

impl RecordBuilder {
    /// Encodes `value` and stores it under `field`, replacing any previous
    /// value.
    ///
    /// `value` may be any borrowed form of the field type, such as `&str`
    /// for a `Field<String>`.
    pub fn set<T, V>(&mut self, field: &Field<T>, value: &V) -> &mut Self
    where
        T: Borrow<V>,
        V: Serialize + ?Sized,
    {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.fields.insert(field.name.into(), value);
            }
            Err(e) => {
                if self.encode_error.is_none() {
                    self.encode_error = Some((field.name.into(), e.to_string()));
                }
            }
        }
        self
    }

    /// Stores `value` if present and clears the field otherwise.
    pub fn set_opt<T, V>(&mut self, field: &Field<T>, value: Option<&V>) -> &mut Self
    where
        T: Borrow<V>,
        V: Serialize + ?Sized,
    {
        match value {
            Some(value) => self.set(field, value),
            None => self.clear(field),
        }
    }

    /// Clears `field`.
    ///
    /// Nullable fields are written as an explicit `null`; all other fields
    /// are removed. The distinction is visible on the wire: an explicit
    /// `null` in a request body clears a value on the server, while an
    /// absent key leaves it untouched.
    pub fn clear<T>(&mut self, field: &Field<T>) -> &mut Self {
        clear_field(&mut self.fields, field);
        self
    }

    /// Stores a raw JSON value under `name`.
    pub fn insert_raw(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Removes the key `name`, whatever its presence rules.
    pub fn remove(&mut self, name: &str) -> &mut Self {
        self.fields.remove(name);
        self
    }

    /// Freezes the builder into an immutable [`Record`].
    pub fn build(self) -> Result<Record, Error> {
        match self.encode_error {
            Some((field, detail)) => Err(Error::Encode { field, detail }),
            None => Ok(Record {
                fields: self.fields,
            }),
        }
    }
}

fn clear_field<T>(fields: &mut Map<String, Value>, field: &Field<T>) {
    if field.presence.is_nullable() {
        fields.insert(field.name.into(), Value::Null);
    } else {
        fields.remove(field.name);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A type whose state is a [`Record`].
pub trait Model: Sized {
    /// Wraps a record without checking it.
    fn from_record(record: Record) -> Self;

    /// The underlying record.
    fn record(&self) -> &Record;

    /// Consumes the model and returns the underlying record.
    fn into_record(self) -> Record;
}

/// Eager validation of a decoded value.
///
/// Decoding a model never fails on a field-level problem; the problem is
/// reported by the first accessor that touches the field. `validate` forces
/// every required field and every nested model, so that a caller can reject
/// a malformed payload up front.
pub trait Validate {
    /// Checks the value, returning the first problem found.
    fn validate(&self) -> Result<(), Error>;
}

impl<T> Validate for Vec<T>
where
    T: Validate,
{
    fn validate(&self) -> Result<(), Error> {
        self.iter().try_for_each(Validate::validate)
    }
}

impl<T> Validate for Option<T>
where
    T: Validate,
{
    fn validate(&self) -> Result<(), Error> {
        match self {
            Some(value) => value.validate(),
            None => Ok(()),
        }
    }
}

impl Validate for Record {
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl Validate for Value {
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Declares a newtype over [`Record`] that implements [`Model`] and
/// (de)serializes as the bare JSON object.
macro_rules! record_model {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, ::serde::Deserialize, ::serde::Serialize)]
        #[serde(transparent)]
        $vis struct $name($crate::record::Record);

        impl $crate::record::Model for $name {
            fn from_record(record: $crate::record::Record) -> Self {
                $name(record)
            }

            fn record(&self) -> &$crate::record::Record {
                &self.0
            }

            fn into_record(self) -> $crate::record::Record {
                self.0
            }
        }
    };
}

pub(crate) use record_model;

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    const ID: Field<String> = Field::required("id");
    const BALANCE: Field<f64> = Field::required("balance");
    const NOTE: Field<String> = Field::nullable("note");
    const LIMIT: Field<u64> = Field::optional("limit");
    const CURSOR: Field<String> = Field::optional_nullable("cursor");
    const TAGS: Field<Vec<String>> = Field::optional("tags");

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn test_first_encode_error_reported_by_build() {
        // JSON object keys must be strings.
        const BYTES_FIRST: Field<BTreeMap<Vec<u8>, String>> = Field::optional("bytes_first");
        const BYTES_SECOND: Field<BTreeMap<Vec<u8>, String>> = Field::optional("bytes_second");
        let bad = BTreeMap::from([(vec![1_u8], "x".to_string())]);

        let mut builder = Record::builder();
        builder
            .set(&ID, "cr_1")
            .set(&BYTES_FIRST, &bad)
            .set(&BYTES_SECOND, &bad)
            .set(&BALANCE, &1.5_f64);
        match builder.build() {
            Err(Error::Encode { field, .. }) => assert_eq!(field, "bytes_first"),
            res => panic!("expected encode error, got {res:?}"),
        }

        let mut builder = Record::builder();
        builder.set(&BYTES_FIRST, &BTreeMap::<Vec<u8>, String>::new());
        assert_eq!(builder.build().unwrap().to_value(), json!({ "bytes_first": {} }));
    }

    #[test]
    fn test_set_then_get() {
        let mut builder = Record::builder();
        builder
            .set(&ID, "cr_1")
            .set(&BALANCE, &10.5_f64)
            .set(&LIMIT, &25_u64)
            .set(&TAGS, &vec!["a".to_string(), "b".to_string()]);
        let record = builder.build().unwrap();
        assert_eq!(record.require(&ID).unwrap(), "cr_1");
        assert_eq!(record.require(&BALANCE).unwrap(), 10.5);
        assert_eq!(record.get(&LIMIT).unwrap(), Some(25));
        assert_eq!(
            record.get(&TAGS).unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_missing_required_field() {
        let record = record(json!({ "balance": 1 }));
        match record.require(&ID) {
            Err(Error::MissingField { field }) => assert_eq!(field, "id"),
            res => panic!("expected missing field error, got {res:?}"),
        }
        // A nullable field is still required to be present.
        assert!(matches!(
            record.get(&NOTE),
            Err(Error::MissingField { .. })
        ));
    }

    #[test]
    fn test_optional_and_nullable() {
        let record = record(json!({ "id": "x", "note": null, "cursor": null }));
        assert_eq!(record.get(&NOTE).unwrap(), None);
        assert_eq!(record.get(&LIMIT).unwrap(), None);
        assert_eq!(record.get(&CURSOR).unwrap(), None);
    }

    #[test]
    fn test_null_required_field_is_decode_error() {
        let record = record(json!({ "id": null }));
        assert!(matches!(record.require(&ID), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_type_mismatch_is_decode_error() {
        let record = record(json!({ "id": "x", "balance": "lots" }));
        match record.require(&BALANCE) {
            Err(Error::Decode { field, .. }) => assert_eq!(field, "balance"),
            res => panic!("expected decode error, got {res:?}"),
        }
        // Other fields remain readable.
        assert_eq!(record.require(&ID).unwrap(), "x");
    }

    #[test]
    fn test_clear_omits_or_nulls() {
        let mut builder = Record::builder();
        builder.set(&LIMIT, &10_u64).set(&CURSOR, "abc");
        builder.clear(&LIMIT).clear(&CURSOR);
        let record = builder.build().unwrap();
        assert!(!record.contains("limit"));
        assert!(record.contains("cursor"));
        assert_eq!(record.raw("cursor"), Some(&Value::Null));
    }

    #[test]
    fn test_copy_with_override() {
        let original = record(json!({ "limit": 5, "cursor": null, "extra": [1, 2] }));
        let next = original.with(&CURSOR, "abc").unwrap();
        assert_eq!(next.get(&CURSOR).unwrap().as_deref(), Some("abc"));
        assert_eq!(next.get(&LIMIT).unwrap(), Some(5));
        assert_eq!(next.raw("extra"), Some(&json!([1, 2])));
        // The original is untouched.
        assert_eq!(original.get(&CURSOR).unwrap(), None);
    }

    #[test]
    fn test_equality_ignores_key_order() {
        let a: Record = serde_json::from_str(r#"{"a":1,"b":{"x":true,"y":[1,2]}}"#).unwrap();
        let b: Record = serde_json::from_str(r#"{"b":{"y":[1,2],"x":true},"a":1}"#).unwrap();
        let c: Record = serde_json::from_str(r#"{"a":2,"b":{"x":true,"y":[1,2]}}"#).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_insertion_order_preserved_on_output() {
        let record: Record = serde_json::from_str(r#"{"z":1,"a":2,"m":3}"#).unwrap();
        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn test_expect_constant() {
        const KIND: Field<String> = Field::required("kind");
        let record = record(json!({ "kind": "unit" }));
        assert!(record.expect_constant(&KIND, "unit").is_ok());
        assert!(matches!(
            record.expect_constant(&KIND, "tiered"),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(matches!(
            Record::from_value(json!([1, 2])),
            Err(Error::Decode { .. })
        ));
    }
}
