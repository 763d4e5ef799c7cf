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

//! Discriminated unions over record-backed shapes.
//!
//! A union is an enum with one variant per known shape plus an `Unknown`
//! variant holding the raw JSON. Decoding never fails: a payload whose
//! discriminator is missing, unrecognized, or whose recognized shape does not
//! validate is kept verbatim in `Unknown`, so that responses produced by a
//! newer server still deserialize. The problem surfaces as
//! [`Error::UnknownVariant`] when the value is validated or when a shared
//! accessor is called on it.

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::record::{Model, Record, Validate};

/// An enum of record-backed shapes selected by a discriminator field.
pub trait Union: Sized {
    /// The type name, used in error messages.
    const NAME: &'static str;

    /// The JSON property that selects the shape.
    const DISCRIMINATOR: &'static str;

    /// Decodes `record` as the shape registered for `tag`.
    ///
    /// Returns `None` if no shape is registered for `tag`. Implementations
    /// construct the candidate with [`variant`], which validates it.
    fn decode_variant(tag: &str, record: Record) -> Option<Result<Self, Error>>;

    /// Wraps a payload that matched no known shape.
    fn unknown(value: Value) -> Self;

    /// The record of the held shape, or `None` for an unknown payload.
    fn known(&self) -> Option<&Record>;

    /// The raw payload, if no known shape matched.
    fn unknown_value(&self) -> Option<&Value>;

    /// The record of the held shape, failing for an unknown payload.
    fn known_or_err(&self) -> Result<&Record, Error> {
        self.known().ok_or_else(|| unknown_variant_error::<Self>(self))
    }
}

/// Builds and validates a candidate shape for [`Union::decode_variant`].
pub fn variant<T>(record: Record) -> Result<T, Error>
where
    T: Model + Validate,
{
    let shape = T::from_record(record);
    shape.validate()?;
    Ok(shape)
}

/// Decodes a JSON value into `U`, falling back to [`Union::unknown`].
pub fn decode<U>(value: Value) -> U
where
    U: Union,
{
    let tag = match value.get(U::DISCRIMINATOR) {
        Some(Value::String(tag)) => tag.clone(),
        _ => {
            debug!(union = U::NAME, "missing or non-string discriminator");
            return U::unknown(value);
        }
    };
    let record = match &value {
        Value::Object(fields) => Record::from_map(fields.clone()),
        _ => return U::unknown(value),
    };
    match U::decode_variant(&tag, record) {
        Some(Ok(decoded)) => decoded,
        Some(Err(e)) => {
            debug!(union = U::NAME, %tag, error = %e, "payload does not match its shape");
            U::unknown(value)
        }
        None => {
            debug!(union = U::NAME, %tag, "unrecognized discriminator");
            U::unknown(value)
        }
    }
}

/// Encodes `union` as the JSON it was decoded from or built with.
pub fn encode<U>(union: &U) -> Value
where
    U: Union,
{
    match (union.known(), union.unknown_value()) {
        (Some(record), _) => record.to_value(),
        (None, Some(value)) => value.clone(),
        (None, None) => Value::Null,
    }
}

/// Compares two unions by their wire representation.
pub fn wire_eq<U>(a: &U, b: &U) -> bool
where
    U: Union,
{
    match (a.known(), b.known()) {
        (Some(a), Some(b)) => a == b,
        _ => encode(a) == encode(b),
    }
}

/// Fails with [`Error::UnknownVariant`] if `union` holds no known shape.
pub fn validate<U>(union: &U) -> Result<(), Error>
where
    U: Union,
{
    union.known_or_err().map(|_| ())
}

fn unknown_variant_error<U>(union: &U) -> Error
where
    U: Union,
{
    let discriminator = union
        .unknown_value()
        .and_then(|value| value.get(U::DISCRIMINATOR))
        .and_then(Value::as_str)
        .map(String::from);
    Error::UnknownVariant {
        union: U::NAME,
        discriminator,
    }
}
