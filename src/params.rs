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

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::error::Error;
use crate::record::{Field, Record, RecordBuilder};

pub(crate) const LIMIT: Field<u64> = Field::optional("limit");
pub(crate) const CURSOR: Field<String> = Field::optional_nullable("cursor");

/// The query, body and extra headers of a single API request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    pub(crate) query: Record,
    pub(crate) body: Record,
    pub(crate) headers: HeaderMap,
}

impl RequestParams {
    /// The query parameters.
    pub fn query(&self) -> &Record {
        &self.query
    }

    /// The JSON body.
    pub fn body(&self) -> &Record {
        &self.body
    }

    /// Extra headers sent with the request.
    ///
    /// They replace any default header of the same name.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Encodes the query parameters as URL query pairs.
    ///
    /// Absent keys are omitted and `null` values are sent as an empty value.
    /// Arrays repeat the key with a `[]` suffix and objects nest with
    /// `key[subkey]`.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![];
        for (key, value) in self.query.fields() {
            push_query_pairs(&mut pairs, key.clone(), value);
        }
        pairs
    }

    /// Returns a copy with the query `cursor` replaced by `cursor`.
    pub(crate) fn with_cursor(&self, cursor: &str) -> Result<RequestParams, Error> {
        Ok(RequestParams {
            query: self.query.with(&CURSOR, cursor)?,
            body: self.body.clone(),
            headers: self.headers.clone(),
        })
    }
}

fn push_query_pairs(pairs: &mut Vec<(String, String)>, key: String, value: &Value) {
    match value {
        Value::Null => pairs.push((key, String::new())),
        Value::Bool(b) => pairs.push((key, b.to_string())),
        Value::Number(n) => pairs.push((key, n.to_string())),
        Value::String(s) => pairs.push((key, s.clone())),
        Value::Array(items) => {
            let key = format!("{key}[]");
            for item in items {
                push_query_pairs(pairs, key.clone(), item);
            }
        }
        Value::Object(fields) => {
            for (subkey, value) in fields {
                push_query_pairs(pairs, format!("{key}[{subkey}]"), value);
            }
        }
    }
}

/// A builder for [`RequestParams`].
#[derive(Debug, Clone, Default)]
pub(crate) struct ParamsBuilder {
    pub(crate) query: RecordBuilder,
    pub(crate) body: RecordBuilder,
    pub(crate) headers: HeaderBuilder,
}

impl ParamsBuilder {
    pub(crate) fn header(&mut self, name: &str, value: &str) {
        self.headers.append(name, value);
    }

    pub(crate) fn build(self) -> Result<RequestParams, Error> {
        Ok(RequestParams {
            query: self.query.build()?,
            body: self.body.build()?,
            headers: self.headers.build()?,
        })
    }
}

/// Accumulates headers from strings.
///
/// Like [`RecordBuilder`], appending never fails: the first name or value
/// that is not a valid header is reported by [`HeaderBuilder::build`].
#[derive(Debug, Clone, Default)]
pub(crate) struct HeaderBuilder {
    headers: HeaderMap,
    // (name, detail) of the first header that failed to parse.
    error: Option<(String, String)>,
}

impl HeaderBuilder {
    /// Appends a value for `name`, keeping any earlier values.
    pub(crate) fn append(&mut self, name: &str, value: &str) {
        let parsed = HeaderName::try_from(name)
            .map_err(|e| e.to_string())
            .and_then(|name| match HeaderValue::from_str(value) {
                Ok(value) => Ok((name, value)),
                Err(e) => Err(e.to_string()),
            });
        match parsed {
            Ok((name, value)) => {
                self.headers.append(name, value);
            }
            Err(detail) => {
                if self.error.is_none() {
                    self.error = Some((name.into(), detail));
                }
            }
        }
    }

    pub(crate) fn build(self) -> Result<HeaderMap, Error> {
        match self.error {
            Some((name, detail)) => Err(Error::InvalidHeader { name, detail }),
            None => Ok(self.headers),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_repeated_header_values_kept() {
        let mut builder = ParamsBuilder::default();
        builder.header("X-Trace", "t1");
        builder.header("x-trace", "t2");
        let params = builder.build().unwrap();
        let values: Vec<_> = params.headers().get_all("x-trace").iter().collect();
        assert_eq!(values, vec!["t1", "t2"]);
    }

    #[test]
    fn test_invalid_header_reported_by_build() {
        let mut builder = ParamsBuilder::default();
        builder.header("X-Ok", "fine");
        builder.header("bad header", "x");
        builder.header("X-Value", "line\nbreak");
        match builder.build() {
            Err(Error::InvalidHeader { name, .. }) => assert_eq!(name, "bad header"),
            res => panic!("expected invalid header error, got {res:?}"),
        }

        let mut builder = ParamsBuilder::default();
        builder.header("X-Value", "line\nbreak");
        assert!(matches!(
            builder.build(),
            Err(Error::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_unset_limit_omitted_null_cursor_sent() {
        let mut builder = ParamsBuilder::default();
        builder.query.clear(&LIMIT).clear(&CURSOR);
        let params = builder.build().unwrap();
        let pairs = params.query_pairs();
        assert!(!pairs.iter().any(|(k, _)| k == "limit"));
        assert!(pairs.contains(&("cursor".into(), "".into())));
    }

    #[test]
    fn test_query_pair_encoding() {
        let query = Record::from_value(json!({
            "limit": 10,
            "include_all_blocks": true,
            "status": ["issued", "paid"],
            "created_at": { "gte": "2024-01-01T00:00:00Z" },
            "currency": "USD",
        }))
        .unwrap();
        let params = RequestParams {
            query,
            ..Default::default()
        };
        assert_eq!(
            params.query_pairs(),
            vec![
                ("limit".to_string(), "10".to_string()),
                ("include_all_blocks".into(), "true".into()),
                ("status[]".into(), "issued".into()),
                ("status[]".into(), "paid".into()),
                ("created_at[gte]".into(), "2024-01-01T00:00:00Z".into()),
                ("currency".into(), "USD".into()),
            ]
        );
    }

    #[test]
    fn test_with_cursor_keeps_other_fields() {
        let mut builder = ParamsBuilder::default();
        builder.query.set(&LIMIT, &3_u64);
        builder.body.insert_raw("filter", json!({ "a": 1 }));
        builder.header("X-Trace", "t1");
        let params = builder.build().unwrap();

        let next = params.with_cursor("abc").unwrap();
        assert_eq!(next.query.get(&CURSOR).unwrap().as_deref(), Some("abc"));
        assert_eq!(next.query.get(&LIMIT).unwrap(), Some(3));
        assert_eq!(next.body, params.body);
        assert_eq!(next.headers, params.headers);
    }
}
