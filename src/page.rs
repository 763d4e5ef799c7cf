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

use std::fmt;
use std::marker::PhantomData;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;
use crate::params::RequestParams;
use crate::record::{Field, Record, Validate};

const DATA: Field<Value> = Field::required("data");
const PAGINATION_METADATA: Field<PaginationMetadata> = Field::required("pagination_metadata");
const NEXT_CURSOR: Field<String> = Field::nullable("next_cursor");
const HAS_MORE: Field<bool> = Field::optional("has_more");

/// The request that produced a [`Page`].
///
/// Kept alongside the page so that the next page can be requested by
/// replacing nothing but the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub(crate) method: Method,
    pub(crate) path: Vec<String>,
    pub(crate) params: RequestParams,
}

impl PageRequest {
    pub(crate) fn new<P>(method: Method, path: P, params: RequestParams) -> PageRequest
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        PageRequest {
            method,
            path: path.into_iter().map(|s| s.as_ref().to_owned()).collect(),
            params,
        }
    }

    /// The path segments, relative to the client endpoint.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The request parameters.
    pub fn params(&self) -> &RequestParams {
        &self.params
    }
}

/// The `pagination_metadata` object of a paginated response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct PaginationMetadata(Record);

impl PaginationMetadata {
    /// The cursor of the next page, if there is one.
    pub fn next_cursor(&self) -> Result<Option<String>, Error> {
        self.0.get(&NEXT_CURSOR)
    }

    /// Whether the server reports more results.
    pub fn has_more(&self) -> Result<Option<bool>, Error> {
        self.0.get(&HAS_MORE)
    }
}

/// A single page of a paginated list operation.
pub struct Page<T> {
    request: PageRequest,
    response: Record,
    _item: PhantomData<fn() -> T>,
}

impl<T> Page<T> {
    pub(crate) fn new(request: PageRequest, response: Record) -> Page<T> {
        Page {
            request,
            response,
            _item: PhantomData,
        }
    }

    /// The request that produced this page.
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// The raw response.
    pub fn response(&self) -> &Record {
        &self.response
    }

    /// The pagination metadata.
    pub fn pagination_metadata(&self) -> Result<PaginationMetadata, Error> {
        self.response.require(&PAGINATION_METADATA)
    }

    /// Reports whether another page follows this one.
    ///
    /// That is the case when the response carries a next cursor and this
    /// page is not empty. A response too malformed to tell is treated as the
    /// last page.
    pub fn has_next(&self) -> bool {
        self.next_cursor().is_some()
    }

    /// The request for the next page, if [`Page::has_next`].
    ///
    /// The request is a copy of this page's request in which only the
    /// `cursor` query parameter differs.
    pub fn next_request(&self) -> Result<Option<PageRequest>, Error> {
        let Some(cursor) = self.next_cursor() else {
            return Ok(None);
        };
        Ok(Some(PageRequest {
            method: self.request.method.clone(),
            path: self.request.path.clone(),
            params: self.request.params.with_cursor(&cursor)?,
        }))
    }

    fn next_cursor(&self) -> Option<String> {
        let non_empty = matches!(self.response.raw("data"), Some(Value::Array(data)) if !data.is_empty());
        if !non_empty {
            return None;
        }
        self.pagination_metadata()
            .and_then(|metadata| metadata.next_cursor())
            .ok()
            .flatten()
    }
}

impl<T> Page<T>
where
    T: DeserializeOwned,
{
    /// Decodes the items on this page.
    pub fn data(&self) -> Result<Vec<T>, Error> {
        let data = self.response.require(&DATA)?;
        Vec::<T>::deserialize(&data).map_err(|e| Error::decode(DATA.name(), e))
    }
}

impl<T> Clone for Page<T> {
    fn clone(&self) -> Page<T> {
        Page::new(self.request.clone(), self.response.clone())
    }
}

impl<T> fmt::Debug for Page<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("request", &self.request)
            .field("response", &self.response)
            .finish()
    }
}

impl<T> Validate for Page<T>
where
    T: DeserializeOwned + Validate,
{
    fn validate(&self) -> Result<(), Error> {
        self.pagination_metadata()?.next_cursor()?;
        self.data()?.validate()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::params::{ParamsBuilder, CURSOR, LIMIT};

    fn first_request() -> PageRequest {
        let mut builder = ParamsBuilder::default();
        builder.query.set(&LIMIT, &2_u64);
        builder.query.insert_raw("customer_id", json!("cus_1"));
        PageRequest::new(Method::GET, ["alerts"], builder.build().unwrap())
    }

    fn page(response: Value) -> Page<Value> {
        Page::new(first_request(), Record::from_value(response).unwrap())
    }

    #[test]
    fn test_next_page_swaps_only_the_cursor() {
        let page = page(json!({
            "data": [{ "id": "a" }, { "id": "b" }],
            "pagination_metadata": { "has_more": true, "next_cursor": "abc" },
        }));
        assert!(page.has_next());
        assert_eq!(page.data().unwrap().len(), 2);

        let next = page.next_request().unwrap().unwrap();
        assert_eq!(next.params.query.get(&CURSOR).unwrap().as_deref(), Some("abc"));
        let mut rest = next.params.query.to_builder();
        rest.remove("cursor");
        assert_eq!(rest.build().unwrap(), page.request().params.query);
        assert_eq!(next.path, page.request().path);
        assert_eq!(next.method, Method::GET);
    }

    #[test]
    fn test_null_cursor_is_last_page() {
        let page = page(json!({
            "data": [{ "id": "a" }],
            "pagination_metadata": { "has_more": false, "next_cursor": null },
        }));
        assert!(!page.has_next());
        assert_eq!(page.next_request().unwrap(), None);
    }

    #[test]
    fn test_empty_page_is_last_page() {
        let page = page(json!({
            "data": [],
            "pagination_metadata": { "has_more": true, "next_cursor": "abc" },
        }));
        assert!(!page.has_next());
    }

    #[test]
    fn test_malformed_metadata_is_last_page() {
        let page = page(json!({
            "data": [{ "id": "a" }],
            "pagination_metadata": { "next_cursor": 17 },
        }));
        assert!(!page.has_next());
        assert!(page.validate().is_err());
    }
}
