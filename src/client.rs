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

use async_stream::try_stream;
use futures_core::Stream;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DecodeOptions;
use crate::error::ApiError;
use crate::page::{Page, PageRequest};
use crate::params::RequestParams;
use crate::record::{Record, Validate};
use crate::{ClientBuilder, ClientConfig, Error};

pub mod alerts;
pub mod credits;
pub mod customers;
pub mod events;
pub mod plans;
pub mod prices;
pub mod taxes;

const IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// An API client for Orb.
///
/// The API client is designed to be wrapped in an [`Arc`] and used from
/// multiple threads simultaneously.
///
/// [`Arc`]: std::sync::Arc
#[derive(Debug)]
pub struct Client {
    pub(crate) inner: ClientWithMiddleware,
    pub(crate) api_key: String,
    pub(crate) endpoint: Url,
    pub(crate) default_headers: HeaderMap,
    pub(crate) decode_options: DecodeOptions,
}

impl Client {
    /// Creates a new `Client` from its required configuration parameters.
    pub fn new(config: ClientConfig) -> Result<Client, Error> {
        ClientBuilder::default().build(config)
    }

    /// Creates a builder for a `Client` that allows for customization of
    /// optional parameters.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    fn build_request<P>(&self, method: Method, path: P, params: &RequestParams) -> RequestBuilder
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .expect("builder validated URL can be a base")
            .extend(path);
        debug!(%method, %url, "building request");
        let has_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);
        let is_post = method == Method::POST;
        // All request methods and paths are included to support retries for
        // 429 status code.
        let mut req = self.inner.request(method, url).bearer_auth(&self.api_key);
        let query = params.query_pairs();
        if !query.is_empty() {
            req = req.query(&query);
        }
        if has_body {
            req = req.json(&params.body);
        }
        // Extending replaces every default value of a name the request sets,
        // while keeping all of the request's own values for it.
        let mut headers = self.default_headers.clone();
        headers.extend(params.headers.clone());
        let has_idempotency_key = headers.contains_key(IDEMPOTENCY_KEY);
        req = req.headers(headers);
        if is_post && !has_idempotency_key {
            req = req.header(IDEMPOTENCY_KEY, uuid::Uuid::new_v4().to_string());
        }
        req
    }

    async fn send_request<T>(&self, req: RequestBuilder) -> Result<T, Error>
    where
        T: DeserializeOwned + Validate,
    {
        #[derive(Deserialize)]
        struct ErrorResponse {
            title: String,
            #[serde(default)]
            detail: Option<String>,
            #[serde(default)]
            validation_errors: Vec<String>,
        }

        let res = req.send().await?;
        let status_code = res.status();
        if status_code.is_success() {
            let body = res.bytes().await?;
            decode_response(&body, &self.decode_options)
        } else {
            let res_body = res.text().await?;
            match serde_json::from_str::<ErrorResponse>(&res_body) {
                Ok(e) => Err(Error::Api(ApiError {
                    status_code,
                    title: e.title,
                    detail: e.detail,
                    validation_errors: e.validation_errors,
                })),
                Err(e) => {
                    warn!(%status_code, error = %e, body = %res_body, "undecodable API error");
                    Err(Error::Api(ApiError {
                        status_code,
                        title: "decoding failure".into(),
                        detail: Some("unable to decode API response as JSON".into()),
                        validation_errors: vec![],
                    }))
                }
            }
        }
    }

    async fn fetch_page<T>(&self, request: PageRequest) -> Result<Page<T>, Error>
    where
        T: DeserializeOwned + Validate,
    {
        let req = self.build_request(request.method.clone(), &request.path, &request.params);
        let response: Record = self.send_request(req).await?;
        let page = Page::new(request, response);
        if self.decode_options.validate {
            page.validate()?;
        }
        Ok(page)
    }

    /// Fetches the page following `page`, if there is one.
    ///
    /// The request is identical to the one that produced `page` except for
    /// its cursor.
    pub async fn next_page<T>(&self, page: &Page<T>) -> Result<Option<Page<T>>, Error>
    where
        T: DeserializeOwned + Validate,
    {
        match page.next_request()? {
            None => Ok(None),
            Some(request) => self.fetch_page(request).await.map(Some),
        }
    }

    fn stream_paginated_request<T>(
        &self,
        request: PageRequest,
    ) -> impl Stream<Item = Result<T, Error>> + '_
    where
        T: DeserializeOwned + Validate + 'static,
    {
        try_stream! {
            let mut page: Page<T> = self.fetch_page(request).await?;
            loop {
                for datum in page.data()? {
                    yield datum;
                }
                match self.next_page(&page).await? {
                    None => break,
                    Some(next) => page = next,
                }
            }
        }
    }
}

/// Decodes a successful response body.
pub(crate) fn decode_response<T>(body: &[u8], options: &DecodeOptions) -> Result<T, Error>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_slice(body).map_err(|e| Error::decode("<response>", e))?;
    if options.validate {
        value.validate()?;
    }
    Ok(value)
}
