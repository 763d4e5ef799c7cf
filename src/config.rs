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

use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::{Response, Url};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{
    default_on_request_failure, RetryTransientMiddleware, Retryable, RetryableStrategy,
};

use crate::client::Client;
use crate::error::Error;
use crate::params::HeaderBuilder;

pub static DEFAULT_ENDPOINT: Lazy<Url> = Lazy::new(|| {
    "https://api.withorb.com/v1"
        .parse()
        .expect("url known to be valid")
});

/// Configures the required parameters of a [`Client`].
pub struct ClientConfig {
    /// The API key to authenticate with.
    pub api_key: String,
}

/// Controls how API responses are decoded.
///
/// Decoding is lenient by default: a response is accepted as long as it is
/// JSON of the right overall shape, and problems with individual fields
/// surface when the field is read. With [`DecodeOptions::validate`] enabled,
/// every response is validated eagerly and a malformed response fails the
/// call that received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub(crate) validate: bool,
}

impl Default for DecodeOptions {
    fn default() -> DecodeOptions {
        DecodeOptions::DEFAULT
    }
}

impl DecodeOptions {
    /// The default decode options.
    ///
    /// Exposed as a constant for use in constant evaluation contexts.
    pub const DEFAULT: DecodeOptions = DecodeOptions { validate: false };

    /// Sets whether responses are validated as they are decoded.
    pub const fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// A builder for a [`Client`].
pub struct ClientBuilder {
    endpoint: Url,
    retry_policy: Option<ExponentialBackoff>,
    default_headers: HeaderBuilder,
    decode_options: DecodeOptions,
}

impl Default for ClientBuilder {
    fn default() -> ClientBuilder {
        ClientBuilder {
            endpoint: DEFAULT_ENDPOINT.clone(),
            retry_policy: Some(
                ExponentialBackoff::builder()
                    .retry_bounds(Duration::from_secs(1), Duration::from_secs(5))
                    .build_with_max_retries(5),
            ),
            default_headers: HeaderBuilder::default(),
            decode_options: DecodeOptions::DEFAULT,
        }
    }
}

/// Retry requests with a successful response of 429 (too many requests).
struct Retry429;
impl RetryableStrategy for Retry429 {
    fn handle(&self, res: &Result<Response, reqwest_middleware::Error>) -> Option<Retryable> {
        match res {
            // Retry if response status is 429
            Ok(success) if success.status() == 429 => Some(Retryable::Transient),
            // Otherwise do not retry a successful request
            Ok(_) => None,
            // Retry failures due to network errors
            Err(error) => default_on_request_failure(error),
        }
    }
}

impl ClientBuilder {
    /// Sets the policy for retrying failed API calls.
    ///
    /// Note that the created [`Client`] will retry all API calls that return a 429 status code.
    pub fn with_retry_policy(mut self, policy: ExponentialBackoff) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Disables retries.
    pub fn without_retries(mut self) -> Self {
        self.retry_policy = None;
        self
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Adds a header that is sent with every request.
    ///
    /// Headers supplied on an individual request replace every default
    /// value of the same name. An invalid name or value makes
    /// [`ClientBuilder::build`] fail with [`Error::InvalidHeader`].
    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers.append(name, value);
        self
    }

    /// Sets the options used to decode responses.
    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode_options = options;
        self
    }

    /// Creates a [`Client`] that incorporates the optional parameters
    /// configured on the builder and the specified required parameters.
    pub fn build(self, config: ClientConfig) -> Result<Client, Error> {
        let default_headers = self.default_headers.build()?;
        let client = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Client {
            inner: match self.retry_policy {
                Some(policy) => reqwest_middleware::ClientBuilder::new(client)
                    .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                        policy, Retry429,
                    ))
                    .build(),
                None => reqwest_middleware::ClientBuilder::new(client).build(),
            },
            api_key: config.api_key,
            endpoint: self.endpoint,
            default_headers,
            decode_options: self.decode_options,
        })
    }
}
