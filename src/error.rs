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

use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;

/// An error returned by a [`Client`] or by a typed accessor on a model.
///
/// [`Client`]: crate::Client
#[derive(Debug)]
pub enum Error {
    /// An error in the underlying transport.
    Transport(reqwest::Error),
    /// An error in the retry middleware wrapping the transport.
    Middleware(reqwest_middleware::Error),
    /// An error returned by the API.
    Api(ApiError),
    /// A required field was absent.
    MissingField {
        /// The name of the missing field.
        field: String,
    },
    /// A field was present but its value could not be decoded into the
    /// expected type.
    Decode {
        /// The name of the offending field.
        field: String,
        /// A description of the decoding failure.
        detail: String,
    },
    /// A value could not be encoded into JSON.
    Encode {
        /// The name of the offending field.
        field: String,
        /// A description of the encoding failure.
        detail: String,
    },
    /// A header name or value supplied to a builder is not a valid HTTP
    /// header.
    InvalidHeader {
        /// The header name as supplied.
        name: String,
        /// A description of the parse failure.
        detail: String,
    },
    /// A union value did not match any of its known shapes.
    UnknownVariant {
        /// The name of the union type.
        union: &'static str,
        /// The discriminator value that was observed, if it was a string.
        discriminator: Option<String>,
    },
    /// The API returned a response that was well-formed JSON but violated
    /// the documented contract.
    UnexpectedResponse {
        /// A description of the violation.
        detail: String,
    },
}

impl Error {
    pub(crate) fn decode(field: impl Into<String>, detail: impl fmt::Display) -> Error {
        Error::Decode {
            field: field.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Error {
        Error::MissingField {
            field: field.into(),
        }
    }
}

/// An error returned by the Orb API.
///
/// For details, see: <https://docs.withorb.com/docs/orb-docs/error-responses>
#[derive(Debug, Clone)]
pub struct ApiError {
    /// The HTTP status code.
    pub status_code: StatusCode,
    /// A brief description of the error message.
    pub title: String,
    /// A human-readable description providing more insight into the error.
    pub detail: Option<String>,
    /// Errors that occurred while validating the request.
    pub validation_errors: Vec<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.status_code)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "transport error: {e}"),
            Error::Middleware(e) => write!(f, "middleware error: {e}"),
            Error::Api(e) => write!(f, "api error: {e}"),
            Error::MissingField { field } => write!(f, "missing required field `{field}`"),
            Error::Decode { field, detail } => write!(f, "invalid value for `{field}`: {detail}"),
            Error::Encode { field, detail } => {
                write!(f, "unable to encode `{field}`: {detail}")
            }
            Error::InvalidHeader { name, detail } => {
                write!(f, "invalid header `{name}`: {detail}")
            }
            Error::UnknownVariant {
                union,
                discriminator: Some(tag),
            } => write!(f, "`{tag}` is not a known variant of {union}"),
            Error::UnknownVariant {
                union,
                discriminator: None,
            } => write!(f, "value does not match any known variant of {union}"),
            Error::UnexpectedResponse { detail } => write!(f, "unexpected response: {detail}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            Error::Middleware(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Error {
        Error::Transport(e)
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(e: reqwest_middleware::Error) -> Error {
        match e {
            reqwest_middleware::Error::Reqwest(e) => Error::Transport(e),
            e => Error::Middleware(e),
        }
    }
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Error {
        Error::Api(e)
    }
}
