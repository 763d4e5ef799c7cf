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

//! [<img src="https://user-images.githubusercontent.com/23521087/168297221-5d346edc-3a55-4055-b355-281b4bd76963.png" width=180 align=right>](https://materialize.com)
//! An async API client for the [Orb] billing platform.
//!
//! # Models
//!
//! Every response type is a thin wrapper around a [`Record`], the JSON object
//! the server sent. Typed accessors decode a field when they are called, so
//! a payload with an unexpected field only fails the accessor that reads it,
//! and fields this crate does not know about survive a round trip untouched.
//! Call [`Validate::validate`] to check a whole payload up front, or enable
//! [`DecodeOptions::validate`] to have the [`Client`] do so for every
//! response.
//!
//! Polymorphic values such as [`Price`] and [`TaxConfiguration`] are
//! [`Union`]s: enums with one variant per known shape plus an `Unknown`
//! variant that keeps any payload the crate cannot interpret.
//!
//! # Pagination
//!
//! List operations come in two forms. `list_*` returns a stream that fetches
//! pages as it is consumed, and `list_*_page` returns a single [`Page`] that
//! can be advanced with [`Client::next_page`].
//!
//! # Maintainership
//!
//! This is not an official Orb product. This crate is developed by
//! [Materialize], the streaming data warehouse. Contributions are encouraged:
//!
//! * [View source code](https://github.com/MaterializeInc/rust-orb-billing)
//! * [Report an issue](https://github.com/MaterializeInc/rust-orb-billing/issues/new)
//! * [Submit a pull request](https://github.com/MaterializeInc/rust-orb-billing/compare)
//!
//! [Materialize]: https://materialize.com
//!
//! # See also
//!
//! Additional information is available in the [official Orb API
//! documentation][official-api-docs].
//!
//! [Orb]: https://withorb.com
//! [official-api-docs]: https://docs.withorb.com/docs/orb-docs/api-reference

#[warn(missing_debug_implementations, missing_docs)]
mod client;
mod config;
mod error;
mod page;
mod params;
mod record;
mod serde;
pub mod union;
mod util;

pub use client::alerts::{
    Alert, AlertCreateParams, AlertCreateParamsBuilder, AlertCustomer, AlertListParams,
    AlertListParamsBuilder, AlertMetric, AlertPlan, AlertSubscription, AlertToggleParams,
    AlertType, AlertUpdateParams, Threshold,
};
pub use client::credits::{
    CreditFilter, CreditFilterField, CreditFilterOperator, CreditListParams,
    CreditListParamsBuilder, CreditListResponse, CreditStatus,
};
pub use client::customers::{
    Address, AddressInput, AddressInputBuilder, Customer, CustomerCreateParams,
    CustomerCreateParamsBuilder, CustomerListParams, CustomerListParamsBuilder,
    CustomerUpdateParams, CustomerUpdateParamsBuilder, PaymentProvider,
};
pub use client::events::{
    CustomerId, Event, EventAmendParams, EventAmendParamsBuilder, EventIngestParams,
    EventIngestParamsBuilder, EventPropertyValue, EventSearchParams, EventSearchParamsBuilder,
    IngestEvent, IngestEventBuilder, IngestEventDebug, IngestEventResponse, ValidationFailure,
};
pub use client::plans::{Plan, PlanListParams, PlanListParamsBuilder, PlanStatus};
pub use client::prices::{
    BillableMetricRef, BpsConfig, BpsPrice, BpsTier, BulkBpsConfig, BulkBpsPrice, BulkBpsTier,
    BulkConfig, BulkPrice, BulkTier, BulkWithProrationPrice, Cadence, CumulativeGroupedBulkPrice,
    CustomConfig, GroupedAllocationPrice, GroupedTieredPackagePrice, GroupedTieredPrice,
    GroupedWithMeteredMinimumPrice, GroupedWithProratedMinimumPrice, MatrixConfig, MatrixPrice,
    MatrixValue, MatrixWithAllocationPrice, MatrixWithDisplayNamePrice,
    MaxGroupTieredPackagePrice, PackageConfig, PackagePrice, PackageWithAllocationPrice, Price,
    PriceBuilder, PriceItem, PriceListParams, PriceListParamsBuilder, PriceType,
    PriceUpdateParams, PriceUpdateParamsBuilder, ScalableMatrixWithTieredPricingPrice,
    ScalableMatrixWithUnitPricingPrice, ThresholdTotalAmountPrice, Tier, TieredBpsConfig,
    TieredBpsPrice, TieredConfig, TieredPackagePrice, TieredPackageWithMinimumPrice, TieredPrice,
    TieredWithMinimumPrice, TieredWithProrationPrice, UnitConfig, UnitPrice,
    UnitWithPercentPrice, UnitWithProrationPrice,
};
pub use client::taxes::{
    AnrokTaxConfiguration, AvalaraTaxConfiguration, NumeralTaxConfiguration,
    SphereTaxConfiguration, StripeTaxConfiguration, TaxConfiguration, TaxId, TaxIdType,
    TaxJarTaxConfiguration,
};
pub use client::Client;
pub use config::{ClientBuilder, ClientConfig, DecodeOptions, DEFAULT_ENDPOINT};
pub use error::{ApiError, Error};
pub use page::{Page, PageRequest, PaginationMetadata};
pub use params::RequestParams;
pub use record::{Field, Model, Presence, Record, RecordBuilder, Validate};
pub use union::Union;
