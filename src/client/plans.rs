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

use std::collections::BTreeMap;

use futures_core::Stream;
use reqwest::Method;
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use time::OffsetDateTime;

use crate::client::prices::Price;
use crate::client::Client;
use crate::error::Error;
use crate::page::{Page, PageRequest};
use crate::params::{ParamsBuilder, RequestParams, CURSOR, LIMIT};
use crate::record::{record_model, Field, Validate};
use crate::serde::Timestamp;
use crate::util::StrIteratorExt;

const PLANS_PATH: [&str; 1] = ["plans"];

const ID: Field<String> = Field::required("id");
const EXTERNAL_PLAN_ID: Field<String> = Field::nullable("external_plan_id");
const NAME: Field<String> = Field::required("name");
const DESCRIPTION: Field<String> = Field::required("description");
const STATUS: Field<PlanStatus> = Field::required("status");
const CURRENCY: Field<String> = Field::required("currency");
const CREATED_AT: Field<Timestamp> = Field::required("created_at");
const BASE_PLAN_ID: Field<String> = Field::optional_nullable("base_plan_id");
const METADATA: Field<BTreeMap<String, String>> = Field::optional("metadata");
const PRICES: Field<Vec<Price>> = Field::required("prices");

const STATUS_FILTER: Field<PlanStatus> = Field::optional("status");

record_model! {
    /// An Orb plan.
    pub struct Plan;
}

impl Plan {
    /// The Orb-assigned unique identifier for the plan.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ID)
    }

    /// An optional user-defined ID for this plan resource, used throughout
    /// the system as an alias for this plan.
    pub fn external_plan_id(&self) -> Result<Option<String>, Error> {
        self.0.get(&EXTERNAL_PLAN_ID)
    }

    /// A human-readable name for the plan.
    pub fn name(&self) -> Result<String, Error> {
        self.0.require(&NAME)
    }

    /// A human-readable description of the plan.
    pub fn description(&self) -> Result<String, Error> {
        self.0.require(&DESCRIPTION)
    }

    /// The status of the plan.
    pub fn status(&self) -> Result<PlanStatus, Error> {
        self.0.require(&STATUS)
    }

    /// The currency of the plan's prices.
    pub fn currency(&self) -> Result<String, Error> {
        self.0.require(&CURRENCY)
    }

    /// The time at which the plan was created.
    pub fn created_at(&self) -> Result<OffsetDateTime, Error> {
        Ok(self.0.require(&CREATED_AT)?.into_inner())
    }

    /// The parent plan ID, if the plan was created by overriding one or
    /// more of the parent's prices.
    pub fn base_plan_id(&self) -> Result<Option<String>, Error> {
        self.0.get(&BASE_PLAN_ID)
    }

    /// Arbitrary metadata attached to the plan.
    pub fn metadata(&self) -> Result<BTreeMap<String, String>, Error> {
        Ok(self.0.get(&METADATA)?.unwrap_or_default())
    }

    /// The prices of the plan.
    ///
    /// Prices of a pricing model this crate does not know are returned as
    /// [`Price::Unknown`].
    pub fn prices(&self) -> Result<Vec<Price>, Error> {
        self.0.require(&PRICES)
    }
}

impl Validate for Plan {
    fn validate(&self) -> Result<(), Error> {
        self.id()?;
        self.external_plan_id()?;
        self.name()?;
        self.description()?;
        self.status()?;
        self.currency()?;
        self.created_at()?;
        self.base_plan_id()?;
        self.metadata()?;
        self.prices()?.validate()
    }
}

/// The status of a plan.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// The plan can be subscribed to.
    Active,
    /// The plan no longer accepts new subscriptions.
    Archived,
    /// The plan is still being drafted.
    Draft,
    /// Other.
    #[serde(other)]
    Other(String),
}

/// Parameters for a plan list operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanListParams(RequestParams);

impl PlanListParams {
    /// Returns a builder for plan list parameters.
    pub fn builder() -> PlanListParamsBuilder {
        PlanListParamsBuilder::default()
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`PlanListParams`].
#[derive(Debug, Clone, Default)]
pub struct PlanListParamsBuilder(ParamsBuilder);

impl PlanListParamsBuilder {
    /// Filters the listing by status.
    pub fn status(mut self, status: PlanStatus) -> Self {
        self.0.query.set(&STATUS_FILTER, &status);
        self
    }

    /// Sets the page size.
    pub fn limit(mut self, limit: u64) -> Self {
        self.0.query.set(&LIMIT, &limit);
        self
    }

    /// Sets the cursor to resume from.
    pub fn cursor(mut self, cursor: Option<&str>) -> Self {
        self.0.query.set_opt(&CURSOR, cursor);
        self
    }

    /// Adds a header to the request.
    ///
    /// An invalid name or value is reported by `build`.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.0.header(name, value);
        self
    }

    /// Freezes the parameters.
    pub fn build(self) -> Result<PlanListParams, Error> {
        self.0.build().map(PlanListParams)
    }
}

impl Client {
    /// Lists all plans.
    ///
    /// The underlying API call is paginated. The returned stream will fetch
    /// additional pages as it is consumed.
    pub fn list_plans(
        &self,
        params: &PlanListParams,
    ) -> impl Stream<Item = Result<Plan, Error>> + '_ {
        self.stream_paginated_request(PageRequest::new(
            Method::GET,
            PLANS_PATH,
            params.0.clone(),
        ))
    }

    /// Fetches a single page of plans.
    pub async fn list_plans_page(&self, params: &PlanListParams) -> Result<Page<Plan>, Error> {
        self.fetch_page(PageRequest::new(Method::GET, PLANS_PATH, params.0.clone()))
            .await
    }

    /// Gets a plan by ID.
    pub async fn get_plan(&self, id: &str) -> Result<Plan, Error> {
        let req = self.build_request(
            Method::GET,
            PLANS_PATH.chain_one(id),
            &RequestParams::default(),
        );
        self.send_request(req).await
    }

    /// Gets a plan by external ID.
    pub async fn get_plan_by_external_id(&self, external_id: &str) -> Result<Plan, Error> {
        let req = self.build_request(
            Method::GET,
            PLANS_PATH
                .chain_one("external_plan_id")
                .chain_one(external_id),
            &RequestParams::default(),
        );
        self.send_request(req).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_plan_with_mixed_prices() {
        let plan: Plan = serde_json::from_value(json!({
            "id": "pl_1",
            "external_plan_id": "starter",
            "name": "Starter",
            "description": "",
            "status": "active",
            "currency": "USD",
            "created_at": "2024-01-01T00:00:00Z",
            "base_plan_id": null,
            "metadata": {},
            "prices": [
                {
                    "id": "pr_1",
                    "name": "Seats",
                    "model_type": "unit",
                    "currency": "USD",
                    "cadence": "monthly",
                    "price_type": "fixed_price",
                    "item": { "id": "it_1", "name": "Seats" },
                    "created_at": "2024-01-01T00:00:00Z",
                    "metadata": {},
                    "unit_config": { "unit_amount": "10.00" },
                },
                { "id": "pr_2", "model_type": "quantum", "currency": "USD" },
            ],
        }))
        .unwrap();

        let prices = plan.prices().unwrap();
        assert!(matches!(prices[0], Price::Unit(_)));
        assert!(matches!(prices[1], Price::Unknown(_)));
        assert_eq!(plan.status().unwrap(), PlanStatus::Active);
        // An unknown price makes the plan fail validation but not decoding.
        assert!(matches!(
            plan.validate(),
            Err(Error::UnknownVariant { .. })
        ));
    }

    #[test]
    fn test_list_params_status_filter() {
        let params = PlanListParams::builder()
            .status(PlanStatus::Archived)
            .build()
            .unwrap();
        assert_eq!(
            params.request_params().query_pairs(),
            vec![("status".to_string(), "archived".to_string())]
        );
    }
}
