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

use futures_core::Stream;
use reqwest::Method;
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use time::OffsetDateTime;

use crate::client::Client;
use crate::error::Error;
use crate::page::{Page, PageRequest};
use crate::params::{ParamsBuilder, RequestParams, CURSOR, LIMIT};
use crate::record::{record_model, Field, Validate};
use crate::serde::Timestamp;
use crate::util::StrIteratorExt;

const CUSTOMERS_PATH: [&str; 1] = ["customers"];

const ID: Field<String> = Field::required("id");
const BALANCE: Field<f64> = Field::required("balance");
const EFFECTIVE_DATE: Field<Timestamp> = Field::nullable("effective_date");
const EXPIRY_DATE: Field<Timestamp> = Field::nullable("expiry_date");
const FILTERS: Field<Vec<CreditFilter>> = Field::required("filters");
const MAXIMUM_INITIAL_BALANCE: Field<f64> = Field::nullable("maximum_initial_balance");
const PER_UNIT_COST_BASIS: Field<String> = Field::nullable("per_unit_cost_basis");
const STATUS: Field<CreditStatus> = Field::required("status");

const FILTER_FIELD: Field<CreditFilterField> = Field::required("field");
const FILTER_OPERATOR: Field<CreditFilterOperator> = Field::required("operator");
const FILTER_VALUES: Field<Vec<String>> = Field::required("values");

const CURRENCY: Field<String> = Field::optional_nullable("currency");
const INCLUDE_ALL_BLOCKS: Field<bool> = Field::optional("include_all_blocks");

record_model! {
    /// A credit block in a customer's balance.
    pub struct CreditListResponse;
}

impl CreditListResponse {
    /// The Orb-assigned unique identifier for the credit block.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ID)
    }

    /// The remaining balance of the block.
    pub fn balance(&self) -> Result<f64, Error> {
        self.0.require(&BALANCE)
    }

    /// When the block becomes usable.
    pub fn effective_date(&self) -> Result<Option<OffsetDateTime>, Error> {
        Ok(self.0.get(&EFFECTIVE_DATE)?.map(Timestamp::into_inner))
    }

    /// When the block expires, if ever.
    pub fn expiry_date(&self) -> Result<Option<OffsetDateTime>, Error> {
        Ok(self.0.get(&EXPIRY_DATE)?.map(Timestamp::into_inner))
    }

    /// Restrictions on which usage the block may be applied to.
    pub fn filters(&self) -> Result<Vec<CreditFilter>, Error> {
        self.0.require(&FILTERS)
    }

    /// The balance the block was created with.
    pub fn maximum_initial_balance(&self) -> Result<Option<f64>, Error> {
        self.0.get(&MAXIMUM_INITIAL_BALANCE)
    }

    /// The cost basis of a single credit, as a decimal string.
    pub fn per_unit_cost_basis(&self) -> Result<Option<String>, Error> {
        self.0.get(&PER_UNIT_COST_BASIS)
    }

    /// The status of the block.
    pub fn status(&self) -> Result<CreditStatus, Error> {
        self.0.require(&STATUS)
    }
}

impl Validate for CreditListResponse {
    fn validate(&self) -> Result<(), Error> {
        self.id()?;
        self.balance()?;
        self.effective_date()?;
        self.expiry_date()?;
        self.filters()?.validate()?;
        self.maximum_initial_balance()?;
        self.per_unit_cost_basis()?;
        self.status()?;
        Ok(())
    }
}

record_model! {
    /// A filter restricting a credit block to matching usage.
    pub struct CreditFilter;
}

impl CreditFilter {
    /// The property the filter applies to.
    pub fn field(&self) -> Result<CreditFilterField, Error> {
        self.0.require(&FILTER_FIELD)
    }

    /// Whether matching values are included or excluded.
    pub fn operator(&self) -> Result<CreditFilterOperator, Error> {
        self.0.require(&FILTER_OPERATOR)
    }

    /// The values to match.
    pub fn values(&self) -> Result<Vec<String>, Error> {
        self.0.require(&FILTER_VALUES)
    }
}

impl Validate for CreditFilter {
    fn validate(&self) -> Result<(), Error> {
        self.field()?;
        self.operator()?;
        self.values()?;
        Ok(())
    }
}

/// The property a [`CreditFilter`] matches on.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum CreditFilterField {
    /// The item of the price.
    ItemId,
    /// The price itself.
    PriceId,
    /// The type of the price.
    PriceType,
    /// The currency of the price.
    Currency,
    /// The custom pricing unit of the price.
    PricingUnitId,
    /// Other.
    #[serde(other)]
    Other(String),
}

/// How a [`CreditFilter`] treats matching values.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum CreditFilterOperator {
    /// Only matching usage draws from the block.
    Includes,
    /// Matching usage never draws from the block.
    Excludes,
    /// Other.
    #[serde(other)]
    Other(String),
}

/// The status of a credit block.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    /// The block can be drawn down.
    Active,
    /// The block is awaiting payment of its invoice.
    PendingPayment,
    /// Other.
    #[serde(other)]
    Other(String),
}

/// Parameters for a credit list operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreditListParams(RequestParams);

impl CreditListParams {
    /// Returns a builder for credit list parameters.
    pub fn builder() -> CreditListParamsBuilder {
        CreditListParamsBuilder::default()
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`CreditListParams`].
#[derive(Debug, Clone, Default)]
pub struct CreditListParamsBuilder(ParamsBuilder);

impl CreditListParamsBuilder {
    /// Restricts the list to blocks in `currency`.
    ///
    /// `None` is sent as an explicit `null`, which selects blocks in the
    /// customer's default currency.
    pub fn currency(mut self, currency: Option<&str>) -> Self {
        self.0.query.set_opt(&CURRENCY, currency);
        self
    }

    /// Includes expired and depleted blocks.
    pub fn include_all_blocks(mut self, include_all_blocks: bool) -> Self {
        self.0.query.set(&INCLUDE_ALL_BLOCKS, &include_all_blocks);
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
    pub fn build(self) -> Result<CreditListParams, Error> {
        self.0.build().map(CreditListParams)
    }
}

impl Client {
    /// Lists the credit blocks of the customer with the given ID.
    ///
    /// The underlying API call is paginated. The returned stream will fetch
    /// additional pages as it is consumed.
    pub fn list_credits(
        &self,
        customer_id: &str,
        params: &CreditListParams,
    ) -> impl Stream<Item = Result<CreditListResponse, Error>> + '_ {
        let path = CUSTOMERS_PATH.chain_one(customer_id).chain_one("credits");
        self.stream_paginated_request(PageRequest::new(Method::GET, path, params.0.clone()))
    }

    /// Fetches a single page of the credit blocks of the customer with the
    /// given ID.
    pub async fn list_credits_page(
        &self,
        customer_id: &str,
        params: &CreditListParams,
    ) -> Result<Page<CreditListResponse>, Error> {
        let path = CUSTOMERS_PATH.chain_one(customer_id).chain_one("credits");
        self.fetch_page(PageRequest::new(Method::GET, path, params.0.clone()))
            .await
    }

    /// Lists the credit blocks of the customer with the given external ID.
    pub fn list_credits_by_external_id(
        &self,
        external_id: &str,
        params: &CreditListParams,
    ) -> impl Stream<Item = Result<CreditListResponse, Error>> + '_ {
        let path = CUSTOMERS_PATH
            .chain_one("external_customer_id")
            .chain_one(external_id)
            .chain_one("credits");
        self.stream_paginated_request(PageRequest::new(Method::GET, path, params.0.clone()))
    }

    /// Fetches a single page of the credit blocks of the customer with the
    /// given external ID.
    pub async fn list_credits_by_external_id_page(
        &self,
        external_id: &str,
        params: &CreditListParams,
    ) -> Result<Page<CreditListResponse>, Error> {
        let path = CUSTOMERS_PATH
            .chain_one("external_customer_id")
            .chain_one(external_id)
            .chain_one("credits");
        self.fetch_page(PageRequest::new(Method::GET, path, params.0.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDIT: &str = r#"{"id":"cr_1","balance":10.5,"effective_date":null,"expiry_date":null,"filters":[{"field":"item_id","operator":"includes","values":["it_1"]}],"maximum_initial_balance":null,"per_unit_cost_basis":null,"status":"active"}"#;

    #[test]
    fn test_decode_credit() {
        let credit: CreditListResponse = serde_json::from_str(CREDIT).unwrap();
        assert_eq!(credit.id().unwrap(), "cr_1");
        assert_eq!(credit.balance().unwrap(), 10.5);
        assert_eq!(credit.status().unwrap(), CreditStatus::Active);
        assert_eq!(credit.effective_date().unwrap(), None);
        assert_eq!(credit.maximum_initial_balance().unwrap(), None);

        let filters = credit.filters().unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].field().unwrap(), CreditFilterField::ItemId);
        assert_eq!(filters[0].operator().unwrap(), CreditFilterOperator::Includes);
        assert_eq!(filters[0].values().unwrap(), vec!["it_1".to_string()]);

        assert!(credit.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&credit).unwrap(),
            serde_json::from_str::<serde_json::Value>(CREDIT).unwrap()
        );
    }

    #[test]
    fn test_unknown_status_keeps_original_string() {
        let credit: CreditListResponse =
            serde_json::from_str(&CREDIT.replace("\"active\"", "\"frozen\"")).unwrap();
        assert_eq!(
            credit.status().unwrap(),
            CreditStatus::Other("frozen".into())
        );
        assert_eq!(
            serde_json::to_value(credit.status().unwrap()).unwrap(),
            serde_json::json!("frozen")
        );
    }

    #[test]
    fn test_missing_balance() {
        let credit: CreditListResponse =
            serde_json::from_str(r#"{"id":"cr_1","filters":[],"status":"active"}"#).unwrap();
        assert!(matches!(
            credit.balance(),
            Err(Error::MissingField { field }) if field == "balance"
        ));
        assert!(credit.validate().is_err());
    }

    #[test]
    fn test_list_params_null_currency() {
        let params = CreditListParams::builder()
            .currency(None)
            .limit(20)
            .build()
            .unwrap();
        assert_eq!(
            params.request_params().query_pairs(),
            vec![
                ("currency".to_string(), String::new()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }
}
