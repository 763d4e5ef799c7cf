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
use crate::record::{record_model, Field, Record, Validate};
use crate::serde::Timestamp;
use crate::util::StrIteratorExt;

const ALERTS_PATH: [&str; 1] = ["alerts"];

const ID: Field<String> = Field::required("id");
const TYPE: Field<AlertType> = Field::required("type");
const ENABLED: Field<bool> = Field::required("enabled");
const THRESHOLDS: Field<Vec<Threshold>> = Field::nullable("thresholds");
const CUSTOMER: Field<AlertCustomer> = Field::nullable("customer");
const SUBSCRIPTION: Field<AlertSubscription> = Field::nullable("subscription");
const METRIC: Field<AlertMetric> = Field::nullable("metric");
const PLAN: Field<AlertPlan> = Field::nullable("plan");
const CURRENCY: Field<String> = Field::nullable("currency");
const CREATED_AT: Field<Timestamp> = Field::required("created_at");

const THRESHOLD_VALUE: Field<f64> = Field::required("value");
const EXTERNAL_CUSTOMER_ID: Field<String> = Field::nullable("external_customer_id");
const OPTIONAL_ID: Field<String> = Field::nullable("id");
const EXTERNAL_PLAN_ID: Field<String> = Field::nullable("external_plan_id");
const PLAN_NAME: Field<String> = Field::nullable("name");
const PLAN_VERSION: Field<String> = Field::optional("plan_version");

const CUSTOMER_ID_FILTER: Field<String> = Field::optional("customer_id");
const EXTERNAL_CUSTOMER_ID_FILTER: Field<String> = Field::optional("external_customer_id");
const SUBSCRIPTION_ID_FILTER: Field<String> = Field::optional("subscription_id");
const CREATED_AT_GT: Field<Timestamp> = Field::optional("created_at[gt]");
const CREATED_AT_GTE: Field<Timestamp> = Field::optional("created_at[gte]");
const CREATED_AT_LT: Field<Timestamp> = Field::optional("created_at[lt]");
const CREATED_AT_LTE: Field<Timestamp> = Field::optional("created_at[lte]");

const CREATE_TYPE: Field<AlertType> = Field::required("type");
const CREATE_CURRENCY: Field<String> = Field::optional_nullable("currency");
const CREATE_THRESHOLDS: Field<Vec<Threshold>> = Field::optional_nullable("thresholds");
const CREATE_METRIC_ID: Field<String> = Field::optional_nullable("metric_id");
const UPDATE_THRESHOLDS: Field<Vec<Threshold>> = Field::required("thresholds");
const TOGGLE_SUBSCRIPTION_ID: Field<String> = Field::optional_nullable("subscription_id");

record_model! {
    /// An alert that fires when a customer or subscription crosses a
    /// threshold.
    pub struct Alert;
}

impl Alert {
    /// The Orb-assigned unique identifier for the alert.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ID)
    }

    /// The condition the alert watches for.
    pub fn type_(&self) -> Result<AlertType, Error> {
        self.0.require(&TYPE)
    }

    /// Whether the alert is enabled.
    pub fn enabled(&self) -> Result<bool, Error> {
        self.0.require(&ENABLED)
    }

    /// The thresholds that trigger the alert.
    pub fn thresholds(&self) -> Result<Option<Vec<Threshold>>, Error> {
        self.0.get(&THRESHOLDS)
    }

    /// The customer the alert applies to.
    pub fn customer(&self) -> Result<Option<AlertCustomer>, Error> {
        self.0.get(&CUSTOMER)
    }

    /// The subscription the alert applies to.
    pub fn subscription(&self) -> Result<Option<AlertSubscription>, Error> {
        self.0.get(&SUBSCRIPTION)
    }

    /// The metric the alert watches, for usage alerts.
    pub fn metric(&self) -> Result<Option<AlertMetric>, Error> {
        self.0.get(&METRIC)
    }

    /// The plan of the subscription the alert applies to.
    pub fn plan(&self) -> Result<Option<AlertPlan>, Error> {
        self.0.get(&PLAN)
    }

    /// The currency of the credit balance, for credit balance alerts.
    pub fn currency(&self) -> Result<Option<String>, Error> {
        self.0.get(&CURRENCY)
    }

    /// The time at which the alert was created.
    pub fn created_at(&self) -> Result<OffsetDateTime, Error> {
        Ok(self.0.require(&CREATED_AT)?.into_inner())
    }
}

impl Validate for Alert {
    fn validate(&self) -> Result<(), Error> {
        self.id()?;
        self.type_()?;
        self.enabled()?;
        self.thresholds()?.validate()?;
        self.customer()?.validate()?;
        self.subscription()?.validate()?;
        self.metric()?.validate()?;
        self.plan()?.validate()?;
        self.currency()?;
        self.created_at()?;
        Ok(())
    }
}

record_model! {
    /// A value that triggers an alert when crossed.
    pub struct Threshold;
}

impl Threshold {
    /// Creates a threshold at `value`.
    pub fn new(value: f64) -> Result<Threshold, Error> {
        let mut record = Record::builder();
        record.set(&THRESHOLD_VALUE, &value);
        record.build().map(Threshold)
    }

    /// The threshold value.
    pub fn value(&self) -> Result<f64, Error> {
        self.0.require(&THRESHOLD_VALUE)
    }
}

impl Validate for Threshold {
    fn validate(&self) -> Result<(), Error> {
        self.value().map(|_| ())
    }
}

record_model! {
    /// The customer an [`Alert`] applies to.
    pub struct AlertCustomer;
}

impl AlertCustomer {
    /// The Orb customer ID.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ID)
    }

    /// The external customer ID.
    pub fn external_customer_id(&self) -> Result<Option<String>, Error> {
        self.0.get(&EXTERNAL_CUSTOMER_ID)
    }
}

impl Validate for AlertCustomer {
    fn validate(&self) -> Result<(), Error> {
        self.id()?;
        self.external_customer_id()?;
        Ok(())
    }
}

record_model! {
    /// The subscription an [`Alert`] applies to.
    pub struct AlertSubscription;
}

impl AlertSubscription {
    /// The subscription ID.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ID)
    }
}

impl Validate for AlertSubscription {
    fn validate(&self) -> Result<(), Error> {
        self.id().map(|_| ())
    }
}

record_model! {
    /// The billable metric an [`Alert`] watches.
    pub struct AlertMetric;
}

impl AlertMetric {
    /// The metric ID.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ID)
    }
}

impl Validate for AlertMetric {
    fn validate(&self) -> Result<(), Error> {
        self.id().map(|_| ())
    }
}

record_model! {
    /// The plan of the subscription an [`Alert`] applies to.
    pub struct AlertPlan;
}

impl AlertPlan {
    /// The plan ID.
    pub fn id(&self) -> Result<Option<String>, Error> {
        self.0.get(&OPTIONAL_ID)
    }

    /// The external plan ID.
    pub fn external_plan_id(&self) -> Result<Option<String>, Error> {
        self.0.get(&EXTERNAL_PLAN_ID)
    }

    /// The plan name.
    pub fn name(&self) -> Result<Option<String>, Error> {
        self.0.get(&PLAN_NAME)
    }

    /// The plan version.
    pub fn plan_version(&self) -> Result<Option<String>, Error> {
        self.0.get(&PLAN_VERSION)
    }
}

impl Validate for AlertPlan {
    fn validate(&self) -> Result<(), Error> {
        self.id()?;
        self.external_plan_id()?;
        self.name()?;
        self.plan_version()?;
        Ok(())
    }
}

/// The condition an [`Alert`] watches for.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Usage of a metric exceeded a threshold.
    UsageExceeded,
    /// Cost exceeded a threshold.
    CostExceeded,
    /// The credit balance reached zero.
    CreditBalanceDepleted,
    /// The credit balance dropped below a threshold.
    CreditBalanceDropped,
    /// The credit balance recovered above zero.
    CreditBalanceRecovered,
    /// Other.
    #[serde(other)]
    Other(String),
}

/// Parameters for an alert list operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertListParams(RequestParams);

impl AlertListParams {
    /// Returns a builder for alert list parameters.
    pub fn builder() -> AlertListParamsBuilder {
        AlertListParamsBuilder::default()
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`AlertListParams`].
#[derive(Debug, Clone, Default)]
pub struct AlertListParamsBuilder(ParamsBuilder);

impl AlertListParamsBuilder {
    /// Filters alerts to the customer with the given ID.
    pub fn customer_id(mut self, customer_id: &str) -> Self {
        self.0.query.set(&CUSTOMER_ID_FILTER, customer_id);
        self
    }

    /// Filters alerts to the customer with the given external ID.
    pub fn external_customer_id(mut self, external_customer_id: &str) -> Self {
        self.0
            .query
            .set(&EXTERNAL_CUSTOMER_ID_FILTER, external_customer_id);
        self
    }

    /// Filters alerts to the subscription with the given ID.
    pub fn subscription_id(mut self, subscription_id: &str) -> Self {
        self.0.query.set(&SUBSCRIPTION_ID_FILTER, subscription_id);
        self
    }

    /// Filters alerts to those created after `time`.
    pub fn created_after(mut self, time: OffsetDateTime) -> Self {
        self.0.query.set(&CREATED_AT_GT, &Timestamp(time));
        self
    }

    /// Filters alerts to those created at or after `time`.
    pub fn created_at_or_after(mut self, time: OffsetDateTime) -> Self {
        self.0.query.set(&CREATED_AT_GTE, &Timestamp(time));
        self
    }

    /// Filters alerts to those created before `time`.
    pub fn created_before(mut self, time: OffsetDateTime) -> Self {
        self.0.query.set(&CREATED_AT_LT, &Timestamp(time));
        self
    }

    /// Filters alerts to those created at or before `time`.
    pub fn created_at_or_before(mut self, time: OffsetDateTime) -> Self {
        self.0.query.set(&CREATED_AT_LTE, &Timestamp(time));
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
    pub fn build(self) -> Result<AlertListParams, Error> {
        self.0.build().map(AlertListParams)
    }
}

/// Parameters for the alert create operations.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCreateParams(RequestParams);

impl AlertCreateParams {
    /// Returns a builder for an alert of the given type.
    pub fn builder(type_: AlertType) -> AlertCreateParamsBuilder {
        let mut params = ParamsBuilder::default();
        params.body.set(&CREATE_TYPE, &type_);
        AlertCreateParamsBuilder(params)
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`AlertCreateParams`].
#[derive(Debug, Clone)]
pub struct AlertCreateParamsBuilder(ParamsBuilder);

impl AlertCreateParamsBuilder {
    /// Sets the currency, required for credit balance alerts.
    pub fn currency(mut self, currency: &str) -> Self {
        self.0.body.set(&CREATE_CURRENCY, currency);
        self
    }

    /// Sets the thresholds.
    pub fn thresholds(mut self, thresholds: &[Threshold]) -> Self {
        self.0.body.set(&CREATE_THRESHOLDS, thresholds);
        self
    }

    /// Sets the metric, for usage alerts on a subscription.
    pub fn metric_id(mut self, metric_id: &str) -> Self {
        self.0.body.set(&CREATE_METRIC_ID, metric_id);
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
    pub fn build(self) -> Result<AlertCreateParams, Error> {
        self.0.build().map(AlertCreateParams)
    }
}

/// Parameters for [`Client::update_alert`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlertUpdateParams(RequestParams);

impl AlertUpdateParams {
    /// Creates parameters that replace the thresholds of an alert.
    pub fn new(thresholds: &[Threshold]) -> Result<AlertUpdateParams, Error> {
        let mut params = ParamsBuilder::default();
        params.body.set(&UPDATE_THRESHOLDS, thresholds);
        params.build().map(AlertUpdateParams)
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// Parameters for [`Client::enable_alert`] and [`Client::disable_alert`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertToggleParams(RequestParams);

impl AlertToggleParams {
    /// The default toggle parameters, which apply to the alert itself.
    pub fn new() -> AlertToggleParams {
        AlertToggleParams::default()
    }

    /// Creates parameters that toggle the alert only for the subscription
    /// with the given ID.
    ///
    /// The subscription is passed as the `subscription_id` query parameter.
    pub fn for_subscription(subscription_id: &str) -> Result<AlertToggleParams, Error> {
        let mut params = ParamsBuilder::default();
        params.query.set(&TOGGLE_SUBSCRIPTION_ID, subscription_id);
        params.build().map(AlertToggleParams)
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

impl Client {
    /// Lists alerts.
    ///
    /// The underlying API call is paginated. The returned stream will fetch
    /// additional pages as it is consumed.
    pub fn list_alerts(
        &self,
        params: &AlertListParams,
    ) -> impl Stream<Item = Result<Alert, Error>> + '_ {
        self.stream_paginated_request(PageRequest::new(
            Method::GET,
            ALERTS_PATH,
            params.0.clone(),
        ))
    }

    /// Fetches a single page of alerts.
    pub async fn list_alerts_page(&self, params: &AlertListParams) -> Result<Page<Alert>, Error> {
        self.fetch_page(PageRequest::new(Method::GET, ALERTS_PATH, params.0.clone()))
            .await
    }

    /// Gets an alert by ID.
    pub async fn get_alert(&self, id: &str) -> Result<Alert, Error> {
        let req = self.build_request(
            Method::GET,
            ALERTS_PATH.chain_one(id),
            &RequestParams::default(),
        );
        self.send_request(req).await
    }

    /// Replaces the thresholds of an alert.
    pub async fn update_alert(&self, id: &str, params: &AlertUpdateParams) -> Result<Alert, Error> {
        let req = self.build_request(Method::PUT, ALERTS_PATH.chain_one(id), &params.0);
        self.send_request(req).await
    }

    /// Creates an alert for the customer with the given ID.
    pub async fn create_alert_for_customer(
        &self,
        customer_id: &str,
        params: &AlertCreateParams,
    ) -> Result<Alert, Error> {
        let path = ALERTS_PATH.chain_one("customer_id").chain_one(customer_id);
        let req = self.build_request(Method::POST, path, &params.0);
        self.send_request(req).await
    }

    /// Creates an alert for the customer with the given external ID.
    pub async fn create_alert_for_external_customer(
        &self,
        external_customer_id: &str,
        params: &AlertCreateParams,
    ) -> Result<Alert, Error> {
        let path = ALERTS_PATH
            .chain_one("external_customer_id")
            .chain_one(external_customer_id);
        let req = self.build_request(Method::POST, path, &params.0);
        self.send_request(req).await
    }

    /// Creates an alert for the subscription with the given ID.
    pub async fn create_alert_for_subscription(
        &self,
        subscription_id: &str,
        params: &AlertCreateParams,
    ) -> Result<Alert, Error> {
        let path = ALERTS_PATH
            .chain_one("subscription_id")
            .chain_one(subscription_id);
        let req = self.build_request(Method::POST, path, &params.0);
        self.send_request(req).await
    }

    /// Enables an alert.
    pub async fn enable_alert(&self, id: &str, params: &AlertToggleParams) -> Result<Alert, Error> {
        let path = ALERTS_PATH.chain_one(id).chain_one("enable");
        let req = self.build_request(Method::POST, path, &params.0);
        self.send_request(req).await
    }

    /// Disables an alert.
    pub async fn disable_alert(
        &self,
        id: &str,
        params: &AlertToggleParams,
    ) -> Result<Alert, Error> {
        let path = ALERTS_PATH.chain_one(id).chain_one("disable");
        let req = self.build_request(Method::POST, path, &params.0);
        self.send_request(req).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_alert() {
        let alert: Alert = serde_json::from_value(json!({
            "id": "al_1",
            "type": "credit_balance_dropped",
            "enabled": true,
            "thresholds": [{ "value": 100.0 }],
            "customer": { "id": "cus_1", "external_customer_id": null },
            "subscription": null,
            "metric": null,
            "plan": null,
            "currency": "credits",
            "created_at": "2024-03-01T12:00:00Z",
        }))
        .unwrap();
        assert_eq!(alert.type_().unwrap(), AlertType::CreditBalanceDropped);
        assert_eq!(alert.thresholds().unwrap().unwrap()[0].value().unwrap(), 100.0);
        assert_eq!(alert.customer().unwrap().unwrap().id().unwrap(), "cus_1");
        assert_eq!(alert.subscription().unwrap(), None);
        assert!(alert.validate().is_ok());
    }

    #[test]
    fn test_missing_enabled() {
        let alert: Alert = serde_json::from_value(json!({
            "id": "al_1",
            "type": "usage_exceeded",
            "created_at": "2024-03-01T12:00:00Z",
        }))
        .unwrap();
        assert!(matches!(
            alert.enabled(),
            Err(Error::MissingField { field }) if field == "enabled"
        ));
        // Nullable fields must still be present.
        assert!(matches!(alert.plan(), Err(Error::MissingField { .. })));
    }

    #[test]
    fn test_create_params_body() {
        let params = AlertCreateParams::builder(AlertType::UsageExceeded)
            .thresholds(&[Threshold::new(10.0).unwrap()])
            .metric_id("bm_1")
            .build()
            .unwrap();
        assert_eq!(
            params.request_params().body().to_value(),
            json!({
                "type": "usage_exceeded",
                "thresholds": [{ "value": 10.0 }],
                "metric_id": "bm_1",
            })
        );
    }

    #[test]
    fn test_toggle_for_subscription_uses_query() {
        let params = AlertToggleParams::for_subscription("sub_1").unwrap();
        assert_eq!(
            params.request_params().query_pairs(),
            vec![("subscription_id".to_string(), "sub_1".to_string())]
        );
        assert!(params.request_params().body().is_empty());
        assert!(AlertToggleParams::new()
            .request_params()
            .query_pairs()
            .is_empty());
    }

    #[test]
    fn test_list_params_created_at_filter() {
        let time = OffsetDateTime::from_unix_timestamp(1_704_067_200).unwrap();
        let params = AlertListParams::builder()
            .customer_id("cus_1")
            .created_at_or_after(time)
            .build()
            .unwrap();
        assert_eq!(
            params.request_params().query_pairs(),
            vec![
                ("customer_id".to_string(), "cus_1".to_string()),
                (
                    "created_at[gte]".to_string(),
                    "2024-01-01T00:00:00Z".to_string()
                ),
            ]
        );
    }
}
