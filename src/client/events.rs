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

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use time::OffsetDateTime;

use crate::client::Client;
use crate::error::Error;
use crate::params::{ParamsBuilder, RequestParams};
use crate::record::{record_model, Field, RecordBuilder, Validate};
use crate::serde::Timestamp;
use crate::util::StrIteratorExt;

const EVENTS_PATH: [&str; 1] = ["events"];
const INGEST_PATH: [&str; 1] = ["ingest"];

const ID: Field<String> = Field::required("id");
const CUSTOMER_ID: Field<String> = Field::nullable("customer_id");
const EXTERNAL_CUSTOMER_ID: Field<String> = Field::nullable("external_customer_id");
const EVENT_NAME: Field<String> = Field::required("event_name");
const PROPERTIES: Field<BTreeMap<String, EventPropertyValue>> = Field::required("properties");
const TIMESTAMP: Field<Timestamp> = Field::required("timestamp");
const DEPRECATED: Field<bool> = Field::optional("deprecated");

const IDEMPOTENCY_KEY: Field<String> = Field::required("idempotency_key");
const SET_CUSTOMER_ID: Field<String> = Field::optional("customer_id");
const SET_EXTERNAL_CUSTOMER_ID: Field<String> = Field::optional("external_customer_id");

const VALIDATION_FAILED: Field<Vec<ValidationFailure>> = Field::required("validation_failed");
const DEBUG: Field<IngestEventDebug> = Field::optional_nullable("debug");
const VALIDATION_ERRORS: Field<Vec<String>> = Field::required("validation_errors");
const DUPLICATE: Field<Vec<String>> = Field::required("duplicate");
const INGESTED: Field<Vec<String>> = Field::required("ingested");
const DATA: Field<Vec<Event>> = Field::required("data");

const EVENTS: Field<Vec<IngestEvent>> = Field::required("events");
const DEBUG_FLAG: Field<bool> = Field::optional("debug");
const BACKFILL_ID: Field<String> = Field::optional_nullable("backfill_id");
const EVENT_IDS: Field<Vec<String>> = Field::optional("event_ids");
const TIMEFRAME_START: Field<Timestamp> = Field::optional_nullable("timeframe_start");
const TIMEFRAME_END: Field<Timestamp> = Field::optional_nullable("timeframe_end");

/// Identifies the customer an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CustomerId<'a> {
    /// An Orb customer ID.
    Orb(&'a str),
    /// An external customer ID.
    External(&'a str),
}

impl CustomerId<'_> {
    fn set(self, record: &mut RecordBuilder) {
        match self {
            CustomerId::Orb(id) => record.set(&SET_CUSTOMER_ID, id),
            CustomerId::External(id) => record.set(&SET_EXTERNAL_CUSTOMER_ID, id),
        };
    }
}

/// The value of a property associated with an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EventPropertyValue {
    /// A string value.
    String(String),
    /// A numeric value.
    Number(Number),
    /// A boolean value.
    Bool(bool),
}

impl From<&str> for EventPropertyValue {
    fn from(s: &str) -> EventPropertyValue {
        EventPropertyValue::String(s.into())
    }
}

impl From<i64> for EventPropertyValue {
    fn from(n: i64) -> EventPropertyValue {
        EventPropertyValue::Number(n.into())
    }
}

impl From<bool> for EventPropertyValue {
    fn from(b: bool) -> EventPropertyValue {
        EventPropertyValue::Bool(b)
    }
}

record_model! {
    /// An Orb event.
    pub struct Event;
}

impl Event {
    /// The identifier of the event.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ID)
    }

    /// The Orb ID for the customer with which the event is associated.
    pub fn customer_id(&self) -> Result<Option<String>, Error> {
        self.0.get(&CUSTOMER_ID)
    }

    /// The external ID for the customer with which the event is associated.
    pub fn external_customer_id(&self) -> Result<Option<String>, Error> {
        self.0.get(&EXTERNAL_CUSTOMER_ID)
    }

    /// A name that meaningfully identifies the action or event.
    pub fn event_name(&self) -> Result<String, Error> {
        self.0.require(&EVENT_NAME)
    }

    /// Arbitrary properties associated with the event.
    pub fn properties(&self) -> Result<BTreeMap<String, EventPropertyValue>, Error> {
        self.0.require(&PROPERTIES)
    }

    /// The time at which the event occurred.
    pub fn timestamp(&self) -> Result<OffsetDateTime, Error> {
        Ok(self.0.require(&TIMESTAMP)?.into_inner())
    }

    /// Whether the event has been deprecated.
    pub fn deprecated(&self) -> Result<bool, Error> {
        Ok(self.0.get(&DEPRECATED)?.unwrap_or(false))
    }
}

impl Validate for Event {
    fn validate(&self) -> Result<(), Error> {
        self.id()?;
        self.customer_id()?;
        self.external_customer_id()?;
        self.event_name()?;
        self.properties()?;
        self.timestamp()?;
        self.deprecated()?;
        Ok(())
    }
}

record_model! {
    /// An event to ingest.
    pub struct IngestEvent;
}

impl IngestEvent {
    /// Returns a builder for an event.
    ///
    /// Exactly one event with a given idempotency key will be ingested,
    /// which allows for safe request retries.
    pub fn builder(
        idempotency_key: &str,
        customer_id: CustomerId<'_>,
        event_name: &str,
        timestamp: OffsetDateTime,
    ) -> IngestEventBuilder {
        let mut record = RecordBuilder::default();
        record
            .set(&IDEMPOTENCY_KEY, idempotency_key)
            .set(&EVENT_NAME, event_name)
            .set(&TIMESTAMP, &Timestamp(timestamp));
        customer_id.set(&mut record);
        IngestEventBuilder {
            record,
            properties: BTreeMap::new(),
        }
    }

    /// The idempotency key of the event.
    pub fn idempotency_key(&self) -> Result<String, Error> {
        self.0.require(&IDEMPOTENCY_KEY)
    }
}

/// A builder for [`IngestEvent`].
#[derive(Debug, Clone)]
pub struct IngestEventBuilder {
    record: RecordBuilder,
    properties: BTreeMap<String, EventPropertyValue>,
}

impl IngestEventBuilder {
    /// Adds a property to the event.
    pub fn property(mut self, key: &str, value: impl Into<EventPropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Freezes the event.
    pub fn build(mut self) -> Result<IngestEvent, Error> {
        self.record.set(&PROPERTIES, &self.properties);
        self.record.build().map(IngestEvent)
    }
}

record_model! {
    /// The response to an event ingestion request.
    pub struct IngestEventResponse;
}

impl IngestEventResponse {
    /// The events that were rejected.
    pub fn validation_failed(&self) -> Result<Vec<ValidationFailure>, Error> {
        self.0.require(&VALIDATION_FAILED)
    }

    /// Debug information.
    ///
    /// Only present when the request was made in debug mode.
    pub fn debug(&self) -> Result<Option<IngestEventDebug>, Error> {
        self.0.get(&DEBUG)
    }
}

impl Validate for IngestEventResponse {
    fn validate(&self) -> Result<(), Error> {
        self.validation_failed()?.validate()?;
        self.debug()?.validate()
    }
}

record_model! {
    /// An event that failed validation during ingestion.
    pub struct ValidationFailure;
}

impl ValidationFailure {
    /// The idempotency key of the rejected event.
    pub fn idempotency_key(&self) -> Result<String, Error> {
        self.0.require(&IDEMPOTENCY_KEY)
    }

    /// Why the event was rejected.
    pub fn validation_errors(&self) -> Result<Vec<String>, Error> {
        self.0.require(&VALIDATION_ERRORS)
    }
}

impl Validate for ValidationFailure {
    fn validate(&self) -> Result<(), Error> {
        self.idempotency_key()?;
        self.validation_errors()?;
        Ok(())
    }
}

record_model! {
    /// The debug information of an [`IngestEventResponse`].
    pub struct IngestEventDebug;
}

impl IngestEventDebug {
    /// The idempotency keys of events that were already known to Orb.
    pub fn duplicate(&self) -> Result<Vec<String>, Error> {
        self.0.require(&DUPLICATE)
    }

    /// The idempotency keys of events that were new to Orb.
    pub fn ingested(&self) -> Result<Vec<String>, Error> {
        self.0.require(&INGESTED)
    }
}

impl Validate for IngestEventDebug {
    fn validate(&self) -> Result<(), Error> {
        self.duplicate()?;
        self.ingested()?;
        Ok(())
    }
}

record_model! {
    /// The response to an event search request.
    struct EventSearchResponse;
}

impl Validate for EventSearchResponse {
    fn validate(&self) -> Result<(), Error> {
        self.0.require(&DATA)?.validate()
    }
}

/// Parameters for [`Client::ingest_events`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventIngestParams(RequestParams);

impl EventIngestParams {
    /// Returns a builder that ingests `events`.
    pub fn builder(events: &[IngestEvent]) -> EventIngestParamsBuilder {
        let mut params = ParamsBuilder::default();
        params.body.set(&EVENTS, events);
        EventIngestParamsBuilder(params)
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`EventIngestParams`].
#[derive(Debug, Clone)]
pub struct EventIngestParamsBuilder(ParamsBuilder);

impl EventIngestParamsBuilder {
    /// Requests debug information in the response.
    pub fn debug(mut self, debug: bool) -> Self {
        self.0.query.set(&DEBUG_FLAG, &debug);
        self
    }

    /// Ingests the events into the given backfill.
    pub fn backfill_id(mut self, backfill_id: &str) -> Self {
        self.0.query.set(&BACKFILL_ID, backfill_id);
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
    pub fn build(self) -> Result<EventIngestParams, Error> {
        self.0.build().map(EventIngestParams)
    }
}

/// Parameters for [`Client::search_events`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSearchParams(RequestParams);

impl EventSearchParams {
    /// Returns a builder for event search parameters.
    pub fn builder() -> EventSearchParamsBuilder {
        EventSearchParamsBuilder::default()
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`EventSearchParams`].
#[derive(Debug, Clone, Default)]
pub struct EventSearchParamsBuilder(ParamsBuilder);

impl EventSearchParamsBuilder {
    /// Filters the search to the specified event IDs.
    pub fn event_ids(mut self, event_ids: &[String]) -> Self {
        self.0.body.set(&EVENT_IDS, event_ids);
        self
    }

    /// Filters the search to events falling on or after the specified
    /// datetime.
    pub fn timeframe_start(mut self, start: OffsetDateTime) -> Self {
        self.0.body.set(&TIMEFRAME_START, &Timestamp(start));
        self
    }

    /// Filters the search to events falling before the specified datetime.
    pub fn timeframe_end(mut self, end: OffsetDateTime) -> Self {
        self.0.body.set(&TIMEFRAME_END, &Timestamp(end));
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
    pub fn build(self) -> Result<EventSearchParams, Error> {
        self.0.build().map(EventSearchParams)
    }
}

/// Parameters for [`Client::amend_event`].
#[derive(Debug, Clone, PartialEq)]
pub struct EventAmendParams(RequestParams);

impl EventAmendParams {
    /// Returns a builder for the replacement event.
    pub fn builder(
        customer_id: CustomerId<'_>,
        event_name: &str,
        timestamp: OffsetDateTime,
    ) -> EventAmendParamsBuilder {
        let mut params = ParamsBuilder::default();
        params
            .body
            .set(&EVENT_NAME, event_name)
            .set(&TIMESTAMP, &Timestamp(timestamp));
        customer_id.set(&mut params.body);
        EventAmendParamsBuilder {
            params,
            properties: BTreeMap::new(),
        }
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`EventAmendParams`].
#[derive(Debug, Clone)]
pub struct EventAmendParamsBuilder {
    params: ParamsBuilder,
    properties: BTreeMap<String, EventPropertyValue>,
}

impl EventAmendParamsBuilder {
    /// Adds a property to the replacement event.
    pub fn property(mut self, key: &str, value: impl Into<EventPropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Adds a header to the request.
    ///
    /// An invalid name or value is reported by `build`.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.params.header(name, value);
        self
    }

    /// Freezes the parameters.
    pub fn build(mut self) -> Result<EventAmendParams, Error> {
        self.params.body.set(&PROPERTIES, &self.properties);
        self.params.build().map(EventAmendParams)
    }
}

impl Client {
    /// Ingests events.
    pub async fn ingest_events(
        &self,
        params: &EventIngestParams,
    ) -> Result<IngestEventResponse, Error> {
        let req = self.build_request(Method::POST, INGEST_PATH, &params.0);
        self.send_request(req).await
    }

    /// Searches events.
    pub async fn search_events(&self, params: &EventSearchParams) -> Result<Vec<Event>, Error> {
        let req = self.build_request(Method::POST, EVENTS_PATH.chain_one("search"), &params.0);
        let res: EventSearchResponse = self.send_request(req).await?;
        res.0.require(&DATA)
    }

    /// Amends an event by ID.
    pub async fn amend_event(&self, id: &str, params: &EventAmendParams) -> Result<(), Error> {
        let req = self.build_request(Method::PUT, EVENTS_PATH.chain_one(id), &params.0);
        let _: Value = self.send_request(req).await?;
        Ok(())
    }

    /// Deprecates an event by ID.
    pub async fn deprecate_event(&self, id: &str) -> Result<(), Error> {
        let req = self.build_request(
            Method::PUT,
            EVENTS_PATH.chain_one(id).chain_one("deprecate"),
            &RequestParams::default(),
        );
        let _: Value = self.send_request(req).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn new_year() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_704_067_200).unwrap()
    }

    #[test]
    fn test_ingest_params() {
        let event = IngestEvent::builder(
            "evt-1",
            CustomerId::External("acme"),
            "api_call",
            new_year(),
        )
        .property("region", "us-east-1")
        .property("count", 3_i64)
        .build()
        .unwrap();
        let params = EventIngestParams::builder(&[event])
            .debug(true)
            .build()
            .unwrap();
        assert_eq!(
            params.request_params().body().to_value(),
            json!({
                "events": [{
                    "idempotency_key": "evt-1",
                    "event_name": "api_call",
                    "timestamp": "2024-01-01T00:00:00Z",
                    "external_customer_id": "acme",
                    "properties": { "count": 3, "region": "us-east-1" },
                }],
            })
        );
        assert_eq!(
            params.request_params().query_pairs(),
            vec![("debug".to_string(), "true".to_string())]
        );
    }

    #[test]
    fn test_decode_ingest_response() {
        let res: IngestEventResponse = serde_json::from_value(json!({
            "validation_failed": [
                { "idempotency_key": "evt-2", "validation_errors": ["unknown customer"] },
            ],
            "debug": { "duplicate": [], "ingested": ["evt-1"] },
        }))
        .unwrap();
        let failures = res.validation_failed().unwrap();
        assert_eq!(failures[0].idempotency_key().unwrap(), "evt-2");
        assert_eq!(res.debug().unwrap().unwrap().ingested().unwrap(), ["evt-1"]);
        assert!(res.validate().is_ok());
    }

    #[test]
    fn test_decode_event() {
        let event: Event = serde_json::from_value(json!({
            "id": "evt-1",
            "customer_id": "cus_1",
            "external_customer_id": null,
            "event_name": "api_call",
            "properties": { "region": "us-east-1", "count": 3, "cached": false },
            "timestamp": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        let properties = event.properties().unwrap();
        assert_eq!(properties["count"], EventPropertyValue::from(3_i64));
        assert_eq!(properties["cached"], EventPropertyValue::Bool(false));
        assert_eq!(event.timestamp().unwrap(), new_year());
        assert!(!event.deprecated().unwrap());
    }
}
