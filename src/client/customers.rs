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

use codes_iso_3166::part_1::CountryCode;
use codes_iso_4217::CurrencyCode;
use futures_core::Stream;
use futures_util::stream::TryStreamExt;
use reqwest::Method;
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::client::taxes::{TaxConfiguration, TaxId};
use crate::client::Client;
use crate::error::Error;
use crate::page::{Page, PageRequest};
use crate::params::{ParamsBuilder, RequestParams, CURSOR, LIMIT};
use crate::record::{record_model, Field, RecordBuilder, Validate};
use crate::serde::{Empty, Timestamp};
use crate::util::StrIteratorExt;

const CUSTOMERS_PATH: [&str; 1] = ["customers"];

const ID: Field<String> = Field::required("id");
const EXTERNAL_CUSTOMER_ID: Field<String> = Field::nullable("external_customer_id");
const NAME: Field<String> = Field::required("name");
const EMAIL: Field<String> = Field::required("email");
const TIMEZONE: Field<String> = Field::required("timezone");
const PAYMENT_PROVIDER: Field<PaymentProvider> = Field::nullable("payment_provider");
const PAYMENT_PROVIDER_ID: Field<String> = Field::nullable("payment_provider_id");
const SHIPPING_ADDRESS: Field<Address> = Field::nullable("shipping_address");
const BILLING_ADDRESS: Field<Address> = Field::nullable("billing_address");
const CURRENCY: Field<CurrencyCode> = Field::nullable("currency");
const TAX_ID: Field<TaxId> = Field::nullable("tax_id");
const AUTO_COLLECTION: Field<bool> = Field::required("auto_collection");
const BALANCE: Field<String> = Field::required("balance");
const CREATED_AT: Field<Timestamp> = Field::required("created_at");
const METADATA: Field<BTreeMap<String, String>> = Field::optional("metadata");
const DELETED: Field<bool> = Field::optional("deleted");

const CITY: Field<String> = Field::optional_nullable("city");
const COUNTRY: Field<CountryCode> = Field::optional_nullable("country");
const LINE1: Field<String> = Field::optional_nullable("line1");
const LINE2: Field<String> = Field::optional_nullable("line2");
const POSTAL_CODE: Field<String> = Field::optional_nullable("postal_code");
const STATE: Field<String> = Field::optional_nullable("state");

// Request bodies. Every optional field of an update is nullable, so that
// an explicit `None` clears the value on the server.
const SET_EXTERNAL_CUSTOMER_ID: Field<String> = Field::optional_nullable("external_customer_id");
const SET_NAME: Field<String> = Field::optional_nullable("name");
const SET_EMAIL: Field<String> = Field::optional_nullable("email");
const SET_TIMEZONE: Field<String> = Field::optional_nullable("timezone");
const SET_PAYMENT_PROVIDER: Field<PaymentProvider> = Field::optional_nullable("payment_provider");
const SET_PAYMENT_PROVIDER_ID: Field<String> = Field::optional_nullable("payment_provider_id");
const SET_SHIPPING_ADDRESS: Field<AddressInput> = Field::optional_nullable("shipping_address");
const SET_BILLING_ADDRESS: Field<AddressInput> = Field::optional_nullable("billing_address");
const SET_CURRENCY: Field<CurrencyCode> = Field::optional_nullable("currency");
const SET_TAX_ID: Field<TaxId> = Field::optional_nullable("tax_id");
const SET_TAX_CONFIGURATION: Field<TaxConfiguration> =
    Field::optional_nullable("tax_configuration");
const SET_AUTO_COLLECTION: Field<bool> = Field::optional_nullable("auto_collection");
const SET_METADATA: Field<Map<String, Value>> = Field::optional_nullable("metadata");

record_model! {
    /// An Orb customer.
    pub struct Customer;
}

impl Customer {
    /// The Orb-assigned unique identifier for the customer.
    pub fn id(&self) -> Result<String, Error> {
        self.0.require(&ID)
    }

    /// An optional user-defined ID for this customer resource, used
    /// throughout the system as an alias for this customer.
    pub fn external_customer_id(&self) -> Result<Option<String>, Error> {
        self.0.get(&EXTERNAL_CUSTOMER_ID)
    }

    /// The full name of the customer.
    pub fn name(&self) -> Result<String, Error> {
        self.0.require(&NAME)
    }

    /// A valid email for the customer, to be used for notifications.
    pub fn email(&self) -> Result<String, Error> {
        self.0.require(&EMAIL)
    }

    /// The customer's timezone as an identifier from the IANA timezone
    /// database.
    pub fn timezone(&self) -> Result<String, Error> {
        self.0.require(&TIMEZONE)
    }

    /// The external payments or invoicing solution connected to the
    /// customer.
    pub fn payment_provider(&self) -> Result<Option<PaymentProvider>, Error> {
        self.0.get(&PAYMENT_PROVIDER)
    }

    /// The ID of this customer in an external payments solution, such as
    /// Stripe.
    pub fn payment_provider_id(&self) -> Result<Option<String>, Error> {
        self.0.get(&PAYMENT_PROVIDER_ID)
    }

    /// The customer's shipping address.
    pub fn shipping_address(&self) -> Result<Option<Address>, Error> {
        self.0.get(&SHIPPING_ADDRESS)
    }

    /// The customer's billing address.
    pub fn billing_address(&self) -> Result<Option<Address>, Error> {
        self.0.get(&BILLING_ADDRESS)
    }

    /// The currency used for the customer's invoices and balance.
    pub fn currency(&self) -> Result<Option<CurrencyCode>, Error> {
        self.0.get(&CURRENCY)
    }

    /// The tax ID details to display on the customer's invoice.
    pub fn tax_id(&self) -> Result<Option<TaxId>, Error> {
        self.0.get(&TAX_ID)
    }

    /// Whether invoices are charged automatically.
    pub fn auto_collection(&self) -> Result<bool, Error> {
        self.0.require(&AUTO_COLLECTION)
    }

    /// The customer's current balance in their currency.
    pub fn balance(&self) -> Result<String, Error> {
        self.0.require(&BALANCE)
    }

    /// The time at which the customer was created.
    pub fn created_at(&self) -> Result<OffsetDateTime, Error> {
        Ok(self.0.require(&CREATED_AT)?.into_inner())
    }

    /// Arbitrary metadata attached to the customer.
    pub fn metadata(&self) -> Result<BTreeMap<String, String>, Error> {
        Ok(self.0.get(&METADATA)?.unwrap_or_default())
    }
}

impl Validate for Customer {
    fn validate(&self) -> Result<(), Error> {
        self.id()?;
        self.external_customer_id()?;
        self.name()?;
        self.email()?;
        self.timezone()?;
        self.payment_provider()?;
        self.payment_provider_id()?;
        self.shipping_address()?.validate()?;
        self.billing_address()?.validate()?;
        self.currency()?;
        self.tax_id()?.validate()?;
        self.auto_collection()?;
        self.balance()?;
        self.created_at()?;
        self.metadata()?;
        Ok(())
    }
}

/// A payment provider.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize_enum_str, Serialize_enum_str)]
pub enum PaymentProvider {
    /// Quickbooks.
    #[serde(rename = "quickbooks")]
    Quickbooks,
    /// Bill.com.
    #[serde(rename = "bill.com")]
    BillDotCom,
    /// Stripe.
    #[serde(rename = "stripe")]
    Stripe,
    /// Stripe charge.
    #[serde(rename = "stripe_charge")]
    StripeCharge,
    /// Stripe invoice.
    #[serde(rename = "stripe_invoice")]
    StripeInvoice,
    /// Netsuite.
    #[serde(rename = "netsuite")]
    Netsuite,
    /// Other.
    #[serde(other)]
    Other(String),
}

record_model! {
    /// A customer's address.
    pub struct Address;
}

impl Address {
    /// The city.
    pub fn city(&self) -> Result<Option<String>, Error> {
        self.0.get(&CITY)
    }

    /// The country code.
    pub fn country(&self) -> Result<Option<CountryCode>, Error> {
        self.0.get(&COUNTRY)
    }

    /// The first line of the street address.
    pub fn line1(&self) -> Result<Option<String>, Error> {
        self.0.get(&LINE1)
    }

    /// The second line of the street address.
    pub fn line2(&self) -> Result<Option<String>, Error> {
        self.0.get(&LINE2)
    }

    /// The postal code.
    pub fn postal_code(&self) -> Result<Option<String>, Error> {
        self.0.get(&POSTAL_CODE)
    }

    /// The state.
    pub fn state(&self) -> Result<Option<String>, Error> {
        self.0.get(&STATE)
    }
}

impl Validate for Address {
    fn validate(&self) -> Result<(), Error> {
        self.city()?;
        self.country()?;
        self.line1()?;
        self.line2()?;
        self.postal_code()?;
        self.state()?;
        Ok(())
    }
}

record_model! {
    /// An address in a create or update request.
    pub struct AddressInput;
}

impl AddressInput {
    /// Returns a builder for an address.
    pub fn builder() -> AddressInputBuilder {
        AddressInputBuilder::default()
    }
}

/// A builder for [`AddressInput`].
///
/// Unset lines are omitted; lines set to `None` are sent as `null`.
#[derive(Debug, Clone, Default)]
pub struct AddressInputBuilder(RecordBuilder);

impl AddressInputBuilder {
    /// Sets the city.
    pub fn city(mut self, city: Option<&str>) -> Self {
        self.0.set_opt(&CITY, city);
        self
    }

    /// Sets the country.
    pub fn country(mut self, country: Option<CountryCode>) -> Self {
        self.0.set_opt(&COUNTRY, country.as_ref());
        self
    }

    /// Sets the first line of the street address.
    pub fn line1(mut self, line1: Option<&str>) -> Self {
        self.0.set_opt(&LINE1, line1);
        self
    }

    /// Sets the second line of the street address.
    pub fn line2(mut self, line2: Option<&str>) -> Self {
        self.0.set_opt(&LINE2, line2);
        self
    }

    /// Sets the postal code.
    pub fn postal_code(mut self, postal_code: Option<&str>) -> Self {
        self.0.set_opt(&POSTAL_CODE, postal_code);
        self
    }

    /// Sets the state.
    pub fn state(mut self, state: Option<&str>) -> Self {
        self.0.set_opt(&STATE, state);
        self
    }

    /// Freezes the address.
    pub fn build(self) -> Result<AddressInput, Error> {
        self.0.build().map(AddressInput)
    }
}

/// Parameters for [`Client::create_customer`].
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerCreateParams(RequestParams);

impl CustomerCreateParams {
    /// Returns a builder for a customer with the given email and name.
    pub fn builder(email: &str, name: &str) -> CustomerCreateParamsBuilder {
        let mut params = ParamsBuilder::default();
        params.body.set(&SET_EMAIL, email).set(&SET_NAME, name);
        CustomerCreateParamsBuilder {
            params,
            metadata: Map::new(),
        }
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`CustomerCreateParams`].
#[derive(Debug, Clone)]
pub struct CustomerCreateParamsBuilder {
    params: ParamsBuilder,
    metadata: Map<String, Value>,
}

impl CustomerCreateParamsBuilder {
    /// Sets the external customer ID.
    pub fn external_customer_id(mut self, external_customer_id: &str) -> Self {
        self.params
            .body
            .set(&SET_EXTERNAL_CUSTOMER_ID, external_customer_id);
        self
    }

    /// Sets the timezone.
    pub fn timezone(mut self, timezone: &str) -> Self {
        self.params.body.set(&SET_TIMEZONE, timezone);
        self
    }

    /// Sets the currency.
    pub fn currency(mut self, currency: CurrencyCode) -> Self {
        self.params.body.set(&SET_CURRENCY, &currency);
        self
    }

    /// Connects the customer to an external payment provider.
    pub fn payment_provider(mut self, provider: PaymentProvider, id: &str) -> Self {
        self.params
            .body
            .set(&SET_PAYMENT_PROVIDER, &provider)
            .set(&SET_PAYMENT_PROVIDER_ID, id);
        self
    }

    /// Sets the shipping address.
    pub fn shipping_address(mut self, address: &AddressInput) -> Self {
        self.params.body.set(&SET_SHIPPING_ADDRESS, address);
        self
    }

    /// Sets the billing address.
    pub fn billing_address(mut self, address: &AddressInput) -> Self {
        self.params.body.set(&SET_BILLING_ADDRESS, address);
        self
    }

    /// Sets the tax ID.
    pub fn tax_id(mut self, tax_id: &TaxId) -> Self {
        self.params.body.set(&SET_TAX_ID, tax_id);
        self
    }

    /// Sets the tax configuration.
    pub fn tax_configuration(mut self, config: &TaxConfiguration) -> Self {
        self.params.body.set(&SET_TAX_CONFIGURATION, config);
        self
    }

    /// Sets whether invoices are charged automatically.
    pub fn auto_collection(mut self, auto_collection: bool) -> Self {
        self.params.body.set(&SET_AUTO_COLLECTION, &auto_collection);
        self
    }

    /// Sets the metadata key `key` to `value`.
    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.into(), Value::String(value.into()));
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
    pub fn build(mut self) -> Result<CustomerCreateParams, Error> {
        if !self.metadata.is_empty() {
            self.params.body.set(&SET_METADATA, &self.metadata);
        }
        self.params.build().map(CustomerCreateParams)
    }
}

/// Parameters for [`Client::update_customer`].
///
/// Fields that are never set are left untouched by the update. Setting a
/// field to `None` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerUpdateParams(RequestParams);

impl CustomerUpdateParams {
    /// Returns a builder for customer update parameters.
    pub fn builder() -> CustomerUpdateParamsBuilder {
        CustomerUpdateParamsBuilder::default()
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`CustomerUpdateParams`].
#[derive(Debug, Clone, Default)]
pub struct CustomerUpdateParamsBuilder {
    params: ParamsBuilder,
    metadata: Map<String, Value>,
}

impl CustomerUpdateParamsBuilder {
    /// Sets or clears the name.
    pub fn name(mut self, name: Option<&str>) -> Self {
        self.params.body.set_opt(&SET_NAME, name);
        self
    }

    /// Sets or clears the email.
    pub fn email(mut self, email: Option<&str>) -> Self {
        self.params.body.set_opt(&SET_EMAIL, email);
        self
    }

    /// Sets or clears the external customer ID.
    pub fn external_customer_id(mut self, external_customer_id: Option<&str>) -> Self {
        self.params
            .body
            .set_opt(&SET_EXTERNAL_CUSTOMER_ID, external_customer_id);
        self
    }

    /// Sets or clears the payment provider.
    pub fn payment_provider(mut self, provider: Option<(PaymentProvider, &str)>) -> Self {
        match provider {
            Some((provider, id)) => {
                self.params
                    .body
                    .set(&SET_PAYMENT_PROVIDER, &provider)
                    .set(&SET_PAYMENT_PROVIDER_ID, id);
            }
            None => {
                self.params
                    .body
                    .clear(&SET_PAYMENT_PROVIDER)
                    .clear(&SET_PAYMENT_PROVIDER_ID);
            }
        }
        self
    }

    /// Sets or clears the shipping address.
    pub fn shipping_address(mut self, address: Option<&AddressInput>) -> Self {
        self.params.body.set_opt(&SET_SHIPPING_ADDRESS, address);
        self
    }

    /// Sets or clears the billing address.
    pub fn billing_address(mut self, address: Option<&AddressInput>) -> Self {
        self.params.body.set_opt(&SET_BILLING_ADDRESS, address);
        self
    }

    /// Sets or clears the currency.
    pub fn currency(mut self, currency: Option<CurrencyCode>) -> Self {
        self.params.body.set_opt(&SET_CURRENCY, currency.as_ref());
        self
    }

    /// Sets or clears the tax ID.
    pub fn tax_id(mut self, tax_id: Option<&TaxId>) -> Self {
        self.params.body.set_opt(&SET_TAX_ID, tax_id);
        self
    }

    /// Sets or clears the tax configuration.
    pub fn tax_configuration(mut self, config: Option<&TaxConfiguration>) -> Self {
        self.params.body.set_opt(&SET_TAX_CONFIGURATION, config);
        self
    }

    /// Sets or clears automatic collection.
    pub fn auto_collection(mut self, auto_collection: Option<bool>) -> Self {
        self.params
            .body
            .set_opt(&SET_AUTO_COLLECTION, auto_collection.as_ref());
        self
    }

    /// Sets the metadata key `key` to `value`, or deletes the key if
    /// `value` is `None`.
    pub fn metadata(mut self, key: &str, value: Option<&str>) -> Self {
        let value = value.map_or(Value::Null, |v| Value::String(v.into()));
        self.metadata.insert(key.into(), value);
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
    pub fn build(mut self) -> Result<CustomerUpdateParams, Error> {
        if !self.metadata.is_empty() {
            self.params.body.set(&SET_METADATA, &self.metadata);
        }
        self.params.build().map(CustomerUpdateParams)
    }
}

/// Parameters for a customer list operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerListParams(RequestParams);

impl CustomerListParams {
    /// Returns a builder for customer list parameters.
    pub fn builder() -> CustomerListParamsBuilder {
        CustomerListParamsBuilder::default()
    }

    /// The encoded request parameters.
    pub fn request_params(&self) -> &RequestParams {
        &self.0
    }
}

/// A builder for [`CustomerListParams`].
#[derive(Debug, Clone, Default)]
pub struct CustomerListParamsBuilder(ParamsBuilder);

impl CustomerListParamsBuilder {
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
    pub fn build(self) -> Result<CustomerListParams, Error> {
        self.0.build().map(CustomerListParams)
    }
}

/// Drops customers the API reports as deleted.
fn live_customer(customer: Customer) -> Result<Option<Customer>, Error> {
    match customer.0.get(&DELETED)? {
        Some(true) => Ok(None),
        Some(false) if !customer.0.contains(NAME.name()) => {
            let id = customer.0.raw(ID.name()).cloned().unwrap_or(Value::Null);
            Err(Error::UnexpectedResponse {
                detail: format!(
                    "customer {id} used deleted response shape \
                    but deleted field was `false`"
                ),
            })
        }
        _ => Ok(Some(customer)),
    }
}

impl Client {
    /// Lists all customers.
    ///
    /// The underlying API call is paginated. The returned stream will fetch
    /// additional pages as it is consumed.
    pub fn list_customers(
        &self,
        params: &CustomerListParams,
    ) -> impl Stream<Item = Result<Customer, Error>> + '_ {
        let request = PageRequest::new(Method::GET, CUSTOMERS_PATH, params.0.clone());
        self.stream_paginated_request(request)
            .try_filter_map(|customer| async move { live_customer(customer) })
    }

    /// Fetches a single page of customers.
    pub async fn list_customers_page(
        &self,
        params: &CustomerListParams,
    ) -> Result<Page<Customer>, Error> {
        self.fetch_page(PageRequest::new(
            Method::GET,
            CUSTOMERS_PATH,
            params.0.clone(),
        ))
        .await
    }

    /// Creates a new customer.
    pub async fn create_customer(&self, params: &CustomerCreateParams) -> Result<Customer, Error> {
        let req = self.build_request(Method::POST, CUSTOMERS_PATH, &params.0);
        self.send_request(req).await
    }

    /// Gets a customer by ID.
    pub async fn get_customer(&self, id: &str) -> Result<Customer, Error> {
        let req = self.build_request(
            Method::GET,
            CUSTOMERS_PATH.chain_one(id),
            &RequestParams::default(),
        );
        self.send_request(req).await
    }

    /// Gets a customer by external ID.
    pub async fn get_customer_by_external_id(&self, external_id: &str) -> Result<Customer, Error> {
        let req = self.build_request(
            Method::GET,
            CUSTOMERS_PATH
                .chain_one("external_customer_id")
                .chain_one(external_id),
            &RequestParams::default(),
        );
        self.send_request(req).await
    }

    /// Updates a customer by ID.
    pub async fn update_customer(
        &self,
        id: &str,
        params: &CustomerUpdateParams,
    ) -> Result<Customer, Error> {
        let req = self.build_request(Method::PUT, CUSTOMERS_PATH.chain_one(id), &params.0);
        self.send_request(req).await
    }

    /// Updates a customer by external ID.
    pub async fn update_customer_by_external_id(
        &self,
        external_id: &str,
        params: &CustomerUpdateParams,
    ) -> Result<Customer, Error> {
        let req = self.build_request(
            Method::PUT,
            CUSTOMERS_PATH
                .chain_one("external_customer_id")
                .chain_one(external_id),
            &params.0,
        );
        self.send_request(req).await
    }

    /// Deletes a customer by ID.
    pub async fn delete_customer(&self, id: &str) -> Result<(), Error> {
        let req = self.build_request(
            Method::DELETE,
            CUSTOMERS_PATH.chain_one(id),
            &RequestParams::default(),
        );
        let _: Empty = self.send_request(req).await?;
        Ok(())
    }
}
