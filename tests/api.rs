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

//! Integration tests.
//!
//! Each test runs the client against a local mock of the Orb API, so no Orb
//! account is required.

use futures::stream::TryStreamExt;
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};
use test_log::test;
use tracing::info;
use wiremock::matchers::{
    body_json, body_partial_json, header, header_exists, method, path, query_param,
};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use orb_api::{
    Alert, AlertListParams, AlertToggleParams, AlertType, AvalaraTaxConfiguration, Client,
    ClientBuilder, ClientConfig, CreditFilterOperator, CreditListParams, CreditStatus,
    CustomerCreateParams, DecodeOptions, Error, Price, PriceListParams, TaxConfiguration,
    Validate,
};

const API_KEY: &str = "test-api-key";

fn alert(id: &str) -> Value {
    json!({
        "id": id,
        "type": "usage_exceeded",
        "enabled": true,
        "thresholds": [{ "value": 100.0 }],
        "customer": { "id": "cus_1", "external_customer_id": null },
        "subscription": null,
        "metric": null,
        "plan": null,
        "currency": null,
        "created_at": "2024-01-01T00:00:00Z",
    })
}

fn page(data: Vec<Value>, next_cursor: Option<&str>) -> Value {
    json!({
        "data": data,
        "pagination_metadata": {
            "has_more": next_cursor.is_some(),
            "next_cursor": next_cursor,
        },
    })
}

fn builder(server: &MockServer) -> ClientBuilder {
    let endpoint = Url::parse(&format!("{}/v1", server.uri())).unwrap();
    Client::builder().with_endpoint(endpoint).without_retries()
}

fn client(server: &MockServer) -> Client {
    builder(server)
        .build(ClientConfig {
            api_key: API_KEY.into(),
        })
        .unwrap()
}

fn query(request: &Request) -> Vec<(String, String)> {
    request
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[test(tokio::test)]
async fn test_list_alerts_walks_every_page() {
    let server = MockServer::start().await;
    // Mounted first so that it takes precedence for the second request.
    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![alert("al_3")], None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .and(header("Authorization", "Bearer test-api-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![alert("al_1"), alert("al_2")], Some("abc"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let params = AlertListParams::builder()
        .customer_id("cus_1")
        .limit(2)
        .build()
        .unwrap();
    let alerts: Vec<Alert> = client.list_alerts(&params).try_collect().await.unwrap();
    info!(count = alerts.len(), "listed alerts");

    let ids: Vec<String> = alerts.iter().map(|a| a.id().unwrap()).collect();
    assert_eq!(ids, vec!["al_1", "al_2", "al_3"]);
    assert_eq!(alerts[0].type_().unwrap(), AlertType::UsageExceeded);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let first = query(&requests[0]);
    let second = query(&requests[1]);
    assert!(!first.iter().any(|(k, _)| k == "cursor"));
    // The follow-up request differs only in its cursor.
    let mut expected = first.clone();
    expected.push(("cursor".into(), "abc".into()));
    assert_eq!(second, expected);
}

#[test(tokio::test)]
async fn test_empty_page_ends_walk_despite_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], Some("abc"))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let alerts: Vec<Alert> = client
        .list_alerts(&AlertListParams::default())
        .try_collect()
        .await
        .unwrap();
    assert!(alerts.is_empty());
}

#[test(tokio::test)]
async fn test_page_by_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .and(query_param("cursor", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![alert("al_2")], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![alert("al_1")], Some("abc"))))
        .mount(&server)
        .await;

    let client = client(&server);
    let first = client
        .list_alerts_page(&AlertListParams::default())
        .await
        .unwrap();
    assert!(first.has_next());
    assert_eq!(
        first.pagination_metadata().unwrap().next_cursor().unwrap(),
        Some("abc".into())
    );

    let second = client.next_page(&first).await.unwrap().unwrap();
    assert_eq!(second.data().unwrap()[0].id().unwrap(), "al_2");
    assert!(!second.has_next());
    assert!(client.next_page(&second).await.unwrap().is_none());
}

#[test(tokio::test)]
async fn test_omitted_and_null_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .mount(&server)
        .await;

    let client = client(&server);
    let params = PriceListParams::builder().cursor(None).build().unwrap();
    client.list_prices_page(&params).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let pairs = query(&requests[0]);
    assert!(!pairs.iter().any(|(k, _)| k == "limit"));
    assert!(pairs.contains(&("cursor".into(), "".into())));
}

#[test(tokio::test)]
async fn test_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts/al_missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": 404,
            "type": "https://docs.withorb.com/reference/error-responses#404-not-found",
            "title": "Not found",
            "detail": "No alert with ID al_missing",
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts/al_broken"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let client = client(&server);
    match client.get_alert("al_missing").await {
        Err(Error::Api(e)) => {
            assert_eq!(e.status_code, StatusCode::NOT_FOUND);
            assert_eq!(e.title, "Not found");
            assert_eq!(e.detail.as_deref(), Some("No alert with ID al_missing"));
        }
        res => panic!("expected API error, got {res:?}"),
    }
    match client.get_alert("al_broken").await {
        Err(Error::Api(e)) => assert_eq!(e.status_code, StatusCode::BAD_GATEWAY),
        res => panic!("expected API error, got {res:?}"),
    }
}

#[test(tokio::test)]
async fn test_enable_alert() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/alerts/al_1/enable"))
        .and(query_param("subscription_id", "sub_1"))
        .and(header_exists("Idempotency-Key"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(alert("al_1")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let params = AlertToggleParams::for_subscription("sub_1").unwrap();
    let alert = client.enable_alert("al_1", &params).await.unwrap();
    assert!(alert.enabled().unwrap());
}

#[test(tokio::test)]
async fn test_list_credits() {
    let server = MockServer::start().await;
    let credit = json!({
        "id": "cr_1",
        "balance": 10.5,
        "effective_date": null,
        "expiry_date": null,
        "filters": [{ "field": "item_id", "operator": "includes", "values": ["it_1"] }],
        "maximum_initial_balance": null,
        "per_unit_cost_basis": null,
        "status": "active",
    });
    Mock::given(method("GET"))
        .and(path("/v1/customers/external_customer_id/acme/credits"))
        .and(query_param("include_all_blocks", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![credit.clone()], None)))
        .mount(&server)
        .await;

    let client = builder(&server)
        .with_decode_options(DecodeOptions::DEFAULT.validate(true))
        .build(ClientConfig {
            api_key: API_KEY.into(),
        })
        .unwrap();
    let params = CreditListParams::builder()
        .include_all_blocks(true)
        .build()
        .unwrap();
    let credits: Vec<_> = client
        .list_credits_by_external_id("acme", &params)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].id().unwrap(), "cr_1");
    assert_eq!(credits[0].balance().unwrap(), 10.5);
    assert_eq!(credits[0].status().unwrap(), CreditStatus::Active);
    assert_eq!(
        credits[0].filters().unwrap()[0].operator().unwrap(),
        CreditFilterOperator::Includes
    );
    assert_eq!(serde_json::to_value(&credits[0]).unwrap(), credit);

    let page = client
        .list_credits_by_external_id_page("acme", &params)
        .await
        .unwrap();
    assert!(!page.has_next());
    assert_eq!(page.data().unwrap(), credits);
}

#[test(tokio::test)]
async fn test_unknown_price_model_passes_through() {
    let server = MockServer::start().await;
    let raw = json!({
        "id": "pr_1",
        "name": "Quantum seats",
        "model_type": "quantum",
        "currency": "USD",
        "quantum_config": { "superposition": true },
    });
    Mock::given(method("GET"))
        .and(path("/v1/prices/pr_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(raw.clone()))
        .mount(&server)
        .await;

    let client = client(&server);
    let price = client.get_price("pr_1").await.unwrap();
    assert!(matches!(price, Price::Unknown(_)));
    assert!(matches!(
        price.currency(),
        Err(Error::UnknownVariant { .. })
    ));
    assert!(matches!(
        price.validate(),
        Err(Error::UnknownVariant { .. })
    ));
    assert_eq!(serde_json::to_value(&price).unwrap(), raw);
}

#[test(tokio::test)]
async fn test_validating_client_rejects_unknown_price() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": "pr_1", "model_type": "quantum" })],
            None,
        )))
        .mount(&server)
        .await;

    let lenient = client(&server);
    let page = lenient
        .list_prices_page(&PriceListParams::default())
        .await
        .unwrap();
    assert!(matches!(page.data().unwrap()[0], Price::Unknown(_)));

    let strict = builder(&server)
        .with_decode_options(DecodeOptions::DEFAULT.validate(true))
        .build(ClientConfig {
            api_key: API_KEY.into(),
        })
        .unwrap();
    let res = strict.list_prices_page(&PriceListParams::default()).await;
    assert!(matches!(
        res,
        Err(Error::UnknownVariant {
            union: "Price",
            ..
        })
    ));
}

#[test(tokio::test)]
async fn test_request_header_overrides_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/alerts"))
        .and(header("X-Tenant", "override"))
        .and(header("X-Source", "integration-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = builder(&server)
        .with_default_header("X-Tenant", "default")
        .with_default_header("X-Source", "integration-test")
        .build(ClientConfig {
            api_key: API_KEY.into(),
        })
        .unwrap();
    let params = AlertListParams::builder()
        .header("x-tenant", "override")
        .build()
        .unwrap();
    // The mock only matches if `X-Tenant` carries the override alone.
    client.list_alerts_page(&params).await.unwrap();
}

#[test(tokio::test)]
async fn test_create_customer_with_tax_configuration() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/customers"))
        .and(header("Idempotency-Key", "create-acme"))
        .and(body_partial_json(json!({
            "email": "billing@acme.test",
            "name": "Acme",
            "tax_configuration": {
                "tax_provider": "avalara",
                "tax_exempt": true,
                "tax_exemption_code": "E",
            },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cus_1",
            "external_customer_id": null,
            "name": "Acme",
            "email": "billing@acme.test",
            "timezone": "UTC",
            "payment_provider": null,
            "payment_provider_id": null,
            "shipping_address": null,
            "billing_address": null,
            "currency": null,
            "tax_id": null,
            "auto_collection": true,
            "balance": "0.00",
            "created_at": "2024-01-01T00:00:00Z",
            "metadata": {},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let tax = AvalaraTaxConfiguration::new(true)
        .and_then(|config| config.with_tax_exemption_code("E"))
        .unwrap();
    let params = CustomerCreateParams::builder("billing@acme.test", "Acme")
        .tax_configuration(&TaxConfiguration::from(tax))
        .header("Idempotency-Key", "create-acme")
        .build()
        .unwrap();
    let customer = client.create_customer(&params).await.unwrap();
    assert_eq!(customer.id().unwrap(), "cus_1");
    assert!(customer.validate().is_ok());
}
