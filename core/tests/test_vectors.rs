//! Verify endpoint resolution and response normalization against the JSON
//! test vectors stored in `test-vectors/`.
//!
//! Response cases are replayed through a canned transport so the full verb
//! path (status check, strict parse, envelope, shape) is covered. Comparing
//! parsed JSON rather than raw strings avoids false negatives from field
//! ordering.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use resource_core::{
    resolve, ApiError, ApiOptions, HttpRequest, HttpResponse, ListOptions, Parameter, Parameters,
    ResourceClient, Transport,
};
use serde_json::Value;

/// Answers every request with one fixed response.
struct Replay(Mutex<Option<HttpResponse>>);

#[async_trait]
impl Transport for Replay {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.0
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ApiError::TransportFailure {
                status: None,
                reason: "replay exhausted".to_string(),
            })
    }
}

fn error_name(err: &ApiError) -> &'static str {
    match err {
        ApiError::MissingArgument(_) => "MissingArgument",
        ApiError::MissingEndpoint(_) => "MissingEndpoint",
        ApiError::InvalidTemplate { .. } => "InvalidTemplate",
        ApiError::EmptyResponse => "EmptyResponse",
        ApiError::TransportFailure { .. } => "TransportFailure",
        ApiError::Deserialization(_) => "Deserialization",
        ApiError::Serialization(_) => "Serialization",
        ApiError::Configuration(_) => "Configuration",
    }
}

// ---------------------------------------------------------------------------
// Resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_test_vectors() {
    let raw = include_str!("../../test-vectors/resolve.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let options = ApiOptions::new(vectors["base_url"].as_str().unwrap());

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let template = case["template"].as_str().unwrap();
        let parameters: Parameters = serde_json::from_value(case["parameters"].clone()).unwrap();

        let result = resolve(template, Some(&parameters), Some(&options));

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            assert_eq!(error_name(&err), expected_error.as_str().unwrap(), "{name}: error");
            continue;
        }

        let resolved = result.unwrap();
        assert_eq!(resolved.url, case["expected_url"].as_str().unwrap(), "{name}: url");

        let expected: Vec<Parameter> = case["expected_parameters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| Parameter {
                name: p["name"].as_str().unwrap().to_string(),
                index: p["index"].as_u64().unwrap() as usize,
            })
            .collect();
        assert_eq!(resolved.parameters, expected, "{name}: parameters");
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        };
        let client = ResourceClient::new("http://endpoint/users")
            .with_transport(Arc::new(Replay(Mutex::new(Some(response)))));

        let result = match case["verb"].as_str().unwrap() {
            "get_one" => client
                .get_one(None)
                .await
                .map(|record| serde_json::to_value(record).unwrap()),
            "get_many" => client
                .get_many(None, ListOptions::default())
                .await
                .map(|records| serde_json::to_value(records).unwrap()),
            other => panic!("{name}: unknown verb: {other}"),
        };

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            assert_eq!(error_name(&err), expected_error.as_str().unwrap(), "{name}: error");
        } else {
            assert_eq!(result.unwrap(), case["expected_result"], "{name}: parsed result");
        }
    }
}
