//! Built-in CRUD scenario for an `/objects` resource
//!
//! Creates an object, reads it back, updates it and deletes it, threading
//! the created id through the context as `createdId`.

use serde_json::json;

use crate::common::Result;
use crate::http::Method;

use super::{Assertion, Scenario, Step};

pub const SCENARIO_NAME: &str = "objects CRUD";
pub const OBJECT_NAME: &str = "Apple MacBook Pro 16_New";
pub const UPDATED_NAME: &str = "Apple MacBook Pro 16_New Updated";

/// Build the five-step objects scenario against `base_url`
///
/// When `expected_count` is set, the listing step also checks the number
/// of objects returned.
pub fn objects_crud(base_url: &str, expected_count: Option<usize>) -> Result<Scenario> {
    let base_url = base_url.trim_end_matches('/');

    let mut list = Step::new(
        "Get list of all objects",
        Method::Get,
        "{{base_url}}/objects",
    )
    .with_assertion(Assertion::is_array(""));
    if let Some(count) = expected_count {
        list = list.with_assertion(Assertion::length("", count));
    }

    let create = Step::new("Add an object using POST", Method::Post, "{{base_url}}/objects")
        .with_header("Content-Type", "application/json")
        .with_body(json!({
            "name": OBJECT_NAME,
            "data": {
                "year": 2025,
                "price": 3000.50,
                "CPU model": "Intel Core i9",
                "Hard disk size": "2 TB"
            }
        }))
        .with_assertion(Assertion::equals("name", json!(OBJECT_NAME)))
        .with_assertion(Assertion::present("data"))
        .with_assertion(Assertion::equals("data.year", json!(2025)))
        .with_assertion(Assertion::equals("data.price", json!(3000.50)))
        .with_assertion(Assertion::equals("data.CPU model", json!("Intel Core i9")))
        .with_assertion(Assertion::equals("data.Hard disk size", json!("2 TB")))
        .with_warn_if_missing("data")
        .with_capture("createdId", "id");

    let get = Step::new(
        "Get a single object using the added ID",
        Method::Get,
        "{{base_url}}/objects/{{createdId}}",
    )
    .with_assertion(Assertion::equals("id", json!("{{createdId}}")))
    .with_assertion(Assertion::equals("name", json!(OBJECT_NAME)))
    .with_assertion(Assertion::equals("data.year", json!(2025)))
    .with_assertion(Assertion::equals("data.price", json!(3000.50)))
    .with_assertion(Assertion::equals("data.CPU model", json!("Intel Core i9")))
    .with_assertion(Assertion::equals("data.Hard disk size", json!("2 TB")));

    let update = Step::new(
        "Update the object using PUT",
        Method::Put,
        "{{base_url}}/objects/{{createdId}}",
    )
    .with_header("Content-Type", "application/json")
    .with_body(json!({
        "name": UPDATED_NAME,
        "data": {
            "year": 2025,
            "price": 3500.00,
            "CPU model": "Intel Core i9",
            "Hard disk size": "4 TB"
        }
    }))
    .with_assertion(Assertion::equals("name", json!(UPDATED_NAME)))
    .with_assertion(Assertion::equals("data.year", json!(2025)))
    .with_assertion(Assertion::equals("data.price", json!(3500.00)))
    .with_assertion(Assertion::equals("data.CPU model", json!("Intel Core i9")))
    .with_assertion(Assertion::equals("data.Hard disk size", json!("4 TB")));

    let delete = Step::new(
        "Delete the object using DELETE",
        Method::Delete,
        "{{base_url}}/objects/{{createdId}}",
    )
    .with_assertion(Assertion::contains("message", "deleted"));

    Scenario::new(SCENARIO_NAME)
        .with_description("Create, read, update and delete an object")
        .with_variable("base_url", json!(base_url))
        .step(list)?
        .step(create)?
        .step(get)?
        .step(update)?
        .step(delete)
}
