use std::fs;

use psn_library::psn::endpoints::Endpoints;
use wiremock::{MockServer, ResponseTemplate};

/// Convenience func to get a fixture from the standard path, as a string
pub fn fixture(s: &str) -> String {
    fs::read_to_string(format!("resources/test/psn/{}", s)).unwrap()
}

pub fn json_response(name: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(fixture(name).into_bytes(), "application/json")
}

/// Every endpoint pointed at the mock server
pub fn endpoints(server: &MockServer, page_size: u32) -> Endpoints {
    Endpoints {
        graphql_url: format!("{}/graphql", server.uri()),
        store_url: format!("{}/subscriptions", server.uri()),
        refresh_url: format!("{}/signin", server.uri()),
        page_size,
        played_limit: 100,
    }
}

/// Matches graphql calls whose `variables` contain the given json fragment
pub fn variables_contain(fragment: &'static str) -> impl Fn(&wiremock::Request) -> bool + Send + Sync {
    move |req| {
        req.url
            .query_pairs()
            .any(|(name, value)| name == "variables" && value.contains(fragment))
    }
}
