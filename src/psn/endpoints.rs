use serde_json::{json, Value};
use urlencoding::encode;

use super::Request;

pub const GRAPHQL_URL: &str = "https://web.np.playstation.com/api/graphql/v1/op";
pub const SUBSCRIPTIONS_URL: &str = "https://store.playstation.com/subscriptions";
pub const REFRESH_URL: &str = "https://web.np.playstation.com/api/session/v1/signin\
    ?redirect_uri=https://io.playstation.com/central/auth/login\
    %3FpostSignInURL=https://www.playstation.com/home%26cancelURL=https://www.playstation.com/home\
    &smcid=web:pdc";

pub const HEADERS: [(&str, &str); 2] = [
    ("content-type", "application/json"),
    ("apollographql-client-name", "oracle-web-toolbar"),
];

/// Largest page the backend will serve
pub const DEFAULT_LIMIT: u32 = 100;

/// Where the purchased titles query reports the size of the whole list
pub const PURCHASED_TOTAL_COUNT: &str = "/data/purchasedTitlesRetrieve/pageInfo/totalCount";

/// A graphql query the backend knows by name and hash. PSN rotates these without notice; a hash
/// going stale shows up as HTTP 400s from every call using it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersistedQuery {
    pub operation_name: &'static str,
    pub sha256_hash: &'static str,
}

pub const PROFILE: PersistedQuery = PersistedQuery {
    operation_name: "getProfileOracle",
    sha256_hash: "fc0d765f537f3dce3e0d91c71e85daa401042ba43066acde9f8f584faced10df",
};

pub const PURCHASED_GAMES: PersistedQuery = PersistedQuery {
    operation_name: "getPurchasedGameList",
    sha256_hash: "827a423f6a8ddca4107ac01395af2ec0eafd8396fc7fa204aaf9b7ed2eefa168",
};

pub const PLAYED_GAMES: PersistedQuery = PersistedQuery {
    operation_name: "getUserGameList",
    sha256_hash: "e0136f81d7d1fb6be58238c574e9a46e1c0cc2f7f6977a08a5a46f224523a004",
};

impl PersistedQuery {
    pub fn url(&self, base: &str, variables: &Value) -> String {
        let extensions = json!({
            "persistedQuery": { "version": 1, "sha256Hash": self.sha256_hash }
        });

        format!(
            "{}?operationName={}&variables={}&extensions={}",
            base,
            self.operation_name,
            encode(&variables.to_string()),
            encode(&extensions.to_string()),
        )
    }
}

fn graphql_request(url: String) -> Request {
    HEADERS
        .iter()
        .fold(Request::json(url), |req, (name, value)| req.header(name, value))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Endpoints {
    pub graphql_url: String,
    pub store_url: String,
    pub refresh_url: String,
    pub page_size: u32,
    pub played_limit: u32,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            graphql_url: GRAPHQL_URL.to_string(),
            store_url: SUBSCRIPTIONS_URL.to_string(),
            refresh_url: REFRESH_URL.to_string(),
            page_size: DEFAULT_LIMIT,
            played_limit: DEFAULT_LIMIT,
        }
    }
}

impl Endpoints {
    pub fn profile_request(&self) -> Request {
        graphql_request(PROFILE.url(&self.graphql_url, &json!({})))
    }

    pub fn purchased_request(&self, start: u32, size: u32) -> Request {
        let variables = json!({
            "isActive": true,
            "platform": ["ps3", "ps4", "ps5"],
            "start": start,
            "size": size,
            "subscriptionService": "NONE",
        });
        graphql_request(PURCHASED_GAMES.url(&self.graphql_url, &variables))
    }

    pub fn played_request(&self) -> Request {
        let variables = json!({
            "categories": "ps3_game,ps4_game,ps5_native_game",
            "limit": self.played_limit,
        });
        graphql_request(PLAYED_GAMES.url(&self.graphql_url, &variables))
    }

    pub fn subscriptions_request(&self) -> Request {
        Request::text(self.store_url.clone()).silent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_query_url_is_encoded() {
        let url = PROFILE.url("https://example.com/op", &json!({}));

        assert!(url.starts_with(
            "https://example.com/op?operationName=getProfileOracle&variables=%7B%7D&extensions=%7B"
        ));
        assert!(url.contains(PROFILE.sha256_hash));
        assert!(!url.contains('"'));
    }

    #[test]
    fn graphql_requests_carry_client_headers() {
        let req = Endpoints::default().purchased_request(200, 100);

        assert!(req.get_json);
        assert!(!req.silent);
        assert!(req.headers.contains(&("apollographql-client-name".to_string(), "oracle-web-toolbar".to_string())));
        assert!(req.url.contains(&encode("\"start\":200").to_string()));
    }

    #[test]
    fn subscriptions_request_is_silent_text() {
        let req = Endpoints::default().subscriptions_request();

        assert_eq!(req.url, SUBSCRIPTIONS_URL);
        assert!(!req.get_json);
        assert!(req.silent);
    }
}
