// Mock appliance for the blocking client. The wiremock server is started
// and configured on a private tokio runtime; the client under test runs on
// the plain test thread.
#![allow(dead_code)]

use fdm_config::{FdmClient, FdmSession, Settings};
use serde_json::json;
use std::time::Duration;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "tok-123";

pub fn api_path(endpoint: &str) -> String {
    format!("/api/fdm/latest/{endpoint}")
}

pub struct Appliance {
    // dropped before the runtime
    server: MockServer,
    rt: Runtime,
}

impl Appliance {
    pub fn start() -> Self {
        let rt = Runtime::new().expect("tokio runtime");
        let server = rt.block_on(MockServer::start());
        Self { server, rt }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    pub fn requests(&self) -> Vec<Request> {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }

    pub fn requests_to(&self, endpoint: &str) -> Vec<Request> {
        let wanted = api_path(endpoint);
        self.requests()
            .into_iter()
            .filter(|r| r.url.path() == wanted)
            .collect()
    }

    /// Panics if a mock's `expect` count was not met.
    pub fn verify(&self) {
        self.rt.block_on(self.server.verify());
    }

    pub fn session(&self) -> FdmSession {
        FdmSession::new(&self.uri(), &Settings::default()).expect("session")
    }

    pub fn accept_login(&self) {
        self.mount(
            Mock::given(method("POST"))
                .and(path(api_path("fdm/token")))
                .and(body_partial_json(json!({
                    "grant_type": "password",
                    "username": "admin",
                    "password": "secret"
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "access_token": TOKEN,
                    "expires_in": 1800,
                    "token_type": "Bearer"
                }))),
        );
    }

    /// Authenticated client for `admin` / `secret`.
    pub fn client(&self) -> FdmClient {
        self.accept_login();
        self.session()
            .authenticate("admin", "secret")
            .expect("authentication")
    }
}

pub fn fast_poll() -> fdm_config::jobs::PollSettings {
    fdm_config::jobs::PollSettings::new(Duration::from_millis(10), Duration::from_secs(5))
}

pub fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

pub fn sample_config(objects: usize) -> String {
    let mut items = vec![json!({
        "type": "metadata",
        "hardwareModel": "Cisco Firepower 1120",
        "softwareVersion": "7.2.5"
    })];
    for i in 1..objects {
        items.push(json!({"type": "networkobject", "name": format!("obj-{i}")}));
    }
    serde_json::to_string(&items).unwrap()
}
