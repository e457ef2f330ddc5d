//! Shared User-Agent string for outbound API calls.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/outcall/outcall";

/// Default User-Agent for coordinated calls (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("outcall/{version} (api-client; +{PROJECT_UA_URL})")
}
