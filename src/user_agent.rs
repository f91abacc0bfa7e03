//! Shared User-Agent string for outbound HTTP clients.

/// Project identifier appended to the User-Agent.
const PROJECT_UA_TAG: &str = "app-review-topic-analysis";

/// User-Agent used for both the LLM API and the review API.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("review-trends/{version} ({PROJECT_UA_TAG})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_contains_name_version_and_tag() {
        let ua = default_user_agent();
        assert!(ua.starts_with("review-trends/"));
        assert!(ua.contains(env!("CARGO_PKG_VERSION")));
        assert!(ua.contains(PROJECT_UA_TAG));
    }
}
