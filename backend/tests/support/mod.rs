//! Shared helpers for database-backed integration tests.

/// Environment variable naming the PostgreSQL database used by the suites.
pub const TEST_DATABASE_URL: &str = "TEST_DATABASE_URL";

/// Return the test database URL, or print a skip marker when it is unset.
///
/// Setting `REQUIRE_TEST_DATABASE` to a truthy value turns the skip into a
/// panic so CI cannot silently pass without a database.
pub fn database_url_or_skip() -> Option<String> {
    match std::env::var(TEST_DATABASE_URL) {
        Ok(url) if !url.trim().is_empty() => Some(url),
        _ if require_database() => {
            panic!("{TEST_DATABASE_URL} is unset but REQUIRE_TEST_DATABASE is set")
        }
        _ => {
            eprintln!("SKIP-TEST-DATABASE: {TEST_DATABASE_URL} is not set");
            None
        }
    }
}

fn require_database() -> bool {
    std::env::var("REQUIRE_TEST_DATABASE")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
