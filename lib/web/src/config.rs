use sparql_proxy_engine::SparqlProxy;
use std::path::PathBuf;
use subtle::ConstantTimeEq;

pub const MAX_SPARQL_BODY_SIZE: usize = 1024 * 1024 * 128; // 128MB

/// The shared secret guarding the admin routes.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub user: String,
    pub password: String,
}

impl AdminCredentials {
    /// Checks a presented user and password without leaking through timing where they differ.
    pub fn matches(&self, user: &str, password: &str) -> bool {
        let user = self.user.as_bytes().ct_eq(user.as_bytes());
        let password = self.password.as_bytes().ct_eq(password.as_bytes());
        bool::from(user & password)
    }
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Holds the configuration for a proxy web server.
#[derive(Debug)]
pub struct ServerConfig {
    /// The proxy that answers the queries.
    pub proxy: SparqlProxy,
    /// The IP address or DNS name that the socket binds to.
    pub bind: String,
    /// Whether CORS is enabled.
    pub cors: bool,
    /// Whether the client address is taken from `X-Forwarded-For`.
    pub trust_proxy: bool,
    /// Enables the admin routes.
    pub admin: Option<AdminCredentials>,
    /// Where answered queries are logged, one JSON document per line.
    pub query_log: Option<PathBuf>,
}
