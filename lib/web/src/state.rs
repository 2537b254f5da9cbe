use crate::config::AdminCredentials;
use crate::query_log::QueryLog;
use sparql_proxy_engine::SparqlProxy;

#[derive(Clone, Debug)]
pub struct AppState {
    pub proxy: SparqlProxy,
    pub admin: Option<AdminCredentials>,
    pub query_log: Option<QueryLog>,
    pub trust_proxy: bool,
}
