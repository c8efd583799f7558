pub mod catalog;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod handler;
pub mod metrics_defs;
pub mod query;
pub mod resolver;
pub mod service;
pub mod signer;

#[cfg(test)]
mod testutils;

use crate::client::{ReqwestVendorClient, VendorClient};
use crate::credentials::{ProcessEnv, SecretSource};
use crate::errors::ProxyError;
use crate::handler::ProxyHandler;
use crate::service::ProxyService;
use crate::signer::{Clock, SystemClock};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use std::time::Duration;

/// Serves every configured resource plus the admin endpoints until an
/// accept loop fails.
pub async fn run(config: config::Config) -> Result<(), ProxyError> {
    let client: Arc<dyn VendorClient> = Arc::new(ReqwestVendorClient::new(Duration::from_secs(
        config.upstream_timeout_secs,
    ))?);
    let secrets: Arc<dyn SecretSource> = Arc::new(ProcessEnv);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    tracing::info!(
        convention = config.signing.convention.as_str(),
        include_query = config.signing.include_query,
        resources = config.resources.len(),
        "starting signing proxy"
    );

    let handlers = config
        .resources
        .iter()
        .cloned()
        .map(|resource| {
            tracing::info!(
                resource = %resource.name,
                route = %resource.route,
                candidates = resource.candidates.len(),
                "registered resource"
            );
            ProxyHandler::new(
                resource,
                config.signing,
                client.clone(),
                secrets.clone(),
                clock.clone(),
            )
        })
        .collect();

    let proxy_task = run_http_service::<_, _, ProxyError>(
        &config.listener.host,
        config.listener.port,
        ProxyService::new(handlers),
    );
    let admin_task = run_http_service::<_, _, ProxyError>(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, ProxyError>::new(|| true),
    );

    tokio::try_join!(proxy_task, admin_task)?;
    Ok(())
}
