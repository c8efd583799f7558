//! Built-in PrintBeat resource presets.
//!
//! Candidate lists are versioned: when the vendor moves a resource, add a new
//! list rather than editing one a deployment may already rely on.

use crate::config::{CredentialsConfig, EndpointCandidate, ResourceConfig};
use indexmap::IndexMap;
use url::Url;

pub const PRINTBEAT_JOBS_CANDIDATES_V1: &[(&str, &str)] =
    &[("https://printos.api.hp.com/printbeat", "/externalApi/jobs")];

pub const PRINTBEAT_MACHINES_CANDIDATES_V1: &[(&str, &str)] = &[
    (
        "https://printos.api.hp.com/printbeat-service",
        "/externalApi/machines",
    ),
    ("https://printos.api.hp.com/printbeat", "/externalApi/machines"),
];

/// Parameters in transmission order, with their defaults.
pub const PRINTBEAT_JOBS_PARAMS_V1: &[(&str, &str)] = &[
    ("startMarker", "1"),
    ("sortOrder", "ASC"),
    ("limit", ""),
    ("devices", ""),
];

pub const PRINTBEAT_MACHINES_PARAMS_V1: &[(&str, &str)] = &[("devices", "")];

pub fn printbeat_resources_v1() -> Vec<ResourceConfig> {
    vec![
        resource(
            "jobs",
            "/api/jobs",
            ("JOBS_KEY", "JOBS_SECRET"),
            PRINTBEAT_JOBS_PARAMS_V1,
            PRINTBEAT_JOBS_CANDIDATES_V1,
        ),
        resource(
            "machines",
            "/api/machines",
            ("PRINTOS_KEY", "PRINTOS_SECRET"),
            PRINTBEAT_MACHINES_PARAMS_V1,
            PRINTBEAT_MACHINES_CANDIDATES_V1,
        ),
    ]
}

fn resource(
    name: &str,
    route: &str,
    (key_env, secret_env): (&str, &str),
    params: &[(&str, &str)],
    candidates: &[(&str, &str)],
) -> ResourceConfig {
    ResourceConfig {
        name: name.to_string(),
        route: route.to_string(),
        credentials: CredentialsConfig {
            key_env: key_env.to_string(),
            secret_env: secret_env.to_string(),
        },
        params: params
            .iter()
            .map(|(name, default)| (name.to_string(), default.to_string()))
            .collect::<IndexMap<_, _>>(),
        candidates: candidates
            .iter()
            .map(|(base_url, path)| EndpointCandidate {
                base_url: Url::parse(base_url).expect("built-in base URL is valid"),
                path: path.to_string(),
            })
            .collect(),
    }
}
