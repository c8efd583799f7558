use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Proxy request duration in seconds. Tagged with resource, status.",
};

pub const REQUESTS_COUNT: MetricDef = MetricDef {
    name: "requests.count",
    metric_type: MetricType::Counter,
    description: "Proxied requests. Tagged with resource, status.",
};

pub const UPSTREAM_ATTEMPTS: MetricDef = MetricDef {
    name: "upstream.attempts",
    metric_type: MetricType::Counter,
    description: "Calls to vendor endpoint candidates. Tagged with outcome: accepted, not_found, transport_error.",
};

pub const UPSTREAM_ERRORS: MetricDef = MetricDef {
    name: "upstream.errors",
    metric_type: MetricType::Counter,
    description: "Accepted vendor responses with a non-2xx status. Tagged with resource, status.",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_COUNT,
    UPSTREAM_ATTEMPTS,
    UPSTREAM_ERRORS,
];
