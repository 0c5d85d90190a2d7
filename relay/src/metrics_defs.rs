use shared::metrics_defs::{MetricDef, MetricType};

pub const UPSTREAM_REQUESTS: MetricDef = MetricDef {
    name: "relay.upstream.requests",
    metric_type: MetricType::Counter,
    description: "Calls made to the resource API. Tagged with method, status.",
};

pub const UPSTREAM_DURATION: MetricDef = MetricDef {
    name: "relay.upstream.duration",
    metric_type: MetricType::Histogram,
    description: "Resource API round trip in seconds. Tagged with method.",
};

pub const LOOKUP_DEGRADED: MetricDef = MetricDef {
    name: "relay.lookup.degraded",
    metric_type: MetricType::Counter,
    description: "Form dropdowns rendered empty because a fetch failed. Tagged with lookup.",
};

pub const ALL_METRICS: &[MetricDef] = &[UPSTREAM_REQUESTS, UPSTREAM_DURATION, LOOKUP_DEGRADED];
