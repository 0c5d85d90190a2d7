use shared::metrics_defs::{MetricDef, MetricType};

pub const API_REQUESTS: MetricDef = MetricDef {
    name: "api.requests",
    metric_type: MetricType::Counter,
    description: "Requests handled by the resource API. Tagged with method, status.",
};

pub const DELETE_RESTRICTED: MetricDef = MetricDef {
    name: "api.delete.restricted",
    metric_type: MetricType::Counter,
    description: "Deletes rejected because other rows still reference the target. Tagged with collection.",
};

pub const STORE_ROWS: MetricDef = MetricDef {
    name: "api.store.rows",
    metric_type: MetricType::Gauge,
    description: "Rows currently held per collection. Tagged with collection.",
};

pub const ALL_METRICS: &[MetricDef] = &[API_REQUESTS, DELETE_RESTRICTED, STORE_ROWS];
