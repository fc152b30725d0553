use shared::metrics_defs::{MetricDef, MetricType};

pub const SUBSCRIBE_REQUESTS: MetricDef = MetricDef {
    name: "subscribe.requests",
    metric_type: MetricType::Counter,
    description: "Subscribe requests handled. Tagged with status (ok, auth, fetch, decode, parse, render).",
};

pub const SUBSCRIBE_DURATION: MetricDef = MetricDef {
    name: "subscribe.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent handling a subscribe request in seconds, including the feed fetch.",
};

pub const SUBSCRIBE_SERVERS: MetricDef = MetricDef {
    name: "subscribe.servers",
    metric_type: MetricType::Histogram,
    description: "Number of servers rendered per successful subscribe request",
};

pub const ALL_METRICS: &[MetricDef] = &[SUBSCRIBE_REQUESTS, SUBSCRIBE_DURATION, SUBSCRIBE_SERVERS];
