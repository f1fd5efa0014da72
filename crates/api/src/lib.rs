//! HTTP API: the event ingress endpoint and operator routes.

pub mod app;
