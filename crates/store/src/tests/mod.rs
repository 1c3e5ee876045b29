//! Shared test helpers and cross-module scenarios.

pub mod support;

mod service_scenarios;
