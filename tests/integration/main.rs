//! Integration tests for the `wiring` CLI

mod boot;
mod check;
mod common;
mod plan;
