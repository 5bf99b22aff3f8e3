//! Integration tests for the poller
//!
//! These tests use wiremock to stand in for an imageboard JSON API and
//! drive full polling cycles end-to-end.

mod support;

mod archive_tests;
mod download_tests;
mod fetch_tests;
mod poll_tests;
