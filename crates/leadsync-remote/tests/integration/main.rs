//! Integration tests for leadsync-remote
//!
//! Uses wiremock to simulate the CRM submissions API and verifies
//! request shapes, response decoding and error classification.

mod common;

mod test_probe;
mod test_submissions;
