//! End-to-end scenarios for the validator fleet tooling.
//!
//! Validators are played by `/bin/sh` scripts for process lifecycle and by
//! wiremock servers for their HTTP surface. Scenarios against a real
//! validator binary live in `e2e_validator` and are ignored by default.

#![cfg(test)]

mod common;

mod e2e_fleet {
    mod scenarios;
}

mod e2e_harness {
    mod scenarios;
}

mod e2e_validator {
    mod scenarios;
}
