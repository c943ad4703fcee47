//! Integration tests for one-way directory mirroring

mod cli_parse;
mod failure_isolation;
mod rename_detection;
mod scenarios;
