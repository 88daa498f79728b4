//! # RedRecon (Red Team Simulation API)
//!
//! `redrecon` backs a red-team training tool. It exposes authentication, a
//! simulated network scanner, a simulated payload tester, a CVE catalogue,
//! per-user tool history and simulated packet-capture summaries.
//!
//! ## Simulation Only
//!
//! Scan results, payload responses and PCAP statistics are produced by the
//! randomized generators in [`simulate`]. Nothing is scanned, exploited or
//! captured.
//!
//! ## Authentication
//!
//! Passwords are stored as bcrypt hashes. Login returns an HS256 bearer token
//! whose subject is the user id; every `/api` route except `register` and
//! `login` requires it.
//!
//! ## Persistence
//!
//! Users, tool logs and CVEs live in MongoDB collections behind the [`db::Store`]
//! trait. The MongoDB store connects lazily and reconnects once per failed
//! call; an in-memory store implements the same contract for local runs.
//! A log is only ever visible to the user that created it.

pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod simulate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
