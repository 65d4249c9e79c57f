//! Analytics and badge rules behind the learning progress dashboard.
//!
//! [`stats::derive`], [`badges::evaluate`] and [`journal::group`] are pure,
//! synchronous transforms. Fetching telemetry, retrying failed syncs and
//! persisting snapshots belong to the caller; [`db`] is the Postgres-backed
//! caller used by the `progress-dashboard` binary.

pub mod badges;
pub mod catalog;
pub mod db;
pub mod journal;
pub mod models;
pub mod report;
pub mod stats;
