//! Votegate - Sliding-Window Rate Limiting Service
//!
//! This crate implements the request rate limiter that sits in front of the
//! voting platform's web tier. Each request is bucketed by client identity
//! and endpoint category and checked against a trailing time window. The
//! web tier asks for decisions over gRPC and turns denials into HTTP 429
//! responses carrying the quota headers returned with each decision.
//!
//! State is held in memory by a single process. Running several instances
//! behind a load balancer gives each one its own, independent ledger.

pub mod config;
pub mod error;
pub mod grpc;
pub mod ratelimit;
