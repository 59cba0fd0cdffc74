//! # Dispatch Gate
//!
//! An admission-controlled request scheduler for calls to a rate-limited,
//! latency-variable external compute provider, such as a third-party
//! inference API.
//!
//! ## Core Problem Solved
//!
//! Outbound calls to hosted inference providers fail in ways ordinary work
//! queues do not handle well:
//!
//! - **Provider throttling**: the provider itself rejects bursts with
//!   rate-limit errors that deserve backoff and retry, not failure
//! - **Hard call-rate ceilings**: both a concurrency cap and a minimum gap
//!   between calls must hold at all times
//! - **Unbounded latency**: a single slow call must not starve unrelated
//!   callers or hold a caller hostage past its deadline
//!
//! ## Key Features
//!
//! - **Admission control**: a single pacing loop enforces the concurrency
//!   ceiling and the minimum dispatch interval jointly
//! - **Priority ordering**: higher priority dispatches sooner; ties are
//!   FIFO; throttled retries are escalated ahead of their peers
//! - **Retry with backoff**: rate-limit failures re-admit through a
//!   delayed-ready heap with capped exponential backoff
//! - **Bounded outcomes**: every submission resolves exactly once — value,
//!   terminal failure, or timeout, whichever comes first
//! - **Pluggable runtime**: dispatch goes through a small spawn seam so
//!   schedulers can run on any tokio handle
//!
//! ## Example
//!
//! ```rust,ignore
//! use dispatch_gate::config::SchedulerConfig;
//! use dispatch_gate::core::{SubmitOptions, WorkError};
//! use dispatch_gate::builders::build_scheduler;
//! use dispatch_gate::runtime::TokioSpawner;
//!
//! let scheduler = build_scheduler::<String, _>(
//!     SchedulerConfig::default(),
//!     TokioSpawner::current(),
//! )?;
//!
//! let handle = scheduler.submit_fn(
//!     || async { call_provider().await },
//!     SubmitOptions::default().with_priority(5),
//! );
//! let completion = handle.await?;
//! ```

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: admission, pacing, supervision, outcomes.
pub mod core;
/// Configuration models for admission and pacing.
pub mod config;
/// Builders to construct scheduler components from configuration.
pub mod builders;
/// Runtime adapters implementing the spawn seam.
pub mod runtime;
/// Shared utilities.
pub mod util;

mod infra;
