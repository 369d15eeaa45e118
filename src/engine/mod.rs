// src/engine/mod.rs

//! Orchestration engine for jobdag.
//!
//! This module ties together:
//! - the stock pipeline graph
//! - backend resolution
//! - the scheduler
//! - shutdown signalling (Ctrl-C → grace period → forced termination)
//!
//! [`controller`] holds the `RunController`; [`shutdown`] the signal
//! plumbing shared by the scheduler and the command runner.

pub mod controller;
pub mod shutdown;

pub use controller::{RunController, HELLO_JOB, MESSAGE_JOB};
pub use shutdown::{listen_for_ctrl_c, Shutdown, ShutdownTrigger};
