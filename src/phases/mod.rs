//! The phases of a clone.
//!
//! ## Overview
//!
//! 1. Topology - Read which source environments exist and what is pending
//! 2. Code - Plan and replay the source's promotion state on the target
//! 3. Content - Import the latest backups and run content hooks
//!
//! The orchestrator sequences them, together with validation, provisioning
//! and working-copy cleanup.

pub mod code;
pub mod content;
pub mod orchestrator;
pub mod topology;
