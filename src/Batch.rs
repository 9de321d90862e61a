//! # Batch Execution Module
//!
//! Team-per-sample execution layer shared by every batch kernel of the crate.
//!
//! ## Purpose
//!
//! A batch is a set of `n` independent reactor samples. Each sample is processed by
//! one *team*: a group of logical lanes that collaborate on that sample only and own
//! an exclusive region of scratch memory for the duration of one kernel invocation.
//! There is no ordering between teams; a dispatch returns only after every team has
//! finished (the host fence).
//!
//! ## Main Structures
//!
//! - **`StateVector`**: packed `[density, pressure, temperature, Y_1..Y_n]` view with
//!   the validity check run at the entry of every batch kernel
//! - **`BatchBuffer`**: labelled row-major `n_samples × width` buffer of reals
//! - **`ExecutionContext`**: serial or thread-pool execution space, passed explicitly
//! - **`TeamMember`**: per-team handle with lane-strided loops, deterministic reductions
//!   and the team barrier
//! - **`TeamArena`**: typed bump arena over a team-exclusive scratch slice
//! - **`WorkspaceSizer`**: pure map from kernel kind and species counts to scratch extent
//! - **`BatchDispatcher`**: pre-flight validation plus team-per-sample dispatch
//! - **`dense_lu`**: in-place partially pivoted LU on scratch-backed matrix views
//!
//! ## Failure model
//!
//! Structural failures (invalid input state, mismatched buffers, exhausted scratch)
//! abort the whole call and are reported as [`errors::BatchError`]. Validation runs
//! over the whole batch before any team body executes, so a rejected call leaves every
//! sample untouched.

pub mod batch_buffer;
pub mod dense_lu;
pub mod dispatcher;
pub mod errors;
pub mod execution;
pub mod scratch;
pub mod state_vector;
pub mod workspace;
