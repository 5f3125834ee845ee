//! Natural-language recurring reminder scheduler.
//!
//! Free text ("remind me every 2nd Tuesday at 16:33 to ship the release")
//! is parsed into a recurrence spec, stored in a time-ordered job queue,
//! and dispatched through the message bus when due. See the submodules:
//! [`parse`] for the grammar, [`recur`] for occurrence arithmetic,
//! [`store`] for the persisted queue, [`scheduler`] for the timer loop,
//! and [`service`] for the command-facing API.

pub mod error;
pub mod format;
pub mod parse;
pub mod recur;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod types;
