//! TaskMaster sync server library.
//!
//! The `taskmaster-server` binary serves [`server::router`]; the
//! `taskmaster` CLI talks to it through `taskmaster-core`.

pub mod server;
