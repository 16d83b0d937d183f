//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate. The public surface is
//! re-exported from the crate root.

pub(crate) mod gas;
pub(crate) mod logger;
pub(crate) mod pacing;
pub(crate) mod proxy_manager;
pub(crate) mod retry;
pub(crate) mod runner;
pub(crate) mod wallet_manager;
