//! # Architecture Abstraction Layer
//!
//! Provides the hardware clock boundary for the scheduler.
//! Currently implements the Cortex-M4 port; extensible to other
//! architectures by adding sibling modules.

pub mod cortex_m4;
