//! Application core: pure configuration and mode logic, zero I/O.
//!
//! This module owns the tracker's persisted configuration, the operating
//! mode and the command protocol.  All interaction with flash, radio and
//! transport happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod boot;
pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod hub;
pub mod link;
pub mod mode;
pub mod ports;
pub mod store;
