//! homelink: host-side link to home automation boards
//!
//! The boards speak a single-byte protocol over a serial line: GET frames ask
//! for one byte of a channel, SET frames carry a 6-bit integer or fraction.
//! This crate provides the byte codec, a [`protocol::transport::Transport`]
//! abstraction with a serial and a simulated implementation, a per-board
//! channel cache, a non-blocking poll engine, and the optimistic and verified
//! setpoint writes.
//!
//! Most callers want [`AirConditionerLink`] or [`CurtainLink`] and drive
//! [`BoardLink::poll_tick`] from a timer.

pub mod api;
#[doc(hidden)]
pub mod boot;
#[doc(hidden)]
pub mod cli;
pub mod core;
pub mod protocol;
#[doc(hidden)]
pub mod utils;

pub use api::*;
