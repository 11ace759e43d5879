//! Domain types and pure logic for the pdfrelay conversion service.
//!
//! Nothing in this crate performs I/O: it parses engine log lines, validates
//! uploads and conversion options, and defines the events and job records
//! the other crates pass around.

pub mod error;
pub mod event;
pub mod job;
pub mod options;
pub mod progress;
pub mod upload;
