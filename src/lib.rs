//! siprelay - a stateless-per-transaction SIP proxy / registrar over UDP.
//!
//! Accepts SIP messages from user agents, keeps a registration table
//! mapping addresses-of-record to their current transports, and relays
//! requests and responses between registered parties while inserting
//! itself into the signaling path (Via push/pop, Record-Route insertion,
//! Route stripping).

pub mod cli;
pub mod config;
pub mod diary;
pub mod logging;
pub mod sip;
