//! # Aliro (Client Credentials Token Service)
//!
//! `aliro` authenticates machine clients by opaque id/secret pairs and mints
//! signed, time-bounded access tokens. Every authentication attempt also
//! produces an outcome event on a durable stream for downstream consumers.
//!
//! ## Security posture
//!
//! All credential failures (unknown id, inactive record, wrong secret) look
//! identical from outside, in both the response and its timing: the secret
//! comparison always runs, even when the id does not exist. This keeps the
//! `/token` endpoint useless for enumerating valid client identifiers.
//!
//! ## Signing keys
//!
//! Tokens are HMAC-signed with keys held in a versioned ring: one current
//! key plus an optional grace-period previous key, so an administrator can
//! rotate without invalidating tokens minted just before the switch.
//!
//! ## Events
//!
//! Authentication events are appended to a named Redis stream, bounded by a
//! publish timeout. A dead or slow stream degrades to logs and counters;
//! it never fails or delays an authentication response beyond the bound.

pub mod api;
pub mod auth;
pub mod cli;
pub mod events;
pub mod store;
pub mod token;
