//! Request-gating stages that run before handlers: payload size, rate
//! limits, request signatures, plus the response hardening headers.

pub mod client;
pub mod headers;
pub mod payload;
pub mod rate_limit;
pub mod signature;
