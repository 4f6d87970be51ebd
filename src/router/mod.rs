//! Route Matcher (§4.1): resolves an incoming method+path to an endpoint
//! and its path variables, preserving registration order as the
//! tie-breaker for overlapping patterns.

mod core;

pub use core::{compile_pattern, Endpoint, ParamVec, Router, RouteResult, MAX_INLINE_PARAMS};
