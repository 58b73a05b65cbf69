/*!
 * Core Types and Errors
 * Shared aliases and per-domain error enums
 */

pub mod errors;
pub mod types;
