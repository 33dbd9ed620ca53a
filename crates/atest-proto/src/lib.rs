//! Wire types for the api-testing backend
//!
//! Generated from `proto/server.proto`. Only the unary calls the MCP adapter
//! forwards are declared; the package name (`server`) and service names
//! (`Runner`, `Mock`) match the backend so method paths line up on the wire.
//!
//! Every message derives `serde::Serialize` (camelCase) so replies can be
//! rendered as JSON for tool results.

#![allow(clippy::derive_partial_eq_without_eq)]

tonic::include_proto!("server");
