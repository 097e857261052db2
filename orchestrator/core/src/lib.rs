// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! CHORUS orchestrator core
//!
//! Uniform abstraction over heterogeneous chat-completion backends
//! (OpenAI-compatible, Anthropic, Google, Ollama, Azure OpenAI) and a
//! collaboration engine that fans a request out to several of them and
//! synthesizes one answer with a confidence estimate.
//!
//! # Architecture
//!
//! - **domain:** canonical chat schema, provider contract, config and
//!   collaboration types
//! - **infrastructure:** vendor adapters and the provider registry
//! - **application:** the collaboration engine and response metrics

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
