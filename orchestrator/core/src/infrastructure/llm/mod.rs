// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Chat Provider Infrastructure - Anti-Corruption Layer Implementations
//
// Implements one adapter per vendor plus the registry that owns them.
// Each adapter translates between our canonical schema and the vendor
// wire format; shared helpers live in shared.rs (composition, no base
// type).

pub mod anthropic;
pub mod azure_openai;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod shared;

pub use registry::ProviderRegistry;
