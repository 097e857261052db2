// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod collaboration;
pub mod response_metrics;

pub use collaboration::CollaborationEngine;
