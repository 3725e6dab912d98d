// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Storage collaborators
//!
//! This module contains the storage seams of the engine:
//! - Traits for candidate sources and pruning indexes
//! - OTLP/JSON decoding
//! - An in-memory store used by the CLI and tests

pub mod memory;
pub mod otlp;
pub mod traits;

pub use memory::MemoryStorage;
pub use otlp::{decode_traces, DecodedTraces};
pub use traits::{CandidateSource, StorageIndex, TimeRange, TraceStream};
