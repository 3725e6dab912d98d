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

//! Version and build information

/// Crate version (e.g., "0.1.0")
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash at build time
/// Set via TRACEQL_GIT_COMMIT environment variable during compilation
pub const GIT_COMMIT: &str = match option_env!("TRACEQL_GIT_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

/// Returns the version string
pub fn version() -> &'static str {
    VERSION
}

/// Returns version info as a formatted string, with an abbreviated commit
pub fn version_info() -> String {
    let commit = GIT_COMMIT.get(..12).unwrap_or(GIT_COMMIT);
    format!("traceql {} (commit: {})", VERSION, commit)
}
