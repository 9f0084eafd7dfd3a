// Copyright 2025 Johann Kempter
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
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # shaker
//!
//! Whole-program reachability ("tree shaking") for object-oriented bytecode programs.
//!
//! Given a program of classes, methods and fields plus a set of retention rules, `shaker`
//! computes which items must survive: live and instantiated types, targeted and live methods,
//! read and written fields, together with a monotone keep-information lattice describing what
//! later passes may still do to each surviving item (rename, inline, repackage, ...).
//!
//! ## Features
//!
//! - **Worklist fixpoint** - Single-threaded closure over a closed set of action kinds, with
//!   guaranteed termination
//! - **Keep rules** - `-keep`, `-keepclassmembers`, `-keepclasseswithmembers` with wildcard
//!   patterns and back-references, conditional `-if` rules, constraint rules
//! - **Virtual dispatch** - Java-like resolution and a concurrent single-target cache that is
//!   invalidated as types become instantiated
//! - **Deferred field tracing** - Write-only fields are pruned and their access sites rewritten
//! - **Diagnostics** - Retention graph with `-whyareyoukeeping` paths, missing definitions,
//!   `-checkdiscard`, main-dex classes
//!
//! ## Quick Start
//!
//! ```rust
//! use shaker::prelude::*;
//!
//! # fn main() -> shaker::Result<()> {
//! let mut builder = ProgramBuilder::new();
//! builder.library_class("java.lang.Object", |c| {
//!     c.no_superclass();
//! });
//! builder.class("com.example.Main", |c| {
//!     c.method("main", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |m| {
//!         m.invoke_static("com.example.Util", "greet", "()void");
//!     });
//! });
//! builder.class("com.example.Util", |c| {
//!     c.method("greet", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |_| {})
//!         .method("unused", "()void", MethodFlags::PUBLIC | MethodFlags::STATIC, |_| {});
//! });
//! let program = builder.build()?;
//!
//! let mut rules = RuleSet::new();
//! rules.add_keep(KeepRule::keep(
//!     ClassSpec::named("com.example.Main")?.member(MemberSpec::method("main")?),
//! ));
//!
//! let result = shaker::shake(&program, &rules, ShakerConfig::default())?;
//! let util = program.class_by_name("com.example.Util").unwrap();
//! assert!(result.is_live(util.token));
//! assert_eq!(result.live_methods().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────────────────────┐   ┌─────────────────┐
//! │  rules   │──>│ RootSet    │──>│ Enqueuer (worklist fixpoint) │──>│ EnqueuerResult  │
//! └──────────┘   │ (parallel) │   │  ├─ ConditionalRuleEvaluator │   │  + diagnostics  │
//! ┌──────────┐   └────────────┘   │  ├─ DeferredTracing          │   └─────────────────┘
//! │ program  │───────────────────>│  └─ SingleTargetCache        │
//! └──────────┘                    └──────────────────────────────┘
//! ```
//!
//! - [`program`] - The program graph, its builder and the code visitor
//! - [`resolution`] - Class hierarchy, member resolution and the single-target cache
//! - [`keepinfo`] - The keep-information lattice
//! - [`rules`] - Rule objects and wildcard patterns
//! - [`enqueuer`] - The fixpoint driver and its satellites
//! - [`diagnostics`] - Retention graph, missing definitions, check-discard and main-dex
//! - [`pipeline`] - Initial and final passes with rewriting in between
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger. Pass summaries are
//! emitted at `info`, state transitions at `debug`, and every processed action at `trace`.
//!
//! ## Thread Safety
//!
//! A pass runs its worklist on the calling thread. Root matching, conditional-rule matching,
//! check-discard, main-dex dependencies and deferred rewrites run on the rayon pool.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use shaker::prelude::*;
///
/// let config = ShakerConfig::default();
/// assert!(config.shrinking);
/// ```
pub mod prelude;

/// The program graph: an arena of class, method and field definitions addressed by tokens.
pub mod program;

/// Member resolution, virtual dispatch lookup and the single-target cache.
pub mod resolution;

/// The keep-information lattice and its per-item collection.
pub mod keepinfo;

/// Keep rules, conditional rules, constraint rules and wildcard patterns.
pub mod rules;

/// The reachability fixpoint and its satellites.
pub mod enqueuer;

/// Diagnostics: retention graph, missing definitions, check-discard and main-dex.
pub mod diagnostics;

/// Configuration for all passes.
pub mod config;

/// Multi-pass tree shaking and post-pass reporting.
pub mod pipeline;

/// Graph and rendering utilities shared by the diagnostics.
pub mod utils;

/// `shaker` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
///
/// # Example
///
/// ```rust
/// use shaker::{Result, rules::ClassSpec};
///
/// fn spec() -> Result<ClassSpec> {
///     ClassSpec::named("com.example.**")
/// }
/// # assert!(spec().is_ok());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `shaker` Error type
pub use error::Error;

pub use pipeline::{shake, ShakeOutcome, Shaker};
