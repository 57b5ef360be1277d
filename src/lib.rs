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
#![allow(clippy::too_many_arguments)]

//! # classfacts
//!
//! The optimization-info layer of a JVM bytecode shrinker and optimizer.
//!
//! `classfacts` attaches a facts record to every class, field and method of a linked class
//! pool and fills those records by walking instructions and constant pools. Optimization passes
//! then ask the records whether an invocation may be removed, whether a parameter is needed,
//! whether a member may become private, or whether a class may be merged away.
//!
//! ## Features
//!
//! - **Two-tier facts** - Opaque facts for library code that always answer conservatively, and
//!   computed facts for program code that start optimistic and only ever widen
//! - **Side-effect analysis** - An instruction classifier plus a method-level fixpoint over
//!   direct and virtual invocations
//! - **Marking passes** - Restricted accesses, `instanceof` usage, non-private members,
//!   parameter usage, field reads and writes, instantiated and caught classes
//! - **Parallel execution** - Facts live in concurrent side tables, so per-class passes run on
//!   the rayon thread pool
//!
//! ## Architecture
//!
//! - [`classfile`] - The program model: classes, members, constant pools, decoded instructions,
//!   a class pool with hierarchy queries, and a linker that resolves references
//! - [`analysis`] - The facts, the passes that compute them, and the analyzer running them
//! - [`prelude`] - Glob-importable re-exports of the most used types
//!
//! ## Quick Start
//!
//! ```rust
//! use classfacts::prelude::*;
//!
//! let mut pool = ClassPool::new();
//! pool.add(ClassBuilder::new("java/lang/Object").library().build()?)?;
//! pool.add(
//!     ClassBuilder::new("app/Math")
//!         .method("add", "(II)I", AccessFlags::STATIC, |code| {
//!             code.iload(0).iload(1).op(Opcode::Iadd).op(Opcode::Ireturn);
//!             Ok(())
//!         })
//!         .build()?,
//! )?;
//! pool.link()?;
//!
//! let store = OptimizationInfoAnalyzer::default().analyze(&pool)?;
//! let add = pool.class_by_name("app/Math").unwrap().method("add", "(II)I").unwrap();
//! let facts = store.method(add.token)?;
//! assert!(!facts.has_side_effects());
//! assert_eq!(facts.used_parameters(), 0b11);
//! # Ok::<(), classfacts::Error>(())
//! ```
//!
//! ## Logging
//!
//! Passes report through the [`tracing`] facade: a `debug` event per finished pass and `trace`
//! events per marked entity. The library never installs a subscriber.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use classfacts::prelude::*;
///
/// let config = AnalysisConfig::sequential();
/// let analyzer = OptimizationInfoAnalyzer::new(config);
/// assert!(!analyzer.config().parallel);
/// ```
pub mod prelude;

pub mod analysis;
pub mod classfile;

/// `classfacts` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`Error`]. Every fallible operation of this crate returns it.
pub type Result<T> = std::result::Result<T, Error>;

/// `classfacts` Error type
///
/// The main error type for all operations in this crate.
///
/// # Examples
///
/// ```rust
/// use classfacts::{analysis::FactStore, classfile::Token, Error};
///
/// let store = FactStore::new();
/// match store.method(Token::method(1)) {
///     Err(Error::MissingFacts(token)) => println!("no facts for {token}"),
///     Err(e) => println!("Error: {e}"),
///     Ok(_) => unreachable!(),
/// };
/// ```
pub use error::Error;
