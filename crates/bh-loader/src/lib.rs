// SPDX-License-Identifier: MIT

//! Cloaks a package's main-site install for the lifetime of a scope and
//! points a pluggable [`ImportResolver`] at a bubble instead, restoring
//! both on scope exit.

mod cloak;
mod error;
mod native;
mod resolver;
mod scope;

pub use cloak::{cloak, recover_stale_cloaks, uncloak};
pub use error::ActivationError;
pub use native::NativeResolver;
pub use resolver::{ImportResolver, ModuleHandle, ResolverSnapshot};
pub use scope::{check_corrupt, clear_corrupt, Scope, ScopeState};
