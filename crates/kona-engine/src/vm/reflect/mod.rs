//! Host Reflection
//!
//! The capability-based interop layer between scripts and host code:
//! a host type describes its members ([`HostType`], [`HostMember`]), a member
//! knows how to invoke itself, and the dispatch runtime resolves against these
//! descriptions without knowing anything else about the host.
//!
//! ## Resolution policy
//!
//! - get/set: exactly one field or property of that name, else
//!   `AmbiguousOrMissingMember`
//! - invoke/construct: filter by arity, then by per-parameter assignability
//!   ([`ParamKind::accepts`]); the first candidate in declaration order wins
//!
//! Strings, arrays and wrapped types have built-in descriptors
//! (see [`intrinsics`]) so they resolve through the same path.

pub mod intrinsics;
mod library;
mod overload;
mod type_builder;
mod types;

pub use library::HostLibrary;
pub use overload::{select_overload, single_data_member, MemberLookup};
pub use type_builder::HostTypeBuilder;
pub use types::{HostFn, HostMember, HostObject, HostType, HostTypeId, MemberKind, ParamKind};
