//! Member and overload selection

use std::sync::Arc;

use super::types::{HostMember, MemberKind};
use crate::vm::value::Shape;

/// Outcome of a data-member lookup
#[derive(Debug)]
pub enum MemberLookup {
    /// Exactly one candidate
    Found(Arc<HostMember>),
    /// No member of that name and kind
    Missing,
    /// Several candidates
    Ambiguous(usize),
}

/// Find the single field or property `name` among `members`.
///
/// `writable` additionally requires a setter.
pub fn single_data_member<'a>(
    members: impl IntoIterator<Item = &'a Arc<HostMember>>,
    name: &str,
    is_static: bool,
    writable: bool,
) -> MemberLookup {
    let mut found = None;
    let mut count = 0;
    for member in members {
        if member.name() == name
            && member.kind().is_data()
            && member.is_static() == is_static
            && (!writable || member.is_writable())
        {
            count += 1;
            found = Some(member.clone());
        }
    }
    match (count, found) {
        (1, Some(member)) => MemberLookup::Found(member),
        (0, _) | (_, None) => MemberLookup::Missing,
        (n, _) => MemberLookup::Ambiguous(n),
    }
}

/// Select the first invocable candidate whose arity and parameter kinds
/// accept `args`.
///
/// Candidates are considered in declaration order; when several are
/// applicable the earliest wins.
pub fn select_overload<'a>(
    candidates: impl IntoIterator<Item = &'a Arc<HostMember>>,
    kind: MemberKind,
    is_static: bool,
    args: &[Shape],
) -> Option<Arc<HostMember>> {
    candidates
        .into_iter()
        .filter(|m| m.kind() == kind && m.is_static() == is_static)
        .filter(|m| m.arity() == args.len())
        .find(|m| {
            m.params()
                .iter()
                .zip(args)
                .all(|(param, arg)| param.accepts(*arg))
        })
        .cloned()
}
