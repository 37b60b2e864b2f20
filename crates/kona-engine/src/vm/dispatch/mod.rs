//! Dynamic Dispatch
//!
//! Every dynamic operation in lowered code goes through a [`DispatchSite`].
//! Sites are canonical: [`DispatchSites`] hands out one shared site per
//! [`SiteKey`], so every occurrence of `x.Length` in a program shares a
//! single cache. Each site maps the shapes of its operands to a resolved
//! [`Rule`]; resolution runs only on a miss.
//!
//! Dispatch order for a miss:
//! 1. Dynamic objects resolve against their own mapping
//! 2. Host instances and wrapped types resolve through reflection
//! 3. Strings, arrays and wrapped types fall back to intrinsic descriptors
//! 4. Operators resolve by operand kinds

mod operators;
pub(crate) mod resolve;

pub use operators::{BinaryOp, BinaryRule, UnaryOp, UnaryRule};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::vm::reflect::HostMember;
use crate::vm::value::Shape;
use crate::vm::VmResult;

// ============================================================================
// Site keys
// ============================================================================

/// Operation kind plus the metadata that identifies a site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SiteKey {
    /// `target.name`
    GetMember {
        /// Member name
        name: Arc<str>,
    },
    /// `target.name = value`
    SetMember {
        /// Member name
        name: Arc<str>,
    },
    /// `callee(args...)`
    Invoke {
        /// Argument count
        arg_count: usize,
    },
    /// `target.name(args...)`
    InvokeMember {
        /// Member name
        name: Arc<str>,
        /// Argument count
        arg_count: usize,
    },
    /// `left op right`
    BinaryOperation {
        /// Operator
        op: BinaryOp,
    },
    /// `op operand`
    UnaryOperation {
        /// Operator
        op: UnaryOp,
    },
    /// `new type(args...)`
    CreateInstance {
        /// Argument count
        arg_count: usize,
    },
}

impl SiteKey {
    /// Member name for member operations
    pub fn member_name(&self) -> Option<&str> {
        match self {
            SiteKey::GetMember { name }
            | SiteKey::SetMember { name }
            | SiteKey::InvokeMember { name, .. } => Some(&**name),
            _ => None,
        }
    }
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteKey::GetMember { name } => write!(f, "get {}", name),
            SiteKey::SetMember { name } => write!(f, "set {}", name),
            SiteKey::Invoke { arg_count } => write!(f, "invoke/{}", arg_count),
            SiteKey::InvokeMember { name, arg_count } => write!(f, "invoke {}/{}", name, arg_count),
            SiteKey::BinaryOperation { op } => write!(f, "binary {}", op),
            SiteKey::UnaryOperation { op } => write!(f, "unary {}", op),
            SiteKey::CreateInstance { arg_count } => write!(f, "new/{}", arg_count),
        }
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Resolved behaviour of a site for one tuple of operand shapes
#[derive(Debug, Clone)]
pub enum Rule {
    /// Read, write or invoke through the target's own dynamic mapping
    Dynamic,
    /// Use a reflected host member (field, property, method or intrinsic)
    Member(Arc<HostMember>),
    /// Run a reflected constructor
    Construct(Arc<HostMember>),
    /// Call a function value
    Call,
    /// Built-in binary operator
    Binary(BinaryRule),
    /// Built-in unary operator
    Unary(UnaryRule),
}

// ============================================================================
// Sites
// ============================================================================

/// Counters of a site's inline cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteStats {
    /// Cache misses that resolved successfully
    pub resolutions: u64,
    /// Cache hits
    pub hits: u64,
    /// Distinct shape tuples cached
    pub entries: usize,
}

/// A canonical dispatch site with its polymorphic inline cache
pub struct DispatchSite {
    key: SiteKey,
    cache: Mutex<FxHashMap<Vec<Shape>, Rule>>,
    resolutions: AtomicU64,
    hits: AtomicU64,
}

impl DispatchSite {
    fn new(key: SiteKey) -> Self {
        Self {
            key,
            cache: Mutex::new(FxHashMap::default()),
            resolutions: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// The key this site was created for
    pub fn key(&self) -> &SiteKey {
        &self.key
    }

    /// Member name for member operations
    pub fn member_name(&self) -> Option<&str> {
        self.key.member_name()
    }

    /// Cached rule for `shapes`, running `resolve` on a miss.
    ///
    /// Failed resolutions are not cached; the lock is not held while
    /// resolving.
    pub fn rule(&self, shapes: &[Shape], resolve: impl FnOnce() -> VmResult<Rule>) -> VmResult<Rule> {
        if let Some(rule) = self.cache.lock().get(shapes) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(rule.clone());
        }

        let rule = resolve()?;
        tracing::trace!(site = %self.key, ?shapes, ?rule, "dispatch cache miss resolved");
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.cache.lock().insert(shapes.to_vec(), rule.clone());
        Ok(rule)
    }

    /// Cache counters
    pub fn stats(&self) -> SiteStats {
        SiteStats {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            entries: self.cache.lock().len(),
        }
    }
}

impl fmt::Debug for DispatchSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchSite")
            .field("key", &self.key)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Canonicalizing factory for dispatch sites
#[derive(Default)]
pub struct DispatchSites {
    sites: Mutex<FxHashMap<SiteKey, Arc<DispatchSite>>>,
}

impl DispatchSites {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The site for `key`, created on first request
    pub fn site_for(&self, key: SiteKey) -> Arc<DispatchSite> {
        self.sites
            .lock()
            .entry(key)
            .or_insert_with_key(|key| Arc::new(DispatchSite::new(key.clone())))
            .clone()
    }

    /// Site for reading member `name`
    pub fn get_member(&self, name: &str) -> Arc<DispatchSite> {
        self.site_for(SiteKey::GetMember { name: Arc::from(name) })
    }

    /// Site for writing member `name`
    pub fn set_member(&self, name: &str) -> Arc<DispatchSite> {
        self.site_for(SiteKey::SetMember { name: Arc::from(name) })
    }

    /// Site for invoking a callee with `arg_count` arguments
    pub fn invoke(&self, arg_count: usize) -> Arc<DispatchSite> {
        self.site_for(SiteKey::Invoke { arg_count })
    }

    /// Site for invoking member `name` with `arg_count` arguments
    pub fn invoke_member(&self, name: &str, arg_count: usize) -> Arc<DispatchSite> {
        self.site_for(SiteKey::InvokeMember {
            name: Arc::from(name),
            arg_count,
        })
    }

    /// Site for a binary operator
    pub fn binary(&self, op: BinaryOp) -> Arc<DispatchSite> {
        self.site_for(SiteKey::BinaryOperation { op })
    }

    /// Site for a unary operator
    pub fn unary(&self, op: UnaryOp) -> Arc<DispatchSite> {
        self.site_for(SiteKey::UnaryOperation { op })
    }

    /// Site for constructing with `arg_count` arguments
    pub fn create_instance(&self, arg_count: usize) -> Arc<DispatchSite> {
        self.site_for(SiteKey::CreateInstance { arg_count })
    }

    /// Number of distinct sites
    pub fn len(&self) -> usize {
        self.sites.lock().len()
    }

    /// Whether no site was created yet
    pub fn is_empty(&self) -> bool {
        self.sites.lock().is_empty()
    }
}

impl fmt::Debug for DispatchSites {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchSites").field("sites", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_keys_share_a_site() {
        let sites = DispatchSites::new();
        let a = sites.get_member("Length");
        let b = sites.get_member("Length");
        let c = sites.set_member("Length");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(Arc::ptr_eq(&sites.invoke_member("f", 2), &sites.invoke_member("f", 2)));
        assert!(!Arc::ptr_eq(&sites.invoke_member("f", 2), &sites.invoke_member("f", 1)));
        assert_eq!(sites.len(), 4);
    }

    #[test]
    fn test_cache_counts_hits_and_resolutions() {
        let sites = DispatchSites::new();
        let site = sites.binary(BinaryOp::Add);
        let shapes = [Shape::Int, Shape::Int];

        site.rule(&shapes, || Ok(Rule::Binary(BinaryRule::Int(BinaryOp::Add)))).unwrap();
        site.rule(&shapes, || panic!("cached rule must be reused")).unwrap();
        site.rule(&[Shape::Double, Shape::Int], || Ok(Rule::Binary(BinaryRule::Double(BinaryOp::Add))))
            .unwrap();

        let stats = site.stats();
        assert_eq!(stats.resolutions, 2);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn test_failed_resolution_is_not_cached() {
        let sites = DispatchSites::new();
        let site = sites.invoke(0);
        let shapes = [Shape::Int];
        assert!(site
            .rule(&shapes, || Err(crate::vm::VmError::NotCallable { target: "int".into() }))
            .is_err());
        assert_eq!(site.stats().entries, 0);
        assert_eq!(site.stats().resolutions, 0);
    }

    #[test]
    fn test_member_name() {
        let sites = DispatchSites::new();
        assert_eq!(sites.invoke_member("Append", 1).member_name(), Some("Append"));
        assert_eq!(sites.create_instance(1).member_name(), None);
        assert_eq!(sites.get_member("X").key().to_string(), "get X");
    }
}
