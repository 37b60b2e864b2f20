//! Lexical scopes
//!
//! Scopes live in an arena ([`ScopeTree`]) and point at their parent by
//! index. A function scope owns a frame of slots; a *shared* scope (an `if`
//! branch) owns nothing and declares into the nearest owning scope.
//!
//! A [`Binding`] addresses a slot by frame depth (how many owning scopes to
//! walk outward from the use site) and slot index.

use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Index of a scope in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// How a variable was introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// Function parameter (including `arguments`)
    Parameter,
    /// Local variable or temporary
    Local,
}

/// A declared variable
#[derive(Debug, Clone)]
pub struct Variable {
    /// Variable name
    pub name: Arc<str>,
    /// How it was introduced
    pub kind: VariableKind,
    /// Slot in the owning frame
    pub slot: usize,
}

/// Resolved location of a variable relative to a use site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Binding {
    /// Owning frames to walk outward
    pub depth: usize,
    /// Slot in that frame
    pub slot: usize,
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    shared: bool,
    variables: Vec<Variable>,
    index: FxHashMap<Arc<str>, usize>,
}

impl Scope {
    fn new(parent: Option<ScopeId>, shared: bool) -> Self {
        Self {
            parent,
            shared,
            variables: Vec::new(),
            index: FxHashMap::default(),
        }
    }
}

/// Arena of scopes for one lowering pass
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Create a tree holding only the root scope
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(None, false)],
        }
    }

    /// The root scope
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a function scope under `parent`; `arguments` is declared in slot 0
    pub fn function(&mut self, parent: ScopeId) -> ScopeId {
        let id = self.push(Scope::new(Some(parent), false));
        self.declare(id, "arguments", VariableKind::Parameter);
        id
    }

    /// Open a scope that declares into its nearest owning ancestor
    pub fn shared(&mut self, parent: ScopeId) -> ScopeId {
        self.push(Scope::new(Some(parent), true))
    }

    fn push(&mut self, scope: Scope) -> ScopeId {
        self.scopes.push(scope);
        ScopeId(self.scopes.len() - 1)
    }

    fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Nearest scope (itself included) that owns a frame
    pub fn owner(&self, mut id: ScopeId) -> ScopeId {
        while self.scope(id).shared {
            match self.scope(id).parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        id
    }

    /// Declare `name` in the owning scope of `scope`.
    ///
    /// Redeclaring returns the existing binding.
    pub fn declare(&mut self, scope: ScopeId, name: &str, kind: VariableKind) -> Binding {
        let owner = self.owner(scope);
        let frame = &mut self.scopes[owner.0];
        if let Some(&slot) = frame.index.get(name) {
            return Binding { depth: 0, slot };
        }

        let slot = frame.variables.len();
        let name: Arc<str> = Arc::from(name);
        frame.index.insert(name.clone(), slot);
        frame.variables.push(Variable { name, kind, slot });
        Binding { depth: 0, slot }
    }

    /// Innermost declaration of `name` visible from `scope`
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<Binding> {
        let mut current = Some(scope);
        let mut depth = 0;
        while let Some(id) = current {
            let s = self.scope(id);
            if !s.shared {
                if let Some(&slot) = s.index.get(name) {
                    return Some(Binding { depth, slot });
                }
                depth += 1;
            }
            current = s.parent;
        }
        None
    }

    /// Resolve `name`, declaring it as a local if nothing is visible
    pub fn resolve_or_declare(&mut self, scope: ScopeId, name: &str) -> Binding {
        match self.resolve(scope, name) {
            Some(binding) => binding,
            None => self.declare(scope, name, VariableKind::Local),
        }
    }

    /// Declare a collision-free temporary: `_prefix`, `_prefix1`, `_prefix2`, ...
    pub fn fresh_temporary(&mut self, scope: ScopeId, prefix: &str) -> (Arc<str>, Binding) {
        let mut candidate = format!("_{}", prefix);
        let mut suffix = 1;
        while self.resolve(scope, &candidate).is_some() {
            candidate = format!("_{}{}", prefix, suffix);
            suffix += 1;
        }
        let binding = self.declare(scope, &candidate, VariableKind::Local);
        (Arc::from(candidate), binding)
    }

    /// Variables owned by the frame of `scope`, in slot order
    pub fn variables(&self, scope: ScopeId) -> &[Variable] {
        &self.scope(self.owner(scope)).variables
    }

    /// Locals in frame initialisation order: user names sorted, then
    /// `_`-temporaries sorted. Parameters are excluded.
    pub fn declared_variables(&self, scope: ScopeId) -> Vec<Arc<str>> {
        let (mut temporaries, mut locals): (Vec<Arc<str>>, Vec<Arc<str>>) = self
            .variables(scope)
            .iter()
            .filter(|v| v.kind == VariableKind::Local)
            .map(|v| v.name.clone())
            .partition(|name| name.starts_with('_'));
        locals.sort();
        temporaries.sort();
        locals.extend(temporaries);
        locals
    }

    /// Slots needed by the frame of `scope`
    pub fn frame_size(&self, scope: ScopeId) -> usize {
        self.variables(scope).len()
    }
}
