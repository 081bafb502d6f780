use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use smol_str::SmolStr;
use svala_diag::Diagnostic;
use svala_source::{SourceManagerHandle, Span};

use crate::meta::DeclMetadata;
use crate::nodes::NodeKind;

/// Identity of a constructed syntax tree.
///
/// Every tree built through [`SyntaxTreeBuilder`] gets a fresh id, so a
/// [`NodeRef`] is an identity key: two structurally equal nodes from
/// different trees never compare equal. This stands in for the original's
/// pointer-identity keyed maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(u32);

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(0);

/// Index of a node within its owning tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// Tree-qualified node identity, usable across a whole compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef {
    pub tree: TreeId,
    pub node: NodeId,
}

impl NodeRef {
    /// A reference to a sibling node in the same tree.
    pub fn with(self, node: NodeId) -> NodeRef {
        NodeRef {
            tree: self.tree,
            node,
        }
    }
}

/// A syntax node: kind payload plus source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

/// A parsed source file as handed to the compilation.
#[derive(Debug)]
pub struct SyntaxTree {
    id: TreeId,
    nodes: Vec<Node>,
    root: NodeId,
    source_manager: SourceManagerHandle,
    diagnostics: Vec<Diagnostic>,
    metadata: HashMap<NodeId, DeclMetadata>,
    global_instantiations: Vec<SmolStr>,
}

impl SyntaxTree {
    pub fn id(&self) -> TreeId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_ref(&self) -> NodeRef {
        self.node_ref(self.root)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_ref(&self, id: NodeId) -> NodeRef {
        NodeRef {
            tree: self.id,
            node: id,
        }
    }

    pub fn source_manager(&self) -> &SourceManagerHandle {
        &self.source_manager
    }

    /// Parse-stage diagnostics recorded while this tree was built.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Per-declaration metadata captured from directives in effect.
    pub fn metadata(&self) -> &HashMap<NodeId, DeclMetadata> {
        &self.metadata
    }

    /// Names that appear as instantiation targets anywhere in this tree.
    pub fn global_instantiations(&self) -> &[SmolStr] {
        &self.global_instantiations
    }
}

/// Accumulates nodes for one tree, then freezes it.
pub struct SyntaxTreeBuilder {
    id: TreeId,
    nodes: Vec<Node>,
    diagnostics: Vec<Diagnostic>,
    metadata: HashMap<NodeId, DeclMetadata>,
    global_instantiations: Vec<SmolStr>,
}

impl SyntaxTreeBuilder {
    pub fn new() -> Self {
        Self {
            id: TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed)),
            nodes: Vec::new(),
            diagnostics: Vec::new(),
            metadata: HashMap::new(),
            global_instantiations: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, span });
        id
    }

    pub fn add_diagnostic(&mut self, diag: Diagnostic) {
        self.diagnostics.push(diag);
    }

    pub fn set_metadata(&mut self, decl: NodeId, meta: DeclMetadata) {
        self.metadata.insert(decl, meta);
    }

    pub fn add_global_instantiation(&mut self, name: impl Into<SmolStr>) {
        self.global_instantiations.push(name.into());
    }

    pub fn finish(self, root: NodeId, source_manager: SourceManagerHandle) -> SyntaxTree {
        SyntaxTree {
            id: self.id,
            nodes: self.nodes,
            root,
            source_manager,
            diagnostics: self.diagnostics,
            metadata: self.metadata,
            global_instantiations: self.global_instantiations,
        }
    }
}

impl Default for SyntaxTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
