//! Annotated source tree abstraction.
//!
//! The analysis consumes an XML-like tree produced by an external
//! source-to-markup converter. Elements live in one of two namespaces:
//! preprocessor directives ([`Ns::Cpp`]) and ordinary source constructs
//! ([`Ns::Src`]). Each element carries the literal text appearing before its
//! first child (`text`) and the literal text following its end tag inside the
//! parent (`tail`), plus the 1-based source line it starts on.
//!
//! Trees are materialized up front; the walker only needs document-order
//! enter/exit events, ancestor paths, and flattened subtree text.

use serde::{Deserialize, Serialize};

/// Element namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ns {
    /// Preprocessor directive namespace.
    Cpp,
    /// Source (definition) namespace.
    Src,
}

/// Traversal event for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalkEvent {
    /// The element's start tag was reached.
    Enter,
    /// The element's end tag was reached.
    Exit,
}

/// Conditional-compilation directive kinds recognized in the [`Ns::Cpp`]
/// namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectiveKind {
    If,
    Ifdef,
    Ifndef,
    Elif,
    Else,
    Endif,
    Define,
}

impl DirectiveKind {
    /// Map a `Cpp`-namespace tag to a directive kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "if" => Some(Self::If),
            "ifdef" => Some(Self::Ifdef),
            "ifndef" => Some(Self::Ifndef),
            "elif" => Some(Self::Elif),
            "else" => Some(Self::Else),
            "endif" => Some(Self::Endif),
            "define" => Some(Self::Define),
            _ => None,
        }
    }

    /// Directives that open a new conditional block.
    pub fn is_opener(self) -> bool {
        matches!(self, Self::If | Self::Ifdef | Self::Ifndef)
    }

    /// Directives that start a branch of a conditional block
    /// (`if`/`ifdef`/`ifndef`/`elif`/`else`).
    pub fn is_conditional(self) -> bool {
        matches!(
            self,
            Self::If | Self::Ifdef | Self::Ifndef | Self::Elif | Self::Else
        )
    }

    /// Directives that end the current branch (`elif`/`else`/`endif`).
    pub fn is_branch_end(self) -> bool {
        matches!(self, Self::Elif | Self::Else | Self::Endif)
    }
}

/// Handle to one element of a [`SourceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct ElementData {
    ns: Ns,
    tag: String,
    text: Option<String>,
    tail: Option<String>,
    line: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An arena-backed element tree.
///
/// Node 0 is the document root (conventionally the converter's `unit`
/// element). The tree is immutable once built; see [`TreeBuilder`].
#[derive(Debug, Clone)]
pub struct SourceTree {
    nodes: Vec<ElementData>,
}

impl SourceTree {
    /// The document root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &ElementData {
        &self.nodes[id.index()]
    }

    /// Namespace of an element.
    pub fn ns(&self, id: NodeId) -> Ns {
        self.node(id).ns
    }

    /// Tag name of an element.
    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    /// Literal text before the element's first child, if any.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text.as_deref()
    }

    /// Literal text following the element's end tag, if any.
    pub fn tail(&self, id: NodeId) -> Option<&str> {
        self.node(id).tail.as_deref()
    }

    /// 1-based source line the element starts on.
    pub fn line(&self, id: NodeId) -> usize {
        self.node(id).line
    }

    /// Parent element, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Child elements in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Directive kind of a `Cpp`-namespace element, if it is one.
    pub fn directive(&self, id: NodeId) -> Option<DirectiveKind> {
        match self.ns(id) {
            Ns::Cpp => DirectiveKind::from_tag(self.tag(id)),
            Ns::Src => None,
        }
    }

    /// Ancestor tags from the element's parent up to (and excluding) the
    /// document root, nearest first.
    pub fn ancestor_tags(&self, id: NodeId) -> Vec<String> {
        let mut tags = Vec::new();
        let mut cur = self.parent(id);
        while let Some(anc) = cur {
            if anc == self.root() {
                break;
            }
            tags.push(self.tag(anc).to_string());
            cur = self.parent(anc);
        }
        tags
    }

    /// Document-order enter/exit events over the whole tree, root included.
    pub fn events(&self) -> Events<'_> {
        Events {
            tree: self,
            stack: vec![Frame {
                id: self.root(),
                next_child: 0,
                entered: false,
            }],
        }
    }

    /// Flattened text of an element: its own `text` plus, recursively, the
    /// text and tail of every descendant (the converter's `itertext`
    /// semantics). The element's own tail is not included.
    pub fn subtree_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for &child in self.children(id) {
            self.collect_text(child, out);
            if let Some(tail) = self.tail(child) {
                out.push_str(tail);
            }
        }
    }

    /// Line of the last element in document order, excluding the root.
    /// Zero for a tree with no elements below the root.
    pub fn end_line(&self) -> usize {
        let mut last = 0;
        for (event, id) in self.events() {
            if event == WalkEvent::Enter && id != self.root() {
                last = self.line(id);
            }
        }
        last
    }
}

struct Frame {
    id: NodeId,
    next_child: usize,
    entered: bool,
}

/// Iterator over document-order `(event, node)` pairs.
pub struct Events<'a> {
    tree: &'a SourceTree,
    stack: Vec<Frame>,
}

impl Iterator for Events<'_> {
    type Item = (WalkEvent, NodeId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            if !top.entered {
                top.entered = true;
                return Some((WalkEvent::Enter, top.id));
            }
            let children = self.tree.children(top.id);
            if top.next_child < children.len() {
                let child = children[top.next_child];
                top.next_child += 1;
                self.stack.push(Frame {
                    id: child,
                    next_child: 0,
                    entered: false,
                });
                continue;
            }
            let done = self.stack.pop()?;
            return Some((WalkEvent::Exit, done.id));
        }
    }
}

/// Incremental builder for a [`SourceTree`].
///
/// The builder mirrors how a streaming converter emits markup: `open` an
/// element, set its leading `text`, build its children, `close` it, then
/// attach the `tail` that follows it.
///
/// # Examples
///
/// ```
/// use vartex_core::tree::{Ns, TreeBuilder};
///
/// let mut b = TreeBuilder::new();
/// b.open(Ns::Cpp, "ifdef", 1);
/// b.leaf(Ns::Src, "name", 1, Some("FEATURE"), None);
/// b.close();
/// b.tail("\nint x;\n");
/// b.open(Ns::Cpp, "endif", 3);
/// b.close();
/// let tree = b.finish();
/// assert_eq!(tree.children(tree.root()).len(), 2);
/// ```
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<ElementData>,
    stack: Vec<NodeId>,
    last_closed: Option<NodeId>,
}

impl TreeBuilder {
    /// Start a tree whose root is a `Src`-namespace `unit` element.
    pub fn new() -> Self {
        let root = ElementData {
            ns: Ns::Src,
            tag: "unit".to_string(),
            text: None,
            tail: None,
            line: 1,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            stack: vec![NodeId(0)],
            last_closed: None,
        }
    }

    fn current(&self) -> NodeId {
        *self.stack.last().expect("builder root never closes")
    }

    /// Open a child element of the current element.
    pub fn open(&mut self, ns: Ns, tag: &str, line: usize) -> NodeId {
        let parent = self.current();
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ElementData {
            ns,
            tag: tag.to_string(),
            text: None,
            tail: None,
            line,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        self.stack.push(id);
        self.last_closed = None;
        id
    }

    /// Append literal text before the current element's next child.
    pub fn text(&mut self, text: &str) -> &mut Self {
        let id = self.current();
        match &mut self.nodes[id.index()].text {
            Some(existing) => existing.push_str(text),
            slot => *slot = Some(text.to_string()),
        }
        self
    }

    /// Close the current element.
    pub fn close(&mut self) -> &mut Self {
        debug_assert!(self.stack.len() > 1, "cannot close the root");
        self.last_closed = self.stack.pop();
        self
    }

    /// Attach tail text to the most recently closed element.
    pub fn tail(&mut self, tail: &str) -> &mut Self {
        if let Some(id) = self.last_closed {
            match &mut self.nodes[id.index()].tail {
                Some(existing) => existing.push_str(tail),
                slot => *slot = Some(tail.to_string()),
            }
        }
        self
    }

    /// Convenience: open and immediately close a childless element.
    pub fn leaf(
        &mut self,
        ns: Ns,
        tag: &str,
        line: usize,
        text: Option<&str>,
        tail: Option<&str>,
    ) -> &mut Self {
        self.open(ns, tag, line);
        if let Some(t) = text {
            self.text(t);
        }
        self.close();
        if let Some(t) = tail {
            self.tail(t);
        }
        self
    }

    /// Finish building and return the tree.
    pub fn finish(self) -> SourceTree {
        debug_assert_eq!(self.stack.len(), 1, "unclosed elements at finish");
        SourceTree { nodes: self.nodes }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> SourceTree {
        let mut b = TreeBuilder::new();
        b.open(Ns::Src, "function", 1);
        b.text("void f() {");
        b.open(Ns::Src, "block", 1);
        b.text("\n  x();\n");
        b.close();
        b.tail("}\n");
        b.close();
        b.finish()
    }

    #[test]
    fn events_are_balanced_and_in_document_order() {
        let tree = small_tree();
        let events: Vec<_> = tree.events().collect();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0], (WalkEvent::Enter, tree.root()));
        assert_eq!(events[5], (WalkEvent::Exit, tree.root()));
        let enters = events
            .iter()
            .filter(|(e, _)| *e == WalkEvent::Enter)
            .count();
        let exits = events.iter().filter(|(e, _)| *e == WalkEvent::Exit).count();
        assert_eq!(enters, exits);
    }

    #[test]
    fn subtree_text_follows_itertext_semantics() {
        let tree = small_tree();
        let function = tree.children(tree.root())[0];
        assert_eq!(tree.subtree_text(function), "void f() {\n  x();\n}\n");
    }

    #[test]
    fn directive_classification_requires_cpp_namespace() {
        let mut b = TreeBuilder::new();
        b.open(Ns::Cpp, "ifdef", 1);
        b.close();
        b.open(Ns::Src, "if", 2);
        b.close();
        let tree = b.finish();
        let kids = tree.children(tree.root());
        assert_eq!(tree.directive(kids[0]), Some(DirectiveKind::Ifdef));
        assert_eq!(tree.directive(kids[1]), None);
    }

    #[test]
    fn ancestor_tags_exclude_root() {
        let tree = small_tree();
        let function = tree.children(tree.root())[0];
        let block = tree.children(function)[0];
        assert_eq!(tree.ancestor_tags(block), vec!["function".to_string()]);
        assert!(tree.ancestor_tags(function).is_empty());
    }

    #[test]
    fn end_line_is_last_element_line() {
        let mut b = TreeBuilder::new();
        b.leaf(Ns::Src, "expr_stmt", 3, Some("a;"), None);
        b.leaf(Ns::Src, "expr_stmt", 7, Some("b;"), None);
        let tree = b.finish();
        assert_eq!(tree.end_line(), 7);
    }
}
