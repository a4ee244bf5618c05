use crate::domain::model::{Annotation, NestedEntity};
use std::fmt::Write as _;
use termtree::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    OrderedList,
    UnorderedList,
    Item,
    Text,
}

impl NodeKind {
    fn tag(self) -> Option<&'static str> {
        match self {
            NodeKind::Document => None,
            NodeKind::OrderedList => Some("ol"),
            NodeKind::UnorderedList => Some("ul"),
            NodeKind::Item => Some("li"),
            NodeKind::Text => Some("span"),
        }
    }
}

/// Owned visual tree node: structure plus text, nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualNode {
    pub kind: NodeKind,
    pub text: Option<String>,
    pub children: Vec<VisualNode>,
}

/// Attachment point owned by the caller.
pub trait Container {
    fn attach(&mut self, node: VisualNode);
}

impl Container for VisualNode {
    fn attach(&mut self, node: VisualNode) {
        self.append(node);
    }
}

impl VisualNode {
    fn new(kind: NodeKind, text: Option<String>) -> Self {
        Self {
            kind,
            text,
            children: Vec::new(),
        }
    }

    pub fn document() -> Self {
        Self::new(NodeKind::Document, None)
    }

    pub fn ordered_list() -> Self {
        Self::new(NodeKind::OrderedList, None)
    }

    pub fn unordered_list() -> Self {
        Self::new(NodeKind::UnorderedList, None)
    }

    pub fn item() -> Self {
        Self::new(NodeKind::Item, None)
    }

    pub fn text_item(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Item, Some(text.into()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text, Some(text.into()))
    }

    pub fn append(&mut self, child: VisualNode) {
        self.children.push(child);
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Number of nodes of `kind` in this subtree, including `self`.
    pub fn count(&self, kind: NodeKind) -> usize {
        let own = usize::from(self.kind == kind);
        own + self.children.iter().map(|c| c.count(kind)).sum::<usize>()
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let tag = self.kind.tag();
        if let Some(tag) = tag {
            let _ = write!(out, "<{}>", tag);
        }
        if let Some(text) = &self.text {
            out.push_str(&escape_html(text));
        }
        for child in &self.children {
            child.write_html(out);
        }
        if let Some(tag) = tag {
            let _ = write!(out, "</{}>", tag);
        }
    }

    pub fn to_tree(&self) -> Tree<String> {
        let label = match (self.kind.tag(), &self.text) {
            (None, _) => "document".to_string(),
            (Some(tag), Some(text)) => format!("{} \"{}\"", tag, text),
            (Some(tag), None) => tag.to_string(),
        };
        Tree::new(label).with_leaves(self.children.iter().map(VisualNode::to_tree))
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn annotation_label(annotation: &Annotation) -> String {
    format!("{} by {}", annotation.content, annotation.author)
}

/// Builds the ordered list for `entities` off-tree and attaches it to
/// `container` in one step. Does nothing at all when `entities` is empty.
///
/// Rendering again into the same container appends another list; clearing
/// old content is up to the caller.
pub fn render<C: Container + ?Sized>(container: &mut C, entities: &[NestedEntity]) {
    if entities.is_empty() {
        return;
    }

    let mut list = VisualNode::ordered_list();

    for entity in entities {
        let mut item = VisualNode::item();
        item.append(VisualNode::text(entity.title.as_str()));

        if !entity.annotations.is_empty() {
            let mut notes = VisualNode::unordered_list();
            for annotation in &entity.annotations {
                notes.append(VisualNode::text_item(annotation_label(annotation)));
            }
            item.append(notes);
        }

        list.append(item);
    }

    container.attach(list);
}
