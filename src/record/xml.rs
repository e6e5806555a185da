use std::path::Path as FsPath;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::path::{CompareOp, Literal, LocatedStep, LocationPath, PathExpr, Predicate, Step};
use super::{QueryError, Record};
use crate::types::PathRef;

/// Failures while reading an XML document.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("document has no root element")]
    NoRoot,
}

type NodeId = usize;

#[derive(Debug)]
enum NodeKind {
    Document,
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed XML document.
///
/// Nodes live in an arena in document order, so a node's id is also its
/// position in a pre-order walk of the tree.
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<Node>,
}

/// A selected item: a node, or one attribute of an element node.
///
/// The derived ordering is document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Item {
    node: NodeId,
    attr: Option<usize>,
}

impl Item {
    fn node(node: NodeId) -> Self {
        Self { node, attr: None }
    }
}

impl XmlDocument {
    /// Parse a document from a string.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] if the text is not well-formed or has no root
    /// element.
    pub fn parse_str(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        let mut nodes = vec![Node {
            kind: NodeKind::Document,
            parent: None,
            children: Vec::new(),
        }];
        let mut open: Vec<NodeId> = vec![0];

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let id = push_element(&mut nodes, &open, &e)?;
                    open.push(id);
                }
                Event::Empty(e) => {
                    push_element(&mut nodes, &open, &e)?;
                }
                Event::End(_) => {
                    if open.len() > 1 {
                        open.pop();
                    }
                }
                Event::Text(t) => {
                    let text = t.unescape()?;
                    if !text.trim().is_empty() {
                        push_node(&mut nodes, &open, NodeKind::Text(text.into_owned()));
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    push_node(&mut nodes, &open, NodeKind::Text(text));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let doc = Self { nodes };
        if doc.root().is_none() {
            return Err(XmlError::NoRoot);
        }
        Ok(doc)
    }

    /// Read and parse a document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<FsPath>) -> Result<Self, XmlError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    /// The document node, parent of the root element.
    #[must_use]
    pub fn document(&self) -> XmlNode<'_> {
        XmlNode { doc: self, id: 0 }
    }

    /// The root element.
    #[must_use]
    pub fn root(&self) -> Option<XmlNode<'_>> {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .find(|&id| matches!(self.nodes[id].kind, NodeKind::Element { .. }))
            .map(|id| XmlNode { doc: self, id })
    }

    /// Every `iati-activity` element, in document order.
    #[must_use]
    pub fn activities(&self) -> Vec<XmlNode<'_>> {
        self.elements_named("iati-activity")
    }

    /// Every element with the given name, in document order.
    #[must_use]
    pub fn elements_named(&self, name: &str) -> Vec<XmlNode<'_>> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(&node.kind, NodeKind::Element { name: n, .. } if n == name))
            .map(|(id, _)| XmlNode { doc: self, id })
            .collect()
    }

    fn element_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id].kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Element { .. })
    }

    fn string_value(&self, item: Item) -> String {
        if let Some(index) = item.attr {
            return self.attributes(item.node)[index].1.clone();
        }
        let mut out = String::new();
        self.collect_text(item.node, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for &child in &self.nodes[id].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    fn descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[id].children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    // -- Path evaluation ----------------------------------------------------

    fn eval_expr(&self, context: NodeId, expr: &PathExpr) -> Vec<Item> {
        let mut items: Vec<Item> = expr
            .branches
            .iter()
            .flat_map(|branch| self.eval_location(context, branch))
            .collect();
        items.sort_unstable();
        items.dedup();
        items
    }

    fn eval_location(&self, context: NodeId, path: &LocationPath) -> Vec<Item> {
        let start = if path.absolute { 0 } else { context };
        let mut current = vec![Item::node(start)];
        for step in &path.steps {
            let mut next: Vec<Item> = current
                .iter()
                .filter(|item| item.attr.is_none())
                .flat_map(|item| self.apply_step(item.node, step))
                .collect();
            next.sort_unstable();
            next.dedup();
            current = next;
        }
        current
    }

    fn apply_step(&self, context: NodeId, located: &LocatedStep) -> Vec<Item> {
        let origins = if located.descendant {
            let mut all = vec![context];
            self.descendants(context, &mut all);
            all
        } else {
            vec![context]
        };

        match &located.step {
            Step::SelfNode => vec![Item::node(context)],
            Step::Parent => self.nodes[context]
                .parent
                .map(Item::node)
                .into_iter()
                .collect(),
            Step::Attribute(test) => origins
                .iter()
                .flat_map(|&id| {
                    self.attributes(id)
                        .iter()
                        .enumerate()
                        .filter(|(_, (name, _))| test.matches(name))
                        .map(move |(index, _)| Item {
                            node: id,
                            attr: Some(index),
                        })
                })
                .collect(),
            Step::Text => origins
                .iter()
                .flat_map(|&id| self.nodes[id].children.iter().copied())
                .filter(|&child| matches!(self.nodes[child].kind, NodeKind::Text(_)))
                .map(Item::node)
                .collect(),
            Step::Element { test, predicates } => origins
                .iter()
                .flat_map(|&id| {
                    let candidates: Vec<NodeId> = self.nodes[id]
                        .children
                        .iter()
                        .copied()
                        .filter(|&child| self.element_name(child).is_some_and(|n| test.matches(n)))
                        .collect();
                    self.filter_predicates(candidates, predicates)
                })
                .map(Item::node)
                .collect(),
        }
    }

    fn filter_predicates(&self, mut candidates: Vec<NodeId>, predicates: &[Predicate]) -> Vec<NodeId> {
        for predicate in predicates {
            candidates = candidates
                .iter()
                .enumerate()
                .filter(|&(index, &id)| self.test_predicate(id, index + 1, predicate))
                .map(|(_, &id)| id)
                .collect();
        }
        candidates
    }

    fn test_predicate(&self, id: NodeId, position: usize, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Or(a, b) => {
                self.test_predicate(id, position, a) || self.test_predicate(id, position, b)
            }
            Predicate::And(a, b) => {
                self.test_predicate(id, position, a) && self.test_predicate(id, position, b)
            }
            Predicate::Not(inner) => !self.test_predicate(id, position, inner),
            Predicate::Position(n) => position == *n,
            Predicate::Exists(path) => !self.eval_location(id, path).is_empty(),
            Predicate::Compare { path, op, literal } => self
                .eval_location(id, path)
                .into_iter()
                .any(|item| compare(&self.string_value(item), *op, literal)),
        }
    }
}

/// Existential comparison of one value against a literal; numeric literals
/// compare numerically and never match a non-numeric value.
fn compare(value: &str, op: CompareOp, literal: &Literal) -> bool {
    let equal = match literal {
        Literal::Text(text) => value == text,
        Literal::Number(n) => match value.trim().parse::<f64>() {
            Ok(v) => v == *n,
            Err(_) => return op == CompareOp::Neq,
        },
    };
    match op {
        CompareOp::Eq => equal,
        CompareOp::Neq => !equal,
    }
}

fn push_node(nodes: &mut Vec<Node>, open: &[NodeId], kind: NodeKind) -> NodeId {
    let parent = open.last().copied().unwrap_or(0);
    let id = nodes.len();
    nodes.push(Node {
        kind,
        parent: Some(parent),
        children: Vec::new(),
    });
    nodes[parent].children.push(id);
    id
}

fn push_element(
    nodes: &mut Vec<Node>,
    open: &[NodeId],
    start: &BytesStart<'_>,
) -> Result<NodeId, quick_xml::Error> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(push_node(nodes, open, NodeKind::Element { name, attributes }))
}

/// A node of an [`XmlDocument`], used as a [`Record`].
#[derive(Debug, Clone, Copy)]
pub struct XmlNode<'a> {
    doc: &'a XmlDocument,
    id: NodeId,
}

impl<'a> XmlNode<'a> {
    /// Element name, or `None` for the document node.
    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.doc.element_name(self.id)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.doc
            .attributes(self.id)
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of this node and its descendants.
    #[must_use]
    pub fn text(&self) -> String {
        self.doc.string_value(Item::node(self.id))
    }

    /// Evaluate a pre-parsed path against this node, returning string values.
    #[must_use]
    pub fn values(&self, expr: &PathExpr) -> Vec<String> {
        self.doc
            .eval_expr(self.id, expr)
            .into_iter()
            .map(|item| self.doc.string_value(item))
            .collect()
    }
}

impl PartialEq for XmlNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for XmlNode<'_> {}

impl Record for XmlNode<'_> {
    fn query(&self, path: &PathRef) -> Result<Vec<String>, QueryError> {
        Ok(self.values(path.expr()?))
    }

    fn select(&self, path: &PathRef) -> Result<Vec<Self>, QueryError> {
        self.doc
            .eval_expr(self.id, path.expr()?)
            .into_iter()
            .map(|item| {
                if item.attr.is_none() && (item.node == 0 || self.doc.is_element(item.node)) {
                    Ok(XmlNode {
                        doc: self.doc,
                        id: item.node,
                    })
                } else {
                    Err(QueryError::NotAnElement {
                        path: path.query().to_owned(),
                    })
                }
            })
            .collect()
    }

    /// A matched element is present even when it has no text; attribute and
    /// text matches must be non-empty.
    fn present(&self, path: &PathRef) -> Result<bool, QueryError> {
        Ok(self
            .doc
            .eval_expr(self.id, path.expr()?)
            .into_iter()
            .any(|item| {
                (item.attr.is_none() && self.doc.is_element(item.node))
                    || !self.doc.string_value(item).is_empty()
            }))
    }
}
