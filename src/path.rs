//! Property path representation for locating values in an object graph.
//!
//! This module provides [`PropertyPath`] and [`PathNode`] for tracking where
//! in the validated graph a violation occurred, e.g. `addresses[2].zip` or
//! `contacts[home].email`.

use std::fmt::{self, Display};

use serde::Serialize;

use crate::value::MapKey;

/// The key carried by a path node that sits inside a map.
///
/// Keys parsed from strings are always [`PathKey::Name`]; keys recorded during
/// traversal keep the original [`MapKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    /// A key recorded from a live map.
    Map(MapKey),
    /// A key parsed from a path expression.
    Name(String),
}

impl PathKey {
    fn matches(&self, other: &PathKey) -> bool {
        match (self, other) {
            (PathKey::Map(a), PathKey::Map(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Map(k) => write!(f, "{}", k),
            PathKey::Name(s) => f.write_str(s),
        }
    }
}

/// One node of a property path.
///
/// A node has an optional name (the root placeholder has none) and may be
/// marked as sitting inside an iterable, in which case it can carry the
/// position or the map key of the element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathNode {
    name: Option<String>,
    in_iterable: bool,
    index: Option<usize>,
    key: Option<PathKey>,
}

impl PathNode {
    /// Creates a named node.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Creates the unnamed root placeholder.
    pub fn root() -> Self {
        Self::default()
    }

    /// The node's name, `None` for the root placeholder.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the node addresses an element of an iterable.
    pub fn is_in_iterable(&self) -> bool {
        self.in_iterable
    }

    /// The element position, for indexed containers.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The element key, for maps.
    pub fn key(&self) -> Option<&PathKey> {
        self.key.as_ref()
    }

    /// Marks the node as addressing the element at `index`.
    pub fn set_index(&mut self, index: Option<usize>) {
        self.in_iterable = true;
        self.key = None;
        self.index = index;
    }

    /// Marks the node as addressing the map entry at `key`.
    pub fn set_key(&mut self, key: PathKey) {
        self.in_iterable = true;
        self.index = None;
        self.key = Some(key);
    }

    /// Clears any iterable marker.
    pub fn clear_iterable(&mut self) {
        self.in_iterable = false;
        self.index = None;
        self.key = None;
    }

    fn is_placeholder(&self) -> bool {
        self.name.is_none() && !self.in_iterable
    }
}

impl Display for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            f.write_str(name)?;
        }
        if self.in_iterable {
            write!(f, "[")?;
            if let Some(idx) = self.index {
                write!(f, "{}", idx)?;
            } else if let Some(key) = &self.key {
                write!(f, "{}", key)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// A path from the validated root to a value.
///
/// A path always holds at least one node; an empty path is a single unnamed
/// root placeholder.
///
/// # Example
///
/// ```rust
/// use beanval::PropertyPath;
///
/// let mut path = PropertyPath::root();
/// path.add_node("addresses");
/// path.set_leaf_index(Some(2));
/// path.add_node("zip");
///
/// assert_eq!(path.to_string(), "addresses[2].zip");
/// assert_eq!(PropertyPath::parse("addresses[2].zip").unwrap(), path);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    nodes: Vec<PathNode>,
}

impl PropertyPath {
    /// Creates the root path.
    pub fn root() -> Self {
        Self {
            nodes: vec![PathNode::root()],
        }
    }

    /// Creates a path with a single named node.
    pub fn from_property(name: impl Into<String>) -> Self {
        let mut path = Self::root();
        path.add_node(name);
        path
    }

    /// Parses a path expression such as `orders[3].lines[key].sku`.
    ///
    /// Numeric bracket contents become indexes, anything else a key.
    pub fn parse(expression: &str) -> Result<Self, PathParseError> {
        let mut path = Self::root();
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(path);
        }

        let mut chars = expression.char_indices().peekable();
        let mut name = String::new();
        let mut expect_name = true;

        while let Some((pos, c)) = chars.next() {
            match c {
                '.' => {
                    if name.is_empty() && expect_name {
                        return Err(PathParseError::new(expression, pos, "empty property name"));
                    }
                    if !name.is_empty() {
                        path.add_node(std::mem::take(&mut name));
                    }
                    expect_name = true;
                }
                '[' => {
                    if !name.is_empty() {
                        path.add_node(std::mem::take(&mut name));
                    }
                    let mut content = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == ']' {
                            closed = true;
                            break;
                        }
                        content.push(inner);
                    }
                    if !closed {
                        return Err(PathParseError::new(expression, pos, "unterminated '['"));
                    }
                    let leaf = path.leaf_mut();
                    if content.is_empty() {
                        leaf.set_index(None);
                    } else if let Ok(idx) = content.parse::<usize>() {
                        leaf.set_index(Some(idx));
                    } else {
                        leaf.set_key(PathKey::Name(content));
                    }
                    expect_name = false;
                    if let Some(&(next_pos, next)) = chars.peek() {
                        // A node carries at most one index or key.
                        if next != '.' {
                            return Err(PathParseError::new(
                                expression,
                                next_pos,
                                "expected '.' after ']'",
                            ));
                        }
                    }
                }
                ']' => {
                    return Err(PathParseError::new(expression, pos, "unexpected ']'"));
                }
                other => {
                    name.push(other);
                    expect_name = false;
                }
            }
        }

        if expect_name {
            return Err(PathParseError::new(
                expression,
                expression.len(),
                "path ends with '.'",
            ));
        }
        if !name.is_empty() {
            path.add_node(name);
        }
        Ok(path)
    }

    /// Appends a named node.
    ///
    /// A bare root placeholder is replaced rather than kept in front.
    pub fn add_node(&mut self, name: impl Into<String>) {
        self.push(PathNode::named(name));
    }

    /// Appends a node.
    pub fn push(&mut self, node: PathNode) {
        if self.nodes.len() == 1 && self.nodes[0].is_placeholder() {
            self.nodes[0] = node;
        } else {
            self.nodes.push(node);
        }
    }

    /// Removes the leaf node. The path never shrinks below one root
    /// placeholder: removing the only node resets it to the placeholder.
    pub fn remove_leaf(&mut self) {
        if self.nodes.len() > 1 {
            self.nodes.pop();
        } else {
            self.nodes[0] = PathNode::root();
        }
    }

    /// Marks the leaf as an indexed iterable element, or an unindexed one.
    pub fn set_leaf_index(&mut self, index: Option<usize>) {
        self.leaf_mut().set_index(index);
    }

    /// Marks the leaf as a map entry.
    pub fn set_leaf_key(&mut self, key: MapKey) {
        self.leaf_mut().set_key(PathKey::Map(key));
    }

    /// Clears the iterable marker of the leaf.
    pub fn clear_leaf_iterable(&mut self) {
        self.leaf_mut().clear_iterable();
    }

    /// The leaf node.
    pub fn leaf(&self) -> &PathNode {
        // nodes is never empty
        &self.nodes[self.nodes.len() - 1]
    }

    fn leaf_mut(&mut self) -> &mut PathNode {
        let last = self.nodes.len() - 1;
        &mut self.nodes[last]
    }

    /// The path without its leaf node (the root path for single-node paths).
    pub fn without_leaf(&self) -> Self {
        let mut parent = self.clone();
        parent.remove_leaf();
        parent
    }

    /// Returns true if this is the bare root placeholder.
    pub fn is_root(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].is_placeholder()
    }

    /// Number of nodes, counting the placeholder of a root path.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a path holds at least one node.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates the nodes from the root.
    pub fn nodes(&self) -> impl Iterator<Item = &PathNode> {
        self.nodes.iter()
    }

    /// Returns true if `prefix` addresses this path or one of its ancestors.
    ///
    /// Unnamed nodes in `prefix` match any name, and iterable nodes in
    /// `prefix` without an index or key match any element. The root path is a
    /// prefix of every path.
    pub fn is_sub_path_of(&self, prefix: &PropertyPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        let mut mine = self.nodes.iter();
        for pattern in &prefix.nodes {
            let Some(node) = mine.next() else {
                return false;
            };
            if pattern.in_iterable {
                if !node.in_iterable {
                    return false;
                }
                if pattern.index.is_some() && pattern.index != node.index {
                    return false;
                }
                if let Some(key) = &pattern.key {
                    match &node.key {
                        Some(k) if key.matches(k) => {}
                        _ => return false,
                    }
                }
            }
            if pattern.name.is_some() && pattern.name != node.name {
                return false;
            }
        }
        true
    }
}

impl Default for PropertyPath {
    fn default() -> Self {
        Self::root()
    }
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for node in &self.nodes {
            if node.is_placeholder() {
                continue;
            }
            if !first && node.name.is_some() {
                write!(f, ".")?;
            }
            write!(f, "{}", node)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for PropertyPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Error produced by [`PropertyPath::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid property path '{expression}' at offset {offset}: {reason}")]
pub struct PathParseError {
    /// The rejected expression.
    pub expression: String,
    /// Byte offset of the problem.
    pub offset: usize,
    /// What was wrong.
    pub reason: &'static str,
}

impl PathParseError {
    fn new(expression: &str, offset: usize, reason: &'static str) -> Self {
        Self {
            expression: expression.to_string(),
            offset,
            reason,
        }
    }
}
