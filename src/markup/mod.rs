// Markup document model
//
// The runtime is driven by a tree of tagged elements. Tag names are normalized
// to uppercase and attribute names to lowercase, so lookups are
// case-insensitive from the caller's point of view.

mod parser;

/// Tag of the element that roots a game description
pub const GAME_TAG: &str = "GAME";

/// Markup parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct MarkupError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A single markup element with its attributes and child elements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    /// Create an element with no attributes or children
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_uppercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Uppercase tag name
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Check the tag name, ignoring case
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Look up an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Attributes in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name, value.to_string())),
        }
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self
            .attributes
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(index).1)
    }

    /// Direct children in document order
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Mutable access to the children, for editing markup between resets
    pub fn children_mut(&mut self) -> &mut Vec<Element> {
        &mut self.children
    }

    /// All descendants (not including `self`) with the given tag, in document order
    pub fn descendants<'a>(&'a self, tag: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        for child in &self.children {
            child.collect_matching(tag, &mut found);
        }
        found
    }

    /// First element with the given tag, searching `self` and then its subtree depth-first
    pub fn find(&self, tag: &str) -> Option<&Element> {
        if self.is(tag) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(tag))
    }

    fn find_mut(&mut self, tag: &str) -> Option<&mut Element> {
        if self.is(tag) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(tag))
    }

    fn collect_matching<'a>(&'a self, tag: &str, found: &mut Vec<&'a Element>) {
        if self.is(tag) {
            found.push(self);
        }
        for child in &self.children {
            child.collect_matching(tag, found);
        }
    }
}

/// A parsed markup document: the ordered list of top-level elements
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    nodes: Vec<Element>,
}

impl Document {
    /// Parse markup text into a document
    pub fn parse(text: &str) -> Result<Self, MarkupError> {
        let nodes = parser::parse_nodes(text)?;
        Ok(Self { nodes })
    }

    /// Wrap an already-built element tree
    pub fn from_element(root: Element) -> Self {
        Self { nodes: vec![root] }
    }

    /// Top-level elements
    pub fn nodes(&self) -> &[Element] {
        &self.nodes
    }

    /// The first `<game>` element in document order
    pub fn game_root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(|node| node.find(GAME_TAG))
    }

    /// Mutable access to the `<game>` element
    pub fn game_root_mut(&mut self) -> Option<&mut Element> {
        self.nodes
            .iter_mut()
            .find_map(|node| node.find_mut(GAME_TAG))
    }
}
