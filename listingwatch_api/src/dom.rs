//! Minimal document-tree interface the extraction rules are written against.
//!
//! The rules in [`crate::extract`] only need child iteration, attribute
//! lookup and text extraction, so they are generic over [`Element`] rather
//! than tied to a particular HTML parser. [`scraper::ElementRef`] is the
//! production implementation.

use scraper::{ElementRef, Node};

/// A direct child of an element: either a text run or another element.
pub enum Child<'a, E> {
    Text(&'a str),
    Element(E),
}

/// Read-only view of one element in a parsed document.
pub trait Element<'a>: Copy + 'a {
    /// Lower-case tag name.
    fn name(&self) -> &'a str;

    fn attr(&self, name: &str) -> Option<&'a str>;

    /// Direct children in document order, text runs included.
    fn children(&self) -> impl Iterator<Item = Child<'a, Self>>;

    /// All descendant elements in document order, excluding `self`.
    fn descendants(&self) -> impl Iterator<Item = Self>;

    /// Every descendant text run in document order.
    fn text_runs(&self) -> impl Iterator<Item = &'a str>;

    /// Element children only.
    fn child_elements(&self) -> impl Iterator<Item = Self> {
        self.children().filter_map(|child| match child {
            Child::Element(el) => Some(el),
            Child::Text(_) => None,
        })
    }

    /// Concatenated text of the subtree, without separators.
    fn flat_text(&self) -> String {
        self.text_runs().collect()
    }

    /// Text of the subtree with runs joined by `sep`.
    fn flat_text_with(&self, sep: &str) -> String {
        self.text_runs().collect::<Vec<_>>().join(sep)
    }

    /// True when the `class` attribute contains `class` as a whole token.
    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

impl<'a> Element<'a> for ElementRef<'a> {
    fn name(&self) -> &'a str {
        self.value().name()
    }

    fn attr(&self, name: &str) -> Option<&'a str> {
        self.value().attr(name)
    }

    fn children(&self) -> impl Iterator<Item = Child<'a, Self>> {
        let node = **self;
        node.children().filter_map(|node| match node.value() {
            Node::Text(text) => Some(Child::Text(&**text)),
            Node::Element(_) => ElementRef::wrap(node).map(Child::Element),
            _ => None,
        })
    }

    fn descendants(&self) -> impl Iterator<Item = Self> {
        let node = **self;
        node.descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
    }

    fn text_runs(&self) -> impl Iterator<Item = &'a str> {
        ElementRef::text(self)
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
