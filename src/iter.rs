//! Double-ended iterators over child nodes and attributes.

use crate::attribute::Attribute;
use crate::node::Node;

/// Iterator over the direct children of a node.
///
/// Anchored to the remembered parent at creation; an empty handle yields an
/// empty range.
pub struct Children<'doc> {
    front: Node<'doc>,
    back: Node<'doc>,
}

impl<'doc> Children<'doc> {
    pub(crate) fn new(parent: Node<'doc>) -> Children<'doc> {
        Children {
            front: parent.first_child(),
            back: parent.last_child(),
        }
    }
}

impl<'doc> Iterator for Children<'doc> {
    type Item = Node<'doc>;

    fn next(&mut self) -> Option<Node<'doc>> {
        if self.front.is_empty() {
            return None;
        }
        let cur = self.front;
        if cur == self.back {
            self.front = Node::empty_handle();
            self.back = Node::empty_handle();
        } else {
            self.front = cur.next_sibling();
        }
        Some(cur)
    }
}

impl<'doc> DoubleEndedIterator for Children<'doc> {
    fn next_back(&mut self) -> Option<Node<'doc>> {
        if self.back.is_empty() {
            return None;
        }
        let cur = self.back;
        if cur == self.front {
            self.front = Node::empty_handle();
            self.back = Node::empty_handle();
        } else {
            self.back = cur.previous_sibling();
        }
        Some(cur)
    }
}

impl std::iter::FusedIterator for Children<'_> {}

/// Iterator over the attributes of a node.
pub struct Attributes<'doc> {
    front: Attribute<'doc>,
    back: Attribute<'doc>,
}

impl<'doc> Attributes<'doc> {
    pub(crate) fn new(parent: Node<'doc>) -> Attributes<'doc> {
        Attributes {
            front: parent.first_attribute(),
            back: parent.last_attribute(),
        }
    }
}

impl<'doc> Iterator for Attributes<'doc> {
    type Item = Attribute<'doc>;

    fn next(&mut self) -> Option<Attribute<'doc>> {
        if self.front.is_empty() {
            return None;
        }
        let cur = self.front;
        if cur == self.back {
            self.front = Attribute::empty_handle();
            self.back = Attribute::empty_handle();
        } else {
            self.front = cur.next_attribute();
        }
        Some(cur)
    }
}

impl<'doc> DoubleEndedIterator for Attributes<'doc> {
    fn next_back(&mut self) -> Option<Attribute<'doc>> {
        if self.back.is_empty() {
            return None;
        }
        let cur = self.back;
        if cur == self.front {
            self.front = Attribute::empty_handle();
            self.back = Attribute::empty_handle();
        } else {
            self.back = cur.previous_attribute();
        }
        Some(cur)
    }
}

impl std::iter::FusedIterator for Attributes<'_> {}
