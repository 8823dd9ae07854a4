use crate::document::{Document, Node};
use crate::error::{Error, Result};
use std::collections::HashMap;

#[derive(Debug)]
pub(crate) struct ElementData {
    name: String,
    attributes: HashMap<String, String>,
    parent: Option<Element>,
    children: Vec<Node>,
}

/// Represents an XML element.
///
/// This struct only contains a unique `usize` id and implements trait `Copy`.
/// So you do not need to bother with having a reference.
///
/// Because the actual data of the element is stored in [`Document`],
/// most methods take `&Document` or `&mut Document` as their first argument.
///
/// Note that an `Element` may only be used on the document that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    id: usize,
}

impl Element {
    /// Create a new empty element with `name`.
    ///
    /// The element is detached; call [`Element::push_child`] on a parent
    /// or [`Document::push_root_node`] to place it in the tree.
    pub fn new<S: Into<String>>(document: &mut Document, name: S) -> Element {
        Self::with_data(document, name.into(), HashMap::new())
    }

    /// Chain methods to build an element easily.
    /// The chain can be ended with [`ElementBuilder::build`] or [`ElementBuilder::push_to`].
    ///
    /// # Example
    /// ```
    /// use xml_config::{Document, Element};
    ///
    /// let mut document = Document::new();
    /// let container = document.container();
    /// let root = Element::build("root")
    ///     .attribute("id", "main")
    ///     .text_content("hello")
    ///     .push_to(&mut document, container);
    ///
    /// assert_eq!(root.attribute(&document, "id"), Some("main"));
    /// ```
    pub fn build<S: Into<String>>(name: S) -> ElementBuilder {
        ElementBuilder::new(name.into())
    }

    pub(crate) fn with_data(
        document: &mut Document,
        name: String,
        attributes: HashMap<String, String>,
    ) -> Element {
        let elem = Element {
            id: document.store.len(),
        };
        let elem_data = ElementData {
            name,
            attributes,
            parent: None,
            children: vec![],
        };
        document.store.push(elem_data);
        elem
    }

    /// Container element data. Kept at id 0 of every document store.
    pub(crate) fn container_data() -> (Element, ElementData) {
        let elem_data = ElementData {
            name: String::new(),
            attributes: HashMap::new(),
            parent: None,
            children: Vec::new(),
        };
        let elem = Element { id: 0 };
        (elem, elem_data)
    }

    /// Returns `true` if this is the document container element.
    ///
    /// See [`Document::container`] for an explanation of the container element.
    pub fn is_container(&self) -> bool {
        self.id == 0
    }

    fn data<'a>(&self, document: &'a Document) -> &'a ElementData {
        document.store.get(self.id).unwrap()
    }

    fn mut_data<'a>(&self, document: &'a mut Document) -> &'a mut ElementData {
        document.store.get_mut(self.id).unwrap()
    }

    /// Get the tag name of the element.
    pub fn name<'a>(&self, document: &'a Document) -> &'a str {
        &self.data(document).name
    }

    /// Get attributes of the element.
    pub fn attributes<'a>(&self, document: &'a Document) -> &'a HashMap<String, String> {
        &self.data(document).attributes
    }

    pub fn mut_attributes<'a>(
        &self,
        document: &'a mut Document,
    ) -> &'a mut HashMap<String, String> {
        &mut self.mut_data(document).attributes
    }

    /// Get the value of the attribute `name`, or `None` if the element
    /// doesn't carry it.
    pub fn attribute<'a>(&self, document: &'a Document, name: &str) -> Option<&'a str> {
        self.attributes(document).get(name).map(|value| value.as_str())
    }

    /// Add the attribute `name` with `value`, replacing any previous value.
    pub fn set_attribute<K, V>(&self, document: &mut Document, name: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.mut_attributes(document).insert(name.into(), value.into());
    }

    pub fn parent(&self, document: &Document) -> Option<Element> {
        self.data(document).parent
    }

    /// ```ignore
    /// self.parent(document).is_some()
    /// ```
    pub fn has_parent(&self, document: &Document) -> bool {
        self.parent(document).is_some()
    }

    pub fn children<'a>(&self, document: &'a Document) -> &'a Vec<Node> {
        &self.data(document).children
    }

    /// ```ignore
    /// !self.children(document).is_empty()
    /// ```
    pub fn has_children(&self, document: &Document) -> bool {
        !self.children(document).is_empty()
    }

    /// Child [`Node::Element`]s, in document order.
    pub fn child_elements(&self, document: &Document) -> Vec<Element> {
        self.children(document)
            .iter()
            .filter_map(|node| node.as_element())
            .collect()
    }

    /// Every element below this one in document order, not including itself.
    pub fn descendants(&self, document: &Document) -> Vec<Element> {
        let mut elems = Vec::new();
        self.collect_descendants(document, &mut elems);
        elems
    }

    fn collect_descendants(&self, document: &Document, elems: &mut Vec<Element>) {
        for child in self.child_elements(document) {
            elems.push(child);
            child.collect_descendants(document, elems);
        }
    }

    /// Concatenation of the text and CDATA nodes below this element,
    /// in document order.
    pub fn text_content(&self, document: &Document) -> String {
        let mut text = String::new();
        self.collect_text(document, &mut text);
        text
    }

    fn collect_text(&self, document: &Document, text: &mut String) {
        for node in self.children(document) {
            match node {
                Node::Element(elem) => elem.collect_text(document, text),
                Node::Text(content) | Node::CData(content) => text.push_str(content),
                _ => (),
            }
        }
    }

    /// Replace all children of this element with a single text node.
    pub fn set_text_content<S: Into<String>>(&self, document: &mut Document, text: S) {
        for elem in self.child_elements(document) {
            elem.mut_data(document).parent = None;
        }
        let data = self.mut_data(document);
        data.children.clear();
        data.children.push(Node::Text(text.into()));
    }

    /// Equivalent to `vec.push()`.
    ///
    /// # Errors
    ///
    /// - [`Error::HasAParent`]: If node is an element, it must not have a parent.
    /// Call `elem.detach()` before.
    /// - [`Error::ContainerCannotMove`]: The document container cannot be moved.
    pub fn push_child(&self, document: &mut Document, node: Node) -> Result<()> {
        if let Node::Element(elem) = node {
            if elem.is_container() {
                return Err(Error::ContainerCannotMove);
            }
            let data = elem.mut_data(document);
            if data.parent.is_some() {
                return Err(Error::HasAParent);
            }
            data.parent = Some(*self);
        }
        self.mut_data(document).children.push(node);
        Ok(())
    }

    /// Remove child element by value.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`]: Element was not found among its children.
    pub fn remove_child_elem(&self, document: &mut Document, element: Element) -> Result<()> {
        let children = &mut self.mut_data(document).children;
        let pos = children
            .iter()
            .filter_map(|node| node.as_element())
            .position(|elem| elem == element)
            .ok_or(Error::NotFound)?;
        children.remove(pos);
        element.mut_data(document).parent = None;
        Ok(())
    }

    /// Detach this element and its subtree from its parent.
    /// Noop if it has no parent.
    ///
    /// # Errors
    ///
    /// - [`Error::ContainerCannotMove`]: The document container cannot be detached.
    pub fn detach(&self, document: &mut Document) -> Result<()> {
        if self.is_container() {
            return Err(Error::ContainerCannotMove);
        }
        let parent = self.data(document).parent;
        if let Some(parent) = parent {
            parent.remove_child_elem(document, *self)
        } else {
            Ok(())
        }
    }
}

/// An easy way to build a new element
/// by chaining methods to add properties.
///
/// Call [`Element::build`] to start building.
/// To finish building, either call `.build()` or `.push_to(parent)`
/// which returns [`Element`].
#[derive(Debug)]
pub struct ElementBuilder {
    name: String,
    attributes: HashMap<String, String>,
    text: Option<String>,
}

impl ElementBuilder {
    fn new(name: String) -> ElementBuilder {
        ElementBuilder {
            name,
            attributes: HashMap::new(),
            text: None,
        }
    }

    pub fn attribute<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Seed the element with a single text child. An empty string still
    /// produces a text node, so the element serializes as `<name></name>`
    /// rather than `<name/>`.
    pub fn text_content<S: Into<String>>(mut self, text: S) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Finish building and create the (detached) element in `document`.
    pub fn build(self, document: &mut Document) -> Element {
        let element = Element::with_data(document, self.name, self.attributes);
        if let Some(text) = self.text {
            element.mut_data(document).children.push(Node::Text(text));
        }
        element
    }

    /// Build the element and append it as the last child of `parent`.
    pub fn push_to(self, document: &mut Document, parent: Element) -> Element {
        let element = self.build(document);
        // a freshly built element has no parent, so attaching cannot fail
        element.mut_data(document).parent = Some(parent);
        parent.mut_data(document).children.push(Node::Element(element));
        element
    }
}

#[cfg(test)]
mod tests {
    use super::Element;
    use crate::document::Document;
    use crate::error::Error;

    #[test]
    fn test_children() {
        let xml = r#"
        <outer>
            inside outer
            <middle>
                <inner>
                    inside
                </inner>
                after inside
            </middle>
            <after>
                inside after
            </after>
        </outer>
        "#;
        let doc = Document::parse_str(xml).unwrap();
        let outer = doc.root_element().unwrap();
        let middle = outer.child_elements(&doc)[0];
        let inner = middle.child_elements(&doc)[0];
        let after = outer.child_elements(&doc)[1];
        assert_eq!(outer.name(&doc), "outer");
        assert_eq!(middle.name(&doc), "middle");
        assert_eq!(inner.name(&doc), "inner");
        assert_eq!(after.name(&doc), "after");
        assert_eq!(outer.children(&doc).len(), 3);
        assert_eq!(outer.child_elements(&doc).len(), 2);
        assert_eq!(
            outer.descendants(&doc),
            vec![middle, inner, after],
            "descendants are in document order",
        );
        assert_eq!(
            doc.container().descendants(&doc),
            vec![outer, middle, inner, after],
        );
    }

    #[test]
    fn test_text_content() {
        let xml = "<root>Hello <b>world<!-- not this --></b>!</root>";
        let doc = Document::parse_str(xml).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(root.text_content(&doc), "Hello world!");

        let mut doc = doc;
        root.set_text_content(&mut doc, "replaced");
        assert_eq!(root.text_content(&doc), "replaced");
        assert!(root.child_elements(&doc).is_empty());
    }

    #[test]
    fn test_builder() {
        let mut doc = Document::new();
        let container = doc.container();
        let root = Element::build("root")
            .attribute("one", "1")
            .attribute("two", "2")
            .text_content("some-text")
            .push_to(&mut doc, container);

        assert_eq!(doc.root_element(), Some(root));
        assert_eq!(root.name(&doc), "root");
        assert_eq!(root.attribute(&doc, "one"), Some("1"));
        assert_eq!(root.attribute(&doc, "two"), Some("2"));
        assert_eq!(root.attribute(&doc, "three"), None);
        assert_eq!(root.text_content(&doc), "some-text");
    }

    #[test]
    fn test_detach_and_reattach() {
        let xml = "<root><a><inner/></a><b/></root>";
        let mut doc = Document::parse_str(xml).unwrap();
        let root = doc.root_element().unwrap();
        let a = root.child_elements(&doc)[0];
        let b = root.child_elements(&doc)[1];
        let inner = a.child_elements(&doc)[0];

        a.detach(&mut doc).unwrap();
        assert_eq!(a.parent(&doc), None);
        assert_eq!(root.child_elements(&doc), vec![b]);
        // the subtree moves with its owner
        assert_eq!(inner.parent(&doc), Some(a));

        b.push_child(&mut doc, crate::document::Node::Element(a))
            .unwrap();
        assert_eq!(a.parent(&doc), Some(b));
        assert_eq!(b.child_elements(&doc), vec![a]);
    }

    #[test]
    fn test_push_child_guards() {
        let xml = "<root><a/></root>";
        let mut doc = Document::parse_str(xml).unwrap();
        let container = doc.container();
        let root = doc.root_element().unwrap();
        let a = root.child_elements(&doc)[0];

        let err = root
            .push_child(&mut doc, crate::document::Node::Element(a))
            .unwrap_err();
        assert!(matches!(err, Error::HasAParent));

        let err = a
            .push_child(&mut doc, crate::document::Node::Element(container))
            .unwrap_err();
        assert!(matches!(err, Error::ContainerCannotMove));

        let err = container.detach(&mut doc).unwrap_err();
        assert!(matches!(err, Error::ContainerCannotMove));
    }
}
