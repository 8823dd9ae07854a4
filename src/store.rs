use crate::document::{Document, Node};
use crate::element::Element;
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Element name assumed for group entries when no name is given.
/// See [`ConfigStore::group_values`].
pub const DEFAULT_ITEM_NAME: &str = "config";

/// How [`ConfigStore::remove_matching_with`] proceeds when an examined
/// element's attributes differ from the candidate's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Only the first element carrying the candidate's name is ever
    /// examined: if its attributes don't all match, the call gives up
    /// without removing anything. [`ConfigStore::remove_matching`] uses
    /// this policy.
    AbortOnMismatch,
    /// Keep scanning past elements whose attributes differ and remove on
    /// the first full match anywhere in the tree.
    SkipMismatched,
}

/// A configuration file held as an XML tree.
///
/// A store wraps one [`Document`] together with the path it came from.
/// Opening a path that doesn't exist on disk (or an empty file) creates
/// the file with a single empty root element right away.
///
/// Direct children of the root element act as *groups*, and the children
/// of a group are its entries. Lookups by tag name search the whole tree;
/// references that don't resolve degrade to a no-op or an empty result
/// rather than failing, so call sites stay short. Only I/O, undecodable
/// or malformed files, and attribute lookups that hit an element without
/// the attribute report errors.
///
/// Mutations happen in memory. Nothing is written back until [`save`] or
/// [`save_as`] is called, except for the file created when opening a
/// missing path.
///
/// [`save`]: ConfigStore::save
/// [`save_as`]: ConfigStore::save_as
///
/// # Examples
/// ```no_run
/// use xml_config::ConfigStore;
///
/// # fn main() -> xml_config::Result<()> {
/// let mut store = ConfigStore::open("app.xml", "settings")?;
/// let database = store.ensure_group("database");
/// store.add_child(database, "config", "host=localhost");
/// store.save()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    root_name: String,
    created: bool,
    root: Element,
    document: Document,
}

impl ConfigStore {
    /// Open the configuration file at `path`, creating it with an empty
    /// `<root_name/>` element if it is missing or empty.
    ///
    /// `root_name` only takes effect when the file has to be created;
    /// an existing document keeps whatever root element it has.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`]: The file could not be read or created.
    /// - [`Error::CannotDecode`] / [`Error::MalformedXML`]: The existing
    /// file is not parseable XML, or the file has to be created and
    /// `root_name` is blank.
    pub fn open<P: Into<PathBuf>, S: Into<String>>(path: P, root_name: S) -> Result<ConfigStore> {
        let path = path.into();
        let root_name = root_name.into();
        match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => {
                let document = Document::parse_bytes(&bytes)?;
                let root = document.root_element().ok_or_else(|| {
                    Error::MalformedXML("document has no root element".to_string())
                })?;
                Ok(ConfigStore {
                    path,
                    root_name,
                    created: false,
                    root,
                    document,
                })
            }
            Ok(_) => Self::create(path, root_name),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Self::create(path, root_name),
            Err(err) => Err(Error::Io(err)),
        }
    }

    fn create(path: PathBuf, root_name: String) -> Result<ConfigStore> {
        if is_blank(&root_name) {
            return Err(Error::MalformedXML(
                "cannot create a document with a blank root name".to_string(),
            ));
        }
        let mut document = Document::new();
        let root = Element::new(&mut document, root_name.as_str());
        document.push_root_node(Node::Element(root))?;
        document.write_file(&path)?;
        Ok(ConfigStore {
            path,
            root_name,
            created: true,
            root,
            document,
        })
    }

    /// The path the store was opened with. [`save`] writes here.
    ///
    /// [`save`]: ConfigStore::save
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The root element name the store was opened with. Note that this is
    /// the requested name, which for a pre-existing document may differ
    /// from `self.root().name(..)`.
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// `true` if opening the store had to create the file on disk.
    pub fn was_created(&self) -> bool {
        self.created
    }

    /// The root element of the underlying document.
    pub fn root(&self) -> Element {
        self.root
    }

    /// The underlying document, for queries the store doesn't cover.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The underlying document, for edits the store doesn't cover.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Find the group named `name` directly under the root element,
    /// creating it (with empty text content) if it doesn't exist.
    ///
    /// Returns `None` if `name` is blank.
    pub fn ensure_group(&mut self, name: &str) -> Option<Element> {
        if is_blank(name) {
            return None;
        }
        if let Some(found) = self.group(name) {
            return Some(found);
        }
        self.add_root_child(name, "")
    }

    /// First direct child of the root element named `name`.
    fn group(&self, name: &str) -> Option<Element> {
        let document = &self.document;
        self.root
            .child_elements(document)
            .into_iter()
            .find(|elem| elem.name(document) == name)
    }

    /// Every element named `name` anywhere in the document, in document
    /// order. The root element itself is included in the search.
    ///
    /// The returned list is a snapshot: it is not invalidated by later
    /// edits to the tree.
    pub fn find_all(&self, name: &str) -> Vec<Element> {
        if is_blank(name) {
            return Vec::new();
        }
        let document = &self.document;
        document
            .container()
            .descendants(document)
            .into_iter()
            .filter(|elem| elem.name(document) == name)
            .collect()
    }

    /// First element named `name` in document order, or `None` if the
    /// name is blank or nothing carries it.
    pub fn find_first(&self, name: &str) -> Option<Element> {
        self.find_all(name).into_iter().next()
    }

    /// First element named `name` whose attribute `attribute` equals
    /// `value`.
    ///
    /// Returns `Ok(None)` when `name` or `attribute` is blank, or when no
    /// element matches.
    ///
    /// # Errors
    ///
    /// - [`Error::AttributeNotFound`]: An element named `name` was reached
    /// that doesn't carry `attribute` at all.
    pub fn find_by_attribute(
        &self,
        name: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Option<Element>> {
        if is_blank(name) || is_blank(attribute) {
            return Ok(None);
        }
        let document = &self.document;
        for element in self.find_all(name) {
            match element.attribute(document, attribute) {
                Some(found) if found == value => return Ok(Some(element)),
                Some(_) => continue,
                None => {
                    return Err(Error::AttributeNotFound {
                        element: element.name(document).to_string(),
                        attribute: attribute.to_string(),
                    })
                }
            }
        }
        Ok(None)
    }

    /// Direct children of the group named `group_name`.
    ///
    /// Group lookup walks every direct child of the root element, so when
    /// several groups share the name, the last one wins. Returns an empty
    /// list when the group doesn't exist or the name is blank.
    pub fn group_children(&self, group_name: &str) -> Vec<Element> {
        if is_blank(group_name) {
            return Vec::new();
        }
        let document = &self.document;
        let mut children = Vec::new();
        for group in self.root.child_elements(document) {
            if group.name(document) == group_name {
                children = group.child_elements(document);
            }
        }
        children
    }

    /// Direct children of the first element named `parent_name` anywhere
    /// in the tree. Empty when no such element exists.
    pub fn children_of(&self, parent_name: &str) -> Vec<Element> {
        match self.find_first(parent_name) {
            Some(parent) => parent.child_elements(&self.document),
            None => Vec::new(),
        }
    }

    /// Append a new element named `name` with text `value` as the last
    /// child of the root element. Returns `None` (without adding) if
    /// `name` is blank.
    pub fn add_root_child(&mut self, name: &str, value: &str) -> Option<Element> {
        let root = self.root;
        self.add_child(Some(root), name, value)
    }

    /// Append a new element named `name` with text `value` as the last
    /// child of `parent`. Returns `None` (without adding) if `parent` is
    /// `None` or `name` is blank.
    ///
    /// The new element always holds a text node, so an empty `value`
    /// serializes as `<name></name>` rather than `<name/>`.
    pub fn add_child(
        &mut self,
        parent: Option<Element>,
        name: &str,
        value: &str,
    ) -> Option<Element> {
        let parent = parent?;
        if is_blank(name) {
            return None;
        }
        let element = Element::build(name)
            .text_content(value)
            .push_to(&mut self.document, parent);
        Some(element)
    }

    /// Move an already-built element (with its whole subtree) to be the
    /// last child of `parent`. The child is detached from any previous
    /// parent first. No-op if either handle is `None`, or if `parent`
    /// sits inside `child`'s own subtree.
    pub fn append_child(&mut self, parent: Option<Element>, child: Option<Element>) {
        let (parent, child) = match (parent, child) {
            (Some(parent), Some(child)) => (parent, child),
            _ => return,
        };
        let document = &mut self.document;
        // attaching an element below itself would cut the cycle loose
        // from the root
        let mut ancestor = Some(parent);
        while let Some(elem) = ancestor {
            if elem == child {
                return;
            }
            ancestor = elem.parent(document);
        }
        if child.detach(document).is_err() {
            return;
        }
        // a detached non-container element always accepts a new parent
        let _ = parent.push_child(document, Node::Element(child));
    }

    /// Set attribute `name` to `value` on `element`, inserting or
    /// replacing as needed. No-op if `element` is `None` or `name` is
    /// blank.
    pub fn set_attribute(&mut self, element: Option<Element>, name: &str, value: &str) {
        let element = match element {
            Some(element) => element,
            None => return,
        };
        if is_blank(name) {
            return;
        }
        element.set_attribute(&mut self.document, name, value);
    }

    /// Remove the first element named `name` (and its subtree) from the
    /// tree. No-op if nothing carries the name.
    pub fn remove_by_name(&mut self, name: &str) {
        if let Some(element) = self.find_first(name) {
            // elements found in the tree are never the container
            let _ = element.detach(&mut self.document);
        }
    }

    /// Remove the first element named `name` whose attribute `attribute`
    /// equals `value`. No-op if nothing matches.
    ///
    /// # Errors
    ///
    /// - [`Error::AttributeNotFound`]: see [`ConfigStore::find_by_attribute`].
    pub fn remove_by_attribute(&mut self, name: &str, attribute: &str, value: &str) -> Result<()> {
        if let Some(element) = self.find_by_attribute(name, attribute, value)? {
            let _ = element.detach(&mut self.document);
        }
        Ok(())
    }

    /// Remove `candidate` from the tree if an element matching it
    /// structurally exists, using [`MatchPolicy::AbortOnMismatch`].
    ///
    /// See [`ConfigStore::remove_matching_with`] for the exact contract.
    pub fn remove_matching(&mut self, candidate: Option<Element>) {
        self.remove_matching_with(candidate, MatchPolicy::AbortOnMismatch)
    }

    /// Remove `candidate` from the tree if an element matching it
    /// structurally exists.
    ///
    /// Elements carrying the candidate's name are examined in document
    /// order. An element matches when its attribute set is the same size
    /// as the candidate's and every candidate attribute is present on it
    /// with an equal value. `policy` decides what a non-matching element
    /// does: abandon the call, or move on to the next one.
    ///
    /// What gets detached is the candidate itself, not the matched
    /// element. A candidate that matches some element but doesn't sit in
    /// the tree leaves the document unchanged. No-op if `candidate` is
    /// `None`.
    pub fn remove_matching_with(&mut self, candidate: Option<Element>, policy: MatchPolicy) {
        let candidate = match candidate {
            Some(candidate) => candidate,
            None => return,
        };
        let name = candidate.name(&self.document).to_string();
        for existing in self.find_all(&name) {
            if !self.attributes_match(candidate, existing) {
                match policy {
                    MatchPolicy::AbortOnMismatch => return,
                    MatchPolicy::SkipMismatched => continue,
                }
            }
            let _ = candidate.detach(&mut self.document);
            return;
        }
    }

    fn attributes_match(&self, candidate: Element, existing: Element) -> bool {
        let document = &self.document;
        let want = candidate.attributes(document);
        let have = existing.attributes(document);
        want.len() == have.len()
            && want.iter().all(|(name, value)| have.get(name) == Some(value))
    }

    /// Text values of the entries of the group named `group_name`, taking
    /// [`DEFAULT_ITEM_NAME`] as the entry tag.
    ///
    /// Shorthand for `group_values_named(group_name, DEFAULT_ITEM_NAME)`.
    pub fn group_values(&self, group_name: &str) -> Option<Vec<String>> {
        self.group_values_named(group_name, DEFAULT_ITEM_NAME)
    }

    /// Text values of the children of the group named `group_name` that
    /// are tagged `item_name`. An empty `item_name` collects every child
    /// element of the group.
    ///
    /// Returns `None` when the group doesn't exist, so an absent group
    /// can be told apart from a group with no entries.
    pub fn group_values_named(&self, group_name: &str, item_name: &str) -> Option<Vec<String>> {
        if is_blank(group_name) {
            return None;
        }
        let document = &self.document;
        let group = self.group(group_name)?;
        let values = group
            .child_elements(document)
            .into_iter()
            .filter(|elem| item_name.is_empty() || elem.name(document) == item_name)
            .map(|elem| elem.text_content(document))
            .collect();
        Some(values)
    }

    /// Text content of the first element named `name`, or `default` when
    /// nothing carries the name.
    pub fn value_or(&self, name: &str, default: &str) -> String {
        match self.find_first(name) {
            Some(element) => element.text_content(&self.document),
            None => default.to_string(),
        }
    }

    /// Replace the content of the first element named `name` with a
    /// single text node holding `value`. Any child elements it had are
    /// dropped. No-op if nothing carries the name.
    pub fn set_value(&mut self, name: &str, value: &str) {
        if let Some(element) = self.find_first(name) {
            element.set_text_content(&mut self.document, value);
        }
    }

    /// Write the document back to the path the store was opened with.
    pub fn save(&self) -> Result<()> {
        self.document.write_file(&self.path)
    }

    /// Write the document to `path`. The store keeps pointing at its
    /// original path; later [`save`] calls are not redirected.
    ///
    /// [`save`]: ConfigStore::save
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.document.write_file(path)
    }
}

fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store(dir: &tempfile::TempDir) -> ConfigStore {
        ConfigStore::open(dir.path().join("app.xml"), "settings").unwrap()
    }

    #[test]
    fn test_blank_names_are_noops() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(&dir);

        assert_eq!(store.ensure_group(""), None);
        assert_eq!(store.ensure_group("  "), None);
        assert_eq!(store.add_root_child(" \t", "v"), None);
        assert_eq!(store.find_first(""), None);
        assert!(store.find_all("  ").is_empty());
        assert_eq!(store.find_by_attribute("", "id", "1").unwrap(), None);
        assert_eq!(store.find_by_attribute("user", " ", "1").unwrap(), None);
        assert_eq!(store.group_values(""), None);
        assert!(store.root().child_elements(store.document()).is_empty());
    }

    #[test]
    fn test_blank_root_name_cannot_create() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigStore::open(dir.path().join("app.xml"), "  ").unwrap_err();
        assert!(matches!(err, Error::MalformedXML(_)));
        assert!(!dir.path().join("app.xml").exists());
    }

    #[test]
    fn test_group_values_uses_default_item_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = scratch_store(&dir);
        let group = store.ensure_group("database");
        store.add_child(group, DEFAULT_ITEM_NAME, "host=localhost");
        store.add_child(group, "other", "ignored");

        assert_eq!(
            store.group_values("database"),
            Some(vec!["host=localhost".to_string()]),
        );
        assert_eq!(
            store.group_values_named("database", ""),
            Some(vec!["host=localhost".to_string(), "ignored".to_string()]),
        );
    }
}
