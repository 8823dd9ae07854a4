//! A thin hierarchical key-value store backed by an XML file.
//!
//! The crate has two layers. [`Document`] and [`Element`] hold any XML
//! tree in memory and read and write it; [`ConfigStore`] sits on top and
//! adds the conventions configuration files follow: a file that is
//! created on first open, groups directly under the root element, and
//! name-based lookup anywhere in the tree.
//!
//! [`Element`] is a copyable id into its document, so handles can be
//! passed around freely; the element data itself lives in the
//! [`Document`].
//!
//! # Examples
//!
//! Reading and editing a tree directly:
//!
//! ```
//! use xml_config::{Document, Element};
//!
//! let mut doc = Document::parse_str("<settings><user id=\"41\"/></settings>").unwrap();
//! let root = doc.root_element().unwrap();
//! let user = root.child_elements(&doc)[0];
//! assert_eq!(user.attribute(&doc, "id"), Some("41"));
//!
//! Element::build("user")
//!     .attribute("id", "42")
//!     .push_to(&mut doc, root);
//! assert_eq!(root.child_elements(&doc).len(), 2);
//! ```
//!
//! Working with a configuration file through [`ConfigStore`]:
//!
//! ```no_run
//! use xml_config::ConfigStore;
//!
//! # fn main() -> xml_config::Result<()> {
//! let mut store = ConfigStore::open("app.xml", "settings")?;
//! let database = store.ensure_group("database");
//! store.add_child(database, "config", "host=localhost");
//! assert_eq!(store.group_values("database").unwrap(), vec!["host=localhost"]);
//! store.save()?;
//! # Ok(())
//! # }
//! ```

mod document;
mod element;
mod error;
mod store;

pub use crate::document::{Document, Node, ReadOptions};
pub use crate::element::{Element, ElementBuilder};
pub use crate::error::{Error, Result};
pub use crate::store::{ConfigStore, MatchPolicy, DEFAULT_ITEM_NAME};
