use crate::element::{Element, ElementData};
use crate::error::{Error, Result};
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Options when parsing xml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// `<tag></tag>` will have a `Node::Text("")` child, while `<tag />` won't.
    /// Defaults to `true`.
    pub empty_text_node: bool,
    /// Remove leading and trailing whitespace of text nodes.
    /// A text node that is pure whitespace is dropped entirely.
    /// Defaults to `true`.
    pub trim_text: bool,
    /// Return an error if the document doesn't start with an XML declaration.
    /// Defaults to `false`, since configuration files written by hand
    /// frequently omit it.
    pub require_decl: bool,
}

impl Default for ReadOptions {
    fn default() -> ReadOptions {
        ReadOptions {
            empty_text_node: true,
            trim_text: true,
            require_decl: false,
        }
    }
}

/// Represents an XML node.
#[derive(Debug)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    CData(String),
    PI(String),
    DocType(String),
}

impl Node {
    pub fn as_element(&self) -> Option<Element> {
        match self {
            Self::Element(elem) => Some(*elem),
            _ => None,
        }
    }
}

/// Represents an XML document or a document fragment.
///
/// To build a document from scratch, use [`Document::new`] and
/// [`Element::build`]. To read an existing document, use one of the
/// `parse_*` methods.
///
/// # Examples
/// ```
/// use xml_config::Document;
///
/// let mut doc = Document::parse_str(r#"<?xml version="1.0" encoding="UTF-8"?>
/// <settings>
///     <metadata>
///         <author>Lewis Carol</author>
///     </metadata>
/// </settings>
/// "#).unwrap();
/// let author = doc
///     .root_element()
///     .unwrap()
///     .descendants(&doc)
///     .into_iter()
///     .find(|elem| elem.name(&doc) == "author")
///     .unwrap();
/// author.set_text_content(&mut doc, "Lewis Carroll");
/// let xml = doc.write_str().unwrap();
/// assert!(xml.contains("Lewis Carroll"));
/// ```
#[derive(Debug)]
pub struct Document {
    pub(crate) store: Vec<ElementData>,
    container: Element,

    version: String,
    standalone: bool,
}

impl Document {
    /// Create a blank new xml document.
    pub fn new() -> Document {
        let (container, container_data) = Element::container_data();
        Document {
            store: vec![container_data],
            container,
            version: String::from("1.0"),
            standalone: false,
        }
    }

    /// Get the container element of the document.
    ///
    /// The container element is a phantom element above the root element.
    /// It is the parent of the root element and of any comments, processing
    /// instructions and doctype nodes that sit outside it. It has no name
    /// and is never written out.
    pub fn container(&self) -> Element {
        self.container
    }

    /// `true` if the document has no nodes at all, not even a root element.
    pub fn is_empty(&self) -> bool {
        self.store.len() == 1 && !self.container.has_children(self)
    }

    /// Get the root element of the document, or `None` on a document
    /// without one.
    pub fn root_element(&self) -> Option<Element> {
        self.container.child_elements(self).get(0).copied()
    }

    /// Push a node to the top level of the document.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedXML`]: A document can only have one root element.
    pub fn push_root_node(&mut self, node: Node) -> Result<()> {
        if node.as_element().is_some() && self.root_element().is_some() {
            return Err(Error::MalformedXML(
                "document cannot have more than one root element".to_string(),
            ));
        }
        let container = self.container;
        container.push_child(self, node)
    }
}

// Read
impl Document {
    /// Parse xml from a string.
    pub fn parse_str(text: &str) -> Result<Document> {
        Self::parse_str_with_opts(text, ReadOptions::default())
    }

    pub fn parse_str_with_opts(text: &str, opts: ReadOptions) -> Result<Document> {
        DocumentParser::parse(text, opts)
    }

    /// Parse xml from raw bytes. The bytes are decoded to UTF-8 before
    /// parsing: a byte order mark wins, then UTF-16 is sniffed from the
    /// leading `<`, then the encoding declared in the XML declaration is
    /// looked up, and UTF-8 is assumed otherwise.
    ///
    /// # Errors
    ///
    /// - [`Error::CannotDecode`]: The declared encoding is not recognized,
    /// or the bytes are not valid in the detected encoding.
    /// - [`Error::MalformedXML`]: The XML is invalid.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Document> {
        Self::parse_bytes_with_opts(bytes, ReadOptions::default())
    }

    pub fn parse_bytes_with_opts(bytes: &[u8], opts: ReadOptions) -> Result<Document> {
        let text = decode_xml(bytes)?;
        Self::parse_str_with_opts(&text, opts)
    }

    /// Read and parse the xml file at `path`.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Document> {
        Self::parse_file_with_opts(path, ReadOptions::default())
    }

    pub fn parse_file_with_opts<P: AsRef<Path>>(path: P, opts: ReadOptions) -> Result<Document> {
        let bytes = std::fs::read(path)?;
        Self::parse_bytes_with_opts(&bytes, opts)
    }
}

// Write
impl Document {
    /// Writes document as an xml string.
    pub fn write_str(&self) -> Result<String> {
        let mut buf: Vec<u8> = Vec::with_capacity(200);
        self.write(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Write the document to the file at `path`. Always written in UTF-8.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.write(&mut file)
    }

    /// Write document to writer. Will be written in UTF-8.
    pub fn write(&self, writer: &mut impl Write) -> Result<()> {
        let container = self.container();
        let mut writer = Writer::new_with_indent(writer, b' ', 2);
        self.write_decl(&mut writer)?;
        self.write_nodes(&mut writer, container.children(self))?;
        writer.write_event(Event::Eof)?;
        Ok(())
    }

    fn write_decl(&self, writer: &mut Writer<impl Write>) -> Result<()> {
        let standalone = match self.standalone {
            true => Some("yes".as_bytes()),
            false => None,
        };
        writer.write_event(Event::Decl(BytesDecl::new(
            self.version.as_bytes(),
            Some("UTF-8".as_bytes()),
            standalone,
        )))?;
        Ok(())
    }

    fn write_nodes(&self, writer: &mut Writer<impl Write>, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Element(elem) => self.write_element(writer, *elem)?,
                // Text is stored unescaped, so write it escaped.
                Node::Text(text) => {
                    writer.write_event(Event::Text(BytesText::from_plain_str(text)))?
                }
                // Comment, CData, PI and DocType content is stored raw.
                Node::Comment(text) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped_str(text)))?
                }
                Node::CData(text) => {
                    writer.write_event(Event::CData(BytesText::from_escaped_str(text)))?
                }
                Node::PI(text) => {
                    writer.write_event(Event::PI(BytesText::from_escaped_str(text)))?
                }
                Node::DocType(text) => {
                    writer.write_event(Event::DocType(BytesText::from_escaped_str(text)))?
                }
            };
        }
        Ok(())
    }

    fn write_element(&self, writer: &mut Writer<impl Write>, element: Element) -> Result<()> {
        let name_bytes = element.name(self).as_bytes();
        let mut start = BytesStart::borrowed_name(name_bytes);
        for (key, value) in element.attributes(self) {
            start.push_attribute((key.as_bytes(), value.as_bytes()));
        }
        if element.has_children(self) {
            writer.write_event(Event::Start(start))?;
            self.write_nodes(writer, element.children(self))?;
            writer.write_event(Event::End(BytesEnd::borrowed(name_bytes)))?;
        } else {
            writer.write_event(Event::Empty(start))?;
        }
        Ok(())
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(s: &str) -> Result<Document> {
        Document::parse_str(s)
    }
}

struct DocumentParser {
    document: Document,
    opts: ReadOptions,
}

impl DocumentParser {
    fn parse(text: &str, opts: ReadOptions) -> Result<Document> {
        let mut parser = DocumentParser {
            document: Document::new(),
            opts,
        };
        parser.parse_content(Reader::from_str(text))?;
        Ok(parser.document)
    }

    fn parse_content(&mut self, mut reader: Reader<&[u8]>) -> Result<()> {
        reader.trim_text(self.opts.trim_text);
        let mut buf = Vec::with_capacity(200);
        // the container element stays at the bottom of the stack
        let mut element_stack: Vec<Element> = vec![self.document.container()];

        let first = reader.read_event(&mut buf)?;
        if self.opts.require_decl && !matches!(first, Event::Decl(_)) {
            return Err(Error::MalformedXML(
                "Didn't find XML declaration at the start of document".to_string(),
            ));
        }
        if self.handle_event(&mut element_stack, first)? {
            return Ok(());
        }
        loop {
            let event = reader.read_event(&mut buf)?;
            if self.handle_event(&mut element_stack, event)? {
                return Ok(());
            }
        }
    }

    fn handle_decl(&mut self, ev: &BytesDecl) -> Result<()> {
        self.document.version = String::from_utf8(ev.version()?.to_vec())?;
        // the encoding was already dealt with while decoding the raw bytes,
        // and documents are always written back in UTF-8
        self.document.standalone = match ev.standalone() {
            Some(res) => {
                let val = std::str::from_utf8(&*res?)?.to_lowercase();
                if val == "yes" {
                    true
                } else if val == "no" {
                    false
                } else {
                    return Err(Error::MalformedXML(
                        "Standalone Document Declaration has non boolean value".to_string(),
                    ));
                }
            }
            None => false,
        };
        Ok(())
    }

    fn handle_bytes_start(
        &mut self,
        element_stack: &[Element],
        ev: &BytesStart,
    ) -> Result<Element> {
        let document = &mut self.document;
        let parent = *element_stack.last().unwrap();
        if parent.is_container() && document.root_element().is_some() {
            return Err(Error::MalformedXML(
                "document cannot have more than one root element".to_string(),
            ));
        }
        let name = String::from_utf8(ev.name().to_vec())?;
        let element = Element::new(document, name);
        let attributes = element.mut_attributes(document);
        for attr in ev.attributes() {
            let attr = attr?;
            let key = String::from_utf8(attr.key.to_vec())?;
            let value = String::from_utf8(attr.unescaped_value()?.to_vec())?;
            attributes.insert(key, value);
        }
        parent.push_child(document, Node::Element(element)).unwrap();
        Ok(element)
    }

    // Returns true if document parsing is finished.
    fn handle_event(&mut self, element_stack: &mut Vec<Element>, event: Event) -> Result<bool> {
        let document = &mut self.document;
        match event {
            Event::Start(ref ev) => {
                let element = self.handle_bytes_start(element_stack, ev)?;
                element_stack.push(element);
                Ok(false)
            }
            Event::End(_) => {
                let elem = element_stack.pop().unwrap(); // quick-xml checks if tag names match for us
                if self.opts.empty_text_node {
                    // distinguish <tag></tag> and <tag />
                    if !elem.has_children(&self.document) {
                        elem.push_child(&mut self.document, Node::Text(String::new()))
                            .unwrap();
                    }
                }
                Ok(false)
            }
            Event::Empty(ref ev) => {
                self.handle_bytes_start(element_stack, ev)?;
                Ok(false)
            }
            Event::Text(ev) => {
                let content = String::from_utf8(ev.unescaped()?.to_vec())?;
                let node = Node::Text(content);
                let elem = *element_stack.last().unwrap();
                elem.push_child(document, node).unwrap();
                Ok(false)
            }
            // Comment, CData, PI and DocType content is kept raw.
            Event::Comment(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                let node = Node::Comment(content);
                let elem = *element_stack.last().unwrap();
                elem.push_child(document, node).unwrap();
                Ok(false)
            }
            Event::CData(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                let node = Node::CData(content);
                let elem = *element_stack.last().unwrap();
                elem.push_child(document, node).unwrap();
                Ok(false)
            }
            Event::PI(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                let node = Node::PI(content);
                let elem = *element_stack.last().unwrap();
                elem.push_child(document, node).unwrap();
                Ok(false)
            }
            Event::DocType(ev) => {
                let content = String::from_utf8(ev.to_vec())?;
                let node = Node::DocType(content);
                let elem = *element_stack.last().unwrap();
                elem.push_child(document, node).unwrap();
                Ok(false)
            }
            Event::Decl(ref ev) => {
                self.handle_decl(ev)?;
                Ok(false)
            }
            Event::Eof => {
                if element_stack.len() > 1 {
                    return Err(Error::MalformedXML(
                        "unexpected end of document, an element is still open".to_string(),
                    ));
                }
                Ok(true)
            }
        }
    }
}

/// Decode raw bytes to UTF-8 before handing them to the xml reader.
///
/// A byte order mark takes priority. UTF-16 without a BOM is recognized
/// by where the `<` of the XML declaration lands. Otherwise the encoding
/// declared in the document is looked up, defaulting to UTF-8 when there
/// is none.
fn decode_xml(bytes: &[u8]) -> Result<Cow<str>> {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _bom_length)) => encoding,
        None => match bytes {
            [0x00, 0x3c, ..] => UTF_16BE,
            [0x3c, 0x00, ..] => UTF_16LE,
            _ => match declared_encoding_label(bytes) {
                Some(label) => {
                    Encoding::for_label(label.as_bytes()).ok_or(Error::CannotDecode)?
                }
                None => UTF_8,
            },
        },
    };
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        return Err(Error::CannotDecode);
    }
    Ok(text)
}

/// Find the encoding label named in the XML declaration, if any.
fn declared_encoding_label(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    if !text.starts_with("<?xml") {
        return None;
    }
    let decl = &text[..text.find("?>")?];
    let rest = &decl[decl.find("encoding=")? + "encoding=".len()..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = &rest[1..];
    Some(rest[..rest.find(quote)?].to_string())
}
