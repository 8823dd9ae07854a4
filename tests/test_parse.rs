use itertools::Itertools;
use xml_config::{Document, Error, Node, ReadOptions};

fn utf16_le(text: &str, bom: bool) -> Vec<u8> {
    let mut bytes = Vec::new();
    if bom {
        bytes.extend_from_slice(&[0xff, 0xfe]);
    }
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn utf16_be(text: &str, bom: bool) -> Vec<u8> {
    let mut bytes = Vec::new();
    if bom {
        bytes.extend_from_slice(&[0xfe, 0xff]);
    }
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

#[test]
fn test_basic_structure() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<settings>
  <database>
    <config id="main">host=localhost</config>
  </database>
</settings>"#;
    let doc = Document::parse_str(xml).unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(root.name(&doc), "settings");
    let database = root.child_elements(&doc)[0];
    assert_eq!(database.name(&doc), "database");
    let config = database.child_elements(&doc)[0];
    assert_eq!(config.attribute(&doc, "id"), Some("main"));
    assert_eq!(config.text_content(&doc), "host=localhost");
}

#[test]
fn test_read_options() {
    let xml = "<root><empty></empty><padded>  x  </padded><hollow/></root>";

    let empty_text_node = [true, false];
    let trim_text = [true, false];
    let opts = [empty_text_node, trim_text];

    for k in opts.iter().multi_cartesian_product() {
        let read_options = ReadOptions {
            empty_text_node: *k[0],
            trim_text: *k[1],
            require_decl: false,
        };
        let doc = Document::parse_str_with_opts(xml, read_options.clone()).unwrap();
        let root = doc.root_element().unwrap();
        let children = root.child_elements(&doc);
        let (empty, padded, hollow) = (children[0], children[1], children[2]);

        if read_options.empty_text_node {
            assert!(
                matches!(empty.children(&doc).as_slice(), [Node::Text(t)] if t.is_empty()),
                "options: {:?}",
                read_options,
            );
        } else {
            assert!(
                empty.children(&doc).is_empty(),
                "options: {:?}",
                read_options,
            );
        }

        let expected = if read_options.trim_text { "x" } else { "  x  " };
        assert_eq!(
            padded.text_content(&doc),
            expected,
            "options: {:?}",
            read_options,
        );

        // <hollow/> gets no text node under any option
        assert!(
            hollow.children(&doc).is_empty(),
            "options: {:?}",
            read_options,
        );
    }
}

#[test]
fn test_closing_tag_mismatch_err() {
    // no closing tag
    let xml = "<img>";
    let doc = Document::parse_str(xml);
    assert!(matches!(doc.unwrap_err(), Error::MalformedXML(_)));

    // closing tag mismatch
    let xml = "<a><img>Te</a>xt</img>";
    let doc = Document::parse_str(xml);
    assert!(matches!(doc.unwrap_err(), Error::MalformedXML(_)));

    // no opening tag
    let xml = "</abc>";
    let doc = Document::parse_str(xml);
    assert!(matches!(doc.unwrap_err(), Error::MalformedXML(_)));
}

#[test]
fn test_multiple_root_elements_rejected() {
    let doc = Document::parse_str("<a></a><b></b>");
    assert!(matches!(doc.unwrap_err(), Error::MalformedXML(_)));

    // non-element nodes outside the root are fine
    let xml = "<!DOCTYPE settings><!-- generated --><settings/><!-- end -->";
    let doc = Document::parse_str(xml).unwrap();
    assert_eq!(doc.root_element().unwrap().name(&doc), "settings");
    assert_eq!(doc.container().children(&doc).len(), 4);
}

#[test]
fn test_require_decl() {
    let opts = ReadOptions {
        require_decl: true,
        ..ReadOptions::default()
    };

    let xml = "<?xml version=\"1.0\"?><settings/>";
    assert!(Document::parse_str_with_opts(xml, opts.clone()).is_ok());

    let xml = "<settings/>";
    let doc = Document::parse_str_with_opts(xml, opts.clone());
    assert!(matches!(doc.unwrap_err(), Error::MalformedXML(_)));

    // without the option a declaration-less document is accepted
    assert!(Document::parse_str(xml).is_ok());
}

#[test]
fn test_decl_attributes() {
    let xml = "<?xml version=\"1.1\" standalone=\"yes\"?><a/>";
    let doc = Document::parse_str(xml).unwrap();
    let written = doc.write_str().unwrap();
    assert!(written.starts_with("<?xml version=\"1.1\""));
    assert!(written.contains("standalone=\"yes\""));

    let xml = "<?xml version=\"1.0\" standalone=\"maybe\"?><a/>";
    let doc = Document::parse_str(xml);
    assert!(matches!(doc.unwrap_err(), Error::MalformedXML(_)));
}

#[test]
fn test_entities_unescaped() {
    let xml = r#"<a attr="&lt;&amp;">x &gt; y &amp;&#65;</a>"#;
    let doc = Document::parse_str(xml).unwrap();
    let a = doc.root_element().unwrap();
    assert_eq!(a.attribute(&doc, "attr"), Some("<&"));
    assert_eq!(a.text_content(&doc), "x > y &A");
}

#[test]
fn test_utf16_little_endian_with_bom() {
    let bytes = utf16_le(
        "<?xml version=\"1.0\" encoding=\"UTF-16\"?><settings><name>caf\u{e9}</name></settings>",
        true,
    );
    let doc = Document::parse_bytes(&bytes).unwrap();
    let root = doc.root_element().unwrap();
    assert_eq!(root.name(&doc), "settings");
    assert_eq!(root.text_content(&doc), "café");
}

#[test]
fn test_utf16_big_endian_sniffed_without_bom() {
    let bytes = utf16_be("<?xml version=\"1.0\"?><settings><a>x</a></settings>", false);
    let doc = Document::parse_bytes(&bytes).unwrap();
    assert_eq!(doc.root_element().unwrap().name(&doc), "settings");
}

#[test]
fn test_utf8_bom_is_stripped() {
    let mut bytes = vec![0xef, 0xbb, 0xbf];
    bytes.extend_from_slice(b"<settings/>");
    let doc = Document::parse_bytes(&bytes).unwrap();
    assert_eq!(doc.root_element().unwrap().name(&doc), "settings");
}

#[test]
fn test_declared_single_byte_encoding() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><name>caf");
    bytes.push(0xe9); // e-acute in latin-1
    bytes.extend_from_slice(b"</name>");
    let doc = Document::parse_bytes(&bytes).unwrap();
    assert_eq!(doc.root_element().unwrap().text_content(&doc), "café");
}

#[test]
fn test_undecodable_bytes() {
    // declared encoding nobody knows
    let err = Document::parse_bytes(b"<?xml version=\"1.0\" encoding=\"klingon\"?><a/>")
        .unwrap_err();
    assert!(matches!(err, Error::CannotDecode));

    // invalid UTF-8 after a UTF-8 BOM
    let err = Document::parse_bytes(b"\xef\xbb\xbf<a>\xff\xff</a>").unwrap_err();
    assert!(matches!(err, Error::CannotDecode));
}
