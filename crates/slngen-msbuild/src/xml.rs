//! Element tree over quick-xml events
//!
//! Every element remembers the byte range it occupies in the source text so
//! callers can splice edits into the original file without reserializing it.

use quick_xml::events::Event;
use quick_xml::Reader;
use slngen_core::error::{SlnError, SlnResult};
use slngen_core::utils::write_atomic;
use std::path::{Path, PathBuf};

const UTF8_BOM: &str = "\u{feff}";

/// Byte range `[start, end)` in the document source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// One element with its attributes, children and text content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Local name, namespace prefix stripped
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenated, trimmed text content
    pub text: String,
    /// From the `<` of the start tag to just past the end tag
    pub span: Span,
    /// Offset of the `<` of the end tag (equal to `span.end` when self-closing)
    pub content_end: usize,
    pub self_closing: bool,
}

/// A parsed XML file
#[derive(Debug, Clone)]
pub struct XmlDocument {
    path: PathBuf,
    source: String,
    bom: bool,
    pub root: XmlElement,
}

impl XmlElement {
    /// Attribute value by name, ignoring case
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Non-empty text of the first child with the given name
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|text| !text.is_empty())
    }

    /// All descendants in document order, excluding `self`
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut result = Vec::new();
        let mut stack: Vec<&XmlElement> = self.children.iter().rev().collect();
        while let Some(element) = stack.pop() {
            result.push(element);
            stack.extend(element.children.iter().rev());
        }
        result
    }
}

impl XmlDocument {
    /// Read and parse a file
    pub fn load(path: &Path) -> SlnResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| SlnError::parse(path, format!("cannot read file: {}", e)))?;
        if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
            return Err(SlnError::parse(path, "UTF-16 encoded files are not supported"));
        }
        let text = String::from_utf8(bytes)
            .map_err(|_| SlnError::parse(path, "file is not valid UTF-8"))?;
        Self::parse(path, &text)
    }

    /// Parse text that was read from `path`
    pub fn parse(path: &Path, text: &str) -> SlnResult<Self> {
        let (bom, source) = match text.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let root = parse_tree(source).map_err(|message| SlnError::parse(path, message))?;
        Ok(Self {
            path: path.to_path_buf(),
            source: source.to_string(),
            bom,
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source text without the byte order mark
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_bom(&self) -> bool {
        self.bom
    }

    /// Atomically replace the file with `text`, keeping its byte order mark
    pub fn write(&self, text: &str) -> SlnResult<()> {
        let mut contents = String::with_capacity(text.len() + UTF8_BOM.len());
        if self.bom {
            contents.push_str(UTF8_BOM);
        }
        contents.push_str(text);
        write_atomic(&self.path, contents.as_bytes())
    }
}

/// Offset of the `<` opening the tag that ends at `end`.
///
/// The reader position after text events is not reliable for tag starts,
/// but a tag never contains a literal `<`.
fn tag_start(source: &str, end: usize) -> usize {
    source[..end].rfind('<').unwrap_or(0)
}

fn element_from(
    start: &quick_xml::events::BytesStart<'_>,
    span_start: usize,
) -> Result<XmlElement, String> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| format!("invalid attribute on <{}>: {}", name, e))?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| format!("invalid attribute value on <{}>: {}", name, e))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        span: Span {
            start: span_start,
            end: span_start,
        },
        ..XmlElement::default()
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        },
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        },
        None => Err(format!("unexpected second root element <{}>", element.name)),
    }
}

fn parse_tree(source: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(source);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed XML at byte {}: {}", reader.buffer_position(), e))?;
        let end = reader.buffer_position();

        match event {
            Event::Start(start) => {
                let element = element_from(&start, tag_start(source, end))?;
                stack.push(element);
            },
            Event::Empty(start) => {
                let mut element = element_from(&start, tag_start(source, end))?;
                element.span.end = end;
                element.content_end = end;
                element.self_closing = true;
                attach(&mut stack, &mut root, element)?;
            },
            Event::End(_) => {
                let mut element = stack
                    .pop()
                    .ok_or_else(|| format!("unexpected end tag at byte {}", end))?;
                element.content_end = tag_start(source, end);
                element.span.end = end;
                element.text = element.text.trim().to_string();
                attach(&mut stack, &mut root, element)?;
            },
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| format!("invalid text in <{}>: {}", current.name, e))?;
                    current.text.push_str(&text);
                }
            },
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            },
            Event::Eof => break,
            // Declarations, comments and processing instructions
            _ => {},
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unexpected end of file inside <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <!-- comment -->
  <PropertyGroup>
    <AssemblyName>Lib &amp; Co</AssemblyName>
  </PropertyGroup>
  <ItemGroup>
    <Compile Include="A.cs" />
    <Compile Include="B.cs"><Link>Shared\B.cs</Link></Compile>
  </ItemGroup>
</Project>
"#;

    #[test]
    fn test_parse_tree() {
        let doc = XmlDocument::parse(Path::new("Lib.csproj"), PROJECT).unwrap();
        let root = &doc.root;

        assert_eq!(root.name, "Project");
        assert_eq!(root.attr("toolsversion"), Some("15.0"));
        assert_eq!(root.children.len(), 2);

        let group = root.child("PropertyGroup").unwrap();
        assert_eq!(group.child_text("AssemblyName"), Some("Lib & Co"));

        let items: Vec<_> = root.child("ItemGroup").unwrap().children_named("Compile").collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].self_closing);
        assert_eq!(items[1].child_text("Link"), Some("Shared\\B.cs"));
    }

    #[test]
    fn test_spans_cover_source_text() {
        let doc = XmlDocument::parse(Path::new("Lib.csproj"), PROJECT).unwrap();
        let source = doc.source();
        let group = doc.root.child("ItemGroup").unwrap();

        let first = &group.children[0];
        assert_eq!(&source[first.span.start..first.span.end], r#"<Compile Include="A.cs" />"#);

        let second = &group.children[1];
        assert_eq!(
            &source[second.span.start..second.span.end],
            r#"<Compile Include="B.cs"><Link>Shared\B.cs</Link></Compile>"#
        );
        assert_eq!(&source[second.content_end..second.span.end], "</Compile>");
        assert_eq!(&source[doc.root.content_end..doc.root.span.end], "</Project>");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = XmlDocument::parse(Path::new("Lib.csproj"), PROJECT).unwrap();
        let names: Vec<_> = doc.root.descendants().iter().map(|e| e.name.clone()).collect();
        assert_eq!(
            names,
            vec!["PropertyGroup", "AssemblyName", "ItemGroup", "Compile", "Compile", "Link"]
        );
    }

    #[test]
    fn test_bom_is_stripped_and_restored() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("App.csproj");
        std::fs::write(&path, format!("{}<Project />", UTF8_BOM)).unwrap();

        let doc = XmlDocument::load(&path).unwrap();
        assert!(doc.has_bom());
        assert_eq!(doc.source(), "<Project />");

        doc.write("<Project></Project>").unwrap();
        let written = std::fs::read(&path).unwrap();
        assert!(written.starts_with(&[0xEF, 0xBB, 0xBF]));
    }

    #[test]
    fn test_malformed_documents() {
        let path = Path::new("Broken.csproj");
        assert!(XmlDocument::parse(path, "<Project><ItemGroup></Project>").is_err());
        assert!(XmlDocument::parse(path, "<Project>").is_err());
        assert!(XmlDocument::parse(path, "").is_err());
        assert!(XmlDocument::parse(path, "<A /><B />").is_err());

        match XmlDocument::parse(path, "<Project>") {
            Err(SlnError::Parse { path, .. }) => assert_eq!(path, Path::new("Broken.csproj")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
