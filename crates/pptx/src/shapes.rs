//! Slide shape-tree parsing.
//!
//! Walks the `<p:spTree>` of a slide part and resolves every direct child
//! (and, recursively, every child of a `<p:grpSp>`) into a [`Shape`].

use deck2pdf_core::{Error, PictureShape, Result, Shape, TextShape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Extract the local name from a potentially namespaced XML element name.
pub fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// A shape under construction, with the depth of its opening element.
#[derive(Debug)]
enum Frame {
    Group(Vec<Shape>),
    Text(TextFrame),
    Picture(PictureFrame),
    Other,
}

#[derive(Debug, Default)]
struct TextFrame {
    paragraphs: Vec<String>,
    current: Option<String>,
    in_text: bool,
}

impl TextFrame {
    fn start_paragraph(&mut self) {
        self.end_paragraph();
        self.current = Some(String::new());
    }

    fn end_paragraph(&mut self) {
        if let Some(paragraph) = self.current.take() {
            self.paragraphs.push(paragraph);
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(ref mut paragraph) = self.current {
            paragraph.push_str(text);
        }
    }
}

#[derive(Debug, Default)]
struct PictureFrame {
    name: String,
    embed_id: Option<String>,
    placeholder: bool,
}

impl Frame {
    fn for_child(local: &[u8]) -> Option<Frame> {
        match local {
            b"sp" => Some(Frame::Text(TextFrame::default())),
            b"pic" => Some(Frame::Picture(PictureFrame::default())),
            b"grpSp" => Some(Frame::Group(Vec::new())),
            b"graphicFrame" | b"cxnSp" | b"contentPart" | b"AlternateContent" => Some(Frame::Other),
            _ => None,
        }
    }

    fn into_shape(self) -> Shape {
        match self {
            Frame::Group(children) => Shape::Group(children),
            Frame::Text(mut text) => {
                text.end_paragraph();
                Shape::Text(TextShape {
                    paragraphs: text.paragraphs,
                })
            }
            // Placeholder pictures are layout slots, not native pictures.
            Frame::Picture(picture) if picture.placeholder => Shape::Other,
            Frame::Picture(picture) => Shape::Picture(PictureShape {
                name: picture.name,
                embed_id: picture.embed_id,
                data: None,
            }),
            Frame::Other => Shape::Other,
        }
    }
}

/// Parse the shape tree of a slide part.
///
/// Picture payloads are not attached here; see
/// [`PptxParser`](crate::PptxParser).
pub fn parse_shape_tree(xml: &str) -> Result<Vec<Shape>> {
    let mut reader = Reader::from_str(xml);

    let mut depth = 0usize;
    let mut stack: Vec<(usize, Frame)> = Vec::new();
    let mut tree: Option<Vec<Shape>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                open_element(&mut stack, depth, e)?;
            }
            Ok(Event::Empty(ref e)) => {
                depth += 1;
                open_element(&mut stack, depth, e)?;
                close_element(&mut stack, depth, local_name(e.name().as_ref()), &mut tree);
                depth -= 1;
            }
            Ok(Event::Text(ref e)) => {
                if let Some((_, Frame::Text(text))) = stack.last_mut() {
                    if text.in_text {
                        let unescaped = e
                            .unescape()
                            .map_err(|e| Error::XmlError(format!("Bad text content: {}", e)))?;
                        text.push_text(&unescaped);
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                close_element(&mut stack, depth, local_name(e.name().as_ref()), &mut tree);
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
            }
            _ => {}
        }
    }

    tree.ok_or_else(|| Error::PptxParseError("No <p:spTree> found in slide".to_string()))
}

fn open_element(stack: &mut Vec<(usize, Frame)>, depth: usize, e: &BytesStart) -> Result<()> {
    let name = e.name();
    let local = local_name(name.as_ref());

    let Some((frame_depth, frame)) = stack.last_mut() else {
        if local == b"spTree" {
            stack.push((depth, Frame::Group(Vec::new())));
        }
        return Ok(());
    };

    let child = match frame {
        Frame::Group(_) if depth == *frame_depth + 1 => Frame::for_child(local),
        Frame::Group(_) | Frame::Other => None,
        Frame::Text(text) => {
            match local {
                b"p" => text.start_paragraph(),
                b"t" => text.in_text = true,
                b"br" => text.push_text("\n"),
                _ => {}
            }
            None
        }
        Frame::Picture(picture) => {
            match local {
                b"cNvPr" => {
                    if let Some(value) = attribute(e, b"name")? {
                        picture.name = value;
                    }
                }
                b"blip" => picture.embed_id = attribute(e, b"embed")?,
                b"ph" => picture.placeholder = true,
                _ => {}
            }
            None
        }
    };

    if let Some(child) = child {
        stack.push((depth, child));
    }

    Ok(())
}

fn close_element(
    stack: &mut Vec<(usize, Frame)>,
    depth: usize,
    local: &[u8],
    tree: &mut Option<Vec<Shape>>,
) {
    let Some((frame_depth, frame)) = stack.last_mut() else {
        return;
    };

    if *frame_depth != depth {
        if let Frame::Text(text) = frame {
            match local {
                b"t" => text.in_text = false,
                b"p" => text.end_paragraph(),
                _ => {}
            }
        }
        return;
    }

    let Some((_, finished)) = stack.pop() else {
        return;
    };
    let shape = finished.into_shape();

    match stack.last_mut() {
        Some((_, Frame::Group(children))) => children.push(shape),
        Some(_) => {}
        None => {
            if let Shape::Group(children) = shape {
                *tree = Some(children);
            }
        }
    }
}

/// Value of the attribute whose local name is `key`.
pub(crate) fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == key {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::XmlError(format!("Bad attribute value: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(tree: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:grpSpPr/>
      {}
    </p:spTree>
  </p:cSld>
</p:sld>"#,
            tree
        )
    }

    fn text_shapes(shapes: &[Shape]) -> Vec<Vec<String>> {
        shapes
            .iter()
            .filter_map(|s| match s {
                Shape::Text(t) => Some(t.paragraphs.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_text_shape_paragraphs() {
        let xml = slide(
            r#"<p:sp>
                 <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
                 <p:spPr/>
                 <p:txBody>
                   <a:bodyPr/><a:lstStyle/>
                   <a:p><a:r><a:rPr lang="en-US"/><a:t>Hello </a:t></a:r><a:r><a:t>world</a:t></a:r></a:p>
                   <a:p><a:endParaRPr lang="en-US"/></a:p>
                   <a:p><a:r><a:t>Fish &amp; chips</a:t></a:r><a:br/><a:r><a:t>second line</a:t></a:r></a:p>
                   <a:p><a:fld id="{1}" type="slidenum"><a:t>3</a:t></a:fld></a:p>
                 </p:txBody>
               </p:sp>"#,
        );

        let shapes = parse_shape_tree(&xml).unwrap();
        assert_eq!(
            text_shapes(&shapes),
            vec![vec![
                "Hello world".to_string(),
                String::new(),
                "Fish & chips\nsecond line".to_string(),
                "3".to_string(),
            ]]
        );
    }

    #[test]
    fn test_shape_without_text_body() {
        let xml = slide(r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Rect"/></p:nvSpPr><p:spPr/></p:sp>"#);
        let shapes = parse_shape_tree(&xml).unwrap();

        assert_eq!(shapes.len(), 1);
        assert_eq!(text_shapes(&shapes), vec![Vec::<String>::new()]);
    }

    #[test]
    fn test_picture_shapes() {
        let xml = slide(
            r#"<p:pic>
                 <p:nvPicPr><p:cNvPr id="4" name="Picture 3"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>
                 <p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>
                 <p:spPr/>
               </p:pic>
               <p:pic>
                 <p:nvPicPr><p:cNvPr id="5" name="Content Placeholder"/><p:cNvPicPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvPicPr>
                 <p:blipFill><a:blip r:embed="rId3"/></p:blipFill>
               </p:pic>"#,
        );

        let shapes = parse_shape_tree(&xml).unwrap();
        assert_eq!(shapes.len(), 2);
        match &shapes[0] {
            Shape::Picture(picture) => {
                assert_eq!(picture.name, "Picture 3");
                assert_eq!(picture.embed_id.as_deref(), Some("rId2"));
                assert!(picture.data.is_none());
            }
            other => panic!("expected picture, got {:?}", other),
        }
        assert!(matches!(shapes[1], Shape::Other));
    }

    #[test]
    fn test_groups_nest_in_order() {
        let xml = slide(
            r#"<p:sp><p:txBody><a:p><a:r><a:t>Before</a:t></a:r></a:p></p:txBody></p:sp>
               <p:grpSp>
                 <p:nvGrpSpPr><p:cNvPr id="6" name="Group 5"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
                 <p:grpSpPr/>
                 <p:sp><p:txBody><a:p><a:r><a:t>Inside</a:t></a:r></a:p></p:txBody></p:sp>
                 <p:grpSp>
                   <p:grpSpPr/>
                   <p:pic><p:blipFill><a:blip r:embed="rId9"/></p:blipFill></p:pic>
                 </p:grpSp>
               </p:grpSp>
               <p:graphicFrame><a:graphic><a:graphicData><a:tbl/></a:graphicData></a:graphic></p:graphicFrame>
               <p:cxnSp/>"#,
        );

        let shapes = parse_shape_tree(&xml).unwrap();
        assert_eq!(shapes.len(), 4);
        assert!(matches!(shapes[0], Shape::Text(_)));
        match &shapes[1] {
            Shape::Group(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(text_shapes(children), vec![vec!["Inside".to_string()]]);
                match &children[1] {
                    Shape::Group(nested) => {
                        assert!(matches!(nested.as_slice(), [Shape::Picture(_)]))
                    }
                    other => panic!("expected nested group, got {:?}", other),
                }
            }
            other => panic!("expected group, got {:?}", other),
        }
        assert!(matches!(shapes[2], Shape::Other));
        assert!(matches!(shapes[3], Shape::Other));
    }

    #[test]
    fn test_text_whitespace_is_preserved() {
        let xml = slide(r#"<p:sp><p:txBody><a:p><a:r><a:t>  padded  </a:t></a:r></a:p></p:txBody></p:sp>"#);
        let shapes = parse_shape_tree(&xml).unwrap();
        assert_eq!(text_shapes(&shapes), vec![vec!["  padded  ".to_string()]]);
    }

    #[test]
    fn test_missing_shape_tree() {
        let err = parse_shape_tree("<p:sld><p:cSld/></p:sld>").unwrap_err();
        assert!(matches!(err, Error::PptxParseError(_)));
    }

    #[test]
    fn test_malformed_xml() {
        let err = parse_shape_tree(&slide("<p:sp><p:txBody></p:sp>")).unwrap_err();
        assert!(matches!(err, Error::XmlError(_)));
    }
}
