use crate::dom::{Attr, Dom, Element, NodeId, NodeKind};
use crate::{Error, Result};

pub(crate) fn parse_fragment(markup: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut stack: Vec<NodeId> = vec![dom.root];
    let bytes = markup.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        if starts_with_at(bytes, i, b"<!--") {
            let Some(end) = find_subslice(bytes, i + 4, b"-->") else {
                return Err(Error::HtmlParse("unclosed HTML comment".into()));
            };
            let data = markup.get(i + 4..end).unwrap_or_default().to_string();
            let parent = stack.last().copied().unwrap_or(dom.root);
            dom.create_node(Some(parent), NodeKind::Comment(data));
            i = end + 3;
            continue;
        }

        if starts_with_at(bytes, i, b"<?") {
            let Some(end) = find_subslice(bytes, i + 2, b"?>") else {
                return Err(Error::HtmlParse("unclosed processing instruction".into()));
            };
            let body = markup.get(i + 2..end).unwrap_or_default();
            let (target, data) = split_instruction_body(body)?;
            let parent = stack.last().copied().unwrap_or(dom.root);
            dom.create_node(Some(parent), NodeKind::ProcessingInstruction { target, data });
            i = end + 2;
            continue;
        }

        if bytes[i] == b'<' {
            if starts_with_at(bytes, i, b"</") {
                let (tag, next) = parse_end_tag(markup, i)?;
                i = next;
                // Close up to the matching open element; stray closes never pop the root.
                while stack.len() > 1 {
                    let top = stack.last().copied().unwrap_or(dom.root);
                    let matched = dom.tag_name(top) == Some(tag.as_str());
                    stack.pop();
                    if matched {
                        break;
                    }
                }
                continue;
            }

            if starts_with_at(bytes, i, b"<!") {
                i = parse_declaration_tag(markup, i)?;
                continue;
            }

            let (tag, attrs, self_closing, next) = parse_start_tag(markup, i)?;
            i = next;
            let parent = stack.last().copied().unwrap_or(dom.root);
            let node = dom.create_node(
                Some(parent),
                NodeKind::Element(Element::with_attrs(tag.clone(), attrs)),
            );

            if !self_closing && is_raw_text_tag(&tag) {
                let Some(close) = find_end_tag_ci(bytes, i, tag.as_bytes()) else {
                    return Err(Error::HtmlParse(format!("unclosed <{tag}> tag")));
                };
                let body = markup.get(i..close).unwrap_or_default();
                if !body.is_empty() {
                    dom.create_node(Some(node), NodeKind::Text(body.to_string()));
                }
                let (_, after) = parse_end_tag(markup, close)?;
                i = after;
                continue;
            }

            if !self_closing && !is_void_tag(&tag) {
                stack.push(node);
            }
            continue;
        }

        let text_start = i;
        while i < bytes.len() && bytes[i] != b'<' {
            i += 1;
        }
        let text = markup.get(text_start..i).unwrap_or_default();
        if !text.is_empty() {
            let parent = stack.last().copied().unwrap_or(dom.root);
            dom.create_node(Some(parent), NodeKind::Text(decode_character_references(text)));
        }
    }

    dom.rebuild_id_index();
    Ok(dom)
}

fn parse_start_tag(markup: &str, at: usize) -> Result<(String, Vec<Attr>, bool, usize)> {
    let bytes = markup.as_bytes();
    let mut i = at + 1;
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    if i == tag_start {
        return Err(Error::HtmlParse(format!("invalid tag name at byte {at}")));
    }
    let tag = markup.get(tag_start..i).unwrap_or_default().to_ascii_lowercase();

    let mut attrs: Vec<Attr> = Vec::new();
    loop {
        i = skip_ws(bytes, i);
        if i >= bytes.len() {
            return Err(Error::HtmlParse(format!("unclosed <{tag}> tag")));
        }
        match bytes[i] {
            b'>' => return Ok((tag, attrs, false, i + 1)),
            b'/' => {
                i = skip_ws(bytes, i + 1);
                if i < bytes.len() && bytes[i] == b'>' {
                    return Ok((tag, attrs, true, i + 1));
                }
                return Err(Error::HtmlParse(format!("malformed <{tag}> tag")));
            }
            _ => {
                let name_start = i;
                while i < bytes.len() && is_attr_name_char(bytes[i]) {
                    i += 1;
                }
                if i == name_start {
                    return Err(Error::HtmlParse(format!("unexpected byte in <{tag}> tag")));
                }
                let name = markup.get(name_start..i).unwrap_or_default().to_ascii_lowercase();
                i = skip_ws(bytes, i);
                let value = if i < bytes.len() && bytes[i] == b'=' {
                    i = skip_ws(bytes, i + 1);
                    let (value, next) = parse_attr_value(markup, i)?;
                    i = next;
                    value
                } else {
                    // A bare attribute is present with an empty value.
                    String::new()
                };
                if attrs.iter().all(|attr| attr.name != name) {
                    attrs.push(Attr {
                        name,
                        namespace: None,
                        value,
                    });
                }
            }
        }
    }
}

fn parse_attr_value(markup: &str, at: usize) -> Result<(String, usize)> {
    let bytes = markup.as_bytes();
    if at >= bytes.len() {
        return Err(Error::HtmlParse("missing attribute value".into()));
    }
    match bytes[at] {
        quote @ (b'"' | b'\'') => {
            let start = at + 1;
            let mut i = start;
            while i < bytes.len() && bytes[i] != quote {
                i += 1;
            }
            if i >= bytes.len() {
                return Err(Error::HtmlParse("unclosed attribute value".into()));
            }
            let raw = markup.get(start..i).unwrap_or_default();
            Ok((decode_character_references(raw), i + 1))
        }
        _ => {
            let start = at;
            let mut i = at;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                i += 1;
            }
            let raw = markup.get(start..i).unwrap_or_default();
            Ok((decode_character_references(raw), i))
        }
    }
}

fn parse_end_tag(markup: &str, at: usize) -> Result<(String, usize)> {
    let bytes = markup.as_bytes();
    let mut i = at + 2;
    let tag_start = i;
    while i < bytes.len() && is_tag_char(bytes[i]) {
        i += 1;
    }
    let tag = markup.get(tag_start..i).unwrap_or_default().to_ascii_lowercase();
    i = skip_ws(bytes, i);
    if i >= bytes.len() || bytes[i] != b'>' {
        return Err(Error::HtmlParse(format!("malformed </{tag}> tag")));
    }
    Ok((tag, i + 1))
}

fn parse_declaration_tag(markup: &str, at: usize) -> Result<usize> {
    let bytes = markup.as_bytes();
    let mut i = at + 2;
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    while i < bytes.len() {
        let byte = bytes[i];
        if let Some(open) = quote {
            if byte == open {
                quote = None;
            }
        } else {
            match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => return Ok(i + 1),
                _ => {}
            }
        }
        i += 1;
    }
    Err(Error::HtmlParse("unclosed markup declaration".into()))
}

fn split_instruction_body(body: &str) -> Result<(String, String)> {
    let mut parts = body.splitn(2, |ch: char| ch.is_ascii_whitespace());
    let target = parts.next().unwrap_or_default();
    if target.is_empty() {
        return Err(Error::HtmlParse("missing processing instruction target".into()));
    }
    let data = parts.next().unwrap_or_default().trim_start().to_string();
    Ok((target.to_string(), data))
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn is_tag_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b':'
}

fn is_attr_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':' | b'.')
}

fn starts_with_at(bytes: &[u8], at: usize, needle: &[u8]) -> bool {
    bytes.len() >= at + needle.len() && &bytes[at..at + needle.len()] == needle
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || bytes.len() < needle.len() {
        return None;
    }
    (from..=bytes.len() - needle.len()).find(|&i| &bytes[i..i + needle.len()] == needle)
}

fn find_end_tag_ci(bytes: &[u8], from: usize, tag: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + 2 + tag.len() <= bytes.len() {
        let after = i + 2 + tag.len();
        if bytes[i] == b'<'
            && bytes[i + 1] == b'/'
            && bytes[i + 2..after].eq_ignore_ascii_case(tag)
            && (after >= bytes.len() || bytes[after] == b'>' || bytes[after].is_ascii_whitespace())
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

pub(crate) fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub(crate) fn decode_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail.find(';') {
            Some(semi) if semi > 0 && semi <= 32 && !tail[..semi].contains('&') => {
                match decode_entity(&tail[..semi]) {
                    Some(decoded) => {
                        out.push(decoded);
                        rest = &tail[semi + 1..];
                    }
                    None => {
                        out.push('&');
                        rest = tail;
                    }
                }
            }
            _ => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        let codepoint = if let Some(hex) = numeric.strip_prefix('x').or_else(|| numeric.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            numeric.parse::<u32>().ok()?
        };
        return char::from_u32(codepoint);
    }
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        _ => None,
    }
}

pub(crate) fn serialize_children(dom: &Dom, node_id: NodeId) -> String {
    let mut out = String::new();
    for child in dom.children(node_id) {
        out.push_str(&serialize_node(dom, *child));
    }
    out
}

pub(crate) fn serialize_node(dom: &Dom, node_id: NodeId) -> String {
    match &dom.nodes[node_id.0].kind {
        NodeKind::Document => serialize_children(dom, node_id),
        NodeKind::Text(data) => escape_text(data),
        NodeKind::Comment(data) => format!("<!--{data}-->"),
        NodeKind::ProcessingInstruction { target, data } => {
            if data.is_empty() {
                format!("<?{target}?>")
            } else {
                format!("<?{target} {data}?>")
            }
        }
        NodeKind::Element(element) => {
            let mut out = String::new();
            out.push('<');
            out.push_str(&element.tag_name);
            for attr in &element.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape_attr(&attr.value));
                out.push('"');
            }
            out.push('>');
            if is_void_tag(&element.tag_name) && dom.children(node_id).is_empty() {
                return out;
            }
            out.push_str(&serialize_children(dom, node_id));
            out.push_str("</");
            out.push_str(&element.tag_name);
            out.push('>');
            out
        }
    }
}

fn escape_text(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    for ch in src.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attr(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    for ch in src.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            other => out.push(other),
        }
    }
    out
}
