use anyhow::{Result, bail};
use quick_xml::{Reader, escape::unescape, events::Event};
use std::ops::Range;

/// One element found in a part: where its tag sits and its attributes
/// (keyed by local name, values unescaped).
pub(crate) struct Element {
    pub span: Range<usize>,
    pub empty: bool,
    qname: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    /// Namespace prefix of the tag including the colon, `""` if unprefixed.
    pub fn prefix(&self) -> &str {
        self.qname
            .find(':')
            .map_or("", |colon| &self.qname[..=colon])
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }
}

/// Collects every `<local .../>` or `<local ...>` tag in document order.
pub(crate) fn find_elements(xml: &[u8], local: &[u8]) -> Result<Vec<Element>> {
    let mut reader = Reader::from_reader(xml);
    let mut found = Vec::new();

    loop {
        let start = reader.buffer_position() as usize;
        let (e, empty) = match reader.read_event()? {
            Event::Empty(e) => (e, true),
            Event::Start(e) => (e, false),
            Event::Eof => break,
            _ => continue,
        };
        if e.local_name().as_ref() != local {
            continue;
        }
        let attrs = e
            .attributes()
            .with_checks(false)
            .flatten()
            .map(|a| {
                let key = String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned();
                let raw = String::from_utf8_lossy(&a.value).into_owned();
                let value = match unescape(&raw) {
                    Ok(v) => v.into_owned(),
                    Err(_) => raw,
                };
                (key, value)
            })
            .collect();
        found.push(Element {
            span: start..reader.buffer_position() as usize,
            empty,
            qname: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attrs,
        });
    }
    Ok(found)
}

/// Splices `content` right before the last `close` tag.
pub(crate) fn insert_before(xml: &mut Vec<u8>, close: &[u8], content: &[u8]) -> Result<()> {
    match memchr::memmem::rfind(xml, close) {
        Some(pos) => {
            xml.splice(pos..pos, content.iter().copied());
            Ok(())
        }
        None => bail!("{} not found", String::from_utf8_lossy(close)),
    }
}

/// Prefix (`"x:"` or `""`) of the first element named `local`.
pub(crate) fn prefix_of(xml: &[u8], local: &[u8]) -> Result<String> {
    Ok(find_elements(xml, local)?
        .first()
        .map(|e| e.prefix().to_owned())
        .unwrap_or_default())
}

/// Appends `content` as the last children of the last element named `local`,
/// whatever its prefix. A self-closing `<local/>` is opened up first.
pub(crate) fn append_child(xml: &mut Vec<u8>, local: &[u8], content: &[u8]) -> Result<()> {
    if let Some(pos) = last_end_tag(xml, local)? {
        xml.splice(pos..pos, content.iter().copied());
        return Ok(());
    }

    let Some(el) = find_elements(xml, local)?.into_iter().rfind(|e| e.empty) else {
        bail!("<{}> not found", String::from_utf8_lossy(local));
    };
    // `<x:tag .../>` -> `<x:tag ...>content</x:tag>`
    let Some(slash) = xml[el.span.clone()].iter().rposition(|&b| b == b'/') else {
        bail!("malformed <{}/>", el.qname);
    };
    let mut opened = b">".to_vec();
    opened.extend_from_slice(content);
    opened.extend_from_slice(format!("</{}>", el.qname).as_bytes());
    xml.splice(el.span.start + slash..el.span.end, opened);
    Ok(())
}

/// Offset of the last closing tag with local name `local`.
fn last_end_tag(xml: &[u8], local: &[u8]) -> Result<Option<usize>> {
    let mut reader = Reader::from_reader(xml);
    let mut found = None;
    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::End(e) if e.local_name().as_ref() == local => found = Some(start),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(found)
}

// Простейший экранировщик для XML-атрибутов.
pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// XML 1.0 forbids most C0 control characters, even escaped.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && c != '\u{FFFE}' && c != '\u{FFFF}')
}

/// 0-based column index to letters: 0 -> "A", 26 -> "AA".
pub(crate) fn col_idx_to_letters(mut idx: usize) -> String {
    let mut s = String::new();
    loop {
        let rem = idx % 26;
        s.insert(0, (b'A' + rem as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    s
}

/// Letters of a cell reference ("BC12") to a 0-based column index.
pub(crate) fn col_of_ref(coord: &str) -> Option<usize> {
    let letters: Vec<u8> = coord
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    Some(
        letters
            .iter()
            .fold(0usize, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as usize)
            - 1,
    )
}
