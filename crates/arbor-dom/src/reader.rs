//! Adapter from `quick-xml` pull events to [`DocumentBuilder`] events.
use quick_xml::Reader;
use quick_xml::escape::unescape;
use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use quick_xml::events::{BytesStart, Event};

use crate::builder::DocumentBuilder;
use crate::error::DocumentError;

/// Decodes `bytes` to text. A byte order mark wins over the encoding named
/// in the XML declaration; without either the input must be UTF-8.
pub(crate) fn decode_source(bytes: &[u8]) -> Result<Cow<'_, str>, DocumentError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return transcode(encoding, &bytes[bom_len..]);
    }
    let Some(label) = declared_encoding(bytes) else {
        return Ok(Cow::Borrowed(std::str::from_utf8(bytes)?));
    };
    let encoding = Encoding::for_label(label.as_bytes()).ok_or(DocumentError::UnsupportedEncoding(label))?;
    if encoding == UTF_8 {
        return Ok(Cow::Borrowed(std::str::from_utf8(bytes)?));
    }
    tracing::debug!(encoding = encoding.name(), "transcoding document");
    transcode(encoding, bytes)
}

fn transcode<'a>(encoding: &'static Encoding, bytes: &'a [u8]) -> Result<Cow<'a, str>, DocumentError> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(DocumentError::Encoding(encoding.name()));
    }
    Ok(text)
}

/// `encoding` pseudo-attribute of a leading XML declaration. The
/// declaration itself is ASCII in every encoding we accept here.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(bytes);
    let Ok(Event::Decl(decl)) = reader.read_event() else { return None };
    let label = decl.encoding()?.ok()?;
    Some(String::from_utf8_lossy(&label).into_owned())
}

pub(crate) fn feed(source: &str, builder: &mut DocumentBuilder) -> Result<(), DocumentError> {
    let mut reader = Reader::from_str(source);
    loop {
        match reader.read_event()? {
            Event::Decl(decl) => {
                let version = decl.version().map_err(|e| DocumentError::structure(e.to_string()))?;
                let encoding = decl.encoding().transpose().map_err(|e| DocumentError::structure(e.to_string()))?;
                let standalone = decl.standalone().transpose().map_err(|e| DocumentError::structure(e.to_string()))?;
                builder.xml_declaration(
                    std::str::from_utf8(&version)?,
                    encoding.as_deref().map(std::str::from_utf8).transpose()?,
                    standalone.as_deref().map(|s| s == b"yes"),
                );
            }
            Event::Start(start) => {
                let (name, attributes) = element_parts(&start)?;
                builder.start_element(&name, attributes)?;
            }
            Event::Empty(start) => {
                let (name, attributes) = element_parts(&start)?;
                builder.start_element(&name, attributes)?;
                builder.end_element()?;
            }
            Event::End(_) => builder.end_element()?,
            Event::Text(text) => {
                let raw = std::str::from_utf8(&text)?;
                builder.character_data(&unescape(raw)?);
            }
            Event::GeneralRef(reference) => {
                let name = std::str::from_utf8(&reference)?;
                builder.character_data(&unescape(&format!("&{name};"))?);
            }
            Event::CData(cdata) => builder.cdata(std::str::from_utf8(&cdata)?)?,
            Event::Comment(comment) => builder.comment(std::str::from_utf8(&comment)?)?,
            Event::PI(pi) => {
                let raw = std::str::from_utf8(&pi)?;
                let (target, data) = split_processing_instruction(raw);
                builder.processing_instruction(target, data)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn element_parts(start: &BytesStart<'_>) -> Result<(String, Vec<(String, String)>), DocumentError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes().with_checks(false) {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let raw = std::str::from_utf8(&attr.value)?;
        attributes.push((key, unescape(raw)?.into_owned()));
    }
    Ok((name, attributes))
}

/// `target data` split at the first whitespace run.
fn split_processing_instruction(raw: &str) -> (&str, &str) {
    match raw.find(char::is_whitespace) {
        Some(idx) => (&raw[..idx], raw[idx..].trim_start()),
        None => (raw, ""),
    }
}
