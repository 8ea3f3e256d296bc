//! `lockinfo` request bodies.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{AppError, AppResult};

const DAV_NAMESPACE: &str = "DAV:";

/// The parts of a `lockinfo` body the engine keeps.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LockInfo {
    /// `owner` content, re-serialized so `DAV:` elements use the `D:` prefix
    /// and other elements declare their own namespace.
    pub owner: Option<String>,
}

/// ## Summary
/// Parses a `LOCK` request body.
///
/// The `owner` content is rebuilt element by element, so it stays well formed
/// when embedded in a response that only binds `D:`.
///
/// ## Errors
/// Returns an error if the body is not well-formed XML or its root element is
/// not `lockinfo`.
#[tracing::instrument(skip(xml), fields(xml_len = xml.len()))]
pub fn parse_lockinfo(xml: &[u8]) -> AppResult<LockInfo> {
    let mut reader = Reader::from_reader(xml);

    let mut buf = Vec::new();
    let mut namespaces: Vec<(String, String)> = Vec::new();
    let mut seen_root = false;
    let mut owner: Option<Writer<Vec<u8>>> = None;
    let mut open: Vec<String> = Vec::new();
    let mut info = LockInfo::default();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                collect_namespaces(&reader, &e, &mut namespaces)?;
                let local = local_name(&reader, &e)?;
                if !seen_root {
                    check_root(&local)?;
                    seen_root = true;
                } else if let Some(writer) = owner.as_mut() {
                    open.push(write_element(&reader, writer, &e, &namespaces, false)?);
                } else if local == "owner" && info.owner.is_none() {
                    owner = Some(Writer::new(Vec::new()));
                }
            }
            Event::Empty(e) => {
                collect_namespaces(&reader, &e, &mut namespaces)?;
                let local = local_name(&reader, &e)?;
                if !seen_root {
                    check_root(&local)?;
                    seen_root = true;
                } else if let Some(writer) = owner.as_mut() {
                    write_element(&reader, writer, &e, &namespaces, true)?;
                }
            }
            Event::End(_) if owner.is_some() => match open.pop() {
                Some(name) => {
                    if let Some(writer) = owner.as_mut() {
                        writer
                            .write_event(Event::End(BytesEnd::new(name)))
                            .map_err(quick_xml::Error::from)?;
                    }
                }
                None => {
                    if let Some(writer) = owner.take() {
                        info.owner = finish_owner(writer)?;
                    }
                }
            },
            Event::Text(e) => {
                if let Some(writer) = owner.as_mut() {
                    let text = reader.decoder().decode(e.as_ref())?;
                    writer
                        .write_event(Event::Text(BytesText::from_escaped(text)))
                        .map_err(quick_xml::Error::from)?;
                }
            }
            Event::GeneralRef(e) => {
                if let Some(writer) = owner.as_mut() {
                    let name = reader.decoder().decode(e.as_ref())?;
                    if is_xml_reference(&name) {
                        writer
                            .write_event(Event::Text(BytesText::from_escaped(format!("&{name};"))))
                            .map_err(quick_xml::Error::from)?;
                    }
                }
            }
            Event::CData(e) => {
                if let Some(writer) = owner.as_mut() {
                    writer
                        .write_event(Event::CData(e))
                        .map_err(quick_xml::Error::from)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(AppError::MalformedBody("missing lockinfo element"));
    }
    Ok(info)
}

fn check_root(local: &str) -> AppResult<()> {
    if local == "lockinfo" {
        Ok(())
    } else {
        Err(AppError::MalformedBody("root element is not lockinfo"))
    }
}

fn local_name(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> AppResult<String> {
    let local = e.local_name();
    Ok(reader.decoder().decode(local.as_ref())?.into_owned())
}

fn collect_namespaces(
    reader: &Reader<&[u8]>,
    e: &BytesStart<'_>,
    namespaces: &mut Vec<(String, String)>,
) -> AppResult<()> {
    let decoder = reader.decoder();
    for attr in e.attributes().flatten() {
        let key = decoder.decode(attr.key.as_ref())?;
        let value = decoder.decode(&attr.value)?;
        if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.push((prefix.to_string(), value.into_owned()));
        } else if key == "xmlns" {
            namespaces.push((String::new(), value.into_owned()));
        } else {
            // Other attributes are not carried over
        }
    }
    Ok(())
}

/// Writes `e` under its new name and returns that name for the matching end tag.
fn write_element(
    reader: &Reader<&[u8]>,
    writer: &mut Writer<Vec<u8>>,
    e: &BytesStart<'_>,
    namespaces: &[(String, String)],
    empty: bool,
) -> AppResult<String> {
    let qname = e.name();
    let qname = reader.decoder().decode(qname.as_ref())?.into_owned();
    let (prefix, local) = qname.split_once(':').unwrap_or(("", qname.as_str()));

    let uri = namespaces
        .iter()
        .rev()
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str());

    let name = if uri == Some(DAV_NAMESPACE) {
        format!("D:{local}")
    } else {
        local.to_string()
    };
    let mut elem = BytesStart::new(name.clone());
    if uri != Some(DAV_NAMESPACE) {
        elem.push_attribute(("xmlns", uri.unwrap_or("")));
    }

    writer
        .write_event(if empty {
            Event::Empty(elem)
        } else {
            Event::Start(elem)
        })
        .map_err(quick_xml::Error::from)?;
    Ok(name)
}

fn finish_owner(writer: Writer<Vec<u8>>) -> AppResult<Option<String>> {
    let fragment = String::from_utf8(writer.into_inner())
        .map_err(|_| AppError::MalformedBody("owner is not UTF-8"))?;
    let fragment = fragment.trim();
    Ok((!fragment.is_empty()).then(|| fragment.to_string()))
}

/// Predefined entities and character references; anything else would need a DTD.
fn is_xml_reference(name: &str) -> bool {
    match name.strip_prefix('#') {
        Some(code) => match code.strip_prefix('x') {
            Some(hex) => !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()),
            None => !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()),
        },
        None => matches!(name, "amp" | "lt" | "gt" | "quot" | "apos"),
    }
}
