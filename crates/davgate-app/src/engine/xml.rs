//! `DAV:` response bodies.

use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use davgate_service::engine::{ActiveLock, LockDepth};

const HREF_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encoded href for a decoded path; collections end with `/`.
#[must_use]
pub fn href(path: &str, collection: bool) -> String {
    let mut href = utf8_percent_encode(path, HREF_ESCAPE).to_string();
    if !href.starts_with('/') {
        href.insert(0, '/');
    }
    if collection && !href.ends_with('/') {
        href.push('/');
    }
    href
}

/// RFC 1123 date as used by `getlastmodified`.
#[must_use]
pub fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt" | "md") => "text/plain",
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ics") => "text/calendar",
        Some("vcf") => "text/vcard",
        _ => "application/octet-stream",
    }
}

/// Live properties of one resource.
#[derive(Debug, Clone)]
pub struct PropEntry {
    pub href: String,
    pub display_name: String,
    pub collection: bool,
    pub content_length: Option<u64>,
    pub content_type: Option<&'static str>,
    pub modified: Option<SystemTime>,
    pub locks: Vec<ActiveLock>,
}

/// ## Summary
/// Serializes a `207 Multi-Status` body with one response per entry.
///
/// ## Errors
/// Returns an error if the XML writer fails.
pub fn multistatus(entries: &[PropEntry]) -> Result<String, quick_xml::Error> {
    let mut writer = document()?;
    writer.write_event(Event::Start(dav_root("D:multistatus")))?;

    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("D:response")))?;
        write_text_element(&mut writer, "D:href", &entry.href)?;
        writer.write_event(Event::Start(BytesStart::new("D:propstat")))?;
        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;

        write_text_element(&mut writer, "D:displayname", &entry.display_name)?;
        if entry.collection {
            writer.write_event(Event::Start(BytesStart::new("D:resourcetype")))?;
            writer.write_event(Event::Empty(BytesStart::new("D:collection")))?;
            writer.write_event(Event::End(BytesEnd::new("D:resourcetype")))?;
        } else {
            writer.write_event(Event::Empty(BytesStart::new("D:resourcetype")))?;
        }
        if let Some(length) = entry.content_length {
            write_text_element(&mut writer, "D:getcontentlength", &length.to_string())?;
        }
        if let Some(content_type) = entry.content_type {
            write_text_element(&mut writer, "D:getcontenttype", content_type)?;
        }
        if let Some(modified) = entry.modified {
            write_text_element(&mut writer, "D:getlastmodified", &http_date(modified))?;
        }
        write_supported_lock(&mut writer)?;
        write_lock_discovery(&mut writer, &entry.locks)?;

        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
        write_text_element(&mut writer, "D:status", "HTTP/1.1 200 OK")?;
        writer.write_event(Event::End(BytesEnd::new("D:propstat")))?;
        writer.write_event(Event::End(BytesEnd::new("D:response")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("D:multistatus")))?;
    finish(writer)
}

/// ## Summary
/// Serializes the `LOCK` response body: a `prop` holding the new lock's
/// `lockdiscovery`.
///
/// ## Errors
/// Returns an error if the XML writer fails.
pub fn lock_response(lock: &ActiveLock) -> Result<String, quick_xml::Error> {
    let mut writer = document()?;
    writer.write_event(Event::Start(dav_root("D:prop")))?;
    write_lock_discovery(&mut writer, std::slice::from_ref(lock))?;
    writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
    finish(writer)
}

/// ## Summary
/// Error body naming a single precondition, e.g. `propfind-finite-depth`.
///
/// ## Errors
/// Returns an error if the XML writer fails.
pub fn error_body(condition: &str) -> Result<String, quick_xml::Error> {
    let mut writer = document()?;
    writer.write_event(Event::Start(dav_root("D:error")))?;
    writer.write_event(Event::Empty(BytesStart::new(format!("D:{condition}"))))?;
    writer.write_event(Event::End(BytesEnd::new("D:error")))?;
    finish(writer)
}

/// `Timeout` value; `None` is infinite.
#[must_use]
pub fn timeout_header(timeout: Option<Duration>) -> String {
    timeout.map_or_else(
        || "Infinite".to_string(),
        |t| format!("Second-{}", t.as_secs()),
    )
}

fn document() -> Result<Writer<Vec<u8>>, quick_xml::Error> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    Ok(writer)
}

fn dav_root(name: &str) -> BytesStart<'_> {
    let mut elem = BytesStart::new(name);
    elem.push_attribute(("xmlns:D", "DAV:"));
    elem
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String, quick_xml::Error> {
    String::from_utf8(writer.into_inner()).map_err(|e| {
        tracing::error!(error = %e, "Generated invalid UTF-8 in XML body");
        quick_xml::Error::Io(std::sync::Arc::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Invalid UTF-8 in XML output",
        )))
    })
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_supported_lock(writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("D:supportedlock")))?;
    writer.write_event(Event::Start(BytesStart::new("D:lockentry")))?;
    write_exclusive_write(writer)?;
    writer.write_event(Event::End(BytesEnd::new("D:lockentry")))?;
    writer.write_event(Event::End(BytesEnd::new("D:supportedlock")))?;
    Ok(())
}

fn write_exclusive_write(writer: &mut Writer<Vec<u8>>) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("D:lockscope")))?;
    writer.write_event(Event::Empty(BytesStart::new("D:exclusive")))?;
    writer.write_event(Event::End(BytesEnd::new("D:lockscope")))?;
    writer.write_event(Event::Start(BytesStart::new("D:locktype")))?;
    writer.write_event(Event::Empty(BytesStart::new("D:write")))?;
    writer.write_event(Event::End(BytesEnd::new("D:locktype")))?;
    Ok(())
}

fn write_lock_discovery(
    writer: &mut Writer<Vec<u8>>,
    locks: &[ActiveLock],
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new("D:lockdiscovery")))?;
    for lock in locks {
        write_active_lock(writer, lock)?;
    }
    writer.write_event(Event::End(BytesEnd::new("D:lockdiscovery")))?;
    Ok(())
}

fn write_active_lock(
    writer: &mut Writer<Vec<u8>>,
    lock: &ActiveLock,
) -> Result<(), quick_xml::Error> {
    let depth = match lock.depth {
        LockDepth::Zero => "0",
        LockDepth::Infinity => "infinity",
    };

    writer.write_event(Event::Start(BytesStart::new("D:activelock")))?;
    write_exclusive_write(writer)?;
    write_text_element(writer, "D:depth", depth)?;
    if let Some(owner) = &lock.owner {
        // owner is a fragment re-serialized from the request's lockinfo
        writer.write_event(Event::Start(BytesStart::new("D:owner")))?;
        writer.get_mut().extend_from_slice(owner.as_bytes());
        writer.write_event(Event::End(BytesEnd::new("D:owner")))?;
    }
    write_text_element(writer, "D:timeout", &timeout_header(lock.remaining()))?;

    writer.write_event(Event::Start(BytesStart::new("D:locktoken")))?;
    write_text_element(writer, "D:href", &lock.token)?;
    writer.write_event(Event::End(BytesEnd::new("D:locktoken")))?;

    writer.write_event(Event::Start(BytesStart::new("D:lockroot")))?;
    write_text_element(writer, "D:href", &href(&lock.path, false))?;
    writer.write_event(Event::End(BytesEnd::new("D:lockroot")))?;

    writer.write_event(Event::End(BytesEnd::new("D:activelock")))?;
    Ok(())
}
