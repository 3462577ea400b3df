//! `207 Multi-Status` parsing
//!
//! Servers disagree on namespace prefixes (`d:`, `D:`, none), so elements are
//! matched by local name only. Properties reported in a `404` propstat are
//! empty elements and simply leave the field unset.

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{trace, warn};
use url::Url;

use davmirror_core::domain::ContentHash;
use davmirror_core::ports::transport::RemoteEntry;

use crate::WebDavError;

/// Request body for listings
pub const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
    <d:getlastmodified/>
    <oc:checksums/>
  </d:prop>
</d:propfind>"#;

// ============================================================================
// DavResource
// ============================================================================

/// One `<response>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavResource {
    /// Raw, still percent-encoded href
    pub href: String,
    pub is_collection: bool,
    pub content_length: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Raw checksum text, e.g. `SHA1:... MD5:... ADLER32:...`
    pub checksums: Option<String>,
}

impl DavResource {
    /// Decoded path of the href without trailing slash
    pub fn decoded_path(&self) -> Option<String> {
        decoded_href_path(&self.href)
    }

    /// Decoded last path segment
    pub fn name(&self) -> Option<String> {
        let path = self.decoded_path()?;
        let name = path.rsplit('/').next()?;
        (!name.is_empty()).then(|| name.to_string())
    }

    /// MD5 published in the checksum property, lowercased
    pub fn md5(&self) -> Option<ContentHash> {
        self.checksums.as_deref().and_then(md5_from_checksums)
    }

    /// Converts into a port entry; `None` when the href has no usable name
    pub fn into_entry(self) -> Option<RemoteEntry> {
        let Some(name) = self.name() else {
            warn!(href = %self.href, "Skipping response without a usable name");
            return None;
        };

        if self.is_collection {
            return Some(RemoteEntry::directory(name, self.last_modified));
        }

        let hash = self.md5();
        let entry = RemoteEntry::file(name, self.content_length.unwrap_or(0), self.last_modified);
        Some(match hash {
            Some(h) => entry.with_hash(h),
            None => entry,
        })
    }
}

/// Path component of an href (absolute URL or absolute path), decoded and
/// without trailing slash
pub fn decoded_href_path(href: &str) -> Option<String> {
    let raw_path = if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href).ok()?.path().to_string()
    } else {
        href.to_string()
    };
    let decoded = percent_decode_str(&raw_path).decode_utf8().ok()?;
    let trimmed = decoded.trim_end_matches('/');
    Some(if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    })
}

/// Extracts the `MD5:<hex>` token from an ownCloud checksum string
pub fn md5_from_checksums(checksums: &str) -> Option<ContentHash> {
    checksums.split_whitespace().find_map(|token| {
        let (algorithm, value) = token.split_once(':')?;
        if algorithm.eq_ignore_ascii_case("MD5") {
            ContentHash::new(value.to_string()).ok()
        } else {
            None
        }
    })
}

// ============================================================================
// Parser
// ============================================================================

/// Parses a multistatus body into its responses, in document order
///
/// # Errors
/// Returns `WebDavError::InvalidResponse` for malformed XML.
pub fn parse(xml: &str) -> Result<Vec<DavResource>, WebDavError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut resources = Vec::new();
    let mut current: Option<DavResource> = None;
    let mut stack: Vec<Vec<u8>> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            WebDavError::InvalidResponse(format!(
                "malformed multistatus at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"response" {
                    current = Some(DavResource::default());
                }
                mark_collection(&name, &stack, current.as_mut());
                stack.push(name);
            }
            Event::Empty(e) => {
                mark_collection(e.local_name().as_ref(), &stack, current.as_mut());
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"response" {
                    if let Some(resource) = current.take() {
                        trace!(href = %resource.href, "Parsed response");
                        resources.push(resource);
                    }
                }
                stack.pop();
            }
            Event::Text(t) => {
                let Some(resource) = current.as_mut() else {
                    continue;
                };
                let text = t.unescape().map_err(|e| {
                    WebDavError::InvalidResponse(format!("bad text in multistatus: {e}"))
                })?;
                apply_text(resource, &stack, text.trim());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(resources)
}

fn mark_collection(name: &[u8], stack: &[Vec<u8>], current: Option<&mut DavResource>) {
    if name == b"collection" && stack.last().is_some_and(|p| p == b"resourcetype") {
        if let Some(resource) = current {
            resource.is_collection = true;
        }
    }
}

fn apply_text(resource: &mut DavResource, stack: &[Vec<u8>], text: &str) {
    let Some(element) = stack.last() else {
        return;
    };
    let parent = stack.len().checked_sub(2).map(|i| stack[i].as_slice());

    match element.as_slice() {
        b"href" if parent == Some(b"response".as_slice()) => resource.href = text.to_string(),
        b"getcontentlength" => resource.content_length = text.parse().ok(),
        b"getlastmodified" => {
            resource.last_modified = DateTime::parse_from_rfc2822(text)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| warn!(value = text, error = %e, "Unparseable getlastmodified"))
                .ok();
        }
        b"checksum" | b"checksums" => {
            let joined = match resource.checksums.take() {
                Some(existing) => format!("{existing} {text}"),
                None => text.to_string(),
            };
            resource.checksums = Some(joined);
        }
        _ => {}
    }
}
