//! MIME type registry.
//!
//! Maps file extensions to content types and back, and knows which content
//! types are RDF syntaxes the graph codec can read and write.

use oxrdfio::RdfFormat;
use std::path::Path;

/// Common MIME type constants.
pub mod types {
    // RDF syntaxes
    pub const TURTLE: &str = "text/turtle";
    pub const N3: &str = "text/n3";
    pub const NTRIPLES: &str = "application/n-triples";
    pub const NQUADS: &str = "application/n-quads";
    pub const TRIG: &str = "application/trig";
    pub const RDF_XML: &str = "application/rdf+xml";

    // Update language
    pub const SPARQL_UPDATE: &str = "application/sparql-update";

    // Text
    pub const HTML: &str = "text/html";
    pub const PLAIN: &str = "text/plain";
    pub const CSS: &str = "text/css";
    pub const JAVASCRIPT: &str = "text/javascript";
    pub const JSON: &str = "application/json";
    pub const XML: &str = "application/xml";
    pub const MARKDOWN: &str = "text/markdown";
    pub const CSV: &str = "text/csv";

    // Documents / binary
    pub const PDF: &str = "application/pdf";
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const ZIP: &str = "application/zip";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const GIF: &str = "image/gif";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";
    pub const ICO: &str = "image/x-icon";

    // Audio / video
    pub const MP3: &str = "audio/mpeg";
    pub const OGG_AUDIO: &str = "audio/ogg";
    pub const MP4: &str = "video/mp4";
    pub const WEBM: &str = "video/webm";
}

/// RDF content types the server can produce, in preference order.
pub const RDF_SERIALIZERS: &[&str] = &[
    types::TURTLE,
    types::N3,
    types::NTRIPLES,
    types::RDF_XML,
    types::NQUADS,
    types::TRIG,
];

/// Extension table shared by both lookup directions.
const EXTENSIONS: &[(&str, &str)] = &[
    ("ttl", types::TURTLE),
    ("n3", types::N3),
    ("nt", types::NTRIPLES),
    ("nq", types::NQUADS),
    ("trig", types::TRIG),
    ("rdf", types::RDF_XML),
    ("owl", types::RDF_XML),
    ("html", types::HTML),
    ("htm", types::HTML),
    ("txt", types::PLAIN),
    ("css", types::CSS),
    ("js", types::JAVASCRIPT),
    ("json", types::JSON),
    ("xml", types::XML),
    ("md", types::MARKDOWN),
    ("csv", types::CSV),
    ("pdf", types::PDF),
    ("zip", types::ZIP),
    ("png", types::PNG),
    ("jpg", types::JPEG),
    ("jpeg", types::JPEG),
    ("gif", types::GIF),
    ("webp", types::WEBP),
    ("svg", types::SVG),
    ("ico", types::ICO),
    ("mp3", types::MP3),
    ("ogg", types::OGG_AUDIO),
    ("mp4", types::MP4),
    ("webm", types::WEBM),
    ("bin", types::OCTET_STREAM),
];

/// Guess MIME type from a path's extension, falling back to `default`.
///
/// Resources without an extension are RDF documents in the configured
/// default syntax.
pub fn from_path<'a>(path: &Path, default: &'a str) -> &'a str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => from_extension(ext).unwrap_or(default),
        None => default,
    }
}

/// Look up the content type for an extension (case-insensitive).
pub fn from_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Preferred file extension for a content type.
pub fn extension_for(mime: &str) -> Option<&'static str> {
    let mime = essence(mime);
    EXTENSIONS
        .iter()
        .find(|(_, m)| m.eq_ignore_ascii_case(mime))
        .map(|(ext, _)| *ext)
}

/// Strip parameters from a Content-Type value: `text/turtle; charset=utf-8` -> `text/turtle`.
pub fn essence(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

/// Map an RDF content type to the codec's syntax.
///
/// `text/n3` is read with the N3 parser; everything else follows the
/// codec's own media type table.
pub fn rdf_format(mime: &str) -> Option<RdfFormat> {
    let mime = essence(mime);
    if mime.eq_ignore_ascii_case(types::N3) {
        return Some(RdfFormat::N3);
    }
    RdfFormat::from_media_type(mime)
}

/// Check if the MIME type is an RDF syntax.
pub fn is_rdf(mime: &str) -> bool {
    rdf_format(mime).is_some()
}

/// Check if the MIME type represents text content.
pub fn is_text(mime: &str) -> bool {
    let mime = essence(mime);
    mime.starts_with("text/") || mime == types::JSON || mime == types::XML
}
