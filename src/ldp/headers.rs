//! Response decoration and `Link` header parsing.

use super::{HttpRequest, Reply};
use crate::address::ResourceAddress;
use crate::graph::vocab::ldp;
use crate::utils::mime::{self, types};

/// Methods the server implements, for `Allow`.
pub const ALLOWED_METHODS: &str = "OPTIONS, HEAD, GET, PATCH, POST, PUT, MKCOL, DELETE";

const EXPOSED_HEADERS: &str = "User, Location, Link, Vary, Last-Modified, ETag, \
     Accept-Patch, Accept-Post, Allow, Triples, WWW-Authenticate, MS-Author-Via";

const ALLOWED_HEADERS: &str =
    "Accept, Authorization, Content-Type, If-Match, If-None-Match, Link, Origin, Prefer, Slug";

/// Preflight cache lifetime in seconds.
const MAX_AGE: &str = "1728000";

/// Headers sent with every reply.
pub fn decorate(reply: &mut Reply, req: &HttpRequest, identity: &str) {
    reply.push_header("User", identity);
    reply.push_header("Vary", "Origin");
    reply.push_header(
        "Access-Control-Allow-Origin",
        req.header("Origin").unwrap_or("*"),
    );
    reply.push_header("Access-Control-Allow-Credentials", "true");
    reply.push_header("Access-Control-Expose-Headers", EXPOSED_HEADERS);
    reply.push_header("MS-Author-Via", "DAV, SPARQL");
    reply.push_header("Accept-Patch", types::SPARQL_UPDATE);
    reply.push_header("Accept-Post", format!("{}, */*", mime::RDF_SERIALIZERS.join(", ")));
    reply.push_header("Allow", ALLOWED_METHODS);
}

/// `Link` headers advertising a resource's companions and LDP type.
pub fn link_resource(reply: &mut Reply, address: &ResourceAddress) {
    reply.push_header("Link", format!("<{}>; rel=\"acl\"", address.acl_uri));
    reply.push_header("Link", format!("<{}>; rel=\"meta\"", address.meta_uri));
    if address.is_container {
        reply.push_header(
            "Link",
            format!("<{}>; rel=\"type\"", ldp::BASIC_CONTAINER.as_str()),
        );
    }
    reply.push_header("Link", format!("<{}>; rel=\"type\"", ldp::RESOURCE.as_str()));
}

/// Extra headers for an `OPTIONS` preflight.
pub fn preflight(reply: &mut Reply, req: &HttpRequest) {
    reply.push_header("Access-Control-Allow-Methods", ALLOWED_METHODS);
    reply.push_header(
        "Access-Control-Allow-Headers",
        req.header("Access-Control-Request-Headers")
            .unwrap_or(ALLOWED_HEADERS),
    );
    reply.push_header("Access-Control-Max-Age", MAX_AGE);
}

/// Targets of every `Link` entry with the given relation.
///
/// ```text
/// <http://www.w3.org/ns/ldp#BasicContainer>; rel="type", <x.acl>; rel=acl
/// ```
pub fn link_targets(header: &str, rel: &str) -> Vec<String> {
    header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts.next()?.trim();
            let target = target.strip_prefix('<')?.strip_suffix('>')?;
            let has_rel = parts.any(|param| {
                param.split_once('=').is_some_and(|(key, value)| {
                    key.trim().eq_ignore_ascii_case("rel")
                        && value
                            .trim()
                            .trim_matches('"')
                            .split_whitespace()
                            .any(|r| r.eq_ignore_ascii_case(rel))
                })
            });
            has_rel.then(|| target.to_string())
        })
        .collect()
}

/// Does `Prefer` ask to leave `ldp:contains` out of a listing?
pub fn omits_containment(prefer: Option<&str>) -> bool {
    let Some(prefer) = prefer else {
        return false;
    };
    prefer.split(';').any(|param| {
        param.split_once('=').is_some_and(|(key, value)| {
            key.trim().eq_ignore_ascii_case("omit")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|iri| iri == ldp::PREFER_CONTAINMENT)
        })
    })
}
