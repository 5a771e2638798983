//! Conversion between `tiny_http` requests and dispatcher messages.

use crate::config::ServerConfig;
use crate::debug;
use crate::identity::cert;
use crate::ldp::{HttpRequest, LdpError, Reply};
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr};
use tiny_http::{Header, Request, Response};

/// The parts of the config that shape how a raw request is read.
#[derive(Debug, Clone)]
pub struct RequestPolicy {
    scheme: String,
    max_body_bytes: u64,
    trust_proxy: bool,
    client_cert_header: String,
}

impl RequestPolicy {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            scheme: config.serve.scheme.clone(),
            max_body_bytes: config.serve.max_body_bytes,
            trust_proxy: config.auth.trust_proxy,
            client_cert_header: config.auth.client_cert_header.clone(),
        }
    }
}

/// Read method, absolute URI, headers, peer and body of `request`.
pub fn read(request: &mut Request, policy: &RequestPolicy) -> Result<HttpRequest, LdpError> {
    let headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
        .collect();
    let find = |name: &str| {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.trim())
    };

    let host = find("Host")
        .filter(|h| !h.is_empty())
        .ok_or_else(|| LdpError::BadRequest("missing Host header".to_string()))?;
    let scheme = policy
        .trust_proxy
        .then(|| find("X-Forwarded-Proto"))
        .flatten()
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| matches!(*v, "http" | "https"))
        .unwrap_or(policy.scheme.as_str());
    let url = format!("{scheme}://{host}{}", request.url());

    let forwarded = policy
        .trust_proxy
        .then(|| find("X-Forwarded-For"))
        .flatten()
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());
    let remote_addr = forwarded
        .or_else(|| request.remote_addr().map(|a| a.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let peer_cert = if policy.trust_proxy {
        find(policy.client_cert_header.as_str())
            .filter(|v| !v.is_empty())
            .and_then(|pem| match cert::pem_to_der(pem) {
                Ok(der) => Some(der),
                Err(e) => {
                    debug!("serve"; "ignoring forwarded certificate: {}", e);
                    None
                }
            })
    } else {
        None
    };

    let body = read_body(request, policy.max_body_bytes)?;
    let mut req = HttpRequest::new(request.method().as_str(), &url, remote_addr).with_body(body);
    req.headers = headers;
    req.peer_cert = peer_cert;
    Ok(req)
}

/// Read at most `limit` bytes; anything longer is 413.
fn read_body(request: &mut Request, limit: u64) -> Result<Vec<u8>, LdpError> {
    if request.body_length().is_some_and(|len| len as u64 > limit) {
        return Err(LdpError::PayloadTooLarge);
    }
    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit + 1)
        .read_to_end(&mut body)
        .map_err(LdpError::internal)?;
    if body.len() as u64 > limit {
        return Err(LdpError::PayloadTooLarge);
    }
    Ok(body)
}

/// Send `reply`, dropping headers `tiny_http` refuses.
pub fn respond(request: Request, reply: Reply) -> io::Result<()> {
    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    for (name, value) in &reply.headers {
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => response.add_header(header),
            Err(()) => debug!("serve"; "dropping invalid header `{}`", name),
        }
    }
    request.respond(response)
}
