//! Client identity resolution.
//!
//! Derives the key under which a caller's requests are counted:
//! authenticated principal first, then network origin, then a shared
//! `unknown` bucket so unidentified callers are still limited.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::http::request::RequestContext;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Principal id placed in request extensions by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedPrincipal(pub String);

/// Key under which rate-limit counts are aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    Principal(String),
    Address(IpAddr),
    Unknown,
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::Principal(id) => write!(f, "user:{}", id),
            ClientIdentity::Address(ip) => write!(f, "ip:{}", ip),
            ClientIdentity::Unknown => f.write_str("unknown"),
        }
    }
}

/// Pure function of the request; holds only configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver {
    trust_forwarded_for: bool,
}

impl IdentityResolver {
    pub fn new(trust_forwarded_for: bool) -> Self {
        Self { trust_forwarded_for }
    }

    pub fn resolve<B>(&self, request: &Request<B>) -> ClientIdentity {
        if let Some(AuthenticatedPrincipal(id)) = request.extensions().get::<AuthenticatedPrincipal>() {
            if !id.trim().is_empty() {
                return ClientIdentity::Principal(id.clone());
            }
        }

        if self.trust_forwarded_for {
            if let Some(ip) = first_forwarded_hop(request.headers()) {
                return ClientIdentity::Address(ip);
            }
        }

        match request.extensions().get::<ConnectInfo<SocketAddr>>() {
            Some(ConnectInfo(addr)) => ClientIdentity::Address(addr.ip()),
            None => ClientIdentity::Unknown,
        }
    }
}

fn first_forwarded_hop(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Second pipeline stage: resolve the caller, record it on the context and
/// hand it to the limiter as an extension.
pub async fn identify_client_middleware(
    State(resolver): State<IdentityResolver>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let identity = resolver.resolve(&request);
    tracing::debug!(client = %identity, "Client identified");

    if let Some(context) = request.extensions_mut().get_mut::<RequestContext>() {
        context.client_identity = identity.clone();
    }
    request.extensions_mut().insert(identity);

    next.run(request).await
}
