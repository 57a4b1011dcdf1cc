//! Forwarding authorized requests to the upstream service.

use axum::{
    body::Body,
    http::{
        header::{self, HeaderMap, HeaderName, HeaderValue},
        uri::{Authority, PathAndQuery, Scheme},
        Request, Uri, Version,
    },
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::IpAddr;
use std::time::Duration;

use crate::http::envelope::ApiError;
use crate::http::request::RequestIdExt;
use crate::lifecycle::StartupError;

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Headers that only make sense on a single connection.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// A single upstream service reached over plain HTTP.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    base_path: String,
}

impl Upstream {
    /// `url` must be an `http://` URL; its path becomes a prefix of every
    /// forwarded path.
    pub fn new(url: &str, connect_timeout: Duration) -> Result<Self, StartupError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| StartupError::Upstream(format!("{url}: {e}")))?;
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(StartupError::Upstream(format!("{url}: only http:// is supported")));
        }
        let authority = uri
            .authority()
            .cloned()
            .ok_or_else(|| StartupError::Upstream(format!("{url}: missing host")))?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            authority,
            base_path: uri.path().trim_end_matches('/').to_string(),
        })
    }

    /// Send `request` upstream and stream the answer back.
    pub async fn forward(
        &self,
        request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Result<Response, ApiError> {
        let request_id = request.request_id().to_string();
        let (mut parts, body) = request.into_parts();

        parts.uri = self.target_uri(&parts.uri)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, ip);
        }

        tracing::debug!(
            request_id = %request_id,
            uri = %parts.uri,
            method = %parts.method,
            "Forwarding request"
        );

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    upstream = %self.authority,
                    error = %e,
                    "Upstream error"
                );
                Err(ApiError::Upstream)
            }
        }
    }

    fn target_uri(&self, original: &Uri) -> Result<Uri, ApiError> {
        let path = original.path();
        let joined = match original.query() {
            Some(query) => format!("{}{}?{}", self.base_path, path, query),
            None => format!("{}{}", self.base_path, path),
        };
        let path_and_query = PathAndQuery::try_from(joined).map_err(|_| ApiError::Upstream)?;

        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|_| ApiError::Upstream)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named in Connection are hop-by-hop too.
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::try_from(name.trim()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let value = if prior.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), ip)
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
