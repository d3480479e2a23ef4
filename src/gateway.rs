use async_trait::async_trait;
use hyper::body::Body;
use hyper::client::connect::Connect;
use hyper::client::{Client, HttpConnector};
use hyper::http::uri::{InvalidUri, Uri};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

pub const LOOKUP_FAILED_MESSAGE: &str = "Lookup failed";
pub const UNPARSABLE_ERROR_MESSAGE: &str = "Failed to parse error response";

#[cfg(feature = "tls")]
pub type DefaultConnector = hyper_tls::HttpsConnector<HttpConnector>;
#[cfg(not(feature = "tls"))]
pub type DefaultConnector = HttpConnector;

/// Geolocation of a single IP address as returned by the lookup API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResponse {
    pub ip: String,
    pub country: String,
    pub country_code: String,
    pub timezone: String,
    #[serde(default)]
    pub city: Option<String>,
}

/// Body of a non-success reply
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    #[error(transparent)]
    Http(#[from] hyper::http::Error),
    #[error(r#"API base "{0}" cannot have path segments"#)]
    BaseUrl(Url),
    #[error(transparent)]
    InvalidUri(#[from] InvalidUri),
    #[error("{0}")]
    Rejected(String),
    #[error("Malformed lookup response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("lookup failed without a description")]
    Opaque,
}

impl GatewayError {
    /// Message fit to show next to the row, `None` when the failure carries nothing useful
    pub fn description(&self) -> Option<String> {
        match self {
            Self::Opaque => None,
            Self::Rejected(message) if message.trim().is_empty() => None,
            error => Some(error.to_string()),
        }
    }
}

#[async_trait]
pub trait LookupGateway: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<LookupResponse, GatewayError>;
}

#[async_trait]
impl<G> LookupGateway for Arc<G>
where
    G: LookupGateway + ?Sized,
{
    async fn lookup(&self, ip: &str) -> Result<LookupResponse, GatewayError> {
        (**self).lookup(ip).await
    }
}

/// Performs `GET {api_base}/api/lookup/{ip}` with a single attempt and no timeout
pub struct HttpGateway<C = DefaultConnector> {
    client: Client<C>,
    api_base: Url,
}

impl HttpGateway {
    pub fn new(api_base: Url) -> Self {
        #[cfg(feature = "tls")]
        let connector = hyper_tls::HttpsConnector::new();
        #[cfg(not(feature = "tls"))]
        let connector = HttpConnector::new();
        Self::with_client(Client::builder().build::<_, Body>(connector), api_base)
    }
}

impl<C> HttpGateway<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    pub fn with_client(client: Client<C>, api_base: Url) -> Self {
        Self { client, api_base }
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn lookup_uri(&self, ip: &str) -> Result<Uri, GatewayError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::BaseUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["api", "lookup", ip]);
        Ok(url.as_str().parse()?)
    }
}

fn rejection_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            message: Some(message),
            ..
        }) if !message.is_empty() => message,
        Ok(_) => LOOKUP_FAILED_MESSAGE.to_owned(),
        Err(_) => UNPARSABLE_ERROR_MESSAGE.to_owned(),
    }
}

#[async_trait]
impl<C> LookupGateway for HttpGateway<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    async fn lookup(&self, ip: &str) -> Result<LookupResponse, GatewayError> {
        let uri = self.lookup_uri(ip)?;
        log::debug!(r#"Requesting "{uri}""#);
        let response = self.client.get(uri).await?;
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body()).await?;
        if !status.is_success() {
            let message = rejection_message(&body);
            log::warn!(r#"Lookup of "{ip}" rejected with {status}: {message}"#);
            return Err(GatewayError::Rejected(message));
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(base.parse().unwrap())
    }

    #[test]
    fn lookup_uri_ipv4() {
        let uri = gateway("http://localhost:8080").lookup_uri("8.8.8.8").unwrap();
        assert_eq!(uri.to_string(), "http://localhost:8080/api/lookup/8.8.8.8");
    }

    #[test]
    fn lookup_uri_keeps_base_path() {
        let uri = gateway("https://example.org/geo/")
            .lookup_uri("2001:db8::1")
            .unwrap();
        assert_eq!(uri.path(), "/geo/api/lookup/2001:db8::1");
    }

    #[test]
    fn lookup_uri_encodes_reserved_characters() {
        let uri = gateway("http://localhost:8080")
            .lookup_uri("1.2.3.4/24?x#y")
            .unwrap();
        assert_eq!(uri.path(), "/api/lookup/1.2.3.4%2F24%3Fx%23y");
    }

    #[test]
    fn lookup_uri_rejects_opaque_base() {
        let error = gateway("mailto:nobody@example.org")
            .lookup_uri("8.8.8.8")
            .unwrap_err();
        assert!(matches!(error, GatewayError::BaseUrl(_)));
    }

    #[test]
    fn rejection_message_verbatim() {
        let body = br#"{"error":"bad","code":"INVALID_IP","message":"Invalid IP address format"}"#;
        assert_eq!(rejection_message(body), "Invalid IP address format");
    }

    #[test]
    fn rejection_message_missing() {
        assert_eq!(rejection_message(br#"{"code":"X"}"#), LOOKUP_FAILED_MESSAGE);
        assert_eq!(rejection_message(br#"{"message":""}"#), LOOKUP_FAILED_MESSAGE);
    }

    #[test]
    fn rejection_message_unparsable() {
        assert_eq!(rejection_message(b"<html>502</html>"), UNPARSABLE_ERROR_MESSAGE);
        assert_eq!(rejection_message(b""), UNPARSABLE_ERROR_MESSAGE);
    }

    #[test]
    fn description() {
        assert_eq!(GatewayError::Opaque.description(), None);
        assert_eq!(GatewayError::Rejected("  ".into()).description(), None);
        assert_eq!(
            GatewayError::Rejected("Network error".into()).description(),
            Some("Network error".to_owned())
        );
        let decode = serde_json::from_str::<LookupResponse>("{").unwrap_err();
        assert!(GatewayError::from(decode)
            .description()
            .unwrap()
            .starts_with("Malformed lookup response"));
    }

    #[test]
    fn response_city_is_optional() {
        let with_null: LookupResponse = serde_json::from_str(
            r#"{"ip":"1.1.1.1","country":"Australia","country_code":"AU","timezone":"Australia/Sydney","city":null}"#,
        )
        .unwrap();
        assert_eq!(with_null.city, None);
        let without: LookupResponse = serde_json::from_str(
            r#"{"ip":"1.1.1.1","country":"Australia","country_code":"AU","timezone":"Australia/Sydney"}"#,
        )
        .unwrap();
        assert_eq!(without, with_null);
    }
}
