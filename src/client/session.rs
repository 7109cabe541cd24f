use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::types::{
    CheckInReceipt, CheckInResponse, ProbeResponse, ProfileEnvelope, SessionStatus, SignMessageResponse,
    VerifySignatureRequest, VerifySignatureResponse,
};
use super::{CheckinApi, ProxyHandle};
use crate::config::NetworkConfig;
use crate::error::ApiError;

const MAX_BODY_IN_ERROR: usize = 512;

/// reqwest-backed client for the x.ink API.
///
/// One `reqwest::Client` is kept per proxy so connection pools are never
/// shared across egress addresses.
pub struct HttpCheckinApi {
    settings: NetworkConfig,
    clients: Mutex<HashMap<Option<ProxyHandle>, Client>>,
}

impl HttpCheckinApi {
    pub fn new(settings: NetworkConfig) -> Self {
        Self {
            settings,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_base_url.trim_end_matches('/'), path)
    }

    fn client_for(&self, proxy: Option<&ProxyHandle>) -> Result<Client, ApiError> {
        let key = proxy.cloned();
        {
            let clients = match self.clients.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(client) = clients.get(&key) {
                return Ok(client.clone());
            }
        }

        let client = self.build_client(proxy)?;
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        clients.insert(key, client.clone());
        Ok(client)
    }

    fn build_client(&self, proxy: Option<&ProxyHandle>) -> Result<Client, ApiError> {
        let header = |value: &str| {
            HeaderValue::from_str(value).map_err(|e| ApiError::new(format!("Invalid header value {:?}: {}", value, e)))
        };

        let origin = self.settings.site_origin.trim_end_matches('/');
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ORIGIN, header(origin)?);
        headers.insert(REFERER, header(&format!("{}/", origin))?);

        let mut builder = Client::builder()
            .default_headers(headers)
            .user_agent(self.settings.user_agent.clone())
            .timeout(Duration::from_secs(self.settings.request_timeout_secs));

        // Direct mode ignores HTTP_PROXY and friends
        match proxy {
            None => builder = builder.no_proxy(),
            Some(proxy) => {
                let transport = reqwest::Proxy::all(proxy.as_url()).map_err(|e| {
                    ApiError::new(format!("Invalid proxy: {}", e)).with_proxy(Some(proxy.masked()))
                })?;
                builder = builder.proxy(transport);
            }
        }

        builder
            .build()
            .map_err(|e| ApiError::new(format!("Failed to create HTTP client: {}", e)).with_proxy(proxy.map(|p| p.masked())))
    }

    /// Send, check the status, decode the wire type, then normalize it.
    /// Every failure carries status, body and proxy when they are known.
    async fn execute<W, T>(
        &self,
        request: RequestBuilder,
        proxy: Option<&ProxyHandle>,
        normalize: impl FnOnce(W) -> Result<T, ApiError>,
    ) -> Result<T, ApiError>
    where
        W: DeserializeOwned,
    {
        let proxy_label = proxy.map(|p| p.masked());

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("Request timed out: {}", e)
            } else {
                format!("Request failed: {}", e)
            };
            ApiError::new(message).with_proxy(proxy_label.clone())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ApiError::new(format!("Failed to read response: {}", e))
                .with_status(status.as_u16())
                .with_proxy(proxy_label.clone())
        })?;
        debug!("HTTP {} ({} bytes)", status.as_u16(), body.len());

        let annotate = |err: ApiError| {
            err.with_status(status.as_u16())
                .with_body(truncate(&body))
                .with_proxy(proxy_label.clone())
        };

        if !status.is_success() {
            return Err(annotate(ApiError::new(format!(
                "Request failed with status code {}",
                status.as_u16()
            ))));
        }

        let wire: W = serde_json::from_str(&body)
            .map_err(|e| annotate(ApiError::new(format!("Malformed response: {}", e))))?;
        normalize(wire).map_err(annotate)
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_IN_ERROR {
        body.to_string()
    } else {
        let mut cut: String = body.chars().take(MAX_BODY_IN_ERROR).collect();
        cut.push('…');
        cut
    }
}

#[async_trait]
impl CheckinApi for HttpCheckinApi {
    async fn verify_proxy(&self, proxy: &ProxyHandle) -> Result<String, ApiError> {
        let client = self.client_for(Some(proxy))?;
        let request = client
            .get(&self.settings.probe_url)
            .timeout(Duration::from_secs(self.settings.probe_timeout_secs));
        self.execute(request, Some(proxy), ProbeResponse::into_ip).await
    }

    async fn request_challenge(&self, address: &str, proxy: Option<&ProxyHandle>) -> Result<String, ApiError> {
        let client = self.client_for(proxy)?;
        let request = client
            .get(self.endpoint("/v1/get-sign-message2"))
            .query(&[("walletAddress", address)]);
        self.execute(request, proxy, SignMessageResponse::into_message).await
    }

    async fn submit_proof(
        &self,
        address: &str,
        message: &str,
        signature: &str,
        proxy: Option<&ProxyHandle>,
    ) -> Result<String, ApiError> {
        let client = self.client_for(proxy)?;
        let payload = VerifySignatureRequest {
            wallet_address: address,
            sign_message: message,
            signature,
            referrer: &self.settings.referral_code,
        };
        let request = client.post(self.endpoint("/v1/verify-signature2")).json(&payload);
        self.execute(request, proxy, VerifySignatureResponse::into_token).await
    }

    async fn fetch_status(&self, token: &str, proxy: Option<&ProxyHandle>) -> Result<SessionStatus, ApiError> {
        let client = self.client_for(proxy)?;
        let request = client.get(self.endpoint("/v1/me")).bearer_auth(token);
        self.execute(request, proxy, ProfileEnvelope::into_status).await
    }

    async fn submit_check_in(&self, token: &str, proxy: Option<&ProxyHandle>) -> Result<CheckInReceipt, ApiError> {
        let client = self.client_for(proxy)?;
        let request = client
            .post(self.endpoint("/v1/check-in"))
            .bearer_auth(token)
            .json(&serde_json::json!({}));
        self.execute(request, proxy, CheckInResponse::into_receipt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type Seen = Arc<Mutex<Vec<String>>>;

    /// Minimal HTTP/1.1 responder: first route whose needle appears in the
    /// request line wins. Records every raw request.
    async fn spawn_server(routes: Vec<(&'static str, u16, &'static str)>) -> (String, Seen) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let recorded = seen.clone();
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                let routes = routes.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    let head_end = loop {
                        let n = sock.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                            break pos + 4;
                        }
                    };
                    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
                    let content_length = head
                        .lines()
                        .filter_map(|l| l.split_once(':'))
                        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    while buf.len() < head_end + content_length {
                        let n = sock.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                    }
                    let body = String::from_utf8_lossy(&buf[head_end..]).to_string();
                    recorded.lock().unwrap().push(format!("{}{}", head, body));

                    let request_line = head.lines().next().unwrap_or("");
                    let (status, payload) = routes
                        .iter()
                        .find(|(needle, _, _)| request_line.contains(needle))
                        .map(|(_, s, p)| (*s, *p))
                        .unwrap_or((404, "{}"));
                    let response = format!(
                        "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        payload.len(),
                        payload
                    );
                    let _ = sock.write_all(response.as_bytes()).await;
                    let _ = sock.shutdown().await;
                });
            }
        });

        (format!("http://{}", addr), seen)
    }

    fn api_for(base: &str) -> HttpCheckinApi {
        HttpCheckinApi::new(NetworkConfig {
            api_base_url: base.to_string(),
            request_timeout_secs: 5,
            probe_timeout_secs: 5,
            ..NetworkConfig::default()
        })
    }

    #[tokio::test]
    async fn test_handshake_and_check_in() {
        let (base, seen) = spawn_server(vec![
            ("/v1/get-sign-message2", 200, r#"{"message":"Sign in to X Ink: 123"}"#),
            ("/v1/verify-signature2", 200, r#"{"success":true,"token":"jwt-abc"}"#),
            ("/v1/me", 200, r#"{"data":{"inviteCount":1,"check_in_count":2,"points":30,"lastCheckIn":null}}"#),
            ("/v1/check-in", 200, r#"{"success":true,"pointsEarned":10,"check_in_count":3}"#),
        ])
        .await;
        let api = api_for(&base);

        let message = api.request_challenge("0xAbC", None).await.unwrap();
        assert_eq!(message, "Sign in to X Ink: 123");
        let token = api.submit_proof("0xAbC", &message, "0xsig", None).await.unwrap();
        assert_eq!(token, "jwt-abc");
        let status = api.fetch_status(&token, None).await.unwrap();
        assert_eq!(status.check_in_count, 2);
        assert!(status.last_check_in.is_none());
        let receipt = api.submit_check_in(&token, None).await.unwrap();
        assert_eq!(receipt.check_in_count, 3);

        let requests: Vec<String> = seen.lock().unwrap().iter().map(|r| r.to_lowercase()).collect();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].contains("walletaddress=0xabc"));
        assert!(requests[1].contains(r#""referrer":"tjw3lr""#));
        assert!(requests[2].contains("authorization: bearer jwt-abc"));
        assert!(requests[3].contains("authorization: bearer jwt-abc"));
        for request in &requests {
            assert!(request.contains("origin: https://x.ink"));
            assert!(request.contains("referer: https://x.ink/"));
            assert!(request.contains("user-agent: mozilla/5.0"));
        }
    }

    #[tokio::test]
    async fn test_rejected_token_carries_status_and_body() {
        let (base, _seen) = spawn_server(vec![("/v1/me", 401, r#"{"success":false,"message":"Invalid token"}"#)]).await;
        let api = api_for(&base);

        let err = api.fetch_status("stale", None).await.unwrap_err();
        assert_eq!(err.status, Some(401));
        assert!(err.body.unwrap().contains("Invalid token"));
        assert_eq!(err.proxy, None);
    }

    #[tokio::test]
    async fn test_unsuccessful_verification_is_error() {
        let (base, _seen) =
            spawn_server(vec![("/v1/verify-signature2", 200, r#"{"success":false,"message":"bad sig"}"#)]).await;
        let err = api_for(&base).submit_proof("0xabc", "m", "0xsig", None).await.unwrap_err();
        assert!(err.message.contains("bad sig"));
        assert_eq!(err.status, Some(200));
    }

    #[tokio::test]
    async fn test_probe_goes_through_proxy() {
        // The local server plays the forward proxy; plain-http targets arrive in absolute form
        let (proxy_url, seen) = spawn_server(vec![("ipify.test", 200, r#"{"ip":"203.0.113.7"}"#)]).await;
        let api = HttpCheckinApi::new(NetworkConfig {
            probe_url: "http://ipify.test/?format=json".to_string(),
            probe_timeout_secs: 5,
            ..NetworkConfig::default()
        });

        let proxy = ProxyHandle::parse(&proxy_url);
        assert_eq!(api.verify_proxy(&proxy).await.unwrap(), "203.0.113.7");
        assert!(seen.lock().unwrap()[0].starts_with("GET http://ipify.test/"));
    }

    #[tokio::test]
    async fn test_unreachable_proxy_fails_probe() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dead = format!("http://user:pw@{}", listener.local_addr().unwrap());
        drop(listener);

        let api = HttpCheckinApi::new(NetworkConfig {
            probe_url: "http://ipify.test/?format=json".to_string(),
            probe_timeout_secs: 2,
            ..NetworkConfig::default()
        });
        let err = api.verify_proxy(&ProxyHandle::parse(&dead)).await.unwrap_err();
        assert!(err.proxy.unwrap().contains("user:***@"));
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(2000);
        assert_eq!(truncate(&long).chars().count(), MAX_BODY_IN_ERROR + 1);
        assert_eq!(truncate("short"), "short");
    }
}
