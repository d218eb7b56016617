//! Shared GET primitive: one retry-on-timeout loop, one status policy.

use std::time::Duration;

use reqwest::{
    Client, Request, Response, StatusCode,
    header::{AUTHORIZATION, HeaderValue, WWW_AUTHENTICATE},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{api::digest, prelude::*};

/// Per-attempt timeout. The retry loop itself has no overall budget.
pub const TIMEOUT: Duration = Duration::from_secs(20);

/// For endpoints that take all their parameters in the path.
pub const NO_QUERY: &[(&str, &str)] = &[];

/// Build a default client.
pub fn try_new() -> Result<Client> {
    Ok(Client::builder().user_agent("magpie").timeout(TIMEOUT).build()?)
}

#[derive(Debug)]
pub enum Auth {
    /// Pre-encoded `Basic` token. The base64 transform stays with the caller
    /// rather than being delegated to the transport.
    Basic(String),

    /// Digest credentials, answered on the server's 401 challenge.
    Digest { username: String, password: String },
}

/// Issue an authenticated GET and deserialize the JSON body.
///
/// A transport timeout retries the identical request indefinitely. Any final
/// status other than 200 is an error carrying the status and body; there is
/// no client/server/malformed distinction.
#[instrument(skip_all, level = Level::DEBUG, fields(url = url))]
pub async fn get_json<Q: Serialize + ?Sized, R: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &Q,
    auth: Option<&Auth>,
) -> Result<R> {
    let mut request = client
        .get(url)
        .query(query)
        .build()
        .with_context(|| format!("failed to build the `{url}` request"))?;
    if let Some(Auth::Basic(token)) = auth {
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_str(&format!("Basic {token}"))?);
    }
    let url = request.url().clone();

    let mut response = send_with_retry(client, &request).await?;
    if response.status() == StatusCode::UNAUTHORIZED
        && let Some(Auth::Digest { username, password }) = auth
    {
        let challenge = response
            .headers()
            .get(WWW_AUTHENTICATE)
            .context("the 401 response is missing `WWW-Authenticate`")?
            .to_str()
            .context("the challenge is not valid text")?;
        let authorization = digest::Challenge::parse(challenge)?.authorization(
            username,
            password,
            "GET",
            &path_and_query(&url),
            &digest::cnonce(),
        );
        request.headers_mut().insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);
        response = send_with_retry(client, &request).await?;
    }

    let status = response.status();
    let body = response.text().await.context("failed to read the response body")?;
    if status != StatusCode::OK {
        error!(%status, body = body.as_str(), "the request failed");
        bail!("`{url}` failed with {status}: {body}");
    }
    debug!(%status, n_bytes = body.len(), "response ok");
    serde_json::from_str(&body)
        .with_context(|| format!("failed to deserialize the `{url}` response"))
}

async fn send_with_retry(client: &Client, request: &Request) -> Result<Response> {
    loop {
        let attempt = request.try_clone().context("the request is not cloneable")?;
        debug!(url = %request.url(), "sending…");
        match client.execute(attempt).await {
            Ok(response) => return Ok(response),
            Err(error) if error.is_timeout() => {
                warn!(url = %request.url(), "timed out, retrying…");
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to call `{}`", request.url()));
            }
        }
    }
}

fn path_and_query(url: &reqwest::Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
    };

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        value: i64,
    }

    /// Serve `n_connections` connections on a fresh local port, answering each
    /// request head with whatever the handler returns.
    fn spawn_stub(
        n_connections: usize,
        handler: impl Fn(&str) -> String + Send + 'static,
    ) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        thread::spawn(move || {
            for _ in 0..n_connections {
                let (mut stream, _) = listener.accept().unwrap();
                let mut head = String::new();
                let mut buffer = [0_u8; 4096];
                loop {
                    let n_read = stream.read(&mut buffer).unwrap();
                    head.push_str(&String::from_utf8_lossy(&buffer[..n_read]));
                    if n_read == 0 || head.contains("\r\n\r\n") {
                        break;
                    }
                }
                stream.write_all(handler(&head).as_bytes()).unwrap();
            }
        });
        format!("http://{address}")
    }

    fn http_response(status_line: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{extra_headers}\r\n{body}",
            body.len(),
        )
    }

    #[tokio::test]
    async fn test_get_json_ok() -> Result {
        let url = spawn_stub(1, |_| http_response("200 OK", "", r#"{"value": 42}"#));
        let sample: Sample = get_json(&try_new()?, &url, NO_QUERY, None).await?;
        assert_eq!(sample.value, 42);
        Ok(())
    }

    #[tokio::test]
    async fn test_server_error_fails() -> Result {
        let url = spawn_stub(1, |_| {
            http_response("500 Internal Server Error", "", r#"{"error":"oops"}"#)
        });
        let error = get_json::<_, Sample>(&try_new()?, &url, NO_QUERY, None).await.unwrap_err();
        let message = error.to_string();
        assert!(message.contains("500"));
        assert!(message.contains("oops"));
        Ok(())
    }

    #[tokio::test]
    async fn test_basic_token_is_sent() -> Result {
        let url = spawn_stub(1, |head| {
            if head.contains("authorization: Basic dGVzdDo=")
                || head.contains("Authorization: Basic dGVzdDo=")
            {
                http_response("200 OK", "", r#"{"value": 1}"#)
            } else {
                http_response("403 Forbidden", "", "{}")
            }
        });
        let auth = Auth::Basic("dGVzdDo=".to_owned());
        let sample: Sample = get_json(&try_new()?, &url, NO_QUERY, Some(&auth)).await?;
        assert_eq!(sample.value, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_digest_challenge_is_answered() -> Result {
        let url = spawn_stub(2, |head| {
            if head.contains("Digest username=\"serial\"") {
                http_response("200 OK", "", r#"{"value": 7}"#)
            } else {
                http_response(
                    "401 Unauthorized",
                    "WWW-Authenticate: Digest realm=\"sandbox\", qop=\"auth\", nonce=\"abc\"\r\n",
                    "{}",
                )
            }
        });
        let auth =
            Auth::Digest { username: "serial".to_owned(), password: "key".to_owned() };
        let sample: Sample = get_json(&try_new()?, &url, NO_QUERY, Some(&auth)).await?;
        assert_eq!(sample.value, 7);
        Ok(())
    }
}
