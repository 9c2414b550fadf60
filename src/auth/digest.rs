//! HTTP Digest authentication (RFC 7616, with RFC 2069 fallback).
//!
//! Every request starts unauthenticated. If the camera answers 401 with a
//! Digest challenge, the request is repeated once with a computed
//! `Authorization` header. Challenges are not cached between requests, so
//! the nonce count is always `00000001`.

use async_trait::async_trait;
use md5::Md5;
use reqwest::header::{HeaderMap, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Response, StatusCode};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;
use uuid::Uuid;

use crate::auth::CredentialAttacher;
use crate::error::{CameraError, Result};

const NONCE_COUNT: &str = "00000001";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl Algorithm {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "MD5" => Some(Self::Md5),
            "MD5-SESS" => Some(Self::Md5Sess),
            "SHA-256" => Some(Self::Sha256),
            "SHA-256-SESS" => Some(Self::Sha256Sess),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Md5Sess => "MD5-sess",
            Self::Sha256 => "SHA-256",
            Self::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(&self) -> bool {
        matches!(self, Self::Md5Sess | Self::Sha256Sess)
    }

    fn hash(&self, data: &str) -> String {
        match self {
            Self::Md5 | Self::Md5Sess => hex::encode(Md5::digest(data.as_bytes())),
            Self::Sha256 | Self::Sha256Sess => hex::encode(Sha256::digest(data.as_bytes())),
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Algorithm,
    /// `Some("auth")` when the server offered quality of protection.
    pub qop: Option<String>,
}

impl DigestChallenge {
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
        if !scheme.eq_ignore_ascii_case("Digest") {
            return Err(CameraError::Challenge(format!("unsupported scheme {}", scheme)));
        }

        let params = parse_params(rest);
        let find = |name: &str| {
            params
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        };

        let nonce = find("nonce").ok_or_else(|| CameraError::Challenge("missing nonce".to_string()))?;
        let realm = find("realm").unwrap_or_default();

        let algorithm = match find("algorithm") {
            Some(token) => Algorithm::parse(&token)
                .ok_or_else(|| CameraError::Challenge(format!("unsupported algorithm {}", token)))?,
            None => Algorithm::Md5,
        };

        let qop = match find("qop") {
            Some(offered) => {
                if offered.split(',').any(|q| q.trim().eq_ignore_ascii_case("auth")) {
                    Some("auth".to_string())
                } else {
                    return Err(CameraError::Challenge(format!("unsupported qop {}", offered)));
                }
            }
            None => None,
        };

        Ok(Self {
            realm,
            nonce,
            opaque: find("opaque"),
            algorithm,
            qop,
        })
    }

    /// Compute the `response` value for one request.
    pub fn response(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        let alg = self.algorithm;

        let mut ha1 = alg.hash(&format!("{}:{}:{}", username, self.realm, password));
        if alg.is_session() {
            ha1 = alg.hash(&format!("{}:{}:{}", ha1, self.nonce, cnonce));
        }
        let ha2 = alg.hash(&format!("{}:{}", method, uri));

        match &self.qop {
            Some(qop) => alg.hash(&format!(
                "{}:{}:{}:{}:{}:{}",
                ha1, self.nonce, NONCE_COUNT, cnonce, qop, ha2
            )),
            None => alg.hash(&format!("{}:{}:{}", ha1, self.nonce, ha2)),
        }
    }

    /// Build the full `Authorization` header value.
    pub fn authorization(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        let response = self.response(username, password, method, uri, cnonce);

        let mut header = format!(
            r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", algorithm={}, response="{}""#,
            quote(username),
            quote(&self.realm),
            quote(&self.nonce),
            quote(uri),
            self.algorithm.as_str(),
            response
        );
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{}""#, quote(opaque)));
        }
        if let Some(qop) = &self.qop {
            header.push_str(&format!(
                r#", qop={}, nc={}, cnonce="{}""#,
                qop, NONCE_COUNT, cnonce
            ));
        }
        header
    }

    /// First usable Digest challenge among a response's
    /// `WWW-Authenticate` headers.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| match Self::parse(value) {
                Ok(challenge) => Some(challenge),
                Err(e) => {
                    tracing::debug!("Ignoring authentication challenge: {}", e);
                    None
                }
            })
    }
}

/// Split a comma-separated `name=value` parameter list as used by the
/// `WWW-Authenticate` and `Authorization` headers. Names are lowercased;
/// quoted values are unquoted and unescaped.
pub fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            name.push(c);
            chars.next();
        }

        if name.is_empty() && chars.peek().is_none() {
            break;
        }
        if chars.peek() != Some(&'=') {
            continue;
        }
        chars.next();

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        let name = name.trim().to_ascii_lowercase();
        if !name.is_empty() {
            params.push((name, value));
        }
    }

    params
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The request-target a digest is computed over: path plus query.
pub fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Direct-to-camera strategy.
#[derive(Clone)]
pub struct DigestAuth {
    username: String,
    password: String,
}

impl DigestAuth {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for DigestAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl CredentialAttacher for DigestAuth {
    async fn send(&self, http: &Client, url: Url) -> Result<Response> {
        let response = http.get(url.clone()).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(challenge) = DigestChallenge::from_headers(response.headers()) else {
            tracing::debug!("401 from {} without a usable Digest challenge", url.path());
            return Ok(response);
        };

        let cnonce = Uuid::new_v4().simple().to_string();
        let authorization = challenge.authorization(
            &self.username,
            &self.password,
            "GET",
            &request_uri(&url),
            &cnonce,
        );

        tracing::trace!(
            "Answering {} digest challenge for realm {}",
            challenge.algorithm.as_str(),
            challenge.realm
        );

        let response = http
            .get(url)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        Ok(response)
    }
}
