//! Mock Amcrest camera for integration tests.
//!
//! Serves a fixed CGI surface on a random local port, optionally behind
//! HTTP Digest, and records every request it sees.

#![allow(dead_code)]

use amcrest_admin::auth::digest::parse_params;
use amcrest_admin::auth::{Algorithm, DigestChallenge, CAMERA_AUTH_HEADER};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const REALM: &str = "Login to 4G0123456789";
pub const NONCE: &str = "1284315837";
pub const OPAQUE: &str = "a9a8b1c0d1e2f3";

/// Bytes of a minimal JPEG. Not valid UTF-8.
pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x80, 0xFE, 0xFF, 0xD9];

pub const VIDEO_WIDGET: &str = "\
table.VideoWidget[0].ChannelTitle.EncodeBlend=true
table.VideoWidget[0].ChannelTitle.Rect[0]=0
table.VideoWidget[0].ChannelTitle.Rect[1]=7000
table.VideoWidget[0].ChannelTitle.Rect[2]=2000
table.VideoWidget[0].ChannelTitle.Rect[3]=7600
table.VideoWidget[0].ChannelTitle.BackColor[0]=0
table.VideoWidget[0].ChannelTitle.BackColor[1]=0
table.VideoWidget[0].ChannelTitle.BackColor[2]=0
table.VideoWidget[0].ChannelTitle.BackColor[3]=128
table.VideoWidget[0].ChannelTitle.FrontColor[0]=255
table.VideoWidget[0].ChannelTitle.FrontColor[1]=255
table.VideoWidget[0].ChannelTitle.FrontColor[2]=255
table.VideoWidget[0].ChannelTitle.FrontColor[3]=0
table.VideoWidget[0].TimeTitle.EncodeBlend=true
table.VideoWidget[0].TimeTitle.Rect[0]=5000
table.VideoWidget[0].TimeTitle.Rect[1]=0
table.VideoWidget[0].TimeTitle.Rect[2]=8191
table.VideoWidget[0].TimeTitle.Rect[3]=600
";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub raw_query: Option<String>,
    pub authorization: Option<String>,
    pub camera_auth: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl Reply {
    pub fn text(body: &str) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "text/plain;charset=utf-8",
            body: body.as_bytes().to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            ..Self::text(body)
        }
    }

    pub fn jpeg() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: "image/jpeg",
            body: JPEG.to_vec(),
            delay: Duration::ZERO,
        }
    }

    /// Hold the reply back, to simulate a slow camera.
    pub fn delayed(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }
}

pub type ReplyFn = Arc<dyn Fn(&str, &HashMap<String, String>) -> Reply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    require_digest: bool,
    reply: ReplyFn,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockCamera {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockCamera {
    /// Digest-protected camera with the stock CGI replies.
    pub async fn start() -> Self {
        Self::start_with(true, Arc::new(amcrest_reply)).await
    }

    pub async fn start_with(require_digest: bool, reply: ReplyFn) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            require_digest,
            reply,
            requests: Arc::clone(&requests),
        };

        let app = Router::new().fallback(handle).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests whose path ends with `path_suffix`.
    pub fn answered(&self, path_suffix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.ends_with(path_suffix))
            .collect()
    }
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn challenge() -> DigestChallenge {
    DigestChallenge {
        realm: REALM.to_string(),
        nonce: NONCE.to_string(),
        opaque: Some(OPAQUE.to_string()),
        algorithm: Algorithm::Md5,
        qop: Some("auth".to_string()),
    }
}

fn digest_is_valid(authorization: &str, request_target: &str) -> bool {
    let Some(rest) = authorization.strip_prefix("Digest ") else {
        return false;
    };
    let params: HashMap<String, String> = parse_params(rest).into_iter().collect();
    let get = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();

    let expected = challenge().response(USERNAME, PASSWORD, "GET", get("uri"), get("cnonce"));

    get("username") == USERNAME
        && get("nonce") == NONCE
        && get("opaque") == OPAQUE
        && get("uri") == request_target
        && get("response") == expected
}

async fn handle(State(state): State<MockState>, uri: Uri, headers: HeaderMap) -> Response {
    let path = uri.path().to_string();
    let query: HashMap<String, String> = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .into_owned()
        .collect();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.requests.lock().unwrap().push(RecordedRequest {
        path: path.clone(),
        query: query.clone(),
        raw_query: uri.query().map(str::to_string),
        authorization: authorization.clone(),
        camera_auth: headers
            .get(CAMERA_AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    if state.require_digest {
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.clone());
        let authorized = authorization
            .as_deref()
            .is_some_and(|a| digest_is_valid(a, &target));

        if !authorized {
            let www_authenticate = format!(
                r#"Digest realm="{}", qop="auth", nonce="{}", opaque="{}""#,
                REALM, NONCE, OPAQUE
            );
            return Response::builder()
                .status(StatusCode::UNAUTHORIZED)
                .header(header::WWW_AUTHENTICATE, r#"Basic realm="camera""#)
                .header(header::WWW_AUTHENTICATE, www_authenticate)
                .body(Body::empty())
                .unwrap();
        }
    }

    let reply = (state.reply)(&path, &query);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    Response::builder()
        .status(reply.status)
        .header(header::CONTENT_TYPE, reply.content_type)
        .body(Body::from(reply.body))
        .unwrap()
}

/// Stock replies of a Dahua-firmware Amcrest camera. Matches on path suffix
/// so the same table serves direct and relay-prefixed paths.
pub fn amcrest_reply(path: &str, query: &HashMap<String, String>) -> Reply {
    let action = query.get("action").map(String::as_str).unwrap_or_default();

    if path.ends_with("/cgi-bin/magicBox.cgi") {
        return match action {
            "getDeviceType" => Reply::text("type=IP2M-841B\r\n"),
            "getSerialNo" => Reply::text("sn=ABC123\n"),
            "getHardwareVersion" => Reply::text("version=V2.0\r\n"),
            "getSoftwareVersion" => Reply::text("version=2.420.AC00.18.R,build:2017-06-29\r\n"),
            "reboot" => Reply::text("OK\r\n"),
            _ => Reply::status(StatusCode::BAD_REQUEST, "Error\r\nBad Request!\r\n"),
        };
    }

    if path.ends_with("/cgi-bin/configManager.cgi") {
        return match (action, query.get("name").map(String::as_str)) {
            ("getConfig", Some("VideoWidget")) => Reply::text(VIDEO_WIDGET),
            ("getConfig", Some("Encode")) => Reply::text(
                "table.Encode[0].MainFormat[0].Video.Width=1920\r\ntable.Encode[0].MainFormat[0].Video.Height=1080\r\n",
            ),
            ("setConfig", _) => Reply::text("OK\r\n"),
            _ => Reply::status(StatusCode::BAD_REQUEST, "Error\r\nBad Request!\r\n"),
        };
    }

    if path.ends_with("/cgi-bin/snapshot.cgi") {
        return Reply::jpeg();
    }

    if path.ends_with("/cgi-bin/ptz.cgi") {
        return match action {
            "start" | "stop" => Reply::text("OK\r\n"),
            "getPresets" => Reply::text(
                "presets[0].Index=1\r\npresets[0].Name=Driveway\r\npresets[1].Index=2\r\npresets[1].Name=Porch\r\n",
            ),
            "getStatus" => Reply::text("status.Focus=0.5\r\nstatus.Zoom=0.5\r\nstatus.MoveStatus=Idle\r\n"),
            _ => Reply::status(StatusCode::BAD_REQUEST, "Error\r\nBad Request!\r\n"),
        };
    }

    Reply::status(StatusCode::NOT_FOUND, "Not Found")
}
