//! Analysis service HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). One request at a
//! time, no retries. Bearer auth is attached whenever a token is set.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use riskview_core::{AuthSession, Report, UserInfo};

/// Analysis service API client (blocking).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: Option<String>,
}

/// Error type for service calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No token available for a call that needs one
    NotAuthenticated,
    /// Server rejected the bearer token (HTTP 401)
    Unauthorized,
    /// Network error
    Network(String),
    /// HTTP error with status code and the best message available
    Http(u16, String),
    /// Server returned a validation error (400/422 with message)
    Validation(String),
    /// Response body was not what the endpoint promises
    Parse(String),
    /// Local file I/O error
    Io(String),
}

impl ApiError {
    /// Message suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotAuthenticated => "로그인이 필요합니다.".to_string(),
            ApiError::Unauthorized => "인증이 만료되었습니다. 다시 로그인해주세요.".to_string(),
            ApiError::Http(_, msg) | ApiError::Validation(msg) => msg.clone(),
            ApiError::Network(msg) => format!("서버에 연결할 수 없습니다: {}", msg),
            ApiError::Parse(msg) => format!("응답을 해석할 수 없습니다: {}", msg),
            ApiError::Io(msg) => format!("파일을 읽을 수 없습니다: {}", msg),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotAuthenticated => write!(f, "Not authenticated, run `riskview login` first"),
            ApiError::Unauthorized => write!(f, "Authentication expired"),
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ApiError::Validation(msg) => write!(f, "{}", msg),
            ApiError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ApiError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// One image selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = mime_for(&name);
        Self { name, mime, bytes }
    }

    pub fn from_path(path: &Path) -> Result<Self, ApiError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ApiError::Io(format!("{}: {}", path.display(), e)))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, bytes))
    }
}

/// Backend health as reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Fields for `/auth/register`.
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub organization: Option<String>,
}

/// Which call failed; picks the fallback message when the server gives none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Login,
    Analyze,
    Feedback,
    Other,
}

impl Endpoint {
    /// `body_was_json` distinguishes a JSON body without `detail` from a body
    /// that was not JSON at all.
    fn fallback_message(self, status: reqwest::StatusCode, body_was_json: bool) -> String {
        match (self, body_was_json) {
            (Endpoint::Login, true) => "로그인 실패".to_string(),
            (Endpoint::Login, false) => format!(
                "로그인 실패: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string(),
            (Endpoint::Analyze, true) => "분석 오류".to_string(),
            (Endpoint::Analyze, false) => "오류".to_string(),
            (Endpoint::Feedback, _) => "피드백 제출에 실패했습니다.".to_string(),
            (Endpoint::Other, _) => format!("HTTP {}", status.as_u16()),
        }
    }

    /// Login answers 401 for bad credentials; that is not token expiry.
    fn uses_bearer(self) -> bool {
        !matches!(self, Endpoint::Login)
    }
}

impl ApiClient {
    /// Create a client. `timeout: None` waits indefinitely.
    pub fn new(api_base: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("riskview/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("cannot create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Exchange credentials for a bearer token. Does not store the token.
    pub fn login(&self, username: &str, password: &str) -> Result<AuthSession, ApiError> {
        #[derive(Deserialize)]
        struct LoginResponse {
            access_token: String,
            user: UserInfo,
        }

        let url = format!("{}/auth/login", self.api_base);
        log::debug!("POST {}", url);
        let req = self
            .http
            .post(&url)
            .form(&[("username", username), ("password", password)]);
        let resp = self.send(req, Endpoint::Login)?;
        let body: LoginResponse = resp.json().map_err(|e| ApiError::Parse(e.to_string()))?;

        if body.access_token.is_empty() {
            return Err(ApiError::Parse("empty access_token in login response".into()));
        }
        log::info!("Logged in as {}", body.user.username);
        Ok(AuthSession { token: body.access_token, user: body.user })
    }

    /// Create an account. Returns the server's confirmation message.
    pub fn register(&self, request: &RegisterRequest) -> Result<String, ApiError> {
        let url = format!("{}/auth/register", self.api_base);
        log::debug!("POST {}", url);

        let mut fields = vec![
            ("username", request.username.as_str()),
            ("email", request.email.as_str()),
            ("password", request.password.as_str()),
        ];
        if let Some(ref name) = request.full_name {
            fields.push(("full_name", name.as_str()));
        }
        if let Some(ref org) = request.organization {
            fields.push(("organization", org.as_str()));
        }

        let resp = self.send(self.http.post(&url).form(&fields), Endpoint::Other)?;
        let json: serde_json::Value = resp.json().map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(json["message"].as_str().unwrap_or("등록되었습니다.").to_string())
    }

    /// Fetch the profile behind the current token.
    pub fn me(&self) -> Result<UserInfo, ApiError> {
        let url = format!("{}/auth/me", self.api_base);
        log::debug!("GET {}", url);
        let resp = self.send(self.authorized(self.http.get(&url))?, Endpoint::Other)?;
        resp.json::<UserInfo>().map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Past analysis sessions of the current user, as returned by the server.
    pub fn sessions(&self) -> Result<serde_json::Value, ApiError> {
        let url = format!("{}/auth/sessions", self.api_base);
        log::debug!("GET {}", url);
        let resp = self.send(self.authorized(self.http.get(&url))?, Endpoint::Other)?;
        resp.json().map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Upload images and wait for the report.
    pub fn analyze(&self, files: &[UploadFile], session_label: &str) -> Result<Report, ApiError> {
        if files.is_empty() {
            return Err(ApiError::Validation("이미지를 선택하세요.".into()));
        }

        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(file.mime)
                .map_err(|e| ApiError::Parse(e.to_string()))?;
            form = form.part("files", part);
        }
        form = form.text("session_name", session_label.to_string());

        let url = format!("{}/analyze", self.api_base);
        log::debug!("POST {} ({} files)", url, files.len());
        let req = self.authorized(self.http.post(&url))?.multipart(form);
        let resp = self.send(req, Endpoint::Analyze)?;
        let report: Report = resp.json().map_err(|e| ApiError::Parse(e.to_string()))?;
        log::info!("Analysis session {} ready ({} images)", report.session_id, report.image_count);
        Ok(report)
    }

    /// Rate a finished analysis session (1-5).
    pub fn submit_feedback(&self, session_id: &str, feedback: &str, rating: u8) -> Result<(), ApiError> {
        let url = format!("{}/feedback/{}", self.api_base, session_id);
        log::debug!("POST {}", url);
        let rating = rating.to_string();
        let req = self
            .authorized(self.http.post(&url))?
            .form(&[("feedback", feedback), ("rating", rating.as_str())]);
        self.send(req, Endpoint::Feedback)?;
        Ok(())
    }

    /// Unauthenticated liveness probe.
    pub fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = format!("{}/health", self.api_base);
        log::debug!("GET {}", url);
        let req = self.http.get(&url).header("Cache-Control", "no-store");
        let resp = self.send(req, Endpoint::Other)?;
        resp.json::<HealthStatus>().map_err(|e| ApiError::Parse(e.to_string()))
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Attach the bearer token. Without one the request would only earn a 401,
    /// so it is not sent.
    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        match self.token {
            Some(ref token) => Ok(req.bearer_auth(token)),
            None => Err(ApiError::NotAuthenticated),
        }
    }

    fn send(&self, req: RequestBuilder, endpoint: Endpoint) -> Result<Response, ApiError> {
        let response = req.send().map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 401 && endpoint.uses_bearer() {
            log::warn!("Server rejected token ({})", status);
            return Err(ApiError::Unauthorized);
        }

        let body = response.text().unwrap_or_default();
        let (detail, was_json) = error_detail(&body);
        let message = detail.unwrap_or_else(|| endpoint.fallback_message(status, was_json));
        log::debug!("HTTP {} from server: {}", status.as_u16(), message);

        let code = status.as_u16();
        if code == 400 || code == 422 {
            return Err(ApiError::Validation(message));
        }
        Err(ApiError::Http(code, message))
    }
}

// ── Free functions ──────────────────────────────────────────────────

/// Pull `detail` out of an error body.
/// Returns (detail, body_was_json). Non-string details are rendered as JSON.
fn error_detail(body: &str) -> (Option<String>, bool) {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return (None, false);
    };
    let detail = match json.get("detail") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(serde_json::Value::Null) | None => None,
        Some(serde_json::Value::String(_)) => None,
        Some(other) => Some(other.to_string()),
    };
    (detail, true)
}

/// MIME type from the file extension. The service skips parts that are not
/// `image/*`.
fn mime_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.base_url(), None).unwrap()
    }

    fn report_json() -> serde_json::Value {
        serde_json::json!({
            "session_id": "sess-1",
            "image_count": 2,
            "timestamp": "2024-05-01 12:30:00",
            "sections": {
                "risk_analysis": "<thead><tr><th>위험요인</th></tr></thead><tbody></tbody>",
                "sgr_checklist": "",
                "recommendations": "- 안전모 착용"
            },
            "full_report": "## 1. 위험요인\n- 추락\n## 4. 추가 권장사항\n- 안전모 착용"
        })
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("a.JPG"), "image/jpeg");
        assert_eq!(mime_for("site.photo.png"), "image/png");
        assert_eq!(mime_for("noext"), "application/octet-stream");
        assert_eq!(mime_for("notes.txt"), "application/octet-stream");
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"detail":"잘못된 비밀번호"}"#), (Some("잘못된 비밀번호".into()), true));
        assert_eq!(error_detail(r#"{"message":"x"}"#), (None, true));
        assert_eq!(error_detail("<html>bad gateway</html>"), (None, false));
        let (detail, _) = error_detail(r#"{"detail":[{"loc":["body","rating"]}]}"#);
        assert!(detail.unwrap().contains("rating"));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let c = ApiClient::new("http://localhost:8000/", None).unwrap();
        assert_eq!(c.api_base(), "http://localhost:8000");
    }

    #[test]
    fn test_login_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/login")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_includes("username=kim")
                .body_includes("password=pw");
            then.status(200).json_body(serde_json::json!({
                "access_token": "tok-abc",
                "token_type": "bearer",
                "user": {"id": 3, "username": "kim", "full_name": "김안전", "organization": null}
            }));
        });

        let auth = client(&server).login("kim", "pw").unwrap();
        mock.assert();
        assert_eq!(auth.token, "tok-abc");
        assert_eq!(auth.user.username, "kim");
        assert_eq!(auth.user.id.as_deref(), Some("3"));
    }

    #[test]
    fn test_login_failure_uses_detail() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(401)
                .json_body(serde_json::json!({"detail": "잘못된 사용자명 또는 비밀번호입니다."}));
        });

        let err = client(&server).login("kim", "bad").unwrap_err();
        assert_eq!(err, ApiError::Http(401, "잘못된 사용자명 또는 비밀번호입니다.".into()));
    }

    #[test]
    fn test_login_failure_non_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(502).body("bad gateway");
        });

        let err = client(&server).login("kim", "pw").unwrap_err();
        assert_eq!(err.user_message(), "로그인 실패: 502 Bad Gateway");
    }

    #[test]
    fn test_analyze_sends_multipart_with_bearer() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/analyze")
                .header("authorization", "Bearer tok")
                .body_includes("name=\"files\"; filename=\"a.jpg\"")
                .body_includes("name=\"files\"; filename=\"b.png\"")
                .body_includes("name=\"session_name\"")
                .body_includes("분석 세션 1");
            then.status(200).json_body(report_json());
        });

        let files = vec![
            UploadFile::new("a.jpg", vec![0xFF, 0xD8]),
            UploadFile::new("b.png", vec![0x89, 0x50]),
        ];
        let report = client(&server).with_token("tok").analyze(&files, "분석 세션 1").unwrap();
        mock.assert();
        assert_eq!(report.session_id, "sess-1");
        assert_eq!(report.image_count, 2);
    }

    #[test]
    fn test_analyze_without_files_makes_no_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(200);
        });

        let err = client(&server).with_token("tok").analyze(&[], "x").unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        mock.assert_hits(0);
    }

    #[test]
    fn test_analyze_without_token_makes_no_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.any_request();
            then.status(200);
        });

        let files = vec![UploadFile::new("a.jpg", vec![1])];
        let err = client(&server).analyze(&files, "x").unwrap_err();
        assert_eq!(err, ApiError::NotAuthenticated);
        mock.assert_hits(0);
    }

    #[test]
    fn test_analyze_401_is_unauthorized() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/analyze");
            then.status(401).json_body(serde_json::json!({"detail": "Could not validate credentials"}));
        });

        let files = vec![UploadFile::new("a.jpg", vec![1])];
        let err = client(&server).with_token("stale").analyze(&files, "x").unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
    }

    #[test]
    fn test_analyze_error_fallbacks() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/analyze").header("authorization", "Bearer a");
            then.status(500).json_body(serde_json::json!({"detail": "이미지 분석 중 오류 발생: boom"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/analyze").header("authorization", "Bearer b");
            then.status(500).json_body(serde_json::json!({"error": "x"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/analyze").header("authorization", "Bearer c");
            then.status(503).body("upstream down");
        });

        let files = vec![UploadFile::new("a.jpg", vec![1])];
        let c = client(&server);
        assert_eq!(
            c.clone().with_token("a").analyze(&files, "x").unwrap_err(),
            ApiError::Http(500, "이미지 분석 중 오류 발생: boom".into())
        );
        assert_eq!(
            c.clone().with_token("b").analyze(&files, "x").unwrap_err(),
            ApiError::Http(500, "분석 오류".into())
        );
        assert_eq!(
            c.with_token("c").analyze(&files, "x").unwrap_err(),
            ApiError::Http(503, "오류".into())
        );
    }

    #[test]
    fn test_analyze_malformed_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/analyze");
            then.status(200).body("not json");
        });

        let files = vec![UploadFile::new("a.jpg", vec![1])];
        let err = client(&server).with_token("t").analyze(&files, "x").unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[test]
    fn test_feedback() {
        let server = MockServer::start();
        let ok = server.mock(|when, then| {
            when.method(POST)
                .path("/feedback/sess-1")
                .header("authorization", "Bearer t")
                .body_includes("rating=5");
            then.status(200).json_body(serde_json::json!({"message": "ok"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/feedback/sess-2");
            then.status(400).json_body(serde_json::json!({"detail": "평점은 1-5 사이여야 합니다."}));
        });

        let c = client(&server).with_token("t");
        c.submit_feedback("sess-1", "좋아요", 5).unwrap();
        ok.assert();

        let err = c.submit_feedback("sess-2", "좋아요", 5).unwrap_err();
        assert_eq!(err, ApiError::Validation("평점은 1-5 사이여야 합니다.".into()));
    }

    #[test]
    fn test_health_needs_no_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/health").header_missing("authorization");
            then.status(200)
                .json_body(serde_json::json!({"status": "healthy", "timestamp": "2024-05-01T12:00:00+09:00"}));
        });

        let health = client(&server).health().unwrap();
        assert!(health.is_healthy());
    }

    #[test]
    fn test_me_and_sessions() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/auth/me").header("authorization", "Bearer t");
            then.status(200).json_body(serde_json::json!({
                "id": "u1", "username": "kim", "email": "kim@example.com",
                "full_name": "김안전", "organization": "현장팀", "role": "beta_tester"
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/auth/sessions");
            then.status(200).json_body(serde_json::json!([{"session_id": "s1"}]));
        });

        let c = client(&server).with_token("t");
        let me = c.me().unwrap();
        assert_eq!(me.display_name(), "김안전 (현장팀)");
        let sessions = c.sessions().unwrap();
        assert_eq!(sessions[0]["session_id"], "s1");
    }

    #[test]
    fn test_register() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/register")
                .body_includes("email=kim%40example.com")
                .body_includes("organization=");
            then.status(200).json_body(serde_json::json!({
                "message": "사용자 등록이 완료되었습니다.",
                "user": {"id": 1, "username": "kim", "email": "kim@example.com"}
            }));
        });

        let req = RegisterRequest {
            username: "kim".into(),
            email: "kim@example.com".into(),
            password: "pw".into(),
            full_name: None,
            organization: Some("현장팀".into()),
        };
        let msg = client(&server).register(&req).unwrap();
        mock.assert();
        assert_eq!(msg, "사용자 등록이 완료되었습니다.");
    }

    #[test]
    fn test_network_error() {
        let c = ApiClient::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        assert!(matches!(c.health(), Err(ApiError::Network(_))));
    }

    #[test]
    fn test_upload_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("현장1.jpeg");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();
        let file = UploadFile::from_path(&path).unwrap();
        assert_eq!(file.name, "현장1.jpeg");
        assert_eq!(file.mime, "image/jpeg");
        assert_eq!(file.bytes, vec![1, 2, 3]);

        let missing = UploadFile::from_path(&dir.path().join("nope.png"));
        assert!(matches!(missing, Err(ApiError::Io(_))));
    }
}
