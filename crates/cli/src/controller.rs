//! Intent dispatch.
//!
//! [`Controller`] is the only owner of the session state. Every user action
//! (from a one-shot subcommand or the interactive shell) goes through one of
//! its intent methods, which validate locally, call the service, update the
//! lifecycle phase and emit exactly the notices the user should see. Intents
//! never panic and never leave auth half-cleared; a refused intent reports why
//! through [`Refusal`] after the user has already been notified.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Local;
use riskview_client::{
    clear_auth, load_auth, save_auth, ApiClient, ApiError, HealthStatus, RegisterRequest, UploadFile,
};
use riskview_config::storage::KeyValueStore;
use riskview_core::{Phase, Report, SectionKind, Session, SessionState, TransitionError, UserInfo};
use riskview_io::{ExportEngine, ExportError};

use crate::notify::{Notice, Notifier};

pub const MSG_LOGIN_OK: &str = "로그인 성공!";
pub const MSG_LOGGED_OUT: &str = "로그아웃되었습니다.";
pub const MSG_CREDENTIALS_REQUIRED: &str = "사용자명과 비밀번호를 입력해주세요.";
pub const MSG_LOGIN_ERROR: &str = "로그인 중 오류가 발생했습니다";
pub const MSG_LOGIN_REQUIRED: &str = "로그인이 필요합니다.";
pub const MSG_SELECT_IMAGES: &str = "이미지를 선택하세요.";
pub const MSG_AUTH_EXPIRED: &str = "인증이 만료되었습니다. 다시 로그인해주세요.";
pub const MSG_ANALYSIS_DONE: &str = "분석이 완료되었습니다.";
pub const MSG_ANALYSIS_ERROR: &str = "분석 중 오류 발생";
pub const MSG_ANALYSIS_RUNNING: &str = "분석이 진행 중입니다.";
pub const MSG_NO_RESULTS: &str = "분석 결과가 없습니다.";
pub const MSG_NO_SESSION: &str = "분석 세션이 없습니다.";
pub const MSG_RATING_REQUIRED: &str = "만족도를 선택해주세요.";
pub const MSG_RATING_RANGE: &str = "평점은 1-5 사이여야 합니다.";
pub const MSG_FEEDBACK_REQUIRED: &str = "피드백을 입력해주세요.";
pub const MSG_FEEDBACK_OK: &str = "피드백이 성공적으로 제출되었습니다. 감사합니다!";
pub const MSG_FEEDBACK_ERROR: &str = "피드백 제출 중 오류가 발생했습니다.";
pub const MSG_BACKEND_OK: &str = "백엔드 연결됨";
pub const MSG_BACKEND_UNHEALTHY: &str = "백엔드 비정상";
pub const MSG_BACKEND_DOWN: &str = "백엔드 연결 실패";
pub const MSG_XLS_ERROR: &str = "XLS 생성 중 오류";
pub const MSG_ZIP_ERROR: &str = "ZIP 생성 중 오류가 발생했습니다.";
pub const MSG_SAVED: &str = "저장됨:";
pub const MSG_REGISTER_FIELDS: &str = "사용자명, 이메일, 비밀번호를 입력해주세요.";

/// Header cell of the recommendations sheet.
pub const RECOMMENDATIONS_HEADER: &str = "추가 권장사항";

/// Default prefix of the session label sent with an upload.
pub const DEFAULT_LABEL_PREFIX: &str = "분석 세션";

/// Why an intent did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    /// The intent needs a login
    NotAuthenticated,
    /// The service rejected the saved token; auth has been cleared
    AuthExpired,
    /// Local validation failed; nothing was sent
    Invalid(String),
    /// Not allowed in the current phase
    Busy(TransitionError),
    /// The service or the transport failed
    Backend(ApiError),
    /// A download could not be produced
    Export(ExportError),
}

impl fmt::Display for Refusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refusal::NotAuthenticated => write!(f, "not authenticated"),
            Refusal::AuthExpired => write!(f, "authentication expired"),
            Refusal::Invalid(msg) => write!(f, "{}", msg),
            Refusal::Busy(e) => write!(f, "{}", e),
            Refusal::Backend(e) => write!(f, "{}", e),
            Refusal::Export(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Refusal {}

pub struct Controller {
    state: SessionState,
    phase: Phase,
    client: ApiClient,
    exports: ExportEngine,
    store: Box<dyn KeyValueStore>,
    notifier: Box<dyn Notifier>,
    selection: Vec<UploadFile>,
    label_prefix: String,
}

impl Controller {
    pub fn new(
        client: ApiClient,
        exports: ExportEngine,
        store: Box<dyn KeyValueStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            state: SessionState::default(),
            phase: Phase::default(),
            client,
            exports,
            store,
            notifier,
            selection: Vec::new(),
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
        }
    }

    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.state.user()
    }

    pub fn report(&self) -> Option<&Report> {
        self.state.report.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session.as_ref()
    }

    pub fn selection(&self) -> &[UploadFile] {
        &self.selection
    }

    pub fn output_dir(&self) -> &Path {
        self.exports.output_dir()
    }

    // ── Auth ────────────────────────────────────────────────────────

    /// Restore persisted credentials, if any.
    pub fn startup(&mut self) -> Phase {
        match load_auth(self.store.as_ref()) {
            Some(auth) => {
                log::info!("Restored login for {}", auth.user.username);
                self.client.set_token(Some(auth.token.clone()));
                self.state.auth = Some(auth);
                self.phase = Phase::Idle;
            }
            None => {
                log::debug!("No saved login");
                self.client.set_token(None);
                self.state.clear();
                self.phase = Phase::Unauthenticated;
            }
        }
        self.phase
    }

    /// Log in, replacing any previous login. `Ok` means the user is now
    /// authenticated and the credentials are persisted.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), Refusal> {
        if username.is_empty() || password.is_empty() {
            return Err(self.invalid(MSG_CREDENTIALS_REQUIRED));
        }

        let auth = match self.client.login(username, password) {
            Ok(auth) => auth,
            Err(e) => {
                let message = match &e {
                    ApiError::Network(msg) | ApiError::Parse(msg) => {
                        format!("{}: {}", MSG_LOGIN_ERROR, msg)
                    }
                    other => other.user_message(),
                };
                log::warn!("Login failed: {}", e);
                self.notify(Notice::error(message));
                return Err(Refusal::Backend(e));
            }
        };

        if let Err(e) = save_auth(self.store.as_mut(), &auth) {
            log::warn!("Could not persist login: {}", e);
        }
        self.state.clear();
        self.phase = self.phase.sign_out();
        self.client.set_token(Some(auth.token.clone()));
        log::info!("Logged in as {}", auth.user.username);
        self.state.auth = Some(auth);
        self.advance(Phase::login)?;
        self.notify(Notice::success(MSG_LOGIN_OK));
        Ok(())
    }

    /// Forget the login and everything derived from it. Safe to repeat.
    pub fn logout(&mut self) {
        self.sign_out();
        self.notify(Notice::info(MSG_LOGGED_OUT));
    }

    pub fn register(&mut self, request: &RegisterRequest) -> Result<String, Refusal> {
        if request.username.trim().is_empty()
            || request.email.trim().is_empty()
            || request.password.is_empty()
        {
            return Err(self.invalid(MSG_REGISTER_FIELDS));
        }
        match self.client.register(request) {
            Ok(message) => {
                self.notify(Notice::success(message.clone()));
                Ok(message)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Refresh the profile of the logged-in user from the service.
    pub fn whoami(&mut self) -> Result<UserInfo, Refusal> {
        self.require_login()?;
        let user = self.client.me().map_err(|e| self.fail(e))?;

        if let Some(auth) = self.state.auth.as_mut() {
            auth.user = user.clone();
            if let Err(e) = save_auth(self.store.as_mut(), auth) {
                log::warn!("Could not persist profile: {}", e);
            }
        }
        Ok(user)
    }

    /// Past analysis sessions of the logged-in user, as the service lists them.
    pub fn list_sessions(&mut self) -> Result<serde_json::Value, Refusal> {
        self.require_login()?;
        self.client.sessions().map_err(|e| self.fail(e))
    }

    pub fn check_health(&self) -> Result<HealthStatus, Refusal> {
        match self.client.health() {
            Ok(status) if status.is_healthy() => {
                self.notify(Notice::success(MSG_BACKEND_OK));
                Ok(status)
            }
            Ok(status) => {
                log::warn!("Backend reports status {:?}", status.status);
                self.notify(Notice::error(MSG_BACKEND_UNHEALTHY));
                Ok(status)
            }
            Err(e) => {
                log::warn!("Health check failed: {}", e);
                self.notify(Notice::error(MSG_BACKEND_DOWN));
                Err(Refusal::Backend(e))
            }
        }
    }

    // ── Analyze ─────────────────────────────────────────────────────

    /// Replace the selection with the files at `paths`. Nothing changes if
    /// any of them cannot be read.
    pub fn select_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<usize, Refusal> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match UploadFile::from_path(path.as_ref()) {
                Ok(file) => files.push(file),
                Err(e) => return Err(self.invalid(&e.user_message())),
            }
        }
        Ok(self.select_uploads(files))
    }

    /// Replace the selection with files already in memory.
    pub fn select_uploads(&mut self, files: Vec<UploadFile>) -> usize {
        log::debug!("Selected {} file(s)", files.len());
        self.selection = files;
        self.selection.len()
    }

    /// Upload the selection. On success the new report replaces the previous
    /// one and becomes the session feedback goes to.
    pub fn analyze(&mut self, label: Option<&str>) -> Result<(), Refusal> {
        if !self.state.is_authenticated() {
            self.phase = self.phase.sign_out();
            self.notify(Notice::error(MSG_LOGIN_REQUIRED));
            return Err(Refusal::NotAuthenticated);
        }
        if self.selection.is_empty() {
            return Err(self.invalid(MSG_SELECT_IMAGES));
        }
        self.advance(Phase::start_analysis)?;

        let label = match label {
            Some(l) if !l.trim().is_empty() => l.to_string(),
            _ => self.default_label(),
        };
        log::info!("Uploading {} image(s) as {:?}", self.selection.len(), label);

        match self.client.analyze(&self.selection, &label) {
            Ok(report) => {
                let session = self.state.accept_report(report);
                log::info!(
                    "Session {}: {} image(s), {} report bytes",
                    session.session_id,
                    session.image_count,
                    session.raw_report.len()
                );
                self.advance(Phase::analysis_succeeded)?;
                self.notify(Notice::success(MSG_ANALYSIS_DONE));
                Ok(())
            }
            Err(ApiError::Unauthorized) => Err(self.expire()),
            Err(e) => {
                self.advance(Phase::analysis_failed)?;
                let message = match &e {
                    ApiError::Network(msg) | ApiError::Parse(msg) => {
                        format!("{}: {}", MSG_ANALYSIS_ERROR, msg)
                    }
                    other => other.user_message(),
                };
                log::warn!("Analysis failed: {}", e);
                self.notify(Notice::error(message));
                Err(Refusal::Backend(e))
            }
        }
    }

    /// Dismiss the results on screen.
    pub fn acknowledge(&mut self) -> Result<(), Refusal> {
        self.advance(Phase::acknowledge)
    }

    /// Point feedback at a session from an earlier run.
    pub fn resume_session(&mut self, session_id: impl Into<String>) {
        self.state.current_session_id = Some(session_id.into());
    }

    pub fn submit_feedback(&mut self, rating: Option<u8>, feedback: &str) -> Result<(), Refusal> {
        self.require_login()?;
        let session_id = match self.state.current_session_id.clone() {
            Some(id) => id,
            None => return Err(self.invalid(MSG_NO_SESSION)),
        };
        let rating = match rating {
            None => return Err(self.invalid(MSG_RATING_REQUIRED)),
            Some(r) if !(1..=5).contains(&r) => return Err(self.invalid(MSG_RATING_RANGE)),
            Some(r) => r,
        };
        if feedback.trim().is_empty() {
            return Err(self.invalid(MSG_FEEDBACK_REQUIRED));
        }

        match self.client.submit_feedback(&session_id, feedback, rating) {
            Ok(()) => {
                log::info!("Feedback sent for session {}", session_id);
                self.notify(Notice::success(MSG_FEEDBACK_OK));
                Ok(())
            }
            Err(e @ (ApiError::Network(_) | ApiError::Parse(_))) => {
                log::warn!("Feedback failed: {}", e);
                self.notify(Notice::error(MSG_FEEDBACK_ERROR));
                Err(Refusal::Backend(e))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Spreadsheet of the risk or checklist table. Recommendations have no
    /// table and go through [`Controller::export_recommendations`].
    pub fn export_table(&self, kind: SectionKind) -> Result<PathBuf, Refusal> {
        if kind == SectionKind::Recommendations {
            return self.export_recommendations();
        }
        let (report, _) = self.results()?;
        let html = match kind {
            SectionKind::Risk => &report.sections.risk_analysis,
            _ => &report.sections.sgr_checklist,
        };
        let result = self.exports.export_table(kind, html, report.timestamp());
        self.finish_export(result, MSG_XLS_ERROR)
    }

    pub fn export_recommendations(&self) -> Result<PathBuf, Refusal> {
        let (report, session) = self.results()?;
        let result = self.exports.export_lines(
            SectionKind::Recommendations,
            RECOMMENDATIONS_HEADER,
            &session.sections.rec_raw,
            report.timestamp(),
        );
        self.finish_export(result, MSG_XLS_ERROR)
    }

    /// Zip of every non-empty section as markdown.
    pub fn export_archive(&self) -> Result<PathBuf, Refusal> {
        let (report, session) = self.results()?;
        let result = self.exports.export_archive(&session.sections, report.timestamp());
        self.finish_export(result, MSG_ZIP_ERROR)
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    fn invalid(&self, message: &str) -> Refusal {
        log::debug!("Rejected: {}", message);
        self.notify(Notice::error(message));
        Refusal::Invalid(message.to_string())
    }

    fn require_login(&mut self) -> Result<(), Refusal> {
        if self.state.is_authenticated() {
            return Ok(());
        }
        self.phase = self.phase.sign_out();
        self.notify(Notice::error(MSG_LOGIN_REQUIRED));
        Err(Refusal::NotAuthenticated)
    }

    fn advance(&mut self, event: fn(Phase) -> Result<Phase, TransitionError>) -> Result<(), Refusal> {
        match event(self.phase) {
            Ok(next) => {
                log::debug!("phase {} -> {}", self.phase, next);
                self.phase = next;
                Ok(())
            }
            Err(e) => {
                log::warn!("{}", e);
                let message = if e.from == Phase::Analyzing {
                    MSG_ANALYSIS_RUNNING.to_string()
                } else {
                    e.to_string()
                };
                self.notify(Notice::error(message));
                Err(Refusal::Busy(e))
            }
        }
    }

    fn sign_out(&mut self) {
        if let Err(e) = clear_auth(self.store.as_mut()) {
            log::warn!("Could not clear saved login: {}", e);
        }
        self.state.clear();
        self.client.set_token(None);
        self.phase = self.phase.sign_out();
    }

    /// The service no longer accepts the token.
    fn expire(&mut self) -> Refusal {
        log::warn!("Token rejected, signing out");
        self.sign_out();
        self.notify(Notice::error(MSG_AUTH_EXPIRED));
        Refusal::AuthExpired
    }

    fn fail(&mut self, err: ApiError) -> Refusal {
        if err == ApiError::Unauthorized {
            return self.expire();
        }
        log::warn!("Request failed: {}", err);
        self.notify(Notice::error(err.user_message()));
        Refusal::Backend(err)
    }

    fn results(&self) -> Result<(&Report, &Session), Refusal> {
        match (self.phase.has_results(), &self.state.report, &self.state.session) {
            (true, Some(report), Some(session)) => Ok((report, session)),
            _ => Err(self.invalid(MSG_NO_RESULTS)),
        }
    }

    fn finish_export(
        &self,
        result: Result<PathBuf, ExportError>,
        failure: &str,
    ) -> Result<PathBuf, Refusal> {
        match result {
            Ok(path) => {
                self.notify(Notice::success(format!("{} {}", MSG_SAVED, path.display())));
                Ok(path)
            }
            Err(e) => {
                log::error!("Export failed: {}", e);
                self.notify(Notice::error(failure));
                Err(Refusal::Export(e))
            }
        }
    }

    fn default_label(&self) -> String {
        format!("{} {}", self.label_prefix, Local::now().format("%Y. %-m. %-d. %H:%M:%S"))
    }
}
