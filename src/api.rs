//! Backend seam for the doctor schedule.
//!
//! `ScheduleApi` is the only way the rest of the crate talks to the
//! FitBuddy backend. `HttpScheduleApi` is the real reqwest client;
//! `MockScheduleApi` is an in-memory stand-in that records every call.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::COOKIE;
use reqwest::Url;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ScheduleError;
use crate::models::{Appointment, ScheduleResponse, StatusUpdate};

const SCHEDULE_PATH: [&str; 3] = ["api", "appointment", "doctor-schedule"];
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Operations the schedule view needs from the backend.
pub trait ScheduleApi {
    /// `GET /api/appointment/doctor-schedule`, in backend order.
    fn fetch_schedule(&self) -> Result<Vec<Appointment>, ScheduleError>;

    /// `PATCH /api/appointment/{id}/status`.
    fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<(), ScheduleError>;
}

/// Identity the backend uses to scope "my appointments".
///
/// The client never inspects these values, it only forwards them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub bearer_token: Option<String>,
    pub cookie: Option<String>,
}

impl SessionContext {
    pub fn new(bearer_token: Option<String>, cookie: Option<String>) -> Self {
        Self {
            bearer_token,
            cookie,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.token.clone(), config.cookie.clone())
    }

    fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }
        request
    }
}

/// reqwest-backed client for the FitBuddy appointment endpoints.
pub struct HttpScheduleApi {
    base_url: Url,
    client: Client,
    session: SessionContext,
    timeout_secs: Option<u64>,
}

impl HttpScheduleApi {
    pub fn new(config: &Config, session: SessionContext) -> Result<Self, ScheduleError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| ScheduleError::Config(format!("Invalid API URL '{}': {e}", config.api_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ScheduleError::Config(format!(
                "API URL '{}' cannot be used as a base",
                config.api_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|e| ScheduleError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url,
            client,
            session,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was ruled out in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn schedule_url(&self) -> Url {
        self.endpoint(&SCHEDULE_PATH)
    }

    fn status_url(&self, id: &str) -> Url {
        self.endpoint(&["api", "appointment", id, "status"])
    }

    fn schedule_request(&self) -> RequestBuilder {
        self.client.get(self.schedule_url())
    }

    fn status_request(&self, id: &str, update: &StatusUpdate) -> RequestBuilder {
        self.client.patch(self.status_url(id)).json(update)
    }

    /// Attach the session headers and a fresh request id.
    fn prepare(&self, request: RequestBuilder) -> (RequestBuilder, String) {
        let request_id = Uuid::new_v4().to_string();
        let request = self
            .session
            .apply(request)
            .header(REQUEST_ID_HEADER, request_id.as_str());
        (request, request_id)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, ScheduleError> {
        let (request, request_id) = self.prepare(request);

        let response = request.send().map_err(|e| self.transport_error(e))?;

        let status = response.status();
        debug!(request_id = %request_id, status = status.as_u16(), "Backend responded");
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(request_id = %request_id, status = status.as_u16(), "Backend rejected request");
            return Err(ScheduleError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn transport_error(&self, e: reqwest::Error) -> ScheduleError {
        if e.is_connect() {
            ScheduleError::Connection(self.base_url().to_string())
        } else if e.is_timeout() {
            ScheduleError::Timeout(self.timeout_secs.unwrap_or_default())
        } else {
            ScheduleError::HttpClient(e.to_string())
        }
    }
}

impl ScheduleApi for HttpScheduleApi {
    fn fetch_schedule(&self) -> Result<Vec<Appointment>, ScheduleError> {
        debug!(url = %self.schedule_url(), "Fetching doctor schedule");

        let response = self.send(self.schedule_request())?;
        let parsed: ScheduleResponse = response
            .json()
            .map_err(|e| ScheduleError::ResponseParsing(e.to_string()))?;

        Ok(parsed.data)
    }

    fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<(), ScheduleError> {
        debug!(url = %self.status_url(id), status = %update.status, "Updating appointment status");

        self.send(self.status_request(id, update))?;
        Ok(())
    }
}

/// A call received by `MockScheduleApi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    FetchSchedule,
    UpdateStatus { id: String, update: StatusUpdate },
}

/// In-memory backend for tests and demos.
///
/// Successful status updates are applied to the stored list, so the next
/// fetch sees them the way the real backend would.
#[derive(Default)]
pub struct MockScheduleApi {
    appointments: RefCell<Vec<Appointment>>,
    calls: RefCell<Vec<ApiCall>>,
    fail_fetch: Cell<bool>,
    fail_update: Cell<bool>,
}

impl MockScheduleApi {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        Self {
            appointments: RefCell::new(appointments),
            ..Self::default()
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.set(fail);
    }

    pub fn set_fail_update(&self, fail: bool) {
        self.fail_update.set(fail);
    }

    pub fn replace_appointments(&self, appointments: Vec<Appointment>) {
        *self.appointments.borrow_mut() = appointments;
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn fetch_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, ApiCall::FetchSchedule))
            .count()
    }

    pub fn update_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, ApiCall::UpdateStatus { .. }))
            .count()
    }
}

impl ScheduleApi for MockScheduleApi {
    fn fetch_schedule(&self) -> Result<Vec<Appointment>, ScheduleError> {
        self.calls.borrow_mut().push(ApiCall::FetchSchedule);
        if self.fail_fetch.get() {
            return Err(ScheduleError::Api {
                status: 500,
                body: "mock fetch failure".to_string(),
            });
        }
        Ok(self.appointments.borrow().clone())
    }

    fn update_status(&self, id: &str, update: &StatusUpdate) -> Result<(), ScheduleError> {
        self.calls.borrow_mut().push(ApiCall::UpdateStatus {
            id: id.to_string(),
            update: update.clone(),
        });
        if self.fail_update.get() {
            return Err(ScheduleError::Api {
                status: 500,
                body: "mock update failure".to_string(),
            });
        }

        let mut appointments = self.appointments.borrow_mut();
        let apt = appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| ScheduleError::Api {
                status: 404,
                body: format!("appointment {id} not found"),
            })?;
        apt.status = update.status.clone();
        if update.doctor_notes.is_some() {
            apt.doctor_notes = update.doctor_notes.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
    use reqwest::Method;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    fn pending(id: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            patient: None,
            appointment_date: None,
            time_slot: None,
            status: AppointmentStatus::Pending,
            doctor_notes: None,
            created_at: None,
        }
    }

    fn http_api(url: &str) -> HttpScheduleApi {
        let config = Config {
            api_url: url.to_string(),
            ..Config::default()
        };
        HttpScheduleApi::new(&config, SessionContext::default()).unwrap()
    }

    fn session_api(url: &str) -> HttpScheduleApi {
        let config = Config {
            api_url: url.to_string(),
            ..Config::default()
        };
        let session = SessionContext::new(Some("t0ken".into()), Some("sid=1".into()));
        HttpScheduleApi::new(&config, session).unwrap()
    }

    /// Serve a single canned response on a local port. The handle yields
    /// the raw request text as received.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            let mut body_bytes = vec![0; content_length];
            reader.read_exact(&mut body_bytes).unwrap();
            request.push_str(&String::from_utf8(body_bytes).unwrap());

            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            )
            .unwrap();
            stream.flush().unwrap();
            request
        });

        (url, handle)
    }

    #[test]
    fn schedule_request_carries_session_headers() {
        let api = session_api("http://localhost:5000");
        let (builder, request_id) = api.prepare(api.schedule_request());
        let request = builder.build().unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.url().as_str(),
            "http://localhost:5000/api/appointment/doctor-schedule"
        );
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer t0ken");
        assert_eq!(request.headers()[COOKIE], "sid=1");
        assert_eq!(request.headers()[REQUEST_ID_HEADER], request_id.as_str());
        assert!(Uuid::parse_str(&request_id).is_ok());
        assert!(request.body().is_none());
    }

    #[test]
    fn status_request_is_json_patch() {
        let api = session_api("http://localhost:5000");
        let update = StatusUpdate::complete("Patient advised rest".into());
        let (builder, _) = api.prepare(api.status_request("a1", &update));
        let request = builder.build().unwrap();

        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(
            request.url().as_str(),
            "http://localhost:5000/api/appointment/a1/status"
        );
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer t0ken");

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let body: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            body,
            json!({ "status": "completed", "doctorNotes": "Patient advised rest" })
        );
    }

    #[test]
    fn anonymous_session_sends_no_credentials() {
        let api = http_api("http://localhost:5000");
        let (builder, _) = api.prepare(api.schedule_request());
        let request = builder.build().unwrap();
        assert!(request.headers().get(AUTHORIZATION).is_none());
        assert!(request.headers().get(COOKIE).is_none());
        assert!(request.headers().get(REQUEST_ID_HEADER).is_some());
    }

    #[test]
    fn each_request_gets_a_fresh_id() {
        let api = http_api("http://localhost:5000");
        let (_, first) = api.prepare(api.schedule_request());
        let (_, second) = api.prepare(api.schedule_request());
        assert_ne!(first, second);
    }

    #[test]
    fn fetch_schedule_reads_data_over_http() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"data":[{"_id":"a1","status":"pending","appointmentDate":"2024-06-03"}]}"#,
        );
        let api = session_api(&url);

        let list = api.fetch_schedule().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "a1");
        assert_eq!(list[0].status, AppointmentStatus::Pending);

        let request = server.join().unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /api/appointment/doctor-schedule http/1.1"));
        assert!(request.contains("authorization: bearer t0ken"));
        assert!(request.contains("cookie: sid=1"));
        assert!(request.contains("x-request-id: "));
    }

    #[test]
    fn rejected_update_maps_to_api_error() {
        let (url, server) = serve_once("404 Not Found", r#"{"message":"Appointment not found"}"#);
        let api = session_api(&url);

        let err = api
            .update_status("a1", &StatusUpdate::confirm())
            .unwrap_err();
        match err {
            ScheduleError::Api { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("Appointment not found"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }

        let request = server.join().unwrap();
        assert!(request.starts_with("PATCH /api/appointment/a1/status HTTP/1.1"));
        assert!(request.ends_with(r#"{"status":"confirmed"}"#));
    }

    #[test]
    fn server_error_on_fetch_maps_to_api_error() {
        let (url, server) = serve_once("500 Internal Server Error", "oops");
        let api = http_api(&url);
        assert!(matches!(
            api.fetch_schedule(),
            Err(ScheduleError::Api { status: 500, ref body }) if body == "oops"
        ));
        server.join().unwrap();
    }

    #[test]
    fn malformed_body_is_parse_error() {
        let (url, server) = serve_once("200 OK", "<html>not json</html>");
        let api = http_api(&url);
        assert!(matches!(
            api.fetch_schedule(),
            Err(ScheduleError::ResponseParsing(_))
        ));
        server.join().unwrap();
    }

    #[test]
    fn accepted_update_is_ok() {
        let (url, server) = serve_once("204 No Content", "");
        let api = http_api(&url);
        assert!(api.update_status("a1", &StatusUpdate::cancel()).is_ok());
        server.join().unwrap();
    }

    #[test]
    fn unreachable_backend_is_connection_error() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let api = http_api(&format!("http://{addr}"));
        assert!(matches!(
            api.fetch_schedule(),
            Err(ScheduleError::Connection(_))
        ));
    }

    #[test]
    fn schedule_url_joins_path() {
        let api = http_api("http://localhost:5000");
        assert_eq!(
            api.schedule_url().as_str(),
            "http://localhost:5000/api/appointment/doctor-schedule"
        );
    }

    #[test]
    fn base_path_is_preserved() {
        let api = http_api("https://fitbuddy.test/backend/");
        assert_eq!(
            api.status_url("abc").as_str(),
            "https://fitbuddy.test/backend/api/appointment/abc/status"
        );
        assert_eq!(api.base_url(), "https://fitbuddy.test/backend");
    }

    #[test]
    fn status_url_escapes_id_as_one_segment() {
        let api = http_api("http://localhost:5000");
        assert_eq!(
            api.status_url("a/b c").as_str(),
            "http://localhost:5000/api/appointment/a%2Fb%20c/status"
        );
    }

    #[test]
    fn invalid_url_is_config_error() {
        let config = Config {
            api_url: "not a url".to_string(),
            ..Config::default()
        };
        let err = HttpScheduleApi::new(&config, SessionContext::default()).err().unwrap();
        assert!(matches!(err, ScheduleError::Config(_)));
    }

    #[test]
    fn session_from_config() {
        let config = Config {
            token: Some("t".into()),
            cookie: Some("sid=1".into()),
            ..Config::default()
        };
        let session = SessionContext::from_config(&config);
        assert_eq!(session.bearer_token.as_deref(), Some("t"));
        assert_eq!(session.cookie.as_deref(), Some("sid=1"));
    }

    #[test]
    fn mock_records_calls_and_applies_updates() {
        let api = MockScheduleApi::new(vec![pending("a1")]);
        api.update_status("a1", &StatusUpdate::confirm()).unwrap();
        let list = api.fetch_schedule().unwrap();
        assert_eq!(list[0].status, AppointmentStatus::Confirmed);
        assert_eq!(
            api.calls(),
            vec![
                ApiCall::UpdateStatus {
                    id: "a1".into(),
                    update: StatusUpdate::confirm()
                },
                ApiCall::FetchSchedule,
            ]
        );
    }

    #[test]
    fn mock_failures() {
        let api = MockScheduleApi::new(vec![pending("a1")]);
        api.set_fail_fetch(true);
        assert!(api.fetch_schedule().is_err());
        api.set_fail_update(true);
        assert!(api.update_status("a1", &StatusUpdate::cancel()).is_err());
        api.set_fail_update(false);
        assert!(matches!(
            api.update_status("zz", &StatusUpdate::cancel()),
            Err(ScheduleError::Api { status: 404, .. })
        ));
        assert_eq!(api.fetch_count(), 1);
        assert_eq!(api.update_count(), 2);
    }
}
