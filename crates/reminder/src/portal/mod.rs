//! HTTP client for the course platform.
//!
//! Login flow:
//! 1. GET /GetImg primes the cookie jar; GET / yields the JSESSIONID
//! 2. GET /confirmImg returns the captcha answer as plain text
//! 3. POST /s.shtml with username, md5 password digest, and captcha
//!
//! Data endpoints are JSON under /back/. One client holds one session;
//! callers create a fresh client per student.

mod error;
mod types;

pub use error::{LoginOutcome, PortalError};
pub use types::{Course, Semester, UserInfo};

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::deadline::AssignmentRecord;
use types::{CourseListEnvelope, HomeworkEnvelope, SemesterEnvelope, UserInfoEnvelope};

/// Configuration for the portal client.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Maximum attempts per request before giving up
    pub max_retries: u32,
    /// Base delay for linear backoff (attempt N waits N * base)
    pub retry_backoff: Duration,
    pub request_timeout: Duration,
    /// Concurrent per-course homework fetches for one student
    pub fetch_concurrency: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://123.121.147.7:88/ve".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            max_retries: 3,
            retry_backoff: Duration::from_secs(2),
            request_timeout: Duration::from_secs(15),
            fetch_concurrency: 4,
        }
    }
}

pub struct PortalClient {
    client: Client,
    jar: Arc<Jar>,
    config: PortalConfig,
}

impl PortalClient {
    pub fn new(config: PortalConfig) -> Result<Self, PortalError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PortalError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            jar,
            config,
        })
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.config.base_url, path_and_query)
    }

    fn jsessionid(&self) -> Option<String> {
        let url = Url::parse(&self.config.base_url).ok()?;
        let header = self.jar.cookies(&url)?;
        header
            .to_str()
            .ok()?
            .split(';')
            .map(str::trim)
            .find_map(|kv| kv.strip_prefix("JSESSIONID="))
            .map(str::to_string)
    }

    /// Primes the cookie jar and verifies a JSESSIONID was issued.
    pub async fn initialize_session(&self) -> Result<String, PortalError> {
        self.get_with_retry(&self.url("/GetImg")).await?;
        self.get_with_retry(&self.config.base_url).await?;
        self.jsessionid().ok_or_else(|| PortalError::NoSession {
            message: "portal did not issue a JSESSIONID cookie".to_string(),
        })
    }

    /// The portal serves its own captcha answer as plain text.
    async fn fetch_captcha(&self) -> Result<String, PortalError> {
        self.get_with_retry(&self.url("/GetImg")).await?;
        let response = self.get_with_retry(&self.url("/confirmImg")).await?;
        let code = response.text().await?;
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(PortalError::UnexpectedResponse {
                message: "empty captcha response".to_string(),
            });
        }
        Ok(code)
    }

    /// Attempts login. Network trouble folds into
    /// [`LoginOutcome::TransientNetworkFailure`] so the caller has a single
    /// dispatch point for all four outcomes.
    pub async fn login(&self, student_id: &str, password: &str) -> Result<LoginOutcome, PortalError> {
        let captcha = match self.fetch_captcha().await {
            Ok(code) => code,
            Err(err) if err.is_retryable() => {
                warn!(student_id, error = %err, "Captcha fetch failed");
                return Ok(LoginOutcome::TransientNetworkFailure);
            }
            Err(err) => return Err(err),
        };

        let digest = format!("{:x}", md5::compute(password.as_bytes()));
        let form = [
            ("username", student_id),
            ("password", digest.as_str()),
            ("passcode", captcha.as_str()),
        ];

        let response = match self.client.post(self.url("/s.shtml")).form(&form).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(student_id, error = %err, "Login request failed");
                return Ok(LoginOutcome::TransientNetworkFailure);
            }
        };

        if !response.status().is_success() {
            debug!(student_id, status = %response.status(), "Login rejected by status");
            return Ok(LoginOutcome::InvalidCredentials);
        }

        let body = response.text().await;
        if let Err(err) = &body {
            warn!(student_id, error = %err, "Could not read login response body");
        }
        Ok(login_outcome_from_body(body))
    }

    pub async fn fetch_current_semester(&self) -> Result<Semester, PortalError> {
        let envelope: SemesterEnvelope = self
            .get_json(&self.url("/back/rp/common/teachCalendar.shtml?method=queryCurrentXq"))
            .await?;
        envelope
            .result
            .into_iter()
            .next()
            .ok_or_else(|| PortalError::UnexpectedResponse {
                message: "semester query returned no rows".to_string(),
            })
    }

    pub async fn fetch_user_info(&self) -> Result<UserInfo, PortalError> {
        let envelope: UserInfoEnvelope = self
            .get_json(&self.url("/back/coursePlatform/userInfo.shtml?method=getUserInfo"))
            .await?;
        Ok(envelope.user_info.unwrap_or_default())
    }

    pub async fn fetch_course_list(&self, xq_code: &str) -> Result<Vec<Course>, PortalError> {
        let envelope: CourseListEnvelope = self
            .get_json(&self.url(&format!(
                "/back/coursePlatform/course.shtml?method=getCourseList&pagesize=100&page=1&xqCode={xq_code}"
            )))
            .await?;
        Ok(envelope.course_list)
    }

    /// Fetches homework for every course with bounded fan-out. One course's
    /// failure drops that course with a log line, not the whole batch.
    pub async fn fetch_assignments(
        &self,
        courses: &[Course],
    ) -> Result<Vec<AssignmentRecord>, PortalError> {
        let results: Vec<(&Course, Result<Vec<AssignmentRecord>, PortalError>)> =
            stream::iter(courses)
                .map(|course| async move { (course, self.fetch_course_homework(course).await) })
                .buffer_unordered(self.config.fetch_concurrency.max(1))
                .collect()
                .await;

        let mut records = Vec::new();
        for (course, result) in results {
            match result {
                Ok(batch) => records.extend(batch),
                Err(err) => {
                    warn!(course = %course.name, error = %err, "Failed to fetch homework; skipping course");
                }
            }
        }
        Ok(records)
    }

    async fn fetch_course_homework(
        &self,
        course: &Course,
    ) -> Result<Vec<AssignmentRecord>, PortalError> {
        let envelope: HomeworkEnvelope = self
            .get_json(&self.url(&format!(
                "/back/coursePlatform/homeWork.shtml?method=getHomeWorkList&cId={}&subType=0&page=1&pagesize=100",
                course.id_str()
            )))
            .await?;
        Ok(envelope
            .course_note_list
            .into_iter()
            .map(|hw| hw.into_record(&course.name))
            .collect())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, PortalError> {
        let response = self.get_with_retry(url).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| PortalError::UnexpectedResponse {
                message: format!("{url}: {err}"),
            })
    }

    /// GET with bounded retries and linear backoff. Network failures and
    /// 5xx responses retry; other non-success statuses fail immediately.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response, PortalError> {
        let mut last_err: Option<PortalError> = None;

        for attempt in 1..=self.config.max_retries.max(1) {
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_server_error() => {
                    last_err = Some(PortalError::Network {
                        message: format!("{url} returned {}", response.status()),
                    });
                }
                Ok(response) if !response.status().is_success() => {
                    return Err(PortalError::UnexpectedResponse {
                        message: format!("{url} returned {}", response.status()),
                    });
                }
                Ok(response) => return Ok(response),
                Err(err) => last_err = Some(err.into()),
            }

            if attempt < self.config.max_retries {
                let delay = self.config.retry_backoff * attempt;
                debug!(url, attempt, delay_ms = delay.as_millis() as u64, "Retrying portal request");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_err.unwrap_or_else(|| PortalError::Network {
            message: format!("{url}: retries exhausted"),
        }))
    }
}

/// Folds the login body read into an outcome. An unreadable body means
/// nothing is known about the credential, never success.
fn login_outcome_from_body<E>(body: Result<String, E>) -> LoginOutcome {
    match body {
        Ok(body) => classify_login_body(&body),
        Err(_) => LoginOutcome::TransientNetworkFailure,
    }
}

/// Splits a 200 login response into the three credential outcomes by
/// inspecting the body's failure markers.
fn classify_login_body(body: &str) -> LoginOutcome {
    let lower = body.to_lowercase();
    if body.contains("锁定") || lower.contains("locked") {
        LoginOutcome::AccountLocked
    } else if body.contains("错误")
        || body.contains("失败")
        || lower.contains("error")
        || lower.contains("fail")
    {
        LoginOutcome::InvalidCredentials
    } else {
        LoginOutcome::Success
    }
}
