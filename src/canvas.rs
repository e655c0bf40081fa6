use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;
use crate::models::{Assignment, Course, Student, Submission};

/// Canvas caps per_page at 100. Larger collections are silently truncated
/// because no next-page link is followed; `decode_collection` warns when a
/// page comes back full.
const PER_PAGE: usize = 100;

/// Advisory delay between successive calls to stay under the Canvas rate
/// limit. Not a retry policy; a rejected call still fails its resource.
const PACING: Duration = Duration::from_millis(150);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BODY_SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("auth rejected while {context}; check the token and its scope")]
    Auth { context: String },
    #[error("upstream returned {status} while {context}: {body_snippet}")]
    Upstream {
        status: u16,
        context: String,
        body_snippet: String,
    },
    #[error("malformed JSON while {context}: {source}")]
    Decode {
        context: String,
        source: serde_json::Error,
    },
    #[error("request failed while {context}: {source}")]
    Transport {
        context: String,
        source: reqwest::Error,
    },
}

/// The read-only Canvas surface the report pipelines consume. The pipelines
/// take this instead of the concrete client so a scripted implementation can
/// stand in for the network.
#[async_trait]
pub trait CanvasApi: Send + Sync {
    /// Course display name, or the `"Course {id}"` placeholder when the
    /// response carries no name. A failed fetch is the caller's decision.
    async fn course_name(&self, course_id: &str) -> Result<String, ApiError>;

    async fn assignments(&self, course_id: &str) -> Result<Vec<Assignment>, ApiError>;

    /// Submissions with the submitting user expanded, for the recency report.
    async fn submissions_with_users(
        &self,
        course_id: &str,
        assignment_id: i64,
    ) -> Result<Vec<Submission>, ApiError>;

    /// Bare submissions, enough to build the submitted-user-id set.
    async fn raw_submissions(
        &self,
        course_id: &str,
        assignment_id: i64,
    ) -> Result<Vec<Submission>, ApiError>;

    async fn roster(&self, course_id: &str) -> Result<Vec<Student>, ApiError>;

    /// Callers insert this between successive calls; advisory only.
    async fn pace(&self) {}
}

pub struct CanvasClient {
    http: reqwest::Client,
    base_host: String,
    token: String,
}

impl CanvasClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_host: config.base_host.clone(),
            token: config.api_token.clone(),
        })
    }

    /// One authenticated GET. Returns `Ok(None)` on an empty 2xx body;
    /// 401/403 become `Auth`, other non-2xx become `Upstream`, and a 2xx body
    /// that fails to parse becomes `Decode`.
    pub async fn fetch(&self, path_or_url: &str, context: &str) -> Result<Option<Value>, ApiError> {
        let url = build_url(&self.base_host, path_or_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                context: context.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ApiError::Transport {
                context: context.to_string(),
                source,
            })?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Auth {
                context: context.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                context: context.to_string(),
                body_snippet: snippet(&body),
            });
        }
        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|source| ApiError::Decode {
                context: context.to_string(),
                source,
            })
    }
}

#[async_trait]
impl CanvasApi for CanvasClient {
    async fn course_name(&self, course_id: &str) -> Result<String, ApiError> {
        let path = format!("/api/v1/courses/{course_id}");
        let context = format!("fetching course {course_id}");
        let course: Option<Course> = match self.fetch(&path, &context).await? {
            Some(value) => {
                Some(serde_json::from_value(value).map_err(|source| ApiError::Decode {
                    context,
                    source,
                })?)
            }
            None => None,
        };
        Ok(match course {
            Some(Course {
                name: Some(name), ..
            }) => name,
            Some(Course { id, name: None }) => format!("Course {id}"),
            None => format!("Course {course_id}"),
        })
    }

    async fn assignments(&self, course_id: &str) -> Result<Vec<Assignment>, ApiError> {
        let path = format!("/api/v1/courses/{course_id}/assignments?per_page={PER_PAGE}");
        let context = format!("listing assignments for course {course_id}");
        let value = self.fetch(&path, &context).await?;
        decode_collection(value, &context)
    }

    async fn submissions_with_users(
        &self,
        course_id: &str,
        assignment_id: i64,
    ) -> Result<Vec<Submission>, ApiError> {
        let path = format!(
            "/api/v1/courses/{course_id}/assignments/{assignment_id}/submissions?include[]=user&per_page={PER_PAGE}"
        );
        let context =
            format!("listing submissions for assignment {assignment_id} in course {course_id}");
        let value = self.fetch(&path, &context).await?;
        decode_collection(value, &context)
    }

    async fn raw_submissions(
        &self,
        course_id: &str,
        assignment_id: i64,
    ) -> Result<Vec<Submission>, ApiError> {
        let path = format!(
            "/api/v1/courses/{course_id}/assignments/{assignment_id}/submissions?per_page={PER_PAGE}"
        );
        let context = format!(
            "listing raw submissions for assignment {assignment_id} in course {course_id}"
        );
        let value = self.fetch(&path, &context).await?;
        decode_collection(value, &context)
    }

    async fn roster(&self, course_id: &str) -> Result<Vec<Student>, ApiError> {
        let path =
            format!("/api/v1/courses/{course_id}/users?enrollment_type[]=student&per_page={PER_PAGE}");
        let context = format!("listing the roster for course {course_id}");
        let value = self.fetch(&path, &context).await?;
        decode_collection(value, &context)
    }

    async fn pace(&self) {
        tokio::time::sleep(PACING).await;
    }
}

fn build_url(base_host: &str, path_or_url: &str) -> String {
    if path_or_url.starts_with("https://") || path_or_url.starts_with("http://") {
        path_or_url.to_string()
    } else {
        format!("https://{base_host}{path_or_url}")
    }
}

fn snippet(body: &str) -> String {
    let mut end = body.len().min(BODY_SNIPPET_LEN);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

fn decode_collection<T: DeserializeOwned>(
    value: Option<Value>,
    context: &str,
) -> Result<Vec<T>, ApiError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items: Vec<T> =
        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            context: context.to_string(),
            source,
        })?;
    if items.len() == PER_PAGE {
        warn!("{context}: page came back full ({PER_PAGE} items); anything past the first page is not fetched");
    }
    Ok(items)
}
