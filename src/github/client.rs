//! GitHub API client.

use reqwest::{Method, StatusCode};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

use crate::config::{DEFAULT_API_URL, load_github_pat};
use crate::error::{ManagerError, Result};

/// The authenticated GitHub account.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
    pub html_url: String,
}

/// Client for interacting with the GitHub API.
///
/// Plain REST calls go through a blocking `reqwest` client. Pull request
/// calls use `octocrab`, driven by a runtime owned by the client, so the
/// public API stays synchronous.
#[derive(Clone)]
pub struct GitHubClient {
    pub(crate) token: String,
    pub(crate) base_url: String,
    pub(crate) client: Client,
    pub(crate) octocrab: octocrab::Octocrab,
    runtime: Arc<tokio::runtime::Runtime>,
    login: OnceLock<String>,
}

impl GitHubClient {
    /// Create a new GitHub client with the given token.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_enterprise(token, DEFAULT_API_URL)
    }

    /// Create a client for GitHub Enterprise with a custom base URL.
    pub fn with_enterprise(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ManagerError::Auth {
                message: "GitHub token is empty".into(),
            });
        }
        let mut url = base_url.into();
        while url.ends_with('/') {
            url.pop();
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        let octocrab = {
            let _guard = runtime.enter();
            octocrab::Octocrab::builder()
                .personal_token(token.clone())
                .base_uri(url.as_str())?
                .build()?
        };

        Ok(Self {
            token,
            base_url: url,
            client: Client::new(),
            octocrab,
            runtime: Arc::new(runtime),
            login: OnceLock::new(),
        })
    }

    /// Create a client from `GITHUB_PAT` (or `GITHUB_TOKEN`), reading `.env`.
    pub fn from_env() -> Result<Self> {
        let token = load_github_pat().ok_or_else(|| ManagerError::Auth {
            message: "GitHub personal access token is not configured (set GITHUB_PAT)".into(),
        })?;
        Self::new(token)
    }

    /// Create a client and verify the token by fetching the current user.
    pub fn connect(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Self::with_enterprise(token, base_url)?;
        let user = client.authenticated_user()?;
        tracing::info!(login = %user.login, "GitHub client initialized");
        Ok(client)
    }

    /// Fetch the account the token belongs to.
    pub fn authenticated_user(&self) -> Result<GitHubUser> {
        let user: GitHubUser = self.get("/user")?;
        let _ = self.login.set(user.login.clone());
        Ok(user)
    }

    /// Login of the authenticated user, fetched once and cached.
    pub fn login(&self) -> Result<String> {
        if let Some(login) = self.login.get() {
            return Ok(login.clone());
        }
        Ok(self.authenticated_user()?.login)
    }

    /// Get the default headers for API requests.
    pub(crate) fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token)).map_err(|_| {
            ManagerError::Auth {
                message: "token contains characters not allowed in an HTTP header".into(),
            }
        })?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("repo-manager"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Start a request to `endpoint` carrying the default headers.
    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.base_url, endpoint);
        Ok(self.client.request(method, url).headers(self.headers()?))
    }

    fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response> {
        tracing::debug!(endpoint, "GitHub API request");
        let response = request.send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(api_error(status, endpoint, &body))
    }

    /// Make a GET request to the GitHub API.
    pub(crate) fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.send(endpoint, self.request(Method::GET, endpoint)?)?;
        parse(response)
    }

    /// GET a text representation selected by `accept`; 404 maps to `None`.
    pub(crate) fn get_text_optional(&self, endpoint: &str, accept: &'static str) -> Result<Option<String>> {
        // `headers` replaces keys already set, unlike `header` which appends
        let mut accept_only = HeaderMap::new();
        accept_only.insert(ACCEPT, HeaderValue::from_static(accept));
        let request = self.request(Method::GET, endpoint)?.headers(accept_only);
        let response = match self.send(endpoint, request) {
            Ok(response) => response,
            Err(ManagerError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(response.text()?))
    }

    /// Make a POST request to the GitHub API.
    pub(crate) fn post<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(endpoint, self.request(Method::POST, endpoint)?.json(body))?;
        parse(response)
    }

    /// Make a PATCH request to the GitHub API.
    pub(crate) fn patch<T: serde::de::DeserializeOwned, B: serde::Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send(endpoint, self.request(Method::PATCH, endpoint)?.json(body))?;
        parse(response)
    }

    /// Make a DELETE request to the GitHub API.
    pub(crate) fn delete(&self, endpoint: &str) -> Result<()> {
        self.send(endpoint, self.request(Method::DELETE, endpoint)?)?;
        Ok(())
    }

    /// Run an octocrab future to completion on the client's runtime.
    pub(crate) fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Get the token for use in clone URLs.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    response.json().map_err(|e| ManagerError::GitHub {
        message: format!("Failed to parse response: {}", e),
    })
}

/// Translate a failed API response into an error.
pub(crate) fn api_error(status: StatusCode, endpoint: &str, body: &str) -> ManagerError {
    #[derive(Deserialize)]
    struct ApiMessage {
        message: String,
    }

    let message = serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED => ManagerError::Auth {
            message: format!("token is invalid or expired ({})", message),
        },
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
            if message.to_lowercase().contains("rate limit") =>
        {
            ManagerError::RateLimited(message)
        }
        StatusCode::NOT_FOUND => ManagerError::NotFound(endpoint.to_string()),
        _ => ManagerError::GitHub {
            message: format!("API request failed ({}): {}", status, message),
        },
    }
}
