use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Result, UsersError};
use crate::types::{User, UserFields};

/// The REST operations the sync core needs from the server.
#[async_trait]
pub trait UserApi: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn create_user(&self, user: &User) -> Result<User>;

    async fn update_user(&self, id: &str, fields: &UserFields) -> Result<User>;

    async fn delete_user(&self, id: &str) -> Result<()>;
}

pub struct UsersClient {
    http: Client,
    base_url: Url,
}

impl UsersClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl UserApi for UsersClient {
    async fn list_users(&self) -> Result<Vec<User>> {
        let url = self.endpoint(&["users"]);
        debug!("GET {url}");

        let response = check_status(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        let url = self.endpoint(&["users"]);
        debug!("POST {url}");

        let response = check_status(self.http.post(url).json(user).send().await?).await?;
        Ok(parse_or_echo(response, || user.clone()).await)
    }

    async fn update_user(&self, id: &str, fields: &UserFields) -> Result<User> {
        let url = self.endpoint(&["users", id]);
        debug!("PUT {url}");

        let response = check_status(self.http.put(url).json(fields).send().await?).await?;
        Ok(parse_or_echo(response, || fields.clone().with_id(id)).await)
    }

    async fn delete_user(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["users", id]);
        debug!("DELETE {url}");

        check_status(self.http.delete(url).send().await?).await?;
        Ok(())
    }
}

/// Turn any non-2xx response into an API error carrying the body text.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    Err(UsersError::Api {
        status: status.as_u16(),
        message: response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string()),
    })
}

/// Servers may return the stored record, an echo, or nothing at all. Fall
/// back to what was sent when the body is not a record.
async fn parse_or_echo<T, F>(response: Response, sent: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            trace!("Response body is not a record ({e}), using request body");
            sent()
        }
    }
}
