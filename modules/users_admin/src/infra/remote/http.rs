use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use crate::contract::{
    client::UsersRemote,
    error::RemoteError,
    model::{RemoteUser, User, UserDraft, UserId},
};
use crate::infra::remote::dto::UserDto;
use crate::infra::remote::traced::TracedClient;

/// JSON-over-HTTP adapter for `/users` and `/users/{id}` under `base`.
pub struct HttpUsersRemote {
    client: TracedClient,
    base: Url,
}

impl HttpUsersRemote {
    pub fn new(client: TracedClient, base: Url) -> Self {
        Self { client, base }
    }

    pub fn from_base_url(base_url: &str) -> Result<Self, RemoteError> {
        let base = Url::parse(base_url)
            .map_err(|e| RemoteError::transport(format!("invalid base URL '{base_url}': {e}")))?;
        Ok(Self::new(TracedClient::default(), base))
    }

    fn users_url(&self, id: Option<UserId>) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteError::transport("base URL cannot be a base"))?;
            segments.pop_if_empty().push("users");
            if let Some(id) = id {
                segments.push(&id.to_string());
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<UserDto>,
    ) -> Result<reqwest::Response, RemoteError> {
        let mut builder = self.client.request(method, url.as_str());
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        let response = self.client.execute(builder.build()?).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::status(status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl UsersRemote for HttpUsersRemote {
    #[instrument(name = "users_admin.http.list_users", skip_all, fields(base = %self.base))]
    async fn list_users(&self) -> Result<Vec<User>, RemoteError> {
        let url = self.users_url(None)?;
        let dtos: Vec<UserDto> = self.send(Method::GET, url, None).await?.json().await?;
        debug!(count = dtos.len(), "Fetched users");
        dtos.into_iter().map(User::try_from).collect()
    }

    #[instrument(name = "users_admin.http.create_user", skip_all, fields(base = %self.base))]
    async fn create_user(&self, draft: &UserDraft) -> Result<RemoteUser, RemoteError> {
        let url = self.users_url(None)?;
        let echo: UserDto = self
            .send(Method::POST, url, Some(UserDto::from(draft)))
            .await?
            .json()
            .await?;
        Ok(echo.into())
    }

    #[instrument(
        name = "users_admin.http.update_user",
        skip_all,
        fields(base = %self.base, user_id = %id)
    )]
    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<RemoteUser, RemoteError> {
        let url = self.users_url(Some(id))?;
        let echo: UserDto = self
            .send(Method::PUT, url, Some(UserDto::from(draft)))
            .await?
            .json()
            .await?;
        Ok(echo.into())
    }

    #[instrument(
        name = "users_admin.http.delete_user",
        skip_all,
        fields(base = %self.base, user_id = %id)
    )]
    async fn delete_user(&self, id: UserId) -> Result<(), RemoteError> {
        let url = self.users_url(Some(id))?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}
