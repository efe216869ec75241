use crate::traits::PhotoUpload;
use crate::types::{Credentials, PosterError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    id: String,
}

/// Photo upload over a publishing HTTP endpoint.
///
/// Logs in with the account credentials at `{base}/login`, then submits the
/// photo and caption as a multipart form to `{base}/media/photo`.
pub struct HttpPhotoUploader {
    client: Client,
    base_url: String,
}

impl HttpPhotoUploader {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn login(&self, credentials: &Credentials) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .json(&LoginRequest {
                username: &credentials.username,
                password: &credentials.password,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PosterError::Auth(format!(
                "login rejected for {}",
                credentials.username
            )));
        }
        if !status.is_success() {
            return Err(PosterError::Transport(format!("login failed with HTTP {}", status)));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| PosterError::Parse(format!("Failed to parse login response: {}", e)))?;

        debug!("Logged in as {}", credentials.username);
        Ok(login.token)
    }
}

#[async_trait]
impl PhotoUpload for HttpPhotoUploader {
    async fn upload_photo(&self, path: &Path, caption: &str, credentials: &Credentials) -> Result<String> {
        let token = self.login(credentials).await?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());
        let photo = Part::bytes(bytes).file_name(file_name).mime_str("image/jpeg")?;
        let form = Form::new().part("photo", photo).text("caption", caption.to_string());

        let response = self
            .client
            .post(format!("{}/media/photo", self.base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(PosterError::Auth("upload rejected by destination".to_string()));
        }
        if !status.is_success() {
            return Err(PosterError::Transport(format!("upload failed with HTTP {}", status)));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| PosterError::Parse(format!("Failed to parse upload response: {}", e)))?;

        info!("Uploaded {} as media {}", path.display(), upload.id);
        Ok(upload.id)
    }
}
