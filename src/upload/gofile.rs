// src/upload/gofile.rs — GoFile public upload host (no account needed)
//
// Two calls: GET /servers to pick an upload server, then a multipart POST
// of the file to that server. The response carries the download page URL.

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::infra::config::GofileConfig;
use crate::infra::errors::{CiError, CiResult};
use crate::upload::Uploader;
use crate::util;

const SERVERS_TIMEOUT: Duration = Duration::from_secs(30);
/// ROM archives are several GiB.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Deserialize, Debug)]
struct ServerEntry {
    name: String,
}

#[derive(Deserialize, Debug)]
struct ServerList {
    servers: Vec<ServerEntry>,
}

#[derive(Deserialize, Debug)]
struct UploadedFile {
    #[serde(rename = "downloadPage")]
    download_page: String,
}

#[derive(Deserialize, Debug)]
struct GofileResponse<T> {
    status: String,
    data: Option<T>,
}

impl<T> GofileResponse<T> {
    fn into_data(self, what: &str) -> CiResult<T> {
        if self.status != "ok" {
            return Err(CiError::Gofile(format!(
                "{what} returned non-ok status: {}",
                self.status
            )));
        }
        self.data
            .ok_or_else(|| CiError::Gofile(format!("{what} response has no data")))
    }
}

pub struct GofileUploader {
    client: Client,
    api_base: String,
}

impl GofileUploader {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
        }
    }

    pub fn from_config(cfg: &GofileConfig) -> Self {
        Self::new(cfg.api_base.trim_end_matches('/'))
    }

    async fn pick_server(&self) -> CiResult<String> {
        let resp: GofileResponse<ServerList> = self
            .client
            .get(format!("{}/servers", self.api_base))
            .timeout(SERVERS_TIMEOUT)
            .send()
            .await?
            .json()
            .await?;
        let server = resp
            .into_data("/servers")?
            .servers
            .into_iter()
            .next()
            .ok_or_else(|| CiError::Gofile("no servers available".into()))?;
        Ok(server.name)
    }

    async fn upload(&self, path: &Path) -> CiResult<String> {
        let size = tokio::fs::metadata(path).await?.len();
        println!(
            "📤 Uploading via GoFile: {} ({:.2} MB)",
            util::file_name(path),
            util::size_mb(size)
        );

        println!("Getting server...");
        let server = self.pick_server().await?;
        println!("Server: {server}");

        println!("Uploading to GoFile (this may take a while)...");
        let form = Form::new().part("file", util::file_part(path).await?);
        let resp: GofileResponse<UploadedFile> = self
            .client
            .post(upload_url(&server))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        let uploaded = resp.into_data("uploadfile")?;
        println!("✅ Upload complete!");
        Ok(uploaded.download_page)
    }
}

/// Upload endpoint on a specific GoFile server.
pub fn upload_url(server: &str) -> String {
    format!("https://{server}.gofile.io/contents/uploadfile")
}

#[async_trait]
impl Uploader for GofileUploader {
    fn name(&self) -> &str {
        "gofile"
    }

    async fn try_upload(&self, path: &Path) -> Option<String> {
        match self.upload(path).await {
            Ok(url) => Some(url),
            Err(e) => {
                println!("❌ Error: {e}");
                None
            }
        }
    }
}
