//! IPFS daemon client over the RPC HTTP API (`/api/v0`)

use crate::{DirectoryEntry, DirectoryStat, EntryKind, Ipfs, IpfsSettings, PinningService};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

/// Pin statuses that count as "already pinned" when checking the remote service
const PINNED_STATUSES: [&str; 3] = ["queued", "pinning", "pinned"];

/// IPFS client talking to a daemon's RPC API
pub struct HttpIpfs {
    client: Client,
    api_url: String,
    pinning_service: Option<PinningService>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Deserialize)]
struct VersionResponse {
    #[serde(rename = "Version")]
    version: String,
}

#[derive(Deserialize)]
struct FilesLsResponse {
    #[serde(rename = "Entries")]
    entries: Option<Vec<RawEntry>>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    kind: u8,
    #[serde(rename = "Size", default)]
    size: u64,
    #[serde(rename = "Hash", default)]
    hash: String,
}

#[derive(Deserialize)]
struct FilesStatResponse {
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Size", default)]
    size: u64,
    #[serde(rename = "CumulativeSize", default)]
    cumulative_size: u64,
    #[serde(rename = "Blocks", default)]
    blocks: u64,
}

#[derive(Deserialize)]
struct RemoteServicesResponse {
    #[serde(rename = "RemoteServices")]
    remote_services: Option<Vec<RemoteService>>,
}

#[derive(Deserialize)]
struct RemoteService {
    #[serde(rename = "Service")]
    service: String,
}

impl From<RawEntry> for DirectoryEntry {
    fn from(raw: RawEntry) -> Self {
        // files/ls reports 1 for directories and 0 for files
        let kind = if raw.kind == 1 {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        DirectoryEntry {
            name: raw.name,
            kind,
            cid: raw.hash,
            size: raw.size,
        }
    }
}

impl TryFrom<FilesStatResponse> for DirectoryStat {
    type Error = anyhow::Error;

    fn try_from(raw: FilesStatResponse) -> Result<Self> {
        let kind = match raw.kind.as_str() {
            "directory" => EntryKind::Directory,
            "file" => EntryKind::File,
            other => anyhow::bail!("Unknown entry type in files/stat response: {}", other),
        };
        Ok(DirectoryStat {
            cid: raw.hash,
            kind,
            size: raw.size,
            cumulative_size: raw.cumulative_size,
            blocks: raw.blocks,
        })
    }
}

impl HttpIpfs {
    pub fn new(settings: &IpfsSettings) -> Self {
        Self {
            client: Client::new(),
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            pinning_service: settings.pinning_service.clone(),
        }
    }

    /// Build a client and check that the daemon answers
    pub async fn connect(settings: &IpfsSettings) -> Result<Self> {
        let ipfs = Self::new(settings);
        let version = ipfs
            .version()
            .await
            .with_context(|| format!("Failed to reach IPFS daemon at {}", ipfs.api_url))?;
        info!("Connected to IPFS daemon {} (version {})", ipfs.api_url, version);
        Ok(ipfs)
    }

    /// Daemon version string
    pub async fn version(&self) -> Result<String> {
        let response = self.call("version", &[]).await?;
        let body: VersionResponse = decode(response, "version").await?;
        Ok(body.version)
    }

    fn endpoint(&self, command: &str) -> String {
        format!("{}/api/v0/{}", self.api_url, command)
    }

    async fn call(&self, command: &str, query: &[(&str, &str)]) -> Result<Response> {
        debug!(command, "IPFS RPC call");
        let response = self
            .client
            .post(self.endpoint(command))
            .query(query)
            .send()
            .await
            .with_context(|| format!("IPFS {} request failed", command))?;
        check_status(response, command).await
    }

    fn pinning_service(&self) -> Result<&PinningService> {
        let service = self
            .pinning_service
            .as_ref()
            .ok_or_else(|| anyhow!("No pinning service configured. Unable to pin."))?;
        service.validate()?;
        Ok(service)
    }

    /// Register the pinning service with the daemon unless it already knows it
    async fn configure_pinning_service(&self) -> Result<&PinningService> {
        let service = self.pinning_service()?;

        let response = self.call("pin/remote/service/ls", &[]).await?;
        let registered: RemoteServicesResponse =
            decode(response, "pin/remote/service/ls").await?;
        let known = registered
            .remote_services
            .unwrap_or_default()
            .iter()
            .any(|s| s.service == service.name);

        if !known {
            info!("Registering pinning service {} at {}", service.name, service.endpoint);
            self.call(
                "pin/remote/service/add",
                &[
                    ("arg", service.name.as_str()),
                    ("arg", service.endpoint.as_str()),
                    ("arg", service.key.as_str()),
                ],
            )
            .await?;
        }

        Ok(service)
    }
}

#[async_trait]
impl Ipfs for HttpIpfs {
    async fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let response = self
            .call("files/ls", &[("arg", path), ("long", "true")])
            .await?;
        let body: FilesLsResponse = decode(response, "files/ls").await?;
        Ok(body
            .entries
            .unwrap_or_default()
            .into_iter()
            .map(DirectoryEntry::from)
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<DirectoryStat> {
        let response = self.call("files/stat", &[("arg", path)]).await?;
        let body: FilesStatResponse = decode(response, "files/stat").await?;
        body.try_into()
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let part = multipart::Part::bytes(content.to_vec()).file_name("data");
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("files/write"))
            .query(&[("arg", path), ("create", "true"), ("truncate", "true")])
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("IPFS files/write request failed for {}", path))?;
        check_status(response, "files/write").await?;
        Ok(())
    }

    async fn cat(&self, cid: &str) -> Result<Vec<u8>> {
        let response = self.call("cat", &[("arg", cid)]).await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read content of {}", cid))?;
        Ok(bytes.to_vec())
    }

    async fn pin(&self, cid: &str) -> Result<()> {
        let service = self.configure_pinning_service().await?;

        // Avoid a "duplicate pin" error from the remote service
        if self.is_pinned(cid).await? {
            info!("{} is already pinned on {}", cid, service.name);
            return Ok(());
        }

        self.call(
            "pin/remote/add",
            &[("arg", cid), ("service", service.name.as_str())],
        )
        .await?;
        info!("Pinned {} on {}", cid, service.name);
        Ok(())
    }

    async fn is_pinned(&self, cid: &str) -> Result<bool> {
        let service = self.pinning_service()?;

        let mut query = vec![("service", service.name.as_str()), ("cid", cid)];
        query.extend(PINNED_STATUSES.iter().map(|status| ("status", *status)));

        let response = self.call("pin/remote/ls", &query).await?;
        let body = response
            .text()
            .await
            .context("Failed to read pin/remote/ls response")?;
        // One JSON object per line, one line per matching pin
        Ok(body.lines().any(|line| !line.trim().is_empty()))
    }
}

/// Turn a non-success response into an error carrying the daemon's message
async fn check_status(response: Response, command: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.message)
        .unwrap_or(text);
    Err(anyhow!("IPFS {} failed ({}): {}", command, status, message))
}

async fn decode<T: DeserializeOwned>(response: Response, command: &str) -> Result<T> {
    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to read IPFS {} response", command))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Unexpected IPFS {} response: {}", command, text))
}
