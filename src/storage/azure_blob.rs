// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Azure Blob Storage client
//!
//! Speaks the Blob REST API directly. Connection strings may authenticate
//! with a shared access signature or with the account key (SharedKey
//! request signing).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, RequestBuilder};
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use super::{is_pdf, BlobError, BlobStore};
use crate::config::BlobConfig;

const STORAGE_API_VERSION: &str = "2021-08-06";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq)]
enum Credential {
    Sas(String),
    SharedKey { account: String, key: Vec<u8> },
}

/// Parsed storage connection string
#[derive(Debug, Clone, PartialEq)]
struct ConnectionString {
    blob_endpoint: Url,
    credential: Credential,
}

impl ConnectionString {
    fn parse(raw: &str) -> Result<Self, BlobError> {
        let mut blob_endpoint = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut sas = None;
        let mut protocol = "https".to_string();
        let mut suffix = DEFAULT_ENDPOINT_SUFFIX.to_string();

        for part in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                BlobError::InvalidConnectionString(format!("malformed segment '{}'", part))
            })?;
            match key {
                "BlobEndpoint" => blob_endpoint = Some(value.to_string()),
                "AccountName" => account_name = Some(value.to_string()),
                "AccountKey" => account_key = Some(value.to_string()),
                "SharedAccessSignature" => {
                    sas = Some(value.trim_start_matches('?').to_string())
                }
                "DefaultEndpointsProtocol" => protocol = value.to_string(),
                "EndpointSuffix" => suffix = value.to_string(),
                _ => {}
            }
        }

        let endpoint = match (blob_endpoint, &account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(account)) => format!("{}://{}.blob.{}", protocol, account, suffix),
            (None, None) => {
                return Err(BlobError::InvalidConnectionString(
                    "needs BlobEndpoint or AccountName".to_string(),
                ))
            }
        };
        let mut blob_endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| BlobError::InvalidConnectionString(e.to_string()))?;
        blob_endpoint.set_query(None);

        let credential = match (sas, account_name, account_key) {
            (Some(sas), _, _) => Credential::Sas(sas),
            (None, Some(account), Some(key)) => Credential::SharedKey {
                account,
                key: BASE64.decode(key.as_bytes()).map_err(|e| {
                    BlobError::InvalidConnectionString(format!("AccountKey: {}", e))
                })?,
            },
            _ => {
                return Err(BlobError::InvalidConnectionString(
                    "needs SharedAccessSignature or AccountName with AccountKey".to_string(),
                ))
            }
        };

        Ok(Self {
            blob_endpoint,
            credential,
        })
    }
}

/// Azure Blob Storage container holding source PDFs
pub struct AzureBlobStore {
    client: Client,
    connection: ConnectionString,
    container: String,
}

impl AzureBlobStore {
    pub fn new(config: &BlobConfig, timeout: Duration) -> Result<Self, BlobError> {
        let connection = ConnectionString::parse(&config.connection_string).map_err(|e| {
            error!("Failed to initialize AzureBlobStore: {}", e);
            e
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BlobError::Unreachable(e.to_string()))?;

        info!("AzureBlobStore initialized for container {}.", config.container);
        Ok(Self {
            client,
            connection,
            container: config.container.clone(),
        })
    }

    fn url(&self, blob: Option<&str>, query: &[(&str, &str)]) -> Result<Url, BlobError> {
        let mut url = self.connection.blob_endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                BlobError::InvalidConnectionString("endpoint cannot be a base URL".to_string())
            })?;
            segments.pop_if_empty().push(&self.container);
            if let Some(blob) = blob {
                segments.extend(blob.split('/'));
            }
        }
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    fn authorized_get(&self, mut url: Url) -> Result<RequestBuilder, BlobError> {
        match &self.connection.credential {
            Credential::Sas(sas) => {
                let query = match url.query() {
                    Some(existing) if !existing.is_empty() => format!("{}&{}", existing, sas),
                    _ => sas.clone(),
                };
                url.set_query(Some(&query));
                Ok(self.client.get(url))
            }
            Credential::SharedKey { account, key } => {
                let date = chrono::Utc::now()
                    .format("%a, %d %b %Y %H:%M:%S GMT")
                    .to_string();
                let string_to_sign = shared_key_string_to_sign("GET", &url, account, &date);
                let mut mac = HmacSha256::new_from_slice(key)
                    .map_err(|e| BlobError::InvalidConnectionString(e.to_string()))?;
                mac.update(string_to_sign.as_bytes());
                let signature = BASE64.encode(mac.finalize().into_bytes());

                Ok(self
                    .client
                    .get(url)
                    .header("x-ms-date", date)
                    .header("x-ms-version", STORAGE_API_VERSION)
                    .header("Authorization", format!("SharedKey {}:{}", account, signature)))
            }
        }
    }

    async fn list_page(&self, marker: Option<&str>) -> Result<String, BlobError> {
        let mut query = vec![("restype", "container"), ("comp", "list")];
        if let Some(marker) = marker {
            query.push(("marker", marker));
        }

        let response = self
            .authorized_get(self.url(None, &query)?)?
            .send()
            .await
            .map_err(|e| BlobError::Unreachable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BlobError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(BlobError::Unreachable(format!(
                "listing returned {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(body)
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn list_pdfs(&self) -> Result<Vec<String>, BlobError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let body = self.list_page(marker.as_deref()).await.map_err(|e| {
                error!("Error listing PDF blobs: {}", e);
                e
            })?;

            let page = parse_listing(&body).map_err(|e| {
                error!("Error listing PDF blobs: {}", e);
                e
            })?;
            names.extend(page.names.into_iter().filter(|name| is_pdf(name)));

            marker = page.next_marker;
            if marker.is_none() {
                break;
            }
            debug!("Continuing blob listing after marker");
        }

        info!("Found {} PDF blobs in the container.", names.len());
        Ok(names)
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>, BlobError> {
        let download_failed = |reason: String| {
            error!("Error retrieving blob stream for {}: {}", name, reason);
            BlobError::DownloadFailed {
                name: name.to_string(),
                reason,
            }
        };

        let response = self
            .authorized_get(self.url(Some(name), &[])?)?
            .send()
            .await
            .map_err(|e| download_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(download_failed(format!("status {}", status.as_u16())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_failed(e.to_string()))?;
        if bytes.is_empty() {
            error!("Error retrieving blob stream for {}: Blob is empty.", name);
            return Err(BlobError::EmptyBlob(name.to_string()));
        }

        info!("Successfully retrieved stream for blob: {}", name);
        Ok(bytes.to_vec())
    }
}

/// SharedKey string-to-sign for a body-less request
fn shared_key_string_to_sign(verb: &str, url: &Url, account: &str, date: &str) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
        .collect();
    params.sort();

    let mut resource = format!("/{}{}", account, url.path());
    for (key, value) in params {
        resource.push_str(&format!("\n{}:{}", key, value));
    }

    // Eleven empty standard headers between the verb and the x-ms headers
    format!(
        "{}\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{}\nx-ms-version:{}\n{}",
        verb, date, STORAGE_API_VERSION, resource
    )
}

const BLOB_NAME_PATH: [&str; 4] = ["EnumerationResults", "Blobs", "Blob", "Name"];
const NEXT_MARKER_PATH: [&str; 2] = ["EnumerationResults", "NextMarker"];

/// One page of a container listing
#[derive(Debug, Default, PartialEq)]
struct ListingPage {
    names: Vec<String>,
    next_marker: Option<String>,
}

/// Parse a List Blobs response body
fn parse_listing(xml: &str) -> Result<ListingPage, BlobError> {
    let mut reader = Reader::from_str(xml);
    let mut page = ListingPage::default();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                path.push(String::from_utf8_lossy(e.name().as_ref()).to_string());
                text.clear();
            }
            Ok(Event::Text(e)) => {
                let unescaped = e.unescape().map_err(malformed_listing)?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                if path == BLOB_NAME_PATH {
                    page.names.push(std::mem::take(&mut text));
                } else if path == NEXT_MARKER_PATH && !text.is_empty() {
                    page.next_marker = Some(std::mem::take(&mut text));
                }
                path.pop();
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed_listing(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(page)
}

fn malformed_listing(e: impl std::fmt::Display) -> BlobError {
    BlobError::Unreachable(format!("malformed listing response: {}", e))
}
