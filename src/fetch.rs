use crate::config::{ExtractFormat, FetchMode, LoadedSource, SourceConfig, resolve_path};
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub source_url: String,
    pub body: Vec<u8>,
}

pub fn fetch_source_document(source: &LoadedSource) -> Result<FetchedDocument> {
    match source.config.fetch.mode {
        FetchMode::Http => fetch_http_document(source),
        FetchMode::File => fetch_file_document(source),
        FetchMode::Inline => fetch_inline_document(source),
    }
}

fn fetch_http_document(source: &LoadedSource) -> Result<FetchedDocument> {
    let mut headers = HeaderMap::new();
    for (k, v) in &source.config.fetch.headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .with_context(|| format!("invalid header name {k}"))?;
        let value =
            HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
        headers.insert(name, value);
    }

    if let Some(user_agent) = &source.config.fetch.user_agent {
        headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(source.config.fetch.timeout_secs))
        .default_headers(headers)
        .build()
        .context("failed to build reqwest client")?;

    let base_url = source
        .config
        .fetch
        .base_url
        .as_ref()
        .context("fetch.base_url missing")?;

    let bytes = fetch_with_retries(
        &client,
        base_url,
        source.config.fetch.retry_attempts,
        source.config.fetch.retry_backoff_ms,
    )?;

    info!(
        source = %source.config.source.key,
        bytes = bytes.len(),
        url = %base_url,
        "fetched document"
    );

    Ok(FetchedDocument {
        source_url: base_url.to_string(),
        body: bytes,
    })
}

fn fetch_with_retries(
    client: &Client,
    url: &str,
    retry_attempts: u8,
    retry_backoff_ms: u64,
) -> Result<Vec<u8>> {
    let attempts = retry_attempts.max(1);

    for attempt in 1..=attempts {
        match client.get(url).send() {
            Ok(resp) => {
                if !resp.status().is_success() {
                    let status = resp.status();
                    if attempt == attempts {
                        bail!("request to {url} failed with status {status}");
                    }
                    warn!(%url, %status, attempt, "request failed; retrying");
                } else {
                    return Ok(resp.bytes()?.to_vec());
                }
            }
            Err(err) => {
                if attempt == attempts {
                    return Err(err).with_context(|| format!("request to {url} failed"));
                }
                warn!(%url, attempt, error = %err, "request errored; retrying");
            }
        }

        std::thread::sleep(Duration::from_millis(retry_backoff_ms));
    }

    bail!("request to {url} failed after retries")
}

fn fetch_file_document(source: &LoadedSource) -> Result<FetchedDocument> {
    let file_path = source
        .config
        .fetch
        .file_path
        .as_ref()
        .context("fetch.file_path missing for file mode")?;
    let resolved = resolve_path(&source.path, file_path)?;
    let bytes = std::fs::read(&resolved)
        .with_context(|| format!("failed to read file source {}", resolved.display()))?;

    info!(
        source = %source.config.source.key,
        file = %resolved.display(),
        bytes = bytes.len(),
        "loaded file source"
    );

    Ok(FetchedDocument {
        source_url: format!("file://{}", resolved.display()),
        body: bytes,
    })
}

fn fetch_inline_document(source: &LoadedSource) -> Result<FetchedDocument> {
    let inline = source
        .config
        .fetch
        .inline_data
        .as_ref()
        .context("fetch.inline_data missing for inline mode")?;

    debug!(
        source = %source.config.source.key,
        bytes = inline.len(),
        "loaded inline source"
    );

    Ok(FetchedDocument {
        source_url: format!("inline://{}", source.config.source.key),
        body: inline.as_bytes().to_vec(),
    })
}

pub fn decode_document(source: &SourceConfig, doc: &FetchedDocument) -> String {
    match source.extract.format {
        ExtractFormat::PdfText => match pdf_extract::extract_text_from_mem(&doc.body) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    source = %source.source.key,
                    error = %err,
                    "pdf text extraction failed; falling back to utf8 decode"
                );
                String::from_utf8_lossy(&doc.body).to_string()
            }
        },
        ExtractFormat::Text => String::from_utf8_lossy(&doc.body).to_string(),
    }
}
