//! Pooled HTTP client for the backup daemon.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::API_V1;
use super::transport::{DaemonRequest, DaemonResponse, DaemonTransport, Method};
use crate::context::RequestContext;
use crate::core::Error;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// [`DaemonTransport`] over a single shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base: Url,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("Invalid backup daemon URL: {base_url}"))?;
        if base.cannot_be_a_base() {
            bail!("Backup daemon URL cannot be used as a base: {base_url}");
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { base, client })
    }

    fn url_for(&self, request: &DaemonRequest) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(API_V1.split('/'))
                .extend(&request.path);
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        url
    }
}

#[async_trait]
impl DaemonTransport for HttpTransport {
    async fn send(
        &self,
        ctx: &RequestContext,
        request: DaemonRequest,
    ) -> Result<DaemonResponse, Error> {
        let url = self.url_for(&request);
        debug!(method = ?request.method, url = %url, "Calling backup daemon");

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Delete => self.client.delete(url),
        }
        .header(REQUEST_ID_HEADER, ctx.request_id());

        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(DaemonResponse {
                status,
                body: body.to_vec(),
            })
        };

        match ctx.run(exchange).await {
            Ok(Ok(response)) => {
                debug!(status = response.status, bytes = response.body.len(), "Backup daemon replied");
                Ok(response)
            }
            Ok(Err(source)) => Err(Error::Transport {
                operation: request.operation,
                request_id: ctx.request_id().to_string(),
                source: Box::new(source),
            }),
            Err(reason) => Err(Error::Interrupted {
                operation: request.operation,
                request_id: ctx.request_id().to_string(),
                reason,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Operation;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn url_is_rooted_at_api_v1() {
        let request = DaemonRequest::new(Operation::SubmitBackup, Method::Post, &["backup"]);

        let url = transport("http://daemon:8080").url_for(&request);
        assert_eq!(url.as_str(), "http://daemon:8080/api/v1/backup");

        let url = transport("http://daemon:8080/base/").url_for(&request);
        assert_eq!(url.as_str(), "http://daemon:8080/base/api/v1/backup");
    }

    #[test]
    fn ids_are_escaped_as_single_segments() {
        let request = DaemonRequest::new(Operation::TrackBackup, Method::Get, &["backup", "a/b c"])
            .with_query(vec![("blobPath", "x/y z".to_string())]);

        let url = transport("http://daemon:8080").url_for(&request);

        assert_eq!(
            url.as_str(),
            "http://daemon:8080/api/v1/backup/a%2Fb%20c?blobPath=x%2Fy+z"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpTransport::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpTransport::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }
}
