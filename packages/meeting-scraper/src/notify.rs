//! Post-publish webhook.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::info;

use crate::error::FetchError;
use crate::types::OutputDocument;

/// Body POSTed after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishNotice {
    pub generated_at: DateTime<FixedOffset>,
    pub meetings: usize,
}

impl From<&OutputDocument> for PublishNotice {
    fn from(doc: &OutputDocument) -> Self {
        Self {
            generated_at: doc.generated_at,
            meetings: doc.len(),
        }
    }
}

/// Tell a downstream publisher that a new document is in place.
pub async fn notify_webhook(
    client: &reqwest::Client,
    url: &str,
    document: &OutputDocument,
) -> Result<(), FetchError> {
    let notice = PublishNotice::from(document);
    let response = client
        .post(url)
        .json(&notice)
        .send()
        .await
        .map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    info!(url = %url, meetings = notice.meetings, "Webhook notified");
    Ok(())
}
