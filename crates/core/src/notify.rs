// crates/core/src/notify.rs
//! Notification sink: deliver a message plus optional attachment to the
//! configured targets.

use std::path::Path;

use async_trait::async_trait;

use crate::error::TimelapseError;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, body: &str, attachment: Option<&Path>) -> Result<(), TimelapseError>;
}

/// Message sent when a video is ready.
pub fn video_ready_message(video: &Path) -> String {
    format!("A new video is created. timelapse_path={}", video.display())
}

/// POSTs a multipart form (`body` text + `attachment` file) to every target.
///
/// Every target is attempted; failures are logged per target and reported
/// together once all attempts are done.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    targets: Vec<String>,
}

impl WebhookNotifier {
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            targets,
        }
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    async fn post(&self, target: &str, body: &str, file: Option<&(String, Vec<u8>)>) -> Result<(), String> {
        let mut form = reqwest::multipart::Form::new().text("body", body.to_string());
        if let Some((name, bytes)) = file {
            let part = reqwest::multipart::Part::bytes(bytes.clone())
                .file_name(name.clone())
                .mime_str("video/mp4")
                .map_err(|e| e.to_string())?;
            form = form.part("attachment", part);
        }

        let response = self
            .client
            .post(target)
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("target answered {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, body: &str, attachment: Option<&Path>) -> Result<(), TimelapseError> {
        if self.targets.is_empty() {
            tracing::debug!("No notification targets configured");
            return Ok(());
        }

        let file = match attachment {
            Some(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| TimelapseError::io(path, e))?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "timelapse.mp4".into());
                Some((name, bytes))
            }
            None => None,
        };

        let mut failures = Vec::new();
        for target in &self.targets {
            match self.post(target, body, file.as_ref()).await {
                Ok(()) => tracing::info!(target = %target, "Notification sent"),
                Err(e) => {
                    tracing::error!(target = %target, error = %e, "Notification failed");
                    failures.push(format!("{target}: {e}"));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TimelapseError::Notify(failures.join("; ")))
        }
    }
}
