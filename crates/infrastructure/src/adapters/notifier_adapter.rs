//! Notifier adapter - Implements TaskNotifierPort over the instrumented HTTP client

use application::{error::ApplicationError, ports::TaskNotifierPort};
use async_trait::async_trait;
use domain::Task;
use reqwest::Url;
use tracing::{Instrument, field::Empty, info, info_span, warn};

use crate::{
    config::NotifierConfig,
    http::{InstrumentedClientConfig, InstrumentedHttpClient},
};

/// Announces created tasks to an external HTTP endpoint
///
/// Sends `GET <endpoint>?task_id=..&task_title=..` with `X-Task-ID` and
/// `X-Task-Title` headers. A non-2xx answer is logged, not treated as failure.
#[derive(Debug, Clone)]
pub struct HttpTaskNotifier {
    client: InstrumentedHttpClient,
    endpoint: Url,
    service: String,
}

impl HttpTaskNotifier {
    /// Create a notifier from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL or the HTTP
    /// client fails to initialize.
    pub fn new(config: &NotifierConfig) -> Result<Self, ApplicationError> {
        let client = InstrumentedHttpClient::with_config(
            InstrumentedClientConfig::default()
                .with_timeout(config.timeout())
                .with_user_agent(&config.user_agent),
        )
        .map_err(|e| ApplicationError::Internal(e.to_string()))?;
        Self::with_client(client, &config.endpoint)
    }

    /// Create a notifier on an existing client
    pub fn with_client(
        client: InstrumentedHttpClient,
        endpoint: &str,
    ) -> Result<Self, ApplicationError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ApplicationError::Internal(format!("Invalid notifier endpoint '{endpoint}': {e}"))
        })?;
        let service = endpoint.host_str().unwrap_or("unknown").to_owned();
        Ok(Self {
            client,
            endpoint,
            service,
        })
    }

    /// Host reported as `api.service`
    pub fn service(&self) -> &str {
        &self.service
    }
}

#[async_trait]
impl TaskNotifierPort for HttpTaskNotifier {
    async fn task_created(&self, task: &Task) -> Result<(), ApplicationError> {
        let span = info_span!(
            "external.api.notification",
            otel.kind = "internal",
            api.service = %self.service,
            task.id = task.id.as_i64(),
            task.title = %task.title,
            http.method = Empty,
            http.url = Empty,
            http.host = Empty,
            http.status_code = Empty,
            http.status_text = Empty,
            otel.status_code = Empty,
        );

        async {
            let id = task.id.to_string();
            let request = self
                .client
                .get(self.endpoint.clone())
                .query(&[("task_id", id.as_str()), ("task_title", task.title.as_str())])
                .header("X-Task-ID", id.as_str())
                .header("X-Task-Title", task.title.as_str());

            let response = self
                .client
                .send(request)
                .await
                .map_err(|e| ApplicationError::ExternalService(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                info!(status = status.as_u16(), "Task notification delivered");
            } else {
                warn!(
                    status = status.as_u16(),
                    "Notification endpoint answered with non-success status"
                );
            }
            Ok(())
        }
        .instrument(span)
        .await
    }
}
