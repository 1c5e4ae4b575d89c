//! Scenario-based call placement over the telephony platform HTTP API

use std::time::Duration;

use async_trait::async_trait;
use cold_call_config::TelephonyConfig;
use cold_call_core::{CallPlacement, CollaboratorError, Telephony};
use serde_json::{json, Value};
use uuid::Uuid;

/// Starts the outbound call scenario with `StartScenarios`
pub struct HttpTelephony {
    client: reqwest::Client,
    config: TelephonyConfig,
    api_key: String,
    /// Opening line handed to the scenario
    greeting: String,
}

impl HttpTelephony {
    pub fn new(config: TelephonyConfig, greeting: impl Into<String>) -> Result<Self, CollaboratorError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CollaboratorError::NotConfigured("telephony.api_key".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CollaboratorError::Network(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_key,
            greeting: greeting.into(),
        })
    }

    fn url(&self) -> String {
        format!("{}/StartScenarios/", self.config.endpoint.trim_end_matches('/'))
    }

    fn form(&self, phone_number: &str, call_id: &str) -> Vec<(&'static str, String)> {
        let custom_data = json!({
            "call_id": call_id,
            "phone_number": phone_number,
            "language": self.config.language,
            "greeting": self.greeting,
            "webhook_url": self.config.webhook_url,
        });

        let mut form = vec![
            ("account_id", self.config.account_id.clone()),
            ("api_key", self.api_key.clone()),
            ("application_id", self.config.application_id.clone()),
            ("phone", phone_number.trim_start_matches('+').to_string()),
            ("scenario_name", self.config.scenario_name.clone()),
            ("script_custom_data", custom_data.to_string()),
        ];

        match (&self.config.rule_name, self.config.rule_id) {
            (Some(name), _) if !name.trim().is_empty() => form.push(("rule_name", name.clone())),
            (_, Some(id)) => form.push(("rule_id", id.to_string())),
            _ => {}
        }

        form
    }
}

/// The platform answers 200 with either `result` or an `error` object
fn check_response(body: &Value) -> Result<(), CollaboratorError> {
    match body.get("result") {
        Some(result) if !result.is_null() && result != &Value::Bool(false) && result != &json!(0) => {
            Ok(())
        }
        _ => {
            let message = body
                .get("error")
                .map(|error| {
                    error
                        .get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_else(|| error.to_string())
                })
                .unwrap_or_else(|| body.to_string());
            Err(CollaboratorError::Rejected(message))
        }
    }
}

fn map_reqwest(err: reqwest::Error) -> CollaboratorError {
    if err.is_timeout() {
        CollaboratorError::Timeout
    } else {
        CollaboratorError::Network(err.to_string())
    }
}

#[async_trait]
impl Telephony for HttpTelephony {
    async fn place_call(&self, phone_number: &str) -> cold_call_core::Result<CallPlacement> {
        let call_id = format!("call_{}", Uuid::new_v4().simple());

        tracing::info!(
            call_id = %call_id,
            scenario = %self.config.scenario_name,
            "Starting call scenario"
        );

        let response = self
            .client
            .post(self.url())
            .form(&self.form(phone_number, &call_id))
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest)?;

        if !status.is_success() {
            tracing::warn!(call_id = %call_id, status = %status, "Call scenario request failed");
            return Err(CollaboratorError::Rejected(format!("HTTP {}: {}", status, text)));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        check_response(&body)?;

        tracing::info!(call_id = %call_id, "Call scenario started");
        Ok(CallPlacement { call_id })
    }
}
