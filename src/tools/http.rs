use std::time::Duration;

use crate::agent::StepError;
use ureq::Agent;

/// Status and raw body of an HTTP response.
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// POST a JSON body with extra headers. Non-2xx statuses are returned, not
/// turned into errors, so callers can read the error body.
pub fn http_post_json(
    url: &str,
    headers: &[(&str, &str)],
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<HttpReply, StepError> {
    let config = Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();

    let agent: Agent = config.into();

    let mut request = agent.post(url);
    for &(name, value) in headers {
        request = request.header(name, value);
    }

    let mut response = request.send_json(body)?;
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string()?;

    Ok(HttpReply { status, body })
}
