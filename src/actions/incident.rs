use anyhow::Result;
use serde::Serialize;

use crate::{config::ActionRoute, platform::Location};

const UNKNOWN_LOCATION: &str = "Unknown location";

/// Body of `POST /incidents`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IncidentReport {
    #[serde(rename = "Type")]
    pub incident_type: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: String,
    pub user_id: Option<String>,
}

impl IncidentReport {
    pub fn new(
        route: &ActionRoute,
        status: &str,
        location: Option<&Location>,
        user_id: Option<&str>,
    ) -> Self {
        Self {
            incident_type: route.incident_type.to_string(),
            location: location_text(location),
            latitude: location.map(|loc| loc.latitude),
            longitude: location.map(|loc| loc.longitude),
            status: status.to_string(),
            user_id: user_id.map(str::to_string),
        }
    }
}

fn location_text(location: Option<&Location>) -> String {
    match location {
        Some(Location {
            address: Some(address),
            ..
        }) if !address.trim().is_empty() => address.clone(),
        Some(loc) => format!("{:.6}, {:.6}", loc.latitude, loc.longitude),
        None => UNKNOWN_LOCATION.to_string(),
    }
}

/// Best-effort incident sink. `report` must not block on the network.
pub trait IncidentReporterOps {
    fn report(&mut self, report: IncidentReport) -> Result<()>;
}

#[cfg(feature = "http-incidents")]
pub use http::HttpIncidentReporter;

#[cfg(feature = "http-incidents")]
mod http {
    use std::{thread, time::Duration};

    use anyhow::{anyhow, Context, Result};
    use reqwest::blocking::Client;

    use super::{IncidentReport, IncidentReporterOps};

    /// Posts each report from its own detached thread.
    #[derive(Clone, Debug)]
    pub struct HttpIncidentReporter {
        client: Client,
        endpoint: String,
    }

    impl HttpIncidentReporter {
        pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .connect_timeout(timeout.min(Duration::from_secs(4)))
                .build()?;
            Ok(Self {
                client,
                endpoint: incidents_url(base_url),
            })
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    impl IncidentReporterOps for HttpIncidentReporter {
        fn report(&mut self, report: IncidentReport) -> Result<()> {
            let body = serde_json::to_vec(&report).context("failed to encode incident")?;
            let client = self.client.clone();
            let url = self.endpoint.clone();
            thread::Builder::new()
                .name("incident-post".to_string())
                .spawn(move || match post(&client, &url, body) {
                    Ok(()) => log::info!("incident: posted type={}", report.incident_type),
                    Err(err) => log::warn!("incident: post_failed err={err:#}"),
                })
                .context("failed to spawn incident thread")?;
            Ok(())
        }
    }

    fn post(client: &Client, url: &str, body: Vec<u8>) -> Result<()> {
        let resp = client
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .with_context(|| format!("POST {url} send failed"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(anyhow!("POST {url} failed: {status} {text}"));
        }
        Ok(())
    }

    pub(super) fn incidents_url(base_url: &str) -> String {
        format!("{}/incidents", base_url.trim_end_matches('/'))
    }
}
