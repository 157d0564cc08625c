//! Connection prober: fine-grained diagnostics for "why doesn't this
//! connection work", not just pass/fail.

use std::time::Instant;

use serde::Serialize;

use super::client::WooClient;

/// Step-by-step findings of a probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeDetails {
    /// Unversioned API root answered 2xx
    pub wp_ok: bool,
    /// Versioned API root answered 2xx with credentials attached
    pub wc_ok: bool,
    /// Authenticated principal can read the product listing
    pub products_ok: bool,
    /// Status of the first HTTP response seen, when any arrived
    pub http_status: Option<u16>,
    /// Wall-clock duration of the whole probe
    pub elapsed_ms: u64,
    /// First error encountered, when the probe stopped early
    pub error: Option<String>,
}

/// Probe outcome. `reachable` distinguishes "can't find the server" from
/// "server found, credentials wrong". It stays true whenever any HTTP
/// response arrived, including 401/403.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub reachable: bool,
    pub auth: bool,
    pub details: ProbeDetails,
}

/// Run the 3-step probe: reachability, credential validity, product read
/// scope. Stops early on network failure, recording what was learned;
/// `elapsed_ms` is stamped on every exit path.
pub async fn probe_connection(client: &WooClient) -> ProbeReport {
    let started = Instant::now();
    let mut report = run_steps(client).await;
    report.details.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    report
}

async fn run_steps(client: &WooClient) -> ProbeReport {
    let mut report = ProbeReport::default();

    // Step 1: unauthenticated root. Any HTTP response means reachable,
    // auth-rejecting hosts included.
    match client.fetch_wp_root_status().await {
        Ok(status) => {
            report.reachable = true;
            report.details.http_status = Some(status);
            report.details.wp_ok = (200..300).contains(&status);
        }
        Err(error) => {
            if error.is_auth() {
                report.reachable = true;
            }
            report.details.error = Some(error.to_string());
            return report;
        }
    }

    // Step 2: versioned root with credentials.
    match client.fetch_api_root_status().await {
        Ok(status) => {
            let ok = (200..300).contains(&status);
            report.details.wc_ok = ok;
            report.auth = ok;
            if !ok {
                report.details.error = Some(format!("authenticated API root returned HTTP {status}"));
                return report;
            }
        }
        Err(error) => {
            report.details.error = Some(error.to_string());
            return report;
        }
    }

    // Step 3: minimal product read. Optional; failure is recorded but
    // does not fail the probe.
    match client.get("/products?per_page=1&_fields=id").await {
        Ok(_) => report.details.products_ok = true,
        Err(error) => {
            tracing::debug!(%error, "product read probe failed");
            report.details.error = Some(format!("product listing check failed: {error}"));
        }
    }

    report
}
