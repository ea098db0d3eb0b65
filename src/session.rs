//! Browser automation session for sources that require client-side
//! execution before their API is reachable.
//!
//! The session drives headless Chromium through Playwright scripts run via
//! `node -e` as a subprocess. Opening the session navigates to the source's
//! entry page once and captures its cookies; that cookie string is the
//! authentication state every subsequent synthetic request reuses. The
//! session handle is owned by the adapter and scoped to one source run.

use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::errors::{AdapterError, SetupError};

/// A long-lived automation session with captured cookie state.
pub struct BrowserSession {
    entry_url: String,
    cookies: String,
}

impl BrowserSession {
    /// Navigate to the entry URL in headless Chromium and capture the
    /// resulting cookies. Failure here is fatal setup: without a session
    /// the dynamic source cannot be crawled at all.
    #[instrument(level = "info", skip_all, fields(%entry_url))]
    pub async fn open(entry_url: &str) -> Result<Self, SetupError> {
        let script = format!(
            r#"
            const {{ chromium }} = require('playwright');
            (async () => {{
                const browser = await chromium.launch({{ headless: true }});
                const page = await browser.newPage();
                await page.goto('{entry_url}', {{ waitUntil: 'networkidle', timeout: 60000 }});
                const cookies = await page.context().cookies();
                console.log(JSON.stringify(cookies.map(c => `${{c.name}}=${{c.value}}`).join('; ')));
                await browser.close();
            }})();
            "#
        );

        let output = Command::new("node")
            .arg("-e")
            .arg(&script)
            .output()
            .await
            .map_err(|e| SetupError::Session(format!("failed to launch node: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SetupError::Session(format!(
                "entry navigation failed: {stderr}"
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let cookies: String = serde_json::from_str(stdout.trim())
            .map_err(|e| SetupError::Session(format!("unexpected cookie output: {e}")))?;

        info!(cookie_count = cookies.split(';').count(), "Browser session opened");
        Ok(Self {
            entry_url: entry_url.to_string(),
            cookies,
        })
    }

    /// The cookie string captured when the session was opened.
    pub fn cookies(&self) -> &str {
        &self.cookies
    }

    pub fn entry_url(&self) -> &str {
        &self.entry_url
    }

    /// Run a Playwright script and parse its stdout as JSON.
    ///
    /// Script failures are transient from the driver's point of view: the
    /// same position is retried under the usual cap.
    #[instrument(level = "debug", skip_all)]
    pub async fn run_script(&self, script: &str) -> Result<serde_json::Value, AdapterError> {
        let output = Command::new("node")
            .arg("-e")
            .arg(script)
            .output()
            .await
            .map_err(|e| AdapterError::Automation(format!("failed to launch node: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AdapterError::Automation(stderr.into_owned()));
        }

        debug!(bytes = output.stdout.len(), "Script produced output");
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
