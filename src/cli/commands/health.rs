use crate::cli::client::{error_message, ApiClient};
use crate::cli::utils::output;
use crate::cli::OutputFormat;

pub async fn handle(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let (status, body) = client.get("/api/health", &[]).await?;
    if !status.is_success() && body.get("status").is_none() {
        return Err(error_message(status, &body));
    }

    output(output_format, &body, || {
        let mut line = format!(
            "{} {} (database: {})",
            if status.is_success() { "✓" } else { "✗" },
            client.url("/api/health"),
            body["database"].as_str().unwrap_or("unknown")
        );
        if let Some(error) = body["error"].as_str() {
            line.push_str(&format!("\n  {}", error));
        }
        line
    })?;

    if status.is_success() {
        Ok(())
    } else {
        anyhow::bail!("API reported {}", body["status"].as_str().unwrap_or("unhealthy"))
    }
}
