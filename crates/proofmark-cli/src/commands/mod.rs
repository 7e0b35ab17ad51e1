//! One module per subcommand.

pub mod info;
pub mod stamp;
pub mod status;
pub mod upgrade;
pub mod verify;

use std::sync::Arc;

use anyhow::Result;
use proofmark_core::adapter::{HttpClient, ReqwestHttpClient};

/// Builds the production HTTP client.
pub fn http_client() -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(ReqwestHttpClient::new()?))
}

/// Prints a serializable value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
