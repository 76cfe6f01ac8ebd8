//! Mapping of core errors onto MCP error data

use foreman_core::ForemanError;
use rmcp::ErrorData;

/// Bad arguments become `invalid_params`; everything else is internal.
pub fn to_mcp_error(message: &str, error: &ForemanError) -> ErrorData {
    match error {
        ForemanError::InvalidInput { .. } => {
            ErrorData::invalid_params(format!("{message}: {error}"), None)
        }
        _ => ErrorData::internal_error(format!("{message}: {error}"), None),
    }
}
