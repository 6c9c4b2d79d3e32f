// Clock tool

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, Tool};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};

/// `get_time`: current server time, handy for stamping reports
pub struct GetTimeTool;

#[async_trait::async_trait]
impl Tool for GetTimeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_time".to_string(),
            description: "Get the current server time (UTC, RFC 3339)".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<CallToolResult> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(CallToolResult::structured(serde_json::json!({ "now": now })))
    }
}
