//! 位置工具
//!
//! 坐标来自会话能力（UI 侧定位授权后注入），构建时不存在则整个工具不注册。

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{Tool, ToolError};

/// get_current_location：报告会话坐标
pub struct GetCurrentLocationTool {
    latitude: f64,
    longitude: f64,
}

impl GetCurrentLocationTool {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[async_trait]
impl Tool for GetCurrentLocationTool {
    fn name(&self) -> &str {
        "get_current_location"
    }

    fn description(&self) -> &str {
        "Get the user's current location."
    }

    async fn execute(&self, _args: Value) -> Result<String, ToolError> {
        Ok(format!(
            "The user is currently at latitude {:.5}, longitude {:.5}.",
            self.latitude, self.longitude
        ))
    }
}
