//! 工具参数 Schema 与解析（schemars 自动生成）
//!
//! parse_args 把 tool call 的 JSON 参数反序列化为各工具的类型化输入结构，
//! 失败即 InvalidArguments（handler 不会被执行）；tool_call_schema_json 用于
//! 将「合法 tool call」的 JSON 结构注入 system prompt。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::tools::ToolError;

/// 反序列化工具参数；schema 不匹配（缺字段、类型错误、未知字段形态）转 InvalidArguments
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// 由类型导出参数 JSON Schema（各工具 parameters_schema 的实现入口）
pub fn schema_value<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| serde_json::json!({}))
}

/// 工具调用请求格式：与编排器解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，取 Available tools 列表中的 name 字段
    pub tool: String,
    /// 工具参数，依工具不同而不同（date、title、recipient 等）
    pub args: HashMap<String, String>,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct DemoInput {
        /// A date in YYYY-MM-DD format.
        date: String,
    }

    #[test]
    fn test_parse_args_ok() {
        let input: DemoInput = parse_args(serde_json::json!({"date": "2024-03-01"})).unwrap();
        assert_eq!(input.date, "2024-03-01");
    }

    #[test]
    fn test_parse_args_schema_mismatch() {
        let err = parse_args::<DemoInput>(serde_json::json!({"date": 42})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));

        let err = parse_args::<DemoInput>(serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn test_schema_value_lists_fields() {
        let schema = schema_value::<DemoInput>();
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("date"));
    }

    #[test]
    fn test_tool_call_schema_mentions_envelope_fields() {
        let schema = tool_call_schema_json();
        assert!(schema.contains("tool"));
        assert!(schema.contains("args"));
    }
}
