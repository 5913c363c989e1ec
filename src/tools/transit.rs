//! 交通工具：口语车站名 -> 通勤列车出行建议
//!
//! 车站名用 difflib 风格的字符 ratio 做模糊解析（阈值 0.6，取最高分；并列取参考表
//! 靠前者），解析失败返回说明文本。坐标喂给行程规划服务，结果只保留通勤列车
//! （PENDELTÅG）班次，最多两条。

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use similar::TextDiff;

use crate::core::AgentError;
use crate::tools::schema::{parse_args, schema_value};
use crate::tools::{Tool, ToolError};

const DEFAULT_BASE: &str = "https://journeyplanner.integration.sl.se/v1/TravelplannerV3_1";

/// 模糊匹配的最低相似度
const SIMILARITY_CUTOFF: f32 = 0.6;
/// 最多返回的班次数
const MAX_SUGGESTIONS: usize = 2;

/// 参考表中的一座车站
#[derive(Debug, Clone)]
pub struct Station {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// 车站参考表：从 stops.csv（stop_name,stop_lat,stop_lon）加载，顺序即解析时的并列优先序
#[derive(Debug, Clone, Default)]
pub struct StationIndex {
    stations: Vec<Station>,
}

impl StationIndex {
    pub fn from_entries(stations: Vec<Station>) -> Self {
        Self { stations }
    }

    pub fn load(path: &Path) -> Result<Self, AgentError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AgentError::ConfigError(format!("cannot read stops file {}: {}", path.display(), e))
        })?;
        let mut stations = Vec::new();
        for line in content.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.splitn(3, ',');
            let (Some(name), Some(lat), Some(lon)) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>())
            else {
                continue;
            };
            stations.push(Station {
                name: name.trim().to_string(),
                lat,
                lon,
            });
        }
        if stations.is_empty() {
            return Err(AgentError::ConfigError(format!(
                "stops file {} contains no stations",
                path.display()
            )));
        }
        Ok(Self { stations })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// 口语名 -> 相似度最高且不低于阈值的车站
    pub fn resolve(&self, spoken: &str) -> Option<&Station> {
        let wanted = spoken.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        let mut best: Option<(f32, &Station)> = None;
        for station in &self.stations {
            let candidate = station.name.to_lowercase();
            let ratio = TextDiff::from_chars(wanted.as_str(), candidate.as_str()).ratio();
            let better = match best {
                Some((best_ratio, _)) => ratio > best_ratio,
                None => true,
            };
            if better {
                best = Some((ratio, station));
            }
        }
        best.filter(|(ratio, _)| *ratio >= SIMILARITY_CUTOFF)
            .map(|(_, station)| station)
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct GetTravelSuggestionsInput {
    /// The name of the origin station.
    pub origin_station_name: String,
    /// The name of the destination station.
    pub destination_station_name: String,
}

/// get_travel_suggestions：两站之间的通勤列车建议
pub struct GetTravelSuggestionsTool {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    stations: StationIndex,
}

impl GetTravelSuggestionsTool {
    pub fn new(api_key: impl Into<String>, stations: StationIndex, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE.to_string(),
            stations,
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }
}

#[async_trait]
impl Tool for GetTravelSuggestionsTool {
    fn name(&self) -> &str {
        "get_travel_suggestions"
    }

    fn description(&self) -> &str {
        "Get commuter train suggestions between two stations. \
         Args: {\"origin_station_name\": \"...\", \"destination_station_name\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<GetTravelSuggestionsInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: GetTravelSuggestionsInput = parse_args(args)?;

        let Some(origin) = self.stations.resolve(&input.origin_station_name) else {
            return Ok(format!(
                "Error: Station '{}' not found in the database.",
                input.origin_station_name
            ));
        };
        let Some(destination) = self.stations.resolve(&input.destination_station_name) else {
            return Ok(format!(
                "Error: Station '{}' not found in the database.",
                input.destination_station_name
            ));
        };

        let url = format!("{}/trip.json", self.base_url);
        let origin_lat = origin.lat.to_string();
        let origin_lon = origin.lon.to_string();
        let dest_lat = destination.lat.to_string();
        let dest_lon = destination.lon.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("originCoordLat", origin_lat.as_str()),
                ("originCoordLong", origin_lon.as_str()),
                ("destCoordLat", dest_lat.as_str()),
                ("destCoordLong", dest_lon.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Trip request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Failed(format!("Trip API error {}", status)));
        }
        let data: Value = response
            .json()
            .await
            .map_err(|e| ToolError::Failed(format!("Trip response was not JSON: {}", e)))?;

        let mut found = 0;
        let mut suggestions = String::new();
        'trips: for trip in data["Trip"].as_array().into_iter().flatten() {
            for leg in trip["LegList"]["Leg"].as_array().into_iter().flatten() {
                let product = &leg["Product"];
                let is_commuter_train = product["catOut"].as_str() == Some("TRAIN")
                    && product["name"]
                        .as_str()
                        .map(|n| n.contains("PENDELTÅG"))
                        .unwrap_or(false);
                if !is_commuter_train {
                    continue;
                }
                suggestions += &format!(
                    "Line Number (PENDELTÅG): {}\n",
                    product["name"].as_str().unwrap_or_default()
                );
                suggestions += "Train Information:\n";
                suggestions += &format!(
                    "Departure: {}\n",
                    leg["Origin"]["name"].as_str().unwrap_or_default()
                );
                suggestions += &format!(
                    "Destination: {}\n",
                    leg["Destination"]["name"].as_str().unwrap_or_default()
                );
                suggestions += &format!(
                    "Departure Time: {}\n",
                    leg["Origin"]["time"].as_str().unwrap_or_default()
                );
                suggestions += &format!(
                    "Arrival Time: {}\n\n",
                    leg["Destination"]["time"].as_str().unwrap_or_default()
                );
                found += 1;
                if found == MAX_SUGGESTIONS {
                    break 'trips;
                }
            }
        }

        if found == 0 {
            return Ok(format!(
                "No commuter train connections found between {} and {}.",
                origin.name, destination.name
            ));
        }
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn index() -> StationIndex {
        StationIndex::from_entries(vec![
            Station {
                name: "Stockholm City".into(),
                lat: 59.331180,
                lon: 18.061498,
            },
            Station {
                name: "Södertälje centrum".into(),
                lat: 59.194786,
                lon: 17.626696,
            },
            Station {
                name: "Södertälje hamn".into(),
                lat: 59.190827,
                lon: 17.638229,
            },
            Station {
                name: "Flemingsberg".into(),
                lat: 59.218018,
                lon: 17.944126,
            },
        ])
    }

    #[test]
    fn test_fuzzy_resolution_above_cutoff() {
        let index = index();
        let station = index.resolve("Sodertalje C").unwrap();
        assert_eq!(station.name, "Södertälje centrum");
        assert_eq!(index.resolve("stockholm city").unwrap().name, "Stockholm City");
    }

    #[test]
    fn test_nonsense_fails_resolution() {
        let index = index();
        assert!(index.resolve("zzzzz").is_none());
        assert!(index.resolve("").is_none());
    }

    #[test]
    fn test_load_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stop_name,stop_lat,stop_lon").unwrap();
        writeln!(file, "Stockholm City,59.331180,18.061498").unwrap();
        writeln!(file, "Flemingsberg,59.218018,17.944126").unwrap();
        let index = StationIndex::load(file.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.resolve("Flemingsberg").unwrap().lat, 59.218018);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = StationIndex::load(Path::new("/nonexistent/stops.csv")).unwrap_err();
        assert!(matches!(err, AgentError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_unresolved_station_is_message_not_error() {
        let tool = GetTravelSuggestionsTool::new("key", index(), 5);
        let out = tool
            .execute(serde_json::json!({
                "origin_station_name": "zzzzz",
                "destination_station_name": "Stockholm City"
            }))
            .await
            .unwrap();
        assert_eq!(out, "Error: Station 'zzzzz' not found in the database.");
    }

    #[tokio::test]
    async fn test_trip_filtering_caps_at_two_commuter_trains() {
        let server = MockServer::start().await;
        let leg = |name: &str, cat: &str, dep: &str| {
            serde_json::json!({
                "Product": {"catOut": cat, "name": name},
                "Origin": {"name": "Södertälje centrum", "time": dep},
                "Destination": {"name": "Stockholm City", "time": "09:10:00"}
            })
        };
        Mock::given(method("GET"))
            .and(path("/trip.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Trip": [
                    {"LegList": {"Leg": [
                        leg("BUSS 754", "BUS", "08:00:00"),
                        leg("PENDELTÅG 43", "TRAIN", "08:12:00"),
                    ]}},
                    {"LegList": {"Leg": [
                        leg("X2000", "TRAIN", "08:20:00"),
                        leg("PENDELTÅG 44", "TRAIN", "08:27:00"),
                        leg("PENDELTÅG 43", "TRAIN", "08:42:00"),
                    ]}},
                ]
            })))
            .mount(&server)
            .await;

        let tool = GetTravelSuggestionsTool::new("key", index(), 5).with_base_url(server.uri());
        let out = tool
            .execute(serde_json::json!({
                "origin_station_name": "Sodertalje C",
                "destination_station_name": "Stockholm City"
            }))
            .await
            .unwrap();
        assert_eq!(out.matches("Line Number (PENDELTÅG)").count(), 2);
        assert!(out.contains("PENDELTÅG 43"));
        assert!(out.contains("PENDELTÅG 44"));
        assert!(!out.contains("X2000"));
        assert!(!out.contains("BUSS"));
        // 第三条 PENDELTÅG 已超出上限
        assert!(!out.contains("08:42:00"));
    }
}
