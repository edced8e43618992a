use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

use super::types::ExecutionGroup;

/// 竞价请求生命周期阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Entrypoint,
    RawAuctionRequest,
    ProcessedAuctionRequest,
    BidderRequest,
    RawBidderResponse,
    ProcessedBidderResponse,
    AllProcessedBidResponses,
    AuctionResponse,
    Exitpoint,
}

impl Stage {
    /// 按生命周期顺序排列的全部阶段
    pub const ALL: [Stage; 9] = [
        Stage::Entrypoint,
        Stage::RawAuctionRequest,
        Stage::ProcessedAuctionRequest,
        Stage::BidderRequest,
        Stage::RawBidderResponse,
        Stage::ProcessedBidderResponse,
        Stage::AllProcessedBidResponses,
        Stage::AuctionResponse,
        Stage::Exitpoint,
    ];

    /// 该阶段是否允许 Hook 拒绝
    pub fn reject_allowed(&self) -> bool {
        !matches!(
            self,
            Stage::AllProcessedBidResponses | Stage::AuctionResponse | Stage::Exitpoint
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Entrypoint => "entrypoint",
            Stage::RawAuctionRequest => "raw-auction-request",
            Stage::ProcessedAuctionRequest => "processed-auction-request",
            Stage::BidderRequest => "bidder-request",
            Stage::RawBidderResponse => "raw-bidder-response",
            Stage::ProcessedBidderResponse => "processed-bidder-response",
            Stage::AllProcessedBidResponses => "all-processed-bid-responses",
            Stage::AuctionResponse => "auction-response",
            Stage::Exitpoint => "exitpoint",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| EngineError::configuration(format!("unknown hook stage: {s}")))
    }
}

/// 单个阶段的执行计划
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageExecutionPlan {
    pub groups: Vec<ExecutionGroup>,
}

/// 单个端点的执行计划
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointExecutionPlan {
    #[serde(
        deserialize_with = "deserialize_stages",
        serialize_with = "serialize_stages"
    )]
    pub stages: HashMap<Stage, StageExecutionPlan>,
}

/// 执行计划：端点 → 阶段 → 执行组
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionPlan {
    pub endpoints: HashMap<String, EndpointExecutionPlan>,
}

impl ExecutionPlan {
    pub fn from_json_str(content: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        Ok(toml::from_str(content)?)
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// 获取指定端点、阶段的执行组，不存在时返回空
    pub fn groups_for(&self, endpoint: &str, stage: Stage) -> &[ExecutionGroup] {
        self.endpoints
            .get(endpoint)
            .and_then(|plan| plan.stages.get(&stage))
            .map(|plan| plan.groups.as_slice())
            .unwrap_or(&[])
    }

    /// 合并执行计划：同一端点、阶段下先执行本计划的组，再执行 `other` 的组
    pub fn merged_with(&self, other: &ExecutionPlan) -> ExecutionPlan {
        let mut merged = self.clone();
        for (endpoint, endpoint_plan) in &other.endpoints {
            let target = merged.endpoints.entry(endpoint.clone()).or_default();
            for (stage, stage_plan) in &endpoint_plan.stages {
                target
                    .stages
                    .entry(*stage)
                    .or_default()
                    .groups
                    .extend(stage_plan.groups.iter().cloned());
            }
        }
        merged
    }

    /// 计划中引用的全部模块编码
    pub fn module_codes(&self) -> BTreeSet<String> {
        self.groups()
            .flat_map(|group| group.hook_sequence.iter())
            .map(|hook_id| hook_id.module_code.clone())
            .collect()
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        for (endpoint, endpoint_plan) in &self.endpoints {
            if endpoint.trim().is_empty() {
                return Err(EngineError::configuration("endpoint cannot be empty"));
            }
            for (stage, stage_plan) in &endpoint_plan.stages {
                for (index, group) in stage_plan.groups.iter().enumerate() {
                    if group.timeout_ms == 0 {
                        return Err(EngineError::configuration(format!(
                            "group #{index} of {endpoint}/{stage} must have a positive timeout"
                        )));
                    }
                    if let Some(hook_id) = group.hook_sequence.iter().find(|hook_id| {
                        hook_id.module_code.trim().is_empty()
                            || hook_id.hook_impl_code.trim().is_empty()
                    }) {
                        return Err(EngineError::configuration(format!(
                            "group #{index} of {endpoint}/{stage} has an incomplete hook id '{hook_id}'"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn groups(&self) -> impl Iterator<Item = &ExecutionGroup> {
        self.endpoints
            .values()
            .flat_map(|plan| plan.stages.values())
            .flat_map(|plan| plan.groups.iter())
    }
}

fn deserialize_stages<'de, D>(
    deserializer: D,
) -> Result<HashMap<Stage, StageExecutionPlan>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = HashMap::<String, StageExecutionPlan>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, plan)| {
            key.parse::<Stage>()
                .map(|stage| (stage, plan))
                .map_err(de::Error::custom)
        })
        .collect()
}

fn serialize_stages<S>(
    stages: &HashMap<Stage, StageExecutionPlan>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(stages.len()))?;
    for (stage, plan) in stages {
        map.serialize_entry(stage.as_str(), plan)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookId;

    const AUCTION: &str = "/openrtb2/auction";

    fn host_plan() -> ExecutionPlan {
        ExecutionPlan::from_json_str(
            r#"{
                "endpoints": {
                    "/openrtb2/auction": {
                        "stages": {
                            "entrypoint": {
                                "groups": [
                                    {
                                        "timeout": 20,
                                        "hook-sequence": [
                                            {"module-code": "first", "hook-impl-code": "entry"}
                                        ]
                                    }
                                ]
                            },
                            "bidder_request": {
                                "groups": [
                                    {
                                        "timeout": 50,
                                        "hook-sequence": [
                                            {"module-code": "ortb2-blocking", "hook-impl-code": "bidder-request"}
                                        ]
                                    }
                                ]
                            }
                        }
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_stage_reject_policy() {
        assert!(Stage::Entrypoint.reject_allowed());
        assert!(Stage::ProcessedBidderResponse.reject_allowed());
        assert!(!Stage::AllProcessedBidResponses.reject_allowed());
        assert!(!Stage::AuctionResponse.reject_allowed());
        assert!(!Stage::Exitpoint.reject_allowed());
    }

    #[test]
    fn test_stage_from_str() {
        assert_eq!("raw-bidder-response".parse::<Stage>().unwrap(), Stage::RawBidderResponse);
        assert_eq!("RAW_AUCTION_REQUEST".parse::<Stage>().unwrap(), Stage::RawAuctionRequest);
        assert!("pre-auction".parse::<Stage>().is_err());
    }

    #[test]
    fn test_groups_for() {
        let plan = host_plan();
        let groups = plan.groups_for(AUCTION, Stage::BidderRequest);
        assert_eq!(groups.len(), 1);
        assert_eq!(
            groups[0].hook_sequence,
            vec![HookId::new("ortb2-blocking", "bidder-request")]
        );

        assert!(plan.groups_for(AUCTION, Stage::Exitpoint).is_empty());
        assert!(plan.groups_for("/openrtb2/amp", Stage::Entrypoint).is_empty());
    }

    #[test]
    fn test_merged_with_appends_account_groups() {
        let account = ExecutionPlan::from_toml_str(
            r#"
            [endpoints."/openrtb2/auction".stages.entrypoint]
            groups = [
                { timeout = 10, hook-sequence = [{ module-code = "account", hook-impl-code = "entry" }] },
            ]

            [endpoints."/openrtb2/amp".stages.exitpoint]
            groups = [
                { timeout = 10, hook-sequence = [{ module-code = "account", hook-impl-code = "exit" }] },
            ]
            "#,
        )
        .unwrap();

        let merged = host_plan().merged_with(&account);
        let entry = merged.groups_for(AUCTION, Stage::Entrypoint);
        assert_eq!(entry.len(), 2);
        assert_eq!(entry[0].hook_sequence[0].module_code, "first");
        assert_eq!(entry[1].hook_sequence[0].module_code, "account");
        assert_eq!(merged.groups_for("/openrtb2/amp", Stage::Exitpoint).len(), 1);

        let modules: Vec<_> = merged.module_codes().into_iter().collect();
        assert_eq!(modules, vec!["account", "first", "ortb2-blocking"]);
    }

    #[test]
    fn test_validate() {
        assert!(host_plan().validate().is_ok());

        let mut plan = host_plan();
        plan.endpoints
            .get_mut(AUCTION)
            .unwrap()
            .stages
            .get_mut(&Stage::Entrypoint)
            .unwrap()
            .groups[0]
            .timeout_ms = 0;
        assert!(matches!(
            plan.validate(),
            Err(EngineError::Configuration { .. })
        ));

        let mut plan = host_plan();
        plan.endpoints
            .get_mut(AUCTION)
            .unwrap()
            .stages
            .get_mut(&Stage::BidderRequest)
            .unwrap()
            .groups[0]
            .hook_sequence
            .push(HookId::new("ortb2-blocking", " "));
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let result = ExecutionPlan::from_json_str(
            r#"{"endpoints": {"/openrtb2/auction": {"stages": {"pre-auction": {"groups": []}}}}}"#,
        );
        assert!(matches!(result, Err(EngineError::Parse { format: "json", .. })));
    }

    #[test]
    fn test_serialize_round_trip_keeps_stage_keys() {
        let plan = host_plan();
        let json = serde_json::to_value(&plan).unwrap();
        assert!(json["endpoints"][AUCTION]["stages"]["bidder-request"].is_object());
    }
}
