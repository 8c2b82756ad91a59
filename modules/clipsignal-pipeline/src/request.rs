use serde::Deserialize;

/// Knobs shared by all pipeline tasks. Empty `tool_ids` means every tool.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineRequest {
    #[serde(default)]
    pub tool_ids: Vec<String>,
    #[serde(default)]
    pub limit_tools: Option<u32>,
    #[serde(default)]
    pub limit_videos_per_tool: Option<u32>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub stale_days: Option<u32>,
    #[serde(default)]
    pub reprocess_videos: bool,
    #[serde(default)]
    pub cache_only: bool,
}
