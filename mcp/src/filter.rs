//! The tool-filter algorithm: a pure function over a raw tool list and the
//! server's configured mode, no provider call involved.

use cpe_common::ToolFilterMode;

use crate::client::Tool;

/// Result of applying a server's tool filter: what survives and what was
/// dropped (kept for CLI diagnostics).
pub struct FilterOutcome {
    pub kept: Vec<Tool>,
    pub dropped: Vec<String>,
}

pub fn apply_tool_filter(
    tools: Vec<Tool>,
    mode: ToolFilterMode,
    enabled_tools: &[String],
    disabled_tools: &[String],
) -> FilterOutcome {
    match mode {
        ToolFilterMode::All => FilterOutcome {
            kept: tools,
            dropped: Vec::new(),
        },
        ToolFilterMode::Whitelist => {
            let (kept, dropped): (Vec<_>, Vec<_>) = tools
                .into_iter()
                .partition(|tool| enabled_tools.iter().any(|name| name == &tool.name));
            FilterOutcome {
                kept,
                dropped: dropped.into_iter().map(|t| t.name).collect(),
            }
        }
        ToolFilterMode::Blacklist => {
            let (dropped, kept): (Vec<_>, Vec<_>) = tools
                .into_iter()
                .partition(|tool| disabled_tools.iter().any(|name| name == &tool.name));
            FilterOutcome {
                kept,
                dropped: dropped.into_iter().map(|t| t.name).collect(),
            }
        }
    }
}
