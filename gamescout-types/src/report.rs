//! The structured analysis produced by synthesis.
//!
//! Field names and enum values are wire-exact: downstream consumers
//! parse this JSON directly. Most leaf fields default to empty so a
//! partially-filled model response still deserializes.

use serde::{Deserialize, Serialize};

/// Severity vocabulary for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks core functionality.
    Critical,
    /// Significant defect.
    Major,
    /// Cosmetic or low-impact defect.
    Minor,
    /// Not a defect; an improvement idea.
    Suggestion,
    /// Something done well.
    Positive,
    /// Context worth recording.
    Informational,
}

/// Priority vocabulary for test scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Run first.
    High,
    /// Run normally.
    Medium,
    /// Run when time permits.
    Low,
}

/// Kind of test scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioType {
    /// The expected, successful path.
    HappyPath,
    /// Unusual but valid input or state.
    EdgeCase,
    /// Deliberately broken input or state.
    Failure,
}

/// Action vocabulary for scenario steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepAction {
    /// Open the game.
    Launch,
    /// Click an element or coordinate.
    Click,
    /// Enter text.
    Input,
    /// Wait for a condition or duration.
    Wait,
    /// Assert an observable outcome.
    Assert,
}

/// Basic facts about the game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    /// Game name.
    #[serde(default)]
    pub name: String,
    /// Genre, free text.
    #[serde(default)]
    pub genre: String,
    /// Detected technology (engine, renderer).
    #[serde(default)]
    pub technology: String,
    /// Notable features observed.
    #[serde(default)]
    pub features: Vec<String>,
}

/// One game mechanic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mechanic {
    /// Mechanic name.
    pub name: String,
    /// How it works, free text.
    #[serde(default)]
    pub description: String,
}

/// One UI element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiElement {
    /// Element name.
    pub name: String,
    /// Where it appears, free text.
    #[serde(default)]
    pub location: String,
    /// What it does.
    #[serde(default)]
    pub purpose: String,
}

/// One user flow through the game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFlow {
    /// Flow name.
    pub name: String,
    /// Ordered textual steps.
    #[serde(default)]
    pub steps: Vec<String>,
}

/// One edge case worth testing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCase {
    /// What the edge case is.
    pub description: String,
    /// What should happen.
    #[serde(default)]
    pub expected: String,
}

/// One step of a test scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStep {
    /// What to do.
    pub action: StepAction,
    /// What to act on.
    #[serde(default)]
    pub target: String,
    /// Value to enter, for input steps.
    #[serde(default)]
    pub value: String,
    /// Expected observable outcome.
    #[serde(default)]
    pub expected: String,
}

/// One test scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScenario {
    /// Scenario name.
    pub name: String,
    /// Scenario kind.
    #[serde(rename = "type")]
    pub scenario_type: ScenarioType,
    /// Execution priority.
    pub priority: Priority,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

/// A finding from one of the optional review modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Severity.
    pub severity: Severity,
    /// Short title.
    pub title: String,
    /// What was observed.
    #[serde(default)]
    pub description: String,
    /// Suggested action.
    #[serde(default)]
    pub recommendation: String,
}

/// The complete structured analysis of a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAnalysis {
    /// Basic game facts.
    #[serde(default)]
    pub game_info: GameInfo,
    /// Observed mechanics. Synthesis requires at least one.
    #[serde(default)]
    pub mechanics: Vec<Mechanic>,
    /// Observed UI elements.
    #[serde(default)]
    pub ui_elements: Vec<UiElement>,
    /// Observed user flows.
    #[serde(default)]
    pub user_flows: Vec<UserFlow>,
    /// Edge cases worth testing.
    #[serde(default)]
    pub edge_cases: Vec<EdgeCase>,
    /// Test scenarios, produced with the analysis as one JSON object.
    #[serde(default)]
    pub scenarios: Vec<TestScenario>,
    /// UI/UX findings (present when the module is enabled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_ux_findings: Option<Vec<Finding>>,
    /// Wording findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wording_findings: Option<Vec<Finding>>,
    /// Game-design findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_design_findings: Option<Vec<Finding>>,
    /// Compliance findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_findings: Option<Vec<Finding>>,
}

/// Which optional review modules a session runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    /// Review usability and visual polish.
    #[serde(default)]
    pub ui_ux: bool,
    /// Review copy and terminology.
    #[serde(default)]
    pub wording: bool,
    /// Review game-design coherence.
    #[serde(default)]
    pub game_design: bool,
    /// Review regulatory/compliance concerns.
    #[serde(default)]
    pub compliance: bool,
}

impl ModuleConfig {
    /// Whether any optional module is enabled.
    pub fn any_enabled(&self) -> bool {
        self.ui_ux || self.wording || self.game_design || self.compliance
    }
}

/// Metadata about the target page, captured by the caller before the
/// session starts and passed through opaquely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Document title at session start.
    #[serde(default)]
    pub title: String,
    /// Target URL.
    #[serde(default)]
    pub url: String,
    /// Detected framework or engine hint (e.g. "phaser", "unity-webgl").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}
