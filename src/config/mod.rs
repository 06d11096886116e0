//! Run configuration: analysis list, WPA flag, scalar-promotion
//! flag, edge-recorder flag, entry-point override list.

use serde::{Deserialize, Serialize};

/// One of the recognized analysis names from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisName {
    IfdsUninit,
    IfdsTaint,
    IfdsType,
    IdeTaint,
    IfdsSolverTest,
    IdeSolverTest,
    MonoIntraFullConstPropagation,
    MonoIntraSolverTest,
    MonoInterSolverTest,
    None,
}

impl AnalysisName {
    pub const ALL: &'static [&'static str] = &[
        "ifds_uninit",
        "ifds_taint",
        "ifds_type",
        "ide_taint",
        "ifds_solvertest",
        "ide_solvertest",
        "mono_intra_fullconstpropagation",
        "mono_intra_solvertest",
        "mono_inter_solvertest",
        "none",
    ];

    /// Parse a registry key; unknown names are a config-time error,
    /// never a run-time one.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "ifds_uninit" => AnalysisName::IfdsUninit,
            "ifds_taint" => AnalysisName::IfdsTaint,
            "ifds_type" => AnalysisName::IfdsType,
            "ide_taint" => AnalysisName::IdeTaint,
            "ifds_solvertest" => AnalysisName::IfdsSolverTest,
            "ide_solvertest" => AnalysisName::IdeSolverTest,
            "mono_intra_fullconstpropagation" => AnalysisName::MonoIntraFullConstPropagation,
            "mono_intra_solvertest" => AnalysisName::MonoIntraSolverTest,
            "mono_inter_solvertest" => AnalysisName::MonoInterSolverTest,
            "none" => AnalysisName::None,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisName::IfdsUninit => "ifds_uninit",
            AnalysisName::IfdsTaint => "ifds_taint",
            AnalysisName::IfdsType => "ifds_type",
            AnalysisName::IdeTaint => "ide_taint",
            AnalysisName::IfdsSolverTest => "ifds_solvertest",
            AnalysisName::IdeSolverTest => "ide_solvertest",
            AnalysisName::MonoIntraFullConstPropagation => "mono_intra_fullconstpropagation",
            AnalysisName::MonoIntraSolverTest => "mono_intra_solvertest",
            AnalysisName::MonoInterSolverTest => "mono_inter_solvertest",
            AnalysisName::None => "none",
        }
    }
}

/// Whole-program vs module-wise composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositionMode {
    Wpa,
    Mw,
}

/// The run configuration the controller is constructed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub analyses: Vec<AnalysisName>,
    pub mode: CompositionMode,
    pub mem2reg_mode: bool,
    pub print_edge_recorder: bool,
    pub entry_points: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            analyses: vec![AnalysisName::None],
            mode: CompositionMode::Wpa,
            mem2reg_mode: false,
            print_edge_recorder: false,
            entry_points: vec!["main".to_string()],
        }
    }
}

impl RunConfig {
    /// Parse a list of analysis name strings, failing at config time
    /// rather than at run time.
    pub fn with_analysis_names(
        mut self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Result<Self, crate::errors::FrameworkError> {
        let mut analyses = Vec::new();
        for name in names {
            let name = name.as_ref();
            let parsed = AnalysisName::parse(name)
                .ok_or_else(|| crate::errors::FrameworkError::UnknownAnalysis(name.to_string()))?;
            analyses.push(parsed);
        }
        if !analyses.is_empty() {
            self.analyses = analyses;
        }
        Ok(self)
    }

    pub fn wpa(mut self, wpa: bool) -> Self {
        self.mode = if wpa { CompositionMode::Wpa } else { CompositionMode::Mw };
        self
    }

    pub fn mem2reg(mut self, enabled: bool) -> Self {
        self.mem2reg_mode = enabled;
        self
    }

    pub fn edge_recorder(mut self, enabled: bool) -> Self {
        self.print_edge_recorder = enabled;
        self
    }

    pub fn entry_points(mut self, entries: Vec<String>) -> Self {
        if !entries.is_empty() {
            self.entry_points = entries;
        }
        self
    }
}
