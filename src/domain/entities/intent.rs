use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Retirement,
    Portfolio,
    Longevity,
    Health,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retirement => "retirement",
            Self::Portfolio => "portfolio",
            Self::Longevity => "longevity",
            Self::Health => "health",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "intent", content = "report")]
pub enum Intent {
    Portfolio,
    Profile,
    Report(ReportKind),
    General,
}

impl Intent {
    pub const LABELS: [&'static str; 7] = [
        "portfolio",
        "profile",
        "retirement_report",
        "portfolio_report",
        "longevity_report",
        "health_report",
        "general",
    ];

    pub fn label(&self) -> String {
        match self {
            Self::Portfolio => "portfolio".to_string(),
            Self::Profile => "profile".to_string(),
            Self::Report(kind) => format!("{}_report", kind.as_str()),
            Self::General => "general".to_string(),
        }
    }

    /// Parses a classifier answer. Anything unrecognised is `General`.
    pub fn from_label(raw: &str) -> Self {
        let label = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '`' || c == '.')
            .to_lowercase()
            .replace([' ', '-'], "_");

        match label.as_str() {
            "portfolio" => Self::Portfolio,
            "profile" => Self::Profile,
            "retirement_report" => Self::Report(ReportKind::Retirement),
            "portfolio_report" => Self::Report(ReportKind::Portfolio),
            "longevity_report" => Self::Report(ReportKind::Longevity),
            "health_report" => Self::Report(ReportKind::Health),
            _ => Self::General,
        }
    }
}
