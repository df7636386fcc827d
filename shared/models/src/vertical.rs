use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical partitions of the policy corpus.
///
/// `Internet` is a pseudo-vertical: it never maps to a stored collection
/// and only appears in plans and tagged results when web search is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Legal,
    Go,
    Judicial,
    Data,
    Schemes,
    Internet,
}

/// The five corpus-backed verticals, in priority order.
pub const CORPUS_VERTICALS: [Vertical; 5] = [
    Vertical::Legal,
    Vertical::Go,
    Vertical::Judicial,
    Vertical::Data,
    Vertical::Schemes,
];

impl Vertical {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vertical::Legal => "legal",
            Vertical::Go => "go",
            Vertical::Judicial => "judicial",
            Vertical::Data => "data",
            Vertical::Schemes => "schemes",
            Vertical::Internet => "internet",
        }
    }

    /// Collection name in the vector store. `None` for the internet
    /// pseudo-vertical, which has no persisted collection.
    pub fn collection(&self) -> Option<&'static str> {
        match self {
            Vertical::Legal => Some("legal_documents"),
            Vertical::Go => Some("government_orders"),
            Vertical::Judicial => Some("judicial_documents"),
            Vertical::Data => Some("data_reports"),
            Vertical::Schemes => Some("schemes"),
            Vertical::Internet => None,
        }
    }

    /// Priority in policy reasoning (1 = highest). Used by the policy
    /// reranker and DeepThink vertical weighting.
    pub fn priority(&self) -> u8 {
        match self {
            Vertical::Legal => 1,
            Vertical::Go => 2,
            Vertical::Judicial => 3,
            Vertical::Data => 4,
            Vertical::Schemes => 5,
            Vertical::Internet => 6,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Vertical::Legal => "Acts, Rules, Sections, Legal Provisions",
            Vertical::Go => "Government Orders, Notifications, Circulars",
            Vertical::Judicial => "Court Judgments, Precedents, Legal Interpretations",
            Vertical::Data => "UDISE, ASER, Statistical Reports, Surveys",
            Vertical::Schemes => "Schemes, Programs, Guidelines, International Models",
            Vertical::Internet => "Live web results",
        }
    }
}

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unrecognized vertical names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVertical(pub String);

impl fmt::Display for UnknownVertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown vertical: {}", self.0)
    }
}

impl std::error::Error for UnknownVertical {}

impl FromStr for Vertical {
    type Err = UnknownVertical;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legal" => Ok(Vertical::Legal),
            "go" => Ok(Vertical::Go),
            "judicial" => Ok(Vertical::Judicial),
            "data" => Ok(Vertical::Data),
            "schemes" => Ok(Vertical::Schemes),
            "internet" => Ok(Vertical::Internet),
            other => Err(UnknownVertical(other.to_string())),
        }
    }
}
