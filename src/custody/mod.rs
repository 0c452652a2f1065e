//! Custody and verification evaluation
//!
//! Turns the custody chain and verification report of a bundle into a
//! single verdict. A compromised bundle is a normal outcome, not an error.

pub mod derive;
pub mod evaluate;

pub use derive::derive_chain;
pub use evaluate::{entry_is_valid, evaluate_custody};

use serde::Serialize;

use crate::evidence::CustodyReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Verified,
    /// Also the verdict when nothing could be checked
    #[default]
    Compromised,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Verified => "VERIFIED",
            Verdict::Compromised => "COMPROMISED",
        }
    }
}

/// Where the evaluated custody chain came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CustodySource {
    /// `CUSTODY_REPORT.json` written by the tool
    Recorded,
    /// Synthesized from manifest and verification report
    Derived,
    /// `CUSTODY_REPORT.json` exists but could not be used
    Unreadable,
    #[default]
    Missing,
}

/// Verdict plus the reasons behind it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityAssessment {
    pub verdict: Verdict,
    pub issues: Vec<String>,
    pub custody_source: CustodySource,
}

impl IntegrityAssessment {
    /// Assessment of an already evaluated chain
    pub fn from_custody(custody: Option<&CustodyReport>, source: CustodySource) -> Self {
        match custody {
            Some(report) => Self {
                verdict: if report.verified { Verdict::Verified } else { Verdict::Compromised },
                issues: report.issues.clone(),
                custody_source: source,
            },
            None => Self {
                verdict: Verdict::Compromised,
                issues: vec!["no custody chain recorded".to_string()],
                custody_source: CustodySource::Missing,
            },
        }
    }

    /// A custody report that exists but cannot be read is never benign
    pub fn unreadable_custody(reason: &str) -> Self {
        Self {
            verdict: Verdict::Compromised,
            issues: vec![format!("custody report unreadable: {}", reason)],
            custody_source: CustodySource::Unreadable,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verdict == Verdict::Verified
    }
}
