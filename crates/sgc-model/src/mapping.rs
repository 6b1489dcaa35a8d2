#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::FileFamily;

/// Canonical role names used for combined output and positional extraction.
pub mod roles {
    pub const PHENOTYPE: &str = "phenotype";
    pub const CASES: &str = "cases";
    pub const CONTROLS: &str = "controls";
    pub const BREAKDOWN: &str = "breakdown";
    pub const PHENOTYPE1: &str = "phenotype1";
    pub const PHENOTYPE2: &str = "phenotype2";
    pub const COOCCURRENCE_COUNT: &str = "cooccurrence_count";
}

/// Uploader-supplied mapping from canonical cases/controls roles to the
/// column names actually present in the file. Never inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasesControlsMapping {
    pub phenotype: String,
    pub cases: String,
    pub controls: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<String>,
}

impl CasesControlsMapping {
    pub fn canonical() -> Self {
        Self {
            phenotype: roles::PHENOTYPE.to_string(),
            cases: roles::CASES.to_string(),
            controls: roles::CONTROLS.to_string(),
            breakdown: None,
        }
    }

    /// Columns that must be present in the uploaded file.
    pub fn required_columns(&self) -> [&str; 3] {
        [&self.phenotype, &self.cases, &self.controls]
    }
}

/// Uploader-supplied mapping for co-occurrence files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoOccurrenceMapping {
    pub phenotype1: String,
    pub phenotype2: String,
    pub cooccurrence_count: String,
}

impl CoOccurrenceMapping {
    pub fn canonical() -> Self {
        Self {
            phenotype1: roles::PHENOTYPE1.to_string(),
            phenotype2: roles::PHENOTYPE2.to_string(),
            cooccurrence_count: roles::COOCCURRENCE_COUNT.to_string(),
        }
    }

    pub fn required_columns(&self) -> [&str; 3] {
        [&self.phenotype1, &self.phenotype2, &self.cooccurrence_count]
    }
}

/// Column mapping stored against a file record, one variant per family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ColumnMapping {
    CasesControls(CasesControlsMapping),
    Cooccurrence(CoOccurrenceMapping),
}

impl ColumnMapping {
    pub fn family(&self) -> FileFamily {
        match self {
            ColumnMapping::CasesControls(_) => FileFamily::CasesControls,
            ColumnMapping::Cooccurrence(_) => FileFamily::CoOccurrence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_serializes_with_family_tag() {
        let mapping = ColumnMapping::CasesControls(CasesControlsMapping {
            phenotype: "PHENO".to_string(),
            cases: "N_CASES".to_string(),
            controls: "N_CONTROLS".to_string(),
            breakdown: None,
        });
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["family"], "cases_controls");
        assert_eq!(json["cases"], "N_CASES");
        assert!(json.get("breakdown").is_none());
    }

    #[test]
    fn canonical_mapping_matches_role_names() {
        let mapping = CoOccurrenceMapping::canonical();
        assert_eq!(
            mapping.required_columns(),
            ["phenotype1", "phenotype2", "cooccurrence_count"]
        );
    }
}
