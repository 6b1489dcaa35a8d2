#![deny(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// The two schema families a cohort file can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileFamily {
    CasesControls,
    CoOccurrence,
}

impl FileFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            FileFamily::CasesControls => "cases_controls",
            FileFamily::CoOccurrence => "cooccurrence",
        }
    }
}

impl fmt::Display for FileFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sex axis of a cohort file. `Both` is always derived by the combiner,
/// never uploaded directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SexGroup {
    Male,
    Female,
    Both,
}

impl SexGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            SexGroup::Male => "male",
            SexGroup::Female => "female",
            SexGroup::Both => "both",
        }
    }
}

impl fmt::Display for SexGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (family, sex) tag such as `cases_controls_male` or `cooccurrence_both`.
///
/// At most one file of each tag may exist per cohort at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileType {
    pub family: FileFamily,
    pub sex: SexGroup,
}

impl FileType {
    pub const fn new(family: FileFamily, sex: SexGroup) -> Self {
        Self { family, sex }
    }

    /// The three tags required for a complete family.
    pub fn family_set(family: FileFamily) -> [FileType; 3] {
        [
            FileType::new(family, SexGroup::Male),
            FileType::new(family, SexGroup::Female),
            FileType::new(family, SexGroup::Both),
        ]
    }

    pub fn is_derived(self) -> bool {
        self.sex == SexGroup::Both
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.family, self.sex)
    }
}

impl FromStr for FileType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (family, sex) = s
            .rsplit_once('_')
            .ok_or_else(|| ModelError::UnknownFileType(s.to_string()))?;
        let family = match family {
            "cases_controls" => FileFamily::CasesControls,
            "cooccurrence" => FileFamily::CoOccurrence,
            _ => return Err(ModelError::UnknownFileType(s.to_string())),
        };
        let sex = match sex {
            "male" => SexGroup::Male,
            "female" => SexGroup::Female,
            "both" => SexGroup::Both,
            _ => return Err(ModelError::UnknownFileType(s.to_string())),
        };
        Ok(FileType::new(family, sex))
    }
}

impl serde::Serialize for FileType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for FileType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
