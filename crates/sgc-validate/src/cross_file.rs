//! Cross-file consistency checks for a cohort's full file set.
//!
//! Three independent checks, each returning `None` on success or a prefixed,
//! human-readable error string. They are pure functions over already-loaded
//! records and metadata; the orchestrator fetches state, regenerates the
//! derived "both" files first, and runs the checks fail-fast.

use std::collections::{BTreeMap, BTreeSet};

use sgc_model::{
    CasesControlsMetadata, CoOccurrenceMetadata, Cohort, FileFamily, FileType, SexGroup,
    split_pair_key,
};

use crate::checks::sample_list;

const CC_PREFIX: &str = "cases/controls check";
const CO_PREFIX: &str = "co-occurrence check";
const CROSS_PREFIX: &str = "co-occurrence + cases/controls check";

fn missing_types(present: &BTreeSet<FileType>, family: FileFamily) -> Vec<String> {
    FileType::family_set(family)
        .into_iter()
        .filter(|file_type| !present.contains(file_type))
        .map(|file_type| file_type.to_string())
        .collect()
}

fn sex_metadata<'a, T>(
    metadata: &'a BTreeMap<SexGroup, T>,
    family: FileFamily,
    sex: SexGroup,
    prefix: &str,
) -> Result<&'a T, String> {
    metadata.get(&sex).ok_or_else(|| {
        format!(
            "{prefix}: Missing metadata for {}",
            FileType::new(family, sex)
        )
    })
}

fn phenotype_union_mismatch(
    male: &[String],
    female: &[String],
    both: &[String],
    prefix: &str,
) -> Option<String> {
    let combined: BTreeSet<&str> = male
        .iter()
        .chain(female.iter())
        .map(String::as_str)
        .collect();
    let both_set: BTreeSet<&str> = both.iter().map(String::as_str).collect();

    let missing_from_both: Vec<&&str> = combined.difference(&both_set).collect();
    if !missing_from_both.is_empty() {
        return Some(format!(
            "{prefix}: Phenotypes in male/female files but missing from 'both' file: {}",
            sample_list(&missing_from_both)
        ));
    }
    let extra_in_both: Vec<&&str> = both_set.difference(&combined).collect();
    if !extra_in_both.is_empty() {
        return Some(format!(
            "{prefix}: Extra phenotypes in 'both' file not found in male/female files: {}",
            sample_list(&extra_in_both)
        ));
    }
    None
}

/// Completeness and aggregate consistency for the cases/controls family.
///
/// Requires all three file types, the union of male and female phenotypes to
/// equal the 'both' set, and totals to line up both internally (male + female
/// = both, per phenotype and overall) and against the cohort's declared
/// sample sizes.
pub fn check_cases_controls_consistency(
    cohort: &Cohort,
    present: &BTreeSet<FileType>,
    metadata: &BTreeMap<SexGroup, CasesControlsMetadata>,
) -> Option<String> {
    let missing = missing_types(present, FileFamily::CasesControls);
    if !missing.is_empty() {
        return Some(format!(
            "{CC_PREFIX}: Missing required file types: {}",
            missing.join(", ")
        ));
    }

    let family = FileFamily::CasesControls;
    let male = match sex_metadata(metadata, family, SexGroup::Male, CC_PREFIX) {
        Ok(m) => m,
        Err(message) => return Some(message),
    };
    let female = match sex_metadata(metadata, family, SexGroup::Female, CC_PREFIX) {
        Ok(m) => m,
        Err(message) => return Some(message),
    };
    let both = match sex_metadata(metadata, family, SexGroup::Both, CC_PREFIX) {
        Ok(m) => m,
        Err(message) => return Some(message),
    };

    if let Some(message) = phenotype_union_mismatch(
        &male.distinct_phenotypes,
        &female.distinct_phenotypes,
        &both.distinct_phenotypes,
        CC_PREFIX,
    ) {
        return Some(message);
    }

    let male_total = male.grand_total();
    let female_total = female.grand_total();
    let both_total = both.grand_total();
    let combined_total = male_total.saturating_add(female_total);
    if combined_total != both_total {
        return Some(format!(
            "{CC_PREFIX}: Combined male + female totals ({combined_total}) does not equal 'both' file total ({both_total})"
        ));
    }

    if male_total != cohort.number_of_males {
        return Some(format!(
            "{CC_PREFIX}: Male file total ({male_total}) does not match cohort male count ({})",
            cohort.number_of_males
        ));
    }
    if female_total != cohort.number_of_females {
        return Some(format!(
            "{CC_PREFIX}: Female file total ({female_total}) does not match cohort female count ({})",
            cohort.number_of_females
        ));
    }
    if both_total != cohort.total_sample_size {
        return Some(format!(
            "{CC_PREFIX}: Both file total ({both_total}) does not match cohort total sample size ({})",
            cohort.total_sample_size
        ));
    }

    for (phenotype, both_counts) in &both.phenotype_counts {
        let male_counts = male.phenotype_counts.get(phenotype).copied().unwrap_or_default();
        let female_counts = female
            .phenotype_counts
            .get(phenotype)
            .copied()
            .unwrap_or_default();

        let expected_cases = male_counts.cases.saturating_add(female_counts.cases);
        if both_counts.cases != expected_cases {
            return Some(format!(
                "{CC_PREFIX}: Phenotype '{phenotype}' - Both file cases ({}) != Male + Female cases ({expected_cases})",
                both_counts.cases
            ));
        }
        let expected_controls = male_counts.controls.saturating_add(female_counts.controls);
        if both_counts.controls != expected_controls {
            return Some(format!(
                "{CC_PREFIX}: Phenotype '{phenotype}' - Both file controls ({}) != Male + Female controls ({expected_controls})",
                both_counts.controls
            ));
        }
    }

    None
}

/// Completeness and aggregate consistency for the co-occurrence family.
///
/// Also re-checks the maximum pair count of each sex variant against the
/// cohort's declared sizes, catching cohort metadata edited after upload.
pub fn check_cooccurrence_consistency(
    cohort: &Cohort,
    present: &BTreeSet<FileType>,
    metadata: &BTreeMap<SexGroup, CoOccurrenceMetadata>,
) -> Option<String> {
    let missing = missing_types(present, FileFamily::CoOccurrence);
    if !missing.is_empty() {
        return Some(format!(
            "{CO_PREFIX}: Missing required file types: {}",
            missing.join(", ")
        ));
    }

    let family = FileFamily::CoOccurrence;
    let male = match sex_metadata(metadata, family, SexGroup::Male, CO_PREFIX) {
        Ok(m) => m,
        Err(message) => return Some(message),
    };
    let female = match sex_metadata(metadata, family, SexGroup::Female, CO_PREFIX) {
        Ok(m) => m,
        Err(message) => return Some(message),
    };
    let both = match sex_metadata(metadata, family, SexGroup::Both, CO_PREFIX) {
        Ok(m) => m,
        Err(message) => return Some(message),
    };

    let bounds = [
        ("Male", male, cohort.number_of_males, "cohort male count"),
        (
            "Female",
            female,
            cohort.number_of_females,
            "cohort female count",
        ),
        (
            "Both",
            both,
            cohort.total_sample_size,
            "cohort total sample size",
        ),
    ];
    for (label, meta, bound, bound_label) in bounds {
        let max = meta.max_pair_count();
        if max > bound {
            return Some(format!(
                "{CO_PREFIX}: {label} file contains counts ({max}) exceeding current {bound_label} ({bound})"
            ));
        }
    }

    if let Some(message) = phenotype_union_mismatch(
        &male.distinct_phenotypes,
        &female.distinct_phenotypes,
        &both.distinct_phenotypes,
        CO_PREFIX,
    ) {
        return Some(message);
    }

    for (key, both_count) in &both.phenotype_pair_counts {
        let male_count = male.phenotype_pair_counts.get(key).copied().unwrap_or(0);
        let female_count = female.phenotype_pair_counts.get(key).copied().unwrap_or(0);
        let expected = male_count.saturating_add(female_count);
        if *both_count != expected {
            let (first, second) = split_pair_key(key);
            return Some(format!(
                "{CO_PREFIX}: Both file count ({both_count}) != Male + Female counts ({expected}) for pair ({first}, {second})"
            ));
        }
    }

    None
}

/// Referential integrity between the two families, per sex variant.
///
/// Every phenotype a co-occurrence file mentions must appear in the matching
/// cases/controls file, and no pair count may exceed the smaller of the two
/// referenced case counts. The bound is skipped when either side's case
/// count is zero, since zero usually means the count was suppressed or
/// unavailable rather than truly zero.
pub fn check_cross_family_consistency(
    cases_controls: &BTreeMap<SexGroup, CasesControlsMetadata>,
    cooccurrence: &BTreeMap<SexGroup, CoOccurrenceMetadata>,
) -> Option<String> {
    let variants = [SexGroup::Male, SexGroup::Female, SexGroup::Both];

    for sex in variants {
        let (Some(co), Some(cc)) = (cooccurrence.get(&sex), cases_controls.get(&sex)) else {
            continue;
        };
        let known: BTreeSet<&str> = cc.distinct_phenotypes.iter().map(String::as_str).collect();
        let missing: Vec<&String> = co
            .distinct_phenotypes
            .iter()
            .filter(|code| !known.contains(code.as_str()))
            .collect();
        if !missing.is_empty() {
            return Some(format!(
                "{CROSS_PREFIX}: {} file references phenotypes not found in {} file: {}",
                FileType::new(FileFamily::CoOccurrence, sex),
                FileType::new(FileFamily::CasesControls, sex),
                sample_list(&missing)
            ));
        }
    }

    let mut violations = Vec::new();
    for sex in variants {
        let (Some(co), Some(cc)) = (cooccurrence.get(&sex), cases_controls.get(&sex)) else {
            continue;
        };
        for (key, count) in &co.phenotype_pair_counts {
            let (first, second) = split_pair_key(key);
            let first_cases = cc.phenotype_counts.get(first).map_or(0, |c| c.cases);
            let second_cases = cc.phenotype_counts.get(second).map_or(0, |c| c.cases);
            if first_cases == 0 || second_cases == 0 {
                continue;
            }
            let bound = first_cases.min(second_cases);
            if *count > bound {
                violations.push(format!(
                    "{} ({first}, {second}): count {count} exceeds min cases {bound}",
                    FileType::new(FileFamily::CoOccurrence, sex)
                ));
            }
        }
    }
    if !violations.is_empty() {
        return Some(format!(
            "{CROSS_PREFIX}: Co-occurrence counts exceed the smaller phenotype case count: {}",
            sample_list(&violations)
        ));
    }

    None
}
