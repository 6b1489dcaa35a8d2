//! Male/female → "both" file combination.
//!
//! The `both` variant of each family is always derived, never uploaded: both
//! sex-specific inputs are fetched, remapped to canonical column names,
//! normalized, concatenated, and aggregated by key, and the result is
//! serialized as a tab-delimited table at a deterministic storage key. Any
//! existing `both` file and its metadata are destroyed first; regeneration
//! is never incremental.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};

use sgc_ingest::{RowTable, coerce_count, read_named_table};
use sgc_model::{
    CohortFile, CohortId, ColumnMapping, FileFamily, FileType, NewCohortFile, SexGroup,
    combined_file_name, combined_key, roles,
};
use sgc_store::{BlobStore, CohortStore, find_file};
use sgc_validate::{
    extract_cases_controls_metadata, extract_cooccurrence_metadata,
    positional_cases_controls_mapping, positional_cooccurrence_mapping,
};

/// Combined output is always tab-separated, whatever the inputs used.
pub const COMBINED_CONTENT_TYPE: &str = "text/tab-separated-values";

/// Regenerate the `both` file for one family of a cohort.
///
/// Returns `Ok(None)` when the male or female counterpart is missing; the
/// completeness checks report that case. Fetch, parse, and write failures
/// are wrapped naming both source paths so the caller can report which pair
/// failed to combine.
pub fn regenerate_both_file(
    store: &dyn CohortStore,
    blobs: &dyn BlobStore,
    cohort_id: &CohortId,
    family: FileFamily,
) -> Result<Option<CohortFile>> {
    let male = find_file(store, cohort_id, FileType::new(family, SexGroup::Male))?;
    let female = find_file(store, cohort_id, FileType::new(family, SexGroup::Female))?;
    let (Some(male), Some(female)) = (male, female) else {
        tracing::debug!(%cohort_id, %family, "male or female file missing, skipping combine");
        return Ok(None);
    };

    combine_pair(store, blobs, cohort_id, family, &male, &female)
        .with_context(|| {
            format!(
                "combining '{}' and '{}'",
                male.file_path, female.file_path
            )
        })
        .map(Some)
}

fn combine_pair(
    store: &dyn CohortStore,
    blobs: &dyn BlobStore,
    cohort_id: &CohortId,
    family: FileFamily,
    male: &CohortFile,
    female: &CohortFile,
) -> Result<CohortFile> {
    let male_table = load_canonical_table(blobs, family, male)?;
    let female_table = load_canonical_table(blobs, family, female)?;

    let combined = match family {
        FileFamily::CasesControls => aggregate_cases_controls(&male_table, &female_table)?,
        FileFamily::CoOccurrence => aggregate_cooccurrence(&male_table, &female_table)?,
    };

    let both_type = FileType::new(family, SexGroup::Both);
    let bytes = combined.to_delimited_bytes(b'\t')?;

    // The key is deterministic, so the write is an overwrite; a failed
    // write leaves the previous combined file fully intact.
    let key = combined_key(cohort_id, both_type);
    blobs.put(&key, &bytes, COMBINED_CONTENT_TYPE)?;

    // Full regenerate: the previous derived record and metadata go away.
    if let Some(existing) = find_file(store, cohort_id, both_type)? {
        store.delete_cases_controls_metadata(&existing.id)?;
        store.delete_cooccurrence_metadata(&existing.id)?;
        store.delete_file(&existing.id)?;
        if existing.file_path != key {
            blobs.delete(&existing.file_path)?;
        }
    }

    let file = store.insert_file(NewCohortFile {
        cohort_id: cohort_id.clone(),
        file_type: both_type,
        file_name: combined_file_name(both_type),
        file_path: key,
        file_size: bytes.len() as u64,
        column_mapping: None,
    })?;

    // Re-extract metadata from the combined table, reading the canonical
    // roles off the first columns positionally.
    match family {
        FileFamily::CasesControls => {
            let mapping = positional_cases_controls_mapping(&combined)
                .context("combined table has fewer than three columns")?;
            let metadata = extract_cases_controls_metadata(&combined, &mapping);
            store.insert_cases_controls_metadata(&file.id, metadata)?;
        }
        FileFamily::CoOccurrence => {
            let mapping = positional_cooccurrence_mapping(&combined)
                .context("combined table has fewer than three columns")?;
            let metadata = extract_cooccurrence_metadata(&combined, &mapping);
            store.insert_cooccurrence_metadata(&file.id, metadata)?;
        }
    }

    tracing::info!(
        %cohort_id,
        file_type = %both_type,
        rows = combined.height(),
        bytes = file.file_size,
        "regenerated combined file"
    );
    Ok(file)
}

/// Fetch one input, parse it with its extension's delimiter, rename its
/// columns to the canonical role names, and normalize the numeric columns
/// (suppressed and unparseable values both become zero).
fn load_canonical_table(
    blobs: &dyn BlobStore,
    family: FileFamily,
    file: &CohortFile,
) -> Result<RowTable> {
    let bytes = blobs
        .get(&file.file_path)
        .with_context(|| format!("fetching '{}'", file.file_path))?;
    let mut table = read_named_table(&bytes, &file.file_name)?;

    apply_canonical_names(&mut table, family, file.column_mapping.as_ref())?;

    let numeric_columns: &[&str] = match family {
        FileFamily::CasesControls => &[roles::CASES, roles::CONTROLS],
        FileFamily::CoOccurrence => &[roles::COOCCURRENCE_COUNT],
    };
    for column in numeric_columns {
        let idx = table
            .column_index(column)
            .with_context(|| format!("column '{column}' missing after renaming"))?;
        for row in &mut table.rows {
            row[idx] = coerce_count(&row[idx]).to_string();
        }
    }
    Ok(table)
}

/// Rename mapped columns to canonical role names; without a stored mapping
/// the file is assumed to use canonical names already.
fn apply_canonical_names(
    table: &mut RowTable,
    family: FileFamily,
    mapping: Option<&ColumnMapping>,
) -> Result<()> {
    match (family, mapping) {
        (FileFamily::CasesControls, Some(ColumnMapping::CasesControls(mapping))) => {
            rename_required(table, &mapping.phenotype, roles::PHENOTYPE)?;
            rename_required(table, &mapping.cases, roles::CASES)?;
            rename_required(table, &mapping.controls, roles::CONTROLS)?;
            if let Some(breakdown) = mapping.breakdown.as_deref() {
                table.rename_column(breakdown, roles::BREAKDOWN);
            }
        }
        (FileFamily::CoOccurrence, Some(ColumnMapping::Cooccurrence(mapping))) => {
            rename_required(table, &mapping.phenotype1, roles::PHENOTYPE1)?;
            rename_required(table, &mapping.phenotype2, roles::PHENOTYPE2)?;
            rename_required(table, &mapping.cooccurrence_count, roles::COOCCURRENCE_COUNT)?;
        }
        (_, Some(other)) => {
            bail!(
                "stored column mapping is for the {} family, expected {family}",
                other.family()
            );
        }
        (_, None) => {}
    }
    Ok(())
}

fn rename_required(table: &mut RowTable, from: &str, to: &str) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if !table.rename_column(from, to) {
        bail!("mapped column '{from}' not present in the file");
    }
    Ok(())
}

/// Group by phenotype, summing cases and controls; breakdown strings are
/// concatenated (semicolon-joined), never summed.
fn aggregate_cases_controls(male: &RowTable, female: &RowTable) -> Result<RowTable> {
    let has_breakdown =
        male.has_column(roles::BREAKDOWN) || female.has_column(roles::BREAKDOWN);

    #[derive(Default)]
    struct Group {
        cases: i64,
        controls: i64,
        breakdowns: Vec<String>,
    }
    let mut groups: BTreeMap<String, Group> = BTreeMap::new();

    for table in [male, female] {
        for row in 0..table.height() {
            let phenotype = table.cell(row, roles::PHENOTYPE).unwrap_or("");
            if phenotype.is_empty() {
                continue;
            }
            let group = groups.entry(phenotype.to_string()).or_default();
            group.cases = group
                .cases
                .saturating_add(coerce_count(table.cell(row, roles::CASES).unwrap_or("")));
            group.controls = group
                .controls
                .saturating_add(coerce_count(table.cell(row, roles::CONTROLS).unwrap_or("")));
            if let Some(breakdown) = table.cell(row, roles::BREAKDOWN)
                && !breakdown.is_empty()
            {
                group.breakdowns.push(breakdown.to_string());
            }
        }
    }

    let mut headers = vec![
        roles::PHENOTYPE.to_string(),
        roles::CASES.to_string(),
        roles::CONTROLS.to_string(),
    ];
    if has_breakdown {
        headers.push(roles::BREAKDOWN.to_string());
    }
    let mut out = RowTable::new(headers);
    for (phenotype, group) in groups {
        let mut row = vec![
            phenotype,
            group.cases.to_string(),
            group.controls.to_string(),
        ];
        if has_breakdown {
            row.push(group.breakdowns.join(";"));
        }
        out.push_row(row)?;
    }
    Ok(out)
}

/// Group by the unordered phenotype pair, summing counts.
fn aggregate_cooccurrence(male: &RowTable, female: &RowTable) -> Result<RowTable> {
    let mut groups: BTreeMap<(String, String), i64> = BTreeMap::new();

    for table in [male, female] {
        for row in 0..table.height() {
            let first = table.cell(row, roles::PHENOTYPE1).unwrap_or("");
            let second = table.cell(row, roles::PHENOTYPE2).unwrap_or("");
            if first.is_empty() || second.is_empty() {
                continue;
            }
            let key = if first <= second {
                (first.to_string(), second.to_string())
            } else {
                (second.to_string(), first.to_string())
            };
            let count = coerce_count(table.cell(row, roles::COOCCURRENCE_COUNT).unwrap_or(""));
            let entry = groups.entry(key).or_insert(0);
            *entry = entry.saturating_add(count);
        }
    }

    let mut out = RowTable::new(vec![
        roles::PHENOTYPE1.to_string(),
        roles::PHENOTYPE2.to_string(),
        roles::COOCCURRENCE_COUNT.to_string(),
    ]);
    for ((first, second), count) in groups {
        out.push_row(vec![first, second, count.to_string()])?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RowTable {
        let mut table = RowTable::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table
                .push_row(row.iter().map(|c| c.to_string()).collect())
                .unwrap();
        }
        table
    }

    #[test]
    fn cases_and_controls_sum_per_phenotype() {
        let male = table(
            &["phenotype", "cases", "controls"],
            &[&["P1", "10", "20"], &["P2", "1", "2"]],
        );
        let female = table(&["phenotype", "cases", "controls"], &[&["P1", "5", "15"]]);

        let combined = aggregate_cases_controls(&male, &female).unwrap();
        assert_eq!(combined.headers, vec!["phenotype", "cases", "controls"]);
        assert_eq!(combined.cell(0, "phenotype"), Some("P1"));
        assert_eq!(combined.cell(0, "cases"), Some("15"));
        assert_eq!(combined.cell(0, "controls"), Some("35"));
        assert_eq!(combined.cell(1, "cases"), Some("1"));
    }

    #[test]
    fn breakdowns_concatenate_instead_of_summing() {
        let male = table(
            &["phenotype", "cases", "controls", "breakdown"],
            &[&["P1", "10", "0", "A:4"]],
        );
        let female = table(
            &["phenotype", "cases", "controls", "breakdown"],
            &[&["P1", "5", "0", "B:2"]],
        );
        let combined = aggregate_cases_controls(&male, &female).unwrap();
        assert_eq!(combined.cell(0, "breakdown"), Some("A:4;B:2"));
    }

    #[test]
    fn group_sums_saturate_on_huge_counts() {
        let max = i64::MAX.to_string();
        let male = table(
            &["phenotype", "cases", "controls"],
            &[&["P1", max.as_str(), "1"]],
        );
        let female = table(
            &["phenotype", "cases", "controls"],
            &[&["P1", max.as_str(), "1"]],
        );
        let combined = aggregate_cases_controls(&male, &female).unwrap();
        assert_eq!(combined.cell(0, "cases"), Some(max.as_str()));
        assert_eq!(combined.cell(0, "controls"), Some("2"));
    }

    #[test]
    fn cooccurrence_pairs_merge_regardless_of_order() {
        let male = table(
            &["phenotype1", "phenotype2", "cooccurrence_count"],
            &[&["P1", "P2", "3"]],
        );
        let female = table(
            &["phenotype1", "phenotype2", "cooccurrence_count"],
            &[&["P2", "P1", "2"]],
        );
        let combined = aggregate_cooccurrence(&male, &female).unwrap();
        assert_eq!(combined.height(), 1);
        assert_eq!(combined.cell(0, "phenotype1"), Some("P1"));
        assert_eq!(combined.cell(0, "phenotype2"), Some("P2"));
        assert_eq!(combined.cell(0, "cooccurrence_count"), Some("5"));
    }

    #[test]
    fn mismatched_mapping_family_is_rejected() {
        let mut t = table(&["a", "b", "c"], &[]);
        let mapping = ColumnMapping::Cooccurrence(sgc_model::CoOccurrenceMapping::canonical());
        let result = apply_canonical_names(&mut t, FileFamily::CasesControls, Some(&mapping));
        assert!(result.is_err());
    }
}
