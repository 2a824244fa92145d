//! Record resolution
//!
//! Maps the user's [`DomainSpec`]s onto concrete provider records, once,
//! before the update loop starts. Resolution is all-or-nothing: the first
//! spec that cannot be satisfied aborts the whole pass.
//!
//! ## Matching rules
//!
//! - `TYPE:domain` must name an accepted type (A or AAAA) and that exact
//!   record must exist.
//! - `domain` resolves to every accepted type that exists for it, A before
//!   AAAA, and fails only when neither exists.
//! - Output keeps spec order. Specs are not de-duplicated: `a.com` followed
//!   by `AAAA:a.com` manages the AAAA record twice.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{DomainSpec, ManagedRecord, RawRecord, RecordSelector, RecordType};
use crate::error::{Error, Result};

/// Provider records of an accepted type, keyed by `(name, type)`
#[derive(Debug, Default, Clone)]
pub struct RecordIndex {
    records: BTreeMap<(String, RecordType), ManagedRecord>,
}

impl RecordIndex {
    /// Index provider records, ignoring types other than A and AAAA
    ///
    /// If the provider lists the same `(name, type)` twice, the last one wins.
    pub fn build(records: impl IntoIterator<Item = RawRecord>) -> Self {
        let mut index = BTreeMap::new();

        for raw in records {
            let Ok(record_type) = raw.record_type.parse::<RecordType>() else {
                continue;
            };

            let record = ManagedRecord {
                domain: raw.name,
                record_type,
                zone_id: raw.zone_id,
                record_id: raw.id,
            };
            index.insert((record.domain.clone(), record_type), record);
        }

        Self { records: index }
    }

    /// Look up one record
    pub fn get(&self, domain: &str, record_type: RecordType) -> Option<&ManagedRecord> {
        self.records.get(&(domain.to_string(), record_type))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All indexed records, ordered by name then type
    pub fn iter(&self) -> impl Iterator<Item = &ManagedRecord> {
        self.records.values()
    }
}

/// Resolve specs against the full set of provider records
///
/// # Errors
///
/// - [`Error::UnknownRecordType`]: a spec pins a type other than A/AAAA
/// - [`Error::RecordNotFound`]: no matching record exists
pub fn resolve(specs: &[DomainSpec], records: impl IntoIterator<Item = RawRecord>) -> Result<Vec<ManagedRecord>> {
    let index = RecordIndex::build(records);

    debug!(
        "Found domains: {}",
        index
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    resolve_with_index(specs, &index)
}

/// Resolve specs against an already built index
pub fn resolve_with_index(specs: &[DomainSpec], index: &RecordIndex) -> Result<Vec<ManagedRecord>> {
    let mut managed = Vec::with_capacity(specs.len());

    for spec in specs {
        match &spec.selector {
            RecordSelector::Unsupported(token) => {
                return Err(Error::UnknownRecordType(token.clone()));
            }
            RecordSelector::Only(record_type) => {
                let record = index
                    .get(&spec.domain, *record_type)
                    .ok_or_else(|| Error::not_found(&spec.domain, Some(*record_type)))?;
                managed.push(record.clone());
            }
            RecordSelector::Any => {
                let before = managed.len();
                managed.extend(
                    RecordType::ACCEPTED
                        .iter()
                        .filter_map(|record_type| index.get(&spec.domain, *record_type))
                        .cloned(),
                );

                if managed.len() == before {
                    return Err(Error::not_found(&spec.domain, None));
                }
            }
        }
    }

    Ok(managed)
}
