//! Whole-graph consistency checks.
//!
//! Mutations keep most invariants eagerly. The validator re-checks them and
//! adds the checks that cannot be enforced at mutation time, for example a
//! set dimension whose labels no longer match a grown axis. Files opened
//! from a foreign backend may violate anything, so every rule is checked.

use std::{collections::HashSet, fmt};

use dataweave_backend::{Backend, EntityKind, Record, attr};
use dataweave_core::{
    dimension::{DimensionKind, DimensionType},
    identifier::Id,
    ndbuffer::NdBuffer,
    units,
};
use indexmap::IndexMap;
use log::debug;

use crate::property;

/// The severity level of an [`Issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// A broken invariant.
    Error,

    /// A suspicious but usable state.
    Warning,
}

impl Severity {
    /// Returns `true` if this is an error severity.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error)
    }

    /// Returns `true` if this is a warning severity.
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// One finding of the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    severity: Severity,
    entity: Id,
    message: String,
}

impl Issue {
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The entity the finding is about.
    pub fn entity(&self) -> Id {
        self.entity
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.entity, self.message)
    }
}

/// The findings of [`File::validate`](crate::File::validate).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Returns `true` if no errors were found; warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.severity.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.severity.is_warning())
    }

    fn error(&mut self, entity: Id, message: String) {
        self.issues.push(Issue {
            severity: Severity::Error,
            entity,
            message,
        });
    }

    fn warning(&mut self, entity: Id, message: String) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            entity,
            message,
        });
    }
}

/// Checks every record of `backend`.
pub(crate) fn validate(backend: &dyn Backend) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut parents = HashSet::new();

    for kind in [
        EntityKind::Block,
        EntityKind::DataArray,
        EntityKind::Tag,
        EntityKind::MultiTag,
        EntityKind::Feature,
        EntityKind::Group,
        EntityKind::Source,
        EntityKind::Section,
        EntityKind::Property,
    ] {
        for id in backend.records(kind) {
            let Some(record) = backend.get(id) else {
                continue;
            };
            if let Some(parent) = record.parent() {
                parents.insert(parent);
            }
            check_references(backend, record, &mut report);
            match kind {
                EntityKind::DataArray => check_data_array(record, &mut report),
                EntityKind::Tag => check_tag(backend, record, &mut report),
                EntityKind::MultiTag => check_multi_tag(backend, record, &mut report),
                EntityKind::Feature => check_feature(backend, record, &mut report),
                EntityKind::Property => check_property(record, &mut report),
                _ => {}
            }
        }
    }

    for parent in parents {
        check_sibling_names(backend, parent, &mut report);
    }

    debug!(
        errors = report.errors().count(),
        warnings = report.warnings().count();
        "Validated file"
    );
    report
}

fn check_references(backend: &dyn Backend, record: &Record, report: &mut ValidationReport) {
    let single = [
        (attr::METADATA, EntityKind::Section),
        (attr::LINK, EntityKind::Section),
    ];
    for (key, kind) in single {
        if let Some(target) = record.reference(key) {
            expect_kind(backend, record, key, target, kind, report);
        }
    }

    let lists = [
        (attr::SOURCES, EntityKind::Source),
        (attr::LINKED_SOURCES, EntityKind::Source),
        (attr::DATA_ARRAYS, EntityKind::DataArray),
        (attr::TAGS, EntityKind::Tag),
        (attr::MULTI_TAGS, EntityKind::MultiTag),
    ];
    for (key, kind) in lists {
        for target in record.refs(key) {
            expect_kind(backend, record, key, *target, kind, report);
        }
    }
}

fn expect_kind(
    backend: &dyn Backend,
    record: &Record,
    key: &str,
    target: Id,
    kind: EntityKind,
    report: &mut ValidationReport,
) {
    match backend.get(target) {
        Some(found) if found.kind() == kind => {}
        Some(found) => report.error(
            record.id(),
            format!("{key} reference {target} is a {}, expected a {kind}", found.kind()),
        ),
        None => report.error(record.id(), format!("{key} reference {target} is dangling")),
    }
}

fn check_data_array(record: &Record, report: &mut ValidationReport) {
    let Some(data) = record.data(attr::DATA) else {
        report.error(record.id(), "data array has no data".to_string());
        return;
    };
    let dims = record.dimensions(attr::DIMENSIONS);
    if dims.len() != data.rank() {
        report.error(
            record.id(),
            format!("{} dimensions for data of rank {}", dims.len(), data.rank()),
        );
    }

    for (i, (dim, extent)) in dims.iter().zip(data.shape()).enumerate() {
        if dim.index() != i + 1 {
            report.error(
                record.id(),
                format!("dimension at axis {} reports index {}", i + 1, dim.index()),
            );
        }
        match dim.kind() {
            DimensionKind::Range(range) => {
                if range.ticks().windows(2).any(|w| w[0] >= w[1]) {
                    report.error(record.id(), format!("ticks of dimension {} are not ascending", i + 1));
                }
                if range.ticks().len() != *extent {
                    report.warning(
                        record.id(),
                        format!(
                            "range dimension {} has {} ticks for an axis of extent {extent}",
                            i + 1,
                            range.ticks().len()
                        ),
                    );
                }
            }
            DimensionKind::Set(set) if !set.labels().is_empty() && set.labels().len() != *extent => {
                report.warning(
                    record.id(),
                    format!(
                        "set dimension {} has {} labels for an axis of extent {extent}",
                        i + 1,
                        set.labels().len()
                    ),
                );
            }
            _ => {}
        }
    }
}

fn check_tag(backend: &dyn Backend, record: &Record, report: &mut ValidationReport) {
    let position = record.numbers(attr::POSITION).unwrap_or_default();
    let extent = record.numbers(attr::EXTENT).unwrap_or_default();
    let units = record.texts(attr::UNITS);

    if position.is_empty() {
        report.error(record.id(), "tag has no position".to_string());
    }
    if extent.len() != position.len() {
        report.error(
            record.id(),
            format!("extent of length {} for a position of length {}", extent.len(), position.len()),
        );
    }
    if !units.is_empty() && units.len() != position.len() {
        report.error(
            record.id(),
            format!("{} units for a position of length {}", units.len(), position.len()),
        );
    }

    for array in record.refs(attr::REFERENCES) {
        let Some(array_record) = referenced_array(backend, record, *array, report) else {
            continue;
        };
        let rank = array_record.data(attr::DATA).map_or(0, NdBuffer::rank);
        if rank != position.len() {
            report.error(
                record.id(),
                format!("referenced data array {array} has rank {rank}, position has {}", position.len()),
            );
        }
        check_units_against(record, array_record, units, report);
    }
}

/// A unit-bearing tag cannot address a sampled dimension without a unit.
fn check_units_against(tag: &Record, array: &Record, units: &[String], report: &mut ValidationReport) {
    for (i, dim) in array.dimensions(attr::DIMENSIONS).iter().enumerate() {
        let Some(unit) = units.get(i) else {
            break;
        };
        if dim.dimension_type() == DimensionType::Sampled && dim.unit().is_none() && !units::is_unitless(unit) {
            report.error(
                tag.id(),
                format!(
                    "unit `{unit}` cannot be applied to sampled dimension {} of {} which has no unit",
                    i + 1,
                    array.id()
                ),
            );
        }
    }
}

fn check_multi_tag(backend: &dyn Backend, record: &Record, report: &mut ValidationReport) {
    let Some(positions_id) = record.reference(attr::POSITIONS) else {
        report.error(record.id(), "multi tag has no positions".to_string());
        return;
    };
    let Some(positions) = referenced_array(backend, record, positions_id, report) else {
        return;
    };
    let Some(positions) = region_data(record, positions, "positions", report) else {
        return;
    };
    let columns = positions.shape()[1];

    if let Some(extents_id) = record.reference(attr::EXTENTS)
        && let Some(extents) = referenced_array(backend, record, extents_id, report)
        && let Some(extents) = region_data(record, extents, "extents", report)
        && extents.shape() != positions.shape()
    {
        report.error(
            record.id(),
            format!(
                "extents of shape {:?} do not match positions of shape {:?}",
                extents.shape(),
                positions.shape()
            ),
        );
    }

    let units = record.texts(attr::UNITS);
    if !units.is_empty() && units.len() != columns {
        report.error(record.id(), format!("{} units for {columns} position columns", units.len()));
    }

    let mut largest = None;
    for array in record.refs(attr::REFERENCES) {
        if let Some(array_record) = referenced_array(backend, record, *array, report) {
            let rank = array_record.data(attr::DATA).map_or(0, NdBuffer::rank);
            largest = largest.max(Some(rank));
            check_units_against(record, array_record, units, report);
        }
    }
    if let Some(rank) = largest
        && rank != columns
    {
        report.error(
            record.id(),
            format!("positions have {columns} columns but the largest referenced rank is {rank}"),
        );
    }
}

fn region_data<'a>(
    tag: &Record,
    array: &'a Record,
    what: &str,
    report: &mut ValidationReport,
) -> Option<&'a NdBuffer> {
    let data = array.data(attr::DATA)?;
    if data.rank() != 2 {
        report.error(tag.id(), format!("{what} have rank {}, expected 2", data.rank()));
        return None;
    }
    if !data.data_type().is_numeric() {
        report.error(tag.id(), format!("{what} hold {} values, expected numbers", data.data_type()));
        return None;
    }
    Some(data)
}

fn referenced_array<'a>(
    backend: &'a dyn Backend,
    record: &Record,
    array: Id,
    report: &mut ValidationReport,
) -> Option<&'a Record> {
    match backend.get(array) {
        Some(found) if found.kind() == EntityKind::DataArray => Some(found),
        _ => {
            report.error(record.id(), format!("referenced data array {array} does not exist"));
            None
        }
    }
}

fn check_feature(backend: &dyn Backend, record: &Record, report: &mut ValidationReport) {
    match record.reference(attr::FEATURE_DATA) {
        Some(data) => {
            referenced_array(backend, record, data, report);
        }
        None => report.error(record.id(), "feature has no data".to_string()),
    }
    if record.link_type(attr::LINK_TYPE).is_none() {
        report.error(record.id(), "feature has no link type".to_string());
    }
}

fn check_property(record: &Record, report: &mut ValidationReport) {
    if let Err(err) = property::check_values(record.values(attr::VALUES)) {
        report.error(record.id(), err.message().to_string());
    }
    if let Some(unit) = record.text(attr::UNIT)
        && !units::is_si_unit(unit)
    {
        report.error(record.id(), format!("`{unit}` is not an SI unit"));
    }
}

fn check_sibling_names(backend: &dyn Backend, parent: Id, report: &mut ValidationReport) {
    for kind in [
        EntityKind::Block,
        EntityKind::DataArray,
        EntityKind::Tag,
        EntityKind::MultiTag,
        EntityKind::Group,
        EntityKind::Source,
        EntityKind::Section,
        EntityKind::Property,
    ] {
        let mut seen: IndexMap<&str, Id> = IndexMap::new();
        for id in backend.list(parent, kind) {
            let Some(name) = backend.get(id).and_then(Record::name) else {
                continue;
            };
            if let Some(first) = seen.insert(name, id) {
                report.error(id, format!("{kind} name `{name}` is already used by {first}"));
            }
        }
    }
}
