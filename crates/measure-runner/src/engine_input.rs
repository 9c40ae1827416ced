//! Engine input collected before simulation.
//!
//! Starts from what the model translates to (reporting objects only) and
//! then accepts modules' output requests under these rules:
//!
//! - unique object types replace any existing object of that type
//! - `Output:Table:SummaryReports` merges its report list, in order,
//!   without duplicates
//! - a named object is not added twice (same type and name)
//! - an identical unnamed object is not added twice
//! - potentially unsafe types are rejected unless explicitly allowed

use serde::Serialize;

use measure_core::metrics::METRICS;
use measure_core::obs;
use measure_core::{EngineOutputRequest, ModelHandle, OutputJsonOption};

/// Types of which the engine accepts a single instance.
pub const UNIQUE_OBJECT_TYPES: [&str; 8] = [
    "Output:SQLite",
    "Output:JSON",
    "Output:Diagnostics",
    "Output:VariableDictionary",
    "Output:Control:Files",
    "Output:Control:Table:Style",
    "Output:Control:ReportingTolerances",
    "Output:Control:Timestamp",
];

const SUMMARY_REPORTS: &str = "Output:Table:SummaryReports";

/// Prefixes of types whose first field is the object's name.
const NAMED_TYPE_PREFIXES: [&str; 10] = [
    "EnergyManagementSystem:",
    "PythonPlugin:",
    "Schedule:",
    "Meter:Custom",
    "Output:Table:Monthly",
    "Output:Table:Annual",
    "UtilityCost:",
    "LifeCycleCost:",
    "ComponentCost:LineItem",
    "Currency",
];

fn is_unique_type(object_type: &str) -> bool {
    UNIQUE_OBJECT_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(object_type))
}

fn object_name(request: &EngineOutputRequest) -> Option<&str> {
    let lowered = request.object_type().to_ascii_lowercase();
    let named = NAMED_TYPE_PREFIXES
        .iter()
        .any(|p| lowered.starts_with(&p.to_ascii_lowercase()));
    if !named {
        return None;
    }
    request.field(0).filter(|name| !name.is_empty())
}

fn same_object(a: &EngineOutputRequest, b: &EngineOutputRequest) -> bool {
    a.object_type().eq_ignore_ascii_case(b.object_type())
        && a.fields().len() == b.fields().len()
        && a
            .fields()
            .iter()
            .zip(b.fields())
            .all(|(x, y)| x.eq_ignore_ascii_case(y))
}

/// What happened to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Replaced,
    Merged,
    Duplicate,
}

/// Counts of how a batch of requests was handled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcceptSummary {
    pub added: usize,
    pub replaced: usize,
    pub merged: usize,
    pub duplicates: usize,
    /// Rendered text of rejected requests.
    pub rejected: Vec<String>,
}

impl AcceptSummary {
    pub fn absorb(&mut self, other: AcceptSummary) {
        self.added += other.added;
        self.replaced += other.replaced;
        self.merged += other.merged;
        self.duplicates += other.duplicates;
        self.rejected.extend(other.rejected);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineInput {
    objects: Vec<EngineOutputRequest>,
}

impl EngineInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporting objects the model translates to.
    pub fn translate(model: &dyn ModelHandle) -> Self {
        let mut input = Self::new();
        input.add(EngineOutputRequest::new("Output:SQLite", ["SimpleAndTabular"]));

        let reporting = model.reporting();
        if let Some(json) = reporting.output_json() {
            let option = match json.option_type {
                OutputJsonOption::TimeSeries => "TimeSeries",
                OutputJsonOption::TimeSeriesAndTabular => "TimeSeriesAndTabular",
            };
            let yes_no = |b: bool| if b { "Yes" } else { "No" };
            input.add(EngineOutputRequest::new(
                "Output:JSON",
                [
                    option,
                    yes_no(json.output_json),
                    yes_no(json.output_cbor),
                    yes_no(json.output_message_pack),
                ],
            ));
        }
        let reports = reporting.summary_reports();
        if !reports.is_empty() {
            input.add(EngineOutputRequest::summary_reports(reports));
        }
        input
    }

    pub fn objects(&self) -> &[EngineOutputRequest] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Add one object under the merge rules.
    pub fn add(&mut self, request: EngineOutputRequest) -> AddOutcome {
        if request.is_type(SUMMARY_REPORTS) {
            if let Some(existing) = self.objects.iter_mut().find(|o| o.is_type(SUMMARY_REPORTS)) {
                let mut fields = existing.fields().to_vec();
                let before = fields.len();
                for report in request.fields() {
                    if !fields.iter().any(|f| f.eq_ignore_ascii_case(report)) {
                        fields.push(report.clone());
                    }
                }
                if fields.len() == before {
                    return AddOutcome::Duplicate;
                }
                *existing = EngineOutputRequest::new(SUMMARY_REPORTS, fields);
                return AddOutcome::Merged;
            }
        } else if is_unique_type(request.object_type()) {
            if let Some(existing) = self
                .objects
                .iter_mut()
                .find(|o| o.is_type(request.object_type()))
            {
                if same_object(existing, &request) {
                    return AddOutcome::Duplicate;
                }
                *existing = request;
                return AddOutcome::Replaced;
            }
        } else if let Some(name) = object_name(&request) {
            let taken = self.objects.iter().any(|o| {
                o.is_type(request.object_type())
                    && object_name(o).is_some_and(|n| n.eq_ignore_ascii_case(name))
            });
            if taken {
                return AddOutcome::Duplicate;
            }
        } else if self.objects.iter().any(|o| same_object(o, &request)) {
            return AddOutcome::Duplicate;
        }

        self.objects.push(request);
        AddOutcome::Added
    }

    /// Accept a module's requests, rejecting unsafe ones unless allowed.
    pub fn accept(
        &mut self,
        module: &str,
        requests: Vec<EngineOutputRequest>,
        allow_unsafe: bool,
    ) -> AcceptSummary {
        let mut summary = AcceptSummary::default();
        for request in requests {
            if request.is_potentially_unsafe() && !allow_unsafe {
                let text = request.to_string();
                obs::emit_unsafe_request(module, &text);
                METRICS.inc_requests_rejected();
                summary.rejected.push(text);
                continue;
            }
            METRICS.inc_requests_accepted();
            match self.add(request) {
                AddOutcome::Added => summary.added += 1,
                AddOutcome::Replaced => summary.replaced += 1,
                AddOutcome::Merged => summary.merged += 1,
                AddOutcome::Duplicate => summary.duplicates += 1,
            }
        }
        summary
    }

    /// One object per line in the engine's text form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for object in &self.objects {
            out.push_str(&object.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measure_core::fakes::FakeModel;
    use measure_core::{OutputJson, ReportingFrequency};

    fn parse(text: &str) -> EngineOutputRequest {
        EngineOutputRequest::parse(text).unwrap()
    }

    #[test]
    fn test_translate_includes_reporting_settings() {
        let mut model = FakeModel::new();
        let plain = EngineInput::translate(&model);
        assert_eq!(plain.render(), "Output:SQLite, SimpleAndTabular;\n");

        model.reporting.output_json = Some(OutputJson::default());
        model.reporting.summary_reports = vec!["AllSummary".to_string()];
        let input = EngineInput::translate(&model);
        assert_eq!(
            input.render(),
            "Output:SQLite, SimpleAndTabular;\n\
             Output:JSON, TimeSeriesAndTabular, Yes, No, No;\n\
             Output:Table:SummaryReports, AllSummary;\n"
        );
    }

    #[test]
    fn test_unique_objects_replace() {
        let mut input = EngineInput::new();
        input.add(parse("Output:SQLite, Simple;"));
        assert_eq!(input.add(parse("Output:SQLite, SimpleAndTabular;")), AddOutcome::Replaced);
        assert_eq!(input.add(parse("output:sqlite, simpleandtabular;")), AddOutcome::Duplicate);
        assert_eq!(input.len(), 1);
        assert_eq!(input.objects()[0].field(0), Some("SimpleAndTabular"));
    }

    #[test]
    fn test_summary_reports_merge_in_order() {
        let mut input = EngineInput::new();
        input.add(EngineOutputRequest::summary_reports(["AllSummary"]));
        let outcome = input.add(EngineOutputRequest::summary_reports([
            "EnvelopeSummary",
            "allsummary",
            "ZoneComponentLoadSummary",
        ]));
        assert_eq!(outcome, AddOutcome::Merged);
        assert_eq!(
            input.objects()[0].fields(),
            ["AllSummary", "EnvelopeSummary", "ZoneComponentLoadSummary"]
        );
        assert_eq!(
            input.add(EngineOutputRequest::summary_reports(["AllSummary"])),
            AddOutcome::Duplicate
        );
    }

    #[test]
    fn test_named_objects_added_once() {
        let mut input = EngineInput::new();
        assert_eq!(
            input.add(parse("EnergyManagementSystem:GlobalVariable, Counter;")),
            AddOutcome::Added
        );
        assert_eq!(
            input.add(parse("EnergyManagementSystem:GlobalVariable, counter;")),
            AddOutcome::Duplicate
        );
        assert_eq!(
            input.add(parse("EnergyManagementSystem:GlobalVariable, Other;")),
            AddOutcome::Added
        );
    }

    #[test]
    fn test_identical_unnamed_objects_added_once() {
        let mut input = EngineInput::new();
        let hourly = EngineOutputRequest::variable(None, "Site Outdoor Air Drybulb Temperature", ReportingFrequency::Hourly);
        let daily = EngineOutputRequest::variable(None, "Site Outdoor Air Drybulb Temperature", ReportingFrequency::Daily);
        assert_eq!(input.add(hourly.clone()), AddOutcome::Added);
        assert_eq!(input.add(hourly), AddOutcome::Duplicate);
        assert_eq!(input.add(daily), AddOutcome::Added);
    }

    #[test]
    fn test_accept_rejects_unsafe_unless_allowed() {
        let requests = vec![
            parse("Output:Meter, Electricity:Facility, Hourly;"),
            parse("Zone, Attic;"),
        ];
        let mut input = EngineInput::new();
        let summary = input.accept("m", requests.clone(), false);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.rejected, vec!["Zone, Attic;".to_string()]);

        let mut permissive = EngineInput::new();
        let summary = permissive.accept("m", requests, true);
        assert_eq!(summary.added, 2);
        assert!(summary.rejected.is_empty());
    }
}
