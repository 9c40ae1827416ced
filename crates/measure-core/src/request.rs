//! Engine output requests.
//!
//! An [`EngineOutputRequest`] is a single engine input object (an object type
//! plus ordered fields) that a module asks the orchestrator to add before the
//! simulation runs, e.g. `Output:Variable,*,Site Outdoor Air Drybulb Temperature,Hourly;`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RequestParseError;

/// Object-type prefixes accepted without an explicit opt-in.
///
/// Schedules may drive meters or variables and the EMS/plugin objects can be
/// used for custom reporting, so they are included alongside cost objects.
pub const SAFE_REQUEST_PREFIXES: [&str; 11] = [
    "Output",
    "Meter",
    "PythonPlugin",
    "EnergyManagementSystem",
    "Schedule",
    "LifeCycleCost",
    "UtilityCost",
    "ComponentCost",
    "Compliance",
    "Currency",
    "FuelFactors",
];

/// Reporting frequency for variables and meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportingFrequency {
    Detailed,
    Timestep,
    Hourly,
    Daily,
    Monthly,
    RunPeriod,
    Annual,
}

impl ReportingFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportingFrequency::Detailed => "Detailed",
            ReportingFrequency::Timestep => "Timestep",
            ReportingFrequency::Hourly => "Hourly",
            ReportingFrequency::Daily => "Daily",
            ReportingFrequency::Monthly => "Monthly",
            ReportingFrequency::RunPeriod => "RunPeriod",
            ReportingFrequency::Annual => "Annual",
        }
    }

    pub const ALL: [ReportingFrequency; 7] = [
        ReportingFrequency::Detailed,
        ReportingFrequency::Timestep,
        ReportingFrequency::Hourly,
        ReportingFrequency::Daily,
        ReportingFrequency::Monthly,
        ReportingFrequency::RunPeriod,
        ReportingFrequency::Annual,
    ];
}

impl fmt::Display for ReportingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportingFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|freq| freq.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown reporting frequency: {s}"))
    }
}

/// A request for an engine input object, made before simulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineOutputRequest {
    object_type: String,
    fields: Vec<String>,
}

impl EngineOutputRequest {
    pub fn new<I, S>(object_type: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            object_type: object_type.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// `Output:Variable`; a `None` key value requests every key (`*`).
    pub fn variable(key_value: Option<&str>, name: &str, frequency: ReportingFrequency) -> Self {
        Self::new(
            "Output:Variable",
            [key_value.unwrap_or("*"), name, frequency.as_str()],
        )
    }

    pub fn meter(name: &str, frequency: ReportingFrequency) -> Self {
        Self::new("Output:Meter", [name, frequency.as_str()])
    }

    pub fn summary_reports<I, S>(reports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("Output:Table:SummaryReports", reports)
    }

    /// Parse the single-object text form `Type, field, field;`.
    ///
    /// Anything after a `!` on a line is a comment.
    pub fn parse(text: &str) -> Result<Self, RequestParseError> {
        let body: String = text
            .lines()
            .map(|line| line.split('!').next().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ");
        let body = body.trim();
        if body.is_empty() {
            return Err(RequestParseError::Empty);
        }
        let body = body
            .strip_suffix(';')
            .ok_or_else(|| RequestParseError::MissingTerminator(body.to_string()))?;

        let mut parts = body.split(',').map(str::trim);
        let object_type = parts.next().unwrap_or_default();
        if object_type.is_empty() {
            return Err(RequestParseError::MissingType(text.trim().to_string()));
        }
        let mut fields: Vec<String> = parts.map(str::to_string).collect();
        // A blank key value on a variable means "all keys".
        if object_type.eq_ignore_ascii_case("Output:Variable")
            && fields.first().is_some_and(|k| k.is_empty())
        {
            fields[0] = "*".to_string();
        }
        Ok(Self::new(object_type, fields))
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Whether this request is of the given object type (case-insensitive).
    pub fn is_type(&self, object_type: &str) -> bool {
        self.object_type.eq_ignore_ascii_case(object_type)
    }

    /// True if the type starts with none of [`SAFE_REQUEST_PREFIXES`].
    pub fn is_potentially_unsafe(&self) -> bool {
        let lowered = self.object_type.to_ascii_lowercase();
        !SAFE_REQUEST_PREFIXES
            .iter()
            .any(|prefix| lowered.starts_with(&prefix.to_ascii_lowercase()))
    }
}

impl fmt::Display for EngineOutputRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            write!(f, "{};", self.object_type)
        } else {
            write!(f, "{}, {};", self.object_type, self.fields.join(", "))
        }
    }
}

impl FromStr for EngineOutputRequest {
    type Err = RequestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable_with_blank_key() {
        let req =
            EngineOutputRequest::parse("Output:Variable, , Site Outdoor Air Drybulb Temperature, Hourly;")
                .unwrap();
        assert_eq!(
            req,
            EngineOutputRequest::variable(
                None,
                "Site Outdoor Air Drybulb Temperature",
                ReportingFrequency::Hourly
            )
        );
    }

    #[test]
    fn test_parse_multiline_with_comments() {
        let text = "Output:Table:SummaryReports,  ! reports\n  AllSummary,\n  EnvelopeSummary;  ! done";
        let req = EngineOutputRequest::parse(text).unwrap();
        assert!(req.is_type("output:table:summaryreports"));
        assert_eq!(req.fields(), ["AllSummary", "EnvelopeSummary"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(EngineOutputRequest::parse("  "), Err(RequestParseError::Empty));
        assert!(matches!(
            EngineOutputRequest::parse("Output:SQLite, Simple"),
            Err(RequestParseError::MissingTerminator(_))
        ));
        assert!(matches!(
            EngineOutputRequest::parse(", Simple;"),
            Err(RequestParseError::MissingType(_))
        ));
    }

    #[test]
    fn test_display_form() {
        let req = EngineOutputRequest::meter("Electricity:Facility", ReportingFrequency::Monthly);
        assert_eq!(req.to_string(), "Output:Meter, Electricity:Facility, Monthly;");
        let bare = EngineOutputRequest::new("Output:VariableDictionary", Vec::<String>::new());
        assert_eq!(bare.to_string(), "Output:VariableDictionary;");
    }

    #[test]
    fn test_unsafe_detection() {
        assert!(!EngineOutputRequest::new("Output:SQLite", ["SimpleAndTabular"]).is_potentially_unsafe());
        assert!(!EngineOutputRequest::new("Schedule:Constant", ["AlwaysOn", "", "1"]).is_potentially_unsafe());
        assert!(!EngineOutputRequest::new("EnergyManagementSystem:Program", ["P"]).is_potentially_unsafe());
        assert!(EngineOutputRequest::new("Zone", ["Core"]).is_potentially_unsafe());
        assert!(EngineOutputRequest::new("Material", ["Brick"]).is_potentially_unsafe());
    }

    #[test]
    fn test_frequency_from_str() {
        assert_eq!("hourly".parse::<ReportingFrequency>(), Ok(ReportingFrequency::Hourly));
        assert!("weekly".parse::<ReportingFrequency>().is_err());
    }
}
