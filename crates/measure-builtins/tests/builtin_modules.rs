//! End-to-end checks of the builtin modules through the invocation driver.

use serde_json::json;

use measure_builtins::{
    default_registry, MinimalReporting, ReportingWithModelOutputRequests, SetModelicaZones,
    ZoneTemperatureReport, DRYBULB_VARIABLE,
};
use measure_core::fakes::{FakeModel, FakeResultsStore};
use measure_core::{
    execute, with_defaults, ArgumentContext, FailureKind, Invocation, Module, ModelHandle,
    OutputValue, RawArguments, StepStatus,
};

fn defaults_for(module: &dyn Module, model: Option<&dyn ModelHandle>) -> RawArguments {
    let specs = module.arguments(&ArgumentContext::from_option(model));
    with_defaults(&specs, &RawArguments::new())
}

#[tokio::test]
async fn drybulb_report_with_data() {
    let module = ReportingWithModelOutputRequests;
    let mut model = FakeModel::new();
    let store =
        FakeResultsStore::empty().with_hourly(DRYBULB_VARIABLE, "Environment", vec![-3.5, 4.0, 12.25]);
    let dir = tempfile::tempdir().unwrap();

    let mut inv = Invocation::new(&module, defaults_for(&module, None));
    assert!(inv.pre_translation(&mut model).unwrap());
    assert!(model.reporting.output_json.is_some());
    assert_eq!(inv.output_requests(Some(&model)).unwrap().len(), 1);

    let result = inv.run(Some(&mut model), Some(&store), dir.path()).await;
    assert_eq!(result.status, StepStatus::Success, "{:?}", result.messages);
    assert_eq!(result.value("drybulb_min"), Some(&OutputValue::Double(-3.5)));
    assert_eq!(result.value("drybulb_max"), Some(&OutputValue::Double(12.25)));

    let html = std::fs::read_to_string(dir.path().join("report.html")).unwrap();
    assert!(html.contains("12.25 C"));
    assert_eq!(store.acquire_count(), 1);
    assert_eq!(store.release_count(), 1);
}

#[tokio::test]
async fn drybulb_report_without_data_still_writes_report() {
    let module = ReportingWithModelOutputRequests;
    let mut model = FakeModel::new();
    let store = FakeResultsStore::empty();
    let dir = tempfile::tempdir().unwrap();

    let result = execute(
        &module,
        defaults_for(&module, None),
        Some(&mut model),
        Some(&store),
        dir.path(),
    )
    .await;
    assert!(result.success());
    assert!(result.values.is_empty());
    assert!(dir.path().join("report.html").exists());
}

#[tokio::test]
async fn minimal_module_succeeds_with_collaborators() {
    let mut model = FakeModel::new();
    let store = FakeResultsStore::empty();
    let dir = tempfile::tempdir().unwrap();
    let result = execute(
        &MinimalReporting,
        RawArguments::new(),
        Some(&mut model),
        Some(&store),
        dir.path(),
    )
    .await;
    assert_eq!(result.status, StepStatus::Success);
    assert!(result.reports.is_empty());
    assert_eq!(store.acquire_count(), 0);
}

#[tokio::test]
async fn zone_report_all_zones() {
    let mut model = FakeModel::new()
        .with_zone("Core", 100.0, 5.0)
        .with_zone("Perimeter", 40.0, 1.0);
    let store = FakeResultsStore::empty()
        .with_hourly("Zone Mean Air Temperature", "Core", vec![20.0, 22.0])
        .with_hourly("Zone Mean Air Temperature", "Perimeter", vec![18.0, 26.5]);
    let dir = tempfile::tempdir().unwrap();

    let raw = defaults_for(&ZoneTemperatureReport, Some(&model));
    let result = execute(&ZoneTemperatureReport, raw, Some(&mut model), Some(&store), dir.path()).await;

    assert_eq!(result.status, StepStatus::Success, "{:?}", result.messages);
    assert_eq!(result.value("zones_reported"), Some(&OutputValue::Integer(2)));
    assert_eq!(result.value("peak_zone_temperature"), Some(&OutputValue::Double(26.5)));
    let csv = std::fs::read_to_string(dir.path().join("report_zone_temperatures.csv")).unwrap();
    assert_eq!(csv.lines().count(), 3);
}

#[tokio::test]
async fn zone_report_not_applicable_without_zones() {
    let mut model = FakeModel::new();
    let store = FakeResultsStore::empty();
    let dir = tempfile::tempdir().unwrap();
    let raw = defaults_for(&ZoneTemperatureReport, None);
    let result = execute(&ZoneTemperatureReport, raw, Some(&mut model), Some(&store), dir.path()).await;
    assert_eq!(result.status, StepStatus::NotApplicable);
    assert!(result.success());
}

#[tokio::test]
async fn zone_report_rejects_zone_missing_from_model() {
    let mut model = FakeModel::new().with_zone("Core", 100.0, 5.0);
    let store = FakeResultsStore::empty();
    let dir = tempfile::tempdir().unwrap();
    let mut raw = defaults_for(&ZoneTemperatureReport, Some(&model));
    raw.insert("zone".to_string(), json!("Attic"));

    let result = execute(&ZoneTemperatureReport, raw, Some(&mut model), Some(&store), dir.path()).await;
    assert_eq!(
        result.failure,
        Some(FailureKind::Validation {
            argument: "zone".to_string()
        })
    );
}

#[tokio::test]
async fn modelica_zones_sets_parameters() {
    let mut model = FakeModel::new()
        .with_zone("A", 10.0, 1.0)
        .with_zone("Plenum", 10.0, 0.0)
        .with_zone("B", 10.0, 3.0);
    let store = FakeResultsStore::empty();
    let dir = tempfile::tempdir().unwrap();

    let result = execute(
        &SetModelicaZones,
        RawArguments::new(),
        Some(&mut model),
        Some(&store),
        dir.path(),
    )
    .await;
    assert!(result.success());
    assert_eq!(model.parameter("zoneNames").as_deref(), Some("{\"A\", \"B\"}"));
    assert_eq!(model.parameter("zoneCount").as_deref(), Some("2"));
    assert_eq!(result.value("zone_count"), Some(&OutputValue::Integer(2)));
}

#[test]
fn every_builtin_describes_itself_without_a_model() {
    let registry = default_registry().unwrap();
    for (id, module) in registry.iter() {
        assert!(!module.name().is_empty(), "{id} has no name");
        let specs = module.arguments(&ArgumentContext::empty());
        let raw = with_defaults(&specs, &RawArguments::new());
        assert!(
            measure_core::validate(&specs, &raw).is_ok(),
            "{id} defaults do not validate"
        );
    }
}
