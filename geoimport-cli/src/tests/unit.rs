//! Unit tests for argument resolution and command execution.

use super::helpers::{CSV_POINTS, OVERPASS_SETTINGS, StubServices, Workspace};
use crate::CliError;
use crate::areas::{AreasArgs, AreasConfig, search_areas};
use crate::detect::{DetectArgs, detect};
use crate::helper::{HelperConfig, HelperParams, resolve_helper};
use crate::import::{ImportArgs, ImportConfig, ImportSource, execute_import, parse_bbox};
use crate::query::{QueryArgs, QueryConfig, build_query};
use crate::services::NetworkConfig;
use crate::{ARG_BBOX, ARG_EXPRESSION, ARG_FORMAT, ARG_SETTINGS, ARG_TEXT, Cli, Command};
use clap::Parser;
use geo::Coord;
use geoimport_core::{BoundaryChoice, ImportAction, ImportFormat};
use rstest::{fixture, rstest};

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

fn raw_csv_config() -> ImportConfig {
    ImportConfig::try_from(ImportArgs {
        raw: Some(CSV_POINTS.to_owned()),
        format: Some("csv".to_owned()),
        ..ImportArgs::default()
    })
    .expect("config")
}

#[rstest]
fn bbox_parses_in_west_south_east_north_order() {
    let rect = parse_bbox("4.8, 45.7, 4.9, 45.8").expect("bbox");
    assert_eq!(rect.min(), Coord { x: 4.8, y: 45.7 });
    assert_eq!(rect.max(), Coord { x: 4.9, y: 45.8 });
}

#[rstest]
#[case("4.8,45.7,4.9")]
#[case("4.9,45.7,4.8,45.8")]
#[case("west,45.7,4.9,45.8")]
fn bad_bbox_is_rejected(#[case] raw: &str) {
    match parse_bbox(raw) {
        Err(CliError::InvalidArgument { field, .. }) => assert_eq!(field, ARG_BBOX),
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[rstest]
fn import_requires_a_source() {
    let err = ImportConfig::try_from(ImportArgs::default()).expect_err("no source");
    assert!(matches!(err, CliError::SourceChoice), "got {err:?}");
}

#[rstest]
fn import_rejects_two_sources() {
    let args = ImportArgs {
        url: Some("https://data.example/a.csv".to_owned()),
        raw: Some(CSV_POINTS.to_owned()),
        ..ImportArgs::default()
    };
    let err = ImportConfig::try_from(args).expect_err("two sources");
    assert!(matches!(err, CliError::SourceChoice), "got {err:?}");
}

#[rstest]
fn helper_source_needs_settings() {
    let args = ImportArgs {
        helper: Some("overpass".to_owned()),
        ..ImportArgs::default()
    };
    match ImportConfig::try_from(args) {
        Err(CliError::MissingArgument { field, .. }) => assert_eq!(field, ARG_SETTINGS),
        other => panic!("expected MissingArgument, got {other:?}"),
    }
}

#[rstest]
fn unknown_format_is_rejected() {
    let args = ImportArgs {
        raw: Some(CSV_POINTS.to_owned()),
        format: Some("shapefile".to_owned()),
        ..ImportArgs::default()
    };
    match ImportConfig::try_from(args) {
        Err(CliError::InvalidArgument { field, .. }) => assert_eq!(field, ARG_FORMAT),
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
}

#[rstest]
fn import_defaults_to_copy_and_keeps_helper_params() {
    let config = ImportConfig::try_from(ImportArgs {
        helper: Some("overpass".to_owned()),
        settings: Some("settings.json".into()),
        expression: Some("amenity=bench".to_owned()),
        area: Some("3600123".to_owned()),
        ..ImportArgs::default()
    })
    .expect("config");
    assert_eq!(config.action, ImportAction::Copy);
    assert_eq!(config.network, NetworkConfig::default());
    let ImportSource::Helper { name, params, .. } = config.source else {
        panic!("expected helper source");
    };
    assert_eq!(name, "overpass");
    assert_eq!(params.area.as_deref(), Some("3600123"));
}

#[rstest]
fn query_requires_expression() {
    match QueryConfig::try_from(QueryArgs::default()) {
        Err(CliError::MissingArgument { field, .. }) => assert_eq!(field, ARG_EXPRESSION),
        other => panic!("expected MissingArgument, got {other:?}"),
    }
}

#[rstest]
fn query_with_area_points_at_endpoint() {
    let config = QueryConfig::try_from(QueryArgs {
        expression: Some("amenity=bench".to_owned()),
        mode: Some("center".to_owned()),
        area: Some("area:3600123".to_owned()),
        endpoint: Some("https://overpass.example/api/interpreter".to_owned()),
    })
    .expect("config");
    let report = build_query(&config).expect("query");
    assert_eq!(
        report.query,
        "[out:json];nwr[amenity=bench](area:3600123);out center;"
    );
    assert!(
        report
            .url
            .starts_with("https://overpass.example/api/interpreter?data=")
    );
}

#[rstest]
fn query_rejects_unknown_mode() {
    let err = QueryConfig::try_from(QueryArgs {
        expression: Some("amenity=bench".to_owned()),
        mode: Some("outline".to_owned()),
        ..QueryArgs::default()
    })
    .expect_err("bad mode");
    assert_eq!(
        err.to_string(),
        "invalid mode: unknown geometry mode: outline"
    );
}

#[rstest]
#[case(None)]
#[case(Some("   "))]
fn areas_require_text(#[case] text: Option<&str>) {
    let args = AreasArgs {
        text: text.map(str::to_owned),
        ..AreasArgs::default()
    };
    match AreasConfig::try_from(args) {
        Err(CliError::MissingArgument { field, .. }) => assert_eq!(field, ARG_TEXT),
        other => panic!("expected MissingArgument, got {other:?}"),
    }
}

#[rstest]
fn areas_lists_search_results() {
    let services = StubServices {
        choices: vec![BoundaryChoice::new("3600002202", "Lyon, France")],
        ..StubServices::default()
    };
    let config = AreasConfig::try_from(AreasArgs {
        text: Some("Lyon".to_owned()),
        ..AreasArgs::default()
    })
    .expect("config");
    let choices = search_areas(&config, &services).expect("search");
    assert_eq!(choices, [BoundaryChoice::new("3600002202", "Lyon, France")]);
}

#[rstest]
fn areas_search_accepts_padded_text() {
    let config = AreasConfig::try_from(AreasArgs {
        text: Some("  Lyon ".to_owned()),
        ..AreasArgs::default()
    })
    .expect("config");
    let services = StubServices {
        choices: vec![BoundaryChoice::new("3600002202", "Lyon, France")],
        ..StubServices::default()
    };
    let choices = search_areas(&config, &services).expect("padded text still searches");
    assert_eq!(choices.len(), 1);
}

#[rstest]
fn detect_reports_shared_format(workspace: Workspace) {
    let args = DetectArgs {
        files: vec![
            workspace.write("a.csv", CSV_POINTS),
            workspace.write("b.csv", CSV_POINTS),
        ],
    };
    let report = detect(&args).expect("detect");
    assert_eq!(report.format, Some(ImportFormat::Csv));
}

#[rstest]
fn detect_reports_missing_file(workspace: Workspace) {
    let args = DetectArgs {
        files: vec![workspace.path("absent.gpx")],
    };
    let err = detect(&args).expect_err("missing");
    assert!(matches!(err, CliError::MissingSourceFile { .. }), "got {err:?}");
}

#[rstest]
fn raw_csv_import_creates_one_layer() {
    let summary = execute_import(&raw_csv_config(), &StubServices::default()).expect("import");
    assert_eq!(summary.count, Some(2));
    assert_eq!(summary.message, "Successfully imported 2 features");
    assert_eq!(summary.layers.len(), 1);
    assert_eq!(summary.layers[0].features, 2);
}

#[rstest]
fn file_import_uses_layer_name(workspace: Workspace) {
    let config = ImportConfig::try_from(ImportArgs {
        file: vec![workspace.write("squares.csv", CSV_POINTS)],
        layer_name: Some("Squares".to_owned()),
        ..ImportArgs::default()
    })
    .expect("config");
    let summary = execute_import(&config, &StubServices::default()).expect("import");
    assert_eq!(summary.layers[0].name.as_deref(), Some("Squares"));
}

#[rstest]
fn failed_fetch_leaves_no_layer() {
    let config = ImportConfig::try_from(ImportArgs {
        url: Some("https://data.example/points.csv".to_owned()),
        format: Some("csv".to_owned()),
        ..ImportArgs::default()
    })
    .expect("config");
    let err = execute_import(&config, &StubServices::default()).expect_err("404");
    assert!(matches!(err, CliError::Import(_)), "got {err:?}");
}

#[rstest]
fn helper_resolves_overpass_source(workspace: Workspace) {
    let config = HelperConfig {
        name: "overpass".to_owned(),
        settings: workspace.write("settings.json", OVERPASS_SETTINGS),
        params: HelperParams {
            expression: Some("amenity=bench".to_owned()),
            area: Some("3600123".to_owned()),
            ..HelperParams::default()
        },
        network: NetworkConfig::default(),
    };
    let report = resolve_helper(&config, &StubServices::default()).expect("helper");
    assert_eq!(report.format, Some(ImportFormat::Osm));
    assert_eq!(report.layer_name.as_deref(), Some("3600123"));
    let url = report.url.expect("url");
    assert!(url.starts_with("https://overpass.example/api/interpreter?data="));
    assert!(url.contains("area%3A3600123"));
}

#[rstest]
fn unknown_helper_is_reported(workspace: Workspace) {
    let config = HelperConfig {
        name: "cadastre".to_owned(),
        settings: workspace.write("settings.json", OVERPASS_SETTINGS),
        params: HelperParams::default(),
        network: NetworkConfig::default(),
    };
    let err = resolve_helper(&config, &StubServices::default()).expect_err("unknown");
    assert!(matches!(err, CliError::UnknownHelper(ref name) if name == "cadastre"));
}

#[rstest]
fn malformed_settings_are_reported(workspace: Workspace) {
    let config = HelperConfig {
        name: "overpass".to_owned(),
        settings: workspace.write("settings.json", "{ not json"),
        params: HelperParams::default(),
        network: NetworkConfig::default(),
    };
    let err = resolve_helper(&config, &StubServices::default()).expect_err("bad json");
    assert!(matches!(err, CliError::ParseSettings { .. }), "got {err:?}");
}

#[rstest]
fn import_subcommand_parses_repeated_files() {
    let cli = Cli::try_parse_from([
        "geoimport", "import", "--file", "a.gpx", "--file", "b.gpx", "--proxy",
    ])
    .expect("parse");
    let Command::Import(args) = cli.command else {
        panic!("expected import command");
    };
    assert_eq!(args.file.len(), 2);
    assert!(args.proxy);
}
