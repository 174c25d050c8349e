use cogjen::runtime::BuildError;
use cogjen::{Encoder, EncoderConfig};
use dev_test_runner::plain::dashboard::{builders, models};
use dev_test_runner::reshaped::dashboard::{builders as reshaped, models as reshaped_models};
use dev_test_runner::veneered::dashboard::{builders as veneered, models as veneered_models};
use serde_json::json;

fn compact(sort_keys: bool) -> Encoder {
    Encoder::new(EncoderConfig { sort_keys, indent: 0 })
}

fn link(title: &str, url: &str) -> models::DashboardLink {
    models::DashboardLink { title: title.into(), url: url.into(), tooltip: None }
}

#[test]
fn dashboard_end_to_end() {
    let dashboard = builders::DashboardBuilder::new()
        .title("X")
        .links([
            builders::DashboardLinkBuilder::new().title("A").url("u1"),
            builders::DashboardLinkBuilder::new().title("B").url("u2"),
        ])
        .build()
        .unwrap();

    let expected = models::Dashboard {
        title: "X".into(),
        links: Some(vec![link("A", "u1"), link("B", "u2")]),
        ..Default::default()
    };
    assert_eq!(dashboard, expected);

    let sorted = String::from_utf8(compact(true).encode(&dashboard).unwrap()).unwrap();
    assert_eq!(
        sorted,
        r#"{"editable":true,"graphTooltip":0,"links":[{"title":"A","url":"u1"},{"title":"B","url":"u2"}],"style":"dark","title":"X"}"#
    );
    assert!(sorted.find(r#""links""#).unwrap() < sorted.find(r#""title":"X""#).unwrap());

    let declared = String::from_utf8(compact(false).encode(&dashboard).unwrap()).unwrap();
    assert_eq!(
        declared,
        r#"{"title":"X","graphTooltip":0,"style":"dark","editable":true,"links":[{"title":"A","url":"u1"},{"title":"B","url":"u2"}]}"#
    );
}

#[test]
fn encoded_output_is_plain_json() {
    let dashboard = builders::DashboardBuilder::new()
        .title("X")
        .tags(vec!["ops".to_string()])
        .links([link("A", "u1")])
        .build()
        .unwrap();

    let bytes = Encoder::default().encode(&dashboard).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        value,
        json!({
            "title": "X",
            "tags": ["ops"],
            "graphTooltip": 0,
            "style": "dark",
            "editable": true,
            "links": [{ "title": "A", "url": "u1" }],
        })
    );
}

#[test]
fn build_is_repeatable() {
    let builder = builders::DashboardBuilder::new().title("X").tags(vec!["a".to_string()]);
    let mut first = builder.build().unwrap();
    let second = builder.build().unwrap();
    assert_eq!(first, second);

    first.title.push_str(" changed");
    assert_eq!(builder.build().unwrap(), second);
}

#[test]
fn nested_builders_are_captured_when_assigned() {
    let link_builder = builders::DashboardLinkBuilder::new().title("A").url("u1");
    let dashboard_builder = builders::DashboardBuilder::new().title("X").links([&link_builder]);
    let link_builder = link_builder.title("B");

    let dashboard = dashboard_builder.build().unwrap();
    assert_eq!(dashboard.links, Some(vec![link("A", "u1")]));
    assert_eq!(link_builder.build().unwrap().title, "B");
}

#[test]
fn encoded_values_decode_to_equal_models() {
    let dashboard = builders::DashboardBuilder::new()
        .title("X")
        .uid("abc")
        .refresh(models::StringOrBool::Bool(true))
        .timepicker(builders::TimePickerBuilder::new().hidden(true))
        .graph_tooltip(models::DashboardCursorSync::Tooltip)
        .style(models::DashboardStyle::Light)
        .build()
        .unwrap();

    let encoder = Encoder::default();
    let bytes = encoder.encode(&dashboard).unwrap();
    let decoded: models::Dashboard = encoder.decode(&bytes).unwrap();
    assert_eq!(decoded, dashboard);
    assert_eq!(encoder.encode(&decoded).unwrap(), bytes);

    let text = String::from_utf8(compact(true).encode(&dashboard).unwrap()).unwrap();
    assert!(text.contains(r#""graphTooltip":2"#));
    assert!(text.contains(r#""refresh":true"#));
    assert!(text.contains(r#""style":"light""#));
    assert!(text.contains(r#""timepicker":{"hidden":true}"#));
}

#[test]
fn unknown_enum_values_are_rejected() {
    let encoder = Encoder::default();
    let result: Result<models::Dashboard, _> =
        encoder.decode(br#"{"title":"X","graphTooltip":7,"style":"dark","editable":true}"#);
    assert!(result.is_err());
}

#[test]
fn missing_required_fields_fail_at_build() {
    let err = builders::DashboardBuilder::new().build().unwrap_err();
    assert_eq!(err, BuildError::missing_field("Dashboard", "title"));

    let err = builders::TimePickerBuilder::new().build().unwrap_err();
    assert_eq!(err, BuildError::missing_field("TimePicker", "hidden"));
}

#[test]
fn nested_failures_surface_with_their_path() {
    let builder = builders::DashboardBuilder::new()
        .title("X")
        .links([builders::DashboardLinkBuilder::new().title("A")]);
    let err = builder.build().unwrap_err();
    assert_eq!(err.to_string(), "links[0]: DashboardLink: required field `url` was never set");

    let fixed = builder.links([link("A", "u1")]);
    assert!(fixed.build().is_ok());
}

#[test]
fn veneers_reshape_the_generated_api() {
    let dashboard = veneered::DashboardBuilder::new("X")
        .readonly()
        .tooltip(veneered_models::DashboardCursorSync::Crosshair)
        .with_link(veneered::DashboardLinkBuilder::new("A", "u1"))
        .with_link(veneered_models::DashboardLink { title: "B".into(), url: "u2".into(), tooltip: None })
        .timepicker(veneered_models::TimePicker { hidden: true, refresh_intervals: None })
        .build()
        .unwrap();

    assert_eq!(dashboard.title, "X");
    assert!(!dashboard.editable);
    assert_eq!(dashboard.graph_tooltip, veneered_models::DashboardCursorSync::Crosshair);
    let titles: Vec<&str> = dashboard.links.iter().flatten().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, ["A", "B"]);

    let editable = veneered::DashboardBuilder::new("Y").readonly().editable().build().unwrap();
    assert!(editable.editable);
}

#[test]
fn constrained_setters_record_rejected_values() {
    let builder = builders::DashboardLinkBuilder::new().title("").url("u1");
    assert_eq!(
        builder.build().unwrap_err(),
        BuildError::invalid_value("DashboardLink", "title", "must have length >= 1")
    );

    let fixed = builder.title("A");
    assert_eq!(fixed.build().unwrap(), link("A", "u1"));
}

#[test]
fn omitted_required_options_do_not_block_build() {
    let link = reshaped::DashboardLinkBuilder::new().title("A").tooltip("t").build().unwrap();
    assert_eq!(
        link,
        reshaped_models::DashboardLink { title: "A".into(), url: String::new(), tooltip: Some("t".into()) }
    );
}

#[test]
fn merged_options_fill_the_nested_struct() {
    let dashboard = reshaped::DashboardBuilder::new().title("X").hidden(true).build().unwrap();
    assert_eq!(dashboard.timepicker, Some(reshaped_models::TimePicker { hidden: true, refresh_intervals: None }));

    let dashboard = reshaped::DashboardBuilder::new().title("X").timepicker(false).build().unwrap();
    assert_eq!(dashboard.timepicker, Some(reshaped_models::TimePicker { hidden: false, refresh_intervals: None }));

    let untouched = reshaped::DashboardBuilder::new().title("X").build().unwrap();
    assert_eq!(untouched.timepicker, None);
}
