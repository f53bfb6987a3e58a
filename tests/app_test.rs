mod common;

use bulk_labels::{App, BatchAborted, CancelFlag, CompletionMode};
use common::{paired_row, scratch_dir, test_config, FakeGateway, FakeHost};
use std::sync::Arc;

const BATCH: &str = r#"
[[rows]]
name_from = "Shawn Ippotle"
street1_from = "215 Clayton St."
city_from = "San Francisco"
state_from = "CA"
zip_from = 94117.0
country_from = "US"
name_to = "Mr Hippo"
street1_to = "123 Broadway 1"
city_to = "New York"
state_to = "NY"
zip_to = "10007"
country_to = "US"
length = 5
width = 5
height = 5
length_unit = "in"
weight = 2
unit = "lb"

[[rows]]
name_from = "Shawn Ippotle"
street1_from = "215 Clayton St."
city_from = "San Francisco"
state_from = "CA"
zip_from = "94117"
country_from = "US"
name_to = "Ms Otter"
street1_to = "1 Main St"
city_to = "Boston"
state_to = "MA"
zip_to = ""
country_to = "US"
length = 5
width = 5
height = 5
length_unit = "in"
weight = 2
unit = "lb"
"#;

#[tokio::test]
async fn test_app_reads_batch_file_and_writes_outputs() {
    let dir = scratch_dir("app");
    std::fs::create_dir_all(&dir).unwrap();
    let config = test_config(&dir);
    std::fs::write(&config.input_file, BATCH).unwrap();
    std::fs::write(&config.output_log_file, "").unwrap();

    let app = App::with_services(config, Arc::new(FakeGateway::new()), Arc::new(FakeHost::new()));
    let report = app.run().await.unwrap();

    assert_eq!(report.len(), 2);
    assert_eq!(report.label_files().len(), 1);

    let out = dir.join("out");
    let rows: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("march_with_tracking.json")).unwrap())
            .unwrap();
    assert_eq!(rows[0]["tracking_number"], "TRK-Mr-Hippo-0");
    assert_eq!(rows[0]["carrier"], "UPS");
    assert_eq!(rows[1]["name_to"], "Ms Otter");
    assert_eq!(rows[1]["tracking_number"], "");

    let errors = std::fs::read_to_string(out.join("march_errors.log")).unwrap();
    assert!(errors.starts_with("row 2 (Ms Otter): missing mandatory fields: zip_to"));

    let manifest = std::fs::read_to_string(out.join("march_labels.txt")).unwrap();
    assert_eq!(manifest.lines().count(), 1);
    assert!(manifest.trim_end().ends_with("label_1.pdf"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_fail_fast_abort_still_writes_partial_outputs() {
    let dir = scratch_dir("app_fail_fast");
    std::fs::create_dir_all(&dir).unwrap();
    let mut config = test_config(&dir);
    config.completion_mode = CompletionMode::FailFast;
    std::fs::write(&config.output_log_file, "").unwrap();

    let gateway = Arc::new(FakeGateway::new().declining("Ms Otter", "ERROR", "Insufficient funds"));
    let app = App::with_services(config, gateway, Arc::new(FakeHost::new()));

    let rows = vec![
        paired_row("Mr Hippo", "10007"),
        paired_row("Ms Otter", "10001"),
        paired_row("Dr Heron", "94105"),
    ];
    let err = app.run_rows(rows, &CancelFlag::new()).await.unwrap_err();

    let aborted = err.downcast_ref::<BatchAborted>().unwrap();
    assert_eq!(aborted.row, 2);

    let out = dir.join("out");
    let manifest = std::fs::read_to_string(out.join("march_labels.txt")).unwrap();
    assert_eq!(manifest.lines().count(), 1);
    let errors = std::fs::read_to_string(out.join("march_errors.log")).unwrap();
    assert!(errors.contains("Insufficient funds"));

    let _ = std::fs::remove_dir_all(&dir);
}
