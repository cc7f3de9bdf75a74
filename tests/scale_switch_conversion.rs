mod test_support;

use rusqlite::Connection;
use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{error_code, request_err, request_ok, spawn_sidecar, str_field, temp_workspace};

struct Seeded {
    subject_id: String,
    score_ids: Vec<String>,
}

fn seed_year(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    values: &[f64],
) -> Seeded {
    let subject = request_ok(stdin, reader, "seed-s", "subjects.create", json!({ "name": "Physics" }));
    let subject_id = str_field(&subject, "subjectId");
    let kind = request_ok(
        stdin,
        reader,
        "seed-t",
        "assessmentTypes.create",
        json!({ "subjectId": subject_id, "name": "Test", "weight": 100 }),
    );
    let type_id = str_field(&kind, "assessmentTypeId");
    let mut score_ids = Vec::new();
    for (i, value) in values.iter().enumerate() {
        let created = request_ok(
            stdin,
            reader,
            &format!("seed-{i}"),
            "scores.create",
            json!({
                "subjectId": subject_id,
                "assessmentTypeId": type_id,
                "schoolYear": 2024,
                "semester": "first",
                "value": value
            }),
        );
        score_ids.push(str_field(&created, "scoreId"));
    }
    let _ = request_ok(
        stdin,
        reader,
        "seed-o",
        "overrides.set",
        json!({ "subjectId": subject_id, "schoolYear": 2024, "semester": "first", "value": 2.0 }),
    );
    Seeded {
        subject_id,
        score_ids,
    }
}

fn listed_values(stdin: &mut ChildStdin, reader: &mut BufReader<ChildStdout>) -> Vec<(String, f64)> {
    let listed = request_ok(stdin, reader, "list", "scores.list", json!({ "schoolYear": 2024 }));
    let mut values: Vec<(String, f64)> = listed
        .get("scores")
        .and_then(|v| v.as_array())
        .expect("scores")
        .iter()
        .map(|s| {
            (
                s.get("id").and_then(|v| v.as_str()).expect("id").to_string(),
                s.get("value").and_then(|v| v.as_f64()).expect("value"),
            )
        })
        .collect();
    values.sort_by(|a, b| a.0.cmp(&b.0));
    values
}

fn value_of(values: &[(String, f64)], id: &str) -> f64 {
    values
        .iter()
        .find(|(k, _)| k == id)
        .map(|(_, v)| *v)
        .expect("score present")
}

#[test]
fn switching_with_conversion_rewrites_scores_and_overrides() {
    let workspace = temp_workspace();
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let seeded = seed_year(&mut stdin, &mut reader, &[1.0, 4.0, 5.7]);

    let switched = request_ok(
        &mut stdin,
        &mut reader,
        "switch",
        "scale.set",
        json!({ "schoolYear": 2024, "scale": "points", "convertExisting": true }),
    );
    assert_eq!(switched.get("scale").and_then(|v| v.as_str()), Some("points"));
    assert_eq!(switched.get("previousScale").and_then(|v| v.as_str()), Some("traditional"));
    let conversion = switched.get("conversion").cloned().expect("conversion");
    assert_eq!(conversion.get("success").and_then(|v| v.as_bool()), Some(true));
    // Three scores plus the final override.
    assert_eq!(conversion.get("convertedCount").and_then(|v| v.as_u64()), Some(4));

    let values = listed_values(&mut stdin, &mut reader);
    assert_eq!(value_of(&values, &seeded.score_ids[0]), 14.0);
    assert_eq!(value_of(&values, &seeded.score_ids[1]), 5.0);
    assert_eq!(value_of(&values, &seeded.score_ids[2]), 0.0);

    let ov = request_ok(
        &mut stdin,
        &mut reader,
        "ov",
        "overrides.get",
        json!({ "subjectId": seeded.subject_id, "schoolYear": 2024, "semester": "first" }),
    );
    assert_eq!(
        ov.get("override").and_then(|o| o.get("value")).and_then(|v| v.as_f64()),
        Some(11.0)
    );
    assert_eq!(ov.get("display").and_then(|v| v.as_str()), Some("11 P"));

    // "6+" does not survive the round trip: 0 points maps back to 6.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "back",
        "scale.set",
        json!({ "schoolYear": 2024, "scale": "traditional", "convertExisting": true }),
    );
    let values = listed_values(&mut stdin, &mut reader);
    assert_eq!(value_of(&values, &seeded.score_ids[0]), 1.0);
    assert_eq!(value_of(&values, &seeded.score_ids[1]), 4.0);
    assert_eq!(value_of(&values, &seeded.score_ids[2]), 6.0);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn switching_without_conversion_keeps_stored_values() {
    let workspace = temp_workspace();
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let seeded = seed_year(&mut stdin, &mut reader, &[2.3]);

    let switched = request_ok(
        &mut stdin,
        &mut reader,
        "switch",
        "scale.set",
        json!({ "schoolYear": 2024, "scale": "points" }),
    );
    assert!(switched.get("conversion").is_some_and(|v| v.is_null()));
    let values = listed_values(&mut stdin, &mut reader);
    assert_eq!(value_of(&values, &seeded.score_ids[0]), 2.3);

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn failed_conversion_leaves_values_and_scale_untouched() {
    let workspace = temp_workspace();
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let seeded = seed_year(&mut stdin, &mut reader, &[1.0, 4.0, 5.7]);

    // Make the last row's write fail after the earlier ones went through.
    let conn = Connection::open(workspace.path().join("gradebook.sqlite3")).expect("open db");
    conn.execute_batch(&format!(
        "CREATE TRIGGER fail_conversion BEFORE UPDATE ON scores
         WHEN OLD.id = '{}'
         BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END;",
        seeded.score_ids[2]
    ))
    .expect("create trigger");
    drop(conn);

    let failed = request_err(
        &mut stdin,
        &mut reader,
        "switch",
        "scale.set",
        json!({ "schoolYear": 2024, "scale": "points", "convertExisting": true }),
    );
    assert_eq!(error_code(&failed), "migration_failed");
    let details = failed.get("details").cloned().expect("details");
    assert_eq!(details.get("success").and_then(|v| v.as_bool()), Some(false));
    assert!(details
        .get("errorMessage")
        .and_then(|v| v.as_str())
        .is_some_and(|m| m.contains("simulated write failure")));

    let scale = request_ok(&mut stdin, &mut reader, "scale", "scale.get", json!({ "schoolYear": 2024 }));
    assert_eq!(scale.get("scale").and_then(|v| v.as_str()), Some("traditional"));

    let values = listed_values(&mut stdin, &mut reader);
    assert_eq!(value_of(&values, &seeded.score_ids[0]), 1.0);
    assert_eq!(value_of(&values, &seeded.score_ids[1]), 4.0);
    assert_eq!(value_of(&values, &seeded.score_ids[2]), 5.7);

    let ov = request_ok(
        &mut stdin,
        &mut reader,
        "ov",
        "overrides.get",
        json!({ "subjectId": seeded.subject_id, "schoolYear": 2024, "semester": "first" }),
    );
    assert_eq!(
        ov.get("override").and_then(|o| o.get("value")).and_then(|v| v.as_f64()),
        Some(2.0)
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn failed_setting_write_keeps_values_on_the_old_scale() {
    let workspace = temp_workspace();
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let seeded = seed_year(&mut stdin, &mut reader, &[1.0, 4.0]);

    let conn = Connection::open(workspace.path().join("gradebook.sqlite3")).expect("open db");
    conn.execute_batch(
        "CREATE TRIGGER fail_settings BEFORE INSERT ON school_year_settings
         BEGIN SELECT RAISE(ABORT, 'settings write failed'); END;",
    )
    .expect("create trigger");
    drop(conn);

    let failed = request_err(
        &mut stdin,
        &mut reader,
        "switch",
        "scale.set",
        json!({ "schoolYear": 2024, "scale": "points", "convertExisting": true }),
    );
    assert_eq!(error_code(&failed), "migration_failed");

    let scale = request_ok(&mut stdin, &mut reader, "scale", "scale.get", json!({ "schoolYear": 2024 }));
    assert_eq!(scale.get("scale").and_then(|v| v.as_str()), Some("traditional"));

    let values = listed_values(&mut stdin, &mut reader);
    assert_eq!(value_of(&values, &seeded.score_ids[0]), 1.0);
    assert_eq!(value_of(&values, &seeded.score_ids[1]), 4.0);

    let avg = request_ok(
        &mut stdin,
        &mut reader,
        "avg",
        "stats.periodAverage",
        json!({ "subjectId": seeded.subject_id, "schoolYear": 2024, "semester": "first" }),
    );
    // The override still wins, in its original traditional value.
    assert_eq!(avg.get("average").and_then(|v| v.as_f64()), Some(2.0));

    drop(stdin);
    let _ = child.wait();
}
