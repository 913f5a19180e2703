use std::fs;
use std::path::Path;

use assert_cmd::Command;
use lopdf::{dictionary, Document, Object, Stream};
use predicates::prelude::*;
use tempfile::TempDir;

const REPORT: &str = "PARTE QUIRURGICO\r\n\
    Apellido y Nombre: GOMEZ ANA\r\n\
    O Social: OSDE Binario\r\n\
    Edad 54\r\n\
    Cirujano: PEREZ JUAN\r\n";

const REFERENCES: &str = r#"{
    "doctors": [{"doctorId": "d1", "name": "PEREZ JUAN"}],
    "studies": [{"studyId": "s1", "name": "COLECISTECTOMIA"}],
    "obrasSociales": [{"obraSocialId": "os1", "nombre": "OSDE"}],
    "tarifas": [{"estudioId": "s1", "obraSocialId": "os1", "precio": 1500}]
}"#;

/// Command isolated from the user's config, data dir and environment.
fn clinica(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("clinica").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .env("XDG_DATA_HOME", dir.join("data"))
        .env_remove("CLINICA_CONFIG")
        .env_remove("CLINICA_SHEET")
        .env_remove("CLINICA_BACKEND_URL");
    cmd
}

/// Single-page PDF whose text layer is one Helvetica line.
fn report_pdf(line: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let pages_id = doc.new_object_id();
    let content = format!("BT /F1 10 Tf 40 700 Td ({}) Tj ET", line);
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn setup() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("report.txt"), REPORT).unwrap();
    fs::write(dir.path().join("refs.json"), REFERENCES).unwrap();
    dir
}

#[test]
fn parse_raw_text_prints_fields_as_json() {
    let dir = setup();

    clinica(dir.path())
        .args(["parse", "report.txt", "--raw-text"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""insurance": "OSDE Binario""#))
        .stdout(predicate::str::contains(r#""age": "54""#))
        .stdout(predicate::str::contains(r#""surgeon": "PEREZ JUAN""#))
        .stderr(predicate::str::contains("Fields not found"));
}

#[test]
fn parse_text_format() {
    let dir = setup();

    clinica(dir.path())
        .args(["parse", "report.txt", "--raw-text", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GOMEZ ANA"))
        .stdout(predicate::str::contains("Edad:"));
}

#[test]
fn parse_missing_file_fails() {
    let dir = setup();

    clinica(dir.path())
        .args(["parse", "nope.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn parse_rejects_invalid_pattern_config() {
    let dir = setup();
    fs::write(
        dir.path().join("bad.json"),
        r#"{"parser": {"age": ["Edad ("]}}"#,
    )
    .unwrap();

    clinica(dir.path())
        .args(["-c", "bad.json", "parse", "report.txt", "--raw-text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid pattern for age"));
}

#[test]
fn ingest_records_failures_and_keeps_going() {
    let dir = setup();
    fs::write(dir.path().join("broken.pdf"), b"garbage").unwrap();
    fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

    clinica(dir.path())
        .args([
            "ingest",
            "notes.txt",
            "broken.pdf",
            "--sheet",
            "sheet.json",
            "--references",
            "refs.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 successful, 2 failed"))
        .stdout(predicate::str::contains("notes.txt"))
        .stdout(predicate::str::contains("text/plain"))
        .stdout(predicate::str::contains("broken.pdf"));

    let sheet = fs::read_to_string(dir.path().join("sheet.json")).unwrap();
    assert!(sheet.contains(r#""entries": []"#), "sheet was {}", sheet);
    assert!(sheet.contains("COLECISTECTOMIA"));
}

#[test]
fn ingest_missing_file_is_a_failed_file() {
    let dir = setup();
    fs::write(dir.path().join("broken.pdf"), b"garbage").unwrap();

    clinica(dir.path())
        .args([
            "ingest",
            "broken.pdf",
            "missing.pdf",
            "--sheet",
            "sheet.json",
            "--references",
            "refs.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 successful, 2 failed"))
        .stdout(predicate::str::contains("missing.pdf"));

    assert!(dir.path().join("sheet.json").exists());
}

#[test]
fn ingest_pdf_appends_priced_entry_and_exports() {
    let dir = setup();
    fs::write(
        dir.path().join("parte.pdf"),
        report_pdf("Apellido y Nombre: GOMEZ ANA O. Social: OSDE Edad: 54 PRACTICA: COLECISTECTOMIA"),
    )
    .unwrap();

    clinica(dir.path())
        .args([
            "ingest",
            "*.pdf",
            "--sheet",
            "sheet.json",
            "--references",
            "refs.json",
            "--export",
            "out.csv",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 successful, 0 failed"))
        .stdout(predicate::str::contains("now has 1 entries"));

    let csv = fs::read_to_string(dir.path().join("out.csv")).unwrap();
    assert!(csv.contains("GOMEZ ANA"), "csv was {}", csv);
    assert!(csv.contains("COLECISTECTOMIA,1500.00"), "csv was {}", csv);
    assert!(csv.contains("TOTAL,1500.00"), "csv was {}", csv);

    clinica(dir.path())
        .args(["entry", "--sheet", "sheet.json", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("parte.pdf").or(predicate::str::contains("GOMEZ ANA")))
        .stdout(predicate::str::contains("total 1500.00"));
}

#[test]
fn ingest_without_matches_fails() {
    let dir = setup();

    clinica(dir.path())
        .args(["ingest", "*.pdf", "--sheet", "sheet.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn manual_entry_edit_and_export() {
    let dir = setup();

    let output = clinica(dir.path())
        .args([
            "entry",
            "--sheet",
            "sheet.json",
            "manual",
            "--patient",
            "GOMEZ ANA",
            "--doctor",
            "d1",
            "--study",
            "s1",
            "--insurer",
            "os1",
            "--carnet",
            "12345/01",
            "--references",
            "refs.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1500.00"))
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let id = stdout.lines().last().unwrap().trim().to_string();

    clinica(dir.path())
        .args(["entry", "--sheet", "sheet.json", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PEREZ JUAN"))
        .stdout(predicate::str::contains("total 1500.00"));

    clinica(dir.path())
        .args(["export", "--sheet", "sheet.json", "--output", "out.csv"])
        .assert()
        .success();

    let csv = fs::read_to_string(dir.path().join("out.csv")).unwrap();
    assert!(csv.starts_with("FECHA,MEDICO/A,PACIENTE"));
    assert!(csv.contains(",PEREZ JUAN,GOMEZ ANA,,OSDE,12345/01,COLECISTECTOMIA,1500.00,"));
    assert!(csv.contains("TOTAL,1500.00"));

    clinica(dir.path())
        .args(["entry", "--sheet", "sheet.json", "set", &id, "--insurer", ""])
        .assert()
        .success()
        .stdout(predicate::str::contains("SIN TARIFA"));

    clinica(dir.path())
        .args(["entry", "--sheet", "sheet.json", "remove", &id])
        .assert()
        .success();

    clinica(dir.path())
        .args(["entry", "--sheet", "sheet.json", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("empty"));
}

#[test]
fn manual_entry_requires_patient() {
    let dir = setup();

    clinica(dir.path())
        .args(["entry", "--sheet", "sheet.json", "manual", "--patient", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("patient name is required"));
}

#[test]
fn unknown_entry_fails() {
    let dir = setup();

    clinica(dir.path())
        .args(["entry", "--sheet", "sheet.json", "remove", "missing-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry not found"));
}

#[test]
fn config_init_get_set() {
    let dir = setup();

    clinica(dir.path())
        .args(["-c", "clinica.json", "config", "init"])
        .assert()
        .success();

    clinica(dir.path())
        .args(["-c", "clinica.json", "config", "get", "matching.study_prefix_chars"])
        .assert()
        .success()
        .stdout(predicate::str::contains("20"));

    clinica(dir.path())
        .args(["-c", "clinica.json", "config", "set", "matching.study_prefix_chars", "25"])
        .assert()
        .success();

    clinica(dir.path())
        .args(["-c", "clinica.json", "config", "get", "matching.study_prefix_chars"])
        .assert()
        .success()
        .stdout(predicate::str::contains("25"));

    clinica(dir.path())
        .args(["-c", "clinica.json", "config", "set", "backend.base_url", "ftp://x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid backend URL"));
}

#[test]
fn config_show_defaults() {
    let dir = setup();

    clinica(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""language": "spa""#))
        .stderr(predicate::str::contains("showing defaults"));
}
