use dupehash::pipeline::{DuplicateScanner, PipelineError};
use dupehash::progress::{ConsoleSink, JsonSink};
use dupehash::report::ReportError;
use std::fs;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }

    fn contents(&self) -> String {
        String::from_utf8(self.bytes()).unwrap()
    }
}

fn scenario_tree() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "hello").unwrap();
    fs::create_dir(dir.path().join("b")).unwrap();
    fs::write(dir.path().join("b/c.txt"), "hello").unwrap();
    fs::write(dir.path().join("d.txt"), "world").unwrap();
    fs::create_dir(dir.path().join(".hidden")).unwrap();
    fs::write(dir.path().join(".hidden/e.txt"), "hello").unwrap();
    dir
}

#[test]
fn test_text_report_format() {
    let dir = scenario_tree();
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let sink = ConsoleSink::with_writers(Box::new(out.clone()), Box::new(err.clone()));

    DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    let hello = "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d";
    let world = "7c211433f02071597741e6ff5a8ea34789abbf43";
    let mut expected = vec![
        format!("{}\ta.txt", hello),
        format!("{}\tb/c.txt", hello),
        format!("{}\td.txt", world),
    ];
    expected.sort();
    let stdout = out.contents();
    assert_eq!(stdout.lines().collect::<Vec<_>>(), expected);
    assert!(stdout.ends_with('\n'));

    let stderr = err.contents();
    let summary: Vec<_> = stderr.lines().rev().take(3).collect();
    assert_eq!(
        summary,
        vec![
            format!("Total MB     : {}", 15.0 / 1024.0 / 1024.0),
            format!("Duplicate MB : {}", 5.0 / 1024.0 / 1024.0),
            "Duplicates   : 1".to_string(),
        ]
    );
}

#[test]
fn test_text_report_empty_tree() {
    let dir = tempdir().unwrap();
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let sink = ConsoleSink::with_writers(Box::new(out.clone()), Box::new(err.clone()));

    DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    assert!(out.contents().is_empty());
    assert_eq!(
        err.contents(),
        "Duplicates   : 0\nDuplicate MB : 0\nTotal MB     : 0\n"
    );
}

#[test]
fn test_json_report_document() {
    let dir = scenario_tree();
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let sink = JsonSink::with_writers(Box::new(out.clone()), Box::new(err.clone()), false);

    DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    let doc: serde_json::Value = serde_json::from_str(&out.contents()).unwrap();
    let files = doc["files"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(files[0]["digest"], "7c211433f02071597741e6ff5a8ea34789abbf43");
    assert_eq!(files[0]["path"], "d.txt");
    assert_eq!(files[0]["duplicate"], false);
    assert_eq!(files[1]["path"], "a.txt");
    assert_eq!(files[2]["path"], "b/c.txt");
    assert_eq!(files[2]["duplicate"], true);
    assert_eq!(files[2]["size"], 5);

    assert_eq!(doc["summary"]["files"], 3);
    assert_eq!(doc["summary"]["duplicates"], 1);
    assert_eq!(doc["summary"]["duplicate_bytes"], 5);
    assert_eq!(doc["summary"]["total_bytes"], 15);
}

/// Two identical files whose names are not valid UTF-8.
#[cfg(target_os = "linux")]
fn non_utf8_tree() -> tempfile::TempDir {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    fs::write(dir.path().join(OsStr::from_bytes(b"a\xff")), "same").unwrap();
    fs::write(dir.path().join(OsStr::from_bytes(b"a\xfe")), "same").unwrap();
    dir
}

#[cfg(target_os = "linux")]
#[test]
fn test_text_report_keeps_raw_path_bytes() {
    let dir = non_utf8_tree();
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let sink = ConsoleSink::with_writers(Box::new(out.clone()), Box::new(err.clone()));

    let summary = DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    assert_eq!(summary.duplicates, 1);
    let digest = dupehash::scanner::digest_to_hex(&dupehash::scanner::digest_bytes(b"same"));
    let mut expected = Vec::new();
    for name in [&b"a\xfe"[..], &b"a\xff"[..]] {
        expected.extend_from_slice(digest.as_bytes());
        expected.push(b'\t');
        expected.extend_from_slice(name);
        expected.push(b'\n');
    }
    assert_eq!(out.bytes(), expected);
}

#[cfg(target_os = "linux")]
#[test]
fn test_json_report_fails_on_non_utf8_path() {
    let dir = non_utf8_tree();
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let sink = JsonSink::with_writers(Box::new(out.clone()), Box::new(err.clone()), false);

    let result = DuplicateScanner::default().run(dir.path(), &sink);

    assert!(
        matches!(result, Err(PipelineError::Report(ReportError::Output(_)))),
        "got {:?}",
        result
    );
    assert!(out.bytes().is_empty());
}
