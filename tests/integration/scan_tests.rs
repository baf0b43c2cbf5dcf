use dupehash::pipeline::{DuplicateScanner, ScanConfig};
use dupehash::progress::{MemorySink, SinkEvent};
use dupehash::scanner::{digest_bytes, digest_to_hex};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

/// a.txt and b/c.txt share content, d.txt differs, .hidden/ is skipped.
fn scenario_tree() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"hello");
    write(dir.path(), "b/c.txt", b"hello");
    write(dir.path(), "d.txt", b"world");
    write(dir.path(), ".hidden/e.txt", b"hello");
    dir
}

#[test]
fn test_scan_reference_scenario() {
    let dir = scenario_tree();
    let sink = MemorySink::new();

    let summary = DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    let hello = digest_bytes(b"hello");
    let world = digest_bytes(b"world");
    let lines = sink.lines();
    let mut expected = vec![
        (hello, PathBuf::from("a.txt")),
        (hello, PathBuf::from("b/c.txt")),
        (world, PathBuf::from("d.txt")),
    ];
    expected.sort();
    let actual: Vec<_> = lines.iter().map(|l| (l.digest, l.path.clone())).collect();
    assert_eq!(actual, expected);

    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.duplicate_bytes, 5);
    assert_eq!(summary.total_bytes, 15);
    assert!((summary.duplicate_mb() - 5.0 / 1024.0 / 1024.0).abs() < 1e-15);
    assert!((summary.total_mb() - 15.0 / 1024.0 / 1024.0).abs() < 1e-15);
}

#[test]
fn test_scan_known_digest_lines() {
    let dir = tempdir().unwrap();
    write(dir.path(), "hello.txt", b"hello");
    write(dir.path(), "empty.txt", b"");

    let sink = MemorySink::new();
    DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    let hexes: Vec<_> = sink.lines().iter().map(|l| l.digest_hex()).collect();
    assert_eq!(
        hexes,
        vec![
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d".to_string(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string(),
        ]
    );
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let sink = MemorySink::new();

    let summary = DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    assert_eq!(summary.files, 0);
    assert_eq!(summary.duplicates, 0);
    assert!(sink.lines().is_empty());
    assert_eq!(sink.summary(), Some(summary));
}

#[test]
fn test_scan_is_idempotent() {
    let dir = tempdir().unwrap();
    for i in 0..30 {
        write(dir.path(), &format!("d{}/f{}.bin", i % 4, i), format!("{}", i % 7).as_bytes());
    }

    let first = MemorySink::new();
    let second = MemorySink::new();
    let scanner = DuplicateScanner::new(ScanConfig::default().with_workers(8));
    let s1 = scanner.run(dir.path(), &first).unwrap();
    let s2 = scanner.run(dir.path(), &second).unwrap();

    assert_eq!(first.lines(), second.lines());
    assert_eq!(s1, s2);
}

#[test]
fn test_scan_result_independent_of_worker_count() {
    let dir = tempdir().unwrap();
    for i in 0..50 {
        write(dir.path(), &format!("f{:02}.txt", i), format!("c{}", i % 5).as_bytes());
    }

    let baseline = MemorySink::new();
    DuplicateScanner::new(ScanConfig::default().with_workers(1))
        .run(dir.path(), &baseline)
        .unwrap();

    for workers in [2, 7, 64] {
        let sink = MemorySink::new();
        let summary = DuplicateScanner::new(ScanConfig::default().with_workers(workers))
            .run(dir.path(), &sink)
            .unwrap();

        assert_eq!(sink.lines(), baseline.lines(), "workers = {}", workers);
        assert_eq!(summary.duplicates, 45);
    }
}

#[test]
fn test_scan_skips_hidden_subtrees() {
    let dir = tempdir().unwrap();
    write(dir.path(), "visible.txt", b"v");
    write(dir.path(), ".git/config", b"x");
    write(dir.path(), ".cache/deep/nested/file", b"y");
    write(dir.path(), "sub/.env", b"z");
    write(dir.path(), "sub/ok", b"ok");

    let sink = MemorySink::new();
    DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    let mut paths: Vec<_> = sink.lines().into_iter().map(|l| l.path).collect();
    paths.sort();
    assert_eq!(paths, vec![PathBuf::from("sub/ok"), PathBuf::from("visible.txt")]);
}

#[test]
fn test_scan_output_is_sorted() {
    let dir = tempdir().unwrap();
    for i in 0..40 {
        write(dir.path(), &format!("n{}/x.dat", i), format!("payload {}", i % 9).as_bytes());
    }

    let sink = MemorySink::new();
    DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    let lines = sink.lines();
    for pair in lines.windows(2) {
        let a = (pair[0].digest, pair[0].path.as_os_str());
        let b = (pair[1].digest, pair[1].path.as_os_str());
        assert!(a <= b, "{:?} after {:?}", pair[1], pair[0]);
    }
}

#[test]
fn test_duplicate_flag_marks_all_but_first_of_run() {
    let dir = tempdir().unwrap();
    write(dir.path(), "1", b"same");
    write(dir.path(), "2", b"same");
    write(dir.path(), "3", b"same");

    let sink = MemorySink::new();
    let summary = DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    let flags: Vec<_> = sink.lines().iter().map(|l| l.duplicate).collect();
    assert_eq!(flags, vec![false, true, true]);
    assert_eq!(summary.duplicates, 2);
    assert_eq!(summary.duplicate_bytes, 8);
}

#[test]
fn test_events_arrive_in_phase_order() {
    let dir = scenario_tree();
    let sink = MemorySink::new();

    DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    let events = sink.events();
    let first_line = events
        .iter()
        .position(|e| matches!(e, SinkEvent::Line(_)))
        .unwrap();
    // Every hashed record is observed before the first report line
    assert!(events[..first_line]
        .iter()
        .all(|e| matches!(e, SinkEvent::Record(_) | SinkEvent::Throughput(_))));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SinkEvent::Record(_)))
            .count(),
        3
    );
    assert!(matches!(events.last(), Some(SinkEvent::Summary(_))));
}

#[test]
fn test_large_file_streams_correctly() {
    let dir = tempdir().unwrap();
    let content: Vec<u8> = (0..3 * 1024 * 1024 + 17).map(|i| (i % 251) as u8).collect();
    write(dir.path(), "big.bin", &content);
    write(dir.path(), "copy.bin", &content);

    let sink = MemorySink::new();
    let summary = DuplicateScanner::new(ScanConfig::default().with_buffer_size(4096))
        .run(dir.path(), &sink)
        .unwrap();

    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.total_bytes, 2 * content.len() as u64);
    assert_eq!(sink.lines()[0].digest_hex(), digest_to_hex(&digest_bytes(&content)));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_reported() {
    let dir = tempdir().unwrap();
    write(dir.path(), "target.txt", b"data");
    std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt"))
        .unwrap();

    let sink = MemorySink::new();
    let summary = DuplicateScanner::default().run(dir.path(), &sink).unwrap();

    assert_eq!(summary.files, 1);
    assert_eq!(sink.lines()[0].path, PathBuf::from("target.txt"));
}
