// tests/export_results.rs

mod common;
use crate::common::builders::SettingsBuilder;
use crate::common::{ScriptedTransform, default_result, init_tracing, spawn_scripted, with_timeout};

use std::error::Error;
use std::fs;

use tempfile::tempdir;

use imgbatch::fs::RealFileSystem;
use imgbatch::media::{export_results, load_sources};
use imgbatch::transform::TransformError;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(start_paused = true)]
async fn loads_a_directory_runs_it_and_exports_completed_results() -> TestResult {
    init_tracing();
    let input = tempdir()?;
    let output = tempdir()?;
    fs::write(input.path().join("b.png"), b"bee")?;
    fs::write(input.path().join("a.jpg"), b"ay")?;
    fs::write(input.path().join("readme.txt"), b"not an image")?;

    let real = RealFileSystem;
    let sources = load_sources(&real, &[input.path().to_path_buf()])?;
    let names: Vec<_> = sources.iter().map(|s| s.name.clone()).collect();
    assert_eq!(names, vec!["a.jpg", "b.png"]);
    assert_eq!(sources[0].data.mime_type(), "image/jpeg");

    // First call succeeds, second fails for good.
    let service = ScriptedTransform::with_script(vec![
        Ok(default_result(1)),
        Err(TransformError::NoImage("refused".into())),
    ]);
    let q = spawn_scripted(
        SettingsBuilder::new().auto_retry(false).concurrency(false, 1).build(),
        service,
    );
    let ids = q.handle.enqueue(sources, false).await?;
    q.handle.start().await?;
    with_timeout(q.handle.wait_until_settled()).await?;

    let tasks = q.handle.snapshot().await?;
    let out_dir = output.path().join("results");
    let written = export_results(&real, &tasks, &out_dir)?;

    let expected = out_dir.join(format!("a-{}.png", ids[0]));
    assert_eq!(written, vec![expected.clone()]);
    assert_eq!(fs::read(&expected)?, b"result-1");
    Ok(())
}

#[test]
fn export_of_nothing_still_creates_the_directory() -> TestResult {
    let output = tempdir()?;
    let out_dir = output.path().join("empty");

    let written = export_results(&RealFileSystem, &[], &out_dir)?;

    assert!(written.is_empty());
    assert!(out_dir.is_dir());
    Ok(())
}
