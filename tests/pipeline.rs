//! End-to-end tests: synthetic files decoded into a dataset and read back.

use nanoscope_fv::{
    DecodeConfig, Dataset, Direction, FvError, SyntheticForceVolume, decode_force_volume,
};
use ndarray::s;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn write_synthetic(dir: &Path, file_name: &str, synthetic: &SyntheticForceVolume) -> PathBuf {
    let path = dir.join(file_name);
    synthetic
        .write_to(&path)
        .expect("failed to write synthetic file");
    path
}

fn expected_curve(
    synthetic: &SyntheticForceVolume,
    index: usize,
    direction: Direction,
    config: &DecodeConfig,
) -> Vec<f64> {
    let (row, column) = (index / synthetic.columns, index % synthetic.columns);
    (0..synthetic.ramp_points)
        .map(|k| {
            synthetic.raw_deflection(row, column, direction.axis_index(), k) as f64
                * config.deflection_scale
        })
        .collect()
}

#[test]
fn test_ingested_curves_match_decoded_values() -> TestResult {
    let dir = tempdir()?;
    let synthetic = SyntheticForceVolume::builder()
        .rows(3)
        .columns(5)
        .ramp_points(32)
        .build();
    let path = write_synthetic(dir.path(), "scan.0001.spm", &synthetic);
    let config = DecodeConfig::default();

    let dataset = Dataset::open(dir.path().join("store"))?;
    let name = dataset.ingest_file(&path, &config)?;
    assert_eq!(name, "scan_0001_spm");
    assert_eq!(dataset.curve_count(&name)?, 15);

    let decoded = decode_force_volume(&std::fs::read(&path)?, &config)?;
    for index in 0..dataset.curve_count(&name)? {
        let (r, c) = (index / synthetic.columns, index % synthetic.columns);
        for direction in [Direction::Forward, Direction::Backward] {
            let curve = dataset.curve(&name, index, direction)?;
            let stored = decoded
                .force_volume
                .slice(s![r, c, direction.axis_index(), ..])
                .to_vec();
            assert_eq!(curve, stored);
            assert_eq!(curve, expected_curve(&synthetic, index, direction, &config));
        }
        assert_eq!(dataset.height(&name, index)?, decoded.topography[[r, c]]);
    }
    assert_eq!(dataset.topography(&name)?, decoded.topography);
    assert_eq!(
        dataset.height(&name, 7)?,
        synthetic.raw_height(1, 2) as f64 * synthetic.height_scale(config.height_normalization)
    );
    Ok(())
}

#[test]
fn test_full_size_grid() -> TestResult {
    let dir = tempdir()?;
    let synthetic = SyntheticForceVolume::builder()
        .rows(64)
        .columns(64)
        .ramp_points(128)
        .build();
    let path = write_synthetic(dir.path(), "grid.spm", &synthetic);

    let dataset = Dataset::open(dir.path().join("store"))?;
    let name = dataset.ingest_file(&path, &DecodeConfig::default())?;
    assert_eq!(dataset.curve_count(&name)?, 4096);
    assert_eq!(dataset.curve(&name, 4095, Direction::Backward)?.len(), 128);
    assert!(matches!(
        dataset.curve(&name, 4096, Direction::Forward),
        Err(FvError::NotFound(_))
    ));

    let axis = dataset.ramp_axis(&name, true)?;
    assert_eq!(axis.len(), 128);
    assert_eq!(axis[0], 0.0);
    assert_eq!(axis[127], synthetic.ramp_length());
    let indices = dataset.ramp_axis(&name, false)?;
    assert_eq!(indices[127], 127.0);
    Ok(())
}

#[test]
fn test_reingest_replaces_experiment() -> TestResult {
    let dir = tempdir()?;
    let config = DecodeConfig::default();
    let dataset = Dataset::open(dir.path().join("store"))?;

    let first = SyntheticForceVolume::builder().rows(4).columns(4).build();
    let path = write_synthetic(dir.path(), "scan.spm", &first);
    let name = dataset.ingest_file(&path, &config)?;

    let second = SyntheticForceVolume::builder()
        .rows(2)
        .columns(3)
        .ramp_points(8)
        .seed(1000)
        .build();
    write_synthetic(dir.path(), "scan.spm", &second);
    assert_eq!(dataset.ingest_file(&path, &config)?, name);

    assert_eq!(dataset.experiment_names(), vec![name.clone()]);
    assert_eq!(dataset.curve_count(&name)?, 6);
    assert_eq!(
        dataset.curve(&name, 5, Direction::Forward)?,
        expected_curve(&second, 5, Direction::Forward, &config)
    );
    assert!(matches!(
        dataset.curve(&name, 6, Direction::Forward),
        Err(FvError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn test_failed_ingest_keeps_previous_experiment() -> TestResult {
    let dir = tempdir()?;
    let config = DecodeConfig::default();
    let dataset = Dataset::open(dir.path().join("store"))?;

    let synthetic = SyntheticForceVolume::builder().build();
    let path = write_synthetic(dir.path(), "scan.spm", &synthetic);
    let name = dataset.ingest_file(&path, &config)?;
    let before = dataset.curve(&name, 3, Direction::Backward)?;

    let mut truncated = synthetic.to_bytes();
    truncated.truncate(truncated.len() - 100);
    std::fs::write(&path, &truncated)?;
    let err = dataset.ingest_file(&path, &config).unwrap_err();
    assert!(matches!(err, FvError::TruncatedData { .. }));

    assert_eq!(dataset.curve_count(&name)?, 16);
    assert_eq!(dataset.curve(&name, 3, Direction::Backward)?, before);
    Ok(())
}

#[test]
fn test_missing_terminator_stores_nothing() -> TestResult {
    let dir = tempdir()?;
    let synthetic = SyntheticForceVolume::builder().build();
    let header = synthetic.header_text();
    let mut bytes = header.replace("*File list end", "*File list EOF").into_bytes();
    bytes.extend_from_slice(&synthetic.to_bytes()[header.len()..]);
    let path = dir.path().join("broken.spm");
    std::fs::write(&path, &bytes)?;

    let dataset = Dataset::open(dir.path().join("store"))?;
    let err = dataset
        .ingest_file(&path, &DecodeConfig::default())
        .unwrap_err();
    assert!(matches!(err, FvError::Format(_)));
    assert!(dataset.experiment_names().is_empty());
    Ok(())
}

#[test]
fn test_dataset_survives_reopen() -> TestResult {
    let dir = tempdir()?;
    let store = dir.path().join("store");
    let config = DecodeConfig::default();
    let synthetic = SyntheticForceVolume::builder().rows(2).columns(2).build();
    let path = write_synthetic(dir.path(), "a.spm", &synthetic);

    let name = Dataset::open(&store)?.ingest_file(&path, &config)?;
    let reopened = Dataset::open(&store)?;
    assert_eq!(
        reopened.curve(&name, 2, Direction::Forward)?,
        expected_curve(&synthetic, 2, Direction::Forward, &config)
    );
    Ok(())
}

#[test]
fn test_readers_never_see_partial_replacement() -> TestResult {
    let dir = tempdir()?;
    let config = DecodeConfig::default();
    let dataset = Dataset::open(dir.path().join("store"))?;

    let versions: Vec<SyntheticForceVolume> = (0..2)
        .map(|seed| {
            SyntheticForceVolume::builder()
                .rows(3)
                .columns(3)
                .ramp_points(8)
                .seed(seed * 5000)
                .build()
        })
        .collect();
    let paths: Vec<PathBuf> = versions
        .iter()
        .enumerate()
        .map(|(i, v)| write_synthetic(dir.path(), &format!("v{i}.spm"), v))
        .collect();
    let name = "scan";
    let decoded: Vec<_> = paths
        .iter()
        .map(|p| decode_force_volume(&std::fs::read(p).expect("read"), &config).expect("decode"))
        .collect();
    dataset.ingest_decoded(name, &decoded[0])?;

    let candidates: Vec<Vec<f64>> = versions
        .iter()
        .map(|v| expected_curve(v, 4, Direction::Forward, &config))
        .collect();

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for round in 1..=6 {
                dataset
                    .ingest_decoded(name, &decoded[round % 2])
                    .expect("ingest");
            }
        });
        for _ in 0..2 {
            scope.spawn(|| {
                for _ in 0..20 {
                    let curve = dataset
                        .curve(name, 4, Direction::Forward)
                        .expect("curve");
                    assert!(candidates.contains(&curve));
                }
            });
        }
    });
    Ok(())
}
