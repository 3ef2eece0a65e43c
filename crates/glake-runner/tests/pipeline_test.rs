//! End-to-end runs over a synthetic glacier written to a scratch directory.

use approx::assert_relative_eq;
use glake_model::geojson::FeatureCollection;
use glake_model::RunConfig;
use glake_runner::Pipeline;
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

const GLACIER: &str = "RGI60-99.00001";

/// Constant 80 m bedrock over x -100..1100, y -200..200.
fn write_bedrock(path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    let mut image = encoder.new_image::<colortype::Gray32Float>(12, 4).unwrap();
    image
        .encoder()
        .write_tag(Tag::Unknown(33550), &[100.0, 100.0, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::Unknown(33922), &[0.0, 0.0, 0.0, -100.0, 200.0, 0.0][..])
        .unwrap();
    image.write_data(&[80.0f32; 48]).unwrap();
}

/// Annual model output whose decadal samples are `lengths`.
fn retreat_csv(lengths: &[f64]) -> String {
    let mut csv = String::from("time,calendar_year,length,terminus_thick_0\n");
    for i in 0..90 {
        let sample = (i.max(1) - 1) / 10;
        let length = lengths[sample.min(lengths.len() - 1)];
        csv.push_str(&format!("{}.0,{},{},50.0\n", 2019 + i, 2019 + i, length));
    }
    csv
}

/// Glacier with a 1000 m flowline along +x and one basin at 650..760.
fn write_glacier(data_root: &Path, with_tins: bool) -> PathBuf {
    let dir = data_root.join(GLACIER);
    std::fs::create_dir_all(dir.join("GCM_runs/CESM2")).unwrap();

    let coords: Vec<String> = (0..=100).map(|i| format!("[{}, 0]", i * 10)).collect();
    std::fs::write(
        dir.join("centerline.geojson"),
        format!(
            r#"{{"type": "FeatureCollection", "features": [{{"type": "Feature",
                "properties": {{"RGIID": "{}"}},
                "geometry": {{"type": "LineString", "coordinates": [{}]}}}}]}}"#,
            GLACIER,
            coords.join(", ")
        ),
    )
    .unwrap();

    std::fs::write(
        dir.join("sinks.geojson"),
        r#"{"type": "FeatureCollection", "features": [{"type": "Feature",
            "properties": {"sinkNr": 1, "MAX_round": 100, "MAX": 100.0},
            "geometry": {"type": "Polygon", "coordinates":
                [[[650, -50], [760, -50], [760, 50], [650, 50], [650, -50]]]}}]}"#,
    )
    .unwrap();

    write_bedrock(&dir.join("bedrock.tif"));

    if with_tins {
        std::fs::create_dir(dir.join("tins")).unwrap();
        std::fs::write(
            dir.join("tins/tin_1.csv"),
            "x,y,z\n600,-100,80\n800,-100,80\n600,100,80\n800,100,80\n",
        )
        .unwrap();
    }

    let lengths = [1000.0, 900.0, 700.0, 400.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    std::fs::write(dir.join("GCM_runs/CESM2/CESM2_ssp245.csv"), retreat_csv(&lengths)).unwrap();
    std::fs::write(dir.join("GCM_runs/CESM2/CESM2_historical.csv"), retreat_csv(&lengths)).unwrap();
    dir
}

fn config(data_root: &Path, output_root: &Path) -> RunConfig {
    RunConfig {
        data_root: data_root.to_path_buf(),
        output_root: Some(output_root.to_path_buf()),
        ..RunConfig::default()
    }
}

/// Every file below `dir` named `name`.
fn find_files(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                found.extend(find_files(&path, name));
            } else if path.file_name().and_then(|n| n.to_str()) == Some(name) {
                found.push(path);
            }
        }
    }
    found
}

#[test]
fn test_lake_forms_where_front_crosses_basin() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_glacier(data.path(), true);

    let summary = Pipeline::new(config(data.path(), out.path())).run(&[]).unwrap();
    assert_eq!(summary.glaciers, 1);
    assert_eq!(summary.glaciers_failed, 0);
    assert_eq!(summary.scenarios_completed, 1);
    assert_eq!(summary.lakes, 1);
    assert_eq!(summary.runs_relocated, 0);

    let run = out.path().join(GLACIER).join("GCM_results/CESM2/ssp245");
    assert!(!out.path().join(GLACIER).join("GCM_results/CESM2/historical").exists());

    // 2040: front 700 m from the head, inside the basin
    let lake = FeatureCollection::from_file(run.join("icefree_sinks/2040/VOL_partial_sink.geojson")).unwrap();
    let feature = &lake.features[0];
    assert_eq!(feature.property_f64("sinkNr"), Some(1.0));
    assert_relative_eq!(feature.property_f64("Volume").unwrap(), 60.0 * 100.0 * 20.0, max_relative = 1e-9);
    assert_relative_eq!(feature.property_f64("SArea").unwrap(), 6000.0, max_relative = 1e-9);

    assert!(run.join("front_points/front_point2040.geojson").is_file());
    assert!(run.join("perpendiculars/frontline2040.geojson").is_file());
    assert!(!run.join("perpendiculars/new_frontline2040.geojson").exists());

    // The only lake is 2040
    assert_eq!(find_files(&run, "VOL_partial_sink.geojson").len(), 1);

    // Glacier gone from 2070
    assert!(!run.join("icefree_sinks/2060/VOL_all_sinks.geojson").exists());
    for year in [2070, 2080, 2090, 2100] {
        let all = FeatureCollection::from_file(run.join(format!("icefree_sinks/{}/VOL_all_sinks.geojson", year))).unwrap();
        assert_eq!(all.features.len(), 1);
    }

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(run.join("summary.json")).unwrap()).unwrap();
    assert_eq!(report["glacier"], GLACIER);
    assert!(report.get("aborted").is_none());
    let years = report["years"].as_array().unwrap();
    assert_eq!(years.len(), 8);
    assert_eq!(years[1]["status"], "lake");
    assert_eq!(years[4]["status"], "all_exposed");
}

#[test]
fn test_nan_length_moves_run_to_error_bucket() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let dir = write_glacier(data.path(), true);

    std::fs::create_dir_all(dir.join("GCM_runs/NorESM2")).unwrap();
    let nan = [f64::NAN, 900.0, 700.0, 400.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    std::fs::write(dir.join("GCM_runs/NorESM2/NorESM2_ssp245.csv"), retreat_csv(&nan)).unwrap();
    let good = [1000.0, 900.0, 700.0, 400.0, 0.0, 0.0, 0.0, 0.0, 0.0];
    std::fs::write(dir.join("GCM_runs/NorESM2/NorESM2_ssp585.csv"), retreat_csv(&good)).unwrap();

    let summary = Pipeline::new(config(data.path(), out.path())).run(&[]).unwrap();
    assert_eq!(summary.runs_relocated, 1);
    // CESM2 is unaffected
    assert_eq!(summary.scenarios_completed, 1);

    let glacier = out.path().join(GLACIER);
    assert!(!glacier.join("GCM_results/NorESM2").exists());

    let bucket = glacier.join("GCM_error/NorESM2");
    assert!(bucket.join("ssp245/summary.json").is_file());
    // The remaining scenario of that model is not run
    assert!(!bucket.join("ssp585").exists());
    assert!(find_files(&bucket, "VOL_partial_sink.geojson").is_empty());
    assert!(glacier.join("GCM_results/CESM2/ssp245/icefree_sinks/2040/VOL_partial_sink.geojson").is_file());
}

#[test]
fn test_malformed_retreat_file_moves_run_to_error_bucket() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let dir = write_glacier(data.path(), true);

    // Sorts before CESM2, so the good model runs after the bad one
    std::fs::create_dir_all(dir.join("GCM_runs/ACCESS-CM2")).unwrap();
    std::fs::write(
        dir.join("GCM_runs/ACCESS-CM2/ACCESS-CM2_ssp245.csv"),
        "calendar_year,length\n2019,1000\n2020,990\n",
    )
    .unwrap();

    let summary = Pipeline::new(config(data.path(), out.path())).run(&[]).unwrap();
    assert_eq!(summary.glaciers_failed, 0);
    assert_eq!(summary.runs_relocated, 1);
    assert_eq!(summary.scenarios_completed, 1);
    assert_eq!(summary.lakes, 1);

    let glacier = out.path().join(GLACIER);
    assert!(!glacier.join("GCM_results/ACCESS-CM2").exists());
    let report: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(glacier.join("GCM_error/ACCESS-CM2/ssp245/summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["aborted"]["reason"], "data");
    assert!(report["aborted"]["message"]
        .as_str()
        .unwrap()
        .contains("terminus_thick_0"));
    assert!(glacier.join("GCM_results/CESM2/ssp245/summary.json").is_file());
}

#[test]
fn test_volume_failure_moves_run_to_tin_error_bucket() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_glacier(data.path(), false);

    let summary = Pipeline::new(config(data.path(), out.path())).run(&[]).unwrap();
    assert_eq!(summary.runs_relocated, 1);
    assert_eq!(summary.lakes, 0);

    let glacier = out.path().join(GLACIER);
    assert!(!glacier.join("GCM_results/CESM2").exists());

    let run = glacier.join("GCM_TIN_error/CESM2/ssp245");
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(run.join("summary.json")).unwrap()).unwrap();
    assert_eq!(report["aborted"]["reason"], "volume_computation");
    assert_eq!(report["aborted"]["year"], 2040);

    // Processing stopped at the failing year
    assert!(find_files(&run, "VOL_partial_sink.geojson").is_empty());
    assert!(!run.join("icefree_sinks/2070").exists());
}

#[test]
fn test_glacier_filter_and_missing_inputs() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_glacier(data.path(), true);
    std::fs::create_dir(data.path().join("RGI60-99.00002")).unwrap();
    std::fs::create_dir(data.path().join("notes")).unwrap();

    let pipeline = Pipeline::new(config(data.path(), out.path()));
    assert_eq!(
        pipeline.discover_glaciers().unwrap(),
        vec![GLACIER.to_string(), "RGI60-99.00002".to_string()]
    );

    // The empty glacier directory fails to load but does not stop the batch
    let summary = pipeline.run(&[]).unwrap();
    assert_eq!(summary.glaciers, 2);
    assert_eq!(summary.glaciers_failed, 1);

    let summary = pipeline.run(&["RGI60-99.00002".to_string()]).unwrap();
    assert_eq!(summary.glaciers, 1);
    assert_eq!(summary.scenarios_completed, 0);
}
