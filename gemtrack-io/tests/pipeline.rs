#![allow(clippy::uninlined_format_args)]

use std::io::Write;

use gemtrack_algorithms::track_events;
use gemtrack_io::{read_events, SetupConfig};
use tempfile::NamedTempFile;

const SETUP: &str = r#"{
    "layers": [
        { "id": 0, "position": [0, 0, 0], "dimension": [200, 200] },
        { "id": 1, "position": [0, 0, 100], "dimension": [200, 200] },
        { "id": 2, "position": [0, 0, 1020], "dimension": [200, 200] },
        { "id": 3, "position": [0, 0, 1120], "dimension": [200, 200] }
    ]
}"#;

fn on_line(layer: i32, z: f64) -> String {
    format!(
        r#"{{"layer": {}, "x": {}, "y": {}}}"#,
        layer,
        5.0 + 0.01 * z,
        -3.0 - 0.02 * z
    )
}

#[test]
fn test_event_file_tracks_without_manual_placement() {
    let system = SetupConfig::from_json(SETUP)
        .unwrap()
        .build_system()
        .unwrap();

    let hits: Vec<String> = [(0, 0.0), (1, 100.0), (2, 1020.0), (3, 1120.0)]
        .iter()
        .map(|&(layer, z)| on_line(layer, z))
        .collect();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"event": 21, "hits": [{}]}}"#, hits.join(", ")).unwrap();
    file.flush().unwrap();

    let events = read_events(file.path()).unwrap();
    assert!(events[0].is_local());

    for parallel in [false, true] {
        let results = track_events(&system, &events, parallel).unwrap();
        assert_eq!(results.len(), 1);

        let result = &results[0];
        assert_eq!(result.number, 21);
        assert_eq!(result.statistics.pairs_parallel, 0);

        let best = result.best.as_ref().expect("track on a straight line");
        assert_eq!(best.nhits(), 4);
        assert!((best.params.x0 - 5.0).abs() < 1e-9, "{:?}", best.params);
        assert!((best.params.y0 + 3.0).abs() < 1e-9, "{:?}", best.params);
        assert!((best.params.xp - 0.01).abs() < 1e-12);
        assert!((best.params.yp + 0.02).abs() < 1e-12);
        assert!(best.params.chi2ndf < 1e-9);
    }
}
