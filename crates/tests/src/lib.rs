//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 本地文件系统 + MockDecoder 的完整管道测试
//! - 失败路径无副作用验证
//! - 幂等性验证

#[cfg(test)]
mod fixtures {
    use std::fs;
    use std::path::{Path, PathBuf};

    pub const GPS_FILE: &str = "GH010042_HERO11 Black-GPS9_sample_final.csv";
    pub const ACCL_FILE: &str = "GH010042_HERO11 Black-ACCL_sample_final.csv";
    pub const GYRO_FILE: &str = "GH010042_HERO11 Black-GYRO_sample_final.csv";

    /// Rows deliberately out of order
    pub const GPS_CSV: &str = "\
cts,date,Sample time [seg],GPS (Lat.) [deg],GPS (Long.) [deg]
0.0,2023-05-01T10:00:00.000Z,0.0,41.38710,2.16990
2000.0,2023-05-01T10:00:02.000Z,2.0,41.38712,2.16994
1000.0,2023-05-01T10:00:01.000Z,1.0,41.38711,2.16992
3000.0,2023-05-01T10:00:03.000Z,3.0,41.38713,2.16996
";

    pub const ACCL_CSV: &str = "\
cts,date,Sample time [seg],Accelerometer [m/s2]
0.0,2023-05-01T10:00:00.000Z,0.0,9.81
500.0,2023-05-01T10:00:00.500Z,0.5,9.79
1100.0,2023-05-01T10:00:01.100Z,1.1,9.83
1900.0,2023-05-01T10:00:01.900Z,1.9,9.80
2600.0,2023-05-01T10:00:02.600Z,2.6,9.77
3200.0,2023-05-01T10:00:03.200Z,3.2,9.82
";

    pub const GYRO_CSV: &str = "\
cts,date,Sample time [seg],Gyroscope [rad/s]
100.0,2023-05-01T10:00:00.100Z,0.1,0.01
1250.0,2023-05-01T10:00:01.250Z,1.25,-0.02
2900.0,2023-05-01T10:00:02.900Z,2.9,0.03
";

    pub struct Scenario {
        pub dir: tempfile::TempDir,
        pub video: PathBuf,
    }

    impl Scenario {
        pub fn data_dir(&self) -> &Path {
            self.dir.path()
        }

        pub fn frames_dir(&self) -> PathBuf {
            self.dir.path().join("frames")
        }

        pub fn output(&self) -> PathBuf {
            self.dir.path().join("combined_metrics.csv")
        }
    }

    /// Data directory with the given sensor files and a placeholder video
    pub fn scenario(files: &[(&str, &str)]) -> Scenario {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let video = dir.path().join("GX010042.MP4");
        fs::write(&video, b"placeholder").unwrap();
        Scenario { dir, video }
    }

    pub fn complete_scenario() -> Scenario {
        scenario(&[
            (GPS_FILE, GPS_CSV),
            (ACCL_FILE, ACCL_CSV),
            (GYRO_FILE, GYRO_CSV),
            ("notes.txt", "not a stream"),
        ])
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;

    use contracts::{FileSystemProvider, SyncConfig, SyncError, Value};
    use frame_extractor::{MockDecoder, MockDecoderConfig};
    use ingestion::LocalFileSystem;
    use telemetry_sync_cli::{Pipeline, PipelineConfig};

    use crate::fixtures::*;

    fn decoder(frame_count: u64) -> MockDecoder {
        MockDecoder::new(MockDecoderConfig {
            frame_rate: 30.0,
            frame_count,
            width: 16,
            height: 8,
            ..Default::default()
        })
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            sync: SyncConfig::default(),
            dry_run: false,
        }
    }

    /// End-to-end test: StreamLoader -> AsofMerger -> FrameExtractor -> Synthesizer -> output
    #[test]
    fn test_e2e_full_run() {
        let scenario = complete_scenario();
        let fs_provider = LocalFileSystem::new();
        let decoder = decoder(30);

        let stats = Pipeline::new(&fs_provider, &decoder, config())
            .run(scenario.data_dir(), &scenario.video)
            .unwrap();

        assert_eq!(stats.combined_rows, 4);
        assert_eq!(stats.frame_interval, Some(5));
        assert_eq!(stats.frames_decoded, 30);
        assert_eq!(stats.frames_extracted, 6);
        assert_eq!(stats.output.as_deref(), Some(scenario.output().as_path()));
        assert_eq!(decoder.released(), 1);

        let frames = fs_provider.list_dir(&scenario.frames_dir()).unwrap();
        assert_eq!(frames.first().unwrap(), "frame_000000.jpeg");
        assert_eq!(frames.last().unwrap(), "frame_000005.jpeg");

        let text = fs::read_to_string(scenario.output()).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "cts_x,date_x,Sample time [seg],GPS (Lat.) [deg],GPS (Long.) [deg],\
             cts_y,date_y,Accelerometer [m/s2],cts,date,Gyroscope [rad/s],\
             Frame,Image Timestamp [s]"
        );
        // GPS cardinality preserved
        assert_eq!(text.lines().count(), 1 + 4);
    }

    #[test]
    fn test_e2e_output_values() {
        let scenario = complete_scenario();
        let fs_provider = LocalFileSystem::new();

        Pipeline::new(&fs_provider, &decoder(30), config())
            .run(scenario.data_dir(), &scenario.video)
            .unwrap();

        let table = fs_provider
            .read_table(&scenario.output(), "combined")
            .unwrap();
        assert_eq!(
            table.key_values("Sample time [seg]").unwrap(),
            vec![0.0, 1.0, 2.0, 3.0]
        );

        // nearest accelerometer rows: 0.0, 1.1, 1.9, 3.2
        let accl: Vec<_> = table
            .column_values("Accelerometer [m/s2]")
            .unwrap()
            .into_iter()
            .cloned()
            .collect();
        assert_eq!(
            accl,
            vec![
                Value::Float(9.81),
                Value::Float(9.83),
                Value::Float(9.80),
                Value::Float(9.82)
            ]
        );

        // frames at 0.0, 0.6, 1.2, 1.8, 2.4, 3.0
        let frame = |i: usize| {
            Value::Text(
                scenario
                    .frames_dir()
                    .join(format!("frame_{i:06}.jpeg"))
                    .display()
                    .to_string(),
            )
        };
        assert_eq!(table.get(0, "Frame"), Some(&frame(0)));
        assert_eq!(table.get(1, "Frame"), Some(&frame(2)));
        assert_eq!(table.get(2, "Frame"), Some(&frame(3)));
        assert_eq!(table.get(3, "Frame"), Some(&frame(5)));
        assert_eq!(
            table.get(3, "Image Timestamp [s]"),
            Some(&Value::Float(3.0))
        );
    }

    #[test]
    fn test_e2e_idempotent() {
        let scenario = complete_scenario();
        let fs_provider = LocalFileSystem::new();
        let decoder = decoder(30);
        let pipeline = Pipeline::new(&fs_provider, &decoder, config());

        pipeline.run(scenario.data_dir(), &scenario.video).unwrap();
        let first = fs::read(scenario.output()).unwrap();
        let first_frame = fs::read(scenario.frames_dir().join("frame_000003.jpeg")).unwrap();

        pipeline.run(scenario.data_dir(), &scenario.video).unwrap();
        let second = fs::read(scenario.output()).unwrap();
        let second_frame = fs::read(scenario.frames_dir().join("frame_000003.jpeg")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_frame, second_frame);
    }

    #[test]
    fn test_missing_gyro_has_no_side_effects() {
        let scenario = scenario(&[(GPS_FILE, GPS_CSV), (ACCL_FILE, ACCL_CSV)]);
        let decoder = decoder(30);

        let err = Pipeline::new(&LocalFileSystem::new(), &decoder, config())
            .run(scenario.data_dir(), &scenario.video)
            .unwrap_err();

        match &err {
            SyncError::MissingInput { what, .. } => assert!(what.contains("gyro"), "got: {what}"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.exit_code(), 3);
        assert_eq!(decoder.opened(), 0);
        assert!(!scenario.frames_dir().exists());
        assert!(!scenario.output().exists());
    }

    #[test]
    fn test_missing_data_dir() {
        let scenario = complete_scenario();
        let err = Pipeline::new(&LocalFileSystem::new(), &decoder(30), config())
            .run(&scenario.data_dir().join("absent"), &scenario.video)
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingInput { .. }), "got: {err}");
    }

    #[test]
    fn test_unopenable_video_writes_nothing() {
        let scenario = complete_scenario();
        let decoder = MockDecoder::failing_open("Invalid data found when processing input");

        let err = Pipeline::new(&LocalFileSystem::new(), &decoder, config())
            .run(scenario.data_dir(), &scenario.video)
            .unwrap_err();

        assert!(matches!(err, SyncError::Open { .. }), "got: {err}");
        assert_eq!(err.exit_code(), 4);
        assert!(!scenario.frames_dir().exists());
        assert!(!scenario.output().exists());
    }

    #[test]
    fn test_absent_video_is_missing_input() {
        let scenario = complete_scenario();
        let decoder = decoder(30);

        let err = Pipeline::new(&LocalFileSystem::new(), &decoder, config())
            .run(scenario.data_dir(), &scenario.data_dir().join("GX019999.MP4"))
            .unwrap_err();

        assert!(matches!(err, SyncError::MissingInput { .. }), "got: {err}");
        assert_eq!(decoder.opened(), 0);
        assert!(!scenario.output().exists());
    }

    #[test]
    fn test_decode_failure_leaves_no_output() {
        let scenario = complete_scenario();
        let decoder = MockDecoder::new(MockDecoderConfig {
            frame_rate: 30.0,
            frame_count: 30,
            fail_at: Some(17),
            width: 16,
            height: 8,
            ..Default::default()
        });

        let err = Pipeline::new(&LocalFileSystem::new(), &decoder, config())
            .run(scenario.data_dir(), &scenario.video)
            .unwrap_err();

        assert!(matches!(err, SyncError::Decode { .. }), "got: {err}");
        assert_eq!(decoder.released(), 1);
        assert!(!scenario.output().exists());
        // frames written before the failure stay on disk
        assert!(scenario.frames_dir().join("frame_000003.jpeg").exists());
    }

    #[test]
    fn test_missing_merge_key_is_schema_error() {
        let scenario = scenario(&[
            (GPS_FILE, "cts,GPS (Lat.) [deg]\n0.0,41.0\n"),
            (ACCL_FILE, ACCL_CSV),
            (GYRO_FILE, GYRO_CSV),
        ]);

        let err = Pipeline::new(&LocalFileSystem::new(), &decoder(30), config())
            .run(scenario.data_dir(), &scenario.video)
            .unwrap_err();

        match &err {
            SyncError::Schema { table, column, .. } => {
                assert_eq!(table, "gps");
                assert_eq!(column, "Sample time [seg]");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.exit_code(), 5);
        assert!(!scenario.frames_dir().exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let scenario = complete_scenario();
        let decoder = decoder(30);
        let config = PipelineConfig {
            dry_run: true,
            ..config()
        };

        let stats = Pipeline::new(&LocalFileSystem::new(), &decoder, config)
            .run(scenario.data_dir(), &scenario.video)
            .unwrap();

        assert!(stats.dry_run);
        assert_eq!(stats.combined_rows, 4);
        assert_eq!(stats.native_fps, Some(30.0));
        assert_eq!(stats.frame_interval, Some(5));
        assert!(stats.output.is_none());
        assert_eq!(decoder.released(), 1);
        assert!(!scenario.frames_dir().exists());
        assert!(!scenario.output().exists());
    }

    #[test]
    fn test_low_frame_rate_video() {
        let scenario = complete_scenario();
        let decoder = MockDecoder::new(MockDecoderConfig {
            frame_rate: 5.0,
            frame_count: 4,
            width: 16,
            height: 8,
            ..Default::default()
        });

        let stats = Pipeline::new(&LocalFileSystem::new(), &decoder, config())
            .run(scenario.data_dir(), &scenario.video)
            .unwrap();
        assert_eq!(stats.frame_interval, Some(1));
        assert_eq!(stats.frames_extracted, 4);
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use frame_extractor::{MockDecoder, MockDecoderConfig};
    use ingestion::LocalFileSystem;
    use telemetry_sync_cli::{Pipeline, PipelineConfig};

    use crate::fixtures::*;

    #[test]
    fn test_config_overrides_layout() {
        let sync = ConfigLoader::load_from_str(
            r#"
output_file = "synced.csv"

[selectors]
gps = "-GPS9_"
accl = "-ACCL_"
gyro = "-GYRO_"

[frames]
dir_name = "stills"
target_fps = 3.0
path_column = "Image"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let scenario = complete_scenario();
        let decoder = MockDecoder::new(MockDecoderConfig {
            frame_rate: 30.0,
            frame_count: 30,
            width: 16,
            height: 8,
            ..Default::default()
        });

        let stats = Pipeline::new(
            &LocalFileSystem::new(),
            &decoder,
            PipelineConfig {
                sync,
                dry_run: false,
            },
        )
        .run(scenario.data_dir(), &scenario.video)
        .unwrap();

        assert_eq!(stats.frame_interval, Some(10));
        assert_eq!(stats.frames_extracted, 3);
        assert!(scenario.data_dir().join("stills/frame_000002.jpeg").exists());

        let text = std::fs::read_to_string(scenario.data_dir().join("synced.csv")).unwrap();
        assert!(text.lines().next().unwrap().ends_with(",Image,Image Timestamp [s]"));
        assert!(!scenario.output().exists());
    }
}

#[cfg(test)]
mod merge_tests {
    use std::fs;

    use contracts::{FileSystemProvider, Value};
    use ingestion::LocalFileSystem;
    use sync_engine::{AsofMerger, MergeOn};

    /// Nearest-match policy on tables parsed from disk
    #[test]
    fn test_nearest_and_tie_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let left = dir.path().join("left.csv");
        let right = dir.path().join("right.csv");
        fs::write(&left, "Sample time [seg],probe\n2.4,a\n2.0,b\n").unwrap();
        fs::write(&right, "Sample time [seg],reading\n5.0,r5\n1.0,r1\n3.0,r3\n").unwrap();

        let fs_provider = LocalFileSystem::new();
        let merged = AsofMerger::new(MergeOn::same("Sample time [seg]"))
            .merge(
                fs_provider.read_table(&left, "left").unwrap(),
                fs_provider.read_table(&right, "right").unwrap(),
            )
            .unwrap();

        assert_eq!(merged.table.len(), 2);
        // sorted left: 2.0 (tie between 1.0 and 3.0 → 1.0), 2.4 (→ 3.0)
        assert_eq!(merged.table.get(0, "probe"), Some(&Value::Text("b".into())));
        assert_eq!(merged.table.get(0, "reading"), Some(&Value::Text("r1".into())));
        assert_eq!(merged.table.get(1, "reading"), Some(&Value::Text("r3".into())));
    }
}
