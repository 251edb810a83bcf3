use std::cell::RefCell;
use std::fs;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use kdenlive_guides::remux::{MetadataExtractor, Remuxer};
use kdenlive_guides::{Error, Options, ParseError, ToolError, run};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const EXISTING_METADATA: &str = ";FFMETADATA1\nencoder=Lavf60.16.100\n";

/// Stands in for ffmpeg: writes canned metadata and copies the sidecar to the output.
#[derive(Default)]
struct FakeFfmpeg {
    fail_extract: bool,
    fail_remux_after_writing: bool,
    fail_remux_untouched: bool,
    truncate_then_fail_remux: bool,
    calls: RefCell<Vec<&'static str>>,
}

fn failure(tool: &'static str) -> ToolError {
    ToolError::Failed {
        tool,
        status: exit_status(1),
        stderr: "Invalid data found when processing input".to_owned(),
    }
}

#[cfg(unix)]
fn exit_status(code: c_int) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
fn exit_status(code: c_int) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(code as u32)
}

impl MetadataExtractor for FakeFfmpeg {
    fn extract_metadata(&self, _input: &Path, sidecar: &Path) -> Result<(), ToolError> {
        self.calls.borrow_mut().push("extract");
        if self.fail_extract {
            return Err(failure("ffmpeg metadata extraction"));
        }
        fs::write(sidecar, EXISTING_METADATA).unwrap();
        Ok(())
    }
}

impl Remuxer for FakeFfmpeg {
    fn remux(&self, _input: &Path, sidecar: &Path, output: &Path) -> Result<(), ToolError> {
        self.calls.borrow_mut().push("remux");
        if self.fail_remux_untouched {
            return Err(failure("ffmpeg remux"));
        }
        if self.truncate_then_fail_remux {
            fs::write(output, b"").unwrap();
            return Err(failure("ffmpeg remux"));
        }
        if self.fail_remux_after_writing {
            fs::write(output, b"partial").unwrap();
            return Err(failure("ffmpeg remux"));
        }
        fs::copy(sidecar, output).unwrap();
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    options: Options,
}

impl Fixture {
    fn new(guides_json: &str) -> Self {
        Self::with_profile(r#"<profile frame_rate_num="25" frame_rate_den="1"/>"#, guides_json)
    }

    fn with_profile(profile: &str, guides_json: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("project.kdenlive");
        fs::write(
            &project,
            format!(
                r#"<?xml version="1.0" encoding="utf-8"?>
<mlt LC_NUMERIC="C" producer="main_bin" version="7.22.0">
 {profile}
 <producer id="black_track" in="00:00:00.000" out="00:00:39.960">
  <property name="length">1000</property>
 </producer>
 <playlist id="main_bin">
  <property name="kdenlive:docproperties.guides">{guides_json}</property>
 </playlist>
</mlt>
"#
            ),
        )
        .unwrap();

        let options = Options {
            input: dir.path().join("input.mkv"),
            output: dir.path().join("output.mkv"),
            guides: project,
            metadata: Some(dir.path().join("ffmetadata.txt")),
            dry_run: false,
        };
        Self { dir, options }
    }

    fn sidecar(&self) -> PathBuf {
        self.dir.path().join("ffmetadata.txt")
    }
}

#[test]
fn guides_become_chapters_in_the_output() {
    let fixture = Fixture::new(
        r#"[{"comment":"Part Two","pos":250,"type":0},{"comment":"Intro","pos":0,"type":0}]"#,
    );
    let ffmpeg = FakeFfmpeg::default();

    let summary = run(&fixture.options, &ffmpeg, &ffmpeg).unwrap();

    assert_eq!(summary.chapters.num_chapters(), 2);
    assert_eq!(summary.output.as_deref(), Some(fixture.options.output.as_path()));
    assert_eq!(*ffmpeg.calls.borrow(), ["extract", "remux"]);
    assert_eq!(
        fs::read_to_string(&fixture.options.output).unwrap(),
        format!(
            "{EXISTING_METADATA}\
             [CHAPTER]\nTIMEBASE=1/1000000000\nSTART=0\nEND=9960000000\ntitle=Intro\n\
             [CHAPTER]\nTIMEBASE=1/1000000000\nSTART=10000000000\nEND=39960000000\ntitle=Part Two\n"
        )
    );
}

#[test]
fn no_guides_keeps_only_existing_metadata() {
    let fixture = Fixture::new("[]");
    let ffmpeg = FakeFfmpeg::default();

    let summary = run(&fixture.options, &ffmpeg, &ffmpeg).unwrap();

    assert!(summary.chapters.is_empty());
    assert_eq!(fs::read_to_string(fixture.sidecar()).unwrap(), EXISTING_METADATA);
}

#[test]
fn malformed_guides_abort_before_any_tool_runs() {
    let fixture = Fixture::new(r#"[{"comment":"Intro","pos":"#);
    let ffmpeg = FakeFfmpeg::default();

    let err = run(&fixture.options, &ffmpeg, &ffmpeg).unwrap_err();

    assert!(matches!(err, Error::Parse(ParseError::Guides(_))));
    assert!(ffmpeg.calls.borrow().is_empty());
    assert!(!fixture.options.output.exists());
    assert!(!fixture.sidecar().exists());
}

#[test]
fn zero_frame_rate_denominator_is_a_parse_error() {
    let fixture = Fixture::with_profile(
        r#"<profile frame_rate_num="25" frame_rate_den="0"/>"#,
        r#"[{"comment":"Intro","pos":0}]"#,
    );
    let ffmpeg = FakeFfmpeg::default();

    let err = run(&fixture.options, &ffmpeg, &ffmpeg).unwrap_err();

    assert!(matches!(err, Error::Parse(ParseError::ZeroDenominator)));
    assert!(!fixture.options.output.exists());
}

#[test]
fn failed_extraction_stops_before_remux() {
    let fixture = Fixture::new(r#"[{"comment":"Intro","pos":0}]"#);
    let ffmpeg = FakeFfmpeg {
        fail_extract: true,
        ..Default::default()
    };

    let err = run(&fixture.options, &ffmpeg, &ffmpeg).unwrap_err();

    assert!(matches!(err, Error::Tool(ToolError::Failed { .. })));
    assert!(err.to_string().contains("Invalid data found"));
    assert_eq!(*ffmpeg.calls.borrow(), ["extract"]);
    assert!(!fixture.options.output.exists());
}

#[test]
fn failed_remux_removes_partial_output() {
    let fixture = Fixture::new(r#"[{"comment":"Intro","pos":0}]"#);
    let ffmpeg = FakeFfmpeg {
        fail_remux_after_writing: true,
        ..Default::default()
    };

    let err = run(&fixture.options, &ffmpeg, &ffmpeg).unwrap_err();

    assert!(matches!(err, Error::Tool(_)));
    assert!(!fixture.options.output.exists());
}

#[test]
fn failed_remux_keeps_untouched_existing_output() {
    let fixture = Fixture::new(r#"[{"comment":"Intro","pos":0}]"#);
    fs::write(&fixture.options.output, b"previous render").unwrap();
    let ffmpeg = FakeFfmpeg {
        fail_remux_untouched: true,
        ..Default::default()
    };

    run(&fixture.options, &ffmpeg, &ffmpeg).unwrap_err();

    assert_eq!(fs::read(&fixture.options.output).unwrap(), b"previous render");
}

#[test]
fn failed_remux_removes_truncated_existing_output() {
    let fixture = Fixture::new(r#"[{"comment":"Intro","pos":0}]"#);
    fs::write(&fixture.options.output, b"previous render").unwrap();
    let ffmpeg = FakeFfmpeg {
        truncate_then_fail_remux: true,
        ..Default::default()
    };

    run(&fixture.options, &ffmpeg, &ffmpeg).unwrap_err();

    assert!(!fixture.options.output.exists());
}

#[test]
fn dry_run_only_computes_chapters() {
    let mut fixture = Fixture::new(r#"[{"comment":"Intro","pos":0}]"#);
    fixture.options.dry_run = true;
    let ffmpeg = FakeFfmpeg::default();

    let summary = run(&fixture.options, &ffmpeg, &ffmpeg).unwrap();

    assert_eq!(summary.chapters.num_chapters(), 1);
    assert!(summary.output.is_none());
    assert!(ffmpeg.calls.borrow().is_empty());
    assert!(!fixture.sidecar().exists());
}

#[test]
fn missing_project_file_is_a_parse_error() {
    let mut fixture = Fixture::new("[]");
    fixture.options.guides = fixture.dir.path().join("missing.kdenlive");
    let ffmpeg = FakeFfmpeg::default();

    let err = run(&fixture.options, &ffmpeg, &ffmpeg).unwrap_err();

    assert!(matches!(err, Error::Parse(ParseError::Io { .. })));
}
