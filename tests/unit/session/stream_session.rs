use super::*;
use crate::encode::sink::InMemorySink;

fn settings(width: u32, height: u32, rate: u32, duration: Duration) -> StreamSettings {
    StreamSettings {
        width,
        height,
        rate,
        duration,
        format: OutputFormat::Raw,
    }
}

#[test]
fn validate_rejects_non_positive_values() {
    assert!(StreamSettings::default().validate().is_ok());
    let ok = StreamSettings::default();
    assert!(StreamSettings { width: 0, ..ok.clone() }.validate().is_err());
    assert!(StreamSettings { height: 0, ..ok.clone() }.validate().is_err());
    assert!(StreamSettings { rate: 0, ..ok.clone() }.validate().is_err());
    assert!(
        StreamSettings {
            duration: Duration::ZERO,
            ..ok
        }
        .validate()
        .is_err()
    );
}

#[test]
fn frame_count_truncates() {
    assert_eq!(StreamSettings::default().frame_count(), 100);
    assert_eq!(
        settings(8, 8, 3, Duration::from_millis(1500)).frame_count(),
        4
    );
    assert_eq!(settings(8, 8, 10, Duration::from_millis(1)).frame_count(), 0);
}

#[test]
fn banner_lists_settings() {
    let text = StreamSettings::default().to_string();
    assert_eq!(
        text,
        "WxH: 256x256 | frameRate: 10 | duration: 10s | format: avi"
    );
}

#[test]
fn parse_duration_accepts_units_and_fractions() {
    assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
    assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
    assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
    assert_eq!(parse_duration("40us").unwrap(), Duration::from_micros(40));
    assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
    assert_eq!(parse_duration("1.5ns").unwrap(), Duration::from_nanos(1));
}

#[test]
fn parse_duration_is_exact_for_decimal_fractions() {
    assert_eq!(parse_duration("1.001s").unwrap(), Duration::from_millis(1001));
    assert_eq!(parse_duration("4.003s").unwrap(), Duration::from_millis(4003));
    assert_eq!(
        parse_duration("0.000000001s").unwrap(),
        Duration::from_nanos(1)
    );
    for ms in 1..5000u64 {
        let text = format!("{}.{:03}s", ms / 1000, ms % 1000);
        assert_eq!(parse_duration(&text).unwrap(), Duration::from_millis(ms), "{text}");
    }

    let s = settings(8, 8, 1000, parse_duration("1.001s").unwrap());
    assert_eq!(s.frame_count(), 1001);
}

#[test]
fn parse_duration_rejects_garbage() {
    for bad in ["", "10", "s", ".", ".s", "1x", "1.2.3s", "-1s", "99999999999h"] {
        assert!(parse_duration(bad).is_err(), "accepted {bad:?}");
    }
}

#[test]
fn writes_every_frame_in_order() {
    let s = settings(16, 8, 200, Duration::from_millis(50));
    let probe = InMemorySink::new();
    let (stats, sink) =
        StreamSession::run(&s, OutputSink::Memory(probe.clone()), &CancelToken::new()).unwrap();
    sink.close().unwrap();

    assert_eq!(stats.frames_sent, 10);
    assert!(stats.emissions >= 10);
    assert!(probe.is_closed());

    let frame_len = 16 * 8 * 4;
    let bytes = probe.bytes();
    assert_eq!(bytes.len() % frame_len, 0);

    let mut written: Vec<&[u8]> = bytes.chunks(frame_len).collect();
    written.dedup();

    let mut scene = Scene::new(16, 8, 200).unwrap();
    let mut expected = vec![scene.frame().unwrap().to_packed()];
    for _ in 1..10 {
        expected.push(scene.next_frame().unwrap().to_packed());
    }
    assert_eq!(written.len(), expected.len());
    for (got, want) in written.iter().zip(&expected) {
        assert_eq!(*got, want.as_slice());
    }
}

#[test]
fn short_duration_still_sends_first_frame() {
    let s = settings(4, 4, 10, Duration::from_millis(1));
    let probe = InMemorySink::new();
    let (stats, _sink) =
        StreamSession::run(&s, OutputSink::Memory(probe.clone()), &CancelToken::new()).unwrap();
    assert_eq!(stats.frames_sent, 1);
    assert!(probe.bytes().len() >= 4 * 4 * 4);
}

#[test]
fn write_error_is_reported_and_sink_closed() {
    let s = settings(8, 8, 100, Duration::from_secs(1));
    let probe = InMemorySink::failing_from(3);
    let err = StreamSession::run(&s, OutputSink::Memory(probe.clone()), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(
        err,
        VideogenError::FrameLoop(crate::frameloop::FrameLoopError::Write(_))
    ));
    assert!(!err.is_panic());
    assert!(probe.is_closed());
    assert_eq!(probe.attempts(), 3);
}

#[test]
fn panic_in_sink_is_reported_as_panic() {
    let s = settings(8, 8, 100, Duration::from_secs(1));
    let probe = InMemorySink::panicking_at(1);
    let err = StreamSession::run(&s, OutputSink::Memory(probe), &CancelToken::new()).unwrap_err();
    assert!(err.is_panic());
}

#[test]
fn cancelled_parent_ends_without_error() {
    let parent = CancelToken::new();
    parent.cancel();
    let s = settings(8, 8, 10, Duration::from_secs(10));
    let probe = InMemorySink::new();
    let (stats, _sink) =
        StreamSession::run(&s, OutputSink::Memory(probe.clone()), &parent).unwrap();
    assert!(stats.frames_sent <= 1);
    assert!(probe.bytes().is_empty());
}

#[test]
fn timeout_cuts_stream_short() {
    let parent = CancelToken::new().with_timeout(Duration::from_millis(100));
    let s = settings(8, 8, 50, Duration::from_secs(30));
    let (stats, _sink) = StreamSession::run(
        &s,
        OutputSink::Memory(InMemorySink::new()),
        &parent,
    )
    .unwrap();
    assert!(stats.frames_sent < s.frame_count());
}

#[test]
fn invalid_settings_fail_before_writing() {
    let probe = InMemorySink::new();
    let s = settings(0, 8, 10, Duration::from_secs(1));
    assert!(StreamSession::run(&s, OutputSink::Memory(probe.clone()), &CancelToken::new()).is_err());
    assert_eq!(probe.attempts(), 0);
}
