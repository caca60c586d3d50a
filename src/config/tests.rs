use super::AppConfig;
use clap::Parser;
use std::time::Duration;

fn parse(args: &[&str]) -> AppConfig {
    let mut argv = vec!["hark"];
    argv.extend_from_slice(args);
    AppConfig::parse_from(argv)
}

#[test]
fn defaults_are_valid() {
    let config = parse(&[]);
    config.validate().expect("defaults should validate");
    assert_eq!(config.sample_rate, 16_000);
    assert_eq!(config.frame_samples, 4_000);
    assert_eq!(config.record_timeout_ms, 30_000);
    assert_eq!(config.min_utterance_ms, 800);
    assert_eq!(config.end_silence_ms, 1_000);
}

#[test]
fn listener_config_converts_to_durations() {
    let config = parse(&["--record-timeout-ms", "5000", "--end-silence-ms", "400"]);
    let listener = config.listener_config(Some("USB Mic".to_string()));
    assert_eq!(listener.record_timeout, Duration::from_secs(5));
    assert_eq!(listener.end_silence, Duration::from_millis(400));
    assert_eq!(listener.device.as_deref(), Some("USB Mic"));
    // 4000 samples at 16 kHz = 250 ms frames.
    assert_eq!(listener.frame_duration(), Duration::from_millis(250));
}

#[test]
fn rejects_out_of_range_sample_rate() {
    let config = parse(&["--sample-rate", "4000"]);
    assert!(config.validate().is_err());
}

#[test]
fn rejects_absurd_frame_size() {
    let config = parse(&["--frame-samples", "10"]);
    assert!(config.validate().is_err(), "sub-5ms frames should fail");
    let config = parse(&["--frame-samples", "64000"]);
    assert!(config.validate().is_err(), ">1s frames should fail");
}

#[test]
fn rejects_end_silence_longer_than_timeout() {
    let config = parse(&["--record-timeout-ms", "1000", "--end-silence-ms", "1000"]);
    assert!(config.validate().is_err());
}

#[test]
fn rejects_min_utterance_longer_than_timeout() {
    let config = parse(&["--record-timeout-ms", "1000", "--min-utterance-ms", "2000"]);
    assert!(config.validate().is_err());
}

#[test]
fn rejects_zero_timeout() {
    let config = parse(&["--record-timeout-ms", "0"]);
    assert!(config.validate().is_err());
}
