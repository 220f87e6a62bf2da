//! End-to-end playback: columns in, audio out.
//!
//! We are "deaf" - we verify renders through RMS/peak analysis, never just
//! that scheduling succeeded.

use std::sync::Arc;
use std::time::Instant;

use tabstrum::{
    render_to_buffer, render_to_wav, AudioContext, Column, ColumnWindow, PlaybackSession,
    PluckedInstrument, RenderConfig, SessionConfig,
};

const SR: f32 = 44100.0;

fn session_at(bpm: f64) -> (AudioContext, PlaybackSession) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let ctx = AudioContext::new(SR);
    let session = PlaybackSession::new(
        ctx.clone(),
        Arc::new(PluckedInstrument::new(SR)),
        SessionConfig {
            bpm,
            ..SessionConfig::default()
        },
    );
    (ctx, session)
}

fn columns(json: &str) -> Vec<Column> {
    serde_json::from_str(json).expect("column JSON")
}

fn rms(samples: &[f32]) -> f32 {
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |a, s| a.max(s.abs()))
}

#[tokio::test]
async fn test_single_note_renders_audio() {
    let (ctx, session) = session_at(120.0);
    let cols = columns(r#"[["", "", "", "3", "", "", "", "", "1/4th", "c1"]]"#);
    session.play_columns(&cols).await.unwrap();

    let audio = render_to_buffer(&ctx, 1.0, &RenderConfig::default());
    assert!(rms(&audio) > 0.005, "expected audible note, rms {}", rms(&audio));
    // Onset is at time zero, so the very first block already sounds.
    assert!(peak(&audio[..2048]) > 0.01);
}

#[tokio::test]
async fn test_empty_column_is_silent() {
    let (ctx, session) = session_at(120.0);
    let cols = columns(r#"[["", "", "", "", "", "", "", "", "1/4th", "c1"]]"#);
    session.play_columns(&cols).await.unwrap();
    let audio = render_to_buffer(&ctx, 0.5, &RenderConfig::default());
    assert_eq!(peak(&audio), 0.0);
}

#[tokio::test]
async fn test_column_pacing_follows_tempo() {
    let (_ctx, session) = session_at(240.0);
    let cols = columns(
        r#"[["", "3", "", "", "", "", "", "", "1/4th", "c1"],
            ["", "5", "", "", "", "", "", "", "1/4th", "c2"],
            ["", "7", "", "", "", "", "", "", "1/4th", "c3"],
            ["", "8", "", "", "", "", "", "", "1/4th", "c4"]]"#,
    );
    let start = Instant::now();
    session.play_columns(&cols).await.unwrap();
    let elapsed = start.elapsed().as_secs_f64();
    // Four beats at 240 bpm is one second.
    assert!((0.9..2.0).contains(&elapsed), "elapsed {elapsed}");
}

#[tokio::test]
async fn test_measure_lines_take_no_time() {
    let (_ctx, session) = session_at(120.0);
    let mut cols = columns(r#"[["", "3", "", "", "", "", "", "", "1/4th", "c1"]]"#);
    for _ in 0..8 {
        cols.push(Column::measure_line());
    }
    let start = Instant::now();
    session.play_columns(&cols).await.unwrap();
    let elapsed = start.elapsed().as_secs_f64();
    // One beat at 120 bpm plus scheduling slack; the dividers add nothing.
    assert!(elapsed < 1.0, "elapsed {elapsed}");
}

#[tokio::test]
async fn test_strummed_chord_staggers_onsets() {
    // Down strum at a slow tempo spreads strings by a clearly audible gap.
    let (ctx, session) = session_at(60.0);
    let cols = columns(r#"[["", "3", "3", "3", "3", "3", "3", "v", "1/4th", "c1"]]"#);
    session.play_columns(&cols).await.unwrap();

    let audio = render_to_buffer(&ctx, 1.0, &RenderConfig::default());
    // Gap per string is 0.01 + 0.045 * 1.0 = 0.055 s; string 6 starts at
    // 0.275 s. Early audio has fewer voices than late audio.
    let early = rms(&audio[..4410]);
    let late = rms(&audio[(0.3 * SR) as usize..(0.4 * SR) as usize]);
    assert!(early > 0.0);
    assert!(late > early, "late {late} vs early {early}");
}

#[tokio::test]
async fn test_accented_strum_halves_the_spread() {
    let (ctx_plain, session_plain) = session_at(60.0);
    let plain = columns(r#"[["", "3", "", "", "", "", "3", "v", "1/4th", "c1"]]"#);
    session_plain.play_columns(&plain).await.unwrap();
    let audio_plain = render_to_buffer(&ctx_plain, 0.5, &RenderConfig::default());

    let (ctx_accent, session_accent) = session_at(60.0);
    let accent = columns(r#"[["", "3", "", "", "", "", "3", "v>", "1/4th", "c1"]]"#);
    session_accent.play_columns(&accent).await.unwrap();
    let audio_accent = render_to_buffer(&ctx_accent, 0.5, &RenderConfig::default());

    // String 6 lands at 0.275 s plain, 0.1375 s accented. Between those
    // onsets the accented render already carries the second voice.
    let window = (0.15 * SR) as usize..(0.25 * SR) as usize;
    let plain_one_voice = rms(&audio_plain[window.clone()]);
    let accent_two_voices = rms(&audio_accent[window]);
    assert!(accent_two_voices > plain_one_voice);
}

#[tokio::test]
async fn test_same_string_note_replaces_previous_voice() {
    let (ctx, session) = session_at(120.0);
    let cols = columns(
        r#"[["", "", "12", "", "", "", "", "", "1/4th", "c1"],
            ["", "", "0", "", "", "", "", "", "1/4th", "c2"]]"#,
    );
    session.play_columns(&cols).await.unwrap();
    // If the first voice kept ringing under the second this would clip the
    // sum well past a single pluck's peak; the registry must evict it.
    let audio = render_to_buffer(&ctx, 1.5, &RenderConfig::default());
    let after_second = peak(&audio[(0.55 * SR) as usize..]);
    assert!(after_second > 0.01);
    assert!(after_second < 2.0);
}

#[tokio::test]
async fn test_parse_error_aborts_playback() {
    let (_ctx, session) = session_at(120.0);
    let cols = columns(r#"[["", "3q", "", "", "", "", "", "", "1/4th", "c1"]]"#);
    let err = session.play_columns(&cols).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("3q"), "unexpected message {msg}");
}

#[tokio::test]
async fn test_stop_all_silences_ringing_strings() {
    let (ctx, session) = session_at(120.0);
    let cols = columns(r#"[["", "3", "", "3", "", "3", "", "", "1/4th", "c1"]]"#);
    session.play_columns(&cols).await.unwrap();

    // Let the chord ring briefly, then choke it.
    let _ = render_to_buffer(&ctx, 0.2, &RenderConfig::default());
    session.stop_all();
    let after = render_to_buffer(&ctx, 0.5, &RenderConfig::default());
    // Past the stop fade there is nothing left.
    assert!(peak(&after[(0.1 * SR) as usize..]) < 1e-4);
}

#[tokio::test]
async fn test_isolated_window_plays_one_column() {
    let (ctx, session) = session_at(120.0);
    let cols = columns(r#"[["", "", "", "", "5", "", "", "", "1/8th", "c1"]]"#);
    let window = ColumnWindow::of(&cols[0]);
    session.play_note_column(&window).await.unwrap();
    let audio = render_to_buffer(&ctx, 0.5, &RenderConfig::default());
    assert!(rms(&audio) > 0.005);
}

#[tokio::test]
async fn test_render_to_wav_reports_stats() {
    let (ctx, session) = session_at(120.0);
    let cols = columns(r#"[["", "", "", "3", "", "", "", "", "1/4th", "c1"]]"#);
    session.play_columns(&cols).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.wav");
    let stats = render_to_wav(&ctx, &path, 1.0, &RenderConfig::default()).unwrap();
    assert_eq!(stats.frames, SR as usize);
    assert!(stats.peak > 0.01);
    assert!(stats.rms > 0.001);

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.len() as usize, stats.frames);
}
