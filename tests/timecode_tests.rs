use mtcdisplay::timecode::{Framerate, Timecode, TimecodeError, INVALID_TIMECODE_STRING};

#[test]
fn test_rebalance_frame_overflow() {
    let mut tc = Timecode::new(Framerate::FPS_30_ND, 0, 0, 5, 0);
    tc.set_ff(31);
    assert_eq!(tc.ss(), 6);
    assert_eq!(tc.ff(), 1);
}

#[test]
fn test_drop_frame_skip_on_increment() {
    let mut tc = Timecode::new(Framerate::FPS_30_DF, 0, 0, 59, 29);
    tc.add_frames(1);
    assert_eq!((tc.hh(), tc.mm(), tc.ss(), tc.ff()), (0, 1, 0, 2));
    assert_eq!(tc.string_representation(), "0:01:00;02");
}

#[test]
fn test_drop_frame_keeps_tenth_minute() {
    let mut tc = Timecode::new(Framerate::FPS_29_97_DF, 0, 9, 59, 29);
    tc.add_frames(1);
    assert_eq!(tc.string_representation(), "0:10:00;00");
}

#[test]
fn test_drop_frame_tracks_wall_clock() {
    // One hour of 29.97 drop-frame is 107892 frames and reads 1:00:00;00.
    let tc = Timecode::from_frames(Framerate::FPS_29_97_DF, 107_892);
    assert_eq!(tc.string_representation(), "1:00:00;00");
    assert!((tc.seconds_from_zero() - 3599.9964).abs() < 0.001);
}

#[test]
fn test_seconds_round_trip() {
    let mut tc = Timecode::zero(Framerate::FPS_25);
    tc.set_seconds_from_zero(3723.5);
    assert_eq!(tc.string_representation(), "1:02:03:12");
    assert_eq!(tc.bits(), 40);
    assert!((tc.seconds_from_zero() - 3723.5).abs() < 1e-9);
}

#[test]
fn test_convert_framerate_preserves_seconds() {
    let targets = Framerate::PRESETS;
    for source in Framerate::PRESETS {
        for target in targets {
            let mut tc = Timecode::new(source, 3, 17, 42, 11);
            let before = tc.seconds_from_zero();
            tc.convert_framerate_to(target);
            assert_eq!(tc.framerate(), target);
            assert!(
                (tc.seconds_from_zero() - before).abs() < target.frame_duration(),
                "{} -> {}",
                source,
                target
            );
        }
    }
}

#[test]
fn test_convert_from_reel_start_keeps_hour() {
    let mut tc = Timecode::new(Framerate::FPS_30_ND, 2, 0, 10, 0);
    tc.convert_framerate_from_reel_start_to(Framerate::FPS_29_97_ND);
    assert_eq!(tc.hh(), 2);
    assert_eq!(tc.mm(), 0);
    assert_eq!(tc.ss(), 9);
    assert_eq!(tc.ff(), 29);

    // Converting from zero instead drifts by about 7.2 seconds over two hours.
    let mut from_zero = Timecode::new(Framerate::FPS_30_ND, 2, 0, 10, 0);
    from_zero.convert_framerate_to(Framerate::FPS_29_97_ND);
    assert_eq!((from_zero.hh(), from_zero.mm(), from_zero.ss()), (2, 0, 2));
}

#[test]
fn test_set_framerate_reinterprets_digits() {
    let mut tc = Timecode::new(Framerate::FPS_30_ND, 0, 0, 1, 27);
    tc.set_framerate(Framerate::FPS_25);
    assert_eq!(tc.framerate(), Framerate::FPS_25);
    assert_eq!((tc.ss(), tc.ff()), (2, 2));
}

#[test]
fn test_delta_arithmetic() {
    let start = Timecode::new(Framerate::FPS_24, 1, 0, 0, 0);
    let end = Timecode::new(Framerate::FPS_24, 1, 0, 1, 12);
    assert_eq!(end.frames_from_timecode(&start), Ok(36));
    assert_eq!(end.seconds_from_timecode(&start), Ok(1.5));

    let mut tc = Timecode::zero(Framerate::FPS_24);
    tc.set_frames_from_timecode(-24, &start).unwrap();
    assert_eq!(tc.string_representation(), "0:59:59:00");
    tc.set_seconds_from_timecode(0.5, &start).unwrap();
    assert_eq!(tc.string_representation(), "1:00:00:12");
}

#[test]
fn test_delta_arithmetic_rejects_mixed_framerates() {
    let a = Timecode::zero(Framerate::FPS_24);
    let b = Timecode::zero(Framerate::FPS_25);
    assert_eq!(
        a.frames_from_timecode(&b),
        Err(TimecodeError::FramerateMismatch {
            left: Framerate::FPS_24,
            right: Framerate::FPS_25
        })
    );
    let mut c = a;
    assert!(c.set_seconds_from_timecode(1.0, &b).is_err());
    assert_eq!(c.frames_from_zero(), 0);
}

#[test]
fn test_add_and_subtract_seconds() {
    let mut tc = Timecode::new(Framerate::FPS_25, 0, 0, 10, 0);
    tc.add_seconds(0.2);
    assert_eq!(tc.string_representation(), "0:00:10:05");
    tc.subtract_seconds(10.2);
    assert_eq!(tc.string_representation(), "0:00:00:00");
    assert!(!tc.is_negative());
}

#[test]
fn test_comparison_is_lexicographic() {
    let a = Timecode::with_bits(Framerate::FPS_25, 1, 0, 0, 0, 10);
    let b = Timecode::with_bits(Framerate::FPS_25, 1, 0, 0, 0, 20);
    let c = Timecode::new(Framerate::FPS_25, 0, 59, 59, 24);
    assert!(a < b);
    assert!(c < a);
    let mut negative = Timecode::zero(Framerate::FPS_25);
    negative.subtract_frames(1);
    assert!(negative < Timecode::zero(Framerate::FPS_25));
}

#[test]
fn test_parse_and_format() {
    let tc = Timecode::from_string(Framerate::FPS_25, "10 20 30 15").unwrap();
    assert_eq!(tc.to_string(), "10:20:30:15");
    let tc = Timecode::from_string(Framerate::FPS_25, "1:02:24:15/64@29.97nd").unwrap();
    assert_eq!(tc.string_representation_with_bits_and_framerate(), "1:02:24:15/64@29.97nd");
    assert!(matches!(
        Timecode::from_string(Framerate::FPS_25, "::::::"),
        Err(TimecodeError::Parse(_))
    ));
    assert_eq!(INVALID_TIMECODE_STRING, "-:--:--");
}

#[test]
fn test_framerate_presets() {
    let names: Vec<String> = Framerate::PRESETS.iter().map(|f| f.to_string()).collect();
    assert_eq!(
        names,
        ["23.976", "24", "24.975", "25", "29.97nd", "29.97df", "30nd", "30df"]
    );
    for preset in Framerate::PRESETS {
        assert_eq!(preset.to_string().parse::<Framerate>(), Ok(preset));
    }
    assert!((Framerate::FPS_29_97_DF.rate() - 29.97).abs() < 0.001);
    assert_eq!(Framerate::FPS_24.quarter_frame_duration(), 1.0 / 96.0);
}

#[test]
fn test_parse_rejects_oversized_fields() {
    for text in ["99999999999999:00:00:00", "0:00:4294967296:00", "1:00:00:00/99999999999"] {
        assert!(
            matches!(
                Timecode::from_string(Framerate::FPS_25, text),
                Err(TimecodeError::Parse(_))
            ),
            "{}",
            text
        );
    }
    let tc = Timecode::from_string(Framerate::FPS_25, "4294967295:00:00:00").unwrap();
    assert_eq!(tc.hh(), 4_294_967_295 % 24);
}

#[test]
fn test_extreme_values_wrap_without_overflow() {
    let tc = Timecode::new(Framerate::FPS_25, 49, 0, 0, 0);
    assert_eq!(tc.string_representation(), "1:00:00:00");

    let tc = Timecode::new(Framerate::FPS_30_DF, i64::MAX, i64::MAX, i64::MAX, i64::MAX);
    assert!(tc.hh() < 24);

    let mut tc = Timecode::zero(Framerate::FPS_25);
    tc.add_frames(i64::MAX);
    assert!(tc.hh() < 24);
    tc.subtract_frames(i64::MIN);
    assert!(tc.hh() < 24);

    let mut tc = Timecode::zero(Framerate::FPS_24);
    tc.set_seconds_from_zero(f64::NEG_INFINITY);
    assert!(tc.hh() < 24);
    tc.set_frames_from_zero(i64::MIN);
    assert!(tc.hh() < 24);
}
