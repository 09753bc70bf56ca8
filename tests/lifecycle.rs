mod common;

use common::gen_sine;
use spectral_stretch::{Preset, Stretch, StretchConfig, StretchError};

#[test]
fn constructors_reject_invalid_configuration() {
    for (channels, block, interval) in [(0, 1024, 256), (2, 0, 0), (2, 1, 1), (2, 512, 0), (2, 512, 513)] {
        assert!(
            matches!(
                Stretch::new(channels, block, interval),
                Err(StretchError::InvalidConfig(_))
            ),
            "({}, {}, {}) should be rejected",
            channels,
            block,
            interval
        );
    }
    assert!(Stretch::preset_default(0, 44100.0).is_err());
    assert!(Stretch::preset_cheaper(1, f32::NAN).is_err());
}

#[test]
fn oversized_configuration_fails_without_a_handle() {
    for (block, interval) in [(usize::MAX / 4, 1), (usize::MAX, usize::MAX), (usize::MAX / 2, 3)] {
        assert!(
            matches!(
                Stretch::new(1, block, interval),
                Err(StretchError::Allocation { .. })
            ),
            "block {} interval {}",
            block,
            interval
        );
    }
    assert!(matches!(
        Stretch::preset_default(1, f32::MAX),
        Err(StretchError::Allocation { .. })
    ));
    assert!(matches!(
        Stretch::preset_cheaper(2, 1e30),
        Err(StretchError::Allocation { .. })
    ));
}

#[test]
fn presets_size_blocks_from_sample_rate() {
    let quality = Stretch::preset_default(2, 44100.0).unwrap();
    let cheap = Stretch::preset_cheaper(2, 44100.0).unwrap();
    assert_eq!((quality.block_length(), quality.interval()), (5292, 1323));
    assert_eq!((cheap.block_length(), cheap.interval()), (4410, 1764));
    assert!(cheap.block_length() < quality.block_length());
    assert!(cheap.interval() > quality.interval());

    let from_enum = Stretch::from_config(
        &StretchConfig::from_preset(Preset::Cheaper, 2, 44100.0).unwrap(),
    )
    .unwrap();
    assert_eq!(from_enum.block_length(), cheap.block_length());
}

#[test]
fn latencies_are_stable_across_operations() {
    let mut stretch = Stretch::new(2, 1024, 256).unwrap();
    let (input_latency, output_latency) = (stretch.input_latency(), stretch.output_latency());
    assert_eq!(input_latency + output_latency, 1024);
    assert_eq!(stretch.total_latency(), 1024);

    let signal = gen_sine(440.0, 44100, 2000, |_| 0.5);
    let stereo: Vec<f32> = signal.iter().flat_map(|&s| [s, s]).collect();
    let mut out = vec![0.0f32; 3000 * 2];

    stretch.seek(&stereo[..1000], 1.5).unwrap();
    assert_eq!(stretch.input_latency(), input_latency);
    stretch.set_transpose_semitones(5.0, Some(0.1));
    stretch.set_formant_factor(1.2, true);
    stretch.process(&stereo, &mut out).unwrap();
    assert_eq!(stretch.input_latency(), input_latency);
    assert_eq!(stretch.output_latency(), output_latency);
    stretch.reset();
    assert_eq!(stretch.input_latency(), input_latency);
    assert_eq!(stretch.output_latency(), output_latency);
}

#[test]
fn reset_keeps_pitch_parameters() {
    let mut stretch = Stretch::new(1, 256, 64).unwrap();
    stretch.set_transpose_factor(1.5, Some(0.2));
    stretch.set_formant_semitones(2.0, true);
    stretch.set_formant_base(0.01);
    let before = *stretch.pitch_params();
    stretch.reset();
    assert_eq!(*stretch.pitch_params(), before);
    assert_eq!(before.transpose, 1.5);
    assert_eq!(before.formant_base, 0.01);
}

#[test]
fn setters_never_reject_extreme_values() {
    let mut stretch = Stretch::new(1, 256, 64).unwrap();
    stretch.set_transpose_factor(1e9, None);
    assert_eq!(stretch.pitch_params().transpose, 16.0);
    stretch.set_transpose_semitones(-1000.0, Some(-5.0));
    assert_eq!(stretch.pitch_params().transpose, 1.0 / 16.0);
    assert_eq!(stretch.pitch_params().tonality_limit, 0.0);
    stretch.set_formant_factor(f32::NAN, true);
    assert_eq!(stretch.pitch_params().formant, 1.0);

    // Still processes after the extremes
    let input = gen_sine(1000.0, 44100, 512, |_| 0.5);
    let mut out = vec![0.0f32; 512];
    stretch.process(&input, &mut out).unwrap();
    assert!(out.iter().all(|x| x.is_finite()));
}

#[test]
fn process_after_flush_starts_a_fresh_stream() {
    let first = gen_sine(300.0, 44100, 3000, |_| 0.4);
    let second = gen_sine(700.0, 44100, 3000, |_| 0.4);

    let mut reused = Stretch::new(1, 512, 128).unwrap();
    let mut out = vec![0.0f32; 3000];
    reused.process(&first, &mut out).unwrap();
    let mut tail = vec![0.0f32; reused.output_latency()];
    reused.flush(&mut tail).unwrap();

    let mut fresh = Stretch::new(1, 512, 128).unwrap();
    let mut expected = vec![0.0f32; 3000];
    fresh.process(&second, &mut expected).unwrap();

    reused.process(&second, &mut out).unwrap();
    assert_eq!(out, expected);
}

#[test]
fn handles_are_independent() {
    let input = gen_sine(440.0, 44100, 2048, |_| 0.5);
    let mut a = Stretch::new(1, 512, 128).unwrap();
    let mut b = Stretch::new(1, 512, 128).unwrap();
    b.set_transpose_semitones(7.0, None);

    let mut out_a = vec![0.0f32; 2048];
    let mut out_b = vec![0.0f32; 2048];
    a.process(&input, &mut out_a).unwrap();
    b.process(&input, &mut out_b).unwrap();
    assert_eq!(a.pitch_params().transpose, 1.0);
    assert_ne!(out_a, out_b);

    drop(b);
    let mut again = vec![0.0f32; 2048];
    a.process(&input, &mut again).unwrap();
    assert!(again.iter().all(|x| x.is_finite()));
}
