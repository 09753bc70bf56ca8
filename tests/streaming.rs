mod common;

use common::{
    best_lag_crosscorr, channel_of, estimate_freq_zero_crossings, gen_sine, gen_two_tone,
    interleave, run_streaming, windowed_rms,
};
use spectral_stretch::Stretch;

const SR: u32 = 44100;

#[test]
fn unity_stream_reproduces_input_after_total_latency() {
    let left = gen_sine(440.0, SR, 20000, |_| 0.5);
    let right = gen_two_tone(220.0, 0.3, 1330.0, 0.2, SR, 20000);
    let input = interleave(&[left.clone(), right.clone()]);

    let mut stretch = Stretch::new(2, 1024, 256).unwrap();
    let delay = stretch.total_latency();

    // Irregular chunking must not matter at 1:1
    let mut output = vec![0.0f32; input.len()];
    let sizes = [1, 255, 256, 1000, 17, 4096];
    let mut frame = 0;
    let mut i = 0;
    while frame < 20000 {
        let len = sizes[i % sizes.len()].min(20000 - frame);
        let range = frame * 2..(frame + len) * 2;
        stretch.process(&input[range.clone()], &mut output[range]).unwrap();
        frame += len;
        i += 1;
    }

    for (c, source) in [left, right].iter().enumerate() {
        let out = channel_of(&output, 2, c);
        for t in 2 * delay..out.len() {
            assert!(
                (out[t] - source[t - delay]).abs() < 2e-3,
                "channel {} frame {}: {} vs {}",
                c,
                t,
                out[t],
                source[t - delay]
            );
        }
    }
}

#[test]
fn silence_after_reset_and_flush_is_silent() {
    for (channels, block, interval) in [(1, 64, 16), (2, 512, 128), (3, 1000, 333)] {
        let mut stretch = Stretch::new(channels, block, interval).unwrap();
        stretch.set_transpose_semitones(4.0, None);
        stretch.set_formant_factor(1.3, true);

        let noise = gen_sine(3000.0, SR, 2000 * channels, |_| 0.9);
        let mut scratch = vec![0.0f32; 1500 * channels];
        stretch.process(&noise, &mut scratch).unwrap();
        stretch.reset();

        let silence = vec![0.0f32; 700 * channels];
        let mut out = vec![1.0f32; 900 * channels];
        stretch.process(&silence, &mut out).unwrap();
        assert!(out.iter().all(|&x| x == 0.0));

        let mut tail = vec![1.0f32; stretch.output_latency() * channels];
        stretch.flush(&mut tail).unwrap();
        assert!(tail.iter().all(|&x| x == 0.0), "block {}", block);
    }
}

#[test]
fn identical_handles_produce_identical_output() {
    let input = gen_two_tone(300.0, 0.4, 2100.0, 0.2, SR, 12000);
    let render = || {
        let mut stretch = Stretch::new(1, 1024, 256).unwrap();
        stretch.set_transpose_semitones(-3.0, None);
        run_streaming(&mut stretch, &input, 333, 1.37).unwrap()
    };
    assert_eq!(render(), render());
}

#[test]
fn seek_pre_roll_aligns_output_to_output_latency() {
    let input = gen_sine(523.0, SR, 16000, |_| 0.5);
    let mut stretch = Stretch::new(1, 1024, 256).unwrap();
    let pre = stretch.input_latency();

    stretch.seek(&input[..pre], 1.0).unwrap();
    let mut output = vec![0.0f32; input.len() - pre];
    stretch.process(&input[pre..], &mut output).unwrap();

    // Output frame t carries input frame t + pre - total_latency
    let delay = stretch.output_latency();
    for t in 2048..output.len() {
        assert!(
            (output[t] - input[t - delay]).abs() < 2e-3,
            "frame {}: {} vs {}",
            t,
            output[t],
            input[t - delay]
        );
    }
}

#[test]
fn seek_does_not_write_or_advance_output() {
    let input = gen_sine(880.0, SR, 4096, |_| 0.5);
    let mut seeked = Stretch::new(1, 512, 128).unwrap();
    let mut plain = Stretch::new(1, 512, 128).unwrap();

    let mut out_plain = vec![0.0f32; 600];
    plain.process(&input[..600], &mut out_plain).unwrap();

    // Same output position: the seeked stream plays the tail of its pre-roll
    // where the plain one still plays silence.
    seeked.seek(&input[..1024], 1.0).unwrap();
    let mut out_seeked = vec![0.0f32; 600];
    seeked.process(&input[..600], &mut out_seeked).unwrap();

    assert_eq!(seeked.input_latency(), plain.input_latency());
    assert_eq!(seeked.output_latency(), plain.output_latency());
    assert!(windowed_rms(&out_seeked, 0, 512) > windowed_rms(&out_plain, 0, 512));
}

#[test]
fn output_length_follows_requested_ratio() {
    let input = gen_sine(440.0, SR, 22050, |_| 0.5);
    for ratio in [0.5, 0.8, 1.0, 1.25, 2.0] {
        let mut stretch = Stretch::new(1, 2048, 512).unwrap();
        let output = run_streaming(&mut stretch, &input, 1000, ratio).unwrap();
        let expected = (22050.0 * ratio).round() as usize + stretch.output_latency();
        assert_eq!(output.len(), expected, "ratio {}", ratio);
    }
}

#[test]
fn time_stretch_preserves_pitch() {
    let freq = 440.0;
    let input = gen_sine(freq, SR, 44100, |_| 0.5);
    for ratio in [0.75, 1.5, 2.0] {
        let mut stretch = Stretch::new(1, 4096, 1024).unwrap();
        let output = run_streaming(&mut stretch, &input, 512, ratio).unwrap();
        let start = 8192;
        let end = output.len() - 8192;
        let measured = estimate_freq_zero_crossings(&output, SR, start, end);
        assert!(
            (measured - freq as f64).abs() < freq as f64 * 0.03,
            "ratio {}: measured {:.1} Hz",
            ratio,
            measured
        );
        assert!(windowed_rms(&output, start, end - start) > 0.2);
    }
}

#[test]
fn ratio_may_change_between_calls() {
    let input = gen_sine(660.0, SR, 30000, |_| 0.5);
    let mut stretch = Stretch::new(1, 2048, 512).unwrap();

    let mut output = Vec::<f32>::new();
    for (i, chunk) in input.chunks(1000).enumerate() {
        let out_frames = if i % 2 == 0 { 1500 } else { 700 };
        let start = output.len();
        output.resize(start + out_frames, 0.0);
        stretch.process(chunk, &mut output[start..]).unwrap();
    }
    assert_eq!(output.len(), 15 * 1500 + 15 * 700);

    let measured = estimate_freq_zero_crossings(&output, SR, 6000, output.len() - 2000);
    assert!((measured - 660.0).abs() < 660.0 * 0.05, "measured {:.1}", measured);
}

#[test]
fn stereo_channels_keep_their_content() {
    let left = gen_sine(300.0, SR, 20000, |_| 0.5);
    let right = gen_sine(1200.0, SR, 20000, |_| 0.5);
    let input = interleave(&[left, right]);

    let mut stretch = Stretch::new(2, 2048, 512).unwrap();
    let output = run_streaming(&mut stretch, &input, 700, 1.25).unwrap();
    let out_left = channel_of(&output, 2, 0);
    let out_right = channel_of(&output, 2, 1);

    let end = out_left.len() - 4096;
    let f_left = estimate_freq_zero_crossings(&out_left, SR, 4096, end);
    let f_right = estimate_freq_zero_crossings(&out_right, SR, 4096, end);
    assert!((f_left - 300.0).abs() < 15.0, "left {:.1}", f_left);
    assert!((f_right - 1200.0).abs() < 40.0, "right {:.1}", f_right);
}

#[test]
fn unity_output_correlates_at_total_latency() {
    let input = gen_two_tone(187.0, 0.5, 1013.0, 0.3, SR, 16000);
    let mut stretch = Stretch::preset_cheaper(1, SR as f32).unwrap();
    let latency = stretch.total_latency();
    let output = run_streaming(&mut stretch, &input, 512, 1.0).unwrap();

    let max_lag = latency + 300;
    let reference = &input[4000..6000];
    let window = &output[4000..6000 + max_lag];
    let lag = best_lag_crosscorr(reference, window, max_lag);
    assert_eq!(lag, latency as isize);
}
