use std::sync::{Arc, Mutex};

use approx::{assert_abs_diff_eq, assert_relative_eq};
use k054539::k054539::constants::{PAN_CENTER, SAMPLE_SCALE};
use k054539::k054539::registers::{
    channel_offset, channel_register, format_register, ANALOG_PAN, BANK_SELECT, CONTROL,
    DATA_PORT, KEY_OFF, KEY_ON, REGISTER_SPACE,
};
use k054539::{ChipBindings, ChipConfig, ControlFlags, GainTables, K054539};

const PCM_ON: u8 = ControlFlags::PCM_ENABLE.bits();

fn chip(config: ChipConfig, rom: Vec<u8>) -> K054539 {
    K054539::new(&config, ChipBindings::new(rom)).unwrap()
}

fn write_u24(chip: &mut K054539, offset: u16, value: u32) {
    for (i, b) in value.to_le_bytes()[..3].iter().enumerate() {
        chip.write_register(offset + i as u16, *b);
    }
}

fn read_u24(chip: &K054539, offset: u16) -> u32 {
    u32::from(chip.peek_register(offset))
        | u32::from(chip.peek_register(offset + 1)) << 8
        | u32::from(chip.peek_register(offset + 2)) << 16
}

/// Pitch, start, volume 0 and center pan for one channel.
fn program_channel(chip: &mut K054539, ch: usize, pitch: u32, start: u32) {
    write_u24(chip, channel_register(ch, channel_offset::PITCH), pitch);
    write_u24(chip, channel_register(ch, channel_offset::START), start);
    chip.write_register(channel_register(ch, channel_offset::VOLUME), 0);
    chip.write_register(channel_register(ch, channel_offset::PAN), 0x18);
}

fn center_gain() -> f32 {
    let tables = GainTables::new();
    (tables.attenuation(0) * tables.pan(PAN_CENTER)) as f32 * SAMPLE_SCALE
}

fn render(chip: &mut K054539, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0f32; frames];
    let mut right = vec![0.0f32; frames];
    chip.render(&mut left, &mut right);
    (left, right)
}

#[test]
fn test_arcade_clock_three_frames_then_end() {
    let clock = 18_432_000;
    let rate = 44_100;
    let mut chip = chip(
        ChipConfig::with_clocks(clock, rate),
        vec![0x00, 0x90, 0xA0, 0xB0, 0x80],
    );
    // Smallest pitch that reaches one source sample per output frame
    let ratio = f64::from(clock) / f64::from(rate);
    let pitch = (f64::from(0x1_0000) / ratio).ceil() as u32;
    assert_eq!(pitch, 157);

    program_channel(&mut chip, 0, pitch, 0);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x01);

    let (left, right) = render(&mut chip, 3);
    assert_eq!(left, right);
    assert!(left[0] < left[1] && left[1] < left[2]);

    let gain = center_gain();
    for (out, raw) in left.iter().zip([0x90u8, 0xA0, 0xB0]) {
        let expected = f32::from((raw as i8 as i16) << 8) * gain;
        assert_relative_eq!(*out, expected, max_relative = 0.01);
    }
    assert!(chip.is_channel_active(0));

    let (left, _) = render(&mut chip, 1);
    assert_eq!(left, vec![0.0]);
    assert!(!chip.is_channel_active(0));
    assert_eq!(chip.active_channels(), 0);
}

#[test]
fn test_unity_speed_reproduces_source() {
    let samples: Vec<u8> = (1..=40u8).map(|i| i.wrapping_mul(6)).collect();
    let mut rom = vec![0x00];
    rom.extend(&samples);
    let mut chip = chip(ChipConfig::with_clocks(44_100, 44_100), rom);

    program_channel(&mut chip, 3, 0x1_0000, 0);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 1 << 3);

    let (left, right) = render(&mut chip, samples.len());
    let gain = center_gain();
    for (i, (&out, &raw)) in left.iter().zip(&samples).enumerate() {
        let expected = f32::from((raw as i8 as i16) << 8) * gain;
        assert_eq!(out, expected, "frame {i}");
    }
    assert_eq!(left, right);
    assert_eq!(read_u24(&chip, channel_register(3, channel_offset::START)), 40);
    assert_eq!(chip.channel_state(3).map(|s| s.fraction), Some(0));
}

#[test]
fn test_pcm_disabled_always_silent() {
    let mut chip = chip(ChipConfig::default(), vec![0x40; 256]);
    for ch in 0..8 {
        program_channel(&mut chip, ch, 0x1_0000 + ch as u32 * 0x1000, ch as u32 * 16);
    }
    chip.write_register(KEY_ON, 0xFF);

    for control in [0x00, 0x10, 0x20, 0x80, 0xB0] {
        chip.write_register(CONTROL, control);
        let mut left = vec![0.5f32; 64];
        let mut right = vec![-0.5f32; 64];
        chip.render(&mut left, &mut right);
        assert!(left.iter().chain(&right).all(|&s| s == 0.0), "control {control:#04x}");
    }
    assert_eq!(read_u24(&chip, channel_register(2, channel_offset::START)), 32);
}

#[test]
fn test_register_round_trip() {
    let mut chip = chip(ChipConfig::default(), Vec::new());
    for pass in 0..2u16 {
        for offset in 0..REGISTER_SPACE as u16 {
            if offset == DATA_PORT {
                continue;
            }
            let value = (offset.wrapping_mul(7) + pass * 0x55) as u8;
            chip.write_register(offset, value);
            assert_eq!(chip.read_register(offset), value, "offset {offset:#05x}");
        }
    }
    // Writes past the register space are dropped
    chip.write_register(0x230, 0xAA);
    assert_eq!(chip.read_register(0x230), 0);
}

#[test]
fn test_data_port_ram_round_trip() {
    let mut chip = chip(ChipConfig::default(), Vec::new());
    let data: Vec<u8> = (0..300u32).map(|i| (i * 31 + 7) as u8).collect();

    chip.write_register(BANK_SELECT, 0x80);
    for &b in &data {
        chip.write_register(DATA_PORT, b);
    }
    chip.write_register(BANK_SELECT, 0x80);
    assert_eq!(chip.read_register(DATA_PORT), 0, "reads disabled");

    chip.write_register(CONTROL, ControlFlags::PORT_READ.bits());
    let read: Vec<u8> = (0..data.len()).map(|_| chip.read_register(DATA_PORT)).collect();
    assert_eq!(read, data);
    assert_eq!(&chip.ram()[..data.len()], &data[..]);
}

#[test]
fn test_data_port_reads_rom_bank() {
    let mut rom = vec![0u8; 0x20000 + 4];
    rom[0x20000..].copy_from_slice(&[9, 8, 7, 6]);
    let mut chip = chip(ChipConfig::default(), rom);
    chip.write_register(CONTROL, ControlFlags::PORT_READ.bits());
    chip.write_register(BANK_SELECT, 1);

    // ROM-backed writes are discarded but still advance the cursor
    chip.write_register(DATA_PORT, 0xFF);
    let rest: Vec<u8> = (0..4).map(|_| chip.read_register(DATA_PORT)).collect();
    assert_eq!(rest, vec![8, 7, 6, 0]);
}

#[test]
fn test_loop_jumps_position_keeps_phase() {
    let rom = vec![0x00, 0x10, 0x20, 0x80, 0x50, 0x60, 0x70, 0x70];
    let mut chip = chip(ChipConfig::default(), rom);
    program_channel(&mut chip, 0, 0x1_4000, 0);
    write_u24(&mut chip, channel_register(0, channel_offset::LOOP_START), 4);
    chip.write_register(format_register(0, 1), 0x01);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x01);

    let (left, _) = render(&mut chip, 3);
    let gain = center_gain();
    let expected = [3072.0f32, 6144.0, 11264.0].map(|s| s * gain);
    for (out, want) in left.iter().zip(expected) {
        assert_relative_eq!(*out, want, max_relative = 1e-6);
    }

    // Position jumped to the loop start, phase carried 0xC000 across the boundary
    assert_eq!(read_u24(&chip, channel_register(0, channel_offset::START)), 4);
    assert_eq!(chip.channel_state(0).map(|s| s.fraction), Some(0xC000));
    assert!(chip.is_channel_active(0));
}

#[test]
fn test_loop_target_sentinel_deactivates() {
    let rom = vec![0x00, 0x10, 0x80, 0x80];
    let mut chip = chip(ChipConfig::default(), rom);
    program_channel(&mut chip, 0, 0x1_0000, 0);
    write_u24(&mut chip, channel_register(0, channel_offset::LOOP_START), 3);
    chip.write_register(format_register(0, 1), 0x01);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x01);

    let (left, _) = render(&mut chip, 4);
    assert!(left[0] > 0.0);
    assert_eq!(&left[1..], &[0.0, 0.0, 0.0]);
    assert!(!chip.is_channel_active(0));
}

#[test]
fn test_freeze_holds_bitmap_and_positions() {
    let mut chip = chip(ChipConfig::default(), vec![0x10; 256]);
    program_channel(&mut chip, 0, 0x1_0000, 0);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x01);
    render(&mut chip, 8);
    let start_reg = channel_register(0, channel_offset::START);
    assert_eq!(read_u24(&chip, start_reg), 8);

    chip.write_register(CONTROL, PCM_ON | ControlFlags::FREEZE.bits());
    assert!(chip.is_frozen());
    chip.write_register(KEY_OFF, 0x01);
    chip.write_register(KEY_ON, 0x02);
    assert_eq!(chip.active_channels(), 0x01);

    let (left, _) = render(&mut chip, 8);
    assert!(left.iter().all(|&s| s != 0.0));
    assert_eq!(read_u24(&chip, start_reg), 8);

    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x02);
    assert_eq!(chip.active_channels(), 0x03);
}

#[test]
fn test_start_rewrite_retriggers() {
    let mut rom = vec![0x00; 64];
    rom[1..8].copy_from_slice(&[0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16]);
    rom[33..36].copy_from_slice(&[0x40, 0x41, 0x42]);
    let mut chip = chip(ChipConfig::default(), rom);
    program_channel(&mut chip, 0, 0x1_0000, 0);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x01);
    render(&mut chip, 3);

    write_u24(&mut chip, channel_register(0, channel_offset::START), 32);
    let (left, _) = render(&mut chip, 1);
    // Interpolation history was cleared: the first frame is the new sample alone
    assert_eq!(left[0], f32::from(0x4000i16) * center_gain());
    assert_eq!(chip.channel_state(0).map(|s| s.previous), Some(0));
}

#[test]
fn test_reverse_plays_backwards() {
    let rom = vec![0x80, 0x10, 0x20, 0x30];
    let mut chip = chip(ChipConfig::default(), rom);
    program_channel(&mut chip, 0, 0x1_0000, 3);
    chip.write_register(format_register(0, 0), 0x20);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x01);

    let (left, _) = render(&mut chip, 3);
    let gain = center_gain();
    assert_eq!(left, vec![8192.0 * gain, 4096.0 * gain, 0.0]);
    assert!(!chip.is_channel_active(0));
}

#[test]
fn test_pcm16_and_dpcm_channels_mix() {
    // Channel 0: 16-bit at 0x00; channel 1: DPCM at 0x10
    let mut rom = vec![0u8; 0x20];
    rom[2..6].copy_from_slice(&[0x00, 0x10, 0x00, 0x20]);
    rom[6..8].copy_from_slice(&[0x00, 0x80]);
    rom[0x10..0x14].copy_from_slice(&[0x10, 0x21, 0x02, 0x88]);
    let mut chip = chip(ChipConfig::default(), rom);

    program_channel(&mut chip, 0, 0x1_0000, 0);
    chip.write_register(format_register(0, 0), 0x04);
    program_channel(&mut chip, 1, 0x1_0000, 0x10);
    chip.write_register(format_register(1, 0), 0x08);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x03);

    let (left, _) = render(&mut chip, 3);
    let gain = center_gain();
    let expected = [4096.0 + 256.0, 8192.0 + 512.0, 1536.0];
    for (out, want) in left.iter().zip(expected) {
        assert_relative_eq!(*out, want * gain, max_relative = 1e-6);
    }
    assert!(!chip.is_channel_active(0));
    assert!(chip.is_channel_active(1));
    // DPCM nibble position 3 folds to byte 0x11 with the half-byte phase bit
    assert_eq!(read_u24(&chip, channel_register(1, channel_offset::START)), 0x11);
    assert_eq!(chip.channel_state(1).map(|s| s.fraction), Some(0x8000));
}

#[test]
fn test_reserved_encoding_only_silences_its_channel() {
    let mut chip = chip(ChipConfig::default(), vec![0x20; 64]);
    program_channel(&mut chip, 0, 0x1_0000, 0);
    chip.write_register(format_register(0, 0), 0x0C);
    program_channel(&mut chip, 1, 0x1_0000, 0);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x03);

    let (left, _) = render(&mut chip, 4);
    let single = f32::from(0x2000i16) * center_gain();
    assert!(left.iter().all(|&s| s == single));
    assert_eq!(read_u24(&chip, channel_register(0, channel_offset::START)), 0);
}

#[test]
fn test_volume_and_pan_scale_output() {
    let mut chip = chip(ChipConfig::default(), vec![0x40; 16]);
    program_channel(&mut chip, 0, 0x1_0000, 0);
    chip.write_register(channel_register(0, channel_offset::VOLUME), 0x40);
    chip.write_register(channel_register(0, channel_offset::PAN), 0x11);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x01);

    let (left, right) = render(&mut chip, 2);
    let full = f32::from(0x4000i16) * 0.25 * SAMPLE_SCALE;
    // 0x40 steps = 36 dB down, hard left
    assert_relative_eq!(left[0], full * 10f32.powf(-36.0 / 20.0), max_relative = 1e-5);
    assert_eq!(right, vec![0.0, 0.0]);
}

#[test]
fn test_analog_pan_callback() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let bindings = ChipBindings::default().with_analog_pan(move |l: f64, r: f64| {
        sink.lock().unwrap().push((l, r));
    });
    let mut chip = K054539::new(&ChipConfig::default(), bindings).unwrap();

    for value in 0x11..=0x1Fu8 {
        chip.write_register(ANALOG_PAN, value);
    }
    chip.write_register(ANALOG_PAN, 0x05);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 16);
    assert_abs_diff_eq!(seen[0].0, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(seen[14].1, 1.0, epsilon = 1e-12);
    for &(l, r) in seen.iter() {
        assert_abs_diff_eq!(l * l + r * r, 1.0, epsilon = 1e-12);
    }
    // Out-of-range value is centered
    assert_abs_diff_eq!(seen[15].0, seen[15].1, epsilon = 1e-12);
}

#[test]
fn test_rom_reads_past_image_are_zero() {
    // 5-byte ROM: mask 7, addresses 5..7 are outside the image
    let rom = vec![0x00, 0x10, 0x10, 0x10, 0x10];
    let mut chip = chip(ChipConfig::default(), rom);
    assert_eq!(chip.rom_mask(), 7);
    program_channel(&mut chip, 0, 0x1_0000, 0);
    chip.write_register(CONTROL, PCM_ON);
    chip.write_register(KEY_ON, 0x01);

    let (left, _) = render(&mut chip, 8);
    let s = f32::from(0x1000i16) * center_gain();
    assert_eq!(&left[..4], &[s, s, s, s]);
    assert_eq!(&left[4..7], &[0.0, 0.0, 0.0]);
    // Wrapped back to address 0
    assert_eq!(left[7], 0.0);
    assert!(chip.is_channel_active(0));
}
