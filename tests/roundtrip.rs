//! End-to-end round-trip tests over real WAV files on disk.

use std::path::PathBuf;

use ghostbit::{NoPasswordSource, NoProgress, QualityMode};

/// Canonical 44-byte-header WAV around the given sample bytes.
fn build_wav(bits_per_sample: u16, body: &[u8]) -> Vec<u8> {
    let channels: u16 = 2;
    let sample_rate: u32 = 44_100;
    let block_align = channels * bits_per_sample / 8;
    let byte_rate = sample_rate * u32::from(block_align);

    let mut out = Vec::with_capacity(44 + body.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + body.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// 10 seconds of stereo 16-bit 440 Hz sine at 44.1 kHz.
fn sine_body() -> Vec<u8> {
    let frames = 44_100 * 10;
    let mut body = Vec::with_capacity(frames * 4);
    for n in 0..frames {
        let t = n as f64 / 44_100.0;
        let sample = (16_000.0 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()) as i16;
        body.extend_from_slice(&sample.to_le_bytes());
        body.extend_from_slice(&sample.to_le_bytes());
    }
    body
}

fn write_secret(dir: &std::path::Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

#[test]
fn wav_normal_no_password() {
    let dir = tempfile::tempdir().unwrap();
    let carrier = dir.path().join("carrier.wav");
    std::fs::write(&carrier, build_wav(16, &sine_body())).unwrap();

    let secret = write_secret(dir.path(), "hello.txt", b"Hello, world!\n");
    let out = dir.path().join("encoded.wav");

    ghostbit::encode(
        &carrier,
        &[secret],
        &out,
        QualityMode::Normal,
        None,
        &mut NoProgress,
    )
    .unwrap();

    // Same length as the carrier, header byte-identical.
    let original = std::fs::read(&carrier).unwrap();
    let encoded = std::fs::read(&out).unwrap();
    assert_eq!(encoded.len(), original.len());
    assert_eq!(&encoded[..44], &original[..44]);

    let outdir = dir.path().join("extracted");
    let written = ghostbit::decode(&out, &outdir, None, &mut NoPasswordSource, &mut NoProgress)
        .unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].file_name().unwrap().to_str().unwrap(), "hello.txt");
    assert_eq!(std::fs::read(&written[0]).unwrap(), b"Hello, world!\n");
}

#[test]
fn multi_file_high_with_password() {
    let dir = tempfile::tempdir().unwrap();
    let carrier = dir.path().join("carrier.wav");
    std::fs::write(&carrier, build_wav(16, &sine_body())).unwrap();

    let a: Vec<u8> = (0u16..256).map(|b| b as u8).collect();
    let b: Vec<u8> = (0u16..256).rev().map(|b| b as u8).collect();
    let secrets = vec![
        write_secret(dir.path(), "a.bin", &a),
        write_secret(dir.path(), "b.bin", &b),
    ];
    let out = dir.path().join("encoded.wav");

    ghostbit::encode(
        &carrier,
        &secrets,
        &out,
        QualityMode::High,
        Some("p@ss"),
        &mut NoProgress,
    )
    .unwrap();

    // The recovered container must carry cipher version 2 (AES-256-GCM).
    let report = ghostbit::analyze_file(&out, Some("p@ss")).unwrap();
    assert_eq!(report.cipher, Some(ghostbit::CipherVersion::AesGcm));

    let outdir = dir.path().join("extracted");
    let written = ghostbit::decode(
        &out,
        &outdir,
        Some("p@ss"),
        &mut NoPasswordSource,
        &mut NoProgress,
    )
    .unwrap();
    assert_eq!(written.len(), 2);
    assert_eq!(std::fs::read(&written[0]).unwrap(), a);
    assert_eq!(std::fs::read(&written[1]).unwrap(), b);
}

#[test]
fn roundtrip_is_sample_width_independent() {
    let noise: Vec<u8> = {
        let mut state = 0xACE1u32;
        (0..120_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 4) as u8
            })
            .collect()
    };

    for bits in [8u16, 16, 24, 32] {
        let dir = tempfile::tempdir().unwrap();
        let carrier = dir.path().join("carrier.wav");
        std::fs::write(&carrier, build_wav(bits, &noise)).unwrap();

        let secret = write_secret(dir.path(), "payload.bin", b"width independent");
        let out = dir.path().join("encoded.wav");

        ghostbit::encode(
            &carrier,
            &[secret],
            &out,
            QualityMode::Low,
            None,
            &mut NoProgress,
        )
        .unwrap();

        let outdir = dir.path().join("extracted");
        let written =
            ghostbit::decode(&out, &outdir, None, &mut NoPasswordSource, &mut NoProgress).unwrap();
        assert_eq!(
            std::fs::read(&written[0]).unwrap(),
            b"width independent",
            "bits={bits}"
        );
    }
}

#[test]
fn every_mode_roundtrips_every_payload_shape() {
    let body = sine_body();
    for mode in [QualityMode::Low, QualityMode::Normal, QualityMode::High] {
        for payload in [
            vec![0u8],
            vec![0xFFu8; 1000],
            (0..=255u8).collect::<Vec<_>>(),
        ] {
            let dir = tempfile::tempdir().unwrap();
            let carrier = dir.path().join("carrier.wav");
            std::fs::write(&carrier, build_wav(16, &body)).unwrap();
            let secret = write_secret(dir.path(), "f.bin", &payload);
            let out = dir.path().join("encoded.wav");

            ghostbit::encode(&carrier, &[secret], &out, mode, None, &mut NoProgress).unwrap();
            let outdir = dir.path().join("x");
            let written =
                ghostbit::decode(&out, &outdir, None, &mut NoPasswordSource, &mut NoProgress)
                    .unwrap();
            assert_eq!(std::fs::read(&written[0]).unwrap(), payload, "{mode}");
        }
    }
}

#[test]
fn high_bits_of_every_sample_byte_survive() {
    let body = sine_body();
    let dir = tempfile::tempdir().unwrap();
    let carrier = dir.path().join("carrier.wav");
    std::fs::write(&carrier, build_wav(16, &body)).unwrap();
    let secret = write_secret(dir.path(), "s.bin", &[0xAAu8; 4096]);

    for mode in [QualityMode::Low, QualityMode::Normal, QualityMode::High] {
        let out = dir.path().join("encoded.wav");
        ghostbit::encode(&carrier, &[secret.clone()], &out, mode, None, &mut NoProgress).unwrap();

        let original = std::fs::read(&carrier).unwrap();
        let encoded = std::fs::read(&out).unwrap();
        let mask = 0xFFu8 << mode.bits_per_byte();
        for (i, (a, b)) in encoded[44..].iter().zip(&original[44..]).enumerate() {
            assert_eq!(a & mask, b & mask, "mode {mode}, body byte {i}");
        }
    }
}
