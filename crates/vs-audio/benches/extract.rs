use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vs_audio::fft::Spectrogram;
use vs_audio::{FeatureExtractor, extract_features};
use vs_core::buffer::AudioBuffer;
use vs_core::config::AnalysisConfig;

fn voice_like(n_samples: usize, sample_rate: u32) -> Vec<f32> {
    (0..n_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let f0 = 180.0 + 20.0 * (2.0 * std::f32::consts::PI * 3.0 * t).sin();
            (1..=4)
                .map(|h| 0.2 / h as f32 * (2.0 * std::f32::consts::PI * f0 * h as f32 * t).sin())
                .sum()
        })
        .collect()
}

fn bench_extract_3s(c: &mut Criterion) {
    let buffer = AudioBuffer::mono(voice_like(66150, 22050), 22050);

    c.bench_function("extract_features_3s", |b| {
        b.iter(|| black_box(extract_features(black_box(&buffer))));
    });
}

fn bench_extractor_reuse(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(AnalysisConfig::default());
    let buffer = AudioBuffer::mono(voice_like(66150, 22050), 22050);

    c.bench_function("feature_extractor_3s_reused", |b| {
        b.iter(|| black_box(extractor.extract(black_box(&buffer))));
    });
}

fn bench_spectrogram(c: &mut Criterion) {
    let signal = voice_like(66150, 22050);

    c.bench_function("spectrogram_3s", |b| {
        b.iter(|| {
            let _ = black_box(Spectrogram::compute(black_box(&signal), 22050, 2048, 512));
        });
    });
}

criterion_group!(benches, bench_extract_3s, bench_extractor_reuse, bench_spectrogram);
criterion_main!(benches);
