use chrono::{Days, Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use readyrs::analytics::analyze_sessions;
use readyrs::load::{LoadCalculator, LoadProfile};
use readyrs::models::{BiometricSample, Discipline, SessionRecord, TimeSeriesPoint, ZoneThresholds};
use readyrs::provider::SessionSeries;
use readyrs::readiness::{ReadinessCalculator, ReadinessInputs};
use readyrs::zones::ZoneAnalyzer;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Benchmarks for the daily engines and per-session analytics

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn create_session_history(days: u64) -> Vec<SessionRecord> {
    (0..days)
        .map(|n| SessionRecord {
            id: Uuid::new_v4(),
            date: today() - Days::new(n),
            discipline: if n % 2 == 0 { Discipline::Run } else { Discipline::Spin },
            duration_minutes: dec!(45) + rust_decimal::Decimal::from(n % 30),
            distance_km: dec!(9.5),
            average_hr: 140,
            rpe: (n % 9 + 1) as u8,
            avg_power: Some(230),
            avg_cadence: Some(88),
            ground_contact_time_ms: None,
            vertical_oscillation_cm: None,
            elevation_gain_m: None,
            linked_directive_id: None,
        })
        .collect()
}

fn create_biometric_history(days: u64) -> Vec<BiometricSample> {
    (1..=days)
        .map(|n| {
            let mut sample = BiometricSample::empty(today() - Days::new(n));
            sample.hrv = Some(55.0 + (n % 11) as f64);
            sample.resting_hr = Some(50.0 + (n % 4) as f64);
            sample.sleep_duration_hours = Some(7.0 + (n % 3) as f64 * 0.5);
            sample
        })
        .collect()
}

fn create_hr_series(samples: usize) -> Vec<TimeSeriesPoint> {
    let start = Utc.with_ymd_and_hms(2024, 6, 30, 6, 0, 0).unwrap();
    (0..samples)
        .map(|i| {
            let hr = 110.0 + (i % 90) as f64;
            TimeSeriesPoint::new(start + Duration::seconds(i as i64), hr)
        })
        .collect()
}

fn bench_load_profile(c: &mut Criterion) {
    let calculator = LoadCalculator::new();
    let mut group = c.benchmark_group("Load Profile");

    for &days in &[28u64, 365, 3650] {
        let sessions = create_session_history(days);
        group.throughput(Throughput::Elements(days));
        group.bench_with_input(BenchmarkId::new("calculate_profile", days), &sessions, |b, sessions| {
            b.iter(|| calculator.calculate_profile(black_box(sessions), today()))
        });
    }

    group.finish();
}

fn bench_readiness(c: &mut Criterion) {
    let calculator = ReadinessCalculator::new();
    let load = LoadProfile::neutral();
    let mut group = c.benchmark_group("Readiness");

    for &days in &[7u64, 28, 365] {
        let history = create_biometric_history(days);
        let mut sample = BiometricSample::empty(today());
        sample.hrv = Some(62.0);
        sample.resting_hr = Some(51.0);
        sample.sleep_duration_hours = Some(7.5);

        group.bench_with_input(BenchmarkId::new("score", days), &history, |b, history| {
            b.iter(|| {
                calculator.score(&ReadinessInputs {
                    today: black_box(&sample),
                    history,
                    load: &load,
                    yesterday_net_energy: Some(-300.0),
                })
            })
        });
    }

    group.finish();
}

fn bench_zone_distribution(c: &mut Criterion) {
    let zones = ZoneThresholds::default();
    let mut group = c.benchmark_group("Zone Distribution");

    for &samples in &[600usize, 3600, 14400] {
        let series = create_hr_series(samples);
        group.throughput(Throughput::Elements(samples as u64));
        group.bench_with_input(BenchmarkId::new("hr_samples", samples), &series, |b, series| {
            b.iter(|| ZoneAnalyzer::analyze_hr_distribution(black_box(series), &zones))
        });
    }

    group.finish();
}

fn bench_session_batch(c: &mut Criterion) {
    let zones = ZoneThresholds::default();
    let mut group = c.benchmark_group("Session Analytics");
    group.sample_size(20);

    for &count in &[10usize, 100] {
        let batch: Vec<(SessionRecord, SessionSeries)> = create_session_history(count as u64)
            .into_iter()
            .map(|session| {
                let series = SessionSeries {
                    heart_rate: create_hr_series(3600),
                    power: create_hr_series(3600),
                    ..SessionSeries::default()
                };
                (session, series)
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("analyze_sessions", count), &batch, |b, batch| {
            b.iter(|| analyze_sessions(black_box(batch), &zones))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_load_profile,
    bench_readiness,
    bench_zone_distribution,
    bench_session_batch
);
criterion_main!(benches);
