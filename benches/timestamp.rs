use chrono::{FixedOffset, NaiveDate, TimeZone};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn parse_timestamp(c: &mut Criterion) {
    let mut group = c.benchmark_group("timestamp");

    for (name, input) in [
        ("utc", "2023-04-07T12:52:00.654321Z"),
        ("offset", "2003-08-24T05:14:15.000003-07:00"),
    ] {
        group.bench_function(format!("own/{name}"), |b| {
            b.iter(|| syslog_ingest::parse_timestamp(black_box(input.as_bytes())))
        });

        group.bench_function(format!("chrono/{name}"), |b| {
            b.iter(|| chrono::DateTime::parse_from_rfc3339(black_box(input)))
        });

        group.bench_function(format!("speedate/{name}"), |b| {
            b.iter(|| {
                let datetime = speedate::DateTime::parse_str_rfc3339(black_box(input)).unwrap();
                let naive = NaiveDate::from_ymd_opt(
                    datetime.date.year as i32,
                    datetime.date.month as u32,
                    datetime.date.day as u32,
                )
                .unwrap()
                .and_hms_micro_opt(
                    datetime.time.hour as u32,
                    datetime.time.minute as u32,
                    datetime.time.second as u32,
                    datetime.time.microsecond,
                )
                .unwrap();
                let offset = FixedOffset::east_opt(datetime.time.tz_offset.unwrap_or(0)).unwrap();
                black_box(offset.from_local_datetime(&naive));
            })
        });
    }

    group.finish();
}

criterion_group!(benches, parse_timestamp);
criterion_main!(benches);
