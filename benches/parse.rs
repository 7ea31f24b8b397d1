use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use syslog_loose::Variant;
use tokio_util::codec::Decoder;

use syslog_ingest::codec::OctetCountingCodec;

const MESSAGES: [(&str, &str); 3] = [
    ("minimal", "<34>1 - - - - - -"),
    (
        "plain",
        "<34>1 2003-10-11T22:14:15.003Z mymachine.example.com su - ID47 - 'su root' failed for lonvick on /dev/pts/8",
    ),
    (
        "structured",
        r#"<165>1 2003-10-11T22:14:15.003Z mymachine.example.com evntslog - ID47 [exampleSDID@32473 iut="3" eventSource="Application" eventID="1011"][examplePriority@32473 class="high"] An application event log entry"#,
    ),
];

fn parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, input) in MESSAGES {
        group.throughput(Throughput::Bytes(input.len() as u64));

        group.bench_function(format!("own/{name}"), |b| {
            b.iter(|| syslog_ingest::parse_message(black_box(input.as_bytes())))
        });

        group.bench_function(format!("syslog_loose/{name}"), |b| {
            b.iter(|| syslog_loose::parse_message(black_box(input), Variant::RFC5424))
        });
    }

    group.finish();
}

fn decode_stream(c: &mut Criterion) {
    let (_, message) = MESSAGES[2];
    let frame = format!("{} {}", message.len(), message);
    let stream = frame.repeat(100);

    let mut group = c.benchmark_group("octet_counting");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut codec = OctetCountingCodec::new();
            let mut buf = BytesMut::from(stream.as_str());
            while let Ok(Some(item)) = codec.decode(&mut buf) {
                black_box(item);
            }
        })
    });
    group.finish();
}

criterion_group!(benches, parse, decode_stream);
criterion_main!(benches);
