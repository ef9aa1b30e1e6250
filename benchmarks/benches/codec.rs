use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ledger_core::Transaction;
use wire::{
    decode_dump_reply, decode_request, encode_dump_reply, encode_request, Command, Request,
};

fn synthetic_dump(records: u32) -> Vec<Transaction> {
    (1..=records)
        .map(|i| {
            Transaction::new(
                i,
                format!("user{}", i % 97),
                format!("user{}", (i * 31) % 97),
                (i as u64 * 7) % 1000,
            )
        })
        .collect()
}

fn bench_request_frames(c: &mut Criterion) {
    let request = Request {
        client: "B".to_string(),
        command: Command::TxCoins {
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            amount: 1000,
        },
    };
    let encoded = encode_request(&request).unwrap();

    c.bench_function("encode_request", |b| {
        b.iter(|| encode_request(black_box(&request)).unwrap())
    });
    c.bench_function("decode_request", |b| {
        b.iter(|| decode_request(black_box(&encoded)).unwrap())
    });
}

fn bench_dump_replies(c: &mut Criterion) {
    let dump = synthetic_dump(1000);
    let encoded = encode_dump_reply(&dump).unwrap();

    c.bench_function("encode_dump_reply_1k", |b| {
        b.iter(|| encode_dump_reply(black_box(&dump)).unwrap())
    });
    c.bench_function("decode_dump_reply_1k", |b| {
        b.iter(|| decode_dump_reply(black_box(&encoded)).unwrap())
    });
}

criterion_group!(benches, bench_request_frames, bench_dump_replies);
criterion_main!(benches);
