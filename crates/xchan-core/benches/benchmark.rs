//! Performance benchmarks for xchan
//!
//! Run with: cargo bench --package xchan-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xchan_core::{
    copy, transfer_to, ByteBuffer, FileChannel, MapMode, OpenOption, TransferConfig,
};

const FILE_SIZE: usize = 8 * 1024 * 1024;

fn source_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("src.bin");
    let data: Vec<u8> = (0..FILE_SIZE).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, data).unwrap();
    path
}

fn open_pair(src: &Path, dst: &Path) -> (FileChannel, FileChannel) {
    let src = FileChannel::open(src, &[OpenOption::Read]).unwrap();
    let dst = FileChannel::open(
        dst,
        &[OpenOption::Write, OpenOption::Create, OpenOption::Truncate],
    )
    .unwrap();
    (src, dst)
}

fn bench_buffer_put_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_put_get");

    for size in [1024, 4096, 65536].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        let data = vec![42u8; *size];
        let mut out = vec![0u8; *size];

        group.bench_with_input(BenchmarkId::new("heap", size), size, |b, &size| {
            let mut buf = ByteBuffer::allocate(size);
            b.iter(|| {
                buf.clear();
                buf.put(&data).unwrap();
                buf.flip();
                buf.get(&mut out).unwrap();
                black_box(&out);
            });
        });

        group.bench_with_input(BenchmarkId::new("direct", size), size, |b, &size| {
            let mut buf = ByteBuffer::allocate_direct(size).unwrap();
            b.iter(|| {
                buf.clear();
                buf.put(&data).unwrap();
                buf.flip();
                buf.get(&mut out).unwrap();
                black_box(&out);
            });
        });
    }
    group.finish();
}

fn bench_file_copy(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let src_path = source_file(&dir);
    let dst_path = dir.path().join("dst.bin");

    let mut group = c.benchmark_group("file_copy");
    group.sample_size(20);
    group.throughput(Throughput::Bytes(FILE_SIZE as u64));

    for size in [1024usize, 8192, 65536].iter() {
        group.bench_with_input(BenchmarkId::new("buffered", size), size, |b, &size| {
            let mut buf = ByteBuffer::allocate(size);
            b.iter(|| {
                let (mut src, mut dst) = open_pair(&src_path, &dst_path);
                let stats = copy(&mut src, &mut dst, &mut buf).unwrap();
                black_box(stats);
            });
        });
    }

    for zero_copy in [true, false] {
        let name = if zero_copy { "transfer_kernel" } else { "transfer_buffered" };
        let config = TransferConfig::default().with_zero_copy(zero_copy);
        group.bench_function(name, |b| {
            b.iter(|| {
                let (mut src, mut dst) = open_pair(&src_path, &dst_path);
                let n = transfer_to(&mut src, 0, FILE_SIZE as u64, &mut dst, &config).unwrap();
                black_box(n);
            });
        });
    }

    group.bench_function("mapped", |b| {
        b.iter(|| {
            let src = FileChannel::open(&src_path, &[OpenOption::Read]).unwrap();
            let mut dst = FileChannel::open(
                &dst_path,
                &[OpenOption::Read, OpenOption::Write, OpenOption::Create],
            )
            .unwrap();
            dst.set_len(FILE_SIZE as u64).unwrap();

            let mut input = src.map(MapMode::ReadOnly, 0, FILE_SIZE).unwrap();
            let mut output = dst.map(MapMode::ReadWrite, 0, FILE_SIZE).unwrap();
            output.put_buffer(&mut input).unwrap();
            black_box(output.position());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_buffer_put_get, bench_file_copy);
criterion_main!(benches);
