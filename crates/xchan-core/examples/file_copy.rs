//! 文件复制 - 比较三种复制方式
//!
//! 分别用缓冲区循环、内核传输和内存映射复制同一个文件。
//!
//! 使用方法:
//! ```bash
//! RUST_LOG=debug cargo run --example file_copy -- <src> <dst>
//! ```

use std::time::Instant;
use xchan_core::{
    copy, transfer_to, ByteBuffer, Channel, FileChannel, MapMode, OpenOption, SeekableChannel,
    TransferConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (src_path, dst_path) = match (args.next(), args.next()) {
        (Some(src), Some(dst)) => (src, dst),
        _ => {
            eprintln!("usage: file_copy <src> <dst>");
            std::process::exit(2);
        }
    };
    let create = [OpenOption::Read, OpenOption::Write, OpenOption::Create, OpenOption::Truncate];

    // 缓冲区循环
    let start = Instant::now();
    let mut src = FileChannel::open(&src_path, &[OpenOption::Read])?;
    let mut dst = FileChannel::open(&dst_path, &create)?;
    let mut buf = ByteBuffer::allocate_direct(64 * 1024)?;
    let stats = copy(&mut src, &mut dst, &mut buf)?;
    println!(
        "buffered: {} bytes in {} reads, {:?}",
        stats.bytes,
        stats.reads,
        start.elapsed()
    );
    dst.close()?;

    // 内核传输
    let start = Instant::now();
    let mut dst = FileChannel::open(&dst_path, &create)?;
    let size = src.size()?;
    let n = transfer_to(&mut src, 0, size, &mut dst, &TransferConfig::default())?;
    println!("transfer: {} bytes, {:?}", n, start.elapsed());

    // 内存映射
    let start = Instant::now();
    let len = usize::try_from(size)?;
    dst.set_len(size)?;
    let mut input = src.map(MapMode::ReadOnly, 0, len)?;
    let mut output = dst.map(MapMode::ReadWrite, 0, len)?;
    output.put_buffer(&mut input)?;
    output.force()?;
    println!("mapped: {} bytes, {:?}", output.position(), start.elapsed());

    Ok(())
}
