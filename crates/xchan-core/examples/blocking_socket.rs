//! 阻塞 socket 上传 - 把文件发送到本地服务端
//!
//! 服务端线程接收数据并统计字节数，客户端用 transfer_to 发送文件。
//!
//! 使用方法:
//! ```bash
//! RUST_LOG=debug cargo run --example blocking_socket -- <file>
//! ```

use std::thread;
use xchan_core::{
    ByteBuffer, FileChannel, OpenOption, ReadableChannel, SeekableChannel, ServerSocketChannel,
    SocketChannel,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: blocking_socket <file>");
            std::process::exit(2);
        }
    };

    // 服务端
    let server = ServerSocketChannel::bind("127.0.0.1:0")?;
    let addr = server.local_addr()?;
    println!("Listening on {}", addr);

    let receiver = thread::spawn(move || -> xchan_core::Result<u64> {
        let mut conn = server.accept()?;
        let mut buf = ByteBuffer::allocate(16 * 1024);
        let mut total = 0u64;
        while let Some(n) = conn.read(&mut buf)? {
            total += n as u64;
            buf.clear();
        }
        Ok(total)
    });

    // 客户端
    let mut file = FileChannel::open(&path, &[OpenOption::Read])?;
    let mut socket = SocketChannel::connect(addr)?;
    let size = file.size()?;
    let mut sent = 0;
    while sent < size {
        sent += file.transfer_to(sent, size - sent, &mut socket)?;
    }
    socket.shutdown_output()?;
    println!("Sent {} bytes", sent);

    let received = receiver.join().map_err(|_| "receiver panicked")??;
    println!("Server received {} bytes", received);
    Ok(())
}
