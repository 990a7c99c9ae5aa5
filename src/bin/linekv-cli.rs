use std::io::{self, BufRead, Write};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

#[tokio::main]
async fn main() -> io::Result<()> {
    let mut host = "127.0.0.1".to_string();
    let mut port = 6379u16;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                if i + 1 < args.len() {
                    host = args[i + 1].clone();
                    i += 1;
                }
            }
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    if let Ok(p) = args[i + 1].parse() {
                        port = p;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    let addr = format!("{host}:{port}");
    let stream = TcpStream::connect(&addr).await?;
    eprintln!("Connected to {addr}");
    let mut conn = BufStream::new(stream);

    let stdin = io::stdin();
    let mut reader = stdin.lock();

    loop {
        print!("linekv> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let n = reader.read_line(&mut line)?;
        if n == 0 {
            break;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") {
            break;
        }

        conn.write_all(line.as_bytes()).await?;
        conn.write_all(b"\n").await?;
        conn.flush().await?;

        let mut reply = String::new();
        let n = conn.read_line(&mut reply).await?;
        if n == 0 {
            eprintln!("Connection closed by server");
            return Ok(());
        }
        print!("{reply}");
    }

    Ok(())
}
