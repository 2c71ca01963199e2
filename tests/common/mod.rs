// Shared fixtures: temp databases and a scripted stand-in for Ollama

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sharpie::db::{Database, PromptRepository};
use sharpie::inference::InferenceClient;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(db_path).unwrap();
    (db, temp_dir)
}

pub fn create_test_repo() -> (Arc<PromptRepository>, TempDir) {
    let (db, temp) = create_test_db();
    (Arc::new(PromptRepository::new(db)), temp)
}

pub fn client_for(addr: SocketAddr) -> InferenceClient {
    InferenceClient::new(format!("http://{}", addr), Duration::from_secs(10)).unwrap()
}

/// An address nothing listens on
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// How the fake backend answers `/api/generate`
#[derive(Clone)]
pub enum GenerateScript {
    /// Write each line followed by `\n`, then close
    Lines(Vec<String>),
    /// Write each line, then hold the connection open
    LinesThenHang(Vec<String>),
    /// Write each line, then drop the connection mid-body
    LinesThenDrop(Vec<String>),
    /// Non-success status with a JSON body
    Status(u16, String),
}

impl GenerateScript {
    pub fn lines(lines: &[&str]) -> Self {
        GenerateScript::Lines(lines.iter().map(|l| l.to_string()).collect())
    }
}

/// Minimal HTTP/1.1 server speaking just enough of the Ollama API
pub struct FakeOllama {
    pub addr: SocketAddr,
    /// Bodies of every `/api/generate` request received
    pub generate_requests: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl FakeOllama {
    pub async fn start(script: GenerateScript, models: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let generate_requests = Arc::new(Mutex::new(Vec::new()));

        let tags = serde_json::json!({
            "models": models.iter().map(|m| serde_json::json!({ "name": m })).collect::<Vec<_>>()
        })
        .to_string();

        let requests = generate_requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let script = script.clone();
                let tags = tags.clone();
                let requests = requests.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, script, tags, requests).await;
                });
            }
        });

        Self {
            addr,
            generate_requests,
        }
    }

    pub fn client(&self) -> InferenceClient {
        client_for(self.addr)
    }
}

async fn handle(
    stream: TcpStream,
    script: GenerateScript,
    tags: String,
    requests: Arc<Mutex<Vec<serde_json::Value>>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).await?;
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    let mut stream = reader.into_inner();

    match path.as_str() {
        "/api/tags" => {
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                tags.len(),
                tags
            );
            stream.write_all(response.as_bytes()).await?;
        }
        "/api/generate" => {
            if let Ok(json) = serde_json::from_slice(&body) {
                requests.lock().unwrap().push(json);
            }

            match script {
                GenerateScript::Status(status, body) => {
                    let response = format!(
                        "HTTP/1.1 {} Error\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    stream.write_all(response.as_bytes()).await?;
                }
                GenerateScript::Lines(lines) => {
                    write_chunked_lines(&mut stream, &lines).await?;
                    stream.write_all(b"0\r\n\r\n").await?;
                }
                GenerateScript::LinesThenHang(lines) => {
                    write_chunked_lines(&mut stream, &lines).await?;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                GenerateScript::LinesThenDrop(lines) => {
                    write_chunked_lines(&mut stream, &lines).await?;
                }
            }
        }
        _ => {
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await?;
        }
    }

    stream.flush().await?;
    stream.shutdown().await
}

async fn write_chunked_lines(stream: &mut TcpStream, lines: &[String]) -> std::io::Result<()> {
    stream
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        )
        .await?;

    for line in lines {
        let data = format!("{}\n", line);
        let chunk = format!("{:x}\r\n{}\r\n", data.len(), data);
        stream.write_all(chunk.as_bytes()).await?;
        stream.flush().await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Ok(())
}
