//! A tiny HTTP/1.1 responder so requests can be checked on a real socket.

use std::collections::HashMap;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// A request as the server saw it. Header names are lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// A canned response.
#[derive(Debug, Clone)]
pub struct Canned {
    status: u16,
    content_type: Option<&'static str>,
    body: String,
}

impl Canned {
    pub fn json(status: u16, body: &str) -> Self {
        Canned {
            status,
            content_type: Some("application/json"),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Canned {
            status,
            content_type: Some("text/plain; charset=utf-8"),
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Canned {
            status,
            content_type: None,
            body: String::new(),
        }
    }

    fn render(&self) -> String {
        let mut response = format!("HTTP/1.1 {} Canned\r\n", self.status);
        if let Some(content_type) = self.content_type {
            response.push_str(&format!("Content-Type: {}\r\n", content_type));
        }
        response.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.body.len(),
            self.body
        ));

        response
    }
}

/// Answer one connection per canned response, in order, then hand back
/// everything that was received.
pub async fn serve(
    responses: Vec<Canned>,
) -> (String, JoinHandle<Vec<Recorded>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let mut received = Vec::new();

        for canned in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            received.push(read_request(&mut socket).await);
            socket.write_all(canned.render().as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }

        received
    });

    (format!("http://{}", addr), server)
}

async fn read_request(socket: &mut TcpStream) -> Recorded {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    let header_end = loop {
        if let Some(ix) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break ix + 4;
        }
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "The connection closed mid-request");
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap().split_whitespace();
    let method = request_line.next().unwrap().to_string();
    let path = request_line.next().unwrap().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| {
            (name.trim().to_ascii_lowercase(), value.trim().to_string())
        })
        .collect();

    let content_length = headers
        .get("content-length")
        .and_then(|len| len.parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "The connection closed mid-body");
        buffer.extend_from_slice(&chunk[..n]);
    }

    let body = &buffer[header_end..header_end + content_length];

    Recorded {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(body).into_owned(),
    }
}
