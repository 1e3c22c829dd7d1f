//! Common test utilities

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

/// A webhook endpoint on localhost answering with scripted responses, one
/// connection per request.
pub struct MockWebhook {
    pub url: String,
    handle: JoinHandle<Vec<String>>,
}

impl MockWebhook {
    pub fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!(
            "http://{}/api/webhooks/1/token",
            listener.local_addr().unwrap()
        );

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();

            for (status, body) in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut request = String::new();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap();
                        }
                    }
                    let end_of_head = line == "\r\n" || line.is_empty();
                    request.push_str(&line);
                    if end_of_head {
                        break;
                    }
                }

                let mut payload = vec![0; content_length];
                reader.read_exact(&mut payload).unwrap();
                request.push_str(&String::from_utf8_lossy(&payload));
                requests.push(request);

                let response = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let mut stream = reader.into_inner();
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }

            requests
        });

        Self { url, handle }
    }

    /// Waits until every scripted response was served and returns the raw
    /// requests, head and body.
    pub fn requests(self) -> Vec<String> {
        self.handle.join().unwrap()
    }
}
