//! Webhook notification sent once an import has been committed.
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;

use crate::table::AutoGenKey;

pub const MAX_NOTIFY_ATTEMPTS: u32 = 5;
pub const NOTIFY_RETRY_DELAY: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("notification endpoint answered {0}, expected 204 No Content")]
    UnexpectedStatus(StatusCode),
    #[error("new leak notification failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<NotificationError>,
    },
}

#[derive(Debug, Serialize)]
struct NewLeakBody {
    #[serde(rename = "leakId")]
    leak_id: i64,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    url: String,
    attempts: u32,
    delay: Duration,
}

impl Notifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotificationError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            attempts: MAX_NOTIFY_ATTEMPTS,
            delay: NOTIFY_RETRY_DELAY,
        })
    }

    /// Override the attempt bound (at least one) and the pause between attempts.
    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.delay = delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the key of a freshly imported leak, retrying until the endpoint
    /// answers 204 or the attempts run out.
    pub fn notify_new_leak(&self, leak_id: AutoGenKey) -> Result<(), NotificationError> {
        let body = NewLeakBody { leak_id: leak_id.0 };
        let mut attempt = 1;
        loop {
            let err = match self.send(&body) {
                Ok(()) => {
                    info!("notified {} about leak {}", self.url, leak_id);
                    return Ok(());
                }
                Err(err) => err,
            };
            if attempt >= self.attempts {
                error!(
                    "attempt {}/{} to notify {} failed: {}",
                    attempt, self.attempts, self.url, err
                );
                return Err(NotificationError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            warn!(
                "attempt {}/{} to notify {} failed: {}",
                attempt, self.attempts, self.url, err
            );
            debug!("retrying in {:?}", self.delay);
            thread::sleep(self.delay);
            attempt += 1;
        }
    }

    fn send(&self, body: &NewLeakBody) -> Result<(), NotificationError> {
        let response = self.client.post(&self.url).json(body).send()?;
        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            Ok(())
        } else {
            Err(NotificationError::UnexpectedStatus(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;

    /// Reads one HTTP request and returns its body.
    fn read_request(stream: &TcpStream) -> String {
        let mut reader = BufReader::new(stream);
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).unwrap();
        String::from_utf8(body).unwrap()
    }

    /// Serves one response per status in `statuses`, forwarding request bodies.
    fn serve(statuses: Vec<&'static str>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/leaks", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for status in statuses {
                let (mut stream, _) = listener.accept().unwrap();
                let body = read_request(&stream);
                tx.send(body).unwrap();
                write!(
                    stream,
                    "HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                )
                .unwrap();
            }
        });
        (url, rx)
    }

    #[test]
    fn posts_leak_id_and_accepts_no_content() {
        let (url, bodies) = serve(vec!["204 No Content"]);
        let notifier = Notifier::new(url).unwrap();
        notifier.notify_new_leak(AutoGenKey(42)).unwrap();
        let body: serde_json::Value = serde_json::from_str(&bodies.recv().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({ "leakId": 42 }));
    }

    #[test]
    fn retries_until_no_content() {
        let (url, bodies) = serve(vec![
            "500 Internal Server Error",
            "200 OK",
            "204 No Content",
        ]);
        let notifier = Notifier::new(url)
            .unwrap()
            .with_retry(5, Duration::ZERO);
        notifier.notify_new_leak(AutoGenKey(7)).unwrap();
        assert_eq!(bodies.iter().take(3).count(), 3);
    }

    #[test]
    fn gives_up_after_the_attempt_bound() {
        let (url, bodies) = serve(vec!["503 Service Unavailable", "503 Service Unavailable"]);
        let notifier = Notifier::new(url)
            .unwrap()
            .with_retry(2, Duration::ZERO);
        let err = notifier.notify_new_leak(AutoGenKey(1)).unwrap_err();
        match err {
            NotificationError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(
                    *last,
                    NotificationError::UnexpectedStatus(s) if s == StatusCode::SERVICE_UNAVAILABLE
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(bodies.iter().take(2).count(), 2);
    }

    #[test]
    fn unreachable_endpoint_is_exhausted() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let notifier = Notifier::new(format!("http://127.0.0.1:{port}/"))
            .unwrap()
            .with_retry(3, Duration::ZERO);
        let err = notifier.notify_new_leak(AutoGenKey(1)).unwrap_err();
        assert!(matches!(err, NotificationError::Exhausted { attempts: 3, .. }));
    }
}
