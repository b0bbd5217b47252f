//! Notifier adapters - console output and HTTP webhook

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::domain::OtpPurpose;
use crate::ports::Notifier;

/// Prints codes on stderr, for local use without a mail gateway
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for ConsoleNotifier {
    fn name(&self) -> &str {
        "console"
    }

    fn send_otp(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<()> {
        eprintln!("[{}] to {}: your code is {}", purpose.subject(), email, code);
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    email: &'a str,
    code: &'a str,
    purpose: OtpPurpose,
    subject: &'a str,
}

/// POSTs codes as JSON to a delivery endpoint (mail or SMS gateway)
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::validation(format!("invalid webhook URL: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::validation("webhook URL must use http or https"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::notification(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, url })
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::notification("webhook timed out after 10 seconds")
        } else if error.is_connect() {
            Error::notification(format!("unable to connect to {}", self.url.host_str().unwrap_or("webhook")))
        } else {
            Error::notification(format!("webhook request failed: {}", error))
        }
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    fn send_otp(&self, email: &str, code: &str, purpose: OtpPurpose) -> Result<()> {
        let payload = WebhookPayload {
            email,
            code,
            purpose,
            subject: purpose.subject(),
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::notification(format!("webhook returned HTTP {}", status.as_u16())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Accept a single request, answer with `status`, and hand back the raw request
    fn one_shot_server(status: u16) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/otp", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            );
            stream.write_all(reply.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(WebhookNotifier::new("not a url"), Err(Error::Validation(_))));
        assert!(matches!(WebhookNotifier::new("ftp://example.com/x"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_posts_json_payload() {
        let (url, server) = one_shot_server(200);
        let notifier = WebhookNotifier::new(&url).unwrap();

        notifier
            .send_otp("alice@example.com", "042917", OtpPurpose::PasswordReset)
            .unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /otp"));
        assert!(request.contains("\"email\":\"alice@example.com\""));
        assert!(request.contains("\"code\":\"042917\""));
        assert!(request.contains("\"purpose\":\"PasswordReset\""));
    }

    #[test]
    fn test_non_success_status_is_notification_error() {
        let (url, server) = one_shot_server(503);
        let notifier = WebhookNotifier::new(&url).unwrap();

        let result = notifier.send_otp("alice@example.com", "042917", OtpPurpose::Registration);
        server.join().unwrap();

        match result {
            Err(Error::Notification(msg)) => assert!(msg.contains("503")),
            other => panic!("expected notification error, got {:?}", other),
        }
    }

    #[test]
    fn test_console_notifier_never_fails() {
        assert!(ConsoleNotifier::new()
            .send_otp("a@b.com", "123456", OtpPurpose::Registration)
            .is_ok());
    }
}
