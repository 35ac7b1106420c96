//! RTSP connection provider.
//!
//! Liveness is verified by speaking just enough RTSP over a plain TCP
//! connection (`OPTIONS`, then `DESCRIBE` on the stream path). Frames are
//! pulled by an `ffmpeg` child process that reads one video frame from the
//! stream and writes it to stdout as MJPEG. The child is killed if it
//! outlives the configured timeout.
//!
//! When the camera challenges `DESCRIBE` and credentials are configured,
//! the request is repeated once with an `Authorization` header so a wrong
//! password is caught here rather than by the decoder.

use super::auth::Challenge;
use super::{AuthStatus, ConnectError, ConnectionProvider, FrameBuffer, FrameError, Ready};
use crate::config::CameraConfig;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const USER_AGENT: &str = concat!("camshot/", env!("CARGO_PKG_VERSION"));
const MAX_HEADER_BYTES: usize = 64 * 1024;
const MAX_BODY_BYTES: u64 = 1024 * 1024;
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Status line and headers of an RTSP reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtspResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl RtspResponse {
    /// Parse the head of a response (everything before the blank line).
    pub fn parse(head: &str) -> Result<Self, ConnectError> {
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap_or_default();

        let mut parts = status_line.splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("RTSP/") {
            return Err(ConnectError::Protocol(format!(
                "not an RTSP response: '{}'",
                status_line
            )));
        }

        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| {
                ConnectError::Protocol(format!("malformed status line: '{}'", status_line))
            })?;
        let reason = parts.next().unwrap_or_default().to_string();

        let headers = lines
            .filter(|line| !line.is_empty())
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        Ok(Self {
            status,
            reason,
            headers,
        })
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of a repeatable header, in order.
    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn content_length(&self) -> u64 {
        self.header("Content-Length")
            .and_then(|len| len.parse().ok())
            .unwrap_or(0)
    }
}

struct Session {
    stream: TcpStream,
    cseq: u32,
}

impl Session {
    fn request(
        &mut self,
        method: &str,
        url: &str,
        extra: &[(&str, &str)],
    ) -> Result<RtspResponse, ConnectError> {
        self.cseq += 1;

        let mut request = format!(
            "{} {} RTSP/1.0\r\nCSeq: {}\r\nUser-Agent: {}\r\n",
            method, url, self.cseq, USER_AGENT
        );
        for (name, value) in extra {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }
        request.push_str("\r\n");

        self.stream.write_all(request.as_bytes())?;
        self.read_response()
    }

    fn read_response(&mut self) -> Result<RtspResponse, ConnectError> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            if let Some(pos) = find_head_end(&buf) {
                break pos;
            }
            if buf.len() > MAX_HEADER_BYTES {
                return Err(ConnectError::Protocol("response header too large".to_string()));
            }
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                return Err(ConnectError::Protocol(
                    "connection closed before response completed".to_string(),
                ));
            }
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
        let response = RtspResponse::parse(&head)?;

        let length = response.content_length();
        if length > MAX_BODY_BYTES {
            return Err(ConnectError::Protocol(format!(
                "response body too large ({} bytes)",
                length
            )));
        }

        // Drain the body so the next reply starts on a clean boundary.
        let already = (buf.len() - (head_end + 4)) as u64;
        let remaining = length.saturating_sub(already);
        if remaining > 0 {
            let drained = io::copy(&mut (&mut self.stream).take(remaining), &mut io::sink())?;
            if drained < remaining {
                return Err(ConnectError::Protocol(
                    "connection closed before response body completed".to_string(),
                ));
            }
        }

        Ok(response)
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Connection provider for RTSP cameras.
pub struct RtspProvider {
    config: CameraConfig,
    ffmpeg: String,
    session: Option<Session>,
}

impl RtspProvider {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            ffmpeg: "ffmpeg".to_string(),
            session: None,
        }
    }

    /// Use a specific ffmpeg executable.
    pub fn with_ffmpeg(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg = path.into();
        self
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Stream URL with credentials embedded, as handed to the decoder.
    pub fn stream_url(&self) -> String {
        let c = &self.config;
        if c.has_credentials() {
            format!(
                "rtsp://{}:{}@{}:{}/{}",
                c.username,
                c.password,
                c.ip,
                c.port,
                c.rtsp_path.trim_start_matches('/')
            )
        } else {
            self.request_url()
        }
    }

    /// Stream URL without credentials, used in RTSP requests and logs.
    pub fn request_url(&self) -> String {
        let c = &self.config;
        format!(
            "rtsp://{}:{}/{}",
            c.ip,
            c.port,
            c.rtsp_path.trim_start_matches('/')
        )
    }

    fn address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.port)
    }

    fn resolve(&self) -> Result<SocketAddr, ConnectError> {
        let address = self.address();
        (self.config.ip.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| ConnectError::Unreachable {
                address: address.clone(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| ConnectError::Unreachable {
                address,
                reason: "host did not resolve".to_string(),
            })
    }

    fn open(&self) -> Result<TcpStream, ConnectError> {
        let addr = self.resolve()?;
        let timeout = self.config.timeout_duration();

        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ConnectError::Timeout {
                address: self.address(),
            },
            _ => ConnectError::Unreachable {
                address: self.address(),
                reason: e.to_string(),
            },
        })?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(stream)
    }

    /// `authenticated` is true when `response` answers a request that
    /// already carried credentials.
    fn classify_describe(
        &self,
        response: &RtspResponse,
        authenticated: bool,
    ) -> Result<AuthStatus, ConnectError> {
        match response.status {
            200 if authenticated => Ok(AuthStatus::Accepted),
            200 => Ok(AuthStatus::NotRequired),
            401 if authenticated => Ok(AuthStatus::Rejected),
            401 if self.config.has_credentials() => Ok(AuthStatus::Deferred),
            401 => Ok(AuthStatus::Rejected),
            404 => Err(ConnectError::Protocol(format!(
                "stream path '{}' not found",
                self.config.rtsp_path
            ))),
            code => Err(ConnectError::Protocol(format!(
                "DESCRIBE returned {} {}",
                code, response.reason
            ))),
        }
    }

    fn spawn_ffmpeg(&self) -> Result<Child, FrameError> {
        Command::new(&self.ffmpeg)
            .args(["-rtsp_transport", "tcp", "-i"])
            .arg(self.stream_url())
            .args([
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-loglevel",
                "error",
                "-y",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FrameError::Decoder(format!("ffmpeg spawn failed: {}", e)))
    }

    /// Strip credentials from decoder output before it leaves the provider.
    fn redact(&self, message: &str) -> String {
        let c = &self.config;
        if !c.has_credentials() {
            return message.to_string();
        }
        message
            .replace(&self.stream_url(), &self.request_url())
            .replace(&format!("{}:{}@", c.username, c.password), "")
    }
}

/// Wait for `child` until `deadline`. Returns `None` on timeout.
///
/// The child is killed and reaped on timeout and on any wait error.
fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) if Instant::now() < deadline => thread::sleep(CHILD_POLL_INTERVAL),
            outcome => {
                let _ = child.kill();
                let _ = child.wait();
                return outcome.map(|_| None);
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut out = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut out);
        }
        out
    })
}

impl ConnectionProvider for RtspProvider {
    fn connect(&mut self) -> Result<Ready, ConnectError> {
        if self.session.is_some() {
            self.disconnect();
        }

        let url = self.request_url();
        tracing::info!(address = %self.address(), "Attempting to connect to RTSP stream");

        let mut session = Session {
            stream: self.open()?,
            cseq: 0,
        };

        let options = session.request("OPTIONS", &url, &[])?;
        if options.status != 200 && options.status != 401 {
            return Err(ConnectError::Protocol(format!(
                "OPTIONS returned {} {}",
                options.status, options.reason
            )));
        }

        let accept = ("Accept", "application/sdp");
        let mut describe = session.request("DESCRIBE", &url, &[accept])?;
        let mut authenticated = false;

        if describe.status == 401 && self.config.has_credentials() {
            let challenge = Challenge::select(describe.headers_named("WWW-Authenticate"));
            match challenge {
                Some(challenge) => {
                    let authorization = challenge.authorization(
                        &self.config.username,
                        &self.config.password,
                        "DESCRIBE",
                        &url,
                    );
                    describe = session.request(
                        "DESCRIBE",
                        &url,
                        &[accept, ("Authorization", authorization.as_str())],
                    )?;
                    authenticated = true;
                }
                None => tracing::warn!(
                    address = %self.address(),
                    "Unsupported authentication challenge, leaving credentials to the decoder"
                ),
            }
        }

        let auth = self.classify_describe(&describe, authenticated)?;
        let server = describe
            .header("Server")
            .or_else(|| options.header("Server"))
            .map(str::to_string);

        tracing::debug!(url = %url, status = describe.status, ?auth, "RTSP stream answered");
        self.session = Some(session);

        Ok(Ready { auth, server })
    }

    fn capture_frame(&mut self) -> Result<FrameBuffer, FrameError> {
        if self.session.is_none() {
            tracing::warn!("Not connected to RTSP stream, cannot capture frame");
            return Err(FrameError::NotConnected);
        }

        let timeout = self.config.timeout_duration();
        let mut child = self.spawn_ffmpeg()?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_until(&mut child, Instant::now() + timeout)? {
            Some(status) => status,
            None => {
                tracing::warn!(timeout_sec = self.config.timeout, "ffmpeg timeout, process killed");
                return Err(FrameError::Timeout(self.config.timeout));
            }
        };

        let data = stdout.join().unwrap_or_default();
        let errors = stderr.join().unwrap_or_default();

        if !status.success() {
            let message = self.redact(String::from_utf8_lossy(&errors).trim());
            if message.contains("401 Unauthorized") {
                return Err(FrameError::Unauthorized);
            }
            return Err(FrameError::Decoder(if message.is_empty() {
                format!("ffmpeg exited with {}", status)
            } else {
                message
            }));
        }

        if data.is_empty() {
            return Err(FrameError::EmptyFrame);
        }

        Ok(FrameBuffer::new(data))
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(address = %self.address(), "Disconnecting from RTSP stream");
            let _ = session.stream.shutdown(Shutdown::Both);
        }
    }
}
