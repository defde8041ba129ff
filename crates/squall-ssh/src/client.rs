use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::{Duration, Instant};

use squall_domain::{AuthMethod, SshCredentials};
use ssh2::{Channel, MethodType, Session};
use tracing::{debug, warn};

use crate::ansi::filter_ansi;
use crate::error::SshError;
use crate::prompt::{extract_prompt, hostname_from_prompt};

/// Pagination disable commands, fired blind when the vendor is unknown.
/// Wrong commands on a given platform produce harmless errors.
pub const PAGINATION_SHOTGUN: &[&str] = &[
    "terminal length 0",
    "terminal pager 0",
    "set cli screen-length 0",
    "screen-length 0 temporary",
    "disable clipaging",
    "terminal more disable",
    "no page",
    "set cli pager off",
];

// Algorithm offers for legacy equipment. Old KEX/cipher entries lead so a
// device that only speaks them can negotiate; modern entries remain for
// everything else.
const LEGACY_KEX: &str = "diffie-hellman-group1-sha1,diffie-hellman-group14-sha1,\
diffie-hellman-group-exchange-sha1,diffie-hellman-group-exchange-sha256,\
ecdh-sha2-nistp256,ecdh-sha2-nistp384,ecdh-sha2-nistp521,\
curve25519-sha256,curve25519-sha256@libssh.org,\
diffie-hellman-group16-sha512,diffie-hellman-group18-sha512";

const LEGACY_CIPHERS: &str = "aes128-cbc,aes256-cbc,3des-cbc,aes192-cbc,\
aes128-ctr,aes192-ctr,aes256-ctr,\
aes256-gcm@openssh.com,aes128-gcm@openssh.com,chacha20-poly1305@openssh.com";

const LEGACY_HOST_KEYS: &str = "ssh-rsa,ssh-dss,\
ecdsa-sha2-nistp256,ecdsa-sha2-nistp384,ecdsa-sha2-nistp521,\
ssh-ed25519,rsa-sha2-256,rsa-sha2-512";

/// Transport knobs. Defaults match what interactive network CLIs tolerate.
#[derive(Debug, Clone)]
pub struct SshClientConfig {
    pub host: String,
    pub port: u16,
    /// TCP connect + handshake budget.
    pub connect_timeout: Duration,
    /// Read window when no prompt is known yet.
    pub shell_timeout: Duration,
    /// Pacing between commands in one execute() call.
    pub inter_command_delay: Duration,
    /// How long to wait for the expect prompt after sending a command.
    pub expect_prompt_timeout: Duration,
    /// Prompt detection retry budget.
    pub prompt_attempts: u32,
    /// Offer legacy KEX/ciphers/host-key algorithms.
    pub legacy_mode: bool,
}

impl SshClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(30),
            shell_timeout: Duration::from_secs(5),
            inter_command_delay: Duration::from_secs(1),
            expect_prompt_timeout: Duration::from_secs(5),
            prompt_attempts: 5,
            legacy_mode: true,
        }
    }
}

/// Interactive SSH shell session against one network device.
///
/// The session is owned by exactly one worker; commands are strictly serial
/// because the remote shell is stateful.
pub struct SshClient {
    config: SshClientConfig,
    session: Option<Session>,
    channel: Option<Channel>,
    detected_prompt: Option<String>,
    expect_prompt: Option<String>,
}

impl SshClient {
    pub fn new(config: SshClientConfig) -> Self {
        Self {
            config,
            session: None,
            channel: None,
            detected_prompt: None,
            expect_prompt: None,
        }
    }

    // ── Connection ────────────────────────────────────────────────────────────

    /// Connect, authenticate, and open the interactive shell.
    pub fn connect(&mut self, credentials: &SshCredentials) -> Result<(), SshError> {
        let host = self.config.host.clone();
        let port = self.config.port;
        debug!(host = %host, port, legacy = self.config.legacy_mode, "connecting");

        let addr = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| SshError::Connect {
                host: host.clone(),
                port,
                source: e,
            })?
            .next()
            .ok_or_else(|| SshError::Connect {
                host: host.clone(),
                port,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no address resolved"),
            })?;

        let stream = TcpStream::connect_timeout(&addr, self.config.connect_timeout).map_err(
            |e| SshError::Connect {
                host: host.clone(),
                port,
                source: e,
            },
        )?;

        let mut session = Session::new().map_err(SshError::Channel)?;

        if self.config.legacy_mode {
            // Preferences must be set before the handshake.
            session
                .method_pref(MethodType::Kex, LEGACY_KEX)
                .map_err(SshError::Channel)?;
            session
                .method_pref(MethodType::CryptCs, LEGACY_CIPHERS)
                .map_err(SshError::Channel)?;
            session
                .method_pref(MethodType::CryptSc, LEGACY_CIPHERS)
                .map_err(SshError::Channel)?;
            session
                .method_pref(MethodType::HostKey, LEGACY_HOST_KEYS)
                .map_err(SshError::Channel)?;
        }

        session.set_tcp_stream(stream);
        session.handshake().map_err(|e| SshError::Handshake {
            host: host.clone(),
            source: e,
        })?;

        self.authenticate(&session, credentials)?;
        debug!(host = %host, "authenticated");

        let mut channel = session.channel_session().map_err(SshError::Channel)?;
        channel
            .request_pty("xterm", None, Some((200, 24, 0, 0)))
            .map_err(SshError::Channel)?;
        channel.shell().map_err(SshError::Channel)?;

        self.session = Some(session);
        self.channel = Some(channel);

        // Let the device print its banner, then discard it.
        std::thread::sleep(Duration::from_secs(2));
        self.drain();

        Ok(())
    }

    fn authenticate(
        &self,
        session: &Session,
        credentials: &SshCredentials,
    ) -> Result<(), SshError> {
        let username = &credentials.username;
        let auth_err = |e| SshError::Auth {
            username: username.clone(),
            host: self.config.host.clone(),
            source: e,
        };

        match &credentials.auth {
            AuthMethod::Password(password) => session
                .userauth_password(username, password)
                .map_err(auth_err),
            AuthMethod::KeyFile { path, passphrase } => {
                let key_path = Path::new(path);
                if !key_path.exists() {
                    return Err(SshError::KeyLoad(format!("key file not found: {}", path)));
                }
                session
                    .userauth_pubkey_file(username, None, key_path, passphrase.as_deref())
                    .map_err(auth_err)
            }
            AuthMethod::KeyData { pem, passphrase } => session
                .userauth_pubkey_memory(username, None, pem, passphrase.as_deref())
                .map_err(auth_err),
            AuthMethod::Agent => session.userauth_agent(username).map_err(auth_err),
        }
    }

    /// Close the shell and the session.
    pub fn disconnect(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            let _ = channel.close();
        }
        if let Some(session) = self.session.take() {
            let _ = session.disconnect(None, "closing", None);
        }
        debug!(host = %self.config.host, "disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some() && self.channel.is_some()
    }

    // ── Reading ───────────────────────────────────────────────────────────────

    /// Read whatever is available right now, ANSI-filtered. Never blocks.
    fn read_chunk(&mut self) -> String {
        let (Some(session), Some(channel)) = (&self.session, &mut self.channel) else {
            return String::new();
        };

        session.set_blocking(false);
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match channel.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => raw.extend_from_slice(&buf[..n]),
                // WouldBlock means the buffer is empty for now.
                Err(_) => break,
            }
        }
        session.set_blocking(true);

        if raw.is_empty() {
            String::new()
        } else {
            filter_ansi(&String::from_utf8_lossy(&raw))
        }
    }

    /// Read until nothing more arrives, discarding is the caller's choice.
    fn drain(&mut self) -> String {
        let mut output = String::new();
        loop {
            let chunk = self.read_chunk();
            if chunk.is_empty() {
                break;
            }
            output.push_str(&chunk);
            std::thread::sleep(Duration::from_millis(50));
        }
        output
    }

    fn read_window(&mut self, window: Duration) -> String {
        let mut buffer = String::new();
        let deadline = Instant::now() + window;
        while Instant::now() < deadline {
            let chunk = self.read_chunk();
            if chunk.is_empty() {
                std::thread::sleep(Duration::from_millis(100));
            } else {
                buffer.push_str(&chunk);
            }
        }
        buffer
    }

    fn send_line(&mut self, line: &str) -> Result<(), SshError> {
        let channel = self.channel.as_mut().ok_or(SshError::NotConnected)?;
        channel.write_all(line.as_bytes())?;
        channel.write_all(b"\n")?;
        channel.flush()?;
        Ok(())
    }

    // ── Prompt handling ───────────────────────────────────────────────────────

    /// Auto-detect the command prompt.
    ///
    /// Sends newlines and scans the quiescent output. Falls back to `"#"`
    /// once the retry budget is exhausted; a wrong expect token degrades to
    /// timeout-bounded reads rather than a hard failure.
    pub fn find_prompt(&mut self, attempts: u32, window: Duration) -> Result<String, SshError> {
        debug!("detecting command prompt");
        self.drain();

        self.send_line("")?;
        std::thread::sleep(Duration::from_secs(1));
        let buffer = self.read_window(Duration::from_secs(2));
        if let Some(prompt) = extract_prompt(&buffer) {
            debug!(prompt = %prompt, "prompt detected");
            self.detected_prompt = Some(prompt.clone());
            return Ok(prompt);
        }

        for attempt in 1..=attempts {
            debug!(attempt, attempts, "prompt detection retry");
            self.send_line("")?;
            let buffer = self.read_window(window);
            if let Some(prompt) = extract_prompt(&buffer) {
                debug!(prompt = %prompt, "prompt detected");
                self.detected_prompt = Some(prompt.clone());
                return Ok(prompt);
            }
        }

        warn!("could not detect prompt, using default '#'");
        self.detected_prompt = Some("#".to_string());
        Ok("#".to_string())
    }

    /// Set the expect token used to recognize command completion.
    pub fn set_expect_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        debug!(prompt = %prompt, "expect prompt set");
        self.expect_prompt = Some(prompt);
    }

    pub fn detected_prompt(&self) -> Option<&str> {
        self.detected_prompt.as_deref()
    }

    /// Device hostname extracted from the detected prompt.
    pub fn hostname(&self) -> Option<String> {
        self.detected_prompt
            .as_deref()
            .and_then(hostname_from_prompt)
    }

    // ── Pagination ────────────────────────────────────────────────────────────

    /// Fire the pagination shotgun, discarding every response.
    pub fn disable_pagination_shotgun(&mut self) -> Result<(), SshError> {
        debug!("disabling pagination (shotgun)");
        for cmd in PAGINATION_SHOTGUN {
            self.send_line(cmd)?;
            std::thread::sleep(Duration::from_millis(300));
            self.drain();
        }
        std::thread::sleep(Duration::from_millis(500));
        self.drain();
        Ok(())
    }

    // ── Command execution ─────────────────────────────────────────────────────

    /// Execute one or more comma-separated commands and return the combined
    /// ANSI-filtered output.
    ///
    /// Each command waits for the expect prompt (or the timeout; a timeout
    /// returns whatever accumulated and leaves the session usable).
    pub fn execute(&mut self, command: &str) -> Result<String, SshError> {
        if self.channel.is_none() {
            return Err(SshError::NotConnected);
        }

        let commands: Vec<&str> = command
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        let mut output = String::new();
        for cmd in commands {
            if cmd == "\\n" || cmd == "\n" {
                self.send_line("")?;
                std::thread::sleep(Duration::from_millis(100));
                continue;
            }

            debug!(command = cmd, "sending");
            self.send_line(cmd)?;
            output.push_str(&self.wait_for_prompt(self.config.expect_prompt_timeout));
            std::thread::sleep(self.config.inter_command_delay);
        }

        Ok(output)
    }

    /// Accumulate output until the expect prompt appears or the timeout
    /// lapses. Without a known prompt, falls back to a fixed read window.
    fn wait_for_prompt(&mut self, timeout: Duration) -> String {
        let prompt = self
            .expect_prompt
            .clone()
            .or_else(|| self.detected_prompt.clone());

        let Some(prompt) = prompt else {
            std::thread::sleep(self.config.shell_timeout);
            return self.drain();
        };

        let mut output = String::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let chunk = self.read_chunk();
            if !chunk.is_empty() {
                output.push_str(&chunk);
                if output.contains(&prompt) {
                    return output;
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        warn!(timeout_ms = timeout.as_millis() as u64, "timeout waiting for prompt");
        output
    }
}

impl Drop for SshClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}
