use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::browser::browser::{Browser, ElementState};
use crate::error::{FormError, FormResult};
use crate::locator::locator_model::ClickStrategy;

/// Request sent to the driver over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
    },
    Page {
        cmd: &'static str,
    },
    Evaluate {
        cmd: &'static str,
        script: String,
    },
    Element {
        cmd: &'static str,
        xpath: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        strategy: Option<ClickStrategy>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str) -> Self {
        BrowserRequest::Navigate { cmd: "navigate", url: url.to_string() }
    }

    pub fn page(cmd: &'static str) -> Self {
        BrowserRequest::Page { cmd }
    }

    pub fn evaluate(script: &str) -> Self {
        BrowserRequest::Evaluate { cmd: "evaluate", script: script.to_string() }
    }

    pub fn element(cmd: &'static str, xpath: &str) -> Self {
        BrowserRequest::Element { cmd, xpath: xpath.to_string(), strategy: None, value: None }
    }

    pub fn click(xpath: &str, strategy: ClickStrategy) -> Self {
        BrowserRequest::Element { cmd: "click", xpath: xpath.to_string(), strategy: Some(strategy), value: None }
    }

    pub fn with_value(cmd: &'static str, xpath: &str, value: &str) -> Self {
        BrowserRequest::Element { cmd, xpath: xpath.to_string(), strategy: None, value: Some(value.to_string()) }
    }
}

/// Response received from the driver over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub checked: Option<bool>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// How the driver process is started.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub command: String,
    pub script: String,
    pub headless: bool,
    /// Longest wait for any single response.
    pub timeout: Duration,
    /// Longest wait for the ready line after spawning.
    pub launch_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            script: "driver/browser_server.js".to_string(),
            headless: true,
            timeout: Duration::from_secs(10),
            launch_timeout: Duration::from_secs(60),
        }
    }
}

/// Lines from the driver's stdout, read on a helper thread so every wait can
/// be bounded. An empty line means the stream closed.
fn spawn_reader(stdout: ChildStdout) -> Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    let _ = tx.send(Ok(String::new()));
                    break;
                }
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    rx
}

/// A persistent browser session backed by a driver subprocess.
///
/// The driver keeps one browser page open. Commands are sent as NDJSON over
/// stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<std::io::Result<String>>,
    timeout: Duration,
    closed: bool,
}

impl BrowserSession {
    /// Spawn the driver and wait for its ready signal.
    pub fn launch(options: &SessionOptions) -> FormResult<Self> {
        let mut command = Command::new(&options.command);
        command.arg(&options.script);
        if options.headless {
            command.arg("--headless");
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| FormError::SubprocessSpawn { script: options.script.clone(), source: e })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FormError::SessionIO(format!("Failed to capture stdin of {}", options.script)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FormError::SessionIO(format!("Failed to capture stdout of {}", options.script)))?;

        let mut session =
            BrowserSession { child, stdin, lines: spawn_reader(stdout), timeout: options.timeout, closed: false };

        let line = session.read_line(options.launch_timeout)?;
        let response: BrowserResponse = serde_json::from_str(line.trim())
            .map_err(|e| FormError::JsonParse { context: "driver ready signal".into(), source: e })?;
        if !response.ok || response.ready != Some(true) {
            return Err(FormError::SessionProtocol {
                command: "launch".into(),
                error: "Did not receive ready signal from driver".into(),
            });
        }
        info!(script = %options.script, "browser session ready");
        Ok(session)
    }

    fn read_line(&mut self, timeout: Duration) -> FormResult<String> {
        let line = match self.lines.recv_timeout(timeout) {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => return Err(FormError::SessionIO(format!("Failed to read from driver stdout: {}", e))),
            Err(RecvTimeoutError::Timeout) => {
                return Err(FormError::SessionIO(format!("No response from driver within {:?}", timeout)));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(FormError::SessionIO("Driver output closed".into()));
            }
        };
        if line.trim().is_empty() {
            return Err(FormError::SessionIO("Empty response from driver (process may have died)".into()));
        }
        Ok(line)
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest) -> FormResult<BrowserResponse> {
        let json = serde_json::to_string(request)
            .map_err(|e| FormError::JsonSerialize { context: "BrowserRequest".into(), source: e })?;

        writeln!(self.stdin, "{}", json)
            .map_err(|e| FormError::SessionIO(format!("Failed to write to driver stdin: {}", e)))?;
        self.stdin
            .flush()
            .map_err(|e| FormError::SessionIO(format!("Failed to flush driver stdin: {}", e)))?;

        let line = self.read_line(self.timeout)?;
        serde_json::from_str(line.trim())
            .map_err(|e| FormError::JsonParse { context: "driver response".into(), source: e })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest, command_name: &str) -> FormResult<BrowserResponse> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(FormError::SessionProtocol {
                command: command_name.into(),
                error: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        debug!(command = command_name, "driver command ok");
        Ok(response)
    }

    fn element_ok(&mut self, cmd: &'static str, xpath: &str) -> FormResult<()> {
        self.send_ok(&BrowserRequest::element(cmd, xpath), cmd).map(|_| ())
    }

    /// Quit the browser session.
    pub fn quit(&mut self) -> FormResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.send(&BrowserRequest::page("quit")) {
            warn!(error = %e, "driver did not acknowledge quit, killing it");
            let _ = self.child.kill();
        }
        self.child.wait()?;
        Ok(())
    }
}

impl Browser for BrowserSession {
    fn open(&mut self, url: &str) -> FormResult<()> {
        self.send_ok(&BrowserRequest::navigate(url), "navigate")?;
        info!(url, "page opened");
        Ok(())
    }

    fn current_url(&mut self) -> FormResult<String> {
        let response = self.send_ok(&BrowserRequest::page("current_url"), "current_url")?;
        response.url.ok_or_else(|| FormError::SessionProtocol {
            command: "current_url".into(),
            error: "No URL in current_url response".into(),
        })
    }

    fn snapshot(&mut self) -> FormResult<String> {
        let response = self.send_ok(&BrowserRequest::page("snapshot"), "snapshot")?;
        response.html.ok_or_else(|| FormError::SessionProtocol {
            command: "snapshot".into(),
            error: "No html in snapshot response".into(),
        })
    }

    fn evaluate(&mut self, script: &str) -> FormResult<Value> {
        let response = self.send_ok(&BrowserRequest::evaluate(script), "evaluate")?;
        Ok(response.data.unwrap_or(Value::Null))
    }

    fn locate(&mut self, locator: &str) -> FormResult<ElementState> {
        let response = self.send_ok(&BrowserRequest::element("locate", locator), "locate")?;
        Ok(ElementState {
            count: response.count.unwrap_or(0),
            visible: response.visible.unwrap_or(false),
            enabled: response.enabled.unwrap_or(true),
            checked: response.checked.unwrap_or(false),
            tag: response.tag,
            value: response.value,
        })
    }

    fn click(&mut self, locator: &str, strategy: ClickStrategy) -> FormResult<()> {
        self.send_ok(&BrowserRequest::click(locator, strategy), "click").map(|_| ())
    }

    fn scroll_to(&mut self, locator: &str) -> FormResult<()> {
        self.element_ok("scroll", locator)
    }

    fn select_all(&mut self, locator: &str) -> FormResult<()> {
        self.element_ok("select_all", locator)
    }

    fn clear(&mut self, locator: &str) -> FormResult<()> {
        self.element_ok("clear", locator)
    }

    fn type_text(&mut self, locator: &str, text: &str) -> FormResult<()> {
        self.send_ok(&BrowserRequest::with_value("type", locator, text), "type").map(|_| ())
    }

    fn select_option(&mut self, locator: &str, text: &str) -> FormResult<()> {
        self.send_ok(&BrowserRequest::with_value("select", locator, text), "select").map(|_| ())
    }

    fn set_files(&mut self, locator: &str, path: &str) -> FormResult<()> {
        self.send_ok(&BrowserRequest::with_value("set_files", locator, path), "set_files").map(|_| ())
    }

    fn choose_file(&mut self, locator: &str, path: &str) -> FormResult<()> {
        self.send_ok(&BrowserRequest::with_value("choose_file", locator, path), "choose_file").map(|_| ())
    }

    fn refresh(&mut self) -> FormResult<()> {
        self.send_ok(&BrowserRequest::page("refresh"), "refresh").map(|_| ())
    }

    fn blur(&mut self) -> FormResult<()> {
        self.send_ok(&BrowserRequest::page("blur"), "blur").map(|_| ())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
