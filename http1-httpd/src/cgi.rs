//! Runs script-aliased resources as CGI/1.1 children and streams their
//! output back to the client.

use std::{
    env,
    io::{self, Write},
    net::IpAddr,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Mutex, MutexGuard, PoisonError,
    },
    thread,
    time::Duration,
};

use http1_wire::{
    request::Request,
    response::{ResponseWriter, Status},
};

pub const GATEWAY_INTERFACE: &str = "CGI/1.1";
pub const SERVER_PROTOCOL: &str = "HTTP/1.1";

const REAP_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, thiserror::Error)]
pub enum CgiError {
    #[error("failed to spawn {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to relay output of {path}: {source}")]
    Relay {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} killed after running for {timeout:?}")]
    TimedOut { path: PathBuf, timeout: Duration },
}

/// Everything a child needs to know about the transaction besides the
/// request itself.
#[derive(Debug, Clone)]
pub struct CgiContext<'a> {
    pub server_software: &'a str,
    pub remote_addr: Option<IpAddr>,
}

/// The environment handed to a CGI child. Nothing from the server's own
/// environment leaks through except `PATH`.
pub fn environment(request: &Request, context: &CgiContext<'_>) -> Vec<(String, String)> {
    let mut vars = vec![
        ("GATEWAY_INTERFACE".to_owned(), GATEWAY_INTERFACE.to_owned()),
        ("SERVER_PROTOCOL".to_owned(), SERVER_PROTOCOL.to_owned()),
        ("SERVER_SOFTWARE".to_owned(), context.server_software.to_owned()),
        ("REQUEST_METHOD".to_owned(), request.method().to_string()),
        (
            "QUERY_STRING".to_owned(),
            request.query().unwrap_or_default().to_owned(),
        ),
        ("SCRIPT_NAME".to_owned(), request.path().to_owned()),
    ];
    if let Some(addr) = context.remote_addr {
        vars.push(("REMOTE_ADDR".to_owned(), addr.to_string()));
    }
    if let Some(body) = request.body() {
        vars.push(("CONTENT_LENGTH".to_owned(), body.len().to_string()));
    }
    if let Ok(path) = env::var("PATH") {
        vars.push(("PATH".to_owned(), path));
    }

    let mut headers: Vec<_> = request.headers().iter().collect();
    headers.sort_by_key(|(field, _)| field.as_str());
    for (field, value) in headers {
        vars.push((field.cgi_variable(), value.clone()));
    }

    vars
}

//
//
//
pub struct CgiGateway<'a> {
    writer: &'a ResponseWriter,
    timeout: Duration,
}

impl<'a> CgiGateway<'a> {
    pub fn new(writer: &'a ResponseWriter, timeout: Duration) -> Self {
        Self { writer, timeout }
    }

    /// Spawns `script`, writes the response prologue and relays the child's
    /// stdout to `w` until it exits.
    ///
    /// Nothing has been written to `w` when this fails with
    /// [`CgiError::Spawn`]. Any other error may come after the prologue.
    pub fn run<W: Write>(
        &self,
        script: &Path,
        request: &Request,
        context: &CgiContext<'_>,
        w: &mut W,
    ) -> Result<(), CgiError> {
        let mut child = Command::new(script)
            .env_clear()
            .envs(environment(request, context))
            .stdin(if request.body().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| CgiError::Spawn {
                path: script.to_owned(),
                source,
            })?;
        tracing::debug!(script = %script.display(), pid = child.id(), "spawned CGI child");

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let child = Mutex::new(child);
        let timed_out = AtomicBool::new(false);
        let (done_tx, done_rx) = mpsc::channel::<()>();

        // the watchdog stays armed until the child is reaped
        let (relayed, status) = thread::scope(|scope| {
            let feeder = match (stdin, request.body()) {
                (Some(mut stdin), Some(body)) => Some(scope.spawn(move || {
                    if let Err(err) = stdin.write_all(body) {
                        tracing::debug!(%err, "CGI child stopped reading its input");
                    }
                })),
                _ => None,
            };

            let (child, timed_out, timeout) = (&child, &timed_out, self.timeout);
            scope.spawn(move || {
                if let Err(mpsc::RecvTimeoutError::Timeout) = done_rx.recv_timeout(timeout) {
                    timed_out.store(true, Ordering::SeqCst);
                    kill(child);
                }
            });

            let relayed = self.relay(stdout, w);
            if relayed.is_err() {
                kill(child);
            }
            if let Some(feeder) = feeder {
                if feeder.join().is_err() {
                    tracing::debug!("CGI input feeder panicked");
                }
            }
            let status = reap(child);
            drop(done_tx);
            (relayed, status)
        });

        if timed_out.load(Ordering::SeqCst) {
            return Err(CgiError::TimedOut {
                path: script.to_owned(),
                timeout: self.timeout,
            });
        }
        relayed.map_err(|source| CgiError::Relay {
            path: script.to_owned(),
            source,
        })?;
        match status {
            Ok(status) if !status.success() => {
                tracing::debug!(script = %script.display(), %status, "CGI child exited unsuccessfully")
            }
            Ok(_) => {}
            Err(err) => tracing::debug!(script = %script.display(), %err, "failed to reap CGI child"),
        }

        Ok(())
    }

    fn relay<R: io::Read, W: Write>(&self, stdout: Option<R>, w: &mut W) -> io::Result<()> {
        self.writer.write_cgi_prologue(Status::Ok, w)?;
        if let Some(mut stdout) = stdout {
            io::copy(&mut stdout, w)?;
        }
        w.flush()
    }
}

fn lock(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

// Polls so the lock is never held across a blocking wait the watchdog
// would need to interrupt.
fn reap(child: &Mutex<Child>) -> io::Result<ExitStatus> {
    loop {
        if let Some(status) = lock(child).try_wait()? {
            return Ok(status);
        }
        thread::sleep(REAP_INTERVAL);
    }
}

fn kill(child: &Mutex<Child>) {
    if let Err(err) = lock(child).kill() {
        tracing::debug!(%err, "failed to kill CGI child");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    use http1_wire::{header_table::HeaderField, http::Method};

    #[test]
    fn test_environment() {
        let mut request = Request::new();
        request.set_method(Method::POST);
        request.set_target("/cgi-bin/echo.cgi?name=value&x=1");
        request.set_version("HTTP/1.1");
        request.set_header(HeaderField::UserAgent, "curl/8.0");
        request.set_header(HeaderField::ContentType, "text/plain");
        request.set_body(b"hello".to_vec());

        let context = CgiContext {
            server_software: "http1-httpd",
            remote_addr: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        };
        let vars = environment(&request, &context);
        let get = |name: &str| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("GATEWAY_INTERFACE"), Some("CGI/1.1"));
        assert_eq!(get("SERVER_PROTOCOL"), Some("HTTP/1.1"));
        assert_eq!(get("SERVER_SOFTWARE"), Some("http1-httpd"));
        assert_eq!(get("REQUEST_METHOD"), Some("POST"));
        assert_eq!(get("QUERY_STRING"), Some("name=value&x=1"));
        assert_eq!(get("SCRIPT_NAME"), Some("/cgi-bin/echo.cgi"));
        assert_eq!(get("REMOTE_ADDR"), Some("127.0.0.1"));
        assert_eq!(get("CONTENT_LENGTH"), Some("5"));
        assert_eq!(get("HTTP_USER_AGENT"), Some("curl/8.0"));
        assert_eq!(get("HTTP_CONTENT_TYPE"), Some("text/plain"));
        assert_eq!(get("PATH_INFO"), None);
    }

    #[test]
    fn test_environment_without_body_or_query() {
        let mut request = Request::new();
        request.set_target("/cgi-bin/env.cgi");

        let context = CgiContext {
            server_software: "http1-httpd",
            remote_addr: None,
        };
        let vars = environment(&request, &context);
        assert!(vars.iter().any(|(k, v)| k == "QUERY_STRING" && v.is_empty()));
        assert!(!vars.iter().any(|(k, _)| k == "CONTENT_LENGTH" || k == "REMOTE_ADDR"));
    }
}
