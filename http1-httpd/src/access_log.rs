use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    net::IpAddr,
    path::Path,
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Local, TimeZone};

const CLF_DATE: &str = "%d/%b/%Y:%H:%M:%S %z";

/// One transaction as it appears in the access log.
#[derive(Debug, Clone, Copy)]
pub struct AccessLogEntry<'a> {
    pub host: Option<IpAddr>,
    pub user: Option<&'a str>,
    pub request_line: &'a str,
    pub status: u16,
    pub bytes: usize,
}

impl AccessLogEntry<'_> {
    /// `host ident authuser [date] "request line" status bytes`
    pub fn display_at<Tz: TimeZone>(&self, time: DateTime<Tz>) -> impl fmt::Display + '_
    where
        Tz::Offset: fmt::Display,
    {
        LogLine {
            entry: self,
            date: time.format(CLF_DATE).to_string(),
        }
    }
}

struct LogLine<'a> {
    entry: &'a AccessLogEntry<'a>,
    date: String,
}

impl fmt::Display for LogLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.entry;
        match entry.host {
            Some(host) => write!(f, "{host}")?,
            None => f.write_str("-")?,
        }
        write!(
            f,
            " - {} [{}] \"{}\" {} {}",
            entry.user.filter(|user| !user.is_empty()).unwrap_or("-"),
            self.date,
            if entry.request_line.is_empty() {
                "-"
            } else {
                entry.request_line
            },
            entry.status,
            entry.bytes,
        )
    }
}

/// Append-only log file shared by all workers. Each entry goes out in a
/// single write so lines from different workers never interleave.
#[derive(Debug)]
pub struct AccessLog {
    file: Mutex<File>,
}

impl AccessLog {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub fn append(&self, entry: &AccessLogEntry<'_>) -> io::Result<()> {
        let line = format!("{}\n", entry.display_at(Local::now()));
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        file.write_all(line.as_bytes())
    }
}
