use std::{
    io::{self, BufReader, Read},
    net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    panic::{self, AssertUnwindSafe},
    sync::{mpsc, Arc, Mutex, PoisonError},
    thread,
    time::Duration,
};

use crate::dispatcher::Dispatcher;

const DRAIN_LIMIT: u64 = 64 * 1024;
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Accept loop feeding a fixed pool of worker threads. Each worker serves
/// one connection at a time and closes it after a single transaction.
pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    pub fn bind(addr: impl ToSocketAddrs, dispatcher: Dispatcher) -> io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr)?,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until the listener fails irrecoverably.
    pub fn run(self) -> io::Result<()> {
        let config = self.dispatcher.config();
        let (workers, timeout) = (config.workers.max(1), config.request_timeout);

        let (tx, rx) = mpsc::sync_channel::<TcpStream>(workers);
        let rx = Arc::new(Mutex::new(rx));
        for id in 0..workers {
            let rx = Arc::clone(&rx);
            let dispatcher = Arc::clone(&self.dispatcher);
            thread::Builder::new()
                .name(format!("http1-worker-{id}"))
                .spawn(move || worker(&rx, &dispatcher, timeout))?;
        }

        tracing::info!(addr = %self.local_addr()?, workers, "listening");
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => tx
                    .send(stream)
                    .map_err(|_| io::Error::other("every worker has exited"))?,
                Err(err) => tracing::warn!(%err, "failed to accept connection"),
            }
        }

        Ok(())
    }
}

fn worker(rx: &Mutex<mpsc::Receiver<TcpStream>>, dispatcher: &Dispatcher, timeout: Duration) {
    loop {
        let stream = {
            let rx = rx.lock().unwrap_or_else(PoisonError::into_inner);
            match rx.recv() {
                Ok(stream) => stream,
                Err(_) => return,
            }
        };

        let served = panic::catch_unwind(AssertUnwindSafe(|| {
            handle_connection(dispatcher, &stream, timeout)
        }));
        match served {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::debug!(%err, "connection setup failed"),
            Err(_) => tracing::error!("worker panicked while serving a connection"),
        }
        close(&stream, timeout);
    }
}

/// Serves a single transaction on `stream` with read and write deadlines set.
pub fn handle_connection(
    dispatcher: &Dispatcher,
    stream: &TcpStream,
    timeout: Duration,
) -> io::Result<()> {
    let peer = stream.peer_addr().ok().map(|addr| addr.ip());
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;

    let mut reader = BufReader::new(stream);
    let mut writer = stream;
    dispatcher.serve(&mut reader, &mut writer, peer);

    Ok(())
}

// Closing with unread request bytes still queued makes the kernel send a
// reset, which can discard a response the client has not read yet. Only the
// write half is shut down, then a bounded amount of input is discarded.
fn close(stream: &TcpStream, timeout: Duration) {
    if let Err(err) = stream.shutdown(Shutdown::Write) {
        tracing::debug!(%err, "failed to shut down connection");
        return;
    }
    let _ = stream.set_read_timeout(Some(timeout.min(DRAIN_TIMEOUT)));
    let _ = io::copy(&mut Read::take(stream, DRAIN_LIMIT), &mut io::sink());
}
