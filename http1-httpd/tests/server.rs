use std::{
    error::Error,
    fs,
    io::{Read as _, Write as _},
    net::TcpStream,
    thread,
    time::Duration,
};

use http1_httpd::{
    config::{MimeTypes, ServerConfig},
    Dispatcher, Server,
};

#[test]
fn serves_over_tcp() -> Result<(), Box<dyn Error>> {
    let root = tempfile::tempdir()?;
    fs::write(root.path().join("index.html"), "<p>home</p>")?;

    let mut config = ServerConfig::new(root.path());
    config.workers = 2;
    config.request_timeout = Duration::from_secs(2);
    let server = Server::bind("127.0.0.1:0", Dispatcher::new(config, MimeTypes::new()))?;
    let addr = server.local_addr()?;
    thread::spawn(move || server.run());

    for _ in 0..3 {
        let mut stream = TcpStream::connect(addr)?;
        stream.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")?;
        let mut response = String::new();
        stream.read_to_string(&mut response)?;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("\r\n\r\n<p>home</p>"));
    }

    // a body the server never reads must not cost the client its response
    let mut stream = TcpStream::connect(addr)?;
    let mut request = b"GET / HTTP/1.1\r\nContent-Length: 5000\r\n\r\n".to_vec();
    request.resize(request.len() + 5000, b'x');
    stream.write_all(&request)?;
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("\r\n\r\n<p>home</p>"));

    // a client that never finishes its head is cut off by the read deadline
    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(b"GET / HTTP/1.1\r\n")?;
    let mut response = String::new();
    stream.read_to_string(&mut response)?;
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));

    Ok(())
}
