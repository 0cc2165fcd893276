//! Minimal RESP server standing in for Redis

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

type Command = Vec<Vec<u8>>;

#[derive(Clone)]
pub struct MockRedis {
    pub addr: SocketAddr,
    password: Option<String>,
    commands: Arc<Mutex<Vec<Command>>>,
    connections: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl MockRedis {
    /// Start a mock server on a random port
    pub async fn start(password: Option<&str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock redis");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let server = Self {
            addr,
            password: password.map(str::to_string),
            commands: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(AtomicUsize::new(0)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        };

        let accept_server = server.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                accept_server.connections.fetch_add(1, Ordering::SeqCst);

                let conn_server = accept_server.clone();
                tokio::spawn(async move {
                    let _ = conn_server.serve(stream).await;
                });
            }
        });

        server
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Arguments of every command named `name`, command name excluded
    pub fn commands_named(&self, name: &str) -> Vec<Vec<Vec<u8>>> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| cmd.first().is_some_and(|n| n.eq_ignore_ascii_case(name.as_bytes())))
            .map(|cmd| cmd[1..].to_vec())
            .collect()
    }

    async fn serve(&self, stream: TcpStream) -> std::io::Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut authenticated = self.password.is_none();

        while let Some(command) = read_command(&mut reader).await? {
            let name = String::from_utf8_lossy(&command[0]).to_uppercase();
            let reply: Vec<u8> = match name.as_str() {
                "AUTH" => {
                    let given = command.last().map(|p| String::from_utf8_lossy(p).to_string());
                    match &self.password {
                        None => b"-ERR AUTH called without any password configured\r\n".to_vec(),
                        Some(expected) if given.as_deref() == Some(expected.as_str()) => {
                            authenticated = true;
                            b"+OK\r\n".to_vec()
                        }
                        Some(_) => b"-WRONGPASS invalid username-password pair\r\n".to_vec(),
                    }
                }
                _ if !authenticated => b"-NOAUTH Authentication required.\r\n".to_vec(),
                "PING" => b"+PONG\r\n".to_vec(),
                "RPUSH" if self.fail_writes.load(Ordering::SeqCst) => {
                    b"-ERR simulated write failure\r\n".to_vec()
                }
                "RPUSH" => {
                    let count = self.commands_named("RPUSH").len() + 1;
                    format!(":{}\r\n", count).into_bytes()
                }
                "PUBLISH" => b":0\r\n".to_vec(),
                _ => b"+OK\r\n".to_vec(),
            };

            // recorded only once the reply is decided, so waiters never race it
            self.commands.lock().unwrap().push(command);
            write_half.write_all(&reply).await?;
        }

        Ok(())
    }
}

async fn read_command<R>(reader: &mut BufReader<R>) -> std::io::Result<Option<Command>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut header = String::new();
    if reader.read_line(&mut header).await? == 0 {
        return Ok(None);
    }

    let count: usize = header
        .trim_end()
        .strip_prefix('*')
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| std::io::Error::other(format!("unexpected header {:?}", header)))?;

    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let mut len_line = String::new();
        reader.read_line(&mut len_line).await?;
        let len: usize = len_line
            .trim_end()
            .strip_prefix('$')
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| std::io::Error::other(format!("unexpected bulk {:?}", len_line)))?;

        let mut arg = vec![0u8; len + 2];
        reader.read_exact(&mut arg).await?;
        arg.truncate(len);
        args.push(arg);
    }

    Ok(Some(args))
}
