//! RespHub demo server
//!
//! Serves a tiny in-memory key-value store over RESP, which is enough to poke
//! at the framing layer with `redis-cli` or `redis-benchmark`.

use bytes::Bytes;
use clap::Parser;
use parking_lot::RwLock;
use resphub::protocol::{
    append_bulk, append_error, append_integer, append_null, append_ok, append_simple_string,
    Command,
};
use resphub::{listen_and_serve, Action, Conn, Handler, Options};
use std::collections::HashMap;
use std::io;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Parser)]
#[command(name = "resphub", version = resphub::VERSION, about = "RESP demo server")]
struct Config {
    /// Host to bind to
    #[arg(long, default_value = resphub::DEFAULT_HOST)]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = resphub::DEFAULT_PORT)]
    port: u16,

    /// Run connections on a multi-threaded runtime
    #[arg(long)]
    multicore: bool,

    /// Worker threads with --multicore (0 = one per CPU)
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

impl Config {
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn options(&self) -> Options {
        Options::new()
            .multicore(self.multicore)
            .num_event_loop(self.threads)
    }
}

/// The demo store: one map behind one lock.
#[derive(Default)]
struct MemoryKv {
    data: RwLock<HashMap<Bytes, Bytes>>,
}

impl MemoryKv {
    fn wrong_args(out: &mut Vec<u8>, cmd: &Command) {
        let name = String::from_utf8_lossy(cmd.name()).to_lowercase();
        append_error(
            out,
            &format!("ERR wrong number of arguments for '{}' command", name),
        );
    }
}

impl Handler for MemoryKv {
    fn handle(&self, cmd: Command, mut out: Vec<u8>) -> (Vec<u8>, Action) {
        let params = cmd.params();
        let name = String::from_utf8_lossy(cmd.name()).to_ascii_uppercase();

        match (name.as_str(), params) {
            ("PING", []) => append_simple_string(&mut out, "PONG"),
            ("PING", [msg]) | ("ECHO", [msg]) => append_bulk(&mut out, msg),
            ("SET", [key, value]) => {
                self.data.write().insert(key.clone(), value.clone());
                append_ok(&mut out);
            }
            ("GET", [key]) => match self.data.read().get(key) {
                Some(value) => append_bulk(&mut out, value),
                None => append_null(&mut out),
            },
            ("DEL", keys) if !keys.is_empty() => {
                let mut data = self.data.write();
                let removed = keys.iter().filter(|k| data.remove(*k).is_some()).count();
                append_integer(&mut out, removed as i64);
            }
            ("DBSIZE", []) => append_integer(&mut out, self.data.read().len() as i64),
            ("QUIT", []) => {
                append_ok(&mut out);
                return (out, Action::Close);
            }
            ("SHUTDOWN", _) => return (out, Action::Shutdown),
            ("PING" | "ECHO" | "SET" | "GET" | "DEL" | "DBSIZE" | "QUIT", _) => {
                Self::wrong_args(&mut out, &cmd)
            }
            _ => append_error(
                &mut out,
                &format!(
                    "ERR unknown command '{}'",
                    String::from_utf8_lossy(cmd.name())
                ),
            ),
        }

        (out, Action::None)
    }

    fn on_opened(&self, conn: &Conn) -> (Vec<u8>, Action) {
        debug!(conn = %conn.id(), peer = %conn.peer_addr(), "Client connected");
        (Vec::new(), Action::None)
    }

    fn on_closed(&self, conn: &Conn, err: Option<&io::Error>) -> Action {
        match err {
            Some(e) => debug!(conn = %conn.id(), error = %e, "Client disconnected"),
            None => debug!(conn = %conn.id(), "Client disconnected"),
        }
        Action::None
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    println!(
        "RespHub v{} - RESP demo server on {}\nUse Ctrl+C to shutdown gracefully.",
        resphub::VERSION,
        config.bind_address()
    );

    let options = config.options();
    info!(?options, "Configuration loaded");

    listen_and_serve(&config.bind_address(), options, MemoryKv::default())?;
    Ok(())
}
