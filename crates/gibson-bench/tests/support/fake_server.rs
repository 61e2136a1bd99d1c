//! Minimal in-memory server speaking the Gibson wire protocol.
//!
//! `SET` stores, `GET` returns the value or NOT_FOUND, `PING` answers OK
//! (`PING slow` waits 500ms first). Anything else fails with REPL_ERR.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;
use gibson_bench::protocol::gibson::{self, Encoding};
use gibson_bench::protocol::{Opcode, ReplyCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Store = Arc<Mutex<HashMap<String, String>>>;

/// Serve every accepted connection against one shared store.
pub async fn accept_loop(listener: TcpListener) -> io::Result<()> {
    let store = Store::default();
    loop {
        let (socket, _) = listener.accept().await?;
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let _ = serve(socket, store).await;
        });
    }
}

async fn serve(mut socket: TcpStream, store: Store) -> io::Result<()> {
    let mut buf = BytesMut::with_capacity(4096);
    let mut out = BytesMut::with_capacity(4096);
    loop {
        while let Some((opcode, args)) = gibson::decode_request(&mut buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        {
            let args = String::from_utf8_lossy(&args).into_owned();
            answer(&mut out, opcode, &args, &store).await;
        }

        if !out.is_empty() {
            socket.write_all(&out.split()).await?;
        }
        if socket.read_buf(&mut buf).await? == 0 {
            return Ok(());
        }
    }
}

async fn answer(out: &mut BytesMut, opcode: Opcode, args: &str, store: &Store) {
    let store_ref = || store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    match opcode {
        Opcode(1) => {
            let mut parts = args.splitn(3, ' ').skip(1);
            let key = parts.next().unwrap_or_default().to_string();
            let value = parts.next().unwrap_or_default().to_string();
            gibson::encode_reply(out, ReplyCode::Value, Encoding::Plain, value.as_bytes());
            store_ref().insert(key, value);
        }
        Opcode(3) => {
            let value = store_ref().get(args).cloned();
            match value {
                Some(value) => {
                    gibson::encode_reply(out, ReplyCode::Value, Encoding::Plain, value.as_bytes())
                }
                None => gibson::encode_reply(out, ReplyCode::NotFound, Encoding::Plain, b""),
            }
        }
        Opcode(19) => {
            if args == "slow" {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            gibson::encode_reply(out, ReplyCode::Ok, Encoding::Plain, b"");
        }
        _ => gibson::encode_reply(out, ReplyCode::Error, Encoding::Plain, b""),
    }
}
