use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use token_poker_client::command::{self, Command, HELP};
use token_poker_client::session::{Backoff, Session};
use token_poker_client::view;
use token_poker_core::{ClientMessage, ServerMessage};

const DEFAULT_URL: &str = "ws://127.0.0.1:25917/ws";

type WsWrite = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

enum Flow {
    Exit,
    Disconnected,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (Some(room), Some(name)) = (args.first(), args.get(1)) else {
        eprintln!("usage: token_poker_client <room> <name> [url]");
        std::process::exit(2);
    };
    let url = Url::parse(args.get(2).map_or(DEFAULT_URL, String::as_str))?;

    let mut rng = rand::rng();
    let mut session = Session::new(room.clone());
    let mut backoff = Backoff::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- token poker: room {} as {name} ---", session.room());
    println!("{HELP}");

    loop {
        match run_connection(&url, name, &mut session, &mut stdin, &mut rng, &mut backoff).await {
            Ok(Flow::Exit) => break,
            Ok(Flow::Disconnected) => warn!("connection closed"),
            Err(e) => warn!("connection failed: {}", e),
        }
        let delay = backoff.next_delay(&mut rng);
        info!("backing off for {:?}", delay);
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

async fn send(write: &mut WsWrite, msg: &ClientMessage) -> Result<(), Box<dyn Error>> {
    let payload = serde_json::to_string(msg)?;
    write.send(Message::Text(payload.into())).await?;
    Ok(())
}

/// Serves one connection until it drops or the user quits.
async fn run_connection<R: Rng + ?Sized>(
    url: &Url,
    name: &str,
    session: &mut Session,
    stdin: &mut Lines<BufReader<Stdin>>,
    rng: &mut R,
    backoff: &mut Backoff,
) -> Result<Flow, Box<dyn Error>> {
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    info!(%url, "connected");
    backoff.reset();
    session.reconnected();

    let (mut write, mut read) = ws_stream.split();
    send(&mut write, &session.poll()).await?;

    loop {
        tokio::select! {
            frame = read.next() => {
                let Some(frame) = frame else { return Ok(Flow::Disconnected) };
                let text = match frame? {
                    Message::Text(text) => text,
                    Message::Close(_) => return Ok(Flow::Disconnected),
                    _ => continue,
                };
                let msg = match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("failed to parse server message: {}", e);
                        continue;
                    }
                };
                let fresh = matches!(msg, ServerMessage::Snapshot { .. });
                match session.on_message(msg, rng) {
                    Ok(replies) => {
                        for reply in &replies {
                            send(&mut write, reply).await?;
                        }
                    }
                    Err(e) => {
                        warn!("intent dropped: {}", e);
                        send(&mut write, &session.poll()).await?;
                    }
                }
                if fresh {
                    if let Some(state) = session.state() {
                        println!("\n{}", view::render(state, name));
                    }
                }
            }
            line = stdin.next_line() => {
                let Some(line) = line? else { return Ok(Flow::Exit) };
                match command::parse(&line, name, session.state()) {
                    Ok(Command::Exit) => return Ok(Flow::Exit),
                    Ok(Command::Help) => println!("{HELP}"),
                    Ok(Command::Show) => match session.state() {
                        Some(state) => println!("{}", view::render(state, name)),
                        None => println!("waiting for the first snapshot"),
                    },
                    Ok(Command::Intent(intent)) => match session.submit(intent, rng) {
                        Ok(Some(commit)) => send(&mut write, &commit).await?,
                        Ok(None) if session.state().is_some() => println!("nothing to do"),
                        Ok(None) => println!("queued until the room is loaded"),
                        Err(e) => warn!("intent dropped: {}", e),
                    },
                    Err(e) => println!("{e}"),
                }
            }
        }
    }
}
