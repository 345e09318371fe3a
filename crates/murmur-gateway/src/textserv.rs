//! Interactive text server — line-framed TCP chat for local operators.
//!
//! Each connection is its own room on the `text` platform; every line runs
//! through the full orchestrator pipeline. `.quit` or `\q` disconnects.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

use murmur_core::Platform;
use murmur_extensions::{Extension, MessageHandler};

use crate::app::AppState;

const PROMPT: &str = "~ user:";
const QUIT_TOKENS: [&str; 2] = [".quit", "\\q"];

/// Accept loop. Runs until the process exits.
pub async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        state.config.text_server.bind, state.config.text_server.port
    )
    .parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "text server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(state, stream, peer).await {
                warn!(%peer, error = %e, "text connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    state: Arc<AppState>,
    stream: TcpStream,
    peer: SocketAddr,
) -> anyhow::Result<()> {
    debug!(%peer, "user connected to text server");
    let mut framed = Framed::new(stream, LinesCodec::new());

    // One room per connection; peers are anonymous operators.
    let room_id = format!("text:{peer}");
    let sender = format!("operator@{}", peer.ip());
    let platform = Platform::text();

    loop {
        framed.send(PROMPT.to_string()).await?;

        let Some(line) = framed.next().await else {
            debug!(%peer, "text connection closed by peer");
            break;
        };
        let line = line?;
        let message = line.trim();

        if message.is_empty() {
            continue;
        }
        if QUIT_TOKENS.contains(&message) {
            debug!(%peer, "user closed text connection");
            break;
        }

        // Route by message type, like every adapter: the registry decides
        // which handler owns "text" on this platform.
        let handler = state.registry.message_handlers().iter().find(|h| {
            h.platform_supported(&platform) && h.message_types().iter().any(|t| t == "text")
        });
        let Some(handler) = handler else {
            warn!("no text message handler registered");
            framed
                .send("~ murmur: no handler configured for text messages".to_string())
                .await?;
            continue;
        };

        match handler
            .handle(&platform, &room_id, &sender, message, None)
            .await
        {
            // None is an explicit no-reply.
            Ok(None) => {}
            Ok(Some(replies)) => {
                for reply in replies.iter().filter(|r| r.is_text()) {
                    framed.send(format!("~ murmur: {}", reply.content)).await?;
                }
            }
            Err(e) => {
                warn!(%peer, error = %e, "pipeline turn failed");
                framed
                    .send("~ murmur: something went wrong, try again".to_string())
                    .await?;
            }
        }
    }

    Ok(())
}
