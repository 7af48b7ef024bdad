//! Simple IRC client example
//!
//! Connects to a public network, joins a channel once the MOTD ends,
//! and answers a greeting command. PING, CTCP replies, and nickname
//! collisions are handled by the built-in handlers.

use slirc_session::{codes, default_tls_config, Client, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::new("slirc_example", "slirc");
    config.version = "slirc-session example".to_string();
    config.tls = Some(default_tls_config());

    let client = Client::new(config);

    client.register(codes::RPL_ENDOFMOTD, |_event, session| async move {
        println!("✓ Registered, joining #slirc-example");
        session.join(&["#slirc-example"]).await
    });

    client.register(codes::PRIVMSG, |event, session| async move {
        println!("← {}", event.raw);
        if event.message.as_deref() == Some("!hello") {
            if let Some(target) = event.args.first() {
                return session.privmsg(target, "hello yourself").await;
            }
        }
        Ok(())
    });

    client.set_fallback(|event, _session| async move {
        println!("← {}", event.raw);
        Ok(())
    });

    println!("Connecting to irc.libera.chat:6697 ...");
    client.connect("irc.libera.chat:6697").await?;

    // Blocks until the session dies.
    match client.serve().await {
        Ok(()) => println!("Session closed cleanly"),
        Err(error) => println!("Session ended: {error}"),
    }
    Ok(())
}
