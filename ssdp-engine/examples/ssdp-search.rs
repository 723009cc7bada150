use ssdp_engine::*;
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!(
        "ssdp-search from {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let s = AsyncService::new(|_, _| true)?;
    let mut stream = s.subscribe();

    // Search three times, a second apart
    s.schedule(
        MessageSpec::search(SearchTarget::All, Owner(0), multicast_dest())
            .with_repeat(2),
        0,
    );

    let mut map = HashMap::new();
    let deadline = tokio::time::sleep(Duration::from_secs(15));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            m = stream.next() => {
                let Some(m) = m else { break };
                let Some(usn) = m.get("USN") else { continue };
                let alive = match m.message_type {
                    Some(MessageType::Response) => true,
                    Some(MessageType::Notify) => {
                        m.notify_subtype() != Some(NotifySubtype::ByeBye)
                    }
                    _ => continue,
                };
                let target = m.get("ST").or_else(|| m.get("NT")).unwrap_or("");
                let location = m.get("LOCATION").unwrap_or("");
                if alive && !map.contains_key(usn) {
                    println!("+ {target}");
                    println!("  {usn} at {location}");
                    map.insert(usn.to_string(), location.to_string());
                } else if !alive && map.remove(usn).is_some() {
                    println!("- {target}");
                    println!("  {usn}");
                }
            },
            () = &mut deadline => break,
        }
    }

    println!("{} resources found", map.len());
    Ok(())
}
