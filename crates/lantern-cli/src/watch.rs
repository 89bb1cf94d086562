//! Terminal subscriber for a running server's `/events` stream — a
//! stand-in for the exhibition renderer.

use anyhow::{Context, Result};
use eventsource_stream::Eventsource;
use futures_util::StreamExt;

use lantern_engine::EngineEvent;

pub async fn run(url: &str) -> Result<()> {
    let endpoint = format!("{}/events", url.trim_end_matches('/'));
    let response = reqwest::get(&endpoint)
        .await
        .with_context(|| format!("failed to connect to {endpoint}"))?;
    if !response.status().is_success() {
        anyhow::bail!("server returned {}", response.status());
    }
    println!("watching {endpoint}");

    let mut stream = response.bytes_stream().eventsource();
    while let Some(event) = stream.next().await {
        let event = event.context("event stream error")?;
        match serde_json::from_str::<EngineEvent>(&event.data) {
            Ok(parsed) => print_event(&parsed),
            Err(e) => tracing::warn!(kind = event.event, "unparseable event: {e}"),
        }
    }

    println!("stream closed");
    Ok(())
}

fn print_event(event: &EngineEvent) {
    let stamp = chrono::Local::now().format("%H:%M:%S");
    match event {
        EngineEvent::ClusterChanged { cluster: None } => {
            println!("[{stamp}] cluster: (store is empty)");
        }
        EngineEvent::ClusterChanged {
            cluster: Some(cluster),
        } => {
            println!(
                "[{stamp}] cluster #{}: focus {} -> next {} ({} related)",
                cluster.total_shown,
                cluster.focus.id,
                cluster.next.id,
                cluster.related.len(),
            );
            println!("           \"{}\"", excerpt(&cluster.focus.content));
        }
        EngineEvent::WorkingSetChanged { removed, added } => {
            println!(
                "[{stamp}] working set: +{} -{}",
                added.len(),
                removed.len(),
            );
        }
    }
}

fn excerpt(content: &str) -> String {
    const MAX_CHARS: usize = 60;
    if content.chars().count() <= MAX_CHARS {
        return content.to_string();
    }
    let cut: String = content.chars().take(MAX_CHARS).collect();
    format!("{cut}...")
}
