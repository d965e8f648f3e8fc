//! Демо кластерного pub/sub.
//!
//! Поднимает N локальных узлов за `SlotRouter`, подписывается на каналы,
//! публикует сообщения и печатает единый поток событий со всех узлов.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use zumic_cluster_pubsub::{
    init_logging, key_slot, logging::LogFormat, ClusterNode, ClusterPubSub, Event, LocalNode,
    PubSubSettings, SlotRouter,
};

#[derive(Parser)]
#[command(name = "zumic-pubsub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cluster pub/sub demo over in-process nodes", long_about = None)]
struct Cli {
    /// Количество локальных узлов
    #[arg(short, long, default_value_t = 3)]
    nodes: u16,
    /// Первый порт; узлы получают порты подряд
    #[arg(long, default_value_t = 7000)]
    base_port: u16,
    /// Каналы для подписки
    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "news,orders,{user42}:feed"
    )]
    channels: Vec<String>,
    /// Сообщений на канал
    #[arg(short, long, default_value_t = 2)]
    messages: usize,
    /// Таймаут ожидания события в мс (0: без ограничения)
    #[arg(long, env = "ZUMIC_PUBSUB_POLL_TIMEOUT_MS")]
    timeout_ms: Option<u64>,
    /// Файл настроек (toml/json/yaml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Формат логов: pretty, compact, json
    #[arg(long)]
    log_format: Option<LogFormat>,
    /// Включить подробный вывод (debug)
    #[arg(short, long)]
    verbose: bool,
    /// Подавить логирование (только warn/error)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        PubSubSettings::load_from(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(ms) = cli.timeout_ms {
        settings.poll_timeout_ms = ms;
    }
    if let Some(format) = cli.log_format {
        settings.log.console.format = format;
    }
    if cli.verbose {
        settings.log.level = "debug".to_string();
    } else if cli.quiet {
        settings.log.level = "warn".to_string();
    }

    let logging = init_logging(&settings.log).context("failed to initialize logging")?;

    anyhow::ensure!(cli.nodes > 0, "at least one node is required");
    let nodes: Vec<Arc<dyn ClusterNode>> = (0..cli.nodes)
        .map(|i| {
            let port = cli.base_port.saturating_add(i);
            Arc::new(LocalNode::with_capacity(
                "127.0.0.1",
                port,
                settings.broker_capacity,
            )) as Arc<dyn ClusterNode>
        })
        .collect();
    let router = SlotRouter::with_nodes(nodes);

    for channel in &cli.channels {
        let slot = key_slot(channel.as_bytes());
        let owner = router.node_for_slot(slot)?;
        println!("{channel:<20} slot {slot:>5} -> {}", owner.id());
    }

    let pubsub = ClusterPubSub::new(Arc::new(router));

    for channel in &cli.channels {
        pubsub.call(["SUBSCRIBE", channel.as_str()]).await?;
    }
    for channel in &cli.channels {
        for n in 0..cli.messages {
            let payload = format!("message-{n}");
            let reply = pubsub
                .call(["PUBLISH", channel.as_str(), payload.as_str()])
                .await?;
            info!(channel = %channel, ?reply, "Published");
        }
    }
    info!(nodes = pubsub.node_count(), "Sessions opened");

    let expected = cli.channels.len() * (cli.messages + 1);
    let timeout = settings.poll_timeout();
    let mut received = 0;
    while received < expected {
        match pubsub.next_event(timeout).await? {
            Some(event) => {
                received += 1;
                print_event(&event);
            }
            None => {
                println!("no event within {:?}, stopping", timeout.unwrap_or(Duration::ZERO));
                break;
            }
        }
    }
    println!("received {received}/{expected} events");

    pubsub.close().await;
    logging.shutdown();
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::Subscribed {
            kind,
            channel,
            active,
        } => println!("subscribed   {kind:?} {channel} (active: {active})"),
        Event::Unsubscribed {
            kind,
            channel,
            active,
        } => println!("unsubscribed {kind:?} {channel} (active: {active})"),
        Event::Message { channel, payload } => {
            println!("message      {channel}: {}", String::from_utf8_lossy(payload))
        }
        Event::PatternMessage {
            pattern,
            channel,
            payload,
        } => println!(
            "pmessage     {pattern} {channel}: {}",
            String::from_utf8_lossy(payload)
        ),
        Event::ShardMessage { channel, payload } => {
            println!("smessage     {channel}: {}", String::from_utf8_lossy(payload))
        }
    }
}
