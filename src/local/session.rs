use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc, Notify,
    },
    task::JoinHandle,
};
use tracing::{debug, warn};
use zumic_error::{bail, ensure, ClientError, PubSubError, ZumicResult};

use crate::{
    cluster::{NodeId, NodeSession},
    command::{Command, CommandKind},
    pubsub::{wait_bound, Broker, Event, Reply, SubscriptionKind},
};

/// Активные подписки сессии: имя → задача пересылки из брокера.
#[derive(Default)]
struct Subscriptions {
    channels: HashMap<Arc<str>, JoinHandle<()>>,
    patterns: HashMap<Arc<str>, JoinHandle<()>>,
    shards: HashMap<Arc<str>, JoinHandle<()>>,
}

impl Subscriptions {
    fn of_kind(
        &mut self,
        kind: SubscriptionKind,
    ) -> &mut HashMap<Arc<str>, JoinHandle<()>> {
        match kind {
            SubscriptionKind::Channel => &mut self.channels,
            SubscriptionKind::Pattern => &mut self.patterns,
            SubscriptionKind::Shard => &mut self.shards,
        }
    }

    /// Счётчик из подтверждения: каналы и шаблоны считаются вместе,
    /// шардированные каналы отдельно.
    fn active(
        &self,
        kind: SubscriptionKind,
    ) -> usize {
        match kind {
            SubscriptionKind::Channel | SubscriptionKind::Pattern => {
                self.channels.len() + self.patterns.len()
            }
            SubscriptionKind::Shard => self.shards.len(),
        }
    }

    fn drain_all(&mut self) -> Vec<JoinHandle<()>> {
        self.channels
            .drain()
            .chain(self.patterns.drain())
            .chain(self.shards.drain())
            .map(|(_, h)| h)
            .collect()
    }
}

/// Pub/sub сессия с локальным узлом.
///
/// Подтверждения подписок и сообщения из брокера попадают в общую очередь
/// сессии, из которой читает `next_event`.
pub struct LocalSession {
    node_id: NodeId,
    broker: Arc<Broker>,
    inbox_tx: mpsc::UnboundedSender<Event>,
    inbox_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Event>>,
    subscriptions: Mutex<Subscriptions>,
    closed: AtomicBool,
    closing: Notify,
}

impl LocalSession {
    pub fn new(
        node_id: NodeId,
        broker: Arc<Broker>,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            node_id,
            broker,
            inbox_tx,
            inbox_rx: tokio::sync::Mutex::new(inbox_rx),
            subscriptions: Mutex::new(Subscriptions::default()),
            closed: AtomicBool::new(false),
            closing: Notify::new(),
        }
    }

    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Количество активных подписок всех видов.
    pub fn subscription_count(&self) -> usize {
        let subs = self.subscriptions.lock();
        subs.channels.len() + subs.patterns.len() + subs.shards.len()
    }

    fn closed_error(&self) -> ClientError {
        ClientError::ConnectionClosed {
            node_id: self.node_id.to_string(),
        }
    }

    fn subscribe(
        &self,
        kind: SubscriptionKind,
        names: &[Bytes],
    ) -> ZumicResult<Reply> {
        for raw in names {
            let name: Arc<str> = Arc::from(String::from_utf8_lossy(raw).as_ref());
            let mut subs = self.subscriptions.lock();
            if !subs.of_kind(kind).contains_key(&name) {
                let rx = match kind {
                    SubscriptionKind::Channel => self.broker.subscribe(&name),
                    SubscriptionKind::Pattern => self.broker.psubscribe(&name)?,
                    SubscriptionKind::Shard => self.broker.ssubscribe(&name),
                };
                let task = forward(self.node_id.clone(), rx, self.inbox_tx.clone());
                subs.of_kind(kind).insert(name.clone(), task);
            }
            let active = subs.active(kind);
            drop(subs);

            self.confirm(Event::Subscribed {
                kind,
                channel: name,
                active,
            });
        }
        Ok(Reply::Ok)
    }

    /// Без аргументов отписывает от всех подписок этого вида.
    fn unsubscribe(
        &self,
        kind: SubscriptionKind,
        names: &[Bytes],
    ) -> ZumicResult<Reply> {
        let names: Vec<Arc<str>> = if names.is_empty() {
            self.subscriptions
                .lock()
                .of_kind(kind)
                .keys()
                .cloned()
                .collect()
        } else {
            names
                .iter()
                .map(|raw| Arc::from(String::from_utf8_lossy(raw).as_ref()))
                .collect()
        };

        for name in names {
            let active = {
                let mut subs = self.subscriptions.lock();
                if let Some(task) = subs.of_kind(kind).remove(&name) {
                    task.abort();
                }
                subs.active(kind)
            };
            self.confirm(Event::Unsubscribed {
                kind,
                channel: name,
                active,
            });
        }
        Ok(Reply::Ok)
    }

    fn confirm(
        &self,
        event: Event,
    ) {
        // Получатель живёт столько же, сколько сессия.
        let _ = self.inbox_tx.send(event);
    }

    fn publish(
        &self,
        command: &Command,
        sharded: bool,
    ) -> ZumicResult<Reply> {
        let params = command.params();
        ensure!(
            params.len() == 2,
            PubSubError::InvalidArgument {
                command: command.name(),
                reason: "expected channel and message".to_string(),
            }
        );
        let channel = String::from_utf8_lossy(&params[0]);
        let payload = params[1].clone();
        let receivers = if sharded {
            self.broker.spublish(&channel, payload)
        } else {
            self.broker.publish(&channel, payload)
        };
        Ok(Reply::Integer(receivers as i64))
    }
}

#[async_trait]
impl NodeSession for LocalSession {
    async fn send(
        &self,
        command: &Command,
    ) -> ZumicResult<Reply> {
        if self.is_closed() {
            bail!(self.closed_error());
        }

        let kind = command.kind();
        let params = command.params();
        match kind {
            CommandKind::Subscribe | CommandKind::PSubscribe | CommandKind::SSubscribe => {
                ensure!(
                    !params.is_empty(),
                    PubSubError::InvalidArgument {
                        command: command.name(),
                        reason: "at least one channel is required".to_string(),
                    }
                );
                let sub_kind = subscription_kind(kind);
                self.subscribe(sub_kind, params)
            }
            CommandKind::Unsubscribe | CommandKind::PUnsubscribe | CommandKind::SUnsubscribe => {
                self.unsubscribe(subscription_kind(kind), params)
            }
            CommandKind::Publish => self.publish(command, false),
            CommandKind::SPublish => self.publish(command, true),
            CommandKind::Ping => Ok(match params.first() {
                Some(msg) => Reply::Bulk(msg.clone()),
                None => Reply::Pong,
            }),
            CommandKind::Other => bail!(ClientError::UnknownCommand {
                command: command.name(),
            }),
        }
    }

    async fn next_event(
        &self,
        timeout: Option<Duration>,
    ) -> ZumicResult<Option<Event>> {
        let closing = self.closing.notified();
        tokio::pin!(closing);
        closing.as_mut().enable();
        if self.is_closed() {
            bail!(self.closed_error());
        }

        let mut rx = self.inbox_rx.lock().await;
        let wait = async {
            tokio::select! {
                event = rx.recv() => Ok(event),
                _ = &mut closing => Err(self.closed_error()),
            }
        };

        let outcome = match wait_bound(timeout) {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(outcome) => outcome,
                Err(_) => Ok(None),
            },
            None => wait.await,
        };
        Ok(outcome?)
    }

    async fn close(&self) -> ZumicResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let tasks = self.subscriptions.lock().drain_all();
        let dropped = tasks.len();
        for task in tasks {
            task.abort();
        }
        self.closing.notify_waiters();

        debug!(node_id = %self.node_id, subscriptions = dropped, "Local session closed");
        Ok(())
    }
}

impl Drop for LocalSession {
    fn drop(&mut self) {
        for task in self.subscriptions.get_mut().drain_all() {
            task.abort();
        }
    }
}

fn subscription_kind(kind: CommandKind) -> SubscriptionKind {
    match kind {
        CommandKind::PSubscribe | CommandKind::PUnsubscribe => SubscriptionKind::Pattern,
        CommandKind::SSubscribe | CommandKind::SUnsubscribe => SubscriptionKind::Shard,
        _ => SubscriptionKind::Channel,
    }
}

/// Пересылает сообщения подписки из брокера в очередь сессии.
fn forward(
    node_id: NodeId,
    mut rx: broadcast::Receiver<Event>,
    inbox: mpsc::UnboundedSender<Event>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if inbox.send(event).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(node_id = %node_id, skipped, "Subscriber lagged, messages dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
