use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{sync::Notify, task::JoinHandle, time::Instant};
use tracing::{debug, debug_span, info, trace, warn, Instrument};
use zumic_error::{ResultExt, ZumicResult};

use super::{wait_bound, Event, Reply};
use crate::{
    cluster::{ClusterNode, NodeId, NodeSession, Router},
    command::{Command, CommandArg, CommandBuilder, DefaultCommandBuilder},
};

/// Общий буфер событий всех узлов.
///
/// Буфер работает как стек: последним добавленное событие выдаётся первым.
/// Эпоха увеличивается при каждом `close`, добавление с устаревшей эпохой
/// отбрасывается.
struct EventInbox {
    buffer: Mutex<Vec<Event>>,
    signal: Notify,
    epoch: AtomicU64,
}

impl EventInbox {
    fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::new()),
            signal: Notify::new(),
            epoch: AtomicU64::new(0),
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Добавляет событие, если эпоха не сменилась, и будит потребителя.
    fn push(
        &self,
        epoch: u64,
        event: Event,
    ) -> bool {
        {
            let mut buffer = self.buffer.lock();
            if self.epoch() != epoch {
                return false;
            }
            buffer.push(event);
        }
        self.signal.notify_waiters();
        true
    }

    fn pop(&self) -> Option<Event> {
        self.buffer.lock().pop()
    }

    fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Начинает новую эпоху: очищает буфер и будит ожидающего потребителя.
    fn reset(&self) -> u64 {
        let epoch = {
            let mut buffer = self.buffer.lock();
            buffer.clear();
            self.epoch.fetch_add(1, Ordering::AcqRel) + 1
        };
        self.signal.notify_waiters();
        epoch
    }
}

/// Слушатель узла на один цикл.
///
/// `done` выставляется до того, как событие попадёт в буфер: потребитель,
/// проснувшийся от этого события, уже видит слот свободным, даже если задача
/// ещё не завершилась.
struct Listener {
    handle: JoinHandle<()>,
    done: Arc<AtomicBool>,
}

impl Listener {
    fn is_live(&self) -> bool {
        !self.done.load(Ordering::Acquire) && !self.handle.is_finished()
    }
}

/// Мультиплексор pub/sub событий кластера.
///
/// Маршрутизирует команды на узлы-владельцы, лениво открывает по одной
/// сессии на узел и сводит события всех узлов в один поток, который
/// читается через [`ClusterPubSub::next_event`].
///
/// На каждый вызов `next_event` для каждого узла без живого слушателя
/// запускается одноразовая задача, которая ждёт одно событие сессии и
/// кладёт его в общий буфер.
pub struct ClusterPubSub {
    router: Arc<dyn Router>,
    builder: Arc<dyn CommandBuilder>,
    sessions: Mutex<HashMap<NodeId, Arc<dyn NodeSession>>>,
    listeners: Mutex<HashMap<NodeId, Listener>>,
    inbox: Arc<EventInbox>,
}

impl ClusterPubSub {
    pub fn new(router: Arc<dyn Router>) -> Self {
        Self::with_builder(router, Arc::new(DefaultCommandBuilder))
    }

    pub fn with_builder(
        router: Arc<dyn Router>,
        builder: Arc<dyn CommandBuilder>,
    ) -> Self {
        Self {
            router,
            builder,
            sessions: Mutex::new(HashMap::new()),
            listeners: Mutex::new(HashMap::new()),
            inbox: Arc::new(EventInbox::new()),
        }
    }

    /// Выполняет команду из сырых аргументов на узле-владельце.
    ///
    /// ```ignore
    /// pubsub.call(["SUBSCRIBE", "news"]).await?;
    /// ```
    pub async fn call<I, A>(
        &self,
        args: I,
    ) -> ZumicResult<Reply>
    where
        I: IntoIterator<Item = A>,
        A: Into<CommandArg>,
    {
        let command = self
            .builder
            .generate(args.into_iter().map(Into::into).collect())?;
        self.dispatch(command).await
    }

    /// Выполняет уже собранную команду на узле-владельце.
    pub async fn call_raw(
        &self,
        command: Command,
    ) -> ZumicResult<Reply> {
        let command = self.builder.normalize(command)?;
        self.dispatch(command).await
    }

    /// Ждёт следующее событие с любого узла.
    ///
    /// `None` и `Some(Duration::ZERO)` означают ожидание без ограничения по
    /// времени. Таймаут передаётся сессиям узлов как есть. Если ни одной
    /// сессии нет, сразу возвращает `Ok(None)`. Из буфера выдаётся последнее
    /// пришедшее событие.
    pub async fn next_event(
        &self,
        timeout: Option<Duration>,
    ) -> ZumicResult<Option<Event>> {
        let epoch = self.inbox.epoch();
        if self.sessions.lock().is_empty() {
            return Ok(None);
        }

        self.spawn_listeners(epoch, timeout);

        let deadline = wait_bound(timeout).and_then(|t| Instant::now().checked_add(t));
        loop {
            let notified = self.inbox.signal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.inbox.len() > 0 || self.inbox.epoch() != epoch {
                break;
            }

            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        break;
                    }
                }
                None => notified.await,
            }
        }

        Ok(self.inbox.pop())
    }

    /// Останавливает слушателей, закрывает сессии и сбрасывает состояние.
    ///
    /// Ошибки закрытия сессий только логируются. После `close` экземпляр
    /// можно использовать заново.
    pub async fn close(&self) {
        // Состояние снимается целиком под замком слушателей: конкурентный
        // `next_event` видит либо старую эпоху, либо пустой реестр.
        let (epoch, listeners, sessions) = {
            let mut registry = self.listeners.lock();
            let sessions: Vec<(NodeId, Arc<dyn NodeSession>)> =
                self.sessions.lock().drain().collect();
            let epoch = self.inbox.reset();
            let listeners: Vec<(NodeId, Listener)> = registry.drain().collect();
            (epoch, listeners, sessions)
        };

        for (_, listener) in &listeners {
            if !listener.handle.is_finished() {
                listener.handle.abort();
            }
        }
        for (node_id, listener) in listeners {
            if let Err(e) = listener.handle.await {
                if !e.is_cancelled() {
                    warn!(node_id = %node_id, error = %e, "Listener task failed");
                }
            }
        }

        let nodes = sessions.len();
        for (node_id, session) in sessions {
            if let Err(e) = session.close().await {
                warn!(node_id = %node_id, error = %e, "Failed to close pub/sub session");
            }
        }

        info!(epoch, nodes, "Cluster pub/sub closed");
    }

    /// Количество узлов с открытой сессией.
    pub fn node_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Количество слушателей, которые ещё ждут событие.
    pub fn live_listener_count(&self) -> usize {
        self.listeners
            .lock()
            .values()
            .filter(|l| l.is_live())
            .count()
    }

    /// Количество событий в буфере.
    pub fn pending_events(&self) -> usize {
        self.inbox.len()
    }

    async fn dispatch(
        &self,
        command: Command,
    ) -> ZumicResult<Reply> {
        let node = self.router.assign_node(&command)?;
        let session = self.session_for(node.as_ref()).await?;
        trace!(node_id = %node.id(), command = %command.name(), "Dispatching command");
        session.send(&command).await
    }

    /// Сессия узла: существующая или открытая заново.
    async fn session_for(
        &self,
        node: &dyn ClusterNode,
    ) -> ZumicResult<Arc<dyn NodeSession>> {
        let node_id = node.id();
        let existing = self.sessions.lock().get(&node_id).cloned();
        if let Some(session) = existing {
            return Ok(session);
        }

        let opened = node
            .pubsub()
            .await
            .with_context(|| format!("opening pub/sub session on {node_id}"))?;
        let (session, duplicate) = match self.sessions.lock().entry(node_id.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), Some(opened)),
            Entry::Vacant(entry) => (entry.insert(opened).clone(), None),
        };

        match duplicate {
            // Сессию параллельно открыл другой вызов.
            Some(extra) => {
                if let Err(e) = extra.close().await {
                    debug!(node_id = %node_id, error = %e, "Failed to close duplicate session");
                }
            }
            None => debug!(node_id = %node_id, "Opened pub/sub session"),
        }
        Ok(session)
    }

    fn spawn_listeners(
        &self,
        epoch: u64,
        timeout: Option<Duration>,
    ) {
        let mut listeners = self.listeners.lock();
        // close успел начаться: не запускаем задачи для закрываемых сессий
        if self.inbox.epoch() != epoch {
            return;
        }
        let sessions: Vec<(NodeId, Arc<dyn NodeSession>)> = self
            .sessions
            .lock()
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();

        for (node_id, session) in sessions {
            if listeners.get(&node_id).is_some_and(Listener::is_live) {
                continue;
            }
            let done = Arc::new(AtomicBool::new(false));
            let span = debug_span!("listener", node_id = %node_id, epoch);
            let task = listen_once(
                node_id.clone(),
                session,
                self.inbox.clone(),
                done.clone(),
                epoch,
                timeout,
            );
            let handle = tokio::spawn(task.instrument(span));
            listeners.insert(node_id, Listener { handle, done });
        }
    }
}

impl Drop for ClusterPubSub {
    fn drop(&mut self) {
        for listener in self.listeners.get_mut().values() {
            listener.handle.abort();
        }
    }
}

/// Одна итерация слушателя: ждёт одно событие сессии.
async fn listen_once(
    node_id: NodeId,
    session: Arc<dyn NodeSession>,
    inbox: Arc<EventInbox>,
    done: Arc<AtomicBool>,
    epoch: u64,
    timeout: Option<Duration>,
) {
    let outcome = session.next_event(timeout).await;
    done.store(true, Ordering::Release);

    match outcome {
        Ok(Some(event)) => {
            if !inbox.push(epoch, event) {
                trace!(node_id = %node_id, "Event dropped after close");
            }
        }
        Ok(None) => trace!(node_id = %node_id, "No event"),
        Err(e) if e.status_code().is_retryable() => {
            debug!(node_id = %node_id, error = %e, "Node poll failed")
        }
        Err(e) => warn!(node_id = %node_id, error = %e, "Node poll failed"),
    }
}
