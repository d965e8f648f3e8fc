use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use bytes::Bytes;
use dashmap::DashMap;
use globset::{Glob, GlobMatcher};
use tokio::sync::broadcast;
use zumic_error::{PubSubError, ZumicResult};

use super::Event;

type ChannelKey = Arc<str>;

/// Подписка по шаблону: скомпилированный matcher и канал рассылки.
struct PatternEntry {
    matcher: GlobMatcher,
    tx: broadcast::Sender<Event>,
}

/// Внутрипроцессный брокер pub/sub сообщений одного узла.
///
/// Поддерживает:
/// - Точные подписки по имени канала
/// - Подписки по шаблонам (glob)
/// - Шардированные каналы (`SPUBLISH`/`SSUBSCRIBE`)
/// - Автоматическое удаление каналов без получателей
pub struct Broker {
    /// Точные каналы → `Sender`
    channels: DashMap<ChannelKey, broadcast::Sender<Event>>,
    /// Шаблоны → matcher + `Sender`
    patterns: DashMap<ChannelKey, PatternEntry>,
    /// Шардированные каналы → `Sender`
    shard_channels: DashMap<ChannelKey, broadcast::Sender<Event>>,
    /// Ёмкость буфера каждого `broadcast::channel`
    capacity: usize,
    /// Общее количество вызовов `publish`/`spublish`
    publish_count: AtomicUsize,
    /// Количество неудачных `send` (нет получателей)
    send_error_count: AtomicUsize,
}

impl Broker {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            patterns: DashMap::new(),
            shard_channels: DashMap::new(),
            capacity: capacity.max(1),
            publish_count: AtomicUsize::new(0),
            send_error_count: AtomicUsize::new(0),
        }
    }

    /// Подписка на конкретный канал (точное совпадение).
    pub fn subscribe(
        &self,
        channel: &str,
    ) -> broadcast::Receiver<Event> {
        self.channels
            .entry(Arc::from(channel))
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Подписка по шаблону (glob), например `"news.*"` или `"a?c"`.
    pub fn psubscribe(
        &self,
        pattern: &str,
    ) -> ZumicResult<broadcast::Receiver<Event>> {
        let glob = Glob::new(pattern).map_err(|e| PubSubError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let rx = self
            .patterns
            .entry(Arc::from(pattern))
            .or_insert_with(|| PatternEntry {
                matcher: glob.compile_matcher(),
                tx: broadcast::channel(self.capacity).0,
            })
            .tx
            .subscribe();
        Ok(rx)
    }

    /// Подписка на шардированный канал.
    pub fn ssubscribe(
        &self,
        channel: &str,
    ) -> broadcast::Receiver<Event> {
        self.shard_channels
            .entry(Arc::from(channel))
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Публикация сообщения в канал, возвращает число получателей.
    ///
    /// Работает в два этапа:
    /// 1. Отправляет в точный канал (если есть)
    /// 2. Отправляет всем подписчикам по подходящим шаблонам
    pub fn publish(
        &self,
        channel: &str,
        payload: Bytes,
    ) -> usize {
        self.publish_count.fetch_add(1, Ordering::Relaxed);
        let channel: Arc<str> = Arc::from(channel);

        let mut receivers = self.send_exact(&self.channels, &channel, || Event::Message {
            channel: channel.clone(),
            payload: payload.clone(),
        });

        let mut idle = Vec::new();
        for entry in self.patterns.iter() {
            if !entry.matcher.is_match(&*channel) {
                continue;
            }
            let event = Event::PatternMessage {
                pattern: entry.key().clone(),
                channel: channel.clone(),
                payload: payload.clone(),
            };
            match entry.tx.send(event) {
                Ok(n) => receivers += n,
                Err(_) => idle.push(entry.key().clone()),
            }
        }

        // Удалять во время обхода DashMap нельзя: шард уже заблокирован.
        for pattern in idle {
            self.send_error_count.fetch_add(1, Ordering::Relaxed);
            self.patterns
                .remove_if(&pattern, |_, entry| entry.tx.receiver_count() == 0);
        }

        receivers
    }

    /// Публикация в шардированный канал. Шаблоны не участвуют.
    pub fn spublish(
        &self,
        channel: &str,
        payload: Bytes,
    ) -> usize {
        self.publish_count.fetch_add(1, Ordering::Relaxed);
        let channel: Arc<str> = Arc::from(channel);
        self.send_exact(&self.shard_channels, &channel, || Event::ShardMessage {
            channel: channel.clone(),
            payload,
        })
    }

    /// Удаляет все подписки на указанный канал (и сам канал).
    pub fn unsubscribe_all(
        &self,
        channel: &str,
    ) {
        self.channels.remove(channel);
    }

    /// Удаляет шаблон. Все его получатели получат `Closed`.
    pub fn punsubscribe_all(
        &self,
        pattern: &str,
    ) {
        self.patterns.remove(pattern);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn shard_channel_count(&self) -> usize {
        self.shard_channels.len()
    }

    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::Relaxed)
    }

    pub fn send_error_count(&self) -> usize {
        self.send_error_count.load(Ordering::Relaxed)
    }

    /// Отправляет событие в точный канал. Канал без получателей удаляется.
    fn send_exact<F>(
        &self,
        map: &DashMap<ChannelKey, broadcast::Sender<Event>>,
        channel: &str,
        event: F,
    ) -> usize
    where
        F: FnOnce() -> Event,
    {
        let Some(tx) = map.get(channel).map(|entry| entry.value().clone()) else {
            return 0;
        };

        match tx.send(event()) {
            Ok(n) => n,
            Err(_) => {
                self.send_error_count.fetch_add(1, Ordering::Relaxed);
                map.remove_if(channel, |_, tx| tx.receiver_count() == 0);
                0
            }
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new(128)
    }
}
