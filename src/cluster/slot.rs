use crc16::{State, XMODEM};

/// Количество hash-слотов кластера.
pub const SLOT_COUNT: u16 = 16384;

/// Номер hash-слота (0..16384).
pub type SlotId = u16;

/// Вычисляет слот по ключу (или имени канала) с поддержкой hash-tag
/// синтаксиса `{tag}`: если ключ содержит непустой `{...}`, то хешируется
/// только содержимое первой пары фигурных скобок.
pub fn key_slot(key: &[u8]) -> SlotId {
    State::<XMODEM>::calculate(hash_tag(key)) % SLOT_COUNT
}

/// Возвращает часть ключа, которая участвует в хешировании.
pub fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(start) = key.iter().position(|&b| b == b'{') else {
        return key;
    };
    match key[start + 1..].iter().position(|&b| b == b'}') {
        Some(0) | None => key,
        Some(len) => &key[start + 1..start + 1 + len],
    }
}
