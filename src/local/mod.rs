//! Локальный (внутрипроцессный) узел кластера для тестов и демо.

mod node;
mod session;

pub use node::LocalNode;
pub use session::LocalSession;
