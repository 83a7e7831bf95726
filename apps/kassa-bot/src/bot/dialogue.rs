use kassa_db::models::ProviderKind;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Chats that picked a provider and owe us an amount.
#[derive(Clone, Default)]
pub struct DialogueStore {
    awaiting: Arc<RwLock<HashMap<i64, ProviderKind>>>,
}

impl DialogueStore {
    pub async fn await_amount(&self, chat_id: i64, provider: ProviderKind) {
        self.awaiting.write().await.insert(chat_id, provider);
    }

    pub async fn awaiting_amount(&self, chat_id: i64) -> Option<ProviderKind> {
        self.awaiting.read().await.get(&chat_id).copied()
    }

    pub async fn clear(&self, chat_id: i64) {
        self.awaiting.write().await.remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remembers_provider_per_chat() {
        let dialogues = DialogueStore::default();
        dialogues.await_amount(1, ProviderKind::Qiwi).await;
        dialogues.await_amount(2, ProviderKind::Yoomoney).await;
        dialogues.await_amount(1, ProviderKind::CactusPay).await;

        assert_eq!(dialogues.awaiting_amount(1).await, Some(ProviderKind::CactusPay));
        assert_eq!(dialogues.awaiting_amount(2).await, Some(ProviderKind::Yoomoney));

        dialogues.clear(1).await;
        assert_eq!(dialogues.awaiting_amount(1).await, None);
    }
}
