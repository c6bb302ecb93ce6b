use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use storefront_core::{ChannelId, GuildId, MessageId, TranscriptEntry, UserId};
use tokio::sync::Mutex;

use super::{AccessGrant, AccessTarget, ChannelRequest, ChannelSummary, ChatPlatform, PlatformError};
use crate::blocks::MessageTemplate;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub author: String,
    pub template: MessageTemplate,
}

impl StoredMessage {
    pub fn content(&self) -> String {
        self.template.content.clone().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default)]
struct MemoryChannel {
    name: String,
    parent: Option<ChannelId>,
    is_category: bool,
    grants: Vec<AccessGrant>,
    messages: Vec<StoredMessage>,
}

#[derive(Debug)]
struct MemoryState {
    next_id: u64,
    bot_user: UserId,
    administrators: Vec<UserId>,
    channels: BTreeMap<ChannelId, MemoryChannel>,
    fail_message_deletes: bool,
    operations: Vec<String>,
    reactions: Vec<(ChannelId, MessageId, String)>,
}

/// A single-guild platform held in memory. Records every mutating call in order.
#[derive(Debug)]
pub struct InMemoryPlatform {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new(UserId(1))
    }
}

impl InMemoryPlatform {
    pub fn new(bot_user: UserId) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 10_000,
                bot_user,
                administrators: Vec::new(),
                channels: BTreeMap::new(),
                fail_message_deletes: false,
                operations: Vec::new(),
                reactions: Vec::new(),
            }),
        }
    }

    pub async fn add_category(&self, id: ChannelId, name: &str) {
        let mut state = self.state.lock().await;
        state.channels.insert(
            id,
            MemoryChannel { name: name.to_owned(), is_category: true, ..MemoryChannel::default() },
        );
    }

    pub async fn add_channel(&self, id: ChannelId, name: &str, parent: Option<ChannelId>) {
        let mut state = self.state.lock().await;
        state
            .channels
            .insert(id, MemoryChannel { name: name.to_owned(), parent, ..MemoryChannel::default() });
    }

    pub async fn add_administrator(&self, user: UserId) {
        self.state.lock().await.administrators.push(user);
    }

    /// Seeds a message as if `author` had written it.
    pub async fn post_as(&self, channel: ChannelId, author: &str, content: &str) -> MessageId {
        let mut state = self.state.lock().await;
        let id = MessageId(state.allocate_id());
        if let Some(target) = state.channels.get_mut(&channel) {
            target.messages.push(StoredMessage {
                id,
                author: author.to_owned(),
                template: MessageTemplate::text(content),
            });
        }
        id
    }

    pub async fn fail_message_deletes(&self, fail: bool) {
        self.state.lock().await.fail_message_deletes = fail;
    }

    pub async fn operations(&self) -> Vec<String> {
        self.state.lock().await.operations.clone()
    }

    pub async fn messages(&self, channel: ChannelId) -> Vec<StoredMessage> {
        let state = self.state.lock().await;
        state.channels.get(&channel).map(|target| target.messages.clone()).unwrap_or_default()
    }

    pub async fn grant_for(&self, channel: ChannelId, target: AccessTarget) -> Option<AccessGrant> {
        let state = self.state.lock().await;
        state
            .channels
            .get(&channel)
            .and_then(|entry| entry.grants.iter().find(|grant| grant.target == target).copied())
    }

    pub async fn channel_names_in(&self, category: ChannelId) -> Vec<(ChannelId, String)> {
        let state = self.state.lock().await;
        state
            .channels
            .iter()
            .filter(|(_, channel)| channel.parent == Some(category))
            .map(|(id, channel)| (*id, channel.name.clone()))
            .collect()
    }

    pub async fn channel_exists(&self, channel: ChannelId) -> bool {
        self.state.lock().await.channels.contains_key(&channel)
    }

    pub async fn reactions(&self) -> Vec<(ChannelId, MessageId, String)> {
        self.state.lock().await.reactions.clone()
    }
}

impl MemoryState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn channel_mut(&mut self, channel: ChannelId) -> Result<&mut MemoryChannel, PlatformError> {
        self.channels.get_mut(&channel).ok_or_else(|| PlatformError::not_found(format!("channel {channel}")))
    }
}

#[async_trait]
impl ChatPlatform for InMemoryPlatform {
    async fn bot_user(&self) -> Result<UserId, PlatformError> {
        Ok(self.state.lock().await.bot_user)
    }

    async fn channels_in_category(
        &self,
        _guild: GuildId,
        category: ChannelId,
    ) -> Result<Option<Vec<ChannelSummary>>, PlatformError> {
        let state = self.state.lock().await;
        let is_category = state.channels.get(&category).is_some_and(|channel| channel.is_category);
        if !is_category {
            return Ok(None);
        }

        Ok(Some(
            state
                .channels
                .iter()
                .filter(|(_, channel)| channel.parent == Some(category))
                .map(|(id, channel)| ChannelSummary { id: *id, name: channel.name.clone() })
                .collect(),
        ))
    }

    async fn resolve_channel(
        &self,
        channel: ChannelId,
    ) -> Result<Option<ChannelSummary>, PlatformError> {
        let state = self.state.lock().await;
        Ok(state
            .channels
            .get(&channel)
            .map(|entry| ChannelSummary { id: channel, name: entry.name.clone() }))
    }

    async fn create_private_channel(
        &self,
        _guild: GuildId,
        request: ChannelRequest,
    ) -> Result<ChannelSummary, PlatformError> {
        let mut state = self.state.lock().await;
        if !state.channels.get(&request.category).is_some_and(|channel| channel.is_category) {
            return Err(PlatformError::not_found(format!("category {}", request.category)));
        }

        let id = ChannelId(state.allocate_id());
        state.operations.push(format!("create_channel:{}", request.name));
        state.channels.insert(
            id,
            MemoryChannel {
                name: request.name.clone(),
                parent: Some(request.category),
                is_category: false,
                grants: request.grants,
                messages: Vec::new(),
            },
        );
        Ok(ChannelSummary { id, name: request.name })
    }

    async fn set_access(&self, channel: ChannelId, grant: AccessGrant) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        state.operations.push(format!("set_access:{channel}"));
        let target = state.channel_mut(channel)?;
        target.grants.retain(|existing| existing.target != grant.target);
        target.grants.push(grant);
        Ok(())
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        state.operations.push(format!("delete_channel:{channel}"));
        state
            .channels
            .remove(&channel)
            .map(|_| ())
            .ok_or_else(|| PlatformError::not_found(format!("channel {channel}")))
    }

    async fn administrator_members(&self, _guild: GuildId) -> Result<Vec<UserId>, PlatformError> {
        Ok(self.state.lock().await.administrators.clone())
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageId, PlatformError> {
        let mut state = self.state.lock().await;
        let id = MessageId(state.allocate_id());
        state.operations.push(format!("send_message:{channel}"));
        state.channel_mut(channel)?.messages.push(StoredMessage {
            id,
            author: "storefront".to_owned(),
            template: message.clone(),
        });
        Ok(id)
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        state.operations.push(format!("delete_message:{channel}:{message}"));
        if state.fail_message_deletes {
            return Err(PlatformError::Request("message delete rejected".to_owned()));
        }

        let target = state.channel_mut(channel)?;
        let before = target.messages.len();
        target.messages.retain(|stored| stored.id != message);
        if target.messages.len() == before {
            return Err(PlatformError::not_found(format!("message {message}")));
        }
        Ok(())
    }

    async fn message_content(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<String, PlatformError> {
        let mut state = self.state.lock().await;
        state
            .channel_mut(channel)?
            .messages
            .iter()
            .find(|stored| stored.id == message)
            .map(StoredMessage::content)
            .ok_or_else(|| PlatformError::not_found(format!("message {message}")))
    }

    async fn edit_message_content(
        &self,
        channel: ChannelId,
        message: MessageId,
        content: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        state.operations.push(format!("edit_message:{channel}:{message}"));
        let stored = state
            .channel_mut(channel)?
            .messages
            .iter_mut()
            .find(|stored| stored.id == message)
            .ok_or_else(|| PlatformError::not_found(format!("message {message}")))?;
        stored.template.content = Some(content.to_owned());
        Ok(())
    }

    async fn history(&self, channel: ChannelId) -> Result<Vec<TranscriptEntry>, PlatformError> {
        let mut state = self.state.lock().await;
        state.operations.push(format!("history:{channel}"));
        let now = Utc::now();
        Ok(state
            .channel_mut(channel)?
            .messages
            .iter()
            .map(|stored| TranscriptEntry {
                timestamp: now,
                author: stored.author.clone(),
                content: stored.template.fallback_text(),
            })
            .collect())
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock().await;
        state.reactions.push((channel, message, emoji.to_owned()));
        Ok(())
    }
}
