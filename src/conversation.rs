#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One chat turn. Immutable once appended to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Append-only ordered log of the discussion phase. Ordering is significant:
/// `history_text` reproduces the turns verbatim for prompt construction.
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Vec<ChatTurn>,
}

pub const GREETING: &str = "你好！我是你的 AI 测试助手。\n\n我们将分两步工作：\n1. 功能讨论：你告诉我大概要测什么，我们先确定功能列表。\n2. 生成用例：确认功能后，触发生成，我会自动为你补充详细步骤和异常场景。";

pub const RESET_GREETING: &str = "我是你的 AI 测试助手。请告诉我测试需求。";

impl ConversationStore {
    pub fn with_greeting(greeting: &str) -> Self {
        let mut store = Self::default();
        store.append_assistant(greeting.to_string());
        store
    }

    pub fn append_user(&mut self, content: String) {
        self.turns.push(ChatTurn {
            role: Role::User,
            content,
        });
    }

    pub fn append_assistant(&mut self, content: String) {
        self.turns.push(ChatTurn {
            role: Role::Assistant,
            content,
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Renders the full history as `User: ...` / `AI: ...` lines, in order.
    pub fn history_text(&self) -> String {
        self.turns
            .iter()
            .map(|turn| match turn.role {
                Role::User => format!("User: {}", turn.content),
                Role::Assistant => format!("AI: {}", turn.content),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drops all turns and restarts from a single assistant greeting.
    pub fn reset(&mut self, greeting: &str) {
        self.turns.clear();
        self.append_assistant(greeting.to_string());
    }
}

#[cfg(test)]
#[path = "../tests/unit/conversation_tests.rs"]
mod tests;
