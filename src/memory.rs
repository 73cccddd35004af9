//! Facts the assistant has "remembered" about the user

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

/// Memory panel sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, EnumIter)]
pub enum MemoryCategory {
    #[strum(serialize = "About You", serialize = "about", serialize = "about-you")]
    #[serde(rename = "About You")]
    AboutYou,
    #[strum(serialize = "Preferences", serialize = "preferences")]
    Preferences,
    #[strum(serialize = "Conversations", serialize = "conversations")]
    Conversations,
}

impl MemoryCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            MemoryCategory::AboutYou => "About You",
            MemoryCategory::Preferences => "Preferences",
            MemoryCategory::Conversations => "Conversations",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            MemoryCategory::AboutYou => "👤",
            MemoryCategory::Preferences => "💜",
            MemoryCategory::Conversations => "💬",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub category: MemoryCategory,
    pub text: String,
    pub date: DateTime<Utc>,
    pub icon: String,
}

/// In-memory store behind the memory panel
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    memories: Vec<Memory>,
}

impl MemoryStore {
    /// Store pre-filled with the demo memories
    pub fn with_seed_data() -> Self {
        let seed = [
            ("1", MemoryCategory::AboutYou, "Building AiRA - an AI that feels alive", (2024, 1, 15), "bag"),
            ("2", MemoryCategory::AboutYou, "Passionate about conversational AI", (2024, 1, 10), "robot"),
            ("3", MemoryCategory::Preferences, "Prefers detailed technical discussions", (2024, 1, 12), "gear"),
            ("4", MemoryCategory::Preferences, "Likes morning productivity sessions", (2024, 1, 8), "sunrise"),
            ("5", MemoryCategory::Conversations, "Discussed mobile app architecture", (2024, 1, 14), "phone"),
            ("6", MemoryCategory::Conversations, "Talked about React Native best practices", (2024, 1, 13), "atom"),
        ];

        let memories = seed
            .into_iter()
            .filter_map(|(id, category, text, (y, m, d), icon)| {
                let date = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
                Some(Memory {
                    id: id.to_string(),
                    category,
                    text: text.to_string(),
                    date: Utc.from_utc_datetime(&date),
                    icon: icon.to_string(),
                })
            })
            .collect();

        Self { memories }
    }

    /// Remember something new, dated now
    pub fn add(&mut self, category: MemoryCategory, text: impl Into<String>, icon: impl Into<String>) -> &Memory {
        let memory = Memory {
            id: Uuid::new_v4().simple().to_string(),
            category,
            text: text.into(),
            date: Utc::now(),
            icon: icon.into(),
        };
        tracing::debug!(memory_id = %memory.id, category = category.display_name(), "memory added");
        self.memories.push(memory);
        &self.memories[self.memories.len() - 1]
    }

    /// Forget a memory, returns whether it existed
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.memories.len();
        self.memories.retain(|memory| memory.id != id);
        self.memories.len() != before
    }

    pub fn by_category(&self, category: MemoryCategory) -> Vec<&Memory> {
        self.memories
            .iter()
            .filter(|memory| memory.category == category)
            .collect()
    }

    pub fn all(&self) -> &[Memory] {
        &self.memories
    }

    /// Categories in panel order, each with its memories
    pub fn grouped(&self) -> Vec<(MemoryCategory, Vec<&Memory>)> {
        MemoryCategory::iter()
            .map(|category| (category, self.by_category(category)))
            .collect()
    }
}

/// Human-friendly age of a memory: "Today", "Yesterday", "3 days ago" or the date itself
pub fn format_relative_date(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let millis = (now - date).num_milliseconds().unsigned_abs();
    let day = 24 * 60 * 60 * 1000;
    let days = millis.div_ceil(day);

    match days {
        // same instant still counts as today
        0 | 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        3..=7 => format!("{} days ago", days - 1),
        _ => date.format("%Y-%m-%d").to_string(),
    }
}
