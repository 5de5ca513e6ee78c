use std::fmt;

use super::Approach;
use super::ChatTurn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub approach: Approach,
    pub title: String,
    /// `YYYYMMDDhhmmss` in the configured local timezone.
    pub timestamp_token: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationContent {
    pub conversation_id: String,
    pub approach: Approach,
    pub turns: Vec<ChatTurn>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupLabel {
    Today,
    Yesterday,
    Last7Days,
    Last30Days,
    Month(u32),
    Year(i32),
    NoDate,
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupLabel::Today => return write!(f, "today"),
            GroupLabel::Yesterday => return write!(f, "yesterday"),
            GroupLabel::Last7Days => return write!(f, "last 7 days"),
            GroupLabel::Last30Days => return write!(f, "last 30 days"),
            GroupLabel::Month(month) => return write!(f, "{month} month"),
            GroupLabel::Year(year) => return write!(f, "{year} year"),
            GroupLabel::NoDate => return write!(f, "no date"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationGroup {
    pub label: GroupLabel,
    pub conversations: Vec<ConversationSummary>,
}

/// Sidebar view of a user's history, one ordered list of groups per approach.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistoryGroups {
    pub chat: Vec<ConversationGroup>,
    pub docsearch: Vec<ConversationGroup>,
}

impl HistoryGroups {
    pub fn for_approach(&self, approach: Approach) -> &[ConversationGroup] {
        match approach {
            Approach::Chat => return &self.chat,
            Approach::DocSearch => return &self.docsearch,
        }
    }
}
