#[cfg(test)]
#[path = "grouper_test.rs"]
mod tests;

use std::collections::HashMap;

use anyhow::Result;
use chrono::Datelike;
use chrono::NaiveDate;
use strum::IntoEnumIterator;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::token_date;
use crate::domain::models::token_time;
use crate::domain::models::Approach;
use crate::domain::models::ConversationGroup;
use crate::domain::models::ConversationSummary;
use crate::domain::models::GroupLabel;
use crate::domain::models::HistoryGroups;

/// Year range the sidebar knows how to order. Conversations labelled with a
/// year outside of it are not displayed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupOrder {
    pub anchor_year: i32,
    pub oldest_year: i32,
}

impl GroupOrder {
    pub fn from_config() -> Result<GroupOrder> {
        return Ok(GroupOrder {
            anchor_year: Config::get(ConfigKey::HistoryAnchorYear).parse::<i32>()?,
            oldest_year: Config::get(ConfigKey::HistoryOldestYear).parse::<i32>()?,
        });
    }

    pub fn labels(&self) -> Vec<GroupLabel> {
        let mut labels = vec![
            GroupLabel::Today,
            GroupLabel::Yesterday,
            GroupLabel::Last7Days,
            GroupLabel::Last30Days,
        ];
        labels.extend((1..=12).rev().map(|month| return GroupLabel::Month(month)));
        labels.extend(
            (self.oldest_year..=self.anchor_year)
                .rev()
                .map(|year| return GroupLabel::Year(year)),
        );
        labels.push(GroupLabel::NoDate);

        return labels;
    }
}

pub fn group_label(timestamp_token: Option<&str>, today: NaiveDate) -> GroupLabel {
    let date = match timestamp_token.and_then(token_date) {
        Some(date) => date,
        None => return GroupLabel::NoDate,
    };

    // Dates in the future count as recent.
    let days_ago = (today - date).num_days();
    if days_ago == 0 {
        return GroupLabel::Today;
    }
    if days_ago == 1 {
        return GroupLabel::Yesterday;
    }
    if days_ago <= 7 {
        return GroupLabel::Last7Days;
    }
    if days_ago <= 30 {
        return GroupLabel::Last30Days;
    }
    if days_ago <= 365 && date.year() == today.year() {
        return GroupLabel::Month(date.month());
    }

    return GroupLabel::Year(date.year());
}

fn group_approach(
    summaries: &[ConversationSummary],
    approach: Approach,
    today: NaiveDate,
    order: &GroupOrder,
) -> Vec<ConversationGroup> {
    let mut buckets: HashMap<GroupLabel, Vec<ConversationSummary>> = HashMap::new();
    for summary in summaries.iter().filter(|e| return e.approach == approach) {
        let label = group_label(summary.timestamp_token.as_deref(), today);
        buckets.entry(label).or_default().push(summary.clone());
    }

    let labels = order.labels();
    for (label, conversations) in buckets.iter() {
        if !labels.contains(label) {
            tracing::debug!(
                approach = approach.to_string(),
                label = label.to_string(),
                count = conversations.len(),
                "Dropping history group outside of the display order"
            );
        }
    }

    return labels
        .into_iter()
        .filter_map(|label| {
            let mut conversations = buckets.remove(&label)?;
            if label != GroupLabel::NoDate {
                conversations.sort_by(|a, b| {
                    let a_time = token_time(a.timestamp_token.as_deref().unwrap_or(""));
                    let b_time = token_time(b.timestamp_token.as_deref().unwrap_or(""));
                    return b_time.cmp(a_time);
                });
            }

            return Some(ConversationGroup {
                label,
                conversations,
            });
        })
        .collect::<Vec<ConversationGroup>>();
}

/// Buckets a user's conversations into relative date groups, separately for
/// each approach. `today` is the current date in the configured timezone.
pub fn group_conversations(
    summaries: &[ConversationSummary],
    today: NaiveDate,
    order: &GroupOrder,
) -> HistoryGroups {
    let mut groups = HistoryGroups::default();
    for approach in Approach::iter() {
        let approach_groups = group_approach(summaries, approach, today, order);
        match approach {
            Approach::Chat => groups.chat = approach_groups,
            Approach::DocSearch => groups.docsearch = approach_groups,
        }
    }

    return groups;
}
