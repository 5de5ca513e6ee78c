use chrono::NaiveDate;

use super::group_conversations;
use super::group_label;
use super::GroupOrder;
use crate::domain::models::Approach;
use crate::domain::models::ConversationSummary;
use crate::domain::models::GroupLabel;

fn today() -> NaiveDate {
    return NaiveDate::from_ymd_opt(2024, 10, 2).unwrap();
}

fn order() -> GroupOrder {
    return GroupOrder {
        anchor_year: 2029,
        oldest_year: 2023,
    };
}

fn summary(id: &str, approach: Approach, token: Option<&str>) -> ConversationSummary {
    return ConversationSummary {
        conversation_id: id.to_string(),
        approach,
        title: format!("Conversation {id}"),
        timestamp_token: token.map(|e| return e.to_string()),
    };
}

fn ids(summaries: &[ConversationSummary]) -> Vec<&str> {
    return summaries
        .iter()
        .map(|e| return e.conversation_id.as_str())
        .collect::<Vec<&str>>();
}

mod labels {
    use super::*;

    #[test]
    fn it_labels_recent_days() {
        assert_eq!(group_label(Some("20241002100000"), today()), GroupLabel::Today);
        assert_eq!(
            group_label(Some("20241001235959"), today()),
            GroupLabel::Yesterday
        );
        assert_eq!(
            group_label(Some("20240926000000"), today()),
            GroupLabel::Last7Days
        );
        assert_eq!(
            group_label(Some("20240925120000"), today()),
            GroupLabel::Last7Days
        );
        assert_eq!(
            group_label(Some("20240924120000"), today()),
            GroupLabel::Last30Days
        );
        assert_eq!(
            group_label(Some("20240902120000"), today()),
            GroupLabel::Last30Days
        );
    }

    #[test]
    fn it_labels_future_dates_as_recent() {
        assert_eq!(
            group_label(Some("20241005080000"), today()),
            GroupLabel::Last7Days
        );
    }

    #[test]
    fn it_labels_months_of_the_current_year() {
        assert_eq!(
            group_label(Some("20240901120000"), today()),
            GroupLabel::Month(9)
        );
        assert_eq!(
            group_label(Some("20240102120000"), today()),
            GroupLabel::Month(1)
        );
    }

    #[test]
    fn it_labels_older_dates_by_year() {
        assert_eq!(
            group_label(Some("20231005120000"), today()),
            GroupLabel::Year(2023)
        );
        assert_eq!(
            group_label(Some("20210101000000"), today()),
            GroupLabel::Year(2021)
        );
    }

    #[test]
    fn it_labels_missing_and_malformed_tokens_as_no_date() {
        assert_eq!(group_label(None, today()), GroupLabel::NoDate);
        assert_eq!(group_label(Some(""), today()), GroupLabel::NoDate);
        assert_eq!(group_label(Some("2024AB02100000"), today()), GroupLabel::NoDate);
        assert_eq!(group_label(Some("20241302100000"), today()), GroupLabel::NoDate);
        assert_eq!(group_label(Some("2024"), today()), GroupLabel::NoDate);
    }

    #[test]
    fn it_renders_group_titles() {
        assert_eq!(GroupLabel::Last7Days.to_string(), "last 7 days");
        assert_eq!(GroupLabel::Month(9).to_string(), "9 month");
        assert_eq!(GroupLabel::Year(2023).to_string(), "2023 year");
        assert_eq!(GroupLabel::NoDate.to_string(), "no date");
    }
}

mod grouping {
    use super::*;

    #[test]
    fn it_orders_groups_and_conversations() {
        let summaries = vec![
            summary("older", Approach::Chat, Some("20231005120000")),
            summary("morning", Approach::Chat, Some("20241002090000")),
            summary("undated", Approach::Chat, None),
            summary("late", Approach::Chat, Some("20241002100000")),
            summary("yesterday", Approach::Chat, Some("20241001235959")),
            summary("september", Approach::Chat, Some("20240901120000")),
        ];

        let res = group_conversations(&summaries, today(), &order());

        let labels = res
            .chat
            .iter()
            .map(|e| return e.label)
            .collect::<Vec<GroupLabel>>();
        assert_eq!(
            labels,
            vec![
                GroupLabel::Today,
                GroupLabel::Yesterday,
                GroupLabel::Month(9),
                GroupLabel::Year(2023),
                GroupLabel::NoDate,
            ]
        );
        assert_eq!(ids(&res.chat[0].conversations), vec!["late", "morning"]);
        assert!(res.docsearch.is_empty());
    }

    #[test]
    fn it_keeps_input_order_for_equal_times_and_no_date() {
        let summaries = vec![
            summary("b", Approach::DocSearch, None),
            summary("first", Approach::DocSearch, Some("20241002100000")),
            summary("a", Approach::DocSearch, None),
            summary("second", Approach::DocSearch, Some("20241002100000")),
            summary("c", Approach::DocSearch, Some("not-a-date")),
        ];

        let res = group_conversations(&summaries, today(), &order());

        assert_eq!(res.docsearch.len(), 2);
        assert_eq!(ids(&res.docsearch[0].conversations), vec!["first", "second"]);
        assert_eq!(res.docsearch[1].label, GroupLabel::NoDate);
        assert_eq!(ids(&res.docsearch[1].conversations), vec!["b", "a", "c"]);
    }

    #[test]
    fn it_only_produces_no_date_when_every_token_is_missing() {
        let summaries = vec![
            summary("1", Approach::Chat, None),
            summary("2", Approach::Chat, None),
        ];

        let res = group_conversations(&summaries, today(), &order());

        assert_eq!(res.chat.len(), 1);
        assert_eq!(res.chat[0].label, GroupLabel::NoDate);
        assert_eq!(ids(&res.chat[0].conversations), vec!["1", "2"]);
    }

    #[test]
    fn it_partitions_by_approach() {
        let summaries = vec![
            summary("chat", Approach::Chat, Some("20241002100000")),
            summary("search", Approach::DocSearch, Some("20241002100000")),
        ];

        let res = group_conversations(&summaries, today(), &order());

        assert_eq!(ids(&res.for_approach(Approach::Chat)[0].conversations), vec!["chat"]);
        assert_eq!(
            ids(&res.for_approach(Approach::DocSearch)[0].conversations),
            vec!["search"]
        );
    }

    #[test]
    fn it_drops_years_outside_of_the_order() {
        let summaries = vec![
            summary("ancient", Approach::Chat, Some("20190101000000")),
            summary("recent", Approach::Chat, Some("20241002100000")),
        ];

        let res = group_conversations(&summaries, today(), &order());

        assert_eq!(res.chat.len(), 1);
        assert_eq!(ids(&res.chat[0].conversations), vec!["recent"]);

        let wider = GroupOrder {
            anchor_year: 2029,
            oldest_year: 2019,
        };
        let res = group_conversations(&summaries, today(), &wider);
        assert_eq!(res.chat[1].label, GroupLabel::Year(2019));
    }

    #[test]
    fn it_is_idempotent() {
        let summaries = vec![
            summary("a", Approach::Chat, Some("20241002090000")),
            summary("b", Approach::Chat, Some("20241002100000")),
            summary("c", Approach::DocSearch, None),
            summary("d", Approach::Chat, Some("20240915100000")),
        ];

        let first = group_conversations(&summaries, today(), &order());
        let flattened = first
            .chat
            .iter()
            .chain(first.docsearch.iter())
            .flat_map(|e| return e.conversations.clone())
            .collect::<Vec<ConversationSummary>>();
        let second = group_conversations(&flattened, today(), &order());

        assert_eq!(first, second);
    }
}
