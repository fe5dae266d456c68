//! Title-trigger decision
//!
//! Pure decision logic on whether a title-generation request should be
//! queued for a given send event. Rules are evaluated in strict priority
//! order; the first matching rule wins.

use serde::{Deserialize, Serialize};

/// Inputs to the title-trigger decision
#[derive(Debug, Clone)]
pub struct TitleTriggerInput<'a> {
    /// Explicit opt-out, set on resend/edit paths
    pub skip_auto_title: bool,

    /// Number of messages already in the conversation before this send
    pub message_count_before_send: usize,

    /// The user message content being sent
    pub content: &'a str,

    /// Whether a title request was already queued for this first turn
    pub already_triggered: bool,
}

/// Why the decision came out the way it did; exactly one per decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    ShouldQueue,
    SkipAutoTitleOption,
    NotFirstMessage,
    EmptyUserMessage,
    DuplicateFirstTurnGuard,
}

/// Outcome of the title-trigger decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleTriggerDecision {
    pub should_queue: bool,
    pub reason: TriggerReason,
}

/// Decide whether a title-generation request should be queued for this send.
///
/// Title generation only fires once, on the conversation's first non-empty
/// user turn, and never on explicit resend/edit paths.
pub fn decide_title_trigger(input: &TitleTriggerInput<'_>) -> TitleTriggerDecision {
    let reason = if input.skip_auto_title {
        TriggerReason::SkipAutoTitleOption
    } else if input.message_count_before_send != 0 {
        TriggerReason::NotFirstMessage
    } else if input.content.trim().is_empty() {
        TriggerReason::EmptyUserMessage
    } else if input.already_triggered {
        TriggerReason::DuplicateFirstTurnGuard
    } else {
        TriggerReason::ShouldQueue
    };

    TitleTriggerDecision {
        should_queue: reason == TriggerReason::ShouldQueue,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> TitleTriggerInput<'static> {
        TitleTriggerInput {
            skip_auto_title: false,
            message_count_before_send: 0,
            content: "hello world",
            already_triggered: false,
        }
    }

    #[test]
    fn first_turn_queues() {
        let decision = decide_title_trigger(&base());
        assert!(decision.should_queue);
        assert_eq!(decision.reason, TriggerReason::ShouldQueue);
    }

    #[test]
    fn skip_option_wins() {
        let decision = decide_title_trigger(&TitleTriggerInput {
            skip_auto_title: true,
            ..base()
        });
        assert!(!decision.should_queue);
        assert_eq!(decision.reason, TriggerReason::SkipAutoTitleOption);
    }

    #[test]
    fn later_turns_never_queue() {
        let decision = decide_title_trigger(&TitleTriggerInput {
            message_count_before_send: 3,
            ..base()
        });
        assert!(!decision.should_queue);
        assert_eq!(decision.reason, TriggerReason::NotFirstMessage);
    }

    #[test]
    fn whitespace_only_content_skips() {
        let decision = decide_title_trigger(&TitleTriggerInput {
            content: "   ",
            ..base()
        });
        assert!(!decision.should_queue);
        assert_eq!(decision.reason, TriggerReason::EmptyUserMessage);
    }

    #[test]
    fn double_fire_is_guarded() {
        let decision = decide_title_trigger(&TitleTriggerInput {
            already_triggered: true,
            ..base()
        });
        assert!(!decision.should_queue);
        assert_eq!(decision.reason, TriggerReason::DuplicateFirstTurnGuard);
    }

    #[test]
    fn priority_order_first_rule_wins() {
        // Skip option outranks the empty-content rule.
        let decision = decide_title_trigger(&TitleTriggerInput {
            skip_auto_title: true,
            content: "",
            ..base()
        });
        assert_eq!(decision.reason, TriggerReason::SkipAutoTitleOption);

        // Message count outranks the duplicate guard.
        let decision = decide_title_trigger(&TitleTriggerInput {
            message_count_before_send: 2,
            already_triggered: true,
            ..base()
        });
        assert_eq!(decision.reason, TriggerReason::NotFirstMessage);
    }

    #[test]
    fn exactly_one_reason_and_consistent_flag() {
        let inputs = [
            (false, 0, "hi", false),
            (true, 0, "hi", false),
            (false, 1, "hi", false),
            (false, 0, " ", false),
            (false, 0, "hi", true),
        ];
        for (skip_auto_title, count, content, already) in inputs {
            let decision = decide_title_trigger(&TitleTriggerInput {
                skip_auto_title,
                message_count_before_send: count,
                content,
                already_triggered: already,
            });
            assert_eq!(
                decision.should_queue,
                decision.reason == TriggerReason::ShouldQueue
            );
        }
    }
}
